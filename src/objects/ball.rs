use super::ParamListener;
use crate::assets::catalog::TextureCatalog;
use crate::assets::TextureLoader;
use crate::params::{MatcapStyle, ParamChange, SceneParams};
use crate::scene::geometry::Geometry;
use crate::scene::{MatcapMaterial, Material, Mesh, NodeId, SceneGraph, SceneNode};
use crate::ui::{Binding, ControlPanel};

pub const BALL_RADIUS: f32 = 0.5;
const BALL_SEGMENTS: u32 = 64;

/// The matcap-shaded ball bouncing inside the cage.
pub struct BallHandle {
    node: NodeId,
    matcaps: TextureCatalog<MatcapStyle>,
}

pub fn build_ball(
    scene: &mut SceneGraph,
    loader: &mut TextureLoader,
    panel: &mut ControlPanel,
    params: &SceneParams,
) -> BallHandle {
    let matcaps = TextureCatalog::<MatcapStyle>::load(loader);
    let mut mesh = Mesh::new(
        Geometry::Sphere {
            radius: BALL_RADIUS,
            width_segments: BALL_SEGMENTS,
            height_segments: BALL_SEGMENTS,
        },
        Material::Matcap(MatcapMaterial {
            color: params.color,
            matcap: matcaps.get(params.matcap),
        }),
    );
    mesh.cast_shadow = true;
    let node = scene.add(SceneNode::mesh("ball", mesh));

    panel.add("Ball Style", Binding::Matcap);

    BallHandle { node, matcaps }
}

impl BallHandle {
    pub fn node(&self) -> NodeId {
        self.node
    }

    fn material_mut<'a>(&self, scene: &'a mut SceneGraph) -> Option<&'a mut MatcapMaterial> {
        match &mut scene.mesh_mut(self.node)?.material {
            Material::Matcap(material) => Some(material),
            Material::Standard(_) => None,
        }
    }
}

impl ParamListener for BallHandle {
    fn on_param_change(&mut self, change: &ParamChange, params: &SceneParams, scene: &mut SceneGraph) {
        let matcap = match *change {
            ParamChange::Matcap(style) => Some(self.matcaps.get(style)),
            _ => None,
        };
        let Some(material) = self.material_mut(scene) else {
            return;
        };
        if let Some(matcap) = matcap {
            material.matcap = matcap;
        }
        // The tint tracks the light color after every panel edit.
        material.color = params.color;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::catalog::TextureSource;
    use crate::objects::test_support::empty_loader;
    use crate::params::Choice;

    fn matcap(scene: &SceneGraph, node: NodeId) -> MatcapMaterial {
        match &scene.get(node).and_then(SceneNode::as_mesh).unwrap().material {
            Material::Matcap(material) => material.clone(),
            other => panic!("unexpected material {other:?}"),
        }
    }

    #[test]
    fn starts_with_default_skin_and_casts_shadow() {
        let mut scene = SceneGraph::new();
        let mut loader = empty_loader("ball_build");
        let mut panel = ControlPanel::new("Options");
        let ball = build_ball(&mut scene, &mut loader, &mut panel, &SceneParams::default());

        let mesh = scene.get(ball.node()).and_then(SceneNode::as_mesh).unwrap();
        assert!(mesh.cast_shadow);
        assert!(!mesh.receive_shadow);
        assert_eq!(matcap(&scene, ball.node()).matcap, ball.matcaps.get(MatcapStyle::Three));
        assert!(panel.find("Ball Style").is_some());
    }

    #[test]
    fn skin_change_swaps_only_the_matcap() {
        let mut scene = SceneGraph::new();
        let mut loader = empty_loader("ball_skin");
        let mut panel = ControlPanel::new("Options");
        let mut params = SceneParams::default();
        let mut ball = build_ball(&mut scene, &mut loader, &mut panel, &params);

        let change = params.apply(ParamChange::Matcap(MatcapStyle::Seven));
        ball.on_param_change(&change, &params, &mut scene);
        let material = matcap(&scene, ball.node());
        assert_eq!(material.matcap, ball.matcaps.get(MatcapStyle::Seven));
        assert_eq!(material.color, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn every_skin_maps_to_its_catalog_entry() {
        let mut scene = SceneGraph::new();
        let mut loader = empty_loader("ball_variants");
        let mut panel = ControlPanel::new("Options");
        let mut params = SceneParams::default();
        let mut ball = build_ball(&mut scene, &mut loader, &mut panel, &params);

        for style in MatcapStyle::ALL {
            let change = params.apply(ParamChange::Matcap(*style));
            ball.on_param_change(&change, &params, &mut scene);
            let skin = matcap(&scene, ball.node()).matcap;
            assert_eq!(skin, ball.matcaps.get(*style));
            let path = loader.path(skin);
            assert!(
                path.is_some_and(|path| path.ends_with(style.texture_path())),
                "{style:?} -> {path:?}"
            );
        }
    }

    #[test]
    fn tint_follows_light_color() {
        let mut scene = SceneGraph::new();
        let mut loader = empty_loader("ball_tint");
        let mut panel = ControlPanel::new("Options");
        let mut params = SceneParams::default();
        let mut ball = build_ball(&mut scene, &mut loader, &mut panel, &params);

        let change = params.apply(ParamChange::Color([1.0, 0.5, 0.0]));
        ball.on_param_change(&change, &params, &mut scene);
        let material = matcap(&scene, ball.node());
        assert_eq!(material.color, [1.0, 0.5, 0.0]);
        assert_eq!(material.matcap, ball.matcaps.get(MatcapStyle::Three));
    }
}
