use super::ParamListener;
use crate::assets::catalog::TextureCatalog;
use crate::assets::TextureLoader;
use crate::params::{BoxMaterial, CageStyle, ParamChange, SceneParams};
use crate::scene::geometry::Geometry;
use crate::scene::{Material, Mesh, NodeId, SceneGraph, SceneNode, Side, StandardMaterial};
use crate::ui::{Binding, ControlPanel};

pub const CAGE_SIZE: f32 = 3.0;
const CAGE_ALPHA_TEST: f32 = 0.5;

/// The textured box. Base map and alpha mask swap independently.
pub struct CageHandle {
    node: NodeId,
    materials: TextureCatalog<BoxMaterial>,
    styles: TextureCatalog<CageStyle>,
}

pub fn build_cage(
    scene: &mut SceneGraph,
    loader: &mut TextureLoader,
    panel: &mut ControlPanel,
    params: &SceneParams,
) -> CageHandle {
    let materials = TextureCatalog::<BoxMaterial>::load(loader);
    let styles = TextureCatalog::<CageStyle>::load(loader);

    let material = StandardMaterial {
        alpha_map: Some(styles.get(params.cage)),
        side: Side::Double,
        transparent: true,
        alpha_test: Some(CAGE_ALPHA_TEST),
        ..StandardMaterial::with_map(materials.get(params.material))
    };
    let mut mesh = Mesh::new(
        Geometry::Box {
            width: CAGE_SIZE,
            height: CAGE_SIZE,
            depth: CAGE_SIZE,
        },
        Material::Standard(material),
    );
    mesh.cast_shadow = true;
    let node = scene.add(SceneNode::mesh("cage", mesh));

    panel.add("Material", Binding::Material);
    panel.add("Cage Style", Binding::Cage);

    CageHandle {
        node,
        materials,
        styles,
    }
}

impl CageHandle {
    pub fn node(&self) -> NodeId {
        self.node
    }

    fn material_mut<'a>(&self, scene: &'a mut SceneGraph) -> Option<&'a mut StandardMaterial> {
        match &mut scene.mesh_mut(self.node)?.material {
            Material::Standard(material) => Some(material),
            Material::Matcap(_) => None,
        }
    }
}

impl ParamListener for CageHandle {
    fn on_param_change(&mut self, change: &ParamChange, _params: &SceneParams, scene: &mut SceneGraph) {
        match *change {
            ParamChange::Material(kind) => {
                let map = self.materials.get(kind);
                if let Some(material) = self.material_mut(scene) {
                    material.map = Some(map);
                }
            }
            ParamChange::Cage(style) => {
                let mask = self.styles.get(style);
                if let Some(material) = self.material_mut(scene) {
                    material.alpha_map = Some(mask);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::catalog::TextureSource;
    use crate::objects::test_support::empty_loader;
    use crate::params::Choice;

    fn standard(scene: &SceneGraph, node: NodeId) -> StandardMaterial {
        match &scene.get(node).and_then(SceneNode::as_mesh).unwrap().material {
            Material::Standard(material) => material.clone(),
            other => panic!("unexpected material {other:?}"),
        }
    }

    #[test]
    fn builds_double_sided_cutout_box() {
        let mut scene = SceneGraph::new();
        let mut loader = empty_loader("cage_build");
        let mut panel = ControlPanel::new("Options");
        let params = SceneParams::default();
        let cage = build_cage(&mut scene, &mut loader, &mut panel, &params);

        let material = standard(&scene, cage.node());
        assert_eq!(material.side, Side::Double);
        assert_eq!(material.alpha_test, Some(0.5));
        assert!(material.transparent);
        assert_eq!(material.map, Some(cage.materials.get(BoxMaterial::Iron)));
        assert_eq!(material.alpha_map, Some(cage.styles.get(CageStyle::Als)));
        assert!(panel.find("Material").is_some());
        assert!(panel.find("Cage Style").is_some());
        assert_eq!(loader.len(), BoxMaterial::ALL.len() + CageStyle::ALL.len());
    }

    #[test]
    fn material_and_style_swap_independently() {
        let mut scene = SceneGraph::new();
        let mut loader = empty_loader("cage_swap");
        let mut panel = ControlPanel::new("Options");
        let mut params = SceneParams::default();
        let mut cage = build_cage(&mut scene, &mut loader, &mut panel, &params);
        let before = standard(&scene, cage.node());

        let change = params.apply(ParamChange::Material(BoxMaterial::Bricks));
        cage.on_param_change(&change, &params, &mut scene);
        let bricks = standard(&scene, cage.node());
        assert_eq!(bricks.map, Some(cage.materials.get(BoxMaterial::Bricks)));
        assert_eq!(bricks.alpha_map, before.alpha_map);

        let change = params.apply(ParamChange::Cage(CageStyle::Wire2));
        cage.on_param_change(&change, &params, &mut scene);
        let wire2 = standard(&scene, cage.node());
        assert_eq!(wire2.alpha_map, Some(cage.styles.get(CageStyle::Wire2)));
        assert_eq!(wire2.map, bricks.map);
    }

    #[test]
    fn every_variant_maps_to_its_catalog_entry() {
        let mut scene = SceneGraph::new();
        let mut loader = empty_loader("cage_variants");
        let mut panel = ControlPanel::new("Options");
        let mut params = SceneParams::default();
        let mut cage = build_cage(&mut scene, &mut loader, &mut panel, &params);

        for style in CageStyle::ALL {
            let change = params.apply(ParamChange::Cage(*style));
            cage.on_param_change(&change, &params, &mut scene);
            let material = standard(&scene, cage.node());
            assert_eq!(material.alpha_map, Some(cage.styles.get(*style)));
            assert_eq!(material.map, Some(cage.materials.get(BoxMaterial::Iron)));
            let mask = material.alpha_map.and_then(|handle| loader.path(handle));
            assert!(mask.is_some_and(|path| path.ends_with(style.texture_path())));
        }
        for kind in BoxMaterial::ALL {
            let change = params.apply(ParamChange::Material(*kind));
            cage.on_param_change(&change, &params, &mut scene);
            let material = standard(&scene, cage.node());
            assert_eq!(material.map, Some(cage.materials.get(*kind)));
            assert_eq!(material.alpha_map, Some(cage.styles.get(CageStyle::Bars)));
            let map = material.map.and_then(|handle| loader.path(handle));
            assert!(
                map.is_some_and(|path| path.ends_with(kind.texture_path())),
                "{kind:?} -> {map:?}"
            );
        }
    }
}
