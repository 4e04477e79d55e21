use glam::Vec3;

use super::ParamListener;
use crate::params::{Axis, Choice, LightKind, ParamChange, SceneParams, LIGHT_HOME_POSITION};
use crate::scene::{Light, NodeId, SceneGraph, SceneNode};
use crate::ui::{Binding, ControlPanel};

/// Name carried by the single swappable light.
pub const LIGHT_NODE_NAME: &str = "light";

const AMBIENT_INTENSITY: f32 = 0.3;
const HEMISPHERE_GROUND: [f32; 3] = [0.0, 0.0, 1.0];
const POINT_RANGE: f32 = 100.0;

/// Owns the swappable light plus a constant ambient fill.
pub struct LightManager {
    kind: LightKind,
    active: NodeId,
    ambient: NodeId,
}

pub fn build_lights(
    scene: &mut SceneGraph,
    panel: &mut ControlPanel,
    params: &SceneParams,
) -> LightManager {
    let ambient = scene.add(SceneNode::light(
        "ambient",
        Light::Ambient {
            color: [1.0, 1.0, 1.0],
            intensity: AMBIENT_INTENSITY,
        },
    ));
    let active = scene.add(light_node(params.light, params.color, params.light_position()));
    log::info!("Installed {} light", params.light.label());

    panel.add("Light Type", Binding::Light);
    panel.add("Light color", Binding::Color);
    let folder = panel.folder("Light Position");
    for axis in Axis::ALL {
        folder.add(axis.label(), Binding::LightAxis(axis));
    }

    LightManager {
        kind: params.light,
        active,
        ambient,
    }
}

fn make_light(kind: LightKind, color: [f32; 3]) -> Light {
    let cast_shadow = kind.casts_shadow();
    match kind {
        LightKind::Directional => Light::Directional {
            color,
            intensity: 1.0,
            cast_shadow,
        },
        LightKind::Hemisphere => Light::Hemisphere {
            sky_color: color,
            ground_color: HEMISPHERE_GROUND,
            intensity: 1.0,
        },
        LightKind::Point => Light::Point {
            color,
            intensity: 1.0,
            range: POINT_RANGE,
            cast_shadow,
        },
    }
}

fn light_node(kind: LightKind, color: [f32; 3], position: Vec3) -> SceneNode {
    SceneNode::light(LIGHT_NODE_NAME, make_light(kind, color)).at(position)
}

impl LightManager {
    pub fn kind(&self) -> LightKind {
        self.kind
    }

    pub fn active(&self) -> NodeId {
        self.active
    }

    pub fn ambient(&self) -> NodeId {
        self.ambient
    }

    /// Replace the active light with a fresh `kind` at the home position.
    pub fn swap(&mut self, scene: &mut SceneGraph, kind: LightKind, color: [f32; 3]) {
        scene.remove(self.active);
        self.active = scene.add(light_node(kind, color, Vec3::from(LIGHT_HOME_POSITION)));
        self.kind = kind;
        log::info!("Swapped to {} light", kind.label());
    }
}

impl ParamListener for LightManager {
    fn on_param_change(&mut self, change: &ParamChange, params: &SceneParams, scene: &mut SceneGraph) {
        match *change {
            ParamChange::Light(kind) => self.swap(scene, kind, params.color),
            ParamChange::Color(color) => {
                if let Some(light) = scene.light_mut(self.active) {
                    light.set_color(color);
                }
            }
            ParamChange::LightAxis(..) => {
                if let Some(node) = scene.get_mut(self.active) {
                    node.transform.position = params.light_position();
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (SceneGraph, ControlPanel, SceneParams, LightManager) {
        let mut scene = SceneGraph::new();
        let mut panel = ControlPanel::new("Options");
        let params = SceneParams::default();
        let lights = build_lights(&mut scene, &mut panel, &params);
        (scene, panel, params, lights)
    }

    fn active_light(scene: &SceneGraph, lights: &LightManager) -> Light {
        *scene.get(lights.active()).and_then(SceneNode::as_light).unwrap()
    }

    fn change(
        change: ParamChange,
        params: &mut SceneParams,
        lights: &mut LightManager,
        scene: &mut SceneGraph,
    ) {
        let stored = params.apply(change);
        lights.on_param_change(&stored, params, scene);
    }

    #[test]
    fn starts_with_directional_light_and_ambient_fill() {
        let (scene, panel, _, lights) = setup();
        assert_eq!(lights.kind(), LightKind::Directional);
        assert!(active_light(&scene, &lights).cast_shadow());
        assert_eq!(scene.count_named(LIGHT_NODE_NAME), 1);
        assert!(matches!(
            scene.get(lights.ambient()).and_then(SceneNode::as_light),
            Some(Light::Ambient { intensity, .. }) if (*intensity - 0.3).abs() < 1e-6
        ));
        assert!(panel.find("Light Type").is_some());
        assert!(panel.find("Light color").is_some());
        assert_eq!(panel.groups().last().unwrap().folder, Some("Light Position"));
    }

    #[test]
    fn shadow_casting_follows_light_kind() {
        let (mut scene, _, mut params, mut lights) = setup();
        change(ParamChange::Light(LightKind::Hemisphere), &mut params, &mut lights, &mut scene);
        assert!(!active_light(&scene, &lights).cast_shadow());
        change(ParamChange::Light(LightKind::Point), &mut params, &mut lights, &mut scene);
        assert!(active_light(&scene, &lights).cast_shadow());
        change(ParamChange::Light(LightKind::Directional), &mut params, &mut lights, &mut scene);
        assert!(active_light(&scene, &lights).cast_shadow());
    }

    #[test]
    fn exactly_one_named_light_after_many_swaps() {
        let (mut scene, _, mut params, mut lights) = setup();
        let ambient = lights.ambient();
        for round in 0..3 {
            for kind in LightKind::ALL {
                change(ParamChange::Light(*kind), &mut params, &mut lights, &mut scene);
                assert_eq!(scene.count_named(LIGHT_NODE_NAME), 1, "round {round}");
            }
        }
        assert_eq!(scene.len(), 2);
        assert!(scene.get(ambient).is_some());
    }

    #[test]
    fn swapped_light_keeps_color_and_sits_at_home() {
        let (mut scene, _, mut params, mut lights) = setup();
        change(ParamChange::Color([0.2, 0.4, 0.6]), &mut params, &mut lights, &mut scene);
        change(ParamChange::LightAxis(Axis::X, -4.0), &mut params, &mut lights, &mut scene);
        change(ParamChange::Light(LightKind::Hemisphere), &mut params, &mut lights, &mut scene);

        let light = active_light(&scene, &lights);
        assert_eq!(light.color(), [0.2, 0.4, 0.6]);
        assert!(matches!(light, Light::Hemisphere { ground_color, .. } if ground_color == HEMISPHERE_GROUND));
        let position = scene.get(lights.active()).unwrap().transform.position;
        assert_eq!(position, Vec3::from(LIGHT_HOME_POSITION));
        assert_eq!(params.light_position(), position);
    }

    #[test]
    fn axis_change_preserves_other_axes() {
        let (mut scene, _, mut params, mut lights) = setup();
        change(ParamChange::LightAxis(Axis::X, -2.0), &mut params, &mut lights, &mut scene);
        change(ParamChange::LightAxis(Axis::Y, 9.0), &mut params, &mut lights, &mut scene);
        let position = scene.get(lights.active()).unwrap().transform.position;
        assert_eq!(position, Vec3::new(-2.0, 9.0, 5.0));
    }

    #[test]
    fn unrelated_changes_leave_the_light_alone() {
        let (mut scene, _, mut params, mut lights) = setup();
        let before = scene.get(lights.active()).cloned();
        change(
            ParamChange::Cage(crate::params::CageStyle::Bars),
            &mut params,
            &mut lights,
            &mut scene,
        );
        assert_eq!(scene.get(lights.active()).cloned(), before);
    }
}
