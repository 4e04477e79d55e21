use glam::Vec3;
use std::time::Instant;

use crate::render::{OrbitControls, PerspectiveCamera};
use crate::scene::{NodeId, SceneGraph};

/// Ball path at `t` seconds: a Lissajous curve through the cage.
pub fn ball_position(t: f32) -> Vec3 {
    Vec3::new(t.cos(), (8.0 * t).sin(), (0.5 * t).cos())
}

/// Seconds since the loop started.
pub struct FrameClock {
    start: Instant,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self { start }
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed_at(Instant::now())
    }

    pub fn elapsed_at(&self, now: Instant) -> f32 {
        now.saturating_duration_since(self.start).as_secs_f32()
    }
}

/// The scene-side half of a frame: everything that moves without input.
pub struct SceneTicker {
    ball: NodeId,
}

impl SceneTicker {
    pub fn new(ball: NodeId) -> Self {
        Self { ball }
    }

    pub fn advance(
        &self,
        scene: &mut SceneGraph,
        controls: &mut OrbitControls,
        camera: &mut PerspectiveCamera,
        t: f32,
    ) {
        if let Some(node) = scene.get_mut(self.ball) {
            node.transform.position = ball_position(t);
        }
        controls.update(camera);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::build_ball;
    use crate::objects::test_support::empty_loader;
    use crate::params::SceneParams;
    use crate::ui::ControlPanel;
    use std::f32::consts::PI;
    use std::time::Duration;

    fn ball_scene() -> (SceneGraph, NodeId) {
        let mut scene = SceneGraph::new();
        let mut loader = empty_loader("frame");
        let mut panel = ControlPanel::new("Options");
        let ball = build_ball(&mut scene, &mut loader, &mut panel, &SceneParams::default());
        (scene, ball.node())
    }

    #[test]
    fn ball_starts_at_one_zero_one() {
        let p = ball_position(0.0);
        assert!((p - Vec3::new(1.0, 0.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn ball_crosses_the_middle_at_an_eighth_of_pi() {
        assert!(ball_position(PI / 8.0).y.abs() < 1e-5);
    }

    #[test]
    fn clock_measures_from_start() {
        let start = Instant::now();
        let clock = FrameClock::starting_at(start);
        let t = clock.elapsed_at(start + Duration::from_millis(1500));
        assert!((t - 1.5).abs() < 1e-6);
        assert_eq!(clock.elapsed_at(start), 0.0);
    }

    #[test]
    fn tick_moves_ball_and_damps_camera() {
        let (mut scene, ball) = ball_scene();
        let ticker = SceneTicker::new(ball);
        let mut camera =
            PerspectiveCamera::new(Vec3::new(1.0, 1.0, 10.0), 75.0, 1.0, 0.1, 100.0);
        let mut controls = OrbitControls::default();
        controls.rotate_by_pixels(120.0, 0.0, 600.0);
        let before = camera.position;

        ticker.advance(&mut scene, &mut controls, &mut camera, 2.0);

        let position = scene.get(ball).map(|node| node.transform.position);
        assert_eq!(position, Some(ball_position(2.0)));
        assert_ne!(camera.position, before);
    }
}
