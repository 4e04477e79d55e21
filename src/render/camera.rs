use glam::{Mat4, Vec3};
use std::f32::consts::PI;

const POLAR_EPSILON: f32 = 1e-6;

/// Perspective camera looking at `target`. Angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_y_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl PerspectiveCamera {
    pub fn new(position: Vec3, fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::ZERO,
            fov_y_degrees,
            aspect,
            near,
            far,
        }
    }

    /// Follow a surface resize. Only the aspect ratio changes.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_degrees.to_radians(),
            self.aspect,
            self.near,
            self.far,
        )
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }
}

/// Damped orbit around a target: left-drag rotates, the wheel zooms.
/// Panning is not supported.
#[derive(Debug, Clone, Copy)]
pub struct OrbitControls {
    pub target: Vec3,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
        }
    }
}

impl OrbitControls {
    /// Controls orbiting the origin with the given distance and polar limits.
    pub fn new(min_distance: f32, max_distance: f32, max_polar_angle: f32) -> Self {
        Self {
            min_distance,
            max_distance,
            max_polar_angle,
            ..Self::default()
        }
    }

    /// Convert a pointer drag into pending rotation. The full viewport height
    /// corresponds to one turn.
    pub fn rotate_by_pixels(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        self.delta_theta -= 2.0 * PI * dx / height * self.rotate_speed;
        self.delta_phi -= 2.0 * PI * dy / height * self.rotate_speed;
    }

    /// Positive `steps` move toward the target.
    pub fn zoom(&mut self, steps: f32) {
        if steps.is_finite() {
            self.scale *= 0.95_f32.powf(steps);
        }
    }

    #[cfg(test)]
    pub fn is_settled(&self) -> bool {
        self.delta_theta.abs() < 1e-6 && self.delta_phi.abs() < 1e-6 && self.scale == 1.0
    }

    /// Advance one frame of damping and move `camera` accordingly.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) {
        let offset = camera.position - self.target;
        let radius = offset.length();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            0.0
        };

        theta += self.delta_theta * self.damping_factor;
        phi += self.delta_phi * self.damping_factor;
        phi = phi
            .clamp(self.min_polar_angle, self.max_polar_angle)
            .clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        let radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);

        let sin_phi = phi.sin();
        let offset = Vec3::new(
            radius * sin_phi * theta.sin(),
            radius * phi.cos(),
            radius * sin_phi * theta.cos(),
        );
        camera.position = self.target + offset;
        camera.target = self.target;

        self.delta_theta *= 1.0 - self.damping_factor;
        self.delta_phi *= 1.0 - self.damping_factor;
        self.scale = 1.0;
    }
}
