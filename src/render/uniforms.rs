//! CPU-side uniform layouts and the scene → uniform translation.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use super::camera::PerspectiveCamera;
use crate::scene::{Light, Material, Mesh, SceneGraph, SceneNode};

pub const SHADOW_MAP_SIZE: u32 = 1024;
const SHADOW_BIAS: f32 = 0.0015;
const SHADOW_NEAR: f32 = 0.5;
const SHADOW_FAR: f32 = 500.0;
const DIRECTIONAL_SHADOW_EXTENT: f32 = 5.0;
const POINT_SHADOW_FOV_DEGREES: f32 = 120.0;

// Matches `light_color.w` in scene.wgsl.
const KIND_NONE: f32 = 0.0;
const KIND_DIRECTIONAL: f32 = 1.0;
const KIND_HEMISPHERE: f32 = 2.0;
const KIND_POINT: f32 = 3.0;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameUniform {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub light_view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    /// Summed ambient radiance.
    pub ambient: [f32; 4],
    /// Radiance of the active light; `w` is the light kind.
    pub light_color: [f32; 4],
    /// Hemisphere ground radiance.
    pub light_ground: [f32; 4],
    /// `w` is the point-light range.
    pub light_position: [f32; 4],
    /// x: enabled, y: depth bias, z: texel size.
    pub shadow: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ShadowUniform {
    pub light_view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
    /// x: alpha test, y: 1 for matcap shading, z: receives shadow,
    /// w: has alpha map.
    pub params: [f32; 4],
}

/// The lighting state the shaders see for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameLights {
    pub ambient: Vec3,
    pub active: Option<ActiveLight>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveLight {
    pub light: Light,
    pub position: Vec3,
}

impl FrameLights {
    /// Sum every ambient light and pick the first non-ambient one.
    pub fn collect(scene: &SceneGraph) -> Self {
        let mut ambient = Vec3::ZERO;
        let mut active = None;
        for (node, light) in scene.lights() {
            match light {
                Light::Ambient { color, intensity } => ambient += Vec3::from(*color) * *intensity,
                _ if active.is_none() => {
                    active = Some(ActiveLight {
                        light: *light,
                        position: node.transform.position,
                    });
                }
                _ => {}
            }
        }
        Self { ambient, active }
    }

    /// Light-space matrix for the shadow pass, if the active light casts one.
    pub fn shadow_view_projection(&self) -> Option<Mat4> {
        let active = self.active?;
        if !active.light.cast_shadow() {
            return None;
        }
        light_view_projection(&active.light, active.position)
    }
}

/// Shadow camera for a light at `position` aimed at the origin.
pub fn light_view_projection(light: &Light, position: Vec3) -> Option<Mat4> {
    if position.length_squared() < 1e-8 {
        return None;
    }
    let up = if position.normalize().y.abs() > 0.999 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let view = Mat4::look_at_rh(position, Vec3::ZERO, up);
    let projection = match light {
        Light::Directional { .. } => Mat4::orthographic_rh(
            -DIRECTIONAL_SHADOW_EXTENT,
            DIRECTIONAL_SHADOW_EXTENT,
            -DIRECTIONAL_SHADOW_EXTENT,
            DIRECTIONAL_SHADOW_EXTENT,
            SHADOW_NEAR,
            SHADOW_FAR,
        ),
        Light::Point { .. } => Mat4::perspective_rh(
            POINT_SHADOW_FOV_DEGREES.to_radians(),
            1.0,
            SHADOW_NEAR,
            SHADOW_FAR,
        ),
        Light::Ambient { .. } | Light::Hemisphere { .. } => return None,
    };
    Some(projection * view)
}

pub fn frame_uniform(camera: &PerspectiveCamera, lights: &FrameLights) -> FrameUniform {
    let shadow_matrix = lights.shadow_view_projection();
    let mut uniform = FrameUniform {
        view_proj: camera.view_projection().to_cols_array_2d(),
        view: camera.view().to_cols_array_2d(),
        light_view_proj: shadow_matrix.unwrap_or(Mat4::IDENTITY).to_cols_array_2d(),
        camera_position: camera.position.extend(1.0).to_array(),
        ambient: lights.ambient.extend(1.0).to_array(),
        light_color: [0.0, 0.0, 0.0, KIND_NONE],
        light_ground: [0.0; 4],
        light_position: [0.0; 4],
        shadow: [
            if shadow_matrix.is_some() { 1.0 } else { 0.0 },
            SHADOW_BIAS,
            1.0 / SHADOW_MAP_SIZE as f32,
            0.0,
        ],
    };

    if let Some(active) = lights.active {
        let position = active.position;
        let (radiance, kind, ground, range) = match active.light {
            Light::Directional {
                color, intensity, ..
            } => (Vec3::from(color) * intensity, KIND_DIRECTIONAL, Vec3::ZERO, 0.0),
            Light::Hemisphere {
                sky_color,
                ground_color,
                intensity,
            } => (
                Vec3::from(sky_color) * intensity,
                KIND_HEMISPHERE,
                Vec3::from(ground_color) * intensity,
                0.0,
            ),
            Light::Point {
                color,
                intensity,
                range,
                ..
            } => (Vec3::from(color) * intensity, KIND_POINT, Vec3::ZERO, range),
            Light::Ambient { .. } => (Vec3::ZERO, KIND_NONE, Vec3::ZERO, 0.0),
        };
        uniform.light_color = radiance.extend(kind).to_array();
        uniform.light_ground = ground.extend(0.0).to_array();
        uniform.light_position = position.extend(range).to_array();
    }
    uniform
}

/// Per-draw uniform. `alpha_map_bound` is false while the mask is missing so
/// an unloaded mask does not cut the surface away.
pub fn object_uniform(node: &SceneNode, mesh: &Mesh, alpha_map_bound: bool) -> ObjectUniform {
    let (color, alpha_test, matcap) = match &mesh.material {
        Material::Standard(material) => (material.color, material.alpha_test.unwrap_or(0.0), 0.0),
        Material::Matcap(material) => (material.color, 0.0, 1.0),
    };
    ObjectUniform {
        model: node.transform.matrix().to_cols_array_2d(),
        color: [color[0], color[1], color[2], 1.0],
        params: [
            alpha_test,
            matcap,
            if mesh.receive_shadow { 1.0 } else { 0.0 },
            if alpha_map_bound { 1.0 } else { 0.0 },
        ],
    }
}
