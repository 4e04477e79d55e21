use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use std::f32::consts::PI;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    /// Bottom-left origin, v pointing up.
    pub uv: [f32; 2],
}

#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

/// Procedural shapes used by the scene. Equal descriptions share GPU buffers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    Plane {
        width: f32,
        height: f32,
    },
    Box {
        width: f32,
        height: f32,
        depth: f32,
    },
    Sphere {
        radius: f32,
        width_segments: u32,
        height_segments: u32,
    },
}

impl Geometry {
    pub fn build(&self) -> MeshData {
        match *self {
            Geometry::Plane { width, height } => plane(width, height),
            Geometry::Box {
                width,
                height,
                depth,
            } => cuboid(width, height, depth),
            Geometry::Sphere {
                radius,
                width_segments,
                height_segments,
            } => sphere(radius, width_segments.max(3), height_segments.max(2)),
        }
    }

    /// Hashable identity for the GPU mesh cache.
    pub fn cache_key(&self) -> [u32; 4] {
        match *self {
            Geometry::Plane { width, height } => [0, width.to_bits(), height.to_bits(), 0],
            Geometry::Box {
                width,
                height,
                depth,
            } => [1, width.to_bits(), height.to_bits(), depth.to_bits()],
            Geometry::Sphere {
                radius,
                width_segments,
                height_segments,
            } => [2, radius.to_bits(), width_segments, height_segments],
        }
    }
}

fn plane(width: f32, height: f32) -> MeshData {
    let mut data = MeshData::default();
    push_face(
        &mut data,
        Vec3::ZERO,
        Vec3::X,
        Vec3::Y,
        Vec3::Z,
        width,
        height,
    );
    data
}

fn cuboid(width: f32, height: f32, depth: f32) -> MeshData {
    let mut data = MeshData::default();
    let (hw, hh, hd) = (width * 0.5, height * 0.5, depth * 0.5);
    // (normal, u axis, v axis, face width, face height, distance)
    let faces = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y, depth, height, hw),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y, depth, height, hw),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z, width, depth, hh),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z, width, depth, hh),
        (Vec3::Z, Vec3::X, Vec3::Y, width, height, hd),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y, width, height, hd),
    ];
    for (normal, u_axis, v_axis, face_w, face_h, distance) in faces {
        push_face(
            &mut data,
            normal * distance,
            u_axis,
            v_axis,
            normal,
            face_w,
            face_h,
        );
    }
    data
}

/// One quad facing `normal`, wound counter-clockwise when seen from the front.
fn push_face(
    data: &mut MeshData,
    center: Vec3,
    u_axis: Vec3,
    v_axis: Vec3,
    normal: Vec3,
    width: f32,
    height: f32,
) {
    let base = data.vertices.len() as u32;
    let (hu, hv) = (u_axis * width * 0.5, v_axis * height * 0.5);
    let corners = [
        (center - hu + hv, [0.0, 1.0]),
        (center + hu + hv, [1.0, 1.0]),
        (center - hu - hv, [0.0, 0.0]),
        (center + hu - hv, [1.0, 0.0]),
    ];
    for (position, uv) in corners {
        data.vertices.push(Vertex {
            position: position.to_array(),
            normal: normal.to_array(),
            uv,
        });
    }
    data.indices
        .extend_from_slice(&[base, base + 2, base + 1, base + 2, base + 3, base + 1]);
}

fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> MeshData {
    let mut data = MeshData::default();
    let row = width_segments + 1;
    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;
            let position = Vec3::new(
                -radius * (u * 2.0 * PI).cos() * (v * PI).sin(),
                radius * (v * PI).cos(),
                radius * (u * 2.0 * PI).sin() * (v * PI).sin(),
            );
            let normal = position.normalize_or_zero();
            data.vertices.push(Vertex {
                position: position.to_array(),
                normal: normal.to_array(),
                uv: [u, 1.0 - v],
            });
        }
    }
    for iy in 0..height_segments {
        for ix in 0..width_segments {
            let a = iy * row + ix + 1;
            let b = iy * row + ix;
            let c = (iy + 1) * row + ix;
            let d = (iy + 1) * row + ix + 1;
            if iy != 0 {
                data.indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height_segments - 1 {
                data.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_normal(data: &MeshData, tri: usize) -> Vec3 {
        let idx = &data.indices[tri * 3..tri * 3 + 3];
        let p = |i: u32| Vec3::from(data.vertices[i as usize].position);
        (p(idx[1]) - p(idx[0])).cross(p(idx[2]) - p(idx[0]))
    }

    #[test]
    fn plane_faces_positive_z() {
        let data = Geometry::Plane {
            width: 30.0,
            height: 15.0,
        }
        .build();
        assert_eq!(data.vertices.len(), 4);
        assert_eq!(data.indices.len(), 6);
        for tri in 0..2 {
            assert!(triangle_normal(&data, tri).z > 0.0);
        }
        let max_x = data
            .vertices
            .iter()
            .map(|v| v.position[0])
            .fold(f32::MIN, f32::max);
        assert_eq!(max_x, 15.0);
    }

    #[test]
    fn box_winding_matches_normals() {
        let data = Geometry::Box {
            width: 3.0,
            height: 3.0,
            depth: 3.0,
        }
        .build();
        assert_eq!(data.vertices.len(), 24);
        for tri in 0..data.indices.len() / 3 {
            let vertex = data.vertices[data.indices[tri * 3] as usize];
            let stored = Vec3::from(vertex.normal);
            assert!(triangle_normal(&data, tri).dot(stored) > 0.0, "triangle {tri}");
        }
    }

    #[test]
    fn sphere_points_lie_on_radius_and_face_outward() {
        let data = Geometry::Sphere {
            radius: 0.5,
            width_segments: 16,
            height_segments: 8,
        }
        .build();
        for vertex in &data.vertices {
            assert!((Vec3::from(vertex.position).length() - 0.5).abs() < 1e-5);
        }
        for tri in 0..data.indices.len() / 3 {
            let centroid = data.indices[tri * 3..tri * 3 + 3]
                .iter()
                .map(|i| Vec3::from(data.vertices[*i as usize].position))
                .sum::<Vec3>();
            assert!(triangle_normal(&data, tri).dot(centroid) > 0.0);
        }
    }
}
