use glam::Vec3;
use std::f32::consts::PI;

use crate::assets::catalog::{GROUND_TEXTURE, SKY_TEXTURE, WALL_TEXTURE};
use crate::assets::{ColorSpace, TextureLoader};
use crate::scene::geometry::Geometry;
use crate::scene::{Material, Mesh, NodeId, SceneGraph, SceneNode, StandardMaterial};

const ROOM_HALF_WIDTH: f32 = 15.0;
const WALL_HEIGHT: f32 = 15.0;
const WALL_Y: f32 = 5.999;
/// Just under the cage's bottom face at -1.5.
const FLOOR_Y: f32 = -1.501;
/// Linen, 0xfaf0e6.
const FLOOR_TINT: [f32; 3] = [250.0 / 255.0, 240.0 / 255.0, 230.0 / 255.0];

pub struct RoomHandle {
    pub floor: NodeId,
    pub walls: [NodeId; 4],
}

/// Floor, four inward-facing walls and the sky background.
pub fn build_room(scene: &mut SceneGraph, loader: &mut TextureLoader) -> RoomHandle {
    let sky = loader.load(SKY_TEXTURE, ColorSpace::Srgb);
    scene.set_background(Some(sky));

    let ground = loader.load(GROUND_TEXTURE, ColorSpace::Srgb);
    let mut floor = Mesh::new(
        Geometry::Plane {
            width: 2.0 * ROOM_HALF_WIDTH,
            height: 2.0 * ROOM_HALF_WIDTH,
        },
        Material::Standard(StandardMaterial {
            color: FLOOR_TINT,
            ..StandardMaterial::with_map(ground)
        }),
    );
    floor.receive_shadow = true;
    let floor = scene.add(
        SceneNode::mesh("floor", floor)
            .at(Vec3::new(0.0, FLOOR_Y, 0.0))
            .rotated(Vec3::new(-0.5 * PI, 0.0, 0.0)),
    );

    let wall_texture = loader.load(WALL_TEXTURE, ColorSpace::Srgb);
    let wall_material = Material::Standard(StandardMaterial::with_map(wall_texture));
    let wall_geometry = Geometry::Plane {
        width: 2.0 * ROOM_HALF_WIDTH,
        height: WALL_HEIGHT,
    };
    // (name, position, rotation)
    let placements = [
        ("wall_front", Vec3::new(0.0, WALL_Y, -ROOM_HALF_WIDTH), Vec3::ZERO),
        (
            "wall_right",
            Vec3::new(ROOM_HALF_WIDTH, WALL_Y, 0.0),
            Vec3::new(0.0, -0.5 * PI, 0.0),
        ),
        (
            "wall_left",
            Vec3::new(-ROOM_HALF_WIDTH, WALL_Y, 0.0),
            Vec3::new(0.0, 0.5 * PI, 0.0),
        ),
        (
            "wall_back",
            Vec3::new(0.0, WALL_Y, ROOM_HALF_WIDTH),
            Vec3::new(PI, 0.0, 0.0),
        ),
    ];
    let walls = placements.map(|(name, position, rotation)| {
        let mut wall = Mesh::new(wall_geometry, wall_material.clone());
        wall.cast_shadow = true;
        scene.add(SceneNode::mesh(name, wall).at(position).rotated(rotation))
    });

    RoomHandle { floor, walls }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::test_support::empty_loader;

    fn facing(scene: &SceneGraph, node: NodeId) -> (Vec3, Vec3) {
        let node = scene.get(node).unwrap();
        let matrix = node.transform.matrix();
        (
            matrix.transform_point3(Vec3::ZERO),
            matrix.transform_vector3(Vec3::Z),
        )
    }

    #[test]
    fn floor_faces_up_and_only_receives_shadows() {
        let mut scene = SceneGraph::new();
        let mut loader = empty_loader("room_floor");
        let room = build_room(&mut scene, &mut loader);

        let (origin, normal) = facing(&scene, room.floor);
        assert!((normal - Vec3::Y).length() < 1e-5);
        assert!((origin.y - FLOOR_Y).abs() < 1e-6);
        let mesh = scene.get(room.floor).and_then(SceneNode::as_mesh).unwrap();
        assert!(mesh.receive_shadow);
        assert!(!mesh.cast_shadow);
        assert!(scene.background().is_some());
    }

    #[test]
    fn walls_face_the_center() {
        let mut scene = SceneGraph::new();
        let mut loader = empty_loader("room_walls");
        let room = build_room(&mut scene, &mut loader);

        for wall in room.walls {
            let (origin, normal) = facing(&scene, wall);
            let inward = Vec3::new(-origin.x, 0.0, -origin.z).normalize();
            assert!(normal.dot(inward) > 0.999, "{origin:?} {normal:?}");
            assert!((origin.y - WALL_Y).abs() < 1e-4);
        }
    }

    #[test]
    fn walls_share_one_material() {
        let mut scene = SceneGraph::new();
        let mut loader = empty_loader("room_shared");
        let room = build_room(&mut scene, &mut loader);
        let materials: Vec<_> = room
            .walls
            .iter()
            .map(|id| scene.get(*id).and_then(SceneNode::as_mesh).unwrap().material.clone())
            .collect();
        assert!(materials.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(loader.len(), 3);
    }
}
