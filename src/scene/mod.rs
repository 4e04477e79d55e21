pub mod geometry;

use crate::assets::TextureHandle;
use geometry::Geometry;
use glam::{EulerRot, Mat4, Quat, Vec3};

/// Stable handle to a node in the [`SceneGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

/// Position plus XYZ Euler rotation in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_rotation_translation(rotation, self.position)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Front,
    Double,
}

/// Lit material: base color map, optional alpha mask, alpha-test cut-out.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardMaterial {
    pub color: [f32; 3],
    pub map: Option<TextureHandle>,
    pub alpha_map: Option<TextureHandle>,
    pub side: Side,
    pub transparent: bool,
    /// Fragments with alpha below this are discarded. `None` disables the test.
    pub alpha_test: Option<f32>,
}

impl StandardMaterial {
    pub fn with_map(map: TextureHandle) -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            map: Some(map),
            alpha_map: None,
            side: Side::Front,
            transparent: false,
            alpha_test: None,
        }
    }
}

/// Unlit material shaded entirely by a matcap texture.
#[derive(Debug, Clone, PartialEq)]
pub struct MatcapMaterial {
    pub color: [f32; 3],
    pub matcap: TextureHandle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    Standard(StandardMaterial),
    Matcap(MatcapMaterial),
}

impl Material {
    pub fn side(&self) -> Side {
        match self {
            Material::Standard(material) => material.side,
            Material::Matcap(_) => Side::Front,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub geometry: Geometry,
    pub material: Material,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl Mesh {
    pub fn new(geometry: Geometry, material: Material) -> Self {
        Self {
            geometry,
            material,
            cast_shadow: false,
            receive_shadow: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Ambient {
        color: [f32; 3],
        intensity: f32,
    },
    Directional {
        color: [f32; 3],
        intensity: f32,
        cast_shadow: bool,
    },
    Hemisphere {
        sky_color: [f32; 3],
        ground_color: [f32; 3],
        intensity: f32,
    },
    Point {
        color: [f32; 3],
        intensity: f32,
        /// Distance at which the light fades to zero. Zero means no cutoff.
        range: f32,
        cast_shadow: bool,
    },
}

impl Light {
    pub fn cast_shadow(&self) -> bool {
        match self {
            Light::Directional { cast_shadow, .. } | Light::Point { cast_shadow, .. } => {
                *cast_shadow
            }
            Light::Ambient { .. } | Light::Hemisphere { .. } => false,
        }
    }

    pub fn set_color(&mut self, value: [f32; 3]) {
        match self {
            Light::Ambient { color, .. }
            | Light::Directional { color, .. }
            | Light::Point { color, .. } => *color = value,
            Light::Hemisphere { sky_color, .. } => *sky_color = value,
        }
    }

    pub fn color(&self) -> [f32; 3] {
        match self {
            Light::Ambient { color, .. }
            | Light::Directional { color, .. }
            | Light::Point { color, .. } => *color,
            Light::Hemisphere { sky_color, .. } => *sky_color,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Mesh(Mesh),
    Light(Light),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
}

impl SceneNode {
    pub fn mesh(name: &str, mesh: Mesh) -> Self {
        Self {
            name: name.to_string(),
            transform: Transform::default(),
            kind: NodeKind::Mesh(mesh),
        }
    }

    pub fn light(name: &str, light: Light) -> Self {
        Self {
            name: name.to_string(),
            transform: Transform::default(),
            kind: NodeKind::Light(light),
        }
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn rotated(mut self, rotation: Vec3) -> Self {
        self.transform.rotation = rotation;
        self
    }

    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            NodeKind::Light(_) => None,
        }
    }

    pub fn as_mesh_mut(&mut self) -> Option<&mut Mesh> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            NodeKind::Light(_) => None,
        }
    }

    pub fn as_light(&self) -> Option<&Light> {
        match &self.kind {
            NodeKind::Light(light) => Some(light),
            NodeKind::Mesh(_) => None,
        }
    }

    pub fn as_light_mut(&mut self) -> Option<&mut Light> {
        match &mut self.kind {
            NodeKind::Light(light) => Some(light),
            NodeKind::Mesh(_) => None,
        }
    }
}

/// Owns every node in the scene. Ids are never reused.
#[derive(Default)]
pub struct SceneGraph {
    nodes: Vec<(NodeId, SceneNode)>,
    next_id: u32,
    background: Option<TextureHandle>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            next_id: 0,
            background: None,
        }
    }

    pub fn add(&mut self, node: SceneNode) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.push((id, node));
        id
    }

    pub fn remove(&mut self, id: NodeId) -> Option<SceneNode> {
        let index = self.nodes.iter().position(|(node_id, _)| *node_id == id)?;
        Some(self.nodes.remove(index).1)
    }

    #[cfg(test)]
    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes
            .iter()
            .find(|(node_id, _)| *node_id == id)
            .map(|(_, node)| node)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes
            .iter_mut()
            .find(|(node_id, _)| *node_id == id)
            .map(|(_, node)| node)
    }

    pub fn mesh_mut(&mut self, id: NodeId) -> Option<&mut Mesh> {
        self.get_mut(id).and_then(SceneNode::as_mesh_mut)
    }

    pub fn light_mut(&mut self, id: NodeId) -> Option<&mut Light> {
        self.get_mut(id).and_then(SceneNode::as_light_mut)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    pub fn meshes(&self) -> impl Iterator<Item = (NodeId, &SceneNode, &Mesh)> {
        self.iter()
            .filter_map(|(id, node)| node.as_mesh().map(|mesh| (id, node, mesh)))
    }

    pub fn lights(&self) -> impl Iterator<Item = (&SceneNode, &Light)> {
        self.nodes
            .iter()
            .filter_map(|(_, node)| node.as_light().map(|light| (node, light)))
    }

    #[cfg(test)]
    pub fn count_named(&self, name: &str) -> usize {
        self.nodes
            .iter()
            .filter(|(_, node)| node.name == name)
            .count()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn background(&self) -> Option<TextureHandle> {
        self.background
    }

    pub fn set_background(&mut self, texture: Option<TextureHandle>) {
        self.background = texture;
    }
}
