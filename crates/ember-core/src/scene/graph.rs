// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The scene graph contract and its arena implementation.

use crate::math::Mat4;
use crate::scene::{Camera, Light, Material, Mesh};
use serde::{Deserialize, Serialize};

/// Index of a node in a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Index of a material in a [`Scene`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(pub usize);

/// What a node contributes to a frame.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Only groups its children.
    Group,
    /// Drawn.
    Mesh(Mesh),
    /// Lights what is drawn.
    Light(Light),
    /// A viewpoint.
    Camera(Camera),
}

/// What the renderer needs from a scene.
///
/// Traversal starts at [`SceneGraph::root`] and visits children in the order
/// [`SceneGraph::children`] returns them; that order is also the draw order within
/// each bucket.
pub trait SceneGraph {
    /// The node traversal starts from.
    fn root(&self) -> NodeId;

    /// Children of `node`, in draw order. Empty for an unknown node.
    fn children(&self, node: NodeId) -> &[NodeId];

    /// What `node` holds, `None` for an unknown node.
    fn kind(&self, node: NodeId) -> Option<&NodeKind>;

    /// Transform of `node` relative to its parent.
    fn local_transform(&self, node: NodeId) -> Mat4;

    /// Resolves a material index.
    fn material(&self, id: MaterialId) -> Option<&dyn Material>;
}

/// One arena slot.
#[derive(Debug, Clone)]
pub struct Node {
    /// Debug name.
    pub name: String,
    /// Parent-relative transform.
    pub transform: Mat4,
    /// Payload.
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    /// The parent, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The children in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// An arena-backed scene: nodes and materials are owned here and refer to each
/// other by index only.
#[derive(Debug)]
pub struct Scene {
    nodes: Vec<Node>,
    materials: Vec<Box<dyn Material>>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// A scene holding only an empty root group.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                name: "root".to_string(),
                transform: Mat4::IDENTITY,
                kind: NodeKind::Group,
                parent: None,
                children: Vec::new(),
            }],
            materials: Vec::new(),
        }
    }

    /// Stores a material and returns its index.
    pub fn add_material(&mut self, material: impl Material + 'static) -> MaterialId {
        self.materials.push(Box::new(material));
        MaterialId(self.materials.len() - 1)
    }

    /// Appends a node under `parent`. An unknown parent is replaced by the root.
    pub fn add_node(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        kind: NodeKind,
        transform: Mat4,
    ) -> NodeId {
        let parent = if parent.0 < self.nodes.len() {
            parent
        } else {
            log::warn!("Parent {:?} does not exist; attaching to the root", parent);
            self.root()
        };
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.into(),
            transform,
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Appends an empty group.
    pub fn add_group(&mut self, parent: NodeId, name: impl Into<String>, transform: Mat4) -> NodeId {
        self.add_node(parent, name, NodeKind::Group, transform)
    }

    /// Appends a mesh.
    pub fn add_mesh(&mut self, parent: NodeId, mesh: Mesh, transform: Mat4) -> NodeId {
        self.add_node(parent, "mesh", NodeKind::Mesh(mesh), transform)
    }

    /// Appends a light.
    pub fn add_light(&mut self, parent: NodeId, light: Light, transform: Mat4) -> NodeId {
        self.add_node(parent, "light", NodeKind::Light(light), transform)
    }

    /// Appends a camera.
    pub fn add_camera(&mut self, parent: NodeId, camera: Camera) -> NodeId {
        self.add_node(parent, "camera", NodeKind::Camera(camera), Mat4::IDENTITY)
    }

    /// Borrows a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Mutably borrows a node.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Sets a node's parent-relative transform. Unknown ids are ignored.
    pub fn set_transform(&mut self, id: NodeId, transform: Mat4) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.transform = transform;
        }
    }

    /// Mutably borrows a node's mesh.
    pub fn mesh_mut(&mut self, id: NodeId) -> Option<&mut Mesh> {
        match &mut self.nodes.get_mut(id.0)?.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Mutably borrows a node's camera.
    pub fn camera_mut(&mut self, id: NodeId) -> Option<&mut Camera> {
        match &mut self.nodes.get_mut(id.0)?.kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    /// Number of nodes, the root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a scene has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of stored materials.
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }
}

impl SceneGraph for Scene {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        match self.nodes.get(node.0) {
            Some(n) => &n.children,
            None => &[],
        }
    }

    fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.nodes.get(node.0).map(|n| &n.kind)
    }

    fn local_transform(&self, node: NodeId) -> Mat4 {
        self.nodes.get(node.0).map_or(Mat4::IDENTITY, |n| n.transform)
    }

    fn material(&self, id: MaterialId) -> Option<&dyn Material> {
        self.materials.get(id.0).map(|m| m.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;
    use crate::scene::StandardMaterial;

    #[test]
    fn children_keep_insertion_order() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.add_group(root, "a", Mat4::IDENTITY);
        let b = scene.add_group(root, "b", Mat4::IDENTITY);
        let c = scene.add_group(a, "c", Mat4::IDENTITY);
        assert_eq!(scene.children(root), &[a, b]);
        assert_eq!(scene.children(a), &[c]);
        assert_eq!(scene.node(c).unwrap().parent(), Some(a));
    }

    #[test]
    fn unknown_parent_falls_back_to_root() {
        let mut scene = Scene::new();
        let orphan = scene.add_group(NodeId(42), "orphan", Mat4::IDENTITY);
        assert_eq!(scene.children(scene.root()), &[orphan]);
    }

    #[test]
    fn unknown_ids_resolve_to_nothing() {
        let scene = Scene::new();
        assert!(scene.kind(NodeId(7)).is_none());
        assert!(scene.children(NodeId(7)).is_empty());
        assert!(scene.material(MaterialId(0)).is_none());
        assert_eq!(scene.local_transform(NodeId(7)), Mat4::IDENTITY);
    }

    #[test]
    fn materials_are_indexed() {
        let mut scene = Scene::new();
        let material = StandardMaterial::unlit();
        let guid = material.id();
        let id = scene.add_material(material);
        assert_eq!(scene.material(id).map(|m| m.id()), Some(guid));
    }

    #[test]
    fn mesh_and_camera_are_mutable_in_place() {
        let mut scene = Scene::new();
        let root = scene.root();
        let material = scene.add_material(StandardMaterial::unlit());
        let mesh = scene.add_mesh(root, Mesh::triangle(material), Mat4::IDENTITY);
        let camera = scene.add_camera(root, Camera::default());

        scene.mesh_mut(mesh).unwrap().set_indices(vec![0, 1]);
        scene.camera_mut(camera).unwrap().position = Vec3::ONE;
        assert!(scene.mesh_mut(camera).is_none());
        assert!(matches!(scene.kind(camera), Some(NodeKind::Camera(c)) if c.position == Vec3::ONE));
    }
}
