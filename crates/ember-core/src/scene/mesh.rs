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

//! CPU-side geometry.

use crate::guid::Guid;
use crate::math::Vec3;
use crate::renderer::{BufferUsage, PrimitiveTopology};
use crate::scene::MaterialId;

/// One float vertex attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexStream {
    /// The shader attribute location it feeds.
    pub location: u32,
    /// Floats per vertex, 1 to 4.
    pub components: u32,
    /// Tightly packed values, `components` per vertex.
    pub data: Vec<f32>,
}

impl VertexStream {
    /// Number of vertices in the stream.
    pub fn vertex_count(&self) -> usize {
        match self.components {
            0 => 0,
            n => self.data.len() / n as usize,
        }
    }
}

/// An indexed mesh and the material it is drawn with.
///
/// The mesh's [`Guid`] plus a revision key its GPU resources: the renderer uploads
/// each stream and the indices once, under ids derived from both, and reuses them
/// every frame. [`Mesh::set_stream`] and [`Mesh::set_indices`] bump the revision, so
/// the next frame uploads the edited data under new ids and the renderer releases
/// the previous revision.
#[derive(Debug, Clone)]
pub struct Mesh {
    id: Guid,
    revision: u32,
    streams: Vec<VertexStream>,
    indices: Vec<u32>,
    topology: PrimitiveTopology,
    usage: BufferUsage,
    material: MaterialId,
}

impl Mesh {
    /// Attribute location of [`Mesh::with_positions`].
    pub const POSITION_LOCATION: u32 = 0;
    /// Attribute location of [`Mesh::with_normals`].
    pub const NORMAL_LOCATION: u32 = 1;
    /// Attribute location of [`Mesh::with_uvs`].
    pub const UV_LOCATION: u32 = 2;

    /// An empty triangle mesh.
    pub fn new(material: MaterialId) -> Self {
        Self {
            id: Guid::new(),
            revision: 0,
            streams: Vec::new(),
            indices: Vec::new(),
            topology: PrimitiveTopology::Triangles,
            usage: BufferUsage::Static,
            material,
        }
    }

    /// Adds (or replaces) the stream at `location`.
    pub fn with_stream(mut self, location: u32, components: u32, data: Vec<f32>) -> Self {
        self.set_stream(location, components, data);
        self
    }

    /// Positions at [`Mesh::POSITION_LOCATION`].
    pub fn with_positions(self, positions: &[Vec3]) -> Self {
        let data = bytemuck::cast_slice::<Vec3, f32>(positions).to_vec();
        self.with_stream(Self::POSITION_LOCATION, 3, data)
    }

    /// Normals at [`Mesh::NORMAL_LOCATION`].
    pub fn with_normals(self, normals: &[Vec3]) -> Self {
        let data = bytemuck::cast_slice::<Vec3, f32>(normals).to_vec();
        self.with_stream(Self::NORMAL_LOCATION, 3, data)
    }

    /// Texture coordinates at [`Mesh::UV_LOCATION`].
    pub fn with_uvs(self, uvs: &[[f32; 2]]) -> Self {
        let data = bytemuck::cast_slice::<[f32; 2], f32>(uvs).to_vec();
        self.with_stream(Self::UV_LOCATION, 2, data)
    }

    /// Sets the index list.
    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.set_indices(indices);
        self
    }

    /// Sets how indices are assembled into primitives.
    pub fn with_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    /// Sets the usage hint of the uploaded buffers.
    pub fn with_usage(mut self, usage: BufferUsage) -> Self {
        self.usage = usage;
        self
    }

    /// A single triangle in the XY plane, facing `+Z`.
    pub fn triangle(material: MaterialId) -> Self {
        Self::new(material)
            .with_positions(&[
                Vec3::new(-0.5, -0.5, 0.0),
                Vec3::new(0.5, -0.5, 0.0),
                Vec3::new(0.0, 0.5, 0.0),
            ])
            .with_indices(vec![0, 1, 2])
    }

    /// A unit quad in the XY plane with normals and UVs.
    pub fn quad(material: MaterialId) -> Self {
        let normal = Vec3::new(0.0, 0.0, 1.0);
        Self::new(material)
            .with_positions(&[
                Vec3::new(-0.5, -0.5, 0.0),
                Vec3::new(0.5, -0.5, 0.0),
                Vec3::new(0.5, 0.5, 0.0),
                Vec3::new(-0.5, 0.5, 0.0),
            ])
            .with_normals(&[normal; 4])
            .with_uvs(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]])
            .with_indices(vec![0, 1, 2, 2, 3, 0])
    }

    /// Replaces the stream at `location`, keeping streams sorted by location.
    pub fn set_stream(&mut self, location: u32, components: u32, data: Vec<f32>) {
        let stream = VertexStream {
            location,
            components,
            data,
        };
        match self.streams.binary_search_by_key(&location, |s| s.location) {
            Ok(index) => self.streams[index] = stream,
            Err(index) => self.streams.insert(index, stream),
        }
        self.bump_revision();
    }

    /// Replaces the index list.
    pub fn set_indices(&mut self, indices: Vec<u32>) {
        self.indices = indices;
        self.bump_revision();
    }

    /// Points the mesh at another material.
    pub fn set_material(&mut self, material: MaterialId) {
        self.material = material;
    }

    /// Marks the data as changed; GPU resources are re-created under new ids.
    /// The setters call this themselves.
    pub fn bump_revision(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// The mesh's identity.
    pub fn id(&self) -> Guid {
        self.id
    }

    /// Streams ordered by location.
    pub fn streams(&self) -> &[VertexStream] {
        &self.streams
    }

    /// The index list.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Primitive assembly mode.
    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    /// Buffer usage hint.
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// The mesh's own material.
    pub fn material(&self) -> MaterialId {
        self.material
    }

    /// Whether there is anything to draw.
    pub fn is_drawable(&self) -> bool {
        !self.indices.is_empty() && !self.streams.is_empty()
    }

    fn resource_root(&self) -> Guid {
        self.id.derive(&format!("rev{}", self.revision))
    }

    /// Id of the buffer holding the stream at `location`.
    pub fn stream_buffer_id(&self, location: u32) -> Guid {
        self.resource_root().derive(&format!("attr{location}"))
    }

    /// Id of the element buffer.
    pub fn index_buffer_id(&self) -> Guid {
        self.resource_root().derive("indices")
    }

    /// Id of the geometry, `variant` separating meshes that get extra attributes
    /// from an instancing material.
    pub fn geometry_id(&self, variant: Option<Guid>) -> Guid {
        let root = self.resource_root();
        match variant {
            Some(variant) => root.derive(&format!("geometry/{variant}")),
            None => root.derive("geometry"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streams_stay_sorted_and_unique() {
        let mut mesh = Mesh::new(MaterialId::default())
            .with_stream(2, 2, vec![0.0; 6])
            .with_stream(0, 3, vec![0.0; 9]);
        mesh.set_stream(2, 2, vec![1.0; 6]);
        let locations: Vec<u32> = mesh.streams().iter().map(|s| s.location).collect();
        assert_eq!(locations, vec![0, 2]);
        assert_eq!(mesh.streams()[1].data[0], 1.0);
        assert_eq!(mesh.streams()[0].vertex_count(), 3);
    }

    #[test]
    fn resource_ids_are_stable_until_revision_changes() {
        let mut mesh = Mesh::triangle(MaterialId::default());
        let (vb, ib, geometry) = (
            mesh.stream_buffer_id(0),
            mesh.index_buffer_id(),
            mesh.geometry_id(None),
        );
        assert_eq!(mesh.stream_buffer_id(0), vb);
        assert_ne!(vb, ib);
        assert_ne!(mesh.geometry_id(Some(Guid::new())), geometry);

        mesh.bump_revision();
        assert_ne!(mesh.stream_buffer_id(0), vb);
        assert_ne!(mesh.geometry_id(None), geometry);
    }

    #[test]
    fn editing_data_moves_to_new_resource_ids() {
        let mut mesh = Mesh::triangle(MaterialId::default());
        let (vb, ib) = (mesh.stream_buffer_id(0), mesh.index_buffer_id());

        mesh.set_indices(vec![2, 1, 0]);
        assert_ne!(mesh.index_buffer_id(), ib);
        let ib = mesh.index_buffer_id();

        mesh.set_stream(0, 3, vec![0.0; 9]);
        assert_ne!(mesh.stream_buffer_id(0), vb);
        assert_ne!(mesh.index_buffer_id(), ib);

        let geometry = mesh.geometry_id(None);
        mesh.set_material(MaterialId::default());
        assert_eq!(mesh.geometry_id(None), geometry);
    }

    #[test]
    fn empty_mesh_is_not_drawable() {
        assert!(!Mesh::new(MaterialId::default()).is_drawable());
        assert!(Mesh::quad(MaterialId::default()).is_drawable());
    }
}
