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

//! Geometry: a vertex array binding vertex buffers to attribute locations plus one
//! element buffer.

use crate::guid::Guid;
use crate::renderer::api::{
    AttributeType, Buffer, BufferDescriptor, BufferKind, GpuHandle, IndexType, Iteration,
    PrimitiveTopology,
};
use crate::renderer::error::ResourceError;
use crate::renderer::traits::{Bindable, Drawable, GraphicsBackend};
use std::collections::BTreeMap;

/// How one attribute location reads its vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttributeLayout {
    /// The shader input location.
    pub location: u32,
    /// Component scalar type.
    pub attribute_type: AttributeType,
    /// Components per unit.
    pub components: u32,
    /// Byte distance between consecutive units; always the unit size.
    pub stride: usize,
    /// Whether integer data is normalized when read as float.
    pub normalized: bool,
    /// Per-vertex or per-instance stepping.
    pub iteration: Iteration,
}

/// Describes a geometry in terms of registered buffers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeometryDescriptor {
    /// Primitive topology.
    pub topology: PrimitiveTopology,
    /// Attribute location → vertex buffer id.
    pub vertex_buffers: Vec<(u32, Guid)>,
    /// The element buffer id.
    pub element_buffer: Guid,
}

impl GeometryDescriptor {
    /// A triangle geometry reading indices from `element_buffer`.
    pub fn new(element_buffer: Guid) -> Self {
        Self {
            topology: PrimitiveTopology::Triangles,
            vertex_buffers: Vec::new(),
            element_buffer,
        }
    }

    /// Binds `buffer` to attribute `location`.
    pub fn with_attribute(mut self, location: u32, buffer: Guid) -> Self {
        self.vertex_buffers.push((location, buffer));
        self
    }

    /// Sets the topology.
    pub fn with_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }
}

/// The element buffer of a geometry, as seen by draw calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementRange {
    /// The element buffer resource.
    pub buffer: Guid,
    /// Index integer type.
    pub index_type: IndexType,
    /// Number of indices drawn.
    pub count: u32,
}

/// A vertex array resource.
#[derive(Debug)]
pub struct Geometry {
    handle: GpuHandle,
    topology: PrimitiveTopology,
    attributes: BTreeMap<u32, (Guid, VertexAttributeLayout)>,
    elements: ElementRange,
}

impl Geometry {
    /// Builds the vertex array.
    ///
    /// Each `(location, id, buffer)` is bound in order and its layout described;
    /// the element buffer is captured last. A location listed twice keeps the last
    /// buffer. Buffers of the wrong kind are rejected before anything is allocated.
    pub fn new(
        backend: &mut dyn GraphicsBackend,
        topology: PrimitiveTopology,
        vertex_buffers: &[(u32, Guid, &Buffer)],
        element_buffer: (Guid, &Buffer),
    ) -> Result<Self, ResourceError> {
        for (location, _, buffer) in vertex_buffers {
            if buffer.descriptor().kind != BufferKind::Vertex {
                return Err(ResourceError::InvalidDescriptor(format!(
                    "attribute location {location} is bound to an element buffer"
                )));
            }
        }
        let (element_id, elements) = element_buffer;
        let element_desc = elements.descriptor();
        let index_type = match (element_desc.kind, IndexType::from_attribute_type(element_desc.attribute_type)) {
            (BufferKind::Element, Some(index_type)) => index_type,
            _ => {
                return Err(ResourceError::InvalidDescriptor(
                    "geometry needs an element buffer of unsigned indices".to_string(),
                ))
            }
        };

        let handle = backend.create_vertex_array()?;
        backend.bind_vertex_array(handle);

        let mut attributes = BTreeMap::new();
        for (location, id, buffer) in vertex_buffers {
            let desc = buffer.descriptor();
            let layout = VertexAttributeLayout {
                location: *location,
                attribute_type: desc.attribute_type,
                components: desc.components,
                stride: desc.unit_size(),
                normalized: desc.normalized,
                iteration: desc.iteration,
            };
            backend.bind_buffer(BufferKind::Vertex, buffer.handle());
            backend.vertex_attribute(&layout);
            attributes.insert(*location, (*id, layout));
        }
        backend.bind_buffer(BufferKind::Element, elements.handle());

        backend.bind_vertex_array(GpuHandle::NONE);
        backend.bind_buffer(BufferKind::Vertex, GpuHandle::NONE);

        let count = u32::try_from(element_desc.unit_count()).map_err(|_| {
            ResourceError::InvalidDescriptor("element count exceeds u32".to_string())
        })?;
        log::debug!(
            "Created geometry {:?} with {} attribute(s) and {} indices",
            handle,
            attributes.len(),
            count
        );

        Ok(Self {
            handle,
            topology,
            attributes,
            elements: ElementRange {
                buffer: element_id,
                index_type,
                count,
            },
        })
    }

    /// The vertex array object name.
    pub fn handle(&self) -> GpuHandle {
        self.handle
    }

    /// The primitive topology used by draws.
    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    /// Attribute location → (buffer id, layout), ordered by location.
    pub fn attributes(&self) -> &BTreeMap<u32, (Guid, VertexAttributeLayout)> {
        &self.attributes
    }

    /// The element buffer and the range drawn from it.
    pub fn elements(&self) -> &ElementRange {
        &self.elements
    }

    /// Every buffer this geometry reads from.
    pub fn buffer_ids(&self) -> impl Iterator<Item = Guid> + '_ {
        self.attributes
            .values()
            .map(|(id, _)| *id)
            .chain(std::iter::once(self.elements.buffer))
    }

    /// Re-reads the index count after the element buffer was reallocated.
    pub(crate) fn refresh_element_count(&mut self, elements: &BufferDescriptor) {
        self.elements.count = u32::try_from(elements.unit_count()).unwrap_or(u32::MAX);
    }

    pub(crate) fn release(&mut self, backend: &mut dyn GraphicsBackend) {
        if !self.handle.is_none() {
            backend.delete_vertex_array(self.handle);
            self.handle = GpuHandle::NONE;
        }
    }
}

impl Bindable for Geometry {
    fn bind(&self, backend: &mut dyn GraphicsBackend) {
        backend.bind_vertex_array(self.handle);
    }

    fn unbind(&self, backend: &mut dyn GraphicsBackend) {
        backend.bind_vertex_array(GpuHandle::NONE);
    }
}

impl Drawable for Geometry {
    fn draw(&self, backend: &mut dyn GraphicsBackend) {
        backend.draw_elements(self.topology, self.elements.count, self.elements.index_type, 0);
    }

    fn instanced_draw(&self, backend: &mut dyn GraphicsBackend, instances: u32) {
        backend.draw_elements_instanced(
            self.topology,
            self.elements.count,
            self.elements.index_type,
            0,
            instances,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::BufferUsage;
    use crate::renderer::headless::{GpuCommand, HeadlessBackend};

    fn triangle(backend: &mut HeadlessBackend) -> (Buffer, Buffer) {
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let bytes: &[u8] = bytemuck::cast_slice(&positions);
        let vb = Buffer::new(
            backend,
            BufferDescriptor::vertex(BufferUsage::Static, AttributeType::Float, 3, bytes.len()),
            Some(bytes),
        )
        .unwrap();
        let indices: [u32; 3] = [0, 1, 2];
        let ib = Buffer::new(
            backend,
            BufferDescriptor::element(BufferUsage::Static, IndexType::U32, 12),
            Some(bytemuck::cast_slice(&indices)),
        )
        .unwrap();
        (vb, ib)
    }

    #[test]
    fn build_binds_buffers_inside_vertex_array() {
        let mut backend = HeadlessBackend::new();
        let (vb, ib) = triangle(&mut backend);
        backend.clear_commands();

        let geometry = Geometry::new(
            &mut backend,
            PrimitiveTopology::Triangles,
            &[(0, Guid::new(), &vb)],
            (Guid::new(), &ib),
        )
        .unwrap();

        let cmds = backend.commands();
        let vao = geometry.handle();
        assert_eq!(cmds[1], GpuCommand::BindVertexArray(vao));
        assert_eq!(cmds[2], GpuCommand::BindBuffer(BufferKind::Vertex, vb.handle()));
        assert!(matches!(cmds[3], GpuCommand::VertexAttribute(l) if l.location == 0 && l.stride == 12));
        assert_eq!(cmds[4], GpuCommand::BindBuffer(BufferKind::Element, ib.handle()));
        assert_eq!(cmds[5], GpuCommand::BindVertexArray(GpuHandle::NONE));
        assert_eq!(geometry.elements().count, 3);
    }

    #[test]
    fn draw_spans_all_indices() {
        let mut backend = HeadlessBackend::new();
        let (vb, ib) = triangle(&mut backend);
        let geometry = Geometry::new(
            &mut backend,
            PrimitiveTopology::Triangles,
            &[(0, Guid::new(), &vb)],
            (Guid::new(), &ib),
        )
        .unwrap();
        backend.clear_commands();

        geometry.draw(&mut backend);
        geometry.instanced_draw(&mut backend, 4);

        assert_eq!(
            backend.commands(),
            &[
                GpuCommand::DrawElements {
                    topology: PrimitiveTopology::Triangles,
                    count: 3,
                    index_type: IndexType::U32,
                    offset: 0,
                    instances: None,
                },
                GpuCommand::DrawElements {
                    topology: PrimitiveTopology::Triangles,
                    count: 3,
                    index_type: IndexType::U32,
                    offset: 0,
                    instances: Some(4),
                },
            ]
        );
    }

    #[test]
    fn element_buffer_as_attribute_is_rejected() {
        let mut backend = HeadlessBackend::new();
        let (_, ib) = triangle(&mut backend);
        let before = backend.allocations();
        let err = Geometry::new(
            &mut backend,
            PrimitiveTopology::Triangles,
            &[(0, Guid::new(), &ib)],
            (Guid::new(), &ib),
        )
        .unwrap_err();
        assert!(matches!(err, ResourceError::InvalidDescriptor(_)));
        assert_eq!(backend.allocations(), before);
    }

    #[test]
    fn per_instance_buffers_keep_their_iteration() {
        let mut backend = HeadlessBackend::new();
        let (vb, ib) = triangle(&mut backend);
        let offsets = Buffer::new(
            &mut backend,
            BufferDescriptor::vertex(BufferUsage::Dynamic, AttributeType::Float, 4, 32).per_instance(),
            None,
        )
        .unwrap();
        let geometry = Geometry::new(
            &mut backend,
            PrimitiveTopology::Triangles,
            &[(0, Guid::new(), &vb), (3, Guid::new(), &offsets)],
            (Guid::new(), &ib),
        )
        .unwrap();
        let (_, layout) = geometry.attributes()[&3];
        assert_eq!(layout.iteration, Iteration::PerInstance);
        assert_eq!(layout.stride, 16);
        assert_eq!(geometry.buffer_ids().count(), 3);
    }
}
