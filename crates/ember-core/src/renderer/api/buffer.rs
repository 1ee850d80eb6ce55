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

//! Typed GPU buffers holding vertex attributes or element indices.

use crate::renderer::api::GpuHandle;
use crate::renderer::error::ResourceError;
use crate::renderer::traits::GraphicsBackend;
use serde::{Deserialize, Serialize};

/// The binding target a buffer is created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferKind {
    /// Per-vertex or per-instance attribute data.
    Vertex,
    /// Element indices.
    Element,
}

/// A hint describing how often the buffer contents change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferUsage {
    /// Written once, drawn many times.
    #[default]
    Static,
    /// Rewritten occasionally, drawn many times.
    Dynamic,
    /// Rewritten every frame.
    Stream,
}

/// The scalar type of each component stored in a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeType {
    /// `i8`
    Byte,
    /// `u8`
    UnsignedByte,
    /// `i16`
    Short,
    /// `u16`
    UnsignedShort,
    /// `i32`
    Int,
    /// `u32`
    UnsignedInt,
    /// `f32`
    Float,
}

impl AttributeType {
    /// Size of one component in bytes.
    pub fn size(&self) -> usize {
        match self {
            AttributeType::Byte | AttributeType::UnsignedByte => 1,
            AttributeType::Short | AttributeType::UnsignedShort => 2,
            AttributeType::Int | AttributeType::UnsignedInt | AttributeType::Float => 4,
        }
    }

    /// Returns `true` for types fed to the shader as integers rather than floats.
    pub fn is_integer(&self) -> bool {
        !matches!(self, AttributeType::Float)
    }
}

/// How often an attribute advances while drawing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Iteration {
    /// Advance once per vertex.
    #[default]
    PerVertex,
    /// Advance once per drawn instance.
    PerInstance,
}

/// The integer type of an element buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    /// 8-bit indices.
    U8,
    /// 16-bit indices.
    U16,
    /// 32-bit indices.
    U32,
}

impl IndexType {
    /// Maps an attribute type onto an index type, if it is an unsigned integer.
    pub fn from_attribute_type(ty: AttributeType) -> Option<Self> {
        match ty {
            AttributeType::UnsignedByte => Some(IndexType::U8),
            AttributeType::UnsignedShort => Some(IndexType::U16),
            AttributeType::UnsignedInt => Some(IndexType::U32),
            _ => None,
        }
    }

    /// Size of one index in bytes.
    pub fn size(&self) -> usize {
        match self {
            IndexType::U8 => 1,
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// Describes a buffer's layout without owning any GPU memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferDescriptor {
    /// Vertex or element buffer.
    pub kind: BufferKind,
    /// Update-frequency hint.
    pub usage: BufferUsage,
    /// Scalar type of each component.
    pub attribute_type: AttributeType,
    /// Number of components per unit (e.g. 3 for a `vec3` position, 1 for an index).
    pub components: u32,
    /// Total size in bytes.
    pub size: usize,
    /// Whether integer data is normalized to `[0, 1]`/`[-1, 1]` when read as float.
    pub normalized: bool,
    /// Per-vertex or per-instance iteration.
    pub iteration: Iteration,
}

impl BufferDescriptor {
    /// A vertex buffer descriptor advancing per vertex.
    pub fn vertex(usage: BufferUsage, attribute_type: AttributeType, components: u32, size: usize) -> Self {
        Self {
            kind: BufferKind::Vertex,
            usage,
            attribute_type,
            components,
            size,
            normalized: false,
            iteration: Iteration::PerVertex,
        }
    }

    /// An element buffer descriptor.
    pub fn element(usage: BufferUsage, index_type: IndexType, size: usize) -> Self {
        let attribute_type = match index_type {
            IndexType::U8 => AttributeType::UnsignedByte,
            IndexType::U16 => AttributeType::UnsignedShort,
            IndexType::U32 => AttributeType::UnsignedInt,
        };
        Self {
            kind: BufferKind::Element,
            usage,
            attribute_type,
            components: 1,
            size,
            normalized: false,
            iteration: Iteration::PerVertex,
        }
    }

    /// Switches the descriptor to per-instance iteration.
    pub fn per_instance(mut self) -> Self {
        self.iteration = Iteration::PerInstance;
        self
    }

    /// Marks integer components as normalized.
    pub fn normalized(mut self) -> Self {
        self.normalized = true;
        self
    }

    /// Size of one unit (all components of one vertex/index) in bytes. Used as stride.
    pub fn unit_size(&self) -> usize {
        self.components as usize * self.attribute_type.size()
    }

    /// Number of whole units the buffer holds.
    pub fn unit_count(&self) -> usize {
        match self.unit_size() {
            0 => 0,
            unit => self.size / unit,
        }
    }

    fn validate(&self) -> Result<(), ResourceError> {
        if self.components == 0 || self.components > 4 {
            return Err(ResourceError::InvalidDescriptor(format!(
                "buffer unit must have 1 to 4 components, got {}",
                self.components
            )));
        }
        if self.kind == BufferKind::Element
            && IndexType::from_attribute_type(self.attribute_type).is_none()
        {
            return Err(ResourceError::InvalidDescriptor(format!(
                "element buffers need an unsigned index type, got {:?}",
                self.attribute_type
            )));
        }
        Ok(())
    }
}

/// A GPU buffer resource.
#[derive(Debug)]
pub struct Buffer {
    descriptor: BufferDescriptor,
    handle: GpuHandle,
}

impl Buffer {
    /// Allocates the buffer and uploads `data`, or leaves storage uninitialized if `None`.
    ///
    /// When data is given its length must equal `descriptor.size`.
    pub fn new(
        backend: &mut dyn GraphicsBackend,
        descriptor: BufferDescriptor,
        data: Option<&[u8]>,
    ) -> Result<Self, ResourceError> {
        descriptor.validate()?;
        check_len(descriptor.size, data)?;

        let handle = backend.create_buffer()?;
        backend.bind_buffer(descriptor.kind, handle);
        backend.buffer_data(descriptor.kind, descriptor.size, data, descriptor.usage);
        backend.bind_buffer(descriptor.kind, GpuHandle::NONE);

        log::debug!(
            "Created {:?} buffer {:?} ({} bytes, {:?})",
            descriptor.kind,
            handle,
            descriptor.size,
            descriptor.usage
        );
        Ok(Self { descriptor, handle })
    }

    /// The buffer's current layout.
    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }

    /// The backend object name.
    pub fn handle(&self) -> GpuHandle {
        self.handle
    }

    /// Replaces the whole store with `size` bytes, initialized from `data` if given.
    pub fn reallocate_data(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        data: Option<&[u8]>,
        size: usize,
    ) -> Result<(), ResourceError> {
        check_len(size, data)?;
        let kind = self.descriptor.kind;
        backend.bind_buffer(kind, self.handle);
        backend.buffer_data(kind, size, data, self.descriptor.usage);
        backend.bind_buffer(kind, GpuHandle::NONE);
        self.descriptor.size = size;
        Ok(())
    }

    /// Overwrites `data.len()` bytes starting at `offset` without reallocating.
    ///
    /// The written range must lie inside the current allocation.
    pub fn substitute_data(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        offset: usize,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        let end = offset.saturating_add(data.len());
        if end > self.descriptor.size {
            return Err(ResourceError::OutOfBounds {
                what: "buffer byte",
                index: end,
                len: self.descriptor.size,
            });
        }
        let kind = self.descriptor.kind;
        backend.bind_buffer(kind, self.handle);
        backend.buffer_sub_data(kind, offset, data);
        backend.bind_buffer(kind, GpuHandle::NONE);
        Ok(())
    }

    pub(crate) fn release(&mut self, backend: &mut dyn GraphicsBackend) {
        if !self.handle.is_none() {
            backend.delete_buffer(self.handle);
            self.handle = GpuHandle::NONE;
        }
    }
}

fn check_len(size: usize, data: Option<&[u8]>) -> Result<(), ResourceError> {
    match data {
        Some(bytes) if bytes.len() != size => Err(ResourceError::InvalidSize {
            expected: size,
            actual: bytes.len(),
        }),
        _ => Ok(()),
    }
}
