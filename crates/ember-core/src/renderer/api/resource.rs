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

//! The closed set of resources a device registers.

use crate::guid::Guid;
use crate::renderer::api::{
    Buffer, FrameBuffer, Geometry, GpuHandle, ResourceKind, ShaderCode, ShaderProgram, Texture,
};
use crate::renderer::error::ResourceError;
use crate::renderer::traits::{Bindable, Drawable, GraphicsBackend};

/// A registered RHI resource.
#[derive(Debug)]
pub enum RhiResource {
    /// A vertex or element buffer.
    Buffer(Buffer),
    /// A vertex array.
    Geometry(Geometry),
    /// One compiled shader stage.
    ShaderCode(ShaderCode),
    /// A linked program.
    ShaderProgram(ShaderProgram),
    /// A 2D texture or cube map.
    Texture(Texture),
    /// A render target.
    FrameBuffer(FrameBuffer),
}

macro_rules! typed_access {
    ($($variant:ident => $ty:ty, $as_ref:ident, $as_mut:ident;)*) => {
        impl RhiResource {
            $(
                #[doc = concat!("Borrows the resource as a [`", stringify!($ty), "`].")]
                pub fn $as_ref(&self, id: Guid) -> Result<&$ty, ResourceError> {
                    match self {
                        RhiResource::$variant(inner) => Ok(inner),
                        other => Err(other.wrong_kind(id, ResourceKind::$variant)),
                    }
                }

                #[doc = concat!("Mutably borrows the resource as a [`", stringify!($ty), "`].")]
                pub fn $as_mut(&mut self, id: Guid) -> Result<&mut $ty, ResourceError> {
                    match self {
                        RhiResource::$variant(inner) => Ok(inner),
                        other => Err(other.wrong_kind(id, ResourceKind::$variant)),
                    }
                }
            )*
        }
    };
}

typed_access! {
    Buffer => Buffer, as_buffer, as_buffer_mut;
    Geometry => Geometry, as_geometry, as_geometry_mut;
    ShaderCode => ShaderCode, as_shader_code, as_shader_code_mut;
    ShaderProgram => ShaderProgram, as_shader_program, as_shader_program_mut;
    Texture => Texture, as_texture, as_texture_mut;
    FrameBuffer => FrameBuffer, as_frame_buffer, as_frame_buffer_mut;
}

impl RhiResource {
    /// The resource kind.
    pub fn kind(&self) -> ResourceKind {
        match self {
            RhiResource::Buffer(_) => ResourceKind::Buffer,
            RhiResource::Geometry(_) => ResourceKind::Geometry,
            RhiResource::ShaderCode(_) => ResourceKind::ShaderCode,
            RhiResource::ShaderProgram(_) => ResourceKind::ShaderProgram,
            RhiResource::Texture(_) => ResourceKind::Texture,
            RhiResource::FrameBuffer(_) => ResourceKind::FrameBuffer,
        }
    }

    /// The backend object name.
    pub fn native_handle(&self) -> GpuHandle {
        match self {
            RhiResource::Buffer(r) => r.handle(),
            RhiResource::Geometry(r) => r.handle(),
            RhiResource::ShaderCode(r) => r.handle(),
            RhiResource::ShaderProgram(r) => r.handle(),
            RhiResource::Texture(r) => r.handle(),
            RhiResource::FrameBuffer(r) => r.handle(),
        }
    }

    /// The resource as something that can be bound, if it is one.
    pub fn as_bindable(&self) -> Option<&dyn Bindable> {
        match self {
            RhiResource::Geometry(r) => Some(r),
            RhiResource::ShaderProgram(r) => Some(r),
            RhiResource::FrameBuffer(r) => Some(r),
            _ => None,
        }
    }

    /// The resource as something that can draw, if it is one.
    pub fn as_drawable(&self) -> Option<&dyn Drawable> {
        match self {
            RhiResource::Geometry(r) => Some(r),
            _ => None,
        }
    }

    /// Deletes the backend object. The resource is unusable afterwards.
    pub(crate) fn release(&mut self, backend: &mut dyn GraphicsBackend) {
        match self {
            RhiResource::Buffer(r) => r.release(backend),
            RhiResource::Geometry(r) => r.release(backend),
            RhiResource::ShaderCode(r) => r.release(backend),
            RhiResource::ShaderProgram(r) => r.release(backend),
            RhiResource::Texture(r) => r.release(backend),
            RhiResource::FrameBuffer(r) => r.release(backend),
        }
    }

    fn wrong_kind(&self, id: Guid, expected: ResourceKind) -> ResourceError {
        ResourceError::WrongKind {
            id,
            expected,
            found: self.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::{AttributeType, BufferDescriptor, BufferUsage};
    use crate::renderer::headless::HeadlessBackend;

    #[test]
    fn typed_access_reports_kind_mismatch() {
        let mut backend = HeadlessBackend::new();
        let buffer = Buffer::new(
            &mut backend,
            BufferDescriptor::vertex(BufferUsage::Static, AttributeType::Float, 3, 12),
            None,
        )
        .unwrap();
        let resource = RhiResource::Buffer(buffer);
        let id = Guid::new();

        assert!(resource.as_buffer(id).is_ok());
        assert_eq!(
            resource.as_texture(id).unwrap_err(),
            ResourceError::WrongKind {
                id,
                expected: ResourceKind::Texture,
                found: ResourceKind::Buffer
            }
        );
        assert!(resource.as_bindable().is_none());
        assert!(resource.as_drawable().is_none());
    }

    #[test]
    fn release_nulls_the_handle() {
        let mut backend = HeadlessBackend::new();
        let buffer = Buffer::new(
            &mut backend,
            BufferDescriptor::vertex(BufferUsage::Static, AttributeType::Float, 3, 12),
            None,
        )
        .unwrap();
        let mut resource = RhiResource::Buffer(buffer);
        resource.release(&mut backend);
        assert!(resource.native_handle().is_none());
        assert_eq!(backend.live_buffers(), 0);
    }
}
