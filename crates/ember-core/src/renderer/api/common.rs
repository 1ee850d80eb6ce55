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

//! Handles and small enums shared by every part of the RHI.

use serde::{Deserialize, Serialize};

/// An opaque backend object name (buffer, texture, program, ...).
///
/// Zero is never a live object; it is returned for missing resources and is the
/// value bound to "unbind" a target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuHandle(pub u32);

impl GpuHandle {
    /// The null object.
    pub const NONE: Self = GpuHandle(0);

    /// Returns `true` for the null object.
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

/// The location of an active uniform inside a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// A programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShaderStage {
    /// Per-vertex stage.
    Vertex,
    /// Optional per-primitive stage.
    Geometry,
    /// Per-fragment stage.
    Fragment,
}

impl ShaderStage {
    /// A short, stable name used when deriving resource identifiers.
    pub fn name(&self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Fragment => "fragment",
        }
    }
}

/// The kind of a registered resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A vertex or element buffer.
    Buffer,
    /// A 2D or cube-map texture.
    Texture,
    /// A single compiled shader stage.
    ShaderCode,
    /// A linked shader program.
    ShaderProgram,
    /// A vertex array binding buffers to attribute locations.
    Geometry,
    /// A set of render target attachments.
    FrameBuffer,
    /// A compute dispatch. Reserved; no compute resource is implemented.
    ComputeTask,
}

/// How vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveTopology {
    /// Isolated points.
    Points,
    /// Isolated line segments.
    Lines,
    /// A connected line strip.
    LineStrip,
    /// Isolated triangles.
    #[default]
    Triangles,
    /// A connected triangle strip.
    TriangleStrip,
}

/// A fixed-function switch toggled with enable/disable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    /// Color blending.
    Blend,
    /// Face culling.
    CullFace,
    /// Depth testing.
    DepthTest,
    /// Depth offset for filled polygons.
    PolygonOffsetFill,
    /// Stencil testing.
    StencilTest,
}

/// Which buffers of the bound render target to clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClearFlags {
    /// Clear the color attachments.
    pub color: bool,
    /// Clear the depth attachment.
    pub depth: bool,
    /// Clear the stencil attachment.
    pub stencil: bool,
}

impl ClearFlags {
    /// Clear everything.
    pub const ALL: Self = Self {
        color: true,
        depth: true,
        stencil: true,
    };
    /// Clear only color.
    pub const COLOR: Self = Self {
        color: true,
        depth: false,
        stencil: false,
    };
}

/// An error reported by the GPU through the explicit error query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuError {
    /// An enum argument is out of range.
    InvalidEnum,
    /// A numeric argument is out of range.
    InvalidValue,
    /// The operation is not allowed in the current state.
    InvalidOperation,
    /// The bound framebuffer is not complete.
    InvalidFramebufferOperation,
    /// Not enough memory is left to execute the command.
    OutOfMemory,
    /// An error code this layer does not know about.
    Unknown(u32),
}

/// Basic information about the active backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendInfo {
    /// The backend's name, e.g. "OpenGL" or "Headless".
    pub name: String,
    /// The driver-reported version string.
    pub version: String,
    /// The renderer/device string.
    pub device: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handle() {
        assert!(GpuHandle::NONE.is_none());
        assert!(!GpuHandle(3).is_none());
        assert_eq!(GpuHandle::default(), GpuHandle::NONE);
    }

    #[test]
    fn stage_ordering_puts_vertex_first() {
        let mut stages = vec![ShaderStage::Fragment, ShaderStage::Vertex];
        stages.sort();
        assert_eq!(stages, vec![ShaderStage::Vertex, ShaderStage::Fragment]);
    }
}
