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

//! Mapping between ember's RHI enums and OpenGL enumerants.

use ember_core::renderer::{
    Attachment, AttributeType, BlendFactor, BlendOperation, BufferKind, BufferUsage, Capability,
    ClearFlags, CompareFunction, CubeFace, Face, FilterMode, FilterTarget, FramebufferStatus,
    FrontFace, GpuError, IndexType, PixelFormat, PrimitiveTopology, ShaderStage, StencilOperation,
    TextureDataType, TextureFormat, TextureTarget, TextureType, WrapAxis, WrapMode,
};

/// A local extension trait to convert engine enums into GL enumerants.
/// Keeps an idiomatic `.into_gl()` syntax without running into the orphan rules.
pub trait IntoGl {
    /// Consumes self and returns the matching `GLenum`.
    fn into_gl(self) -> u32;
}

// --- Buffers and vertex data ---

impl IntoGl for BufferKind {
    fn into_gl(self) -> u32 {
        match self {
            BufferKind::Vertex => glow::ARRAY_BUFFER,
            BufferKind::Element => glow::ELEMENT_ARRAY_BUFFER,
        }
    }
}

impl IntoGl for BufferUsage {
    fn into_gl(self) -> u32 {
        match self {
            BufferUsage::Static => glow::STATIC_DRAW,
            BufferUsage::Dynamic => glow::DYNAMIC_DRAW,
            BufferUsage::Stream => glow::STREAM_DRAW,
        }
    }
}

impl IntoGl for AttributeType {
    fn into_gl(self) -> u32 {
        match self {
            AttributeType::Byte => glow::BYTE,
            AttributeType::UnsignedByte => glow::UNSIGNED_BYTE,
            AttributeType::Short => glow::SHORT,
            AttributeType::UnsignedShort => glow::UNSIGNED_SHORT,
            AttributeType::Int => glow::INT,
            AttributeType::UnsignedInt => glow::UNSIGNED_INT,
            AttributeType::Float => glow::FLOAT,
        }
    }
}

impl IntoGl for IndexType {
    fn into_gl(self) -> u32 {
        match self {
            IndexType::U8 => glow::UNSIGNED_BYTE,
            IndexType::U16 => glow::UNSIGNED_SHORT,
            IndexType::U32 => glow::UNSIGNED_INT,
        }
    }
}

impl IntoGl for PrimitiveTopology {
    fn into_gl(self) -> u32 {
        match self {
            PrimitiveTopology::Points => glow::POINTS,
            PrimitiveTopology::Lines => glow::LINES,
            PrimitiveTopology::LineStrip => glow::LINE_STRIP,
            PrimitiveTopology::Triangles => glow::TRIANGLES,
            PrimitiveTopology::TriangleStrip => glow::TRIANGLE_STRIP,
        }
    }
}

impl IntoGl for ShaderStage {
    fn into_gl(self) -> u32 {
        match self {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Geometry => glow::GEOMETRY_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        }
    }
}

// --- Textures ---

impl IntoGl for TextureType {
    fn into_gl(self) -> u32 {
        match self {
            TextureType::Texture2D => glow::TEXTURE_2D,
            TextureType::CubeMap => glow::TEXTURE_CUBE_MAP,
        }
    }
}

impl IntoGl for CubeFace {
    fn into_gl(self) -> u32 {
        match self {
            CubeFace::PositiveX => glow::TEXTURE_CUBE_MAP_POSITIVE_X,
            CubeFace::NegativeX => glow::TEXTURE_CUBE_MAP_NEGATIVE_X,
            CubeFace::PositiveY => glow::TEXTURE_CUBE_MAP_POSITIVE_Y,
            CubeFace::NegativeY => glow::TEXTURE_CUBE_MAP_NEGATIVE_Y,
            CubeFace::PositiveZ => glow::TEXTURE_CUBE_MAP_POSITIVE_Z,
            CubeFace::NegativeZ => glow::TEXTURE_CUBE_MAP_NEGATIVE_Z,
        }
    }
}

impl IntoGl for TextureTarget {
    fn into_gl(self) -> u32 {
        match self {
            TextureTarget::Texture2D => glow::TEXTURE_2D,
            TextureTarget::CubeFace(face) => face.into_gl(),
        }
    }
}

impl IntoGl for TextureFormat {
    fn into_gl(self) -> u32 {
        match self {
            TextureFormat::R8 => glow::R8,
            TextureFormat::Rg8 => glow::RG8,
            TextureFormat::Rgb8 => glow::RGB8,
            TextureFormat::Rgba8 => glow::RGBA8,
            TextureFormat::Srgb8 => glow::SRGB8,
            TextureFormat::Srgb8Alpha8 => glow::SRGB8_ALPHA8,
            TextureFormat::R16F => glow::R16F,
            TextureFormat::Rgba16F => glow::RGBA16F,
            TextureFormat::R32F => glow::R32F,
            TextureFormat::Rgba32F => glow::RGBA32F,
            TextureFormat::Depth24 => glow::DEPTH_COMPONENT24,
            TextureFormat::Depth32F => glow::DEPTH_COMPONENT32F,
            TextureFormat::Depth24Stencil8 => glow::DEPTH24_STENCIL8,
        }
    }
}

impl IntoGl for PixelFormat {
    fn into_gl(self) -> u32 {
        match self {
            PixelFormat::Red => glow::RED,
            PixelFormat::Rg => glow::RG,
            PixelFormat::Rgb => glow::RGB,
            PixelFormat::Rgba => glow::RGBA,
            PixelFormat::Depth => glow::DEPTH_COMPONENT,
            PixelFormat::DepthStencil => glow::DEPTH_STENCIL,
        }
    }
}

impl IntoGl for TextureDataType {
    fn into_gl(self) -> u32 {
        match self {
            TextureDataType::UnsignedByte => glow::UNSIGNED_BYTE,
            TextureDataType::Int => glow::INT,
            TextureDataType::Float => glow::FLOAT,
            TextureDataType::UnsignedInt248 => glow::UNSIGNED_INT_24_8,
        }
    }
}

impl IntoGl for WrapAxis {
    fn into_gl(self) -> u32 {
        match self {
            WrapAxis::U => glow::TEXTURE_WRAP_S,
            WrapAxis::V => glow::TEXTURE_WRAP_T,
            WrapAxis::W => glow::TEXTURE_WRAP_R,
        }
    }
}

impl IntoGl for WrapMode {
    fn into_gl(self) -> u32 {
        match self {
            WrapMode::Repeat => glow::REPEAT,
            WrapMode::MirroredRepeat => glow::MIRRORED_REPEAT,
            WrapMode::ClampToEdge => glow::CLAMP_TO_EDGE,
            WrapMode::ClampToBorder => glow::CLAMP_TO_BORDER,
        }
    }
}

impl IntoGl for FilterTarget {
    fn into_gl(self) -> u32 {
        match self {
            FilterTarget::Min => glow::TEXTURE_MIN_FILTER,
            FilterTarget::Mag => glow::TEXTURE_MAG_FILTER,
        }
    }
}

impl IntoGl for FilterMode {
    fn into_gl(self) -> u32 {
        match self {
            FilterMode::Nearest => glow::NEAREST,
            FilterMode::Linear => glow::LINEAR,
            FilterMode::NearestMipmapNearest => glow::NEAREST_MIPMAP_NEAREST,
            FilterMode::LinearMipmapNearest => glow::LINEAR_MIPMAP_NEAREST,
            FilterMode::NearestMipmapLinear => glow::NEAREST_MIPMAP_LINEAR,
            FilterMode::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
        }
    }
}

// --- Frame buffers ---

impl IntoGl for Attachment {
    fn into_gl(self) -> u32 {
        match self {
            Attachment::Color(index) => glow::COLOR_ATTACHMENT0 + index,
            Attachment::Depth => glow::DEPTH_ATTACHMENT,
            Attachment::DepthStencil => glow::DEPTH_STENCIL_ATTACHMENT,
        }
    }
}

impl IntoGl for ClearFlags {
    fn into_gl(self) -> u32 {
        let mut mask = 0;
        if self.color {
            mask |= glow::COLOR_BUFFER_BIT;
        }
        if self.depth {
            mask |= glow::DEPTH_BUFFER_BIT;
        }
        if self.stencil {
            mask |= glow::STENCIL_BUFFER_BIT;
        }
        mask
    }
}

// --- Fixed-function state ---

impl IntoGl for Capability {
    fn into_gl(self) -> u32 {
        match self {
            Capability::Blend => glow::BLEND,
            Capability::CullFace => glow::CULL_FACE,
            Capability::DepthTest => glow::DEPTH_TEST,
            Capability::PolygonOffsetFill => glow::POLYGON_OFFSET_FILL,
            Capability::StencilTest => glow::STENCIL_TEST,
        }
    }
}

impl IntoGl for CompareFunction {
    fn into_gl(self) -> u32 {
        match self {
            CompareFunction::Never => glow::NEVER,
            CompareFunction::Less => glow::LESS,
            CompareFunction::Equal => glow::EQUAL,
            CompareFunction::LessEqual => glow::LEQUAL,
            CompareFunction::Greater => glow::GREATER,
            CompareFunction::NotEqual => glow::NOTEQUAL,
            CompareFunction::GreaterEqual => glow::GEQUAL,
            CompareFunction::Always => glow::ALWAYS,
        }
    }
}

impl IntoGl for StencilOperation {
    fn into_gl(self) -> u32 {
        match self {
            StencilOperation::Keep => glow::KEEP,
            StencilOperation::Zero => glow::ZERO,
            StencilOperation::Replace => glow::REPLACE,
            StencilOperation::Invert => glow::INVERT,
            StencilOperation::IncrementClamp => glow::INCR,
            StencilOperation::DecrementClamp => glow::DECR,
            StencilOperation::IncrementWrap => glow::INCR_WRAP,
            StencilOperation::DecrementWrap => glow::DECR_WRAP,
        }
    }
}

impl IntoGl for BlendFactor {
    fn into_gl(self) -> u32 {
        match self {
            BlendFactor::Zero => glow::ZERO,
            BlendFactor::One => glow::ONE,
            BlendFactor::SrcColor => glow::SRC_COLOR,
            BlendFactor::OneMinusSrcColor => glow::ONE_MINUS_SRC_COLOR,
            BlendFactor::SrcAlpha => glow::SRC_ALPHA,
            BlendFactor::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
            BlendFactor::DstColor => glow::DST_COLOR,
            BlendFactor::OneMinusDstColor => glow::ONE_MINUS_DST_COLOR,
            BlendFactor::DstAlpha => glow::DST_ALPHA,
            BlendFactor::OneMinusDstAlpha => glow::ONE_MINUS_DST_ALPHA,
        }
    }
}

impl IntoGl for BlendOperation {
    fn into_gl(self) -> u32 {
        match self {
            BlendOperation::Add => glow::FUNC_ADD,
            BlendOperation::Subtract => glow::FUNC_SUBTRACT,
            BlendOperation::ReverseSubtract => glow::FUNC_REVERSE_SUBTRACT,
            BlendOperation::Min => glow::MIN,
            BlendOperation::Max => glow::MAX,
        }
    }
}

impl IntoGl for Face {
    fn into_gl(self) -> u32 {
        match self {
            Face::Front => glow::FRONT,
            Face::Back => glow::BACK,
            Face::FrontAndBack => glow::FRONT_AND_BACK,
        }
    }
}

impl IntoGl for FrontFace {
    fn into_gl(self) -> u32 {
        match self {
            FrontFace::Ccw => glow::CCW,
            FrontFace::Cw => glow::CW,
        }
    }
}

// --- Queries ---

/// Decodes a `glGetError` code. `None` for `GL_NO_ERROR`.
pub fn gpu_error_from_gl(code: u32) -> Option<GpuError> {
    match code {
        glow::NO_ERROR => None,
        glow::INVALID_ENUM => Some(GpuError::InvalidEnum),
        glow::INVALID_VALUE => Some(GpuError::InvalidValue),
        glow::INVALID_OPERATION => Some(GpuError::InvalidOperation),
        glow::INVALID_FRAMEBUFFER_OPERATION => Some(GpuError::InvalidFramebufferOperation),
        glow::OUT_OF_MEMORY => Some(GpuError::OutOfMemory),
        other => Some(GpuError::Unknown(other)),
    }
}

/// Decodes a `glCheckFramebufferStatus` result.
pub fn framebuffer_status_from_gl(code: u32) -> FramebufferStatus {
    match code {
        glow::FRAMEBUFFER_COMPLETE => FramebufferStatus::Complete,
        glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => FramebufferStatus::IncompleteAttachment,
        glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => FramebufferStatus::MissingAttachment,
        glow::FRAMEBUFFER_INCOMPLETE_DRAW_BUFFER => FramebufferStatus::IncompleteDrawBuffer,
        glow::FRAMEBUFFER_INCOMPLETE_MULTISAMPLE => FramebufferStatus::IncompleteMultisample,
        glow::FRAMEBUFFER_UNSUPPORTED => FramebufferStatus::Unsupported,
        other => FramebufferStatus::Unknown(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_attachments_are_consecutive() {
        assert_eq!(Attachment::Color(0).into_gl(), glow::COLOR_ATTACHMENT0);
        assert_eq!(Attachment::Color(3).into_gl(), glow::COLOR_ATTACHMENT3);
    }

    #[test]
    fn test_clear_flags_combine_into_one_mask() {
        assert_eq!(
            ClearFlags::ALL.into_gl(),
            glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT | glow::STENCIL_BUFFER_BIT
        );
        let depth_only = ClearFlags {
            color: false,
            depth: true,
            stencil: false,
        };
        assert_eq!(depth_only.into_gl(), glow::DEPTH_BUFFER_BIT);
    }

    #[test]
    fn test_cube_face_targets_follow_gl_order() {
        let faces = [
            CubeFace::PositiveX,
            CubeFace::NegativeX,
            CubeFace::PositiveY,
            CubeFace::NegativeY,
            CubeFace::PositiveZ,
            CubeFace::NegativeZ,
        ];
        for (offset, face) in faces.into_iter().enumerate() {
            assert_eq!(
                TextureTarget::CubeFace(face).into_gl(),
                glow::TEXTURE_CUBE_MAP_POSITIVE_X + offset as u32
            );
        }
    }

    #[test]
    fn test_error_codes_decode() {
        assert_eq!(gpu_error_from_gl(glow::NO_ERROR), None);
        assert_eq!(
            gpu_error_from_gl(glow::INVALID_OPERATION),
            Some(GpuError::InvalidOperation)
        );
        assert_eq!(gpu_error_from_gl(0x1234), Some(GpuError::Unknown(0x1234)));
        assert_eq!(
            framebuffer_status_from_gl(glow::FRAMEBUFFER_COMPLETE),
            FramebufferStatus::Complete
        );
    }
}
