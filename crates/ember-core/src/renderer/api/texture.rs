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

//! 2D and cube-map textures.
//!
//! A texture's layout is described along three independent format axes: the storage
//! format on the GPU, the layout of uploaded pixels, and the scalar type of uploaded
//! pixels. Upload and storage formats do not have to match, e.g. sRGB storage fed
//! from plain 8-bit RGBA.

use crate::renderer::api::GpuHandle;
use crate::renderer::error::ResourceError;
use crate::renderer::traits::GraphicsBackend;
use serde::{Deserialize, Serialize};

/// The dimensionality of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureType {
    /// A single 2D image.
    Texture2D,
    /// Six square 2D faces.
    CubeMap,
}

/// One face of a cube map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CubeFace {
    /// +X
    PositiveX,
    /// -X
    NegativeX,
    /// +Y
    PositiveY,
    /// -Y
    NegativeY,
    /// +Z
    PositiveZ,
    /// -Z
    NegativeZ,
}

impl CubeFace {
    /// All faces in upload order.
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];
}

/// The image an upload or attachment targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    /// The image of a 2D texture.
    Texture2D,
    /// One face of a cube map.
    CubeFace(CubeFace),
}

/// GPU storage format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureFormat {
    /// One 8-bit channel.
    R8,
    /// Two 8-bit channels.
    Rg8,
    /// Three 8-bit channels.
    Rgb8,
    /// Four 8-bit channels.
    Rgba8,
    /// sRGB-encoded RGB.
    Srgb8,
    /// sRGB-encoded RGB with linear alpha.
    Srgb8Alpha8,
    /// One half-float channel.
    R16F,
    /// Four half-float channels.
    Rgba16F,
    /// One float channel.
    R32F,
    /// Four float channels.
    Rgba32F,
    /// 24-bit depth.
    Depth24,
    /// 32-bit float depth.
    Depth32F,
    /// 24-bit depth packed with 8-bit stencil.
    Depth24Stencil8,
}

impl TextureFormat {
    /// Returns `true` for depth or depth/stencil formats.
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth24 | TextureFormat::Depth32F | TextureFormat::Depth24Stencil8
        )
    }

    /// Returns `true` if the format carries a stencil component.
    pub fn has_stencil(&self) -> bool {
        matches!(self, TextureFormat::Depth24Stencil8)
    }

    /// The pixel layout and data type uploads for this format use by default.
    pub fn default_upload(&self) -> (PixelFormat, TextureDataType) {
        match self {
            TextureFormat::R8 => (PixelFormat::Red, TextureDataType::UnsignedByte),
            TextureFormat::Rg8 => (PixelFormat::Rg, TextureDataType::UnsignedByte),
            TextureFormat::Rgb8 | TextureFormat::Srgb8 => {
                (PixelFormat::Rgb, TextureDataType::UnsignedByte)
            }
            TextureFormat::Rgba8 | TextureFormat::Srgb8Alpha8 => {
                (PixelFormat::Rgba, TextureDataType::UnsignedByte)
            }
            TextureFormat::R16F | TextureFormat::R32F => (PixelFormat::Red, TextureDataType::Float),
            TextureFormat::Rgba16F | TextureFormat::Rgba32F => {
                (PixelFormat::Rgba, TextureDataType::Float)
            }
            TextureFormat::Depth24 | TextureFormat::Depth32F => {
                (PixelFormat::Depth, TextureDataType::Float)
            }
            TextureFormat::Depth24Stencil8 => {
                (PixelFormat::DepthStencil, TextureDataType::UnsignedInt248)
            }
        }
    }
}

/// Channel layout of uploaded pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// R
    Red,
    /// RG
    Rg,
    /// RGB
    Rgb,
    /// RGBA
    Rgba,
    /// Depth
    Depth,
    /// Depth and stencil
    DepthStencil,
}

impl PixelFormat {
    /// Number of channels.
    pub fn channels(&self) -> usize {
        match self {
            PixelFormat::Red | PixelFormat::Depth | PixelFormat::DepthStencil => 1,
            PixelFormat::Rg => 2,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// Scalar type of uploaded pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureDataType {
    /// 8-bit unsigned.
    UnsignedByte,
    /// 32-bit signed.
    Int,
    /// 32-bit float.
    Float,
    /// Packed 24-bit depth and 8-bit stencil.
    UnsignedInt248,
}

impl TextureDataType {
    /// Size of one channel in bytes.
    pub fn size(&self) -> usize {
        match self {
            TextureDataType::UnsignedByte => 1,
            TextureDataType::Int | TextureDataType::Float | TextureDataType::UnsignedInt248 => 4,
        }
    }
}

/// The three format axes of an image upload, as handed to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureFormatSpec {
    /// Storage format.
    pub internal: TextureFormat,
    /// Uploaded channel layout.
    pub pixel: PixelFormat,
    /// Uploaded scalar type.
    pub data_type: TextureDataType,
}

impl TextureFormatSpec {
    /// Bytes a tightly packed `width` × `height` upload occupies.
    pub fn image_size(&self, width: u32, height: u32) -> usize {
        width as usize * height as usize * self.pixel.channels() * self.data_type.size()
    }
}

/// A texture coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WrapAxis {
    /// Horizontal (S).
    U,
    /// Vertical (T).
    V,
    /// Depth (R), meaningful for cube maps.
    W,
}

impl WrapAxis {
    fn index(self) -> usize {
        match self {
            WrapAxis::U => 0,
            WrapAxis::V => 1,
            WrapAxis::W => 2,
        }
    }
}

/// Behavior outside `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WrapMode {
    /// Tile.
    #[default]
    Repeat,
    /// Tile, mirroring every other repeat.
    MirroredRepeat,
    /// Clamp to the edge texel.
    ClampToEdge,
    /// Clamp to the border color.
    ClampToBorder,
}

/// Which filter a [`FilterMode`] applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FilterTarget {
    /// Minification.
    Min,
    /// Magnification.
    Mag,
}

/// Texel sampling filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterMode {
    /// Nearest texel.
    Nearest,
    /// Bilinear.
    #[default]
    Linear,
    /// Nearest texel of the nearest mip.
    NearestMipmapNearest,
    /// Bilinear within the nearest mip.
    LinearMipmapNearest,
    /// Nearest texel, blended between mips.
    NearestMipmapLinear,
    /// Trilinear.
    LinearMipmapLinear,
}

impl FilterMode {
    /// Returns `true` if sampling reads mip levels.
    pub fn uses_mipmaps(&self) -> bool {
        !matches!(self, FilterMode::Nearest | FilterMode::Linear)
    }
}

/// Describes a texture's shape, formats and sampling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureDescriptor {
    /// 2D or cube map.
    pub texture_type: TextureType,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Storage format.
    pub format: TextureFormat,
    /// Uploaded channel layout.
    pub pixel_format: PixelFormat,
    /// Uploaded scalar type.
    pub data_type: TextureDataType,
    /// Wrap mode applied to every axis at creation. Later per-axis changes are
    /// reported by [`Texture::wrap`], not here.
    pub wrap: WrapMode,
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// The texture is sampled through a mip chain. The chain itself is only built
    /// by an explicit [`Texture::generate_mipmaps`] call.
    pub mipmaps: bool,
}

impl TextureDescriptor {
    /// A 2D texture uploaded with the format's default pixel layout.
    pub fn texture_2d(width: u32, height: u32, format: TextureFormat) -> Self {
        let (pixel_format, data_type) = format.default_upload();
        Self {
            texture_type: TextureType::Texture2D,
            width,
            height,
            format,
            pixel_format,
            data_type,
            wrap: WrapMode::Repeat,
            min_filter: FilterMode::Linear,
            mag_filter: FilterMode::Linear,
            mipmaps: false,
        }
    }

    /// A cube map with square faces of `size` texels.
    pub fn cube_map(size: u32, format: TextureFormat) -> Self {
        Self {
            texture_type: TextureType::CubeMap,
            wrap: WrapMode::ClampToEdge,
            ..Self::texture_2d(size, size, format)
        }
    }

    /// Overrides the uploaded pixel layout and scalar type.
    pub fn with_upload(mut self, pixel_format: PixelFormat, data_type: TextureDataType) -> Self {
        self.pixel_format = pixel_format;
        self.data_type = data_type;
        self
    }

    /// Requests trilinear filtering with a generated mip chain.
    pub fn with_mipmaps(mut self) -> Self {
        self.mipmaps = true;
        self.min_filter = FilterMode::LinearMipmapLinear;
        self
    }

    /// The upload format triple.
    pub fn format_spec(&self) -> TextureFormatSpec {
        TextureFormatSpec {
            internal: self.format,
            pixel: self.pixel_format,
            data_type: self.data_type,
        }
    }

    fn validate(&self) -> Result<(), ResourceError> {
        if self.width == 0 || self.height == 0 {
            return Err(ResourceError::InvalidDescriptor(format!(
                "texture size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.texture_type == TextureType::CubeMap && self.width != self.height {
            return Err(ResourceError::InvalidDescriptor(format!(
                "cube map faces must be square, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// A 2D or cube-map texture resource.
#[derive(Debug)]
pub struct Texture {
    descriptor: TextureDescriptor,
    handle: GpuHandle,
    wrap: [WrapMode; 3],
    uploaded_faces: Vec<CubeFace>,
}

impl Texture {
    /// Allocates a 2D texture and uploads `data` if given.
    pub fn new_2d(
        backend: &mut dyn GraphicsBackend,
        descriptor: TextureDescriptor,
        data: Option<&[u8]>,
    ) -> Result<Self, ResourceError> {
        if descriptor.texture_type != TextureType::Texture2D {
            return Err(ResourceError::InvalidDescriptor(
                "expected a 2D texture descriptor".to_string(),
            ));
        }
        descriptor.validate()?;
        let spec = descriptor.format_spec();
        check_image(&spec, descriptor.width, descriptor.height, data)?;

        let mut texture = Self::allocate(backend, descriptor)?;
        backend.tex_image_2d(
            TextureTarget::Texture2D,
            descriptor.width,
            descriptor.height,
            &spec,
            data,
        );
        texture.finish(backend);
        Ok(texture)
    }

    /// Allocates a cube map and uploads the faces given. Missing faces are left
    /// undefined without error.
    pub fn new_cube_map(
        backend: &mut dyn GraphicsBackend,
        descriptor: TextureDescriptor,
        faces: &[(CubeFace, &[u8])],
    ) -> Result<Self, ResourceError> {
        if descriptor.texture_type != TextureType::CubeMap {
            return Err(ResourceError::InvalidDescriptor(
                "expected a cube map descriptor".to_string(),
            ));
        }
        descriptor.validate()?;
        let spec = descriptor.format_spec();
        for (_, pixels) in faces {
            check_image(&spec, descriptor.width, descriptor.height, Some(pixels))?;
        }

        let mut texture = Self::allocate(backend, descriptor)?;
        for (face, pixels) in faces {
            backend.tex_image_2d(
                TextureTarget::CubeFace(*face),
                descriptor.width,
                descriptor.height,
                &spec,
                Some(pixels),
            );
            texture.mark_uploaded(*face);
        }
        if faces.len() < CubeFace::ALL.len() {
            log::debug!(
                "Cube map {:?} created with {} of 6 faces",
                texture.handle,
                faces.len()
            );
        }
        texture.finish(backend);
        Ok(texture)
    }

    fn allocate(
        backend: &mut dyn GraphicsBackend,
        descriptor: TextureDescriptor,
    ) -> Result<Self, ResourceError> {
        let handle = backend.create_texture()?;
        let ty = descriptor.texture_type;
        backend.bind_texture(ty, handle);
        backend.tex_wrap(ty, WrapAxis::U, descriptor.wrap);
        backend.tex_wrap(ty, WrapAxis::V, descriptor.wrap);
        if ty == TextureType::CubeMap {
            backend.tex_wrap(ty, WrapAxis::W, descriptor.wrap);
        }
        backend.tex_filter(ty, FilterTarget::Min, descriptor.min_filter);
        backend.tex_filter(ty, FilterTarget::Mag, descriptor.mag_filter);
        Ok(Self {
            descriptor,
            handle,
            wrap: [descriptor.wrap; 3],
            uploaded_faces: Vec::new(),
        })
    }

    fn finish(&mut self, backend: &mut dyn GraphicsBackend) {
        let ty = self.descriptor.texture_type;
        backend.bind_texture(ty, GpuHandle::NONE);
        log::debug!(
            "Created {:?} texture {:?} ({}x{}, {:?})",
            ty,
            self.handle,
            self.descriptor.width,
            self.descriptor.height,
            self.descriptor.format
        );
    }

    fn mark_uploaded(&mut self, face: CubeFace) {
        if !self.uploaded_faces.contains(&face) {
            self.uploaded_faces.push(face);
            self.uploaded_faces.sort();
        }
    }

    /// The texture's layout and sampling parameters.
    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.descriptor
    }

    /// The backend object name.
    pub fn handle(&self) -> GpuHandle {
        self.handle
    }

    /// The faces of a cube map that have received data, in face order.
    pub fn uploaded_faces(&self) -> &[CubeFace] {
        &self.uploaded_faces
    }

    /// Binds the texture on texture unit `slot`.
    pub fn bind_at(&self, backend: &mut dyn GraphicsBackend, slot: u32) {
        backend.active_texture(slot);
        backend.bind_texture(self.descriptor.texture_type, self.handle);
    }

    /// Unbinds whatever texture of this type is bound on `slot`.
    pub fn unbind_at(&self, backend: &mut dyn GraphicsBackend, slot: u32) {
        backend.active_texture(slot);
        backend.bind_texture(self.descriptor.texture_type, GpuHandle::NONE);
    }

    /// Sets the wrap mode of one axis.
    pub fn set_wrap(&mut self, backend: &mut dyn GraphicsBackend, axis: WrapAxis, mode: WrapMode) {
        let ty = self.descriptor.texture_type;
        backend.bind_texture(ty, self.handle);
        backend.tex_wrap(ty, axis, mode);
        backend.bind_texture(ty, GpuHandle::NONE);
        self.wrap[axis.index()] = mode;
    }

    /// The current wrap mode of `axis`.
    pub fn wrap(&self, axis: WrapAxis) -> WrapMode {
        self.wrap[axis.index()]
    }

    /// Sets the minification or magnification filter.
    pub fn set_filter(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        target: FilterTarget,
        mode: FilterMode,
    ) {
        let ty = self.descriptor.texture_type;
        backend.bind_texture(ty, self.handle);
        backend.tex_filter(ty, target, mode);
        backend.bind_texture(ty, GpuHandle::NONE);
        match target {
            FilterTarget::Min => self.descriptor.min_filter = mode,
            FilterTarget::Mag => self.descriptor.mag_filter = mode,
        }
    }

    /// Generates the mip chain from the current base level.
    pub fn generate_mipmaps(&mut self, backend: &mut dyn GraphicsBackend) {
        let ty = self.descriptor.texture_type;
        backend.bind_texture(ty, self.handle);
        backend.generate_mipmap(ty);
        backend.bind_texture(ty, GpuHandle::NONE);
    }

    /// Re-uploads the whole image of a 2D texture.
    pub fn update_2d(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        if self.descriptor.texture_type != TextureType::Texture2D {
            return Err(ResourceError::InvalidDescriptor(
                "update_2d on a cube map".to_string(),
            ));
        }
        let spec = self.descriptor.format_spec();
        let (w, h) = (self.descriptor.width, self.descriptor.height);
        check_image(&spec, w, h, Some(data))?;
        backend.bind_texture(TextureType::Texture2D, self.handle);
        backend.tex_image_2d(TextureTarget::Texture2D, w, h, &spec, Some(data));
        backend.bind_texture(TextureType::Texture2D, GpuHandle::NONE);
        Ok(())
    }

    /// Uploads one face of a cube map.
    pub fn upload_face(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        face: CubeFace,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        if self.descriptor.texture_type != TextureType::CubeMap {
            return Err(ResourceError::InvalidDescriptor(
                "upload_face on a 2D texture".to_string(),
            ));
        }
        let spec = self.descriptor.format_spec();
        let size = self.descriptor.width;
        check_image(&spec, size, size, Some(data))?;
        backend.bind_texture(TextureType::CubeMap, self.handle);
        backend.tex_image_2d(TextureTarget::CubeFace(face), size, size, &spec, Some(data));
        backend.bind_texture(TextureType::CubeMap, GpuHandle::NONE);
        self.mark_uploaded(face);
        Ok(())
    }

    pub(crate) fn release(&mut self, backend: &mut dyn GraphicsBackend) {
        if !self.handle.is_none() {
            backend.delete_texture(self.handle);
            self.handle = GpuHandle::NONE;
        }
    }
}

fn check_image(
    spec: &TextureFormatSpec,
    width: u32,
    height: u32,
    data: Option<&[u8]>,
) -> Result<(), ResourceError> {
    match data {
        Some(pixels) if pixels.len() != spec.image_size(width, height) => {
            Err(ResourceError::InvalidSize {
                expected: spec.image_size(width, height),
                actual: pixels.len(),
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::headless::{GpuCommand, HeadlessBackend};

    #[test]
    fn srgb_storage_uploads_from_rgba_bytes() {
        let desc = TextureDescriptor::texture_2d(2, 2, TextureFormat::Srgb8Alpha8);
        assert_eq!(desc.pixel_format, PixelFormat::Rgba);
        assert_eq!(desc.data_type, TextureDataType::UnsignedByte);
        assert_eq!(desc.format_spec().image_size(2, 2), 16);
    }

    #[test]
    fn mipmaps_are_never_implicit() {
        let mut backend = HeadlessBackend::new();
        let desc = TextureDescriptor::texture_2d(1, 1, TextureFormat::Rgba8).with_mipmaps();
        let mut texture = Texture::new_2d(&mut backend, desc, Some(&[255; 4])).unwrap();
        assert!(!backend
            .commands()
            .iter()
            .any(|c| matches!(c, GpuCommand::GenerateMipmap(_))));

        texture.generate_mipmaps(&mut backend);
        assert!(backend
            .commands()
            .iter()
            .any(|c| matches!(c, GpuCommand::GenerateMipmap(TextureType::Texture2D))));
    }

    #[test]
    fn cube_map_tolerates_missing_faces() {
        let mut backend = HeadlessBackend::new();
        let desc = TextureDescriptor::cube_map(1, TextureFormat::Rgb8);
        let px = [0u8; 3];
        let mut cube = Texture::new_cube_map(
            &mut backend,
            desc,
            &[(CubeFace::PositiveX, &px), (CubeFace::NegativeY, &px)],
        )
        .unwrap();
        assert_eq!(
            cube.uploaded_faces(),
            &[CubeFace::PositiveX, CubeFace::NegativeY]
        );

        cube.upload_face(&mut backend, CubeFace::PositiveZ, &px).unwrap();
        assert_eq!(cube.uploaded_faces().len(), 3);
    }

    #[test]
    fn wrong_sized_upload_is_rejected() {
        let mut backend = HeadlessBackend::new();
        let desc = TextureDescriptor::texture_2d(4, 4, TextureFormat::Rgba8);
        let err = Texture::new_2d(&mut backend, desc, Some(&[0; 15])).unwrap_err();
        assert_eq!(
            err,
            ResourceError::InvalidSize {
                expected: 64,
                actual: 15
            }
        );
        assert_eq!(backend.allocations(), 0);
    }

    #[test]
    fn non_square_cube_map_is_rejected() {
        let mut backend = HeadlessBackend::new();
        let mut desc = TextureDescriptor::cube_map(4, TextureFormat::Rgba8);
        desc.height = 2;
        assert!(Texture::new_cube_map(&mut backend, desc, &[]).is_err());
    }

    #[test]
    fn wrap_and_filter_are_set_per_axis() {
        let mut backend = HeadlessBackend::new();
        let desc = TextureDescriptor::texture_2d(1, 1, TextureFormat::R8);
        let mut texture = Texture::new_2d(&mut backend, desc, None).unwrap();
        backend.clear_commands();

        texture.set_wrap(&mut backend, WrapAxis::V, WrapMode::ClampToEdge);
        texture.set_filter(&mut backend, FilterTarget::Mag, FilterMode::Nearest);

        let cmds = backend.commands();
        assert!(cmds.contains(&GpuCommand::TexWrap(
            TextureType::Texture2D,
            WrapAxis::V,
            WrapMode::ClampToEdge
        )));
        assert!(cmds.contains(&GpuCommand::TexFilter(
            TextureType::Texture2D,
            FilterTarget::Mag,
            FilterMode::Nearest
        )));
        assert_eq!(texture.descriptor().mag_filter, FilterMode::Nearest);
    }

    #[test]
    fn wrap_is_tracked_per_axis() {
        let mut backend = HeadlessBackend::new();
        let desc = TextureDescriptor::texture_2d(1, 1, TextureFormat::R8);
        let mut texture = Texture::new_2d(&mut backend, desc, None).unwrap();
        assert_eq!(texture.wrap(WrapAxis::V), WrapMode::Repeat);

        texture.set_wrap(&mut backend, WrapAxis::V, WrapMode::MirroredRepeat);

        assert_eq!(texture.wrap(WrapAxis::U), WrapMode::Repeat);
        assert_eq!(texture.wrap(WrapAxis::V), WrapMode::MirroredRepeat);
        assert_eq!(texture.descriptor().wrap, WrapMode::Repeat);
    }
}
