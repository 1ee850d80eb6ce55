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

//! Off-screen render targets.

use crate::guid::Guid;
use crate::renderer::api::{GpuHandle, Texture, TextureTarget, TextureType};
use crate::renderer::error::ResourceError;
use crate::renderer::traits::{Bindable, GraphicsBackend};

/// A frame buffer attachment point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attachment {
    /// The n-th color attachment.
    Color(u32),
    /// Depth only.
    Depth,
    /// Combined depth and stencil.
    DepthStencil,
}

/// The completeness of a frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferStatus {
    /// Ready to render into.
    Complete,
    /// An attachment is missing storage or has a zero size.
    IncompleteAttachment,
    /// No image is attached at all.
    MissingAttachment,
    /// A draw buffer names an attachment point with nothing attached.
    IncompleteDrawBuffer,
    /// Attachments disagree on sample counts.
    IncompleteMultisample,
    /// The combination of formats is not supported by the driver.
    Unsupported,
    /// A status this layer does not know about.
    Unknown(u32),
}

/// A set of color attachments plus an optional depth or depth/stencil attachment.
#[derive(Debug)]
pub struct FrameBuffer {
    handle: GpuHandle,
    width: u32,
    height: u32,
    colors: Vec<Guid>,
    depth: Option<Guid>,
    status: FramebufferStatus,
}

impl FrameBuffer {
    /// Attaches the given textures and records the resulting completeness.
    ///
    /// An incomplete frame buffer is still returned; see [`FrameBuffer::is_complete`].
    pub fn new(
        backend: &mut dyn GraphicsBackend,
        width: u32,
        height: u32,
        colors: &[(Guid, &Texture)],
        depth: Option<(Guid, &Texture)>,
    ) -> Result<Self, ResourceError> {
        for (_, texture) in colors.iter().chain(depth.as_ref()) {
            if texture.descriptor().texture_type != TextureType::Texture2D {
                return Err(ResourceError::InvalidDescriptor(
                    "frame buffer attachments must be 2D textures".to_string(),
                ));
            }
        }

        let handle = backend.create_framebuffer()?;
        backend.bind_framebuffer(handle);
        for (index, (_, texture)) in colors.iter().enumerate() {
            backend.framebuffer_texture(
                Attachment::Color(index as u32),
                TextureTarget::Texture2D,
                texture.handle(),
            );
        }
        if let Some((_, texture)) = &depth {
            let attachment = if texture.descriptor().format.has_stencil() {
                Attachment::DepthStencil
            } else {
                Attachment::Depth
            };
            backend.framebuffer_texture(attachment, TextureTarget::Texture2D, texture.handle());
        }
        backend.draw_buffers(colors.len() as u32);
        let status = backend.framebuffer_status();
        backend.bind_framebuffer(GpuHandle::NONE);

        if status != FramebufferStatus::Complete {
            log::warn!("Frame buffer {:?} is incomplete: {:?}", handle, status);
        } else {
            log::debug!(
                "Created frame buffer {:?} ({}x{}, {} color attachment(s), depth: {})",
                handle,
                width,
                height,
                colors.len(),
                depth.is_some()
            );
        }

        Ok(Self {
            handle,
            width,
            height,
            colors: colors.iter().map(|(id, _)| *id).collect(),
            depth: depth.map(|(id, _)| id),
            status,
        })
    }

    /// The backend object name.
    pub fn handle(&self) -> GpuHandle {
        self.handle
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The status recorded at creation.
    pub fn status(&self) -> FramebufferStatus {
        self.status
    }

    /// Returns `true` if the frame buffer can be rendered into. Logs the reason otherwise.
    pub fn is_complete(&self) -> bool {
        if self.status == FramebufferStatus::Complete {
            return true;
        }
        log::warn!(
            "Frame buffer {:?} is not complete: {:?}",
            self.handle,
            self.status
        );
        false
    }

    /// Number of color attachments.
    pub fn color_count(&self) -> usize {
        self.colors.len()
    }

    /// The texture id of color attachment `index`.
    pub fn color_attachment(&self, index: usize) -> Result<Guid, ResourceError> {
        self.colors
            .get(index)
            .copied()
            .ok_or(ResourceError::OutOfBounds {
                what: "color attachment",
                index,
                len: self.colors.len(),
            })
    }

    /// The texture id of the depth attachment, if any.
    pub fn depth_attachment(&self) -> Option<Guid> {
        self.depth
    }

    /// Every attachment texture id, colors first.
    pub fn attachments(&self) -> impl Iterator<Item = Guid> + '_ {
        self.colors.iter().copied().chain(self.depth)
    }

    pub(crate) fn release(&mut self, backend: &mut dyn GraphicsBackend) {
        if !self.handle.is_none() {
            backend.delete_framebuffer(self.handle);
            self.handle = GpuHandle::NONE;
        }
    }
}

impl Bindable for FrameBuffer {
    fn bind(&self, backend: &mut dyn GraphicsBackend) {
        backend.bind_framebuffer(self.handle);
        backend.viewport(0, 0, self.width, self.height);
    }

    fn unbind(&self, backend: &mut dyn GraphicsBackend) {
        backend.bind_framebuffer(GpuHandle::NONE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::{TextureDescriptor, TextureFormat};
    use crate::renderer::headless::{GpuCommand, HeadlessBackend};

    fn texture(backend: &mut HeadlessBackend, format: TextureFormat) -> Texture {
        Texture::new_2d(backend, TextureDescriptor::texture_2d(8, 8, format), None).unwrap()
    }

    #[test]
    fn color_and_depth_are_complete() {
        let mut backend = HeadlessBackend::new();
        let color = texture(&mut backend, TextureFormat::Rgba8);
        let depth = texture(&mut backend, TextureFormat::Depth24Stencil8);
        let fb = FrameBuffer::new(
            &mut backend,
            8,
            8,
            &[(Guid::new(), &color)],
            Some((Guid::new(), &depth)),
        )
        .unwrap();
        assert!(fb.is_complete());
        assert!(backend.commands().contains(&GpuCommand::FramebufferTexture(
            Attachment::DepthStencil,
            TextureTarget::Texture2D,
            depth.handle()
        )));
    }

    #[test]
    fn no_attachment_is_reported_not_fatal() {
        let mut backend = HeadlessBackend::new();
        let fb = FrameBuffer::new(&mut backend, 8, 8, &[], None).unwrap();
        assert!(!fb.is_complete());
        assert_eq!(fb.status(), FramebufferStatus::MissingAttachment);
    }

    #[test]
    fn color_attachment_out_of_range() {
        let mut backend = HeadlessBackend::new();
        let color = texture(&mut backend, TextureFormat::Rgba8);
        let id = Guid::new();
        let fb = FrameBuffer::new(&mut backend, 8, 8, &[(id, &color)], None).unwrap();
        assert_eq!(fb.color_attachment(0), Ok(id));
        assert_eq!(
            fb.color_attachment(1),
            Err(ResourceError::OutOfBounds {
                what: "color attachment",
                index: 1,
                len: 1
            })
        );
    }

    #[test]
    fn bind_sets_viewport_to_target_size() {
        let mut backend = HeadlessBackend::new();
        let color = texture(&mut backend, TextureFormat::Rgba8);
        let fb = FrameBuffer::new(&mut backend, 8, 8, &[(Guid::new(), &color)], None).unwrap();
        backend.clear_commands();
        fb.bind(&mut backend);
        assert_eq!(
            backend.commands(),
            &[
                GpuCommand::BindFramebuffer(fb.handle()),
                GpuCommand::Viewport(0, 0, 8, 8)
            ]
        );
    }
}
