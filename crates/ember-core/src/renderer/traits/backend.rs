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

use crate::renderer::api::*;
use crate::renderer::error::ResourceError;
use std::fmt::Debug;

/// The translation layer between engine-level resource/draw calls and one GPU API.
///
/// The interface follows the bind-to-edit, global-state model of the fixed-function
/// APIs it abstracts: objects are created empty, bound to a target, then edited or
/// drawn through that binding. Every method is issued synchronously from the thread
/// that owns the device.
///
/// Resource objects in [`crate::renderer::api`] drive this trait; nothing above the
/// [`Device`](crate::renderer::Device) calls it directly.
pub trait GraphicsBackend: Debug {
    /// Returns the backend's name and driver strings.
    fn info(&self) -> BackendInfo;

    // --- Buffers ---

    /// Allocates a new buffer object.
    fn create_buffer(&mut self) -> Result<GpuHandle, ResourceError>;
    /// Deletes a buffer object.
    fn delete_buffer(&mut self, buffer: GpuHandle);
    /// Binds `buffer` to the target for `kind`. [`GpuHandle::NONE`] unbinds.
    fn bind_buffer(&mut self, kind: BufferKind, buffer: GpuHandle);
    /// (Re)allocates the store of the bound buffer, optionally initialized from `data`.
    fn buffer_data(&mut self, kind: BufferKind, size: usize, data: Option<&[u8]>, usage: BufferUsage);
    /// Writes `data` into the bound buffer at byte `offset`.
    fn buffer_sub_data(&mut self, kind: BufferKind, offset: usize, data: &[u8]);

    // --- Vertex arrays ---

    /// Allocates a new vertex array object.
    fn create_vertex_array(&mut self) -> Result<GpuHandle, ResourceError>;
    /// Deletes a vertex array object.
    fn delete_vertex_array(&mut self, vertex_array: GpuHandle);
    /// Binds a vertex array. [`GpuHandle::NONE`] unbinds.
    fn bind_vertex_array(&mut self, vertex_array: GpuHandle);
    /// Enables an attribute location and describes how to read it from the bound vertex buffer.
    fn vertex_attribute(&mut self, layout: &VertexAttributeLayout);

    // --- Shaders ---

    /// Allocates a shader object for one stage.
    fn create_shader(&mut self, stage: ShaderStage) -> Result<GpuHandle, ResourceError>;
    /// Compiles `source` into `shader`. On failure returns the compiler's info log.
    fn compile_shader(&mut self, shader: GpuHandle, source: &str) -> Result<(), String>;
    /// Deletes a shader object.
    fn delete_shader(&mut self, shader: GpuHandle);
    /// Allocates an empty program object.
    fn create_program(&mut self) -> Result<GpuHandle, ResourceError>;
    /// Attaches a compiled shader to a program.
    fn attach_shader(&mut self, program: GpuHandle, shader: GpuHandle);
    /// Detaches a shader from a program.
    fn detach_shader(&mut self, program: GpuHandle, shader: GpuHandle);
    /// Links the attached stages. On failure returns the linker's info log.
    fn link_program(&mut self, program: GpuHandle) -> Result<(), String>;
    /// Deletes a program object.
    fn delete_program(&mut self, program: GpuHandle);
    /// Makes `program` current. [`GpuHandle::NONE`] unbinds.
    fn use_program(&mut self, program: GpuHandle);
    /// Looks up an active uniform. `None` if the linked program does not expose it.
    fn uniform_location(&mut self, program: GpuHandle, name: &str) -> Option<UniformLocation>;
    /// Sets a scalar uniform of the current program.
    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue);
    /// Sets an array uniform of the current program.
    fn set_uniform_array(&mut self, location: UniformLocation, values: &UniformArray);

    // --- Textures ---

    /// Allocates a texture object.
    fn create_texture(&mut self) -> Result<GpuHandle, ResourceError>;
    /// Deletes a texture object.
    fn delete_texture(&mut self, texture: GpuHandle);
    /// Selects the texture unit subsequent texture binds apply to.
    fn active_texture(&mut self, slot: u32);
    /// Binds `texture` on the active unit. [`GpuHandle::NONE`] unbinds.
    fn bind_texture(&mut self, texture_type: TextureType, texture: GpuHandle);
    /// Defines the storage of one image of the bound texture and optionally uploads it.
    fn tex_image_2d(&mut self, target: TextureTarget, width: u32, height: u32, format: &TextureFormatSpec, data: Option<&[u8]>);
    /// Sets the wrap mode of one axis of the bound texture.
    fn tex_wrap(&mut self, texture_type: TextureType, axis: WrapAxis, mode: WrapMode);
    /// Sets the minification or magnification filter of the bound texture.
    fn tex_filter(&mut self, texture_type: TextureType, target: FilterTarget, mode: FilterMode);
    /// Generates the mip chain of the bound texture.
    fn generate_mipmap(&mut self, texture_type: TextureType);

    // --- Frame buffers ---

    /// Allocates a frame buffer object.
    fn create_framebuffer(&mut self) -> Result<GpuHandle, ResourceError>;
    /// Deletes a frame buffer object.
    fn delete_framebuffer(&mut self, framebuffer: GpuHandle);
    /// Binds a frame buffer. [`GpuHandle::NONE`] binds the default (window) target.
    fn bind_framebuffer(&mut self, framebuffer: GpuHandle);
    /// Attaches a texture image to the bound frame buffer.
    fn framebuffer_texture(&mut self, attachment: Attachment, target: TextureTarget, texture: GpuHandle);
    /// Selects how many color attachments fragment outputs are written to.
    fn draw_buffers(&mut self, color_attachments: u32);
    /// Checks completeness of the bound frame buffer.
    fn framebuffer_status(&mut self) -> FramebufferStatus;

    // --- Fixed-function state ---

    /// Enables or disables a fixed-function capability.
    fn set_capability(&mut self, capability: Capability, enabled: bool);
    /// Sets the source and destination blend factors.
    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor);
    /// Sets the blend equation.
    fn blend_equation(&mut self, operation: BlendOperation);
    /// Enables or disables depth writes.
    fn depth_mask(&mut self, write: bool);
    /// Sets the depth comparison.
    fn depth_func(&mut self, compare: CompareFunction);
    /// Selects which faces are culled.
    fn cull_face(&mut self, face: Face);
    /// Selects the front-facing winding.
    fn front_face(&mut self, front_face: FrontFace);
    /// Sets the polygon depth offset.
    fn polygon_offset(&mut self, factor: f32, units: f32);
    /// Sets the stencil comparison, reference and read mask.
    fn stencil_func(&mut self, compare: CompareFunction, reference: i32, read_mask: u32);
    /// Sets the stencil operations for fail, depth-fail and pass.
    fn stencil_op(&mut self, fail: StencilOperation, depth_fail: StencilOperation, pass: StencilOperation);
    /// Sets the stencil write mask.
    fn stencil_mask(&mut self, write_mask: u32);

    // --- Drawing ---

    /// Sets the viewport rectangle.
    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32);
    /// Sets the values written by [`GraphicsBackend::clear`].
    fn clear_values(&mut self, color: [f32; 4], depth: f32, stencil: i32);
    /// Clears the selected buffers of the bound target.
    fn clear(&mut self, flags: ClearFlags);
    /// Issues an indexed draw from the bound vertex array.
    fn draw_elements(&mut self, topology: PrimitiveTopology, count: u32, index_type: IndexType, offset: usize);
    /// Issues an indexed draw replicated `instances` times.
    fn draw_elements_instanced(&mut self, topology: PrimitiveTopology, count: u32, index_type: IndexType, offset: usize, instances: u32);

    /// Pops the oldest recorded GPU error, if any.
    fn get_error(&mut self) -> Option<GpuError>;
}
