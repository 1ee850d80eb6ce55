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

//! An OpenGL implementation of [`GraphicsBackend`] on top of `glow`.

use super::conversions::{framebuffer_status_from_gl, gpu_error_from_gl, IntoGl};
use ember_core::renderer::{
    Attachment, AttributeType, BackendInfo, BlendFactor, BlendOperation, BufferKind, BufferUsage,
    Capability, ClearFlags, CompareFunction, Face, FilterMode, FilterTarget, FramebufferStatus,
    FrontFace, GpuError, GpuHandle, GraphicsBackend, IndexType, Iteration, PrimitiveTopology,
    ResourceError, ShaderStage, StencilOperation, TextureFormatSpec, TextureTarget, TextureType,
    UniformArray, UniformLocation, UniformValue, VertexAttributeLayout, WrapAxis, WrapMode,
};
use glow::HasContext;
use std::collections::HashMap;
use std::fmt;

type GlBuffer = <glow::Context as HasContext>::Buffer;
type GlVertexArray = <glow::Context as HasContext>::VertexArray;
type GlShader = <glow::Context as HasContext>::Shader;
type GlProgram = <glow::Context as HasContext>::Program;
type GlTexture = <glow::Context as HasContext>::Texture;
type GlFramebuffer = <glow::Context as HasContext>::Framebuffer;
type GlUniformLocation = <glow::Context as HasContext>::UniformLocation;

/// Issues RHI calls on a `glow` context.
///
/// The context must be current on the calling thread for the whole lifetime of the
/// backend; creating it (and the surface it draws to) is the host's job, e.g. with
/// `glutin` on desktop. GL object names are kept behind ember's own [`GpuHandle`]s so
/// that the rest of the engine never sees a `glow` type.
pub struct GlowBackend {
    gl: glow::Context,
    next_handle: u32,
    buffers: HashMap<GpuHandle, GlBuffer>,
    vertex_arrays: HashMap<GpuHandle, GlVertexArray>,
    shaders: HashMap<GpuHandle, GlShader>,
    programs: HashMap<GpuHandle, GlProgram>,
    textures: HashMap<GpuHandle, GlTexture>,
    framebuffers: HashMap<GpuHandle, GlFramebuffer>,
    locations: HashMap<UniformLocation, GlUniformLocation>,
    location_names: HashMap<(GpuHandle, String), UniformLocation>,
    next_location: u32,
}

impl fmt::Debug for GlowBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlowBackend")
            .field("buffers", &self.buffers.len())
            .field("vertex_arrays", &self.vertex_arrays.len())
            .field("shaders", &self.shaders.len())
            .field("programs", &self.programs.len())
            .field("textures", &self.textures.len())
            .field("framebuffers", &self.framebuffers.len())
            .finish()
    }
}

impl GlowBackend {
    /// Wraps a context that is already current.
    pub fn new(gl: glow::Context) -> Self {
        let backend = Self {
            gl,
            next_handle: 0,
            buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            locations: HashMap::new(),
            location_names: HashMap::new(),
            next_location: 0,
        };
        let info = backend.info();
        log::info!("OpenGL backend: {} on {}", info.version, info.device);
        backend
    }

    /// The wrapped context, for calls ember does not abstract.
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    fn next_handle(&mut self) -> GpuHandle {
        self.next_handle += 1;
        GpuHandle(self.next_handle)
    }

    fn register<T>(&mut self, object: Result<T, String>, kind: &str) -> Result<(GpuHandle, T), ResourceError> {
        let object = object.map_err(|err| {
            log::error!("Failed to create {kind}: {err}");
            ResourceError::BackendError(err)
        })?;
        Ok((self.next_handle(), object))
    }

    fn forget_locations(&mut self, program: GpuHandle) {
        let stale: Vec<UniformLocation> = self
            .location_names
            .iter()
            .filter(|((owner, _), _)| *owner == program)
            .map(|(_, location)| *location)
            .collect();
        self.location_names.retain(|(owner, _), _| *owner != program);
        for location in stale {
            self.locations.remove(&location);
        }
    }
}

/// Looks up the GL object behind `handle`; `None` for the null handle or a stale one.
fn native<T: Copy>(objects: &HashMap<GpuHandle, T>, handle: GpuHandle) -> Option<T> {
    if handle.is_none() {
        return None;
    }
    let object = objects.get(&handle).copied();
    if object.is_none() {
        log::warn!("Unknown GPU handle {:?}", handle);
    }
    object
}

impl GraphicsBackend for GlowBackend {
    fn info(&self) -> BackendInfo {
        // SAFETY: string queries have no preconditions beyond a current context.
        unsafe {
            BackendInfo {
                name: "OpenGL".to_string(),
                version: self.gl.get_parameter_string(glow::VERSION),
                device: self.gl.get_parameter_string(glow::RENDERER),
            }
        }
    }

    // --- Buffers ---

    fn create_buffer(&mut self) -> Result<GpuHandle, ResourceError> {
        let created = unsafe { self.gl.create_buffer() };
        let (handle, buffer) = self.register(created, "buffer")?;
        self.buffers.insert(handle, buffer);
        Ok(handle)
    }

    fn delete_buffer(&mut self, buffer: GpuHandle) {
        if let Some(object) = self.buffers.remove(&buffer) {
            unsafe { self.gl.delete_buffer(object) };
        }
    }

    fn bind_buffer(&mut self, kind: BufferKind, buffer: GpuHandle) {
        let object = native(&self.buffers, buffer);
        unsafe { self.gl.bind_buffer(kind.into_gl(), object) };
    }

    fn buffer_data(&mut self, kind: BufferKind, size: usize, data: Option<&[u8]>, usage: BufferUsage) {
        unsafe {
            match data {
                Some(bytes) => self.gl.buffer_data_u8_slice(kind.into_gl(), bytes, usage.into_gl()),
                None => self.gl.buffer_data_size(kind.into_gl(), size as i32, usage.into_gl()),
            }
        }
    }

    fn buffer_sub_data(&mut self, kind: BufferKind, offset: usize, data: &[u8]) {
        unsafe {
            self.gl
                .buffer_sub_data_u8_slice(kind.into_gl(), offset as i32, data)
        };
    }

    // --- Vertex arrays ---

    fn create_vertex_array(&mut self) -> Result<GpuHandle, ResourceError> {
        let created = unsafe { self.gl.create_vertex_array() };
        let (handle, vertex_array) = self.register(created, "vertex array")?;
        self.vertex_arrays.insert(handle, vertex_array);
        Ok(handle)
    }

    fn delete_vertex_array(&mut self, vertex_array: GpuHandle) {
        if let Some(object) = self.vertex_arrays.remove(&vertex_array) {
            unsafe { self.gl.delete_vertex_array(object) };
        }
    }

    fn bind_vertex_array(&mut self, vertex_array: GpuHandle) {
        let object = native(&self.vertex_arrays, vertex_array);
        unsafe { self.gl.bind_vertex_array(object) };
    }

    fn vertex_attribute(&mut self, layout: &VertexAttributeLayout) {
        let index = layout.location;
        let size = layout.components as i32;
        let data_type = layout.attribute_type.into_gl();
        let stride = layout.stride as i32;
        let integer = layout.attribute_type != AttributeType::Float && !layout.normalized;
        unsafe {
            self.gl.enable_vertex_attrib_array(index);
            if integer {
                self.gl.vertex_attrib_pointer_i32(index, size, data_type, stride, 0);
            } else {
                self.gl
                    .vertex_attrib_pointer_f32(index, size, data_type, layout.normalized, stride, 0);
            }
            let divisor = match layout.iteration {
                Iteration::PerVertex => 0,
                Iteration::PerInstance => 1,
            };
            self.gl.vertex_attrib_divisor(index, divisor);
        }
    }

    // --- Shaders ---

    fn create_shader(&mut self, stage: ShaderStage) -> Result<GpuHandle, ResourceError> {
        let created = unsafe { self.gl.create_shader(stage.into_gl()) };
        let (handle, shader) = self.register(created, "shader")?;
        self.shaders.insert(handle, shader);
        Ok(handle)
    }

    fn compile_shader(&mut self, shader: GpuHandle, source: &str) -> Result<(), String> {
        let object = native(&self.shaders, shader).ok_or_else(|| format!("unknown shader {shader:?}"))?;
        unsafe {
            self.gl.shader_source(object, source);
            self.gl.compile_shader(object);
            if self.gl.get_shader_compile_status(object) {
                Ok(())
            } else {
                Err(self.gl.get_shader_info_log(object))
            }
        }
    }

    fn delete_shader(&mut self, shader: GpuHandle) {
        if let Some(object) = self.shaders.remove(&shader) {
            unsafe { self.gl.delete_shader(object) };
        }
    }

    fn create_program(&mut self) -> Result<GpuHandle, ResourceError> {
        let created = unsafe { self.gl.create_program() };
        let (handle, program) = self.register(created, "program")?;
        self.programs.insert(handle, program);
        Ok(handle)
    }

    fn attach_shader(&mut self, program: GpuHandle, shader: GpuHandle) {
        if let (Some(program), Some(shader)) = (native(&self.programs, program), native(&self.shaders, shader)) {
            unsafe { self.gl.attach_shader(program, shader) };
        }
    }

    fn detach_shader(&mut self, program: GpuHandle, shader: GpuHandle) {
        if let (Some(program), Some(shader)) = (native(&self.programs, program), native(&self.shaders, shader)) {
            unsafe { self.gl.detach_shader(program, shader) };
        }
    }

    fn link_program(&mut self, program: GpuHandle) -> Result<(), String> {
        let object = native(&self.programs, program).ok_or_else(|| format!("unknown program {program:?}"))?;
        // Relinking invalidates every location handed out for this program.
        self.forget_locations(program);
        unsafe {
            self.gl.link_program(object);
            if self.gl.get_program_link_status(object) {
                Ok(())
            } else {
                Err(self.gl.get_program_info_log(object))
            }
        }
    }

    fn delete_program(&mut self, program: GpuHandle) {
        self.forget_locations(program);
        if let Some(object) = self.programs.remove(&program) {
            unsafe { self.gl.delete_program(object) };
        }
    }

    fn use_program(&mut self, program: GpuHandle) {
        let object = native(&self.programs, program);
        unsafe { self.gl.use_program(object) };
    }

    fn uniform_location(&mut self, program: GpuHandle, name: &str) -> Option<UniformLocation> {
        let key = (program, name.to_string());
        if let Some(location) = self.location_names.get(&key) {
            return Some(*location);
        }
        let object = native(&self.programs, program)?;
        let native_location = unsafe { self.gl.get_uniform_location(object, name) }?;
        self.next_location += 1;
        let location = UniformLocation(self.next_location);
        self.locations.insert(location, native_location);
        self.location_names.insert(key, location);
        Some(location)
    }

    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue) {
        let Some(loc) = self.locations.get(&location) else {
            log::warn!("Unknown uniform location {:?}", location);
            return;
        };
        let loc = Some(loc);
        unsafe {
            match value {
                UniformValue::Int(v) => self.gl.uniform_1_i32(loc, *v),
                UniformValue::UInt(v) => self.gl.uniform_1_u32(loc, *v),
                UniformValue::Bool(v) => self.gl.uniform_1_i32(loc, i32::from(*v)),
                UniformValue::Float(v) => self.gl.uniform_1_f32(loc, *v),
                UniformValue::Vec2([x, y]) => self.gl.uniform_2_f32(loc, *x, *y),
                UniformValue::Vec3([x, y, z]) => self.gl.uniform_3_f32(loc, *x, *y, *z),
                UniformValue::Vec4([x, y, z, w]) => self.gl.uniform_4_f32(loc, *x, *y, *z, *w),
                UniformValue::Mat3(m) => self.gl.uniform_matrix_3_f32_slice(loc, false, m),
                UniformValue::Mat4(m) => self.gl.uniform_matrix_4_f32_slice(loc, false, m),
                UniformValue::Sampler(unit) => self.gl.uniform_1_i32(loc, *unit),
            }
        }
    }

    fn set_uniform_array(&mut self, location: UniformLocation, values: &UniformArray) {
        let Some(loc) = self.locations.get(&location) else {
            log::warn!("Unknown uniform location {:?}", location);
            return;
        };
        let loc = Some(loc);
        unsafe {
            match values {
                UniformArray::Int(v) => self.gl.uniform_1_i32_slice(loc, v),
                UniformArray::Float(v) => self.gl.uniform_1_f32_slice(loc, v),
                UniformArray::Vec2(v) => self.gl.uniform_2_f32_slice(loc, bytemuck::cast_slice(v)),
                UniformArray::Vec3(v) => self.gl.uniform_3_f32_slice(loc, bytemuck::cast_slice(v)),
                UniformArray::Vec4(v) => self.gl.uniform_4_f32_slice(loc, bytemuck::cast_slice(v)),
                UniformArray::Mat4(v) => {
                    self.gl
                        .uniform_matrix_4_f32_slice(loc, false, bytemuck::cast_slice(v))
                }
            }
        }
    }

    // --- Textures ---

    fn create_texture(&mut self) -> Result<GpuHandle, ResourceError> {
        let created = unsafe { self.gl.create_texture() };
        let (handle, texture) = self.register(created, "texture")?;
        self.textures.insert(handle, texture);
        Ok(handle)
    }

    fn delete_texture(&mut self, texture: GpuHandle) {
        if let Some(object) = self.textures.remove(&texture) {
            unsafe { self.gl.delete_texture(object) };
        }
    }

    fn active_texture(&mut self, slot: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + slot) };
    }

    fn bind_texture(&mut self, texture_type: TextureType, texture: GpuHandle) {
        let object = native(&self.textures, texture);
        unsafe { self.gl.bind_texture(texture_type.into_gl(), object) };
    }

    fn tex_image_2d(
        &mut self,
        target: TextureTarget,
        width: u32,
        height: u32,
        format: &TextureFormatSpec,
        data: Option<&[u8]>,
    ) {
        unsafe {
            self.gl.tex_image_2d(
                target.into_gl(),
                0,
                format.internal.into_gl() as i32,
                width as i32,
                height as i32,
                0,
                format.pixel.into_gl(),
                format.data_type.into_gl(),
                glow::PixelUnpackData::Slice(data),
            );
        }
    }

    fn tex_wrap(&mut self, texture_type: TextureType, axis: WrapAxis, mode: WrapMode) {
        unsafe {
            self.gl
                .tex_parameter_i32(texture_type.into_gl(), axis.into_gl(), mode.into_gl() as i32)
        };
    }

    fn tex_filter(&mut self, texture_type: TextureType, target: FilterTarget, mode: FilterMode) {
        unsafe {
            self.gl
                .tex_parameter_i32(texture_type.into_gl(), target.into_gl(), mode.into_gl() as i32)
        };
    }

    fn generate_mipmap(&mut self, texture_type: TextureType) {
        unsafe { self.gl.generate_mipmap(texture_type.into_gl()) };
    }

    // --- Frame buffers ---

    fn create_framebuffer(&mut self) -> Result<GpuHandle, ResourceError> {
        let created = unsafe { self.gl.create_framebuffer() };
        let (handle, framebuffer) = self.register(created, "frame buffer")?;
        self.framebuffers.insert(handle, framebuffer);
        Ok(handle)
    }

    fn delete_framebuffer(&mut self, framebuffer: GpuHandle) {
        if let Some(object) = self.framebuffers.remove(&framebuffer) {
            unsafe { self.gl.delete_framebuffer(object) };
        }
    }

    fn bind_framebuffer(&mut self, framebuffer: GpuHandle) {
        let object = native(&self.framebuffers, framebuffer);
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, object) };
    }

    fn framebuffer_texture(&mut self, attachment: Attachment, target: TextureTarget, texture: GpuHandle) {
        let object = native(&self.textures, texture);
        unsafe {
            self.gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                attachment.into_gl(),
                target.into_gl(),
                object,
                0,
            );
        }
    }

    fn draw_buffers(&mut self, color_attachments: u32) {
        let buffers: Vec<u32> = if color_attachments == 0 {
            vec![glow::NONE]
        } else {
            (0..color_attachments)
                .map(|index| Attachment::Color(index).into_gl())
                .collect()
        };
        unsafe { self.gl.draw_buffers(&buffers) };
    }

    fn framebuffer_status(&mut self) -> FramebufferStatus {
        let code = unsafe { self.gl.check_framebuffer_status(glow::FRAMEBUFFER) };
        framebuffer_status_from_gl(code)
    }

    // --- Fixed-function state ---

    fn set_capability(&mut self, capability: Capability, enabled: bool) {
        unsafe {
            if enabled {
                self.gl.enable(capability.into_gl());
            } else {
                self.gl.disable(capability.into_gl());
            }
        }
    }

    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        unsafe { self.gl.blend_func(src.into_gl(), dst.into_gl()) };
    }

    fn blend_equation(&mut self, operation: BlendOperation) {
        unsafe { self.gl.blend_equation(operation.into_gl()) };
    }

    fn depth_mask(&mut self, write: bool) {
        unsafe { self.gl.depth_mask(write) };
    }

    fn depth_func(&mut self, compare: CompareFunction) {
        unsafe { self.gl.depth_func(compare.into_gl()) };
    }

    fn cull_face(&mut self, face: Face) {
        unsafe { self.gl.cull_face(face.into_gl()) };
    }

    fn front_face(&mut self, front_face: FrontFace) {
        unsafe { self.gl.front_face(front_face.into_gl()) };
    }

    fn polygon_offset(&mut self, factor: f32, units: f32) {
        unsafe { self.gl.polygon_offset(factor, units) };
    }

    fn stencil_func(&mut self, compare: CompareFunction, reference: i32, read_mask: u32) {
        unsafe { self.gl.stencil_func(compare.into_gl(), reference, read_mask) };
    }

    fn stencil_op(&mut self, fail: StencilOperation, depth_fail: StencilOperation, pass: StencilOperation) {
        unsafe {
            self.gl
                .stencil_op(fail.into_gl(), depth_fail.into_gl(), pass.into_gl())
        };
    }

    fn stencil_mask(&mut self, write_mask: u32) {
        unsafe { self.gl.stencil_mask(write_mask) };
    }

    // --- Drawing ---

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        unsafe { self.gl.viewport(x, y, width as i32, height as i32) };
    }

    fn clear_values(&mut self, color: [f32; 4], depth: f32, stencil: i32) {
        let [r, g, b, a] = color;
        unsafe {
            self.gl.clear_color(r, g, b, a);
            self.gl.clear_depth_f32(depth);
            self.gl.clear_stencil(stencil);
        }
    }

    fn clear(&mut self, flags: ClearFlags) {
        unsafe { self.gl.clear(flags.into_gl()) };
    }

    fn draw_elements(&mut self, topology: PrimitiveTopology, count: u32, index_type: IndexType, offset: usize) {
        unsafe {
            self.gl
                .draw_elements(topology.into_gl(), count as i32, index_type.into_gl(), offset as i32)
        };
    }

    fn draw_elements_instanced(
        &mut self,
        topology: PrimitiveTopology,
        count: u32,
        index_type: IndexType,
        offset: usize,
        instances: u32,
    ) {
        unsafe {
            self.gl.draw_elements_instanced(
                topology.into_gl(),
                count as i32,
                index_type.into_gl(),
                offset as i32,
                instances as i32,
            )
        };
    }

    fn get_error(&mut self) -> Option<GpuError> {
        let code = unsafe { self.gl.get_error() };
        gpu_error_from_gl(code)
    }
}

impl Drop for GlowBackend {
    fn drop(&mut self) {
        let live = self.buffers.len()
            + self.vertex_arrays.len()
            + self.shaders.len()
            + self.programs.len()
            + self.textures.len()
            + self.framebuffers.len();
        if live > 0 {
            log::warn!("GlowBackend dropped with {live} live GL object(s)");
        }
    }
}
