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

//! A [`GraphicsBackend`] that records every call instead of reaching a GPU.
//!
//! Besides the command log it simulates enough of a GL-style driver for resource
//! code to be exercised end to end: object allocation, buffer storage, shader
//! compilation and linking (with uniform reflection from `uniform` declarations),
//! texture images, frame buffer completeness, fixed-function state and the error
//! queue.

use crate::renderer::api::*;
use crate::renderer::error::ResourceError;
use crate::renderer::traits::GraphicsBackend;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    /// `create_buffer`
    CreateBuffer(GpuHandle),
    /// `delete_buffer`
    DeleteBuffer(GpuHandle),
    /// `bind_buffer`
    BindBuffer(BufferKind, GpuHandle),
    /// `buffer_data`
    BufferData {
        /// Target.
        kind: BufferKind,
        /// New store size.
        size: usize,
        /// Usage hint.
        usage: BufferUsage,
        /// Whether initial data was supplied.
        initialized: bool,
    },
    /// `buffer_sub_data`
    BufferSubData {
        /// Target.
        kind: BufferKind,
        /// Byte offset.
        offset: usize,
        /// Bytes written.
        len: usize,
    },
    /// `create_vertex_array`
    CreateVertexArray(GpuHandle),
    /// `delete_vertex_array`
    DeleteVertexArray(GpuHandle),
    /// `bind_vertex_array`
    BindVertexArray(GpuHandle),
    /// `vertex_attribute`
    VertexAttribute(VertexAttributeLayout),
    /// `create_shader`
    CreateShader(ShaderStage, GpuHandle),
    /// `compile_shader`
    CompileShader(GpuHandle),
    /// `delete_shader`
    DeleteShader(GpuHandle),
    /// `create_program`
    CreateProgram(GpuHandle),
    /// `attach_shader`
    AttachShader(GpuHandle, GpuHandle),
    /// `detach_shader`
    DetachShader(GpuHandle, GpuHandle),
    /// `link_program`
    LinkProgram(GpuHandle),
    /// `delete_program`
    DeleteProgram(GpuHandle),
    /// `use_program`
    UseProgram(GpuHandle),
    /// `set_uniform`
    SetUniform(UniformLocation, UniformValue),
    /// `set_uniform_array`
    SetUniformArray(UniformLocation, UniformArray),
    /// `create_texture`
    CreateTexture(GpuHandle),
    /// `delete_texture`
    DeleteTexture(GpuHandle),
    /// `active_texture`
    ActiveTexture(u32),
    /// `bind_texture`
    BindTexture(TextureType, GpuHandle),
    /// `tex_image_2d`
    TexImage2D {
        /// Image target.
        target: TextureTarget,
        /// Width in texels.
        width: u32,
        /// Height in texels.
        height: u32,
        /// Format triple.
        format: TextureFormatSpec,
        /// Whether pixels were supplied.
        has_data: bool,
    },
    /// `tex_wrap`
    TexWrap(TextureType, WrapAxis, WrapMode),
    /// `tex_filter`
    TexFilter(TextureType, FilterTarget, FilterMode),
    /// `generate_mipmap`
    GenerateMipmap(TextureType),
    /// `create_framebuffer`
    CreateFramebuffer(GpuHandle),
    /// `delete_framebuffer`
    DeleteFramebuffer(GpuHandle),
    /// `bind_framebuffer`
    BindFramebuffer(GpuHandle),
    /// `framebuffer_texture`
    FramebufferTexture(Attachment, TextureTarget, GpuHandle),
    /// `draw_buffers`
    DrawBuffers(u32),
    /// `set_capability`
    SetCapability(Capability, bool),
    /// `blend_func`
    BlendFunc(BlendFactor, BlendFactor),
    /// `blend_equation`
    BlendEquation(BlendOperation),
    /// `depth_mask`
    DepthMask(bool),
    /// `depth_func`
    DepthFunc(CompareFunction),
    /// `cull_face`
    CullFace(Face),
    /// `front_face`
    FrontFace(FrontFace),
    /// `polygon_offset`
    PolygonOffset(f32, f32),
    /// `stencil_func`
    StencilFunc(CompareFunction, i32, u32),
    /// `stencil_op`
    StencilOp(StencilOperation, StencilOperation, StencilOperation),
    /// `stencil_mask`
    StencilMask(u32),
    /// `viewport`
    Viewport(i32, i32, u32, u32),
    /// `clear_values`
    ClearValues([f32; 4], f32, i32),
    /// `clear`
    Clear(ClearFlags),
    /// `draw_elements` (`instances: None`) or `draw_elements_instanced`.
    DrawElements {
        /// Topology.
        topology: PrimitiveTopology,
        /// Indices drawn.
        count: u32,
        /// Index type.
        index_type: IndexType,
        /// Byte offset into the element buffer.
        offset: usize,
        /// Instance count of an instanced draw.
        instances: Option<u32>,
    },
}

/// A snapshot of the simulated fixed-function configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedFunctionState {
    /// Enabled capabilities.
    pub capabilities: BTreeMap<Capability, bool>,
    /// Blend source and destination factors.
    pub blend_func: (BlendFactor, BlendFactor),
    /// Blend equation.
    pub blend_equation: BlendOperation,
    /// Depth writes.
    pub depth_mask: bool,
    /// Depth comparison.
    pub depth_func: CompareFunction,
    /// Culled faces.
    pub cull_face: Face,
    /// Front-facing winding.
    pub front_face: FrontFace,
    /// Polygon offset factor and units.
    pub polygon_offset: (f32, f32),
    /// Stencil comparison, reference and read mask.
    pub stencil_func: (CompareFunction, i32, u32),
    /// Stencil fail, depth-fail and pass operations.
    pub stencil_op: (StencilOperation, StencilOperation, StencilOperation),
    /// Stencil write mask.
    pub stencil_mask: u32,
}

impl Default for FixedFunctionState {
    fn default() -> Self {
        Self {
            capabilities: BTreeMap::new(),
            blend_func: (BlendFactor::One, BlendFactor::Zero),
            blend_equation: BlendOperation::Add,
            depth_mask: true,
            depth_func: CompareFunction::Less,
            cull_face: Face::Back,
            front_face: FrontFace::Ccw,
            polygon_offset: (0.0, 0.0),
            stencil_func: (CompareFunction::Always, 0, u32::MAX),
            stencil_op: (
                StencilOperation::Keep,
                StencilOperation::Keep,
                StencilOperation::Keep,
            ),
            stencil_mask: u32::MAX,
        }
    }
}

impl FixedFunctionState {
    /// Whether `capability` is enabled. Everything starts disabled.
    pub fn is_enabled(&self, capability: Capability) -> bool {
        self.capabilities.get(&capability).copied().unwrap_or(false)
    }
}

#[derive(Debug)]
struct ShaderObject {
    stage: ShaderStage,
    source: String,
    compiled: bool,
}

#[derive(Debug, Default)]
struct ProgramObject {
    attached: Vec<GpuHandle>,
    linked: bool,
    uniforms: HashMap<String, UniformLocation>,
    values: HashMap<UniformLocation, UniformValue>,
    arrays: HashMap<UniformLocation, UniformArray>,
}

#[derive(Debug, Default)]
struct TextureObject {
    texture_type: Option<TextureType>,
    images: HashMap<TextureTarget, (u32, u32)>,
    mipmapped: bool,
}

#[derive(Debug, Default)]
struct FramebufferObject {
    attachments: BTreeMap<u32, (Attachment, GpuHandle)>,
    draw_buffers: u32,
}

fn attachment_slot(attachment: Attachment) -> u32 {
    match attachment {
        Attachment::Color(i) => i,
        Attachment::Depth | Attachment::DepthStencil => u32::MAX,
    }
}

/// A recording, GPU-less backend.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    commands: Vec<GpuCommand>,
    next_handle: u32,
    allocations: usize,
    draw_calls: usize,
    errors: VecDeque<GpuError>,

    buffers: HashMap<GpuHandle, Vec<u8>>,
    bound_buffers: HashMap<BufferKind, GpuHandle>,
    vertex_arrays: HashMap<GpuHandle, GpuHandle>,
    bound_vertex_array: GpuHandle,
    shaders: HashMap<GpuHandle, ShaderObject>,
    programs: HashMap<GpuHandle, ProgramObject>,
    current_program: GpuHandle,
    textures: HashMap<GpuHandle, TextureObject>,
    active_unit: u32,
    bound_textures: HashMap<(u32, TextureType), GpuHandle>,
    framebuffers: HashMap<GpuHandle, FramebufferObject>,
    bound_framebuffer: GpuHandle,

    state: FixedFunctionState,
    viewport: (i32, i32, u32, u32),
    clear_values: ([f32; 4], f32, i32),
}

impl HeadlessBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call recorded since creation or the last [`Self::clear_commands`].
    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    /// Forgets the recorded calls. Simulated state is kept.
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Total number of GPU objects ever created.
    pub fn allocations(&self) -> usize {
        self.allocations
    }

    /// Total number of draw calls issued.
    pub fn draw_calls(&self) -> usize {
        self.draw_calls
    }

    /// Queues an error for [`GraphicsBackend::get_error`] to report.
    pub fn inject_error(&mut self, error: GpuError) {
        self.errors.push_back(error);
    }

    /// The store of a live buffer.
    pub fn buffer_contents(&self, buffer: GpuHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    /// The location a linked program assigned to `name`.
    pub fn uniform_location_of(&self, program: GpuHandle, name: &str) -> Option<UniformLocation> {
        self.programs.get(&program)?.uniforms.get(name).copied()
    }

    /// The last scalar value set for `name` on `program`.
    pub fn uniform_value(&self, program: GpuHandle, name: &str) -> Option<UniformValue> {
        let object = self.programs.get(&program)?;
        let location = object.uniforms.get(name)?;
        object.values.get(location).copied()
    }

    /// The last array value set for `name` on `program`.
    pub fn uniform_array_value(&self, program: GpuHandle, name: &str) -> Option<&UniformArray> {
        let object = self.programs.get(&program)?;
        let location = object.uniforms.get(name)?;
        object.arrays.get(location)
    }

    /// Whether the mip chain of `texture` was generated.
    pub fn is_mipmapped(&self, texture: GpuHandle) -> bool {
        self.textures.get(&texture).is_some_and(|t| t.mipmapped)
    }

    /// The current fixed-function configuration.
    pub fn fixed_function_state(&self) -> FixedFunctionState {
        self.state.clone()
    }

    /// The current viewport.
    pub fn current_viewport(&self) -> (i32, i32, u32, u32) {
        self.viewport
    }

    /// The program made current last.
    pub fn current_program(&self) -> GpuHandle {
        self.current_program
    }

    /// The frame buffer bound last.
    pub fn bound_framebuffer(&self) -> GpuHandle {
        self.bound_framebuffer
    }

    /// Live buffer objects.
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Live vertex array objects.
    pub fn live_vertex_arrays(&self) -> usize {
        self.vertex_arrays.len()
    }

    /// Live shader objects.
    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    /// Live program objects.
    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    /// Live texture objects.
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Live frame buffer objects.
    pub fn live_framebuffers(&self) -> usize {
        self.framebuffers.len()
    }

    /// Live objects of every kind.
    pub fn live_objects(&self) -> usize {
        self.live_buffers()
            + self.live_vertex_arrays()
            + self.live_shaders()
            + self.live_programs()
            + self.live_textures()
            + self.live_framebuffers()
    }

    fn record(&mut self, command: GpuCommand) {
        log::trace!("{:?}", command);
        self.commands.push(command);
    }

    fn allocate(&mut self) -> GpuHandle {
        self.next_handle += 1;
        self.allocations += 1;
        GpuHandle(self.next_handle)
    }

    fn error(&mut self, error: GpuError) {
        self.errors.push_back(error);
    }

    fn bound_texture(&self, texture_type: TextureType) -> GpuHandle {
        self.bound_textures
            .get(&(self.active_unit, texture_type))
            .copied()
            .unwrap_or(GpuHandle::NONE)
    }

    fn draw(&mut self, count: u32, index_type: IndexType, offset: usize) {
        self.draw_calls += 1;
        if self.bound_vertex_array.is_none() || self.current_program.is_none() {
            self.error(GpuError::InvalidOperation);
            return;
        }
        let elements = self
            .vertex_arrays
            .get(&self.bound_vertex_array)
            .and_then(|h| self.buffers.get(h))
            .map_or(0, Vec::len);
        if offset + count as usize * index_type.size() > elements {
            self.error(GpuError::InvalidOperation);
        }
    }
}

/// Rejects sources without an entry point or with unbalanced delimiters.
fn check_source(source: &str) -> Result<(), String> {
    if !source.contains("void main") {
        return Err("0:0: error: missing entry point `main`".to_string());
    }
    let mut depth: Vec<char> = Vec::new();
    for (line_no, line) in source.lines().enumerate() {
        for ch in line.chars() {
            match ch {
                '{' | '(' | '[' => depth.push(ch),
                '}' | ')' | ']' => {
                    let open = match ch {
                        '}' => '{',
                        ')' => '(',
                        _ => '[',
                    };
                    if depth.pop() != Some(open) {
                        return Err(format!("0:{}: syntax error: unexpected '{}'", line_no + 1, ch));
                    }
                }
                _ => {}
            }
        }
    }
    match depth.last() {
        Some(open) => Err(format!("0:{}: syntax error: unclosed '{}'", source.lines().count(), open)),
        None => Ok(()),
    }
}

/// Names declared with the `uniform` qualifier outside interface blocks.
fn declared_uniforms(source: &str) -> Vec<String> {
    source
        .split(';')
        .map(|statement| statement.rsplit(['{', '}']).next().unwrap_or(statement))
        .filter_map(|statement| {
            let mut tokens = statement.split_whitespace().skip_while(|t| *t != "uniform");
            tokens.next()?;
            let mut tokens = tokens.skip_while(|t| matches!(*t, "lowp" | "mediump" | "highp"));
            let _ty = tokens.next()?;
            let name = tokens.next()?;
            let name = name.split('[').next().unwrap_or(name);
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

impl GraphicsBackend for HeadlessBackend {
    fn info(&self) -> BackendInfo {
        BackendInfo {
            name: "Headless".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            device: "recording".to_string(),
        }
    }

    fn create_buffer(&mut self) -> Result<GpuHandle, ResourceError> {
        let handle = self.allocate();
        self.buffers.insert(handle, Vec::new());
        self.record(GpuCommand::CreateBuffer(handle));
        Ok(handle)
    }

    fn delete_buffer(&mut self, buffer: GpuHandle) {
        self.buffers.remove(&buffer);
        self.bound_buffers.retain(|_, h| *h != buffer);
        self.record(GpuCommand::DeleteBuffer(buffer));
    }

    fn bind_buffer(&mut self, kind: BufferKind, buffer: GpuHandle) {
        if !buffer.is_none() && !self.buffers.contains_key(&buffer) {
            self.error(GpuError::InvalidOperation);
        }
        if kind == BufferKind::Element {
            if let Some(elements) = self.vertex_arrays.get_mut(&self.bound_vertex_array) {
                *elements = buffer;
            }
        }
        self.bound_buffers.insert(kind, buffer);
        self.record(GpuCommand::BindBuffer(kind, buffer));
    }

    fn buffer_data(&mut self, kind: BufferKind, size: usize, data: Option<&[u8]>, usage: BufferUsage) {
        let bound = self.bound_buffers.get(&kind).copied().unwrap_or_default();
        match self.buffers.get_mut(&bound) {
            Some(store) => {
                *store = match data {
                    Some(bytes) => bytes.to_vec(),
                    None => vec![0; size],
                };
            }
            None => self.error(GpuError::InvalidOperation),
        }
        self.record(GpuCommand::BufferData {
            kind,
            size,
            usage,
            initialized: data.is_some(),
        });
    }

    fn buffer_sub_data(&mut self, kind: BufferKind, offset: usize, data: &[u8]) {
        let bound = self.bound_buffers.get(&kind).copied().unwrap_or_default();
        match self.buffers.get_mut(&bound) {
            Some(store) if offset + data.len() <= store.len() => {
                store[offset..offset + data.len()].copy_from_slice(data);
            }
            Some(_) => self.error(GpuError::InvalidValue),
            None => self.error(GpuError::InvalidOperation),
        }
        self.record(GpuCommand::BufferSubData {
            kind,
            offset,
            len: data.len(),
        });
    }

    fn create_vertex_array(&mut self) -> Result<GpuHandle, ResourceError> {
        let handle = self.allocate();
        self.vertex_arrays.insert(handle, GpuHandle::NONE);
        self.record(GpuCommand::CreateVertexArray(handle));
        Ok(handle)
    }

    fn delete_vertex_array(&mut self, vertex_array: GpuHandle) {
        self.vertex_arrays.remove(&vertex_array);
        if self.bound_vertex_array == vertex_array {
            self.bound_vertex_array = GpuHandle::NONE;
        }
        self.record(GpuCommand::DeleteVertexArray(vertex_array));
    }

    fn bind_vertex_array(&mut self, vertex_array: GpuHandle) {
        if !vertex_array.is_none() && !self.vertex_arrays.contains_key(&vertex_array) {
            self.error(GpuError::InvalidOperation);
        }
        self.bound_vertex_array = vertex_array;
        self.record(GpuCommand::BindVertexArray(vertex_array));
    }

    fn vertex_attribute(&mut self, layout: &VertexAttributeLayout) {
        let vertex_bound = self
            .bound_buffers
            .get(&BufferKind::Vertex)
            .is_some_and(|h| !h.is_none());
        if self.bound_vertex_array.is_none() || !vertex_bound {
            self.error(GpuError::InvalidOperation);
        }
        self.record(GpuCommand::VertexAttribute(*layout));
    }

    fn create_shader(&mut self, stage: ShaderStage) -> Result<GpuHandle, ResourceError> {
        let handle = self.allocate();
        self.shaders.insert(
            handle,
            ShaderObject {
                stage,
                source: String::new(),
                compiled: false,
            },
        );
        self.record(GpuCommand::CreateShader(stage, handle));
        Ok(handle)
    }

    fn compile_shader(&mut self, shader: GpuHandle, source: &str) -> Result<(), String> {
        self.record(GpuCommand::CompileShader(shader));
        let object = self
            .shaders
            .get_mut(&shader)
            .ok_or_else(|| format!("no shader object {shader:?}"))?;
        object.source = source.to_string();
        check_source(source)?;
        object.compiled = true;
        Ok(())
    }

    fn delete_shader(&mut self, shader: GpuHandle) {
        self.shaders.remove(&shader);
        self.record(GpuCommand::DeleteShader(shader));
    }

    fn create_program(&mut self) -> Result<GpuHandle, ResourceError> {
        let handle = self.allocate();
        self.programs.insert(handle, ProgramObject::default());
        self.record(GpuCommand::CreateProgram(handle));
        Ok(handle)
    }

    fn attach_shader(&mut self, program: GpuHandle, shader: GpuHandle) {
        match self.programs.get_mut(&program) {
            Some(object) if !object.attached.contains(&shader) => object.attached.push(shader),
            Some(_) => {}
            None => self.error(GpuError::InvalidValue),
        }
        self.record(GpuCommand::AttachShader(program, shader));
    }

    fn detach_shader(&mut self, program: GpuHandle, shader: GpuHandle) {
        if let Some(object) = self.programs.get_mut(&program) {
            object.attached.retain(|s| *s != shader);
        }
        self.record(GpuCommand::DetachShader(program, shader));
    }

    fn link_program(&mut self, program: GpuHandle) -> Result<(), String> {
        self.record(GpuCommand::LinkProgram(program));
        let attached = self
            .programs
            .get(&program)
            .map(|p| p.attached.clone())
            .ok_or_else(|| format!("no program object {program:?}"))?;

        let mut stages = HashSet::new();
        let mut names = Vec::new();
        for shader in &attached {
            let object = self
                .shaders
                .get(shader)
                .ok_or_else(|| format!("attached shader {shader:?} was deleted"))?;
            if !object.compiled {
                return Err(format!("{:?} stage is not compiled", object.stage));
            }
            stages.insert(object.stage);
            names.extend(declared_uniforms(&object.source));
        }
        for required in [ShaderStage::Vertex, ShaderStage::Fragment] {
            if !stages.contains(&required) {
                return Err(format!("link error: no {} shader attached", required.name()));
            }
        }

        let object = self
            .programs
            .get_mut(&program)
            .ok_or_else(|| format!("no program object {program:?}"))?;
        object.uniforms.clear();
        for name in names {
            let next = UniformLocation(object.uniforms.len() as u32);
            object.uniforms.entry(name).or_insert(next);
        }
        object.linked = true;
        Ok(())
    }

    fn delete_program(&mut self, program: GpuHandle) {
        self.programs.remove(&program);
        if self.current_program == program {
            self.current_program = GpuHandle::NONE;
        }
        self.record(GpuCommand::DeleteProgram(program));
    }

    fn use_program(&mut self, program: GpuHandle) {
        let usable = program.is_none() || self.programs.get(&program).is_some_and(|p| p.linked);
        if !usable {
            self.error(GpuError::InvalidOperation);
        }
        self.current_program = program;
        self.record(GpuCommand::UseProgram(program));
    }

    fn uniform_location(&mut self, program: GpuHandle, name: &str) -> Option<UniformLocation> {
        self.uniform_location_of(program, name)
    }

    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue) {
        match self.programs.get_mut(&self.current_program) {
            Some(object) => {
                object.values.insert(location, *value);
            }
            None => self.error(GpuError::InvalidOperation),
        }
        self.record(GpuCommand::SetUniform(location, *value));
    }

    fn set_uniform_array(&mut self, location: UniformLocation, values: &UniformArray) {
        match self.programs.get_mut(&self.current_program) {
            Some(object) => {
                object.arrays.insert(location, values.clone());
            }
            None => self.error(GpuError::InvalidOperation),
        }
        self.record(GpuCommand::SetUniformArray(location, values.clone()));
    }

    fn create_texture(&mut self) -> Result<GpuHandle, ResourceError> {
        let handle = self.allocate();
        self.textures.insert(handle, TextureObject::default());
        self.record(GpuCommand::CreateTexture(handle));
        Ok(handle)
    }

    fn delete_texture(&mut self, texture: GpuHandle) {
        self.textures.remove(&texture);
        self.bound_textures.retain(|_, h| *h != texture);
        self.record(GpuCommand::DeleteTexture(texture));
    }

    fn active_texture(&mut self, slot: u32) {
        self.active_unit = slot;
        self.record(GpuCommand::ActiveTexture(slot));
    }

    fn bind_texture(&mut self, texture_type: TextureType, texture: GpuHandle) {
        if !texture.is_none() {
            match self.textures.get_mut(&texture) {
                Some(object) => match object.texture_type {
                    None => object.texture_type = Some(texture_type),
                    Some(ty) if ty != texture_type => self.errors.push_back(GpuError::InvalidOperation),
                    Some(_) => {}
                },
                None => self.errors.push_back(GpuError::InvalidOperation),
            }
        }
        self.bound_textures.insert((self.active_unit, texture_type), texture);
        self.record(GpuCommand::BindTexture(texture_type, texture));
    }

    fn tex_image_2d(
        &mut self,
        target: TextureTarget,
        width: u32,
        height: u32,
        format: &TextureFormatSpec,
        data: Option<&[u8]>,
    ) {
        let texture_type = match target {
            TextureTarget::Texture2D => TextureType::Texture2D,
            TextureTarget::CubeFace(_) => TextureType::CubeMap,
        };
        let bound = self.bound_texture(texture_type);
        match self.textures.get_mut(&bound) {
            Some(object) => {
                object.images.insert(target, (width, height));
            }
            None => self.error(GpuError::InvalidOperation),
        }
        self.record(GpuCommand::TexImage2D {
            target,
            width,
            height,
            format: *format,
            has_data: data.is_some(),
        });
    }

    fn tex_wrap(&mut self, texture_type: TextureType, axis: WrapAxis, mode: WrapMode) {
        if self.bound_texture(texture_type).is_none() {
            self.error(GpuError::InvalidOperation);
        }
        self.record(GpuCommand::TexWrap(texture_type, axis, mode));
    }

    fn tex_filter(&mut self, texture_type: TextureType, target: FilterTarget, mode: FilterMode) {
        if target == FilterTarget::Mag && mode.uses_mipmaps() {
            self.error(GpuError::InvalidEnum);
        }
        if self.bound_texture(texture_type).is_none() {
            self.error(GpuError::InvalidOperation);
        }
        self.record(GpuCommand::TexFilter(texture_type, target, mode));
    }

    fn generate_mipmap(&mut self, texture_type: TextureType) {
        let bound = self.bound_texture(texture_type);
        match self.textures.get_mut(&bound) {
            Some(object) => object.mipmapped = true,
            None => self.error(GpuError::InvalidOperation),
        }
        self.record(GpuCommand::GenerateMipmap(texture_type));
    }

    fn create_framebuffer(&mut self) -> Result<GpuHandle, ResourceError> {
        let handle = self.allocate();
        self.framebuffers.insert(handle, FramebufferObject::default());
        self.record(GpuCommand::CreateFramebuffer(handle));
        Ok(handle)
    }

    fn delete_framebuffer(&mut self, framebuffer: GpuHandle) {
        self.framebuffers.remove(&framebuffer);
        if self.bound_framebuffer == framebuffer {
            self.bound_framebuffer = GpuHandle::NONE;
        }
        self.record(GpuCommand::DeleteFramebuffer(framebuffer));
    }

    fn bind_framebuffer(&mut self, framebuffer: GpuHandle) {
        if !framebuffer.is_none() && !self.framebuffers.contains_key(&framebuffer) {
            self.error(GpuError::InvalidOperation);
        }
        self.bound_framebuffer = framebuffer;
        self.record(GpuCommand::BindFramebuffer(framebuffer));
    }

    fn framebuffer_texture(&mut self, attachment: Attachment, target: TextureTarget, texture: GpuHandle) {
        let bound = self.bound_framebuffer;
        match self.framebuffers.get_mut(&bound) {
            Some(object) => {
                object
                    .attachments
                    .insert(attachment_slot(attachment), (attachment, texture));
            }
            None => self.error(GpuError::InvalidOperation),
        }
        self.record(GpuCommand::FramebufferTexture(attachment, target, texture));
    }

    fn draw_buffers(&mut self, color_attachments: u32) {
        if let Some(object) = self.framebuffers.get_mut(&self.bound_framebuffer) {
            object.draw_buffers = color_attachments;
        }
        self.record(GpuCommand::DrawBuffers(color_attachments));
    }

    fn framebuffer_status(&mut self) -> FramebufferStatus {
        let Some(object) = self.framebuffers.get(&self.bound_framebuffer) else {
            return FramebufferStatus::Complete;
        };
        if object.attachments.is_empty() {
            return FramebufferStatus::MissingAttachment;
        }
        let mut size = None;
        for (_, texture) in object.attachments.values() {
            let image = self
                .textures
                .get(texture)
                .and_then(|t| t.images.get(&TextureTarget::Texture2D));
            let Some(&(w, h)) = image else {
                return FramebufferStatus::IncompleteAttachment;
            };
            if w == 0 || h == 0 || size.is_some_and(|s| s != (w, h)) {
                return FramebufferStatus::IncompleteAttachment;
            }
            size = Some((w, h));
        }
        let colors = object
            .attachments
            .values()
            .filter(|(a, _)| matches!(a, Attachment::Color(_)))
            .count() as u32;
        if object.draw_buffers > colors {
            return FramebufferStatus::IncompleteDrawBuffer;
        }
        FramebufferStatus::Complete
    }

    fn set_capability(&mut self, capability: Capability, enabled: bool) {
        self.state.capabilities.insert(capability, enabled);
        self.record(GpuCommand::SetCapability(capability, enabled));
    }

    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.state.blend_func = (src, dst);
        self.record(GpuCommand::BlendFunc(src, dst));
    }

    fn blend_equation(&mut self, operation: BlendOperation) {
        self.state.blend_equation = operation;
        self.record(GpuCommand::BlendEquation(operation));
    }

    fn depth_mask(&mut self, write: bool) {
        self.state.depth_mask = write;
        self.record(GpuCommand::DepthMask(write));
    }

    fn depth_func(&mut self, compare: CompareFunction) {
        self.state.depth_func = compare;
        self.record(GpuCommand::DepthFunc(compare));
    }

    fn cull_face(&mut self, face: Face) {
        self.state.cull_face = face;
        self.record(GpuCommand::CullFace(face));
    }

    fn front_face(&mut self, front_face: FrontFace) {
        self.state.front_face = front_face;
        self.record(GpuCommand::FrontFace(front_face));
    }

    fn polygon_offset(&mut self, factor: f32, units: f32) {
        self.state.polygon_offset = (factor, units);
        self.record(GpuCommand::PolygonOffset(factor, units));
    }

    fn stencil_func(&mut self, compare: CompareFunction, reference: i32, read_mask: u32) {
        self.state.stencil_func = (compare, reference, read_mask);
        self.record(GpuCommand::StencilFunc(compare, reference, read_mask));
    }

    fn stencil_op(&mut self, fail: StencilOperation, depth_fail: StencilOperation, pass: StencilOperation) {
        self.state.stencil_op = (fail, depth_fail, pass);
        self.record(GpuCommand::StencilOp(fail, depth_fail, pass));
    }

    fn stencil_mask(&mut self, write_mask: u32) {
        self.state.stencil_mask = write_mask;
        self.record(GpuCommand::StencilMask(write_mask));
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.viewport = (x, y, width, height);
        self.record(GpuCommand::Viewport(x, y, width, height));
    }

    fn clear_values(&mut self, color: [f32; 4], depth: f32, stencil: i32) {
        self.clear_values = (color, depth, stencil);
        self.record(GpuCommand::ClearValues(color, depth, stencil));
    }

    fn clear(&mut self, flags: ClearFlags) {
        self.record(GpuCommand::Clear(flags));
    }

    fn draw_elements(&mut self, topology: PrimitiveTopology, count: u32, index_type: IndexType, offset: usize) {
        self.draw(count, index_type, offset);
        self.record(GpuCommand::DrawElements {
            topology,
            count,
            index_type,
            offset,
            instances: None,
        });
    }

    fn draw_elements_instanced(
        &mut self,
        topology: PrimitiveTopology,
        count: u32,
        index_type: IndexType,
        offset: usize,
        instances: u32,
    ) {
        self.draw(count, index_type, offset);
        self.record(GpuCommand::DrawElements {
            topology,
            count,
            index_type,
            offset,
            instances: Some(instances),
        });
    }

    fn get_error(&mut self) -> Option<GpuError> {
        self.errors.pop_front()
    }
}
