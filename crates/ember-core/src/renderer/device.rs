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

//! The device: resource factory, id-keyed cache and draw entry points.

use crate::guid::Guid;
use crate::renderer::api::*;
use crate::renderer::error::{RenderError, ResourceError, ShaderError};
use crate::renderer::registry::ResourceRegistry;
use crate::renderer::traits::{Bindable, Drawable, GraphicsBackend};
use std::collections::BTreeMap;

/// Counters kept by a [`Device`] over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Resources built on the backend.
    pub resources_created: usize,
    /// Resources destroyed, cascades included.
    pub resources_destroyed: usize,
    /// `create_*_with_id` calls answered from the registry.
    pub cache_hits: usize,
    /// Plain draw calls.
    pub draw_calls: usize,
    /// Instanced draw calls.
    pub instanced_draw_calls: usize,
}

/// Owns a backend and every resource created through it.
///
/// Resources are addressed by [`Guid`]. Each `create_*_with_id` call first looks the
/// id up in the registry and returns it untouched on a hit, so per-frame code can
/// ask for the same logical resource every frame without re-creating it. Plain
/// `create_*` calls use a fresh id.
///
/// Ownership between resources is recorded as registry dependencies: a geometry
/// depends on its buffers, a program on its shader codes and a frame buffer on its
/// attachment textures. [`Device::remove`] cascades accordingly.
#[derive(Debug)]
pub struct Device<B: GraphicsBackend> {
    backend: B,
    registry: ResourceRegistry<RhiResource>,
    stats: DeviceStats,
    // Window viewport, restored when rendering returns from a frame buffer.
    viewport: Option<(i32, i32, u32, u32)>,
}

fn lookup(registry: &ResourceRegistry<RhiResource>, id: Guid) -> Result<&RhiResource, ResourceError> {
    registry.get(&id).ok_or(ResourceError::NotFound(id))
}

fn lookup_mut(
    registry: &mut ResourceRegistry<RhiResource>,
    id: Guid,
) -> Result<&mut RhiResource, ResourceError> {
    registry.get_mut(&id).ok_or(ResourceError::NotFound(id))
}

impl<B: GraphicsBackend> Device<B> {
    /// Wraps `backend`.
    pub fn new(backend: B) -> Self {
        let info = backend.info();
        log::info!(
            "Device created on {} ({}, {})",
            info.name,
            info.version,
            info.device
        );
        Self {
            backend,
            registry: ResourceRegistry::new(),
            stats: DeviceStats::default(),
            viewport: None,
        }
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The backend, mutably. Bypasses the registry; meant for backend-specific setup.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// The backend's name and driver strings.
    pub fn info(&self) -> BackendInfo {
        self.backend.info()
    }

    /// The resource registry.
    pub fn registry(&self) -> &ResourceRegistry<RhiResource> {
        &self.registry
    }

    /// Lifetime counters.
    pub fn stats(&self) -> DeviceStats {
        self.stats
    }

    /// Returns `Ok(true)` if `id` is already registered as a `kind` resource.
    fn cache_hit(&mut self, id: Guid, kind: ResourceKind) -> Result<bool, ResourceError> {
        match self.registry.get(&id) {
            Some(resource) if resource.kind() == kind => {
                log::trace!("Cache hit for {:?} {}", kind, id);
                self.stats.cache_hits += 1;
                Ok(true)
            }
            Some(resource) => Err(ResourceError::WrongKind {
                id,
                expected: kind,
                found: resource.kind(),
            }),
            None => Ok(false),
        }
    }

    fn register(&mut self, id: Guid, resource: RhiResource, dependencies: &[Guid]) {
        log::debug!(
            "Registered {:?} {} (handle {:?})",
            resource.kind(),
            id,
            resource.native_handle()
        );
        self.registry.add(id, resource);
        for dependency in dependencies {
            self.registry.add_dependency(id, *dependency);
        }
        self.stats.resources_created += 1;
    }

    // --- Buffers ---

    /// Creates a buffer under a fresh id.
    pub fn create_buffer(
        &mut self,
        descriptor: BufferDescriptor,
        data: Option<&[u8]>,
    ) -> Result<Guid, ResourceError> {
        self.create_buffer_with_id(Guid::new(), descriptor, data)
    }

    /// Creates a buffer under `id`, or returns `id` if it already exists.
    ///
    /// ## Arguments
    /// * `descriptor` - The buffer layout. `size` must match `data` when data is given.
    /// * `data` - Initial contents, or `None` to leave the store uninitialized.
    /// ## Errors
    /// * `ResourceError::WrongKind` - If `id` names a resource that is not a buffer.
    /// * `ResourceError::InvalidSize` / `InvalidDescriptor` - If the descriptor is unusable.
    pub fn create_buffer_with_id(
        &mut self,
        id: Guid,
        descriptor: BufferDescriptor,
        data: Option<&[u8]>,
    ) -> Result<Guid, ResourceError> {
        if self.cache_hit(id, ResourceKind::Buffer)? {
            return Ok(id);
        }
        let buffer = Buffer::new(&mut self.backend, descriptor, data)?;
        self.register(id, RhiResource::Buffer(buffer), &[]);
        Ok(id)
    }

    /// Creates a per-vertex attribute buffer from raw bytes.
    pub fn create_vertex_buffer(
        &mut self,
        usage: BufferUsage,
        attribute_type: AttributeType,
        components: u32,
        data: &[u8],
    ) -> Result<Guid, ResourceError> {
        let descriptor = BufferDescriptor::vertex(usage, attribute_type, components, data.len());
        self.create_buffer(descriptor, Some(data))
    }

    /// Creates an element buffer from raw index bytes.
    pub fn create_element_buffer(
        &mut self,
        usage: BufferUsage,
        index_type: IndexType,
        data: &[u8],
    ) -> Result<Guid, ResourceError> {
        let descriptor = BufferDescriptor::element(usage, index_type, data.len());
        self.create_buffer(descriptor, Some(data))
    }

    /// Replaces the whole store of a buffer.
    ///
    /// Geometries drawing from it as their element buffer pick up the new index count.
    pub fn reallocate_data(
        &mut self,
        id: Guid,
        data: Option<&[u8]>,
        size: usize,
    ) -> Result<(), ResourceError> {
        let buffer = lookup_mut(&mut self.registry, id)?.as_buffer_mut(id)?;
        buffer.reallocate_data(&mut self.backend, data, size)?;
        let descriptor = *buffer.descriptor();

        if descriptor.kind == BufferKind::Element {
            let dependents: Vec<Guid> = self.registry.dependents_of(&id).collect();
            for dependent in dependents {
                if let Some(RhiResource::Geometry(geometry)) = self.registry.get_mut(&dependent) {
                    if geometry.elements().buffer == id {
                        geometry.refresh_element_count(&descriptor);
                    }
                }
            }
        }
        Ok(())
    }

    /// Overwrites part of a buffer in place.
    pub fn substitute_data(
        &mut self,
        id: Guid,
        offset: usize,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        lookup_mut(&mut self.registry, id)?
            .as_buffer_mut(id)?
            .substitute_data(&mut self.backend, offset, data)
    }

    // --- Geometry ---

    /// Creates a geometry under a fresh id.
    pub fn create_geometry(&mut self, descriptor: &GeometryDescriptor) -> Result<Guid, ResourceError> {
        self.create_geometry_with_id(Guid::new(), descriptor)
    }

    /// Creates a geometry under `id` from registered buffers, or returns `id` if it
    /// already exists. The geometry depends on every buffer it reads.
    pub fn create_geometry_with_id(
        &mut self,
        id: Guid,
        descriptor: &GeometryDescriptor,
    ) -> Result<Guid, ResourceError> {
        if self.cache_hit(id, ResourceKind::Geometry)? {
            return Ok(id);
        }
        let mut vertex_buffers = Vec::with_capacity(descriptor.vertex_buffers.len());
        for (location, buffer_id) in &descriptor.vertex_buffers {
            let buffer = lookup(&self.registry, *buffer_id)?.as_buffer(*buffer_id)?;
            vertex_buffers.push((*location, *buffer_id, buffer));
        }
        let element_id = descriptor.element_buffer;
        let elements = lookup(&self.registry, element_id)?.as_buffer(element_id)?;

        let geometry = Geometry::new(
            &mut self.backend,
            descriptor.topology,
            &vertex_buffers,
            (element_id, elements),
        )?;
        let dependencies: Vec<Guid> = geometry.buffer_ids().collect();
        self.register(id, RhiResource::Geometry(geometry), &dependencies);
        Ok(id)
    }

    // --- Shaders ---

    /// Compiles a shader stage under a fresh id.
    pub fn create_shader_code(&mut self, stage: ShaderStage, source: &str) -> Result<Guid, ResourceError> {
        self.create_shader_code_with_id(Guid::new(), stage, source)
    }

    /// Compiles a shader stage under `id`, or returns `id` if it already exists.
    ///
    /// A compilation failure is logged and registered as a failed stage; programs
    /// built from it come out unlinked.
    pub fn create_shader_code_with_id(
        &mut self,
        id: Guid,
        stage: ShaderStage,
        source: &str,
    ) -> Result<Guid, ResourceError> {
        if self.cache_hit(id, ResourceKind::ShaderCode)? {
            return Ok(id);
        }
        let code = ShaderCode::new(&mut self.backend, stage, source)?;
        self.register(id, RhiResource::ShaderCode(code), &[]);
        Ok(id)
    }

    /// Links a program under a fresh id.
    pub fn create_shader_program(
        &mut self,
        stages: &BTreeMap<ShaderStage, Guid>,
        uniforms: UniformMap,
        arrays: UniformArrayMap,
    ) -> Result<Guid, ResourceError> {
        self.create_shader_program_with_id(Guid::new(), stages, uniforms, arrays)
    }

    /// Links a program under `id` from registered shader codes, or returns `id` if
    /// it already exists. On a hit the given tables are dropped and the program
    /// keeps the ones it was built with.
    ///
    /// A compile or link failure still registers the program, with a null handle;
    /// query it with [`Device::program_link_status`].
    ///
    /// ## Errors
    /// * `ShaderError::MissingStage` - If a stage id is not registered.
    /// * `ResourceError::WrongKind` - If a stage id is not a shader code.
    /// * `ResourceError::InvalidDescriptor` - If a code is filed under another stage.
    pub fn create_shader_program_with_id(
        &mut self,
        id: Guid,
        stages: &BTreeMap<ShaderStage, Guid>,
        uniforms: UniformMap,
        arrays: UniformArrayMap,
    ) -> Result<Guid, ResourceError> {
        if self.cache_hit(id, ResourceKind::ShaderProgram)? {
            return Ok(id);
        }
        let mut codes = Vec::with_capacity(stages.len());
        for (stage, code_id) in stages {
            let resource = self
                .registry
                .get(code_id)
                .ok_or(ShaderError::MissingStage {
                    stage: *stage,
                    id: *code_id,
                })?;
            let code = resource.as_shader_code(*code_id)?;
            if code.stage() != *stage {
                return Err(ResourceError::InvalidDescriptor(format!(
                    "{:?} code {} supplied for the {:?} stage",
                    code.stage(),
                    code_id,
                    stage
                )));
            }
            codes.push((*code_id, code));
        }

        let program = ShaderProgram::new(&mut self.backend, &codes, uniforms, arrays)?;
        let dependencies: Vec<Guid> = stages.values().copied().collect();
        self.register(id, RhiResource::ShaderProgram(program), &dependencies);
        Ok(id)
    }

    /// `Ok` if the program linked, otherwise the compile or link failure.
    pub fn program_link_status(&self, id: Guid) -> Result<(), ResourceError> {
        lookup(&self.registry, id)?
            .as_shader_program(id)?
            .link_status()
            .map_err(|err| ResourceError::Shader(err.clone()))
    }

    /// Pushes the current value of every uniform the program exposes.
    pub fn update_uniforms(&mut self, id: Guid) -> Result<(), ResourceError> {
        lookup(&self.registry, id)?
            .as_shader_program(id)?
            .update_uniforms(&mut self.backend);
        Ok(())
    }

    // --- Textures ---

    /// Creates a 2D texture under a fresh id.
    pub fn create_texture_2d(
        &mut self,
        descriptor: TextureDescriptor,
        data: Option<&[u8]>,
    ) -> Result<Guid, ResourceError> {
        self.create_texture_2d_with_id(Guid::new(), descriptor, data)
    }

    /// Creates a 2D texture under `id`, or returns `id` if it already exists.
    pub fn create_texture_2d_with_id(
        &mut self,
        id: Guid,
        descriptor: TextureDescriptor,
        data: Option<&[u8]>,
    ) -> Result<Guid, ResourceError> {
        if self.cache_hit(id, ResourceKind::Texture)? {
            return Ok(id);
        }
        let texture = Texture::new_2d(&mut self.backend, descriptor, data)?;
        self.register(id, RhiResource::Texture(texture), &[]);
        Ok(id)
    }

    /// Creates a cube map under a fresh id.
    pub fn create_texture_cubemap(
        &mut self,
        descriptor: TextureDescriptor,
        faces: &[(CubeFace, &[u8])],
    ) -> Result<Guid, ResourceError> {
        self.create_texture_cubemap_with_id(Guid::new(), descriptor, faces)
    }

    /// Creates a cube map under `id`, or returns `id` if it already exists. Faces
    /// not given stay undefined.
    pub fn create_texture_cubemap_with_id(
        &mut self,
        id: Guid,
        descriptor: TextureDescriptor,
        faces: &[(CubeFace, &[u8])],
    ) -> Result<Guid, ResourceError> {
        if self.cache_hit(id, ResourceKind::Texture)? {
            return Ok(id);
        }
        let texture = Texture::new_cube_map(&mut self.backend, descriptor, faces)?;
        self.register(id, RhiResource::Texture(texture), &[]);
        Ok(id)
    }

    /// Sets the wrap mode of one texture axis.
    pub fn set_texture_wrap(&mut self, id: Guid, axis: WrapAxis, mode: WrapMode) -> Result<(), ResourceError> {
        let texture = lookup_mut(&mut self.registry, id)?.as_texture_mut(id)?;
        texture.set_wrap(&mut self.backend, axis, mode);
        Ok(())
    }

    /// Sets a texture's minification or magnification filter.
    pub fn set_texture_filter(
        &mut self,
        id: Guid,
        target: FilterTarget,
        mode: FilterMode,
    ) -> Result<(), ResourceError> {
        let texture = lookup_mut(&mut self.registry, id)?.as_texture_mut(id)?;
        texture.set_filter(&mut self.backend, target, mode);
        Ok(())
    }

    /// Generates a texture's mip chain.
    pub fn generate_mipmaps(&mut self, id: Guid) -> Result<(), ResourceError> {
        let texture = lookup_mut(&mut self.registry, id)?.as_texture_mut(id)?;
        texture.generate_mipmaps(&mut self.backend);
        Ok(())
    }

    /// Re-uploads the image of a 2D texture.
    pub fn update_texture_2d(&mut self, id: Guid, data: &[u8]) -> Result<(), ResourceError> {
        let texture = lookup_mut(&mut self.registry, id)?.as_texture_mut(id)?;
        texture.update_2d(&mut self.backend, data)
    }

    /// Uploads one cube-map face.
    pub fn upload_cube_face(&mut self, id: Guid, face: CubeFace, data: &[u8]) -> Result<(), ResourceError> {
        let texture = lookup_mut(&mut self.registry, id)?.as_texture_mut(id)?;
        texture.upload_face(&mut self.backend, face, data)
    }

    // --- Frame buffers ---

    /// Creates a frame buffer under a fresh id.
    pub fn create_frame_buffer(
        &mut self,
        width: u32,
        height: u32,
        color_attachments: &[TextureFormat],
        depth_attachment: Option<TextureFormat>,
    ) -> Result<Guid, ResourceError> {
        self.create_frame_buffer_with_id(Guid::new(), width, height, color_attachments, depth_attachment)
    }

    /// Creates a frame buffer under `id`, or returns `id` if it already exists.
    ///
    /// One texture per attachment is created under an id derived from `id` and
    /// registered as a dependency, so removing the frame buffer removes them too
    /// unless something else depends on them. An incomplete frame buffer is logged
    /// and still returned; check it with [`Device::frame_buffer_complete`].
    pub fn create_frame_buffer_with_id(
        &mut self,
        id: Guid,
        width: u32,
        height: u32,
        color_attachments: &[TextureFormat],
        depth_attachment: Option<TextureFormat>,
    ) -> Result<Guid, ResourceError> {
        if self.cache_hit(id, ResourceKind::FrameBuffer)? {
            return Ok(id);
        }
        if let Some(format) = color_attachments.iter().find(|f| f.is_depth()) {
            return Err(ResourceError::InvalidDescriptor(format!(
                "{format:?} cannot be a color attachment"
            )));
        }
        if let Some(format) = depth_attachment.filter(|f| !f.is_depth()) {
            return Err(ResourceError::InvalidDescriptor(format!(
                "{format:?} cannot be a depth attachment"
            )));
        }

        let attachment = |format: TextureFormat| TextureDescriptor {
            wrap: WrapMode::ClampToEdge,
            ..TextureDescriptor::texture_2d(width, height, format)
        };
        let mut texture_ids = Vec::with_capacity(color_attachments.len() + 1);
        for (index, format) in color_attachments.iter().enumerate() {
            let texture_id = id.derive(&format!("color{index}"));
            self.create_texture_2d_with_id(texture_id, attachment(*format), None)?;
            texture_ids.push(texture_id);
        }
        let depth_id = match depth_attachment {
            Some(format) => {
                let texture_id = id.derive("depth");
                self.create_texture_2d_with_id(texture_id, attachment(format), None)?;
                Some(texture_id)
            }
            None => None,
        };

        let built = self.build_frame_buffer(width, height, &texture_ids, depth_id);
        let frame_buffer = match built {
            Ok(frame_buffer) => frame_buffer,
            Err(err) => {
                for texture_id in texture_ids.iter().chain(depth_id.as_ref()) {
                    self.remove(*texture_id);
                }
                return Err(err);
            }
        };
        let dependencies: Vec<Guid> = frame_buffer.attachments().collect();
        self.register(id, RhiResource::FrameBuffer(frame_buffer), &dependencies);
        Ok(id)
    }

    fn build_frame_buffer(
        &mut self,
        width: u32,
        height: u32,
        colors: &[Guid],
        depth: Option<Guid>,
    ) -> Result<FrameBuffer, ResourceError> {
        let mut color_textures = Vec::with_capacity(colors.len());
        for texture_id in colors {
            color_textures.push((*texture_id, lookup(&self.registry, *texture_id)?.as_texture(*texture_id)?));
        }
        let depth_texture = match depth {
            Some(texture_id) => Some((texture_id, lookup(&self.registry, texture_id)?.as_texture(texture_id)?)),
            None => None,
        };
        FrameBuffer::new(&mut self.backend, width, height, &color_textures, depth_texture)
    }

    /// Whether a frame buffer can be rendered into. The reason is logged when not.
    pub fn frame_buffer_complete(&self, id: Guid) -> Result<bool, ResourceError> {
        Ok(lookup(&self.registry, id)?.as_frame_buffer(id)?.is_complete())
    }

    // --- Pipeline state ---

    /// Builds a pipeline-state preset.
    pub fn create_pipeline_state(&self, preset: PipelinePreset) -> PipelineState {
        PipelineState::preset(preset)
    }

    /// Asserts every sub-state of `state` on the backend.
    pub fn apply_pipeline_state(&mut self, state: &PipelineState) {
        state.apply(&mut self.backend);
    }

    // --- Lookup and lifetime ---

    /// Whether `id` is registered.
    pub fn contains(&self, id: Guid) -> bool {
        self.registry.contains(&id)
    }

    /// Borrows a resource. `None` on an unknown id.
    pub fn get(&self, id: Guid) -> Option<&RhiResource> {
        self.registry.get(&id)
    }

    /// The backend object name of a resource, [`GpuHandle::NONE`] on an unknown id.
    pub fn native_handle(&self, id: Guid) -> GpuHandle {
        self.registry
            .get(&id)
            .map_or(GpuHandle::NONE, RhiResource::native_handle)
    }

    /// Borrows a buffer.
    pub fn buffer(&self, id: Guid) -> Result<&Buffer, ResourceError> {
        lookup(&self.registry, id)?.as_buffer(id)
    }

    /// Borrows a geometry.
    pub fn geometry(&self, id: Guid) -> Result<&Geometry, ResourceError> {
        lookup(&self.registry, id)?.as_geometry(id)
    }

    /// Borrows a shader code.
    pub fn shader_code(&self, id: Guid) -> Result<&ShaderCode, ResourceError> {
        lookup(&self.registry, id)?.as_shader_code(id)
    }

    /// Borrows a shader program.
    pub fn shader_program(&self, id: Guid) -> Result<&ShaderProgram, ResourceError> {
        lookup(&self.registry, id)?.as_shader_program(id)
    }

    /// Borrows a texture.
    pub fn texture(&self, id: Guid) -> Result<&Texture, ResourceError> {
        lookup(&self.registry, id)?.as_texture(id)
    }

    /// Borrows a frame buffer.
    pub fn frame_buffer(&self, id: Guid) -> Result<&FrameBuffer, ResourceError> {
        lookup(&self.registry, id)?.as_frame_buffer(id)
    }

    /// Removes a resource and every dependency left without a dependent, releasing
    /// their GPU objects. Returns how many resources were destroyed.
    pub fn remove(&mut self, id: Guid) -> usize {
        let removed = self.registry.remove(id);
        let count = removed.len();
        for (removed_id, mut resource) in removed {
            log::debug!("Destroying {:?} {}", resource.kind(), removed_id);
            resource.release(&mut self.backend);
        }
        self.stats.resources_destroyed += count;
        count
    }

    /// Destroys every resource.
    pub fn clear_resources(&mut self) {
        let removed = self.registry.clear();
        let count = removed.len();
        for (_, mut resource) in removed {
            resource.release(&mut self.backend);
        }
        self.stats.resources_destroyed += count;
        if count > 0 {
            log::debug!("Destroyed {count} resource(s)");
        }
    }

    // --- Binding and drawing ---

    /// Binds the frame buffer, geometry, program and textures of `binding`.
    ///
    /// ## Errors
    /// * `ResourceError::IncompleteBinding` - If the geometry or the program is
    ///   missing. Nothing is issued in that case.
    /// * `ResourceError::NotFound` / `WrongKind` - If an id does not resolve.
    pub fn bind(&mut self, binding: &BindingState) -> Result<(), ResourceError> {
        binding.bind(&self.registry, &mut self.backend)
    }

    /// Unbinds everything `binding` names. Leaving a frame buffer restores the
    /// viewport last set with [`Device::set_viewport`].
    pub fn unbind(&mut self, binding: &BindingState) -> Result<(), ResourceError> {
        binding.unbind(&self.registry, &mut self.backend)?;
        if binding.frame_buffer.is_some() {
            self.restore_viewport();
        }
        Ok(())
    }

    /// Draws the bound geometry over its full index range.
    ///
    /// The binding must be valid; an invalid one is rejected before any command.
    pub fn draw(&mut self, binding: &BindingState) -> Result<(), ResourceError> {
        let geometry = lookup_drawable(&self.registry, binding)?;
        geometry.draw(&mut self.backend);
        self.stats.draw_calls += 1;
        Ok(())
    }

    /// Draws the bound geometry `instances` times.
    pub fn instanced_draw(&mut self, binding: &BindingState, instances: u32) -> Result<(), ResourceError> {
        let geometry = lookup_drawable(&self.registry, binding)?;
        geometry.instanced_draw(&mut self.backend, instances);
        self.stats.instanced_draw_calls += 1;
        Ok(())
    }

    /// Makes a frame buffer the render target, or the window when `None`.
    ///
    /// A frame buffer sets the viewport to its own size; returning to the window
    /// restores the viewport last set with [`Device::set_viewport`].
    pub fn bind_frame_buffer(&mut self, target: Option<Guid>) -> Result<(), ResourceError> {
        match target {
            Some(id) => lookup(&self.registry, id)?
                .as_frame_buffer(id)?
                .bind(&mut self.backend),
            None => {
                self.backend.bind_framebuffer(GpuHandle::NONE);
                self.restore_viewport();
            }
        }
        Ok(())
    }

    fn restore_viewport(&mut self) {
        if let Some((x, y, width, height)) = self.viewport {
            self.backend.viewport(x, y, width, height);
        }
    }

    /// Sets the values used by [`Device::clear`].
    pub fn set_clear_values(&mut self, color: [f32; 4], depth: f32, stencil: i32) {
        self.backend.clear_values(color, depth, stencil);
    }

    /// Clears the selected buffers of the bound target.
    ///
    /// Clearing honors the write masks, so the depth and stencil masks are opened
    /// first for the buffers being cleared.
    pub fn clear(&mut self, flags: ClearFlags) {
        if flags.depth {
            self.backend.depth_mask(true);
        }
        if flags.stencil {
            self.backend.stencil_mask(u32::MAX);
        }
        self.backend.clear(flags);
    }

    /// Sets the viewport rectangle of the window.
    pub fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.viewport = Some((x, y, width, height));
        self.backend.viewport(x, y, width, height);
    }

    /// Drains the backend's error queue.
    ///
    /// Any error is unrecoverable: every queued error is logged and the first one
    /// returned, and the caller is expected to stop its frame loop.
    pub fn check_error(&mut self) -> Result<(), RenderError> {
        let mut first = None;
        while let Some(error) = self.backend.get_error() {
            log::error!("GPU error: {:?}", error);
            first.get_or_insert(error);
        }
        match first {
            Some(error) => Err(RenderError::Gpu(error)),
            None => Ok(()),
        }
    }
}

fn lookup_drawable<'a>(
    registry: &'a ResourceRegistry<RhiResource>,
    binding: &BindingState,
) -> Result<&'a dyn Drawable, ResourceError> {
    let (Some(geometry), Some(program)) = (binding.geometry, binding.program) else {
        return Err(ResourceError::IncompleteBinding);
    };
    lookup(registry, program)?.as_shader_program(program)?;
    let resource = lookup(registry, geometry)?;
    resource.as_drawable().ok_or(ResourceError::WrongKind {
        id: geometry,
        expected: ResourceKind::Geometry,
        found: resource.kind(),
    })
}

impl<B: GraphicsBackend> Drop for Device<B> {
    fn drop(&mut self) {
        self.clear_resources();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::headless::{GpuCommand, HeadlessBackend};

    const VS: &str = "uniform mat4 u_model;\nvoid main() { gl_Position = u_model * vec4(0.0); }";
    const FS: &str = "uniform vec4 u_color;\nout vec4 c;\nvoid main() { c = u_color; }";

    fn device() -> Device<HeadlessBackend> {
        Device::new(HeadlessBackend::new())
    }

    fn triangle(device: &mut Device<HeadlessBackend>) -> (Guid, Guid, Guid) {
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let vb = device
            .create_vertex_buffer(
                BufferUsage::Static,
                AttributeType::Float,
                3,
                bytemuck::cast_slice(&positions),
            )
            .unwrap();
        let ib = device
            .create_element_buffer(BufferUsage::Static, IndexType::U32, bytemuck::cast_slice(&[0u32, 1, 2]))
            .unwrap();
        let geometry = device
            .create_geometry(&GeometryDescriptor::new(ib).with_attribute(0, vb))
            .unwrap();
        (geometry, vb, ib)
    }

    fn program(device: &mut Device<HeadlessBackend>) -> Guid {
        let vs = device.create_shader_code(ShaderStage::Vertex, VS).unwrap();
        let fs = device.create_shader_code(ShaderStage::Fragment, FS).unwrap();
        let stages = BTreeMap::from([(ShaderStage::Vertex, vs), (ShaderStage::Fragment, fs)]);
        device
            .create_shader_program(&stages, UniformMap::new(), UniformArrayMap::new())
            .unwrap()
    }

    #[test]
    fn cache_hit_does_not_touch_the_gpu() {
        let mut device = device();
        let id = Guid::new();
        let desc = BufferDescriptor::vertex(BufferUsage::Static, AttributeType::Float, 3, 12);
        device.create_buffer_with_id(id, desc, None).unwrap();
        let handle = device.native_handle(id);
        let allocations = device.backend().allocations();
        device.backend_mut().clear_commands();

        assert_eq!(device.create_buffer_with_id(id, desc, None).unwrap(), id);
        assert_eq!(device.native_handle(id), handle);
        assert_eq!(device.backend().allocations(), allocations);
        assert!(device.backend().commands().is_empty());
        assert_eq!(device.stats().cache_hits, 1);
    }

    #[test]
    fn cache_hit_of_another_kind_is_an_error() {
        let mut device = device();
        let id = device
            .create_texture_2d(TextureDescriptor::texture_2d(1, 1, TextureFormat::R8), None)
            .unwrap();
        let err = device
            .create_shader_code_with_id(id, ShaderStage::Vertex, VS)
            .unwrap_err();
        assert!(matches!(
            err,
            ResourceError::WrongKind {
                expected: ResourceKind::ShaderCode,
                found: ResourceKind::Texture,
                ..
            }
        ));
    }

    #[test]
    fn removing_geometry_releases_its_buffers() {
        let mut device = device();
        let (geometry, vb, ib) = triangle(&mut device);
        assert_eq!(device.remove(geometry), 3);
        assert!(!device.contains(vb) && !device.contains(ib));
        assert_eq!(device.backend().live_buffers(), 0);
        assert_eq!(device.backend().live_vertex_arrays(), 0);
    }

    #[test]
    fn native_handle_of_unknown_id_is_null() {
        let device = device();
        assert!(device.native_handle(Guid::new()).is_none());
        assert!(device.get(Guid::new()).is_none());
    }

    #[test]
    fn reallocating_indices_updates_draw_count() {
        let mut device = device();
        let (geometry, _, ib) = triangle(&mut device);
        let indices: [u32; 6] = [0, 1, 2, 2, 1, 0];
        device
            .reallocate_data(ib, Some(bytemuck::cast_slice(&indices)), 24)
            .unwrap();
        assert_eq!(device.geometry(geometry).unwrap().elements().count, 6);
    }

    #[test]
    fn invalid_binding_is_rejected_before_any_command() {
        let mut device = device();
        let (geometry, _, _) = triangle(&mut device);
        device.backend_mut().clear_commands();

        let binding = BindingState::new().with_geometry(geometry);
        assert_eq!(device.bind(&binding), Err(ResourceError::IncompleteBinding));
        assert_eq!(device.draw(&binding), Err(ResourceError::IncompleteBinding));
        assert_eq!(
            device.instanced_draw(&BindingState::new(), 3),
            Err(ResourceError::IncompleteBinding)
        );
        assert!(device.backend().commands().is_empty());
    }

    #[test]
    fn bind_order_and_draw() {
        let mut device = device();
        let (geometry, _, _) = triangle(&mut device);
        let program = program(&mut device);
        let texture = device
            .create_texture_2d(TextureDescriptor::texture_2d(1, 1, TextureFormat::Rgba8), None)
            .unwrap();
        let target = device
            .create_frame_buffer(4, 4, &[TextureFormat::Rgba8], Some(TextureFormat::Depth24))
            .unwrap();
        let binding = BindingState::new()
            .with_geometry(geometry)
            .with_program(program)
            .with_texture(1, texture)
            .with_frame_buffer(target);
        device.backend_mut().clear_commands();

        device.bind(&binding).unwrap();
        device.draw(&binding).unwrap();
        device.unbind(&binding).unwrap();

        let cmds = device.backend().commands().to_vec();
        assert_eq!(cmds[0], GpuCommand::BindFramebuffer(device.native_handle(target)));
        assert_eq!(cmds[1], GpuCommand::Viewport(0, 0, 4, 4));
        assert_eq!(cmds[2], GpuCommand::BindVertexArray(device.native_handle(geometry)));
        assert_eq!(cmds[3], GpuCommand::UseProgram(device.native_handle(program)));
        assert_eq!(cmds[4], GpuCommand::ActiveTexture(1));
        assert_eq!(
            cmds[5],
            GpuCommand::BindTexture(TextureType::Texture2D, device.native_handle(texture))
        );
        assert!(matches!(cmds[6], GpuCommand::DrawElements { count: 3, offset: 0, instances: None, .. }));
        assert_eq!(cmds.last(), Some(&GpuCommand::BindFramebuffer(GpuHandle::NONE)));
        assert_eq!(device.check_error(), Ok(()));
    }

    #[test]
    fn frame_buffer_owns_its_attachments() {
        let mut device = device();
        let fb = device
            .create_frame_buffer(16, 16, &[TextureFormat::Rgba8, TextureFormat::Rgba16F], Some(TextureFormat::Depth24Stencil8))
            .unwrap();
        assert_eq!(device.frame_buffer_complete(fb), Ok(true));
        let color1 = device.frame_buffer(fb).unwrap().color_attachment(1).unwrap();
        assert!(device.contains(color1));
        assert!(device.frame_buffer(fb).unwrap().color_attachment(2).is_err());

        assert_eq!(device.remove(fb), 4);
        assert_eq!(device.backend().live_textures(), 0);
    }

    #[test]
    fn depth_format_as_color_is_rejected() {
        let mut device = device();
        assert!(device
            .create_frame_buffer(4, 4, &[TextureFormat::Depth24], None)
            .is_err());
        assert_eq!(device.registry().len(), 0);
    }

    #[test]
    fn failed_link_is_registered_degraded() {
        let mut device = device();
        let vs = device.create_shader_code(ShaderStage::Vertex, VS).unwrap();
        let fs = device
            .create_shader_code(ShaderStage::Fragment, "void main() { c = ; ")
            .unwrap();
        let stages = BTreeMap::from([(ShaderStage::Vertex, vs), (ShaderStage::Fragment, fs)]);
        let program = device
            .create_shader_program(&stages, UniformMap::new(), UniformArrayMap::new())
            .unwrap();

        assert!(matches!(
            device.program_link_status(program),
            Err(ResourceError::Shader(ShaderError::CompilationFailed { .. }))
        ));
        assert!(device.native_handle(program).is_none());
        assert_eq!(device.backend().live_programs(), 0);
    }

    #[test]
    fn program_with_unregistered_stage_fails() {
        let mut device = device();
        let ghost = Guid::new();
        let stages = BTreeMap::from([(ShaderStage::Vertex, ghost)]);
        let err = device
            .create_shader_program(&stages, UniformMap::new(), UniformArrayMap::new())
            .unwrap_err();
        assert_eq!(
            err,
            ResourceError::Shader(ShaderError::MissingStage {
                stage: ShaderStage::Vertex,
                id: ghost
            })
        );
    }

    #[test]
    fn gpu_errors_surface_through_check_error() {
        let mut device = device();
        assert_eq!(device.check_error(), Ok(()));
        device.backend_mut().inject_error(GpuError::OutOfMemory);
        device.backend_mut().inject_error(GpuError::InvalidValue);
        assert_eq!(device.check_error(), Err(RenderError::Gpu(GpuError::OutOfMemory)));
        assert_eq!(device.check_error(), Ok(()));
    }

    #[test]
    fn drop_releases_everything() {
        let mut device = device();
        triangle(&mut device);
        program(&mut device);
        device.clear_resources();
        assert_eq!(device.backend().live_objects(), 0);
    }
}
