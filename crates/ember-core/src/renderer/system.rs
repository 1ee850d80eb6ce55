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

//! The forward renderer.
//!
//! Each frame the renderer walks the scene once, collecting the active camera, the
//! lights and two buckets of meshes, then draws the opaque bucket followed by the
//! transparent one. Within a bucket meshes are drawn in traversal order; there is no
//! depth sort, so overlapping transparent meshes composite in scene order.
//!
//! Every GPU resource a mesh needs is requested from the [`Device`] under an id
//! derived from the CPU-side object that owns it (the mesh or the material), so the
//! first frame builds them and later frames hit the device cache.

use crate::config::{RenderSettings, UniformNames};
use crate::guid::Guid;
use crate::math::{Mat4, Vec3};
use crate::renderer::api::{
    AttributeType, BindingState, BufferDescriptor, BufferUsage, ClearFlags, GeometryDescriptor,
    IndexType, SharedUniform, SharedUniformArray, TextureType, UniformArray, UniformSet,
    UniformValue,
};
use crate::renderer::device::Device;
use crate::renderer::error::{RenderError, ResourceError};
use crate::renderer::traits::GraphicsBackend;
use crate::scene::{
    Camera, Instanced, Light, LightKind, Material, MaterialId, Mesh, NodeId, NodeKind,
    SceneGraph, TexturePixels,
};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Where the renderer is in its frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RendererState {
    /// Between frames.
    #[default]
    Idle,
    /// Walking the scene graph.
    Parsing,
    /// Drawing meshes without blending.
    DrawingOpaque,
    /// Drawing blended meshes.
    DrawingTransparent,
}

/// Counters of one rendered frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Sequential frame counter, starting at 1.
    pub frame_number: u64,
    /// Meshes in the opaque bucket.
    pub opaque: usize,
    /// Meshes in the transparent bucket.
    pub transparent: usize,
    /// Lights pushed to the shaders.
    pub lights: usize,
    /// Plain draw calls issued.
    pub draw_calls: usize,
    /// Instanced draw calls issued.
    pub instanced_draw_calls: usize,
    /// Meshes not drawn: missing material, nothing to draw, unlinked program or no
    /// instances.
    pub skipped: usize,
}

/// One mesh scheduled for drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    /// The mesh node.
    pub node: NodeId,
    /// The material it is drawn with, the override included.
    pub material: MaterialId,
    /// Object → world transform.
    pub world: Mat4,
}

/// The viewpoint of the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSettings {
    /// World → view.
    pub view: Mat4,
    /// View → clip.
    pub projection: Mat4,
    /// Eye position.
    pub position: Vec3,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            position: Vec3::ZERO,
        }
    }
}

impl From<&Camera> for CameraSettings {
    fn from(camera: &Camera) -> Self {
        Self {
            view: camera.view,
            projection: camera.projection,
            position: camera.position,
        }
    }
}

/// The lights of the frame in shader layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightSettings {
    /// xyz world position with w = 1, or xyz world direction with w = 0.
    pub positions: Vec<[f32; 4]>,
    /// Linear rgb color with the intensity in a.
    pub colors: Vec<[f32; 4]>,
}

impl LightSettings {
    fn clear(&mut self) {
        self.positions.clear();
        self.colors.clear();
    }

    fn len(&self) -> usize {
        self.positions.len()
    }

    fn push(&mut self, light: &Light, world: &Mat4) {
        let position = match light.kind {
            LightKind::Directional { direction } => {
                let d = world.transform_vector(direction).normalize_or_zero();
                [d.x, d.y, d.z, 0.0]
            }
            LightKind::Point => {
                let p = world.translation();
                [p.x, p.y, p.z, 1.0]
            }
        };
        let c = light.color;
        self.positions.push(position);
        self.colors.push([c.x, c.y, c.z, light.intensity]);
    }
}

/// Uniform cells the renderer writes and every program it builds shares.
#[derive(Debug)]
struct EngineUniforms {
    set: UniformSet,
    model: SharedUniform,
    view: SharedUniform,
    projection: SharedUniform,
    camera_position: SharedUniform,
    light_count: SharedUniform,
    light_positions: SharedUniformArray,
    light_colors: SharedUniformArray,
}

impl EngineUniforms {
    fn new(names: &UniformNames) -> Self {
        let identity = UniformValue::Mat4(Mat4::IDENTITY.to_cols_array());
        let mut set = UniformSet::new();
        Self {
            model: set.scalar(names.model.clone(), identity),
            view: set.scalar(names.view.clone(), identity),
            projection: set.scalar(names.projection.clone(), identity),
            camera_position: set.scalar(names.camera_position.clone(), UniformValue::Vec3([0.0; 3])),
            light_count: set.scalar(names.light_count.clone(), UniformValue::Int(0)),
            light_positions: set.array(names.light_positions.clone(), UniformArray::Vec4(Vec::new())),
            light_colors: set.array(names.light_colors.clone(), UniformArray::Vec4(Vec::new())),
            set,
        }
    }
}

/// Draws a [`SceneGraph`] through a [`Device`].
#[derive(Debug)]
pub struct Renderer {
    settings: RenderSettings,
    state: RendererState,
    uniforms: EngineUniforms,
    override_material: Option<MaterialId>,
    render_target: Option<Guid>,
    camera: CameraSettings,
    camera_found: bool,
    lights: LightSettings,
    opaque: Vec<DrawItem>,
    transparent: Vec<DrawItem>,
    binding: BindingState,
    refreshed_instances: HashSet<Guid>,
    // Geometry last drawn per (mesh, instancing variant).
    geometries: HashMap<(Guid, Option<Guid>), Guid>,
    stats: FrameStats,
    last_stats: FrameStats,
    frame_number: u64,
}

impl Renderer {
    /// Creates an idle renderer.
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            uniforms: EngineUniforms::new(&settings.uniforms),
            settings,
            state: RendererState::Idle,
            override_material: None,
            render_target: None,
            camera: CameraSettings::default(),
            camera_found: false,
            lights: LightSettings::default(),
            opaque: Vec::new(),
            transparent: Vec::new(),
            binding: BindingState::new(),
            refreshed_instances: HashSet::new(),
            geometries: HashMap::new(),
            stats: FrameStats::default(),
            last_stats: FrameStats::default(),
            frame_number: 0,
        }
    }

    /// The settings the renderer was built with.
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Where the renderer is in its frame.
    pub fn state(&self) -> RendererState {
        self.state
    }

    /// Draws every mesh with `material` instead of its own, until reset with `None`.
    /// The meshes are left untouched.
    pub fn set_override_material(&mut self, material: Option<MaterialId>) {
        self.override_material = material;
    }

    /// The override material, if any.
    pub fn override_material(&self) -> Option<MaterialId> {
        self.override_material
    }

    /// Renders into a frame buffer instead of the window, until reset with `None`.
    pub fn set_render_target(&mut self, frame_buffer: Option<Guid>) {
        self.render_target = frame_buffer;
    }

    /// The frame buffer rendered into, if any.
    pub fn render_target(&self) -> Option<Guid> {
        self.render_target
    }

    /// The camera found by the last parse.
    pub fn camera(&self) -> &CameraSettings {
        &self.camera
    }

    /// The lights found by the last parse.
    pub fn lights(&self) -> &LightSettings {
        &self.lights
    }

    /// Meshes drawn without blending, in draw order.
    pub fn opaque_bucket(&self) -> &[DrawItem] {
        &self.opaque
    }

    /// Meshes drawn with blending, in draw order.
    pub fn transparent_bucket(&self) -> &[DrawItem] {
        &self.transparent
    }

    /// The engine-provided uniforms. Programs built outside the renderer can share
    /// these cells to receive the camera and lights.
    pub fn engine_uniforms(&self) -> &UniformSet {
        &self.uniforms.set
    }

    /// The binding state of the draw in flight. Empty between draws.
    pub fn binding(&self) -> &BindingState {
        &self.binding
    }

    /// Counters of the last completed frame.
    pub fn last_frame_stats(&self) -> &FrameStats {
        &self.last_stats
    }

    /// Records the new surface size.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.settings.viewport = (width, height);
    }

    /// Clears the window and, if one is set, the render target.
    pub fn clear<B: GraphicsBackend>(
        &self,
        device: &mut Device<B>,
        flags: ClearFlags,
    ) -> Result<(), ResourceError> {
        let s = &self.settings;
        device.set_clear_values(s.clear_color, s.clear_depth, s.clear_stencil);
        if let Some(target) = self.render_target {
            device.bind_frame_buffer(Some(target))?;
            device.clear(flags);
            device.bind_frame_buffer(None)?;
        }
        device.clear(flags);
        Ok(())
    }

    /// Walks `scene` and fills the buckets, the camera and the lights without
    /// drawing anything.
    pub fn parse(&mut self, scene: &dyn SceneGraph) {
        self.parse_scene(scene);
        self.state = RendererState::Idle;
    }

    /// Parses `scene` and draws it.
    ///
    /// On error the draw in flight is abandoned, the renderer returns to
    /// [`RendererState::Idle`] and the partial frame is not recorded as the last one.
    pub fn render<B: GraphicsBackend>(
        &mut self,
        device: &mut Device<B>,
        scene: &dyn SceneGraph,
    ) -> Result<FrameStats, RenderError> {
        self.parse_scene(scene);
        let drawn = self.draw_buckets(device, scene);
        self.binding.clear();
        self.state = RendererState::Idle;
        if self.render_target.is_some() {
            // Frame buffers size the viewport to themselves.
            let (width, height) = self.settings.viewport;
            device.set_viewport(0, 0, width, height);
        }
        drawn?;

        self.last_stats = self.stats;
        log::trace!("Frame {} done: {:?}", self.frame_number, self.stats);
        Ok(self.stats)
    }

    fn parse_scene(&mut self, scene: &dyn SceneGraph) {
        self.state = RendererState::Parsing;
        self.frame_number += 1;
        self.stats = FrameStats {
            frame_number: self.frame_number,
            ..FrameStats::default()
        };
        self.opaque.clear();
        self.transparent.clear();
        self.lights.clear();
        self.camera = CameraSettings::default();
        self.camera_found = false;
        self.refreshed_instances.clear();

        self.visit(scene, scene.root(), &Mat4::IDENTITY);

        if !self.camera_found {
            log::debug!("No active camera in the scene; drawing with identity view and projection");
        }
        self.stats.opaque = self.opaque.len();
        self.stats.transparent = self.transparent.len();
        self.stats.lights = self.lights.len();
        self.push_frame_uniforms();
    }

    fn visit(&mut self, scene: &dyn SceneGraph, node: NodeId, parent: &Mat4) {
        let world = *parent * scene.local_transform(node);
        match scene.kind(node) {
            Some(NodeKind::Mesh(mesh)) => self.classify(scene, node, mesh, world),
            Some(NodeKind::Light(light)) => {
                if self.lights.len() < self.settings.max_lights {
                    self.lights.push(light, &world);
                } else {
                    log::trace!("Light limit of {} reached; ignoring {:?}", self.settings.max_lights, node);
                }
            }
            Some(NodeKind::Camera(camera)) if camera.active && !self.camera_found => {
                self.camera = CameraSettings::from(camera);
                self.camera_found = true;
            }
            Some(NodeKind::Camera(_)) | Some(NodeKind::Group) | None => {}
        }
        for child in scene.children(node) {
            self.visit(scene, *child, &world);
        }
    }

    fn classify(&mut self, scene: &dyn SceneGraph, node: NodeId, mesh: &Mesh, world: Mat4) {
        let material_id = self.override_material.unwrap_or(mesh.material());
        let Some(material) = scene.material(material_id) else {
            log::warn!("Mesh {:?} uses unknown material {:?}; skipped", node, material_id);
            self.stats.skipped += 1;
            return;
        };
        let item = DrawItem {
            node,
            material: material_id,
            world,
        };
        if material.pipeline_state().is_transparent() {
            self.transparent.push(item);
        } else {
            self.opaque.push(item);
        }
    }

    fn push_frame_uniforms(&mut self) {
        let u = &self.uniforms;
        u.view.set(UniformValue::Mat4(self.camera.view.to_cols_array()));
        u.projection
            .set(UniformValue::Mat4(self.camera.projection.to_cols_array()));
        u.camera_position
            .set(UniformValue::Vec3(self.camera.position.to_array()));
        let count = i32::try_from(self.lights.len()).unwrap_or(i32::MAX);
        u.light_count.set(UniformValue::Int(count));
        u.light_positions
            .set(UniformArray::Vec4(self.lights.positions.clone()));
        u.light_colors.set(UniformArray::Vec4(self.lights.colors.clone()));
    }

    fn draw_buckets<B: GraphicsBackend>(
        &mut self,
        device: &mut Device<B>,
        scene: &dyn SceneGraph,
    ) -> Result<(), RenderError> {
        self.state = RendererState::DrawingOpaque;
        let opaque = self.opaque.clone();
        for item in &opaque {
            self.draw_item(device, scene, item)?;
        }

        self.state = RendererState::DrawingTransparent;
        let transparent = self.transparent.clone();
        for item in &transparent {
            self.draw_item(device, scene, item)?;
        }
        Ok(())
    }

    fn draw_item<B: GraphicsBackend>(
        &mut self,
        device: &mut Device<B>,
        scene: &dyn SceneGraph,
        item: &DrawItem,
    ) -> Result<(), RenderError> {
        let (Some(NodeKind::Mesh(mesh)), Some(material)) =
            (scene.kind(item.node), scene.material(item.material))
        else {
            self.stats.skipped += 1;
            return Ok(());
        };
        if !mesh.is_drawable() {
            log::trace!("Mesh {:?} has no vertices or indices; skipped", item.node);
            self.stats.skipped += 1;
            return Ok(());
        }
        let instancing = material.instancing();
        if instancing.is_some_and(|i| i.instance_count() == 0) {
            self.stats.skipped += 1;
            return Ok(());
        }

        let program = self.resolve_program(device, material)?;
        if device.program_link_status(program).is_err() {
            self.stats.skipped += 1;
            return Ok(());
        }
        self.resolve_textures(device, material)?;
        let variant = instancing.map(|instanced| (material.id(), instanced));
        let geometry = self.resolve_geometry(device, mesh, variant)?;

        self.uniforms
            .model
            .set(UniformValue::Mat4(item.world.to_cols_array()));
        device.update_uniforms(program)?;
        device.apply_pipeline_state(material.pipeline_state());

        self.binding.geometry = Some(geometry);
        self.binding.program = Some(program);
        self.binding.frame_buffer = self.render_target;
        device.bind(&self.binding)?;
        match instancing {
            Some(instanced) => {
                device.instanced_draw(&self.binding, instanced.instance_count())?;
                self.stats.instanced_draw_calls += 1;
            }
            None => {
                device.draw(&self.binding)?;
                self.stats.draw_calls += 1;
            }
        }
        device.unbind(&self.binding)?;
        self.binding.clear();
        Ok(())
    }

    /// One shader code per stage under `material id / stage name`, one program under
    /// `material id / "program"` sharing the engine uniforms.
    fn resolve_program<B: GraphicsBackend>(
        &self,
        device: &mut Device<B>,
        material: &dyn Material,
    ) -> Result<Guid, ResourceError> {
        let id = material.id();
        let mut stages = BTreeMap::new();
        for (stage, source) in material.shader_sources() {
            let code = device.create_shader_code_with_id(id.derive(stage.name()), *stage, source)?;
            stages.insert(*stage, code);
        }
        let mut uniforms = material.uniforms().clone();
        uniforms.extend_from(&self.uniforms.set);
        device.create_shader_program_with_id(
            id.derive("program"),
            &stages,
            uniforms.scalars,
            uniforms.arrays,
        )
    }

    fn resolve_textures<B: GraphicsBackend>(
        &mut self,
        device: &mut Device<B>,
        material: &dyn Material,
    ) -> Result<(), ResourceError> {
        for texture in material.textures() {
            let image = &texture.image;
            let (id, desc) = (image.id, image.descriptor);
            let fresh = !device.contains(id);
            match &image.pixels {
                TexturePixels::Empty if desc.texture_type == TextureType::CubeMap => {
                    device.create_texture_cubemap_with_id(id, desc, &[])?;
                }
                TexturePixels::Empty => {
                    device.create_texture_2d_with_id(id, desc, None)?;
                }
                TexturePixels::Image(pixels) => {
                    device.create_texture_2d_with_id(id, desc, Some(pixels))?;
                }
                TexturePixels::Faces(faces) => {
                    let faces: Vec<_> = faces.iter().map(|(f, px)| (*f, px.as_slice())).collect();
                    device.create_texture_cubemap_with_id(id, desc, &faces)?;
                }
            }
            if fresh && desc.mipmaps && image.pixels != TexturePixels::Empty {
                device.generate_mipmaps(id)?;
            }
            self.binding.textures.insert(texture.slot, id);
        }
        Ok(())
    }

    fn resolve_geometry<B: GraphicsBackend>(
        &mut self,
        device: &mut Device<B>,
        mesh: &Mesh,
        instancing: Option<(Guid, &dyn Instanced)>,
    ) -> Result<Guid, ResourceError> {
        let indices: &[u8] = bytemuck::cast_slice(mesh.indices());
        let element = device.create_buffer_with_id(
            mesh.index_buffer_id(),
            BufferDescriptor::element(mesh.usage(), IndexType::U32, indices.len()),
            Some(indices),
        )?;
        let mut descriptor = GeometryDescriptor::new(element).with_topology(mesh.topology());
        for stream in mesh.streams() {
            let data: &[u8] = bytemuck::cast_slice(&stream.data);
            let buffer = device.create_buffer_with_id(
                mesh.stream_buffer_id(stream.location),
                BufferDescriptor::vertex(mesh.usage(), AttributeType::Float, stream.components, data.len()),
                Some(data),
            )?;
            descriptor = descriptor.with_attribute(stream.location, buffer);
        }

        let variant = match instancing {
            Some((material_id, instanced)) => {
                let columns = self.instance_buffers(device, material_id, instanced)?;
                for (offset, buffer) in (0u32..).zip(columns) {
                    descriptor = descriptor.with_attribute(instanced.instance_location() + offset, buffer);
                }
                Some(material_id)
            }
            None => None,
        };
        let geometry = device.create_geometry_with_id(mesh.geometry_id(variant), &descriptor)?;

        // The new revision is registered first, so buffers it shares with the stale
        // one (the instance columns) keep a dependent and survive the cascade.
        if let Some(stale) = self.geometries.insert((mesh.id(), variant), geometry) {
            if stale != geometry {
                let destroyed = device.remove(stale);
                log::debug!("Released {destroyed} resource(s) of a stale revision of mesh {}", mesh.id());
            }
        }
        Ok(geometry)
    }

    /// The four per-instance column buffers of an instancing material, shared by
    /// every mesh drawn with it and refreshed once per frame.
    fn instance_buffers<B: GraphicsBackend>(
        &mut self,
        device: &mut Device<B>,
        material_id: Guid,
        instanced: &dyn Instanced,
    ) -> Result<[Guid; 4], ResourceError> {
        let ids: [Guid; 4] = std::array::from_fn(|c| material_id.derive(&format!("instance_col{c}")));
        let refresh = self.refreshed_instances.insert(material_id);
        for (column, id) in ids.iter().enumerate() {
            if !device.contains(*id) {
                let data = instanced.transforms().column(column);
                let bytes: &[u8] = bytemuck::cast_slice(&data);
                let desc = BufferDescriptor::vertex(BufferUsage::Dynamic, AttributeType::Float, 4, bytes.len())
                    .per_instance();
                device.create_buffer_with_id(*id, desc, Some(bytes))?;
            } else if refresh {
                let data = instanced.transforms().column(column);
                let bytes: &[u8] = bytemuck::cast_slice(&data);
                if device.buffer(*id)?.descriptor().size == bytes.len() {
                    device.substitute_data(*id, 0, bytes)?;
                } else {
                    device.reallocate_data(*id, Some(bytes), bytes.len())?;
                }
            }
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::{GpuHandle, PipelinePreset};
    use crate::renderer::headless::{GpuCommand, HeadlessBackend};
    use crate::scene::{Scene, StandardMaterial};

    fn setup() -> (Device<HeadlessBackend>, Renderer, Scene) {
        (
            Device::new(HeadlessBackend::new()),
            Renderer::new(RenderSettings::default()),
            Scene::new(),
        )
    }

    #[test]
    fn parse_fills_buckets_in_traversal_order() {
        let (_, mut renderer, mut scene) = setup();
        let root = scene.root();
        let opaque = scene.add_material(StandardMaterial::unlit());
        let glass = scene.add_material(StandardMaterial::unlit().with_preset(PipelinePreset::Translucent));
        let a = scene.add_mesh(root, Mesh::triangle(glass), Mat4::IDENTITY);
        let b = scene.add_mesh(root, Mesh::triangle(opaque), Mat4::IDENTITY);
        let c = scene.add_mesh(root, Mesh::triangle(glass), Mat4::IDENTITY);

        renderer.parse(&scene);
        assert_eq!(renderer.state(), RendererState::Idle);
        let nodes = |items: &[DrawItem]| items.iter().map(|i| i.node).collect::<Vec<_>>();
        assert_eq!(nodes(renderer.opaque_bucket()), vec![b]);
        assert_eq!(nodes(renderer.transparent_bucket()), vec![a, c]);
    }

    #[test]
    fn world_transforms_accumulate_down_the_tree() {
        let (_, mut renderer, mut scene) = setup();
        let root = scene.root();
        let material = scene.add_material(StandardMaterial::unlit());
        let group = scene.add_group(root, "group", Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)));
        scene.add_mesh(group, Mesh::triangle(material), Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)));

        renderer.parse(&scene);
        assert_eq!(renderer.opaque_bucket()[0].world.translation(), Vec3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn first_active_camera_wins_and_lights_are_capped() {
        let (_, _, mut scene) = setup();
        let mut settings = RenderSettings::default();
        settings.max_lights = 1;
        let mut renderer = Renderer::new(settings);
        let root = scene.root();
        let mut inactive = Camera::default();
        inactive.active = false;
        inactive.position = Vec3::ONE;
        scene.add_camera(root, inactive);
        let mut active = Camera::default();
        active.position = Vec3::new(0.0, 0.0, 5.0);
        scene.add_camera(root, active);
        scene.add_light(root, Light::point(), Mat4::from_translation(Vec3::new(0.0, 3.0, 0.0)));
        scene.add_light(root, Light::directional(Vec3::new(0.0, -1.0, 0.0)), Mat4::IDENTITY);

        renderer.parse(&scene);
        assert_eq!(renderer.camera().position, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(renderer.lights().positions, vec![[0.0, 3.0, 0.0, 1.0]]);
    }

    #[test]
    fn override_material_reclassifies_without_touching_meshes() {
        let (_, mut renderer, mut scene) = setup();
        let root = scene.root();
        let opaque = scene.add_material(StandardMaterial::unlit());
        let glass = scene.add_material(StandardMaterial::unlit().with_preset(PipelinePreset::Translucent));
        let node = scene.add_mesh(root, Mesh::triangle(opaque), Mat4::IDENTITY);

        renderer.set_override_material(Some(glass));
        renderer.parse(&scene);
        assert_eq!(renderer.transparent_bucket().len(), 1);
        assert_eq!(renderer.transparent_bucket()[0].material, glass);
        assert!(matches!(scene.kind(node), Some(NodeKind::Mesh(m)) if m.material() == opaque));

        renderer.set_override_material(None);
        renderer.parse(&scene);
        assert_eq!(renderer.opaque_bucket().len(), 1);
    }

    #[test]
    fn second_frame_hits_the_cache() {
        let (mut device, mut renderer, mut scene) = setup();
        let root = scene.root();
        let material = scene.add_material(StandardMaterial::unlit());
        scene.add_mesh(root, Mesh::triangle(material), Mat4::IDENTITY);

        renderer.render(&mut device, &scene).unwrap();
        let allocations = device.backend().allocations();
        let resources = device.registry().len();
        let stats = renderer.render(&mut device, &scene).unwrap();

        assert_eq!(stats.draw_calls, 1);
        assert_eq!(stats.frame_number, 2);
        assert_eq!(device.backend().allocations(), allocations);
        assert_eq!(device.registry().len(), resources);
        assert!(renderer.binding().textures.is_empty() && !renderer.binding().is_valid());
        assert_eq!(device.check_error(), Ok(()));
    }

    #[test]
    fn model_matrix_reaches_the_program() {
        let (mut device, mut renderer, mut scene) = setup();
        let root = scene.root();
        let material = scene.add_material(StandardMaterial::unlit());
        let guid = scene.material(material).unwrap().id();
        let world = Mat4::from_translation(Vec3::new(4.0, 5.0, 6.0));
        scene.add_mesh(root, Mesh::triangle(material), world);

        renderer.render(&mut device, &scene).unwrap();
        let program = device.native_handle(guid.derive("program"));
        assert_eq!(
            device.backend().uniform_value(program, "u_model"),
            Some(UniformValue::Mat4(world.to_cols_array()))
        );
    }

    #[test]
    fn unlinked_program_is_skipped_not_drawn() {
        let (mut device, mut renderer, mut scene) = setup();
        let root = scene.root();
        let broken = scene.add_material(StandardMaterial::new(
            crate::scene::UNLIT_VERTEX_SHADER,
            "void main() { frag = ; ",
        ));
        scene.add_mesh(root, Mesh::triangle(broken), Mat4::IDENTITY);

        let stats = renderer.render(&mut device, &scene).unwrap();
        assert_eq!(stats.draw_calls, 0);
        assert_eq!(stats.skipped, 1);
        assert_eq!(device.backend().draw_calls(), 0);
        assert_eq!(device.check_error(), Ok(()));
    }

    #[test]
    fn render_target_is_bound_for_each_draw() {
        let (mut device, mut renderer, mut scene) = setup();
        let root = scene.root();
        let material = scene.add_material(StandardMaterial::unlit());
        scene.add_mesh(root, Mesh::triangle(material), Mat4::IDENTITY);
        let target = device
            .create_frame_buffer(8, 8, &[crate::renderer::api::TextureFormat::Rgba8], None)
            .unwrap();
        renderer.set_render_target(Some(target));
        device.backend_mut().clear_commands();

        renderer.render(&mut device, &scene).unwrap();
        let binds: Vec<_> = device
            .backend()
            .commands()
            .iter()
            .filter_map(|c| match c {
                GpuCommand::BindFramebuffer(h) => Some(*h),
                _ => None,
            })
            .collect();
        assert_eq!(binds, vec![device.native_handle(target), GpuHandle::NONE]);
    }

    #[test]
    fn window_viewport_returns_after_a_render_target() {
        let (mut device, _, mut scene) = setup();
        let mut settings = RenderSettings::default();
        settings.viewport = (320, 240);
        let mut renderer = Renderer::new(settings);
        let root = scene.root();
        let material = scene.add_material(StandardMaterial::unlit());
        scene.add_mesh(root, Mesh::triangle(material), Mat4::IDENTITY);
        let target = device
            .create_frame_buffer(8, 8, &[crate::renderer::api::TextureFormat::Rgba8], None)
            .unwrap();

        renderer.set_render_target(Some(target));
        renderer.render(&mut device, &scene).unwrap();
        assert_eq!(device.backend().current_viewport(), (0, 0, 320, 240));
    }
}
