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

//! Materials: shader sources, uniform tables, textures and pipeline state.

use crate::guid::Guid;
use crate::math::Mat4;
use crate::renderer::{
    CubeFace, PipelinePreset, PipelineState, ShaderStage, SharedUniform, SharedUniformArray,
    TextureDescriptor, UniformArray, UniformSet, UniformValue,
};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Unlit vertex stage reading positions at location 0.
pub const UNLIT_VERTEX_SHADER: &str = r#"#version 330 core
layout(location = 0) in vec3 a_position;
uniform mat4 u_model;
uniform mat4 u_view;
uniform mat4 u_projection;
void main() {
    gl_Position = u_projection * u_view * u_model * vec4(a_position, 1.0);
}
"#;

/// Unlit fragment stage writing `u_color`.
pub const UNLIT_FRAGMENT_SHADER: &str = r#"#version 330 core
uniform vec4 u_color;
out vec4 frag_color;
void main() {
    frag_color = u_color;
}
"#;

/// Unlit vertex stage reading a per-instance model matrix as four columns at
/// locations 3 to 6.
pub const INSTANCED_VERTEX_SHADER: &str = r#"#version 330 core
layout(location = 0) in vec3 a_position;
layout(location = 3) in vec4 a_instance_col0;
layout(location = 4) in vec4 a_instance_col1;
layout(location = 5) in vec4 a_instance_col2;
layout(location = 6) in vec4 a_instance_col3;
uniform mat4 u_model;
uniform mat4 u_view;
uniform mat4 u_projection;
void main() {
    mat4 instance = mat4(a_instance_col0, a_instance_col1, a_instance_col2, a_instance_col3);
    gl_Position = u_projection * u_view * u_model * instance * vec4(a_position, 1.0);
}
"#;

/// How a material describes its pixels to the renderer.
///
/// The renderer keys every GPU resource it builds for a material on
/// [`Material::id`]: one shader code per stage and one program. Uniform tables are
/// captured when that program is first built; later changes go through the shared
/// cells, not through new table entries.
pub trait Material: fmt::Debug {
    /// Stable identity.
    fn id(&self) -> Guid;

    /// GLSL source per stage. Vertex and fragment are required for a link.
    fn shader_sources(&self) -> &BTreeMap<ShaderStage, String>;

    /// Material-owned uniforms.
    fn uniforms(&self) -> &UniformSet;

    /// Textures bound for every draw, one per slot.
    fn textures(&self) -> &[MaterialTexture];

    /// Fixed-function state applied before each draw. Enabled blending puts the
    /// material's meshes in the transparent bucket.
    fn pipeline_state(&self) -> &PipelineState;

    /// The instancing capability, if the material draws many copies per mesh.
    fn instancing(&self) -> Option<&dyn Instanced> {
        None
    }
}

/// A material that replicates each mesh once per transform.
///
/// The transforms reach the vertex stage as four per-instance `vec4` columns at
/// consecutive attribute locations starting at [`Instanced::instance_location`].
pub trait Instanced: fmt::Debug {
    /// First of the four column locations.
    fn instance_location(&self) -> u32;

    /// The per-instance model matrices.
    fn transforms(&self) -> &InstanceTransforms;

    /// Number of copies drawn.
    fn instance_count(&self) -> u32 {
        u32::try_from(self.transforms().len()).unwrap_or(u32::MAX)
    }
}

/// Pixel data of a [`TextureImage`].
#[derive(Debug, Clone, PartialEq)]
pub enum TexturePixels {
    /// Storage only, e.g. written by a render pass.
    Empty,
    /// The image of a 2D texture.
    Image(Vec<u8>),
    /// Cube-map faces. Faces not listed stay undefined.
    Faces(Vec<(CubeFace, Vec<u8>)>),
}

/// A texture as the scene knows it, uploaded by the renderer on first use.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    /// Key of the GPU texture. Materials sharing an image share the texture.
    pub id: Guid,
    /// Shape, formats and sampling.
    pub descriptor: TextureDescriptor,
    /// Initial contents.
    pub pixels: TexturePixels,
}

impl TextureImage {
    /// A 2D image.
    pub fn new_2d(descriptor: TextureDescriptor, pixels: Option<Vec<u8>>) -> Self {
        Self {
            id: Guid::new(),
            descriptor,
            pixels: pixels.map_or(TexturePixels::Empty, TexturePixels::Image),
        }
    }

    /// A cube map from the faces given.
    pub fn cube_map(descriptor: TextureDescriptor, faces: Vec<(CubeFace, Vec<u8>)>) -> Self {
        Self {
            id: Guid::new(),
            descriptor,
            pixels: TexturePixels::Faces(faces),
        }
    }
}

/// A texture bound at a slot and exposed to the shader through a sampler uniform.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialTexture {
    /// Texture unit.
    pub slot: u32,
    /// Sampler uniform set to `slot`.
    pub sampler: String,
    /// The image.
    pub image: TextureImage,
}

/// Per-instance transforms shared between a material and whoever animates them.
#[derive(Debug, Clone, Default)]
pub struct InstanceTransforms(Rc<RefCell<Vec<Mat4>>>);

impl InstanceTransforms {
    /// A handle over `transforms`.
    pub fn new(transforms: Vec<Mat4>) -> Self {
        Self(Rc::new(RefCell::new(transforms)))
    }

    /// Replaces every transform.
    pub fn set(&self, transforms: Vec<Mat4>) {
        *self.0.borrow_mut() = transforms;
    }

    /// Adds one instance.
    pub fn push(&self, transform: Mat4) {
        self.0.borrow_mut().push(transform);
    }

    /// Copies the transforms out.
    pub fn get(&self) -> Vec<Mat4> {
        self.0.borrow().clone()
    }

    /// Number of instances.
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Returns `true` if there are no instances.
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Column `column` of every transform, flattened in instance order.
    pub fn column(&self, column: usize) -> Vec<f32> {
        self.0
            .borrow()
            .iter()
            .flat_map(|m| m.cols[column])
            .collect()
    }
}

/// A material built from shader strings.
///
/// # Examples
///
/// ```
/// use ember_core::renderer::{PipelinePreset, UniformValue};
/// use ember_core::scene::{Material, StandardMaterial};
///
/// let mut glass = StandardMaterial::unlit().with_preset(PipelinePreset::Translucent);
/// let tint = glass.uniform("u_color", UniformValue::Vec4([0.2, 0.4, 1.0, 0.5]));
/// assert!(glass.pipeline_state().is_transparent());
/// tint.set(UniformValue::Vec4([1.0, 0.0, 0.0, 0.5]));
/// ```
#[derive(Debug, Clone)]
pub struct StandardMaterial {
    id: Guid,
    sources: BTreeMap<ShaderStage, String>,
    uniforms: UniformSet,
    textures: Vec<MaterialTexture>,
    pipeline: PipelineState,
}

impl StandardMaterial {
    /// An opaque material from a vertex and a fragment stage.
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        let sources = BTreeMap::from([
            (ShaderStage::Vertex, vertex.into()),
            (ShaderStage::Fragment, fragment.into()),
        ]);
        Self {
            id: Guid::new(),
            sources,
            uniforms: UniformSet::new(),
            textures: Vec::new(),
            pipeline: PipelineState::opaque(),
        }
    }

    /// The built-in unlit material, white until `u_color` is set.
    pub fn unlit() -> Self {
        Self::new(UNLIT_VERTEX_SHADER, UNLIT_FRAGMENT_SHADER)
            .with_uniform("u_color", UniformValue::Vec4([1.0; 4]))
    }

    /// Adds a geometry stage.
    pub fn with_geometry_shader(mut self, source: impl Into<String>) -> Self {
        self.sources.insert(ShaderStage::Geometry, source.into());
        self
    }

    /// Replaces the pipeline state.
    pub fn with_pipeline_state(mut self, state: PipelineState) -> Self {
        self.pipeline = state;
        self
    }

    /// Replaces the pipeline state with a preset.
    pub fn with_preset(self, preset: PipelinePreset) -> Self {
        self.with_pipeline_state(PipelineState::preset(preset))
    }

    /// Adds a scalar uniform.
    pub fn with_uniform(mut self, name: impl Into<String>, value: UniformValue) -> Self {
        self.uniforms.scalar(name, value);
        self
    }

    /// Adds a scalar uniform and returns its cell for later updates.
    pub fn uniform(&mut self, name: impl Into<String>, value: UniformValue) -> SharedUniform {
        self.uniforms.scalar(name, value)
    }

    /// Adds an array uniform and returns its cell for later updates.
    pub fn uniform_array(&mut self, name: impl Into<String>, values: UniformArray) -> SharedUniformArray {
        self.uniforms.array(name, values)
    }

    /// Binds `image` at `slot` and points the `sampler` uniform at it.
    pub fn with_texture(mut self, slot: u32, sampler: impl Into<String>, image: TextureImage) -> Self {
        let sampler = sampler.into();
        let unit = i32::try_from(slot).unwrap_or(i32::MAX);
        self.uniforms.scalar(sampler.clone(), UniformValue::Sampler(unit));
        self.textures.retain(|t| t.slot != slot);
        self.textures.push(MaterialTexture { slot, sampler, image });
        self
    }

    /// Replaces the pipeline state in place.
    pub fn set_pipeline_state(&mut self, state: PipelineState) {
        self.pipeline = state;
    }
}

impl Material for StandardMaterial {
    fn id(&self) -> Guid {
        self.id
    }

    fn shader_sources(&self) -> &BTreeMap<ShaderStage, String> {
        &self.sources
    }

    fn uniforms(&self) -> &UniformSet {
        &self.uniforms
    }

    fn textures(&self) -> &[MaterialTexture] {
        &self.textures
    }

    fn pipeline_state(&self) -> &PipelineState {
        &self.pipeline
    }
}

/// A [`StandardMaterial`] drawn once per instance transform.
#[derive(Debug, Clone)]
pub struct InstancedMaterial {
    base: StandardMaterial,
    location: u32,
    transforms: InstanceTransforms,
}

impl InstancedMaterial {
    /// Wraps `base`, feeding instance columns from `location` onwards.
    pub fn new(base: StandardMaterial, location: u32, transforms: Vec<Mat4>) -> Self {
        Self {
            base,
            location,
            transforms: InstanceTransforms::new(transforms),
        }
    }

    /// The built-in unlit instanced material.
    pub fn unlit(transforms: Vec<Mat4>) -> Self {
        let base = StandardMaterial::new(INSTANCED_VERTEX_SHADER, UNLIT_FRAGMENT_SHADER)
            .with_uniform("u_color", UniformValue::Vec4([1.0; 4]));
        Self::new(base, 3, transforms)
    }

    /// A handle over the instance transforms.
    pub fn instances(&self) -> InstanceTransforms {
        self.transforms.clone()
    }

    /// The wrapped material.
    pub fn base_mut(&mut self) -> &mut StandardMaterial {
        &mut self.base
    }
}

impl Material for InstancedMaterial {
    fn id(&self) -> Guid {
        self.base.id()
    }

    fn shader_sources(&self) -> &BTreeMap<ShaderStage, String> {
        self.base.shader_sources()
    }

    fn uniforms(&self) -> &UniformSet {
        self.base.uniforms()
    }

    fn textures(&self) -> &[MaterialTexture] {
        self.base.textures()
    }

    fn pipeline_state(&self) -> &PipelineState {
        self.base.pipeline_state()
    }

    fn instancing(&self) -> Option<&dyn Instanced> {
        Some(self)
    }
}

impl Instanced for InstancedMaterial {
    fn instance_location(&self) -> u32 {
        self.location
    }

    fn transforms(&self) -> &InstanceTransforms {
        &self.transforms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;
    use crate::renderer::TextureFormat;

    #[test]
    fn capability_check_distinguishes_instancing() {
        let plain = StandardMaterial::unlit();
        let instanced = InstancedMaterial::unlit(vec![Mat4::IDENTITY; 3]);
        assert!(plain.instancing().is_none());
        let capability = instanced.instancing().unwrap();
        assert_eq!(capability.instance_count(), 3);
        assert_eq!(capability.instance_location(), 3);
    }

    #[test]
    fn texture_binds_sampler_to_slot() {
        let image = TextureImage::new_2d(
            TextureDescriptor::texture_2d(1, 1, TextureFormat::Rgba8),
            Some(vec![0; 4]),
        );
        let material = StandardMaterial::unlit().with_texture(2, "u_albedo", image);
        assert_eq!(material.textures().len(), 1);
        assert_eq!(
            material.uniforms().scalars["u_albedo"].get(),
            UniformValue::Sampler(2)
        );
    }

    #[test]
    fn instance_handle_is_shared() {
        let material = InstancedMaterial::unlit(Vec::new());
        let handle = material.instances();
        handle.push(Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(material.transforms().len(), 1);
        assert_eq!(material.transforms().column(3), vec![1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn preset_controls_transparency() {
        assert!(!StandardMaterial::unlit().pipeline_state().is_transparent());
        let glass = StandardMaterial::unlit().with_preset(PipelinePreset::Translucent);
        assert!(glass.pipeline_state().is_transparent());
    }
}
