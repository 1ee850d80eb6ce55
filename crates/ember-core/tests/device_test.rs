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

//! Integration tests for the device: resource cache, dependency cascade, binding
//! and drawing, recorded through the headless backend.

use ember_core::renderer::{
    AttributeType, BindingState, BufferUsage, Device, GeometryDescriptor, GpuCommand, GpuHandle,
    HeadlessBackend, IndexType, PipelinePreset, PrimitiveTopology, ResourceError, ShaderStage,
    TextureFormat, UniformArrayMap, UniformMap,
};
use ember_core::Guid;
use std::collections::BTreeMap;

const VERTEX: &str = "layout(location = 0) in vec3 position;\nvoid main() { gl_Position = vec4(position, 1.0); }";
const FRAGMENT: &str = "out vec4 color;\nvoid main() { color = vec4(1.0); }";

fn triangle_geometry(device: &mut Device<HeadlessBackend>) -> (Guid, Guid, Guid) {
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let indices: [u32; 3] = [0, 1, 2];
    let vertices = device
        .create_vertex_buffer(
            BufferUsage::Static,
            AttributeType::Float,
            3,
            bytemuck::cast_slice(&positions),
        )
        .unwrap();
    let elements = device
        .create_element_buffer(BufferUsage::Static, IndexType::U32, bytemuck::cast_slice(&indices))
        .unwrap();
    let geometry = device
        .create_geometry(&GeometryDescriptor::new(elements).with_attribute(0, vertices))
        .unwrap();
    (geometry, vertices, elements)
}

fn program(device: &mut Device<HeadlessBackend>, fragment: &str) -> Guid {
    let vs = device.create_shader_code(ShaderStage::Vertex, VERTEX).unwrap();
    let fs = device.create_shader_code(ShaderStage::Fragment, fragment).unwrap();
    let stages = BTreeMap::from([(ShaderStage::Vertex, vs), (ShaderStage::Fragment, fs)]);
    device
        .create_shader_program(&stages, UniformMap::new(), UniformArrayMap::new())
        .unwrap()
}

#[test]
fn test_removing_geometry_cascades_to_its_buffers() {
    let mut device = Device::new(HeadlessBackend::new());
    let (geometry, vertices, elements) = triangle_geometry(&mut device);
    assert_eq!(device.backend().live_objects(), 3);

    let removed = device.remove(geometry);

    assert_eq!(removed, 3);
    assert!(!device.contains(vertices));
    assert!(!device.contains(elements));
    assert_eq!(device.backend().live_objects(), 0);
}

#[test]
fn test_shared_buffer_survives_one_owner() {
    let mut device = Device::new(HeadlessBackend::new());
    let (first, vertices, elements) = triangle_geometry(&mut device);
    let second = device
        .create_geometry(&GeometryDescriptor::new(elements).with_attribute(0, vertices))
        .unwrap();

    device.remove(first);
    assert!(device.contains(vertices));
    assert!(device.contains(elements));

    device.remove(second);
    assert!(!device.contains(vertices));
    assert_eq!(device.registry().len(), 0);
}

#[test]
fn test_create_with_known_id_is_idempotent() {
    let mut device = Device::new(HeadlessBackend::new());
    let id = Guid::new().derive("texture");
    let descriptor = ember_core::renderer::TextureDescriptor::texture_2d(4, 4, TextureFormat::Rgba8);

    let first = device.create_texture_2d_with_id(id, descriptor, None).unwrap();
    let allocations = device.backend().allocations();
    let second = device.create_texture_2d_with_id(id, descriptor, None).unwrap();

    assert_eq!(first, second);
    assert_eq!(device.backend().allocations(), allocations);
    assert_eq!(device.stats().cache_hits, 1);
}

#[test]
fn test_known_id_of_another_kind_is_rejected() {
    let mut device = Device::new(HeadlessBackend::new());
    let (geometry, _, _) = triangle_geometry(&mut device);
    let descriptor = ember_core::renderer::TextureDescriptor::texture_2d(1, 1, TextureFormat::R8);

    let result = device.create_texture_2d_with_id(geometry, descriptor, None);

    assert!(matches!(result, Err(ResourceError::WrongKind { id, .. }) if id == geometry));
}

#[test]
fn test_same_preset_yields_same_fixed_function_state() {
    let mut first = Device::new(HeadlessBackend::new());
    let mut second = Device::new(HeadlessBackend::new());
    // Dirty the second device before applying the preset.
    let translucent = second.create_pipeline_state(PipelinePreset::Translucent);
    second.apply_pipeline_state(&translucent);

    let opaque = first.create_pipeline_state(PipelinePreset::Opaque);
    first.apply_pipeline_state(&opaque);
    second.apply_pipeline_state(&opaque);

    assert_eq!(opaque, second.create_pipeline_state(PipelinePreset::Opaque));
    assert_eq!(
        first.backend().fixed_function_state(),
        second.backend().fixed_function_state()
    );
}

#[test]
fn test_incomplete_binding_issues_nothing() {
    let mut device = Device::new(HeadlessBackend::new());
    let (geometry, _, _) = triangle_geometry(&mut device);
    device.backend_mut().clear_commands();

    let binding = BindingState::new().with_geometry(geometry);

    assert_eq!(device.bind(&binding), Err(ResourceError::IncompleteBinding));
    assert_eq!(device.draw(&binding), Err(ResourceError::IncompleteBinding));
    assert!(device.backend().commands().is_empty());
}

#[test]
fn test_triangle_draws_three_indices() {
    let mut device = Device::new(HeadlessBackend::new());
    let (geometry, _, _) = triangle_geometry(&mut device);
    let program = program(&mut device, FRAGMENT);
    let binding = BindingState::new().with_geometry(geometry).with_program(program);
    device.backend_mut().clear_commands();

    device.bind(&binding).unwrap();
    device.draw(&binding).unwrap();
    device.unbind(&binding).unwrap();

    let draws: Vec<_> = device
        .backend()
        .commands()
        .iter()
        .filter(|c| matches!(c, GpuCommand::DrawElements { .. }))
        .collect();
    assert_eq!(
        draws,
        vec![&GpuCommand::DrawElements {
            topology: PrimitiveTopology::Triangles,
            count: 3,
            index_type: IndexType::U32,
            offset: 0,
            instances: None,
        }]
    );
    assert_eq!(device.check_error(), Ok(()));
}

#[test]
fn test_instanced_draw_carries_instance_count() {
    let mut device = Device::new(HeadlessBackend::new());
    let (geometry, _, _) = triangle_geometry(&mut device);
    let program = program(&mut device, FRAGMENT);
    let binding = BindingState::new().with_geometry(geometry).with_program(program);

    device.bind(&binding).unwrap();
    device.instanced_draw(&binding, 16).unwrap();

    assert!(device.backend().commands().iter().any(|c| matches!(
        c,
        GpuCommand::DrawElements {
            count: 3,
            instances: Some(16),
            ..
        }
    )));
    assert_eq!(device.stats().instanced_draw_calls, 1);
}

#[test]
fn test_link_failure_leaves_a_null_program() {
    let mut device = Device::new(HeadlessBackend::new());
    let (geometry, _, _) = triangle_geometry(&mut device);
    let broken = program(&mut device, "out vec4 color;\nvoid main() { color = vec4(1.0; }");

    assert_eq!(device.native_handle(broken), GpuHandle::NONE);
    assert!(device.program_link_status(broken).is_err());

    device.backend_mut().clear_commands();
    let binding = BindingState::new().with_geometry(geometry).with_program(broken);
    device.bind(&binding).unwrap();
    assert!(!device
        .backend()
        .commands()
        .iter()
        .any(|c| matches!(c, GpuCommand::UseProgram(_))));
    assert_eq!(device.backend().current_program(), GpuHandle::NONE);
}

#[test]
fn test_frame_buffer_owns_its_attachments() {
    let mut device = Device::new(HeadlessBackend::new());
    let target = device
        .create_frame_buffer(32, 32, &[TextureFormat::Rgba8], Some(TextureFormat::Depth24Stencil8))
        .unwrap();
    assert_eq!(device.frame_buffer_complete(target), Ok(true));
    let color = device.frame_buffer(target).unwrap().color_attachment(0).unwrap();
    assert!(device.contains(color));

    assert_eq!(device.remove(target), 3);
    assert!(!device.contains(color));
    assert_eq!(device.backend().live_objects(), 0);
}

#[test]
fn test_leaving_a_frame_buffer_restores_the_window_viewport() {
    let mut device = Device::new(HeadlessBackend::new());
    device.set_viewport(0, 0, 200, 100);
    let target = device
        .create_frame_buffer(8, 8, &[TextureFormat::Rgba8], None)
        .unwrap();

    device.bind_frame_buffer(Some(target)).unwrap();
    assert_eq!(device.backend().current_viewport(), (0, 0, 8, 8));
    device.bind_frame_buffer(None).unwrap();
    assert_eq!(device.backend().current_viewport(), (0, 0, 200, 100));

    let (geometry, _, _) = triangle_geometry(&mut device);
    let binding = BindingState {
        geometry: Some(geometry),
        program: Some(program(&mut device, FRAGMENT)),
        frame_buffer: Some(target),
        ..BindingState::new()
    };
    device.bind(&binding).unwrap();
    assert_eq!(device.backend().current_viewport(), (0, 0, 8, 8));
    device.unbind(&binding).unwrap();
    assert_eq!(device.backend().current_viewport(), (0, 0, 200, 100));
}
