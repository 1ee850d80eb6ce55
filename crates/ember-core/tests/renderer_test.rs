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

//! Integration tests for the forward renderer and the frame protocol.

use ember_core::math::{Mat4, Vec3};
use ember_core::platform::{HeadlessWindow, Window, WindowEvent};
use ember_core::renderer::{
    Device, GpuCommand, HeadlessBackend, PipelinePreset, RenderError, Renderer,
};
use ember_core::scene::{
    Camera, InstancedMaterial, Light, Mesh, Scene, SceneGraph, StandardMaterial,
};
use ember_core::{Engine, FramePhase, RenderSettings};

fn draws(backend: &HeadlessBackend) -> Vec<Option<u32>> {
    backend
        .commands()
        .iter()
        .filter_map(|c| match c {
            GpuCommand::DrawElements { instances, .. } => Some(*instances),
            _ => None,
        })
        .collect()
}

#[test]
fn test_opaque_meshes_draw_before_transparent_ones() {
    let mut device = Device::new(HeadlessBackend::new());
    let mut renderer = Renderer::new(RenderSettings::default());
    let mut scene = Scene::new();
    let root = scene.root();
    let glass = scene.add_material(StandardMaterial::unlit().with_preset(PipelinePreset::Translucent));
    let solid = scene.add_material(StandardMaterial::unlit());
    scene.add_mesh(root, Mesh::quad(glass), Mat4::IDENTITY);
    scene.add_mesh(root, Mesh::triangle(solid), Mat4::IDENTITY);

    let stats = renderer.render(&mut device, &scene).unwrap();

    assert_eq!((stats.opaque, stats.transparent), (1, 1));
    let counts: Vec<u32> = device
        .backend()
        .commands()
        .iter()
        .filter_map(|c| match c {
            GpuCommand::DrawElements { count, .. } => Some(*count),
            _ => None,
        })
        .collect();
    // Triangle (opaque) first, then the two-triangle quad.
    assert_eq!(counts, vec![3, 6]);
    assert_eq!(device.check_error(), Ok(()));
}

#[test]
fn test_instanced_material_issues_one_instanced_draw() {
    let mut device = Device::new(HeadlessBackend::new());
    let mut renderer = Renderer::new(RenderSettings::default());
    let mut scene = Scene::new();
    let root = scene.root();
    let transforms: Vec<Mat4> = (0..5)
        .map(|i| Mat4::from_translation(Vec3::new(i as f32, 0.0, 0.0)))
        .collect();
    let material = scene.add_material(InstancedMaterial::unlit(transforms));
    scene.add_mesh(root, Mesh::triangle(material), Mat4::IDENTITY);

    let stats = renderer.render(&mut device, &scene).unwrap();

    assert_eq!(stats.instanced_draw_calls, 1);
    assert_eq!(stats.draw_calls, 0);
    assert_eq!(draws(device.backend()), vec![Some(5)]);
    assert_eq!(device.check_error(), Ok(()));
}

#[test]
fn test_camera_and_lights_feed_engine_uniforms() {
    let mut device = Device::new(HeadlessBackend::new());
    let mut renderer = Renderer::new(RenderSettings::default());
    let mut scene = Scene::new();
    let root = scene.root();
    let eye = Vec3::new(0.0, 2.0, 8.0);
    scene.add_camera(root, Camera::look_at(eye, Vec3::ZERO, 1.0, 1.5, 0.1, 100.0));
    scene.add_light(root, Light::point().with_intensity(2.0), Mat4::from_translation(Vec3::ONE));
    let material = scene.add_material(StandardMaterial::unlit());
    scene.add_mesh(root, Mesh::triangle(material), Mat4::IDENTITY);

    let stats = renderer.render(&mut device, &scene).unwrap();

    assert_eq!(stats.lights, 1);
    assert_eq!(renderer.camera().position, eye);
    assert_eq!(renderer.lights().positions, vec![[1.0, 1.0, 1.0, 1.0]]);
    assert_eq!(renderer.lights().colors, vec![[1.0, 1.0, 1.0, 2.0]]);
}

#[test]
fn test_frame_loop_runs_until_the_window_closes() {
    let window = HeadlessWindow::new(320, 240, "frames");
    let mut engine = Engine::new(HeadlessBackend::new(), window, RenderSettings::default());
    let mut scene = Scene::new();
    let root = scene.root();
    let material = scene.add_material(StandardMaterial::unlit());
    scene.add_mesh(root, Mesh::triangle(material), Mat4::IDENTITY);

    let mut frames = 0;
    while engine.is_active() {
        engine.on_frame_begin().unwrap();
        if frames == 3 {
            engine.window_mut().push_event(WindowEvent::CloseRequested);
        }
        engine.clear().unwrap();
        let stats = engine.render(&scene).unwrap();
        assert_eq!(stats.draw_calls, 1);
        engine.on_frame_end().unwrap();
        frames += 1;
    }

    // The close request queued during frame 4 is polled at the start of frame 5.
    assert_eq!(frames, 5);
    assert!(!engine.window().is_open());
    assert_eq!(engine.phase(), FramePhase::Idle);
    assert_eq!(engine.check_error(), Ok(()));
}

#[test]
fn test_skipping_clear_is_a_protocol_error() {
    let window = HeadlessWindow::new(8, 8, "protocol");
    let mut engine = Engine::new(HeadlessBackend::new(), window, RenderSettings::default());
    let scene = Scene::new();

    engine.on_frame_begin().unwrap();
    let err = engine.render(&scene).unwrap_err();

    assert!(matches!(err, RenderError::FrameProtocol { call: "render", .. }));
    assert_eq!(engine.phase(), FramePhase::Begun);
}

#[test]
fn test_edited_indices_reach_the_next_frame() {
    let mut device = Device::new(HeadlessBackend::new());
    let mut renderer = Renderer::new(RenderSettings::default());
    let mut scene = Scene::new();
    let root = scene.root();
    let material = scene.add_material(StandardMaterial::unlit());
    let node = scene.add_mesh(root, Mesh::triangle(material), Mat4::IDENTITY);
    renderer.render(&mut device, &scene).unwrap();

    scene.mesh_mut(node).unwrap().set_indices(vec![0, 1, 2, 2, 1, 0]);
    device.backend_mut().clear_commands();
    renderer.render(&mut device, &scene).unwrap();

    let counts: Vec<u32> = device
        .backend()
        .commands()
        .iter()
        .filter_map(|c| match c {
            GpuCommand::DrawElements { count, .. } => Some(*count),
            _ => None,
        })
        .collect();
    assert_eq!(counts, vec![6]);
}

#[test]
fn test_stale_mesh_revisions_are_released() {
    let mut device = Device::new(HeadlessBackend::new());
    let mut renderer = Renderer::new(RenderSettings::default());
    let mut scene = Scene::new();
    let root = scene.root();
    let material = scene.add_material(StandardMaterial::unlit());
    let node = scene.add_mesh(root, Mesh::triangle(material), Mat4::IDENTITY);
    renderer.render(&mut device, &scene).unwrap();
    let resources = device.registry().len();
    assert_eq!(device.backend().live_buffers(), 2);

    for frame in 0..4 {
        let mesh = scene.mesh_mut(node).unwrap();
        mesh.set_stream(Mesh::POSITION_LOCATION, 3, vec![frame as f32; 9]);
        renderer.render(&mut device, &scene).unwrap();

        assert_eq!(device.registry().len(), resources);
        assert_eq!(device.backend().live_buffers(), 2);
        assert_eq!(device.backend().live_vertex_arrays(), 1);
    }
    assert_eq!(device.check_error(), Ok(()));
}
