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

//! The frame protocol.
//!
//! A frame is four calls, each exactly once and in this order:
//!
//! 1. [`Engine::on_frame_begin`] pumps input, presents the previous frame and fires
//!    the frame-begin callbacks.
//! 2. [`Engine::clear`] clears the window and the render target.
//! 3. [`Engine::render`] parses and draws a scene.
//! 4. [`Engine::on_frame_end`] fires the frame-end callbacks.
//!
//! Application logic (camera updates, scene edits) runs between the first two.
//! Calls out of order are refused with [`RenderError::FrameProtocol`] and leave the
//! phase unchanged.
//!
//! ```
//! use ember_core::platform::HeadlessWindow;
//! use ember_core::renderer::HeadlessBackend;
//! use ember_core::scene::Scene;
//! use ember_core::{Engine, RenderSettings};
//!
//! let window = HeadlessWindow::new(320, 240, "demo");
//! let mut engine = Engine::new(HeadlessBackend::new(), window, RenderSettings::default());
//! let scene = Scene::new();
//! for _ in 0..3 {
//!     engine.on_frame_begin()?;
//!     engine.clear()?;
//!     engine.render(&scene)?;
//!     engine.on_frame_end()?;
//! }
//! # Ok::<(), ember_core::renderer::RenderError>(())
//! ```

use crate::config::RenderSettings;
use crate::platform::Window;
use crate::renderer::{ClearFlags, Device, FrameStats, GraphicsBackend, RenderError, Renderer};
use crate::scene::SceneGraph;

/// The last frame-protocol call that succeeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FramePhase {
    /// No frame in progress.
    #[default]
    Idle,
    /// `on_frame_begin` done.
    Begun,
    /// `clear` done.
    Cleared,
    /// `render` done.
    Rendered,
}

/// Owns the device, the window and the renderer, and enforces the frame order.
#[derive(Debug)]
pub struct Engine<B: GraphicsBackend, W: Window> {
    device: Device<B>,
    window: W,
    renderer: Renderer,
    phase: FramePhase,
    active: bool,
    viewport: (u32, u32),
}

impl<B: GraphicsBackend, W: Window> Engine<B, W> {
    /// Wires a backend and a window together. The viewport starts at the window size.
    pub fn new(backend: B, window: W, settings: RenderSettings) -> Self {
        let mut device = Device::new(backend);
        let (width, height) = window.size();
        device.set_viewport(0, 0, width, height);
        let mut renderer = Renderer::new(settings);
        renderer.resize(width, height);
        log::info!("Engine started on a {width}x{height} window \"{}\"", window.title());
        Self {
            device,
            window,
            renderer,
            phase: FramePhase::Idle,
            active: true,
            viewport: (width, height),
        }
    }

    fn expect_phase(&self, call: &'static str, expected: FramePhase) -> Result<(), RenderError> {
        if self.phase == expected {
            return Ok(());
        }
        let expected = match expected {
            FramePhase::Idle => "on_frame_end (or nothing) before it",
            FramePhase::Begun => "on_frame_begin before it",
            FramePhase::Cleared => "clear before it",
            FramePhase::Rendered => "render before it",
        };
        log::warn!("Frame protocol violated: {call} called in phase {:?}", self.phase);
        Err(RenderError::FrameProtocol { call, expected })
    }

    /// Pumps input, presents the previous frame and fires the frame-begin callbacks.
    ///
    /// A size change reported by the window resizes the viewport.
    pub fn on_frame_begin(&mut self) -> Result<(), RenderError> {
        self.expect_phase("on_frame_begin", FramePhase::Idle)?;
        self.window.poll_events();
        self.window.swap_buffers();

        let size = self.window.size();
        if size != self.viewport {
            log::debug!("Viewport resized to {}x{}", size.0, size.1);
            self.viewport = size;
            self.device.set_viewport(0, 0, size.0, size.1);
            self.renderer.resize(size.0, size.1);
        }
        self.window.events_mut().frame_begin.emit(&());
        self.phase = FramePhase::Begun;
        Ok(())
    }

    /// Clears color, depth and stencil.
    pub fn clear(&mut self) -> Result<(), RenderError> {
        self.expect_phase("clear", FramePhase::Begun)?;
        let (width, height) = self.viewport;
        self.device.set_viewport(0, 0, width, height);
        self.renderer.clear(&mut self.device, ClearFlags::ALL)?;
        self.phase = FramePhase::Cleared;
        Ok(())
    }

    /// Parses and draws `scene`.
    ///
    /// A failed draw still completes the phase, so the frame can be ended and the
    /// loop decide whether to continue.
    pub fn render(&mut self, scene: &dyn SceneGraph) -> Result<FrameStats, RenderError> {
        self.expect_phase("render", FramePhase::Cleared)?;
        self.phase = FramePhase::Rendered;
        self.renderer.render(&mut self.device, scene)
    }

    /// Fires the frame-end callbacks.
    pub fn on_frame_end(&mut self) -> Result<(), RenderError> {
        self.expect_phase("on_frame_end", FramePhase::Rendered)?;
        self.window.events_mut().frame_end.emit(&());
        self.phase = FramePhase::Idle;
        Ok(())
    }

    /// The frame-loop condition: `false` once deactivated or once the window closed.
    pub fn is_active(&self) -> bool {
        self.active && self.window.is_open()
    }

    /// Asks the frame loop to stop. The frame in progress, if any, is not interrupted.
    pub fn deactivate(&mut self) {
        log::info!("Engine deactivated");
        self.active = false;
    }

    /// The last frame-protocol call that succeeded.
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// The device.
    pub fn device(&self) -> &Device<B> {
        &self.device
    }

    /// The device, mutably, e.g. to create resources.
    pub fn device_mut(&mut self) -> &mut Device<B> {
        &mut self.device
    }

    /// The window.
    pub fn window(&self) -> &W {
        &self.window
    }

    /// The window, mutably, e.g. to subscribe to events.
    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }

    /// The renderer.
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// The renderer, mutably, e.g. to set an override material.
    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    /// Drains GPU errors; see [`Device::check_error`].
    pub fn check_error(&mut self) -> Result<(), RenderError> {
        self.device.check_error()
    }
}
