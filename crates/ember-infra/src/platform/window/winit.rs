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

//! A `winit`-based implementation of ember's [`Window`] trait.
//!
//! The engine drives its own frame loop, so instead of handing control to
//! `EventLoop::run_app` the window pumps the event loop without blocking from
//! [`Window::poll_events`].

use crate::platform::input::{map_modifiers, translate_winit_event};
use anyhow::{anyhow, bail, Context};
use ember_core::platform::{Modifiers, Window, WindowEvents};
use ember_core::WindowSettings;
use std::fmt;
use std::time::Duration;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent as WinitEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window as NativeWindow, WindowAttributes, WindowId};

/// Pumps allowed for the platform to deliver `resumed` during [`WinitWindowBuilder::build`].
const STARTUP_PUMPS: usize = 16;

type PresentHook = Box<dyn FnMut(&NativeWindow)>;

/// A builder for creating [`WinitWindow`] instances.
#[derive(Debug, Clone)]
pub struct WinitWindowBuilder {
    title: String,
    width: u32,
    height: u32,
    vsync: bool,
}

impl WinitWindowBuilder {
    /// Creates a new builder with the default [`WindowSettings`].
    pub fn new() -> Self {
        Self::from_settings(&WindowSettings::default())
    }

    /// Creates a builder from the `window` section of the engine configuration.
    pub fn from_settings(settings: &WindowSettings) -> Self {
        Self {
            title: settings.title.clone(),
            width: settings.width,
            height: settings.height,
            vsync: settings.vsync,
        }
    }

    /// Sets the title of the window to be built.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the initial inner dimensions of the window to be built.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Creates the event loop and the window.
    ///
    /// # Errors
    /// Fails if the platform has no usable display, if the event loop was already
    /// created once in this process, or if the window cannot be opened.
    pub fn build(self) -> anyhow::Result<WinitWindow> {
        log::info!(
            "Building window with title: '{}' and size: {}x{}",
            self.title,
            self.width,
            self.height
        );
        let mut event_loop = EventLoop::new().context("failed to create the event loop")?;

        let attributes = NativeWindow::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(LogicalSize::new(self.width, self.height))
            .with_visible(true);
        let mut state = WindowState {
            pending: Some(attributes),
            window: None,
            creation_error: None,
            title: self.title,
            size: (self.width, self.height),
            open: true,
            modifiers: Modifiers::NONE,
            events: WindowEvents::new(),
        };

        // Windows can only be created from inside the event loop.
        for _ in 0..STARTUP_PUMPS {
            if let PumpStatus::Exit(code) = event_loop.pump_app_events(Some(Duration::ZERO), &mut state) {
                bail!("event loop exited during startup (code {code})");
            }
            if let Some(err) = state.creation_error.take() {
                return Err(anyhow!(err)).context("failed to open the window");
            }
            if state.window.is_some() {
                break;
            }
        }
        let Some(window) = &state.window else {
            bail!("the platform never resumed the event loop");
        };
        log::info!("Winit window created successfully (id: {:?}).", window.id());

        Ok(WinitWindow {
            present: None,
            state,
            event_loop,
            vsync: self.vsync,
        })
    }
}

impl Default for WinitWindowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A desktop window backed by `winit`.
///
/// `winit` only owns the OS window; presenting a GL frame needs the surface of
/// whatever created the GL context. The host registers that through
/// [`WinitWindow::set_present_hook`]; without one, [`Window::swap_buffers`] only
/// requests a redraw.
pub struct WinitWindow {
    // Dropped in this order: the presenter may own a surface tied to the window,
    // and the window must go before its event loop.
    present: Option<PresentHook>,
    state: WindowState,
    event_loop: EventLoop<()>,
    vsync: bool,
}

impl fmt::Debug for WinitWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WinitWindow")
            .field("title", &self.state.title)
            .field("size", &self.state.size)
            .field("open", &self.state.open)
            .field("present_hook", &self.present.is_some())
            .finish()
    }
}

impl WinitWindow {
    /// Registers the function that presents a rendered frame, typically a closure
    /// owning the GL surface and calling its `swap_buffers`.
    pub fn set_present_hook(&mut self, hook: impl FnMut(&NativeWindow) + 'static) {
        self.present = Some(Box::new(hook));
    }

    /// The `winit` window, e.g. to build a GL surface from its raw handles.
    /// `None` once closed.
    pub fn native(&self) -> Option<&NativeWindow> {
        self.state.window.as_ref()
    }

    /// Whether the configuration asked for vertical sync. Applying it is up to
    /// whoever owns the GL surface.
    pub fn vsync(&self) -> bool {
        self.vsync
    }
}

impl Window for WinitWindow {
    fn size(&self) -> (u32, u32) {
        self.state.size
    }

    fn title(&self) -> &str {
        &self.state.title
    }

    fn poll_events(&mut self) {
        if !self.state.open {
            return;
        }
        let status = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.state);
        if let PumpStatus::Exit(code) = status {
            log::info!("Event loop exited (code {code})");
            self.state.open = false;
        }
    }

    fn swap_buffers(&mut self) {
        let Some(window) = self.state.window.as_ref() else {
            return;
        };
        match self.present.as_mut() {
            Some(present) => present(window),
            None => window.request_redraw(),
        }
    }

    fn is_open(&self) -> bool {
        self.state.open
    }

    fn close(&mut self) {
        if self.state.open {
            log::info!("Closing window '{}'", self.state.title);
        }
        self.state.open = false;
        self.state.window = None;
    }

    fn events(&self) -> &WindowEvents {
        &self.state.events
    }

    fn events_mut(&mut self) -> &mut WindowEvents {
        &mut self.state.events
    }
}

/// What the event loop sees while being pumped.
struct WindowState {
    pending: Option<WindowAttributes>,
    window: Option<NativeWindow>,
    creation_error: Option<String>,
    title: String,
    size: (u32, u32),
    open: bool,
    modifiers: Modifiers,
    events: WindowEvents,
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(attributes) = self.pending.take() else {
            return;
        };
        match event_loop.create_window(attributes) {
            Ok(window) => {
                let size = window.inner_size();
                self.size = (size.width, size.height);
                self.window = Some(window);
            }
            Err(err) => self.creation_error = Some(err.to_string()),
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, id: WindowId, event: WinitEvent) {
        if self.window.as_ref().map(NativeWindow::id) != Some(id) {
            return;
        }
        match &event {
            WinitEvent::ModifiersChanged(modifiers) => {
                self.modifiers = map_modifiers(modifiers.state());
            }
            WinitEvent::Resized(size) => self.size = (size.width, size.height),
            WinitEvent::CloseRequested => {
                log::info!("Close requested for window '{}'", self.title);
                self.open = false;
            }
            _ => {}
        }
        if let Some(translated) = translate_winit_event(&event, self.modifiers) {
            self.events.dispatch(&translated);
        }
    }
}
