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

//! The window contract and a headless implementation.

use crate::event::Callbacks;
use crate::platform::{Action, KeyCode, Modifiers, MouseButton};
use std::collections::VecDeque;

/// A platform event, already translated into engine terms.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowEvent {
    /// The inner size changed, in physical pixels.
    Resized {
        /// New width.
        width: u32,
        /// New height.
        height: u32,
    },
    /// A mouse button changed state.
    MouseButton {
        /// The button.
        button: MouseButton,
        /// Press or release.
        action: Action,
        /// Modifiers held.
        modifiers: Modifiers,
    },
    /// The cursor moved, in physical pixels from the top-left corner.
    MouseMoved {
        /// Horizontal position.
        x: f64,
        /// Vertical position.
        y: f64,
    },
    /// The wheel or touchpad scrolled.
    Scrolled {
        /// Horizontal delta.
        dx: f64,
        /// Vertical delta.
        dy: f64,
    },
    /// A key changed state.
    Key {
        /// The physical key.
        key: KeyCode,
        /// Press, release or repeat.
        action: Action,
        /// Modifiers held.
        modifiers: Modifiers,
    },
    /// The user asked to close the window.
    CloseRequested,
}

/// One broadcast list per event kind.
///
/// Handlers run on the thread that pumps the window, during
/// [`Window::poll_events`] for input and around the frame for the frame hooks.
#[derive(Debug, Default)]
pub struct WindowEvents {
    /// `(width, height)`.
    pub resize: Callbacks<(u32, u32)>,
    /// `(button, action, modifiers)`.
    pub mouse_button: Callbacks<(MouseButton, Action, Modifiers)>,
    /// `(x, y)`.
    pub mouse_move: Callbacks<(f64, f64)>,
    /// `(dx, dy)`.
    pub scroll: Callbacks<(f64, f64)>,
    /// `(key, action, modifiers)`.
    pub key: Callbacks<(KeyCode, Action, Modifiers)>,
    /// Fired by `on_frame_begin` after input is pumped.
    pub frame_begin: Callbacks<()>,
    /// Fired by `on_frame_end`, e.g. to reset per-frame input deltas.
    pub frame_end: Callbacks<()>,
}

impl WindowEvents {
    /// No subscribers anywhere.
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes `event` to the matching list. `CloseRequested` has no list; the window
    /// handles it.
    pub fn dispatch(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::Resized { width, height } => self.resize.emit(&(*width, *height)),
            WindowEvent::MouseButton {
                button,
                action,
                modifiers,
            } => self.mouse_button.emit(&(*button, *action, *modifiers)),
            WindowEvent::MouseMoved { x, y } => self.mouse_move.emit(&(*x, *y)),
            WindowEvent::Scrolled { dx, dy } => self.scroll.emit(&(*dx, *dy)),
            WindowEvent::Key {
                key,
                action,
                modifiers,
            } => self.key.emit(&(key.clone(), *action, *modifiers)),
            WindowEvent::CloseRequested => {}
        }
    }
}

/// What the engine needs from a window.
pub trait Window {
    /// Inner size in physical pixels.
    fn size(&self) -> (u32, u32);

    /// Title bar text.
    fn title(&self) -> &str;

    /// Drains pending platform events without blocking, dispatching each through
    /// [`Window::events_mut`].
    fn poll_events(&mut self);

    /// Presents the last rendered frame.
    fn swap_buffers(&mut self);

    /// `false` once the window was closed by the user or by [`Window::close`].
    fn is_open(&self) -> bool;

    /// Closes the window.
    fn close(&mut self);

    /// The event lists.
    fn events(&self) -> &WindowEvents;

    /// The event lists, mutably, to subscribe or emit.
    fn events_mut(&mut self) -> &mut WindowEvents;
}

/// A window without a surface, fed from a synthetic event queue.
///
/// Useful for tests and offscreen rendering: [`HeadlessWindow::push_event`] queues
/// events that the next [`Window::poll_events`] dispatches.
#[derive(Debug)]
pub struct HeadlessWindow {
    width: u32,
    height: u32,
    title: String,
    open: bool,
    queue: VecDeque<WindowEvent>,
    events: WindowEvents,
    presented: u64,
}

impl HeadlessWindow {
    /// A window of the given size.
    pub fn new(width: u32, height: u32, title: impl Into<String>) -> Self {
        Self {
            width,
            height,
            title: title.into(),
            open: true,
            queue: VecDeque::new(),
            events: WindowEvents::new(),
            presented: 0,
        }
    }

    /// Queues an event for the next poll.
    pub fn push_event(&mut self, event: WindowEvent) {
        self.queue.push_back(event);
    }

    /// How many frames were presented.
    pub fn presented_frames(&self) -> u64 {
        self.presented
    }
}

impl Window for HeadlessWindow {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn poll_events(&mut self) {
        while let Some(event) = self.queue.pop_front() {
            match &event {
                WindowEvent::Resized { width, height } => {
                    self.width = *width;
                    self.height = *height;
                }
                WindowEvent::CloseRequested => self.open = false,
                _ => {}
            }
            self.events.dispatch(&event);
        }
    }

    fn swap_buffers(&mut self) {
        self.presented += 1;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn events(&self) -> &WindowEvents {
        &self.events
    }

    fn events_mut(&mut self) -> &mut WindowEvents {
        &mut self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn poll_dispatches_queued_events_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut window = HeadlessWindow::new(640, 480, "test");
        {
            let seen = Rc::clone(&seen);
            window
                .events_mut()
                .resize
                .subscribe(move |(w, h)| seen.borrow_mut().push(format!("resize {w}x{h}")));
        }
        {
            let seen = Rc::clone(&seen);
            window
                .events_mut()
                .key
                .subscribe(move |(key, action, _)| seen.borrow_mut().push(format!("{key} {action:?}")));
        }

        window.push_event(WindowEvent::Key {
            key: KeyCode::new("KeyW"),
            action: Action::Press,
            modifiers: Modifiers::NONE,
        });
        window.push_event(WindowEvent::Resized {
            width: 800,
            height: 600,
        });
        assert!(seen.borrow().is_empty());

        window.poll_events();
        assert_eq!(*seen.borrow(), vec!["KeyW Press", "resize 800x600"]);
        assert_eq!(window.size(), (800, 600));
    }

    #[test]
    fn close_request_closes_the_window() {
        let mut window = HeadlessWindow::new(1, 1, "test");
        window.push_event(WindowEvent::CloseRequested);
        assert!(window.is_open());
        window.poll_events();
        assert!(!window.is_open());
    }
}
