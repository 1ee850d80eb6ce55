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

//! Translation from `winit` window events to ember's [`WindowEvent`].
//!
//! Ember's window contract only knows its own vocabulary; everything `winit`
//! specific stops here.

use ember_core::platform::{Action, KeyCode, Modifiers, MouseButton, WindowEvent};
use winit::event::{
    ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent as WinitEvent,
};
use winit::keyboard::{KeyCode as WinitKeyCode, ModifiersState, PhysicalKey};

/// Translates a `winit` window event.
///
/// `modifiers` is the modifier state last reported by the window; `winit` delivers
/// it as a separate event. Returns `None` for events ember has no use for (focus,
/// IME, touch, ...) and for keys without a physical key code.
pub fn translate_winit_event(event: &WinitEvent, modifiers: Modifiers) -> Option<WindowEvent> {
    match event {
        WinitEvent::Resized(size) => Some(WindowEvent::Resized {
            width: size.width,
            height: size.height,
        }),
        WinitEvent::CloseRequested => Some(WindowEvent::CloseRequested),
        WinitEvent::KeyboardInput {
            event: key_event, ..
        } => {
            let PhysicalKey::Code(keycode) = key_event.physical_key else {
                return None;
            };
            let action = match key_event.state {
                ElementState::Pressed if key_event.repeat => Action::Repeat,
                ElementState::Pressed => Action::Press,
                ElementState::Released => Action::Release,
            };
            Some(WindowEvent::Key {
                key: KeyCode::new(map_keycode_to_string(keycode)),
                action,
                modifiers,
            })
        }
        WinitEvent::CursorMoved { position, .. } => Some(WindowEvent::MouseMoved {
            x: position.x,
            y: position.y,
        }),
        WinitEvent::MouseInput { state, button, .. } => Some(WindowEvent::MouseButton {
            button: map_mouse_button(*button),
            action: map_element_state(*state),
            modifiers,
        }),
        WinitEvent::MouseWheel { delta, .. } => {
            let (dx, dy) = match delta {
                MouseScrollDelta::LineDelta(x, y) => (f64::from(*x), f64::from(*y)),
                MouseScrollDelta::PixelDelta(pos) => (pos.x, pos.y),
            };
            if dx != 0.0 || dy != 0.0 {
                Some(WindowEvent::Scrolled { dx, dy })
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Maps `winit`'s modifier state.
pub fn map_modifiers(state: ModifiersState) -> Modifiers {
    Modifiers {
        shift: state.shift_key(),
        control: state.control_key(),
        alt: state.alt_key(),
        logo: state.super_key(),
    }
}

// --- Private Helper Functions ---

fn map_keycode_to_string(keycode: WinitKeyCode) -> String {
    format!("{keycode:?}")
}

fn map_mouse_button(button: WinitMouseButton) -> MouseButton {
    match button {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        WinitMouseButton::Back => MouseButton::Back,
        WinitMouseButton::Forward => MouseButton::Forward,
        WinitMouseButton::Other(id) => MouseButton::Other(id),
    }
}

fn map_element_state(state: ElementState) -> Action {
    match state {
        ElementState::Pressed => Action::Press,
        ElementState::Released => Action::Release,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::{PhysicalPosition, PhysicalSize};
    use winit::event::DeviceId;

    #[test]
    fn test_map_keycode_simple() {
        assert_eq!(map_keycode_to_string(WinitKeyCode::KeyA), "KeyA");
        assert_eq!(map_keycode_to_string(WinitKeyCode::Escape), "Escape");
    }

    #[test]
    fn test_map_mouse_button_other() {
        assert_eq!(map_mouse_button(WinitMouseButton::Left), MouseButton::Left);
        assert_eq!(map_mouse_button(WinitMouseButton::Other(8)), MouseButton::Other(8));
    }

    #[test]
    fn test_translate_mouse_button_carries_modifiers() {
        let event = WinitEvent::MouseInput {
            device_id: DeviceId::dummy(),
            state: ElementState::Released,
            button: WinitMouseButton::Right,
        };
        let modifiers = map_modifiers(ModifiersState::SHIFT);
        assert_eq!(
            translate_winit_event(&event, modifiers),
            Some(WindowEvent::MouseButton {
                button: MouseButton::Right,
                action: Action::Release,
                modifiers: Modifiers {
                    shift: true,
                    ..Modifiers::NONE
                },
            })
        );
    }

    #[test]
    fn test_translate_cursor_and_resize() {
        let moved = WinitEvent::CursorMoved {
            device_id: DeviceId::dummy(),
            position: PhysicalPosition::new(100.5, 200.75),
        };
        assert_eq!(
            translate_winit_event(&moved, Modifiers::NONE),
            Some(WindowEvent::MouseMoved { x: 100.5, y: 200.75 })
        );

        let resized = WinitEvent::Resized(PhysicalSize::new(800, 600));
        assert_eq!(
            translate_winit_event(&resized, Modifiers::NONE),
            Some(WindowEvent::Resized {
                width: 800,
                height: 600
            })
        );
    }

    #[test]
    fn test_zero_scroll_is_dropped() {
        let still = WinitEvent::MouseWheel {
            device_id: DeviceId::dummy(),
            delta: MouseScrollDelta::LineDelta(0.0, 0.0),
            phase: winit::event::TouchPhase::Moved,
        };
        assert_eq!(translate_winit_event(&still, Modifiers::NONE), None);

        let scrolled = WinitEvent::MouseWheel {
            device_id: DeviceId::dummy(),
            delta: MouseScrollDelta::LineDelta(-1.0, 2.0),
            phase: winit::event::TouchPhase::Moved,
        };
        assert_eq!(
            translate_winit_event(&scrolled, Modifiers::NONE),
            Some(WindowEvent::Scrolled { dx: -1.0, dy: 2.0 })
        );
    }

    #[test]
    fn test_focus_is_ignored() {
        assert_eq!(
            translate_winit_event(&WinitEvent::Focused(true), Modifiers::NONE),
            None
        );
    }
}
