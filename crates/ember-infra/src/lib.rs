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

//! # Ember Infra
//!
//! Concrete implementations of the contracts defined in `ember-core`: an OpenGL
//! [`GraphicsBackend`](ember_core::renderer::GraphicsBackend) over `glow`, a
//! [`Window`](ember_core::platform::Window) over `winit`, and logger setup.

#![warn(missing_docs)]

#[cfg(feature = "graphics")]
pub mod graphics;
pub mod logging;
#[cfg(feature = "platform")]
pub mod platform;

#[cfg(feature = "graphics")]
pub use graphics::gl::GlowBackend;
#[cfg(feature = "platform")]
pub use platform::window::{WinitWindow, WinitWindowBuilder};
