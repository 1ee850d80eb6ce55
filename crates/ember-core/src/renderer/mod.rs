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

//! The rendering subsystem.
//!
//! `api` holds the resource objects and state aggregates, `traits` the contracts a
//! GPU backend implements, `registry` the dependency graph that owns resource
//! lifetimes, and `device` the factory and id-keyed cache tying them together. The
//! [`Renderer`] walks a scene graph each frame and draws it through a [`Device`].
//!
//! Concrete GPU backends live in `ember-infra`; [`HeadlessBackend`] records calls
//! instead of issuing them and backs the test suite.

pub mod api;
pub mod device;
pub mod error;
pub mod headless;
pub mod registry;
pub mod system;
pub mod traits;

pub use self::api::*;
pub use self::device::{Device, DeviceStats};
pub use self::error::{RenderError, ResourceError, ShaderError};
pub use self::headless::{GpuCommand, HeadlessBackend};
pub use self::registry::ResourceRegistry;
pub use self::system::{
    CameraSettings, DrawItem, FrameStats, LightSettings, Renderer, RendererState,
};
pub use self::traits::{Bindable, Drawable, GraphicsBackend};
