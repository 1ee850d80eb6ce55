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

//! # Ember Core
//!
//! Foundational crate of the ember renderer. It contains the backend-agnostic
//! rendering hardware interface (RHI): the resource registry and its dependency
//! graph, GPU resource objects, fixed-function pipeline state, transient binding
//! state, the forward renderer that walks a scene graph, and the window/frame
//! protocol contracts.
//!
//! Concrete backends (OpenGL through `glow`) and platform glue (`winit`) live in
//! `ember-infra`, which implements the traits defined here.

#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod event;
pub mod guid;
pub mod math;
pub mod platform;
pub mod renderer;
pub mod scene;

pub use config::{EngineConfig, LogSettings, RenderSettings, UniformNames, WindowSettings};
pub use engine::{Engine, FramePhase};
pub use guid::Guid;
pub use math::{Mat4, Vec3};
