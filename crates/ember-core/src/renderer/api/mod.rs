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

//! Backend-agnostic resource objects, descriptors and state aggregates.
//!
//! Everything here talks to the GPU only through [`GraphicsBackend`](crate::renderer::GraphicsBackend).

mod binding;
mod buffer;
mod common;
mod framebuffer;
mod geometry;
mod pipeline;
mod resource;
mod shader;
mod texture;
mod uniform;

pub use self::binding::*;
pub use self::buffer::*;
pub use self::common::*;
pub use self::framebuffer::*;
pub use self::geometry::*;
pub use self::pipeline::*;
pub use self::resource::*;
pub use self::shader::*;
pub use self::texture::*;
pub use self::uniform::*;
