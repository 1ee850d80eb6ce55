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

use crate::renderer::traits::GraphicsBackend;

/// A resource that can be attached to the device for the duration of a draw call.
///
/// Implemented once per concrete resource type so the binding state never needs to
/// inspect what kind of object it holds.
pub trait Bindable {
    /// Attaches the resource.
    fn bind(&self, backend: &mut dyn GraphicsBackend);
    /// Detaches the resource.
    fn unbind(&self, backend: &mut dyn GraphicsBackend);
}

/// A resource that can issue draw commands once bound.
pub trait Drawable {
    /// Issues one draw over the full element range.
    fn draw(&self, backend: &mut dyn GraphicsBackend);
    /// Issues the same draw replicated `instances` times.
    fn instanced_draw(&self, backend: &mut dyn GraphicsBackend, instances: u32);
}
