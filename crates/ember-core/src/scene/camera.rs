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

use crate::math::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// A viewpoint. The renderer draws through the first active camera it meets while
/// walking the scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// World → view transform.
    pub view: Mat4,
    /// View → clip transform.
    pub projection: Mat4,
    /// Eye position in world space.
    pub position: Vec3,
    /// Inactive cameras are skipped.
    pub active: bool,
}

impl Camera {
    /// A perspective camera at `eye` looking at `target`, with `+Y` up.
    pub fn look_at(eye: Vec3, target: Vec3, fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            view: Mat4::look_at_rh(eye, target, Vec3::new(0.0, 1.0, 0.0)),
            projection: Mat4::perspective_rh_gl(fov_y, aspect, near, far),
            position: eye,
            active: true,
        }
    }

    /// Keeps the view and recomputes the projection, e.g. after a resize.
    pub fn set_perspective(&mut self, fov_y: f32, aspect: f32, near: f32, far: f32) {
        self.projection = Mat4::perspective_rh_gl(fov_y, aspect, near, far);
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            position: Vec3::ZERO,
            active: true,
        }
    }
}
