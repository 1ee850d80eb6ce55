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

//! Light sources.

use crate::math::Vec3;
use serde::{Deserialize, Serialize};

/// The shape of a light's emission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LightKind {
    /// Parallel rays, e.g. the sun. The direction is in the owning node's space.
    Directional {
        /// Direction the light travels.
        direction: Vec3,
    },
    /// Emits from the owning node's origin in every direction.
    Point,
}

/// A light attached to a scene node.
///
/// Lights carry no position of their own: a point light sits at the world origin of
/// its node and a directional light's direction is rotated by the node's transform.
///
/// # Examples
///
/// ```
/// use ember_core::scene::Light;
/// use ember_core::Vec3;
///
/// let sun = Light::directional(Vec3::new(0.0, -1.0, 0.0));
/// assert_eq!(sun.intensity, 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    /// Directional or point.
    pub kind: LightKind,
    /// Linear RGB color.
    pub color: Vec3,
    /// Multiplier applied to `color`.
    pub intensity: f32,
}

impl Light {
    /// A white directional light of unit intensity.
    pub fn directional(direction: Vec3) -> Self {
        Self {
            kind: LightKind::Directional {
                direction: direction.normalize_or_zero(),
            },
            color: Vec3::ONE,
            intensity: 1.0,
        }
    }

    /// A white point light of unit intensity.
    pub fn point() -> Self {
        Self {
            kind: LightKind::Point,
            color: Vec3::ONE,
            intensity: 1.0,
        }
    }

    /// Sets the color.
    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = color;
        self
    }

    /// Sets the intensity.
    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }
}

impl Default for Light {
    fn default() -> Self {
        Self::directional(Vec3::new(0.0, -1.0, 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directional_direction_is_normalized() {
        let light = Light::directional(Vec3::new(0.0, -4.0, 0.0));
        assert_eq!(
            light.kind,
            LightKind::Directional {
                direction: Vec3::new(0.0, -1.0, 0.0)
            }
        );
    }

    #[test]
    fn builders_set_color_and_intensity() {
        let light = Light::point()
            .with_color(Vec3::new(1.0, 0.5, 0.0))
            .with_intensity(3.0);
        assert_eq!(light.color, Vec3::new(1.0, 0.5, 0.0));
        assert_eq!(light.intensity, 3.0);
    }
}
