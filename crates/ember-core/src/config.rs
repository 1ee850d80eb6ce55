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

//! Engine configuration.
//!
//! Every section has a usable `Default`, and every field may be omitted from a JSON
//! document, so a config file only needs to name what it changes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Names of the uniforms the renderer feeds to every program.
///
/// A program only receives the ones it declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniformNames {
    /// `mat4`, object → world.
    pub model: String,
    /// `mat4`, world → view.
    pub view: String,
    /// `mat4`, view → clip.
    pub projection: String,
    /// `vec3`, eye position in world space.
    pub camera_position: String,
    /// `int`, number of valid light entries.
    pub light_count: String,
    /// `vec4[]`, xyz position (w = 1) or direction (w = 0).
    pub light_positions: String,
    /// `vec4[]`, rgb color and intensity in a.
    pub light_colors: String,
}

impl Default for UniformNames {
    fn default() -> Self {
        Self {
            model: "u_model".to_string(),
            view: "u_view".to_string(),
            projection: "u_projection".to_string(),
            camera_position: "u_camera_position".to_string(),
            light_count: "u_light_count".to_string(),
            light_positions: "u_light_positions".to_string(),
            light_colors: "u_light_colors".to_string(),
        }
    }
}

/// Settings of the renderer and of the frame clear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Color the frame is cleared to.
    pub clear_color: [f32; 4],
    /// Depth the frame is cleared to.
    pub clear_depth: f32,
    /// Stencil value the frame is cleared to.
    pub clear_stencil: i32,
    /// Initial viewport, usually the window size.
    pub viewport: (u32, u32),
    /// Lights beyond this many are ignored.
    pub max_lights: usize,
    /// Engine-provided uniform names.
    pub uniforms: UniformNames,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            clear_color: [0.1, 0.1, 0.1, 1.0],
            clear_depth: 1.0,
            clear_stencil: 0,
            viewport: (1280, 720),
            max_lights: 8,
            uniforms: UniformNames::default(),
        }
    }
}

/// Settings of the main window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    /// Inner width in physical pixels.
    pub width: u32,
    /// Inner height in physical pixels.
    pub height: u32,
    /// Title bar text.
    pub title: String,
    /// Swap interval of one.
    pub vsync: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "Ember".to_string(),
            vsync: true,
        }
    }
}

/// Settings of the logger installed by the platform layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Filter used when `RUST_LOG` is unset, e.g. `"info"`.
    pub default_filter: String,
    /// Per-module level overrides, e.g. `"ember_core::renderer" → "debug"`.
    pub modules: BTreeMap<String, String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            modules: BTreeMap::new(),
        }
    }
}

impl LogSettings {
    /// The settings as one `env_logger` filter string: the default level followed by
    /// each `module=level` override.
    pub fn filter_string(&self) -> String {
        std::iter::once(self.default_filter.clone())
            .chain(self.modules.iter().map(|(module, level)| format!("{module}={level}")))
            .filter(|directive| !directive.is_empty())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Everything needed to start an [`Engine`](crate::Engine).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Main window.
    pub window: WindowSettings,
    /// Renderer.
    pub render: RenderSettings,
    /// Logger.
    pub log: LogSettings,
}

impl EngineConfig {
    /// Parses a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes the config as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
