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

//! Fixed-function pipeline state and its named presets.
//!
//! A [`PipelineState`] is five independent sub-states. Applying it always asserts all
//! five, disabled ones included, so nothing set by a previous draw survives.

use crate::renderer::api::Capability;
use crate::renderer::traits::GraphicsBackend;
use serde::{Deserialize, Serialize};

/// The comparison function used for depth and stencil testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CompareFunction {
    /// The test never passes.
    Never,
    /// The test passes if the new value is less than the existing value.
    Less,
    /// The test passes if the new value is equal to the existing value.
    Equal,
    /// The test passes if the new value is less than or equal to the existing value.
    LessEqual,
    /// The test passes if the new value is greater than the existing value.
    Greater,
    /// The test passes if the new value is not equal to the existing value.
    NotEqual,
    /// The test passes if the new value is greater than or equal to the existing value.
    GreaterEqual,
    /// The test always passes.
    #[default]
    Always,
}

/// An operation to perform on a stencil buffer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StencilOperation {
    /// Keep the existing stencil value.
    #[default]
    Keep,
    /// Set the stencil value to 0.
    Zero,
    /// Replace the stencil value with the reference value.
    Replace,
    /// Bitwise invert the stencil value.
    Invert,
    /// Increment, clamping at the maximum value.
    IncrementClamp,
    /// Decrement, clamping at 0.
    DecrementClamp,
    /// Increment, wrapping to 0 on overflow.
    IncrementWrap,
    /// Decrement, wrapping to the maximum value on underflow.
    DecrementWrap,
}

/// A factor in a blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendFactor {
    /// `0.0`
    Zero,
    /// `1.0`
    One,
    /// `src.rgb`
    SrcColor,
    /// `1.0 - src.rgb`
    OneMinusSrcColor,
    /// `src.a`
    SrcAlpha,
    /// `1.0 - src.a`
    OneMinusSrcAlpha,
    /// `dst.rgb`
    DstColor,
    /// `1.0 - dst.rgb`
    OneMinusDstColor,
    /// `dst.a`
    DstAlpha,
    /// `1.0 - dst.a`
    OneMinusDstAlpha,
}

/// The operation combining source and destination in a blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendOperation {
    /// `source + destination`
    Add,
    /// `source - destination`
    Subtract,
    /// `destination - source`
    ReverseSubtract,
    /// `min(source, destination)`
    Min,
    /// `max(source, destination)`
    Max,
}

/// Which faces are culled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Face {
    /// Front-facing triangles.
    Front,
    /// Back-facing triangles.
    #[default]
    Back,
    /// Both.
    FrontAndBack,
}

/// Which winding order is front-facing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrontFace {
    /// Counter-clockwise.
    #[default]
    Ccw,
    /// Clockwise.
    Cw,
}

/// Depth test and depth writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepthState {
    /// Enables the depth test.
    pub enabled: bool,
    /// Writes passing fragments' depth.
    pub write: bool,
    /// The depth comparison.
    pub compare: CompareFunction,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            enabled: false,
            write: true,
            compare: CompareFunction::Less,
        }
    }
}

/// Color blending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlendState {
    /// Enables blending. Decides the transparent bucket.
    pub enabled: bool,
    /// Source factor.
    pub src_factor: BlendFactor,
    /// Destination factor.
    pub dst_factor: BlendFactor,
    /// Blend equation.
    pub operation: BlendOperation,
}

impl Default for BlendState {
    fn default() -> Self {
        Self {
            enabled: false,
            src_factor: BlendFactor::One,
            dst_factor: BlendFactor::Zero,
            operation: BlendOperation::Add,
        }
    }
}

impl BlendState {
    /// Straight alpha blending.
    pub const ALPHA: Self = Self {
        enabled: true,
        src_factor: BlendFactor::SrcAlpha,
        dst_factor: BlendFactor::OneMinusSrcAlpha,
        operation: BlendOperation::Add,
    };
}

/// Stencil test and stencil writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StencilState {
    /// Enables the stencil test.
    pub enabled: bool,
    /// The comparison against `reference`.
    pub compare: CompareFunction,
    /// The reference value.
    pub reference: i32,
    /// Mask applied to both sides of the comparison.
    pub read_mask: u32,
    /// Mask applied to stencil writes.
    pub write_mask: u32,
    /// Operation when the stencil test fails.
    pub fail_op: StencilOperation,
    /// Operation when the stencil test passes but the depth test fails.
    pub depth_fail_op: StencilOperation,
    /// Operation when both tests pass.
    pub pass_op: StencilOperation,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            enabled: false,
            compare: CompareFunction::Always,
            reference: 0,
            read_mask: 0xFF,
            write_mask: 0xFF,
            fail_op: StencilOperation::Keep,
            depth_fail_op: StencilOperation::Keep,
            pass_op: StencilOperation::Keep,
        }
    }
}

/// Face culling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CullState {
    /// Enables culling.
    pub enabled: bool,
    /// The culled faces.
    pub face: Face,
    /// The front-facing winding.
    pub front_face: FrontFace,
}

/// Depth offset applied to filled polygons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PolygonOffsetState {
    /// Enables the offset.
    pub enabled: bool,
    /// Scale of the polygon's depth slope.
    pub factor: f32,
    /// Constant offset in depth units.
    pub units: f32,
}

/// Named pipeline-state presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelinePreset {
    /// Depth test and write, no blending, stencil marks drawn pixels, back faces culled.
    Opaque,
    /// Depth test without write, alpha blending, no stencil, back faces culled.
    Translucent,
    /// Opaque depth and culling, draws only where the stencil mark is absent. Used
    /// for outlines.
    Edge,
}

/// The aggregate fixed-function configuration applied before a draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    /// Depth sub-state.
    pub depth: DepthState,
    /// Blend sub-state.
    pub blend: BlendState,
    /// Stencil sub-state.
    pub stencil: StencilState,
    /// Cull sub-state.
    pub cull: CullState,
    /// Polygon-offset sub-state.
    pub polygon_offset: PolygonOffsetState,
}

impl PipelineState {
    /// Builds a preset.
    pub fn preset(preset: PipelinePreset) -> Self {
        match preset {
            PipelinePreset::Opaque => Self::opaque(),
            PipelinePreset::Translucent => Self::translucent(),
            PipelinePreset::Edge => Self::edge(),
        }
    }

    /// See [`PipelinePreset::Opaque`].
    pub fn opaque() -> Self {
        Self {
            depth: DepthState {
                enabled: true,
                write: true,
                compare: CompareFunction::Less,
            },
            blend: BlendState::default(),
            stencil: StencilState {
                enabled: true,
                compare: CompareFunction::Always,
                reference: 1,
                read_mask: 0xFF,
                write_mask: 0xFF,
                fail_op: StencilOperation::Keep,
                depth_fail_op: StencilOperation::Keep,
                pass_op: StencilOperation::Replace,
            },
            cull: CullState {
                enabled: true,
                face: Face::Back,
                front_face: FrontFace::Ccw,
            },
            polygon_offset: PolygonOffsetState::default(),
        }
    }

    /// See [`PipelinePreset::Translucent`].
    pub fn translucent() -> Self {
        Self {
            depth: DepthState {
                enabled: true,
                write: false,
                compare: CompareFunction::Less,
            },
            blend: BlendState::ALPHA,
            stencil: StencilState::default(),
            cull: CullState {
                enabled: true,
                face: Face::Back,
                front_face: FrontFace::Ccw,
            },
            polygon_offset: PolygonOffsetState::default(),
        }
    }

    /// See [`PipelinePreset::Edge`].
    pub fn edge() -> Self {
        let opaque = Self::opaque();
        Self {
            stencil: StencilState {
                enabled: true,
                compare: CompareFunction::NotEqual,
                reference: 1,
                read_mask: 0xFF,
                write_mask: 0x00,
                fail_op: StencilOperation::Keep,
                depth_fail_op: StencilOperation::Keep,
                pass_op: StencilOperation::Keep,
            },
            ..opaque
        }
    }

    /// Returns `true` if meshes drawn with this state belong to the transparent bucket.
    pub fn is_transparent(&self) -> bool {
        self.blend.enabled
    }

    /// Asserts every sub-state on the backend in the order blend, cull, depth,
    /// polygon offset, stencil.
    ///
    /// Disabled sub-states still set their parameters, so the resulting
    /// configuration depends on this value alone.
    pub fn apply(&self, backend: &mut dyn GraphicsBackend) {
        let blend = &self.blend;
        backend.set_capability(Capability::Blend, blend.enabled);
        backend.blend_func(blend.src_factor, blend.dst_factor);
        backend.blend_equation(blend.operation);

        let cull = &self.cull;
        backend.set_capability(Capability::CullFace, cull.enabled);
        backend.cull_face(cull.face);
        backend.front_face(cull.front_face);

        let depth = &self.depth;
        backend.set_capability(Capability::DepthTest, depth.enabled);
        backend.depth_func(depth.compare);
        backend.depth_mask(depth.write);

        let offset = &self.polygon_offset;
        backend.set_capability(Capability::PolygonOffsetFill, offset.enabled);
        backend.polygon_offset(offset.factor, offset.units);

        let stencil = &self.stencil;
        backend.set_capability(Capability::StencilTest, stencil.enabled);
        backend.stencil_func(stencil.compare, stencil.reference, stencil.read_mask);
        backend.stencil_op(stencil.fail_op, stencil.depth_fail_op, stencil.pass_op);
        backend.stencil_mask(stencil.write_mask);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::headless::{GpuCommand, HeadlessBackend};

    #[test]
    fn presets_match_their_contract() {
        let opaque = PipelineState::opaque();
        assert!(opaque.depth.enabled && opaque.depth.write);
        assert!(!opaque.blend.enabled);
        assert!(opaque.stencil.enabled && opaque.stencil.write_mask != 0);
        assert!(opaque.cull.enabled);

        let translucent = PipelineState::translucent();
        assert!(translucent.depth.enabled && !translucent.depth.write);
        assert!(translucent.is_transparent());
        assert!(!translucent.stencil.enabled);

        let edge = PipelineState::edge();
        assert_eq!(edge.depth, opaque.depth);
        assert_eq!(edge.cull, opaque.cull);
        assert_eq!(edge.stencil.compare, CompareFunction::NotEqual);
        assert!(!edge.is_transparent());
    }

    #[test]
    fn apply_order_is_fixed() {
        let mut backend = HeadlessBackend::new();
        PipelineState::opaque().apply(&mut backend);
        let toggles: Vec<Capability> = backend
            .commands()
            .iter()
            .filter_map(|c| match c {
                GpuCommand::SetCapability(cap, _) => Some(*cap),
                _ => None,
            })
            .collect();
        assert_eq!(
            toggles,
            vec![
                Capability::Blend,
                Capability::CullFace,
                Capability::DepthTest,
                Capability::PolygonOffsetFill,
                Capability::StencilTest,
            ]
        );
    }

    #[test]
    fn applying_twice_gives_identical_state() {
        let mut backend = HeadlessBackend::new();
        let state = PipelineState::translucent();
        state.apply(&mut backend);
        let first = backend.fixed_function_state();
        state.apply(&mut backend);
        assert_eq!(backend.fixed_function_state(), first);
    }

    #[test]
    fn no_sub_state_is_inherited() {
        let mut fresh = HeadlessBackend::new();
        PipelineState::opaque().apply(&mut fresh);

        let mut used = HeadlessBackend::new();
        PipelineState::edge().apply(&mut used);
        PipelineState::translucent().apply(&mut used);
        PipelineState::opaque().apply(&mut used);

        assert_eq!(used.fixed_function_state(), fresh.fixed_function_state());
    }
}
