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

//! The transient set of resources attached for one draw call.

use crate::guid::Guid;
use crate::renderer::api::{FrameBuffer, Geometry, RhiResource, ShaderProgram, Texture};
use crate::renderer::error::ResourceError;
use crate::renderer::registry::ResourceRegistry;
use crate::renderer::traits::{Bindable, GraphicsBackend};
use std::collections::BTreeMap;

/// One geometry, one shader program, an optional frame buffer and textures by slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingState {
    /// The geometry drawn.
    pub geometry: Option<Guid>,
    /// The program drawn with.
    pub program: Option<Guid>,
    /// The render target, `None` for the window.
    pub frame_buffer: Option<Guid>,
    /// Texture unit → texture.
    pub textures: BTreeMap<u32, Guid>,
}

impl BindingState {
    /// An empty binding state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the geometry.
    pub fn with_geometry(mut self, geometry: Guid) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Sets the shader program.
    pub fn with_program(mut self, program: Guid) -> Self {
        self.program = Some(program);
        self
    }

    /// Sets the render target.
    pub fn with_frame_buffer(mut self, frame_buffer: Guid) -> Self {
        self.frame_buffer = Some(frame_buffer);
        self
    }

    /// Binds `texture` at `slot`, replacing whatever was there.
    pub fn with_texture(mut self, slot: u32, texture: Guid) -> Self {
        self.textures.insert(slot, texture);
        self
    }

    /// A draw needs both a geometry and a shader program.
    pub fn is_valid(&self) -> bool {
        self.geometry.is_some() && self.program.is_some()
    }

    /// Forgets every resource.
    pub fn clear(&mut self) {
        self.geometry = None;
        self.program = None;
        self.frame_buffer = None;
        self.textures.clear();
    }

    /// Attaches, in order, the frame buffer, the geometry, the program and each
    /// texture at its slot.
    ///
    /// Every id is resolved before anything is issued, so an invalid state or a
    /// missing resource leaves the backend untouched.
    pub(crate) fn bind(
        &self,
        registry: &ResourceRegistry<RhiResource>,
        backend: &mut dyn GraphicsBackend,
    ) -> Result<(), ResourceError> {
        let resolved = self.resolve(registry)?;
        if let Some(frame_buffer) = resolved.frame_buffer {
            frame_buffer.bind(backend);
        }
        resolved.geometry.bind(backend);
        resolved.program.bind(backend);
        for (slot, texture) in &resolved.textures {
            texture.bind_at(backend, *slot);
        }
        Ok(())
    }

    /// Detaches the geometry, the program, each texture and finally the frame buffer.
    pub(crate) fn unbind(
        &self,
        registry: &ResourceRegistry<RhiResource>,
        backend: &mut dyn GraphicsBackend,
    ) -> Result<(), ResourceError> {
        let resolved = self.resolve(registry)?;
        resolved.geometry.unbind(backend);
        resolved.program.unbind(backend);
        for (slot, texture) in &resolved.textures {
            texture.unbind_at(backend, *slot);
        }
        if let Some(frame_buffer) = resolved.frame_buffer {
            frame_buffer.unbind(backend);
        }
        Ok(())
    }

    fn resolve<'a>(
        &self,
        registry: &'a ResourceRegistry<RhiResource>,
    ) -> Result<Resolved<'a>, ResourceError> {
        let (Some(geometry), Some(program)) = (self.geometry, self.program) else {
            return Err(ResourceError::IncompleteBinding);
        };
        let lookup = |id: Guid| registry.get(&id).ok_or(ResourceError::NotFound(id));

        let frame_buffer = match self.frame_buffer {
            Some(id) => Some(lookup(id)?.as_frame_buffer(id)?),
            None => None,
        };
        let textures = self
            .textures
            .iter()
            .map(|(slot, id)| Ok((*slot, lookup(*id)?.as_texture(*id)?)))
            .collect::<Result<Vec<_>, ResourceError>>()?;

        Ok(Resolved {
            frame_buffer,
            geometry: lookup(geometry)?.as_geometry(geometry)?,
            program: lookup(program)?.as_shader_program(program)?,
            textures,
        })
    }
}

struct Resolved<'a> {
    frame_buffer: Option<&'a FrameBuffer>,
    geometry: &'a Geometry,
    program: &'a ShaderProgram,
    textures: Vec<(u32, &'a Texture)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity_needs_geometry_and_program() {
        let state = BindingState::new().with_geometry(Guid::new());
        assert!(!state.is_valid());
        let state = state.with_program(Guid::new());
        assert!(state.is_valid());
    }

    #[test]
    fn clear_empties_everything() {
        let mut state = BindingState::new()
            .with_geometry(Guid::new())
            .with_program(Guid::new())
            .with_frame_buffer(Guid::new())
            .with_texture(0, Guid::new());
        state.clear();
        assert_eq!(state, BindingState::default());
    }

    #[test]
    fn textures_keep_one_per_slot() {
        let (a, b) = (Guid::new(), Guid::new());
        let state = BindingState::new().with_texture(2, a).with_texture(2, b);
        assert_eq!(state.textures.len(), 1);
        assert_eq!(state.textures[&2], b);
    }
}
