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

//! Compiled shader stages and linked programs.

use crate::guid::Guid;
use crate::renderer::api::{GpuHandle, ShaderStage, UniformArrayMap, UniformLocation, UniformMap};
use crate::renderer::error::{ResourceError, ShaderError};
use crate::renderer::traits::{Bindable, GraphicsBackend};
use std::collections::BTreeMap;

/// One compiled shader stage.
///
/// A stage that fails to compile is still returned so the failure can be inspected;
/// its GPU object is released immediately and [`ShaderCode::is_compiled`] is `false`.
#[derive(Debug)]
pub struct ShaderCode {
    stage: ShaderStage,
    handle: GpuHandle,
    error: Option<ShaderError>,
}

impl ShaderCode {
    /// Compiles `source` for `stage`.
    pub fn new(
        backend: &mut dyn GraphicsBackend,
        stage: ShaderStage,
        source: &str,
    ) -> Result<Self, ResourceError> {
        let handle = backend.create_shader(stage)?;
        match backend.compile_shader(handle, source) {
            Ok(()) => {
                log::debug!("Compiled {:?} shader {:?}", stage, handle);
                Ok(Self {
                    stage,
                    handle,
                    error: None,
                })
            }
            Err(log) => {
                log::error!("{:?} shader failed to compile: {}", stage, log);
                backend.delete_shader(handle);
                Ok(Self {
                    stage,
                    handle: GpuHandle::NONE,
                    error: Some(ShaderError::CompilationFailed { stage, log }),
                })
            }
        }
    }

    /// The pipeline stage.
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// The backend object name, [`GpuHandle::NONE`] if compilation failed.
    pub fn handle(&self) -> GpuHandle {
        self.handle
    }

    /// Whether the source compiled.
    pub fn is_compiled(&self) -> bool {
        self.error.is_none()
    }

    /// The compilation failure, if any.
    pub fn error(&self) -> Option<&ShaderError> {
        self.error.as_ref()
    }

    pub(crate) fn release(&mut self, backend: &mut dyn GraphicsBackend) {
        if !self.handle.is_none() {
            backend.delete_shader(self.handle);
            self.handle = GpuHandle::NONE;
        }
    }
}

/// A linked shader program and the uniform tables it reads.
///
/// The tables hold shared cells owned by the caller. Entries the linked program does
/// not expose are kept but never pushed.
#[derive(Debug)]
pub struct ShaderProgram {
    handle: GpuHandle,
    stages: BTreeMap<ShaderStage, Guid>,
    uniforms: UniformMap,
    arrays: UniformArrayMap,
    locations: BTreeMap<String, UniformLocation>,
    error: Option<ShaderError>,
}

impl ShaderProgram {
    /// Attaches every stage, links, resolves uniform locations and pushes both tables.
    ///
    /// A stage that did not compile or a failed link yields a program with a null
    /// handle: attached stages are detached and the program object is deleted.
    pub fn new(
        backend: &mut dyn GraphicsBackend,
        stages: &[(Guid, &ShaderCode)],
        uniforms: UniformMap,
        arrays: UniformArrayMap,
    ) -> Result<Self, ResourceError> {
        let mut program = Self {
            handle: GpuHandle::NONE,
            stages: stages.iter().map(|(id, code)| (code.stage(), *id)).collect(),
            uniforms,
            arrays,
            locations: BTreeMap::new(),
            error: None,
        };

        let handle = backend.create_program()?;
        let mut attached = Vec::with_capacity(stages.len());
        for (_, code) in stages {
            if let Some(err) = code.error() {
                log::error!("Shader program aborted: {err}");
                abort(backend, handle, &attached);
                program.error = Some(err.clone());
                return Ok(program);
            }
            backend.attach_shader(handle, code.handle());
            attached.push(code.handle());
        }

        if let Err(log) = backend.link_program(handle) {
            log::error!("Shader program failed to link: {log}");
            abort(backend, handle, &attached);
            program.error = Some(ShaderError::LinkFailed { log });
            return Ok(program);
        }

        program.handle = handle;
        program.resolve_locations(backend);
        program.update_uniforms(backend);
        backend.use_program(GpuHandle::NONE);
        log::debug!(
            "Linked shader program {:?} ({} stage(s), {} active uniform(s))",
            handle,
            program.stages.len(),
            program.locations.len()
        );
        Ok(program)
    }

    fn resolve_locations(&mut self, backend: &mut dyn GraphicsBackend) {
        self.locations.clear();
        let names = self.uniforms.keys().chain(self.arrays.keys());
        for name in names {
            match backend.uniform_location(self.handle, name) {
                Some(location) => {
                    self.locations.insert(name.clone(), location);
                }
                None => log::trace!("Uniform `{name}` is not active in {:?}", self.handle),
            }
        }
    }

    /// The backend object name, [`GpuHandle::NONE`] if the build failed.
    pub fn handle(&self) -> GpuHandle {
        self.handle
    }

    /// Stage → shader code id.
    pub fn stages(&self) -> &BTreeMap<ShaderStage, Guid> {
        &self.stages
    }

    /// Whether the program linked.
    pub fn is_linked(&self) -> bool {
        self.error.is_none() && !self.handle.is_none()
    }

    /// The outcome of the build: `Ok` if linked, else the compile or link failure.
    pub fn link_status(&self) -> Result<(), &ShaderError> {
        match &self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// The scalar uniform table.
    pub fn uniforms(&self) -> &UniformMap {
        &self.uniforms
    }

    /// The array uniform table.
    pub fn uniform_arrays(&self) -> &UniformArrayMap {
        &self.arrays
    }

    /// Returns `true` if the linked program exposes `name`.
    pub fn has_uniform(&self, name: &str) -> bool {
        self.locations.contains_key(name)
    }

    /// Replaces both tables, re-resolves locations and pushes the new values.
    pub fn set_uniforms(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        uniforms: UniformMap,
        arrays: UniformArrayMap,
    ) {
        self.uniforms = uniforms;
        self.arrays = arrays;
        if self.is_linked() {
            self.resolve_locations(backend);
            self.update_uniforms(backend);
        }
    }

    /// Makes the program current and pushes the current value of every active entry.
    ///
    /// Entries the program does not expose are skipped silently. Does nothing on a
    /// program whose build failed.
    pub fn update_uniforms(&self, backend: &mut dyn GraphicsBackend) {
        if !self.is_linked() {
            return;
        }
        backend.use_program(self.handle);
        for (name, cell) in &self.uniforms {
            if let Some(location) = self.locations.get(name) {
                backend.set_uniform(*location, &cell.get());
            }
        }
        for (name, cell) in &self.arrays {
            if let Some(location) = self.locations.get(name) {
                cell.with(|values| {
                    if !values.is_empty() {
                        backend.set_uniform_array(*location, values);
                    }
                });
            }
        }
    }

    pub(crate) fn release(&mut self, backend: &mut dyn GraphicsBackend) {
        if !self.handle.is_none() {
            backend.delete_program(self.handle);
            self.handle = GpuHandle::NONE;
        }
    }
}

fn abort(backend: &mut dyn GraphicsBackend, program: GpuHandle, attached: &[GpuHandle]) {
    for shader in attached {
        backend.detach_shader(program, *shader);
    }
    backend.delete_program(program);
}

impl Bindable for ShaderProgram {
    fn bind(&self, backend: &mut dyn GraphicsBackend) {
        if self.is_linked() {
            backend.use_program(self.handle);
        }
    }

    fn unbind(&self, backend: &mut dyn GraphicsBackend) {
        if self.is_linked() {
            backend.use_program(GpuHandle::NONE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::{SharedUniform, UniformValue};
    use crate::renderer::headless::{GpuCommand, HeadlessBackend};

    const VERTEX: &str = "#version 330 core\n\
        layout(location = 0) in vec3 a_position;\n\
        uniform mat4 u_model;\n\
        void main() { gl_Position = u_model * vec4(a_position, 1.0); }\n";
    const FRAGMENT: &str = "#version 330 core\n\
        uniform vec4 u_color;\n\
        out vec4 color;\n\
        void main() { color = u_color; }\n";

    fn compile(backend: &mut HeadlessBackend) -> (ShaderCode, ShaderCode) {
        (
            ShaderCode::new(backend, ShaderStage::Vertex, VERTEX).unwrap(),
            ShaderCode::new(backend, ShaderStage::Fragment, FRAGMENT).unwrap(),
        )
    }

    #[test]
    fn build_pushes_uniforms_immediately() {
        let mut backend = HeadlessBackend::new();
        let (vs, fs) = compile(&mut backend);
        let color = SharedUniform::new(UniformValue::Vec4([1.0, 0.0, 0.0, 1.0]));
        let mut uniforms = UniformMap::new();
        uniforms.insert("u_color".into(), color);
        backend.clear_commands();

        let program = ShaderProgram::new(
            &mut backend,
            &[(Guid::new(), &vs), (Guid::new(), &fs)],
            uniforms,
            UniformArrayMap::new(),
        )
        .unwrap();

        assert!(program.is_linked());
        assert!(backend.commands().iter().any(|c| matches!(
            c,
            GpuCommand::SetUniform(_, UniformValue::Vec4([1.0, 0.0, 0.0, 1.0]))
        )));
    }

    #[test]
    fn missing_uniform_is_silently_skipped() {
        let mut backend = HeadlessBackend::new();
        let (vs, fs) = compile(&mut backend);
        let mut uniforms = UniformMap::new();
        uniforms.insert(
            "u_not_in_shader".into(),
            SharedUniform::new(UniformValue::Float(1.0)),
        );
        let program = ShaderProgram::new(
            &mut backend,
            &[(Guid::new(), &vs), (Guid::new(), &fs)],
            uniforms,
            UniformArrayMap::new(),
        )
        .unwrap();
        backend.clear_commands();

        program.update_uniforms(&mut backend);

        assert!(!program.has_uniform("u_not_in_shader"));
        assert_eq!(backend.commands(), &[GpuCommand::UseProgram(program.handle())]);
    }

    #[test]
    fn update_reflects_animated_values() {
        let mut backend = HeadlessBackend::new();
        let (vs, fs) = compile(&mut backend);
        let model = SharedUniform::new(UniformValue::Mat4([0.0; 16]));
        let mut uniforms = UniformMap::new();
        uniforms.insert("u_model".into(), model.clone());
        let program = ShaderProgram::new(
            &mut backend,
            &[(Guid::new(), &vs), (Guid::new(), &fs)],
            uniforms,
            UniformArrayMap::new(),
        )
        .unwrap();
        backend.clear_commands();

        let mut animated = [0.0; 16];
        animated[12] = 5.0;
        model.set(UniformValue::Mat4(animated));
        program.update_uniforms(&mut backend);

        assert!(backend
            .commands()
            .contains(&GpuCommand::SetUniform(
                backend.uniform_location_of(program.handle(), "u_model").unwrap(),
                UniformValue::Mat4(animated)
            )));
    }

    #[test]
    fn compile_failure_aborts_program_cleanly() {
        let mut backend = HeadlessBackend::new();
        let vs = ShaderCode::new(&mut backend, ShaderStage::Vertex, VERTEX).unwrap();
        let fs = ShaderCode::new(&mut backend, ShaderStage::Fragment, "void main() { oops").unwrap();
        assert!(!fs.is_compiled());
        assert!(fs.handle().is_none());

        let program = ShaderProgram::new(
            &mut backend,
            &[(Guid::new(), &vs), (Guid::new(), &fs)],
            UniformMap::new(),
            UniformArrayMap::new(),
        )
        .unwrap();

        assert!(!program.is_linked());
        assert!(program.handle().is_none());
        assert!(matches!(
            program.link_status(),
            Err(ShaderError::CompilationFailed {
                stage: ShaderStage::Fragment,
                ..
            })
        ));
        let cmds = backend.commands();
        assert!(cmds.iter().any(|c| matches!(c, GpuCommand::DetachShader(_, s) if *s == vs.handle())));
        assert!(cmds.iter().any(|c| matches!(c, GpuCommand::DeleteProgram(_))));
        assert_eq!(backend.live_programs(), 0);
    }

    #[test]
    fn failed_program_bind_is_a_no_op() {
        let mut backend = HeadlessBackend::new();
        let vs = ShaderCode::new(&mut backend, ShaderStage::Vertex, VERTEX).unwrap();
        let program = ShaderProgram::new(
            &mut backend,
            &[(Guid::new(), &vs)],
            UniformMap::new(),
            UniformArrayMap::new(),
        )
        .unwrap();
        assert!(matches!(program.link_status(), Err(ShaderError::LinkFailed { .. })));
        backend.clear_commands();

        program.bind(&mut backend);
        program.update_uniforms(&mut backend);
        program.unbind(&mut backend);
        assert!(backend.commands().is_empty());
    }
}
