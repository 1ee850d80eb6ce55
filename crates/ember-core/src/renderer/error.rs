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

//! Defines the hierarchy of error types for the rendering subsystem.

use crate::guid::Guid;
use crate::renderer::api::{GpuError, ResourceKind, ShaderStage};
use std::fmt;

/// An error related to the compilation or linking of shader code.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderError {
    /// A shader stage failed to compile.
    CompilationFailed {
        /// The stage that failed.
        stage: ShaderStage,
        /// The compiler's info log.
        log: String,
    },
    /// The program failed to link.
    LinkFailed {
        /// The linker's info log.
        log: String,
    },
    /// A stage referenced by a program is not a compiled shader code resource.
    MissingStage {
        /// The stage whose code could not be resolved.
        stage: ShaderStage,
        /// The identifier the program was given for that stage.
        id: Guid,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::CompilationFailed { stage, log } => {
                write!(f, "{stage:?} shader compilation failed: {log}")
            }
            ShaderError::LinkFailed { log } => write!(f, "Shader program link failed: {log}"),
            ShaderError::MissingStage { stage, id } => {
                write!(f, "{stage:?} stage {id} is not a compiled shader code resource")
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// An error related to the creation or use of an RHI resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceError {
    /// A shader-specific error occurred.
    Shader(ShaderError),
    /// No resource is registered under the identifier.
    NotFound(Guid),
    /// The identifier resolves to a resource of another kind.
    WrongKind {
        /// The identifier that was looked up.
        id: Guid,
        /// The kind the operation needed.
        expected: ResourceKind,
        /// The kind actually registered.
        found: ResourceKind,
    },
    /// An index or byte range lies outside the resource.
    OutOfBounds {
        /// What was indexed (e.g. "color attachment").
        what: &'static str,
        /// The requested index or end offset.
        index: usize,
        /// The number of valid entries or bytes.
        len: usize,
    },
    /// Supplied data does not match the size declared in a descriptor.
    InvalidSize {
        /// The size the descriptor declares.
        expected: usize,
        /// The size of the supplied data.
        actual: usize,
    },
    /// A descriptor is not usable for the requested operation.
    InvalidDescriptor(String),
    /// A draw or bind was attempted without a geometry and a shader program.
    IncompleteBinding,
    /// The backend failed to allocate or operate on a GPU object.
    BackendError(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Shader(err) => write!(f, "Shader resource error: {err}"),
            ResourceError::NotFound(id) => write!(f, "Resource not found with ID {id}."),
            ResourceError::WrongKind {
                id,
                expected,
                found,
            } => write!(f, "Resource {id} is a {found:?}, expected a {expected:?}."),
            ResourceError::OutOfBounds { what, index, len } => {
                write!(f, "{what} {index} out of bounds (length {len}).")
            }
            ResourceError::InvalidSize { expected, actual } => {
                write!(f, "Data size {actual} does not match declared size {expected}.")
            }
            ResourceError::InvalidDescriptor(msg) => write!(f, "Invalid descriptor: {msg}"),
            ResourceError::IncompleteBinding => write!(
                f,
                "Binding state requires both a geometry and a shader program."
            ),
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Shader(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShaderError> for ResourceError {
    fn from(err: ShaderError) -> Self {
        ResourceError::Shader(err)
    }
}

/// A high-level error raised by the device, the renderer or the frame protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// An error occurred while managing a GPU resource.
    ResourceError(ResourceError),
    /// The GPU reported an error. Unrecoverable: the frame loop must stop.
    Gpu(GpuError),
    /// A frame-protocol call was made out of order.
    FrameProtocol {
        /// The call that was made.
        call: &'static str,
        /// The call that was expected next.
        expected: &'static str,
    },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::ResourceError(err) => {
                write!(f, "Graphics resource operation failed: {err}")
            }
            RenderError::Gpu(err) => write!(f, "GPU error: {err:?}"),
            RenderError::FrameProtocol { call, expected } => {
                write!(f, "`{call}` called out of order, expected `{expected}`")
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::ResourceError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::ResourceError(err)
    }
}

impl From<ShaderError> for RenderError {
    fn from(err: ShaderError) -> Self {
        RenderError::ResourceError(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn shader_error_display() {
        let err = ShaderError::CompilationFailed {
            stage: ShaderStage::Fragment,
            log: "0:3: syntax error".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "Fragment shader compilation failed: 0:3: syntax error"
        );
    }

    #[test]
    fn render_error_wraps_shader_error() {
        let err: RenderError = ShaderError::LinkFailed {
            log: "missing main".to_string(),
        }
        .into();
        assert_eq!(
            format!("{err}"),
            "Graphics resource operation failed: Shader resource error: Shader program link failed: missing main"
        );
        assert!(err.source().is_some());
        assert!(err.source().and_then(|e| e.source()).is_some());
    }

    #[test]
    fn out_of_bounds_display() {
        let err = ResourceError::OutOfBounds {
            what: "color attachment",
            index: 2,
            len: 1,
        };
        assert_eq!(
            format!("{err}"),
            "color attachment 2 out of bounds (length 1)."
        );
    }
}
