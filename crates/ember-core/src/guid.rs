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

//! Process-unique resource identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A process-unique identifier keying resources in the registry and the device cache.
///
/// Fresh identifiers are random (version 4). Identifiers for resources that belong to
/// a logical CPU-side object (the buffers of a mesh, the shader stages of a material)
/// are derived with [`Guid::derive`], so repeated per-frame traversal resolves to the
/// same key every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Guid(Uuid);

impl Guid {
    /// Creates a new, random `Guid`.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The nil identifier. Never handed out by [`Guid::new`].
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Derives a stable child identifier from this one and a name (version 5 UUID).
    ///
    /// The same parent and name always produce the same child.
    pub fn derive(&self, name: &str) -> Self {
        Self(Uuid::new_v5(&self.0, name.as_bytes()))
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for Guid {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for Guid {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_are_unique() {
        assert_ne!(Guid::new(), Guid::new());
        assert_ne!(Guid::new(), Guid::nil());
    }

    #[test]
    fn derived_ids_are_stable() {
        let parent = Guid::new();
        assert_eq!(parent.derive("indices"), parent.derive("indices"));
        assert_ne!(parent.derive("indices"), parent.derive("attr0"));
        assert_ne!(parent.derive("indices"), Guid::new().derive("indices"));
    }
}
