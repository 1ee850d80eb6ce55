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

//! The scene-side contracts the renderer consumes.
//!
//! A scene is an arena of nodes addressed by [`NodeId`]. Materials live in a second
//! arena addressed by [`MaterialId`]; meshes refer to them by index, so nothing in
//! the scene holds shared ownership of anything else.

mod camera;
mod graph;
mod light;
mod material;
mod mesh;

pub use self::camera::Camera;
pub use self::graph::{MaterialId, Node, NodeId, NodeKind, Scene, SceneGraph};
pub use self::light::{Light, LightKind};
pub use self::material::{
    InstanceTransforms, Instanced, InstancedMaterial, Material, MaterialTexture, StandardMaterial,
    TextureImage, TexturePixels, INSTANCED_VERTEX_SHADER, UNLIT_FRAGMENT_SHADER,
    UNLIT_VERTEX_SHADER,
};
pub use self::mesh::{Mesh, VertexStream};
