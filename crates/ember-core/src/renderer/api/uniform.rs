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

//! Uniform values and the shared cells programs read them from.
//!
//! A shader program never copies uniform values. It holds clones of the caller's
//! [`SharedUniform`] cells and reads whatever they contain each time uniforms are
//! pushed, so animating a value is a matter of writing to the cell.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// The semantic type of a scalar uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    /// `int`
    Int,
    /// `uint`
    UInt,
    /// `bool`
    Bool,
    /// `float`
    Float,
    /// `vec2`
    Vec2,
    /// `vec3`
    Vec3,
    /// `vec4`
    Vec4,
    /// `mat3`, column-major.
    Mat3,
    /// `mat4`, column-major.
    Mat4,
    /// A sampler bound to a texture unit.
    Sampler,
}

/// A scalar uniform value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// `int`
    Int(i32),
    /// `uint`
    UInt(u32),
    /// `bool`
    Bool(bool),
    /// `float`
    Float(f32),
    /// `vec2`
    Vec2([f32; 2]),
    /// `vec3`
    Vec3([f32; 3]),
    /// `vec4`
    Vec4([f32; 4]),
    /// `mat3`, column-major.
    Mat3([f32; 9]),
    /// `mat4`, column-major.
    Mat4([f32; 16]),
    /// Texture unit index.
    Sampler(i32),
}

impl UniformValue {
    /// The type tag of this value.
    pub fn uniform_type(&self) -> UniformType {
        match self {
            UniformValue::Int(_) => UniformType::Int,
            UniformValue::UInt(_) => UniformType::UInt,
            UniformValue::Bool(_) => UniformType::Bool,
            UniformValue::Float(_) => UniformType::Float,
            UniformValue::Vec2(_) => UniformType::Vec2,
            UniformValue::Vec3(_) => UniformType::Vec3,
            UniformValue::Vec4(_) => UniformType::Vec4,
            UniformValue::Mat3(_) => UniformType::Mat3,
            UniformValue::Mat4(_) => UniformType::Mat4,
            UniformValue::Sampler(_) => UniformType::Sampler,
        }
    }
}

/// The semantic type of an array uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformArrayType {
    /// `int[]`
    Int,
    /// `float[]`
    Float,
    /// `vec2[]`
    Vec2,
    /// `vec3[]`
    Vec3,
    /// `vec4[]`
    Vec4,
    /// `mat4[]`
    Mat4,
}

/// An array uniform value.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformArray {
    /// `int[]`
    Int(Vec<i32>),
    /// `float[]`
    Float(Vec<f32>),
    /// `vec2[]`
    Vec2(Vec<[f32; 2]>),
    /// `vec3[]`
    Vec3(Vec<[f32; 3]>),
    /// `vec4[]`
    Vec4(Vec<[f32; 4]>),
    /// `mat4[]`
    Mat4(Vec<[f32; 16]>),
}

impl UniformArray {
    /// The type tag of this array.
    pub fn array_type(&self) -> UniformArrayType {
        match self {
            UniformArray::Int(_) => UniformArrayType::Int,
            UniformArray::Float(_) => UniformArrayType::Float,
            UniformArray::Vec2(_) => UniformArrayType::Vec2,
            UniformArray::Vec3(_) => UniformArrayType::Vec3,
            UniformArray::Vec4(_) => UniformArrayType::Vec4,
            UniformArray::Mat4(_) => UniformArrayType::Mat4,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            UniformArray::Int(v) => v.len(),
            UniformArray::Float(v) => v.len(),
            UniformArray::Vec2(v) => v.len(),
            UniformArray::Vec3(v) => v.len(),
            UniformArray::Vec4(v) => v.len(),
            UniformArray::Mat4(v) => v.len(),
        }
    }

    /// Returns `true` if the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// An empty array of the given type.
    pub fn empty(array_type: UniformArrayType) -> Self {
        match array_type {
            UniformArrayType::Int => UniformArray::Int(Vec::new()),
            UniformArrayType::Float => UniformArray::Float(Vec::new()),
            UniformArrayType::Vec2 => UniformArray::Vec2(Vec::new()),
            UniformArrayType::Vec3 => UniformArray::Vec3(Vec::new()),
            UniformArrayType::Vec4 => UniformArray::Vec4(Vec::new()),
            UniformArrayType::Mat4 => UniformArray::Mat4(Vec::new()),
        }
    }
}

/// A caller-owned scalar uniform cell with a fixed type tag.
///
/// Cloning shares the cell. Writes of a different type are rejected with a warning
/// so a program never sees a value of the wrong type under a known name.
#[derive(Debug, Clone)]
pub struct SharedUniform {
    ty: UniformType,
    value: Rc<RefCell<UniformValue>>,
}

impl SharedUniform {
    /// Creates a cell typed after `value`.
    pub fn new(value: UniformValue) -> Self {
        Self {
            ty: value.uniform_type(),
            value: Rc::new(RefCell::new(value)),
        }
    }

    /// The type fixed at creation.
    pub fn uniform_type(&self) -> UniformType {
        self.ty
    }

    /// The current value.
    pub fn get(&self) -> UniformValue {
        *self.value.borrow()
    }

    /// Stores `value` if it has the cell's type. Returns whether it was stored.
    pub fn set(&self, value: UniformValue) -> bool {
        if value.uniform_type() != self.ty {
            log::warn!(
                "Ignoring {:?} write to a {:?} uniform",
                value.uniform_type(),
                self.ty
            );
            return false;
        }
        *self.value.borrow_mut() = value;
        true
    }

    /// Returns `true` if both handles share one cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.value, &other.value)
    }
}

/// A caller-owned array uniform cell with a fixed type tag.
#[derive(Debug, Clone)]
pub struct SharedUniformArray {
    ty: UniformArrayType,
    values: Rc<RefCell<UniformArray>>,
}

impl SharedUniformArray {
    /// Creates a cell typed after `values`.
    pub fn new(values: UniformArray) -> Self {
        Self {
            ty: values.array_type(),
            values: Rc::new(RefCell::new(values)),
        }
    }

    /// The type fixed at creation.
    pub fn array_type(&self) -> UniformArrayType {
        self.ty
    }

    /// A copy of the current elements.
    pub fn get(&self) -> UniformArray {
        self.values.borrow().clone()
    }

    /// Runs `f` with the current elements without copying them.
    pub fn with<T>(&self, f: impl FnOnce(&UniformArray) -> T) -> T {
        f(&self.values.borrow())
    }

    /// Stores `values` if they have the cell's type. Returns whether they were stored.
    pub fn set(&self, values: UniformArray) -> bool {
        if values.array_type() != self.ty {
            log::warn!(
                "Ignoring {:?} write to a {:?} uniform array",
                values.array_type(),
                self.ty
            );
            return false;
        }
        *self.values.borrow_mut() = values;
        true
    }
}

/// Scalar uniform table, keyed by the uniform's name in the shader.
pub type UniformMap = BTreeMap<String, SharedUniform>;

/// Array uniform table, keyed by the uniform's name in the shader.
pub type UniformArrayMap = BTreeMap<String, SharedUniformArray>;

/// Both uniform tables of a program or material.
#[derive(Debug, Clone, Default)]
pub struct UniformSet {
    /// Scalar entries.
    pub scalars: UniformMap,
    /// Array entries.
    pub arrays: UniformArrayMap,
}

impl UniformSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a scalar entry and returns its cell.
    pub fn scalar(&mut self, name: impl Into<String>, value: UniformValue) -> SharedUniform {
        let cell = SharedUniform::new(value);
        self.scalars.insert(name.into(), cell.clone());
        cell
    }

    /// Adds (or replaces) an array entry and returns its cell.
    pub fn array(&mut self, name: impl Into<String>, values: UniformArray) -> SharedUniformArray {
        let cell = SharedUniformArray::new(values);
        self.arrays.insert(name.into(), cell.clone());
        cell
    }

    /// Adds every entry of `other`, sharing its cells. Entries of `other` win on
    /// name clashes.
    pub fn extend_from(&mut self, other: &UniformSet) {
        self.scalars
            .extend(other.scalars.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.arrays
            .extend(other.arrays.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_cell() {
        let a = SharedUniform::new(UniformValue::Float(1.0));
        let b = a.clone();
        assert!(a.set(UniformValue::Float(2.5)));
        assert_eq!(b.get(), UniformValue::Float(2.5));
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn write_of_other_type_is_ignored() {
        let cell = SharedUniform::new(UniformValue::Vec3([0.0; 3]));
        assert!(!cell.set(UniformValue::Float(1.0)));
        assert_eq!(cell.get(), UniformValue::Vec3([0.0; 3]));
    }

    #[test]
    fn array_cell_keeps_type() {
        let cell = SharedUniformArray::new(UniformArray::empty(UniformArrayType::Vec3));
        assert!(cell.set(UniformArray::Vec3(vec![[1.0, 2.0, 3.0]])));
        assert!(!cell.set(UniformArray::Float(vec![1.0])));
        assert_eq!(cell.with(UniformArray::len), 1);
    }

    #[test]
    fn extend_shares_cells() {
        let mut engine = UniformSet::new();
        let model = engine.scalar("u_model", UniformValue::Mat4([0.0; 16]));
        let mut material = UniformSet::new();
        material.scalar("u_color", UniformValue::Vec4([1.0; 4]));
        material.extend_from(&engine);
        assert_eq!(material.scalars.len(), 2);
        assert!(material.scalars["u_model"].ptr_eq(&model));
    }
}
