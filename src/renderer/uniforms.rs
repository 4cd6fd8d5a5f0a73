//! Uniform values and their upload dispatch.

use super::gl::{GlDevice, UniformLocation};
use crate::math::{Color, Matrix3, Matrix4, Vector2, Vector3, Vector4};
use crate::texture::TextureRef;

/// A uniform value of any supported GLSL kind.
#[derive(Debug, Clone)]
pub enum UniformValue {
    /// `int` (also booleans).
    Int(i32),
    /// `float`.
    Float(f32),
    /// `vec2`.
    Vec2(Vector2),
    /// `vec3`.
    Vec3(Vector3),
    /// `vec4`.
    Vec4(Vector4),
    /// `vec3` from a color.
    Color(Color),
    /// `mat3`.
    Matrix3(Matrix3),
    /// `mat4`.
    Matrix4(Matrix4),
    /// `float[]`.
    FloatArray(Vec<f32>),
    /// `int[]`.
    IntArray(Vec<i32>),
    /// flattened `vec3[]`.
    Vec3Array(Vec<f32>),
    /// `mat4[]`, flattened column-major.
    Matrix4Array(Vec<f32>),
    /// `sampler2D` / `samplerCube`; the renderer allocates the unit.
    Texture(Option<TextureRef>),
}

impl UniformValue {
    /// Upload to a location. Texture uniforms are handled by the
    /// renderer's unit allocator instead.
    pub fn upload(&self, device: &mut impl GlDevice, location: UniformLocation) {
        match self {
            UniformValue::Int(v) => device.uniform1i(location, *v),
            UniformValue::Float(v) => device.uniform1f(location, *v),
            UniformValue::Vec2(v) => device.uniform2f(location, v.x, v.y),
            UniformValue::Vec3(v) => device.uniform3f(location, v.x, v.y, v.z),
            UniformValue::Vec4(v) => device.uniform4f(location, v.x, v.y, v.z, v.w),
            UniformValue::Color(c) => device.uniform3f(location, c.r, c.g, c.b),
            UniformValue::Matrix3(m) => device.uniform_matrix3fv(location, &m.elements),
            UniformValue::Matrix4(m) => device.uniform_matrix4fv(location, &m.elements),
            UniformValue::FloatArray(v) => device.uniform1fv(location, v),
            UniformValue::IntArray(v) => device.uniform1iv(location, v),
            UniformValue::Vec3Array(v) => device.uniform3fv(location, v),
            UniformValue::Matrix4Array(v) => device.uniform_matrix4fv(location, v),
            UniformValue::Texture(_) => {}
        }
    }
}

/// An ordered name -> value map. Order matters for reproducible upload
/// sequences, so entries keep insertion order.
#[derive(Debug, Clone, Default)]
pub struct UniformMap {
    entries: Vec<(String, UniformValue)>,
}

impl UniformMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value.
    pub fn set(&mut self, name: impl Into<String>, value: UniformValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Look up a value.
    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Look up a value mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut UniformValue> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Merge another map's entries over this one.
    pub fn merge(&mut self, other: &UniformMap) {
        for (name, value) in other.iter() {
            self.set(name, value.clone());
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<const N: usize> From<[(&str, UniformValue); N]> for UniformMap {
    fn from(entries: [(&str, UniformValue); N]) -> Self {
        let mut map = Self::new();
        for (name, value) in entries {
            map.set(name, value);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_preserved() {
        let mut map = UniformMap::new();
        map.set("b", UniformValue::Float(1.0));
        map.set("a", UniformValue::Float(2.0));
        map.set("b", UniformValue::Float(3.0));

        let names: Vec<&str> = map.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(matches!(map.get("b"), Some(UniformValue::Float(v)) if *v == 3.0));
    }
}
