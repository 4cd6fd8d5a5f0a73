//! 3x3 matrix, primarily the normal matrix for shading.

use super::Matrix4;
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// A 3x3 matrix stored in column-major order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct Matrix3 {
    /// Matrix elements in column-major order.
    pub elements: [f32; 9],
}

impl Default for Matrix3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix3 {
    /// Identity matrix.
    pub const IDENTITY: Self = Self {
        elements: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
    };

    /// Create from a column-major array.
    #[inline]
    pub const fn from_cols_array(elements: [f32; 9]) -> Self {
        Self { elements }
    }

    /// Copy the upper-left 3x3 of a Matrix4.
    pub fn from_matrix4(m: &Matrix4) -> Self {
        let e = &m.elements;
        Self {
            elements: [e[0], e[1], e[2], e[4], e[5], e[6], e[8], e[9], e[10]],
        }
    }

    /// Invert in place. A singular matrix becomes identity.
    pub fn invert(&mut self) -> &mut Self {
        let e = self.elements;

        let a00 = e[0];
        let a10 = e[1];
        let a20 = e[2];
        let a01 = e[3];
        let a11 = e[4];
        let a21 = e[5];
        let a02 = e[6];
        let a12 = e[7];
        let a22 = e[8];

        let b01 = a22 * a11 - a12 * a21;
        let b11 = -a22 * a10 + a12 * a20;
        let b21 = a21 * a10 - a11 * a20;

        let det = a00 * b01 + a01 * b11 + a02 * b21;

        if det == 0.0 {
            *self = Self::IDENTITY;
            return self;
        }

        let inv = 1.0 / det;

        self.elements = [
            b01 * inv,
            b11 * inv,
            b21 * inv,
            (-a22 * a01 + a02 * a21) * inv,
            (a22 * a00 - a02 * a20) * inv,
            (-a21 * a00 + a01 * a20) * inv,
            (a12 * a01 - a02 * a11) * inv,
            (-a12 * a00 + a02 * a10) * inv,
            (a11 * a00 - a01 * a10) * inv,
        ];

        self
    }

    /// Transpose in place.
    pub fn transpose(&mut self) -> &mut Self {
        self.elements.swap(1, 3);
        self.elements.swap(2, 6);
        self.elements.swap(5, 7);
        self
    }

    /// The normal matrix: inverse transpose of the upper-left 3x3 of a
    /// model-view matrix.
    pub fn normal_matrix(model_view: &Matrix4) -> Self {
        let mut m = Self::from_matrix4(model_view);
        m.invert();
        m.transpose();
        m
    }

    /// Approximate equality within an epsilon.
    pub fn approx_eq(&self, other: &Matrix3, epsilon: f32) -> bool {
        self.elements
            .iter()
            .zip(other.elements.iter())
            .all(|(a, b)| (a - b).abs() < epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector3;

    #[test]
    fn test_normal_matrix_of_rotation_is_rotation() {
        let m = Matrix4::from_rotation_y(0.7);
        let n = Matrix3::normal_matrix(&m);
        let r = Matrix3::from_matrix4(&m);
        assert!(n.approx_eq(&r, 1e-5));
    }

    #[test]
    fn test_normal_matrix_undoes_scale() {
        let m = Matrix4::from_scale(&Vector3::new(2.0, 2.0, 2.0));
        let n = Matrix3::normal_matrix(&m);
        let v = Vector3::UNIT_X.apply_matrix3(&n);
        assert!((v.x - 0.5).abs() < 1e-6);
    }
}
