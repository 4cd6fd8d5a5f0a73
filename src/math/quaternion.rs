//! Quaternion rotation.

use super::{Euler, EulerOrder, Matrix4, Vector3};
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::ops::{Mul, MulAssign};

/// A rotation quaternion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct Quaternion {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
    /// W (scalar) component.
    pub w: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quaternion {
    /// Identity rotation.
    pub const IDENTITY: Self = Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    /// Create a new quaternion.
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Set the components.
    #[inline]
    pub fn set(&mut self, x: f32, y: f32, z: f32, w: f32) -> &mut Self {
        self.x = x;
        self.y = y;
        self.z = z;
        self.w = w;
        self
    }

    /// Copy from another quaternion.
    #[inline]
    pub fn copy(&mut self, q: &Quaternion) -> &mut Self {
        *self = *q;
        self
    }

    /// Build from Euler angles, honoring the Euler's rotation order.
    pub fn from_euler(euler: &Euler) -> Self {
        let c1 = (euler.x / 2.0).cos();
        let c2 = (euler.y / 2.0).cos();
        let c3 = (euler.z / 2.0).cos();
        let s1 = (euler.x / 2.0).sin();
        let s2 = (euler.y / 2.0).sin();
        let s3 = (euler.z / 2.0).sin();

        match euler.order {
            EulerOrder::Xyz => Self {
                x: s1 * c2 * c3 + c1 * s2 * s3,
                y: c1 * s2 * c3 - s1 * c2 * s3,
                z: c1 * c2 * s3 + s1 * s2 * c3,
                w: c1 * c2 * c3 - s1 * s2 * s3,
            },
            EulerOrder::Yxz => Self {
                x: s1 * c2 * c3 + c1 * s2 * s3,
                y: c1 * s2 * c3 - s1 * c2 * s3,
                z: c1 * c2 * s3 - s1 * s2 * c3,
                w: c1 * c2 * c3 + s1 * s2 * s3,
            },
            EulerOrder::Zxy => Self {
                x: s1 * c2 * c3 - c1 * s2 * s3,
                y: c1 * s2 * c3 + s1 * c2 * s3,
                z: c1 * c2 * s3 + s1 * s2 * c3,
                w: c1 * c2 * c3 - s1 * s2 * s3,
            },
            EulerOrder::Zyx => Self {
                x: s1 * c2 * c3 - c1 * s2 * s3,
                y: c1 * s2 * c3 + s1 * c2 * s3,
                z: c1 * c2 * s3 - s1 * s2 * c3,
                w: c1 * c2 * c3 + s1 * s2 * s3,
            },
            EulerOrder::Yzx => Self {
                x: s1 * c2 * c3 + c1 * s2 * s3,
                y: c1 * s2 * c3 + s1 * c2 * s3,
                z: c1 * c2 * s3 - s1 * s2 * c3,
                w: c1 * c2 * c3 - s1 * s2 * s3,
            },
            EulerOrder::Xzy => Self {
                x: s1 * c2 * c3 - c1 * s2 * s3,
                y: c1 * s2 * c3 - s1 * c2 * s3,
                z: c1 * c2 * s3 + s1 * s2 * c3,
                w: c1 * c2 * c3 + s1 * s2 * s3,
            },
        }
    }

    /// Build from a normalized axis and an angle in radians.
    pub fn from_axis_angle(axis: &Vector3, angle: f32) -> Self {
        let half = angle / 2.0;
        let s = half.sin();
        Self {
            x: axis.x * s,
            y: axis.y * s,
            z: axis.z * s,
            w: half.cos(),
        }
    }

    /// Build from the elements of an unscaled rotation matrix
    /// (row-major argument order).
    #[allow(clippy::too_many_arguments)]
    pub fn from_rotation_matrix_elements(
        m11: f32, m12: f32, m13: f32,
        m21: f32, m22: f32, m23: f32,
        m31: f32, m32: f32, m33: f32,
    ) -> Self {
        let trace = m11 + m22 + m33;

        if trace > 0.0 {
            let s = 0.5 / (trace + 1.0).sqrt();
            Self {
                w: 0.25 / s,
                x: (m32 - m23) * s,
                y: (m13 - m31) * s,
                z: (m21 - m12) * s,
            }
        } else if m11 > m22 && m11 > m33 {
            let s = 2.0 * (1.0 + m11 - m22 - m33).sqrt();
            Self {
                w: (m32 - m23) / s,
                x: 0.25 * s,
                y: (m12 + m21) / s,
                z: (m13 + m31) / s,
            }
        } else if m22 > m33 {
            let s = 2.0 * (1.0 + m22 - m11 - m33).sqrt();
            Self {
                w: (m13 - m31) / s,
                x: (m12 + m21) / s,
                y: 0.25 * s,
                z: (m23 + m32) / s,
            }
        } else {
            let s = 2.0 * (1.0 + m33 - m11 - m22).sqrt();
            Self {
                w: (m21 - m12) / s,
                x: (m13 + m31) / s,
                y: (m23 + m32) / s,
                z: 0.25 * s,
            }
        }
    }

    /// Extract the rotation of a Matrix4, normalizing out scale.
    pub fn from_matrix4(m: &Matrix4) -> Self {
        let mut rotation = Matrix4::IDENTITY;
        rotation.extract_rotation(m);
        let e = &rotation.elements;
        Self::from_rotation_matrix_elements(
            e[0], e[4], e[8],
            e[1], e[5], e[9],
            e[2], e[6], e[10],
        )
    }

    /// Quaternion length.
    #[inline]
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    /// Normalize in place. A zero quaternion becomes identity.
    #[inline]
    pub fn normalize(&mut self) -> &mut Self {
        let len = self.length();
        if len > 0.0 {
            let inv = 1.0 / len;
            self.x *= inv;
            self.y *= inv;
            self.z *= inv;
            self.w *= inv;
        } else {
            *self = Self::IDENTITY;
        }
        self
    }

    /// Return a normalized copy.
    #[inline]
    pub fn normalized(&self) -> Self {
        let mut q = *self;
        q.normalize();
        q
    }

    /// Conjugate.
    #[inline]
    pub fn conjugate(&self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
            w: self.w,
        }
    }

    /// Inverse (conjugate of the normalized quaternion).
    #[inline]
    pub fn inverse(&self) -> Self {
        self.conjugate().normalized()
    }

    /// Dot product.
    #[inline]
    pub fn dot(&self, other: &Quaternion) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    /// Hamilton product `self * other`.
    pub fn multiply(&self, other: &Quaternion) -> Self {
        Self {
            x: self.x * other.w + self.w * other.x + self.y * other.z - self.z * other.y,
            y: self.y * other.w + self.w * other.y + self.z * other.x - self.x * other.z,
            z: self.z * other.w + self.w * other.z + self.x * other.y - self.y * other.x,
            w: self.w * other.w - self.x * other.x - self.y * other.y - self.z * other.z,
        }
    }

    /// Spherical linear interpolation along the shorter arc.
    pub fn slerp(&self, other: &Quaternion, t: f32) -> Self {
        if t == 0.0 {
            return *self;
        }
        if t == 1.0 {
            return *other;
        }

        let mut cos_half_theta = self.dot(other);
        let mut other = *other;

        if cos_half_theta < 0.0 {
            other = Self::new(-other.x, -other.y, -other.z, -other.w);
            cos_half_theta = -cos_half_theta;
        }

        if cos_half_theta >= 1.0 {
            return *self;
        }

        let half_theta = cos_half_theta.acos();
        let sin_half_theta = (1.0 - cos_half_theta * cos_half_theta).sqrt();

        if sin_half_theta.abs() < 0.001 {
            return Self {
                x: (self.x + other.x) * 0.5,
                y: (self.y + other.y) * 0.5,
                z: (self.z + other.z) * 0.5,
                w: (self.w + other.w) * 0.5,
            };
        }

        let ratio_a = ((1.0 - t) * half_theta).sin() / sin_half_theta;
        let ratio_b = (t * half_theta).sin() / sin_half_theta;

        Self {
            x: self.x * ratio_a + other.x * ratio_b,
            y: self.y * ratio_a + other.y * ratio_b,
            z: self.z * ratio_a + other.z * ratio_b,
            w: self.w * ratio_a + other.w * ratio_b,
        }
    }

    /// Rotate a vector by this quaternion.
    #[inline]
    pub fn rotate_vector(&self, v: &Vector3) -> Vector3 {
        v.apply_quaternion(self)
    }

    /// Approximate equality within an epsilon.
    #[inline]
    pub fn approx_eq(&self, other: &Quaternion, epsilon: f32) -> bool {
        (self.x - other.x).abs() < epsilon
            && (self.y - other.y).abs() < epsilon
            && (self.z - other.z).abs() < epsilon
            && (self.w - other.w).abs() < epsilon
    }
}

impl Mul for Quaternion {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        self.multiply(&rhs)
    }
}

impl MulAssign for Quaternion {
    fn mul_assign(&mut self, rhs: Self) {
        *self = self.multiply(&rhs);
    }
}

impl Mul<Vector3> for Quaternion {
    type Output = Vector3;
    fn mul(self, rhs: Vector3) -> Vector3 {
        self.rotate_vector(&rhs)
    }
}

impl From<glam::Quat> for Quaternion {
    fn from(q: glam::Quat) -> Self {
        Self { x: q.x, y: q.y, z: q.z, w: q.w }
    }
}

impl From<Quaternion> for glam::Quat {
    fn from(q: Quaternion) -> Self {
        glam::Quat::from_xyzw(q.x, q.y, q.z, q.w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_rotation() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        assert!(Quaternion::IDENTITY.rotate_vector(&v).approx_eq(&v, 1e-6));
    }

    #[test]
    fn test_axis_angle_half_turn() {
        let q = Quaternion::from_axis_angle(&Vector3::UNIT_Y, std::f32::consts::PI);
        let r = q.rotate_vector(&Vector3::UNIT_X);
        assert!(r.approx_eq(&-Vector3::UNIT_X, 1e-5));
    }

    #[test]
    fn test_slerp_endpoints() {
        let a = Quaternion::from_axis_angle(&Vector3::UNIT_Z, 0.2);
        let b = Quaternion::from_axis_angle(&Vector3::UNIT_Z, 1.4);
        assert!(a.slerp(&b, 0.0).approx_eq(&a, 1e-6));
        assert!(a.slerp(&b, 1.0).approx_eq(&b, 1e-6));
        let mid = a.slerp(&b, 0.5);
        let expected = Quaternion::from_axis_angle(&Vector3::UNIT_Z, 0.8);
        assert!(mid.approx_eq(&expected, 1e-5));
    }

    #[test]
    fn test_matrix_roundtrip() {
        let q = Quaternion::from_axis_angle(&Vector3::new(0.0, 1.0, 0.0), 0.7);
        let m = Matrix4::from_quaternion(&q);
        let q2 = Quaternion::from_matrix4(&m);
        assert!(q.approx_eq(&q2, 1e-5) || q.approx_eq(&Quaternion::new(-q2.x, -q2.y, -q2.z, -q2.w), 1e-5));
    }
}
