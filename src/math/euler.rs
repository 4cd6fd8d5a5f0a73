//! Euler angles with an explicit rotation order.

use super::{Matrix4, Quaternion, Vector3};
use serde::{Deserialize, Serialize};

/// The order intrinsic axis rotations are applied in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EulerOrder {
    /// X, then Y, then Z.
    #[default]
    Xyz,
    /// Y, then X, then Z.
    Yxz,
    /// Z, then X, then Y.
    Zxy,
    /// Z, then Y, then X.
    Zyx,
    /// Y, then Z, then X.
    Yzx,
    /// X, then Z, then Y.
    Xzy,
}

/// Euler-angle rotation in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Euler {
    /// Rotation around X.
    pub x: f32,
    /// Rotation around Y.
    pub y: f32,
    /// Rotation around Z.
    pub z: f32,
    /// Rotation order.
    pub order: EulerOrder,
}

impl Euler {
    /// Zero rotation with the default order.
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        order: EulerOrder::Xyz,
    };

    /// Create new Euler angles.
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32, order: EulerOrder) -> Self {
        Self { x, y, z, order }
    }

    /// Create with the default XYZ order.
    #[inline]
    pub const fn xyz(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z, order: EulerOrder::Xyz }
    }

    /// Set all components and the order.
    #[inline]
    pub fn set(&mut self, x: f32, y: f32, z: f32, order: EulerOrder) -> &mut Self {
        self.x = x;
        self.y = y;
        self.z = z;
        self.order = order;
        self
    }

    /// Copy from another Euler.
    #[inline]
    pub fn copy(&mut self, e: &Euler) -> &mut Self {
        *self = *e;
        self
    }

    /// Extract Euler angles from an unscaled rotation matrix.
    #[allow(clippy::too_many_arguments)]
    pub fn from_rotation_matrix_elements(
        m11: f32, m12: f32, m13: f32,
        m21: f32, m22: f32, m23: f32,
        m31: f32, m32: f32, m33: f32,
        order: EulerOrder,
    ) -> Self {
        let clamp = |v: f32| v.clamp(-1.0, 1.0);

        match order {
            EulerOrder::Xyz => {
                let y = clamp(m13).asin();
                let (x, z) = if m13.abs() < 0.999_999_9 {
                    ((-m23).atan2(m33), (-m12).atan2(m11))
                } else {
                    (m32.atan2(m22), 0.0)
                };
                Self { x, y, z, order }
            }
            EulerOrder::Yxz => {
                let x = clamp(-m23).asin();
                let (y, z) = if m23.abs() < 0.999_999_9 {
                    (m13.atan2(m33), m21.atan2(m22))
                } else {
                    ((-m31).atan2(m11), 0.0)
                };
                Self { x, y, z, order }
            }
            EulerOrder::Zxy => {
                let x = clamp(m32).asin();
                let (y, z) = if m32.abs() < 0.999_999_9 {
                    ((-m31).atan2(m33), (-m12).atan2(m22))
                } else {
                    (0.0, m21.atan2(m11))
                };
                Self { x, y, z, order }
            }
            EulerOrder::Zyx => {
                let y = clamp(-m31).asin();
                let (x, z) = if m31.abs() < 0.999_999_9 {
                    (m32.atan2(m33), m21.atan2(m11))
                } else {
                    (0.0, (-m12).atan2(m22))
                };
                Self { x, y, z, order }
            }
            EulerOrder::Yzx => {
                let z = clamp(m21).asin();
                let (x, y) = if m21.abs() < 0.999_999_9 {
                    ((-m23).atan2(m22), (-m31).atan2(m11))
                } else {
                    (0.0, m13.atan2(m33))
                };
                Self { x, y, z, order }
            }
            EulerOrder::Xzy => {
                let z = clamp(-m12).asin();
                let (x, y) = if m12.abs() < 0.999_999_9 {
                    (m32.atan2(m22), m13.atan2(m11))
                } else {
                    ((-m23).atan2(m33), 0.0)
                };
                Self { x, y, z, order }
            }
        }
    }

    /// Extract Euler angles from a Matrix4, normalizing out scale.
    pub fn from_matrix4(m: &Matrix4, order: EulerOrder) -> Self {
        let e = &m.elements;

        let sx = Vector3::new(e[0], e[1], e[2]).length();
        let sy = Vector3::new(e[4], e[5], e[6]).length();
        let sz = Vector3::new(e[8], e[9], e[10]).length();

        let inv = |s: f32| if s != 0.0 { 1.0 / s } else { 0.0 };
        let (ix, iy, iz) = (inv(sx), inv(sy), inv(sz));

        Self::from_rotation_matrix_elements(
            e[0] * ix, e[4] * iy, e[8] * iz,
            e[1] * ix, e[5] * iy, e[9] * iz,
            e[2] * ix, e[6] * iy, e[10] * iz,
            order,
        )
    }

    /// Convert a quaternion to Euler angles for the given order.
    pub fn from_quaternion(q: &Quaternion, order: EulerOrder) -> Self {
        Self::from_matrix4(&Matrix4::from_quaternion(q), order)
    }

    /// Re-express these angles under a different order.
    pub fn reorder(&self, new_order: EulerOrder) -> Self {
        Self::from_quaternion(&Quaternion::from_euler(self), new_order)
    }

    /// Approximate equality within an epsilon; orders must match exactly.
    #[inline]
    pub fn approx_eq(&self, other: &Euler, epsilon: f32) -> bool {
        (self.x - other.x).abs() < epsilon
            && (self.y - other.y).abs() < epsilon
            && (self.z - other.z).abs() < epsilon
            && self.order == other.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDERS: [EulerOrder; 6] = [
        EulerOrder::Xyz,
        EulerOrder::Yxz,
        EulerOrder::Zxy,
        EulerOrder::Zyx,
        EulerOrder::Yzx,
        EulerOrder::Xzy,
    ];

    #[test]
    fn test_quaternion_roundtrip_all_orders() {
        for order in ORDERS {
            let e = Euler::new(0.1, 0.2, 0.3, order);
            let q = Quaternion::from_euler(&e);
            let e2 = Euler::from_quaternion(&q, order);
            assert!(e.approx_eq(&e2, 1e-5), "roundtrip failed for {order:?}");
        }
    }

    #[test]
    fn test_reorder_preserves_rotation() {
        let e = Euler::xyz(0.4, -0.2, 0.9);
        let r = e.reorder(EulerOrder::Zyx);
        let qa = Quaternion::from_euler(&e);
        let qb = Quaternion::from_euler(&r);
        let v = Vector3::new(1.0, 2.0, -0.5);
        assert!(qa.rotate_vector(&v).approx_eq(&qb.rotate_vector(&v), 1e-5));
    }
}
