//! Infinite plane.

use super::Vector3;
use serde::{Deserialize, Serialize};

/// A plane in constant-normal form: `normal · p + constant = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Plane {
    /// Unit normal.
    pub normal: Vector3,
    /// Signed distance from the origin along the normal, negated.
    pub constant: f32,
}

impl Plane {
    /// Create a new plane.
    #[inline]
    pub const fn new(normal: Vector3, constant: f32) -> Self {
        Self { normal, constant }
    }

    /// Create from the raw coefficients of `ax + by + cz + d = 0`,
    /// without normalizing.
    #[inline]
    pub const fn from_components(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self {
            normal: Vector3::new(a, b, c),
            constant: d,
        }
    }

    /// Create from a unit normal and a point on the plane.
    #[inline]
    pub fn from_normal_and_point(normal: Vector3, point: &Vector3) -> Self {
        Self {
            normal,
            constant: -point.dot(&normal),
        }
    }

    /// Create from three coplanar points wound counter-clockwise.
    pub fn from_coplanar_points(a: &Vector3, b: &Vector3, c: &Vector3) -> Self {
        let normal = (*c - *b).cross(&(*a - *b)).normalized();
        Self::from_normal_and_point(normal, a)
    }

    /// Normalize in place, rescaling the constant with the normal.
    pub fn normalize(&mut self) -> &mut Self {
        let len = self.normal.length();
        if len > 0.0 {
            let inv = 1.0 / len;
            self.normal *= inv;
            self.constant *= inv;
        }
        self
    }

    /// Return a normalized copy.
    pub fn normalized(&self) -> Self {
        let mut p = *self;
        p.normalize();
        p
    }

    /// Signed distance from a point; positive on the normal side.
    #[inline]
    pub fn distance_to_point(&self, point: &Vector3) -> f32 {
        self.normal.dot(point) + self.constant
    }

    /// Orthogonal projection of a point onto the plane.
    #[inline]
    pub fn project_point(&self, point: &Vector3) -> Vector3 {
        *point - self.normal * self.distance_to_point(point)
    }

    /// Approximate equality within an epsilon.
    #[inline]
    pub fn approx_eq(&self, other: &Plane, epsilon: f32) -> bool {
        self.normal.approx_eq(&other.normal, epsilon)
            && (self.constant - other.constant).abs() < epsilon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_distance() {
        let p = Plane::new(Vector3::UNIT_Y, 0.0);
        assert!((p.distance_to_point(&Vector3::new(0.0, 4.0, 0.0)) - 4.0).abs() < 1e-6);
        assert!((p.distance_to_point(&Vector3::new(0.0, -2.0, 0.0)) + 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_from_coplanar_points_winding() {
        let p = Plane::from_coplanar_points(
            &Vector3::ZERO,
            &Vector3::UNIT_X,
            &Vector3::UNIT_Y,
        );
        assert!(p.normal.approx_eq(&Vector3::UNIT_Z, 1e-6));
    }
}
