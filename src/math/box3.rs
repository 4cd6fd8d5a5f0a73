//! Axis-aligned bounding box.

use super::{Matrix4, Sphere, Vector3};
use serde::{Deserialize, Serialize};

/// An axis-aligned box given by its min and max corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Box3 {
    /// Minimum corner.
    pub min: Vector3,
    /// Maximum corner.
    pub max: Vector3,
}

impl Default for Box3 {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Box3 {
    /// Inverted box ready to be expanded.
    pub const EMPTY: Self = Self {
        min: Vector3 { x: f32::INFINITY, y: f32::INFINITY, z: f32::INFINITY },
        max: Vector3 { x: f32::NEG_INFINITY, y: f32::NEG_INFINITY, z: f32::NEG_INFINITY },
    };

    /// Create a new box.
    #[inline]
    pub const fn new(min: Vector3, max: Vector3) -> Self {
        Self { min, max }
    }

    /// The tightest box around a point set.
    pub fn from_points(points: &[Vector3]) -> Self {
        let mut b = Self::EMPTY;
        for p in points {
            b.expand_by_point(p);
        }
        b
    }

    /// True if the box covers nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    /// Box center, zero for an empty box.
    #[inline]
    pub fn center(&self) -> Vector3 {
        if self.is_empty() {
            Vector3::ZERO
        } else {
            (self.min + self.max) * 0.5
        }
    }

    /// Box extents, zero for an empty box.
    #[inline]
    pub fn size(&self) -> Vector3 {
        if self.is_empty() {
            Vector3::ZERO
        } else {
            self.max - self.min
        }
    }

    /// Grow to cover a point.
    #[inline]
    pub fn expand_by_point(&mut self, point: &Vector3) -> &mut Self {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
        self
    }

    /// Grow every side by a scalar amount.
    #[inline]
    pub fn expand_by_scalar(&mut self, amount: f32) -> &mut Self {
        self.min = self.min - Vector3::splat(amount);
        self.max = self.max + Vector3::splat(amount);
        self
    }

    /// True if a point lies inside the box.
    #[inline]
    pub fn contains_point(&self, point: &Vector3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x
            && point.y >= self.min.y && point.y <= self.max.y
            && point.z >= self.min.z && point.z <= self.max.z
    }

    /// True if this box fully contains another.
    #[inline]
    pub fn contains_box(&self, other: &Box3) -> bool {
        self.min.x <= other.min.x && other.max.x <= self.max.x
            && self.min.y <= other.min.y && other.max.y <= self.max.y
            && self.min.z <= other.min.z && other.max.z <= self.max.z
    }

    /// True if two boxes overlap.
    #[inline]
    pub fn intersects_box(&self, other: &Box3) -> bool {
        other.max.x >= self.min.x && other.min.x <= self.max.x
            && other.max.y >= self.min.y && other.min.y <= self.max.y
            && other.max.z >= self.min.z && other.min.z <= self.max.z
    }

    /// Clamp a point into the box.
    #[inline]
    pub fn clamp_point(&self, point: &Vector3) -> Vector3 {
        point.clamp(&self.min, &self.max)
    }

    /// The bounding sphere of this box.
    pub fn bounding_sphere(&self) -> Sphere {
        let center = self.center();
        Sphere::new(center, self.size().length() * 0.5)
    }

    /// The AABB of this box after a matrix transform.
    pub fn apply_matrix4(&self, m: &Matrix4) -> Self {
        if self.is_empty() {
            return Self::EMPTY;
        }

        let mut result = Self::EMPTY;
        for corner in self.corners() {
            result.expand_by_point(&m.transform_point(&corner));
        }
        result
    }

    /// The eight corners of the box.
    pub fn corners(&self) -> [Vector3; 8] {
        [
            Vector3::new(self.min.x, self.min.y, self.min.z),
            Vector3::new(self.min.x, self.min.y, self.max.z),
            Vector3::new(self.min.x, self.max.y, self.min.z),
            Vector3::new(self.min.x, self.max.y, self.max.z),
            Vector3::new(self.max.x, self.min.y, self.min.z),
            Vector3::new(self.max.x, self.min.y, self.max.z),
            Vector3::new(self.max.x, self.max.y, self.min.z),
            Vector3::new(self.max.x, self.max.y, self.max.z),
        ]
    }

    /// Approximate equality within an epsilon.
    #[inline]
    pub fn approx_eq(&self, other: &Box3, epsilon: f32) -> bool {
        self.min.approx_eq(&other.min, epsilon) && self.max.approx_eq(&other.max, epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points() {
        let b = Box3::from_points(&[
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(-1.0, 0.0, 5.0),
        ]);
        assert!(b.min.approx_eq(&Vector3::new(-1.0, 0.0, 3.0), 1e-6));
        assert!(b.max.approx_eq(&Vector3::new(1.0, 2.0, 5.0), 1e-6));
    }

    #[test]
    fn test_empty_semantics() {
        let b = Box3::EMPTY;
        assert!(b.is_empty());
        assert_eq!(b.center(), Vector3::ZERO);
        assert_eq!(b.size(), Vector3::ZERO);
    }

    #[test]
    fn test_containment() {
        let b = Box3::new(Vector3::ZERO, Vector3::ONE);
        assert!(b.contains_point(&Vector3::splat(0.5)));
        assert!(!b.contains_point(&Vector3::splat(1.5)));
        assert!(b.intersects_box(&Box3::new(Vector3::splat(0.9), Vector3::splat(2.0))));
        assert!(!b.intersects_box(&Box3::new(Vector3::splat(1.1), Vector3::splat(2.0))));
    }
}
