//! Bounding sphere.

use super::{Box3, Matrix4, Vector3};
use serde::{Deserialize, Serialize};

/// A bounding sphere.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sphere {
    /// Center point.
    pub center: Vector3,
    /// Radius. Negative means empty.
    pub radius: f32,
}

impl Sphere {
    /// Create a new sphere.
    #[inline]
    pub const fn new(center: Vector3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// The tightest sphere around a point set, centered at the bounding
    /// box midpoint.
    pub fn from_points(points: &[Vector3]) -> Self {
        if points.is_empty() {
            return Self { center: Vector3::ZERO, radius: -1.0 };
        }

        let bounds = Box3::from_points(points);
        let center = bounds.center();

        let mut max_dist_sq = 0.0f32;
        for p in points {
            max_dist_sq = max_dist_sq.max(center.distance_to_squared(p));
        }

        Self { center, radius: max_dist_sq.sqrt() }
    }

    /// True if the sphere covers nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.radius < 0.0
    }

    /// Set the components.
    #[inline]
    pub fn set(&mut self, center: Vector3, radius: f32) -> &mut Self {
        self.center = center;
        self.radius = radius;
        self
    }

    /// True if a point lies inside or on the sphere.
    #[inline]
    pub fn contains_point(&self, point: &Vector3) -> bool {
        self.center.distance_to_squared(point) <= self.radius * self.radius
    }

    /// True if two spheres overlap.
    #[inline]
    pub fn intersects_sphere(&self, other: &Sphere) -> bool {
        let sum = self.radius + other.radius;
        self.center.distance_to_squared(&other.center) <= sum * sum
    }

    /// Grow to cover a point.
    pub fn expand_by_point(&mut self, point: &Vector3) -> &mut Self {
        if self.is_empty() {
            self.center = *point;
            self.radius = 0.0;
            return self;
        }

        let dist = self.center.distance_to(point);
        if dist > self.radius {
            let half = (dist - self.radius) * 0.5;
            self.center = self.center + (*point - self.center).normalized() * half;
            self.radius += half;
        }
        self
    }

    /// Grow the radius by a scalar.
    #[inline]
    pub fn expand_by_scalar(&mut self, amount: f32) -> &mut Self {
        self.radius += amount;
        self
    }

    /// Transform into world space: the center moves through the matrix,
    /// the radius scales by the largest axis scale.
    pub fn apply_matrix4(&self, m: &Matrix4) -> Self {
        Self {
            center: m.transform_point(&self.center),
            radius: self.radius * m.get_max_scale_on_axis(),
        }
    }

    /// Approximate equality within an epsilon.
    #[inline]
    pub fn approx_eq(&self, other: &Sphere, epsilon: f32) -> bool {
        self.center.approx_eq(&other.center, epsilon)
            && (self.radius - other.radius).abs() < epsilon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points() {
        let points = [
            Vector3::new(-1.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        ];
        let s = Sphere::from_points(&points);
        for p in &points {
            assert!(s.contains_point(p));
        }
    }

    #[test]
    fn test_apply_matrix4_scales_radius() {
        let s = Sphere::new(Vector3::ZERO, 1.0);
        let m = Matrix4::from_scale(&Vector3::new(1.0, 3.0, 2.0));
        let world = s.apply_matrix4(&m);
        assert!((world.radius - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_expand_by_point() {
        let mut s = Sphere::new(Vector3::ZERO, 1.0);
        s.expand_by_point(&Vector3::new(3.0, 0.0, 0.0));
        assert!(s.contains_point(&Vector3::new(3.0, 0.0, 0.0)));
        assert!(s.contains_point(&Vector3::new(-1.0, 0.0, 0.0)));
    }
}
