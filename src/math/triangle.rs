//! Triangle with barycentric utilities.

use super::{Plane, Vector3};
use serde::{Deserialize, Serialize};

/// A triangle given by three corner points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Triangle {
    /// First corner.
    pub a: Vector3,
    /// Second corner.
    pub b: Vector3,
    /// Third corner.
    pub c: Vector3,
}

impl Triangle {
    /// Create a new triangle.
    #[inline]
    pub const fn new(a: Vector3, b: Vector3, c: Vector3) -> Self {
        Self { a, b, c }
    }

    /// Face normal by counter-clockwise winding. Degenerate triangles
    /// yield zero.
    pub fn normal(&self) -> Vector3 {
        (self.c - self.b).cross(&(self.a - self.b)).normalized()
    }

    /// Area of the triangle.
    pub fn area(&self) -> f32 {
        (self.c - self.b).cross(&(self.a - self.b)).length() * 0.5
    }

    /// Centroid (average of the corners).
    pub fn midpoint(&self) -> Vector3 {
        (self.a + self.b + self.c) * (1.0 / 3.0)
    }

    /// The plane the triangle lies in.
    pub fn plane(&self) -> Plane {
        Plane::from_coplanar_points(&self.a, &self.b, &self.c)
    }

    /// Barycentric coordinates of a point with respect to this triangle,
    /// or `None` for a degenerate triangle.
    pub fn barycoord_from_point(&self, point: &Vector3) -> Option<Vector3> {
        let v0 = self.c - self.a;
        let v1 = self.b - self.a;
        let v2 = *point - self.a;

        let dot00 = v0.dot(&v0);
        let dot01 = v0.dot(&v1);
        let dot02 = v0.dot(&v2);
        let dot11 = v1.dot(&v1);
        let dot12 = v1.dot(&v2);

        let denom = dot00 * dot11 - dot01 * dot01;
        if denom == 0.0 {
            return None;
        }

        let inv = 1.0 / denom;
        let u = (dot11 * dot02 - dot01 * dot12) * inv;
        let v = (dot00 * dot12 - dot01 * dot02) * inv;

        Some(Vector3::new(1.0 - u - v, v, u))
    }

    /// True if a (coplanar) point falls inside the triangle.
    pub fn contains_point(&self, point: &Vector3) -> bool {
        match self.barycoord_from_point(point) {
            Some(bc) => bc.x >= 0.0 && bc.y >= 0.0 && bc.x + bc.y <= 1.0,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> Triangle {
        Triangle::new(
            Vector3::ZERO,
            Vector3::UNIT_X,
            Vector3::UNIT_Y,
        )
    }

    #[test]
    fn test_contains_point() {
        let t = unit_triangle();
        assert!(t.contains_point(&Vector3::new(0.25, 0.25, 0.0)));
        assert!(!t.contains_point(&Vector3::new(0.75, 0.75, 0.0)));
    }

    #[test]
    fn test_midpoint() {
        let t = unit_triangle();
        assert!(t
            .midpoint()
            .approx_eq(&Vector3::new(1.0 / 3.0, 1.0 / 3.0, 0.0), 1e-6));
    }

    #[test]
    fn test_area() {
        assert!((unit_triangle().area() - 0.5).abs() < 1e-6);
    }
}
