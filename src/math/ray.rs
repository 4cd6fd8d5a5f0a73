//! Ray with origin and direction.

use super::{Box3, Matrix4, Plane, Sphere, Triangle, Vector3};
use serde::{Deserialize, Serialize};

/// A half-line from `origin` along the unit `direction`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Ray {
    /// Start point.
    pub origin: Vector3,
    /// Unit direction.
    pub direction: Vector3,
}

impl Ray {
    /// Create a new ray.
    #[inline]
    pub const fn new(origin: Vector3, direction: Vector3) -> Self {
        Self { origin, direction }
    }

    /// The point at parameter `t` along the ray.
    #[inline]
    pub fn at(&self, t: f32) -> Vector3 {
        self.origin + self.direction * t
    }

    /// The point on the ray closest to `point` (clamped to the origin).
    pub fn closest_point_to_point(&self, point: &Vector3) -> Vector3 {
        let t = (*point - self.origin).dot(&self.direction);
        if t < 0.0 {
            self.origin
        } else {
            self.at(t)
        }
    }

    /// Distance from the ray to a point.
    pub fn distance_to_point(&self, point: &Vector3) -> f32 {
        self.closest_point_to_point(point).distance_to(point)
    }

    /// Parameter of the plane intersection, if the ray hits it.
    /// A ray lying in the plane reports t = 0.
    pub fn distance_to_plane(&self, plane: &Plane) -> Option<f32> {
        let denom = plane.normal.dot(&self.direction);
        if denom.abs() < 1e-8 {
            if plane.distance_to_point(&self.origin).abs() < 1e-8 {
                Some(0.0)
            } else {
                None
            }
        } else {
            let t = -(self.origin.dot(&plane.normal) + plane.constant) / denom;
            (t >= 0.0).then_some(t)
        }
    }

    /// Intersection point with a plane.
    pub fn intersect_plane(&self, plane: &Plane) -> Option<Vector3> {
        self.distance_to_plane(plane).map(|t| self.at(t))
    }

    /// Nearest non-negative intersection parameter with a sphere.
    pub fn intersect_sphere(&self, sphere: &Sphere) -> Option<f32> {
        let oc = self.origin - sphere.center;
        let b = oc.dot(&self.direction);
        let c = oc.length_squared() - sphere.radius * sphere.radius;

        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrt_d = discriminant.sqrt();
        let t0 = -b - sqrt_d;
        let t1 = -b + sqrt_d;

        if t0 >= 0.0 {
            Some(t0)
        } else if t1 >= 0.0 {
            Some(t1)
        } else {
            None
        }
    }

    /// Slab test against an axis-aligned box, entry parameter on hit.
    ///
    /// Division by a zero direction component produces infinities that the
    /// min/max folding handles; the explicit NaN checks keep a NaN slab
    /// (origin exactly on a degenerate box face) from poisoning the result.
    pub fn intersect_box(&self, b: &Box3) -> Option<f32> {
        let inv_x = 1.0 / self.direction.x;
        let inv_y = 1.0 / self.direction.y;
        let inv_z = 1.0 / self.direction.z;

        let (tx_min, tx_max) = if inv_x >= 0.0 {
            ((b.min.x - self.origin.x) * inv_x, (b.max.x - self.origin.x) * inv_x)
        } else {
            ((b.max.x - self.origin.x) * inv_x, (b.min.x - self.origin.x) * inv_x)
        };

        let (ty_min, ty_max) = if inv_y >= 0.0 {
            ((b.min.y - self.origin.y) * inv_y, (b.max.y - self.origin.y) * inv_y)
        } else {
            ((b.max.y - self.origin.y) * inv_y, (b.min.y - self.origin.y) * inv_y)
        };

        if tx_min > ty_max || ty_min > tx_max {
            return None;
        }

        let mut t_min = if ty_min > tx_min || tx_min.is_nan() { ty_min } else { tx_min };
        let mut t_max = if ty_max < tx_max || tx_max.is_nan() { ty_max } else { tx_max };

        let (tz_min, tz_max) = if inv_z >= 0.0 {
            ((b.min.z - self.origin.z) * inv_z, (b.max.z - self.origin.z) * inv_z)
        } else {
            ((b.max.z - self.origin.z) * inv_z, (b.min.z - self.origin.z) * inv_z)
        };

        if t_min > tz_max || tz_min > t_max {
            return None;
        }

        if tz_min > t_min || t_min.is_nan() {
            t_min = tz_min;
        }
        if tz_max < t_max || t_max.is_nan() {
            t_max = tz_max;
        }

        if t_max < 0.0 {
            return None;
        }

        Some(if t_min >= 0.0 { t_min } else { t_max })
    }

    /// Möller–Trumbore triangle intersection. Returns the hit parameter.
    /// With `backface_culling`, triangles facing away from the ray are
    /// skipped.
    pub fn intersect_triangle(&self, triangle: &Triangle, backface_culling: bool) -> Option<f32> {
        let edge1 = triangle.b - triangle.a;
        let edge2 = triangle.c - triangle.a;
        let h = self.direction.cross(&edge2);
        let det = edge1.dot(&h);

        if backface_culling {
            if det < 1e-8 {
                return None;
            }
        } else if det.abs() < 1e-8 {
            return None;
        }

        let inv_det = 1.0 / det;
        let s = self.origin - triangle.a;
        let u = inv_det * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = inv_det * self.direction.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = inv_det * edge2.dot(&q);
        (t > 1e-8).then_some(t)
    }

    /// Transform into another space.
    pub fn apply_matrix4(&self, m: &Matrix4) -> Self {
        Self {
            origin: m.transform_point(&self.origin),
            direction: m.transform_direction(&self.direction).normalized(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_zero_is_origin() {
        let ray = Ray::new(Vector3::new(1.0, 2.0, 3.0), Vector3::UNIT_Z);
        assert!(ray.at(0.0).approx_eq(&ray.origin, 1e-6));
    }

    #[test]
    fn test_at_collinear() {
        let ray = Ray::new(Vector3::ZERO, Vector3::new(0.0, 0.6, 0.8));
        let p = ray.at(2.5);
        let back = (p - ray.origin).normalized();
        assert!(back.approx_eq(&ray.direction, 1e-6));
    }

    #[test]
    fn test_sphere_hit_distance() {
        let ray = Ray::new(Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let t = ray.intersect_sphere(&Sphere::new(Vector3::ZERO, 1.0)).unwrap();
        assert!((t - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_box_miss() {
        let ray = Ray::new(Vector3::new(0.0, 5.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let b = Box3::new(Vector3::splat(-1.0), Vector3::splat(1.0));
        assert!(ray.intersect_box(&b).is_none());
    }

    #[test]
    fn test_box_hit_with_axis_parallel_ray() {
        // direction has zero components; the slab divisions go infinite
        let ray = Ray::new(Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let b = Box3::new(Vector3::splat(-1.0), Vector3::splat(1.0));
        let t = ray.intersect_box(&b).unwrap();
        assert!((t - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_box_hit_from_inside() {
        let ray = Ray::new(Vector3::ZERO, Vector3::UNIT_X);
        let b = Box3::new(Vector3::splat(-1.0), Vector3::splat(1.0));
        let t = ray.intersect_box(&b).unwrap();
        assert!((t - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_triangle_backface_culling() {
        let tri = Triangle::new(
            Vector3::new(-1.0, -1.0, 0.0),
            Vector3::new(1.0, -1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        );
        let front = Ray::new(Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let back = Ray::new(Vector3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(front.intersect_triangle(&tri, true).is_some());
        assert!(back.intersect_triangle(&tri, true).is_none());
        assert!(back.intersect_triangle(&tri, false).is_some());
    }
}
