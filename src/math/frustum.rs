//! View frustum for culling.

use super::{Box3, Matrix4, Plane, Sphere, Vector3};
use serde::{Deserialize, Serialize};

/// The six planes of a view volume, normals pointing inward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Frustum {
    /// Planes in left, right, bottom, top, near, far order.
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Derive the six planes from a projection-view matrix.
    pub fn from_matrix(m: &Matrix4) -> Self {
        let mut f = Self::default();
        f.set_from_matrix(m);
        f
    }

    /// Recompute the planes from a projection-view matrix.
    pub fn set_from_matrix(&mut self, m: &Matrix4) -> &mut Self {
        let e = &m.elements;

        self.planes = [
            // left
            Plane::from_components(e[3] + e[0], e[7] + e[4], e[11] + e[8], e[15] + e[12]),
            // right
            Plane::from_components(e[3] - e[0], e[7] - e[4], e[11] - e[8], e[15] - e[12]),
            // bottom
            Plane::from_components(e[3] + e[1], e[7] + e[5], e[11] + e[9], e[15] + e[13]),
            // top
            Plane::from_components(e[3] - e[1], e[7] - e[5], e[11] - e[9], e[15] - e[13]),
            // near
            Plane::from_components(e[3] + e[2], e[7] + e[6], e[11] + e[10], e[15] + e[14]),
            // far
            Plane::from_components(e[3] - e[2], e[7] - e[6], e[11] - e[10], e[15] - e[14]),
        ];

        for plane in &mut self.planes {
            plane.normalize();
        }

        self
    }

    /// True if a point lies inside the frustum.
    pub fn contains_point(&self, point: &Vector3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(point) >= 0.0)
    }

    /// True unless the sphere is entirely behind one of the planes.
    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(&sphere.center) >= -sphere.radius)
    }

    /// Conservative box test against all six planes.
    pub fn intersects_box(&self, b: &Box3) -> bool {
        for plane in &self.planes {
            let p = Vector3::new(
                if plane.normal.x > 0.0 { b.max.x } else { b.min.x },
                if plane.normal.y > 0.0 { b.max.y } else { b.min.y },
                if plane.normal.z > 0.0 { b.max.z } else { b.min.z },
            );
            if plane.distance_to_point(&p) < 0.0 {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_frustum() -> Frustum {
        let proj = Matrix4::make_perspective(90.0, 1.0, 0.1, 100.0);
        Frustum::from_matrix(&proj)
    }

    #[test]
    fn test_point_in_front() {
        let f = unit_frustum();
        assert!(f.contains_point(&Vector3::new(0.0, 0.0, -5.0)));
        assert!(!f.contains_point(&Vector3::new(0.0, 0.0, 5.0)));
    }

    #[test]
    fn test_sphere_behind_near_plane() {
        let f = unit_frustum();
        assert!(f.intersects_sphere(&Sphere::new(Vector3::new(0.0, 0.0, -10.0), 1.0)));
        assert!(!f.intersects_sphere(&Sphere::new(Vector3::new(0.0, 0.0, 10.0), 1.0)));
    }

    #[test]
    fn test_sphere_straddling_plane() {
        let f = unit_frustum();
        // center outside the left plane but radius reaches in
        assert!(f.intersects_sphere(&Sphere::new(Vector3::new(-6.0, 0.0, -5.0), 2.0)));
    }
}
