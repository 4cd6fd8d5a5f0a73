//! Authored primitive geometry. Only the box is built in; anything else
//! comes from the host application.

use super::geometry::{Face3, Geometry};
use crate::math::{Vector2, Vector3};

/// An axis-aligned box centered at the origin: 8 vertices, 12 faces,
/// per-face UVs, normals and centroids computed.
pub fn box_geometry(width: f32, height: f32, depth: f32) -> Geometry {
    let (hx, hy, hz) = (width / 2.0, height / 2.0, depth / 2.0);

    let mut geometry = Geometry::new();
    geometry.name = "box".into();

    geometry.vertices = vec![
        Vector3::new(-hx, -hy, -hz),
        Vector3::new(hx, -hy, -hz),
        Vector3::new(hx, hy, -hz),
        Vector3::new(-hx, hy, -hz),
        Vector3::new(-hx, -hy, hz),
        Vector3::new(hx, -hy, hz),
        Vector3::new(hx, hy, hz),
        Vector3::new(-hx, hy, hz),
    ];

    // two triangles per side, counter-clockwise seen from outside
    let quads: [[usize; 4]; 6] = [
        [1, 2, 6, 5], // +x
        [4, 7, 3, 0], // -x
        [3, 7, 6, 2], // +y
        [4, 0, 1, 5], // -y
        [5, 6, 7, 4], // +z
        [0, 3, 2, 1], // -z
    ];

    let quad_uvs = [
        Vector2::new(0.0, 0.0),
        Vector2::new(1.0, 0.0),
        Vector2::new(1.0, 1.0),
        Vector2::new(0.0, 1.0),
    ];

    for [a, b, c, d] in quads {
        geometry.faces.push(Face3::new(a, b, c));
        geometry.face_vertex_uvs[0].push([quad_uvs[0], quad_uvs[1], quad_uvs[2]]);
        geometry.faces.push(Face3::new(a, c, d));
        geometry.face_vertex_uvs[0].push([quad_uvs[0], quad_uvs[2], quad_uvs[3]]);
    }

    geometry.compute_face_normals();
    geometry.compute_vertex_normals();
    geometry.compute_centroids();
    geometry.compute_bounding_box();
    geometry.compute_bounding_sphere();

    geometry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_counts() {
        let b = box_geometry(1.0, 1.0, 1.0);
        assert_eq!(b.vertices.len(), 8);
        assert_eq!(b.faces.len(), 12);
        assert!(b.validate().is_ok());
    }

    #[test]
    fn test_box_bounds() {
        let b = box_geometry(2.0, 4.0, 6.0);
        let bounds = b.bounding_box.unwrap();
        assert!(bounds.min.approx_eq(&Vector3::new(-1.0, -2.0, -3.0), 1e-6));
        assert!(bounds.max.approx_eq(&Vector3::new(1.0, 2.0, 3.0), 1e-6));
    }

    #[test]
    fn test_box_normals_point_outward() {
        let b = box_geometry(1.0, 1.0, 1.0);
        for face in &b.faces {
            // normal should agree with the centroid direction
            assert!(face.normal.dot(&face.centroid.normalized()) > 0.0);
        }
    }
}
