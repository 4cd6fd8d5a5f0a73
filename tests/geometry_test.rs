//! Geometry invariants: partitioning, vertex merging and derived data.

use limn::prelude::*;

#[test]
fn group_split_keeps_every_face_once_and_respects_index_limit() {
    let mut geometry = Geometry::new();
    geometry.vertices = vec![
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
    ];
    geometry.faces = (0..30_000).map(|_| Face3::new(0, 1, 2)).collect();

    geometry.sort_faces_by_material();

    let groups = geometry.groups();
    assert!(groups.len() >= 2);

    let mut face_counts = vec![0usize; geometry.faces.len()];
    for group in groups {
        assert!(group.vertex_count <= 65_535);
        assert!(group.faces.len() <= 21_845);
        for &f in &group.faces {
            face_counts[f] += 1;
        }
    }
    assert!(face_counts.iter().all(|&n| n == 1));

    // order preserved across the split
    let flattened: Vec<usize> = groups.iter().flat_map(|g| g.faces.clone()).collect();
    assert!(flattened.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn multi_material_partition_preserves_pairs() {
    let mut geometry = Geometry::new();
    geometry.vertices = vec![
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
    ];
    for i in 0..90 {
        geometry.faces.push(Face3::with_material(0, 1, 2, i % 3));
    }

    geometry.sort_faces_by_material();

    // multiset of (material, face) pairs is unchanged
    let mut seen: Vec<(usize, usize)> = Vec::new();
    for group in geometry.groups() {
        for &f in &group.faces {
            assert_eq!(geometry.faces[f].material_index, group.material_index);
            seen.push((group.material_index, f));
        }
    }
    assert_eq!(seen.len(), 90);
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), 90);
}

#[test]
fn merge_vertices_preserves_world_triangles() {
    let mut geometry = Geometry::new();
    geometry.vertices = vec![
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
        // duplicate of vertex 1 within 1e-4
        Vector3::new(1.000_01, 0.0, 0.0),
        Vector3::new(1.0, 1.0, 0.0),
    ];
    geometry.faces = vec![Face3::new(0, 1, 2), Face3::new(3, 4, 2)];

    let before: Vec<[Vector3; 3]> = geometry
        .faces
        .iter()
        .map(|f| f.indices().map(|i| geometry.vertices[i]))
        .collect();

    let removed = geometry.merge_vertices();
    assert_eq!(removed, 1);

    let after: Vec<[Vector3; 3]> = geometry
        .faces
        .iter()
        .map(|f| f.indices().map(|i| geometry.vertices[i]))
        .collect();

    for (a, b) in before.iter().zip(after.iter()) {
        for (va, vb) in a.iter().zip(b.iter()) {
            assert!(va.approx_eq(vb, 1e-4));
        }
    }

    // no two remaining vertices agree to four decimals
    for (i, a) in geometry.vertices.iter().enumerate() {
        for b in geometry.vertices.iter().skip(i + 1) {
            assert!(!a.approx_eq(b, 1e-5));
        }
    }

    assert!(geometry.validate().is_ok());
}

#[test]
fn vertex_normals_equal_normalized_face_normal_sums() {
    let mut geometry = box_geometry(1.0, 1.0, 1.0);
    geometry.compute_face_normals();
    geometry.compute_vertex_normals();

    // accumulate face normals per vertex independently
    let mut sums = vec![Vector3::ZERO; geometry.vertices.len()];
    for face in &geometry.faces {
        for index in face.indices() {
            sums[index] += face.normal;
        }
    }

    for face in &geometry.faces {
        for (slot, index) in face.indices().into_iter().enumerate() {
            let expected = sums[index].normalized();
            assert!(face.vertex_normals[slot].approx_eq(&expected, 1e-5));
        }
    }
}

#[test]
fn quad_tangents_follow_the_uv_gradient() {
    // a flat quad in the xy plane with uvs matching positions: the
    // tangent must come out along +x with +1 handedness
    let mut geometry = Geometry::new();
    geometry.vertices = vec![
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(1.0, 1.0, 0.0),
    ];
    geometry.faces = vec![Face3::new(0, 1, 2), Face3::new(2, 1, 3)];
    geometry.face_vertex_uvs[0] = vec![
        [
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(0.0, 1.0),
        ],
        [
            Vector2::new(0.0, 1.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(1.0, 1.0),
        ],
    ];
    geometry.compute_face_normals();
    geometry.compute_vertex_normals();
    geometry.compute_tangents();

    assert!(geometry.has_tangents);
    for face in &geometry.faces {
        assert_eq!(face.vertex_tangents.len(), 3);
        for (slot, tangent) in face.vertex_tangents.iter().enumerate() {
            let t = tangent.xyz();
            assert!(t.approx_eq(&Vector3::new(1.0, 0.0, 0.0), 1e-4));
            assert!(t.dot(&face.vertex_normals[slot]).abs() < 1e-4);
            assert_eq!(tangent.w, 1.0);
        }
    }
}

#[test]
fn apply_matrix_then_bounds() {
    let mut geometry = box_geometry(1.0, 1.0, 1.0);
    let shift = Matrix4::from_translation(&Vector3::new(10.0, 0.0, 0.0));
    geometry.apply_matrix(&shift);
    geometry.compute_bounding_box();
    geometry.compute_bounding_sphere();

    let bounds = geometry.bounding_box.unwrap();
    assert!(bounds.min.approx_eq(&Vector3::new(9.5, -0.5, -0.5), 1e-5));
    let sphere = geometry.bounding_sphere.unwrap();
    assert!(sphere.center.approx_eq(&Vector3::new(10.0, 0.0, 0.0), 1e-5));
}
