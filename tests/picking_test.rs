//! Ray picking against scene meshes.

use limn::prelude::*;

/// A cube of side 2 centered at `x`, so its front face sits at z = 1.
fn cube_at(x: f32) -> ObjectRef {
    let mut geometry = box_geometry(2.0, 2.0, 2.0);
    geometry.compute_centroids();
    let material = Material::basic(Color::WHITE).into_ref();
    let node = Object3D::with_kind(ObjectKind::Mesh(Mesh::new(geometry.into_ref(), material)));
    let node = node.into_ref();
    node.write().unwrap().position = Vector3::new(x, 0.0, 0.0);
    node
}

#[test]
fn ray_between_cubes_hits_nothing() {
    let scene = Scene::new();
    let left = cube_at(-2.0);
    let right = cube_at(2.0);
    scene.add(&left);
    scene.add(&right);
    scene.update_matrix_world();

    let caster = Raycaster::new(Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
    let hits = caster.intersect_objects(&[left, right], false);
    assert!(hits.is_empty());
}

#[test]
fn shifted_ray_hits_only_the_near_cube_front_face() {
    let scene = Scene::new();
    let left = cube_at(-2.0);
    let right = cube_at(2.0);
    scene.add(&left);
    scene.add(&right);
    scene.update_matrix_world();

    // off the face diagonal so exactly one front triangle contains the
    // hit point
    let caster = Raycaster::new(
        Vector3::new(-2.1, 0.2, 5.0),
        Vector3::new(0.0, 0.0, -1.0),
    );
    let hits = caster.intersect_objects(&[left.clone(), right], false);

    assert_eq!(hits.len(), 1);
    assert!(std::sync::Arc::ptr_eq(&hits[0].object, &left));
    // front face of the side-2 cube sits at z = 1, ray starts at z = 5
    assert!((hits[0].distance - 4.0).abs() < 1e-4);
    assert!(hits[0].face_index.is_some());
}

#[test]
fn recursive_pick_reaches_children() {
    let scene = Scene::new();
    let group = Object3D::new().into_ref();
    scene.add(&group);
    let cube = cube_at(0.0);
    Object3D::add(&group, &cube);
    scene.update_matrix_world();

    let caster = Raycaster::new(Vector3::new(0.1, 0.1, 5.0), Vector3::new(0.0, 0.0, -1.0));
    let hits = caster.intersect_object(&group, true);
    assert!(!hits.is_empty());
}

#[test]
fn hits_are_sorted_ascending_by_distance() {
    let scene = Scene::new();
    let near = cube_at(0.0);
    let far = cube_at(0.0);
    far.write().unwrap().position = Vector3::new(0.0, 0.0, -10.0);
    scene.add(&near);
    scene.add(&far);
    scene.update_matrix_world();

    let caster = Raycaster::new(Vector3::new(0.1, 0.2, 5.0), Vector3::new(0.0, 0.0, -1.0));
    let hits = caster.intersect_objects(&[near, far], false);

    assert!(hits.len() >= 2);
    for pair in hits.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }
}

#[test]
fn picking_ray_from_projector_hits_centered_cube() {
    let scene = Scene::new();
    let cube = cube_at(0.0);
    scene.add(&cube);
    scene.update_matrix_world();

    let mut camera_node = Object3D::with_kind(ObjectKind::Camera(Camera::perspective(
        60.0, 1.0, 0.1, 100.0,
    )));
    camera_node.position = Vector3::new(0.0, 0.0, 8.0);
    let camera = camera_node.into_ref();
    Object3D::update_matrix_world(&camera, false);

    let projector = Projector::new();
    // slightly off-center so the hit avoids the face diagonal
    let ray = projector.picking_ray(0.02, 0.03, &camera);
    let caster = Raycaster::new(ray.origin, ray.direction);

    let hits = caster.intersect_object(&cube, false);
    assert!(!hits.is_empty());
    assert!((hits[0].distance - 7.0).abs() < 0.1);
}
