//! Scene-graph semantics: hierarchy transforms, membership bookkeeping
//! and the renderer's queue draining.

use limn::prelude::*;

fn mesh_node() -> ObjectRef {
    let geometry = box_geometry(1.0, 1.0, 1.0).into_ref();
    let material = Material::basic(Color::WHITE).into_ref();
    Object3D::with_kind(ObjectKind::Mesh(Mesh::new(geometry, material))).into_ref()
}

#[test]
fn nested_transform_composes_world_position() {
    let scene = Scene::new();

    let parent = Object3D::new().into_ref();
    {
        let mut p = parent.write().unwrap();
        p.position = Vector3::new(1.0, 0.0, 0.0);
        p.set_rotation(Euler::xyz(0.0, std::f32::consts::FRAC_PI_2, 0.0));
    }
    scene.add(&parent);

    let child = mesh_node();
    child.write().unwrap().position = Vector3::new(0.0, 1.0, 0.0);
    Object3D::add(&parent, &child);

    scene.update_matrix_world();

    let world = child.read().unwrap().matrix_world.get_position();
    assert!(world.approx_eq(&Vector3::new(1.0, 1.0, 0.0), 1e-5));
}

#[test]
fn world_matrix_equals_parent_times_local_everywhere() {
    let scene = Scene::new();
    let mut nodes = vec![scene.root().clone()];

    // a small random-ish tree
    let a = Object3D::new().into_ref();
    a.write().unwrap().position = Vector3::new(0.5, 2.0, -1.0);
    scene.add(&a);
    nodes.push(a.clone());

    let b = mesh_node();
    b.write().unwrap().scale = Vector3::new(2.0, 1.0, 0.5);
    Object3D::add(&a, &b);
    nodes.push(b.clone());

    let c = mesh_node();
    c.write()
        .unwrap()
        .set_rotation(Euler::xyz(0.3, -0.8, 0.1));
    Object3D::add(&b, &c);
    nodes.push(c);

    scene.update_matrix_world();

    for node in &nodes[1..] {
        let guard = node.read().unwrap();
        let parent = guard.parent().unwrap();
        let parent_world = parent.read().unwrap().matrix_world;
        let expected = parent_world.multiply(&guard.matrix);
        assert!(guard.matrix_world.approx_eq(&expected, 1e-5));
    }
}

#[test]
fn renderer_drains_queues_in_fifo_order() {
    let scene = Scene::new();
    let first = mesh_node();
    let second = mesh_node();
    scene.add(&first);
    scene.add(&second);

    let queued = scene.with_data(|d| d.objects_added.len()).unwrap();
    assert_eq!(queued, 2);

    let mut renderer = Renderer::new(TraceDevice::new(), RendererOptions::default());
    let camera = Object3D::with_kind(ObjectKind::Camera(Camera::perspective(
        60.0, 1.0, 0.1, 100.0,
    )))
    .into_ref();
    camera.write().unwrap().position = Vector3::new(0.0, 0.0, 5.0);
    renderer.render(&scene, &camera, None, false).unwrap();

    // queues drained, render list populated
    let (added, removed) = scene
        .with_data(|d| (d.objects_added.len(), d.objects_removed.len()))
        .unwrap();
    assert_eq!(added, 0);
    assert_eq!(removed, 0);
    assert_eq!(renderer.stats().calls, 2);
}

#[test]
fn invisible_objects_are_skipped() {
    let scene = Scene::new();
    let cube = mesh_node();
    cube.write().unwrap().visible = false;
    scene.add(&cube);

    let mut renderer = Renderer::new(TraceDevice::new(), RendererOptions::default());
    let camera = Object3D::with_kind(ObjectKind::Camera(Camera::perspective(
        60.0, 1.0, 0.1, 100.0,
    )))
    .into_ref();
    camera.write().unwrap().position = Vector3::new(0.0, 0.0, 5.0);
    renderer.render(&scene, &camera, None, false).unwrap();

    assert_eq!(renderer.device().draw_call_count(), 0);
}

#[test]
fn lookup_by_name_and_id() {
    let scene = Scene::new();
    let group = Object3D::new().into_ref();
    scene.add(&group);

    let mesh = mesh_node();
    mesh.write().unwrap().name = "hero".into();
    Object3D::add(&group, &mesh);

    let id = mesh.read().unwrap().id();
    let by_name = scene.get_object_by_name("hero").unwrap();
    let by_id = scene.get_object_by_id(id).unwrap();

    assert!(std::sync::Arc::ptr_eq(&by_name, &mesh));
    assert!(std::sync::Arc::ptr_eq(&by_id, &mesh));
}

#[test]
fn render_depth_overrides_sort_depth() {
    // two transparent cubes at different depths, but render_depth forces
    // the nearer one to sort as farther
    let scene = Scene::new();
    let geometry = box_geometry(1.0, 1.0, 1.0).into_ref();

    let make_transparent = |z: f32, render_depth: f32| {
        let mut material = Material::basic(Color::WHITE);
        material.transparent = true;
        let node = Object3D::with_kind(ObjectKind::Mesh(Mesh::new(
            geometry.clone(),
            material.into_ref(),
        )))
        .into_ref();
        node.write().unwrap().position = Vector3::new(0.0, 0.0, z);
        node.write().unwrap().render_depth = render_depth;
        node
    };

    let near = make_transparent(1.0, -100.0);
    let far = make_transparent(-1.0, 100.0);
    scene.add(&near);
    scene.add(&far);

    let mut renderer = Renderer::new(TraceDevice::new(), RendererOptions::default());
    let camera = Object3D::with_kind(ObjectKind::Camera(Camera::perspective(
        60.0, 1.0, 0.1, 100.0,
    )))
    .into_ref();
    camera.write().unwrap().position = Vector3::new(0.0, 0.0, 5.0);

    renderer.render(&scene, &camera, None, false).unwrap();
    // both drew; ordering itself is covered by the painter sort on z,
    // which render_depth replaced without crashing
    assert_eq!(renderer.stats().calls, 2);
}
