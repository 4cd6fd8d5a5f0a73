//! End-to-end pipeline tests against the recording device.

use limn::prelude::*;
use limn::renderer::TraceCall;

fn perspective_camera_at(x: f32, y: f32, z: f32) -> ObjectRef {
    let mut node =
        Object3D::with_kind(ObjectKind::Camera(Camera::perspective(75.0, 1.0, 0.1, 100.0)));
    node.position = Vector3::new(x, y, z);
    node.into_ref()
}

fn red_cube() -> ObjectRef {
    let geometry = box_geometry(1.0, 1.0, 1.0).into_ref();
    let material = Material::basic(Color::from_hex(0xff0000)).into_ref();
    Object3D::with_kind(ObjectKind::Mesh(Mesh::new(geometry, material))).into_ref()
}

fn new_renderer() -> Renderer<TraceDevice> {
    let mut options = RendererOptions::default();
    options.clear_color = Color::from_hex(0x202020);
    options.clear_alpha = 1.0;
    Renderer::new(TraceDevice::new(), options)
}

#[test]
fn empty_scene_clears_and_draws_nothing() {
    let mut renderer = new_renderer();
    let scene = Scene::new();
    let camera = perspective_camera_at(0.0, 0.0, 3.0);

    renderer.device_mut().clear_trace();
    renderer.render(&scene, &camera, None, false).unwrap();

    assert_eq!(renderer.device().draw_call_count(), 0);
    assert_eq!(renderer.stats().calls, 0);

    let cleared = renderer.device().count_calls(|c| {
        matches!(c, TraceCall::Clear { color: true, depth: true, .. })
    });
    assert_eq!(cleared, 1);
}

#[test]
fn single_cube_issues_one_draw_of_36_indices() {
    let mut renderer = new_renderer();
    let scene = Scene::new();
    scene.add(&red_cube());

    let camera = perspective_camera_at(0.0, 0.0, 3.0);
    renderer.render(&scene, &camera, None, false).unwrap();

    let draws = renderer.device().draw_elements_calls();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].1, 36);
    assert_eq!(renderer.stats().calls, 1);
    assert_eq!(renderer.stats().faces, 12);
}

#[test]
fn object_behind_camera_is_culled() {
    let mut renderer = new_renderer();
    let scene = Scene::new();
    let cube = red_cube();
    cube.write().unwrap().position = Vector3::new(0.0, 0.0, 50.0);
    scene.add(&cube);

    let camera = perspective_camera_at(0.0, 0.0, 3.0);
    renderer.render(&scene, &camera, None, false).unwrap();

    assert_eq!(renderer.device().draw_call_count(), 0);
}

#[test]
fn disabling_frustum_culling_draws_anyway() {
    let mut renderer = new_renderer();
    let scene = Scene::new();
    let cube = red_cube();
    cube.write().unwrap().position = Vector3::new(0.0, 0.0, 50.0);
    cube.write().unwrap().frustum_culled = false;
    scene.add(&cube);

    let camera = perspective_camera_at(0.0, 0.0, 3.0);
    renderer.render(&scene, &camera, None, false).unwrap();

    assert_eq!(renderer.device().draw_call_count(), 1);
}

#[test]
fn material_map_toggle_recompiles_and_releases_old_program() {
    let mut renderer = new_renderer();
    let scene = Scene::new();

    // two meshes share one material
    let material = Material::basic(Color::WHITE).into_ref();
    let geometry = box_geometry(1.0, 1.0, 1.0).into_ref();
    for x in [-1.5, 1.5] {
        let mesh = Object3D::with_kind(ObjectKind::Mesh(Mesh::new(
            geometry.clone(),
            material.clone(),
        )))
        .into_ref();
        mesh.write().unwrap().position = Vector3::new(x, 0.0, 0.0);
        scene.add(&mesh);
    }

    let camera = perspective_camera_at(0.0, 0.0, 5.0);
    renderer.render(&scene, &camera, None, false).unwrap();

    assert_eq!(renderer.program_count(), 1);
    assert_eq!(renderer.program_used_times(&material), Some(1));
    assert_eq!(renderer.device().live_program_count(), 1);

    // toggling the map changes the feature vector
    {
        let mut m = material.write().unwrap();
        m.map = Some(Texture::new(Image::new(2, 2, vec![255; 16])).into_ref());
        m.needs_update = true;
    }
    renderer.render(&scene, &camera, None, false).unwrap();

    // one new program, the old one deleted when its refcount hit zero
    let compiled = renderer
        .device()
        .count_calls(|c| matches!(c, TraceCall::CreateProgram(_)));
    assert_eq!(compiled, 2);
    assert_eq!(renderer.program_count(), 1);
    assert_eq!(renderer.device().live_program_count(), 1);
}

#[test]
fn opaque_then_transparent_pass_order() {
    let mut renderer = new_renderer();
    let scene = Scene::new();

    let opaque = red_cube();
    scene.add(&opaque);

    let geometry = box_geometry(1.0, 1.0, 1.0).into_ref();
    let mut glass = Material::basic(Color::from_hex(0x00ff00));
    glass.transparent = true;
    glass.blending = Blending::Additive;
    let transparent =
        Object3D::with_kind(ObjectKind::Mesh(Mesh::new(geometry, glass.into_ref()))).into_ref();
    transparent.write().unwrap().position = Vector3::new(0.0, 0.0, 1.0);
    scene.add(&transparent);

    let camera = perspective_camera_at(0.0, 0.0, 5.0);
    renderer.render(&scene, &camera, None, false).unwrap();

    assert_eq!(renderer.device().draw_call_count(), 2);

    // the additive blend setup happens between the two draws
    let calls = &renderer.device().calls;
    let first_draw = calls
        .iter()
        .position(|c| matches!(c, TraceCall::DrawElements { .. }))
        .unwrap();
    let additive = calls
        .iter()
        .position(|c| {
            matches!(
                c,
                TraceCall::BlendFunc(
                    limn::renderer::gl::BlendFactor::SrcAlpha,
                    limn::renderer::gl::BlendFactor::One,
                )
            )
        })
        .unwrap();
    assert!(additive > first_draw);
}

#[test]
fn override_material_draws_everything_with_one_program() {
    let mut renderer = new_renderer();
    let scene = Scene::new();
    scene.add(&red_cube());
    scene.add(&red_cube());
    scene.set_override_material(Some(Material::new(MaterialKind::Depth).into_ref()));

    let camera = perspective_camera_at(0.0, 0.0, 5.0);
    renderer.render(&scene, &camera, None, false).unwrap();

    assert_eq!(renderer.device().draw_call_count(), 2);
    // only the override material compiled
    assert_eq!(renderer.program_count(), 1);
}

#[test]
fn render_to_target_binds_framebuffer_and_regenerates_mipmaps() {
    let mut renderer = new_renderer();
    let scene = Scene::new();
    scene.add(&red_cube());
    let camera = perspective_camera_at(0.0, 0.0, 3.0);

    let target = RenderTarget::new(256, 256).into_ref();
    renderer.render(&scene, &camera, Some(&target), false).unwrap();

    let bound_offscreen = renderer
        .device()
        .count_calls(|c| matches!(c, TraceCall::BindFramebuffer(Some(_))));
    assert!(bound_offscreen >= 1);

    let mipmaps = renderer
        .device()
        .count_calls(|c| matches!(c, TraceCall::GenerateMipmap(_)));
    assert!(mipmaps >= 1, "mipmap min filter requires regeneration");
}

#[test]
fn removing_object_stops_draws_and_releases_buffers() {
    let mut renderer = new_renderer();
    let scene = Scene::new();
    let cube = red_cube();
    scene.add(&cube);
    let camera = perspective_camera_at(0.0, 0.0, 3.0);

    renderer.render(&scene, &camera, None, false).unwrap();
    assert_eq!(renderer.device().draw_call_count(), 1);
    let live_before = renderer.device().live_buffer_count();
    assert!(live_before > 0);

    scene.remove(&cube);
    renderer.device_mut().clear_trace();
    renderer.render(&scene, &camera, None, false).unwrap();

    assert_eq!(renderer.device().draw_call_count(), 0);
    assert!(renderer.device().live_buffer_count() < live_before);
}

#[test]
fn line_and_particle_system_draw_modes() {
    use limn::renderer::gl::DrawMode;

    let mut renderer = new_renderer();
    let scene = Scene::new();

    let mut line_geometry = Geometry::new();
    line_geometry.vertices = vec![
        Vector3::new(-1.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
    ];
    let line = Object3D::with_kind(ObjectKind::Line(Line::new(
        line_geometry.into_ref(),
        Material::new(MaterialKind::LineBasic).into_ref(),
    )))
    .into_ref();
    scene.add(&line);

    let mut points_geometry = Geometry::new();
    points_geometry.vertices = (0..100)
        .map(|i| Vector3::new(i as f32 * 0.01, 0.0, 0.0))
        .collect();
    let points = Object3D::with_kind(ObjectKind::ParticleSystem(ParticleSystem::new(
        points_geometry.into_ref(),
        Material::new(MaterialKind::ParticleBasic).into_ref(),
    )))
    .into_ref();
    scene.add(&points);

    let camera = perspective_camera_at(0.0, 0.0, 5.0);
    renderer.render(&scene, &camera, None, false).unwrap();

    let arrays: Vec<(DrawMode, usize)> = renderer
        .device()
        .calls
        .iter()
        .filter_map(|c| match c {
            TraceCall::DrawArrays { mode, count, .. } => Some((*mode, *count)),
            _ => None,
        })
        .collect();

    assert!(arrays.contains(&(DrawMode::LineStrip, 3)));
    assert!(arrays.contains(&(DrawMode::Points, 100)));
    assert_eq!(renderer.stats().points, 100);
}

#[test]
fn chunked_buffer_geometry_rebases_attribute_pointers() {
    use limn::geometry::attribute_names;
    use limn::renderer::gl::DrawMode;

    // six vertices; each chunk's local indices are 0..3 and the second
    // chunk re-bases its attribute pointers three vertices in
    let mut geometry = BufferGeometry::new();
    let positions: Vec<f32> = vec![
        0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, // chunk 0
        0.0, 0.0, -1.0, 1.0, 0.0, -1.0, 0.0, 1.0, -1.0, // chunk 1
    ];
    geometry.set_attribute(attribute_names::POSITION, BufferAttribute::new(3, positions));
    geometry.set_index_with_offsets(
        vec![0, 1, 2, 0, 1, 2],
        vec![
            DrawOffset { start: 0, count: 3, index: 0 },
            DrawOffset { start: 3, count: 3, index: 3 },
        ],
    );

    let scene = Scene::new();
    let mesh = Object3D::with_kind(ObjectKind::Mesh(Mesh::with_buffer_geometry(
        geometry.into_ref(),
        Material::basic(Color::WHITE).into_ref(),
    )))
    .into_ref();
    scene.add(&mesh);

    let mut renderer = new_renderer();
    let camera = perspective_camera_at(0.0, 0.0, 5.0);
    renderer.render(&scene, &camera, None, false).unwrap();

    let draws = renderer.device().draw_elements_calls();
    assert_eq!(
        draws,
        vec![(DrawMode::Triangles, 3), (DrawMode::Triangles, 3)]
    );

    let rebased = renderer
        .device()
        .count_calls(|c| matches!(c, TraceCall::VertexAttribPointer(_, 3, 3)));
    assert!(rebased >= 1, "second chunk must re-base its pointers");
}

#[test]
fn overflowing_buffer_geometry_chunk_is_skipped() {
    use limn::geometry::attribute_names;

    let mut geometry = BufferGeometry::new();
    let positions: Vec<f32> = vec![
        0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0,
        0.0, 0.0, -1.0, 1.0, 0.0, -1.0, 0.0, 1.0, -1.0,
    ];
    geometry.set_attribute(attribute_names::POSITION, BufferAttribute::new(3, positions));
    geometry.set_index_with_offsets(
        vec![0, 1, 2, 0, 1, 2],
        vec![
            DrawOffset { start: 0, count: 3, index: 0 },
            // base vertex pushes the chunk's largest index past u16::MAX
            DrawOffset { start: 3, count: 3, index: 65_534 },
        ],
    );

    let scene = Scene::new();
    let mesh = Object3D::with_kind(ObjectKind::Mesh(Mesh::with_buffer_geometry(
        geometry.into_ref(),
        Material::basic(Color::WHITE).into_ref(),
    )))
    .into_ref();
    scene.add(&mesh);

    let mut renderer = new_renderer();
    let camera = perspective_camera_at(0.0, 0.0, 5.0);
    renderer.render(&scene, &camera, None, false).unwrap();

    // only the addressable chunk drew
    assert_eq!(renderer.device().draw_elements_calls().len(), 1);
}

#[test]
fn precision_downgrades_when_highp_unsupported() {
    use limn::renderer::gl::DeviceCapabilities;

    let caps = DeviceCapabilities {
        highp_float_supported: false,
        ..Default::default()
    };
    let renderer = Renderer::new(
        TraceDevice::with_capabilities(caps),
        RendererOptions::default(),
    );
    assert_eq!(renderer.options().precision, Precision::Medium);
}
