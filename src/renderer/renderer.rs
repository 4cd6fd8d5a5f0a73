//! The renderer core: drives the per-frame pipeline against a
//! [`GlDevice`].

use super::buffers::{self, DirectBuffers, MeshAttributeSet};
use super::gl::{
    BufferTarget, BufferUsage, DeviceCapabilities, DrawMode, FramebufferHandle, GlDevice,
    PixelLayout, SamplerParams, TextureHandle, TextureTarget,
};
use super::lights::{allocate_lights, LightArrays, LightCount};
use super::program::{GlobalShaderFlags, Program, ProgramCache, ProgramFeatures};
use super::shaders::ShaderLib;
use super::state::GlState;
use super::target::RenderTargetRef;
use super::uniforms::{UniformMap, UniformValue};
use crate::core::{Id, Precision, RendererOptions};
use crate::geometry::{BufferGeometryRef, GeometryDirty, GeometryRef};
use crate::material::{Blending, Material, MaterialKind, MaterialRef, Side, VertexColorMode};
use crate::math::{Color, Frustum, Matrix3, Matrix4, Vector3};
use crate::objects::{LineType, Mesh, MeshGeometry};
use crate::scene::{Fog, Object3D, ObjectKind, ObjectRef, Scene};
use crate::texture::{
    Filter, Image, TextureDataType, TextureFormat, TextureRef, TextureSource, Wrapping,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Hard renderer failures. Per-object problems never surface here; they
/// downgrade the object and log instead.
#[derive(Debug, Error)]
pub enum RendererError {
    /// `render` was called with a node that has no camera payload.
    #[error("render camera node has no camera payload")]
    NotACamera,
    /// `render` was called with a scene whose root lost its payload.
    #[error("scene root is missing its scene payload")]
    NotAScene,
}

/// Per-frame draw statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderStats {
    /// Draw calls issued.
    pub calls: u32,
    /// Vertices submitted.
    pub vertices: u32,
    /// Triangles submitted.
    pub faces: u32,
    /// Points submitted.
    pub points: u32,
    /// Frames rendered since construction.
    pub frame: u64,
}

/// Which buffer a render item draws.
#[derive(Debug, Clone)]
pub(crate) enum RenderBuffer {
    /// One geometry group of a face-based mesh.
    MeshGroup {
        /// The mesh geometry.
        geometry: GeometryRef,
        /// Group index within the geometry.
        group: usize,
    },
    /// A pre-attributed buffer geometry.
    MeshDirect {
        /// The buffer geometry.
        geometry: BufferGeometryRef,
    },
    /// Flat vertex arrays (lines and particle systems).
    Flat {
        /// The source geometry.
        geometry: GeometryRef,
    },
}

/// One entry of a scene's flattened render list.
#[derive(Debug)]
pub struct RenderItem {
    pub(crate) object: ObjectRef,
    pub(crate) buffer: RenderBuffer,
    pub(crate) opaque: Option<MaterialRef>,
    pub(crate) transparent: Option<MaterialRef>,
    pub(crate) render: bool,
    pub(crate) z: f32,
    pub(crate) model_view: Matrix4,
    pub(crate) normal_matrix: Matrix3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Opaque,
    Transparent,
    Override,
}

/// Snapshot of the camera state a frame renders with.
#[derive(Debug, Clone)]
struct FrameCamera {
    projection: Matrix4,
    view: Matrix4,
    position: Vector3,
    near: f32,
    far: f32,
    node_id: Id,
}

/// The renderer. Owns the device, the program cache, all GPU handles
/// and the per-frame pipeline.
pub struct Renderer<D: GlDevice> {
    device: D,
    caps: DeviceCapabilities,
    options: RendererOptions,

    /// Clear the target at frame start.
    pub auto_clear: bool,
    /// Clear the color buffer when clearing.
    pub auto_clear_color: bool,
    /// Clear the depth buffer when clearing.
    pub auto_clear_depth: bool,
    /// Clear the stencil buffer when clearing.
    pub auto_clear_stencil: bool,
    /// Painter-sort objects by eye-space depth.
    pub sort_objects: bool,
    /// Drain scene add/remove queues and sync dirty geometry each frame.
    pub auto_update_objects: bool,
    /// Update scene world matrices each frame.
    pub auto_update_scene: bool,
    /// Treat inputs (colors, maps) as gamma-encoded.
    pub gamma_input: bool,
    /// Convert final colors to gamma space.
    pub gamma_output: bool,
    /// Shadow sampling compiled into lit programs.
    pub shadow_map_enabled: bool,
    /// Soft (PCF) shadow lookups.
    pub shadow_map_soft: bool,
    /// Morph target attribute slots compiled into programs.
    pub max_morph_targets: usize,
    /// Morph normal attribute slots compiled into programs.
    pub max_morph_normals: usize,

    state: GlState,
    programs: ProgramCache,
    lights: LightArrays,
    lights_need_update: bool,
    light_count: LightCount,
    frustum: Frustum,
    proj_screen: Matrix4,

    current_program: Option<u64>,
    current_material: Option<Id>,
    current_camera: Option<Id>,
    current_geometry_group_hash: Option<u64>,
    current_framebuffer: Option<FramebufferHandle>,
    framebuffer_known: bool,
    used_texture_units: u32,

    direct_buffers: HashMap<u64, DirectBuffers>,
    group_counter: u64,
    fallback_texture: Option<TextureHandle>,

    viewport: (i32, i32, u32, u32),
    current_size: (u32, u32),

    plugins_pre: Vec<Box<dyn super::plugin::RenderPlugin<D>>>,
    plugins_post: Vec<Box<dyn super::plugin::RenderPlugin<D>>>,

    stats: RenderStats,
}

impl<D: GlDevice> Renderer<D> {
    /// Create a renderer over a device. The requested precision is
    /// downgraded when the device reports insufficient float support.
    pub fn new(device: D, mut options: RendererOptions) -> Self {
        let caps = device.capabilities();

        let requested = options.precision;
        if options.precision == Precision::High && !caps.highp_float_supported {
            options.precision = Precision::Medium;
        }
        if options.precision == Precision::Medium && !caps.mediump_float_supported {
            options.precision = Precision::Low;
        }
        if options.precision != requested {
            log::warn!(
                "shader precision downgraded from {requested:?} to {:?}",
                options.precision
            );
        }

        let width = options.width;
        let height = options.height;

        let mut renderer = Self {
            device,
            caps,
            options,
            auto_clear: true,
            auto_clear_color: true,
            auto_clear_depth: true,
            auto_clear_stencil: true,
            sort_objects: true,
            auto_update_objects: true,
            auto_update_scene: true,
            gamma_input: false,
            gamma_output: false,
            shadow_map_enabled: false,
            shadow_map_soft: true,
            max_morph_targets: 8,
            max_morph_normals: 4,
            state: GlState::new(),
            programs: ProgramCache::new(),
            lights: LightArrays::default(),
            lights_need_update: true,
            light_count: LightCount::default(),
            frustum: Frustum::default(),
            proj_screen: Matrix4::IDENTITY,
            current_program: None,
            current_material: None,
            current_camera: None,
            current_geometry_group_hash: None,
            current_framebuffer: None,
            framebuffer_known: false,
            used_texture_units: 0,
            direct_buffers: HashMap::new(),
            group_counter: 0,
            fallback_texture: None,
            viewport: (0, 0, width, height),
            current_size: (width, height),
            plugins_pre: Vec::new(),
            plugins_post: Vec::new(),
            stats: RenderStats::default(),
        };

        renderer.set_default_state();
        renderer
    }

    fn set_default_state(&mut self) {
        let clear = self.options.clear_color;
        let alpha = self.options.clear_alpha;
        self.device.clear_color(clear.r, clear.g, clear.b, alpha);
        self.device.set_depth_test(true);
        self.device.set_depth_write(true);
        self.device.set_cull_face_enabled(true);
        self.device.front_face(super::gl::FrontFaceDirection::Ccw);
        self.device.cull_face(super::gl::CullFace::Back);
        let (x, y, w, h) = self.viewport;
        self.device.viewport(x, y, w, h);
    }

    /// The wrapped device, for plugins and tests.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Mutable device access.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Last frame's statistics.
    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// Number of live programs in the cache.
    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    /// Refcount of a material's current program, for assertions.
    pub fn program_used_times(&self, material: &MaterialRef) -> Option<u32> {
        let guard = material.read().ok()?;
        let program = guard.program()?;
        self.programs.used_times(program)
    }

    /// Resolved renderer options (after precision downgrade).
    pub fn options(&self) -> &RendererOptions {
        &self.options
    }

    /// Register a pre-pass plugin.
    pub fn add_pre_plugin(&mut self, plugin: Box<dyn super::plugin::RenderPlugin<D>>) {
        self.plugins_pre.push(plugin);
    }

    /// Register a post-pass plugin.
    pub fn add_post_plugin(&mut self, plugin: Box<dyn super::plugin::RenderPlugin<D>>) {
        self.plugins_post.push(plugin);
    }

    /// Resize the drawing buffer and viewport.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.options.width = width;
        self.options.height = height;
        self.set_viewport(0, 0, width, height);
    }

    /// Set the viewport.
    pub fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.viewport = (x, y, width, height);
        self.current_size = (width, height);
        self.device.viewport(x, y, width, height);
    }

    /// Set the scissor rectangle.
    pub fn set_scissor(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.device.scissor(x, y, width, height);
    }

    /// Enable or disable scissor testing.
    pub fn enable_scissor_test(&mut self, enabled: bool) {
        self.device.set_scissor_test(enabled);
    }

    /// Set the clear color.
    pub fn set_clear_color(&mut self, color: Color, alpha: f32) {
        self.options.clear_color = color;
        self.options.clear_alpha = alpha;
        self.device.clear_color(color.r, color.g, color.b, alpha);
    }

    /// Clear the bound target.
    pub fn clear(&mut self, color: bool, depth: bool, stencil: bool) {
        self.device.clear(color, depth, stencil);
    }

    /// Bind a target and clear it.
    pub fn clear_target(
        &mut self,
        target: Option<&RenderTargetRef>,
        color: bool,
        depth: bool,
        stencil: bool,
    ) {
        self.set_render_target(target);
        self.clear(color, depth, stencil);
    }

    // ------------------------------------------------------------------
    // frame
    // ------------------------------------------------------------------

    /// Render a scene from a camera node, optionally into a target.
    ///
    /// The per-frame sequence is: reset caches, update world matrices,
    /// refresh camera matrices and the frustum, drain the scene's object
    /// queues and sync dirty geometry, run pre-plugins, bind and clear
    /// the target, cull/sort, draw the opaque then transparent passes
    /// (or everything with the scene's override material), run
    /// post-plugins, regenerate target mipmaps, and restore depth state.
    pub fn render(
        &mut self,
        scene: &Scene,
        camera: &ObjectRef,
        target: Option<&RenderTargetRef>,
        force_clear: bool,
    ) -> Result<(), RendererError> {
        // frame caches
        self.current_program = None;
        self.current_material = None;
        self.current_geometry_group_hash = None;
        self.current_camera = None;
        self.lights_need_update = true;

        if self.auto_update_scene {
            scene.update_matrix_world();
        }

        let frame_camera = self.update_camera(camera)?;
        self.proj_screen = frame_camera.projection.multiply(&frame_camera.view);
        self.frustum.set_from_matrix(&self.proj_screen);

        if self.auto_update_objects {
            self.init_objects(scene)?;
        }

        let lights: Vec<ObjectRef> = scene
            .with_data(|data| data.lights.clone())
            .ok_or(RendererError::NotAScene)?;
        let fog = scene.with_data(|data| data.fog.clone()).flatten();
        let override_material = scene
            .with_data(|data| data.override_material.clone())
            .flatten();

        self.light_count = allocate_lights(&lights, self.options.max_lights);

        self.run_plugins(scene, camera, true);

        self.stats.calls = 0;
        self.stats.vertices = 0;
        self.stats.faces = 0;
        self.stats.points = 0;
        self.stats.frame += 1;

        self.set_render_target(target);
        if self.auto_clear || force_clear {
            self.clear(
                self.auto_clear_color,
                self.auto_clear_depth,
                self.auto_clear_stencil,
            );
        }

        // cull, classify, compute matrices
        let mut items = scene
            .with_data_mut(|data| std::mem::take(&mut data.render_items))
            .ok_or(RendererError::NotAScene)?;

        for item in &mut items {
            item.render = false;

            let Ok(object) = item.object.read() else {
                continue;
            };
            if !object.visible {
                continue;
            }

            let cullable = matches!(
                object.kind,
                ObjectKind::Mesh(_) | ObjectKind::ParticleSystem(_)
            );
            if cullable && object.frustum_culled && !self.object_in_frustum(&object) {
                continue;
            }

            item.model_view = frame_camera.view.multiply(&object.matrix_world);
            item.normal_matrix = Matrix3::normal_matrix(&item.model_view);
            item.render = true;

            let material = self.resolve_item_material(&object, &item.buffer);
            let transparent = material
                .as_ref()
                .and_then(|m| m.read().ok().map(|m| m.transparent))
                .unwrap_or(false);
            if transparent {
                item.transparent = material;
                item.opaque = None;
            } else {
                item.opaque = material;
                item.transparent = None;
            }

            if self.sort_objects {
                item.z = if object.render_depth != 0.0 {
                    object.render_depth
                } else {
                    self.proj_screen
                        .transform_point(&object.matrix_world.get_position())
                        .z
                };
            }
        }

        if self.sort_objects {
            // painter order: far first; the opaque pass walks it backward
            items.sort_by(|a, b| b.z.partial_cmp(&a.z).unwrap_or(std::cmp::Ordering::Equal));
        }

        if let Some(override_material) = &override_material {
            if let Ok(material) = override_material.read() {
                self.state.set_blending(
                    &mut self.device,
                    material.blending,
                    material.blend_equation,
                    material.blend_src,
                    material.blend_dst,
                );
                self.state.set_depth_test(&mut self.device, material.depth_test);
                self.state
                    .set_depth_write(&mut self.device, material.depth_write);
                self.state.set_polygon_offset(
                    &mut self.device,
                    material.polygon_offset,
                    material.polygon_offset_factor,
                    material.polygon_offset_units,
                );
            }
            self.render_pass(
                &items,
                Pass::Override,
                false,
                &frame_camera,
                &lights,
                &fog,
                true,
                Some(override_material),
            );
        } else {
            // opaque front-to-back with normal blending
            self.state.set_blending(
                &mut self.device,
                Blending::Normal,
                Default::default(),
                Default::default(),
                Default::default(),
            );
            self.render_pass(
                &items,
                Pass::Opaque,
                true,
                &frame_camera,
                &lights,
                &fog,
                false,
                None,
            );
            // transparent back-to-front with material blending
            self.render_pass(
                &items,
                Pass::Transparent,
                false,
                &frame_camera,
                &lights,
                &fog,
                true,
                None,
            );
        }

        scene.with_data_mut(|data| data.render_items = items);

        self.run_plugins(scene, camera, false);

        if let Some(target) = target {
            if let Ok(target) = target.read() {
                if target.needs_mipmap_regen() {
                    target.update_mipmaps(&mut self.device);
                }
            }
        }

        self.state.set_depth_test(&mut self.device, true);
        self.state.set_depth_write(&mut self.device, true);

        Ok(())
    }

    fn run_plugins(&mut self, scene: &Scene, camera: &ObjectRef, pre: bool) {
        let mut plugins = if pre {
            std::mem::take(&mut self.plugins_pre)
        } else {
            std::mem::take(&mut self.plugins_post)
        };

        for plugin in &mut plugins {
            self.reset_state_caches();
            let (w, h) = self.current_size;
            plugin.render(&mut self.device, scene, camera, w, h);
            self.reset_state_caches();
        }

        if pre {
            self.plugins_pre = plugins;
        } else {
            self.plugins_post = plugins;
        }
    }

    fn reset_state_caches(&mut self) {
        self.state.reset();
        self.current_program = None;
        self.current_material = None;
        self.current_camera = None;
        self.current_geometry_group_hash = None;
        self.lights_need_update = true;
        self.device.use_program(None);
    }

    fn update_camera(&mut self, camera: &ObjectRef) -> Result<FrameCamera, RendererError> {
        let has_parent = camera
            .read()
            .ok()
            .map(|c| c.parent().is_some())
            .unwrap_or(false);
        if !has_parent {
            Object3D::update_matrix_world(camera, false);
        }

        let mut guard = camera.write().map_err(|_| RendererError::NotACamera)?;
        let world = guard.matrix_world;
        let node_id = guard.id();
        let ObjectKind::Camera(payload) = &mut guard.kind else {
            return Err(RendererError::NotACamera);
        };

        payload.matrix_world_inverse = world.inverse();

        Ok(FrameCamera {
            projection: payload.projection_matrix,
            view: payload.matrix_world_inverse,
            position: world.get_position(),
            near: payload.near(),
            far: payload.far(),
            node_id,
        })
    }

    fn object_in_frustum(&self, object: &Object3D) -> bool {
        let sphere = match &object.kind {
            ObjectKind::Mesh(mesh) => match &mesh.geometry {
                MeshGeometry::Faces(geometry) => {
                    let Ok(mut g) = geometry.write() else {
                        return true;
                    };
                    if g.bounding_sphere.is_none() {
                        g.compute_bounding_sphere();
                    }
                    g.bounding_sphere
                }
                MeshGeometry::Buffer(geometry) => {
                    let Ok(mut g) = geometry.write() else {
                        return true;
                    };
                    if g.bounding_sphere.is_none() {
                        g.compute_bounding_sphere();
                    }
                    g.bounding_sphere
                }
            },
            ObjectKind::ParticleSystem(system) => {
                let Ok(mut g) = system.geometry.write() else {
                    return true;
                };
                if g.bounding_sphere.is_none() {
                    g.compute_bounding_sphere();
                }
                g.bounding_sphere
            }
            _ => None,
        };

        match sphere {
            Some(sphere) => self
                .frustum
                .intersects_sphere(&sphere.apply_matrix4(&object.matrix_world)),
            None => true,
        }
    }

    fn resolve_item_material(
        &self,
        object: &Object3D,
        buffer: &RenderBuffer,
    ) -> Option<MaterialRef> {
        match &object.kind {
            ObjectKind::Mesh(mesh) => {
                if !mesh.materials.is_empty() {
                    if let RenderBuffer::MeshGroup { geometry, group } = buffer {
                        let index = geometry
                            .read()
                            .ok()
                            .and_then(|g| g.groups().get(*group).map(|g| g.material_index))
                            .unwrap_or(0);
                        return mesh.materials.get(index).cloned().or_else(|| Some(mesh.material.clone()));
                    }
                }
                Some(mesh.material.clone())
            }
            ObjectKind::Line(line) => Some(line.material.clone()),
            ObjectKind::ParticleSystem(system) => Some(system.material.clone()),
            ObjectKind::Particle(particle) => Some(particle.material.clone()),
            ObjectKind::Sprite(sprite) => Some(sprite.material.clone()),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // scene object lifecycle
    // ------------------------------------------------------------------

    /// Drain the scene's added/removed queues in FIFO order, then sync
    /// dirty geometry of every live item.
    fn init_objects(&mut self, scene: &Scene) -> Result<(), RendererError> {
        loop {
            let added = scene
                .with_data_mut(|data| data.objects_added.pop_front())
                .ok_or(RendererError::NotAScene)?;
            match added {
                Some(object) => self.add_object(scene, &object),
                None => break,
            }
        }

        loop {
            let removed = scene
                .with_data_mut(|data| data.objects_removed.pop_front())
                .ok_or(RendererError::NotAScene)?;
            match removed {
                Some(object) => self.remove_object(scene, &object),
                None => break,
            }
        }

        // update after adds/removes
        let mut items = scene
            .with_data_mut(|data| std::mem::take(&mut data.render_items))
            .ok_or(RendererError::NotAScene)?;
        for item in &items {
            self.update_object(item);
        }
        scene.with_data_mut(|data| data.render_items = items);

        Ok(())
    }

    fn add_object(&mut self, scene: &Scene, object: &ObjectRef) {
        let Ok(guard) = object.read() else { return };

        let mut new_items: Vec<RenderItem> = Vec::new();

        match &guard.kind {
            ObjectKind::Mesh(mesh) => match &mesh.geometry {
                MeshGeometry::Faces(geometry) => {
                    let Ok(mut g) = geometry.write() else { return };
                    if let Err(reason) = g.validate() {
                        log::warn!("skipping invalid geometry: {reason}");
                        return;
                    }
                    if g.groups().is_empty() {
                        g.sort_faces_by_material();
                    }

                    let attributes = MeshAttributeSet::from_geometry(&g);
                    let mut fresh = false;
                    let mut groups = std::mem::take(&mut g.groups);
                    for group in &mut groups {
                        if !group.buffers_created {
                            self.group_counter += 1;
                            group.id = self.group_counter;
                            buffers::create_mesh_buffers(&mut self.device, group, attributes);
                            fresh = true;
                        }
                    }
                    let group_count = groups.len();
                    g.groups = groups;
                    if fresh {
                        g.dirty = GeometryDirty::all();
                    }
                    drop(g);

                    for index in 0..group_count {
                        new_items.push(self.new_item(
                            object,
                            RenderBuffer::MeshGroup {
                                geometry: Arc::clone(geometry),
                                group: index,
                            },
                        ));
                    }
                }
                MeshGeometry::Buffer(geometry) => {
                    if let Ok(mut g) = geometry.write() {
                        let dynamic = g.dynamic;
                        buffers::set_buffer_geometry(
                            &mut self.device,
                            &mut g,
                            if dynamic { BufferUsage::Dynamic } else { BufferUsage::Static },
                            !dynamic,
                        );
                    }
                    new_items.push(self.new_item(
                        object,
                        RenderBuffer::MeshDirect {
                            geometry: Arc::clone(geometry),
                        },
                    ));
                }
            },
            ObjectKind::Line(line) => {
                if let Ok(mut g) = line.geometry.write() {
                    g.dirty = GeometryDirty::all();
                }
                new_items.push(self.new_item(
                    object,
                    RenderBuffer::Flat {
                        geometry: Arc::clone(&line.geometry),
                    },
                ));
            }
            ObjectKind::ParticleSystem(system) => {
                if let Ok(mut g) = system.geometry.write() {
                    g.dirty = GeometryDirty::all();
                }
                new_items.push(self.new_item(
                    object,
                    RenderBuffer::Flat {
                        geometry: Arc::clone(&system.geometry),
                    },
                ));
            }
            // particles and sprites draw through the projector or a
            // plugin, not the buffer pipeline
            ObjectKind::Particle(_) | ObjectKind::Sprite(_) => {}
            _ => {}
        }

        drop(guard);

        if !new_items.is_empty() {
            scene.with_data_mut(|data| data.render_items.extend(new_items.drain(..)));
        }
    }

    fn new_item(&self, object: &ObjectRef, buffer: RenderBuffer) -> RenderItem {
        RenderItem {
            object: Arc::clone(object),
            buffer,
            opaque: None,
            transparent: None,
            render: false,
            z: 0.0,
            model_view: Matrix4::IDENTITY,
            normal_matrix: Matrix3::IDENTITY,
        }
    }

    fn remove_object(&mut self, scene: &Scene, object: &ObjectRef) {
        let removed: Vec<RenderItem> = scene
            .with_data_mut(|data| {
                let mut removed = Vec::new();
                let mut index = 0;
                while index < data.render_items.len() {
                    if Arc::ptr_eq(&data.render_items[index].object, object) {
                        removed.push(data.render_items.remove(index));
                    } else {
                        index += 1;
                    }
                }
                removed
            })
            .unwrap_or_default();

        // release buffers unless another live item shares the geometry
        for item in removed {
            match item.buffer {
                RenderBuffer::MeshGroup { geometry, .. } => {
                    let still_used = scene
                        .with_data(|data| {
                            data.render_items.iter().any(|other| match &other.buffer {
                                RenderBuffer::MeshGroup { geometry: g, .. } => {
                                    Arc::ptr_eq(g, &geometry)
                                }
                                _ => false,
                            })
                        })
                        .unwrap_or(false);
                    if !still_used {
                        if let Ok(mut g) = geometry.write() {
                            let mut groups = std::mem::take(&mut g.groups);
                            for group in &mut groups {
                                for handle in group.take_buffers() {
                                    self.device.delete_buffer(handle);
                                }
                            }
                            g.groups = groups;
                        }
                    }
                }
                RenderBuffer::Flat { geometry } => {
                    let id = geometry.read().map(|g| g.id().value()).unwrap_or(0);
                    let still_used = scene
                        .with_data(|data| {
                            data.render_items.iter().any(|other| match &other.buffer {
                                RenderBuffer::Flat { geometry: g } => Arc::ptr_eq(g, &geometry),
                                _ => false,
                            })
                        })
                        .unwrap_or(false);
                    if !still_used {
                        if let Some(mut buffers) = self.direct_buffers.remove(&id) {
                            for handle in buffers.take_buffers() {
                                self.device.delete_buffer(handle);
                            }
                        }
                    }
                }
                RenderBuffer::MeshDirect { geometry } => {
                    let still_used = scene
                        .with_data(|data| {
                            data.render_items.iter().any(|other| match &other.buffer {
                                RenderBuffer::MeshDirect { geometry: g } => {
                                    Arc::ptr_eq(g, &geometry)
                                }
                                _ => false,
                            })
                        })
                        .unwrap_or(false);
                    if !still_used {
                        if let Ok(mut g) = geometry.write() {
                            for attribute in g.attributes.values_mut() {
                                if let Some(handle) = attribute.buffer.take() {
                                    self.device.delete_buffer(handle);
                                }
                            }
                            if let Some(handle) = g.index_buffer.take() {
                                self.device.delete_buffer(handle);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Sync one item's geometry to the GPU if any dirty flag is set.
    fn update_object(&mut self, item: &RenderItem) {
        let Ok(object) = item.object.read() else { return };

        match (&object.kind, &item.buffer) {
            (ObjectKind::Mesh(_), RenderBuffer::MeshGroup { geometry, group }) => {
                let material = self.resolve_item_material(&object, &item.buffer);
                let Some(material) = material else { return };
                let Ok(mut material) = material.write() else { return };

                let Ok(mut g) = geometry.write() else { return };
                let dirty = g.dirty;
                if !dirty.any() && !material.custom_attributes_dirty() {
                    return;
                }

                let attributes = MeshAttributeSet::from_geometry(&g);
                let dynamic = g.dynamic;
                let usage = if dynamic { BufferUsage::Dynamic } else { BufferUsage::Static };

                let mut groups = std::mem::take(&mut g.groups);
                if let Some(target) = groups.get_mut(*group) {
                    buffers::set_mesh_buffers(
                        &mut self.device,
                        &g,
                        target,
                        dirty,
                        attributes,
                        usage,
                        !dynamic,
                        &material,
                        false,
                    );
                }
                let last_group = *group + 1 == groups.len();
                g.groups = groups;

                // flags clear after the final group of this geometry
                if last_group {
                    g.dirty.clear();
                    material.clear_custom_attribute_flags();
                }
            }
            (ObjectKind::Mesh(_), RenderBuffer::MeshDirect { geometry }) => {
                if let Ok(mut g) = geometry.write() {
                    let needs = g.index_needs_update
                        || g.attributes.values().any(|a| a.needs_update);
                    if needs {
                        let dynamic = g.dynamic;
                        buffers::set_buffer_geometry(
                            &mut self.device,
                            &mut g,
                            if dynamic { BufferUsage::Dynamic } else { BufferUsage::Static },
                            !dynamic,
                        );
                    }
                }
            }
            (ObjectKind::Line(line), RenderBuffer::Flat { geometry }) => {
                let dashed = line
                    .material
                    .read()
                    .map(|m| matches!(m.kind, MaterialKind::LineDashed))
                    .unwrap_or(false);
                if let Ok(mut g) = geometry.write() {
                    if dashed && g.line_distances.len() != g.vertices.len() {
                        g.compute_line_distances();
                        g.dirty.line_distances = true;
                    }
                    let id = g.id().value();
                    let dirty = g.dirty;
                    let entry = self.direct_buffers.entry(id).or_default();
                    if dirty.vertices || dirty.colors || dirty.line_distances
                        || entry.vertex_buffer.is_none()
                    {
                        buffers::set_direct_buffers(
                            &mut self.device,
                            entry,
                            &g,
                            dirty,
                            dashed,
                            BufferUsage::Dynamic,
                        );
                    }
                    g.dirty.vertices = false;
                    g.dirty.colors = false;
                    g.dirty.line_distances = false;
                }
            }
            (ObjectKind::ParticleSystem(system), RenderBuffer::Flat { geometry }) => {
                if let Ok(mut g) = geometry.write() {
                    let id = g.id().value();
                    let mut dirty = g.dirty;
                    // sorted systems rewrite positions every frame
                    dirty.vertices |= system.sort_particles;
                    let entry = self.direct_buffers.entry(id).or_default();
                    if dirty.vertices || dirty.colors || entry.vertex_buffer.is_none() {
                        buffers::set_direct_buffers(
                            &mut self.device,
                            entry,
                            &g,
                            dirty,
                            false,
                            BufferUsage::Dynamic,
                        );
                    }
                    g.dirty.vertices = false;
                    g.dirty.colors = false;
                }
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // passes and draw dispatch
    // ------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn render_pass(
        &mut self,
        items: &[RenderItem],
        pass: Pass,
        reverse: bool,
        camera: &FrameCamera,
        lights: &[ObjectRef],
        fog: &Option<Fog>,
        use_blending: bool,
        override_material: Option<&MaterialRef>,
    ) {
        let order: Vec<usize> = if reverse {
            (0..items.len()).rev().collect()
        } else {
            (0..items.len()).collect()
        };

        for index in order {
            let item = &items[index];
            if !item.render {
                continue;
            }

            let material = match override_material {
                Some(material) => material.clone(),
                None => {
                    let slot = match pass {
                        Pass::Opaque => &item.opaque,
                        Pass::Transparent => &item.transparent,
                        Pass::Override => &item.opaque,
                    };
                    match slot {
                        Some(material) => material.clone(),
                        None => continue,
                    }
                }
            };

            if override_material.is_none() {
                let Ok(m) = material.read() else { continue };
                if use_blending {
                    self.state.set_blending(
                        &mut self.device,
                        m.blending,
                        m.blend_equation,
                        m.blend_src,
                        m.blend_dst,
                    );
                }
                self.state.set_depth_test(&mut self.device, m.depth_test);
                self.state.set_depth_write(&mut self.device, m.depth_write);
                self.state.set_polygon_offset(
                    &mut self.device,
                    m.polygon_offset,
                    m.polygon_offset_factor,
                    m.polygon_offset_units,
                );
                self.state.set_material_faces(&mut self.device, &m);
            } else if let Ok(m) = material.read() {
                self.state.set_material_faces(&mut self.device, &m);
            }

            self.render_item(&items[index], &material, camera, lights, fog);
        }
    }

    fn render_item(
        &mut self,
        item: &RenderItem,
        material_ref: &MaterialRef,
        camera: &FrameCamera,
        lights: &[ObjectRef],
        fog: &Option<Fog>,
    ) {
        let visible = material_ref.read().map(|m| m.visible).unwrap_or(false);
        if !visible {
            return;
        }

        let Some(program) =
            self.set_program(item, material_ref, camera, lights, fog)
        else {
            return;
        };

        let Ok(object) = item.object.read() else { return };
        let Ok(material) = material_ref.read() else { return };

        match (&object.kind, &item.buffer) {
            (ObjectKind::Mesh(mesh), RenderBuffer::MeshGroup { geometry, group }) => {
                self.draw_mesh_group(&program, &material, mesh, geometry, *group);
            }
            (ObjectKind::Mesh(_), RenderBuffer::MeshDirect { geometry }) => {
                self.draw_buffer_geometry(&program, geometry);
            }
            (ObjectKind::Line(line), RenderBuffer::Flat { geometry }) => {
                let mode = match line.line_type {
                    LineType::Strip => DrawMode::LineStrip,
                    LineType::Pieces => DrawMode::Lines,
                };
                self.state.set_line_width(&mut self.device, material.linewidth);
                self.draw_flat(&program, geometry, mode, &material);
            }
            (ObjectKind::ParticleSystem(_), RenderBuffer::Flat { geometry }) => {
                self.draw_flat(&program, geometry, DrawMode::Points, &material);
            }
            _ => {}
        }
    }

    fn draw_mesh_group(
        &mut self,
        program: &Arc<Program>,
        material: &Material,
        mesh: &Mesh,
        geometry: &GeometryRef,
        group_index: usize,
    ) {
        let Ok(geometry) = geometry.read() else { return };
        let Some(group) = geometry.groups().get(group_index) else {
            return;
        };

        let wireframe_bit = if material.wireframe { 1 } else { 0 };
        let hash = group.id * 0xffffff + program.id * 2 + wireframe_bit;
        let rebind = self.current_geometry_group_hash != Some(hash);
        if rebind {
            self.current_geometry_group_hash = Some(hash);

            let morphing = material.morph_targets && !group.morph_target_buffers.is_empty();
            if !morphing {
                self.bind_attribute(program, "position", group.vertex_buffer, 3, 0);
            }

            self.bind_attribute(program, "normal", group.normal_buffer, 3, 0);
            self.bind_attribute(program, "tangent", group.tangent_buffer, 4, 0);
            self.bind_attribute(program, "color", group.color_buffer, 3, 0);
            self.bind_attribute(program, "uv", group.uv_buffer, 2, 0);
            self.bind_attribute(program, "uv2", group.uv2_buffer, 2, 0);

            if material.skinning {
                self.bind_attribute(program, "skinIndex", group.skin_index_buffer, 4, 0);
                self.bind_attribute(program, "skinWeight", group.skin_weight_buffer, 4, 0);
            }

            for (name, attribute) in &material.attributes {
                if let Some(buffer) = group.custom_buffers.get(name) {
                    self.bind_attribute(
                        program,
                        name,
                        Some(*buffer),
                        attribute.size.item_size() as u32,
                        0,
                    );
                }
            }
        }

        if material.morph_targets && !group.morph_target_buffers.is_empty() {
            self.setup_morph_targets(program, material, mesh, &geometry, group_index);
        }

        let group = &geometry.groups()[group_index];

        if material.wireframe {
            self.state
                .set_line_width(&mut self.device, material.wireframe_linewidth);
            if rebind {
                if let Some(buffer) = group.line_buffer {
                    self.device.bind_buffer(BufferTarget::ElementArray, buffer);
                }
            }
            self.device
                .draw_elements(DrawMode::Lines, group.line_index_count, 0);
        } else {
            if rebind {
                if let Some(buffer) = group.face_buffer {
                    self.device.bind_buffer(BufferTarget::ElementArray, buffer);
                }
            }
            self.device
                .draw_elements(DrawMode::Triangles, group.face_index_count, 0);
            self.stats.vertices += group.face_index_count as u32;
            self.stats.faces += group.face_index_count as u32 / 3;
        }

        self.stats.calls += 1;
    }

    fn draw_buffer_geometry(&mut self, program: &Arc<Program>, geometry: &BufferGeometryRef) {
        let Ok(geometry) = geometry.read() else { return };

        // attribute rebinds keyed on the geometry id
        let hash = geometry.id().value() * 0xffffff + program.id * 2;
        let cached = self.current_geometry_group_hash == Some(hash);

        if geometry.index.is_some() {
            // a chunk with a base vertex re-bases the attribute pointers,
            // since the device has no base-vertex draw; with several
            // chunks the pointers change per draw, so the rebind cache
            // only applies to the single zero-based chunk case
            let rebases = geometry.offsets.len() > 1
                || geometry.offsets.first().is_some_and(|o| o.index != 0);

            for offset in &geometry.offsets {
                if !cached || rebases {
                    for (name, attribute) in &geometry.attributes {
                        self.bind_attribute(
                            program,
                            name,
                            attribute.buffer,
                            attribute.item_size as u32,
                            offset.index,
                        );
                    }
                    if let Some(buffer) = geometry.index_buffer {
                        self.device.bind_buffer(BufferTarget::ElementArray, buffer);
                    }
                }
                self.device
                    .draw_elements(DrawMode::Triangles, offset.count, offset.start);
                self.stats.calls += 1;
                self.stats.vertices += offset.count as u32;
                self.stats.faces += offset.count as u32 / 3;
            }

            // pointers are left at the last chunk's base vertex
            self.current_geometry_group_hash = if rebases { None } else { Some(hash) };
        } else {
            if !cached {
                self.current_geometry_group_hash = Some(hash);
                for (name, attribute) in &geometry.attributes {
                    self.bind_attribute(
                        program,
                        name,
                        attribute.buffer,
                        attribute.item_size as u32,
                        0,
                    );
                }
            }
            let count = geometry.vertex_count();
            self.device.draw_arrays(DrawMode::Triangles, 0, count);
            self.stats.calls += 1;
            self.stats.vertices += count as u32;
            self.stats.faces += count as u32 / 3;
        }
    }

    fn draw_flat(
        &mut self,
        program: &Arc<Program>,
        geometry: &GeometryRef,
        mode: DrawMode,
        material: &Material,
    ) {
        let Ok(geometry) = geometry.read() else { return };
        let id = geometry.id().value();
        let Some(entry) = self.direct_buffers.get(&id) else {
            return;
        };
        let vertex_buffer = entry.vertex_buffer;
        let color_buffer = entry.color_buffer;
        let line_distance_buffer = entry.line_distance_buffer;
        let count = entry.vertex_count;

        let hash = id * 0xffffff + program.id * 2;
        if self.current_geometry_group_hash != Some(hash) {
            self.current_geometry_group_hash = Some(hash);
            self.bind_attribute(program, "position", vertex_buffer, 3, 0);
            self.bind_attribute(program, "color", color_buffer, 3, 0);
            if matches!(material.kind, MaterialKind::LineDashed) {
                self.bind_attribute(program, "lineDistance", line_distance_buffer, 1, 0);
            }
        }

        self.device.draw_arrays(mode, 0, count);
        self.stats.calls += 1;
        if mode == DrawMode::Points {
            self.stats.points += count as u32;
        }
    }

    fn bind_attribute(
        &mut self,
        program: &Arc<Program>,
        name: &str,
        buffer: Option<super::gl::BufferHandle>,
        item_size: u32,
        first_vertex: usize,
    ) {
        let Some(location) = program.attribute(name) else {
            return;
        };
        let Some(buffer) = buffer else { return };
        self.device.bind_buffer(BufferTarget::Array, buffer);
        self.device.enable_vertex_attrib(location);
        self.device.vertex_attrib_pointer(location, item_size, first_vertex);
    }

    /// Bind morph target (and normal) attributes for the influences that
    /// matter: a caller-forced order when present, otherwise the largest
    /// influences by magnitude with ties broken by index.
    fn setup_morph_targets(
        &mut self,
        program: &Arc<Program>,
        material: &Material,
        mesh: &Mesh,
        geometry: &crate::geometry::Geometry,
        group_index: usize,
    ) {
        let group = &geometry.groups()[group_index];
        let influences = &mesh.morph_target_influences;

        let supported = material
            .num_supported_morph_targets
            .min(group.morph_target_buffers.len());

        let order: Vec<usize> = if !mesh.morph_target_forced_order.is_empty() {
            mesh.morph_target_forced_order
                .iter()
                .copied()
                .filter(|&i| i < group.morph_target_buffers.len())
                .take(supported)
                .collect()
        } else {
            let mut indexed: Vec<(usize, f32)> = influences
                .iter()
                .copied()
                .enumerate()
                .filter(|&(i, _)| i < group.morph_target_buffers.len())
                .collect();
            indexed.sort_by(|a, b| {
                b.1.abs()
                    .partial_cmp(&a.1.abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.0.cmp(&b.0))
            });
            indexed.into_iter().map(|(i, _)| i).take(supported).collect()
        };

        // base position comes either from a pinned target or the vertex
        // buffer
        if let Some(base) = mesh.morph_target_base {
            if let Some(buffer) = group.morph_target_buffers.get(base) {
                self.bind_attribute(program, "position", Some(*buffer), 3, 0);
            }
        } else {
            self.bind_attribute(program, "position", group.vertex_buffer, 3, 0);
        }

        let mut used_influences = Vec::with_capacity(order.len());
        for (slot, &target) in order.iter().enumerate() {
            let name = format!("morphTarget{slot}");
            if let Some(buffer) = group.morph_target_buffers.get(target) {
                self.bind_attribute(program, &name, Some(*buffer), 3, 0);
            }
            if material.morph_normals {
                let name = format!("morphNormal{slot}");
                if let Some(buffer) = group.morph_normal_buffers.get(target) {
                    self.bind_attribute(program, &name, Some(*buffer), 3, 0);
                }
            }
            used_influences.push(influences.get(target).copied().unwrap_or(0.0));
        }
        used_influences.resize(material.num_supported_morph_targets.max(order.len()), 0.0);

        if let Some(location) = program.uniform("morphTargetInfluences") {
            self.device.uniform1fv(location, &used_influences);
        }
    }

    // ------------------------------------------------------------------
    // programs and uniforms
    // ------------------------------------------------------------------

    fn build_features(
        &self,
        material: &Material,
        object: &Object3D,
        fog: &Option<Fog>,
    ) -> ProgramFeatures {
        let mesh = match &object.kind {
            ObjectKind::Mesh(mesh) => Some(mesh),
            _ => None,
        };

        let max_bones = mesh
            .map(|m| allocate_bones(m, &self.caps))
            .unwrap_or(0);

        ProgramFeatures {
            map: material.map.is_some(),
            env_map: material.env_map.is_some(),
            light_map: material.light_map.is_some(),
            bump_map: material.bump_map.is_some(),
            specular_map: material.specular_map.is_some(),
            vertex_colors: material.vertex_colors != VertexColorMode::None,
            fog: fog.is_some() && material.fog,
            fog_exp2: matches!(fog, Some(Fog::Exponential { .. })),
            size_attenuation: material.size_attenuation,
            skinning: material.skinning,
            max_bones,
            bone_texture: self.caps.supports_float_textures
                && mesh.map(|m| m.use_vertex_texture).unwrap_or(false),
            bone_texture_width: mesh.map(|m| m.bone_texture_size.0).unwrap_or(0),
            bone_texture_height: mesh.map(|m| m.bone_texture_size.1).unwrap_or(0),
            morph_targets: material.morph_targets,
            morph_normals: material.morph_normals,
            max_morph_targets: self.max_morph_targets,
            max_morph_normals: self.max_morph_normals,
            max_dir_lights: self.light_count.directional,
            max_point_lights: self.light_count.point,
            max_spot_lights: self.light_count.spot,
            max_hemi_lights: self.light_count.hemi,
            max_shadows: 0,
            shadow_map_enabled: self.shadow_map_enabled && object.receive_shadow,
            shadow_map_soft: self.shadow_map_soft,
            shadow_map_debug: false,
            shadow_map_cascade: false,
            alpha_test_bits: material.alpha_test.to_bits(),
            metal: material.metal,
            per_pixel: material.per_pixel,
            wrap_around: material.wrap_around,
            double_sided: material.side == Side::Double,
        }
    }

    fn init_material(
        &mut self,
        material: &mut Material,
        object: &Object3D,
        fog: &Option<Fog>,
    ) {
        let features = self.build_features(material, object, fog);

        let (vertex, fragment, lib_uniforms) = match &material.kind {
            MaterialKind::Shader { vertex, fragment } => {
                (vertex.clone(), fragment.clone(), None)
            }
            kind => {
                let id = kind.shader_id().unwrap_or("basic");
                match ShaderLib::by_id(id) {
                    Some(shader) => (shader.vertex, shader.fragment, Some(shader.uniforms)),
                    None => return,
                }
            }
        };

        if let Some(lib_uniforms) = lib_uniforms {
            let mut merged = lib_uniforms;
            merged.merge(&material.uniforms);
            material.uniforms = merged;
        }

        let globals = GlobalShaderFlags {
            gamma_input: self.gamma_input,
            gamma_output: self.gamma_output,
            supports_vertex_textures: self.caps.max_vertex_textures > 0,
            supports_standard_derivatives: self.caps.supports_standard_derivatives,
            precision: self.options.precision,
        };

        let uniform_names = material.uniforms.names();
        let attribute_names: Vec<String> = material.attributes.keys().cloned().collect();

        material.program = self.programs.acquire(
            &mut self.device,
            material.kind.shader_id(),
            &vertex,
            &fragment,
            &uniform_names,
            &attribute_names,
            &features,
            &globals,
        );

        if material.program.is_none() {
            log::error!("material program unavailable; object skipped this frame");
        }

        material.num_supported_morph_targets = features.max_morph_targets;
        material.num_supported_morph_normals = features.max_morph_normals;
    }

    fn set_program(
        &mut self,
        item: &RenderItem,
        material_ref: &MaterialRef,
        camera: &FrameCamera,
        lights: &[ObjectRef],
        fog: &Option<Fog>,
    ) -> Option<Arc<Program>> {
        self.used_texture_units = 0;

        let Ok(object) = item.object.read() else {
            return None;
        };
        let Ok(mut material) = material_ref.write() else {
            return None;
        };

        if material.needs_update {
            if let Some(old) = material.program.take() {
                self.programs.release(&mut self.device, &old);
            }
            self.init_material(&mut material, &object, fog);
            material.needs_update = false;
        }

        let program = material.program.as_ref()?.clone();

        let mut refresh_material = false;

        if self.current_program != Some(program.id) {
            self.device.use_program(Some(program.handle));
            self.current_program = Some(program.id);
            refresh_material = true;
        }

        if self.current_material != Some(material.id()) {
            self.current_material = Some(material.id());
            refresh_material = true;
        }

        if refresh_material || self.current_camera != Some(camera.node_id) {
            if let Some(location) = program.uniform("projectionMatrix") {
                self.device
                    .uniform_matrix4fv(location, &camera.projection.elements);
            }
            self.current_camera = Some(camera.node_id);
        }

        if refresh_material {
            // uniforms come out of the material while its other fields
            // feed the refresh helpers
            let mut uniforms = std::mem::take(&mut material.uniforms);

            if let Some(fog) = fog {
                if material.fog {
                    refresh_uniforms_fog(&mut uniforms, fog);
                }
            }

            let lit = material.kind.is_lit() || material.lights;
            if lit {
                if self.lights_need_update {
                    self.lights.setup(lights, self.gamma_input);
                    self.lights_need_update = false;
                }
                refresh_uniforms_lights(&mut uniforms, &self.lights);
            }

            match &material.kind {
                MaterialKind::Basic | MaterialKind::Lambert | MaterialKind::Phong => {
                    refresh_uniforms_common(&mut uniforms, &material, self.gamma_input);
                }
                _ => {}
            }

            match &material.kind {
                MaterialKind::LineBasic => {
                    refresh_uniforms_line(&mut uniforms, &material);
                }
                MaterialKind::LineDashed => {
                    refresh_uniforms_line(&mut uniforms, &material);
                    refresh_uniforms_dash(&mut uniforms, &material);
                }
                MaterialKind::ParticleBasic => {
                    refresh_uniforms_particle(&mut uniforms, &material, self.current_size.1);
                }
                MaterialKind::Phong => {
                    refresh_uniforms_phong(&mut uniforms, &material, self.gamma_input);
                }
                MaterialKind::Lambert => {
                    refresh_uniforms_lambert(&mut uniforms, &material, self.gamma_input);
                }
                MaterialKind::Depth => {
                    uniforms.set("mNear", UniformValue::Float(camera.near));
                    uniforms.set("mFar", UniformValue::Float(camera.far));
                    uniforms.set("opacity", UniformValue::Float(material.opacity));
                }
                MaterialKind::Normal => {
                    uniforms.set("opacity", UniformValue::Float(material.opacity));
                }
                _ => {}
            }

            material.uniforms = uniforms;

            let warn_missing = matches!(material.kind, MaterialKind::Shader { .. });
            self.load_uniforms_generic(&program, &material.uniforms, warn_missing);

            // camera position and view matrix for the shaders that need
            // them
            if matches!(
                material.kind,
                MaterialKind::Phong | MaterialKind::Shader { .. }
            ) || material.env_map.is_some()
            {
                if let Some(location) = program.uniform("cameraPosition") {
                    let p = camera.position;
                    self.device.uniform3f(location, p.x, p.y, p.z);
                }
            }
            if matches!(
                material.kind,
                MaterialKind::Phong | MaterialKind::Lambert | MaterialKind::Shader { .. }
            ) || material.skinning
            {
                if let Some(location) = program.uniform("viewMatrix") {
                    self.device.uniform_matrix4fv(location, &camera.view.elements);
                }
            }
        }

        // skinning bones every draw
        if material.skinning {
            if let ObjectKind::Mesh(mesh) = &object.kind {
                if let Some(location) = program.uniform("boneGlobalMatrices") {
                    let mut flattened = Vec::with_capacity(mesh.bone_matrices.len() * 16);
                    for bone in &mesh.bone_matrices {
                        flattened.extend_from_slice(&bone.elements);
                    }
                    if !flattened.is_empty() {
                        self.device.uniform_matrix4fv(location, &flattened);
                    }
                }
            }
        }

        // object matrices every draw
        if let Some(location) = program.uniform("modelViewMatrix") {
            self.device
                .uniform_matrix4fv(location, &item.model_view.elements);
        }
        if let Some(location) = program.uniform("normalMatrix") {
            self.device
                .uniform_matrix3fv(location, &item.normal_matrix.elements);
        }
        if let Some(location) = program.uniform("modelMatrix") {
            self.device
                .uniform_matrix4fv(location, &object.matrix_world.elements);
        }

        Some(program)
    }

    /// Upload every uniform in the map, allocating texture units for
    /// sampler uniforms in declaration order.
    fn load_uniforms_generic(
        &mut self,
        program: &Arc<Program>,
        uniforms: &UniformMap,
        warn_missing: bool,
    ) {
        // collect first: texture binds need &mut self
        let entries: Vec<(String, UniformValue)> = uniforms
            .iter()
            .map(|(n, v)| (n.to_string(), v.clone()))
            .collect();

        for (name, value) in entries {
            let Some(location) = program.uniform(&name) else {
                if warn_missing {
                    log::warn!("user shader uniform '{name}' has no location");
                }
                continue;
            };

            match value {
                UniformValue::Texture(Some(texture)) => {
                    let unit = self.allocate_texture_unit();
                    self.device.uniform1i(location, unit as i32);
                    self.bind_texture_to_unit(&texture, unit);
                }
                UniformValue::Texture(None) => {}
                other => other.upload(&mut self.device, location),
            }
        }
    }

    fn allocate_texture_unit(&mut self) -> u32 {
        let unit = self.used_texture_units;
        if unit >= self.caps.max_textures {
            log::warn!(
                "trying to use {} texture units, device supports {}",
                unit + 1,
                self.caps.max_textures
            );
        }
        self.used_texture_units += 1;
        unit
    }

    /// Upload-if-dirty then bind a texture on the given unit. Textures
    /// with no usable image bind a white fallback texel.
    fn bind_texture_to_unit(&mut self, texture_ref: &TextureRef, unit: u32) {
        self.device.active_texture(unit);

        let Ok(mut texture) = texture_ref.write() else {
            return;
        };

        if !texture.is_ready() {
            let fallback = self.fallback_texture();
            self.device.bind_texture(TextureTarget::D2, fallback);
            return;
        }

        let target = if texture.is_cube() {
            TextureTarget::Cube
        } else {
            TextureTarget::D2
        };

        if texture.needs_update || texture.gl_texture.is_none() {
            let handle = *texture
                .gl_texture
                .get_or_insert_with(|| self.device.create_texture());
            self.device.bind_texture(target, handle);

            let layout = PixelLayout {
                format: texture.format,
                data_type: texture.data_type,
            };
            let anisotropy = if self.caps.supports_anisotropy {
                texture.anisotropy.min(self.caps.max_anisotropy)
            } else {
                1.0
            };
            self.device.tex_parameters(
                target,
                &SamplerParams {
                    wrap_s: texture.wrap_s,
                    wrap_t: texture.wrap_t,
                    mag_filter: texture.mag_filter,
                    min_filter: texture.min_filter,
                    anisotropy,
                },
            );

            match &texture.source {
                TextureSource::Image(image) => {
                    self.upload_image_2d(image, layout);
                }
                TextureSource::Cube(faces) => {
                    for (face, image) in faces.iter().enumerate() {
                        self.device.tex_image_cube(
                            face as u32,
                            image.width,
                            image.height,
                            layout,
                            &image.pixels,
                        );
                    }
                }
            }

            if texture.generate_mipmaps && texture.min_filter.uses_mipmaps() {
                self.device.generate_mipmap(target);
            }

            texture.needs_update = false;
        } else if let Some(handle) = texture.gl_texture {
            self.device.bind_texture(target, handle);
        }
    }

    fn upload_image_2d(&mut self, image: &Image, layout: PixelLayout) {
        let max = self.caps.max_texture_size;
        if image.width > max || image.height > max {
            log::warn!(
                "texture {}x{} exceeds the device maximum {max}; expect sampling artifacts",
                image.width,
                image.height
            );
        }
        self.device
            .tex_image_2d(image.width, image.height, layout, &image.pixels);
    }

    fn fallback_texture(&mut self) -> TextureHandle {
        if let Some(handle) = self.fallback_texture {
            return handle;
        }
        let handle = self.device.create_texture();
        self.device.bind_texture(TextureTarget::D2, handle);
        self.device.tex_parameters(
            TextureTarget::D2,
            &SamplerParams {
                wrap_s: Wrapping::ClampToEdge,
                wrap_t: Wrapping::ClampToEdge,
                mag_filter: Filter::Nearest,
                min_filter: Filter::Nearest,
                anisotropy: 1.0,
            },
        );
        self.device.tex_image_2d(
            1,
            1,
            PixelLayout {
                format: TextureFormat::Rgba,
                data_type: TextureDataType::UnsignedByte,
            },
            &[255, 255, 255, 255],
        );
        self.fallback_texture = Some(handle);
        handle
    }

    /// Bind a render target (the default framebuffer when `None`),
    /// adjusting the viewport.
    pub fn set_render_target(&mut self, target: Option<&RenderTargetRef>) {
        let framebuffer = match target {
            Some(target) => {
                let Ok(mut target) = target.write() else {
                    return;
                };
                target.setup(&mut self.device);
                let framebuffer = target.framebuffer();
                self.current_size = (target.width, target.height);
                framebuffer
            }
            None => {
                self.current_size = (self.options.width, self.options.height);
                None
            }
        };

        if !self.framebuffer_known || self.current_framebuffer != framebuffer {
            self.device.bind_framebuffer(framebuffer);
            let (w, h) = self.current_size;
            match framebuffer {
                Some(_) => self.device.viewport(0, 0, w, h),
                None => {
                    let (x, y, w, h) = self.viewport;
                    self.device.viewport(x, y, w, h);
                }
            }
            self.current_framebuffer = framebuffer;
            self.framebuffer_known = true;
        }
    }

    /// Release a material's program reference (dropping the GPU program
    /// at refcount zero). Call when permanently discarding a material.
    pub fn deallocate_material(&mut self, material: &MaterialRef) {
        if let Ok(mut material) = material.write() {
            if let Some(program) = material.program.take() {
                self.programs.release(&mut self.device, &program);
            }
        }
    }
}

/// Bone slots compiled into a skinning shader, clamped so the uniform
/// array stays within a conservative budget.
fn allocate_bones(mesh: &Mesh, caps: &DeviceCapabilities) -> usize {
    if caps.supports_float_textures && mesh.use_vertex_texture {
        // bone texture: practically unbounded
        return mesh.bone_matrices.len().max(1);
    }

    const MAX_UNIFORM_BONES: usize = 50;
    let bones = mesh.bone_matrices.len();
    if bones > MAX_UNIFORM_BONES {
        log::warn!("mesh uses {bones} bones, clamping to {MAX_UNIFORM_BONES}");
        MAX_UNIFORM_BONES
    } else {
        bones
    }
}

// ---------------------------------------------------------------------
// uniform refresh helpers
// ---------------------------------------------------------------------

fn gamma_color(color: &Color, gamma_input: bool) -> Color {
    if gamma_input {
        let mut linear = Color::BLACK;
        linear.copy_gamma_to_linear(color);
        linear
    } else {
        *color
    }
}

fn refresh_uniforms_common(uniforms: &mut UniformMap, material: &Material, gamma_input: bool) {
    uniforms.set("opacity", UniformValue::Float(material.opacity));
    uniforms.set(
        "diffuse",
        UniformValue::Color(gamma_color(&material.color, gamma_input)),
    );

    uniforms.set("map", UniformValue::Texture(material.map.clone()));
    uniforms.set("lightMap", UniformValue::Texture(material.light_map.clone()));
    uniforms.set(
        "specularMap",
        UniformValue::Texture(material.specular_map.clone()),
    );
    uniforms.set("envMap", UniformValue::Texture(material.env_map.clone()));
    uniforms.set(
        "reflectivity",
        UniformValue::Float(material.reflectivity),
    );

    // uv transform comes from whichever map is present, diffuse first
    let uv_source = material
        .map
        .as_ref()
        .or(material.specular_map.as_ref())
        .or(material.bump_map.as_ref());
    if let Some(texture) = uv_source {
        if let Ok(texture) = texture.read() {
            uniforms.set(
                "offsetRepeat",
                UniformValue::Vec4(crate::math::Vector4::new(
                    texture.offset.x,
                    texture.offset.y,
                    texture.repeat.x,
                    texture.repeat.y,
                )),
            );
        }
    }
}

fn refresh_uniforms_line(uniforms: &mut UniformMap, material: &Material) {
    uniforms.set("diffuse", UniformValue::Color(material.color));
    uniforms.set("opacity", UniformValue::Float(material.opacity));
}

fn refresh_uniforms_dash(uniforms: &mut UniformMap, material: &Material) {
    uniforms.set("dashSize", UniformValue::Float(material.dash_size));
    uniforms.set(
        "totalSize",
        UniformValue::Float(material.dash_size + material.gap_size),
    );
    uniforms.set("scale", UniformValue::Float(material.scale));
}

fn refresh_uniforms_particle(uniforms: &mut UniformMap, material: &Material, height: u32) {
    uniforms.set("psColor", UniformValue::Color(material.color));
    uniforms.set("opacity", UniformValue::Float(material.opacity));
    uniforms.set("size", UniformValue::Float(material.size));
    uniforms.set("scale", UniformValue::Float(height as f32 / 2.0));
    uniforms.set("map", UniformValue::Texture(material.map.clone()));
}

fn refresh_uniforms_fog(uniforms: &mut UniformMap, fog: &Fog) {
    uniforms.set("fogColor", UniformValue::Color(fog.color()));
    match fog {
        Fog::Linear { near, far, .. } => {
            uniforms.set("fogNear", UniformValue::Float(*near));
            uniforms.set("fogFar", UniformValue::Float(*far));
        }
        Fog::Exponential { density, .. } => {
            uniforms.set("fogDensity", UniformValue::Float(*density));
        }
    }
}

fn refresh_uniforms_phong(uniforms: &mut UniformMap, material: &Material, gamma_input: bool) {
    uniforms.set("shininess", UniformValue::Float(material.shininess));
    uniforms.set(
        "ambient",
        UniformValue::Color(gamma_color(&material.ambient, gamma_input)),
    );
    uniforms.set(
        "emissive",
        UniformValue::Color(gamma_color(&material.emissive, gamma_input)),
    );
    uniforms.set(
        "specular",
        UniformValue::Color(gamma_color(&material.specular, gamma_input)),
    );
    if material.wrap_around {
        uniforms.set(
            "wrapRGB",
            UniformValue::Vec3(Vector3::new(
                material.wrap_rgb.r,
                material.wrap_rgb.g,
                material.wrap_rgb.b,
            )),
        );
    }
}

fn refresh_uniforms_lambert(uniforms: &mut UniformMap, material: &Material, gamma_input: bool) {
    uniforms.set(
        "ambient",
        UniformValue::Color(gamma_color(&material.ambient, gamma_input)),
    );
    uniforms.set(
        "emissive",
        UniformValue::Color(gamma_color(&material.emissive, gamma_input)),
    );
    if material.wrap_around {
        uniforms.set(
            "wrapRGB",
            UniformValue::Vec3(Vector3::new(
                material.wrap_rgb.r,
                material.wrap_rgb.g,
                material.wrap_rgb.b,
            )),
        );
    }
}

fn refresh_uniforms_lights(uniforms: &mut UniformMap, lights: &LightArrays) {
    uniforms.set(
        "ambientLightColor",
        UniformValue::Vec3Array(lights.ambient.to_vec()),
    );
    uniforms.set(
        "directionalLightColor",
        UniformValue::Vec3Array(lights.directional.colors.clone()),
    );
    uniforms.set(
        "directionalLightDirection",
        UniformValue::Vec3Array(lights.directional.directions.clone()),
    );
    uniforms.set(
        "pointLightColor",
        UniformValue::Vec3Array(lights.point.colors.clone()),
    );
    uniforms.set(
        "pointLightPosition",
        UniformValue::Vec3Array(lights.point.positions.clone()),
    );
    uniforms.set(
        "pointLightDistance",
        UniformValue::FloatArray(lights.point.distances.clone()),
    );
    uniforms.set(
        "spotLightColor",
        UniformValue::Vec3Array(lights.spot.colors.clone()),
    );
    uniforms.set(
        "spotLightPosition",
        UniformValue::Vec3Array(lights.spot.positions.clone()),
    );
    uniforms.set(
        "spotLightDirection",
        UniformValue::Vec3Array(lights.spot.directions.clone()),
    );
    uniforms.set(
        "spotLightDistance",
        UniformValue::FloatArray(lights.spot.distances.clone()),
    );
    uniforms.set(
        "spotLightAngleCos",
        UniformValue::FloatArray(lights.spot.angles_cos.clone()),
    );
    uniforms.set(
        "spotLightExponent",
        UniformValue::FloatArray(lights.spot.exponents.clone()),
    );
    uniforms.set(
        "hemisphereLightSkyColor",
        UniformValue::Vec3Array(lights.hemi.sky_colors.clone()),
    );
    uniforms.set(
        "hemisphereLightGroundColor",
        UniformValue::Vec3Array(lights.hemi.ground_colors.clone()),
    );
    uniforms.set(
        "hemisphereLightPosition",
        UniformValue::Vec3Array(lights.hemi.positions.clone()),
    );
}
