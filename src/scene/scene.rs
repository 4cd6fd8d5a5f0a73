//! Scene: the root of the graph plus the bookkeeping the renderer
//! consumes.

use super::object3d::{Object3D, ObjectKind, ObjectRef};
use crate::core::Id;
use crate::material::MaterialRef;
use crate::math::Color;
use crate::renderer::renderer::RenderItem;
use std::collections::VecDeque;
use std::sync::Arc;

/// Scene fog.
#[derive(Debug, Clone)]
pub enum Fog {
    /// Linear falloff between two distances.
    Linear {
        /// Fog color.
        color: Color,
        /// Distance where fog starts.
        near: f32,
        /// Distance of full fog.
        far: f32,
    },
    /// Exponential-squared falloff.
    Exponential {
        /// Fog color.
        color: Color,
        /// Density factor.
        density: f32,
    },
}

impl Fog {
    /// The fog color.
    pub fn color(&self) -> Color {
        match self {
            Fog::Linear { color, .. } => *color,
            Fog::Exponential { color, .. } => *color,
        }
    }
}

/// Payload of a scene root node: fog, override material, the live
/// object/light sets and the add/remove queues drained by the renderer.
#[derive(Debug, Default)]
pub struct SceneData {
    /// Scene fog.
    pub fog: Option<Fog>,
    /// When set, every object draws with this material.
    pub override_material: Option<MaterialRef>,
    /// Matrix auto-update on render.
    pub auto_update: bool,

    pub(crate) objects: Vec<ObjectRef>,
    pub(crate) lights: Vec<ObjectRef>,
    pub objects_added: VecDeque<ObjectRef>,
    pub objects_removed: VecDeque<ObjectRef>,

    /// Flattened render list maintained by the renderer across frames.
    pub(crate) render_items: Vec<RenderItem>,
}

impl SceneData {
    pub(crate) fn new() -> Self {
        Self {
            auto_update: true,
            ..Default::default()
        }
    }

    /// Record a node (and bookkeeping) when its subtree enters the scene.
    pub(crate) fn record_added(&mut self, node: &ObjectRef, kind_is_light: bool, renderable: bool) {
        if kind_is_light {
            if !self.lights.iter().any(|l| Arc::ptr_eq(l, node)) {
                self.lights.push(Arc::clone(node));
            }
            return;
        }

        if !renderable {
            return;
        }

        if !self.objects.iter().any(|o| Arc::ptr_eq(o, node)) {
            self.objects.push(Arc::clone(node));
            self.objects_added.push_back(Arc::clone(node));
        }

        // a same-frame remove followed by an add must not drop the object
        if let Some(index) = self
            .objects_removed
            .iter()
            .position(|o| Arc::ptr_eq(o, node))
        {
            self.objects_removed.remove(index);
        }
    }

    /// Record a node when its subtree leaves the scene.
    pub(crate) fn record_removed(
        &mut self,
        node: &ObjectRef,
        kind_is_light: bool,
        renderable: bool,
    ) {
        if kind_is_light {
            if let Some(index) = self.lights.iter().position(|l| Arc::ptr_eq(l, node)) {
                self.lights.remove(index);
            }
            return;
        }

        if !renderable {
            return;
        }

        if let Some(index) = self.objects.iter().position(|o| Arc::ptr_eq(o, node)) {
            self.objects.remove(index);
            self.objects_removed.push_back(Arc::clone(node));
        }

        if let Some(index) = self
            .objects_added
            .iter()
            .position(|o| Arc::ptr_eq(o, node))
        {
            self.objects_added.remove(index);
        }
    }
}

/// A scene: a shared root node whose payload is [`SceneData`].
#[derive(Debug, Clone)]
pub struct Scene {
    root: ObjectRef,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        let mut root = Object3D::with_kind(ObjectKind::Scene(SceneData::new()));
        root.name = "Scene".into();
        Self {
            root: root.into_ref(),
        }
    }

    /// The root node handle.
    #[inline]
    pub fn root(&self) -> &ObjectRef {
        &self.root
    }

    /// Scene id (the root node's id).
    pub fn id(&self) -> Id {
        self.root.read().map(|r| r.id()).unwrap_or_default()
    }

    /// Add a top-level object.
    pub fn add(&self, object: &ObjectRef) {
        Object3D::add(&self.root, object);
    }

    /// Remove a top-level object.
    pub fn remove(&self, object: &ObjectRef) {
        Object3D::remove(&self.root, object);
    }

    /// Visit every node in pre-order.
    pub fn traverse(&self, callback: &mut dyn FnMut(&ObjectRef)) {
        Object3D::traverse(&self.root, callback);
    }

    /// Update world matrices for the whole graph.
    pub fn update_matrix_world(&self) {
        Object3D::update_matrix_world(&self.root, false);
    }

    /// Read a value out of the scene payload.
    pub fn with_data<T>(&self, f: impl FnOnce(&SceneData) -> T) -> Option<T> {
        let root = self.root.read().ok()?;
        match &root.kind {
            ObjectKind::Scene(data) => Some(f(data)),
            _ => None,
        }
    }

    /// Mutate the scene payload.
    pub fn with_data_mut<T>(&self, f: impl FnOnce(&mut SceneData) -> T) -> Option<T> {
        let mut root = self.root.write().ok()?;
        match &mut root.kind {
            ObjectKind::Scene(data) => Some(f(data)),
            _ => None,
        }
    }

    /// Set the fog.
    pub fn set_fog(&self, fog: Option<Fog>) {
        self.with_data_mut(|data| data.fog = fog);
    }

    /// Set the override material.
    pub fn set_override_material(&self, material: Option<MaterialRef>) {
        self.with_data_mut(|data| data.override_material = material);
    }

    /// Number of live renderable objects.
    pub fn object_count(&self) -> usize {
        self.with_data(|data| data.objects.len()).unwrap_or(0)
    }

    /// Number of live lights.
    pub fn light_count(&self) -> usize {
        self.with_data(|data| data.lights.len()).unwrap_or(0)
    }

    /// First node with the given name.
    pub fn get_object_by_name(&self, name: &str) -> Option<ObjectRef> {
        Object3D::get_object_by_name(&self.root, name)
    }

    /// First node with the given id.
    pub fn get_object_by_id(&self, id: Id) -> Option<ObjectRef> {
        Object3D::get_object_by_id(&self.root, id)
    }
}
