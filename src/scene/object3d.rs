//! Scene-graph node.

use crate::camera::Camera;
use crate::core::{generate_uuid, Id};
use crate::light::Light;
use crate::math::{Euler, Matrix4, Quaternion, Vector3};
use crate::objects::{Bone, Line, Mesh, Particle, ParticleSystem, Sprite};
use crate::scene::SceneData;
use std::sync::{Arc, RwLock, Weak};

/// Shared node handle. The graph owns children through these; parents
/// are weak back-references.
pub type ObjectRef = Arc<RwLock<Object3D>>;

/// The closed set of node kinds, each with its payload.
#[derive(Debug)]
pub enum ObjectKind {
    /// Plain transform node.
    Group,
    /// Scene root with its bookkeeping.
    Scene(SceneData),
    /// Triangle mesh.
    Mesh(Mesh),
    /// Polyline.
    Line(Line),
    /// Single billboard point.
    Particle(Particle),
    /// Point cloud.
    ParticleSystem(ParticleSystem),
    /// Screen-aligned quad.
    Sprite(Sprite),
    /// Skeleton joint.
    Bone(Bone),
    /// Camera with projection payload.
    Camera(Camera),
    /// Light source.
    Light(Light),
}

impl ObjectKind {
    /// Kinds that produce draw calls and belong on the scene's render
    /// list.
    pub fn is_renderable(&self) -> bool {
        matches!(
            self,
            ObjectKind::Mesh(_)
                | ObjectKind::Line(_)
                | ObjectKind::Particle(_)
                | ObjectKind::ParticleSystem(_)
                | ObjectKind::Sprite(_)
        )
    }

    /// Kind name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Group => "Group",
            ObjectKind::Scene(_) => "Scene",
            ObjectKind::Mesh(_) => "Mesh",
            ObjectKind::Line(_) => "Line",
            ObjectKind::Particle(_) => "Particle",
            ObjectKind::ParticleSystem(_) => "ParticleSystem",
            ObjectKind::Sprite(_) => "Sprite",
            ObjectKind::Bone(_) => "Bone",
            ObjectKind::Camera(_) => "Camera",
            ObjectKind::Light(_) => "Light",
        }
    }
}

/// A transformable scene-graph node.
///
/// `quaternion` and `rotation` mirror each other: setting either through
/// its setter updates the other. `matrix` is recomposed from position,
/// quaternion and scale whenever `matrix_auto_update` holds, and
/// `matrix_world` is `parent.matrix_world * matrix`.
pub struct Object3D {
    id: Id,
    uuid: String,
    /// Optional name, searchable via [`Object3D::get_object_by_name`].
    pub name: String,
    /// Node payload.
    pub kind: ObjectKind,

    pub(crate) parent: Option<Weak<RwLock<Object3D>>>,
    pub(crate) children: Vec<ObjectRef>,

    /// Local translation.
    pub position: Vector3,
    rotation: Euler,
    quaternion: Quaternion,
    /// Local scale.
    pub scale: Vector3,
    /// Up vector used by [`look_at`](Self::look_at).
    pub up: Vector3,

    /// Local matrix.
    pub matrix: Matrix4,
    /// World matrix.
    pub matrix_world: Matrix4,
    /// Recompose `matrix` from position/quaternion/scale each update.
    pub matrix_auto_update: bool,
    /// Keep the euler mirror in sync when the quaternion changes.
    pub rotation_auto_update: bool,
    /// `matrix_world` must be recomputed on the next update pass.
    pub matrix_world_needs_update: bool,

    /// Drawn at all.
    pub visible: bool,
    /// Sort override: when non-zero, used instead of projected depth.
    pub render_depth: f32,
    /// Cull against the view frustum.
    pub frustum_culled: bool,
    /// Casts shadows (consumed by shadow plugins).
    pub cast_shadow: bool,
    /// Receives shadows.
    pub receive_shadow: bool,
}

impl Default for Object3D {
    fn default() -> Self {
        Self::new()
    }
}

impl Object3D {
    /// Create a plain group node.
    pub fn new() -> Self {
        Self::with_kind(ObjectKind::Group)
    }

    /// Create a node with a payload.
    pub fn with_kind(kind: ObjectKind) -> Self {
        Self {
            id: Id::new(),
            uuid: generate_uuid(),
            name: String::new(),
            kind,
            parent: None,
            children: Vec::new(),
            position: Vector3::ZERO,
            rotation: Euler::ZERO,
            quaternion: Quaternion::IDENTITY,
            scale: Vector3::ONE,
            up: Vector3::UP,
            matrix: Matrix4::IDENTITY,
            matrix_world: Matrix4::IDENTITY,
            matrix_auto_update: true,
            rotation_auto_update: true,
            matrix_world_needs_update: true,
            visible: true,
            render_depth: 0.0,
            frustum_culled: true,
            cast_shadow: false,
            receive_shadow: false,
        }
    }

    /// Wrap into a shared handle.
    pub fn into_ref(self) -> ObjectRef {
        Arc::new(RwLock::new(self))
    }

    /// Unique id.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Stable uuid string.
    #[inline]
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// The parent node, if attached.
    pub fn parent(&self) -> Option<ObjectRef> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Child nodes in insertion order.
    #[inline]
    pub fn children(&self) -> &[ObjectRef] {
        &self.children
    }

    /// Euler mirror of the rotation.
    #[inline]
    pub fn rotation(&self) -> &Euler {
        &self.rotation
    }

    /// Quaternion rotation.
    #[inline]
    pub fn quaternion(&self) -> &Quaternion {
        &self.quaternion
    }

    /// Set the rotation from Euler angles; the quaternion follows.
    pub fn set_rotation(&mut self, rotation: Euler) {
        self.rotation = rotation;
        self.quaternion = Quaternion::from_euler(&rotation);
    }

    /// Set the rotation from a quaternion; the euler mirror follows when
    /// `rotation_auto_update` holds.
    pub fn set_quaternion(&mut self, quaternion: Quaternion) {
        self.quaternion = quaternion;
        if self.rotation_auto_update {
            self.rotation = Euler::from_quaternion(&quaternion, self.rotation.order);
        }
    }

    /// Rotate in object space around a normalized axis.
    pub fn rotate_on_axis(&mut self, axis: &Vector3, angle: f32) {
        let q = Quaternion::from_axis_angle(axis, angle);
        self.set_quaternion(self.quaternion.multiply(&q));
    }

    /// Rotate around the local X axis.
    pub fn rotate_x(&mut self, angle: f32) {
        self.rotate_on_axis(&Vector3::UNIT_X, angle);
    }

    /// Rotate around the local Y axis.
    pub fn rotate_y(&mut self, angle: f32) {
        self.rotate_on_axis(&Vector3::UNIT_Y, angle);
    }

    /// Rotate around the local Z axis.
    pub fn rotate_z(&mut self, angle: f32) {
        self.rotate_on_axis(&Vector3::UNIT_Z, angle);
    }

    /// Translate along a normalized object-space axis.
    pub fn translate_on_axis(&mut self, axis: &Vector3, distance: f32) {
        let world_axis = axis.apply_quaternion(&self.quaternion);
        self.position += world_axis * distance;
    }

    /// Translate along the local X axis.
    pub fn translate_x(&mut self, distance: f32) {
        self.translate_on_axis(&Vector3::UNIT_X, distance);
    }

    /// Translate along the local Y axis.
    pub fn translate_y(&mut self, distance: f32) {
        self.translate_on_axis(&Vector3::UNIT_Y, distance);
    }

    /// Translate along the local Z axis.
    pub fn translate_z(&mut self, distance: f32) {
        self.translate_on_axis(&Vector3::UNIT_Z, distance);
    }

    /// Rotate so the local +Z axis points toward a world-space target,
    /// with the up vector projected out. Camera nodes orient the other
    /// way: they view along local -Z, so their -Z ends up on the target.
    ///
    /// Assumes the node has no rotated or translated ancestors.
    pub fn look_at(&mut self, target: &Vector3) {
        let mut m = Matrix4::IDENTITY;
        if matches!(self.kind, ObjectKind::Camera(_)) {
            m.look_at(&self.position, target, &self.up);
        } else {
            m.look_at(target, &self.position, &self.up);
        }
        self.set_quaternion(Quaternion::from_matrix4(&m));
    }

    /// Map a local point into world space.
    pub fn local_to_world(&self, point: &Vector3) -> Vector3 {
        self.matrix_world.transform_point(point)
    }

    /// Map a world point into local space.
    pub fn world_to_local(&self, point: &Vector3) -> Vector3 {
        self.matrix_world.inverse().transform_point(point)
    }

    /// Recompose the local matrix from position, quaternion and scale.
    pub fn update_matrix(&mut self) {
        self.matrix = Matrix4::compose(&self.position, &self.quaternion, &self.scale);
        self.matrix_world_needs_update = true;
    }

    /// Add `child` under `parent`. Rejects self-adds; a child already
    /// attached elsewhere is detached first. The enclosing scene, when
    /// there is one, records the subtree in its added queue.
    pub fn add(parent: &ObjectRef, child: &ObjectRef) {
        if Arc::ptr_eq(parent, child) {
            log::warn!("Object3D::add: an object can't be added as a child of itself");
            return;
        }

        let previous_parent = child.read().ok().and_then(|c| c.parent());
        if let Some(previous) = previous_parent {
            Self::remove(&previous, child);
        }

        if let Ok(mut c) = child.write() {
            c.parent = Some(Arc::downgrade(parent));
        }
        if let Ok(mut p) = parent.write() {
            p.children.push(Arc::clone(child));
        }

        let root = Self::root_of(parent);
        super::scene_notify_added(&root, child);
    }

    /// Remove `child` from `parent`. A child not attached to this parent
    /// is left untouched. The enclosing scene records the subtree in its
    /// removed queue.
    pub fn remove(parent: &ObjectRef, child: &ObjectRef) {
        let mut detached = false;
        if let Ok(mut p) = parent.write() {
            if let Some(index) = p.children.iter().position(|c| Arc::ptr_eq(c, child)) {
                p.children.remove(index);
                detached = true;
            }
        }

        if !detached {
            log::warn!("Object3D::remove: object is not a child of this parent");
            return;
        }

        if let Ok(mut c) = child.write() {
            c.parent = None;
        }

        let root = Self::root_of(parent);
        super::scene_notify_removed(&root, child);
    }

    /// Pre-order traversal starting at `node`.
    pub fn traverse(node: &ObjectRef, callback: &mut dyn FnMut(&ObjectRef)) {
        callback(node);
        let children = match node.read() {
            Ok(n) => n.children.clone(),
            Err(_) => return,
        };
        for child in &children {
            Self::traverse(child, callback);
        }
    }

    /// Recompute the local matrix (when auto-updating) and the world
    /// matrix, propagating to children whenever this node changed or
    /// `force` is set. Afterwards every descendant has a current
    /// `matrix_world`.
    pub fn update_matrix_world(node: &ObjectRef, force: bool) {
        let parent_world = node
            .read()
            .ok()
            .and_then(|n| n.parent())
            .and_then(|p| p.read().ok().map(|p| p.matrix_world));

        let (children, force_children) = {
            let Ok(mut n) = node.write() else { return };

            if n.matrix_auto_update {
                n.update_matrix();
            }

            let mut propagate = force;
            if n.matrix_world_needs_update || force {
                n.matrix_world = match parent_world {
                    Some(parent) => parent.multiply(&n.matrix),
                    None => n.matrix,
                };
                n.matrix_world_needs_update = false;
                propagate = true;
            }

            (n.children.clone(), propagate)
        };

        for child in &children {
            Self::update_matrix_world(child, force_children);
        }
    }

    /// First descendant with the given id, in pre-order.
    pub fn get_object_by_id(node: &ObjectRef, id: Id) -> Option<ObjectRef> {
        let children = node.read().ok()?.children.clone();
        for child in &children {
            if child.read().ok()?.id == id {
                return Some(Arc::clone(child));
            }
            if let Some(found) = Self::get_object_by_id(child, id) {
                return Some(found);
            }
        }
        None
    }

    /// First descendant with the given name, in pre-order.
    pub fn get_object_by_name(node: &ObjectRef, name: &str) -> Option<ObjectRef> {
        let children = node.read().ok()?.children.clone();
        for child in &children {
            if child.read().ok()?.name == name {
                return Some(Arc::clone(child));
            }
            if let Some(found) = Self::get_object_by_name(child, name) {
                return Some(found);
            }
        }
        None
    }

    /// Walk parent links to the topmost node.
    pub fn root_of(node: &ObjectRef) -> ObjectRef {
        let mut current = Arc::clone(node);
        loop {
            let parent = current.read().ok().and_then(|n| n.parent());
            match parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }
}

impl std::fmt::Debug for Object3D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object3D")
            .field("id", &self.id)
            .field("kind", &self.kind.name())
            .field("name", &self.name)
            .field("children", &self.children.len())
            .field("visible", &self.visible)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euler_quaternion_mirror() {
        let mut node = Object3D::new();
        node.set_rotation(Euler::xyz(0.3, 0.0, 0.0));
        let q = Quaternion::from_euler(&Euler::xyz(0.3, 0.0, 0.0));
        assert!(node.quaternion().approx_eq(&q, 1e-6));

        node.set_quaternion(Quaternion::from_euler(&Euler::xyz(0.0, 0.5, 0.0)));
        assert!((node.rotation().y - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_self_add_rejected() {
        let node = Object3D::new().into_ref();
        Object3D::add(&node, &node);
        assert!(node.read().unwrap().children().is_empty());
        assert!(node.read().unwrap().parent().is_none());
    }

    #[test]
    fn test_reparent_detaches_first() {
        let a = Object3D::new().into_ref();
        let b = Object3D::new().into_ref();
        let child = Object3D::new().into_ref();

        Object3D::add(&a, &child);
        Object3D::add(&b, &child);

        assert!(a.read().unwrap().children().is_empty());
        assert_eq!(b.read().unwrap().children().len(), 1);
        let parent = child.read().unwrap().parent().unwrap();
        assert!(Arc::ptr_eq(&parent, &b));
    }

    #[test]
    fn test_update_matrix_world_composes_parent_chain() {
        let parent = Object3D::new().into_ref();
        let child = Object3D::new().into_ref();
        Object3D::add(&parent, &child);

        parent.write().unwrap().position = Vector3::new(1.0, 0.0, 0.0);
        parent
            .write()
            .unwrap()
            .set_rotation(Euler::xyz(0.0, std::f32::consts::FRAC_PI_2, 0.0));
        child.write().unwrap().position = Vector3::new(0.0, 1.0, 0.0);

        Object3D::update_matrix_world(&parent, false);

        let world = child.read().unwrap().matrix_world.get_position();
        assert!(world.approx_eq(&Vector3::new(1.0, 1.0, 0.0), 1e-5));
    }

    #[test]
    fn test_matrix_world_matches_parent_times_local() {
        let parent = Object3D::new().into_ref();
        let child = Object3D::new().into_ref();
        Object3D::add(&parent, &child);

        parent.write().unwrap().position = Vector3::new(2.0, 3.0, 4.0);
        child.write().unwrap().position = Vector3::new(1.0, 1.0, 1.0);
        child.write().unwrap().scale = Vector3::new(2.0, 2.0, 2.0);

        Object3D::update_matrix_world(&parent, false);

        let p = parent.read().unwrap();
        let c = child.read().unwrap();
        let expected = p.matrix_world.multiply(&c.matrix);
        assert!(c.matrix_world.approx_eq(&expected, 1e-6));
    }

    #[test]
    fn test_get_object_by_name_pre_order() {
        let root = Object3D::new().into_ref();
        let a = Object3D::new().into_ref();
        let b = Object3D::new().into_ref();
        a.write().unwrap().name = "target".into();
        b.write().unwrap().name = "target".into();
        Object3D::add(&root, &a);
        Object3D::add(&root, &b);

        let found = Object3D::get_object_by_name(&root, "target").unwrap();
        assert!(Arc::ptr_eq(&found, &a));
    }

    #[test]
    fn test_look_at_points_z_toward_target() {
        let mut node = Object3D::new();
        node.position = Vector3::new(0.0, 0.0, 5.0);
        node.look_at(&Vector3::ZERO);
        // the rotated +Z basis points from the node toward the target
        let z = Vector3::UNIT_Z.apply_quaternion(node.quaternion());
        assert!(z.approx_eq(&Vector3::new(0.0, 0.0, -1.0), 1e-5));
    }

    #[test]
    fn test_camera_look_at_views_target() {
        let mut node = Object3D::with_kind(ObjectKind::Camera(
            crate::camera::Camera::perspective(60.0, 1.0, 0.1, 100.0),
        ));
        node.position = Vector3::new(0.0, 0.0, 5.0);
        node.look_at(&Vector3::ZERO);
        // cameras view along -Z, which must land on the target
        let view_dir = Vector3::new(0.0, 0.0, -1.0).apply_quaternion(node.quaternion());
        assert!(view_dir.approx_eq(&Vector3::new(0.0, 0.0, -1.0), 1e-5));
    }
}
