//! Scene graph: hierarchical [`Object3D`] nodes under a [`Scene`] root.
//!
//! Structural mutations (`add`/`remove`) bubble to the enclosing scene,
//! which queues the affected subtree for the renderer to initialize or
//! release at the next frame.

mod object3d;
#[allow(clippy::module_inception)]
mod scene;

pub use object3d::{Object3D, ObjectKind, ObjectRef};
pub use scene::{Fog, Scene, SceneData};

use std::sync::Arc;

/// Record `child`'s subtree in the scene queues when `root` is a scene
/// root. Lights land in the light set; renderables in the added queue;
/// cameras, bones and plain groups only recurse.
pub(crate) fn scene_notify_added(root: &ObjectRef, child: &ObjectRef) {
    if !is_scene(root) {
        return;
    }

    let mut subtree = Vec::new();
    Object3D::traverse(child, &mut |node| subtree.push(Arc::clone(node)));

    for node in &subtree {
        let (is_light, renderable) = classify(node);
        if let Ok(mut r) = root.write() {
            if let ObjectKind::Scene(data) = &mut r.kind {
                data.record_added(node, is_light, renderable);
            }
        }
    }
}

/// Symmetric bookkeeping for a subtree leaving the scene.
pub(crate) fn scene_notify_removed(root: &ObjectRef, child: &ObjectRef) {
    if !is_scene(root) {
        return;
    }

    let mut subtree = Vec::new();
    Object3D::traverse(child, &mut |node| subtree.push(Arc::clone(node)));

    for node in &subtree {
        let (is_light, renderable) = classify(node);
        if let Ok(mut r) = root.write() {
            if let ObjectKind::Scene(data) = &mut r.kind {
                data.record_removed(node, is_light, renderable);
            }
        }
    }
}

fn is_scene(node: &ObjectRef) -> bool {
    node.read()
        .map(|n| matches!(n.kind, ObjectKind::Scene(_)))
        .unwrap_or(false)
}

fn classify(node: &ObjectRef) -> (bool, bool) {
    node.read()
        .map(|n| {
            (
                matches!(n.kind, ObjectKind::Light(_)),
                n.kind.is_renderable(),
            )
        })
        .unwrap_or((false, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::Light;
    use crate::material::Material;
    use crate::math::Color;
    use crate::objects::Mesh;

    fn mesh_node() -> ObjectRef {
        let geometry = crate::geometry::box_geometry(1.0, 1.0, 1.0).into_ref();
        let material = Material::basic(Color::WHITE).into_ref();
        Object3D::with_kind(ObjectKind::Mesh(Mesh::new(geometry, material))).into_ref()
    }

    #[test]
    fn test_add_records_in_scene_queues() {
        let scene = Scene::new();
        let mesh = mesh_node();
        scene.add(&mesh);

        assert_eq!(scene.object_count(), 1);
        let queued = scene
            .with_data(|data| data.objects_added.len())
            .unwrap();
        assert_eq!(queued, 1);
    }

    #[test]
    fn test_nested_add_bubbles_to_scene() {
        let scene = Scene::new();
        let group = Object3D::new().into_ref();
        scene.add(&group);

        let mesh = mesh_node();
        Object3D::add(&group, &mesh);

        assert_eq!(scene.object_count(), 1);
    }

    #[test]
    fn test_lights_are_tracked_separately() {
        let scene = Scene::new();
        let light =
            Object3D::with_kind(ObjectKind::Light(Light::point(Color::WHITE, 1.0, 0.0))).into_ref();
        scene.add(&light);

        assert_eq!(scene.light_count(), 1);
        assert_eq!(scene.object_count(), 0);
        scene.remove(&light);
        assert_eq!(scene.light_count(), 0);
    }

    #[test]
    fn test_remove_then_readd_same_frame() {
        let scene = Scene::new();
        let mesh = mesh_node();
        scene.add(&mesh);
        scene.remove(&mesh);
        scene.add(&mesh);

        let (added, removed) = scene
            .with_data(|data| (data.objects_added.len(), data.objects_removed.len()))
            .unwrap();
        assert_eq!(added, 1);
        assert_eq!(removed, 0);
    }

    #[test]
    fn test_subtree_removal_unregisters_descendants() {
        let scene = Scene::new();
        let group = Object3D::new().into_ref();
        let mesh = mesh_node();
        Object3D::add(&group, &mesh);
        scene.add(&group);
        assert_eq!(scene.object_count(), 1);

        scene.remove(&group);
        assert_eq!(scene.object_count(), 0);
    }
}
