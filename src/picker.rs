//! Ray-vs-scene intersection: bounding-sphere rejection followed by a
//! per-face plane test and barycentric containment.

use crate::material::Side;
use crate::math::{Matrix4, Ray, Triangle, Vector3};
use crate::objects::MeshGeometry;
use crate::scene::{Object3D, ObjectKind, ObjectRef};
use std::sync::Arc;

/// One ray hit.
#[derive(Debug, Clone)]
pub struct Intersection {
    /// Distance from the ray origin.
    pub distance: f32,
    /// World-space hit point.
    pub point: Vector3,
    /// Face index for mesh hits.
    pub face_index: Option<usize>,
    /// The hit object.
    pub object: ObjectRef,
}

/// Caster holding a world-space ray and a distance window.
#[derive(Debug, Clone)]
pub struct Raycaster {
    /// The world-space ray.
    pub ray: Ray,
    /// Hits closer than this are discarded.
    pub near: f32,
    /// Hits farther than this are discarded.
    pub far: f32,
    /// Plane-parallelism cutoff for the face test.
    pub precision: f32,
}

impl Raycaster {
    /// Create a caster from origin and direction.
    pub fn new(origin: Vector3, direction: Vector3) -> Self {
        Self {
            ray: Ray::new(origin, direction.normalized()),
            near: 0.0,
            far: f32::INFINITY,
            precision: 1e-4,
        }
    }

    /// Intersect one object, optionally recursing into its children.
    /// Results are sorted by ascending distance.
    pub fn intersect_object(&self, object: &ObjectRef, recursive: bool) -> Vec<Intersection> {
        let mut intersections = Vec::new();
        self.collect(object, recursive, &mut intersections);
        intersections.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        intersections
    }

    /// Intersect a set of objects.
    pub fn intersect_objects(&self, objects: &[ObjectRef], recursive: bool) -> Vec<Intersection> {
        let mut intersections = Vec::new();
        for object in objects {
            self.collect(object, recursive, &mut intersections);
        }
        intersections.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        intersections
    }

    fn collect(&self, object_ref: &ObjectRef, recursive: bool, out: &mut Vec<Intersection>) {
        if recursive {
            let children = object_ref
                .read()
                .map(|o| o.children().to_vec())
                .unwrap_or_default();
            for child in &children {
                self.collect(child, recursive, out);
            }
        }

        let Ok(object) = object_ref.read() else { return };

        match &object.kind {
            ObjectKind::Particle(_) => {
                let position = object.matrix_world.get_position();
                let distance = self.ray.distance_to_point(&position);
                if distance > object.scale.x {
                    return;
                }
                let along = (position - self.ray.origin).dot(&self.ray.direction);
                out.push(Intersection {
                    distance: along.max(0.0),
                    point: position,
                    face_index: None,
                    object: Arc::clone(object_ref),
                });
            }
            ObjectKind::Mesh(mesh) => {
                self.intersect_mesh(&object, mesh, object_ref, out);
            }
            _ => {}
        }
    }

    fn intersect_mesh(
        &self,
        object: &Object3D,
        mesh: &crate::objects::Mesh,
        object_ref: &ObjectRef,
        out: &mut Vec<Intersection>,
    ) {
        let MeshGeometry::Faces(geometry) = &mesh.geometry else {
            return;
        };
        let Ok(mut geometry) = geometry.write() else {
            return;
        };

        // cheap reject against the world-scaled bounding sphere
        if geometry.bounding_sphere.is_none() {
            geometry.compute_bounding_sphere();
        }
        if let Some(sphere) = geometry.bounding_sphere {
            let world_sphere = sphere.apply_matrix4(&object.matrix_world);
            let center_distance = self.ray.distance_to_point(&world_sphere.center);
            if center_distance > world_sphere.radius {
                return;
            }
        }

        let side = mesh
            .material
            .read()
            .map(|m| m.side)
            .unwrap_or(Side::Front);

        let mut rotation = Matrix4::IDENTITY;
        rotation.extract_rotation(&object.matrix_world);

        for (face_index, face) in geometry.faces.iter().enumerate() {
            // plane test against the world-space face
            let centroid = object.matrix_world.transform_point(&face.centroid);
            let normal = rotation.transform_direction(&face.normal);

            let denom = self.ray.direction.dot(&normal);
            if denom.abs() < self.precision {
                continue;
            }

            let scalar = normal.dot(&(centroid - self.ray.origin)) / denom;
            if scalar < 0.0 {
                continue;
            }

            let front_facing = denom < 0.0;
            let accept = match side {
                Side::Double => true,
                Side::Front => front_facing,
                Side::Back => !front_facing,
            };
            if !accept {
                continue;
            }

            let point = self.ray.at(scalar);
            let distance = self.ray.origin.distance_to(&point);
            if distance < self.near || distance > self.far {
                continue;
            }

            let triangle = Triangle::new(
                object.matrix_world.transform_point(&geometry.vertices[face.a]),
                object.matrix_world.transform_point(&geometry.vertices[face.b]),
                object.matrix_world.transform_point(&geometry.vertices[face.c]),
            );

            if triangle.contains_point(&point) {
                out.push(Intersection {
                    distance,
                    point,
                    face_index: Some(face_index),
                    object: Arc::clone(object_ref),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::box_geometry;
    use crate::material::Material;
    use crate::math::Color;
    use crate::objects::Mesh;
    use crate::scene::Scene;

    fn cube_at(x: f32) -> ObjectRef {
        let mut geometry = box_geometry(1.0, 1.0, 1.0);
        geometry.compute_centroids();
        let material = Material::basic(Color::WHITE).into_ref();
        let mut node =
            Object3D::with_kind(ObjectKind::Mesh(Mesh::new(geometry.into_ref(), material)));
        node.position = Vector3::new(x, 0.0, 0.0);
        node.into_ref()
    }

    #[test]
    fn test_ray_between_cubes_misses() {
        let scene = Scene::new();
        let left = cube_at(-1.0);
        let right = cube_at(1.0);
        scene.add(&left);
        scene.add(&right);
        scene.update_matrix_world();

        let caster = Raycaster::new(Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let hits = caster.intersect_objects(&[left, right], false);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_ray_hits_near_cube_front_face() {
        let scene = Scene::new();
        let cube = cube_at(-1.0);
        scene.add(&cube);
        scene.update_matrix_world();

        // aim down -z through the cube center
        let caster = Raycaster::new(Vector3::new(-1.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let hits = caster.intersect_object(&cube, false);

        assert!(!hits.is_empty());
        // front face of a unit cube at z = 0.5, so distance is 4.5; only
        // front faces count for a front-side material
        assert!((hits[0].distance - 4.5).abs() < 1e-4);
        for hit in &hits {
            assert!(hit.face_index.is_some());
        }
    }

    #[test]
    fn test_near_far_window() {
        let scene = Scene::new();
        let cube = cube_at(0.0);
        scene.add(&cube);
        scene.update_matrix_world();

        let mut caster =
            Raycaster::new(Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        caster.far = 2.0;
        assert!(caster.intersect_object(&cube, false).is_empty());

        caster.far = f32::INFINITY;
        caster.near = 10.0;
        assert!(caster.intersect_object(&cube, false).is_empty());
    }

    #[test]
    fn test_double_sided_hits_back_faces() {
        let scene = Scene::new();
        let cube = cube_at(0.0);
        scene.add(&cube);
        scene.update_matrix_world();

        if let Ok(object) = cube.read() {
            if let ObjectKind::Mesh(mesh) = &object.kind {
                mesh.material.write().unwrap().side = Side::Double;
            }
        }

        let caster = Raycaster::new(Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let hits = caster.intersect_object(&cube, false);
        // front and back faces, two triangles each
        assert_eq!(hits.len(), 4);
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[test]
    fn test_particle_pick_by_scale() {
        let material = Material::basic(Color::WHITE).into_ref();
        let mut node = Object3D::with_kind(ObjectKind::Particle(crate::objects::Particle {
            material,
        }));
        node.position = Vector3::new(0.2, 0.0, 0.0);
        node.scale = Vector3::splat(0.5);
        let node = node.into_ref();
        Object3D::update_matrix_world(&node, false);

        let caster = Raycaster::new(Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(caster.intersect_object(&node, false).len(), 1);

        node.write().unwrap().scale = Vector3::splat(0.1);
        Object3D::update_matrix_world(&node, false);
        assert!(caster.intersect_object(&node, false).is_empty());
    }
}
