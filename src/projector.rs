//! CPU-side scene projection: walks the graph, pushes vertices and face
//! centroids through `projection * view * world` and produces a flat,
//! depth-sorted list of renderable elements in normalized device
//! coordinates. Used for software rasterization and picking.

use crate::camera::Camera;
use crate::math::{Matrix4, Ray, Vector3};
use crate::objects::{LineType, MeshGeometry};
use crate::scene::{Object3D, ObjectKind, ObjectRef, Scene};
use std::sync::Arc;

/// A projected triangle.
#[derive(Debug, Clone)]
pub struct RenderableFace {
    /// Projected corner positions in NDC.
    pub v: [Vector3; 3],
    /// World-space corner positions.
    pub world: [Vector3; 3],
    /// World-space face normal.
    pub normal: Vector3,
    /// Face index within the source geometry.
    pub face_index: usize,
    /// Material index of the face.
    pub material_index: usize,
    /// Source object.
    pub object: ObjectRef,
    /// Sort depth (projected centroid z).
    pub z: f32,
}

/// A projected line segment.
#[derive(Debug, Clone)]
pub struct RenderableLine {
    /// Projected endpoints in NDC.
    pub v: [Vector3; 2],
    /// Source object.
    pub object: ObjectRef,
    /// Sort depth.
    pub z: f32,
}

/// A projected particle or sprite.
#[derive(Debug, Clone)]
pub struct RenderableParticle {
    /// Projected position in NDC.
    pub position: Vector3,
    /// World-space scale (x, y).
    pub scale: (f32, f32),
    /// Source object.
    pub object: ObjectRef,
    /// Sort depth.
    pub z: f32,
}

/// A projected element of any kind.
#[derive(Debug, Clone)]
pub enum Renderable {
    /// Triangle.
    Face(RenderableFace),
    /// Line segment.
    Line(RenderableLine),
    /// Particle or sprite.
    Particle(RenderableParticle),
}

impl Renderable {
    /// Sort depth of the element.
    pub fn z(&self) -> f32 {
        match self {
            Renderable::Face(f) => f.z,
            Renderable::Line(l) => l.z,
            Renderable::Particle(p) => p.z,
        }
    }
}

/// Result of projecting a scene.
#[derive(Debug, Default)]
pub struct ProjectedScene {
    /// All projected elements, back-to-front when sorting was requested.
    pub elements: Vec<Renderable>,
    /// The scene's light nodes.
    pub lights: Vec<ObjectRef>,
}

/// Scene-to-screen projector.
#[derive(Debug, Default)]
pub struct Projector;

impl Projector {
    /// Create a projector.
    pub fn new() -> Self {
        Self
    }

    /// Project a world-space point into NDC.
    pub fn project_vector(&self, vector: &Vector3, camera_node: &ObjectRef) -> Vector3 {
        let matrix = self.view_projection(camera_node);
        matrix.transform_point(vector)
    }

    /// Map an NDC point back into world space.
    pub fn unproject_vector(&self, vector: &Vector3, camera_node: &ObjectRef) -> Vector3 {
        let matrix = self.view_projection(camera_node).inverse();
        matrix.transform_point(vector)
    }

    /// Build a world-space picking ray through an NDC point
    /// (x, y in -1..1).
    pub fn picking_ray(&self, ndc_x: f32, ndc_y: f32, camera_node: &ObjectRef) -> Ray {
        let near = self.unproject_vector(&Vector3::new(ndc_x, ndc_y, -1.0), camera_node);
        let far = self.unproject_vector(&Vector3::new(ndc_x, ndc_y, 1.0), camera_node);
        Ray::new(near, (far - near).normalized())
    }

    /// Project every renderable in the scene. With `sort`, elements come
    /// back ordered far-to-near by projected depth.
    pub fn project_scene(
        &self,
        scene: &Scene,
        camera_node: &ObjectRef,
        sort: bool,
    ) -> ProjectedScene {
        scene.update_matrix_world();
        if camera_node.read().map(|c| c.parent().is_none()).unwrap_or(true) {
            Object3D::update_matrix_world(camera_node, false);
        }

        let view_projection = self.view_projection(camera_node);

        let mut result = ProjectedScene {
            lights: scene.with_data(|data| data.lights.clone()).unwrap_or_default(),
            ..Default::default()
        };

        scene.traverse(&mut |node| {
            self.project_object(node, &view_projection, &mut result.elements);
        });

        if sort {
            result
                .elements
                .sort_by(|a, b| a.z().partial_cmp(&b.z()).unwrap_or(std::cmp::Ordering::Equal));
        }

        result
    }

    fn view_projection(&self, camera_node: &ObjectRef) -> Matrix4 {
        let Ok(node) = camera_node.read() else {
            return Matrix4::IDENTITY;
        };
        let view = node.matrix_world.inverse();
        match &node.kind {
            ObjectKind::Camera(Camera { projection_matrix, .. }) => {
                projection_matrix.multiply(&view)
            }
            _ => view,
        }
    }

    fn project_object(
        &self,
        node_ref: &ObjectRef,
        view_projection: &Matrix4,
        out: &mut Vec<Renderable>,
    ) {
        let Ok(node) = node_ref.read() else { return };
        if !node.visible {
            return;
        }

        match &node.kind {
            ObjectKind::Mesh(mesh) => {
                let MeshGeometry::Faces(geometry) = &mesh.geometry else {
                    return;
                };
                let Ok(geometry) = geometry.read() else { return };

                let mut rotation = Matrix4::IDENTITY;
                rotation.extract_rotation(&node.matrix_world);

                for (face_index, face) in geometry.faces.iter().enumerate() {
                    let world: [Vector3; 3] = face
                        .indices()
                        .map(|i| node.matrix_world.transform_point(&geometry.vertices[i]));
                    let projected = world.map(|p| view_projection.transform_point(&p));

                    // drop faces entirely outside the depth range
                    if projected.iter().all(|p| p.z < -1.0) || projected.iter().all(|p| p.z > 1.0)
                    {
                        continue;
                    }

                    let centroid_world = node.matrix_world.transform_point(&face.centroid);
                    let z = view_projection.transform_point(&centroid_world).z;

                    out.push(Renderable::Face(RenderableFace {
                        v: projected,
                        world,
                        normal: rotation.transform_direction(&face.normal),
                        face_index,
                        material_index: face.material_index,
                        object: Arc::clone(node_ref),
                        z,
                    }));
                }
            }
            ObjectKind::Line(line) => {
                let Ok(geometry) = line.geometry.read() else {
                    return;
                };

                let step = match line.line_type {
                    LineType::Strip => 1,
                    LineType::Pieces => 2,
                };

                let mut index = 0;
                while index + 1 < geometry.vertices.len() {
                    let a = node.matrix_world.transform_point(&geometry.vertices[index]);
                    let b = node
                        .matrix_world
                        .transform_point(&geometry.vertices[index + 1]);
                    let pa = view_projection.transform_point(&a);
                    let pb = view_projection.transform_point(&b);

                    if (pa.z >= -1.0 && pa.z <= 1.0) || (pb.z >= -1.0 && pb.z <= 1.0) {
                        out.push(Renderable::Line(RenderableLine {
                            v: [pa, pb],
                            object: Arc::clone(node_ref),
                            z: (pa.z + pb.z) * 0.5,
                        }));
                    }
                    index += step;
                }
            }
            ObjectKind::ParticleSystem(system) => {
                let Ok(geometry) = system.geometry.read() else {
                    return;
                };
                for vertex in &geometry.vertices {
                    let world = node.matrix_world.transform_point(vertex);
                    let projected = view_projection.transform_point(&world);
                    if projected.z < -1.0 || projected.z > 1.0 {
                        continue;
                    }
                    out.push(Renderable::Particle(RenderableParticle {
                        position: projected,
                        scale: (node.scale.x, node.scale.y),
                        object: Arc::clone(node_ref),
                        z: projected.z,
                    }));
                }
            }
            ObjectKind::Particle(_) | ObjectKind::Sprite(_) => {
                let world = node.matrix_world.get_position();
                let projected = view_projection.transform_point(&world);
                if projected.z >= -1.0 && projected.z <= 1.0 {
                    out.push(Renderable::Particle(RenderableParticle {
                        position: projected,
                        scale: (node.scale.x, node.scale.y),
                        object: Arc::clone(node_ref),
                        z: projected.z,
                    }));
                }
            }
            _ => {}
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

    fn camera_at_z5() -> ObjectRef {
        let mut node =
            Object3D::with_kind(ObjectKind::Camera(Camera::perspective(60.0, 1.0, 0.1, 100.0)));
        node.position = Vector3::new(0.0, 0.0, 5.0);
        node.into_ref()
    }

    #[test]
    fn test_project_unproject_roundtrip() {
        let projector = Projector::new();
        let camera = camera_at_z5();
        Object3D::update_matrix_world(&camera, false);

        let point = Vector3::new(0.3, -0.2, 0.0);
        let ndc = projector.project_vector(&point, &camera);
        let back = projector.unproject_vector(&ndc, &camera);
        assert!(back.approx_eq(&point, 1e-3));
    }

    #[test]
    fn test_project_scene_produces_faces() {
        let scene = Scene::new();
        let geometry = box_geometry(1.0, 1.0, 1.0).into_ref();
        let material = Material::basic(Color::WHITE).into_ref();
        let mesh = Object3D::with_kind(ObjectKind::Mesh(Mesh::new(geometry, material))).into_ref();
        scene.add(&mesh);

        let camera = camera_at_z5();
        let projector = Projector::new();
        let projected = projector.project_scene(&scene, &camera, true);

        let faces = projected
            .elements
            .iter()
            .filter(|e| matches!(e, Renderable::Face(_)))
            .count();
        assert_eq!(faces, 12);

        // sorted far-to-near
        let depths: Vec<f32> = projected.elements.iter().map(Renderable::z).collect();
        let mut sorted = depths.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(depths, sorted);
    }

    #[test]
    fn test_picking_ray_points_into_scene() {
        let camera = camera_at_z5();
        Object3D::update_matrix_world(&camera, false);
        let projector = Projector::new();
        let ray = projector.picking_ray(0.0, 0.0, &camera);

        assert!(ray.origin.z < 5.0);
        assert!(ray.direction.z < 0.0);
    }
}
