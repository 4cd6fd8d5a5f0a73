//! Face-based geometry: ordered vertices, triangle faces with per-face
//! shading data, UV layers, morph targets and skin weights.

use super::group::GeometryGroup;
use crate::core::{generate_uuid, Id};
use crate::math::{Box3, Matrix4, Sphere, Vector2, Vector3, Vector4};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Shared geometry handle.
pub type GeometryRef = Arc<RwLock<Geometry>>;

/// Number of UV layers a geometry carries.
pub const UV_LAYERS: usize = 2;

/// A triangle face referencing three vertex indices.
#[derive(Debug, Clone, Default)]
pub struct Face3 {
    /// First vertex index.
    pub a: usize,
    /// Second vertex index.
    pub b: usize,
    /// Third vertex index.
    pub c: usize,
    /// Face normal.
    pub normal: Vector3,
    /// Per-vertex normals; empty or exactly 3.
    pub vertex_normals: Vec<Vector3>,
    /// Face color (used with [`VertexColorMode::Face`]).
    ///
    /// [`VertexColorMode::Face`]: crate::material::VertexColorMode::Face
    pub color: crate::math::Color,
    /// Per-vertex colors; empty or exactly 3.
    pub vertex_colors: Vec<crate::math::Color>,
    /// Per-vertex tangents as (xyz, handedness); empty or exactly 3.
    pub vertex_tangents: Vec<Vector4>,
    /// Face centroid, maintained by [`Geometry::compute_centroids`].
    pub centroid: Vector3,
    /// Index into the mesh's material list; also the group partition key.
    pub material_index: usize,
}

impl Face3 {
    /// Create a face from three vertex indices.
    pub fn new(a: usize, b: usize, c: usize) -> Self {
        Self { a, b, c, ..Default::default() }
    }

    /// Create a face with a material index.
    pub fn with_material(a: usize, b: usize, c: usize, material_index: usize) -> Self {
        Self { a, b, c, material_index, ..Default::default() }
    }

    /// The three indices in order.
    #[inline]
    pub fn indices(&self) -> [usize; 3] {
        [self.a, self.b, self.c]
    }
}

/// A named alternate vertex-position array blended with the base mesh by
/// a per-object influence.
#[derive(Debug, Clone)]
pub struct MorphTarget {
    /// Target name.
    pub name: String,
    /// Parallel vertex array; same length as `Geometry::vertices`.
    pub vertices: Vec<Vector3>,
}

/// Normals for one morph target.
#[derive(Debug, Clone, Default)]
pub struct MorphNormals {
    /// One normal per face.
    pub face_normals: Vec<Vector3>,
    /// Three normals per face.
    pub vertex_normals: Vec<[Vector3; 3]>,
}

/// Geometry dirty flags, observed and cleared by the renderer's
/// per-frame sync.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometryDirty {
    /// Vertex positions changed.
    pub vertices: bool,
    /// Face indices changed.
    pub elements: bool,
    /// UVs changed.
    pub uvs: bool,
    /// Normals changed.
    pub normals: bool,
    /// Tangents changed.
    pub tangents: bool,
    /// Colors changed.
    pub colors: bool,
    /// Morph target positions changed.
    pub morph_targets: bool,
    /// Dashed-line distances changed.
    pub line_distances: bool,
}

impl GeometryDirty {
    /// Flag everything, as after first upload.
    pub fn all() -> Self {
        Self {
            vertices: true,
            elements: true,
            uvs: true,
            normals: true,
            tangents: true,
            colors: true,
            morph_targets: true,
            line_distances: true,
        }
    }

    /// True if any flag is set.
    pub fn any(&self) -> bool {
        self.vertices
            || self.elements
            || self.uvs
            || self.normals
            || self.tangents
            || self.colors
            || self.morph_targets
            || self.line_distances
    }

    /// Clear every flag.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Face-based triangle geometry.
pub struct Geometry {
    id: Id,
    uuid: String,
    /// Optional name for debugging.
    pub name: String,

    /// Ordered vertex positions.
    pub vertices: Vec<Vector3>,
    /// Per-vertex colors for line/particle objects, aligned with
    /// `vertices`.
    pub colors: Vec<crate::math::Color>,
    /// Triangle faces.
    pub faces: Vec<Face3>,
    /// Up to two UV layers; per face, three UVs.
    pub face_vertex_uvs: [Vec<[Vector2; 3]>; UV_LAYERS],

    /// Morph targets.
    pub morph_targets: Vec<MorphTarget>,
    /// Morph normals, parallel to `morph_targets` when present.
    pub morph_normals: Vec<MorphNormals>,

    /// Bone indices per vertex (as floats for attribute upload).
    pub skin_indices: Vec<Vector4>,
    /// Bone weights per vertex.
    pub skin_weights: Vec<Vector4>,

    /// Cumulative distances for dashed lines, aligned with `vertices`.
    pub line_distances: Vec<f32>,

    /// Cached bounding box.
    pub bounding_box: Option<Box3>,
    /// Cached bounding sphere.
    pub bounding_sphere: Option<Sphere>,

    /// Tangents have been computed.
    pub has_tangents: bool,
    /// Keep staging arrays after upload so the geometry can mutate.
    pub dynamic: bool,

    /// Dirty flags synced by the renderer.
    pub dirty: GeometryDirty,

    pub(crate) groups: Vec<GeometryGroup>,

    // scratch reused across compute_vertex_normals calls
    normals_scratch: Vec<Vector3>,
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new()
    }
}

impl Geometry {
    /// Create an empty geometry.
    pub fn new() -> Self {
        Self {
            id: Id::new(),
            uuid: generate_uuid(),
            name: String::new(),
            vertices: Vec::new(),
            colors: Vec::new(),
            faces: Vec::new(),
            face_vertex_uvs: [Vec::new(), Vec::new()],
            morph_targets: Vec::new(),
            morph_normals: Vec::new(),
            skin_indices: Vec::new(),
            skin_weights: Vec::new(),
            line_distances: Vec::new(),
            bounding_box: None,
            bounding_sphere: None,
            has_tangents: false,
            dynamic: true,
            dirty: GeometryDirty::default(),
            groups: Vec::new(),
            normals_scratch: Vec::new(),
        }
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

    /// The material/index-window partition, empty until
    /// [`sort_faces_by_material`](super::group) runs.
    pub fn groups(&self) -> &[GeometryGroup] {
        &self.groups
    }

    /// Basic structural validity: all face indices in range and per-face
    /// arrays of length 0 or 3.
    pub fn validate(&self) -> Result<(), String> {
        if self.vertices.is_empty() {
            return Err("geometry has no vertices".into());
        }
        for (i, face) in self.faces.iter().enumerate() {
            for index in face.indices() {
                if index >= self.vertices.len() {
                    return Err(format!(
                        "face {i} references vertex {index} of {}",
                        self.vertices.len()
                    ));
                }
            }
            for (len, what) in [
                (face.vertex_normals.len(), "vertex normals"),
                (face.vertex_colors.len(), "vertex colors"),
                (face.vertex_tangents.len(), "vertex tangents"),
            ] {
                if len != 0 && len != 3 {
                    return Err(format!("face {i} has {len} {what}"));
                }
            }
        }
        Ok(())
    }

    /// Transform all vertices; rotate face normals, per-vertex normals
    /// and centroids by the rotation part of the matrix.
    pub fn apply_matrix(&mut self, matrix: &Matrix4) {
        let mut rotation = Matrix4::IDENTITY;
        rotation.extract_rotation(matrix);

        for vertex in &mut self.vertices {
            *vertex = matrix.transform_point(vertex);
        }

        for face in &mut self.faces {
            face.normal = rotation.transform_direction(&face.normal);
            for normal in &mut face.vertex_normals {
                *normal = rotation.transform_direction(normal);
            }
            face.centroid = matrix.transform_point(&face.centroid);
        }

        self.bounding_box = None;
        self.bounding_sphere = None;
    }

    /// Recompute each face's centroid from its vertices.
    pub fn compute_centroids(&mut self) {
        for face in &mut self.faces {
            let mut centroid = Vector3::ZERO;
            for index in face.indices() {
                centroid += self.vertices[index];
            }
            centroid.divide_scalar(3.0);
            face.centroid = centroid;
        }
    }

    /// Recompute face normals as the normalized cross of
    /// `(vC - vB) x (vA - vB)`.
    pub fn compute_face_normals(&mut self) {
        for face in &mut self.faces {
            let va = self.vertices[face.a];
            let vb = self.vertices[face.b];
            let vc = self.vertices[face.c];

            let mut normal = (vc - vb).cross(&(va - vb));
            if !normal.is_zero() {
                normal.normalize();
            }
            face.normal = normal;
        }
    }

    /// Recompute per-vertex normals as the normalized sum of incident
    /// face normals. The scratch buffer is kept across calls.
    pub fn compute_vertex_normals(&mut self) {
        if self.normals_scratch.len() != self.vertices.len() {
            self.normals_scratch = vec![Vector3::ZERO; self.vertices.len()];
        } else {
            self.normals_scratch.fill(Vector3::ZERO);
        }

        for face in &self.faces {
            for index in face.indices() {
                self.normals_scratch[index] += face.normal;
            }
        }

        for normal in &mut self.normals_scratch {
            normal.normalize();
        }

        for face in &mut self.faces {
            face.vertex_normals = face
                .indices()
                .map(|index| self.normals_scratch[index])
                .to_vec();
        }
    }

    /// Compute per-vertex tangents from UV layer 0 gradients, storing a
    /// 4-vector `(T.xyz, handedness)` per face vertex.
    ///
    /// Faces need vertex normals (run
    /// [`compute_vertex_normals`](Self::compute_vertex_normals) first) and
    /// the UV layer must cover every face.
    pub fn compute_tangents(&mut self) {
        let mut tan1 = vec![Vector3::ZERO; self.vertices.len()];
        let mut tan2 = vec![Vector3::ZERO; self.vertices.len()];

        for (f, face) in self.faces.iter().enumerate() {
            let Some(uv) = self.face_vertex_uvs[0].get(f) else {
                continue;
            };

            let va = self.vertices[face.a];
            let vb = self.vertices[face.b];
            let vc = self.vertices[face.c];

            let x1 = vb.x - va.x;
            let x2 = vc.x - va.x;
            let y1 = vb.y - va.y;
            let y2 = vc.y - va.y;
            let z1 = vb.z - va.z;
            let z2 = vc.z - va.z;

            let s1 = uv[1].x - uv[0].x;
            let s2 = uv[2].x - uv[0].x;
            let t1 = uv[1].y - uv[0].y;
            let t2 = uv[2].y - uv[0].y;

            let denom = s1 * t2 - s2 * t1;
            if denom == 0.0 {
                continue;
            }
            let r = 1.0 / denom;

            let sdir = Vector3::new(
                (t2 * x1 - t1 * x2) * r,
                (t2 * y1 - t1 * y2) * r,
                (t2 * z1 - t1 * z2) * r,
            );
            let tdir = Vector3::new(
                (s1 * x2 - s2 * x1) * r,
                (s1 * y2 - s2 * y1) * r,
                (s1 * z2 - s2 * z1) * r,
            );

            for index in face.indices() {
                tan1[index] += sdir;
                tan2[index] += tdir;
            }
        }

        for face in &mut self.faces {
            if face.vertex_normals.len() != 3 {
                continue;
            }

            let mut tangents = Vec::with_capacity(3);
            for (i, index) in face.indices().into_iter().enumerate() {
                let n = face.vertex_normals[i];
                let t = tan1[index];

                // Gram-Schmidt orthogonalize
                let mut tangent = t - n * n.dot(&t);
                tangent.normalize();

                // handedness from the bitangent direction
                let w = if n.cross(&t).dot(&tan2[index]) < 0.0 {
                    -1.0
                } else {
                    1.0
                };

                tangents.push(Vector4::from_vec3(tangent, w));
            }
            face.vertex_tangents = tangents;
        }

        self.has_tangents = true;
    }

    /// Recompute the cached bounding box.
    pub fn compute_bounding_box(&mut self) {
        self.bounding_box = Some(Box3::from_points(&self.vertices));
    }

    /// Recompute the cached bounding sphere.
    pub fn compute_bounding_sphere(&mut self) {
        self.bounding_sphere = Some(Sphere::from_points(&self.vertices));
    }

    /// Cumulative vertex-to-vertex distances for dashed lines.
    pub fn compute_line_distances(&mut self) {
        self.line_distances.clear();
        self.line_distances.reserve(self.vertices.len());

        let mut total = 0.0;
        for (i, vertex) in self.vertices.iter().enumerate() {
            if i > 0 {
                total += vertex.distance_to(&self.vertices[i - 1]);
            }
            self.line_distances.push(total);
        }
    }

    /// Deduplicate vertices whose positions agree to four decimal places,
    /// rewriting face indices through a remap table. Returns the number
    /// of vertices removed.
    pub fn merge_vertices(&mut self) -> usize {
        const PRECISION: f32 = 1e4;

        let mut buckets: HashMap<(i64, i64, i64), usize> = HashMap::new();
        let mut unique: Vec<Vector3> = Vec::with_capacity(self.vertices.len());
        let mut changes: Vec<usize> = vec![0; self.vertices.len()];

        for (i, v) in self.vertices.iter().enumerate() {
            let key = (
                (v.x * PRECISION).round() as i64,
                (v.y * PRECISION).round() as i64,
                (v.z * PRECISION).round() as i64,
            );

            match buckets.get(&key) {
                None => {
                    buckets.insert(key, i);
                    unique.push(*v);
                    changes[i] = unique.len() - 1;
                }
                Some(&first) => {
                    changes[i] = changes[first];
                }
            }
        }

        for face in &mut self.faces {
            face.a = changes[face.a];
            face.b = changes[face.b];
            face.c = changes[face.c];
        }

        let removed = self.vertices.len() - unique.len();
        self.vertices = unique;
        removed
    }

    /// Wrap into a shared handle.
    pub fn into_ref(self) -> GeometryRef {
        Arc::new(RwLock::new(self))
    }
}

impl std::fmt::Debug for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Geometry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("vertices", &self.vertices.len())
            .field("faces", &self.faces.len())
            .field("groups", &self.groups.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_triangles() -> Geometry {
        let mut g = Geometry::new();
        g.vertices = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
        ];
        g.faces = vec![Face3::new(0, 1, 2), Face3::new(2, 1, 3)];
        g
    }

    #[test]
    fn test_face_normals_unit_length() {
        let mut g = two_triangles();
        g.compute_face_normals();
        for face in &g.faces {
            assert!((face.normal.length() - 1.0).abs() < 1e-6);
            assert!(face.normal.approx_eq(&Vector3::UNIT_Z, 1e-6));
        }
    }

    #[test]
    fn test_vertex_normals_are_normalized_sums() {
        let mut g = two_triangles();
        g.compute_face_normals();
        g.compute_vertex_normals();
        for face in &g.faces {
            assert_eq!(face.vertex_normals.len(), 3);
            for n in &face.vertex_normals {
                assert!((n.length() - 1.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_merge_vertices() {
        let mut g = Geometry::new();
        g.vertices = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.00001, 0.0, 0.0), // merges with vertex 0 at 1e-4
            Vector3::new(0.0, 1.0, 0.0),
        ];
        g.faces = vec![Face3::new(2, 1, 3)];
        let removed = g.merge_vertices();
        assert_eq!(removed, 1);
        assert_eq!(g.vertices.len(), 3);
        assert_eq!(g.faces[0].a, 0);
        assert_eq!(g.faces[0].b, 1);
        assert_eq!(g.faces[0].c, 2);
        assert!(g.validate().is_ok());
    }

    #[test]
    fn test_apply_matrix_moves_vertices_and_rotates_normals() {
        let mut g = two_triangles();
        g.compute_face_normals();
        g.compute_centroids();
        let m = Matrix4::from_rotation_x(std::f32::consts::FRAC_PI_2)
            .multiply(&Matrix4::from_translation(&Vector3::new(0.0, 0.0, 0.0)));
        g.apply_matrix(&m);
        // +Z normal rotates to +Y under a 90 degree X rotation
        assert!(g.faces[0].normal.approx_eq(&Vector3::new(0.0, -1.0, 0.0), 1e-5)
            || g.faces[0].normal.approx_eq(&Vector3::new(0.0, 1.0, 0.0), 1e-5));
    }

    #[test]
    fn test_line_distances_cumulative() {
        let mut g = Geometry::new();
        g.vertices = vec![
            Vector3::ZERO,
            Vector3::new(3.0, 0.0, 0.0),
            Vector3::new(3.0, 4.0, 0.0),
        ];
        g.compute_line_distances();
        assert_eq!(g.line_distances, vec![0.0, 3.0, 7.0]);
    }

    #[test]
    fn test_validate_catches_out_of_range() {
        let mut g = two_triangles();
        g.faces[0].c = 17;
        assert!(g.validate().is_err());
    }
}
