//! Geometry groups: the material-index + 16-bit-index-window partition of
//! a geometry's faces. A group is the unit of GPU buffer upload and draw
//! dispatch.

use super::geometry::Geometry;
use crate::renderer::gl::BufferHandle;
use std::collections::HashMap;

/// Hard cap on vertices per group so indices fit in `u16`.
pub const MAX_GROUP_VERTICES: usize = 65_535;

/// A slice of a geometry's faces sharing one material index and fitting a
/// 16-bit index window, together with its GPU buffers and CPU staging
/// arrays.
#[derive(Debug, Default)]
pub struct GeometryGroup {
    /// Renderer-assigned ordinal, used in the buffer-rebind hash.
    pub(crate) id: u64,
    /// The material index every face in this group shares.
    pub material_index: usize,
    /// Indices into the parent geometry's face list, in input order.
    pub faces: Vec<usize>,
    /// Total vertex count (3 per face).
    pub vertex_count: usize,

    // GPU buffer handles, created on first use by the renderer.
    pub(crate) vertex_buffer: Option<BufferHandle>,
    pub(crate) normal_buffer: Option<BufferHandle>,
    pub(crate) tangent_buffer: Option<BufferHandle>,
    pub(crate) color_buffer: Option<BufferHandle>,
    pub(crate) uv_buffer: Option<BufferHandle>,
    pub(crate) uv2_buffer: Option<BufferHandle>,
    pub(crate) skin_index_buffer: Option<BufferHandle>,
    pub(crate) skin_weight_buffer: Option<BufferHandle>,
    pub(crate) face_buffer: Option<BufferHandle>,
    pub(crate) line_buffer: Option<BufferHandle>,
    pub(crate) morph_target_buffers: Vec<BufferHandle>,
    pub(crate) morph_normal_buffers: Vec<BufferHandle>,
    pub(crate) custom_buffers: HashMap<String, BufferHandle>,

    // CPU staging arrays mirroring the buffers. Dropped after upload for
    // static geometries.
    pub(crate) position_array: Vec<f32>,
    pub(crate) normal_array: Vec<f32>,
    pub(crate) tangent_array: Vec<f32>,
    pub(crate) color_array: Vec<f32>,
    pub(crate) uv_array: Vec<f32>,
    pub(crate) uv2_array: Vec<f32>,
    pub(crate) skin_index_array: Vec<f32>,
    pub(crate) skin_weight_array: Vec<f32>,
    pub(crate) face_array: Vec<u16>,
    pub(crate) line_array: Vec<u16>,
    pub(crate) morph_target_arrays: Vec<Vec<f32>>,
    pub(crate) morph_normal_arrays: Vec<Vec<f32>>,

    /// Index count of the triangle index buffer.
    pub(crate) face_index_count: usize,
    /// Index count of the wireframe line index buffer.
    pub(crate) line_index_count: usize,

    pub(crate) buffers_created: bool,
}

impl GeometryGroup {
    /// Create an empty group for a material index.
    pub fn new(material_index: usize) -> Self {
        Self {
            material_index,
            ..Default::default()
        }
    }

    /// Release the staging arrays once a static geometry is uploaded.
    pub(crate) fn dispose_staging(&mut self) {
        self.position_array = Vec::new();
        self.normal_array = Vec::new();
        self.tangent_array = Vec::new();
        self.color_array = Vec::new();
        self.uv_array = Vec::new();
        self.uv2_array = Vec::new();
        self.skin_index_array = Vec::new();
        self.skin_weight_array = Vec::new();
        self.face_array = Vec::new();
        self.line_array = Vec::new();
        self.morph_target_arrays = Vec::new();
        self.morph_normal_arrays = Vec::new();
    }

    /// Drain all GPU handles for deletion by the renderer.
    pub(crate) fn take_buffers(&mut self) -> Vec<BufferHandle> {
        let mut handles = Vec::new();
        for slot in [
            &mut self.vertex_buffer,
            &mut self.normal_buffer,
            &mut self.tangent_buffer,
            &mut self.color_buffer,
            &mut self.uv_buffer,
            &mut self.uv2_buffer,
            &mut self.skin_index_buffer,
            &mut self.skin_weight_buffer,
            &mut self.face_buffer,
            &mut self.line_buffer,
        ] {
            if let Some(handle) = slot.take() {
                handles.push(handle);
            }
        }
        handles.append(&mut self.morph_target_buffers);
        handles.append(&mut self.morph_normal_buffers);
        handles.extend(self.custom_buffers.drain().map(|(_, handle)| handle));
        self.buffers_created = false;
        handles
    }
}

impl Geometry {
    /// Partition faces into geometry groups keyed by material index,
    /// opening a new group whenever appending a face would push a group
    /// past [`MAX_GROUP_VERTICES`]. Faces are assigned in input order and
    /// groups keep first-seen order.
    pub fn sort_faces_by_material(&mut self) {
        // material index -> (overflow counter, slot in self.groups)
        let mut open: HashMap<usize, (usize, usize)> = HashMap::new();
        self.groups.clear();

        for (f, face) in self.faces.iter().enumerate() {
            let material_index = face.material_index;

            let slot = match open.get(&material_index) {
                Some(&(_, slot)) if self.groups[slot].vertex_count + 3 <= MAX_GROUP_VERTICES => {
                    slot
                }
                Some(&(counter, _)) => {
                    let slot = self.groups.len();
                    self.groups.push(GeometryGroup::new(material_index));
                    open.insert(material_index, (counter + 1, slot));
                    slot
                }
                None => {
                    let slot = self.groups.len();
                    self.groups.push(GeometryGroup::new(material_index));
                    open.insert(material_index, (0, slot));
                    slot
                }
            };

            let group = &mut self.groups[slot];
            group.faces.push(f);
            group.vertex_count += 3;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Face3;
    use crate::math::Vector3;

    fn geometry_with_faces(count: usize, material_index: usize) -> Geometry {
        let mut g = Geometry::new();
        g.vertices = vec![Vector3::ZERO, Vector3::UNIT_X, Vector3::UNIT_Y];
        g.faces = (0..count)
            .map(|_| Face3::with_material(0, 1, 2, material_index))
            .collect();
        g
    }

    #[test]
    fn test_single_group_under_limit() {
        let mut g = geometry_with_faces(100, 0);
        g.sort_faces_by_material();
        assert_eq!(g.groups.len(), 1);
        assert_eq!(g.groups[0].faces.len(), 100);
        assert_eq!(g.groups[0].vertex_count, 300);
    }

    #[test]
    fn test_group_split_at_index_limit() {
        // 30_000 faces = 90_000 vertices, needs at least two groups
        let mut g = geometry_with_faces(30_000, 0);
        g.sort_faces_by_material();

        assert!(g.groups.len() >= 2);
        let mut total = 0;
        for group in g.groups() {
            assert!(group.vertex_count <= MAX_GROUP_VERTICES);
            assert_eq!(group.material_index, 0);
            total += group.faces.len();
        }
        assert_eq!(total, 30_000);

        // faces keep input order within groups, and group boundaries
        // preserve it too
        let flattened: Vec<usize> = g.groups().iter().flat_map(|g| g.faces.clone()).collect();
        let mut sorted = flattened.clone();
        sorted.sort_unstable();
        assert_eq!(flattened, sorted);
    }

    #[test]
    fn test_groups_keyed_by_material_first_seen_order() {
        let mut g = Geometry::new();
        g.vertices = vec![Vector3::ZERO, Vector3::UNIT_X, Vector3::UNIT_Y];
        g.faces = vec![
            Face3::with_material(0, 1, 2, 2),
            Face3::with_material(0, 1, 2, 0),
            Face3::with_material(0, 1, 2, 2),
            Face3::with_material(0, 1, 2, 1),
        ];
        g.sort_faces_by_material();

        let indices: Vec<usize> = g.groups().iter().map(|g| g.material_index).collect();
        assert_eq!(indices, vec![2, 0, 1]);
        assert_eq!(g.groups()[0].faces, vec![0, 2]);
    }

    #[test]
    fn test_every_face_in_exactly_one_group() {
        let mut g = geometry_with_faces(500, 3);
        g.sort_faces_by_material();
        let mut seen = vec![0usize; g.faces.len()];
        for group in g.groups() {
            for &f in &group.faces {
                seen[f] += 1;
            }
        }
        assert!(seen.iter().all(|&count| count == 1));
    }
}
