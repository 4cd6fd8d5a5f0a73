//! Pre-indexed, pre-attributed geometry that skips the face model and
//! uploads typed arrays directly. The caller is responsible for
//! partitioning indices into 16-bit windows via draw offsets.

use crate::core::{generate_uuid, Id};
use crate::math::{Box3, Sphere, Vector3};
use crate::renderer::gl::BufferHandle;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Shared buffer-geometry handle.
pub type BufferGeometryRef = Arc<RwLock<BufferGeometry>>;

/// Attribute names with fixed meaning in the built-in shaders.
pub mod attribute_names {
    /// Vertex positions, vec3.
    pub const POSITION: &str = "position";
    /// Vertex normals, vec3.
    pub const NORMAL: &str = "normal";
    /// First UV set, vec2.
    pub const UV: &str = "uv";
    /// Second UV set, vec2.
    pub const UV2: &str = "uv2";
    /// Vertex colors, vec3.
    pub const COLOR: &str = "color";
    /// Tangents, vec4.
    pub const TANGENT: &str = "tangent";
}

/// A typed attribute array.
#[derive(Debug, Clone)]
pub struct BufferAttribute {
    /// Components per vertex.
    pub item_size: usize,
    /// Flat float array, `item_size` floats per vertex.
    pub array: Vec<f32>,
    /// Re-upload on next sync.
    pub needs_update: bool,
    pub(crate) buffer: Option<BufferHandle>,
}

impl BufferAttribute {
    /// Create an attribute from a flat array.
    pub fn new(item_size: usize, array: Vec<f32>) -> Self {
        Self {
            item_size,
            array,
            needs_update: true,
            buffer: None,
        }
    }

    /// Number of vertices covered.
    pub fn count(&self) -> usize {
        if self.item_size == 0 {
            0
        } else {
            self.array.len() / self.item_size
        }
    }
}

/// One indexed draw chunk: `count` indices starting at `start`, drawn
/// with attribute pointers re-based `index` vertices into the arrays.
/// Chunks exist so a `u16` index buffer can address more than 65 535
/// vertices; the caller pre-partitions indices so every chunk's local
/// indices stay within the 16-bit window of its base vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawOffset {
    /// First index within the index array.
    pub start: usize,
    /// Number of indices to draw.
    pub count: usize,
    /// Base vertex the chunk's attribute pointers start at.
    pub index: usize,
}

/// Attribute-array geometry with an optional `u16` index and draw
/// offsets.
pub struct BufferGeometry {
    id: Id,
    uuid: String,
    /// Optional name for debugging.
    pub name: String,
    /// Named attribute arrays.
    pub attributes: HashMap<String, BufferAttribute>,
    /// Triangle indices; `None` draws unindexed.
    pub index: Option<Vec<u16>>,
    /// Draw chunks. Empty with an index present means one chunk covering
    /// the whole index array.
    pub offsets: Vec<DrawOffset>,
    /// Cached bounding box.
    pub bounding_box: Option<Box3>,
    /// Cached bounding sphere.
    pub bounding_sphere: Option<Sphere>,
    /// Keep arrays after upload.
    pub dynamic: bool,
    /// Re-upload the index on next sync.
    pub index_needs_update: bool,
    pub(crate) index_buffer: Option<BufferHandle>,
}

impl Default for BufferGeometry {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferGeometry {
    /// Create an empty buffer geometry.
    pub fn new() -> Self {
        Self {
            id: Id::new(),
            uuid: generate_uuid(),
            name: String::new(),
            attributes: HashMap::new(),
            index: None,
            offsets: Vec::new(),
            bounding_box: None,
            bounding_sphere: None,
            dynamic: false,
            index_needs_update: true,
            index_buffer: None,
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

    /// Set an attribute array.
    pub fn set_attribute(&mut self, name: impl Into<String>, attribute: BufferAttribute) {
        self.attributes.insert(name.into(), attribute);
    }

    /// Get an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&BufferAttribute> {
        self.attributes.get(name)
    }

    /// Vertex count from the position attribute.
    pub fn vertex_count(&self) -> usize {
        self.attribute(attribute_names::POSITION)
            .map(BufferAttribute::count)
            .unwrap_or(0)
    }

    /// Set the index array with a single draw chunk covering it.
    pub fn set_index(&mut self, index: Vec<u16>) {
        let covering = DrawOffset {
            start: 0,
            count: index.len(),
            index: 0,
        };
        self.set_index_with_offsets(index, vec![covering]);
    }

    /// Set the index array with explicit draw chunks. Geometries past
    /// the 65 535-vertex window split their indices into chunks whose
    /// `index` base re-bases the attribute pointers at draw time.
    pub fn set_index_with_offsets(&mut self, index: Vec<u16>, offsets: Vec<DrawOffset>) {
        self.offsets = offsets;
        self.index = Some(index);
        self.index_needs_update = true;
    }

    /// Recompute the cached bounding box from positions.
    pub fn compute_bounding_box(&mut self) {
        self.bounding_box = Some(Box3::from_points(&self.positions()));
    }

    /// Recompute the cached bounding sphere from positions.
    pub fn compute_bounding_sphere(&mut self) {
        self.bounding_sphere = Some(Sphere::from_points(&self.positions()));
    }

    /// Wrap into a shared handle.
    pub fn into_ref(self) -> BufferGeometryRef {
        Arc::new(RwLock::new(self))
    }

    fn positions(&self) -> Vec<Vector3> {
        match self.attribute(attribute_names::POSITION) {
            Some(attribute) if attribute.item_size == 3 => attribute
                .array
                .chunks_exact(3)
                .map(|c| Vector3::new(c[0], c[1], c[2]))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl std::fmt::Debug for BufferGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferGeometry")
            .field("id", &self.id)
            .field("attributes", &self.attributes.len())
            .field("indexed", &self.index.is_some())
            .field("offsets", &self.offsets.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_index_creates_offset() {
        let mut g = BufferGeometry::new();
        g.set_index(vec![0, 1, 2, 2, 1, 3]);
        assert_eq!(g.offsets.len(), 1);
        assert_eq!(g.offsets[0].count, 6);
        assert_eq!(g.offsets[0].index, 0);
    }

    #[test]
    fn test_set_index_with_offsets_keeps_chunks() {
        let mut g = BufferGeometry::new();
        g.set_index_with_offsets(
            vec![0, 1, 2, 0, 1, 2],
            vec![
                DrawOffset { start: 0, count: 3, index: 0 },
                DrawOffset { start: 3, count: 3, index: 3 },
            ],
        );
        assert_eq!(g.offsets.len(), 2);
        assert_eq!(g.offsets[1].index, 3);
        assert!(g.index_needs_update);
    }

    #[test]
    fn test_vertex_count() {
        let mut g = BufferGeometry::new();
        g.set_attribute(
            attribute_names::POSITION,
            BufferAttribute::new(3, vec![0.0; 12]),
        );
        assert_eq!(g.vertex_count(), 4);
    }

    #[test]
    fn test_bounding_box() {
        let mut g = BufferGeometry::new();
        g.set_attribute(
            attribute_names::POSITION,
            BufferAttribute::new(3, vec![-1.0, 0.0, 0.0, 1.0, 2.0, 0.0]),
        );
        g.compute_bounding_box();
        let b = g.bounding_box.unwrap();
        assert!(b.min.approx_eq(&Vector3::new(-1.0, 0.0, 0.0), 1e-6));
        assert!(b.max.approx_eq(&Vector3::new(1.0, 2.0, 0.0), 1e-6));
    }
}
