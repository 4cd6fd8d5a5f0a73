//! Renderable object payloads carried by scene-graph nodes.

use crate::geometry::{BufferGeometryRef, GeometryRef};
use crate::material::MaterialRef;
use crate::math::Matrix4;

/// Geometry backing a mesh: either face-based (partitioned into groups)
/// or pre-attributed buffer geometry.
#[derive(Debug, Clone)]
pub enum MeshGeometry {
    /// Face-based geometry.
    Faces(GeometryRef),
    /// Pre-indexed attribute arrays.
    Buffer(BufferGeometryRef),
}

/// A triangle mesh.
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Geometry reference, shared with peers.
    pub geometry: MeshGeometry,
    /// Material reference, shared with peers.
    pub material: MaterialRef,
    /// Per-face materials indexed by a geometry group's material index.
    /// Empty means every group draws with `material`.
    pub materials: Vec<MaterialRef>,
    /// Morph influences, one per morph target of the geometry.
    pub morph_target_influences: Vec<f32>,
    /// Base morph target replacing the position attribute, when set.
    pub morph_target_base: Option<usize>,
    /// Caller-supplied influence ordering; when empty the renderer picks
    /// the top influences by magnitude.
    pub morph_target_forced_order: Vec<usize>,
    /// Flattened bone matrices for skinning.
    pub bone_matrices: Vec<Matrix4>,
    /// Store bone matrices in a float texture instead of uniforms.
    pub use_vertex_texture: bool,
    /// Bone texture dimensions when `use_vertex_texture` is set.
    pub bone_texture_size: (u32, u32),
}

impl Mesh {
    /// Mesh over face-based geometry.
    pub fn new(geometry: GeometryRef, material: MaterialRef) -> Self {
        Self {
            geometry: MeshGeometry::Faces(geometry),
            material,
            materials: Vec::new(),
            morph_target_influences: Vec::new(),
            morph_target_base: None,
            morph_target_forced_order: Vec::new(),
            bone_matrices: Vec::new(),
            use_vertex_texture: false,
            bone_texture_size: (0, 0),
        }
    }

    /// Mesh over buffer geometry.
    pub fn with_buffer_geometry(geometry: BufferGeometryRef, material: MaterialRef) -> Self {
        Self {
            geometry: MeshGeometry::Buffer(geometry),
            material,
            materials: Vec::new(),
            morph_target_influences: Vec::new(),
            morph_target_base: None,
            morph_target_forced_order: Vec::new(),
            bone_matrices: Vec::new(),
            use_vertex_texture: false,
            bone_texture_size: (0, 0),
        }
    }
}

/// Line primitive topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineType {
    /// Connected strip.
    #[default]
    Strip,
    /// Independent segments, two vertices each.
    Pieces,
}

/// A polyline rendered from a geometry's vertex list.
#[derive(Debug, Clone)]
pub struct Line {
    /// Geometry whose vertices form the line.
    pub geometry: GeometryRef,
    /// Line material.
    pub material: MaterialRef,
    /// Topology.
    pub line_type: LineType,
}

impl Line {
    /// Create a line strip.
    pub fn new(geometry: GeometryRef, material: MaterialRef) -> Self {
        Self {
            geometry,
            material,
            line_type: LineType::Strip,
        }
    }
}

/// A point cloud drawn with one GPU point per vertex.
#[derive(Debug, Clone)]
pub struct ParticleSystem {
    /// Geometry whose vertices are the particles.
    pub geometry: GeometryRef,
    /// Particle material.
    pub material: MaterialRef,
    /// Re-sort particles back-to-front every frame.
    pub sort_particles: bool,
}

impl ParticleSystem {
    /// Create a particle system.
    pub fn new(geometry: GeometryRef, material: MaterialRef) -> Self {
        Self {
            geometry,
            material,
            sort_particles: false,
        }
    }
}

/// A single billboard point, sized by the node's scale. Rendered by the
/// software projector path and pickable; it has no geometry.
#[derive(Debug, Clone)]
pub struct Particle {
    /// Particle material.
    pub material: MaterialRef,
}

/// A screen-aligned quad, drawn by a post plugin.
#[derive(Debug, Clone)]
pub struct Sprite {
    /// Sprite material (its map supplies the image).
    pub material: MaterialRef,
    /// Rotation in radians around the view axis.
    pub rotation: f32,
    /// Scale with scene depth rather than staying screen-fixed.
    pub scale_by_depth: bool,
}

impl Sprite {
    /// Create a sprite.
    pub fn new(material: MaterialRef) -> Self {
        Self {
            material,
            rotation: 0.0,
            scale_by_depth: true,
        }
    }
}

/// A skeleton joint. Bones parent into the usual hierarchy; their world
/// matrices feed the skin matrices of a skinned mesh.
#[derive(Debug, Clone, Default)]
pub struct Bone {
    /// Binding matrix applied when accumulating skin transforms.
    pub skin_matrix: Matrix4,
}
