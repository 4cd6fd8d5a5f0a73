//! Geometry model: face-based [`Geometry`] with material partitioning
//! into [`GeometryGroup`]s, and pre-attributed [`BufferGeometry`].

mod buffer_geometry;
#[allow(clippy::module_inception)]
mod geometry;
mod group;
mod primitives;

pub use buffer_geometry::{
    attribute_names, BufferAttribute, BufferGeometry, BufferGeometryRef, DrawOffset,
};
pub use geometry::{
    Face3, Geometry, GeometryDirty, GeometryRef, MorphNormals, MorphTarget, UV_LAYERS,
};
pub use group::{GeometryGroup, MAX_GROUP_VERTICES};
pub use primitives::box_geometry;
