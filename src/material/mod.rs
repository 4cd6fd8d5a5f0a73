//! Material descriptors. A material is a bag of feature flags and
//! parameters; the renderer resolves it to a compiled program via the
//! program cache.

use crate::core::Id;
use crate::math::Color;
use crate::renderer::gl::{BlendEquation, BlendFactor};
use crate::renderer::program::Program;
use crate::renderer::uniforms::UniformMap;
use crate::texture::TextureRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Shared material handle.
pub type MaterialRef = Arc<RwLock<Material>>;

/// Which faces a material renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Side {
    /// Front faces only.
    #[default]
    Front,
    /// Back faces only.
    Back,
    /// Both; face culling is disabled.
    Double,
}

/// Normal interpolation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Shading {
    /// One normal per face.
    Flat,
    /// Interpolated per-vertex normals.
    #[default]
    Smooth,
}

/// How vertex colors feed the shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VertexColorMode {
    /// Vertex colors ignored.
    #[default]
    None,
    /// One color per face.
    Face,
    /// One color per vertex.
    Vertex,
}

/// Blending preset. `Custom` uses the material's equation and factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Blending {
    /// Blending disabled.
    None,
    /// Standard src-alpha over.
    #[default]
    Normal,
    /// Additive.
    Additive,
    /// Subtractive.
    Subtractive,
    /// Multiplicative.
    Multiply,
    /// Use the material's blend equation and factors.
    Custom,
}

/// Which built-in shader pair (or user shader) a material selects.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialKind {
    /// Unlit color/texture.
    Basic,
    /// Per-vertex diffuse lighting.
    Lambert,
    /// Per-fragment specular lighting.
    Phong,
    /// Eye-space depth visualization.
    Depth,
    /// Normal visualization.
    Normal,
    /// Unlit line.
    LineBasic,
    /// Dashed line; uses per-vertex line distances.
    LineDashed,
    /// Point sprite.
    ParticleBasic,
    /// User-supplied shader sources.
    Shader {
        /// Vertex shader body (the renderer prepends its preamble).
        vertex: String,
        /// Fragment shader body.
        fragment: String,
    },
}

impl MaterialKind {
    /// Stable id used as the program-cache key for built-in shaders.
    /// User shaders key on their source hashes instead.
    pub fn shader_id(&self) -> Option<&'static str> {
        match self {
            MaterialKind::Basic => Some("basic"),
            MaterialKind::Lambert => Some("lambert"),
            MaterialKind::Phong => Some("phong"),
            MaterialKind::Depth => Some("depth"),
            MaterialKind::Normal => Some("normal"),
            MaterialKind::LineBasic => Some("line_basic"),
            MaterialKind::LineDashed => Some("line_dashed"),
            MaterialKind::ParticleBasic => Some("particle_basic"),
            MaterialKind::Shader { .. } => None,
        }
    }

    /// True for the kinds lit by scene lights.
    pub fn is_lit(&self) -> bool {
        matches!(self, MaterialKind::Lambert | MaterialKind::Phong)
    }
}

/// Element width of a custom vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeSize {
    /// One float per vertex.
    Scalar,
    /// vec2.
    Vec2,
    /// vec3 (also colors).
    Vec3,
    /// vec4.
    Vec4,
}

impl AttributeSize {
    /// Floats per element.
    pub fn item_size(&self) -> usize {
        match self {
            AttributeSize::Scalar => 1,
            AttributeSize::Vec2 => 2,
            AttributeSize::Vec3 => 3,
            AttributeSize::Vec4 => 4,
        }
    }
}

/// A user-declared per-vertex attribute. The renderer keeps one GPU
/// buffer per geometry group for it.
#[derive(Debug, Clone)]
pub struct CustomAttribute {
    /// Element width.
    pub size: AttributeSize,
    /// Flat value array, `size.item_size()` floats per vertex.
    pub array: Vec<f32>,
    /// Re-upload on next geometry sync.
    pub needs_update: bool,
}

impl CustomAttribute {
    /// Declare a new attribute.
    pub fn new(size: AttributeSize, array: Vec<f32>) -> Self {
        Self {
            size,
            array,
            needs_update: true,
        }
    }
}

/// A material: feature flags, parameters, maps and blend/depth state.
///
/// Mutating anything that affects program selection must be followed by
/// setting [`needs_update`](Self::needs_update); the renderer rebuilds the
/// program on the next frame.
#[derive(Debug)]
pub struct Material {
    id: Id,
    /// Optional name for debugging.
    pub name: String,
    /// Shader selection.
    pub kind: MaterialKind,

    /// Diffuse color.
    pub color: Color,
    /// Ambient reflectance (lambert/phong).
    pub ambient: Color,
    /// Emissive color (lambert/phong).
    pub emissive: Color,
    /// Specular color (phong).
    pub specular: Color,
    /// Specular exponent (phong).
    pub shininess: f32,
    /// Opacity in 0..1.
    pub opacity: f32,
    /// Render in the transparent pass.
    pub transparent: bool,

    /// Diffuse map.
    pub map: Option<TextureRef>,
    /// Environment (cube) map.
    pub env_map: Option<TextureRef>,
    /// Baked light map (uses the second UV set).
    pub light_map: Option<TextureRef>,
    /// Bump map (needs the standard-derivatives extension).
    pub bump_map: Option<TextureRef>,
    /// Specular intensity map.
    pub specular_map: Option<TextureRef>,
    /// Bump height scale.
    pub bump_scale: f32,
    /// Environment map mix factor.
    pub reflectivity: f32,

    /// Face side selection.
    pub side: Side,
    /// Flat or smooth normals.
    pub shading: Shading,
    /// Vertex color mode.
    pub vertex_colors: VertexColorMode,

    /// Blending preset.
    pub blending: Blending,
    /// Blend equation for [`Blending::Custom`].
    pub blend_equation: BlendEquation,
    /// Source factor for [`Blending::Custom`].
    pub blend_src: BlendFactor,
    /// Destination factor for [`Blending::Custom`].
    pub blend_dst: BlendFactor,

    /// Depth test enable.
    pub depth_test: bool,
    /// Depth write enable.
    pub depth_write: bool,
    /// Polygon offset enable.
    pub polygon_offset: bool,
    /// Polygon offset factor.
    pub polygon_offset_factor: f32,
    /// Polygon offset units.
    pub polygon_offset_units: f32,
    /// Discard fragments with alpha below this; 0 disables the test.
    pub alpha_test: f32,

    /// Draw triangles as lines.
    pub wireframe: bool,
    /// Line width for wireframe rendering.
    pub wireframe_linewidth: f32,
    /// Line width for line objects.
    pub linewidth: f32,

    /// Dash length (dashed lines).
    pub dash_size: f32,
    /// Gap length (dashed lines).
    pub gap_size: f32,
    /// Distance scale (dashed lines).
    pub scale: f32,

    /// Point size (particles).
    pub size: f32,
    /// Attenuate point size with distance.
    pub size_attenuation: bool,

    /// Affected by scene fog.
    pub fog: bool,
    /// Sample lights in a user shader.
    pub lights: bool,
    /// Metal-style specular accumulation (phong).
    pub metal: bool,
    /// Per-fragment lighting for point/spot lights.
    pub per_pixel: bool,
    /// Wrap-around soft diffuse term.
    pub wrap_around: bool,
    /// Per-channel wrap-around factors.
    pub wrap_rgb: Color,

    /// Vertex positions come from bone-weighted skinning.
    pub skinning: bool,
    /// Positions are blended with morph target attributes.
    pub morph_targets: bool,
    /// Normals are blended with morph normal attributes.
    pub morph_normals: bool,

    /// Custom uniforms (user shaders).
    pub uniforms: UniformMap,
    /// Custom vertex attributes (user shaders).
    pub attributes: HashMap<String, CustomAttribute>,

    /// Draw this material at all.
    pub visible: bool,
    /// Rebuild the program on the next frame.
    pub needs_update: bool,

    pub(crate) program: Option<Arc<Program>>,
    pub(crate) num_supported_morph_targets: usize,
    pub(crate) num_supported_morph_normals: usize,
}

impl Material {
    /// Create a material of the given kind with default parameters.
    pub fn new(kind: MaterialKind) -> Self {
        Self {
            id: Id::new(),
            name: String::new(),
            kind,
            color: Color::WHITE,
            ambient: Color::WHITE,
            emissive: Color::BLACK,
            specular: Color::new(0.07, 0.07, 0.07),
            shininess: 30.0,
            opacity: 1.0,
            transparent: false,
            map: None,
            env_map: None,
            light_map: None,
            bump_map: None,
            specular_map: None,
            bump_scale: 1.0,
            reflectivity: 1.0,
            side: Side::Front,
            shading: Shading::Smooth,
            vertex_colors: VertexColorMode::None,
            blending: Blending::Normal,
            blend_equation: BlendEquation::Add,
            blend_src: BlendFactor::SrcAlpha,
            blend_dst: BlendFactor::OneMinusSrcAlpha,
            depth_test: true,
            depth_write: true,
            polygon_offset: false,
            polygon_offset_factor: 0.0,
            polygon_offset_units: 0.0,
            alpha_test: 0.0,
            wireframe: false,
            wireframe_linewidth: 1.0,
            linewidth: 1.0,
            dash_size: 3.0,
            gap_size: 1.0,
            scale: 1.0,
            size: 1.0,
            size_attenuation: true,
            fog: true,
            lights: false,
            metal: false,
            per_pixel: false,
            wrap_around: false,
            wrap_rgb: Color::WHITE,
            skinning: false,
            morph_targets: false,
            morph_normals: false,
            uniforms: UniformMap::new(),
            attributes: HashMap::new(),
            visible: true,
            needs_update: true,
            program: None,
            num_supported_morph_targets: 0,
            num_supported_morph_normals: 0,
        }
    }

    /// Unlit material with a flat color.
    pub fn basic(color: Color) -> Self {
        let mut m = Self::new(MaterialKind::Basic);
        m.color = color;
        m
    }

    /// Lambert material with a diffuse color.
    pub fn lambert(color: Color) -> Self {
        let mut m = Self::new(MaterialKind::Lambert);
        m.color = color;
        m
    }

    /// Phong material with a diffuse color.
    pub fn phong(color: Color) -> Self {
        let mut m = Self::new(MaterialKind::Phong);
        m.color = color;
        m
    }

    /// User-shader material.
    pub fn shader(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self::new(MaterialKind::Shader {
            vertex: vertex.into(),
            fragment: fragment.into(),
        })
    }

    /// Unique id.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// The compiled program, when one has been built this frame.
    pub(crate) fn program(&self) -> Option<&Arc<Program>> {
        self.program.as_ref()
    }

    /// True if any custom attribute wants a re-upload.
    pub(crate) fn custom_attributes_dirty(&self) -> bool {
        self.attributes.values().any(|a| a.needs_update)
    }

    /// Clear custom attribute dirty flags after upload.
    pub(crate) fn clear_custom_attribute_flags(&mut self) {
        for attribute in self.attributes.values_mut() {
            attribute.needs_update = false;
        }
    }

    /// Wrap into a shared handle.
    pub fn into_ref(self) -> MaterialRef {
        Arc::new(RwLock::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_ids_distinct() {
        assert_ne!(
            MaterialKind::Basic.shader_id(),
            MaterialKind::Phong.shader_id()
        );
        assert!(MaterialKind::Shader {
            vertex: String::new(),
            fragment: String::new()
        }
        .shader_id()
        .is_none());
    }

    #[test]
    fn test_lit_kinds() {
        assert!(MaterialKind::Lambert.is_lit());
        assert!(MaterialKind::Phong.is_lit());
        assert!(!MaterialKind::Basic.is_lit());
    }
}
