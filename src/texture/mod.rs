//! Texture descriptors. Image decoding happens outside the crate; a
//! texture wraps already-decoded pixel buffers plus sampling state.

use crate::core::Id;
use crate::math::Vector2;
use crate::renderer::gl::TextureHandle;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Shared texture handle.
pub type TextureRef = Arc<RwLock<Texture>>;

/// Texture coordinate wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Wrapping {
    /// Clamp to the edge texel.
    #[default]
    ClampToEdge,
    /// Repeat the texture.
    Repeat,
    /// Repeat, mirroring every other tile.
    MirroredRepeat,
}

/// Texture sampling filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Filter {
    /// Nearest texel.
    Nearest,
    /// Nearest texel in the nearest mipmap.
    NearestMipMapNearest,
    /// Linear blend between nearest mipmaps.
    NearestMipMapLinear,
    /// Bilinear.
    Linear,
    /// Bilinear in the nearest mipmap.
    LinearMipMapNearest,
    /// Trilinear.
    LinearMipMapLinear,
}

impl Filter {
    /// True when the filter samples mipmap levels.
    pub fn uses_mipmaps(&self) -> bool {
        !matches!(self, Filter::Nearest | Filter::Linear)
    }
}

/// Texel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextureFormat {
    /// 8-bit single channel.
    Alpha,
    /// 24-bit RGB.
    Rgb,
    /// 32-bit RGBA.
    #[default]
    Rgba,
    /// 8-bit luminance.
    Luminance,
    /// 16-bit luminance + alpha.
    LuminanceAlpha,
}

impl TextureFormat {
    /// Bytes per texel.
    pub fn bytes_per_texel(&self) -> usize {
        match self {
            TextureFormat::Alpha | TextureFormat::Luminance => 1,
            TextureFormat::LuminanceAlpha => 2,
            TextureFormat::Rgb => 3,
            TextureFormat::Rgba => 4,
        }
    }
}

/// Component type of the texel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextureDataType {
    /// One byte per component.
    #[default]
    UnsignedByte,
    /// One float per component (needs device float-texture support).
    Float,
}

/// A decoded pixel buffer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Image {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Raw texel bytes, row-major, tightly packed.
    pub pixels: Vec<u8>,
}

impl Image {
    /// Create an image from decoded pixels.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self { width, height, pixels }
    }

    /// True when there is nothing to upload.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }
}

/// Backing images of a texture: one for 2D, six for a cube in
/// +X, -X, +Y, -Y, +Z, -Z face order.
#[derive(Debug, Clone)]
pub enum TextureSource {
    /// A single 2D image.
    Image(Image),
    /// Six cube faces.
    Cube(Box<[Image; 6]>),
}

/// A texture descriptor plus its renderer-private GPU handle.
#[derive(Debug)]
pub struct Texture {
    id: Id,
    /// Backing image data.
    pub source: TextureSource,
    /// Horizontal wrap mode.
    pub wrap_s: Wrapping,
    /// Vertical wrap mode.
    pub wrap_t: Wrapping,
    /// Magnification filter.
    pub mag_filter: Filter,
    /// Minification filter.
    pub min_filter: Filter,
    /// Texel layout.
    pub format: TextureFormat,
    /// Texel component type.
    pub data_type: TextureDataType,
    /// Generate mipmaps on upload.
    pub generate_mipmaps: bool,
    /// Requested anisotropy, clamped to the device maximum at bind time.
    pub anisotropy: f32,
    /// UV offset applied by material shaders.
    pub offset: Vector2,
    /// UV repeat applied by material shaders.
    pub repeat: Vector2,
    /// Re-upload the image data on next bind.
    pub needs_update: bool,
    pub(crate) gl_texture: Option<TextureHandle>,
}

impl Texture {
    /// Create a 2D texture from an image.
    pub fn new(image: Image) -> Self {
        Self {
            id: Id::new(),
            source: TextureSource::Image(image),
            wrap_s: Wrapping::ClampToEdge,
            wrap_t: Wrapping::ClampToEdge,
            mag_filter: Filter::Linear,
            min_filter: Filter::LinearMipMapLinear,
            format: TextureFormat::Rgba,
            data_type: TextureDataType::UnsignedByte,
            generate_mipmaps: true,
            anisotropy: 1.0,
            offset: Vector2::ZERO,
            repeat: Vector2::ONE,
            needs_update: true,
            gl_texture: None,
        }
    }

    /// Create a cube texture. All six faces (+X, -X, +Y, -Y, +Z, -Z)
    /// must be present and non-empty.
    pub fn new_cube(faces: Vec<Image>) -> Result<Self, CubeTextureError> {
        if faces.len() != 6 {
            return Err(CubeTextureError::WrongFaceCount(faces.len()));
        }
        if let Some(index) = faces.iter().position(Image::is_empty) {
            return Err(CubeTextureError::EmptyFace(index));
        }

        let faces: Box<[Image; 6]> = faces
            .try_into()
            .map(Box::new)
            .expect("length checked above");

        let mut texture = Self::new(Image::default());
        texture.source = TextureSource::Cube(faces);
        Ok(texture)
    }

    /// Unique id.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// True for cube textures.
    #[inline]
    pub fn is_cube(&self) -> bool {
        matches!(self.source, TextureSource::Cube(_))
    }

    /// True when there is no uploadable image data yet.
    pub fn is_ready(&self) -> bool {
        match &self.source {
            TextureSource::Image(image) => !image.is_empty(),
            TextureSource::Cube(faces) => faces.iter().all(|f| !f.is_empty()),
        }
    }

    /// Wrap into a shared handle.
    pub fn into_ref(self) -> TextureRef {
        Arc::new(RwLock::new(self))
    }
}

/// Cube texture construction failure.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CubeTextureError {
    /// Not exactly six faces.
    #[error("cube texture requires 6 faces, got {0}")]
    WrongFaceCount(usize),
    /// A face has no pixel data.
    #[error("cube texture face {0} is empty")]
    EmptyFace(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face() -> Image {
        Image::new(1, 1, vec![255, 255, 255, 255])
    }

    #[test]
    fn test_cube_requires_six_faces() {
        let err = Texture::new_cube(vec![face(); 5]).unwrap_err();
        assert_eq!(err, CubeTextureError::WrongFaceCount(5));
        assert!(Texture::new_cube(vec![face(); 6]).is_ok());
    }

    #[test]
    fn test_cube_rejects_empty_face() {
        let mut faces = vec![face(); 6];
        faces[3] = Image::default();
        let err = Texture::new_cube(faces).unwrap_err();
        assert_eq!(err, CubeTextureError::EmptyFace(3));
    }

    #[test]
    fn test_mipmap_filters() {
        assert!(Filter::LinearMipMapLinear.uses_mipmaps());
        assert!(!Filter::Linear.uses_mipmaps());
        assert!(!Filter::Nearest.uses_mipmaps());
    }
}
