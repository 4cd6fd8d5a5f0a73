//! Core engine plumbing: object identity and renderer construction
//! options.

mod id;

pub use id::{generate_uuid, Id};

use crate::math::Color;
use serde::{Deserialize, Serialize};

/// Requested shader float precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Precision {
    /// `lowp`.
    Low,
    /// `mediump`.
    Medium,
    /// `highp`.
    #[default]
    High,
}

impl Precision {
    /// The GLSL qualifier for this tier.
    pub fn qualifier(&self) -> &'static str {
        match self {
            Precision::Low => "lowp",
            Precision::Medium => "mediump",
            Precision::High => "highp",
        }
    }
}

/// Renderer construction options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererOptions {
    /// Framebuffer width in pixels.
    pub width: u32,
    /// Framebuffer height in pixels.
    pub height: u32,
    /// Requested shader precision. Downgraded at construction when the
    /// device reports an insufficient float range.
    pub precision: Precision,
    /// Request an alpha channel in the default framebuffer.
    pub alpha: bool,
    /// Colors are premultiplied by alpha.
    pub premultiplied_alpha: bool,
    /// Request multisampling.
    pub antialias: bool,
    /// Request a stencil buffer.
    pub stencil: bool,
    /// Keep the drawing buffer contents after present.
    pub preserve_drawing_buffer: bool,
    /// Synchronize presentation with the display.
    pub vsync: bool,
    /// Clear color.
    pub clear_color: Color,
    /// Clear alpha.
    pub clear_alpha: f32,
    /// Upper bound for lights of each kind in generated shaders.
    pub max_lights: usize,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            precision: Precision::High,
            alpha: false,
            premultiplied_alpha: true,
            antialias: false,
            stencil: true,
            preserve_drawing_buffer: false,
            vsync: true,
            clear_color: Color::BLACK,
            clear_alpha: 0.0,
            max_lights: 4,
        }
    }
}
