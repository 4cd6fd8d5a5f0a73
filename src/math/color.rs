//! RGB color with float components.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// An RGB color. Components are nominally in 0..1 but are not clamped;
/// light intensities routinely push them above 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct Color {
    /// Red component.
    pub r: f32,
    /// Green component.
    pub g: f32,
    /// Blue component.
    pub b: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Color {
    /// White.
    pub const WHITE: Self = Self { r: 1.0, g: 1.0, b: 1.0 };
    /// Black.
    pub const BLACK: Self = Self { r: 0.0, g: 0.0, b: 0.0 };

    /// Create a new color.
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create from a packed 0xRRGGBB value.
    #[inline]
    pub fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    /// Pack into 0xRRGGBB.
    pub fn to_hex(&self) -> u32 {
        let to_byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
        (to_byte(self.r) << 16) | (to_byte(self.g) << 8) | to_byte(self.b)
    }

    /// Set the components.
    #[inline]
    pub fn set(&mut self, r: f32, g: f32, b: f32) -> &mut Self {
        self.r = r;
        self.g = g;
        self.b = b;
        self
    }

    /// Copy from another color.
    #[inline]
    pub fn copy(&mut self, c: &Color) -> &mut Self {
        *self = *c;
        self
    }

    /// Interpret the source as gamma-encoded and store its linear value
    /// (square approximation).
    #[inline]
    pub fn copy_gamma_to_linear(&mut self, c: &Color) -> &mut Self {
        self.r = c.r * c.r;
        self.g = c.g * c.g;
        self.b = c.b * c.b;
        self
    }

    /// Interpret the source as linear and store its gamma value
    /// (square-root approximation).
    #[inline]
    pub fn copy_linear_to_gamma(&mut self, c: &Color) -> &mut Self {
        self.r = c.r.sqrt();
        self.g = c.g.sqrt();
        self.b = c.b.sqrt();
        self
    }

    /// Multiply by a scalar.
    #[inline]
    pub fn multiply_scalar(&mut self, s: f32) -> &mut Self {
        self.r *= s;
        self.g *= s;
        self.b *= s;
        self
    }

    /// Linear interpolation toward another color.
    #[inline]
    pub fn lerp(&self, other: &Color, t: f32) -> Self {
        Self {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
        }
    }

    /// Components as an array.
    #[inline]
    pub const fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// Approximate equality within an epsilon.
    #[inline]
    pub fn approx_eq(&self, other: &Color, epsilon: f32) -> bool {
        (self.r - other.r).abs() < epsilon
            && (self.g - other.g).abs() < epsilon
            && (self.b - other.b).abs() < epsilon
    }
}

impl From<u32> for Color {
    fn from(hex: u32) -> Self {
        Self::from_hex(hex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let c = Color::from_hex(0xff8040);
        assert_eq!(c.to_hex(), 0xff8040);
    }

    #[test]
    fn test_from_hex_red() {
        let c = Color::from_hex(0xff0000);
        assert!(c.approx_eq(&Color::new(1.0, 0.0, 0.0), 1e-6));
    }
}
