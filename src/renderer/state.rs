//! GPU state minimization: every setter remembers the last value it
//! emitted and skips the device call when nothing changed.

use super::gl::{BlendEquation, BlendFactor, CullFace, FrontFaceDirection, GlDevice};
use crate::material::{Blending, Material, Side};

/// Cached fixed-function state.
#[derive(Debug, Default)]
pub struct GlState {
    blending: Option<Blending>,
    blend_equation: Option<BlendEquation>,
    blend_src: Option<BlendFactor>,
    blend_dst: Option<BlendFactor>,
    depth_test: Option<bool>,
    depth_write: Option<bool>,
    polygon_offset: Option<bool>,
    polygon_offset_factor: Option<f32>,
    polygon_offset_units: Option<f32>,
    double_sided: Option<bool>,
    flip_sided: Option<bool>,
    line_width: Option<f32>,
}

impl GlState {
    /// Fresh cache with no known state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything; the next setters re-emit unconditionally.
    /// Called around plugins, which may touch any state directly.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Apply a blending preset; `Custom` also applies the equation and
    /// factors.
    pub fn set_blending(
        &mut self,
        device: &mut impl GlDevice,
        blending: Blending,
        equation: BlendEquation,
        src: BlendFactor,
        dst: BlendFactor,
    ) {
        if self.blending != Some(blending) {
            match blending {
                Blending::None => device.set_blend_enabled(false),
                Blending::Additive => {
                    device.set_blend_enabled(true);
                    device.blend_equation(BlendEquation::Add);
                    device.blend_func(BlendFactor::SrcAlpha, BlendFactor::One);
                }
                Blending::Subtractive => {
                    device.set_blend_enabled(true);
                    device.blend_equation(BlendEquation::Add);
                    device.blend_func(BlendFactor::Zero, BlendFactor::OneMinusSrcColor);
                }
                Blending::Multiply => {
                    device.set_blend_enabled(true);
                    device.blend_equation(BlendEquation::Add);
                    device.blend_func(BlendFactor::Zero, BlendFactor::SrcColor);
                }
                Blending::Custom => {
                    device.set_blend_enabled(true);
                }
                Blending::Normal => {
                    device.set_blend_enabled(true);
                    device.blend_equation_separate(BlendEquation::Add, BlendEquation::Add);
                    device.blend_func_separate(
                        BlendFactor::SrcAlpha,
                        BlendFactor::OneMinusSrcAlpha,
                        BlendFactor::One,
                        BlendFactor::OneMinusSrcAlpha,
                    );
                }
            }
            self.blending = Some(blending);
        }

        if blending == Blending::Custom {
            if self.blend_equation != Some(equation) {
                device.blend_equation(equation);
                self.blend_equation = Some(equation);
            }
            if self.blend_src != Some(src) || self.blend_dst != Some(dst) {
                device.blend_func(src, dst);
                self.blend_src = Some(src);
                self.blend_dst = Some(dst);
            }
        } else {
            self.blend_equation = None;
            self.blend_src = None;
            self.blend_dst = None;
        }
    }

    /// Depth-test toggle.
    pub fn set_depth_test(&mut self, device: &mut impl GlDevice, enabled: bool) {
        if self.depth_test != Some(enabled) {
            device.set_depth_test(enabled);
            self.depth_test = Some(enabled);
        }
    }

    /// Depth-write toggle.
    pub fn set_depth_write(&mut self, device: &mut impl GlDevice, enabled: bool) {
        if self.depth_write != Some(enabled) {
            device.set_depth_write(enabled);
            self.depth_write = Some(enabled);
        }
    }

    /// Polygon offset enable + parameters.
    pub fn set_polygon_offset(
        &mut self,
        device: &mut impl GlDevice,
        enabled: bool,
        factor: f32,
        units: f32,
    ) {
        if self.polygon_offset != Some(enabled) {
            device.set_polygon_offset_enabled(enabled);
            self.polygon_offset = Some(enabled);
        }
        if enabled
            && (self.polygon_offset_factor != Some(factor)
                || self.polygon_offset_units != Some(units))
        {
            device.polygon_offset(factor, units);
            self.polygon_offset_factor = Some(factor);
            self.polygon_offset_units = Some(units);
        }
    }

    /// Face culling and winding from a material's side.
    pub fn set_material_faces(&mut self, device: &mut impl GlDevice, material: &Material) {
        let double_sided = material.side == Side::Double;
        let flip_sided = material.side == Side::Back;

        if self.double_sided != Some(double_sided) {
            if double_sided {
                device.set_cull_face_enabled(false);
            } else {
                device.set_cull_face_enabled(true);
                device.cull_face(CullFace::Back);
            }
            self.double_sided = Some(double_sided);
        }

        if self.flip_sided != Some(flip_sided) {
            device.front_face(if flip_sided {
                FrontFaceDirection::Cw
            } else {
                FrontFaceDirection::Ccw
            });
            self.flip_sided = Some(flip_sided);
        }
    }

    /// Rasterized line width.
    pub fn set_line_width(&mut self, device: &mut impl GlDevice, width: f32) {
        if self.line_width != Some(width) {
            device.line_width(width);
            self.line_width = Some(width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::trace::{TraceCall, TraceDevice};

    #[test]
    fn test_depth_test_emits_only_on_change() {
        let mut device = TraceDevice::new();
        let mut state = GlState::new();

        state.set_depth_test(&mut device, true);
        state.set_depth_test(&mut device, true);
        state.set_depth_test(&mut device, false);
        state.set_depth_test(&mut device, false);

        let emitted = device.count_calls(|c| matches!(c, TraceCall::SetDepthTest(_)));
        assert_eq!(emitted, 2);
    }

    #[test]
    fn test_blending_change_reemits() {
        let mut device = TraceDevice::new();
        let mut state = GlState::new();

        let (eq, src, dst) = (
            BlendEquation::Add,
            BlendFactor::SrcAlpha,
            BlendFactor::OneMinusSrcAlpha,
        );
        state.set_blending(&mut device, Blending::Normal, eq, src, dst);
        state.set_blending(&mut device, Blending::Normal, eq, src, dst);
        state.set_blending(&mut device, Blending::Additive, eq, src, dst);

        let enables = device.count_calls(|c| matches!(c, TraceCall::SetBlendEnabled(true)));
        assert_eq!(enables, 2);
    }

    #[test]
    fn test_reset_forgets() {
        let mut device = TraceDevice::new();
        let mut state = GlState::new();

        state.set_depth_write(&mut device, true);
        state.reset();
        state.set_depth_write(&mut device, true);

        let emitted = device.count_calls(|c| matches!(c, TraceCall::SetDepthWrite(true)));
        assert_eq!(emitted, 2);
    }
}
