//! Off-screen render targets: a framebuffer with a 2D or cube color
//! texture and optional depth/stencil renderbuffer.

use super::gl::{
    Attachment, FramebufferHandle, GlDevice, RenderbufferFormat, RenderbufferHandle,
    SamplerParams, TextureHandle, TextureTarget,
};
use crate::core::Id;
use crate::texture::{Filter, TextureFormat, Wrapping};
use std::sync::{Arc, RwLock};

/// Shared render-target handle.
pub type RenderTargetRef = Arc<RwLock<RenderTarget>>;

/// A render target descriptor plus its renderer-private GPU objects.
#[derive(Debug)]
pub struct RenderTarget {
    id: Id,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Color texture horizontal wrap.
    pub wrap_s: Wrapping,
    /// Color texture vertical wrap.
    pub wrap_t: Wrapping,
    /// Magnification filter.
    pub mag_filter: Filter,
    /// Minification filter.
    pub min_filter: Filter,
    /// Color texel layout.
    pub format: TextureFormat,
    /// Attach a depth renderbuffer.
    pub depth_buffer: bool,
    /// Attach a stencil renderbuffer.
    pub stencil_buffer: bool,
    /// Regenerate mipmaps after rendering when the min filter needs
    /// them.
    pub generate_mipmaps: bool,
    /// Render into a cube texture (six framebuffers, one per face).
    pub is_cube: bool,
    /// The cube face rendered into when `is_cube` is set.
    pub active_cube_face: usize,

    pub(crate) gl: Option<TargetObjects>,
}

/// The GPU objects backing an initialized target.
#[derive(Debug)]
pub(crate) struct TargetObjects {
    pub texture: TextureHandle,
    /// One framebuffer for 2D, six for cube targets.
    pub framebuffers: Vec<FramebufferHandle>,
    pub renderbuffer: Option<RenderbufferHandle>,
}

impl RenderTarget {
    /// Create a 2D render target.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            id: Id::new(),
            width,
            height,
            wrap_s: Wrapping::ClampToEdge,
            wrap_t: Wrapping::ClampToEdge,
            mag_filter: Filter::Linear,
            min_filter: Filter::LinearMipMapLinear,
            format: TextureFormat::Rgba,
            depth_buffer: true,
            stencil_buffer: true,
            generate_mipmaps: true,
            is_cube: false,
            active_cube_face: 0,
            gl: None,
        }
    }

    /// Create a cube render target.
    pub fn new_cube(size: u32) -> Self {
        let mut target = Self::new(size, size);
        target.is_cube = true;
        target
    }

    /// Unique id.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Whether the min filter samples mipmap levels.
    pub fn needs_mipmap_regen(&self) -> bool {
        self.generate_mipmaps && self.min_filter.uses_mipmaps()
    }

    /// Wrap into a shared handle.
    pub fn into_ref(self) -> RenderTargetRef {
        Arc::new(RwLock::new(self))
    }

    /// Create the GPU objects on first bind.
    pub(crate) fn setup(&mut self, device: &mut impl GlDevice) {
        if self.gl.is_some() {
            return;
        }

        let texture = device.create_texture();
        let target_kind = if self.is_cube {
            TextureTarget::Cube
        } else {
            TextureTarget::D2
        };

        device.bind_texture(target_kind, texture);
        device.tex_parameters(
            target_kind,
            &SamplerParams {
                wrap_s: self.wrap_s,
                wrap_t: self.wrap_t,
                mag_filter: self.mag_filter,
                min_filter: self.min_filter,
                anisotropy: 1.0,
            },
        );

        let layout = super::gl::PixelLayout {
            format: self.format,
            data_type: crate::texture::TextureDataType::UnsignedByte,
        };

        let renderbuffer = if self.depth_buffer || self.stencil_buffer {
            let renderbuffer = device.create_renderbuffer();
            device.bind_renderbuffer(renderbuffer);
            let format = match (self.depth_buffer, self.stencil_buffer) {
                (true, true) => RenderbufferFormat::DepthStencil,
                (true, false) => RenderbufferFormat::Depth,
                _ => RenderbufferFormat::Stencil,
            };
            device.renderbuffer_storage(format, self.width, self.height);
            Some(renderbuffer)
        } else {
            None
        };

        let face_count = if self.is_cube { 6 } else { 1 };
        let mut framebuffers = Vec::with_capacity(face_count);

        for face in 0..face_count {
            if self.is_cube {
                device.tex_image_cube(face as u32, self.width, self.height, layout, &[]);
            } else {
                device.tex_image_2d(self.width, self.height, layout, &[]);
            }

            let framebuffer = device.create_framebuffer();
            device.bind_framebuffer(Some(framebuffer));
            device.framebuffer_texture_2d(Attachment::Color, target_kind, face as u32, texture);

            if let Some(renderbuffer) = renderbuffer {
                let attachment = match (self.depth_buffer, self.stencil_buffer) {
                    (true, true) => Attachment::DepthStencil,
                    (true, false) => Attachment::Depth,
                    _ => Attachment::DepthStencil,
                };
                device.framebuffer_renderbuffer(attachment, renderbuffer);
            }

            framebuffers.push(framebuffer);
        }

        if self.generate_mipmaps && self.min_filter.uses_mipmaps() {
            device.bind_texture(target_kind, texture);
            device.generate_mipmap(target_kind);
        }

        device.bind_framebuffer(None);

        self.gl = Some(TargetObjects {
            texture,
            framebuffers,
            renderbuffer,
        });
    }

    /// The framebuffer for the active face.
    pub(crate) fn framebuffer(&self) -> Option<FramebufferHandle> {
        self.gl.as_ref().map(|gl| {
            let face = if self.is_cube { self.active_cube_face } else { 0 };
            gl.framebuffers[face.min(gl.framebuffers.len() - 1)]
        })
    }

    /// Regenerate mipmaps after rendering into the target.
    pub(crate) fn update_mipmaps(&self, device: &mut impl GlDevice) {
        if let Some(gl) = &self.gl {
            let target_kind = if self.is_cube {
                TextureTarget::Cube
            } else {
                TextureTarget::D2
            };
            device.bind_texture(target_kind, gl.texture);
            device.generate_mipmap(target_kind);
        }
    }

    /// Delete the GPU objects.
    pub(crate) fn dispose(&mut self, device: &mut impl GlDevice) {
        if let Some(gl) = self.gl.take() {
            device.delete_texture(gl.texture);
            for framebuffer in gl.framebuffers {
                device.delete_framebuffer(framebuffer);
            }
            if let Some(renderbuffer) = gl.renderbuffer {
                device.delete_renderbuffer(renderbuffer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::trace::{TraceCall, TraceDevice};

    #[test]
    fn test_2d_target_setup_once() {
        let mut device = TraceDevice::new();
        let mut target = RenderTarget::new(256, 256);
        target.setup(&mut device);
        target.setup(&mut device);

        let framebuffers = device.count_calls(|c| matches!(c, TraceCall::CreateFramebuffer(_)));
        assert_eq!(framebuffers, 1);
        assert!(target.framebuffer().is_some());
    }

    #[test]
    fn test_cube_target_has_six_framebuffers() {
        let mut device = TraceDevice::new();
        let mut target = RenderTarget::new_cube(128);
        target.setup(&mut device);

        let framebuffers = device.count_calls(|c| matches!(c, TraceCall::CreateFramebuffer(_)));
        assert_eq!(framebuffers, 6);

        target.active_cube_face = 3;
        let fb3 = target.framebuffer().unwrap();
        target.active_cube_face = 0;
        assert_ne!(Some(fb3), target.framebuffer());
    }

    #[test]
    fn test_dispose_releases() {
        let mut device = TraceDevice::new();
        let mut target = RenderTarget::new(64, 64);
        target.setup(&mut device);
        target.dispose(&mut device);
        assert_eq!(device.live_texture_count(), 0);
        assert!(target.framebuffer().is_none());
    }
}
