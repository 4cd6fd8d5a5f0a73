//! Render plugins: open extension points run before and after the main
//! passes (shadow maps, sprites, lens flares live here).

use super::gl::GlDevice;
use crate::scene::{ObjectRef, Scene};

/// A pre- or post-pass plugin. The renderer resets its state cache
/// around each plugin, so plugins may touch any device state directly.
pub trait RenderPlugin<D: GlDevice> {
    /// Render the plugin's contribution for this frame.
    fn render(
        &mut self,
        device: &mut D,
        scene: &Scene,
        camera: &ObjectRef,
        viewport_width: u32,
        viewport_height: u32,
    );
}
