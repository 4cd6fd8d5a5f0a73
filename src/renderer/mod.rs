//! The GPU renderer: per-frame scene walk, culling, sorting, program
//! and buffer management, state minimization and draw dispatch against
//! the [`gl::GlDevice`] boundary.

pub mod buffers;
pub mod gl;
pub mod lights;
pub mod plugin;
pub mod program;
#[allow(clippy::module_inception)]
pub mod renderer;
pub mod shaders;
pub mod state;
pub mod target;
pub mod trace;
pub mod uniforms;

pub use plugin::RenderPlugin;
pub use renderer::{RenderStats, Renderer, RendererError};
pub use target::{RenderTarget, RenderTargetRef};
pub use trace::{TraceCall, TraceDevice};
