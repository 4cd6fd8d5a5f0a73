//! The GPU device boundary: an OpenGL-ES-2-class programmable pipeline,
//! expressed as the exact set of operations the renderer needs. A host
//! supplies the implementation; [`TraceDevice`](super::trace::TraceDevice)
//! is the in-crate recording one.

use crate::texture::{Filter, TextureDataType, TextureFormat, Wrapping};

macro_rules! handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub u32);
    };
}

handle!(
    /// GPU buffer object.
    BufferHandle
);
handle!(
    /// GPU texture object.
    TextureHandle
);
handle!(
    /// GPU framebuffer object.
    FramebufferHandle
);
handle!(
    /// GPU renderbuffer object.
    RenderbufferHandle
);
handle!(
    /// Compiled shader stage.
    ShaderHandle
);
handle!(
    /// Linked program object.
    ProgramHandle
);

/// A resolved uniform location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub i32);

/// A resolved attribute location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeLocation(pub u32);

/// Buffer bind target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTarget {
    /// Vertex attribute data.
    Array,
    /// Index data.
    ElementArray,
}

/// Buffer usage hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Written once.
    Static,
    /// Rewritten often.
    Dynamic,
}

/// Shader stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    /// Vertex shader.
    Vertex,
    /// Fragment shader.
    Fragment,
}

/// Primitive draw mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
    /// Independent triangles.
    Triangles,
    /// Independent line segments.
    Lines,
    /// Connected line strip.
    LineStrip,
    /// GPU points.
    Points,
}

/// Texture bind target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureTarget {
    /// 2D texture.
    D2,
    /// Cube map.
    Cube,
}

/// Blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum BlendEquation {
    /// `src + dst`.
    #[default]
    Add,
    /// `src - dst`.
    Subtract,
    /// `dst - src`.
    ReverseSubtract,
}

/// Blend factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum BlendFactor {
    /// 0.
    Zero,
    /// 1.
    #[default]
    One,
    /// Source color.
    SrcColor,
    /// 1 - source color.
    OneMinusSrcColor,
    /// Source alpha.
    SrcAlpha,
    /// 1 - source alpha.
    OneMinusSrcAlpha,
    /// Destination alpha.
    DstAlpha,
    /// 1 - destination alpha.
    OneMinusDstAlpha,
    /// Destination color.
    DstColor,
    /// 1 - destination color.
    OneMinusDstColor,
    /// min(source alpha, 1 - destination alpha).
    SrcAlphaSaturate,
}

/// Face culling selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullFace {
    /// Cull front faces.
    Front,
    /// Cull back faces.
    Back,
    /// Cull everything.
    FrontAndBack,
}

/// Polygon winding treated as front-facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontFaceDirection {
    /// Clockwise.
    Cw,
    /// Counter-clockwise.
    Ccw,
}

/// Framebuffer attachment point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    /// Color attachment 0.
    Color,
    /// Depth attachment.
    Depth,
    /// Combined depth + stencil attachment.
    DepthStencil,
}

/// Renderbuffer storage format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderbufferFormat {
    /// 16-bit depth.
    Depth,
    /// 8-bit stencil.
    Stencil,
    /// Packed depth + stencil.
    DepthStencil,
}

/// Sampler parameters applied at upload time.
#[derive(Debug, Clone, Copy)]
pub struct SamplerParams {
    /// Horizontal wrap.
    pub wrap_s: Wrapping,
    /// Vertical wrap.
    pub wrap_t: Wrapping,
    /// Magnification filter.
    pub mag_filter: Filter,
    /// Minification filter.
    pub min_filter: Filter,
    /// Anisotropy, 1.0 disables.
    pub anisotropy: f32,
}

/// Pixel upload description.
#[derive(Debug, Clone, Copy)]
pub struct PixelLayout {
    /// Texel layout.
    pub format: TextureFormat,
    /// Component type.
    pub data_type: TextureDataType,
}

/// Device limits and extension availability, queried once at renderer
/// construction.
#[derive(Debug, Clone)]
pub struct DeviceCapabilities {
    /// Combined texture image units.
    pub max_textures: u32,
    /// Vertex shader texture image units.
    pub max_vertex_textures: u32,
    /// Largest 2D texture dimension.
    pub max_texture_size: u32,
    /// Largest cube map dimension.
    pub max_cubemap_size: u32,
    /// Float textures available (bone textures need this).
    pub supports_float_textures: bool,
    /// `OES_standard_derivatives` (bump maps need this).
    pub supports_standard_derivatives: bool,
    /// Anisotropic filtering extension.
    pub supports_anisotropy: bool,
    /// Largest anisotropy factor.
    pub max_anisotropy: f32,
    /// S3TC compressed texture support.
    pub supports_compressed_textures: bool,
    /// Fragment shaders can run at `highp` float precision.
    pub highp_float_supported: bool,
    /// Fragment shaders can run at `mediump` float precision.
    pub mediump_float_supported: bool,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            max_textures: 16,
            max_vertex_textures: 4,
            max_texture_size: 4096,
            max_cubemap_size: 4096,
            supports_float_textures: true,
            supports_standard_derivatives: true,
            supports_anisotropy: false,
            max_anisotropy: 1.0,
            supports_compressed_textures: false,
            highp_float_supported: true,
            mediump_float_supported: true,
        }
    }
}

/// The set of GPU operations the renderer issues. Implementations map
/// these one-to-one onto a GL-ES-2-class API; no call is re-entrant and
/// all calls happen on the thread that owns the context.
#[allow(clippy::too_many_arguments)]
pub trait GlDevice {
    /// Device limits and extensions.
    fn capabilities(&self) -> DeviceCapabilities;

    // --- buffers ---

    /// Create a buffer object.
    fn create_buffer(&mut self) -> BufferHandle;
    /// Delete a buffer object.
    fn delete_buffer(&mut self, buffer: BufferHandle);
    /// Bind a buffer to a target.
    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferHandle);
    /// Upload float data to the bound buffer.
    fn buffer_data_f32(&mut self, target: BufferTarget, data: &[f32], usage: BufferUsage);
    /// Upload index data to the bound buffer.
    fn buffer_data_u16(&mut self, target: BufferTarget, data: &[u16], usage: BufferUsage);

    // --- textures ---

    /// Create a texture object.
    fn create_texture(&mut self) -> TextureHandle;
    /// Delete a texture object.
    fn delete_texture(&mut self, texture: TextureHandle);
    /// Select the active texture unit.
    fn active_texture(&mut self, unit: u32);
    /// Bind a texture to a target on the active unit.
    fn bind_texture(&mut self, target: TextureTarget, texture: TextureHandle);
    /// Upload a 2D image to the bound texture.
    fn tex_image_2d(&mut self, width: u32, height: u32, layout: PixelLayout, pixels: &[u8]);
    /// Upload one cube face (0..6 in +X, -X, +Y, -Y, +Z, -Z order).
    fn tex_image_cube(
        &mut self,
        face: u32,
        width: u32,
        height: u32,
        layout: PixelLayout,
        pixels: &[u8],
    );
    /// Set sampler parameters on the bound texture.
    fn tex_parameters(&mut self, target: TextureTarget, params: &SamplerParams);
    /// Generate mipmaps for the bound texture.
    fn generate_mipmap(&mut self, target: TextureTarget);

    // --- framebuffers / renderbuffers ---

    /// Create a framebuffer object.
    fn create_framebuffer(&mut self) -> FramebufferHandle;
    /// Delete a framebuffer object.
    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle);
    /// Bind a framebuffer; `None` restores the default.
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>);
    /// Attach a texture (or one cube face) to the bound framebuffer.
    fn framebuffer_texture_2d(
        &mut self,
        attachment: Attachment,
        target: TextureTarget,
        cube_face: u32,
        texture: TextureHandle,
    );
    /// Create a renderbuffer object.
    fn create_renderbuffer(&mut self) -> RenderbufferHandle;
    /// Delete a renderbuffer object.
    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferHandle);
    /// Bind a renderbuffer.
    fn bind_renderbuffer(&mut self, renderbuffer: RenderbufferHandle);
    /// Allocate renderbuffer storage.
    fn renderbuffer_storage(&mut self, format: RenderbufferFormat, width: u32, height: u32);
    /// Attach the bound renderbuffer to the bound framebuffer.
    fn framebuffer_renderbuffer(&mut self, attachment: Attachment, renderbuffer: RenderbufferHandle);

    // --- shaders / programs ---

    /// Compile a shader; `Err` carries the driver info log.
    fn create_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderHandle, String>;
    /// Delete a shader.
    fn delete_shader(&mut self, shader: ShaderHandle);
    /// Create a program object.
    fn create_program(&mut self) -> ProgramHandle;
    /// Attach a shader to a program.
    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle);
    /// Link a program; `Err` carries the driver info log.
    fn link_program(&mut self, program: ProgramHandle) -> Result<(), String>;
    /// Select a program for drawing; `None` unbinds.
    fn use_program(&mut self, program: Option<ProgramHandle>);
    /// Delete a program.
    fn delete_program(&mut self, program: ProgramHandle);
    /// Resolve a uniform by name.
    fn get_uniform_location(&mut self, program: ProgramHandle, name: &str)
        -> Option<UniformLocation>;
    /// Resolve an attribute by name.
    fn get_attrib_location(&mut self, program: ProgramHandle, name: &str)
        -> Option<AttributeLocation>;

    // --- uniform upload ---

    /// Upload an int (also texture units).
    fn uniform1i(&mut self, location: UniformLocation, v: i32);
    /// Upload a float.
    fn uniform1f(&mut self, location: UniformLocation, v: f32);
    /// Upload a vec2.
    fn uniform2f(&mut self, location: UniformLocation, x: f32, y: f32);
    /// Upload a vec3.
    fn uniform3f(&mut self, location: UniformLocation, x: f32, y: f32, z: f32);
    /// Upload a vec4.
    fn uniform4f(&mut self, location: UniformLocation, x: f32, y: f32, z: f32, w: f32);
    /// Upload a float array.
    fn uniform1fv(&mut self, location: UniformLocation, v: &[f32]);
    /// Upload a vec2 array (flattened).
    fn uniform2fv(&mut self, location: UniformLocation, v: &[f32]);
    /// Upload a vec3 array (flattened).
    fn uniform3fv(&mut self, location: UniformLocation, v: &[f32]);
    /// Upload a vec4 array (flattened).
    fn uniform4fv(&mut self, location: UniformLocation, v: &[f32]);
    /// Upload an int array.
    fn uniform1iv(&mut self, location: UniformLocation, v: &[i32]);
    /// Upload a mat3 (column-major).
    fn uniform_matrix3fv(&mut self, location: UniformLocation, v: &[f32]);
    /// Upload one or more mat4s (column-major, 16 floats each).
    fn uniform_matrix4fv(&mut self, location: UniformLocation, v: &[f32]);

    // --- attributes ---

    /// Enable an attribute array.
    fn enable_vertex_attrib(&mut self, location: AttributeLocation);
    /// Disable an attribute array.
    fn disable_vertex_attrib(&mut self, location: AttributeLocation);
    /// Point an attribute at the bound array buffer (tightly packed
    /// floats), starting `first_vertex` elements in. A nonzero start is
    /// how chunked draws re-base their vertices, since this pipeline has
    /// no base-vertex draw call.
    fn vertex_attrib_pointer(
        &mut self,
        location: AttributeLocation,
        item_size: u32,
        first_vertex: usize,
    );

    // --- fixed-function state ---

    /// Set the viewport.
    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32);
    /// Set the scissor rectangle.
    fn scissor(&mut self, x: i32, y: i32, width: u32, height: u32);
    /// Enable or disable scissor testing.
    fn set_scissor_test(&mut self, enabled: bool);
    /// Set the clear color.
    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32);
    /// Clear the selected buffers.
    fn clear(&mut self, color: bool, depth: bool, stencil: bool);

    /// Enable or disable blending.
    fn set_blend_enabled(&mut self, enabled: bool);
    /// Set the blend equation.
    fn blend_equation(&mut self, equation: BlendEquation);
    /// Set separate RGB/alpha blend equations.
    fn blend_equation_separate(&mut self, rgb: BlendEquation, alpha: BlendEquation);
    /// Set blend factors.
    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor);
    /// Set separate RGB/alpha blend factors.
    fn blend_func_separate(
        &mut self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    );

    /// Enable or disable depth testing.
    fn set_depth_test(&mut self, enabled: bool);
    /// Enable or disable depth writes.
    fn set_depth_write(&mut self, enabled: bool);

    /// Enable or disable face culling.
    fn set_cull_face_enabled(&mut self, enabled: bool);
    /// Select which faces are culled.
    fn cull_face(&mut self, mode: CullFace);
    /// Select the front-face winding.
    fn front_face(&mut self, direction: FrontFaceDirection);

    /// Enable or disable polygon offset.
    fn set_polygon_offset_enabled(&mut self, enabled: bool);
    /// Set polygon offset factor and units.
    fn polygon_offset(&mut self, factor: f32, units: f32);

    /// Set the rasterized line width.
    fn line_width(&mut self, width: f32);

    // --- draws ---

    /// Indexed draw from the bound element buffer (`u16` indices);
    /// `offset` in indices.
    fn draw_elements(&mut self, mode: DrawMode, count: usize, offset: usize);
    /// Non-indexed draw from the bound attribute arrays.
    fn draw_arrays(&mut self, mode: DrawMode, first: usize, count: usize);
}
