//! Recording device: allocates sequential handles, records every call
//! and always compiles. Used by the integration tests and by hosts that
//! want to capture a frame's draw stream.

use super::gl::*;

/// One recorded device call. Uploads record sizes, not contents.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum TraceCall {
    CreateBuffer(BufferHandle),
    DeleteBuffer(BufferHandle),
    BindBuffer(BufferTarget, BufferHandle),
    BufferDataF32 { target: BufferTarget, len: usize, usage: BufferUsage },
    BufferDataU16 { target: BufferTarget, len: usize, usage: BufferUsage },
    CreateTexture(TextureHandle),
    DeleteTexture(TextureHandle),
    ActiveTexture(u32),
    BindTexture(TextureTarget, TextureHandle),
    TexImage2d { width: u32, height: u32 },
    TexImageCube { face: u32, width: u32, height: u32 },
    TexParameters(TextureTarget),
    GenerateMipmap(TextureTarget),
    CreateFramebuffer(FramebufferHandle),
    DeleteFramebuffer(FramebufferHandle),
    BindFramebuffer(Option<FramebufferHandle>),
    FramebufferTexture2d { attachment: Attachment, cube_face: u32 },
    CreateRenderbuffer(RenderbufferHandle),
    DeleteRenderbuffer(RenderbufferHandle),
    BindRenderbuffer(RenderbufferHandle),
    RenderbufferStorage(RenderbufferFormat, u32, u32),
    FramebufferRenderbuffer(Attachment),
    CompileShader { stage: ShaderStage, handle: ShaderHandle },
    DeleteShader(ShaderHandle),
    CreateProgram(ProgramHandle),
    AttachShader(ProgramHandle, ShaderHandle),
    LinkProgram(ProgramHandle),
    UseProgram(Option<ProgramHandle>),
    DeleteProgram(ProgramHandle),
    Uniform { location: i32 },
    EnableVertexAttrib(AttributeLocation),
    DisableVertexAttrib(AttributeLocation),
    VertexAttribPointer(AttributeLocation, u32, usize),
    Viewport(i32, i32, u32, u32),
    Scissor(i32, i32, u32, u32),
    SetScissorTest(bool),
    ClearColor(f32, f32, f32, f32),
    Clear { color: bool, depth: bool, stencil: bool },
    SetBlendEnabled(bool),
    BlendEquation(BlendEquation),
    BlendEquationSeparate(BlendEquation, BlendEquation),
    BlendFunc(BlendFactor, BlendFactor),
    BlendFuncSeparate(BlendFactor, BlendFactor, BlendFactor, BlendFactor),
    SetDepthTest(bool),
    SetDepthWrite(bool),
    SetCullFaceEnabled(bool),
    CullFace(CullFace),
    FrontFace(FrontFaceDirection),
    SetPolygonOffsetEnabled(bool),
    PolygonOffset(f32, f32),
    LineWidth(f32),
    DrawElements { mode: DrawMode, count: usize, offset: usize },
    DrawArrays { mode: DrawMode, first: usize, count: usize },
}

/// Compiled-source record for shader-assembly assertions.
#[derive(Debug, Clone)]
pub struct TraceShaderSource {
    /// Shader stage.
    pub stage: ShaderStage,
    /// Full source, preamble included.
    pub source: String,
}

/// A [`GlDevice`] that records instead of drawing.
#[derive(Debug, Default)]
pub struct TraceDevice {
    /// Every call in issue order.
    pub calls: Vec<TraceCall>,
    /// Sources of every compiled shader.
    pub shader_sources: Vec<TraceShaderSource>,
    /// Capabilities reported to the renderer.
    pub caps: DeviceCapabilities,
    /// Uniform names each program was asked to resolve.
    known_uniform_queries: Vec<(ProgramHandle, String)>,
    next_handle: u32,
    next_location: i32,
    live_buffers: usize,
    live_textures: usize,
    live_programs: usize,
}

impl TraceDevice {
    /// Create a trace device with default capabilities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with explicit capabilities.
    pub fn with_capabilities(caps: DeviceCapabilities) -> Self {
        Self { caps, ..Self::default() }
    }

    /// Forget recorded calls (handles stay allocated).
    pub fn clear_trace(&mut self) {
        self.calls.clear();
    }

    /// Count of indexed + non-indexed draw calls recorded.
    pub fn draw_call_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, TraceCall::DrawElements { .. } | TraceCall::DrawArrays { .. }))
            .count()
    }

    /// The recorded indexed draws.
    pub fn draw_elements_calls(&self) -> Vec<(DrawMode, usize)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                TraceCall::DrawElements { mode, count, .. } => Some((*mode, *count)),
                _ => None,
            })
            .collect()
    }

    /// Number of programs still alive.
    pub fn live_program_count(&self) -> usize {
        self.live_programs
    }

    /// Number of buffers still alive.
    pub fn live_buffer_count(&self) -> usize {
        self.live_buffers
    }

    /// Number of textures still alive.
    pub fn live_texture_count(&self) -> usize {
        self.live_textures
    }

    /// How many times a given call predicate matched.
    pub fn count_calls(&self, predicate: impl Fn(&TraceCall) -> bool) -> usize {
        self.calls.iter().filter(|c| predicate(c)).count()
    }

    fn next(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl GlDevice for TraceDevice {
    fn capabilities(&self) -> DeviceCapabilities {
        self.caps.clone()
    }

    fn create_buffer(&mut self) -> BufferHandle {
        let handle = BufferHandle(self.next());
        self.live_buffers += 1;
        self.calls.push(TraceCall::CreateBuffer(handle));
        handle
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.live_buffers = self.live_buffers.saturating_sub(1);
        self.calls.push(TraceCall::DeleteBuffer(buffer));
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferHandle) {
        self.calls.push(TraceCall::BindBuffer(target, buffer));
    }

    fn buffer_data_f32(&mut self, target: BufferTarget, data: &[f32], usage: BufferUsage) {
        self.calls.push(TraceCall::BufferDataF32 { target, len: data.len(), usage });
    }

    fn buffer_data_u16(&mut self, target: BufferTarget, data: &[u16], usage: BufferUsage) {
        self.calls.push(TraceCall::BufferDataU16 { target, len: data.len(), usage });
    }

    fn create_texture(&mut self) -> TextureHandle {
        let handle = TextureHandle(self.next());
        self.live_textures += 1;
        self.calls.push(TraceCall::CreateTexture(handle));
        handle
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.live_textures = self.live_textures.saturating_sub(1);
        self.calls.push(TraceCall::DeleteTexture(texture));
    }

    fn active_texture(&mut self, unit: u32) {
        self.calls.push(TraceCall::ActiveTexture(unit));
    }

    fn bind_texture(&mut self, target: TextureTarget, texture: TextureHandle) {
        self.calls.push(TraceCall::BindTexture(target, texture));
    }

    fn tex_image_2d(&mut self, width: u32, height: u32, _layout: PixelLayout, _pixels: &[u8]) {
        self.calls.push(TraceCall::TexImage2d { width, height });
    }

    fn tex_image_cube(
        &mut self,
        face: u32,
        width: u32,
        height: u32,
        _layout: PixelLayout,
        _pixels: &[u8],
    ) {
        self.calls.push(TraceCall::TexImageCube { face, width, height });
    }

    fn tex_parameters(&mut self, target: TextureTarget, _params: &SamplerParams) {
        self.calls.push(TraceCall::TexParameters(target));
    }

    fn generate_mipmap(&mut self, target: TextureTarget) {
        self.calls.push(TraceCall::GenerateMipmap(target));
    }

    fn create_framebuffer(&mut self) -> FramebufferHandle {
        let handle = FramebufferHandle(self.next());
        self.calls.push(TraceCall::CreateFramebuffer(handle));
        handle
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        self.calls.push(TraceCall::DeleteFramebuffer(framebuffer));
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>) {
        self.calls.push(TraceCall::BindFramebuffer(framebuffer));
    }

    fn framebuffer_texture_2d(
        &mut self,
        attachment: Attachment,
        _target: TextureTarget,
        cube_face: u32,
        _texture: TextureHandle,
    ) {
        self.calls.push(TraceCall::FramebufferTexture2d { attachment, cube_face });
    }

    fn create_renderbuffer(&mut self) -> RenderbufferHandle {
        let handle = RenderbufferHandle(self.next());
        self.calls.push(TraceCall::CreateRenderbuffer(handle));
        handle
    }

    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferHandle) {
        self.calls.push(TraceCall::DeleteRenderbuffer(renderbuffer));
    }

    fn bind_renderbuffer(&mut self, renderbuffer: RenderbufferHandle) {
        self.calls.push(TraceCall::BindRenderbuffer(renderbuffer));
    }

    fn renderbuffer_storage(&mut self, format: RenderbufferFormat, width: u32, height: u32) {
        self.calls.push(TraceCall::RenderbufferStorage(format, width, height));
    }

    fn framebuffer_renderbuffer(
        &mut self,
        attachment: Attachment,
        _renderbuffer: RenderbufferHandle,
    ) {
        self.calls.push(TraceCall::FramebufferRenderbuffer(attachment));
    }

    fn create_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderHandle, String> {
        let handle = ShaderHandle(self.next());
        self.shader_sources.push(TraceShaderSource {
            stage,
            source: source.to_string(),
        });
        self.calls.push(TraceCall::CompileShader { stage, handle });
        Ok(handle)
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        self.calls.push(TraceCall::DeleteShader(shader));
    }

    fn create_program(&mut self) -> ProgramHandle {
        let handle = ProgramHandle(self.next());
        self.live_programs += 1;
        self.calls.push(TraceCall::CreateProgram(handle));
        handle
    }

    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        self.calls.push(TraceCall::AttachShader(program, shader));
    }

    fn link_program(&mut self, program: ProgramHandle) -> Result<(), String> {
        self.calls.push(TraceCall::LinkProgram(program));
        Ok(())
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.calls.push(TraceCall::UseProgram(program));
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.live_programs = self.live_programs.saturating_sub(1);
        self.calls.push(TraceCall::DeleteProgram(program));
    }

    fn get_uniform_location(
        &mut self,
        program: ProgramHandle,
        name: &str,
    ) -> Option<UniformLocation> {
        // every queried name resolves; locations are unique per query set
        let key = (program, name.to_string());
        if !self.known_uniform_queries.contains(&key) {
            self.known_uniform_queries.push(key);
        }
        self.next_location += 1;
        Some(UniformLocation(self.next_location))
    }

    fn get_attrib_location(
        &mut self,
        _program: ProgramHandle,
        _name: &str,
    ) -> Option<AttributeLocation> {
        self.next_location += 1;
        Some(AttributeLocation(self.next_location as u32))
    }

    fn uniform1i(&mut self, location: UniformLocation, _v: i32) {
        self.calls.push(TraceCall::Uniform { location: location.0 });
    }

    fn uniform1f(&mut self, location: UniformLocation, _v: f32) {
        self.calls.push(TraceCall::Uniform { location: location.0 });
    }

    fn uniform2f(&mut self, location: UniformLocation, _x: f32, _y: f32) {
        self.calls.push(TraceCall::Uniform { location: location.0 });
    }

    fn uniform3f(&mut self, location: UniformLocation, _x: f32, _y: f32, _z: f32) {
        self.calls.push(TraceCall::Uniform { location: location.0 });
    }

    fn uniform4f(&mut self, location: UniformLocation, _x: f32, _y: f32, _z: f32, _w: f32) {
        self.calls.push(TraceCall::Uniform { location: location.0 });
    }

    fn uniform1fv(&mut self, location: UniformLocation, _v: &[f32]) {
        self.calls.push(TraceCall::Uniform { location: location.0 });
    }

    fn uniform2fv(&mut self, location: UniformLocation, _v: &[f32]) {
        self.calls.push(TraceCall::Uniform { location: location.0 });
    }

    fn uniform3fv(&mut self, location: UniformLocation, _v: &[f32]) {
        self.calls.push(TraceCall::Uniform { location: location.0 });
    }

    fn uniform4fv(&mut self, location: UniformLocation, _v: &[f32]) {
        self.calls.push(TraceCall::Uniform { location: location.0 });
    }

    fn uniform1iv(&mut self, location: UniformLocation, _v: &[i32]) {
        self.calls.push(TraceCall::Uniform { location: location.0 });
    }

    fn uniform_matrix3fv(&mut self, location: UniformLocation, _v: &[f32]) {
        self.calls.push(TraceCall::Uniform { location: location.0 });
    }

    fn uniform_matrix4fv(&mut self, location: UniformLocation, _v: &[f32]) {
        self.calls.push(TraceCall::Uniform { location: location.0 });
    }

    fn enable_vertex_attrib(&mut self, location: AttributeLocation) {
        self.calls.push(TraceCall::EnableVertexAttrib(location));
    }

    fn disable_vertex_attrib(&mut self, location: AttributeLocation) {
        self.calls.push(TraceCall::DisableVertexAttrib(location));
    }

    fn vertex_attrib_pointer(
        &mut self,
        location: AttributeLocation,
        item_size: u32,
        first_vertex: usize,
    ) {
        self.calls
            .push(TraceCall::VertexAttribPointer(location, item_size, first_vertex));
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.calls.push(TraceCall::Viewport(x, y, width, height));
    }

    fn scissor(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.calls.push(TraceCall::Scissor(x, y, width, height));
    }

    fn set_scissor_test(&mut self, enabled: bool) {
        self.calls.push(TraceCall::SetScissorTest(enabled));
    }

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.calls.push(TraceCall::ClearColor(r, g, b, a));
    }

    fn clear(&mut self, color: bool, depth: bool, stencil: bool) {
        self.calls.push(TraceCall::Clear { color, depth, stencil });
    }

    fn set_blend_enabled(&mut self, enabled: bool) {
        self.calls.push(TraceCall::SetBlendEnabled(enabled));
    }

    fn blend_equation(&mut self, equation: BlendEquation) {
        self.calls.push(TraceCall::BlendEquation(equation));
    }

    fn blend_equation_separate(&mut self, rgb: BlendEquation, alpha: BlendEquation) {
        self.calls.push(TraceCall::BlendEquationSeparate(rgb, alpha));
    }

    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.calls.push(TraceCall::BlendFunc(src, dst));
    }

    fn blend_func_separate(
        &mut self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) {
        self.calls.push(TraceCall::BlendFuncSeparate(src_rgb, dst_rgb, src_alpha, dst_alpha));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.calls.push(TraceCall::SetDepthTest(enabled));
    }

    fn set_depth_write(&mut self, enabled: bool) {
        self.calls.push(TraceCall::SetDepthWrite(enabled));
    }

    fn set_cull_face_enabled(&mut self, enabled: bool) {
        self.calls.push(TraceCall::SetCullFaceEnabled(enabled));
    }

    fn cull_face(&mut self, mode: CullFace) {
        self.calls.push(TraceCall::CullFace(mode));
    }

    fn front_face(&mut self, direction: FrontFaceDirection) {
        self.calls.push(TraceCall::FrontFace(direction));
    }

    fn set_polygon_offset_enabled(&mut self, enabled: bool) {
        self.calls.push(TraceCall::SetPolygonOffsetEnabled(enabled));
    }

    fn polygon_offset(&mut self, factor: f32, units: f32) {
        self.calls.push(TraceCall::PolygonOffset(factor, units));
    }

    fn line_width(&mut self, width: f32) {
        self.calls.push(TraceCall::LineWidth(width));
    }

    fn draw_elements(&mut self, mode: DrawMode, count: usize, offset: usize) {
        self.calls.push(TraceCall::DrawElements { mode, count, offset });
    }

    fn draw_arrays(&mut self, mode: DrawMode, first: usize, count: usize) {
        self.calls.push(TraceCall::DrawArrays { mode, first, count });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_sequential_and_counted() {
        let mut device = TraceDevice::new();
        let a = device.create_buffer();
        let b = device.create_buffer();
        assert_ne!(a, b);
        assert_eq!(device.live_buffer_count(), 2);
        device.delete_buffer(a);
        assert_eq!(device.live_buffer_count(), 1);
    }

    #[test]
    fn test_draw_counting() {
        let mut device = TraceDevice::new();
        device.draw_elements(DrawMode::Triangles, 36, 0);
        device.draw_arrays(DrawMode::Points, 0, 100);
        assert_eq!(device.draw_call_count(), 2);
        assert_eq!(device.draw_elements_calls(), vec![(DrawMode::Triangles, 36)]);
    }
}
