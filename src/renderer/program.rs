//! Program cache: shader-source assembly from a feature vector,
//! compile/link through the device, uniform/attribute location caching
//! and refcounted reuse.

use super::gl::{AttributeLocation, GlDevice, ProgramHandle, ShaderStage, UniformLocation};
use crate::core::Precision;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// The feature vector that, together with the shader sources, uniquely
/// determines a compiled program.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ProgramFeatures {
    /// Diffuse map bound.
    pub map: bool,
    /// Environment map bound.
    pub env_map: bool,
    /// Light map bound.
    pub light_map: bool,
    /// Bump map bound.
    pub bump_map: bool,
    /// Specular map bound.
    pub specular_map: bool,

    /// Vertex colors enabled.
    pub vertex_colors: bool,

    /// Scene fog present and material participates.
    pub fog: bool,
    /// Fog is the exponential variant.
    pub fog_exp2: bool,

    /// Point size attenuates with distance.
    pub size_attenuation: bool,

    /// Skinning enabled.
    pub skinning: bool,
    /// Bone count compiled into the shader.
    pub max_bones: usize,
    /// Bones come from a float texture rather than a uniform array.
    pub bone_texture: bool,
    /// Bone texture width in pixels.
    pub bone_texture_width: u32,
    /// Bone texture height in pixels.
    pub bone_texture_height: u32,

    /// Morph targets enabled.
    pub morph_targets: bool,
    /// Morph normals enabled.
    pub morph_normals: bool,
    /// Morph target attribute slots compiled in.
    pub max_morph_targets: usize,
    /// Morph normal attribute slots compiled in.
    pub max_morph_normals: usize,

    /// Directional light slots.
    pub max_dir_lights: usize,
    /// Point light slots.
    pub max_point_lights: usize,
    /// Spot light slots.
    pub max_spot_lights: usize,
    /// Hemisphere light slots.
    pub max_hemi_lights: usize,

    /// Shadow slots.
    pub max_shadows: usize,
    /// Shadow sampling compiled in.
    pub shadow_map_enabled: bool,
    /// Soft (PCF) shadow sampling.
    pub shadow_map_soft: bool,
    /// Shadow cascade debugging.
    pub shadow_map_debug: bool,
    /// Cascaded shadow maps.
    pub shadow_map_cascade: bool,

    /// Alpha-test threshold bits (`f32::to_bits`); zero disables.
    pub alpha_test_bits: u32,
    /// Metal-style specular accumulation.
    pub metal: bool,
    /// Per-fragment point/spot lighting.
    pub per_pixel: bool,
    /// Wrap-around diffuse.
    pub wrap_around: bool,
    /// Material renders both sides.
    pub double_sided: bool,
}

impl ProgramFeatures {
    /// The alpha-test threshold.
    pub fn alpha_test(&self) -> f32 {
        f32::from_bits(self.alpha_test_bits)
    }
}

/// Renderer-global toggles folded into every preamble.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalShaderFlags {
    /// Inputs (colors, textures) are gamma-encoded.
    pub gamma_input: bool,
    /// Convert the final color to gamma space.
    pub gamma_output: bool,
    /// Vertex shaders may sample textures.
    pub supports_vertex_textures: bool,
    /// Derivatives extension available (bump maps).
    pub supports_standard_derivatives: bool,
    /// Shader float precision.
    pub precision: Precision,
}

/// A compiled, linked program with cached locations.
#[derive(Debug)]
pub struct Program {
    /// Cache-assigned ordinal, used in the buffer-rebind hash.
    pub id: u64,
    /// Device program handle.
    pub handle: ProgramHandle,
    /// Uniform name -> location, misses omitted.
    pub uniforms: HashMap<String, UniformLocation>,
    /// Attribute name -> location, misses omitted.
    pub attributes: HashMap<String, AttributeLocation>,
}

impl Program {
    /// Resolved uniform location.
    pub fn uniform(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms.get(name).copied()
    }

    /// Resolved attribute location.
    pub fn attribute(&self, name: &str) -> Option<AttributeLocation> {
        self.attributes.get(name).copied()
    }
}

struct CacheEntry {
    code: u64,
    program: Arc<Program>,
    used_times: u32,
}

/// Compiled-program cache keyed by shader identity plus feature vector.
#[derive(Default)]
pub struct ProgramCache {
    entries: Vec<CacheEntry>,
    next_id: u64,
}

impl ProgramCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live programs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no programs are cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Refcount of the entry holding `program`, for assertions.
    pub fn used_times(&self, program: &Arc<Program>) -> Option<u32> {
        self.entries
            .iter()
            .find(|e| Arc::ptr_eq(&e.program, program))
            .map(|e| e.used_times)
    }

    /// Cache key from shader identity and features.
    fn code(shader_id: Option<&str>, vertex: &str, fragment: &str, features: &ProgramFeatures) -> u64 {
        let mut hasher = DefaultHasher::new();
        match shader_id {
            Some(id) => id.hash(&mut hasher),
            None => {
                let mut vh = DefaultHasher::new();
                vertex.hash(&mut vh);
                let mut fh = DefaultHasher::new();
                fragment.hash(&mut fh);
                (vh.finish() ^ fh.finish()).hash(&mut hasher);
            }
        }
        features.hash(&mut hasher);
        hasher.finish()
    }

    /// Fetch a program for the shader/feature combination, compiling on
    /// a cache miss. Extra uniform and attribute names beyond the
    /// standard set are resolved and cached too. Compile or link failure
    /// logs the driver info log and yields `None`.
    #[allow(clippy::too_many_arguments)]
    pub fn acquire(
        &mut self,
        device: &mut impl GlDevice,
        shader_id: Option<&str>,
        vertex_body: &str,
        fragment_body: &str,
        uniform_names: &[String],
        attribute_names: &[String],
        features: &ProgramFeatures,
        globals: &GlobalShaderFlags,
    ) -> Option<Arc<Program>> {
        let code = Self::code(shader_id, vertex_body, fragment_body, features);

        if let Some(entry) = self.entries.iter_mut().find(|e| e.code == code) {
            entry.used_times += 1;
            return Some(Arc::clone(&entry.program));
        }

        let vertex_source = format!("{}{}", vertex_prefix(features, globals), vertex_body);
        let fragment_source = format!("{}{}", fragment_prefix(features, globals), fragment_body);

        let vertex_shader = match device.create_shader(ShaderStage::Vertex, &vertex_source) {
            Ok(shader) => shader,
            Err(info_log) => {
                log::error!("vertex shader compile failed: {info_log}");
                return None;
            }
        };
        let fragment_shader = match device.create_shader(ShaderStage::Fragment, &fragment_source) {
            Ok(shader) => shader,
            Err(info_log) => {
                log::error!("fragment shader compile failed: {info_log}");
                device.delete_shader(vertex_shader);
                return None;
            }
        };

        let handle = device.create_program();
        device.attach_shader(handle, vertex_shader);
        device.attach_shader(handle, fragment_shader);
        let linked = device.link_program(handle);

        device.delete_shader(vertex_shader);
        device.delete_shader(fragment_shader);

        if let Err(info_log) = linked {
            log::error!("program link failed: {info_log}");
            device.delete_program(handle);
            return None;
        }

        // standard uniforms every program may use
        let mut uniforms = HashMap::new();
        let mut standard_uniforms: Vec<String> = [
            "viewMatrix",
            "modelViewMatrix",
            "projectionMatrix",
            "normalMatrix",
            "modelMatrix",
            "cameraPosition",
            "morphTargetInfluences",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        if features.bone_texture {
            standard_uniforms.push("boneTexture".into());
        } else {
            standard_uniforms.push("boneGlobalMatrices".into());
        }
        for name in standard_uniforms.iter().chain(uniform_names.iter()) {
            if let Some(location) = device.get_uniform_location(handle, name) {
                uniforms.insert(name.clone(), location);
            }
        }

        // standard attributes plus morph slots plus custom ones
        let mut attributes = HashMap::new();
        let mut standard_attributes: Vec<String> = [
            "position",
            "normal",
            "uv",
            "uv2",
            "tangent",
            "color",
            "skinIndex",
            "skinWeight",
            "lineDistance",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        for i in 0..features.max_morph_targets {
            standard_attributes.push(format!("morphTarget{i}"));
        }
        for i in 0..features.max_morph_normals {
            standard_attributes.push(format!("morphNormal{i}"));
        }
        for name in standard_attributes.iter().chain(attribute_names.iter()) {
            if let Some(location) = device.get_attrib_location(handle, name) {
                attributes.insert(name.clone(), location);
            }
        }

        self.next_id += 1;
        let program = Arc::new(Program {
            id: self.next_id,
            handle,
            uniforms,
            attributes,
        });

        self.entries.push(CacheEntry {
            code,
            program: Arc::clone(&program),
            used_times: 1,
        });

        Some(program)
    }

    /// Drop one reference; the program is deleted at zero.
    pub fn release(&mut self, device: &mut impl GlDevice, program: &Arc<Program>) {
        let Some(index) = self
            .entries
            .iter()
            .position(|e| Arc::ptr_eq(&e.program, program))
        else {
            return;
        };

        self.entries[index].used_times -= 1;
        if self.entries[index].used_times == 0 {
            let entry = self.entries.remove(index);
            device.delete_program(entry.program.handle);
        }
    }
}

/// The vertex preamble: precision, feature defines, shared uniform and
/// attribute declarations.
pub fn vertex_prefix(features: &ProgramFeatures, globals: &GlobalShaderFlags) -> String {
    let mut s = String::new();

    let _ = writeln!(s, "precision {} float;", globals.precision.qualifier());

    if globals.supports_vertex_textures {
        s.push_str("#define VERTEX_TEXTURES\n");
    }
    if globals.gamma_input {
        s.push_str("#define GAMMA_INPUT\n");
    }
    if globals.gamma_output {
        s.push_str("#define GAMMA_OUTPUT\n");
    }

    let _ = writeln!(s, "#define MAX_DIR_LIGHTS {}", features.max_dir_lights);
    let _ = writeln!(s, "#define MAX_POINT_LIGHTS {}", features.max_point_lights);
    let _ = writeln!(s, "#define MAX_SPOT_LIGHTS {}", features.max_spot_lights);
    let _ = writeln!(s, "#define MAX_HEMI_LIGHTS {}", features.max_hemi_lights);
    let _ = writeln!(s, "#define MAX_SHADOWS {}", features.max_shadows);
    let _ = writeln!(s, "#define MAX_BONES {}", features.max_bones.max(1));

    if features.map {
        s.push_str("#define USE_MAP\n");
    }
    if features.env_map {
        s.push_str("#define USE_ENVMAP\n");
    }
    if features.light_map {
        s.push_str("#define USE_LIGHTMAP\n");
    }
    if features.bump_map && globals.supports_standard_derivatives {
        s.push_str("#define USE_BUMPMAP\n");
    }
    if features.specular_map {
        s.push_str("#define USE_SPECULARMAP\n");
    }
    if features.vertex_colors {
        s.push_str("#define USE_COLOR\n");
    }
    if features.size_attenuation {
        s.push_str("#define USE_SIZEATTENUATION\n");
    }

    if features.skinning {
        s.push_str("#define USE_SKINNING\n");
    }
    if features.bone_texture {
        s.push_str("#define BONE_TEXTURE\n");
        let _ = writeln!(s, "#define N_BONE_PIXEL_X {}", features.bone_texture_width);
        let _ = writeln!(s, "#define N_BONE_PIXEL_Y {}", features.bone_texture_height);
    }

    if features.morph_targets {
        s.push_str("#define USE_MORPHTARGETS\n");
    }
    if features.morph_normals {
        s.push_str("#define USE_MORPHNORMALS\n");
    }
    if features.per_pixel {
        s.push_str("#define PHONG_PER_PIXEL\n");
    }
    if features.wrap_around {
        s.push_str("#define WRAP_AROUND\n");
    }
    if features.double_sided {
        s.push_str("#define DOUBLE_SIDED\n");
    }

    if features.shadow_map_enabled {
        s.push_str("#define USE_SHADOWMAP\n");
    }
    if features.shadow_map_soft {
        s.push_str("#define SHADOWMAP_SOFT\n");
    }
    if features.shadow_map_debug {
        s.push_str("#define SHADOWMAP_DEBUG\n");
    }
    if features.shadow_map_cascade {
        s.push_str("#define SHADOWMAP_CASCADE\n");
    }

    s.push_str(
        "uniform mat4 modelMatrix;\n\
         uniform mat4 modelViewMatrix;\n\
         uniform mat4 projectionMatrix;\n\
         uniform mat4 viewMatrix;\n\
         uniform mat3 normalMatrix;\n\
         uniform vec3 cameraPosition;\n\
         attribute vec3 position;\n\
         attribute vec3 normal;\n\
         attribute vec2 uv;\n\
         attribute vec2 uv2;\n\
         #ifdef USE_COLOR\n\
         attribute vec3 color;\n\
         #endif\n\
         #ifdef USE_MORPHTARGETS\n\
         attribute vec3 morphTarget0;\n\
         attribute vec3 morphTarget1;\n\
         attribute vec3 morphTarget2;\n\
         attribute vec3 morphTarget3;\n\
         #ifdef USE_MORPHNORMALS\n\
         attribute vec3 morphNormal0;\n\
         attribute vec3 morphNormal1;\n\
         attribute vec3 morphNormal2;\n\
         attribute vec3 morphNormal3;\n\
         #else\n\
         attribute vec3 morphTarget4;\n\
         attribute vec3 morphTarget5;\n\
         attribute vec3 morphTarget6;\n\
         attribute vec3 morphTarget7;\n\
         #endif\n\
         #endif\n\
         #ifdef USE_SKINNING\n\
         attribute vec4 skinIndex;\n\
         attribute vec4 skinWeight;\n\
         #endif\n",
    );

    s
}

/// The fragment preamble.
pub fn fragment_prefix(features: &ProgramFeatures, globals: &GlobalShaderFlags) -> String {
    let mut s = String::new();

    let _ = writeln!(s, "precision {} float;", globals.precision.qualifier());

    if features.bump_map && globals.supports_standard_derivatives {
        s.push_str("#extension GL_OES_standard_derivatives : enable\n");
    }

    let _ = writeln!(s, "#define MAX_DIR_LIGHTS {}", features.max_dir_lights);
    let _ = writeln!(s, "#define MAX_POINT_LIGHTS {}", features.max_point_lights);
    let _ = writeln!(s, "#define MAX_SPOT_LIGHTS {}", features.max_spot_lights);
    let _ = writeln!(s, "#define MAX_HEMI_LIGHTS {}", features.max_hemi_lights);
    let _ = writeln!(s, "#define MAX_SHADOWS {}", features.max_shadows);

    if features.alpha_test() > 0.0 {
        let _ = writeln!(s, "#define ALPHATEST {:?}", features.alpha_test());
    }

    if globals.gamma_input {
        s.push_str("#define GAMMA_INPUT\n");
    }
    if globals.gamma_output {
        s.push_str("#define GAMMA_OUTPUT\n");
    }

    if features.fog {
        s.push_str("#define USE_FOG\n");
        if features.fog_exp2 {
            s.push_str("#define FOG_EXP2\n");
        }
    }

    if features.map {
        s.push_str("#define USE_MAP\n");
    }
    if features.env_map {
        s.push_str("#define USE_ENVMAP\n");
    }
    if features.light_map {
        s.push_str("#define USE_LIGHTMAP\n");
    }
    if features.bump_map && globals.supports_standard_derivatives {
        s.push_str("#define USE_BUMPMAP\n");
    }
    if features.specular_map {
        s.push_str("#define USE_SPECULARMAP\n");
    }
    if features.vertex_colors {
        s.push_str("#define USE_COLOR\n");
    }

    if features.metal {
        s.push_str("#define METAL\n");
    }
    if features.per_pixel {
        s.push_str("#define PHONG_PER_PIXEL\n");
    }
    if features.wrap_around {
        s.push_str("#define WRAP_AROUND\n");
    }
    if features.double_sided {
        s.push_str("#define DOUBLE_SIDED\n");
    }

    if features.shadow_map_enabled {
        s.push_str("#define USE_SHADOWMAP\n");
    }
    if features.shadow_map_soft {
        s.push_str("#define SHADOWMAP_SOFT\n");
    }
    if features.shadow_map_debug {
        s.push_str("#define SHADOWMAP_DEBUG\n");
    }
    if features.shadow_map_cascade {
        s.push_str("#define SHADOWMAP_CASCADE\n");
    }

    s.push_str("uniform mat4 viewMatrix;\nuniform vec3 cameraPosition;\n");

    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::trace::TraceDevice;

    fn acquire(
        cache: &mut ProgramCache,
        device: &mut TraceDevice,
        features: &ProgramFeatures,
    ) -> Arc<Program> {
        cache
            .acquire(
                device,
                Some("basic"),
                "void main() {}",
                "void main() {}",
                &[],
                &[],
                features,
                &GlobalShaderFlags::default(),
            )
            .unwrap()
    }

    #[test]
    fn test_equal_features_share_program() {
        let mut cache = ProgramCache::new();
        let mut device = TraceDevice::new();
        let features = ProgramFeatures { map: true, ..Default::default() };

        let a = acquire(&mut cache, &mut device, &features);
        let b = acquire(&mut cache, &mut device, &features);

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.used_times(&a), Some(2));
    }

    #[test]
    fn test_different_features_compile_new_program() {
        let mut cache = ProgramCache::new();
        let mut device = TraceDevice::new();

        let a = acquire(&mut cache, &mut device, &ProgramFeatures::default());
        let b = acquire(
            &mut cache,
            &mut device,
            &ProgramFeatures { map: true, ..Default::default() },
        );

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_release_deletes_at_zero() {
        let mut cache = ProgramCache::new();
        let mut device = TraceDevice::new();
        let features = ProgramFeatures::default();

        let a = acquire(&mut cache, &mut device, &features);
        let b = acquire(&mut cache, &mut device, &features);
        assert_eq!(device.live_program_count(), 1);

        cache.release(&mut device, &a);
        assert_eq!(cache.len(), 1);
        cache.release(&mut device, &b);
        assert_eq!(cache.len(), 0);
        assert_eq!(device.live_program_count(), 0);
    }

    #[test]
    fn test_prefix_defines_follow_features() {
        let features = ProgramFeatures {
            map: true,
            fog: true,
            fog_exp2: true,
            max_dir_lights: 2,
            ..Default::default()
        };
        let globals = GlobalShaderFlags::default();
        let fragment = fragment_prefix(&features, &globals);
        assert!(fragment.contains("#define USE_MAP"));
        assert!(fragment.contains("#define FOG_EXP2"));
        assert!(fragment.contains("#define MAX_DIR_LIGHTS 2"));
        let vertex = vertex_prefix(&features, &globals);
        assert!(vertex.contains("attribute vec3 position;"));
    }
}
