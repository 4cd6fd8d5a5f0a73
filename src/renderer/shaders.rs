//! GLSL chunk library and the built-in shader pairs. The program
//! builder prepends a feature-derived preamble (defines, shared uniform
//! and attribute declarations) to these bodies.

use super::uniforms::{UniformMap, UniformValue};
use crate::math::{Color, Vector3};

/// Reusable GLSL fragments, keyed by the `#define`s the preamble emits.
pub mod chunks {
    /// Fog uniform declarations (fragment).
    pub const FOG_PARS_FRAGMENT: &str = "\
#ifdef USE_FOG
uniform vec3 fogColor;
#ifdef FOG_EXP2
uniform float fogDensity;
#else
uniform float fogNear;
uniform float fogFar;
#endif
#endif
";

    /// Fog application (fragment, end of main).
    pub const FOG_FRAGMENT: &str = "\
#ifdef USE_FOG
float depth = gl_FragCoord.z / gl_FragCoord.w;
#ifdef FOG_EXP2
const float LOG2 = 1.442695;
float fogFactor = exp2( - fogDensity * fogDensity * depth * depth * LOG2 );
fogFactor = 1.0 - clamp( fogFactor, 0.0, 1.0 );
#else
float fogFactor = smoothstep( fogNear, fogFar, depth );
#endif
gl_FragColor = mix( gl_FragColor, vec4( fogColor, gl_FragColor.w ), fogFactor );
#endif
";

    /// Diffuse map declarations.
    pub const MAP_PARS_FRAGMENT: &str = "\
#ifdef USE_MAP
varying vec2 vUv;
uniform sampler2D map;
#endif
";

    /// Diffuse map declarations (vertex).
    pub const MAP_PARS_VERTEX: &str = "\
#ifdef USE_MAP
varying vec2 vUv;
uniform vec4 offsetRepeat;
#endif
";

    /// UV transform (vertex).
    pub const MAP_VERTEX: &str = "\
#ifdef USE_MAP
vUv = uv * offsetRepeat.zw + offsetRepeat.xy;
#endif
";

    /// Diffuse map sample (fragment).
    pub const MAP_FRAGMENT: &str = "\
#ifdef USE_MAP
#ifdef GAMMA_INPUT
vec4 texelColor = texture2D( map, vUv );
texelColor.xyz *= texelColor.xyz;
gl_FragColor = gl_FragColor * texelColor;
#else
gl_FragColor = gl_FragColor * texture2D( map, vUv );
#endif
#endif
";

    /// Light map declarations (fragment).
    pub const LIGHTMAP_PARS_FRAGMENT: &str = "\
#ifdef USE_LIGHTMAP
varying vec2 vUv2;
uniform sampler2D lightMap;
#endif
";

    /// Light map declarations (vertex).
    pub const LIGHTMAP_PARS_VERTEX: &str = "\
#ifdef USE_LIGHTMAP
varying vec2 vUv2;
#endif
";

    /// Light map application (fragment).
    pub const LIGHTMAP_FRAGMENT: &str = "\
#ifdef USE_LIGHTMAP
gl_FragColor = gl_FragColor * texture2D( lightMap, vUv2 );
#endif
";

    /// Light map UV pass-through (vertex).
    pub const LIGHTMAP_VERTEX: &str = "\
#ifdef USE_LIGHTMAP
vUv2 = uv2;
#endif
";

    /// Environment map declarations (fragment).
    pub const ENVMAP_PARS_FRAGMENT: &str = "\
#ifdef USE_ENVMAP
varying vec3 vReflect;
uniform float reflectivity;
uniform samplerCube envMap;
uniform float flipEnvMap;
#endif
";

    /// Environment map declarations (vertex).
    pub const ENVMAP_PARS_VERTEX: &str = "\
#ifdef USE_ENVMAP
varying vec3 vReflect;
uniform float refractionRatio;
uniform bool useRefract;
#endif
";

    /// Environment map reflection vector (vertex).
    pub const ENVMAP_VERTEX: &str = "\
#ifdef USE_ENVMAP
vec4 mPosition = modelMatrix * vec4( position, 1.0 );
vec3 nWorld = mat3( modelMatrix[ 0 ].xyz, modelMatrix[ 1 ].xyz, modelMatrix[ 2 ].xyz ) * normal;
if ( useRefract ) {
vReflect = refract( normalize( mPosition.xyz - cameraPosition ), normalize( nWorld.xyz ), refractionRatio );
} else {
vReflect = reflect( normalize( mPosition.xyz - cameraPosition ), normalize( nWorld.xyz ) );
}
#endif
";

    /// Environment map application (fragment).
    pub const ENVMAP_FRAGMENT: &str = "\
#ifdef USE_ENVMAP
vec4 cubeColor = textureCube( envMap, vec3( flipEnvMap * vReflect.x, vReflect.yz ) );
#ifdef GAMMA_INPUT
cubeColor.xyz *= cubeColor.xyz;
#endif
gl_FragColor.xyz = mix( gl_FragColor.xyz, cubeColor.xyz, reflectivity );
#endif
";

    /// Specular map declarations (fragment).
    pub const SPECULARMAP_PARS_FRAGMENT: &str = "\
#ifdef USE_SPECULARMAP
uniform sampler2D specularMap;
#endif
";

    /// Specular strength from the map or 1.0 (fragment).
    pub const SPECULARMAP_FRAGMENT: &str = "\
float specularStrength;
#ifdef USE_SPECULARMAP
vec4 texelSpecular = texture2D( specularMap, vUv );
specularStrength = texelSpecular.r;
#else
specularStrength = 1.0;
#endif
";

    /// Vertex color declarations (fragment).
    pub const COLOR_PARS_FRAGMENT: &str = "\
#ifdef USE_COLOR
varying vec3 vColor;
#endif
";

    /// Vertex color application (fragment).
    pub const COLOR_FRAGMENT: &str = "\
#ifdef USE_COLOR
gl_FragColor = gl_FragColor * vec4( vColor, 1.0 );
#endif
";

    /// Vertex color declarations (vertex).
    pub const COLOR_PARS_VERTEX: &str = "\
#ifdef USE_COLOR
varying vec3 vColor;
#endif
";

    /// Vertex color pass-through (vertex).
    pub const COLOR_VERTEX: &str = "\
#ifdef USE_COLOR
#ifdef GAMMA_INPUT
vColor = color * color;
#else
vColor = color;
#endif
#endif
";

    /// Morph target influence uniforms (vertex).
    pub const MORPHTARGET_PARS_VERTEX: &str = "\
#ifdef USE_MORPHTARGETS
#ifndef USE_MORPHNORMALS
uniform float morphTargetInfluences[ 8 ];
#else
uniform float morphTargetInfluences[ 4 ];
#endif
#endif
";

    /// Morphed position (vertex).
    pub const MORPHTARGET_VERTEX: &str = "\
#ifdef USE_MORPHTARGETS
vec3 morphed = vec3( 0.0 );
morphed += ( morphTarget0 - position ) * morphTargetInfluences[ 0 ];
morphed += ( morphTarget1 - position ) * morphTargetInfluences[ 1 ];
morphed += ( morphTarget2 - position ) * morphTargetInfluences[ 2 ];
morphed += ( morphTarget3 - position ) * morphTargetInfluences[ 3 ];
#ifndef USE_MORPHNORMALS
morphed += ( morphTarget4 - position ) * morphTargetInfluences[ 4 ];
morphed += ( morphTarget5 - position ) * morphTargetInfluences[ 5 ];
morphed += ( morphTarget6 - position ) * morphTargetInfluences[ 6 ];
morphed += ( morphTarget7 - position ) * morphTargetInfluences[ 7 ];
#endif
morphed += position;
gl_Position = projectionMatrix * modelViewMatrix * vec4( morphed, 1.0 );
#else
gl_Position = projectionMatrix * modelViewMatrix * vec4( position, 1.0 );
#endif
";

    /// Morphed normal (vertex).
    pub const MORPHNORMAL_VERTEX: &str = "\
#ifdef USE_MORPHNORMALS
vec3 morphedNormal = vec3( 0.0 );
morphedNormal += ( morphNormal0 - normal ) * morphTargetInfluences[ 0 ];
morphedNormal += ( morphNormal1 - normal ) * morphTargetInfluences[ 1 ];
morphedNormal += ( morphNormal2 - normal ) * morphTargetInfluences[ 2 ];
morphedNormal += ( morphNormal3 - normal ) * morphTargetInfluences[ 3 ];
morphedNormal += normal;
vec3 transformedNormal = normalMatrix * morphedNormal;
#else
vec3 transformedNormal = normalMatrix * normal;
#endif
";

    /// Skinning uniforms (vertex).
    pub const SKINNING_PARS_VERTEX: &str = "\
#ifdef USE_SKINNING
uniform mat4 boneGlobalMatrices[ MAX_BONES ];
#endif
";

    /// Skinned position added to gl_Position computation (vertex).
    pub const SKINNING_VERTEX: &str = "\
#ifdef USE_SKINNING
mat4 boneMatX = boneGlobalMatrices[ int( skinIndex.x ) ];
mat4 boneMatY = boneGlobalMatrices[ int( skinIndex.y ) ];
vec4 skinVertex = vec4( position, 1.0 );
vec4 skinned = boneMatX * skinVertex * skinWeight.x;
skinned += boneMatY * skinVertex * skinWeight.y;
gl_Position = projectionMatrix * modelViewMatrix * skinned;
#endif
";

    /// Alpha test (fragment).
    pub const ALPHATEST_FRAGMENT: &str = "\
#ifdef ALPHATEST
if ( gl_FragColor.a < ALPHATEST ) discard;
#endif
";

    /// Linear-to-gamma output conversion (fragment).
    pub const LINEAR_TO_GAMMA_FRAGMENT: &str = "\
#ifdef GAMMA_OUTPUT
gl_FragColor.xyz = sqrt( gl_FragColor.xyz );
#endif
";

    /// Lambert lighting declarations (vertex).
    pub const LIGHTS_LAMBERT_PARS_VERTEX: &str = "\
uniform vec3 ambient;
uniform vec3 diffuse;
uniform vec3 emissive;
uniform vec3 ambientLightColor;
#if MAX_DIR_LIGHTS > 0
uniform vec3 directionalLightColor[ MAX_DIR_LIGHTS ];
uniform vec3 directionalLightDirection[ MAX_DIR_LIGHTS ];
#endif
#if MAX_POINT_LIGHTS > 0
uniform vec3 pointLightColor[ MAX_POINT_LIGHTS ];
uniform vec3 pointLightPosition[ MAX_POINT_LIGHTS ];
uniform float pointLightDistance[ MAX_POINT_LIGHTS ];
#endif
#if MAX_SPOT_LIGHTS > 0
uniform vec3 spotLightColor[ MAX_SPOT_LIGHTS ];
uniform vec3 spotLightPosition[ MAX_SPOT_LIGHTS ];
uniform vec3 spotLightDirection[ MAX_SPOT_LIGHTS ];
uniform float spotLightDistance[ MAX_SPOT_LIGHTS ];
uniform float spotLightAngleCos[ MAX_SPOT_LIGHTS ];
uniform float spotLightExponent[ MAX_SPOT_LIGHTS ];
#endif
#if MAX_HEMI_LIGHTS > 0
uniform vec3 hemisphereLightSkyColor[ MAX_HEMI_LIGHTS ];
uniform vec3 hemisphereLightGroundColor[ MAX_HEMI_LIGHTS ];
uniform vec3 hemisphereLightPosition[ MAX_HEMI_LIGHTS ];
#endif
#ifdef WRAP_AROUND
uniform vec3 wrapRGB;
#endif
varying vec3 vLightFront;
";

    /// Lambert per-vertex lighting accumulation (vertex).
    pub const LIGHTS_LAMBERT_VERTEX: &str = "\
vLightFront = vec3( 0.0 );
vec4 mvPosition4 = modelViewMatrix * vec4( position, 1.0 );
#if MAX_DIR_LIGHTS > 0
for ( int i = 0; i < MAX_DIR_LIGHTS; i ++ ) {
vec4 lDirection = viewMatrix * vec4( directionalLightDirection[ i ], 0.0 );
float dotProduct = dot( transformedNormal, normalize( lDirection.xyz ) );
#ifdef WRAP_AROUND
float directionalLightWeighting = mix( max( dotProduct, 0.0 ), dotProduct * 0.5 + 0.5, wrapRGB.x );
#else
float directionalLightWeighting = max( dotProduct, 0.0 );
#endif
vLightFront += directionalLightColor[ i ] * directionalLightWeighting;
}
#endif
#if MAX_POINT_LIGHTS > 0
for ( int i = 0; i < MAX_POINT_LIGHTS; i ++ ) {
vec4 lPosition = viewMatrix * vec4( pointLightPosition[ i ], 1.0 );
vec3 lVector = lPosition.xyz - mvPosition4.xyz;
float lDistance = 1.0;
if ( pointLightDistance[ i ] > 0.0 )
lDistance = 1.0 - min( ( length( lVector ) / pointLightDistance[ i ] ), 1.0 );
float dotProduct = dot( transformedNormal, normalize( lVector ) );
vLightFront += pointLightColor[ i ] * max( dotProduct, 0.0 ) * lDistance;
}
#endif
#if MAX_SPOT_LIGHTS > 0
for ( int i = 0; i < MAX_SPOT_LIGHTS; i ++ ) {
vec4 lPosition = viewMatrix * vec4( spotLightPosition[ i ], 1.0 );
vec3 lVector = lPosition.xyz - mvPosition4.xyz;
vec3 lWorld = ( modelMatrix * vec4( position, 1.0 ) ).xyz;
float spotEffect = dot( spotLightDirection[ i ], normalize( spotLightPosition[ i ] - lWorld ) );
if ( spotEffect > spotLightAngleCos[ i ] ) {
spotEffect = max( pow( spotEffect, spotLightExponent[ i ] ), 0.0 );
float lDistance = 1.0;
if ( spotLightDistance[ i ] > 0.0 )
lDistance = 1.0 - min( ( length( lVector ) / spotLightDistance[ i ] ), 1.0 );
float dotProduct = dot( transformedNormal, normalize( lVector ) );
vLightFront += spotLightColor[ i ] * max( dotProduct, 0.0 ) * lDistance * spotEffect;
}
}
#endif
#if MAX_HEMI_LIGHTS > 0
for ( int i = 0; i < MAX_HEMI_LIGHTS; i ++ ) {
vec4 lDirection = viewMatrix * vec4( hemisphereLightPosition[ i ], 0.0 );
float dotProduct = dot( transformedNormal, normalize( lDirection.xyz ) );
float hemiDiffuseWeight = 0.5 * dotProduct + 0.5;
vLightFront += mix( hemisphereLightGroundColor[ i ], hemisphereLightSkyColor[ i ], hemiDiffuseWeight );
}
#endif
vLightFront = vLightFront * diffuse + ambient * ambientLightColor + emissive;
";

    /// Phong lighting declarations (fragment).
    pub const LIGHTS_PHONG_PARS_FRAGMENT: &str = "\
uniform vec3 ambientLightColor;
#if MAX_DIR_LIGHTS > 0
uniform vec3 directionalLightColor[ MAX_DIR_LIGHTS ];
uniform vec3 directionalLightDirection[ MAX_DIR_LIGHTS ];
#endif
#if MAX_POINT_LIGHTS > 0
uniform vec3 pointLightColor[ MAX_POINT_LIGHTS ];
uniform vec3 pointLightPosition[ MAX_POINT_LIGHTS ];
uniform float pointLightDistance[ MAX_POINT_LIGHTS ];
#endif
#if MAX_SPOT_LIGHTS > 0
uniform vec3 spotLightColor[ MAX_SPOT_LIGHTS ];
uniform vec3 spotLightPosition[ MAX_SPOT_LIGHTS ];
uniform vec3 spotLightDirection[ MAX_SPOT_LIGHTS ];
uniform float spotLightDistance[ MAX_SPOT_LIGHTS ];
uniform float spotLightAngleCos[ MAX_SPOT_LIGHTS ];
uniform float spotLightExponent[ MAX_SPOT_LIGHTS ];
#endif
#if MAX_HEMI_LIGHTS > 0
uniform vec3 hemisphereLightSkyColor[ MAX_HEMI_LIGHTS ];
uniform vec3 hemisphereLightGroundColor[ MAX_HEMI_LIGHTS ];
uniform vec3 hemisphereLightPosition[ MAX_HEMI_LIGHTS ];
#endif
#ifdef WRAP_AROUND
uniform vec3 wrapRGB;
#endif
varying vec3 vViewPosition;
varying vec3 vNormal;
";

    /// Phong per-fragment lighting (fragment).
    pub const LIGHTS_PHONG_FRAGMENT: &str = "\
vec3 normal = normalize( vNormal );
vec3 viewPosition = normalize( vViewPosition );
#ifdef DOUBLE_SIDED
normal = normal * ( -1.0 + 2.0 * float( gl_FrontFacing ) );
#endif
vec3 totalDiffuse = vec3( 0.0 );
vec3 totalSpecular = vec3( 0.0 );
#if MAX_DIR_LIGHTS > 0
for( int i = 0; i < MAX_DIR_LIGHTS; i ++ ) {
vec4 lDirection = viewMatrix * vec4( directionalLightDirection[ i ], 0.0 );
vec3 dirVector = normalize( lDirection.xyz );
float dotProduct = dot( normal, dirVector );
#ifdef WRAP_AROUND
vec3 dirDiffuseWeight = mix( vec3( max( dotProduct, 0.0 ) ), vec3( dotProduct * 0.5 + 0.5 ), wrapRGB );
#else
vec3 dirDiffuseWeight = vec3( max( dotProduct, 0.0 ) );
#endif
totalDiffuse += diffuse * directionalLightColor[ i ] * dirDiffuseWeight;
vec3 dirHalfVector = normalize( dirVector + viewPosition );
float dirSpecularWeight = specularStrength * max( pow( max( dot( normal, dirHalfVector ), 0.0 ), shininess ), 0.0 );
totalSpecular += specular * directionalLightColor[ i ] * dirSpecularWeight * dirDiffuseWeight;
}
#endif
#if MAX_POINT_LIGHTS > 0
for ( int i = 0; i < MAX_POINT_LIGHTS; i ++ ) {
vec4 lPosition = viewMatrix * vec4( pointLightPosition[ i ], 1.0 );
vec3 lVector = lPosition.xyz + vViewPosition.xyz;
float lDistance = 1.0;
if ( pointLightDistance[ i ] > 0.0 )
lDistance = 1.0 - min( ( length( lVector ) / pointLightDistance[ i ] ), 1.0 );
lVector = normalize( lVector );
float dotProduct = dot( normal, lVector );
vec3 pointDiffuseWeight = vec3( max( dotProduct, 0.0 ) );
totalDiffuse += diffuse * pointLightColor[ i ] * pointDiffuseWeight * lDistance;
vec3 pointHalfVector = normalize( lVector + viewPosition );
float pointSpecularWeight = specularStrength * max( pow( max( dot( normal, pointHalfVector ), 0.0 ), shininess ), 0.0 );
totalSpecular += specular * pointLightColor[ i ] * pointSpecularWeight * pointDiffuseWeight * lDistance;
}
#endif
#if MAX_SPOT_LIGHTS > 0
for ( int i = 0; i < MAX_SPOT_LIGHTS; i ++ ) {
vec4 lPosition = viewMatrix * vec4( spotLightPosition[ i ], 1.0 );
vec3 lVector = lPosition.xyz + vViewPosition.xyz;
float spotEffect = dot( spotLightDirection[ i ], normalize( spotLightPosition[ i ] - vWorldPosition ) );
if ( spotEffect > spotLightAngleCos[ i ] ) {
spotEffect = max( pow( spotEffect, spotLightExponent[ i ] ), 0.0 );
float lDistance = 1.0;
if ( spotLightDistance[ i ] > 0.0 )
lDistance = 1.0 - min( ( length( lVector ) / spotLightDistance[ i ] ), 1.0 );
lVector = normalize( lVector );
float dotProduct = dot( normal, lVector );
vec3 spotDiffuseWeight = vec3( max( dotProduct, 0.0 ) );
totalDiffuse += diffuse * spotLightColor[ i ] * spotDiffuseWeight * lDistance * spotEffect;
vec3 spotHalfVector = normalize( lVector + viewPosition );
float spotSpecularWeight = specularStrength * max( pow( max( dot( normal, spotHalfVector ), 0.0 ), shininess ), 0.0 );
totalSpecular += specular * spotLightColor[ i ] * spotSpecularWeight * spotDiffuseWeight * lDistance * spotEffect;
}
}
#endif
#if MAX_HEMI_LIGHTS > 0
for ( int i = 0; i < MAX_HEMI_LIGHTS; i ++ ) {
vec4 lDirection = viewMatrix * vec4( hemisphereLightPosition[ i ], 0.0 );
vec3 lVector = normalize( lDirection.xyz );
float dotProduct = dot( normal, lVector );
float hemiDiffuseWeight = 0.5 * dotProduct + 0.5;
totalDiffuse += diffuse * mix( hemisphereLightGroundColor[ i ], hemisphereLightSkyColor[ i ], hemiDiffuseWeight );
}
#endif
#ifdef METAL
gl_FragColor.xyz = gl_FragColor.xyz * ( emissive + totalDiffuse + ambientLightColor * ambient + totalSpecular );
#else
gl_FragColor.xyz = gl_FragColor.xyz * ( emissive + totalDiffuse + ambientLightColor * ambient ) + totalSpecular;
#endif
";

    /// Default vertex epilogue without morphs or skinning handled
    /// elsewhere.
    pub const DEFAULT_VERTEX: &str =
        "gl_Position = projectionMatrix * modelViewMatrix * vec4( position, 1.0 );\n";
}

/// A shader pair with its default uniform block.
#[derive(Debug, Clone)]
pub struct Shader {
    /// Default uniforms cloned into each material instance.
    pub uniforms: UniformMap,
    /// Vertex shader body.
    pub vertex: String,
    /// Fragment shader body.
    pub fragment: String,
}

/// Default uniform blocks shared between shaders.
pub mod uniforms_lib {
    use super::*;

    /// Diffuse color, opacity, maps and UV transform.
    pub fn common() -> UniformMap {
        UniformMap::from([
            ("diffuse", UniformValue::Color(Color::WHITE)),
            ("opacity", UniformValue::Float(1.0)),
            ("map", UniformValue::Texture(None)),
            ("offsetRepeat", UniformValue::Vec4(crate::math::Vector4::new(0.0, 0.0, 1.0, 1.0))),
            ("lightMap", UniformValue::Texture(None)),
            ("specularMap", UniformValue::Texture(None)),
            ("envMap", UniformValue::Texture(None)),
            ("flipEnvMap", UniformValue::Float(-1.0)),
            ("useRefract", UniformValue::Int(0)),
            ("reflectivity", UniformValue::Float(1.0)),
            ("refractionRatio", UniformValue::Float(0.98)),
        ])
    }

    /// Fog parameters.
    pub fn fog() -> UniformMap {
        UniformMap::from([
            ("fogDensity", UniformValue::Float(0.000_25)),
            ("fogNear", UniformValue::Float(1.0)),
            ("fogFar", UniformValue::Float(2000.0)),
            ("fogColor", UniformValue::Color(Color::BLACK)),
        ])
    }

    /// Aggregated light arrays. Array sizes grow with the scene.
    pub fn lights() -> UniformMap {
        UniformMap::from([
            ("ambientLightColor", UniformValue::Vec3Array(Vec::new())),
            ("directionalLightColor", UniformValue::Vec3Array(Vec::new())),
            ("directionalLightDirection", UniformValue::Vec3Array(Vec::new())),
            ("pointLightColor", UniformValue::Vec3Array(Vec::new())),
            ("pointLightPosition", UniformValue::Vec3Array(Vec::new())),
            ("pointLightDistance", UniformValue::FloatArray(Vec::new())),
            ("spotLightColor", UniformValue::Vec3Array(Vec::new())),
            ("spotLightPosition", UniformValue::Vec3Array(Vec::new())),
            ("spotLightDirection", UniformValue::Vec3Array(Vec::new())),
            ("spotLightDistance", UniformValue::FloatArray(Vec::new())),
            ("spotLightAngleCos", UniformValue::FloatArray(Vec::new())),
            ("spotLightExponent", UniformValue::FloatArray(Vec::new())),
            ("hemisphereLightSkyColor", UniformValue::Vec3Array(Vec::new())),
            ("hemisphereLightGroundColor", UniformValue::Vec3Array(Vec::new())),
            ("hemisphereLightPosition", UniformValue::Vec3Array(Vec::new())),
        ])
    }

    /// Particle point size and color.
    pub fn particle() -> UniformMap {
        UniformMap::from([
            ("psColor", UniformValue::Color(Color::WHITE)),
            ("opacity", UniformValue::Float(1.0)),
            ("size", UniformValue::Float(1.0)),
            ("scale", UniformValue::Float(1.0)),
            ("map", UniformValue::Texture(None)),
        ])
    }
}

/// Built-in shader library.
pub struct ShaderLib;

impl ShaderLib {
    /// Resolve a built-in shader by its id.
    pub fn by_id(id: &str) -> Option<Shader> {
        match id {
            "basic" => Some(Self::basic()),
            "lambert" => Some(Self::lambert()),
            "phong" => Some(Self::phong()),
            "depth" => Some(Self::depth()),
            "normal" => Some(Self::normal()),
            "line_basic" => Some(Self::basic()),
            "line_dashed" => Some(Self::dashed()),
            "particle_basic" => Some(Self::particle_basic()),
            _ => None,
        }
    }

    /// Unlit color/texture shader (also used for basic lines).
    pub fn basic() -> Shader {
        let mut uniforms = uniforms_lib::common();
        uniforms.merge(&uniforms_lib::fog());

        let vertex = [
            chunks::MAP_PARS_VERTEX,
            chunks::LIGHTMAP_PARS_VERTEX,
            chunks::ENVMAP_PARS_VERTEX,
            chunks::COLOR_PARS_VERTEX,
            chunks::MORPHTARGET_PARS_VERTEX,
            chunks::SKINNING_PARS_VERTEX,
            "void main() {\n",
            chunks::MAP_VERTEX,
            chunks::LIGHTMAP_VERTEX,
            chunks::COLOR_VERTEX,
            chunks::ENVMAP_VERTEX,
            chunks::MORPHTARGET_VERTEX,
            chunks::SKINNING_VERTEX,
            "}\n",
        ]
        .concat();

        let fragment = [
            "uniform vec3 diffuse;\nuniform float opacity;\n",
            chunks::COLOR_PARS_FRAGMENT,
            chunks::MAP_PARS_FRAGMENT,
            chunks::LIGHTMAP_PARS_FRAGMENT,
            chunks::ENVMAP_PARS_FRAGMENT,
            chunks::SPECULARMAP_PARS_FRAGMENT,
            chunks::FOG_PARS_FRAGMENT,
            "void main() {\ngl_FragColor = vec4( diffuse, opacity );\n",
            chunks::MAP_FRAGMENT,
            chunks::ALPHATEST_FRAGMENT,
            chunks::SPECULARMAP_FRAGMENT,
            chunks::LIGHTMAP_FRAGMENT,
            chunks::COLOR_FRAGMENT,
            chunks::ENVMAP_FRAGMENT,
            chunks::LINEAR_TO_GAMMA_FRAGMENT,
            chunks::FOG_FRAGMENT,
            "}\n",
        ]
        .concat();

        Shader { uniforms, vertex, fragment }
    }

    /// Per-vertex lambert shader.
    pub fn lambert() -> Shader {
        let mut uniforms = uniforms_lib::common();
        uniforms.merge(&uniforms_lib::fog());
        uniforms.merge(&uniforms_lib::lights());
        uniforms.set("ambient", UniformValue::Color(Color::WHITE));
        uniforms.set("emissive", UniformValue::Color(Color::BLACK));
        uniforms.set("wrapRGB", UniformValue::Vec3(Vector3::ONE));

        let vertex = [
            chunks::MAP_PARS_VERTEX,
            chunks::LIGHTMAP_PARS_VERTEX,
            chunks::ENVMAP_PARS_VERTEX,
            chunks::COLOR_PARS_VERTEX,
            chunks::LIGHTS_LAMBERT_PARS_VERTEX,
            chunks::MORPHTARGET_PARS_VERTEX,
            chunks::SKINNING_PARS_VERTEX,
            "void main() {\n",
            chunks::MAP_VERTEX,
            chunks::LIGHTMAP_VERTEX,
            chunks::COLOR_VERTEX,
            chunks::MORPHNORMAL_VERTEX,
            chunks::ENVMAP_VERTEX,
            chunks::MORPHTARGET_VERTEX,
            chunks::SKINNING_VERTEX,
            chunks::LIGHTS_LAMBERT_VERTEX,
            "}\n",
        ]
        .concat();

        let fragment = [
            "uniform float opacity;\nvarying vec3 vLightFront;\n",
            chunks::COLOR_PARS_FRAGMENT,
            chunks::MAP_PARS_FRAGMENT,
            chunks::LIGHTMAP_PARS_FRAGMENT,
            chunks::ENVMAP_PARS_FRAGMENT,
            chunks::SPECULARMAP_PARS_FRAGMENT,
            chunks::FOG_PARS_FRAGMENT,
            "void main() {\ngl_FragColor = vec4( vec3( 1.0 ), opacity );\n",
            chunks::MAP_FRAGMENT,
            chunks::ALPHATEST_FRAGMENT,
            chunks::SPECULARMAP_FRAGMENT,
            "gl_FragColor.xyz = gl_FragColor.xyz * vLightFront;\n",
            chunks::LIGHTMAP_FRAGMENT,
            chunks::COLOR_FRAGMENT,
            chunks::ENVMAP_FRAGMENT,
            chunks::LINEAR_TO_GAMMA_FRAGMENT,
            chunks::FOG_FRAGMENT,
            "}\n",
        ]
        .concat();

        Shader { uniforms, vertex, fragment }
    }

    /// Per-fragment phong shader.
    pub fn phong() -> Shader {
        let mut uniforms = uniforms_lib::common();
        uniforms.merge(&uniforms_lib::fog());
        uniforms.merge(&uniforms_lib::lights());
        uniforms.set("ambient", UniformValue::Color(Color::WHITE));
        uniforms.set("emissive", UniformValue::Color(Color::BLACK));
        uniforms.set("specular", UniformValue::Color(Color::new(0.07, 0.07, 0.07)));
        uniforms.set("shininess", UniformValue::Float(30.0));
        uniforms.set("wrapRGB", UniformValue::Vec3(Vector3::ONE));

        let vertex = [
            "varying vec3 vViewPosition;\nvarying vec3 vNormal;\nvarying vec3 vWorldPosition;\n",
            chunks::MAP_PARS_VERTEX,
            chunks::LIGHTMAP_PARS_VERTEX,
            chunks::ENVMAP_PARS_VERTEX,
            chunks::COLOR_PARS_VERTEX,
            chunks::MORPHTARGET_PARS_VERTEX,
            chunks::SKINNING_PARS_VERTEX,
            "void main() {\n",
            chunks::MAP_VERTEX,
            chunks::LIGHTMAP_VERTEX,
            chunks::COLOR_VERTEX,
            chunks::MORPHNORMAL_VERTEX,
            "vNormal = normalize( transformedNormal );\n",
            chunks::ENVMAP_VERTEX,
            chunks::MORPHTARGET_VERTEX,
            chunks::SKINNING_VERTEX,
            "vec4 mvPosition = modelViewMatrix * vec4( position, 1.0 );\n",
            "vViewPosition = -mvPosition.xyz;\n",
            "vWorldPosition = ( modelMatrix * vec4( position, 1.0 ) ).xyz;\n",
            "}\n",
        ]
        .concat();

        let fragment = [
            "uniform vec3 diffuse;\nuniform float opacity;\n",
            "uniform vec3 ambient;\nuniform vec3 emissive;\nuniform vec3 specular;\nuniform float shininess;\n",
            "varying vec3 vWorldPosition;\n",
            chunks::COLOR_PARS_FRAGMENT,
            chunks::MAP_PARS_FRAGMENT,
            chunks::LIGHTMAP_PARS_FRAGMENT,
            chunks::ENVMAP_PARS_FRAGMENT,
            chunks::SPECULARMAP_PARS_FRAGMENT,
            chunks::LIGHTS_PHONG_PARS_FRAGMENT,
            chunks::FOG_PARS_FRAGMENT,
            "void main() {\ngl_FragColor = vec4( vec3( 1.0 ), opacity );\n",
            chunks::MAP_FRAGMENT,
            chunks::ALPHATEST_FRAGMENT,
            chunks::SPECULARMAP_FRAGMENT,
            chunks::LIGHTS_PHONG_FRAGMENT,
            chunks::LIGHTMAP_FRAGMENT,
            chunks::COLOR_FRAGMENT,
            chunks::ENVMAP_FRAGMENT,
            chunks::LINEAR_TO_GAMMA_FRAGMENT,
            chunks::FOG_FRAGMENT,
            "}\n",
        ]
        .concat();

        Shader { uniforms, vertex, fragment }
    }

    /// Eye-space depth visualization.
    pub fn depth() -> Shader {
        let uniforms = UniformMap::from([
            ("mNear", UniformValue::Float(1.0)),
            ("mFar", UniformValue::Float(2000.0)),
            ("opacity", UniformValue::Float(1.0)),
        ]);

        let vertex = [
            chunks::MORPHTARGET_PARS_VERTEX,
            "void main() {\n",
            chunks::MORPHTARGET_VERTEX,
            "}\n",
        ]
        .concat();

        let fragment = "\
uniform float mNear;
uniform float mFar;
uniform float opacity;
void main() {
float depth = gl_FragCoord.z / gl_FragCoord.w;
float color = 1.0 - smoothstep( mNear, mFar, depth );
gl_FragColor = vec4( vec3( color ), opacity );
}
"
        .to_string();

        Shader { uniforms, vertex, fragment }
    }

    /// Normal visualization.
    pub fn normal() -> Shader {
        let uniforms = UniformMap::from([("opacity", UniformValue::Float(1.0))]);

        let vertex = [
            "varying vec3 vNormal;\n",
            chunks::MORPHTARGET_PARS_VERTEX,
            "void main() {\nvNormal = normalMatrix * normal;\n",
            chunks::MORPHTARGET_VERTEX,
            "}\n",
        ]
        .concat();

        let fragment = "\
uniform float opacity;
varying vec3 vNormal;
void main() {
gl_FragColor = vec4( 0.5 * normalize( vNormal ) + 0.5, opacity );
}
"
        .to_string();

        Shader { uniforms, vertex, fragment }
    }

    /// Dashed line shader.
    pub fn dashed() -> Shader {
        let mut uniforms = uniforms_lib::common();
        uniforms.merge(&uniforms_lib::fog());
        uniforms.set("scale", UniformValue::Float(1.0));
        uniforms.set("dashSize", UniformValue::Float(3.0));
        uniforms.set("totalSize", UniformValue::Float(4.0));

        let vertex = [
            "uniform float scale;\nattribute float lineDistance;\nvarying float vLineDistance;\n",
            chunks::COLOR_PARS_VERTEX,
            "void main() {\n",
            chunks::COLOR_VERTEX,
            "vLineDistance = scale * lineDistance;\n",
            chunks::DEFAULT_VERTEX,
            "}\n",
        ]
        .concat();

        let fragment = [
            "uniform vec3 diffuse;\nuniform float opacity;\n",
            "uniform float dashSize;\nuniform float totalSize;\nvarying float vLineDistance;\n",
            chunks::COLOR_PARS_FRAGMENT,
            chunks::FOG_PARS_FRAGMENT,
            "void main() {\n",
            "if ( mod( vLineDistance, totalSize ) > dashSize ) discard;\n",
            "gl_FragColor = vec4( diffuse, opacity );\n",
            chunks::COLOR_FRAGMENT,
            chunks::FOG_FRAGMENT,
            "}\n",
        ]
        .concat();

        Shader { uniforms, vertex, fragment }
    }

    /// Point-sprite particle shader.
    pub fn particle_basic() -> Shader {
        let mut uniforms = uniforms_lib::particle();
        uniforms.merge(&uniforms_lib::fog());

        let vertex = [
            "uniform float size;\nuniform float scale;\n",
            chunks::COLOR_PARS_VERTEX,
            "void main() {\n",
            chunks::COLOR_VERTEX,
            "vec4 mvPosition = modelViewMatrix * vec4( position, 1.0 );\n",
            "#ifdef USE_SIZEATTENUATION\n",
            "gl_PointSize = size * ( scale / length( mvPosition.xyz ) );\n",
            "#else\n",
            "gl_PointSize = size;\n",
            "#endif\n",
            "gl_Position = projectionMatrix * mvPosition;\n",
            "}\n",
        ]
        .concat();

        let fragment = [
            "uniform vec3 psColor;\nuniform float opacity;\n",
            chunks::COLOR_PARS_FRAGMENT,
            chunks::MAP_PARS_FRAGMENT,
            chunks::FOG_PARS_FRAGMENT,
            "void main() {\ngl_FragColor = vec4( psColor, opacity );\n",
            "#ifdef USE_MAP\ngl_FragColor = gl_FragColor * texture2D( map, gl_PointCoord );\n#endif\n",
            chunks::ALPHATEST_FRAGMENT,
            chunks::COLOR_FRAGMENT,
            chunks::FOG_FRAGMENT,
            "}\n",
        ]
        .concat();

        Shader { uniforms, vertex, fragment }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_builtin_ids_resolve() {
        for id in [
            "basic",
            "lambert",
            "phong",
            "depth",
            "normal",
            "line_basic",
            "line_dashed",
            "particle_basic",
        ] {
            assert!(ShaderLib::by_id(id).is_some(), "missing shader {id}");
        }
        assert!(ShaderLib::by_id("bogus").is_none());
    }

    #[test]
    fn test_shader_bodies_have_main() {
        let shader = ShaderLib::phong();
        assert!(shader.vertex.contains("void main()"));
        assert!(shader.fragment.contains("void main()"));
    }

    #[test]
    fn test_lambert_declares_light_arrays() {
        let shader = ShaderLib::lambert();
        assert!(shader.vertex.contains("directionalLightColor"));
        assert!(shader.uniforms.get("ambientLightColor").is_some());
    }
}
