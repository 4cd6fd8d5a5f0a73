//! # Limn
//!
//! A retained-mode scene graph with a GL-ES-2-class forward renderer.
//! The scene graph owns all CPU-side representation (transforms,
//! geometry, materials, lights); the renderer walks it each frame,
//! culls, sorts, keeps GPU buffers and programs in sync and issues draw
//! calls through the [`renderer::gl::GlDevice`] boundary a host
//! implements.
//!
//! ## Example
//!
//! ```
//! use limn::prelude::*;
//!
//! let scene = Scene::new();
//!
//! let geometry = box_geometry(1.0, 1.0, 1.0).into_ref();
//! let material = Material::basic(Color::from_hex(0xff0000)).into_ref();
//! let mesh = Object3D::with_kind(ObjectKind::Mesh(Mesh::new(geometry, material))).into_ref();
//! scene.add(&mesh);
//!
//! let mut camera_node =
//!     Object3D::with_kind(ObjectKind::Camera(Camera::perspective(75.0, 1.0, 0.1, 100.0)));
//! camera_node.position = Vector3::new(0.0, 0.0, 3.0);
//! let camera = camera_node.into_ref();
//!
//! let mut renderer = Renderer::new(TraceDevice::new(), RendererOptions::default());
//! renderer.render(&scene, &camera, None, false).unwrap();
//! assert!(renderer.stats().calls > 0);
//! ```

#![warn(missing_docs)]

pub mod camera;
pub mod core;
pub mod geometry;
pub mod host;
pub mod light;
pub mod material;
pub mod math;
pub mod objects;
pub mod picker;
pub mod projector;
pub mod renderer;
pub mod scene;
pub mod texture;

// Re-export commonly used types
pub mod prelude {
    //! Convenient re-exports of commonly used types.

    pub use crate::camera::{Camera, Projection};
    pub use crate::core::{Id, Precision, RendererOptions};
    pub use crate::geometry::{
        box_geometry, BufferAttribute, BufferGeometry, DrawOffset, Face3, Geometry,
        GeometryGroup, MorphTarget,
    };
    pub use crate::host::{KeyboardEvent, MouseEvent, WindowHost};
    pub use crate::light::{Light, LightKind};
    pub use crate::material::{Blending, Material, MaterialKind, Side, VertexColorMode};
    pub use crate::math::*;
    pub use crate::objects::{Line, LineType, Mesh, Particle, ParticleSystem, Sprite};
    pub use crate::picker::{Intersection, Raycaster};
    pub use crate::projector::{Projector, Renderable};
    pub use crate::renderer::{
        RenderPlugin, RenderStats, RenderTarget, Renderer, RendererError, TraceDevice,
    };
    pub use crate::scene::{Fog, Object3D, ObjectKind, ObjectRef, Scene};
    pub use crate::texture::{Image, Texture, TextureRef};
}

/// Engine version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const NAME: &str = "Limn";
