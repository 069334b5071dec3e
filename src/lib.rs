//! # Lumen Scene Engine
//!
//! A small real-time 3D engine: it imports a scene from an interchange document, builds a scene graph of
//! transformed, renderable objects, and updates and draws that graph every frame.
//!
//! ## Modules
//!
//! - [`math`]: `Vec4` and `Mat4`, the homogeneous transform kernel everything else builds on.
//! - `surface`: The capability set the engine needs from a graphics API ([`Surface`]).
//! - `context`: The [`RenderContext`] shared between the prepare and render passes.
//! - `buffer`, `material`, `primitive`, `camera`, `light`, `vertex`, `triangle`: Resource handles and the
//!   leaves a scene graph node can carry.
//! - `node`, `scene`: The scene graph and its two-pass traversal.
//! - `document`, `fetch`, `import`: The asset importer.
//! - `engine`: The [`Engine`] a driver loop talks to.
//! - `headless`: A [`Surface`] that records calls instead of drawing.
//! - `gpu`, `renderer`, `pipeline`, `uniform_buffer`, `uniform_binding`: The wgpu [`Surface`].
//! - `config`, `app`: TOML configuration and the `winit` driver loop.
//!
//! ## Frame Protocol
//!
//! 1. **Update**: `Scene::update(delta)` runs every node's update handler, parents before children.
//! 2. **Prepare**: every node composes `parent_world.times(local)`; cameras publish the view-projection
//!    transform, lights publish their slot of the light array, drawables are queued.
//! 3. **Render**: the queued drawables are drawn. No draw is issued before every camera and light has
//!    been prepared.
//!
//! ## Example
//!
//! ```rust
//! use lumen_core::{Engine, HeadlessSurface, Node, Scene, Triangle, Vertex};
//!
//! let mut engine = Engine::new(HeadlessSurface::new());
//! let triangle = Triangle::builder("tri")
//!     .vertex(Vertex::builder().position(0.0, 0.5, 0.0).color(1.0, 0.0, 0.0, 1.0))
//!     .vertex(Vertex::builder().position(-0.5, -0.5, 0.0).color(0.0, 1.0, 0.0, 1.0))
//!     .vertex(Vertex::builder().position(0.5, -0.5, 0.0).color(0.0, 0.0, 1.0, 1.0))
//!     .build(engine.surface_mut())
//!     .unwrap();
//! engine.set_scene(Scene::new("demo").with_node(Node::new("root").with_child(triangle)));
//!
//! engine.render().unwrap();
//! assert_eq!(engine.surface().draw_calls().count(), 1);
//! ```
//!
//! ## Dependencies
//!
//! - `nalgebra-glm`: Matrix storage behind `Mat4`.
//! - `wgpu` and `winit`: The windowed renderer.
//! - `serde`, `serde_json`, `toml`, `base64`: Documents, data URIs and configuration.
//! - `log` and `env_logger`: Logging (`console_log` in the browser).
//! - `clap`: The native command line.
//! - `wasm-bindgen`, `wasm-bindgen-futures`, `web-sys`: The browser entry point, canvas and `fetch`.
//! - `thiserror`: Error types.

pub mod math;

mod app;
mod buffer;
mod camera;
mod config;
mod context;
mod document;
mod engine;
mod error;
mod fetch;
mod gpu;
mod headless;
mod import;
mod light;
mod material;
mod node;
mod pipeline;
mod primitive;
mod renderer;
mod scene;
mod surface;
mod triangle;
mod uniform_binding;
mod uniform_buffer;
mod vertex;

pub use web_time::Duration;

pub use crate::app::{demo_scene, load_configured_scene, App, DEMO_NODE};
#[cfg(target_arch = "wasm32")]
pub use crate::app::{start, CANVAS_ID};
pub use crate::buffer::{Attribute, Buffer};
pub use crate::camera::Camera;
pub use crate::config::{Axis, ConfigError, EngineConfig, SceneConfig, SpinConfig, WindowConfig, DEFAULT_CONFIG_PATH};
pub use crate::context::{LightLocations, Locations, RenderContext};
pub use crate::document::Document;
pub use crate::engine::Engine;
pub use crate::error::{EngineError, ImportError, SurfaceError};
pub use crate::fetch::{decode_data_uri, resolve_uri, Fetch, MemoryFetcher};
#[cfg(not(target_arch = "wasm32"))]
pub use crate::fetch::FileFetcher;
#[cfg(target_arch = "wasm32")]
pub use crate::fetch::HttpFetcher;
pub use crate::gpu::Gpu;
pub use crate::headless::{HeadlessSurface, SurfaceCall};
pub use crate::import::{fetch_buffers, import, load_async, Imported};
pub use crate::light::{Light, LightKind};
pub use crate::material::Material;
pub use crate::math::{deg, Mat4, Vec4};
pub use crate::node::{Child, Node, Selected, SelectedMut, UpdateHandler};
pub use crate::primitive::{DrawItem, Drawable, IndexRange, Mesh, Primitive};
pub use crate::renderer::Renderer;
pub use crate::scene::Scene;
pub use crate::surface::{
    components_for_type, AttributeLayout, AttributeName, BufferHandle, BufferTarget, ComponentType, DrawMode,
    LightField, Location, Surface, UniformName, MAX_LIGHTS,
};
pub use crate::triangle::{Triangle, TriangleBuilder};
pub use crate::uniform_binding::UniformBinding;
pub use crate::uniform_buffer::{LightUniform, UniformBuffer};
pub use crate::vertex::{Vertex, VertexBuilder};

/// The scene shader, written in WGSL.
///
/// ### Uniform
///
/// One `Uniforms` block per draw (see [`UniformBuffer`]) at group 0, binding 0, selected with a dynamic
/// offset.
///
/// ### Vertex Stage
///
/// `vertex_main` reads `@location(0) position`, `@location(1) normal` and `@location(2) color`, matching
/// [`AttributeName::slot`]. Positions are transformed by `vp * model`, normals by the normal transform.
///
/// ### Fragment Stage
///
/// `fragment_main` multiplies the material color by the vertex color. Fragments with a zero normal are
/// returned as is; the others are lit by the ambient color plus a Lambert term per active light.
pub const SHADER_SOURCE: &str = include_str!("shader_source.wgsl");
