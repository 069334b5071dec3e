//! # Application Module
//!
//! This module drives an [`Engine`] from a `winit` event loop, rendering through the wgpu [`Renderer`].
//!
//! ## Overview
//!
//! [`App`] implements `winit`'s `ApplicationHandler`:
//!
//! - **`resumed`**: creates the window, the renderer and the engine, loads the configured scene (or the
//!   built-in triangle) and installs the configured spin handlers.
//! - **`window_event`**: forwards resizes to the engine, exits on `Escape` or close, and on every redraw
//!   runs one frame: `update` with the time elapsed since the previous frame, then `render`, then
//!   `present`.
//!
//! A frame that fails to render is logged and ends the event loop.
//!
//! ## Native and WebAssembly
//!
//! Natively the window gets the configured size and the engine is built on the spot with `pollster`.
//! In the browser the window wraps the page's `<canvas id="canvas">`, the engine is built in a
//! `spawn_local` task and handed back through a oneshot channel that `window_event` polls. Assets are
//! read with [`FileFetcher`](crate::FileFetcher) natively and requested with
//! [`HttpFetcher`](crate::HttpFetcher) in the browser, where the canvas' `data-asset` attribute names the
//! asset to show.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use lumen_core::{App, EngineConfig};
//!
//! let event_loop = winit::event_loop::EventLoop::builder().build().unwrap();
//! let mut app = App::new(EngineConfig::default());
//! event_loop.run_app(&mut app).unwrap();
//! ```

use std::sync::Arc;

use log::{error, info};
use web_time::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::ActiveEventLoop,
    window::{Window, WindowId},
};

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::error::EngineError;
#[cfg(not(target_arch = "wasm32"))]
use crate::fetch::FileFetcher as AssetFetcher;
#[cfg(target_arch = "wasm32")]
use crate::fetch::HttpFetcher as AssetFetcher;
use crate::node::Node;
use crate::renderer::Renderer;
use crate::scene::Scene;
use crate::surface::Surface;
use crate::triangle::Triangle;
use crate::vertex::Vertex;

/// Name of the node holding the built-in triangle, for use in spin configuration.
pub const DEMO_NODE: &str = "triangle";

/// Id of the canvas element the browser build renders into.
#[cfg(target_arch = "wasm32")]
pub const CANVAS_ID: &str = "canvas";

/// The scene shown when no asset is configured: one colored triangle in clip space.
pub fn demo_scene(surface: &mut impl Surface) -> Result<Scene, EngineError> {
    let triangle = Triangle::builder("demo")
        .vertex(Vertex::builder().position(0.0, 0.5, 0.0).color(1.0, 0.0, 0.0, 1.0))
        .vertex(Vertex::builder().position(-0.5, -0.5, 0.0).color(0.0, 1.0, 0.0, 1.0))
        .vertex(Vertex::builder().position(0.5, -0.5, 0.0).color(0.0, 0.0, 1.0, 1.0))
        .build(surface)?;

    Ok(Scene::new("demo").with_node(Node::new(DEMO_NODE).with_child(triangle)))
}

/// Loads the configured asset into `engine`, or the demo scene, then applies the scene overrides.
pub async fn load_configured_scene<S: Surface>(
    engine: &mut Engine<S>,
    config: &EngineConfig,
) -> Result<(), EngineError> {
    match &config.scene.asset {
        Some(asset) => engine.load_async(asset, &AssetFetcher::default()).await?,
        None => {
            info!("No asset configured, showing the demo triangle");
            let scene = demo_scene(engine.surface_mut())?;
            engine.set_scene(scene);
        }
    }

    if let Some(scene) = engine.scene_mut() {
        config.apply(scene);
    }
    Ok(())
}

/// Builds the renderer and the engine for `window` and loads the configured scene into it.
async fn create_engine(
    window: Arc<Window>,
    width: u32,
    height: u32,
    config: &EngineConfig,
) -> Result<Engine<Renderer>, EngineError> {
    let renderer = Renderer::new(window, width, height).await?;
    let mut engine = Engine::new(renderer);
    load_configured_scene(&mut engine, config).await?;
    engine.resize(width, height);
    Ok(engine)
}

/// The `winit` application.
///
/// # Fields
/// - `config`: Window, asset and spin settings.
/// - `window`: The window, once `resumed` has created it.
/// - `engine`: The engine, once the renderer is ready and the scene is loaded.
/// - `engine_receiver`: _(WebAssembly only)_ Yields the engine built by the `spawn_local` task.
/// - `last_render_time`: When the previous frame was rendered.
pub struct App {
    config: EngineConfig,
    window: Option<Arc<Window>>,
    engine: Option<Engine<Renderer>>,
    #[cfg(target_arch = "wasm32")]
    engine_receiver: Option<futures::channel::oneshot::Receiver<Engine<Renderer>>>,
    last_render_time: Option<Instant>,
}

impl App {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            window: None,
            engine: None,
            #[cfg(target_arch = "wasm32")]
            engine_receiver: None,
            last_render_time: None,
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn start(&mut self, window: Arc<Window>, width: u32, height: u32) -> Result<(), EngineError> {
        let engine = pollster::block_on(create_engine(window.clone(), width, height, &self.config))?;

        self.engine = Some(engine);
        self.window = Some(window);
        self.last_render_time = Some(Instant::now());
        Ok(())
    }

    #[cfg(target_arch = "wasm32")]
    fn start(&mut self, window: Arc<Window>, width: u32, height: u32) -> Result<(), EngineError> {
        let (sender, receiver) = futures::channel::oneshot::channel();
        self.engine_receiver = Some(receiver);
        self.window = Some(window.clone());

        info!("Canvas dimensions: ({width} x {height})");
        let config = self.config.clone();
        wasm_bindgen_futures::spawn_local(async move {
            match create_engine(window.clone(), width, height, &config).await {
                Ok(engine) => {
                    if sender.send(engine).is_err() {
                        error!("Event loop went away before the engine was ready");
                    }
                    window.request_redraw();
                }
                Err(e) => error!("Failed to start: {e}"),
            }
        });
        Ok(())
    }

    #[cfg(target_arch = "wasm32")]
    fn receive_engine(&mut self) {
        let mut received = false;
        if let Some(receiver) = self.engine_receiver.as_mut() {
            if let Ok(Some(engine)) = receiver.try_recv() {
                self.engine = Some(engine);
                self.last_render_time = Some(Instant::now());
                received = true;
            }
        }
        if received {
            self.engine_receiver = None;
        }
    }
}

/// The page's canvas element, if it has one.
#[cfg(target_arch = "wasm32")]
fn canvas() -> Option<web_sys::HtmlCanvasElement> {
    use wasm_bindgen::JsCast;

    web_sys::window()?
        .document()?
        .get_element_by_id(CANVAS_ID)?
        .dyn_into::<web_sys::HtmlCanvasElement>()
        .ok()
}

/// Browser entry point: routes panics and logs to the console, then runs an [`App`] on the page's canvas.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() -> Result<(), wasm_bindgen::JsValue> {
    use winit::platform::web::EventLoopExtWebSys;

    std::panic::set_hook(Box::new(console_error_panic_hook::hook));
    console_log::init_with_level(log::Level::Info)
        .map_err(|e| wasm_bindgen::JsValue::from_str(&e.to_string()))?;

    let mut config = EngineConfig::default();
    config.scene.asset = canvas().and_then(|canvas| canvas.get_attribute("data-asset"));

    let event_loop = winit::event_loop::EventLoop::builder()
        .build()
        .map_err(|e| wasm_bindgen::JsValue::from_str(&e.to_string()))?;
    event_loop.spawn_app(App::new(config));
    Ok(())
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let mut attributes = Window::default_attributes().with_title(self.config.window.title.clone());

        #[cfg(not(target_arch = "wasm32"))]
        {
            attributes = attributes
                .with_inner_size(PhysicalSize::new(self.config.window.width, self.config.window.height));
        }

        #[cfg(target_arch = "wasm32")]
        let canvas_size = {
            use winit::platform::web::WindowAttributesExtWebSys;

            let Some(canvas) = canvas() else {
                error!("No <canvas id=\"{CANVAS_ID}\"> element on the page");
                event_loop.exit();
                return;
            };
            let size = (canvas.width(), canvas.height());
            attributes = attributes.with_canvas(Some(canvas));
            size
        };

        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        let (width, height) = {
            let PhysicalSize { width, height } = window.inner_size();
            (width, height)
        };
        #[cfg(target_arch = "wasm32")]
        let (width, height) = canvas_size;

        if let Err(e) = self.start(window, width, height) {
            error!("Failed to start: {e}");
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        #[cfg(target_arch = "wasm32")]
        self.receive_engine();

        let (Some(engine), Some(window), Some(last_render_time)) = (
            self.engine.as_mut(),
            self.window.as_ref(),
            self.last_render_time.as_mut(),
        ) else {
            return;
        };

        match event {
            WindowEvent::KeyboardInput {
                event:
                    winit::event::KeyEvent {
                        physical_key: winit::keyboard::PhysicalKey::Code(winit::keyboard::KeyCode::Escape),
                        ..
                    },
                ..
            }
            | WindowEvent::CloseRequested => {
                info!("Close requested. Exiting...");
                event_loop.exit();
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                engine.resize(width, height);
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let delta_time = now - *last_render_time;
                *last_render_time = now;

                engine.update(delta_time);
                let frame = engine
                    .render()
                    .and_then(|()| Ok(engine.surface_mut().present()?));
                if let Err(e) = frame {
                    error!("Frame failed: {e}");
                    event_loop.exit();
                    return;
                }
            }
            _ => (),
        }

        window.request_redraw();
    }
}
