//! # Engine
//!
//! [`Engine`] is what a driver loop talks to. It owns a [`Surface`], the [`RenderContext`] resolved
//! against it, and the current [`Scene`]. Each frame the driver calls [`Engine::update`] and then
//! [`Engine::render`].
//!
//! The engine also remembers the last viewport size passed to [`Engine::resize`], so cameras that take
//! their aspect ratio from the viewport are refitted both on resize and when a new scene is installed.
//!
//! ```
//! use lumen_core::{Engine, EngineError, HeadlessSurface};
//!
//! let mut engine = Engine::new(HeadlessSurface::new());
//! assert!(matches!(engine.render(), Err(EngineError::NoScene)));
//! ```

use log::info;
use web_time::Duration;

use crate::context::{Locations, RenderContext};
use crate::document::Document;
use crate::error::EngineError;
use crate::fetch::Fetch;
use crate::import::{import, load_async, Imported};
use crate::node::{Selected, SelectedMut};
use crate::scene::Scene;
use crate::surface::Surface;

pub struct Engine<S: Surface> {
    surface: S,
    context: RenderContext,
    scene: Option<Scene>,
    viewport_aspect: Option<f32>,
}

impl<S: Surface> Engine<S> {
    /// Wraps `surface`, resolving its attribute and uniform locations once.
    pub fn new(surface: S) -> Self {
        let context = RenderContext::new(Locations::resolve(&surface));
        Self {
            surface,
            context,
            scene: None,
            viewport_aspect: None,
        }
    }

    /// Fetches and imports the document at `uri`, making its default scene current.
    pub async fn load_async(&mut self, uri: &str, fetcher: &impl Fetch) -> Result<(), EngineError> {
        let imported = load_async(uri, fetcher, &mut self.surface).await?;
        self.install(imported);
        Ok(())
    }

    /// Imports an already parsed document whose buffer payloads are at hand.
    pub fn load_document(&mut self, document: &Document, payloads: &[Vec<u8>]) -> Result<(), EngineError> {
        let imported = import(document, payloads, &mut self.surface)?;
        self.install(imported);
        Ok(())
    }

    fn install(&mut self, imported: Imported) {
        let count = imported.scenes.len();
        match imported.into_default_scene() {
            Some(scene) => {
                info!("Showing scene '{}' ({count} imported)", scene.name());
                self.set_scene(scene);
            }
            None => info!("Document declares no scenes"),
        }
    }

    /// Makes `scene` current, fitting its cameras to the last known viewport.
    pub fn set_scene(&mut self, mut scene: Scene) {
        if let Some(aspect) = self.viewport_aspect {
            scene.set_viewport_aspect(aspect);
        }
        self.scene = Some(scene);
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn scene_mut(&mut self) -> Option<&mut Scene> {
        self.scene.as_mut()
    }

    /// Advances the current scene. Does nothing when no scene is loaded.
    pub fn update(&mut self, delta: Duration) {
        if let Some(scene) = &mut self.scene {
            scene.update(delta);
        }
    }

    /// Prepares and draws the current scene.
    pub fn render(&mut self) -> Result<(), EngineError> {
        let scene = self.scene.as_ref().ok_or(EngineError::NoScene)?;
        scene.render(&mut self.context, &mut self.surface);
        Ok(())
    }

    pub fn select(&self, name: &str) -> Option<Selected<'_>> {
        self.scene.as_ref()?.select(name)
    }

    pub fn select_mut(&mut self, name: &str) -> Option<SelectedMut<'_>> {
        self.scene.as_mut()?.select_mut(name)
    }

    /// Forwards the new framebuffer size to the surface and refits the current scene's cameras. A zero
    /// dimension (a minimized window) leaves the aspect ratio unchanged.
    pub fn resize(&mut self, width: u32, height: u32) {
        info!("Resizing to {width}x{height}");
        self.surface.viewport(width, height);

        if width == 0 || height == 0 {
            return;
        }
        let aspect = width as f32 / height as f32;
        self.viewport_aspect = Some(aspect);
        if let Some(scene) = &mut self.scene {
            scene.set_viewport_aspect(aspect);
        }
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryFetcher;
    use crate::headless::{HeadlessSurface, SurfaceCall};
    use crate::math::Mat4;
    use crate::node::Node;

    const EMPTY_SCENES: &str = r#"{
        "nodes": [{ "name": "first" }, { "name": "second" }],
        "scenes": [{ "name": "a", "nodes": [0] }, { "name": "b", "nodes": [1] }],
        "scene": 1
    }"#;

    #[test]
    fn render_without_a_scene_fails() {
        let mut engine = Engine::new(HeadlessSurface::new());

        assert!(matches!(engine.render(), Err(EngineError::NoScene)));
        assert!(engine.surface().calls().is_empty());
    }

    #[test]
    fn load_document_installs_the_default_scene() {
        let mut engine = Engine::new(HeadlessSurface::new());
        let document = Document::from_slice(EMPTY_SCENES.as_bytes()).unwrap();

        engine.load_document(&document, &[]).unwrap();

        assert_eq!(engine.scene().map(Scene::name), Some("b"));
        assert!(engine.select("second").is_some());
        assert!(engine.select("first").is_none());
        assert!(engine.render().is_ok());
    }

    #[test]
    fn load_async_reports_fetch_errors() {
        let mut engine = Engine::new(HeadlessSurface::new());

        let result = pollster::block_on(engine.load_async("nowhere.gltf", &MemoryFetcher::new()));

        assert!(matches!(result, Err(EngineError::Import(_))));
        assert!(engine.scene().is_none());
    }

    #[test]
    fn update_then_render_uses_the_new_transform() {
        let mut engine = Engine::new(HeadlessSurface::new());
        engine.set_scene(Scene::new("s").with_node(Node::new("spinner")));
        engine
            .select_mut("spinner")
            .and_then(SelectedMut::into_node)
            .unwrap()
            .on_update(|node, delta| node.set_transform(Mat4::rotate_y(delta.as_millis() as f32)));

        engine.update(Duration::from_millis(45));
        engine.render().unwrap();

        let spinner = engine.select("spinner").and_then(Selected::as_node).unwrap();
        assert_eq!(*spinner.transform(), Mat4::rotate_y(45.0));
    }

    #[test]
    fn resize_sets_the_viewport() {
        let mut engine = Engine::new(HeadlessSurface::new());

        engine.resize(640, 480);

        assert_eq!(
            engine.surface().calls(),
            &[SurfaceCall::Viewport {
                width: 640,
                height: 480
            }]
        );
    }

    #[test]
    fn cameras_without_aspect_follow_the_viewport() {
        let json = r#"{
            "cameras": [{ "name": "eye", "type": "perspective", "perspective": { "yfov": 0.8, "znear": 0.1 } }],
            "nodes": [{ "camera": 0 }],
            "scenes": [{ "nodes": [0] }]
        }"#;
        let document = Document::from_slice(json.as_bytes()).unwrap();
        let mut engine = Engine::new(HeadlessSurface::new());
        let projection = |engine: &Engine<HeadlessSurface>| match engine.select("eye") {
            Some(Selected::Camera(camera)) => *camera.projection(),
            _ => panic!("camera missing"),
        };

        engine.resize(300, 100);
        engine.load_document(&document, &[]).unwrap();
        assert_eq!(projection(&engine), Mat4::perspective(3.0, 0.8, 0.1, None));

        engine.resize(100, 200);
        assert_eq!(projection(&engine), Mat4::perspective(0.5, 0.8, 0.1, None));

        engine.resize(0, 0);
        assert_eq!(projection(&engine), Mat4::perspective(0.5, 0.8, 0.1, None));
    }
}
