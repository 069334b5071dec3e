//! # Scene
//!
//! A [`Scene`] is a named list of root [`Node`]s plus the ambient light color. It is the unit the
//! [`Engine`](crate::Engine) renders each frame.
//!
//! ## Rendering
//!
//! [`Scene::render`] runs two passes over the graph:
//!
//! 1. **Prepare**: every root is prepared with no parent transform. Cameras write the view and
//!    view-projection transforms into the [`RenderContext`], lights publish their slot of the light array,
//!    and drawables are collected, together with their world transforms, into a draw queue.
//! 2. **Render**: the queue is drawn in traversal order.
//!
//! Because drawing only starts once the whole graph has been prepared, a camera or light placed after a
//! mesh in traversal order still affects that mesh in the same frame.
//!
//! ## Example Usage
//! ```rust
//! use lumen_core::{HeadlessSurface, Node, RenderContext, Locations, Scene, Vec4};
//!
//! let mut surface = HeadlessSurface::new();
//! let mut context = RenderContext::new(Locations::resolve(&surface));
//! let mut scene = Scene::new("empty").with_node(Node::new("root"));
//! scene.set_ambient_color(Vec4::rgba(0.1, 0.1, 0.1, 1.0));
//!
//! scene.render(&mut context, &mut surface);
//! assert_eq!(surface.draw_calls().count(), 0);
//! ```

use log::trace;
use web_time::Duration;

use crate::context::RenderContext;
use crate::math::Vec4;
use crate::node::{Node, Selected, SelectedMut};
use crate::surface::Surface;

/// The root of a scene graph.
///
/// # Fields
/// - `name`: Participates in `select` before any node.
/// - `ambient_color`: Published once per frame, before the prepare pass.
/// - `nodes`: Root nodes, prepared and drawn in order.
#[derive(Debug)]
pub struct Scene {
    name: String,
    ambient_color: Vec4,
    nodes: Vec<Node>,
}

impl Scene {
    /// Creates an empty scene with black ambient light.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ambient_color: Vec4::rgba(0.0, 0.0, 0.0, 1.0),
            nodes: Vec::new(),
        }
    }

    /// Appends a root node.
    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_nodes(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.nodes.extend(nodes);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The color added to every lit fragment regardless of the scene's lights.
    pub fn ambient_color(&self) -> Vec4 {
        self.ambient_color
    }

    pub fn set_ambient_color(&mut self, color: Vec4) {
        self.ambient_color = color;
    }

    /// Refits every camera whose projection follows the viewport to `aspect` (width over height).
    pub fn set_viewport_aspect(&mut self, aspect: f32) {
        for node in &mut self.nodes {
            node.for_each_camera_mut(&mut |camera| camera.set_viewport_aspect(aspect));
        }
    }

    /// Advances every root node, in order, by `delta`.
    pub fn update(&mut self, delta: Duration) {
        for node in &mut self.nodes {
            node.update(delta);
        }
    }

    /// Clears the target, publishes the ambient color and empties the light array, then prepares and
    /// draws the whole graph.
    pub fn render<S: Surface>(&self, context: &mut RenderContext, surface: &mut S) {
        surface.clear(Vec4::rgba(0.0, 0.0, 0.0, 1.0));
        RenderContext::set_vec4(surface, context.locations.ambient_color, self.ambient_color);
        context.reset_lights(surface);

        let mut queue = Vec::new();
        for node in &self.nodes {
            node.prepare(None, context, surface, &mut queue);
        }

        trace!("Scene '{}': drawing {} items", self.name, queue.len());
        for item in &queue {
            item.render(context, surface);
        }
    }

    /// The scene itself if `name` matches it, otherwise the first match among its roots in order.
    pub fn select(&self, name: &str) -> Option<Selected<'_>> {
        if self.name == name {
            return Some(Selected::Scene(self));
        }

        self.nodes.iter().find_map(|node| node.select(name))
    }

    /// Mutable counterpart of [`Scene::select`], with the same match order.
    pub fn select_mut(&mut self, name: &str) -> Option<SelectedMut<'_>> {
        if self.name == name {
            return Some(SelectedMut::Scene(self));
        }

        self.nodes.iter_mut().find_map(|node| node.select_mut(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::context::Locations;
    use crate::headless::{HeadlessSurface, SurfaceCall};
    use crate::light::Light;
    use crate::math::Mat4;
    use crate::surface::{DrawMode, LightField, UniformName};
    use crate::triangle::Triangle;
    use crate::vertex::Vertex;
    use approx::assert_abs_diff_eq;

    fn triangle(surface: &mut HeadlessSurface) -> Triangle {
        let corner = |x, y| Vertex::builder().position(x, y, 0.0).color(0.0, 1.0, 0.0, 1.0);
        Triangle::builder("tri")
            .vertex(corner(0.0, 0.0))
            .vertex(corner(1.0, 0.0))
            .vertex(corner(0.0, 1.0))
            .build(surface)
            .unwrap()
    }

    fn setup() -> (HeadlessSurface, RenderContext) {
        let surface = HeadlessSurface::new();
        let context = RenderContext::new(Locations::resolve(&surface));
        (surface, context)
    }

    #[test]
    fn camera_after_the_mesh_still_applies() {
        let (mut surface, mut context) = setup();
        let projection = Mat4::orthographic(2.0, 2.0, 0.1, 10.0);
        let placement = Mat4::translate(0.0, 0.0, 4.0);
        let scene = Scene::new("s")
            .with_node(Node::new("geometry").with_child(triangle(&mut surface)))
            .with_node(
                Node::new("rig")
                    .with_transform(placement)
                    .with_child(Camera::new("eye", projection)),
            );

        scene.render(&mut context, &mut surface);

        let expected = projection.times(placement.inverse_rigid());
        assert_abs_diff_eq!(
            surface.last_matrix(UniformName::VpTransform).unwrap(),
            expected,
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(context.vp_transform, expected, epsilon = 1e-6);
    }

    #[test]
    fn render_clears_then_publishes_ambient_and_empties_lights() {
        let (mut surface, mut context) = setup();
        let mut scene = Scene::new("s").with_node(Node::new("root").with_child(triangle(&mut surface)));
        scene.set_ambient_color(Vec4::rgba(0.2, 0.2, 0.2, 1.0));
        surface.clear_calls();

        scene.render(&mut context, &mut surface);

        assert_eq!(
            surface.calls().first(),
            Some(&SurfaceCall::Clear {
                color: Vec4::rgba(0.0, 0.0, 0.0, 1.0)
            })
        );
        assert_eq!(
            surface.last_vec4(UniformName::AmbientColor),
            Some(Vec4::rgba(0.2, 0.2, 0.2, 1.0))
        );
        for index in 0..crate::surface::MAX_LIGHTS {
            assert_eq!(surface.last_int(UniformName::Light(index, LightField::Kind)), Some(0));
        }
        let draws: Vec<_> = surface.draw_calls().cloned().collect();
        assert_eq!(
            draws,
            vec![SurfaceCall::DrawArrays {
                mode: DrawMode::Triangles,
                first: 0,
                count: 3
            }]
        );
    }

    #[test]
    fn lights_are_published_before_any_draw() {
        let (mut surface, mut context) = setup();
        let scene = Scene::new("s")
            .with_node(Node::new("geometry").with_child(triangle(&mut surface)))
            .with_node(Node::new("lamp").with_child(Light::point("bulb", 1, Vec4::rgba(1.0, 1.0, 1.0, 1.0))));

        scene.render(&mut context, &mut surface);

        let calls = surface.calls();
        let light_at = calls
            .iter()
            .rposition(|call| {
                matches!(
                    call,
                    SurfaceCall::Uniform1i {
                        uniform: UniformName::Light(1, LightField::Kind),
                        value: 2
                    }
                )
            })
            .unwrap();
        let draw_at = calls.iter().position(SurfaceCall::is_draw).unwrap();
        assert!(light_at < draw_at);
    }

    #[test]
    fn select_checks_the_scene_name_first() {
        let mut scene = Scene::new("main").with_node(Node::new("main-root"));

        assert!(matches!(scene.select("main"), Some(Selected::Scene(_))));
        assert!(matches!(scene.select("main-root"), Some(Selected::Node(_))));
        assert!(scene.select("nothing").is_none());

        scene
            .select_mut("main")
            .and_then(SelectedMut::into_scene)
            .unwrap()
            .set_ambient_color(Vec4::rgba(1.0, 0.0, 0.0, 1.0));
        assert_eq!(scene.ambient_color(), Vec4::rgba(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn update_reaches_every_root() {
        let mut first = Node::new("first");
        first.on_update(|node, _| node.set_transform(Mat4::translate(1.0, 0.0, 0.0)));
        let mut second = Node::new("second");
        second.on_update(|node, _| node.set_transform(Mat4::translate(2.0, 0.0, 0.0)));
        let mut scene = Scene::new("s").with_nodes([first, second]);

        scene.update(Duration::from_millis(10));

        assert_eq!(*scene.nodes()[0].transform(), Mat4::translate(1.0, 0.0, 0.0));
        assert_eq!(*scene.nodes()[1].transform(), Mat4::translate(2.0, 0.0, 0.0));
    }

    #[test]
    fn viewport_aspect_reaches_nested_fitted_cameras() {
        let mut scene = Scene::new("s").with_node(
            Node::new("rig")
                .with_child(Camera::new("fixed", Mat4::identity()))
                .with_child(Node::new("arm").with_child(Camera::fitted("follow", 1.0, 0.1, Some(50.0)))),
        );

        scene.set_viewport_aspect(1.6);

        let projection_of = |name| match scene.select(name) {
            Some(Selected::Camera(camera)) => *camera.projection(),
            _ => panic!("camera {name} missing"),
        };
        assert_eq!(projection_of("follow"), Mat4::perspective(1.6, 1.0, 0.1, Some(50.0)));
        assert_eq!(projection_of("fixed"), Mat4::identity());
    }
}
