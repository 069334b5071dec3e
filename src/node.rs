//! # Scene Graph Nodes
//!
//! A [`Node`] carries a local transform and an ordered list of children. Children form a closed set,
//! [`Child`]: nested nodes, meshes, cameras, lights and hand-authored triangles. Every child kind answers
//! the same three questions:
//!
//! - **update**: advance by one frame (only nodes do anything here, by running their update handler);
//! - **prepare**: consume the inherited world transform (nodes compose and recurse, cameras and lights
//!   publish uniform state, drawables queue themselves for the render pass);
//! - **select**: find the first element with a given name in pre-order.
//!
//! World transforms are never stored. They are recomputed on every prepare pass as
//! `parent_world.times(local)` and threaded down the tree.

use std::fmt;

use web_time::Duration;

use crate::camera::Camera;
use crate::context::RenderContext;
use crate::light::Light;
use crate::material::Material;
use crate::math::Mat4;
use crate::primitive::{DrawItem, Mesh};
use crate::scene::Scene;
use crate::surface::Surface;
use crate::triangle::Triangle;

/// Per-frame callback attached to a node. Receives the node itself and the frame's time step.
pub type UpdateHandler = Box<dyn FnMut(&mut Node, Duration)>;

/// Anything a node can hold.
#[derive(Debug)]
pub enum Child {
    Node(Node),
    Mesh(Mesh),
    Camera(Camera),
    Light(Light),
    Triangle(Triangle),
}

impl Child {
    pub fn update(&mut self, delta: Duration) {
        if let Child::Node(node) = self {
            node.update(delta);
        }
    }

    pub fn prepare<'a, S: Surface>(
        &'a self,
        world: &Mat4,
        context: &mut RenderContext,
        surface: &mut S,
        queue: &mut Vec<DrawItem<'a>>,
    ) {
        match self {
            Child::Node(node) => node.prepare(Some(world), context, surface, queue),
            Child::Mesh(mesh) => mesh.prepare(world, queue),
            Child::Camera(camera) => camera.prepare(world, context),
            Child::Light(light) => light.prepare(world, context, surface),
            Child::Triangle(triangle) => triangle.prepare(world, queue),
        }
    }

    pub fn select(&self, name: &str) -> Option<Selected<'_>> {
        match self {
            Child::Node(node) => node.select(name),
            Child::Mesh(mesh) => mesh.select(name).map(Selected::Material),
            Child::Camera(camera) => camera.select(name).map(Selected::Camera),
            Child::Light(light) => light.select(name).map(Selected::Light),
            Child::Triangle(_) => None,
        }
    }

    pub fn select_mut(&mut self, name: &str) -> Option<SelectedMut<'_>> {
        match self {
            Child::Node(node) => node.select_mut(name),
            Child::Mesh(mesh) => mesh.select(name).map(SelectedMut::Material),
            Child::Camera(camera) => (camera.name() == name).then_some(SelectedMut::Camera(camera)),
            Child::Light(light) => (light.name() == name).then_some(SelectedMut::Light(light)),
            Child::Triangle(_) => None,
        }
    }
}

impl From<Node> for Child {
    fn from(node: Node) -> Self {
        Child::Node(node)
    }
}

impl From<Mesh> for Child {
    fn from(mesh: Mesh) -> Self {
        Child::Mesh(mesh)
    }
}

impl From<Camera> for Child {
    fn from(camera: Camera) -> Self {
        Child::Camera(camera)
    }
}

impl From<Light> for Child {
    fn from(light: Light) -> Self {
        Child::Light(light)
    }
}

impl From<Triangle> for Child {
    fn from(triangle: Triangle) -> Self {
        Child::Triangle(triangle)
    }
}

/// Result of a name lookup.
#[derive(Debug, Clone, Copy)]
pub enum Selected<'a> {
    Scene(&'a Scene),
    Node(&'a Node),
    Camera(&'a Camera),
    Light(&'a Light),
    Material(&'a Material),
}

impl<'a> Selected<'a> {
    pub fn as_node(self) -> Option<&'a Node> {
        match self {
            Selected::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Selected::Scene(scene) => scene.name(),
            Selected::Node(node) => node.name(),
            Selected::Camera(camera) => camera.name(),
            Selected::Light(light) => light.name(),
            Selected::Material(material) => material.name(),
        }
    }
}

/// Result of a mutable name lookup. Materials are shared between primitives and stay read-only.
#[derive(Debug)]
pub enum SelectedMut<'a> {
    Scene(&'a mut Scene),
    Node(&'a mut Node),
    Camera(&'a mut Camera),
    Light(&'a mut Light),
    Material(&'a Material),
}

impl<'a> SelectedMut<'a> {
    pub fn into_node(self) -> Option<&'a mut Node> {
        match self {
            SelectedMut::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn into_scene(self) -> Option<&'a mut Scene> {
        match self {
            SelectedMut::Scene(scene) => Some(scene),
            _ => None,
        }
    }
}

/// A named transform applied to all of its children.
pub struct Node {
    name: String,
    transform: Mat4,
    children: Vec<Child>,
    update_handler: Option<UpdateHandler>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Mat4::identity(),
            children: Vec::new(),
            update_handler: None,
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Child>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The local transform.
    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
    }

    pub fn children(&self) -> &[Child] {
        &self.children
    }

    /// Installs the per-frame update handler, replacing any previous one.
    pub fn on_update(&mut self, handler: impl FnMut(&mut Node, Duration) + 'static) {
        self.update_handler = Some(Box::new(handler));
    }

    /// Runs this node's handler, then updates the children in order.
    pub fn update(&mut self, delta: Duration) {
        if let Some(mut handler) = self.update_handler.take() {
            handler(self, delta);
            // The handler may have installed a replacement for itself.
            if self.update_handler.is_none() {
                self.update_handler = Some(handler);
            }
        }

        for child in &mut self.children {
            child.update(delta);
        }
    }

    /// Composes the world transform (`parent.times(local)`, or `local` at a root) and prepares every
    /// child with it.
    pub fn prepare<'a, S: Surface>(
        &'a self,
        parent: Option<&Mat4>,
        context: &mut RenderContext,
        surface: &mut S,
        queue: &mut Vec<DrawItem<'a>>,
    ) {
        let world = match parent {
            Some(parent) => parent.times(self.transform),
            None => self.transform,
        };

        for child in &self.children {
            child.prepare(&world, context, surface, queue);
        }
    }

    /// Calls `visit` on every camera in this subtree, in pre-order.
    pub fn for_each_camera_mut(&mut self, visit: &mut dyn FnMut(&mut Camera)) {
        for child in &mut self.children {
            match child {
                Child::Node(node) => node.for_each_camera_mut(visit),
                Child::Camera(camera) => visit(camera),
                Child::Mesh(_) | Child::Light(_) | Child::Triangle(_) => {}
            }
        }
    }

    /// First element named `name` in pre-order: this node, then each child subtree in order.
    pub fn select(&self, name: &str) -> Option<Selected<'_>> {
        if self.name == name {
            return Some(Selected::Node(self));
        }

        self.children.iter().find_map(|child| child.select(name))
    }

    pub fn select_mut(&mut self, name: &str) -> Option<SelectedMut<'_>> {
        if self.name == name {
            return Some(SelectedMut::Node(self));
        }

        self.children.iter_mut().find_map(|child| child.select_mut(name))
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("transform", &self.transform)
            .field("children", &self.children)
            .field("has_update_handler", &self.update_handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Locations;
    use crate::headless::HeadlessSurface;
    use crate::math::Vec4;
    use crate::primitive::Drawable;
    use crate::vertex::Vertex;
    use approx::assert_abs_diff_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn triangle(surface: &mut HeadlessSurface, name: &str) -> Triangle {
        let corner = |x, y| Vertex::builder().position(x, y, 0.0).color(1.0, 1.0, 1.0, 1.0);
        Triangle::builder(name)
            .vertex(corner(0.0, 0.0))
            .vertex(corner(1.0, 0.0))
            .vertex(corner(0.0, 1.0))
            .build(surface)
            .unwrap()
    }

    fn leaf(triangle: Triangle, local: Mat4) -> Node {
        Node::new("").with_transform(local).with_child(triangle)
    }

    fn prepared_models(root: &Node, surface: &mut HeadlessSurface) -> Vec<(String, Mat4)> {
        let mut context = RenderContext::new(Locations::resolve(surface));
        let mut queue = Vec::new();
        root.prepare(None, &mut context, surface, &mut queue);

        queue
            .iter()
            .map(|item| match item.drawable {
                Drawable::Triangle(triangle) => (triangle.name().to_string(), item.model),
                Drawable::Primitive(_) => ("primitive".to_string(), item.model),
            })
            .collect()
    }

    #[test]
    fn world_transforms_compose_parent_first() {
        let mut surface = HeadlessSurface::new();
        let root_local = Mat4::translate(0.0, 5.0, 0.0);
        let a_local = Mat4::rotate_z(90.0);
        let b_local = Mat4::scale(2.0, 2.0, 2.0);
        let c_local = Mat4::translate(1.0, 0.0, 0.0);

        let root = Node::new("root")
            .with_transform(root_local)
            .with_child(
                Node::new("A")
                    .with_transform(a_local)
                    .with_child(leaf(triangle(&mut surface, "C"), c_local)),
            )
            .with_child(
                Node::new("B")
                    .with_transform(b_local)
                    .with_child(triangle(&mut surface, "D")),
            );

        let models = prepared_models(&root, &mut surface);

        assert_eq!(models.len(), 2);
        assert_eq!(models[0].0, "C");
        assert_abs_diff_eq!(
            models[0].1,
            root_local.times(a_local).times(c_local),
            epsilon = 1e-6
        );
        assert_eq!(models[1].0, "D");
        assert_abs_diff_eq!(models[1].1, root_local.times(b_local), epsilon = 1e-6);

        // The composed transform moves C's origin to (0, 6, 0): rotate then lift.
        let origin = models[0].1.times(Vec4::point(0.0, 0.0, 0.0));
        assert_abs_diff_eq!(origin, Vec4::point(0.0, 6.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn select_returns_first_match_in_pre_order() {
        let root = Node::new("root")
            .with_child(
                Node::new("group")
                    .with_child(Node::new("twin").with_transform(Mat4::translate(1.0, 0.0, 0.0))),
            )
            .with_child(Node::new("twin").with_transform(Mat4::translate(2.0, 0.0, 0.0)));

        for _ in 0..3 {
            let found = root.select("twin").and_then(Selected::as_node).unwrap();
            assert_eq!(*found.transform(), Mat4::translate(1.0, 0.0, 0.0));
        }
        assert!(root.select("missing").is_none());
        assert_eq!(root.select("root").map(|s| s.name().to_string()), Some("root".into()));
    }

    #[test]
    fn select_reaches_cameras_and_lights() {
        let root = Node::new("root")
            .with_child(Camera::new("eye", Mat4::identity()))
            .with_child(Node::new("lamp-holder").with_child(Light::point(
                "lamp",
                0,
                Vec4::rgba(1.0, 1.0, 1.0, 1.0),
            )));

        assert!(matches!(root.select("eye"), Some(Selected::Camera(_))));
        assert!(matches!(root.select("lamp"), Some(Selected::Light(_))));
    }

    #[test]
    fn update_runs_handlers_before_children() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let record = |tag: &'static str| {
            let order = Rc::clone(&order);
            move |node: &mut Node, _: Duration| order.borrow_mut().push(format!("{tag}:{}", node.name()))
        };

        let mut child = Node::new("child");
        child.on_update(record("handler"));
        let mut root = Node::new("root").with_child(child);
        root.on_update(record("handler"));

        root.update(Duration::from_millis(16));

        assert_eq!(*order.borrow(), vec!["handler:root", "handler:child"]);
    }

    #[test]
    fn update_handlers_mutate_their_own_transform() {
        let mut root = Node::new("root").with_child(Node::new("spinner"));
        root.select_mut("spinner")
            .and_then(SelectedMut::into_node)
            .unwrap()
            .on_update(|node, delta| {
                let degrees = 90.0 * delta.as_secs_f32();
                node.set_transform(Mat4::rotate_y(degrees).times(*node.transform()));
            });

        root.update(Duration::from_millis(500));
        root.update(Duration::from_millis(500));

        let spinner = root.select("spinner").and_then(Selected::as_node).unwrap();
        assert_abs_diff_eq!(*spinner.transform(), Mat4::rotate_y(90.0), epsilon = 1e-5);
        // Nothing composed into the parent.
        assert_eq!(*root.transform(), Mat4::identity());
    }
}
