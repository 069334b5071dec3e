//! # Primitives and Meshes
//!
//! A [`Primitive`] is one drawable unit: a topology, a position attribute, an optional normal attribute, a
//! material, and optionally an index range for indexed drawing. A [`Mesh`] is a named list of primitives.
//!
//! ## Prepare and render
//!
//! Neither type stores a model transform. During the prepare pass each primitive pushes a [`DrawItem`]
//! pairing itself with the world transform it inherited; the render pass then consumes that list. This
//! keeps the per-frame state explicit, and guarantees every camera and light has published its state
//! before the first draw is issued.

use std::rc::Rc;

use crate::buffer::{Attribute, Buffer};
use crate::context::RenderContext;
use crate::material::Material;
use crate::math::Mat4;
use crate::surface::{AttributeName, ComponentType, DrawMode, Surface};
use crate::triangle::Triangle;

/// The index data of an indexed primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    pub buffer: Buffer,
    pub count: u32,
    pub component_type: ComponentType,
    /// Byte offset of the first index within `buffer`.
    pub offset: u32,
}

#[derive(Debug, Clone)]
pub struct Primitive {
    mode: DrawMode,
    position: Attribute,
    normal: Option<Attribute>,
    material: Rc<Material>,
    indices: Option<IndexRange>,
}

impl Primitive {
    pub fn new(
        mode: DrawMode,
        position: Attribute,
        normal: Option<Attribute>,
        material: Rc<Material>,
        indices: Option<IndexRange>,
    ) -> Self {
        Self {
            mode,
            position,
            normal,
            material,
            indices,
        }
    }

    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    pub fn position(&self) -> &Attribute {
        &self.position
    }

    pub fn normal(&self) -> Option<&Attribute> {
        self.normal.as_ref()
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn indices(&self) -> Option<&IndexRange> {
        self.indices.as_ref()
    }

    /// Primitives are found through their material's name.
    pub fn select(&self, name: &str) -> Option<&Material> {
        self.material.select(name)
    }

    pub fn prepare<'a>(&'a self, world: &Mat4, queue: &mut Vec<DrawItem<'a>>) {
        queue.push(DrawItem {
            drawable: Drawable::Primitive(self),
            model: *world,
        });
    }

    /// Binds material, attributes and transforms, then issues the draw.
    ///
    /// Indexed primitives always go through `draw_elements` with their own `(count, type, offset)`;
    /// the others draw `position.count()` vertices with `draw_arrays`.
    pub fn render(&self, model: &Mat4, context: &RenderContext, surface: &mut impl Surface) {
        let locations = &context.locations;

        self.material.render(context, surface);

        self.position.attach(context, surface);
        match &self.normal {
            Some(normal) => normal.attach(context, surface),
            None => Attribute::detach(AttributeName::Normal, context, surface),
        }
        Attribute::detach(AttributeName::Color, context, surface);

        RenderContext::set_matrix(surface, locations.model_transform, model);
        RenderContext::set_matrix(surface, locations.vp_transform, &context.vp_transform);
        RenderContext::set_matrix(surface, locations.normal_transform, &model.adjoint_transpose());

        match &self.indices {
            Some(indices) => surface.draw_elements(
                self.mode,
                indices.buffer.handle(),
                indices.count,
                indices.component_type,
                indices.offset,
            ),
            None => surface.draw_arrays(self.mode, 0, self.position.count()),
        }
    }
}

/// An ordered list of primitives sharing a name.
#[derive(Debug, Clone)]
pub struct Mesh {
    name: String,
    primitives: Vec<Primitive>,
}

impl Mesh {
    pub fn new(name: impl Into<String>, primitives: Vec<Primitive>) -> Self {
        Self {
            name: name.into(),
            primitives,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn select(&self, name: &str) -> Option<&Material> {
        self.primitives.iter().find_map(|primitive| primitive.select(name))
    }

    pub fn prepare<'a>(&'a self, world: &Mat4, queue: &mut Vec<DrawItem<'a>>) {
        for primitive in &self.primitives {
            primitive.prepare(world, queue);
        }
    }
}

/// Something the render pass can draw.
#[derive(Debug, Clone, Copy)]
pub enum Drawable<'a> {
    Primitive(&'a Primitive),
    Triangle(&'a Triangle),
}

/// A leaf collected during prepare, with the world transform it inherited.
#[derive(Debug, Clone, Copy)]
pub struct DrawItem<'a> {
    pub drawable: Drawable<'a>,
    pub model: Mat4,
}

impl DrawItem<'_> {
    pub fn render(&self, context: &RenderContext, surface: &mut impl Surface) {
        match self.drawable {
            Drawable::Primitive(primitive) => primitive.render(&self.model, context, surface),
            Drawable::Triangle(triangle) => triangle.render(&self.model, context, surface),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Locations;
    use crate::headless::{HeadlessSurface, SurfaceCall};
    use crate::math::Vec4;
    use crate::surface::{AttributeLayout, BufferTarget, UniformName};
    use approx::assert_abs_diff_eq;

    fn float3(buffer: Buffer, name: AttributeName, count: u32) -> Attribute {
        let layout = AttributeLayout {
            size: 3,
            component_type: ComponentType::Float,
            normalized: false,
            stride: 0,
            offset: 0,
        };
        Attribute::new(buffer, name, layout, count)
    }

    fn setup() -> (HeadlessSurface, RenderContext, Buffer) {
        let mut surface = HeadlessSurface::new();
        let context = RenderContext::new(Locations::resolve(&surface));
        let vertices = Buffer::new(&mut surface, BufferTarget::Vertex, &[0; 72]).unwrap();
        surface.clear_calls();
        (surface, context, vertices)
    }

    #[test]
    fn indexed_primitive_uses_its_index_accessor() {
        let (mut surface, context, vertices) = setup();
        let index_buffer = Buffer::new(&mut surface, BufferTarget::Index, &[0; 64]).unwrap();
        let indices = IndexRange {
            buffer: index_buffer,
            count: 36,
            component_type: ComponentType::UnsignedShort,
            offset: 8,
        };
        let primitive = Primitive::new(
            DrawMode::Triangles,
            float3(vertices, AttributeName::Position, 6),
            Some(float3(vertices, AttributeName::Normal, 6)),
            Rc::new(Material::default()),
            Some(indices),
        );

        primitive.render(&Mat4::identity(), &context, &mut surface);

        let draws: Vec<_> = surface.draw_calls().cloned().collect();
        assert_eq!(
            draws,
            vec![SurfaceCall::DrawElements {
                mode: DrawMode::Triangles,
                buffer: index_buffer.handle(),
                count: 36,
                index_type: ComponentType::UnsignedShort,
                offset: 8,
            }]
        );
    }

    #[test]
    fn non_indexed_primitive_draws_position_count() {
        let (mut surface, context, vertices) = setup();
        let primitive = Primitive::new(
            DrawMode::Lines,
            float3(vertices, AttributeName::Position, 6),
            None,
            Rc::new(Material::new("red", Vec4::rgba(1.0, 0.0, 0.0, 1.0))),
            None,
        );

        primitive.render(&Mat4::identity(), &context, &mut surface);

        let draws: Vec<_> = surface.draw_calls().cloned().collect();
        assert_eq!(
            draws,
            vec![SurfaceCall::DrawArrays {
                mode: DrawMode::Lines,
                first: 0,
                count: 6,
            }]
        );
        assert_eq!(
            surface.last_vec4(UniformName::Color),
            Some(Vec4::rgba(1.0, 0.0, 0.0, 1.0))
        );
        assert!(surface.calls().contains(&SurfaceCall::DisableVertexAttrib {
            attribute: AttributeName::Normal
        }));
    }

    #[test]
    fn normals_use_the_adjoint_transpose() {
        let (mut surface, context, vertices) = setup();
        let primitive = Primitive::new(
            DrawMode::Triangles,
            float3(vertices, AttributeName::Position, 6),
            Some(float3(vertices, AttributeName::Normal, 6)),
            Rc::new(Material::default()),
            None,
        );
        let model = Mat4::scale(3.0, 1.0, 0.5).then_translate(0.0, 2.0, 0.0);

        primitive.render(&model, &context, &mut surface);

        assert_abs_diff_eq!(
            surface.last_matrix(UniformName::NormalTransform).unwrap(),
            model.adjoint_transpose(),
            epsilon = 1e-6
        );
        assert_eq!(surface.last_matrix(UniformName::ModelTransform), Some(model));
        assert_ne!(surface.last_matrix(UniformName::NormalTransform), Some(model));
    }

    #[test]
    fn uniforms_are_published_before_the_draw() {
        let (mut surface, context, vertices) = setup();
        let primitive = Primitive::new(
            DrawMode::Points,
            float3(vertices, AttributeName::Position, 6),
            None,
            Rc::new(Material::default()),
            None,
        );

        primitive.render(&Mat4::identity(), &context, &mut surface);

        let draw_at = surface.calls().iter().position(SurfaceCall::is_draw).unwrap();
        assert_eq!(draw_at, surface.calls().len() - 1);
    }

    #[test]
    fn mesh_selects_through_materials() {
        let (_, _, vertices) = setup();
        let primitive = Primitive::new(
            DrawMode::Triangles,
            float3(vertices, AttributeName::Position, 6),
            None,
            Rc::new(Material::new("steel", Vec4::rgba(0.5, 0.5, 0.5, 1.0))),
            None,
        );
        let mesh = Mesh::new("cube", vec![primitive]);

        assert_eq!(mesh.select("steel").map(Material::name), Some("steel"));
        assert!(mesh.select("cube").is_none());
    }
}
