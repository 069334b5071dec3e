//! Isolated, hand-authored triangles.

use crate::buffer::{Attribute, Buffer};
use crate::context::RenderContext;
use crate::error::EngineError;
use crate::math::{Mat4, Vec4};
use crate::primitive::{DrawItem, Drawable};
use crate::surface::{AttributeName, BufferTarget, DrawMode, Surface};
use crate::vertex::{Vertex, VertexBuilder};

/// A single triangle with per-vertex colors, uploaded as one packed vertex buffer.
#[derive(Debug, Clone)]
pub struct Triangle {
    name: String,
    vertices: [Vertex; 3],
    position: Attribute,
    color: Attribute,
}

impl Triangle {
    pub fn builder(name: impl Into<String>) -> TriangleBuilder {
        TriangleBuilder {
            name: name.into(),
            vertices: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[Vertex; 3] {
        &self.vertices
    }

    pub fn prepare<'a>(&'a self, world: &Mat4, queue: &mut Vec<DrawItem<'a>>) {
        queue.push(DrawItem {
            drawable: Drawable::Triangle(self),
            model: *world,
        });
    }

    pub fn render(&self, model: &Mat4, context: &RenderContext, surface: &mut impl Surface) {
        let locations = &context.locations;

        // Vertex colors are multiplied by the uniform color, so keep it neutral.
        RenderContext::set_vec4(surface, locations.color, Vec4::rgba(1.0, 1.0, 1.0, 1.0));

        self.position.attach(context, surface);
        self.color.attach(context, surface);
        Attribute::detach(AttributeName::Normal, context, surface);

        RenderContext::set_matrix(surface, locations.model_transform, model);
        RenderContext::set_matrix(surface, locations.vp_transform, &context.vp_transform);
        RenderContext::set_matrix(surface, locations.normal_transform, &model.adjoint_transpose());

        surface.draw_arrays(DrawMode::Triangles, 0, 3);
    }
}

/// Collects vertices for a [`Triangle`]; building fails unless exactly three valid vertices were given.
#[derive(Debug, Clone)]
pub struct TriangleBuilder {
    name: String,
    vertices: Vec<VertexBuilder>,
}

impl TriangleBuilder {
    pub fn vertex(mut self, vertex: VertexBuilder) -> Self {
        self.vertices.push(vertex);
        self
    }

    pub fn build(self, surface: &mut impl Surface) -> Result<Triangle, EngineError> {
        if self.vertices.len() != 3 {
            return Err(EngineError::Failure(format!(
                "triangle '{}' must have exactly 3 vertices, got {}",
                self.name,
                self.vertices.len()
            )));
        }

        let built = self
            .vertices
            .into_iter()
            .map(VertexBuilder::build)
            .collect::<Result<Vec<_>, _>>()?;
        let vertices = [built[0], built[1], built[2]];

        let buffer = Buffer::new(surface, BufferTarget::Vertex, bytemuck::cast_slice(&vertices))?;

        Ok(Triangle {
            name: self.name,
            vertices,
            position: Attribute::new(buffer, AttributeName::Position, Vertex::position_layout(), 3),
            color: Attribute::new(buffer, AttributeName::Color, Vertex::color_layout(), 3),
        })
    }
}
