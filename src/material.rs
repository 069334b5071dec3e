//! # Material Module
//!
//! Materials carry the base color a primitive is drawn with. The importer builds one per document
//! material; primitives that name none use [`Material::default`].

use crate::context::RenderContext;
use crate::math::Vec4;
use crate::surface::Surface;

/// A flat RGBA reflectance color. Shared between primitives and never modified after import.
///
/// # Fields
/// - `name`: The document name, used by [`Material::select`].
/// - `color`: Base color, multiplied with the vertex color in the fragment stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    name: String,
    color: Vec4,
}

impl Material {
    pub fn new(name: impl Into<String>, color: Vec4) -> Self {
        Self {
            name: name.into(),
            color,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> Vec4 {
        self.color
    }

    /// `Some(self)` when `name` matches.
    pub fn select(&self, name: &str) -> Option<&Material> {
        (self.name == name).then_some(self)
    }

    /// Publishes the material color.
    pub fn render(&self, context: &RenderContext, surface: &mut impl Surface) {
        RenderContext::set_vec4(surface, context.locations.color, self.color);
    }
}

impl Default for Material {
    /// Opaque white, used for primitives that reference no material.
    fn default() -> Self {
        Self::new("default", Vec4::rgba(1.0, 1.0, 1.0, 1.0))
    }
}
