//! # Vertex Module
//!
//! This module provides the `Vertex` struct used by hand-authored geometry such as
//! [`crate::Triangle`]. A vertex carries a homogeneous position and an RGBA color, packed back to back so a
//! slice of vertices can be uploaded to a surface buffer as-is through `bytemuck`.
//!
//! # Overview
//!
//! ## Structs
//!
//! - [`Vertex`]: A single vertex with position and color attributes.
//! - [`VertexBuilder`]: Collects a position and a color, failing if either is missing.
//!
//! ## Layout
//!
//! | Attribute | Offset (bytes) | Format        |
//! |-----------|----------------|---------------|
//! | position  | 0              | `f32 × 4`     |
//! | color     | 16             | `f32 × 4`     |
//!
//! The stride is [`Vertex::STRIDE`] (32 bytes). [`Vertex::position_layout`] and
//! [`Vertex::color_layout`] describe the two attributes in the form surfaces expect.
//!
//! ## Usage
//!
//! ```rust
//! use lumen_core::Vertex;
//!
//! let vertex = Vertex::builder()
//!     .position(0.0, 1.0, 0.0)
//!     .color(1.0, 0.0, 0.0, 1.0)
//!     .build()
//!     .unwrap();
//! assert_eq!(vertex.position(), [0.0, 1.0, 0.0, 1.0]);
//! ```

use crate::error::EngineError;
use crate::surface::{AttributeLayout, ComponentType};

/// Represents a single vertex in 3D space.
///
/// # Fields
///
/// - `position`: The homogeneous model-space position `[x, y, z, 1]`.
/// - `color`: The RGBA color of the vertex, each channel in `0.0..=1.0`.
///
/// # Traits
///
/// - `bytemuck::Pod` and `bytemuck::Zeroable` allow safe casting of vertex slices to raw bytes.
/// - `#[repr(C)]` pins the field order and alignment the layouts below rely on.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    position: [f32; 4],

    color: [f32; 4],
}

impl Vertex {
    /// Distance in bytes between consecutive vertices in a packed buffer.
    pub const STRIDE: u32 = std::mem::size_of::<Vertex>() as u32;

    pub fn new(position: [f32; 3], color: [f32; 4]) -> Self {
        Self {
            position: [position[0], position[1], position[2], 1.0],
            color,
        }
    }

    pub fn builder() -> VertexBuilder {
        VertexBuilder::default()
    }

    pub fn position(&self) -> [f32; 4] {
        self.position
    }

    pub fn color(&self) -> [f32; 4] {
        self.color
    }

    /// Layout of the position attribute within a packed vertex buffer.
    pub fn position_layout() -> AttributeLayout {
        AttributeLayout {
            size: 4,
            component_type: ComponentType::Float,
            normalized: false,
            stride: Self::STRIDE,
            offset: 0,
        }
    }

    /// Layout of the color attribute within a packed vertex buffer.
    pub fn color_layout() -> AttributeLayout {
        AttributeLayout {
            size: 4,
            component_type: ComponentType::Float,
            normalized: false,
            stride: Self::STRIDE,
            offset: std::mem::size_of::<[f32; 4]>() as u32,
        }
    }
}

/// Builds a [`Vertex`] one attribute at a time.
///
/// Both the position and the color are required; [`VertexBuilder::build`] fails with
/// [`EngineError::Failure`] when either was never set.
#[derive(Debug, Clone, Default)]
pub struct VertexBuilder {
    position: Option<[f32; 3]>,
    color: Option<[f32; 4]>,
}

impl VertexBuilder {
    /// Sets the position of the vertex in the model space of its parent.
    pub fn position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Some([x, y, z]);
        self
    }

    /// Sets the color of the vertex in RGBA format.
    pub fn color(mut self, r: f32, g: f32, b: f32, a: f32) -> Self {
        self.color = Some([r, g, b, a]);
        self
    }

    pub fn build(self) -> Result<Vertex, EngineError> {
        let position = self
            .position
            .ok_or_else(|| EngineError::Failure("vertex must specify a position".into()))?;
        let color = self
            .color
            .ok_or_else(|| EngineError::Failure("vertex must specify a color".into()))?;

        Ok(Vertex::new(position, color))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertices_pack_position_then_color() {
        let vertex = Vertex::new([1.0, 2.0, 3.0], [0.1, 0.2, 0.3, 0.4]);
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&vertex));

        assert_eq!(floats, &[1.0, 2.0, 3.0, 1.0, 0.1, 0.2, 0.3, 0.4]);
        assert_eq!(Vertex::STRIDE, 32);
        assert_eq!(Vertex::color_layout().offset, 16);
    }

    #[test]
    fn builder_requires_position_and_color() {
        let no_color = Vertex::builder().position(0.0, 0.0, 0.0).build();
        let no_position = Vertex::builder().color(1.0, 1.0, 1.0, 1.0).build();

        assert!(matches!(no_color, Err(EngineError::Failure(message)) if message.contains("color")));
        assert!(matches!(no_position, Err(EngineError::Failure(message)) if message.contains("position")));
    }
}
