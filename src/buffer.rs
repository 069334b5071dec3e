//! # Resource Handles
//!
//! [`Buffer`] is an immutable block of bytes living on the rendering surface; [`Attribute`] is a typed view
//! into one, describing how a single shader input is read per vertex. Many attributes may alias the same
//! buffer (e.g. positions and normals packed into one binary payload).

use crate::context::RenderContext;
use crate::error::SurfaceError;
use crate::surface::{AttributeLayout, AttributeName, BufferHandle, BufferTarget, ComponentType, Surface};

/// A surface-resident buffer. Created once at import time and never modified.
///
/// # Fields
/// - `handle`: What the surface returned from `create_buffer`.
/// - `target`: Vertex data or indices.
/// - `byte_length`: Size of the uploaded data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Buffer {
    handle: BufferHandle,
    target: BufferTarget,
    byte_length: usize,
}

impl Buffer {
    /// Uploads `data` to the surface.
    pub fn new(surface: &mut impl Surface, target: BufferTarget, data: &[u8]) -> Result<Self, SurfaceError> {
        let handle = surface.create_buffer(target, data)?;
        Ok(Self {
            handle,
            target,
            byte_length: data.len(),
        })
    }

    /// The surface handle, as passed to `vertex_attrib_pointer` and `draw_elements`.
    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub fn target(&self) -> BufferTarget {
        self.target
    }

    /// Number of bytes uploaded.
    pub fn byte_length(&self) -> usize {
        self.byte_length
    }
}

/// A typed, strided view over a [`Buffer`], bound to one shader input.
///
/// # Fields
/// - `buffer`: The buffer the view reads from.
/// - `name`: The shader input it feeds.
/// - `layout`: Component count and type, stride and byte offset.
/// - `count`: Number of vertices the view covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attribute {
    buffer: Buffer,
    name: AttributeName,
    layout: AttributeLayout,
    count: u32,
}

impl Attribute {
    pub fn new(buffer: Buffer, name: AttributeName, layout: AttributeLayout, count: u32) -> Self {
        Self {
            buffer,
            name,
            layout,
            count,
        }
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn name(&self) -> AttributeName {
        self.name
    }

    pub fn layout(&self) -> &AttributeLayout {
        &self.layout
    }

    /// Components per vertex, as given by the accessor type (`VEC3` is 3, `MAT4` is 16).
    pub fn size(&self) -> u32 {
        self.layout.size
    }

    pub fn component_type(&self) -> ComponentType {
        self.layout.component_type
    }

    /// Bytes between consecutive vertices.
    pub fn stride(&self) -> u32 {
        self.layout.stride
    }

    /// Byte offset of the first vertex within the buffer.
    pub fn offset(&self) -> u32 {
        self.layout.offset
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Points the attribute's shader input at the buffer. A no-op if the active program has no such input.
    pub fn attach(&self, context: &RenderContext, surface: &mut impl Surface) {
        if let Some(location) = context.locations.attribute(self.name) {
            surface.vertex_attrib_pointer(location, self.buffer.handle, self.layout);
        }
    }

    /// Disables the shader input `name`, so a draw does not read stale data bound by an earlier draw.
    pub fn detach(name: AttributeName, context: &RenderContext, surface: &mut impl Surface) {
        if let Some(location) = context.locations.attribute(name) {
            surface.disable_vertex_attrib(location);
        }
    }
}
