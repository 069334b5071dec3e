//! # Headless Surface
//!
//! A [`Surface`] that draws nothing and instead records every call it receives, in order. It backs the
//! `--headless` mode of the binary and lets tests assert exactly what a prepare/render traversal asked
//! the graphics layer to do.
//!
//! ```
//! use lumen_core::{HeadlessSurface, Surface, SurfaceCall, BufferTarget};
//!
//! let mut surface = HeadlessSurface::new();
//! let handle = surface.create_buffer(BufferTarget::Vertex, &[0; 12]).unwrap();
//! assert!(matches!(surface.calls()[0], SurfaceCall::CreateBuffer { handle: h, .. } if h == handle));
//! ```

use crate::error::SurfaceError;
use crate::math::{Mat4, Vec4};
use crate::surface::{
    AttributeLayout, AttributeName, BufferHandle, BufferTarget, ComponentType, DrawMode, Location, Surface,
    UniformName,
};

/// One recorded surface call, with locations decoded back to names.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    CreateBuffer {
        handle: BufferHandle,
        target: BufferTarget,
        byte_length: usize,
    },
    DeleteBuffer {
        handle: BufferHandle,
    },
    VertexAttribPointer {
        attribute: AttributeName,
        buffer: BufferHandle,
        layout: AttributeLayout,
    },
    DisableVertexAttrib {
        attribute: AttributeName,
    },
    Uniform1i {
        uniform: UniformName,
        value: i32,
    },
    Uniform4fv {
        uniform: UniformName,
        value: Vec4,
    },
    UniformMatrix4fv {
        uniform: UniformName,
        value: Mat4,
    },
    DrawArrays {
        mode: DrawMode,
        first: u32,
        count: u32,
    },
    DrawElements {
        mode: DrawMode,
        buffer: BufferHandle,
        count: u32,
        index_type: ComponentType,
        offset: u32,
    },
    Clear {
        color: Vec4,
    },
    Viewport {
        width: u32,
        height: u32,
    },
}

impl SurfaceCall {
    pub fn is_draw(&self) -> bool {
        matches!(self, Self::DrawArrays { .. } | Self::DrawElements { .. })
    }
}

/// A recording surface that keeps buffer contents in memory.
///
/// # Fields
/// - `buffers`: Contents of every buffer ever created, indexed by handle; deleted ones are `None`.
/// - `calls`: Every call received since creation or the last [`HeadlessSurface::clear_calls`].
/// - `buffer_limit`: Number of allocations after which `create_buffer` fails.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    buffers: Vec<Option<(BufferTarget, Vec<u8>)>>,
    calls: Vec<SurfaceCall>,
    buffer_limit: Option<usize>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface that runs out of buffers after `limit` allocations.
    pub fn with_buffer_limit(limit: usize) -> Self {
        Self {
            buffer_limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    pub fn draw_calls(&self) -> impl Iterator<Item = &SurfaceCall> {
        self.calls.iter().filter(|call| call.is_draw())
    }

    /// Forgets the recorded calls; buffers are kept.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn buffer_data(&self, handle: BufferHandle) -> Option<&[u8]> {
        self.buffers
            .get(handle.0 as usize)
            .and_then(Option::as_ref)
            .map(|(_, data)| data.as_slice())
    }

    /// Number of buffers created and not deleted.
    pub fn buffer_count(&self) -> usize {
        self.buffers.iter().flatten().count()
    }

    /// Most recent value written to a matrix uniform.
    pub fn last_matrix(&self, uniform: UniformName) -> Option<Mat4> {
        self.calls.iter().rev().find_map(|call| match call {
            SurfaceCall::UniformMatrix4fv { uniform: u, value } if *u == uniform => Some(*value),
            _ => None,
        })
    }

    /// Most recent value written to a vector uniform.
    pub fn last_vec4(&self, uniform: UniformName) -> Option<Vec4> {
        self.calls.iter().rev().find_map(|call| match call {
            SurfaceCall::Uniform4fv { uniform: u, value } if *u == uniform => Some(*value),
            _ => None,
        })
    }

    /// Most recent value written to an integer uniform.
    pub fn last_int(&self, uniform: UniformName) -> Option<i32> {
        self.calls.iter().rev().find_map(|call| match call {
            SurfaceCall::Uniform1i { uniform: u, value } if *u == uniform => Some(*value),
            _ => None,
        })
    }

    fn uniform(location: Location) -> UniformName {
        // Locations only ever come from `uniform_location`, which encodes a valid name.
        UniformName::from_code(location.0).unwrap_or(UniformName::Color)
    }

    fn attribute(location: Location) -> AttributeName {
        AttributeName::from_slot(location.0).unwrap_or(AttributeName::Position)
    }
}

impl Surface for HeadlessSurface {
    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> Result<BufferHandle, SurfaceError> {
        if self.buffer_limit.is_some_and(|limit| self.buffers.len() >= limit) {
            return Err(SurfaceError::OutOfResources("buffer"));
        }

        let handle = BufferHandle(self.buffers.len() as u32);
        self.buffers.push(Some((target, data.to_vec())));
        self.calls.push(SurfaceCall::CreateBuffer {
            handle,
            target,
            byte_length: data.len(),
        });
        Ok(handle)
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if let Some(slot) = self.buffers.get_mut(buffer.0 as usize) {
            *slot = None;
        }
        self.calls.push(SurfaceCall::DeleteBuffer { handle: buffer });
    }

    fn attribute_location(&self, name: AttributeName) -> Option<Location> {
        Some(Location(name.slot()))
    }

    fn uniform_location(&self, name: UniformName) -> Option<Location> {
        Some(Location(name.code()))
    }

    fn vertex_attrib_pointer(&mut self, location: Location, buffer: BufferHandle, layout: AttributeLayout) {
        self.calls.push(SurfaceCall::VertexAttribPointer {
            attribute: Self::attribute(location),
            buffer,
            layout,
        });
    }

    fn disable_vertex_attrib(&mut self, location: Location) {
        self.calls.push(SurfaceCall::DisableVertexAttrib {
            attribute: Self::attribute(location),
        });
    }

    fn uniform_1i(&mut self, location: Location, value: i32) {
        self.calls.push(SurfaceCall::Uniform1i {
            uniform: Self::uniform(location),
            value,
        });
    }

    fn uniform_4fv(&mut self, location: Location, value: Vec4) {
        self.calls.push(SurfaceCall::Uniform4fv {
            uniform: Self::uniform(location),
            value,
        });
    }

    fn uniform_matrix_4fv(&mut self, location: Location, value: &Mat4) {
        self.calls.push(SurfaceCall::UniformMatrix4fv {
            uniform: Self::uniform(location),
            value: *value,
        });
    }

    fn draw_arrays(&mut self, mode: DrawMode, first: u32, count: u32) {
        self.calls.push(SurfaceCall::DrawArrays { mode, first, count });
    }

    fn draw_elements(
        &mut self,
        mode: DrawMode,
        buffer: BufferHandle,
        count: u32,
        index_type: ComponentType,
        offset: u32,
    ) {
        self.calls.push(SurfaceCall::DrawElements {
            mode,
            buffer,
            count,
            index_type,
            offset,
        });
    }

    fn clear(&mut self, color: Vec4) {
        self.calls.push(SurfaceCall::Clear { color });
    }

    fn viewport(&mut self, width: u32, height: u32) {
        self.calls.push(SurfaceCall::Viewport { width, height });
    }
}
