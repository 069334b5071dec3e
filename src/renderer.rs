//! # Renderer Module
//!
//! The `renderer` module implements the [`Surface`] boundary on top of wgpu, so the engine's scene graph
//! can be drawn to a window.
//!
//! ## Overview
//!
//! The surface boundary is stateful in the style of a GL context: attributes and uniforms are set, then
//! a draw consumes them. wgpu instead records immutable state into command buffers. The [`Renderer`]
//! bridges the two:
//!
//! - **Recording**: surface calls update a current [`UniformBuffer`] block and a table of bound vertex
//!   slots. Each draw call snapshots both into a [`DrawCommand`].
//! - **Presenting**: [`Renderer::present`] uploads every snapshot into the dynamic-offset
//!   [`UniformBinding`], makes sure a pipeline exists for every recorded key, then replays the draws in
//!   one render pass against the swap chain image and the depth buffer.
//!
//! Attributes the current primitive does not provide (normals, vertex colors) are fed from constant
//! one-element buffers stepped per instance: a zero normal (which the shader draws unlit) and a white
//! color.
//!
//! Draws wgpu cannot express are skipped with a warning: line loops, triangle fans, 8-bit indices and
//! non-float attributes.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use lumen_core::{Engine, Renderer, SurfaceError};
//!
//! async fn draw_once(window: std::sync::Arc<winit::window::Window>) -> Result<(), SurfaceError> {
//!     let renderer = Renderer::new(window, 1280, 720).await?;
//!     let mut engine = Engine::new(renderer);
//!     // ... load a scene ...
//!     if engine.render().is_ok() {
//!         engine.surface_mut().present()?;
//!     }
//!     Ok(())
//! }
//! ```

use log::{debug, warn};
use wgpu::util::DeviceExt;

use crate::error::SurfaceError;
use crate::gpu::Gpu;
use crate::math::{Mat4, Vec4};
use crate::pipeline::{index_format, topology, PipelineCache, PipelineKey, SlotLayout};
use crate::surface::{
    AttributeLayout, AttributeName, BufferHandle, BufferTarget, ComponentType, DrawMode, Location, Surface,
    UniformName,
};
use crate::uniform_binding::UniformBinding;
use crate::uniform_buffer::UniformBuffer;

/// What a vertex slot currently reads from.
#[derive(Debug, Clone, Copy)]
enum SlotState {
    Disabled,
    Bound {
        buffer: BufferHandle,
        offset: wgpu::BufferAddress,
        layout: SlotLayout,
    },
    /// Bound to data wgpu cannot read; draws are skipped until the slot is rebound.
    Unsupported,
}

#[derive(Debug, Clone, Copy)]
enum VertexSource {
    Buffer {
        buffer: BufferHandle,
        offset: wgpu::BufferAddress,
    },
    Constant(AttributeName),
}

#[derive(Debug, Clone, Copy)]
enum DrawKind {
    Arrays {
        first: u32,
        count: u32,
    },
    Elements {
        buffer: BufferHandle,
        format: wgpu::IndexFormat,
        offset: wgpu::BufferAddress,
        count: u32,
    },
}

/// One recorded draw, with the uniform state it was issued under.
#[derive(Debug, Clone, Copy)]
struct DrawCommand {
    key: PipelineKey,
    uniforms: UniformBuffer,
    sources: [VertexSource; 3],
    kind: DrawKind,
}

/// A wgpu-backed [`Surface`].
///
/// # Fields
/// - `gpu`: Surface, device and queue.
/// - `depth_texture_view`: Depth attachment matching the surface size.
/// - `uniform`: Per-draw uniform blocks, bound with dynamic offsets.
/// - `pipelines`: One render pipeline per topology and vertex layout combination.
/// - `buffers`: Every buffer created through the surface, indexed by handle. Deleted slots hold `None`.
/// - `constant_normal`, `constant_color`: Fallbacks for attributes a primitive does not provide.
pub struct Renderer {
    gpu: Gpu,
    depth_texture_view: wgpu::TextureView,
    uniform: UniformBinding,
    pipelines: PipelineCache,
    buffers: Vec<Option<wgpu::Buffer>>,
    constant_normal: wgpu::Buffer,
    constant_color: wgpu::Buffer,
    current: UniformBuffer,
    slots: [SlotState; 3],
    clear_color: wgpu::Color,
    draws: Vec<DrawCommand>,
}

impl Renderer {
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<Self, SurfaceError> {
        let gpu = Gpu::new_async(window, width, height).await?;
        let depth_texture_view = gpu.create_depth_texture(width, height);
        let uniform = UniformBinding::new(&gpu.device, 64);
        let pipelines = PipelineCache::new(&gpu.device, gpu.surface_format, &uniform);

        let constant = |label, value: [f32; 4]| {
            gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&value),
                usage: wgpu::BufferUsages::VERTEX,
            })
        };
        let constant_normal = constant("Constant Normal", [0.0; 4]);
        let constant_color = constant("Constant Color", [1.0; 4]);

        Ok(Self {
            gpu,
            depth_texture_view,
            uniform,
            pipelines,
            buffers: Vec::new(),
            constant_normal,
            constant_color,
            current: UniformBuffer::default(),
            slots: [SlotState::Disabled; 3],
            clear_color: wgpu::Color::BLACK,
            draws: Vec::new(),
        })
    }

    pub fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.gpu.aspect_ratio()
    }

    /// Submits every draw recorded since the last call and presents the frame.
    pub fn present(&mut self) -> Result<(), SurfaceError> {
        let draws = std::mem::take(&mut self.draws);

        let blocks: Vec<UniformBuffer> = draws.iter().map(|draw| draw.uniforms).collect();
        self.uniform.update_buffer(&self.gpu.device, &self.gpu.queue, &blocks);
        for draw in &draws {
            self.pipelines.prepare(&self.gpu.device, draw.key);
        }

        let surface_texture = match self.gpu.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                debug!("Surface outdated, reconfiguring");
                let (width, height) = (self.gpu.surface_config.width, self.gpu.surface_config.height);
                self.gpu.resize(width, height);
                return Ok(());
            }
            Err(e) => return Err(SurfaceError::Frame(e.to_string())),
        };

        let surface_texture_view = surface_texture.texture.create_view(&wgpu::TextureViewDescriptor {
            format: Some(self.gpu.surface_format),
            ..Default::default()
        });

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        encoder.insert_debug_marker("Render scene");

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for (index, draw) in draws.iter().enumerate() {
                let Some(pipeline) = self.pipelines.get(&draw.key) else {
                    continue;
                };
                let live = |handle: BufferHandle| self.buffers.get(handle.0 as usize).and_then(Option::as_ref);

                let mut slices = Vec::with_capacity(draw.sources.len());
                for source in &draw.sources {
                    slices.push(match *source {
                        VertexSource::Buffer { buffer, offset } => live(buffer).map(|b| b.slice(offset..)),
                        VertexSource::Constant(AttributeName::Normal) => Some(self.constant_normal.slice(..)),
                        VertexSource::Constant(_) => Some(self.constant_color.slice(..)),
                    });
                }
                let Some(slices) = slices.into_iter().collect::<Option<Vec<_>>>() else {
                    warn!("Skipping draw {index}: a vertex buffer was deleted");
                    continue;
                };

                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &self.uniform.bind_group, &[UniformBinding::offset(index)]);
                for (slot, slice) in slices.into_iter().enumerate() {
                    render_pass.set_vertex_buffer(slot as u32, slice);
                }

                match draw.kind {
                    DrawKind::Arrays { first, count } => render_pass.draw(first..first + count, 0..1),
                    DrawKind::Elements {
                        buffer,
                        format,
                        offset,
                        count,
                    } => {
                        let Some(indices) = live(buffer) else {
                            warn!("Skipping draw {index}: its index buffer was deleted");
                            continue;
                        };
                        render_pass.set_index_buffer(indices.slice(offset..), format);
                        render_pass.draw_indexed(0..count, 0, 0..1);
                    }
                }
            }
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        Ok(())
    }

    /// Snapshots the current state into a draw command, or explains why it cannot be drawn.
    fn record(&mut self, mode: DrawMode, kind: DrawKind) {
        let Some(topology) = topology(mode) else {
            warn!("Skipping draw: {mode:?} has no wgpu topology");
            return;
        };

        let mut layouts = [SlotLayout::CONSTANT; 3];
        let mut sources = [VertexSource::Constant(AttributeName::Color); 3];
        for name in AttributeName::ALL {
            let slot = name.slot() as usize;
            match self.slots[slot] {
                SlotState::Bound { buffer, offset, layout } => {
                    layouts[slot] = layout;
                    sources[slot] = VertexSource::Buffer { buffer, offset };
                }
                SlotState::Disabled if name != AttributeName::Position => {
                    sources[slot] = VertexSource::Constant(name);
                }
                SlotState::Disabled => {
                    warn!("Skipping draw: no position attribute bound");
                    return;
                }
                SlotState::Unsupported => {
                    warn!("Skipping draw: {name:?} attribute has an unsupported format");
                    return;
                }
            }
        }

        self.draws.push(DrawCommand {
            key: PipelineKey {
                topology,
                slots: layouts,
            },
            uniforms: self.current,
            sources,
            kind,
        });
    }

    fn has_buffer(&self, buffer: BufferHandle) -> bool {
        self.buffers.get(buffer.0 as usize).is_some_and(Option::is_some)
    }
}

impl Surface for Renderer {
    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> Result<BufferHandle, SurfaceError> {
        let usage = match target {
            BufferTarget::Vertex => wgpu::BufferUsages::VERTEX,
            BufferTarget::Index => wgpu::BufferUsages::INDEX,
        };

        // The browser cannot block on an error scope; allocation failures there reach wgpu's
        // uncaptured-error handler instead.
        #[cfg(not(target_arch = "wasm32"))]
        self.gpu.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffer = self.gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scene Buffer"),
            contents: data,
            usage,
        });
        #[cfg(not(target_arch = "wasm32"))]
        if let Some(error) = pollster::block_on(self.gpu.device.pop_error_scope()) {
            warn!("Buffer allocation failed: {error}");
            return Err(SurfaceError::OutOfResources("buffer"));
        }

        let handle = BufferHandle(self.buffers.len() as u32);
        self.buffers.push(Some(buffer));
        Ok(handle)
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if let Some(deleted) = self.buffers.get_mut(buffer.0 as usize).and_then(Option::take) {
            deleted.destroy();
        }
    }

    fn attribute_location(&self, name: AttributeName) -> Option<Location> {
        Some(Location(name.slot()))
    }

    fn uniform_location(&self, name: UniformName) -> Option<Location> {
        Some(Location(name.code()))
    }

    fn vertex_attrib_pointer(&mut self, location: Location, buffer: BufferHandle, layout: AttributeLayout) {
        let known = self.has_buffer(buffer);
        let Some(state) = self.slots.get_mut(location.0 as usize) else {
            return;
        };

        *state = match SlotLayout::for_attribute(&layout) {
            Some(slot) if known => SlotState::Bound {
                buffer,
                offset: layout.offset as wgpu::BufferAddress,
                layout: slot,
            },
            _ => SlotState::Unsupported,
        };
    }

    fn disable_vertex_attrib(&mut self, location: Location) {
        if let Some(state) = self.slots.get_mut(location.0 as usize) {
            *state = SlotState::Disabled;
        }
    }

    fn uniform_1i(&mut self, location: Location, value: i32) {
        if let Some(uniform) = UniformName::from_code(location.0) {
            self.current.set_int(uniform, value);
        }
    }

    fn uniform_4fv(&mut self, location: Location, value: Vec4) {
        if let Some(uniform) = UniformName::from_code(location.0) {
            self.current.set_vec4(uniform, value);
        }
    }

    fn uniform_matrix_4fv(&mut self, location: Location, value: &Mat4) {
        if let Some(uniform) = UniformName::from_code(location.0) {
            self.current.set_matrix(uniform, value);
        }
    }

    fn draw_arrays(&mut self, mode: DrawMode, first: u32, count: u32) {
        self.record(mode, DrawKind::Arrays { first, count });
    }

    fn draw_elements(
        &mut self,
        mode: DrawMode,
        buffer: BufferHandle,
        count: u32,
        index_type: ComponentType,
        offset: u32,
    ) {
        let Some(format) = index_format(index_type) else {
            warn!("Skipping draw: {index_type:?} indices are not supported");
            return;
        };
        if !self.has_buffer(buffer) {
            warn!("Skipping draw: unknown index buffer {buffer:?}");
            return;
        }

        self.record(
            mode,
            DrawKind::Elements {
                buffer,
                format,
                offset: offset as wgpu::BufferAddress,
                count,
            },
        );
    }

    fn clear(&mut self, color: Vec4) {
        self.clear_color = wgpu::Color {
            r: color.x() as f64,
            g: color.y() as f64,
            b: color.z() as f64,
            a: color.w() as f64,
        };
    }

    fn viewport(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.gpu.resize(width, height);
        self.depth_texture_view = self.gpu.create_depth_texture(width, height);
    }
}
