//! # Pipeline Cache
//!
//! wgpu bakes the primitive topology and the vertex buffer layouts into the render pipeline, while the
//! surface boundary lets every primitive choose its own. [`PipelineCache`] builds one pipeline per
//! distinct [`PipelineKey`] the first time it is seen and reuses it afterwards.
//!
//! The helper functions at the bottom translate surface-level descriptions (draw modes, attribute
//! layouts, index types) into their wgpu equivalents, returning `None` for what wgpu cannot express.

use std::collections::HashMap;

use log::debug;

use crate::gpu::DEPTH_FORMAT;
use crate::surface::{AttributeLayout, AttributeName, ComponentType, DrawMode};
use crate::uniform_binding::UniformBinding;
use crate::SHADER_SOURCE;

/// Layout of one vertex buffer slot. Slots are indexed by [`AttributeName::slot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotLayout {
    pub format: wgpu::VertexFormat,
    pub stride: wgpu::BufferAddress,
    pub step_mode: wgpu::VertexStepMode,
}

impl SlotLayout {
    /// The layout of a slot fed from a one-element constant buffer instead of real vertex data.
    pub const CONSTANT: SlotLayout = SlotLayout {
        format: wgpu::VertexFormat::Float32x4,
        stride: 16,
        step_mode: wgpu::VertexStepMode::Instance,
    };

    /// Per-vertex layout for an attribute, or `None` when its format has no wgpu counterpart.
    pub fn for_attribute(layout: &AttributeLayout) -> Option<Self> {
        Some(Self {
            format: vertex_format(layout)?,
            stride: layout.effective_stride() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
        })
    }
}

/// Everything that distinguishes one scene pipeline from another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub topology: wgpu::PrimitiveTopology,
    pub slots: [SlotLayout; AttributeName::ALL.len()],
}

pub struct PipelineCache {
    shader_module: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    surface_format: wgpu::TextureFormat,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl PipelineCache {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat, uniform: &UniformBinding) -> Self {
        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(std::borrow::Cow::Borrowed(SHADER_SOURCE)),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&uniform.bind_group_layout],
            push_constant_ranges: &[],
        });

        Self {
            shader_module,
            pipeline_layout,
            surface_format,
            pipelines: HashMap::new(),
        }
    }

    /// Builds the pipeline for `key` unless it already exists.
    pub fn prepare(&mut self, device: &wgpu::Device, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        debug!("Creating pipeline for {key:?}");
        let pipeline = self.create_pipeline(device, &key);
        self.pipelines.insert(key, pipeline);
    }

    pub fn get(&self, key: &PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(key)
    }

    fn create_pipeline(&self, device: &wgpu::Device, key: &PipelineKey) -> wgpu::RenderPipeline {
        let attributes: [[wgpu::VertexAttribute; 1]; 3] = std::array::from_fn(|slot| {
            [wgpu::VertexAttribute {
                format: key.slots[slot].format,
                offset: 0,
                shader_location: slot as u32,
            }]
        });
        let buffers: [wgpu::VertexBufferLayout; 3] = std::array::from_fn(|slot| wgpu::VertexBufferLayout {
            array_stride: key.slots[slot].stride,
            step_mode: key.slots[slot].step_mode,
            attributes: &attributes[slot],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene Pipeline"),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.shader_module,
                entry_point: Some("vertex_main"),
                buffers: &buffers,
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: key.topology,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
                unclipped_depth: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.shader_module,
                entry_point: Some("fragment_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview: None,
            cache: None,
        })
    }
}

/// wgpu has no line loops or triangle fans.
pub fn topology(mode: DrawMode) -> Option<wgpu::PrimitiveTopology> {
    match mode {
        DrawMode::Points => Some(wgpu::PrimitiveTopology::PointList),
        DrawMode::Lines => Some(wgpu::PrimitiveTopology::LineList),
        DrawMode::LineStrip => Some(wgpu::PrimitiveTopology::LineStrip),
        DrawMode::Triangles => Some(wgpu::PrimitiveTopology::TriangleList),
        DrawMode::TriangleStrip => Some(wgpu::PrimitiveTopology::TriangleStrip),
        DrawMode::LineLoop | DrawMode::TriangleFan => None,
    }
}

/// Only float attributes feed the shader's `vec4<f32>` inputs.
pub fn vertex_format(layout: &AttributeLayout) -> Option<wgpu::VertexFormat> {
    if layout.component_type != ComponentType::Float {
        return None;
    }
    match layout.size {
        1 => Some(wgpu::VertexFormat::Float32),
        2 => Some(wgpu::VertexFormat::Float32x2),
        3 => Some(wgpu::VertexFormat::Float32x3),
        4 => Some(wgpu::VertexFormat::Float32x4),
        _ => None,
    }
}

/// wgpu has no 8-bit indices.
pub fn index_format(component_type: ComponentType) -> Option<wgpu::IndexFormat> {
    match component_type {
        ComponentType::UnsignedShort => Some(wgpu::IndexFormat::Uint16),
        ComponentType::UnsignedInt => Some(wgpu::IndexFormat::Uint32),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(size: u32, component_type: ComponentType, stride: u32) -> AttributeLayout {
        AttributeLayout {
            size,
            component_type,
            normalized: false,
            stride,
            offset: 0,
        }
    }

    #[test]
    fn tightly_packed_attributes_get_their_natural_stride() {
        let slot = SlotLayout::for_attribute(&layout(3, ComponentType::Float, 0)).unwrap();

        assert_eq!(slot.format, wgpu::VertexFormat::Float32x3);
        assert_eq!(slot.stride, 12);
        assert_eq!(slot.step_mode, wgpu::VertexStepMode::Vertex);
    }

    #[test]
    fn interleaved_attributes_keep_their_stride() {
        let slot = SlotLayout::for_attribute(&layout(4, ComponentType::Float, 32)).unwrap();

        assert_eq!(slot.stride, 32);
    }

    #[test]
    fn unsupported_formats_and_modes_are_rejected() {
        assert!(vertex_format(&layout(3, ComponentType::UnsignedShort, 0)).is_none());
        assert!(vertex_format(&layout(9, ComponentType::Float, 0)).is_none());
        assert!(topology(DrawMode::LineLoop).is_none());
        assert!(topology(DrawMode::TriangleFan).is_none());
        assert!(index_format(ComponentType::UnsignedByte).is_none());
        assert_eq!(index_format(ComponentType::UnsignedInt), Some(wgpu::IndexFormat::Uint32));
        assert_eq!(topology(DrawMode::Triangles), Some(wgpu::PrimitiveTopology::TriangleList));
    }
}
