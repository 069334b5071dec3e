//! # Uniform Binding Module
//!
//! This module defines the `UniformBinding` struct, which binds per-draw [`UniformBuffer`] blocks to
//! the scene pipeline.
//!
//! ## Overview
//!
//! Every draw recorded during a frame carries its own uniform block. Rather than one buffer per draw,
//! all blocks of a frame are written back to back into a single buffer, each at a multiple of
//! [`UniformBinding::STRIDE`], and the bind group is bound with a dynamic offset selecting the block of the
//! current draw.
//!
//! - **Uniform buffer**: Holds `capacity` blocks. It is recreated, doubling in size, when a frame records
//!   more draws than it can hold.
//! - **Bind group**: Exposes one block-sized window of the buffer at binding 0.
//! - **Bind group layout**: Declares that window as a dynamic-offset uniform, visible to both shader stages.

use log::debug;

use crate::uniform_buffer::UniformBuffer;

pub struct UniformBinding {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
    capacity: usize,
}

impl UniformBinding {
    /// Distance between consecutive blocks; dynamic offsets must be multiples of 256.
    pub const STRIDE: wgpu::BufferAddress = UniformBuffer::SIZE.next_multiple_of(256);

    pub fn new(device: &wgpu::Device, capacity: usize) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(UniformBuffer::SIZE),
                },
                count: None,
            }],
            label: Some("uniform_bind_group_layout"),
        });

        let capacity = capacity.max(1);
        let (buffer, bind_group) = Self::allocate(device, &bind_group_layout, capacity);

        Self {
            buffer,
            bind_group,
            bind_group_layout,
            capacity,
        }
    }

    fn allocate(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Uniform Buffer"),
            size: Self::STRIDE * capacity as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(UniformBuffer::SIZE),
                }),
            }],
            label: Some("uniform_bind_group"),
        });

        (buffer, bind_group)
    }

    /// Writes one block per draw, growing the buffer first if needed. Block `i` lives at
    /// [`UniformBinding::offset`]`(i)`.
    pub fn update_buffer(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, blocks: &[UniformBuffer]) {
        if blocks.len() > self.capacity {
            let capacity = blocks.len().next_power_of_two();
            debug!("Growing uniform buffer from {} to {capacity} blocks", self.capacity);
            let (buffer, bind_group) = Self::allocate(device, &self.bind_group_layout, capacity);
            self.buffer = buffer;
            self.bind_group = bind_group;
            self.capacity = capacity;
        }

        for (index, block) in blocks.iter().enumerate() {
            queue.write_buffer(&self.buffer, Self::STRIDE * index as u64, bytemuck::bytes_of(block));
        }
    }

    /// Dynamic offset of block `index`.
    pub fn offset(index: usize) -> wgpu::DynamicOffset {
        (Self::STRIDE * index as u64) as wgpu::DynamicOffset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_are_aligned_for_dynamic_offsets() {
        assert_eq!(UniformBinding::STRIDE % 256, 0);
        assert!(UniformBinding::STRIDE >= UniformBuffer::SIZE);
        assert_eq!(UniformBinding::offset(3), 3 * UniformBinding::STRIDE as u32);
    }
}
