//! # Uniform Buffer
//!
//! This module defines the `UniformBuffer` struct: the CPU-side copy of the uniform block the scene
//! shader reads (`shader_source.wgsl`). One block is captured per draw call.
//!
//! ## Design
//!
//! | Field     | WGSL type            | Written by                                 |
//! |-----------|----------------------|--------------------------------------------|
//! | `model`   | `mat4x4<f32>`        | primitives and triangles                   |
//! | `vp`      | `mat4x4<f32>`        | primitives and triangles (camera's result) |
//! | `normal`  | `mat4x4<f32>`        | primitives and triangles                   |
//! | `color`   | `vec4<f32>`          | materials                                  |
//! | `ambient` | `vec4<f32>`          | the scene                                  |
//! | `lights`  | `array<Light, 4>`    | lights, one slot each                      |
//!
//! ### Memory Layout and Traits
//!
//! - `#[repr(C)]`: Field order and padding match the WGSL declaration.
//! - `bytemuck::Pod` and `bytemuck::Zeroable`: The block uploads as raw bytes.
//!
//! Each [`LightUniform`] is padded to 64 bytes, the array stride WGSL assigns to the `Light` struct.

use crate::math::{Mat4, Vec4};
use crate::surface::{LightField, UniformName, MAX_LIGHTS};

/// One slot of the shader's light array. `kind` 0 marks an empty slot.
#[repr(C)]
#[derive(Default, Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub position: [f32; 4],
    pub direction: [f32; 4],
    pub color: [f32; 4],
    pub kind: i32,
    pub _pad: [i32; 3],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct UniformBuffer {
    pub model: nalgebra_glm::Mat4,
    pub vp: nalgebra_glm::Mat4,
    pub normal: nalgebra_glm::Mat4,
    pub color: [f32; 4],
    pub ambient: [f32; 4],
    pub lights: [LightUniform; MAX_LIGHTS],
}

impl Default for UniformBuffer {
    fn default() -> Self {
        Self {
            model: nalgebra_glm::identity(),
            vp: nalgebra_glm::identity(),
            normal: nalgebra_glm::identity(),
            color: [1.0; 4],
            ambient: [0.0, 0.0, 0.0, 1.0],
            lights: [LightUniform::default(); MAX_LIGHTS],
        }
    }
}

impl UniformBuffer {
    pub const SIZE: u64 = std::mem::size_of::<UniformBuffer>() as u64;

    pub fn set_matrix(&mut self, uniform: UniformName, value: &Mat4) {
        let slot = match uniform {
            UniformName::ModelTransform => &mut self.model,
            UniformName::VpTransform => &mut self.vp,
            UniformName::NormalTransform => &mut self.normal,
            _ => return,
        };
        *slot = *value.as_glm();
    }

    pub fn set_vec4(&mut self, uniform: UniformName, value: Vec4) {
        let slot = match uniform {
            UniformName::Color => &mut self.color,
            UniformName::AmbientColor => &mut self.ambient,
            UniformName::Light(index, field) if index < MAX_LIGHTS => match field {
                LightField::Position => &mut self.lights[index].position,
                LightField::Direction => &mut self.lights[index].direction,
                LightField::Color => &mut self.lights[index].color,
                LightField::Kind => return,
            },
            _ => return,
        };
        *slot = value.as_array();
    }

    pub fn set_int(&mut self, uniform: UniformName, value: i32) {
        if let UniformName::Light(index, LightField::Kind) = uniform {
            if index < MAX_LIGHTS {
                self.lights[index].kind = value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_the_shader_block() {
        assert_eq!(std::mem::size_of::<LightUniform>(), 64);
        assert_eq!(UniformBuffer::SIZE, 3 * 64 + 2 * 16 + 4 * 64);
    }

    #[test]
    fn writes_land_in_their_fields() {
        let mut block = UniformBuffer::default();

        block.set_matrix(UniformName::ModelTransform, &Mat4::translate(1.0, 2.0, 3.0));
        block.set_vec4(UniformName::Light(3, LightField::Color), Vec4::rgba(0.5, 0.5, 0.5, 1.0));
        block.set_int(UniformName::Light(3, LightField::Kind), 2);
        block.set_vec4(UniformName::Color, Vec4::rgba(1.0, 0.0, 0.0, 1.0));

        assert_eq!(block.model, *Mat4::translate(1.0, 2.0, 3.0).as_glm());
        assert_eq!(block.lights[3].color, [0.5, 0.5, 0.5, 1.0]);
        assert_eq!(block.lights[3].kind, 2);
        assert_eq!(block.color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(block.vp, nalgebra_glm::identity::<f32, 4>());
    }

    #[test]
    fn mismatched_writes_are_ignored() {
        let mut block = UniformBuffer::default();

        block.set_int(UniformName::Color, 7);
        block.set_vec4(UniformName::ModelTransform, Vec4::zero());

        assert_eq!(block, UniformBuffer::default());
    }
}
