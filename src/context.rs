//! Shared per-renderer state written during the prepare pass and read during the render pass.

use crate::math::{Mat4, Vec4};
use crate::surface::{AttributeName, LightField, Location, Surface, UniformName, MAX_LIGHTS};

/// Uniform locations of one entry of the shader's light array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LightLocations {
    pub kind: Option<Location>,
    pub position: Option<Location>,
    pub direction: Option<Location>,
    pub color: Option<Location>,
}

/// Attribute and uniform locations, resolved once after the surface is initialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Locations {
    pub position: Option<Location>,
    pub normal: Option<Location>,
    pub vertex_color: Option<Location>,
    pub color: Option<Location>,
    pub ambient_color: Option<Location>,
    pub model_transform: Option<Location>,
    pub vp_transform: Option<Location>,
    pub normal_transform: Option<Location>,
    pub lights: [LightLocations; MAX_LIGHTS],
}

impl Locations {
    pub fn resolve(surface: &impl Surface) -> Self {
        let light = |index| LightLocations {
            kind: surface.uniform_location(UniformName::Light(index, LightField::Kind)),
            position: surface.uniform_location(UniformName::Light(index, LightField::Position)),
            direction: surface.uniform_location(UniformName::Light(index, LightField::Direction)),
            color: surface.uniform_location(UniformName::Light(index, LightField::Color)),
        };

        Self {
            position: surface.attribute_location(AttributeName::Position),
            normal: surface.attribute_location(AttributeName::Normal),
            vertex_color: surface.attribute_location(AttributeName::Color),
            color: surface.uniform_location(UniformName::Color),
            ambient_color: surface.uniform_location(UniformName::AmbientColor),
            model_transform: surface.uniform_location(UniformName::ModelTransform),
            vp_transform: surface.uniform_location(UniformName::VpTransform),
            normal_transform: surface.uniform_location(UniformName::NormalTransform),
            lights: std::array::from_fn(light),
        }
    }

    pub fn attribute(&self, name: AttributeName) -> Option<Location> {
        match name {
            AttributeName::Position => self.position,
            AttributeName::Normal => self.normal,
            AttributeName::Color => self.vertex_color,
        }
    }
}

/// The rendering context: current view and view-projection transforms, plus the location table.
///
/// Cameras write the transforms during prepare; primitives read them during render. The context lives as
/// long as the renderer and is never reset mid-session.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub vp_transform: Mat4,
    pub view_transform: Mat4,
    pub locations: Locations,
}

impl RenderContext {
    pub fn new(locations: Locations) -> Self {
        Self {
            vp_transform: Mat4::identity(),
            view_transform: Mat4::identity(),
            locations,
        }
    }

    pub fn set_vec4(surface: &mut impl Surface, location: Option<Location>, value: Vec4) {
        if let Some(location) = location {
            surface.uniform_4fv(location, value);
        }
    }

    pub fn set_matrix(surface: &mut impl Surface, location: Option<Location>, value: &Mat4) {
        if let Some(location) = location {
            surface.uniform_matrix_4fv(location, value);
        }
    }

    pub fn set_int(surface: &mut impl Surface, location: Option<Location>, value: i32) {
        if let Some(location) = location {
            surface.uniform_1i(location, value);
        }
    }

    /// Marks every light slot as empty; lights present in the scene overwrite their own slot afterwards.
    pub fn reset_lights(&self, surface: &mut impl Surface) {
        for slot in &self.locations.lights {
            Self::set_int(surface, slot.kind, 0);
        }
    }
}
