//! # Punctual Lights
//!
//! Lights publish their world-space state into one entry of the shader's fixed-size light array during
//! the prepare pass. The entry is chosen by the light's index, which is its position in the document's
//! light list; lights past [`MAX_LIGHTS`] are never published.

use crate::context::RenderContext;
use crate::math::{Mat4, Vec4};
use crate::surface::{Surface, MAX_LIGHTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    /// Lights the whole scene from one direction: the light's local -Z axis.
    Directional,
    /// Emits in all directions from the light's origin.
    Point,
}

impl LightKind {
    /// Value of the shader's `kind` field. 0 marks an empty slot.
    pub fn code(self) -> i32 {
        match self {
            Self::Directional => 1,
            Self::Point => 2,
        }
    }
}

/// A directional or point light.
///
/// # Fields
/// - `name`: The document name, used by [`Light::select`].
/// - `kind`: Directional or point.
/// - `color`: Emitted color. Intensity is not applied.
/// - `index`: Slot in the shader's light array.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    name: String,
    kind: LightKind,
    color: Vec4,
    index: usize,
}

impl Light {
    pub fn new(name: impl Into<String>, kind: LightKind, index: usize, color: Vec4) -> Self {
        Self {
            name: name.into(),
            kind,
            color,
            index,
        }
    }

    /// A light shining along its local -Z axis.
    pub fn directional(name: impl Into<String>, index: usize, color: Vec4) -> Self {
        Self::new(name, LightKind::Directional, index, color)
    }

    /// A light at its local origin.
    pub fn point(name: impl Into<String>, index: usize, color: Vec4) -> Self {
        Self::new(name, LightKind::Point, index, color)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> LightKind {
        self.kind
    }

    pub fn color(&self) -> Vec4 {
        self.color
    }

    /// Replaces the emitted color; takes effect at the next prepare pass.
    pub fn set_color(&mut self, color: Vec4) {
        self.color = color;
    }

    /// Slot in the light array. Lights at or past [`MAX_LIGHTS`] are never published.
    pub fn index(&self) -> usize {
        self.index
    }

    /// `Some(self)` when `name` matches.
    pub fn select(&self, name: &str) -> Option<&Light> {
        (self.name == name).then_some(self)
    }

    /// World-space position and direction for `world`. The direction points away from the lit surface.
    pub fn world_state(&self, world: &Mat4) -> (Vec4, Vec4) {
        match self.kind {
            LightKind::Directional => (
                Vec4::point(0.0, 0.0, 0.0),
                world.times(Vec4::direction(0.0, 0.0, -1.0)).negate(),
            ),
            LightKind::Point => (
                world.times(Vec4::point(0.0, 0.0, 0.0)),
                Vec4::direction(0.0, 0.0, 0.0),
            ),
        }
    }

    /// Writes position, direction, color and kind into this light's slot of the light array.
    pub fn prepare(&self, world: &Mat4, context: &RenderContext, surface: &mut impl Surface) {
        if self.index >= MAX_LIGHTS {
            return;
        }

        let slot = context.locations.lights[self.index];
        let (position, direction) = self.world_state(world);

        RenderContext::set_int(surface, slot.kind, self.kind.code());
        RenderContext::set_vec4(surface, slot.position, position);
        RenderContext::set_vec4(surface, slot.direction, direction);
        RenderContext::set_vec4(surface, slot.color, self.color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Locations;
    use crate::headless::HeadlessSurface;
    use crate::surface::{LightField, UniformName};
    use approx::assert_abs_diff_eq;

    #[test]
    fn directional_light_points_back_along_its_forward_axis() {
        let light = Light::directional("sun", 0, Vec4::rgba(1.0, 1.0, 1.0, 1.0));
        // Forward (-Z) rotated to point straight down.
        let world = Mat4::rotate_x(-90.0).then_translate(10.0, 10.0, 10.0);

        let (_, direction) = light.world_state(&world);

        assert_abs_diff_eq!(direction, Vec4::direction(0.0, 1.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn point_light_publishes_its_slot() {
        let mut surface = HeadlessSurface::new();
        let context = RenderContext::new(Locations::resolve(&surface));
        let light = Light::point("bulb", 2, Vec4::rgba(1.0, 0.5, 0.0, 1.0));

        light.prepare(&Mat4::translate(1.0, 2.0, 3.0), &context, &mut surface);

        assert_eq!(surface.last_int(UniformName::Light(2, LightField::Kind)), Some(2));
        assert_abs_diff_eq!(
            surface.last_vec4(UniformName::Light(2, LightField::Position)).unwrap(),
            Vec4::point(1.0, 2.0, 3.0),
            epsilon = 1e-6
        );
        assert_eq!(
            surface.last_vec4(UniformName::Light(2, LightField::Color)),
            Some(Vec4::rgba(1.0, 0.5, 0.0, 1.0))
        );
        assert_eq!(surface.last_int(UniformName::Light(0, LightField::Kind)), None);
    }

    #[test]
    fn lights_past_the_array_are_not_published() {
        let mut surface = HeadlessSurface::new();
        let context = RenderContext::new(Locations::resolve(&surface));
        let light = Light::point("extra", MAX_LIGHTS, Vec4::rgba(1.0, 1.0, 1.0, 1.0));

        light.prepare(&Mat4::identity(), &context, &mut surface);

        assert!(surface.calls().is_empty());
    }
}
