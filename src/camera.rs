//! # Camera Module
//!
//! A [`Camera`] is a scene graph leaf holding a projection. It has no placement of its own: during the
//! prepare pass it receives the world transform of its parent node, inverts it into the view transform
//! and publishes `projection · view` to the [`RenderContext`] for every drawable rendered afterwards.
//!
//! Perspective cameras imported without an aspect ratio are *fitted*: their projection is rebuilt from
//! the viewport's aspect ratio whenever [`Camera::set_viewport_aspect`] is called. Until then they use
//! an aspect ratio of 1.

use crate::context::RenderContext;
use crate::math::Mat4;

/// Perspective parameters of a fitted camera.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Fit {
    yfov: f32,
    znear: f32,
    zfar: Option<f32>,
}

/// A pinhole camera.
///
/// # Fields
/// - `name`: Used by `select`.
/// - `projection`: Current projection matrix.
/// - `fit`: Set for cameras whose projection follows the viewport's aspect ratio.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    name: String,
    projection: Mat4,
    fit: Option<Fit>,
}

impl Camera {
    /// A camera with a fixed projection.
    pub fn new(name: impl Into<String>, projection: Mat4) -> Self {
        Self {
            name: name.into(),
            projection,
            fit: None,
        }
    }

    /// A perspective camera whose aspect ratio follows the viewport. `zfar` of `None` places the far
    /// plane at infinity.
    pub fn fitted(name: impl Into<String>, yfov: f32, znear: f32, zfar: Option<f32>) -> Self {
        Self {
            name: name.into(),
            projection: Mat4::perspective(1.0, yfov, znear, zfar),
            fit: Some(Fit { yfov, znear, zfar }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn projection(&self) -> &Mat4 {
        &self.projection
    }

    pub fn is_fitted(&self) -> bool {
        self.fit.is_some()
    }

    /// Rebuilds the projection of a fitted camera for `aspect` (width over height). Cameras with a fixed
    /// projection ignore it.
    pub fn set_viewport_aspect(&mut self, aspect: f32) {
        if let Some(Fit { yfov, znear, zfar }) = self.fit {
            self.projection = Mat4::perspective(aspect, yfov, znear, zfar);
        }
    }

    pub fn select(&self, name: &str) -> Option<&Camera> {
        (self.name == name).then_some(self)
    }

    /// Publishes the view and view-projection transforms derived from the inherited world transform.
    ///
    /// The world transform must be rigid. When a scene holds several cameras, the last one prepared wins.
    pub fn prepare(&self, world: &Mat4, context: &mut RenderContext) {
        let view = world.inverse_rigid();
        context.view_transform = view;
        context.vp_transform = self.projection.times(view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Locations;
    use crate::math::{deg, Vec4};
    use approx::assert_abs_diff_eq;

    #[test]
    fn view_projection_combines_projection_with_inverse_placement() {
        let projection = Mat4::perspective(1.0, deg(60.0), 0.1, Some(100.0));
        let camera = Camera::new("eye", projection);
        let world = Mat4::translate(0.0, 0.0, 5.0).times(Mat4::rotate_y(30.0));
        let mut context = RenderContext::new(Locations::default());

        camera.prepare(&world, &mut context);

        assert_abs_diff_eq!(context.view_transform.times(world), Mat4::identity(), epsilon = 1e-5);
        assert_abs_diff_eq!(
            context.vp_transform,
            projection.times(world.inverse_rigid()),
            epsilon = 1e-5
        );
    }

    #[test]
    fn camera_position_maps_to_view_origin() {
        let camera = Camera::new("eye", Mat4::identity());
        let world = Mat4::translate(3.0, -1.0, 2.0);
        let mut context = RenderContext::new(Locations::default());

        camera.prepare(&world, &mut context);

        assert_abs_diff_eq!(
            context.view_transform.times(Vec4::point(3.0, -1.0, 2.0)),
            Vec4::point(0.0, 0.0, 0.0),
            epsilon = 1e-5
        );
    }

    #[test]
    fn fitted_cameras_follow_the_viewport_aspect() {
        let mut fitted = Camera::fitted("wide", deg(45.0), 0.1, None);
        let mut fixed = Camera::new("fixed", Mat4::perspective(1.5, deg(45.0), 0.1, None));

        assert_eq!(*fitted.projection(), Mat4::perspective(1.0, deg(45.0), 0.1, None));

        fitted.set_viewport_aspect(2.0);
        fixed.set_viewport_aspect(2.0);

        assert!(fitted.is_fitted());
        assert_eq!(*fitted.projection(), Mat4::perspective(2.0, deg(45.0), 0.1, None));
        assert_eq!(*fixed.projection(), Mat4::perspective(1.5, deg(45.0), 0.1, None));
    }
}
