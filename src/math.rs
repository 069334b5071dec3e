//! # Transform Math Kernel
//!
//! This module provides the two value types every other part of the engine is built on: [`Vec4`], a
//! homogeneous 4-component vector, and [`Mat4`], a 4×4 homogeneous transform. Both wrap the
//! `nalgebra-glm` types used for storage and arithmetic so they can be handed straight to the GPU through
//! `bytemuck`.
//!
//! ## Conventions
//!
//! - Vectors are column vectors. `a.times(b)` means "apply `b` first, then `a`", so a world transform is
//!   built as `parent.times(local)`.
//! - Entries are addressed as (row, column), both zero-based.
//! - Angle-taking constructors with a plain name (`rotate_x`, `rotate_y`, `rotate_z`) take **degrees**;
//!   the `_radians` variants and the projection constructors take radians.
//!
//! ## Example
//!
//! ```
//! use lumen_core::{Mat4, Vec4};
//!
//! let quarter_turn = Mat4::rotate_z(90.0);
//! let moved = Mat4::translate(1.0, 0.0, 0.0).times(quarter_turn);
//! let p = moved.times(Vec4::point(1.0, 0.0, 0.0));
//! assert!((p.x() - 1.0).abs() < 1e-5 && (p.y() - 1.0).abs() < 1e-5);
//! ```

use std::ops::{Mul, Neg};

use approx::{AbsDiffEq, RelativeEq};

/// Converts an angle in degrees to radians.
pub fn deg(theta: f32) -> f32 {
    theta * std::f32::consts::PI / 180.0
}

/// A 4-component column vector `(x, y, z, w)`.
///
/// Positions carry `w = 1`, directions `w = 0`, and colors are stored as RGBA in the same four slots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec4(nalgebra_glm::Vec4);

impl Vec4 {
    /// Creates a vector from its four components.
    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self(nalgebra_glm::vec4(x, y, z, w))
    }

    /// The zero vector.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// A position (`w = 1`).
    pub fn point(x: f32, y: f32, z: f32) -> Self {
        Self::new(x, y, z, 1.0)
    }

    /// A direction (`w = 0`).
    pub fn direction(x: f32, y: f32, z: f32) -> Self {
        Self::new(x, y, z, 0.0)
    }

    /// An RGBA color.
    pub fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::new(r, g, b, a)
    }

    pub fn from_array(components: [f32; 4]) -> Self {
        Self::new(components[0], components[1], components[2], components[3])
    }

    pub fn x(&self) -> f32 {
        self.0.x
    }

    pub fn y(&self) -> f32 {
        self.0.y
    }

    pub fn z(&self) -> f32 {
        self.0.z
    }

    pub fn w(&self) -> f32 {
        self.0.w
    }

    /// Scalar multiplication.
    pub fn times(&self, scalar: f32) -> Self {
        Self(self.0 * scalar)
    }

    pub fn negate(&self) -> Self {
        self.times(-1.0)
    }

    /// The components as `[x, y, z, w]`.
    pub fn as_array(&self) -> [f32; 4] {
        [self.0.x, self.0.y, self.0.z, self.0.w]
    }
}

impl Default for Vec4 {
    fn default() -> Self {
        Self::zero()
    }
}

impl Neg for Vec4 {
    type Output = Vec4;

    fn neg(self) -> Vec4 {
        self.negate()
    }
}

impl Mul<f32> for Vec4 {
    type Output = Vec4;

    fn mul(self, scalar: f32) -> Vec4 {
        self.times(scalar)
    }
}

impl From<[f32; 4]> for Vec4 {
    fn from(components: [f32; 4]) -> Self {
        Self::from_array(components)
    }
}

impl AbsDiffEq for Vec4 {
    type Epsilon = f32;

    fn default_epsilon() -> f32 {
        f32::EPSILON
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.0.abs_diff_eq(&other.0, epsilon)
    }
}

impl RelativeEq for Vec4 {
    fn default_max_relative() -> f32 {
        f32::EPSILON
    }

    fn relative_eq(&self, other: &Self, epsilon: f32, max_relative: f32) -> bool {
        self.0.relative_eq(&other.0, epsilon, max_relative)
    }
}

/// A 4×4 homogeneous transform.
///
/// The constructors mirror the transforms a scene needs: translation, quaternion and axis rotations,
/// scaling, and the two projection kinds of the interchange format. The chained `then_*` builders apply
/// the new transform **after** `self`, i.e. `m.then_translate(x, y, z) == Mat4::translate(x, y, z).times(m)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4(nalgebra_glm::Mat4);

impl Mat4 {
    /// Builds a matrix from 16 entries given row by row, which is the natural order when writing a matrix
    /// out in code.
    #[rustfmt::skip]
    pub fn from_rows(m: [f32; 16]) -> Self {
        Self(nalgebra_glm::Mat4::new(
            m[0],  m[1],  m[2],  m[3],
            m[4],  m[5],  m[6],  m[7],
            m[8],  m[9],  m[10], m[11],
            m[12], m[13], m[14], m[15],
        ))
    }

    /// Builds a matrix from 16 entries in column-major order, the layout used by the interchange format
    /// and by the GPU.
    pub fn from_columns(m: [f32; 16]) -> Self {
        Self(nalgebra_glm::Mat4::from_column_slice(&m))
    }

    pub fn identity() -> Self {
        Self(nalgebra_glm::Mat4::identity())
    }

    pub fn zero() -> Self {
        Self(nalgebra_glm::Mat4::zeros())
    }

    /// Translation by `(tx, ty, tz)`. Points move, directions do not.
    #[rustfmt::skip]
    pub fn translate(tx: f32, ty: f32, tz: f32) -> Self {
        Self::from_rows([
            1.0, 0.0, 0.0, tx,
            0.0, 1.0, 0.0, ty,
            0.0, 0.0, 1.0, tz,
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    /// Rotation by the unit quaternion `(qx, qy, qz, qw)`.
    #[rustfmt::skip]
    pub fn rotate(qx: f32, qy: f32, qz: f32, qw: f32) -> Self {
        Self::from_rows([
            1.0 - 2.0 * (qy * qy + qz * qz), 2.0 * (qx * qy - qw * qz),       2.0 * (qx * qz + qw * qy),       0.0,
            2.0 * (qx * qy + qw * qz),       1.0 - 2.0 * (qx * qx + qz * qz), 2.0 * (qy * qz - qw * qx),       0.0,
            2.0 * (qx * qz - qw * qy),       2.0 * (qy * qz + qw * qx),       1.0 - 2.0 * (qx * qx + qy * qy), 0.0,
            0.0,                             0.0,                             0.0,                             1.0,
        ])
    }

    /// Rotation by `angle` degrees about the positive x-axis.
    pub fn rotate_x(angle: f32) -> Self {
        Self::rotate_x_radians(deg(angle))
    }

    #[rustfmt::skip]
    pub fn rotate_x_radians(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::from_rows([
            1.0, 0.0,  0.0, 0.0,
            0.0, cos, -sin, 0.0,
            0.0, sin,  cos, 0.0,
            0.0, 0.0,  0.0, 1.0,
        ])
    }

    /// Rotation by `angle` degrees about the positive y-axis.
    pub fn rotate_y(angle: f32) -> Self {
        Self::rotate_y_radians(deg(angle))
    }

    #[rustfmt::skip]
    pub fn rotate_y_radians(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::from_rows([
             cos, 0.0, sin, 0.0,
             0.0, 1.0, 0.0, 0.0,
            -sin, 0.0, cos, 0.0,
             0.0, 0.0, 0.0, 1.0,
        ])
    }

    /// Rotation by `angle` degrees about the positive z-axis.
    pub fn rotate_z(angle: f32) -> Self {
        Self::rotate_z_radians(deg(angle))
    }

    #[rustfmt::skip]
    pub fn rotate_z_radians(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::from_rows([
            cos, -sin, 0.0, 0.0,
            sin,  cos, 0.0, 0.0,
            0.0,  0.0, 1.0, 0.0,
            0.0,  0.0, 0.0, 1.0,
        ])
    }

    /// Scaling by `(sx, sy, sz)`.
    #[rustfmt::skip]
    pub fn scale(sx: f32, sy: f32, sz: f32) -> Self {
        Self::from_rows([
            sx,  0.0, 0.0, 0.0,
            0.0, sy,  0.0, 0.0,
            0.0, 0.0, sz,  0.0,
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    /// Orthographic projection as defined by the interchange format.
    ///
    /// - `xmag`, `ymag`: half the width and height of the viewing volume.
    /// - `znear`, `zfar`: distances to the clipping planes.
    #[rustfmt::skip]
    pub fn orthographic(xmag: f32, ymag: f32, znear: f32, zfar: f32) -> Self {
        Self::from_rows([
            1.0 / xmag, 0.0,        0.0,                   0.0,
            0.0,        1.0 / ymag, 0.0,                   0.0,
            0.0,        0.0,        2.0 / (znear - zfar),  (zfar + znear) / (znear - zfar),
            0.0,        0.0,        0.0,                   1.0,
        ])
    }

    /// OpenGL-style perspective projection.
    ///
    /// `yfov` is the vertical field of view in radians. Without `zfar` the projection has an infinite far
    /// plane: the third row becomes `(0, 0, -1, -2·znear)` instead of the finite depth mapping.
    #[rustfmt::skip]
    pub fn perspective(aspect: f32, yfov: f32, znear: f32, zfar: Option<f32>) -> Self {
        let tan = (0.5 * yfov).tan();
        let n = znear;

        match zfar {
            Some(f) => Self::from_rows([
                1.0 / (aspect * tan), 0.0,       0.0,               0.0,
                0.0,                  1.0 / tan, 0.0,               0.0,
                0.0,                  0.0,       (f + n) / (n - f), 2.0 * f * n / (n - f),
                0.0,                  0.0,       -1.0,              0.0,
            ]),
            None => Self::from_rows([
                1.0 / (aspect * tan), 0.0,       0.0,  0.0,
                0.0,                  1.0 / tan, 0.0,  0.0,
                0.0,                  0.0,       -1.0, -2.0 * n,
                0.0,                  0.0,       -1.0, 0.0,
            ]),
        }
    }

    /// Returns the entry at row `i`, column `j`.
    pub fn at(&self, i: usize, j: usize) -> f32 {
        self.0[(i, j)]
    }

    /// Multiplies `self` by a matrix or a vector. For matrices the result applies `rhs` first, then `self`.
    pub fn times<T>(&self, rhs: T) -> <Self as Mul<T>>::Output
    where
        Self: Mul<T>,
    {
        *self * rhs
    }

    pub fn transpose(&self) -> Self {
        Self(self.0.transpose())
    }

    /// Inverse of a rigid transform (rotations and reflections followed by a translation): the transposed
    /// rotation block composed with the negated translation.
    ///
    /// The result is meaningless for matrices with scale, shear or projection; that is not checked.
    #[rustfmt::skip]
    pub fn inverse_rigid(&self) -> Self {
        let inverse_rotation = Self::from_rows([
            self.at(0, 0), self.at(1, 0), self.at(2, 0), 0.0,
            self.at(0, 1), self.at(1, 1), self.at(2, 1), 0.0,
            self.at(0, 2), self.at(1, 2), self.at(2, 2), 0.0,
            0.0,           0.0,           0.0,           1.0,
        ]);
        let inverse_translation = Self::translate(-self.at(0, 3), -self.at(1, 3), -self.at(2, 3));

        inverse_rotation.times(inverse_translation)
    }

    /// The transposed adjoint (cofactor matrix) of the upper-left 3×3 block, with translation zeroed.
    ///
    /// This is the transform to apply to normals: it is proportional to the inverse transpose, so normals
    /// stay perpendicular to surfaces under non-uniform scale.
    #[rustfmt::skip]
    pub fn adjoint_transpose(&self) -> Self {
        let m = |i, j| self.at(i, j);

        let c00 = m(1, 1) * m(2, 2) - m(1, 2) * m(2, 1);
        let c01 = m(1, 0) * m(2, 2) - m(1, 2) * m(2, 0);
        let c02 = m(1, 0) * m(2, 1) - m(1, 1) * m(2, 0);
        let c10 = m(0, 1) * m(2, 2) - m(0, 2) * m(2, 1);
        let c11 = m(0, 0) * m(2, 2) - m(0, 2) * m(2, 0);
        let c12 = m(0, 0) * m(2, 1) - m(0, 1) * m(2, 0);
        let c20 = m(0, 1) * m(1, 2) - m(0, 2) * m(1, 1);
        let c21 = m(0, 0) * m(1, 2) - m(0, 2) * m(1, 0);
        let c22 = m(0, 0) * m(1, 1) - m(0, 1) * m(1, 0);

        Self::from_rows([
             c00, -c01,  c02, 0.0,
            -c10,  c11, -c12, 0.0,
             c20, -c21,  c22, 0.0,
             0.0,  0.0,  0.0, 1.0,
        ])
    }

    /// Applies a translation after `self`.
    pub fn then_translate(&self, tx: f32, ty: f32, tz: f32) -> Self {
        Self::translate(tx, ty, tz).times(*self)
    }

    /// Applies a quaternion rotation after `self`.
    pub fn then_rotate(&self, qx: f32, qy: f32, qz: f32, qw: f32) -> Self {
        Self::rotate(qx, qy, qz, qw).times(*self)
    }

    /// Applies a scale after `self`.
    pub fn then_scale(&self, sx: f32, sy: f32, sz: f32) -> Self {
        Self::scale(sx, sy, sz).times(*self)
    }

    /// The entries in column-major order, ready for upload.
    pub fn as_array(&self) -> [f32; 16] {
        let mut entries = [0.0; 16];
        entries.copy_from_slice(self.0.as_slice());
        entries
    }

    /// The underlying `nalgebra-glm` matrix.
    pub fn as_glm(&self) -> &nalgebra_glm::Mat4 {
        &self.0
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul<Mat4> for Mat4 {
    type Output = Mat4;

    fn mul(self, rhs: Mat4) -> Mat4 {
        Mat4(self.0 * rhs.0)
    }
}

impl Mul<&Mat4> for Mat4 {
    type Output = Mat4;

    fn mul(self, rhs: &Mat4) -> Mat4 {
        Mat4(self.0 * rhs.0)
    }
}

impl Mul<Vec4> for Mat4 {
    type Output = Vec4;

    fn mul(self, rhs: Vec4) -> Vec4 {
        Vec4(self.0 * rhs.0)
    }
}

impl From<Mat4> for nalgebra_glm::Mat4 {
    fn from(m: Mat4) -> Self {
        m.0
    }
}

impl AbsDiffEq for Mat4 {
    type Epsilon = f32;

    fn default_epsilon() -> f32 {
        f32::EPSILON
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.0.abs_diff_eq(&other.0, epsilon)
    }
}

impl RelativeEq for Mat4 {
    fn default_max_relative() -> f32 {
        f32::EPSILON
    }

    fn relative_eq(&self, other: &Self, epsilon: f32, max_relative: f32) -> bool {
        self.0.relative_eq(&other.0, epsilon, max_relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const EPSILON: f32 = 1e-5;

    fn rigid_samples() -> Vec<Mat4> {
        vec![
            Mat4::identity(),
            Mat4::translate(1.0, -2.0, 3.5),
            Mat4::rotate_x(33.0),
            Mat4::translate(4.0, 5.0, -6.0).times(Mat4::rotate_y(-71.0)),
            Mat4::translate(0.5, 0.0, 2.0)
                .times(Mat4::rotate_z(120.0))
                .times(Mat4::rotate_x(10.0)),
            Mat4::rotate(0.0, 0.0, 0.382_683_4, 0.923_879_5).then_translate(-1.0, 2.0, 0.0),
            // reflection
            Mat4::scale(-1.0, 1.0, 1.0).then_translate(3.0, 0.0, 0.0),
        ]
    }

    #[test]
    fn quaternion_quarter_turn_about_z_maps_x_to_y() {
        let half = std::f32::consts::FRAC_1_SQRT_2;
        let rotation = Mat4::rotate(0.0, 0.0, half, half);

        let rotated = rotation.times(Vec4::direction(1.0, 0.0, 0.0));

        assert_abs_diff_eq!(rotated, Vec4::direction(0.0, 1.0, 0.0), epsilon = EPSILON);
        assert_abs_diff_eq!(rotation, Mat4::rotate_z(90.0), epsilon = EPSILON);
    }

    #[test]
    fn identity_quaternion_is_identity() {
        assert_abs_diff_eq!(Mat4::rotate(0.0, 0.0, 0.0, 1.0), Mat4::identity(), epsilon = EPSILON);
    }

    #[test]
    fn rigid_inverse_undoes_rigid_transforms() {
        for r in rigid_samples() {
            assert_abs_diff_eq!(r.times(r.inverse_rigid()), Mat4::identity(), epsilon = EPSILON);
            assert_abs_diff_eq!(r.inverse_rigid().times(r), Mat4::identity(), epsilon = EPSILON);
        }
    }

    #[test]
    fn multiplication_is_associative() {
        let a = Mat4::translate(1.0, 2.0, 3.0).times(Mat4::scale(2.0, 0.5, 1.0));
        let b = Mat4::rotate_y(37.0);
        let c = Mat4::perspective(1.5, deg(60.0), 0.1, Some(50.0));

        assert_abs_diff_eq!(
            a.times(b).times(c),
            a.times(b.times(c)),
            epsilon = EPSILON
        );
    }

    #[test]
    fn opposite_y_rotations_cancel() {
        for theta in [-270.0, -45.0, 0.0, 12.5, 90.0, 181.0] {
            assert_abs_diff_eq!(
                Mat4::rotate_y(theta).times(Mat4::rotate_y(-theta)),
                Mat4::identity(),
                epsilon = EPSILON
            );
        }
    }

    #[test]
    fn composition_applies_right_operand_first() {
        let m = Mat4::translate(10.0, 0.0, 0.0).times(Mat4::scale(2.0, 2.0, 2.0));
        let p = m.times(Vec4::point(1.0, 1.0, 1.0));

        assert_abs_diff_eq!(p, Vec4::point(12.0, 2.0, 2.0), epsilon = EPSILON);
    }

    #[test]
    fn translation_leaves_directions_alone() {
        let t = Mat4::translate(5.0, 6.0, 7.0);

        assert_abs_diff_eq!(
            t.times(Vec4::direction(0.0, 0.0, -1.0)),
            Vec4::direction(0.0, 0.0, -1.0),
            epsilon = EPSILON
        );
    }

    #[test]
    #[rustfmt::skip]
    fn finite_perspective_matches_reference() {
        let p = Mat4::perspective(1.0, deg(90.0), 0.1, Some(100.0));

        let reference = Mat4::from_rows([
            1.0, 0.0, 0.0,                0.0,
            0.0, 1.0, 0.0,                0.0,
            0.0, 0.0, -100.1 / 99.9,      -20.0 / 99.9,
            0.0, 0.0, -1.0,               0.0,
        ]);

        assert_abs_diff_eq!(p, reference, epsilon = EPSILON);
    }

    #[test]
    #[rustfmt::skip]
    fn infinite_perspective_matches_reference() {
        let p = Mat4::perspective(1.0, deg(90.0), 0.1, None);

        let reference = Mat4::from_rows([
            1.0, 0.0, 0.0,  0.0,
            0.0, 1.0, 0.0,  0.0,
            0.0, 0.0, -1.0, -0.2,
            0.0, 0.0, -1.0, 0.0,
        ]);

        assert_abs_diff_eq!(p, reference, epsilon = EPSILON);
        assert_ne!(p, Mat4::perspective(1.0, deg(90.0), 0.1, Some(1.0e6)));
    }

    #[test]
    fn orthographic_maps_volume_to_clip_cube() {
        let o = Mat4::orthographic(2.0, 1.0, 1.0, 11.0);

        let near_corner = o.times(Vec4::point(2.0, 1.0, -1.0));
        let far_corner = o.times(Vec4::point(-2.0, -1.0, -11.0));

        assert_abs_diff_eq!(near_corner, Vec4::point(1.0, 1.0, -1.0), epsilon = EPSILON);
        assert_abs_diff_eq!(far_corner, Vec4::point(-1.0, -1.0, 1.0), epsilon = EPSILON);
    }

    #[test]
    fn adjoint_transpose_keeps_normals_perpendicular_under_scale() {
        let model = Mat4::scale(4.0, 1.0, 1.0).then_translate(3.0, 3.0, 3.0);

        // A plane tilted 45 degrees in xy: tangent (1, -1, 0), normal (1, 1, 0).
        let tangent = model.times(Vec4::direction(1.0, -1.0, 0.0));
        let normal = model.adjoint_transpose().times(Vec4::direction(1.0, 1.0, 0.0));

        let dot = tangent.x() * normal.x() + tangent.y() * normal.y() + tangent.z() * normal.z();
        assert_abs_diff_eq!(dot, 0.0, epsilon = EPSILON);
        assert_abs_diff_eq!(normal.w(), 0.0, epsilon = EPSILON);
    }

    #[test]
    fn adjoint_transpose_of_rotation_is_the_rotation() {
        let r = Mat4::rotate_x(30.0).times(Mat4::rotate_z(-65.0));
        let with_translation = r.then_translate(1.0, 2.0, 3.0);

        assert_abs_diff_eq!(with_translation.adjoint_transpose(), r, epsilon = EPSILON);
    }

    #[test]
    fn chained_builders_apply_after_self() {
        let chained = Mat4::scale(2.0, 2.0, 2.0)
            .then_rotate(0.0, 0.0, 0.0, 1.0)
            .then_translate(1.0, 0.0, 0.0);
        let explicit = Mat4::translate(1.0, 0.0, 0.0).times(Mat4::scale(2.0, 2.0, 2.0));

        assert_abs_diff_eq!(chained, explicit, epsilon = EPSILON);
    }

    #[test]
    fn column_major_round_trip() {
        let m = Mat4::translate(1.0, 2.0, 3.0);
        let columns = m.as_array();

        assert_eq!(&columns[12..15], &[1.0, 2.0, 3.0]);
        assert_eq!(Mat4::from_columns(columns), m);
    }

    #[test]
    fn degrees_convert_to_radians() {
        assert_abs_diff_eq!(deg(180.0), std::f32::consts::PI, epsilon = EPSILON);
        assert_abs_diff_eq!(deg(-90.0), -std::f32::consts::FRAC_PI_2, epsilon = EPSILON);
    }
}
