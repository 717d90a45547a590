// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Column-major 4×4 transform.
//!
//! This type covers the subset of projective 3-D transforms that draw-property
//! resolution needs (composition, inversion, flattening, and the handful of
//! classification predicates the surface rules depend on) without pulling in
//! a full linear-algebra crate.
//!
//! Element accessors use `(row, col)` order. Points are column vectors, so
//! `a * b` applies `b` first.

use core::ops::Mul;

use kurbo::Vec2;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// Tolerance used by the classification predicates.
const EPSILON: f64 = 1e-7;

/// A column-major 4×4 transform stored as `[[f64; 4]; 4]`.
///
/// Each inner array is one *column* of the matrix, matching the memory layout
/// used by GPU APIs and Core Animation's `CATransform3D`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform3d {
    /// Four columns, each a 4-element array `[x, y, z, w]`.
    pub cols: [[f64; 4]; 4],
}

impl Transform3d {
    /// The 4×4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a transform from four column arrays.
    #[inline]
    #[must_use]
    pub const fn from_cols(col0: [f64; 4], col1: [f64; 4], col2: [f64; 4], col3: [f64; 4]) -> Self {
        Self {
            cols: [col0, col1, col2, col3],
        }
    }

    /// Returns column `i` (0-based).
    ///
    /// # Panics
    ///
    /// Panics if `i >= 4`.
    #[inline]
    #[must_use]
    pub const fn col(self, i: usize) -> [f64; 4] {
        self.cols[i]
    }

    /// Returns the element at `row`, `col`.
    #[inline]
    #[must_use]
    pub const fn get(&self, row: usize, col: usize) -> f64 {
        self.cols[col][row]
    }

    /// Sets the element at `row`, `col`.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.cols[col][row] = value;
    }

    /// Creates a pure translation transform.
    #[inline]
    #[must_use]
    pub const fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [x, y, z, 1.0],
            ],
        }
    }

    /// Creates a 2-D translation transform.
    #[inline]
    #[must_use]
    pub const fn from_translation_2d(offset: Vec2) -> Self {
        Self::from_translation(offset.x, offset.y, 0.0)
    }

    /// Creates a non-uniform scale transform.
    #[inline]
    #[must_use]
    pub const fn from_scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            cols: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, sz, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a 2-D scale transform (z is left untouched).
    #[inline]
    #[must_use]
    pub const fn from_scale_2d(sx: f64, sy: f64) -> Self {
        Self::from_scale(sx, sy, 1.0)
    }

    /// Creates a rotation around the X axis (radians).
    #[inline]
    #[must_use]
    pub fn from_rotation_x(radians: f64) -> Self {
        let (s, c) = sin_cos(radians);
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, c, s, 0.0],
                [0.0, -s, c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation around the Y axis (radians).
    #[inline]
    #[must_use]
    pub fn from_rotation_y(radians: f64) -> Self {
        let (s, c) = sin_cos(radians);
        Self {
            cols: [
                [c, 0.0, -s, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [s, 0.0, c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation around the Z axis (radians).
    #[inline]
    #[must_use]
    pub fn from_rotation_z(radians: f64) -> Self {
        let (s, c) = sin_cos(radians);
        Self {
            cols: [
                [c, s, 0.0, 0.0],
                [-s, c, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a perspective projection with the eye at distance `depth`
    /// along +Z.
    #[inline]
    #[must_use]
    pub fn from_perspective(depth: f64) -> Self {
        let mut t = Self::IDENTITY;
        if depth != 0.0 {
            t.set(3, 2, -1.0 / depth);
        }
        t
    }

    /// Is this transform [finite]?
    ///
    /// [finite]: f64::is_finite
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cols.iter().flatten().all(|v| v.is_finite())
    }

    /// Is this transform [NaN]?
    ///
    /// [NaN]: f64::is_nan
    #[inline]
    #[must_use]
    pub fn is_nan(&self) -> bool {
        self.cols.iter().flatten().any(|v| v.is_nan())
    }

    /// Returns `true` if this is exactly the identity.
    #[inline]
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Returns `true` if the upper 3×3 is the identity and there is no
    /// perspective.
    #[must_use]
    pub fn is_identity_or_translation(&self) -> bool {
        let mut linear = *self;
        linear.cols[3] = [0.0, 0.0, 0.0, 1.0];
        linear.is_identity()
    }

    /// Like [`is_identity_or_translation`](Self::is_identity_or_translation),
    /// with whole-number translation components.
    #[must_use]
    pub fn is_identity_or_integer_translation(&self) -> bool {
        if !self.is_identity_or_translation() {
            return false;
        }
        let t = self.cols[3];
        t[0] == t[0].round() && t[1] == t[1].round() && t[2] == t[2].round()
    }

    /// Returns `true` if the transform has only scale and translation
    /// components.
    #[must_use]
    pub fn is_scale_or_translation(&self) -> bool {
        if self.has_perspective() {
            return false;
        }
        self.get(0, 1) == 0.0
            && self.get(0, 2) == 0.0
            && self.get(1, 0) == 0.0
            && self.get(1, 2) == 0.0
            && self.get(2, 0) == 0.0
            && self.get(2, 1) == 0.0
    }

    /// Returns `true` if the bottom row is anything other than `[0, 0, 0, 1]`.
    #[inline]
    #[must_use]
    pub fn has_perspective(&self) -> bool {
        self.get(3, 0) != 0.0
            || self.get(3, 1) != 0.0
            || self.get(3, 2) != 0.0
            || self.get(3, 3) != 1.0
    }

    /// Returns `true` if an axis-aligned 2-D rectangle stays axis-aligned
    /// after this transform (with z dropped).
    ///
    /// Only axis swaps and axis scales keep alignment, so every row and column
    /// of the upper 2×2 may hold at most one non-zero entry. Perspective that
    /// depends on x or y is conservatively treated as breaking alignment.
    #[must_use]
    pub fn preserves_2d_axis_alignment(&self) -> bool {
        if self.get(3, 0) != 0.0 || self.get(3, 1) != 0.0 {
            return false;
        }
        let nz = |v: f64| usize::from(v.abs() > EPSILON);
        let (a, b, c, d) = (
            nz(self.get(0, 0)),
            nz(self.get(0, 1)),
            nz(self.get(1, 0)),
            nz(self.get(1, 1)),
        );
        a + b <= 1 && c + d <= 1 && a + c <= 1 && b + d <= 1
    }

    /// Returns the determinant.
    #[must_use]
    pub fn determinant(&self) -> f64 {
        let m = self.flat();
        let inv0 = cofactor0(&m);
        let inv4 = cofactor4(&m);
        let inv8 = cofactor8(&m);
        let inv12 = cofactor12(&m);
        m[0] * inv0 + m[1] * inv4 + m[2] * inv8 + m[3] * inv12
    }

    /// Returns the inverse, or `None` if the matrix is singular or not finite.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        let m = self.flat();
        let mut inv = [0.0_f64; 16];

        inv[0] = cofactor0(&m);
        inv[4] = cofactor4(&m);
        inv[8] = cofactor8(&m);
        inv[12] = cofactor12(&m);

        let det = m[0] * inv[0] + m[1] * inv[4] + m[2] * inv[8] + m[3] * inv[12];
        if det == 0.0 || !det.is_finite() {
            return None;
        }

        inv[1] = -m[1] * m[10] * m[15] + m[1] * m[11] * m[14] + m[9] * m[2] * m[15]
            - m[9] * m[3] * m[14]
            - m[13] * m[2] * m[11]
            + m[13] * m[3] * m[10];
        inv[5] = m[0] * m[10] * m[15] - m[0] * m[11] * m[14] - m[8] * m[2] * m[15]
            + m[8] * m[3] * m[14]
            + m[12] * m[2] * m[11]
            - m[12] * m[3] * m[10];
        inv[9] = -m[0] * m[9] * m[15] + m[0] * m[11] * m[13] + m[8] * m[1] * m[15]
            - m[8] * m[3] * m[13]
            - m[12] * m[1] * m[11]
            + m[12] * m[3] * m[9];
        inv[13] = m[0] * m[9] * m[14] - m[0] * m[10] * m[13] - m[8] * m[1] * m[14]
            + m[8] * m[2] * m[13]
            + m[12] * m[1] * m[10]
            - m[12] * m[2] * m[9];
        inv[2] = m[1] * m[6] * m[15] - m[1] * m[7] * m[14] - m[5] * m[2] * m[15]
            + m[5] * m[3] * m[14]
            + m[13] * m[2] * m[7]
            - m[13] * m[3] * m[6];
        inv[6] = -m[0] * m[6] * m[15] + m[0] * m[7] * m[14] + m[4] * m[2] * m[15]
            - m[4] * m[3] * m[14]
            - m[12] * m[2] * m[7]
            + m[12] * m[3] * m[6];
        inv[10] = m[0] * m[5] * m[15] - m[0] * m[7] * m[13] - m[4] * m[1] * m[15]
            + m[4] * m[3] * m[13]
            + m[12] * m[1] * m[7]
            - m[12] * m[3] * m[5];
        inv[14] = -m[0] * m[5] * m[14] + m[0] * m[6] * m[13] + m[4] * m[1] * m[14]
            - m[4] * m[2] * m[13]
            - m[12] * m[1] * m[6]
            + m[12] * m[2] * m[5];
        inv[3] = -m[1] * m[6] * m[11] + m[1] * m[7] * m[10] + m[5] * m[2] * m[11]
            - m[5] * m[3] * m[10]
            - m[9] * m[2] * m[7]
            + m[9] * m[3] * m[6];
        inv[7] = m[0] * m[6] * m[11] - m[0] * m[7] * m[10] - m[4] * m[2] * m[11]
            + m[4] * m[3] * m[10]
            + m[8] * m[2] * m[7]
            - m[8] * m[3] * m[6];
        inv[11] = -m[0] * m[5] * m[11] + m[0] * m[7] * m[9] + m[4] * m[1] * m[11]
            - m[4] * m[3] * m[9]
            - m[8] * m[1] * m[7]
            + m[8] * m[3] * m[5];
        inv[15] = m[0] * m[5] * m[10] - m[0] * m[6] * m[9] - m[4] * m[1] * m[10]
            + m[4] * m[2] * m[9]
            + m[8] * m[1] * m[6]
            - m[8] * m[2] * m[5];

        let inv_det = 1.0 / det;
        let mut out = Self::IDENTITY;
        for (i, v) in inv.iter().enumerate() {
            out.cols[i / 4][i % 4] = v * inv_det;
        }
        out.is_finite().then_some(out)
    }

    /// Returns `true` if [`inverse`](Self::inverse) would succeed.
    #[inline]
    #[must_use]
    pub fn is_invertible(&self) -> bool {
        self.inverse().is_some()
    }

    /// Collapses the transform onto the z = 0 plane.
    ///
    /// The third row and column are cleared, except for the (2, 2) entry which
    /// becomes 1, so z inputs are ignored and z outputs vanish.
    #[must_use]
    pub fn flatten_to_2d(mut self) -> Self {
        self.set(2, 0, 0.0);
        self.set(2, 1, 0.0);
        self.set(0, 2, 0.0);
        self.set(1, 2, 0.0);
        self.set(2, 2, 1.0);
        self.set(3, 2, 0.0);
        self.set(2, 3, 0.0);
        self
    }

    /// Returns whether a forward-facing plane (normal `(0, 0, 1)`) shows its
    /// back face after this transform.
    ///
    /// Singular transforms are treated as not showing the back face.
    #[must_use]
    pub fn is_backface_visible(&self) -> bool {
        if self.is_identity() {
            return false;
        }
        // The transformed normal's z is the (2, 2) entry of the inverse
        // (the inverse-transpose applied to (0, 0, 1, 0)).
        match self.inverse() {
            Some(inv) => inv.get(2, 2) < -EPSILON,
            None => false,
        }
    }

    /// Returns the 2-D translation components.
    #[inline]
    #[must_use]
    pub const fn translation_2d(&self) -> Vec2 {
        Vec2::new(self.cols[3][0], self.cols[3][1])
    }

    /// Rounds the 2-D translation components to whole units.
    #[must_use]
    pub fn round_translation_2d(mut self) -> Self {
        self.cols[3][0] = self.cols[3][0].round();
        self.cols[3][1] = self.cols[3][1].round();
        self
    }

    /// Returns the x and y scale factors of the upper 2×2, as the lengths of
    /// its first two columns.
    ///
    /// Perspective transforms have no meaningful 2-D scale; `fallback` is
    /// returned for both axes instead.
    #[must_use]
    pub fn scale_components_2d(&self, fallback: f64) -> Vec2 {
        if self.has_perspective() {
            return Vec2::new(fallback, fallback);
        }
        let x = (self.get(0, 0) * self.get(0, 0) + self.get(1, 0) * self.get(1, 0)).sqrt();
        let y = (self.get(0, 1) * self.get(0, 1) + self.get(1, 1) * self.get(1, 1)).sqrt();
        Vec2::new(x, y)
    }

    /// Maps a homogeneous column vector `[x, y, z, w]`.
    #[inline]
    #[must_use]
    pub fn map_homogeneous(&self, v: [f64; 4]) -> [f64; 4] {
        let c = &self.cols;
        let mut out = [0.0_f64; 4];
        for (i, o) in out.iter_mut().enumerate() {
            *o = c[0][i] * v[0] + c[1][i] * v[1] + c[2][i] * v[2] + c[3][i] * v[3];
        }
        out
    }

    /// Returns `true` if every element differs from `other` by at most `tol`.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, tol: f64) -> bool {
        self.cols
            .iter()
            .flatten()
            .zip(other.cols.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= tol)
    }

    fn flat(&self) -> [f64; 16] {
        let mut m = [0.0_f64; 16];
        for (i, v) in m.iter_mut().enumerate() {
            *v = self.cols[i / 4][i % 4];
        }
        m
    }
}

fn sin_cos(radians: f64) -> (f64, f64) {
    #[cfg(feature = "std")]
    let sc = radians.sin_cos();
    #[cfg(not(feature = "std"))]
    let sc = (radians.sin(), radians.cos());
    sc
}

fn cofactor0(m: &[f64; 16]) -> f64 {
    m[5] * m[10] * m[15] - m[5] * m[11] * m[14] - m[9] * m[6] * m[15]
        + m[9] * m[7] * m[14]
        + m[13] * m[6] * m[11]
        - m[13] * m[7] * m[10]
}

fn cofactor4(m: &[f64; 16]) -> f64 {
    -m[4] * m[10] * m[15] + m[4] * m[11] * m[14] + m[8] * m[6] * m[15]
        - m[8] * m[7] * m[14]
        - m[12] * m[6] * m[11]
        + m[12] * m[7] * m[10]
}

fn cofactor8(m: &[f64; 16]) -> f64 {
    m[4] * m[9] * m[15] - m[4] * m[11] * m[13] - m[8] * m[5] * m[15]
        + m[8] * m[7] * m[13]
        + m[12] * m[5] * m[11]
        - m[12] * m[7] * m[9]
}

fn cofactor12(m: &[f64; 16]) -> f64 {
    -m[4] * m[9] * m[14] + m[4] * m[10] * m[13] + m[8] * m[5] * m[14]
        - m[8] * m[6] * m[13]
        - m[12] * m[5] * m[10]
        + m[12] * m[6] * m[9]
}

impl Default for Transform3d {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform3d {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f64; 4]; 4];
        for (j, col) in out.iter_mut().enumerate() {
            for (i, v) in col.iter_mut().enumerate() {
                *v = a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2] + a[3][i] * b[j][3];
            }
        }
        Self { cols: out }
    }
}
