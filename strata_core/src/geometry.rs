// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry helpers shared by the propagator and the depth sorter.
//!
//! Mapping a rectangle through a projective transform can send some of its
//! corners behind the viewer (w ≤ 0). Those points have no meaningful
//! cartesian position, so the helpers here clip each polygon against the
//! plane w = ε in homogeneous space before dividing through.
//!
//! *Mapping* sends a rectangle forward through a transform. *Projecting*
//! sends a rectangle from a target space back onto the z = 0 plane of a
//! layer, given the target-to-layer transform.
//!
//! All rectangles are [`kurbo::Rect`]. "Enclosing" and "enclosed" variants
//! round outward and inward to whole units.

use core::ops::{Add, Mul, Sub};

use kurbo::{Point, Rect};
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use crate::transform::Transform3d;

/// Homogeneous w used for points interpolated onto the clipping plane.
const CLIP_W: f64 = 1e-5;

/// A point in 3-D space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point3 {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Point3 {
    /// The origin.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Creates a point.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Lifts a 2-D point onto the z = 0 plane.
    #[inline]
    #[must_use]
    pub const fn from_2d(p: Point) -> Self {
        Self::new(p.x, p.y, 0.0)
    }

    /// Drops the z coordinate.
    #[inline]
    #[must_use]
    pub const fn to_2d(self) -> Point {
        Point::new(self.x, self.y)
    }
}

impl Sub for Point3 {
    type Output = Vec3;

    #[inline]
    fn sub(self, rhs: Self) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Add<Vec3> for Point3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Vec3) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

/// A 3-D vector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Vec3 {
    /// Creates a vector.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Dot product.
    #[inline]
    #[must_use]
    pub fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    /// Cross product.
    #[inline]
    #[must_use]
    pub fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    /// Euclidean length.
    #[inline]
    #[must_use]
    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Scales to unit length. A zero vector is returned unchanged.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == 0.0 { self } else { self * (1.0 / len) }
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// The polygon produced by mapping a quad through a transform and clipping
/// it against the w = ε plane.
///
/// Clipping a quad against one plane adds at most one vertex per edge, so
/// the polygon never exceeds eight vertices.
#[derive(Clone, Copy, Debug)]
pub struct ClippedQuad {
    points: [Point; 8],
    len: usize,
    clipped: bool,
}

impl ClippedQuad {
    /// The surviving vertices, in winding order.
    #[inline]
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points[..self.len]
    }

    /// Whether any part of the input lay behind the viewer.
    #[inline]
    #[must_use]
    pub fn was_clipped(&self) -> bool {
        self.clipped
    }

    /// The bounding box of the surviving vertices, or an empty rectangle if
    /// nothing survived.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        let pts = self.points();
        let Some(first) = pts.first() else {
            return Rect::ZERO;
        };
        let mut r = Rect::from_points(*first, *first);
        for p in &pts[1..] {
            r = Rect::new(r.x0.min(p.x), r.y0.min(p.y), r.x1.max(p.x), r.y1.max(p.y));
        }
        r
    }

    fn push(&mut self, p: Point) {
        if self.len < self.points.len() {
            self.points[self.len] = p;
            self.len += 1;
        }
    }
}

fn is_clipped(h: [f64; 4]) -> bool {
    h[3] <= 0.0
}

fn cartesian(h: [f64; 4]) -> Point {
    if h[3] == 1.0 || h[3] == 0.0 {
        return Point::new(h[0], h[1]);
    }
    let inv_w = 1.0 / h[3];
    Point::new(h[0] * inv_w, h[1] * inv_w)
}

fn cartesian3(h: [f64; 4]) -> Point3 {
    if h[3] == 1.0 || h[3] == 0.0 {
        return Point3::new(h[0], h[1], h[2]);
    }
    let inv_w = 1.0 / h[3];
    Point3::new(h[0] * inv_w, h[1] * inv_w, h[2] * inv_w)
}

/// Interpolates along the edge `h1 -> h2` to the point where w reaches
/// [`CLIP_W`]. Exactly one endpoint must be clipped.
fn clipped_point_for_edge(h1: [f64; 4], h2: [f64; 4]) -> Point {
    let t = (CLIP_W - h1[3]) / (h2[3] - h1[3]);
    let lerp = |a: f64, b: f64| a + t * (b - a);
    cartesian([
        lerp(h1[0], h2[0]),
        lerp(h1[1], h2[1]),
        lerp(h1[2], h2[2]),
        lerp(h1[3], h2[3]),
    ])
}

fn clip_homogeneous_quad(h: [[f64; 4]; 4]) -> ClippedQuad {
    let mut out = ClippedQuad {
        points: [Point::ZERO; 8],
        len: 0,
        clipped: h.iter().any(|p| is_clipped(*p)),
    };
    for i in 0..4 {
        let a = h[i];
        let b = h[(i + 1) % 4];
        if !is_clipped(a) {
            out.push(cartesian(a));
        }
        if is_clipped(a) != is_clipped(b) {
            out.push(clipped_point_for_edge(a, b));
        }
    }
    out
}

fn rect_corners(rect: Rect) -> [Point; 4] {
    [
        Point::new(rect.x0, rect.y0),
        Point::new(rect.x1, rect.y0),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x0, rect.y1),
    ]
}

/// Maps a 3-D point, returning the cartesian result and whether it lay
/// behind the viewer. A clipped result is not meaningful.
#[must_use]
pub fn map_point3(transform: &Transform3d, p: Point3) -> (Point3, bool) {
    let h = transform.map_homogeneous([p.x, p.y, p.z, 1.0]);
    (cartesian3(h), is_clipped(h))
}

/// Maps the four corners of `rect` and clips the result against w = ε.
#[must_use]
pub fn map_clipped_quad(transform: &Transform3d, rect: Rect) -> ClippedQuad {
    let c = rect_corners(rect);
    clip_homogeneous_quad(c.map(|p| transform.map_homogeneous([p.x, p.y, 0.0, 1.0])))
}

/// Maps `rect` forward and returns the bounds of the visible part.
#[must_use]
pub fn map_clipped_rect(transform: &Transform3d, rect: Rect) -> Rect {
    if transform.is_identity_or_translation() {
        return rect + transform.translation_2d();
    }
    map_clipped_quad(transform, rect).bounds()
}

/// Like [`map_clipped_rect`], rounded outward to whole units.
#[must_use]
pub fn map_enclosing_clipped_rect(transform: &Transform3d, rect: Rect) -> Rect {
    if transform.is_identity_or_integer_translation() {
        return rect + transform.translation_2d();
    }
    enclosing_rect(map_clipped_rect(transform, rect))
}

/// Finds the point on the layer's z = 0 plane that lands on `p` under a
/// layer-to-target transform, given that transform's inverse, and returns it
/// in homogeneous target-to-layer output.
fn project_homogeneous_point(transform: &Transform3d, p: Point) -> [f64; 4] {
    // A layer seen exactly edge-on has no single preimage; collapse it.
    if transform.get(2, 2) == 0.0 {
        return [0.0, 0.0, 0.0, 1.0];
    }
    let z = -(transform.get(2, 0) * p.x + transform.get(2, 1) * p.y + transform.get(2, 3))
        / transform.get(2, 2);
    transform.map_homogeneous([p.x, p.y, z, 1.0])
}

/// Projects `rect` from a target space onto a layer's plane through the
/// target-to-layer `transform` and returns the bounds of the result.
#[must_use]
pub fn project_clipped_rect(transform: &Transform3d, rect: Rect) -> Rect {
    if transform.is_identity_or_translation() {
        return rect + transform.translation_2d();
    }
    let c = rect_corners(rect);
    clip_homogeneous_quad(c.map(|p| project_homogeneous_point(transform, p))).bounds()
}

/// Like [`project_clipped_rect`], rounded outward to whole units.
#[must_use]
pub fn project_enclosing_clipped_rect(transform: &Transform3d, rect: Rect) -> Rect {
    if transform.is_identity_or_integer_translation() {
        return rect + transform.translation_2d();
    }
    enclosing_rect(project_clipped_rect(transform, rect))
}

/// Returns `true` if the rectangle has no area (including negative extents).
#[inline]
#[must_use]
pub fn rect_is_empty(rect: Rect) -> bool {
    !(rect.x1 > rect.x0 && rect.y1 > rect.y0)
}

/// Union that ignores empty operands.
#[must_use]
pub fn union_rect(a: Rect, b: Rect) -> Rect {
    if rect_is_empty(a) {
        return b;
    }
    if rect_is_empty(b) {
        return a;
    }
    a.union(b)
}

/// Intersection that yields [`Rect::ZERO`] when the operands don't overlap.
#[must_use]
pub fn intersect_rect(a: Rect, b: Rect) -> Rect {
    let r = a.intersect(b);
    if rect_is_empty(r) { Rect::ZERO } else { r }
}

/// Returns `true` if both rectangles are non-empty and overlap with positive
/// area.
#[must_use]
pub fn rects_intersect(a: Rect, b: Rect) -> bool {
    !rect_is_empty(a)
        && !rect_is_empty(b)
        && a.x0 < b.x1
        && b.x0 < a.x1
        && a.y0 < b.y1
        && b.y0 < a.y1
}

/// Returns `true` if `inner` lies entirely inside `outer`. An empty `inner`
/// is contained by anything.
#[must_use]
pub fn rect_contains_rect(outer: Rect, inner: Rect) -> bool {
    rect_is_empty(inner)
        || (inner.x0 >= outer.x0
            && inner.y0 >= outer.y0
            && inner.x1 <= outer.x1
            && inner.y1 <= outer.y1)
}

/// Rounds outward to whole units.
#[must_use]
pub fn enclosing_rect(rect: Rect) -> Rect {
    if rect_is_empty(rect) {
        return Rect::ZERO;
    }
    rect.expand()
}

/// Rounds inward to whole units.
#[must_use]
pub fn enclosed_rect(rect: Rect) -> Rect {
    if rect_is_empty(rect) {
        return Rect::ZERO;
    }
    let r = Rect::new(
        rect.x0.ceil(),
        rect.y0.ceil(),
        rect.x1.floor(),
        rect.y1.floor(),
    );
    if rect_is_empty(r) { Rect::ZERO } else { r }
}

/// Clamps each dimension of `rect` to `max`, keeping its origin.
#[must_use]
pub fn clamp_rect_size(rect: Rect, max: f64) -> Rect {
    Rect::from_origin_size(
        rect.origin(),
        (rect.width().min(max), rect.height().min(max)),
    )
}

/// Computes the part of `layer_bounds` (in layer space) that can be visible
/// inside `target_clip`, given the layer's bounds already mapped into target
/// space.
///
/// When the layer-to-target transform cannot be inverted the surface bounds
/// say nothing about the layer, and the whole layer is assumed visible.
#[must_use]
pub fn visible_rect_with_cached_layer_rect(
    target_clip: Rect,
    layer_bounds: Rect,
    layer_rect_in_target: Rect,
    transform: &Transform3d,
) -> Rect {
    if rect_is_empty(layer_rect_in_target) {
        return Rect::ZERO;
    }
    if rect_contains_rect(target_clip, layer_rect_in_target) {
        return layer_bounds;
    }
    // Only project the region the layer can reach, so that surface points
    // behind the projection point never enter the computation.
    let minimal = intersect_rect(target_clip, layer_rect_in_target);
    if rect_is_empty(minimal) {
        return Rect::ZERO;
    }
    let Some(target_to_layer) = transform.inverse() else {
        return layer_bounds;
    };
    let projected = project_enclosing_clipped_rect(&target_to_layer, minimal);
    intersect_rect(projected, layer_bounds)
}

/// Computes the part of `layer_bounds` visible inside `target_clip` under a
/// layer-to-target `transform`.
#[must_use]
pub fn calculate_visible_rect(
    target_clip: Rect,
    layer_bounds: Rect,
    transform: &Transform3d,
) -> Rect {
    let in_target = map_enclosing_clipped_rect(transform, layer_bounds);
    visible_rect_with_cached_layer_rect(target_clip, layer_bounds, in_target, transform)
}

#[cfg(test)]
mod tests {
    use core::f64::consts::FRAC_PI_4;

    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn map_translation_fast_path() {
        let t = Transform3d::from_translation(10.0, 5.0, 0.0);
        let r = map_clipped_rect(&t, Rect::new(0.0, 0.0, 4.0, 4.0));
        assert_eq!(r, Rect::new(10.0, 5.0, 14.0, 9.0));
    }

    #[test]
    fn map_rotation_bounds() {
        let t = Transform3d::from_rotation_z(FRAC_PI_4);
        let r = map_clipped_rect(&t, Rect::new(0.0, 0.0, 2.0, 2.0));
        let d = 2.0_f64.sqrt();
        assert!(approx(r.x0, -d));
        assert!(approx(r.x1, d));
        assert!(approx(r.y0, 0.0));
        assert!(approx(r.y1, 2.0 * d));
        let e = map_enclosing_clipped_rect(&t, Rect::new(0.0, 0.0, 2.0, 2.0));
        assert_eq!(e, Rect::new(-2.0, 0.0, 2.0, 3.0));
    }

    #[test]
    fn quad_behind_viewer_is_clipped() {
        // Perspective with the eye at z = 10; push everything to z = 20.
        let t = Transform3d::from_perspective(10.0) * Transform3d::from_translation(0.0, 0.0, 20.0);
        let q = map_clipped_quad(&t, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(q.was_clipped());
        assert!(q.points().is_empty());
        assert_eq!(q.bounds(), Rect::ZERO);
    }

    #[test]
    fn partially_clipped_quad_gains_vertices() {
        // Tilt a plane so that half of it passes behind the eye.
        let t = Transform3d::from_perspective(10.0)
            * Transform3d::from_rotation_y(FRAC_PI_4)
            * Transform3d::from_translation(-50.0, 0.0, 0.0);
        let q = map_clipped_quad(&t, Rect::new(0.0, 0.0, 100.0, 10.0));
        assert!(q.was_clipped());
        assert_eq!(q.points().len(), 4);
        assert!(q.bounds().is_finite());
    }

    #[test]
    fn project_inverts_map() {
        let t = Transform3d::from_translation(3.0, 4.0, 0.0) * Transform3d::from_rotation_z(0.3);
        let layer = Rect::new(0.0, 0.0, 10.0, 10.0);
        let mapped = map_clipped_rect(&t, layer);
        let back = project_clipped_rect(&t.inverse().unwrap(), mapped);
        assert!(rect_contains_rect(back.inflate(1e-9, 1e-9), layer));
    }

    #[test]
    fn rect_helpers() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 20.0, 20.0);
        let far = Rect::new(30.0, 30.0, 40.0, 40.0);
        assert_eq!(intersect_rect(a, b), Rect::new(5.0, 5.0, 10.0, 10.0));
        assert_eq!(intersect_rect(a, far), Rect::ZERO);
        assert_eq!(union_rect(Rect::ZERO, far), far);
        assert_eq!(union_rect(Rect::new(100.0, 100.0, 100.0, 100.0), a), a);
        assert!(rects_intersect(a, b));
        assert!(!rects_intersect(a, Rect::new(10.0, 0.0, 20.0, 10.0)));
        assert!(rect_contains_rect(a, Rect::new(1.0, 1.0, 2.0, 2.0)));
        assert!(!rect_contains_rect(a, b));
        assert_eq!(
            enclosing_rect(Rect::new(0.5, 0.5, 1.5, 1.5)),
            Rect::new(0.0, 0.0, 2.0, 2.0)
        );
        assert_eq!(
            enclosed_rect(Rect::new(0.5, 0.5, 2.5, 2.5)),
            Rect::new(1.0, 1.0, 2.0, 2.0)
        );
        assert_eq!(
            clamp_rect_size(Rect::new(5.0, 5.0, 105.0, 15.0), 50.0),
            Rect::new(5.0, 5.0, 55.0, 15.0)
        );
    }

    #[test]
    fn visible_rect_partial() {
        let layer = Rect::new(0.0, 0.0, 100.0, 100.0);
        let t = Transform3d::from_translation(50.0, 50.0, 0.0);
        let clip = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(
            calculate_visible_rect(clip, layer, &t),
            Rect::new(0.0, 0.0, 50.0, 50.0)
        );
    }

    #[test]
    fn visible_rect_fully_inside() {
        let layer = Rect::new(0.0, 0.0, 10.0, 10.0);
        let t = Transform3d::from_translation(5.0, 5.0, 0.0);
        assert_eq!(
            calculate_visible_rect(Rect::new(0.0, 0.0, 100.0, 100.0), layer, &t),
            layer
        );
    }

    #[test]
    fn visible_rect_singular_falls_back_to_layer() {
        let layer = Rect::new(0.0, 0.0, 10.0, 10.0);
        let t = Transform3d::from_scale(1.0, 0.0, 1.0);
        let in_target = Rect::new(0.0, 0.0, 10.0, 1.0);
        let clip = Rect::new(0.0, 0.0, 5.0, 5.0);
        assert_eq!(
            visible_rect_with_cached_layer_rect(clip, layer, in_target, &t),
            layer
        );
    }

    #[test]
    fn cross_product_is_normal() {
        let n = Vec3::new(1.0, 0.0, 0.0).cross(Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(n, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(n.length(), 1.0);
        let p = Point3::new(1.0, 2.0, 3.0) + n * 2.0;
        assert_eq!(p, Point3::new(1.0, 2.0, 5.0));
    }
}
