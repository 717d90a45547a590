// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pairwise depth comparison of projected layer shapes.

use kurbo::Point;

use super::shape::LayerShape;
use crate::geometry::rects_intersect;

/// Which of two shapes must be drawn first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OverlapResult {
    /// The projections don't overlap, or the shapes are the same.
    None,
    /// `a` is behind `b` and must be drawn first.
    ABeforeB,
    /// `b` is behind `a` and must be drawn first.
    BBeforeA,
}

/// Compares two shapes and returns their draw order with a confidence
/// weight.
///
/// Depth is sampled at every corner of one quad inside the other and at
/// every edge crossing. A consistent separation larger than `z_threshold`
/// yields the order with weight 1. A smaller separation keeps `a` first,
/// and layers that cross each other are ordered by the larger difference;
/// both with weight 0, so they give way when a cycle has to be broken.
#[must_use]
pub fn check_overlap(a: &LayerShape, b: &LayerShape, z_threshold: f64) -> (OverlapResult, f32) {
    if core::ptr::eq(a, b) {
        return (OverlapResult::None, 0.0);
    }
    if !rects_intersect(a.projected_bounds, b.projected_bounds) {
        return (OverlapResult::None, 0.0);
    }

    let mut points = PointSet::new();
    for p in a.projected_quad {
        if b.quad_contains(p) {
            points.push(p);
        }
    }
    for p in b.projected_quad {
        if a.quad_contains(p) {
            points.push(p);
        }
    }
    for i in 0..4 {
        let (a0, a1) = (a.projected_quad[i], a.projected_quad[(i + 1) % 4]);
        for j in 0..4 {
            let (b0, b1) = (b.projected_quad[j], b.projected_quad[(j + 1) % 4]);
            if let Some(p) = edge_edge_intersection(a0, a1, b0, b1) {
                points.push(p);
            }
        }
    }
    if points.is_empty() {
        return (OverlapResult::None, 0.0);
    }

    let mut max_positive = 0.0_f64;
    let mut max_negative = 0.0_f64;
    let mut accurate = false;
    for &p in points.as_slice() {
        let za = a.layer_z_from_projected_point(p);
        let zb = b.layer_z_from_projected_point(p);
        if !za.is_finite() || !zb.is_finite() {
            continue;
        }
        accurate = true;
        let diff = za - zb;
        max_positive = max_positive.max(diff);
        max_negative = max_negative.min(diff);
    }

    // Nothing measurable; fall back to input order.
    if !accurate {
        return (OverlapResult::ABeforeB, 0.0);
    }

    let max_diff = if max_positive > -max_negative {
        max_positive
    } else {
        max_negative
    };

    let intersecting = max_positive > z_threshold && max_negative < -z_threshold;
    if !intersecting && -z_threshold <= max_diff && max_diff <= z_threshold {
        return (OverlapResult::ABeforeB, 0.0);
    }
    let weight = if intersecting { 0.0 } else { 1.0 };

    // Larger z is nearer the viewer and is drawn later.
    if max_diff <= 0.0 {
        (OverlapResult::ABeforeB, weight)
    } else {
        (OverlapResult::BBeforeA, weight)
    }
}

/// Returns the crossing point of segments `a0 -> a1` and `b0 -> b1`, if
/// they cross. Parallel segments never do.
fn edge_edge_intersection(a0: Point, a1: Point, b0: Point, b1: Point) -> Option<Point> {
    let u = a1 - a0;
    let v = b1 - b0;
    let w = a0 - b0;

    let denom = u.cross(v);
    if denom == 0.0 {
        return None;
    }
    let s = v.cross(w) / denom;
    if !(0.0..=1.0).contains(&s) {
        return None;
    }
    let t = u.cross(w) / denom;
    if !(0.0..=1.0).contains(&t) {
        return None;
    }
    Some(a0 + u * s)
}

/// Two quads have at most 8 contained corners and 16 edge crossings.
const MAX_SAMPLES: usize = 24;

/// Fixed-capacity buffer of depth sample points.
struct PointSet {
    points: [Point; MAX_SAMPLES],
    len: usize,
}

impl PointSet {
    fn new() -> Self {
        Self {
            points: [Point::ZERO; MAX_SAMPLES],
            len: 0,
        }
    }

    fn push(&mut self, p: Point) {
        if self.len < MAX_SAMPLES {
            self.points[self.len] = p;
            self.len += 1;
        }
    }

    fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn as_slice(&self) -> &[Point] {
        &self.points[..self.len]
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Rect;

    use super::*;
    use crate::transform::Transform3d;

    fn square_at(rect: Rect, z: f64) -> LayerShape {
        LayerShape::new(rect, &Transform3d::from_translation(0.0, 0.0, z))
    }

    #[test]
    fn self_overlap_has_no_weight() {
        let shapes = [
            square_at(Rect::new(0.0, 0.0, 10.0, 10.0), 0.0),
            LayerShape::new(
                Rect::new(0.0, 0.0, 10.0, 10.0),
                &Transform3d::from_rotation_y(0.5),
            ),
            square_at(Rect::new(0.0, 0.0, 10.0, 10.0), f64::NAN),
        ];
        for s in &shapes {
            for threshold in [0.0, 0.01, 100.0] {
                let (result, weight) = check_overlap(s, s, threshold);
                assert_eq!(result, OverlapResult::None);
                assert_eq!(weight, 0.0);
            }
        }
    }

    #[test]
    fn equal_shapes_of_different_layers_still_overlap() {
        let a = square_at(Rect::new(0.0, 0.0, 10.0, 10.0), 0.0);
        let b = a;
        assert_eq!(a, b);
        assert_eq!(check_overlap(&a, &b, 0.01), (OverlapResult::ABeforeB, 0.0));
        assert_eq!(check_overlap(&b, &a, 0.01), (OverlapResult::ABeforeB, 0.0));
    }

    #[test]
    fn disjoint_shapes_do_not_overlap() {
        let a = square_at(Rect::new(0.0, 0.0, 10.0, 10.0), 0.0);
        let b = square_at(Rect::new(20.0, 0.0, 30.0, 10.0), -5.0);
        assert_eq!(check_overlap(&a, &b, 0.01), (OverlapResult::None, 0.0));
    }

    #[test]
    fn separated_shapes_are_ordered_back_to_front() {
        let front = square_at(Rect::new(0.0, 0.0, 10.0, 10.0), 0.0);
        let back = square_at(Rect::new(5.0, 5.0, 15.0, 15.0), -2.0);
        assert_eq!(
            check_overlap(&front, &back, 0.01),
            (OverlapResult::BBeforeA, 1.0)
        );
        assert_eq!(
            check_overlap(&back, &front, 0.01),
            (OverlapResult::ABeforeB, 1.0)
        );
    }

    #[test]
    fn coplanar_shapes_keep_input_order() {
        let a = square_at(Rect::new(0.0, 0.0, 10.0, 10.0), 1.0);
        let b = square_at(Rect::new(5.0, 5.0, 15.0, 15.0), 1.0);
        assert_eq!(check_overlap(&a, &b, 0.01), (OverlapResult::ABeforeB, 0.0));
        assert_eq!(check_overlap(&b, &a, 0.01), (OverlapResult::ABeforeB, 0.0));
    }

    #[test]
    fn intersecting_shapes_have_zero_weight() {
        let flat = square_at(Rect::new(-10.0, -10.0, 10.0, 10.0), 0.0);
        let tilted = LayerShape::new(
            Rect::new(-10.0, -10.0, 10.0, 10.0),
            &Transform3d::from_rotation_y(0.5),
        );
        let (result, weight) = check_overlap(&flat, &tilted, 0.01);
        assert_ne!(result, OverlapResult::None);
        assert_eq!(weight, 0.0);
    }

    #[test]
    fn crossing_edges() {
        let p = edge_edge_intersection(
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(10.0, 0.0),
        );
        assert_eq!(p, Some(Point::new(5.0, 5.0)));
        assert!(
            edge_edge_intersection(
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(0.0, 1.0),
                Point::new(10.0, 1.0),
            )
            .is_none()
        );
    }
}
