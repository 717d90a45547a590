// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Projected layer shapes.

use kurbo::{Point, Rect};

use crate::geometry::{Point3, Vec3, map_clipped_quad, map_point3};
use crate::transform::Transform3d;

/// A layer rectangle placed in a shared 3-D space and projected onto the
/// z = 0 plane.
///
/// Polygons that clipping leaves with more than four vertices are reduced
/// to their first four. That is exact unless layers intersect.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerShape {
    /// Projected quad corners, in winding order. A clipped triangle repeats
    /// its last vertex.
    pub projected_quad: [Point; 4],
    /// Bounds of the projected polygon; empty if less than a triangle
    /// survived clipping.
    pub projected_bounds: Rect,
    /// Plane normal in the shared space.
    pub normal: Vec3,
    /// The mapped layer origin, a point on the plane.
    pub origin: Point3,
    /// Whether part of the layer lay behind the viewer.
    pub clipped: bool,
}

impl LayerShape {
    /// Maps `rect` (in layer space) through `transform` into the shared
    /// space.
    #[must_use]
    pub fn new(rect: Rect, transform: &Transform3d) -> Self {
        let quad = map_clipped_quad(transform, rect);
        let pts = quad.points();

        let (projected_quad, projected_bounds) = if pts.len() < 3 {
            ([Point::ZERO; 4], Rect::ZERO)
        } else {
            let p4 = if pts.len() >= 4 { pts[3] } else { pts[2] };
            ([pts[0], pts[1], pts[2], p4], quad.bounds())
        };

        let (c1, _) = map_point3(transform, Point3::ZERO);
        let (c2, _) = map_point3(transform, Point3::new(0.0, 1.0, 0.0));
        let (c3, _) = map_point3(transform, Point3::new(1.0, 0.0, 0.0));
        let normal = (c3 - c1).cross(c2 - c1);

        Self {
            projected_quad,
            projected_bounds,
            normal,
            origin: c1,
            clipped: quad.was_clipped(),
        }
    }

    /// Returns the z coordinate of the point on the layer's plane that
    /// projects onto `p`.
    ///
    /// A plane parallel to the z axis projects to a line and can never be
    /// seen, so it reports 0.
    #[must_use]
    pub fn layer_z_from_projected_point(&self, p: Point) -> f64 {
        let w = Point3::from_2d(p) - self.origin;
        let d = self.normal.z;
        if d == 0.0 {
            return 0.0;
        }
        let n = -self.normal.dot(w);
        n / d
    }

    /// Returns `true` if `p` lies inside the projected quad.
    #[must_use]
    pub fn quad_contains(&self, p: Point) -> bool {
        let [p1, p2, p3, p4] = self.projected_quad;
        point_in_triangle(p, p1, p2, p3) || point_in_triangle(p, p1, p3, p4)
    }
}

/// Barycentric containment test, inclusive of edges.
fn point_in_triangle(p: Point, a: Point, b: Point, c: Point) -> bool {
    let v0 = c - a;
    let v1 = b - a;
    let v2 = p - a;

    let dot00 = v0.dot(v0);
    let dot01 = v0.dot(v1);
    let dot02 = v0.dot(v2);
    let dot11 = v1.dot(v1);
    let dot12 = v1.dot(v2);

    let denom = dot00 * dot11 - dot01 * dot01;
    if denom == 0.0 {
        return false;
    }
    let inv = 1.0 / denom;
    let u = (dot11 * dot02 - dot01 * dot12) * inv;
    let v = (dot00 * dot12 - dot01 * dot02) * inv;
    u >= 0.0 && v >= 0.0 && u + v <= 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_layer_reports_its_depth() {
        let t = Transform3d::from_translation(0.0, 0.0, -3.0);
        let shape = LayerShape::new(Rect::new(0.0, 0.0, 10.0, 10.0), &t);
        assert_eq!(shape.projected_bounds, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(shape.normal, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(
            shape.layer_z_from_projected_point(Point::new(5.0, 5.0)),
            -3.0
        );
        assert!(!shape.clipped);
    }

    #[test]
    fn tilted_layer_depth_varies() {
        // Rotating about y tilts the x axis into z.
        let t = Transform3d::from_rotation_y(core::f64::consts::FRAC_PI_4);
        let shape = LayerShape::new(Rect::new(0.0, 0.0, 10.0, 10.0), &t);
        let z0 = shape.layer_z_from_projected_point(Point::new(0.0, 5.0));
        let z1 = shape.layer_z_from_projected_point(Point::new(5.0, 5.0));
        assert!((z0 - z1).abs() > 1.0);
    }

    #[test]
    fn edge_on_layer_has_zero_depth() {
        let t = Transform3d::from_rotation_y(core::f64::consts::FRAC_PI_2);
        let shape = LayerShape::new(Rect::new(0.0, 0.0, 10.0, 10.0), &t);
        assert_eq!(
            shape.layer_z_from_projected_point(Point::new(0.0, 0.0)),
            0.0
        );
    }

    #[test]
    fn quad_containment() {
        let shape = LayerShape::new(Rect::new(0.0, 0.0, 10.0, 10.0), &Transform3d::IDENTITY);
        assert!(shape.quad_contains(Point::new(5.0, 5.0)));
        assert!(shape.quad_contains(Point::new(0.0, 0.0)));
        assert!(!shape.quad_contains(Point::new(11.0, 5.0)));
    }
}
