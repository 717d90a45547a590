// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scroll compensation for fixed-position layers.
//!
//! A fixed-position layer must not move when something between it and its
//! container scrolls by a delta that has not been committed yet. Each pass
//! carries a *compensation* matrix down the tree that undoes those deltas;
//! fixed layers premultiply their accumulated transform by it.
//!
//! Compensation matrices start and end in the space of the current render
//! target, so they have to be re-expressed whenever a surface intervenes.

use kurbo::Vec2;

use super::ResolvedTree;
use crate::layer::{LayerId, LayerSource};
use crate::transform::Transform3d;

/// The layer's scroll delta plus its scroll parent's, when it has one.
///
/// A scroll parent's uncommitted delta has not been applied to the positions
/// of its scroll children yet, so it counts as theirs too.
pub(crate) fn effective_scroll_delta<T: LayerSource + ?Sized>(tree: &T, id: LayerId) -> Vec2 {
    let mut delta = tree.scroll(id).delta;
    if let Some(sp) = tree.scroll_parent(id) {
        delta += tree.scroll(sp).delta;
    }
    delta
}

/// The layer's total scroll offset plus its scroll parent's delta.
///
/// The scroll parent's committed offset is already folded into the scroll
/// children's positions, so only its delta is added.
pub(crate) fn effective_total_scroll_offset<T: LayerSource + ?Sized>(
    tree: &T,
    id: LayerId,
) -> Vec2 {
    let mut offset = tree.scroll(id).total_offset();
    if let Some(sp) = tree.scroll_parent(id) {
        offset += tree.scroll(sp).delta;
    }
    offset
}

/// Compensation for one scrolled layer: leave target space through the
/// inverse of `parent_matrix`, undo `scroll_delta`, and come back.
///
/// A singular `parent_matrix` gives no usable way back, and the identity is
/// returned so nothing downstream sees a garbage matrix.
pub(crate) fn compensation_for_this_layer(
    parent_matrix: &Transform3d,
    scroll_delta: Vec2,
) -> Transform3d {
    match parent_matrix.inverse() {
        Some(inverse) => *parent_matrix * Transform3d::from_translation_2d(scroll_delta) * inverse,
        None => Transform3d::IDENTITY,
    }
}

/// Computes the compensation matrix handed to the children of `id`.
///
/// Containers and fixed-position layers restart compensation, since their
/// fixed descendants only need to cancel deltas below them. `surface_draw`
/// is the layer's own surface draw transform, if it owns a surface.
pub(crate) fn compensation_for_children<T: LayerSource + ?Sized>(
    tree: &T,
    id: LayerId,
    parent_matrix: &Transform3d,
    current: &Transform3d,
    scroll_delta: Vec2,
    surface_draw: Option<&Transform3d>,
) -> Transform3d {
    let resets = tree.flags(id).is_container_for_fixed_position_layers
        || tree.position_constraint(id).is_fixed();

    if !resets && scroll_delta == Vec2::ZERO && surface_draw.is_none() {
        return *current;
    }

    let mut next = if resets {
        Transform3d::IDENTITY
    } else {
        *current
    };

    if scroll_delta != Vec2::ZERO {
        next = next * compensation_for_this_layer(parent_matrix, scroll_delta);
    }

    // Children live in the new surface's space, so move the compensation
    // there and back.
    if let Some(draw) = surface_draw
        && !next.is_identity()
        && let Some(inverse) = draw.inverse()
    {
        next = inverse * next * *draw;
    }
    next
}

/// The transform from the render target of `id`'s parent into the layer
/// space of `container`.
///
/// Walks the surfaces between the two targets, then leaves the container's
/// target through the inverse of the container's draw transform. A singular
/// container transform is left out of the chain.
pub(crate) fn target_space_to_container_space<T: LayerSource + ?Sized>(
    tree: &T,
    out: &ResolvedTree,
    id: LayerId,
    container: LayerId,
) -> Transform3d {
    let next_target = |layer: LayerId| tree.parent(layer).and_then(|p| out.render_target(p));

    let container_target = out.render_target(container);
    let mut chain = Transform3d::IDENTITY;
    let mut current = next_target(id);
    while let Some(target) = current {
        if Some(target) == container_target {
            break;
        }
        if let Some(surface) = out.render_surface(target) {
            chain = surface.draw_transform * chain;
        }
        current = next_target(target);
    }

    let container_draw = out.draw_properties(container).target_space_transform;
    if let Some(inverse) = container_draw.inverse() {
        chain = inverse * chain;
    }
    chain
}

/// Re-expresses a translation given in the container's layer space as a
/// transform acting on the layer's target space.
///
/// If the container space cannot be mapped back, no offset is applied.
pub(crate) fn size_delta_compensation(
    target_to_container: &Transform3d,
    offset: Vec2,
) -> Transform3d {
    match target_to_container.inverse() {
        Some(container_to_target) => {
            container_to_target * Transform3d::from_translation_2d(offset) * *target_to_container
        }
        None => Transform3d::IDENTITY,
    }
}

/// Pins a fixed-position layer to its container.
///
/// The accumulated `combined` transform is premultiplied by the running
/// scroll compensation. Layers pinned to the right or bottom edge then also
/// follow the container's size delta along that edge.
pub(crate) fn apply_position_adjustment<T: LayerSource + ?Sized>(
    tree: &T,
    out: &ResolvedTree,
    id: LayerId,
    container: LayerId,
    scroll_compensation: &Transform3d,
    combined: &mut Transform3d,
) {
    let constraint = tree.position_constraint(id);
    if !constraint.is_fixed() {
        return;
    }

    *combined = *scroll_compensation * *combined;

    let offset = constraint.size_delta_offset(tree.scroll(container).size_delta);
    if offset == Vec2::ZERO {
        return;
    }
    let chain = target_space_to_container_space(tree, out, id, container);
    *combined = size_delta_compensation(&chain, offset) * *combined;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{LayerFlags, LayerStore, PositionConstraint};

    const EPS: f64 = 1e-9;

    #[test]
    fn scroll_parent_delta_is_added() {
        let mut store = LayerStore::new();
        let root = store.create_layer();
        let scroller = store.create_layer();
        let child = store.create_layer();
        store.add_child(root, scroller);
        store.add_child(root, child);
        store.set_scroll_offset(child, Vec2::new(1.0, 1.0));
        store.set_scroll_delta(child, Vec2::new(2.0, 0.0));
        store.set_scroll_offset(scroller, Vec2::new(100.0, 100.0));
        store.set_scroll_delta(scroller, Vec2::new(0.0, 7.0));

        assert_eq!(effective_scroll_delta(&store, child), Vec2::new(2.0, 0.0));
        store.set_scroll_parent(child, Some(scroller));
        assert_eq!(effective_scroll_delta(&store, child), Vec2::new(2.0, 7.0));
        assert_eq!(
            effective_total_scroll_offset(&store, child),
            Vec2::new(3.0, 8.0)
        );
    }

    #[test]
    fn compensation_undoes_delta_under_scale() {
        let parent = Transform3d::from_scale_2d(2.0, 2.0);
        let comp = compensation_for_this_layer(&parent, Vec2::new(5.0, 0.0));
        // Scrolling by 5 layer units moves content by 10 target units.
        assert!(comp.approx_eq(&Transform3d::from_translation(10.0, 0.0, 0.0), EPS));
    }

    #[test]
    fn singular_parent_falls_back_to_identity() {
        let parent = Transform3d::from_scale(0.0, 1.0, 1.0);
        let comp = compensation_for_this_layer(&parent, Vec2::new(5.0, 0.0));
        assert!(comp.is_identity());
    }

    #[test]
    fn containers_and_fixed_layers_reset() {
        let mut store = LayerStore::new();
        let layer = store.create_layer();
        let inherited = Transform3d::from_translation(3.0, 4.0, 0.0);

        let kept = compensation_for_children(
            &store,
            layer,
            &Transform3d::IDENTITY,
            &inherited,
            Vec2::ZERO,
            None,
        );
        assert_eq!(kept, inherited);

        store.set_flags(
            layer,
            LayerFlags {
                is_container_for_fixed_position_layers: true,
                ..LayerFlags::default()
            },
        );
        let reset = compensation_for_children(
            &store,
            layer,
            &Transform3d::IDENTITY,
            &inherited,
            Vec2::ZERO,
            None,
        );
        assert!(reset.is_identity());

        store.set_flags(layer, LayerFlags::default());
        store.set_position_constraint(layer, PositionConstraint::FIXED_TOP_LEFT);
        let own = compensation_for_children(
            &store,
            layer,
            &Transform3d::IDENTITY,
            &inherited,
            Vec2::new(1.0, 0.0),
            None,
        );
        assert!(own.approx_eq(&Transform3d::from_translation(1.0, 0.0, 0.0), EPS));
    }

    #[test]
    fn surface_sandwiches_compensation() {
        let mut store = LayerStore::new();
        let layer = store.create_layer();
        let inherited = Transform3d::from_translation(4.0, 0.0, 0.0);
        let draw = Transform3d::from_scale_2d(2.0, 2.0);
        let next = compensation_for_children(
            &store,
            layer,
            &Transform3d::IDENTITY,
            &inherited,
            Vec2::ZERO,
            Some(&draw),
        );
        // Four target units are two units of the doubled surface.
        assert!(next.approx_eq(&Transform3d::from_translation(2.0, 0.0, 0.0), EPS));
    }

    #[test]
    fn size_delta_follows_container_space() {
        let to_container = Transform3d::from_scale_2d(0.5, 0.5);
        let comp = size_delta_compensation(&to_container, Vec2::new(10.0, 0.0));
        assert!(comp.approx_eq(&Transform3d::from_translation(20.0, 0.0, 0.0), EPS));
        let singular = Transform3d::from_scale(0.0, 0.0, 1.0);
        assert!(size_delta_compensation(&singular, Vec2::new(1.0, 1.0)).is_identity());
    }
}
