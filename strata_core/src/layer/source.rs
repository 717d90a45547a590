// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Read-only view of a layer tree, as consumed by the resolver.

use kurbo::{Point, Size};

use super::id::LayerId;
use super::props::{
    AnimationState, BlendMode, LayerFlags, PositionConstraint, Reflection, ScrollState,
};
use crate::geometry::Point3;
use crate::transform::Transform3d;

/// The capability interface [`resolve`](crate::draw::resolve) is generic
/// over.
///
/// Both [`LayerStore`](super::LayerStore) (the authoritative tree the host
/// mutates) and [`LayerSnapshot`](super::LayerSnapshot) (a frozen copy that
/// can receive impl-side scroll deltas) implement it, so a single traversal
/// serves both.
///
/// Implementations may panic on ids that do not belong to the tree.
/// Resolution only ever passes ids obtained from the tree itself.
pub trait LayerSource {
    /// One past the largest slot index in use. Output side-tables are sized
    /// by this.
    fn slot_count(&self) -> usize;

    /// Parent of `id`, or `None` for a root.
    fn parent(&self, id: LayerId) -> Option<LayerId>;

    /// Children of `id`, in paint order (back to front).
    fn children(&self, id: LayerId) -> impl Iterator<Item = LayerId> + '_;

    /// Width and height of the layer's content.
    fn bounds(&self, id: LayerId) -> Size;

    /// Offset of the layer's origin within its parent.
    fn position(&self, id: LayerId) -> Point;

    /// Local transform, applied about [`transform_origin`](Self::transform_origin).
    fn transform(&self, id: LayerId) -> Transform3d;

    /// Origin for the local transform, in layer space.
    fn transform_origin(&self, id: LayerId) -> Point3;

    /// Opacity in `[0, 1]`.
    fn opacity(&self, id: LayerId) -> f32;

    /// Blend mode against the content behind the layer.
    fn blend_mode(&self, id: LayerId) -> BlendMode;

    /// 3D sorting context id. Zero means the layer takes no part in a 3D
    /// rendering context.
    fn sorting_context(&self, id: LayerId) -> u32;

    /// Boolean flags.
    fn flags(&self, id: LayerId) -> LayerFlags;

    /// Scroll offset, delta and container size delta.
    fn scroll(&self, id: LayerId) -> ScrollState;

    /// Fixed-position constraint.
    fn position_constraint(&self, id: LayerId) -> PositionConstraint;

    /// Running animations.
    fn animation(&self, id: LayerId) -> AnimationState;

    /// Reflection, if the layer has one.
    fn reflection(&self, id: LayerId) -> Option<Reflection>;

    /// The layer whose scrolling moves this one, when that is not its
    /// structural parent.
    fn scroll_parent(&self, id: LayerId) -> Option<LayerId>;

    /// The layer whose clip applies to this one, when that is not its
    /// structural parent.
    fn clip_parent(&self, id: LayerId) -> Option<LayerId>;

    /// Returns `true` if the layer takes part in a 3D rendering context.
    fn is_3d_sorted(&self, id: LayerId) -> bool {
        self.sorting_context(id) != 0
    }

    /// Returns `true` if both the layer and its parent take part in a 3D
    /// rendering context, so the layer's depth is sorted by an ancestor.
    fn is_in_existing_3d_context(&self, id: LayerId) -> bool {
        self.is_3d_sorted(id) && self.parent(id).is_some_and(|p| self.is_3d_sorted(p))
    }

    /// Returns `true` if the layer starts a new 3D rendering context.
    fn is_root_of_3d_context(&self, id: LayerId) -> bool {
        match self.parent(id) {
            Some(p) => !self.is_3d_sorted(p) && self.is_3d_sorted(id),
            None => self.is_3d_sorted(id),
        }
    }

    /// Returns `true` if the local transform has an inverse.
    fn transform_is_invertible(&self, id: LayerId) -> bool {
        self.transform(id).is_invertible()
    }
}
