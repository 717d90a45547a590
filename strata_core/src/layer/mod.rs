// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer tree data model.
//!
//! A *layer* is a node in a compositing tree. Each layer has:
//!
//! - An identity ([`LayerId`]), a generational handle that becomes stale when
//!   the layer is destroyed.
//! - Topology: parent, first-child and sibling links forming an ordered tree,
//!   plus optional [scroll parent](LayerStore::set_scroll_parent) and
//!   [clip parent](LayerStore::set_clip_parent) back-references that do not
//!   imply ownership.
//! - Properties set by the host: bounds, position, transform and origin,
//!   opacity, blend mode, [`LayerFlags`], [`ScrollState`],
//!   [`PositionConstraint`], [`AnimationState`] and an optional
//!   [`Reflection`].
//!
//! Nothing here is computed. Draw properties live in
//! [`ResolvedTree`](crate::draw::ResolvedTree), produced by
//! [`resolve`](crate::draw::resolve) from anything that implements
//! [`LayerSource`].
//!
//! Two trees implement it. [`LayerStore`] is the mutable, authoritative
//! tree, stored in struct-of-arrays layout with index-based handles.
//! [`LayerSnapshot`] is a frozen copy that still accepts scroll and size
//! deltas.
//!
//! # Dirty tracking
//!
//! Store mutations mark the matching channel in [`dirty`](crate::dirty), and
//! [`LayerStore::take_changes`] drains them into [`PropertyChanges`].

mod changes;
mod id;
mod props;
mod snapshot;
mod source;
mod store;
mod traverse;

pub use changes::PropertyChanges;
pub use id::{INVALID, LayerId};
pub use props::{
    AnimationState, BlendMode, LayerFlags, PositionConstraint, Reflection, ScrollState,
    TransformAnimation,
};
pub use snapshot::LayerSnapshot;
pub use source::LayerSource;
pub use store::LayerStore;
pub use traverse::Children;
