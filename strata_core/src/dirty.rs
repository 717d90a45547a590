// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! Strata uses multi-channel dirty tracking (via [`understory_dirty`]) to
//! record which layers changed between resolve passes. Each channel
//! represents an independent category of change.
//!
//! # Propagation semantics
//!
//! - **Propagating**: [`GEOMETRY`], [`OPACITY`] and [`SCROLL`] are marked
//!   with [`EagerPolicy`](understory_dirty::EagerPolicy) and have dependency
//!   edges from child to parent. Draw transforms, accumulated opacity and
//!   scroll compensation are all inherited, so marking a layer marks its
//!   whole subtree.
//!
//! - **Local-only**: [`EFFECTS`] covers flags, blend mode, reflections,
//!   sorting contexts and animation state. Only the explicitly marked layer
//!   appears in the drain output.
//!
//! - **Structural**: [`TOPOLOGY`] is marked on topology mutations (add or
//!   remove child, create or destroy layer, scroll and clip parent changes).
//!
//! # Consumption
//!
//! [`LayerStore::take_changes`](crate::layer::LayerStore::take_changes)
//! drains all channels into [`PropertyChanges`](crate::layer::PropertyChanges).
//! Resolving does not depend on the drain: a pass always recomputes every
//! layer it visits, and hosts use the drained sets to decide whether a pass
//! is needed and what to re-raster afterwards.

use understory_dirty::Channel;

/// Bounds, position, transform, origin or flattening changed.
pub const GEOMETRY: Channel = Channel::new(0);

/// Opacity changed.
pub const OPACITY: Channel = Channel::new(1);

/// Scroll offset, scroll delta or container size delta changed.
pub const SCROLL: Channel = Channel::new(2);

/// Flags, blend mode, reflection, sorting context or animation state changed.
pub const EFFECTS: Channel = Channel::new(3);

/// Tree topology or a secondary relation changed.
pub const TOPOLOGY: Channel = Channel::new(4);
