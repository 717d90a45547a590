// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change collection between resolve passes.
//!
//! Each dirty channel is drained in turn:
//!
//! 1. **GEOMETRY**, **OPACITY**, **SCROLL**: drained with `affected()`, so
//!    every descendant of a marked layer is reported.
//! 2. **EFFECTS**: only the marked layers.
//! 3. **TOPOLOGY**: consumed and summarized as a single flag.
//!
//! [`PropertyChanges`] uses raw slot indices (`u32`) rather than
//! [`LayerId`](super::LayerId) handles, matching the slot-indexed side
//! tables of [`ResolvedTree`](crate::draw::ResolvedTree).

use alloc::vec::Vec;

use super::store::LayerStore;
use crate::dirty;

/// The set of changes accumulated since the previous
/// [`LayerStore::take_changes`] call.
#[derive(Clone, Debug, Default)]
pub struct PropertyChanges {
    /// Layers whose geometry (own or inherited) changed.
    pub geometry: Vec<u32>,
    /// Layers whose accumulated opacity may have changed.
    pub opacity: Vec<u32>,
    /// Layers whose scroll compensation may have changed.
    pub scroll: Vec<u32>,
    /// Layers whose flags, blend mode, reflection, sorting context or
    /// animation state changed.
    pub effects: Vec<u32>,
    /// Layers created since the last drain.
    pub added: Vec<u32>,
    /// Layers destroyed since the last drain.
    pub removed: Vec<u32>,
    /// Whether any topology or secondary relation changed.
    pub topology_changed: bool,
}

impl PropertyChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.geometry.clear();
        self.opacity.clear();
        self.scroll.clear();
        self.effects.clear();
        self.added.clear();
        self.removed.clear();
        self.topology_changed = false;
    }

    /// Returns `true` if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
            && self.opacity.is_empty()
            && self.scroll.is_empty()
            && self.effects.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
            && !self.topology_changed
    }
}

impl LayerStore {
    /// Drains all dirty channels and returns what changed.
    ///
    /// Afterwards [`needs_resolve`](Self::needs_resolve) is `false` until the
    /// next mutation.
    pub fn take_changes(&mut self) -> PropertyChanges {
        let mut changes = PropertyChanges::default();
        self.take_changes_into(&mut changes);
        changes
    }

    /// Like [`take_changes`](Self::take_changes), but reuses a caller-provided
    /// buffer.
    pub fn take_changes_into(&mut self, changes: &mut PropertyChanges) {
        changes.clear();

        changes.geometry.extend(
            self.dirty
                .drain(dirty::GEOMETRY)
                .affected()
                .deterministic()
                .run(),
        );
        changes.opacity.extend(
            self.dirty
                .drain(dirty::OPACITY)
                .affected()
                .deterministic()
                .run(),
        );
        changes.scroll.extend(
            self.dirty
                .drain(dirty::SCROLL)
                .affected()
                .deterministic()
                .run(),
        );
        changes
            .effects
            .extend(self.dirty.drain(dirty::EFFECTS).deterministic().run());

        changes.topology_changed = self
            .dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .count()
            > 0;

        // Slots that are currently free are not reported as changed.
        for list in [
            &mut changes.geometry,
            &mut changes.opacity,
            &mut changes.scroll,
            &mut changes.effects,
        ] {
            list.retain(|idx| !self.free_list.contains(idx));
        }

        core::mem::swap(&mut self.pending_added, &mut changes.added);
        core::mem::swap(&mut self.pending_removed, &mut changes.removed);
        self.needs_resolve = false;
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Size, Vec2};

    use super::*;
    use crate::layer::LayerFlags;
    use crate::transform::Transform3d;

    #[test]
    fn geometry_propagates_to_descendants() {
        let mut store = LayerStore::new();
        let root = store.create_layer();
        let child = store.create_layer();
        let grandchild = store.create_layer();
        store.add_child(root, child);
        store.add_child(child, grandchild);
        let _ = store.take_changes();

        store.set_transform(root, Transform3d::from_translation(5.0, 0.0, 0.0));
        let changes = store.take_changes();
        assert!(changes.geometry.contains(&root.index()));
        assert!(changes.geometry.contains(&child.index()));
        assert!(changes.geometry.contains(&grandchild.index()));
        assert!(changes.opacity.is_empty());
        assert!(!changes.topology_changed);
    }

    #[test]
    fn effects_stay_local() {
        let mut store = LayerStore::new();
        let root = store.create_layer();
        let child = store.create_layer();
        store.add_child(root, child);
        let _ = store.take_changes();

        store.set_flags(
            root,
            LayerFlags {
                draws_content: true,
                ..LayerFlags::default()
            },
        );
        let changes = store.take_changes();
        assert_eq!(changes.effects, [root.index()]);
    }

    #[test]
    fn scroll_and_opacity_channels() {
        let mut store = LayerStore::new();
        let root = store.create_layer();
        let child = store.create_layer();
        store.add_child(root, child);
        let _ = store.take_changes();

        store.set_scroll_delta(root, Vec2::new(0.0, 10.0));
        store.set_opacity(child, 0.5);
        let changes = store.take_changes();
        assert!(changes.scroll.contains(&child.index()));
        assert_eq!(changes.opacity, [child.index()]);
    }

    #[test]
    fn lifecycle_and_needs_resolve() {
        let mut store = LayerStore::new();
        assert!(!store.needs_resolve());
        let root = store.create_layer();
        assert!(store.needs_resolve());

        let changes = store.take_changes();
        assert_eq!(changes.added, [root.index()]);
        assert!(changes.topology_changed);
        assert!(!store.needs_resolve());
        assert!(store.take_changes().is_empty());

        store.set_bounds(root, Size::new(1.0, 1.0));
        store.destroy_layer(root);
        let changes = store.take_changes();
        assert_eq!(changes.removed, [root.index()]);
    }

    #[test]
    fn take_changes_into_reuses_buffer() {
        let mut store = LayerStore::new();
        let root = store.create_layer();
        let mut changes = PropertyChanges::default();
        store.take_changes_into(&mut changes);
        assert_eq!(changes.added.len(), 1);

        store.set_opacity(root, 0.5);
        store.take_changes_into(&mut changes);
        assert!(changes.added.is_empty());
        assert_eq!(changes.opacity, [root.index()]);
    }
}
