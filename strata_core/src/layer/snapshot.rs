// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frozen copies of a layer tree.

use alloc::vec::Vec;

use kurbo::{Point, Size, Vec2};

use super::id::{INVALID, LayerId};
use super::props::{
    AnimationState, BlendMode, LayerFlags, PositionConstraint, Reflection, ScrollState,
};
use super::source::LayerSource;
use super::store::LayerStore;
use super::traverse::Children;
use crate::geometry::Point3;
use crate::transform::Transform3d;

/// A structurally immutable copy of a [`LayerStore`].
///
/// A snapshot models the tree as a compositor sees it between commits. Its
/// topology and most properties are fixed, but scroll deltas and container
/// size deltas can still be applied, so scrolling can be resolved without
/// going back to the store.
///
/// Handles from the source store remain valid against the snapshot.
#[derive(Clone, Debug)]
pub struct LayerSnapshot {
    parent: Vec<u32>,
    first_child: Vec<u32>,
    next_sibling: Vec<u32>,
    generation: Vec<u32>,
    alive: Vec<bool>,

    scroll_parent: Vec<u32>,
    clip_parent: Vec<u32>,

    bounds: Vec<Size>,
    position: Vec<Point>,
    transform: Vec<Transform3d>,
    transform_origin: Vec<Point3>,
    opacity: Vec<f32>,
    blend_mode: Vec<BlendMode>,
    sorting_context: Vec<u32>,
    flags: Vec<LayerFlags>,
    scroll: Vec<ScrollState>,
    position_constraint: Vec<PositionConstraint>,
    animation: Vec<AnimationState>,
    reflection: Vec<Option<Reflection>>,
}

impl LayerStore {
    /// Takes a snapshot of the current tree.
    ///
    /// Dirty state is neither read nor drained.
    #[must_use]
    pub fn snapshot(&self) -> LayerSnapshot {
        let alive = (0..self.len)
            .map(|idx| !self.free_list.contains(&idx))
            .collect();
        LayerSnapshot {
            parent: self.parent.clone(),
            first_child: self.first_child.clone(),
            next_sibling: self.next_sibling.clone(),
            generation: self.generation.clone(),
            alive,
            scroll_parent: self.scroll_parent.clone(),
            clip_parent: self.clip_parent.clone(),
            bounds: self.bounds.clone(),
            position: self.position.clone(),
            transform: self.transform.clone(),
            transform_origin: self.transform_origin.clone(),
            opacity: self.opacity.clone(),
            blend_mode: self.blend_mode.clone(),
            sorting_context: self.sorting_context.clone(),
            flags: self.flags.clone(),
            scroll: self.scroll.clone(),
            position_constraint: self.position_constraint.clone(),
            animation: self.animation.clone(),
            reflection: self.reflection.clone(),
        }
    }
}

impl LayerSnapshot {
    /// Returns whether the handle refers to a layer captured by this snapshot.
    #[must_use]
    pub fn contains(&self, id: LayerId) -> bool {
        let i = id.slot();
        i < self.alive.len() && self.alive[i] && self.generation[i] == id.generation
    }

    /// Number of layers captured.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.alive.iter().filter(|&&a| a).count()
    }

    /// Returns an iterator over the direct children of a layer.
    #[must_use]
    pub fn children(&self, id: LayerId) -> Children<'_> {
        self.validate(id);
        Children::new(
            &self.next_sibling,
            &self.generation,
            self.first_child[id.slot()],
        )
    }

    /// Replaces the uncommitted scroll delta of a layer.
    pub fn set_scroll_delta(&mut self, id: LayerId, delta: Vec2) {
        self.validate(id);
        self.scroll[id.slot()].delta = delta;
    }

    /// Replaces the fixed-position container size delta of a layer.
    pub fn set_size_delta(&mut self, id: LayerId, size_delta: Vec2) {
        self.validate(id);
        self.scroll[id.slot()].size_delta = size_delta;
    }

    fn validate(&self, id: LayerId) {
        assert!(
            self.contains(id),
            "stale LayerId: {id:?} (not present in snapshot)"
        );
    }

    fn link(&self, idx: u32) -> Option<LayerId> {
        (idx != INVALID).then(|| LayerId {
            idx,
            generation: self.generation[idx as usize],
        })
    }
}

impl LayerSource for LayerSnapshot {
    fn slot_count(&self) -> usize {
        self.alive.len()
    }

    fn parent(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        self.link(self.parent[id.slot()])
    }

    fn children(&self, id: LayerId) -> impl Iterator<Item = LayerId> + '_ {
        Self::children(self, id)
    }

    fn bounds(&self, id: LayerId) -> Size {
        self.validate(id);
        self.bounds[id.slot()]
    }

    fn position(&self, id: LayerId) -> Point {
        self.validate(id);
        self.position[id.slot()]
    }

    fn transform(&self, id: LayerId) -> Transform3d {
        self.validate(id);
        self.transform[id.slot()]
    }

    fn transform_origin(&self, id: LayerId) -> Point3 {
        self.validate(id);
        self.transform_origin[id.slot()]
    }

    fn opacity(&self, id: LayerId) -> f32 {
        self.validate(id);
        self.opacity[id.slot()]
    }

    fn blend_mode(&self, id: LayerId) -> BlendMode {
        self.validate(id);
        self.blend_mode[id.slot()]
    }

    fn sorting_context(&self, id: LayerId) -> u32 {
        self.validate(id);
        self.sorting_context[id.slot()]
    }

    fn flags(&self, id: LayerId) -> LayerFlags {
        self.validate(id);
        self.flags[id.slot()]
    }

    fn scroll(&self, id: LayerId) -> ScrollState {
        self.validate(id);
        self.scroll[id.slot()]
    }

    fn position_constraint(&self, id: LayerId) -> PositionConstraint {
        self.validate(id);
        self.position_constraint[id.slot()]
    }

    fn animation(&self, id: LayerId) -> AnimationState {
        self.validate(id);
        self.animation[id.slot()]
    }

    fn reflection(&self, id: LayerId) -> Option<Reflection> {
        self.validate(id);
        self.reflection[id.slot()]
    }

    fn scroll_parent(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        self.link(self.scroll_parent[id.slot()])
    }

    fn clip_parent(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        self.link(self.clip_parent[id.slot()])
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn snapshot_copies_structure_and_properties() {
        let mut store = LayerStore::new();
        let root = store.create_layer();
        let a = store.create_layer();
        let b = store.create_layer();
        store.add_child(root, a);
        store.add_child(root, b);
        store.set_opacity(b, 0.5);
        store.set_scroll_parent(b, Some(a));

        let snap = store.snapshot();
        assert_eq!(snap.layer_count(), 3);
        let kids: Vec<_> = snap.children(root).collect();
        assert_eq!(kids, vec![a, b]);
        assert_eq!(LayerSource::parent(&snap, a), Some(root));
        assert_eq!(LayerSource::opacity(&snap, b), 0.5);
        assert_eq!(LayerSource::scroll_parent(&snap, b), Some(a));
    }

    #[test]
    fn deltas_do_not_touch_the_store() {
        let mut store = LayerStore::new();
        let root = store.create_layer();
        let mut snap = store.snapshot();
        snap.set_scroll_delta(root, Vec2::new(0.0, 12.0));
        snap.set_size_delta(root, Vec2::new(3.0, 4.0));
        assert_eq!(LayerSource::scroll(&snap, root).delta, Vec2::new(0.0, 12.0));
        assert_eq!(
            LayerSource::scroll(&snap, root).size_delta,
            Vec2::new(3.0, 4.0)
        );
        assert_eq!(store.scroll(root), ScrollState::default());
    }

    #[test]
    fn destroyed_layers_are_not_captured() {
        let mut store = LayerStore::new();
        let root = store.create_layer();
        let gone = store.create_layer();
        store.destroy_layer(gone);
        let snap = store.snapshot();
        assert!(snap.contains(root));
        assert!(!snap.contains(gone));
        assert_eq!(snap.layer_count(), 1);
    }

    #[test]
    #[should_panic(expected = "stale LayerId")]
    fn later_layers_are_unknown() {
        let mut store = LayerStore::new();
        let _root = store.create_layer();
        let mut snap = store.snapshot();
        let late = store.create_layer();
        snap.set_scroll_delta(late, Vec2::ZERO);
    }
}
