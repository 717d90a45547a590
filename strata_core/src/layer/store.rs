// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays layer storage with allocation, topology, and property management.

use alloc::vec::Vec;

use kurbo::{Point, Size, Vec2};
use understory_dirty::{Channel, CycleHandling, DirtyTracker, EagerPolicy};

use super::id::{INVALID, LayerId};
use super::props::{
    AnimationState, BlendMode, LayerFlags, PositionConstraint, Reflection, ScrollState,
};
use super::source::LayerSource;
use super::traverse::Children;
use crate::dirty;
use crate::geometry::Point3;
use crate::transform::Transform3d;

/// Channels whose dirtiness flows from a parent to its children.
const INHERITED: [Channel; 3] = [dirty::GEOMETRY, dirty::OPACITY, dirty::SCROLL];

/// Struct-of-arrays storage for all layers.
///
/// Layers are addressed by [`LayerId`] handles. Internally, each layer occupies
/// a slot in parallel arrays. Destroyed layers are recycled via a free list,
/// and generation counters prevent stale handle access.
#[derive(Debug)]
pub struct LayerStore {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Secondary relations (non-owning) --
    pub(crate) scroll_parent: Vec<u32>,
    pub(crate) clip_parent: Vec<u32>,

    // -- Properties (set by callers) --
    pub(crate) bounds: Vec<Size>,
    pub(crate) position: Vec<Point>,
    pub(crate) transform: Vec<Transform3d>,
    pub(crate) transform_origin: Vec<Point3>,
    pub(crate) opacity: Vec<f32>,
    pub(crate) blend_mode: Vec<BlendMode>,
    pub(crate) sorting_context: Vec<u32>,
    pub(crate) flags: Vec<LayerFlags>,
    pub(crate) scroll: Vec<ScrollState>,
    pub(crate) position_constraint: Vec<PositionConstraint>,
    pub(crate) animation: Vec<AnimationState>,
    pub(crate) reflection: Vec<Option<Reflection>>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,
    pub(crate) needs_resolve: bool,

    // -- Lifecycle tracking --
    pub(crate) pending_added: Vec<u32>,
    pub(crate) pending_removed: Vec<u32>,
}

impl Default for LayerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerStore {
    /// Creates an empty layer store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            scroll_parent: Vec::new(),
            clip_parent: Vec::new(),
            bounds: Vec::new(),
            position: Vec::new(),
            transform: Vec::new(),
            transform_origin: Vec::new(),
            opacity: Vec::new(),
            blend_mode: Vec::new(),
            sorting_context: Vec::new(),
            flags: Vec::new(),
            scroll: Vec::new(),
            position_constraint: Vec::new(),
            animation: Vec::new(),
            reflection: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            needs_resolve: false,
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
        }
    }

    // -- Allocation API --

    /// Creates a new layer and returns its handle.
    ///
    /// The layer starts detached, with empty bounds, an identity transform,
    /// full opacity, default [`LayerFlags`], and no scroll or animation state.
    pub fn create_layer(&mut self) -> LayerId {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            self.generation[idx as usize] += 1;
            self.reset_slot(idx as usize);
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.push_slot();
            self.generation.push(0);
            idx
        };

        self.pending_added.push(idx);
        self.dirty.mark(idx, dirty::TOPOLOGY);
        self.needs_resolve = true;

        self.id_at(idx)
    }

    /// Destroys a layer, freeing its slot for reuse.
    ///
    /// Scroll-parent and clip-parent references to the layer are cleared.
    ///
    /// # Panics
    ///
    /// Panics if the layer has children (remove them first) or if the handle
    /// is stale.
    pub fn destroy_layer(&mut self, id: LayerId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.first_child[idx as usize] == INVALID,
            "cannot destroy layer with children"
        );

        if self.parent[idx as usize] != INVALID {
            self.unlink_from_parent(idx);
        }

        for rel in self
            .scroll_parent
            .iter_mut()
            .chain(self.clip_parent.iter_mut())
        {
            if *rel == idx {
                *rel = INVALID;
            }
        }
        self.scroll_parent[idx as usize] = INVALID;
        self.clip_parent[idx as usize] = INVALID;

        self.dirty.remove_key(idx);

        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;

        self.free_list.push(idx);
        self.pending_removed.push(idx);
        self.dirty.mark(idx, dirty::TOPOLOGY);
        self.needs_resolve = true;
    }

    /// Returns whether the given handle refers to a live layer.
    #[must_use]
    pub fn is_alive(&self, id: LayerId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    /// Number of live layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    // -- Topology API --

    /// Adds `child` as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, or if `child` already has a parent.
    pub fn add_child(&mut self, parent: LayerId, child: LayerId) {
        self.validate(parent);
        self.validate(child);
        assert!(
            self.parent[child.idx as usize] == INVALID,
            "child already has a parent"
        );
        self.link_last_child(parent.idx, child.idx);
    }

    /// Removes `child` from its current parent.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the layer has no parent.
    pub fn remove_from_parent(&mut self, child: LayerId) {
        self.validate(child);
        let c = child.idx;
        assert!(self.parent[c as usize] != INVALID, "layer has no parent");

        let p = self.parent[c as usize];
        self.unlink_from_parent(c);
        for channel in INHERITED {
            self.dirty.remove_dependency(c, p, channel);
        }
        self.mark_subtree_inherited_dirty(c);
        self.dirty.mark(p, dirty::TOPOLOGY);
        self.needs_resolve = true;
    }

    /// Moves `child` to be the last child of `new_parent`.
    ///
    /// If `child` already has a parent, it is removed first.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale.
    pub fn reparent(&mut self, child: LayerId, new_parent: LayerId) {
        self.validate(child);
        self.validate(new_parent);

        if self.parent[child.idx as usize] != INVALID {
            let old_p = self.parent[child.idx as usize];
            self.unlink_from_parent(child.idx);
            for channel in INHERITED {
                self.dirty.remove_dependency(child.idx, old_p, channel);
            }
            self.dirty.mark(old_p, dirty::TOPOLOGY);
        }
        self.link_last_child(new_parent.idx, child.idx);
    }

    /// Inserts `child` before `sibling` in the sibling list.
    ///
    /// `child` must not already have a parent. `sibling` must have a parent.
    ///
    /// # Panics
    ///
    /// Panics if handles are stale, `child` already has a parent, or `sibling`
    /// has no parent.
    pub fn insert_before(&mut self, child: LayerId, sibling: LayerId) {
        self.validate(child);
        self.validate(sibling);
        let c = child.idx;
        let s = sibling.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );
        let p = self.parent[s as usize];
        assert!(p != INVALID, "sibling has no parent");

        self.parent[c as usize] = p;
        self.next_sibling[c as usize] = s;
        self.prev_sibling[c as usize] = self.prev_sibling[s as usize];

        if self.prev_sibling[s as usize] != INVALID {
            self.next_sibling[self.prev_sibling[s as usize] as usize] = c;
        } else {
            self.first_child[p as usize] = c;
        }
        self.prev_sibling[s as usize] = c;

        self.attach_dependencies(c, p);
    }

    /// Returns the parent of a layer, if any.
    #[must_use]
    pub fn parent(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        self.link(self.parent[id.idx as usize])
    }

    /// Returns an iterator over the direct children of a layer.
    #[must_use]
    pub fn children(&self, id: LayerId) -> Children<'_> {
        self.validate(id);
        Children::new(
            &self.next_sibling,
            &self.generation,
            self.first_child[id.idx as usize],
        )
    }

    /// Returns the layers that have no parent.
    #[must_use]
    pub fn roots(&self) -> Vec<LayerId> {
        (0..self.len)
            .filter(|&idx| self.parent[idx as usize] == INVALID && !self.free_list.contains(&idx))
            .map(|idx| self.id_at(idx))
            .collect()
    }

    /// Sets the layer whose scrolling moves `id` when that layer is not an
    /// ancestor.
    ///
    /// # Panics
    ///
    /// Panics if a handle is stale or `scroll_parent` is `id` itself.
    pub fn set_scroll_parent(&mut self, id: LayerId, scroll_parent: Option<LayerId>) {
        self.validate(id);
        let target = self.relation_target(id, scroll_parent);
        self.scroll_parent[id.idx as usize] = target;
        self.dirty.mark(id.idx, dirty::TOPOLOGY);
        self.needs_resolve = true;
    }

    /// Sets the layer whose clip applies to `id` instead of its parent's.
    ///
    /// # Panics
    ///
    /// Panics if a handle is stale or `clip_parent` is `id` itself.
    pub fn set_clip_parent(&mut self, id: LayerId, clip_parent: Option<LayerId>) {
        self.validate(id);
        let target = self.relation_target(id, clip_parent);
        self.clip_parent[id.idx as usize] = target;
        self.dirty.mark(id.idx, dirty::TOPOLOGY);
        self.needs_resolve = true;
    }

    /// Returns the scroll parent of a layer, if any.
    #[must_use]
    pub fn scroll_parent(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        self.link(self.scroll_parent[id.idx as usize])
    }

    /// Returns the clip parent of a layer, if any.
    #[must_use]
    pub fn clip_parent(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        self.link(self.clip_parent[id.idx as usize])
    }

    // -- Property getters (read-only, no dirty marking) --

    /// Returns the bounds of a layer.
    #[must_use]
    pub fn bounds(&self, id: LayerId) -> Size {
        self.validate(id);
        self.bounds[id.idx as usize]
    }

    /// Returns the position of a layer within its parent.
    #[must_use]
    pub fn position(&self, id: LayerId) -> Point {
        self.validate(id);
        self.position[id.idx as usize]
    }

    /// Returns the local transform of a layer.
    #[must_use]
    pub fn transform(&self, id: LayerId) -> Transform3d {
        self.validate(id);
        self.transform[id.idx as usize]
    }

    /// Returns the transform origin of a layer.
    #[must_use]
    pub fn transform_origin(&self, id: LayerId) -> Point3 {
        self.validate(id);
        self.transform_origin[id.idx as usize]
    }

    /// Returns the opacity of a layer.
    #[must_use]
    pub fn opacity(&self, id: LayerId) -> f32 {
        self.validate(id);
        self.opacity[id.idx as usize]
    }

    /// Returns the blend mode of a layer.
    #[must_use]
    pub fn blend_mode(&self, id: LayerId) -> BlendMode {
        self.validate(id);
        self.blend_mode[id.idx as usize]
    }

    /// Returns the 3D sorting context id of a layer.
    #[must_use]
    pub fn sorting_context(&self, id: LayerId) -> u32 {
        self.validate(id);
        self.sorting_context[id.idx as usize]
    }

    /// Returns the flags of a layer.
    #[must_use]
    pub fn flags(&self, id: LayerId) -> LayerFlags {
        self.validate(id);
        self.flags[id.idx as usize]
    }

    /// Returns the scroll state of a layer.
    #[must_use]
    pub fn scroll(&self, id: LayerId) -> ScrollState {
        self.validate(id);
        self.scroll[id.idx as usize]
    }

    /// Returns the fixed-position constraint of a layer.
    #[must_use]
    pub fn position_constraint(&self, id: LayerId) -> PositionConstraint {
        self.validate(id);
        self.position_constraint[id.idx as usize]
    }

    /// Returns the animation state of a layer.
    #[must_use]
    pub fn animation(&self, id: LayerId) -> AnimationState {
        self.validate(id);
        self.animation[id.idx as usize]
    }

    /// Returns the reflection of a layer, if any.
    #[must_use]
    pub fn reflection(&self, id: LayerId) -> Option<Reflection> {
        self.validate(id);
        self.reflection[id.idx as usize]
    }

    /// Returns whether anything changed since the last
    /// [`take_changes`](Self::take_changes).
    #[must_use]
    pub fn needs_resolve(&self) -> bool {
        self.needs_resolve
    }

    // -- Mutation API (auto-marks dirty) --

    /// Sets the bounds of a layer.
    pub fn set_bounds(&mut self, id: LayerId, bounds: Size) {
        self.validate(id);
        self.bounds[id.idx as usize] = bounds;
        self.mark_eager(id.idx, dirty::GEOMETRY);
    }

    /// Sets the position of a layer within its parent.
    pub fn set_position(&mut self, id: LayerId, position: Point) {
        self.validate(id);
        self.position[id.idx as usize] = position;
        self.mark_eager(id.idx, dirty::GEOMETRY);
    }

    /// Sets the local transform of a layer.
    ///
    /// Marks the GEOMETRY channel dirty with eager propagation to descendants.
    pub fn set_transform(&mut self, id: LayerId, transform: Transform3d) {
        self.validate(id);
        self.transform[id.idx as usize] = transform;
        self.mark_eager(id.idx, dirty::GEOMETRY);
    }

    /// Sets the transform origin of a layer.
    pub fn set_transform_origin(&mut self, id: LayerId, origin: Point3) {
        self.validate(id);
        self.transform_origin[id.idx as usize] = origin;
        self.mark_eager(id.idx, dirty::GEOMETRY);
    }

    /// Sets the opacity of a layer.
    ///
    /// Marks the OPACITY channel dirty with eager propagation to descendants.
    pub fn set_opacity(&mut self, id: LayerId, opacity: f32) {
        self.validate(id);
        self.opacity[id.idx as usize] = opacity;
        self.mark_eager(id.idx, dirty::OPACITY);
    }

    /// Sets the blend mode of a layer.
    pub fn set_blend_mode(&mut self, id: LayerId, mode: BlendMode) {
        self.validate(id);
        self.blend_mode[id.idx as usize] = mode;
        self.mark_local(id.idx, dirty::EFFECTS);
    }

    /// Sets the 3D sorting context id of a layer (0 for none).
    pub fn set_sorting_context(&mut self, id: LayerId, context: u32) {
        self.validate(id);
        self.sorting_context[id.idx as usize] = context;
        self.mark_local(id.idx, dirty::EFFECTS);
    }

    /// Sets the flags of a layer.
    ///
    /// Hidden and flattening flags shape the whole subtree, so GEOMETRY is
    /// marked eagerly in addition to EFFECTS.
    pub fn set_flags(&mut self, id: LayerId, flags: LayerFlags) {
        self.validate(id);
        self.flags[id.idx as usize] = flags;
        self.mark_local(id.idx, dirty::EFFECTS);
        self.mark_eager(id.idx, dirty::GEOMETRY);
    }

    /// Sets the committed scroll offset of a layer.
    pub fn set_scroll_offset(&mut self, id: LayerId, offset: Vec2) {
        self.validate(id);
        self.scroll[id.idx as usize].offset = offset;
        self.mark_eager(id.idx, dirty::SCROLL);
    }

    /// Sets the uncommitted scroll delta of a layer.
    pub fn set_scroll_delta(&mut self, id: LayerId, delta: Vec2) {
        self.validate(id);
        self.scroll[id.idx as usize].delta = delta;
        self.mark_eager(id.idx, dirty::SCROLL);
    }

    /// Sets how much a fixed-position container has grown since layout.
    pub fn set_size_delta(&mut self, id: LayerId, size_delta: Vec2) {
        self.validate(id);
        self.scroll[id.idx as usize].size_delta = size_delta;
        self.mark_eager(id.idx, dirty::SCROLL);
    }

    /// Sets the fixed-position constraint of a layer.
    pub fn set_position_constraint(&mut self, id: LayerId, constraint: PositionConstraint) {
        self.validate(id);
        self.position_constraint[id.idx as usize] = constraint;
        self.mark_eager(id.idx, dirty::GEOMETRY);
    }

    /// Sets the animation state of a layer.
    pub fn set_animation(&mut self, id: LayerId, animation: AnimationState) {
        self.validate(id);
        self.animation[id.idx as usize] = animation;
        self.mark_local(id.idx, dirty::EFFECTS);
    }

    /// Sets or clears the reflection of a layer.
    pub fn set_reflection(&mut self, id: LayerId, reflection: Option<Reflection>) {
        self.validate(id);
        self.reflection[id.idx as usize] = reflection;
        self.mark_local(id.idx, dirty::EFFECTS);
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: LayerId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale LayerId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    pub(crate) fn id_at(&self, idx: u32) -> LayerId {
        LayerId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    fn link(&self, idx: u32) -> Option<LayerId> {
        (idx != INVALID).then(|| self.id_at(idx))
    }

    fn relation_target(&self, id: LayerId, target: Option<LayerId>) -> u32 {
        match target {
            Some(t) => {
                self.validate(t);
                assert!(t != id, "a layer cannot be its own scroll or clip parent");
                t.idx
            }
            None => INVALID,
        }
    }

    fn push_slot(&mut self) {
        self.parent.push(INVALID);
        self.first_child.push(INVALID);
        self.next_sibling.push(INVALID);
        self.prev_sibling.push(INVALID);
        self.scroll_parent.push(INVALID);
        self.clip_parent.push(INVALID);
        self.bounds.push(Size::ZERO);
        self.position.push(Point::ZERO);
        self.transform.push(Transform3d::IDENTITY);
        self.transform_origin.push(Point3::ZERO);
        self.opacity.push(1.0);
        self.blend_mode.push(BlendMode::Normal);
        self.sorting_context.push(0);
        self.flags.push(LayerFlags::default());
        self.scroll.push(ScrollState::default());
        self.position_constraint
            .push(PositionConstraint::Unconstrained);
        self.animation.push(AnimationState::default());
        self.reflection.push(None);
    }

    fn reset_slot(&mut self, i: usize) {
        self.parent[i] = INVALID;
        self.first_child[i] = INVALID;
        self.next_sibling[i] = INVALID;
        self.prev_sibling[i] = INVALID;
        self.scroll_parent[i] = INVALID;
        self.clip_parent[i] = INVALID;
        self.bounds[i] = Size::ZERO;
        self.position[i] = Point::ZERO;
        self.transform[i] = Transform3d::IDENTITY;
        self.transform_origin[i] = Point3::ZERO;
        self.opacity[i] = 1.0;
        self.blend_mode[i] = BlendMode::Normal;
        self.sorting_context[i] = 0;
        self.flags[i] = LayerFlags::default();
        self.scroll[i] = ScrollState::default();
        self.position_constraint[i] = PositionConstraint::Unconstrained;
        self.animation[i] = AnimationState::default();
        self.reflection[i] = None;
    }

    fn link_last_child(&mut self, p: u32, c: u32) {
        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            // Walk to last child.
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }

        self.attach_dependencies(c, p);
    }

    /// Adds child-to-parent edges for the inherited channels and marks the
    /// new subtree dirty under its ancestry.
    fn attach_dependencies(&mut self, c: u32, p: u32) {
        for channel in INHERITED {
            let _ = self.dirty.add_dependency(c, p, channel);
        }
        self.mark_subtree_inherited_dirty(c);
        self.dirty.mark(p, dirty::TOPOLOGY);
        self.needs_resolve = true;
    }

    /// Removes `idx` from its parent's child list without touching dirty state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }

    fn mark_eager(&mut self, idx: u32, channel: Channel) {
        self.dirty.mark_with(idx, channel, &EagerPolicy);
        self.needs_resolve = true;
    }

    fn mark_local(&mut self, idx: u32, channel: Channel) {
        self.dirty.mark(idx, channel);
        self.needs_resolve = true;
    }

    fn mark_subtree_inherited_dirty(&mut self, idx: u32) {
        for channel in INHERITED {
            self.dirty.mark_with(idx, channel, &EagerPolicy);
        }
    }
}

impl LayerSource for LayerStore {
    fn slot_count(&self) -> usize {
        self.len as usize
    }

    fn parent(&self, id: LayerId) -> Option<LayerId> {
        Self::parent(self, id)
    }

    fn children(&self, id: LayerId) -> impl Iterator<Item = LayerId> + '_ {
        Self::children(self, id)
    }

    fn bounds(&self, id: LayerId) -> Size {
        Self::bounds(self, id)
    }

    fn position(&self, id: LayerId) -> Point {
        Self::position(self, id)
    }

    fn transform(&self, id: LayerId) -> Transform3d {
        Self::transform(self, id)
    }

    fn transform_origin(&self, id: LayerId) -> Point3 {
        Self::transform_origin(self, id)
    }

    fn opacity(&self, id: LayerId) -> f32 {
        Self::opacity(self, id)
    }

    fn blend_mode(&self, id: LayerId) -> BlendMode {
        Self::blend_mode(self, id)
    }

    fn sorting_context(&self, id: LayerId) -> u32 {
        Self::sorting_context(self, id)
    }

    fn flags(&self, id: LayerId) -> LayerFlags {
        Self::flags(self, id)
    }

    fn scroll(&self, id: LayerId) -> ScrollState {
        Self::scroll(self, id)
    }

    fn position_constraint(&self, id: LayerId) -> PositionConstraint {
        Self::position_constraint(self, id)
    }

    fn animation(&self, id: LayerId) -> AnimationState {
        Self::animation(self, id)
    }

    fn reflection(&self, id: LayerId) -> Option<Reflection> {
        Self::reflection(self, id)
    }

    fn scroll_parent(&self, id: LayerId) -> Option<LayerId> {
        Self::scroll_parent(self, id)
    }

    fn clip_parent(&self, id: LayerId) -> Option<LayerId> {
        Self::clip_parent(self, id)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn create_and_destroy() {
        let mut store = LayerStore::new();
        let id = store.create_layer();
        assert!(store.is_alive(id));
        assert_eq!(store.layer_count(), 1);
        store.destroy_layer(id);
        assert!(!store.is_alive(id));
        assert_eq!(store.layer_count(), 0);
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut store = LayerStore::new();
        let id1 = store.create_layer();
        store.destroy_layer(id1);
        let id2 = store.create_layer();
        assert!(!store.is_alive(id1));
        assert!(store.is_alive(id2));
        assert_eq!(id1.idx, id2.idx);
        assert_ne!(id1.generation, id2.generation);
    }

    #[test]
    fn reused_slot_is_reset() {
        let mut store = LayerStore::new();
        let id = store.create_layer();
        store.set_opacity(id, 0.25);
        store.set_bounds(id, Size::new(10.0, 10.0));
        store.destroy_layer(id);
        let fresh = store.create_layer();
        assert_eq!(store.opacity(fresh), 1.0);
        assert_eq!(store.bounds(fresh), Size::ZERO);
        assert_eq!(store.flags(fresh), LayerFlags::default());
    }

    #[test]
    fn add_child_and_query() {
        let mut store = LayerStore::new();
        let parent = store.create_layer();
        let child1 = store.create_layer();
        let child2 = store.create_layer();

        store.add_child(parent, child1);
        store.add_child(parent, child2);

        assert_eq!(store.parent(child1), Some(parent));
        assert_eq!(store.parent(child2), Some(parent));

        let kids: Vec<_> = store.children(parent).collect();
        assert_eq!(kids, vec![child1, child2]);
    }

    #[test]
    fn remove_from_parent_works() {
        let mut store = LayerStore::new();
        let parent = store.create_layer();
        let child = store.create_layer();

        store.add_child(parent, child);
        store.remove_from_parent(child);
        assert_eq!(store.parent(child), None);
        assert!(store.children(parent).next().is_none());
    }

    #[test]
    fn insert_before_works() {
        let mut store = LayerStore::new();
        let parent = store.create_layer();
        let a = store.create_layer();
        let b = store.create_layer();
        let c = store.create_layer();

        store.add_child(parent, a);
        store.add_child(parent, c);
        store.insert_before(b, c);
        let first = store.create_layer();
        store.insert_before(first, a);

        let kids: Vec<_> = store.children(parent).collect();
        assert_eq!(kids, [first, a, b, c]);
    }

    #[test]
    fn reparent_works() {
        let mut store = LayerStore::new();
        let p1 = store.create_layer();
        let p2 = store.create_layer();
        let child = store.create_layer();

        store.add_child(p1, child);
        store.reparent(child, p2);
        assert_eq!(store.parent(child), Some(p2));
        assert!(store.children(p1).next().is_none());
    }

    #[test]
    fn roots_returns_parentless_layers() {
        let mut store = LayerStore::new();
        let a = store.create_layer();
        let b = store.create_layer();
        let c = store.create_layer();
        store.add_child(a, c);

        let roots = store.roots();
        assert!(roots.contains(&a));
        assert!(roots.contains(&b));
        assert!(!roots.contains(&c));
    }

    #[test]
    fn destroying_a_scroll_parent_clears_the_relation() {
        let mut store = LayerStore::new();
        let root = store.create_layer();
        let scroller = store.create_layer();
        let child = store.create_layer();
        store.add_child(root, scroller);
        store.add_child(root, child);
        store.set_scroll_parent(child, Some(scroller));
        store.set_clip_parent(child, Some(scroller));
        assert_eq!(store.scroll_parent(child), Some(scroller));

        store.remove_from_parent(scroller);
        store.destroy_layer(scroller);
        assert_eq!(store.scroll_parent(child), None);
        assert_eq!(store.clip_parent(child), None);
    }

    #[test]
    #[should_panic(expected = "cannot destroy layer with children")]
    fn destroy_with_children_panics() {
        let mut store = LayerStore::new();
        let parent = store.create_layer();
        let child = store.create_layer();
        store.add_child(parent, child);
        store.destroy_layer(parent);
    }

    #[test]
    #[should_panic(expected = "stale LayerId")]
    fn destroyed_handle_panics_on_set_transform() {
        let mut store = LayerStore::new();
        let id = store.create_layer();
        store.destroy_layer(id);
        store.set_transform(id, Transform3d::IDENTITY);
    }

    #[test]
    #[should_panic(expected = "stale LayerId")]
    fn destroyed_handle_panics_on_add_child() {
        let mut store = LayerStore::new();
        let root = store.create_layer();
        let id = store.create_layer();
        store.destroy_layer(id);
        store.add_child(root, id);
    }

    #[test]
    #[should_panic(expected = "cannot be its own")]
    fn self_scroll_parent_panics() {
        let mut store = LayerStore::new();
        let id = store.create_layer();
        store.set_scroll_parent(id, Some(id));
    }

    #[test]
    #[should_panic(expected = "child already has a parent")]
    fn double_add_panics() {
        let mut store = LayerStore::new();
        let a = store.create_layer();
        let b = store.create_layer();
        let c = store.create_layer();
        store.add_child(a, c);
        store.add_child(b, c);
    }

    #[test]
    fn setters_round_trip() {
        let mut store = LayerStore::new();
        let id = store.create_layer();
        store.set_transform(id, Transform3d::from_scale(2.0, 2.0, 2.0));
        store.set_position(id, Point::new(3.0, 4.0));
        store.set_scroll_offset(id, Vec2::new(1.0, 2.0));
        store.set_scroll_delta(id, Vec2::new(0.5, 0.5));
        store.set_sorting_context(id, 7);
        assert_eq!(store.transform(id), Transform3d::from_scale(2.0, 2.0, 2.0));
        assert_eq!(store.position(id), Point::new(3.0, 4.0));
        assert_eq!(store.scroll(id).total_offset(), Vec2::new(1.5, 2.5));
        assert_eq!(store.sorting_context(id), 7);
        assert!(LayerSource::is_3d_sorted(&store, id));
    }
}
