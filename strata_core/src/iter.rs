// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Walking a [`ResolvedTree`] in compositing order.
//!
//! A [`LayerIterator`] visits every surface's layer list, stepping into
//! contributing surfaces as it meets them. Each step reports a
//! [`LayerVisit`] whose [`VisitRole`] says what the layer stands for at that
//! point:
//!
//! - [`TargetSurface`](VisitRole::TargetSurface): the surface the following
//!   (or preceding) layers draw into.
//! - [`ContributingSurface`](VisitRole::ContributingSurface): a finished
//!   surface drawn into its parent target.
//! - [`Itself`](VisitRole::Itself): the layer's own content.
//!
//! [`FrontToBack`] order suits occlusion culling and hit testing: content
//! comes before the surface it is drawn into. [`BackToFront`] is paint
//! order.

use alloc::vec::Vec;
use core::iter::FusedIterator;
use core::marker::PhantomData;

use crate::draw::ResolvedTree;
use crate::layer::LayerId;

/// What a visited layer stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VisitRole {
    /// The surface owned by the layer, as a render target.
    TargetSurface,
    /// The surface owned by the layer, drawn into its parent target.
    ContributingSurface,
    /// The layer's own content.
    Itself,
}

/// One step of a [`LayerIterator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerVisit {
    /// The visited layer.
    pub layer: LayerId,
    /// The layer owning the surface being drawn into.
    pub target: LayerId,
    /// What the layer stands for.
    pub role: VisitRole,
}

/// Traversal direction of a [`LayerIterator`].
///
/// Implemented by [`FrontToBack`] and [`BackToFront`].
pub trait IterationOrder {
    /// `true` for front-to-back traversal.
    const FRONT_TO_BACK: bool;
}

/// Front-to-back traversal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrontToBack;

impl IterationOrder for FrontToBack {
    const FRONT_TO_BACK: bool = true;
}

/// Back-to-front (paint order) traversal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BackToFront;

impl IterationOrder for BackToFront {
    const FRONT_TO_BACK: bool = false;
}

/// A place in the output: an entry of a surface's layer list, or the
/// surface itself when `index` is `None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Position {
    /// Index into the render surface layer list.
    target: usize,
    index: Option<usize>,
}

/// Iterator over the layers and surfaces of a [`ResolvedTree`].
///
/// Created by [`ResolvedTree::front_to_back`] and
/// [`ResolvedTree::back_to_front`]. Two iterators compare equal when they
/// walk the same result and stand at the same position.
#[derive(Clone, Debug)]
pub struct LayerIterator<'a, O> {
    tree: &'a ResolvedTree,
    current: Option<Position>,
    /// Where to resume in each enclosing surface.
    stack: Vec<Position>,
    order: PhantomData<O>,
}

impl<'a, O: IterationOrder> LayerIterator<'a, O> {
    /// Starts a traversal of `tree`.
    #[must_use]
    pub fn new(tree: &'a ResolvedTree) -> Self {
        let mut it = Self {
            tree,
            current: None,
            stack: Vec::new(),
            order: PhantomData,
        };
        if tree.render_surface_layer_list().is_empty() {
            return it;
        }
        if O::FRONT_TO_BACK {
            it.current = Some(Position {
                target: 0,
                index: tree.layer_list_at(0).len().checked_sub(1),
            });
            it.descend_to_front();
        } else {
            it.current = Some(Position {
                target: 0,
                index: None,
            });
        }
        it
    }

    /// A fresh iterator at the start of the same traversal.
    #[must_use]
    pub fn begin(&self) -> Self {
        Self::new(self.tree)
    }

    /// The visit at the current position, without advancing.
    #[must_use]
    pub fn peek(&self) -> Option<LayerVisit> {
        let pos = self.current?;
        let owner = *self.tree.render_surface_layer_list().get(pos.target)?;
        let Some(index) = pos.index else {
            return Some(LayerVisit {
                layer: owner,
                target: owner,
                role: VisitRole::TargetSurface,
            });
        };
        let layer = *self.tree.layer_list_at(pos.target).get(index)?;
        let role = if self.contributing_surface(pos).is_some() {
            VisitRole::ContributingSurface
        } else {
            VisitRole::Itself
        };
        Some(LayerVisit {
            layer,
            target: owner,
            role,
        })
    }

    /// The render surface layer list index of the surface contributed by
    /// the entry at `pos`, if the entry stands for a child surface.
    fn contributing_surface(&self, pos: Position) -> Option<usize> {
        let owner = *self.tree.render_surface_layer_list().get(pos.target)?;
        let layer = *self.tree.layer_list_at(pos.target).get(pos.index?)?;
        if layer == owner {
            return None;
        }
        self.tree.surface_position(layer)
    }

    /// Steps into contributing surfaces until the current entry is drawn
    /// content or a target surface.
    fn descend_to_front(&mut self) {
        while let Some(pos) = self.current
            && let Some(child) = self.contributing_surface(pos)
        {
            self.stack.push(pos);
            self.current = Some(Position {
                target: child,
                index: self.tree.layer_list_at(child).len().checked_sub(1),
            });
        }
    }

    fn advance(&mut self) {
        let Some(pos) = self.current else {
            return;
        };
        if O::FRONT_TO_BACK {
            match pos.index {
                Some(index) => {
                    self.current = Some(Position {
                        target: pos.target,
                        index: index.checked_sub(1),
                    });
                    self.descend_to_front();
                }
                // Back in the parent, at the entry for the finished surface.
                None => self.current = self.stack.pop(),
            }
            return;
        }

        if let Some(child) = self.contributing_surface(pos) {
            self.stack.push(pos);
            self.current = Some(Position {
                target: child,
                index: None,
            });
            return;
        }
        let mut pos = pos;
        loop {
            let next = pos.index.map_or(0, |i| i + 1);
            if next < self.tree.layer_list_at(pos.target).len() {
                self.current = Some(Position {
                    target: pos.target,
                    index: Some(next),
                });
                return;
            }
            match self.stack.pop() {
                Some(parent) => pos = parent,
                None => {
                    self.current = None;
                    return;
                }
            }
        }
    }
}

impl<O: IterationOrder> Iterator for LayerIterator<'_, O> {
    type Item = LayerVisit;

    fn next(&mut self) -> Option<LayerVisit> {
        let visit = self.peek()?;
        self.advance();
        Some(visit)
    }
}

impl<O: IterationOrder> FusedIterator for LayerIterator<'_, O> {}

impl<O> PartialEq for LayerIterator<'_, O> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.tree, other.tree) && self.current == other.current
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Point, Size};

    use super::*;
    use crate::draw::{ResolveInputs, resolve};
    use crate::layer::{LayerFlags, LayerStore};

    use super::VisitRole::{ContributingSurface, Itself, TargetSurface};

    /// root draws, owns `group` (a translucent surface over `a` and `b`),
    /// then `c` on top.
    fn scene() -> (ResolvedTree, [LayerId; 5]) {
        let mut store = LayerStore::new();
        let flags = LayerFlags {
            draws_content: true,
            ..LayerFlags::default()
        };
        let mut add = |parent: Option<LayerId>| {
            let id = store.create_layer();
            if let Some(parent) = parent {
                store.add_child(parent, id);
            }
            store.set_bounds(id, Size::new(40.0, 40.0));
            store.set_position(id, Point::new(5.0, 5.0));
            store.set_flags(id, flags);
            id
        };
        let root = add(None);
        let group = add(Some(root));
        let a = add(Some(group));
        let b = add(Some(group));
        let c = add(Some(root));
        store.set_opacity(group, 0.5);
        let resolved = resolve(&store, &ResolveInputs::new(root, Size::new(100.0, 100.0)));
        (resolved, [root, group, a, b, c])
    }

    fn steps<O: IterationOrder>(it: LayerIterator<'_, O>) -> Vec<(LayerId, VisitRole)> {
        it.map(|v| (v.layer, v.role)).collect()
    }

    #[test]
    fn front_to_back_order() {
        let (resolved, [root, group, a, b, c]) = scene();
        assert_eq!(
            steps(resolved.front_to_back()),
            [
                (c, Itself),
                (b, Itself),
                (a, Itself),
                (group, Itself),
                (group, TargetSurface),
                (group, ContributingSurface),
                (root, Itself),
                (root, TargetSurface),
            ]
        );
    }

    #[test]
    fn back_to_front_order() {
        let (resolved, [root, group, a, b, c]) = scene();
        assert_eq!(
            steps(resolved.back_to_front()),
            [
                (root, TargetSurface),
                (root, Itself),
                (group, ContributingSurface),
                (group, TargetSurface),
                (group, Itself),
                (a, Itself),
                (b, Itself),
                (c, Itself),
            ]
        );
    }

    #[test]
    fn visits_report_their_target() {
        let (resolved, [root, group, a, b, _]) = scene();
        for visit in resolved.back_to_front() {
            let expected = match (visit.layer, visit.role) {
                (l, ContributingSurface) if l == group => root,
                (l, _) if l == a || l == b || l == group => group,
                _ => root,
            };
            assert_eq!(visit.target, expected, "{visit:?}");
        }
    }

    #[test]
    fn equality_tracks_position() {
        let (resolved, _) = scene();
        let start = resolved.front_to_back();
        let mut moved = start.begin();
        assert!(start == moved);
        let _ = moved.next();
        assert!(start != moved);
        assert!(moved.begin() == start);

        let count = start.clone().count();
        let mut end = start.begin();
        for _ in 0..count {
            let _ = end.next();
        }
        assert_eq!(end.next(), None);
        assert_eq!(end.next(), None);
    }

    #[test]
    fn empty_result_yields_nothing() {
        let resolved = ResolvedTree::new();
        assert_eq!(resolved.front_to_back().count(), 0);
        assert_eq!(resolved.back_to_front().count(), 0);
    }
}
