// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use super::id::{INVALID, LayerId};

/// An iterator over the direct children of a layer.
///
/// Created by [`LayerStore::children`](super::LayerStore::children) and
/// [`LayerSnapshot::children`](super::LayerSnapshot::children). Walks the
/// sibling links shared by both layouts.
#[derive(Clone, Debug)]
pub struct Children<'a> {
    next_sibling: &'a [u32],
    generation: &'a [u32],
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(next_sibling: &'a [u32], generation: &'a [u32], first: u32) -> Self {
        Self {
            next_sibling,
            generation,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = LayerId;

    fn next(&mut self) -> Option<LayerId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.next_sibling[idx as usize];
        Some(LayerId {
            idx,
            generation: self.generation[idx as usize],
        })
    }
}

impl core::iter::FusedIterator for Children<'_> {}
