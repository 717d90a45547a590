// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Depth ordering of layers that share a 3D rendering context.

use alloc::vec::Vec;

use super::overlap::{OverlapResult, check_overlap};
use super::shape::LayerShape;
use crate::layer::LayerId;

/// Tuning for [`LayerSorter`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SorterConfig {
    /// Fraction of the z range spanned by the sorted layers below which two
    /// depths count as equal.
    pub z_threshold_factor: f64,
    /// Lower bound on the equal-depth threshold, for sets with no z range.
    pub min_z_threshold: f64,
}

impl Default for SorterConfig {
    fn default() -> Self {
        Self {
            z_threshold_factor: 0.01,
            min_z_threshold: 1e-4,
        }
    }
}

/// Counters from a single [`LayerSorter::sort`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SortStats {
    /// Number of layers sorted.
    pub layers: usize,
    /// Ordering constraints found between pairs of layers.
    pub edges: usize,
    /// Cycles that had to be broken by dropping a constraint.
    pub cycles_broken: usize,
}

#[derive(Clone, Copy, Debug)]
struct GraphNode {
    shape: Option<LayerShape>,
    incoming: usize,
    placed: bool,
}

#[derive(Clone, Copy, Debug)]
struct GraphEdge {
    from: usize,
    to: usize,
    weight: f32,
    active: bool,
}

const UNVISITED: usize = usize::MAX;

/// Topological depth sorter.
///
/// Builds a constraint graph from pairwise [`check_overlap`] results and
/// emits layers back to front. Among layers with no remaining constraint,
/// the one earliest in the input goes first, so layers without a depth
/// difference keep their relative order. Graph buffers are kept between
/// calls.
#[derive(Debug, Default)]
pub struct LayerSorter {
    config: SorterConfig,
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    order: Vec<LayerId>,
    visit: Vec<usize>,
    path: Vec<usize>,
}

impl LayerSorter {
    /// Creates a sorter with the given tuning.
    #[must_use]
    pub fn new(config: SorterConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Returns the tuning in use.
    #[must_use]
    pub fn config(&self) -> SorterConfig {
        self.config
    }

    /// Replaces the tuning.
    pub fn set_config(&mut self, config: SorterConfig) {
        self.config = config;
    }

    /// Reorders `layers` back to front.
    ///
    /// `shape_of` places each layer in the shared space. Layers it returns
    /// `None` for have no depth and only move to make room for others.
    pub fn sort(
        &mut self,
        layers: &mut [LayerId],
        mut shape_of: impl FnMut(LayerId) -> Option<LayerShape>,
    ) -> SortStats {
        let n = layers.len();
        let mut stats = SortStats {
            layers: n,
            ..SortStats::default()
        };
        if n < 2 {
            return stats;
        }

        self.nodes.clear();
        self.edges.clear();
        self.order.clear();

        let mut min_z = f64::INFINITY;
        let mut max_z = f64::NEG_INFINITY;
        for &id in layers.iter() {
            let shape = shape_of(id);
            if let Some(s) = &shape {
                min_z = min_z.min(s.origin.z);
                max_z = max_z.max(s.origin.z);
            }
            self.nodes.push(GraphNode {
                shape,
                incoming: 0,
                placed: false,
            });
        }
        let z_range = if max_z >= min_z { max_z - min_z } else { 0.0 };
        let z_threshold =
            (z_range * self.config.z_threshold_factor).max(self.config.min_z_threshold);

        for i in 0..n {
            for j in (i + 1)..n {
                let (Some(a), Some(b)) = (&self.nodes[i].shape, &self.nodes[j].shape) else {
                    continue;
                };
                let (result, weight) = check_overlap(a, b, z_threshold);
                let (from, to) = match result {
                    OverlapResult::None => continue,
                    OverlapResult::ABeforeB => (i, j),
                    OverlapResult::BBeforeA => (j, i),
                };
                self.edges.push(GraphEdge {
                    from,
                    to,
                    weight,
                    active: true,
                });
                self.nodes[to].incoming += 1;
            }
        }
        stats.edges = self.edges.len();

        while self.order.len() < n {
            let ready = self
                .nodes
                .iter()
                .position(|node| !node.placed && node.incoming == 0);
            match ready {
                Some(i) => {
                    self.nodes[i].placed = true;
                    self.order.push(layers[i]);
                    for edge in self.edges.iter_mut().filter(|e| e.active && e.from == i) {
                        edge.active = false;
                        self.nodes[edge.to].incoming -= 1;
                    }
                }
                None => {
                    self.break_cycle();
                    stats.cycles_broken += 1;
                }
            }
        }

        layers.copy_from_slice(&self.order);
        stats
    }

    /// Walks incoming edges back from the first unplaced node until a node
    /// repeats, then drops the lightest edge on the loop.
    ///
    /// Only called when every unplaced node has an active incoming edge.
    fn break_cycle(&mut self) {
        self.visit.clear();
        self.visit.resize(self.nodes.len(), UNVISITED);
        self.path.clear();

        let Some(mut current) = self.nodes.iter().position(|node| !node.placed) else {
            return;
        };
        loop {
            self.visit[current] = self.path.len();
            let Some(edge_idx) = self.edges.iter().position(|e| e.active && e.to == current) else {
                return;
            };
            self.path.push(edge_idx);
            let prev = self.edges[edge_idx].from;
            let start = self.visit[prev];
            if start != UNVISITED {
                let mut lightest = self.path[start];
                for &e in &self.path[start..] {
                    if self.edges[e].weight < self.edges[lightest].weight {
                        lightest = e;
                    }
                }
                self.edges[lightest].active = false;
                self.nodes[self.edges[lightest].to].incoming -= 1;
                return;
            }
            current = prev;
        }
    }
}
