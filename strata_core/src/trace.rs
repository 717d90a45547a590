// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for draw-property resolution.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! resolver calls as it walks a layer tree. All method bodies default to
//! no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! [`ResolveSummaryBuilder`] counts events during a pass and produces a
//! [`ResolveSummary`] at the end.
//!
//! # Crate features
//!
//! - `trace` enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) gates [`SubtreeSkippedEvent`] and the
//!   corresponding `TraceSink` method, which fire once per skipped subtree.

use crate::draw::{SurfaceReason, SurfaceRemoval};
#[cfg(feature = "trace-rich")]
use crate::draw::SkipReason;
use crate::layer::LayerId;
use crate::sort::SortStats;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a resolve pass starts.
#[derive(Clone, Copy, Debug)]
pub struct ResolveBeginEvent {
    /// Root of the resolved tree.
    pub root: LayerId,
    /// Size of the output side-tables.
    pub slot_count: usize,
}

/// Emitted when a resolve pass finishes.
#[derive(Clone, Copy, Debug)]
pub struct ResolveEndEvent {
    /// Root of the resolved tree.
    pub root: LayerId,
    /// Surfaces in the final render-surface list.
    pub render_surfaces: usize,
    /// Layers that draw themselves into some surface.
    pub drawn_layers: usize,
}

/// Emitted when a layer is promoted to its own render surface.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceCreatedEvent {
    /// The layer owning the new surface.
    pub layer: LayerId,
    /// The first promotion rule that matched.
    pub reason: SurfaceReason,
}

/// Emitted when a surface is dropped again after its subtree was visited, or
/// refused because its back face is showing.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceRemovedEvent {
    /// The layer that no longer owns a surface.
    pub layer: LayerId,
    /// Why the surface was dropped.
    pub reason: SurfaceRemoval,
}

/// Emitted after the layers of a 3D rendering context have been depth-sorted.
#[derive(Clone, Copy, Debug)]
pub struct LayersSortedEvent {
    /// The layer that roots the sorted context.
    pub context_root: LayerId,
    /// Counters from the sorter.
    pub stats: SortStats,
}

/// Emitted when a layer and its subtree are left out of a pass.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct SubtreeSkippedEvent {
    /// Top of the skipped subtree.
    pub layer: LayerId,
    /// Which skip rule applied.
    pub reason: SkipReason,
}

/// Per-pass counters produced by [`ResolveSummaryBuilder`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResolveSummary {
    /// Surfaces in the final render-surface list.
    pub render_surfaces: usize,
    /// Layers that draw themselves.
    pub drawn_layers: usize,
    /// Surfaces created during the pass, including ones removed later.
    pub surfaces_created: usize,
    /// Surfaces removed during the pass.
    pub surfaces_removed: usize,
    /// Subtrees skipped by the skip rules.
    pub subtrees_skipped: usize,
    /// Sorter invocations.
    pub sorts: usize,
    /// Ordering constraints found over all sorts.
    pub sort_edges: usize,
    /// Cycles broken over all sorts.
    pub cycles_broken: usize,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the resolver.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a pass starts.
    fn on_resolve_begin(&mut self, e: &ResolveBeginEvent) {
        _ = e;
    }

    /// Called when a pass ends.
    fn on_resolve_end(&mut self, e: &ResolveEndEvent) {
        _ = e;
    }

    /// Called when a layer gets its own surface.
    fn on_surface_created(&mut self, e: &SurfaceCreatedEvent) {
        _ = e;
    }

    /// Called when a surface is dropped.
    fn on_surface_removed(&mut self, e: &SurfaceRemovedEvent) {
        _ = e;
    }

    /// Called after a 3D rendering context was sorted.
    fn on_layers_sorted(&mut self, e: &LayersSortedEvent) {
        _ = e;
    }

    /// Called with the per-pass summary.
    fn on_resolve_summary(&mut self, s: &ResolveSummary) {
        _ = s;
    }

    /// Called when a subtree is skipped (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_subtree_skipped(&mut self, e: &SubtreeSkippedEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`ResolveBeginEvent`].
    #[inline]
    pub fn resolve_begin(&mut self, e: &ResolveBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_resolve_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ResolveEndEvent`].
    #[inline]
    pub fn resolve_end(&mut self, e: &ResolveEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_resolve_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SurfaceCreatedEvent`].
    #[inline]
    pub fn surface_created(&mut self, e: &SurfaceCreatedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_surface_created(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SurfaceRemovedEvent`].
    #[inline]
    pub fn surface_removed(&mut self, e: &SurfaceRemovedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_surface_removed(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`LayersSortedEvent`].
    #[inline]
    pub fn layers_sorted(&mut self, e: &LayersSortedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_layers_sorted(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ResolveSummary`].
    #[inline]
    pub fn resolve_summary(&mut self, s: &ResolveSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_resolve_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits a [`SubtreeSkippedEvent`] (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn subtree_skipped(&mut self, e: &SubtreeSkippedEvent) {
        if let Some(s) = &mut self.sink {
            s.on_subtree_skipped(e);
        }
    }
}

// ---------------------------------------------------------------------------
// ResolveSummaryBuilder
// ---------------------------------------------------------------------------

/// Counts events during a pass and produces a [`ResolveSummary`].
#[derive(Debug, Default)]
pub struct ResolveSummaryBuilder {
    summary: ResolveSummary,
}

impl ResolveSummaryBuilder {
    /// Starts an empty summary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a created surface.
    pub fn surface_created(&mut self) {
        self.summary.surfaces_created += 1;
    }

    /// Records a removed surface.
    pub fn surface_removed(&mut self) {
        self.summary.surfaces_removed += 1;
    }

    /// Records a skipped subtree.
    pub fn subtree_skipped(&mut self) {
        self.summary.subtrees_skipped += 1;
    }

    /// Records one sorter invocation.
    pub fn layers_sorted(&mut self, stats: &SortStats) {
        self.summary.sorts += 1;
        self.summary.sort_edges += stats.edges;
        self.summary.cycles_broken += stats.cycles_broken;
    }

    /// Consumes the builder and produces the final [`ResolveSummary`].
    #[must_use]
    pub fn finish(self, end: &ResolveEndEvent) -> ResolveSummary {
        ResolveSummary {
            render_surfaces: end.render_surfaces,
            drawn_layers: end.drawn_layers,
            ..self.summary
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerStore;

    fn sample_root() -> LayerId {
        LayerStore::new().create_layer()
    }

    #[test]
    fn noop_sink_compiles() {
        let root = sample_root();
        let mut sink = NoopSink;
        sink.on_resolve_begin(&ResolveBeginEvent {
            root,
            slot_count: 1,
        });
        sink.on_surface_created(&SurfaceCreatedEvent {
            layer: root,
            reason: SurfaceReason::Root,
        });
        sink.on_resolve_summary(&ResolveSummary::default());
    }

    #[test]
    fn tracer_none_does_nothing() {
        let root = sample_root();
        let mut tracer = Tracer::none();
        tracer.resolve_begin(&ResolveBeginEvent {
            root,
            slot_count: 1,
        });
        tracer.surface_removed(&SurfaceRemovedEvent {
            layer: root,
            reason: SurfaceRemoval::EmptyContent,
        });
    }

    #[test]
    fn summary_builder_counts_events() {
        let root = sample_root();
        let mut builder = ResolveSummaryBuilder::new();
        builder.surface_created();
        builder.surface_created();
        builder.surface_removed();
        builder.subtree_skipped();
        builder.layers_sorted(&SortStats {
            layers: 5,
            edges: 6,
            cycles_broken: 1,
        });
        builder.layers_sorted(&SortStats {
            layers: 2,
            edges: 1,
            cycles_broken: 0,
        });

        let summary = builder.finish(&ResolveEndEvent {
            root,
            render_surfaces: 1,
            drawn_layers: 4,
        });
        assert_eq!(summary.surfaces_created, 2);
        assert_eq!(summary.surfaces_removed, 1);
        assert_eq!(summary.subtrees_skipped, 1);
        assert_eq!(summary.sorts, 2);
        assert_eq!(summary.sort_edges, 7);
        assert_eq!(summary.cycles_broken, 1);
        assert_eq!(summary.render_surfaces, 1);
        assert_eq!(summary.drawn_layers, 4);
    }

    #[test]
    fn summary_builder_empty_pass_is_zero() {
        let root = sample_root();
        let summary = ResolveSummaryBuilder::new().finish(&ResolveEndEvent {
            root,
            render_surfaces: 0,
            drawn_layers: 0,
        });
        assert_eq!(summary, ResolveSummary::default());
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            created: Vec<SurfaceReason>,
        }
        impl TraceSink for RecordingSink {
            fn on_surface_created(&mut self, e: &SurfaceCreatedEvent) {
                self.created.push(e.reason);
            }
        }

        let root = sample_root();
        let mut sink = RecordingSink {
            created: Vec::new(),
        };
        let mut tracer = Tracer::new(&mut sink);
        tracer.surface_created(&SurfaceCreatedEvent {
            layer: root,
            reason: SurfaceReason::Forced,
        });
        // Access sink after tracer is dropped.
        drop(tracer);
        assert_eq!(sink.created, &[SurfaceReason::Forced]);
    }
}
