// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use strata_core::layer::LayerId;
use strata_core::trace::{
    LayersSortedEvent, ResolveBeginEvent, ResolveEndEvent, ResolveSummary, SubtreeSkippedEvent,
    SurfaceCreatedEvent, SurfaceRemovedEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    passes: u64,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("passes", &self.passes)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer, passes: 0 }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer, passes: 0 }
    }

    /// Consumes the sink and returns its writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Formats a layer as `index:generation`.
fn layer(id: LayerId) -> String {
    format!("{}:{}", id.index(), id.generation())
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_resolve_begin(&mut self, e: &ResolveBeginEvent) {
        self.passes += 1;
        let _ = writeln!(
            self.writer,
            "[resolve:begin] pass={} root={} slots={}",
            self.passes,
            layer(e.root),
            e.slot_count,
        );
    }

    fn on_resolve_end(&mut self, e: &ResolveEndEvent) {
        let _ = writeln!(
            self.writer,
            "[resolve:end] pass={} surfaces={} drawn={}",
            self.passes, e.render_surfaces, e.drawn_layers,
        );
    }

    fn on_surface_created(&mut self, e: &SurfaceCreatedEvent) {
        let _ = writeln!(
            self.writer,
            "[surface] layer={} reason={:?}",
            layer(e.layer),
            e.reason,
        );
    }

    fn on_surface_removed(&mut self, e: &SurfaceRemovedEvent) {
        let _ = writeln!(
            self.writer,
            "[surface:removed] layer={} reason={:?}",
            layer(e.layer),
            e.reason,
        );
    }

    fn on_layers_sorted(&mut self, e: &LayersSortedEvent) {
        let _ = writeln!(
            self.writer,
            "[sort] context={} layers={} edges={} cycles_broken={}",
            layer(e.context_root),
            e.stats.layers,
            e.stats.edges,
            e.stats.cycles_broken,
        );
    }

    fn on_resolve_summary(&mut self, s: &ResolveSummary) {
        let _ = writeln!(
            self.writer,
            "[summary] pass={} surfaces={} drawn={} created={} removed={} \
             skipped={} sorts={} edges={} cycles_broken={}",
            self.passes,
            s.render_surfaces,
            s.drawn_layers,
            s.surfaces_created,
            s.surfaces_removed,
            s.subtrees_skipped,
            s.sorts,
            s.sort_edges,
            s.cycles_broken,
        );
    }

    fn on_subtree_skipped(&mut self, e: &SubtreeSkippedEvent) {
        let _ = writeln!(
            self.writer,
            "[skip] layer={} reason={:?}",
            layer(e.layer),
            e.reason,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Size;
    use strata_core::draw::{ResolveInputs, ResolvedTree, resolve_traced};
    use strata_core::layer::{LayerFlags, LayerStore};
    use strata_core::trace::Tracer;

    fn output(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn pretty_print_surface() {
        let mut store = LayerStore::new();
        let id = store.create_layer();
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_surface_created(&SurfaceCreatedEvent {
            layer: id,
            reason: strata_core::draw::SurfaceReason::Opacity,
        });
        let output = output(sink);
        assert!(output.contains("[surface]"), "got: {output}");
        assert!(output.contains("reason=Opacity"), "got: {output}");
    }

    #[test]
    fn traced_pass_writes_every_phase() {
        let mut store = LayerStore::new();
        let root = store.create_layer();
        let hidden = store.create_layer();
        store.add_child(root, hidden);
        store.set_bounds(root, Size::new(10.0, 10.0));
        store.set_flags(
            hidden,
            LayerFlags {
                hidden: true,
                ..LayerFlags::default()
            },
        );

        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        let mut resolved = ResolvedTree::new();
        {
            let mut tracer = Tracer::new(&mut sink);
            let inputs = ResolveInputs::new(root, Size::new(10.0, 10.0));
            resolve_traced(&store, &inputs, &mut resolved, &mut tracer);
        }
        let output = output(sink);
        assert!(output.contains("[resolve:begin] pass=1"), "got: {output}");
        assert!(
            output.contains("[surface] layer=0:0 reason=Root"),
            "got: {output}"
        );
        assert!(
            output.contains("[skip] layer=1:0 reason=Hidden"),
            "got: {output}"
        );
        assert!(
            output.contains("[resolve:end] pass=1 surfaces=1"),
            "got: {output}"
        );
        assert!(output.contains("skipped=1"), "got: {output}");
    }
}
