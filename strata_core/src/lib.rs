// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Draw-property resolution for compositing layer trees.
//!
//! `strata_core` takes a tree of layers (bounds, position, transform,
//! opacity, scroll state, clipping and effect flags) and computes, once per
//! frame, everything a compositor needs to draw it: each layer's transform
//! into its render target and onto the screen, its clip and visible rects,
//! which subtrees need their own offscreen render surface, and a draw order
//! that respects depth inside 3D rendering contexts. It is `no_std`
//! compatible (with `alloc`).
//!
//! # Architecture
//!
//! Data flows one way, from a read-only layer tree to a side-table of
//! results:
//!
//! ```text
//!   LayerStore ──snapshot()──► LayerSnapshot
//!        │                          │
//!        └──────── LayerSource ─────┘
//!                      │
//!                      ▼
//!   ResolveInputs ──► draw::resolve() ──► ResolvedTree
//!                      │                      │
//!                      ▼                      ▼
//!              sort::LayerSorter      iter::LayerIterator
//! ```
//!
//! **[`layer`]** — Struct-of-arrays layer tree with generational handles,
//! frozen snapshots, and the [`LayerSource`](layer::LayerSource) trait the
//! resolver reads through.
//!
//! **[`dirty`]** — Multi-channel dirty tracking via `understory_dirty`.
//! GEOMETRY, OPACITY and SCROLL propagate to descendants; EFFECTS is
//! local-only; TOPOLOGY marks structural changes.
//!
//! **[`draw`]** — The resolve pass: draw properties, render surface
//! decisions, clipping, fixed-position scroll compensation.
//!
//! **[`sort`]** — Depth sorting of layers that share a 3D rendering
//! context, by pairwise overlap tests and a topological order.
//!
//! **[`iter`]** — Front-to-back and back-to-front traversal of the
//! resolved surfaces and layers.
//!
//! **[`transform`]** — 4x4 column-major transform type.
//!
//! **[`geometry`]** — Points, clipped quads and rect helpers over `kurbo`.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types for
//! resolve-pass instrumentation, with zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-subtree
//!   skip events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod dirty;
pub mod draw;
pub mod geometry;
pub mod iter;
pub mod layer;
pub mod sort;
pub mod trace;
pub mod transform;
