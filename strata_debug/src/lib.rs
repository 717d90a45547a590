// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printing and JSON dumps for strata diagnostics.
//!
//! This crate provides development tooling around
//! [`strata_core::draw::resolve`]:
//!
//! - [`pretty::PrettyPrintSink`]: a [`TraceSink`](strata_core::trace::TraceSink)
//!   writing one human-readable line per resolve event.
//! - [`dump::resolved_to_json`] and [`dump::write_json`]: a structural dump
//!   of the render surfaces and the layers drawn into them.

pub mod dump;
pub mod pretty;
