// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Depth sorting for 3D rendering contexts.
//!
//! Layers that share a sorting context are drawn in depth order rather than
//! tree order. Each layer is reduced to a [`LayerShape`] in a common space,
//! every pair is compared with [`check_overlap`], and [`LayerSorter`]
//! orders the resulting constraint graph topologically.
//!
//! Constraints carry a weight. Confident depth separations weigh 1. Near
//! coplanar and intersecting pairs weigh 0 and are the first to go when a
//! cycle must be broken.

mod overlap;
mod shape;
mod sorter;

pub use overlap::{OverlapResult, check_overlap};
pub use shape::LayerShape;
pub use sorter::{LayerSorter, SortStats, SorterConfig};
