// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Small data structures shared by the enumerator and the filter evaluator.

pub mod docset;
pub mod positions;

pub use docset::{contains_sorted, difference_sorted, intersect_sorted, union_sorted};
pub use positions::{
    DensePositions, PositionSet, Positions, SparsePositions, DEFAULT_DENSE_THRESHOLD,
};
