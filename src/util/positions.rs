// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Position sets: "does this token offset occur in the document?"
//!
//! Phrase completion asks that question thousands of times per request, once
//! per candidate occurrence. Two shapes cover the space. A bit vector answers
//! in one load and costs `max_position / 8` bytes, which is great when a term
//! is frequent and terrible when a term shows up twice in a 40k-token file.
//! A hash set costs per element instead of per offset.
//!
//! [`Positions::build`] picks between them from the term frequency, so callers
//! never have to care which one they got.

use std::collections::HashSet;

/// Default term frequency above which a bit vector is used.
pub const DEFAULT_DENSE_THRESHOLD: usize = 64;

/// Membership over non-negative token offsets.
pub trait PositionSet {
    /// Whether `position` is in the set.
    fn has(&self, position: u32) -> bool;

    /// Number of distinct positions.
    fn size(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

// ============================================================================
// DENSE
// ============================================================================

/// Bit vector over `0..=max_position`.
#[derive(Debug, Clone, Default)]
pub struct DensePositions {
    words: Vec<u64>,
    len: usize,
}

impl DensePositions {
    pub fn from_positions(positions: &[u32]) -> Self {
        let max = positions.iter().copied().max().unwrap_or(0) as usize;
        let mut words = vec![0u64; if positions.is_empty() { 0 } else { max / 64 + 1 }];
        let mut len = 0;
        for &p in positions {
            let (word, bit) = (p as usize / 64, p % 64);
            let mask = 1u64 << bit;
            if words[word] & mask == 0 {
                words[word] |= mask;
                len += 1;
            }
        }
        Self { words, len }
    }
}

impl PositionSet for DensePositions {
    #[inline]
    fn has(&self, position: u32) -> bool {
        self.words
            .get(position as usize / 64)
            .is_some_and(|w| w & (1u64 << (position % 64)) != 0)
    }

    fn size(&self) -> usize {
        self.len
    }
}

// ============================================================================
// SPARSE
// ============================================================================

/// Hash set of positions, for terms that occur rarely in long documents.
#[derive(Debug, Clone, Default)]
pub struct SparsePositions {
    set: HashSet<u32>,
}

impl SparsePositions {
    pub fn from_positions(positions: &[u32]) -> Self {
        Self {
            set: positions.iter().copied().collect(),
        }
    }
}

impl PositionSet for SparsePositions {
    #[inline]
    fn has(&self, position: u32) -> bool {
        self.set.contains(&position)
    }

    fn size(&self) -> usize {
        self.set.len()
    }
}

// ============================================================================
// CHOOSER
// ============================================================================

/// Either representation, decided once at construction.
#[derive(Debug, Clone)]
pub enum Positions {
    Dense(DensePositions),
    Sparse(SparsePositions),
}

impl Positions {
    /// Build a set for `positions`, dense when there are more than
    /// `dense_threshold` of them.
    pub fn build(positions: &[u32], dense_threshold: usize) -> Self {
        if positions.len() > dense_threshold {
            Positions::Dense(DensePositions::from_positions(positions))
        } else {
            Positions::Sparse(SparsePositions::from_positions(positions))
        }
    }

    pub fn is_dense(&self) -> bool {
        matches!(self, Positions::Dense(_))
    }
}

impl PositionSet for Positions {
    #[inline]
    fn has(&self, position: u32) -> bool {
        match self {
            Positions::Dense(d) => d.has(position),
            Positions::Sparse(s) => s.has(position),
        }
    }

    fn size(&self) -> usize {
        match self {
            Positions::Dense(d) => d.size(),
            Positions::Sparse(s) => s.size(),
        }
    }
}
