// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Candidate enumeration and ranking.
//!
//! Everything in here runs against one immutable index snapshot and never
//! takes a lock except the popularity store's read lock for score lookups.

pub mod enumerate;
pub mod ranking;

pub use enumerate::{phrase_anchors, Cancelled, EnumerateOptions, Enumerator};
pub use ranking::{compare_candidates, merge_ranked, rank};

use serde::Serialize;

/// A proposed completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub term: String,
    /// Documents containing the term (restricted to the filter, if any).
    pub doc_freq: u64,
    pub popularity: u64,
    /// Projects that contributed, filled in by the merge.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<String>,
}

impl Candidate {
    pub fn new(term: impl Into<String>, doc_freq: u64, popularity: u64) -> Self {
        Self {
            term: term.into(),
            doc_freq,
            popularity,
            projects: Vec::new(),
        }
    }
}
