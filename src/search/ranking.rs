// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Candidate ranking and the cross-project merge.
//!
//! Popularity dominates: a term people actually searched for beats a term that
//! merely appears in many files. Document frequency breaks popularity ties,
//! and the term itself breaks the rest so identical inputs always produce
//! identical lists.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::Candidate;

/// Compare two candidates for ranking.
///
/// Sort order:
/// 1. **Popularity** - descending
/// 2. **Document frequency** - descending
/// 3. **Term** - ascending, byte order
pub fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    b.popularity
        .cmp(&a.popularity)
        .then_with(|| b.doc_freq.cmp(&a.doc_freq))
        .then_with(|| a.term.cmp(&b.term))
}

/// Sort in ranking order and keep the best `limit`.
pub fn rank(candidates: &mut Vec<Candidate>, limit: usize) {
    candidates.sort_by(compare_candidates);
    candidates.truncate(limit);
}

/// Union per-project lists by term, summing both scores.
///
/// The output order depends only on the ranking rule, never on the order the
/// project lists arrive in.
pub fn merge_ranked<I>(per_project: I, limit: usize) -> Vec<Candidate>
where
    I: IntoIterator<Item = (String, Vec<Candidate>)>,
{
    let mut merged: BTreeMap<String, Candidate> = BTreeMap::new();

    for (project, candidates) in per_project {
        for c in candidates {
            let slot = merged.entry(c.term.clone()).or_insert_with(|| Candidate {
                term: c.term.clone(),
                doc_freq: 0,
                popularity: 0,
                projects: Vec::new(),
            });
            slot.doc_freq += c.doc_freq;
            slot.popularity = slot.popularity.saturating_add(c.popularity);
            if !slot.projects.contains(&project) {
                slot.projects.push(project.clone());
            }
        }
    }

    let mut out: Vec<Candidate> = merged
        .into_values()
        .map(|mut c| {
            c.projects.sort();
            c
        })
        .collect();
    rank(&mut out, limit);
    out
}
