// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Candidate enumeration against one project's term dictionary.
//!
//! # Prefix mode
//!
//! Seek to the first term `>= prefix`, walk while terms still start with it,
//! stop after `cap` entries. The cap is what keeps a one-letter prefix over a
//! 2M-term dictionary from blowing the latency budget; survivors get re-ranked
//! afterwards, so the cap bounds work, not quality within the examined run.
//!
//! # Pattern and range modes
//!
//! Wildcards, regexps and range bounds go through a [`TermMatcher`]: walk the
//! run of its literal prefix, keep the entries it accepts. The cap counts
//! entries examined, not entries accepted, so a pattern with no literal
//! prefix still stops after `cap` entries.
//!
//! # Phrase mode
//!
//! For `"the quick br|"` the known terms are `the` at slot 0 and `quick` at
//! slot 1, and the candidate goes in slot 2. For every document containing all
//! known terms we compute the set of *anchors* (positions of slot 0) at which
//! every known term lines up:
//!
//! ```text
//! doc:      the quick brown fox the slow
//! pos:      0   1     2     3   4   5
//! the@0  -> anchors {0, 4}
//! quick@1 -> positions {1} - 1 = {0}, keep those in anchors -> {0}
//! brown@2 -> 2 - 2 = 0 in anchors -> aligned
//! ```
//!
//! Each step's anchors live in a [`Positions`] set, dense or sparse by term
//! frequency. A candidate term counts a document if any of its positions,
//! shifted back by its slot, is an anchor.
//!
//! # Cancellation
//!
//! The cancel flag is checked once per dictionary entry and once per
//! candidate document, never mid-document.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{rank, Candidate};
use crate::index::{DocId, FieldTerms, TermEntry, TermIndex};
use crate::popular::PopularityStore;
use crate::query::{matching_docs, PhraseCompletion, Query, SuggesterQuery, TermMatcher};
use crate::util::{contains_sorted, intersect_sorted, PositionSet, Positions, DEFAULT_DENSE_THRESHOLD};

/// The enumeration was abandoned because its request timed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("enumeration cancelled")]
pub struct Cancelled;

/// Knobs for one enumeration.
#[derive(Debug, Clone)]
pub struct EnumerateOptions {
    /// Max dictionary entries examined; `None` scans the whole prefix run.
    pub cap: Option<usize>,
    pub dense_threshold: usize,
    /// Candidates kept after ranking.
    pub max_results: usize,
}

impl Default for EnumerateOptions {
    fn default() -> Self {
        Self {
            cap: Some(10_000),
            dense_threshold: DEFAULT_DENSE_THRESHOLD,
            max_results: 10,
        }
    }
}

/// Anchors (slot-0 positions) in `doc` where every `(entry, slot)` lines up.
///
/// Returns `None` if any term is missing from the document or nothing aligns.
pub fn phrase_anchors(
    doc: DocId,
    slotted: &[(&TermEntry, usize)],
    dense_threshold: usize,
) -> Option<Positions> {
    let ((first, first_slot), rest) = slotted.split_first()?;
    let anchors: Vec<u32> = first
        .positions_in(doc)?
        .iter()
        .filter_map(|&p| p.checked_sub(*first_slot as u32))
        .collect();
    let mut set = Positions::build(&anchors, dense_threshold);

    for (entry, slot) in rest {
        let survivors: Vec<u32> = entry
            .positions_in(doc)?
            .iter()
            .filter_map(|&p| p.checked_sub(*slot as u32))
            .filter(|&a| set.has(a))
            .collect();
        if survivors.is_empty() {
            return None;
        }
        set = Positions::build(&survivors, dense_threshold);
    }

    (!set.is_empty()).then_some(set)
}

/// Enumerates candidates for one project snapshot.
pub struct Enumerator<'a> {
    index: &'a TermIndex,
    popularity: Option<&'a PopularityStore>,
    options: &'a EnumerateOptions,
    cancel: &'a AtomicBool,
}

impl<'a> Enumerator<'a> {
    pub fn new(
        index: &'a TermIndex,
        popularity: Option<&'a PopularityStore>,
        options: &'a EnumerateOptions,
        cancel: &'a AtomicBool,
    ) -> Self {
        Self {
            index,
            popularity,
            options,
            cancel,
        }
    }

    #[inline]
    fn check_cancel(&self) -> Result<(), Cancelled> {
        if self.cancel.load(Ordering::Relaxed) {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    fn popularity_of(&self, term: &str) -> u64 {
        self.popularity.map_or(0, |s| s.get(term))
    }

    fn capped<'d>(&self, run: &'d [TermEntry]) -> &'d [TermEntry] {
        match self.options.cap {
            Some(cap) => &run[..run.len().min(cap)],
            None => run,
        }
    }

    /// Ranked candidates for `query`, restricted to docs matching `filter`.
    pub fn run(
        &self,
        query: &SuggesterQuery,
        filter: Option<&Query>,
    ) -> Result<Vec<Candidate>, Cancelled> {
        let Some(dict) = self.index.field(query.field()) else {
            return Ok(Vec::new());
        };
        let filter_docs =
            filter.map(|f| matching_docs(self.index, f, self.options.dense_threshold));

        let mut out = match query {
            SuggesterQuery::Phrase(phrase) => self.phrase(dict, phrase, filter_docs.as_deref())?,
            single => {
                let Ok(matcher) = single.term_matcher() else {
                    return Ok(Vec::new());
                };
                let excluded = filter
                    .map(|f| f.required_terms(single.field()))
                    .unwrap_or_default();
                self.terms(dict, &matcher, filter_docs.as_deref(), &excluded)?
            }
        };
        rank(&mut out, self.options.max_results);
        Ok(out)
    }

    fn terms(
        &self,
        dict: &FieldTerms,
        matcher: &TermMatcher,
        filter_docs: Option<&[DocId]>,
        excluded: &[&str],
    ) -> Result<Vec<Candidate>, Cancelled> {
        let mut out = Vec::new();

        for entry in self.capped(matcher.run(dict)) {
            self.check_cancel()?;
            if !matcher.matches(&entry.term) {
                continue;
            }
            // Already part of the query, suggesting it again is noise.
            if excluded.contains(&entry.term.as_str()) {
                continue;
            }
            let doc_freq = match filter_docs {
                None => entry.doc_freq(),
                Some(docs) => entry
                    .postings
                    .iter()
                    .filter(|p| contains_sorted(docs, p.doc))
                    .count(),
            };
            if doc_freq > 0 {
                out.push(Candidate::new(
                    entry.term.clone(),
                    doc_freq as u64,
                    self.popularity_of(&entry.term),
                ));
            }
        }

        Ok(out)
    }

    fn phrase(
        &self,
        dict: &FieldTerms,
        phrase: &PhraseCompletion,
        filter_docs: Option<&[DocId]>,
    ) -> Result<Vec<Candidate>, Cancelled> {
        let Some(known) = phrase
            .terms()
            .iter()
            .map(|t| dict.get(t))
            .collect::<Option<Vec<_>>>()
        else {
            return Ok(Vec::new());
        };
        let slotted: Vec<(&TermEntry, usize)> = known
            .into_iter()
            .enumerate()
            .map(|(i, e)| (e, phrase.slot_of(i)))
            .collect();

        let mut docs = slotted[0].0.docs();
        for (entry, _) in &slotted[1..] {
            docs = intersect_sorted(&docs, &entry.docs());
        }
        if let Some(filter) = filter_docs {
            docs = intersect_sorted(&docs, filter);
        }

        let mut anchors: HashMap<DocId, Positions> = HashMap::with_capacity(docs.len());
        for doc in docs {
            self.check_cancel()?;
            if let Some(set) = phrase_anchors(doc, &slotted, self.options.dense_threshold) {
                anchors.insert(doc, set);
            }
        }
        if anchors.is_empty() {
            return Ok(Vec::new());
        }

        let slot = phrase.offset() as u32;
        let mut out = Vec::new();
        for entry in self.capped(dict.with_prefix(phrase.prefix())) {
            self.check_cancel()?;
            let doc_freq = entry
                .postings
                .iter()
                .filter(|p| {
                    anchors.get(&p.doc).is_some_and(|set| {
                        p.positions
                            .iter()
                            .any(|&q| q.checked_sub(slot).is_some_and(|a| set.has(a)))
                    })
                })
                .count();
            if doc_freq > 0 {
                out.push(Candidate::new(
                    entry.term.clone(),
                    doc_freq as u64,
                    self.popularity_of(&entry.term),
                ));
            }
        }

        Ok(out)
    }
}
