// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Read-only term index: per field, a sorted term dictionary with
//! per-document position postings.
//!
//! This is the shape the suggester consumes from the indexing side. Terms are
//! kept in byte order (Rust `String` ordering), so every term starting with a
//! given prefix lives in one contiguous run that a binary search can find.
//!
//! # Invariants
//!
//! 1. **DICT_SORTED**: `FieldTerms` entries are strictly increasing by term
//! 2. **POSTINGS_SORTED**: each term's postings are strictly increasing by doc
//! 3. **POSITIONS_SORTED**: each posting's positions are strictly increasing
//! 4. **NON_EMPTY**: every term has at least one posting with one position

pub mod builder;
pub mod corpus;
pub mod source;

pub use builder::{tokenize, Document, TermIndexBuilder, MAX_TERM_BYTES};
pub use corpus::JsonCorpusSource;
pub use source::{IndexSnapshot, IndexSource, IndexVersion, MemoryIndexSource, VersionListener};

use std::collections::BTreeMap;

/// Document number within one project's index.
pub type DocId = u32;

/// Token offsets of one term inside one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocPostings {
    pub doc: DocId,
    pub positions: Vec<u32>,
}

/// One dictionary entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermEntry {
    pub term: String,
    pub postings: Vec<DocPostings>,
}

impl TermEntry {
    /// Number of documents containing the term.
    pub fn doc_freq(&self) -> usize {
        self.postings.len()
    }

    /// Positions of the term in `doc`, if it occurs there.
    pub fn positions_in(&self, doc: DocId) -> Option<&[u32]> {
        self.postings
            .binary_search_by_key(&doc, |p| p.doc)
            .ok()
            .map(|i| self.postings[i].positions.as_slice())
    }

    /// Sorted doc ids containing the term.
    pub fn docs(&self) -> Vec<DocId> {
        self.postings.iter().map(|p| p.doc).collect()
    }
}

/// Sorted term dictionary for one field.
#[derive(Debug, Clone, Default)]
pub struct FieldTerms {
    entries: Vec<TermEntry>,
}

impl FieldTerms {
    /// Wrap entries, sorting them if the caller didn't.
    pub fn new(mut entries: Vec<TermEntry>) -> Self {
        if !entries.windows(2).all(|w| w[0].term < w[1].term) {
            entries.sort_by(|a, b| a.term.cmp(&b.term));
            entries.dedup_by(|a, b| a.term == b.term);
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TermEntry> {
        self.entries.iter()
    }

    /// Index of the first entry whose term is `>= target`.
    pub fn seek(&self, target: &str) -> usize {
        self.entries.partition_point(|e| e.term.as_str() < target)
    }

    /// Exact lookup.
    pub fn get(&self, term: &str) -> Option<&TermEntry> {
        self.entries
            .binary_search_by(|e| e.term.as_str().cmp(term))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// The contiguous run of entries starting with `prefix`.
    ///
    /// An empty prefix returns the whole dictionary.
    pub fn with_prefix(&self, prefix: &str) -> &[TermEntry] {
        let start = self.seek(prefix);
        let tail = &self.entries[start..];
        let end = tail.partition_point(|e| e.term.starts_with(prefix));
        &tail[..end]
    }

    pub fn contains(&self, term: &str) -> bool {
        self.get(term).is_some()
    }
}

/// All fields of one project's index at one version.
#[derive(Debug, Clone, Default)]
pub struct TermIndex {
    doc_count: u32,
    fields: BTreeMap<String, FieldTerms>,
}

impl TermIndex {
    pub fn new(doc_count: u32, fields: BTreeMap<String, FieldTerms>) -> Self {
        Self { doc_count, fields }
    }

    pub fn doc_count(&self) -> u32 {
        self.doc_count
    }

    pub fn field(&self, name: &str) -> Option<&FieldTerms> {
        self.fields.get(name)
    }

    /// Field names in sorted order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn term_count(&self, field: &str) -> usize {
        self.fields.get(field).map_or(0, FieldTerms::len)
    }

    /// Every doc id, ascending.
    pub fn all_docs(&self) -> Vec<DocId> {
        (0..self.doc_count).collect()
    }
}
