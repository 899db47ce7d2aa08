// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Tokenizer and in-memory index builder.
//!
//! The real index comes from the indexing pipeline; this builder exists so the
//! CLI can serve a JSON corpus and so tests can describe an index in one line.
//! The tokenizer is the one place that decides what a "term" is, and the query
//! parser reuses it, so a query word always normalizes to dictionary terms.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Deserialize;

use super::{DocId, DocPostings, FieldTerms, TermEntry, TermIndex};

/// Tokens longer than this are skipped (they still consume a position).
pub const MAX_TERM_BYTES: usize = 255;

/// Identifier characters are word characters; everything else separates.
#[inline]
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Split text into lowercased terms with their token positions.
///
/// Positions are dense token ordinals (0, 1, 2, ...), not byte offsets, so
/// "adjacent" means "next token" regardless of punctuation between them.
pub fn tokenize(text: &str) -> Vec<(String, u32)> {
    let mut tokens = Vec::new();
    let mut position = 0u32;

    for word in text.split(|c: char| !is_word_char(c)) {
        if word.is_empty() {
            continue;
        }
        let normalized = word.to_lowercase();
        if normalized.len() <= MAX_TERM_BYTES {
            tokens.push((normalized, position));
        }
        position += 1;
    }

    tokens
}

/// A document as the corpus loader reads it: field name to text.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Document {
    pub fields: BTreeMap<String, String>,
}

impl Document {
    pub fn new<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Per-document tokens grouped by field then term.
type DocTerms = BTreeMap<String, BTreeMap<String, Vec<u32>>>;

fn analyze(doc: &Document) -> DocTerms {
    let mut out: DocTerms = BTreeMap::new();
    for (field, text) in &doc.fields {
        let terms = out.entry(field.clone()).or_default();
        for (term, pos) in tokenize(text) {
            terms.entry(term).or_default().push(pos);
        }
    }
    out
}

/// Accumulates documents, then freezes them into a [`TermIndex`].
#[derive(Debug, Default)]
pub struct TermIndexBuilder {
    doc_count: u32,
    fields: BTreeMap<String, BTreeMap<String, Vec<DocPostings>>>,
}

impl TermIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one document and return its id.
    pub fn add_document(&mut self, doc: &Document) -> DocId {
        let id = self.doc_count;
        self.merge(id, analyze(doc));
        self.doc_count += 1;
        id
    }

    fn merge(&mut self, doc: DocId, terms: DocTerms) {
        for (field, by_term) in terms {
            let dict = self.fields.entry(field).or_default();
            for (term, positions) in by_term {
                dict.entry(term).or_default().push(DocPostings { doc, positions });
            }
        }
    }

    pub fn doc_count(&self) -> u32 {
        self.doc_count
    }

    pub fn build(self) -> TermIndex {
        let fields = self
            .fields
            .into_iter()
            .map(|(name, dict)| {
                let entries = dict
                    .into_iter()
                    .map(|(term, postings)| TermEntry { term, postings })
                    .collect();
                (name, FieldTerms::new(entries))
            })
            .collect();
        TermIndex::new(self.doc_count, fields)
    }
}

impl TermIndex {
    /// Build an index from documents, tokenizing in parallel.
    ///
    /// Doc ids follow slice order, so the result is identical to adding the
    /// documents one by one.
    pub fn from_documents(docs: &[Document]) -> Self {
        let analyzed: Vec<DocTerms> = docs.par_iter().map(analyze).collect();

        let mut builder = TermIndexBuilder::new();
        for terms in analyzed {
            let id = builder.doc_count;
            builder.merge(id, terms);
            builder.doc_count += 1;
        }
        builder.build()
    }
}
