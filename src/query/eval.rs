// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Residual filter evaluation.
//!
//! A suggestion request usually carries the rest of the query as a filter
//! (`path:src full:"fn |"`). Candidates only count documents the filter
//! matches, so the filter is evaluated once per project into a sorted doc-id
//! list that enumeration checks by binary search.

use super::{Occur, Query, TermMatcher};
use crate::index::{DocId, FieldTerms, TermEntry, TermIndex};
use crate::search::phrase_anchors;
use crate::util::{difference_sorted, intersect_sorted, union_sorted};

/// Docs of `index` matching `query`, ascending.
pub fn matching_docs(index: &TermIndex, query: &Query, dense_threshold: usize) -> Vec<DocId> {
    match query {
        Query::All => index.all_docs(),
        Query::Term { field, term } => index
            .field(field)
            .and_then(|d| d.get(term))
            .map(TermEntry::docs)
            .unwrap_or_default(),
        Query::Prefix { field, prefix } => index
            .field(field)
            .map(|d| expansion_docs(d, &TermMatcher::prefix(prefix)))
            .unwrap_or_default(),
        // Patterns were compiled once by the parser; a hand-built query with
        // a bad pattern matches nothing.
        Query::Wildcard { field, pattern } => match (index.field(field), TermMatcher::wildcard(pattern)) {
            (Some(d), Ok(m)) => expansion_docs(d, &m),
            _ => Vec::new(),
        },
        Query::Regexp { field, pattern } => match (index.field(field), TermMatcher::regexp(pattern)) {
            (Some(d), Ok(m)) => expansion_docs(d, &m),
            _ => Vec::new(),
        },
        Query::Range { field, range } => index
            .field(field)
            .map(|d| expansion_docs(d, &TermMatcher::range(range)))
            .unwrap_or_default(),
        Query::Phrase { field, terms } => index
            .field(field)
            .map(|d| phrase_docs(d, terms, dense_threshold))
            .unwrap_or_default(),
        Query::Bool(clauses) => {
            let mut must: Option<Vec<DocId>> = None;
            let mut should: Option<Vec<DocId>> = None;
            let mut must_not: Vec<DocId> = Vec::new();

            for clause in clauses {
                let docs = matching_docs(index, &clause.query, dense_threshold);
                match clause.occur {
                    Occur::Must => {
                        must = Some(match must {
                            Some(acc) => intersect_sorted(&acc, &docs),
                            None => docs,
                        });
                    }
                    Occur::Should => {
                        should = Some(match should {
                            Some(acc) => union_sorted(&acc, &docs),
                            None => docs,
                        });
                    }
                    Occur::MustNot => must_not = union_sorted(&must_not, &docs),
                }
            }

            let base = must.or(should).unwrap_or_else(|| index.all_docs());
            difference_sorted(&base, &must_not)
        }
    }
}

/// Docs holding any term `matcher` accepts.
fn expansion_docs(dict: &FieldTerms, matcher: &TermMatcher) -> Vec<DocId> {
    let mut docs: Vec<DocId> = matcher
        .run(dict)
        .iter()
        .filter(|e| matcher.matches(&e.term))
        .flat_map(|e| e.postings.iter().map(|p| p.doc))
        .collect();
    docs.sort_unstable();
    docs.dedup();
    docs
}

/// Docs where `terms` occur at consecutive positions.
fn phrase_docs(dict: &FieldTerms, terms: &[String], dense_threshold: usize) -> Vec<DocId> {
    let Some(entries) = terms.iter().map(|t| dict.get(t)).collect::<Option<Vec<_>>>() else {
        return Vec::new();
    };
    let slotted: Vec<(&TermEntry, usize)> = entries.into_iter().zip(0..).collect();
    let Some((&(first, _), rest)) = slotted.split_first() else {
        return Vec::new();
    };

    let mut candidates = first.docs();
    for (entry, _) in rest {
        candidates = intersect_sorted(&candidates, &entry.docs());
    }

    candidates
        .into_iter()
        .filter(|&doc| phrase_anchors(doc, &slotted, dense_threshold).is_some())
        .collect()
}
