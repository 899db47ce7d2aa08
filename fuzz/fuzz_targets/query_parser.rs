// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Fuzz target for the search-query grammar.
//!
//! Whatever half-typed text lands in a search box, the parser returns clauses
//! or an error. It never panics, every clause it returns is non-empty, and
//! every pattern it returns compiles.

#![no_main]

use libfuzzer_sys::fuzz_target;
use typeahead::query::{parse_field, Query, TermMatcher};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let text: String = text.chars().take(512).collect();

    if let Ok(clauses) = parse_field("full", &text) {
        for clause in &clauses {
            match &clause.query {
                Query::Term { term, .. } => assert!(!term.is_empty()),
                Query::Prefix { prefix, .. } => assert!(!prefix.is_empty()),
                Query::Phrase { terms, .. } => {
                    assert!(terms.len() >= 2, "phrase with {} terms", terms.len());
                }
                Query::Wildcard { pattern, .. } => {
                    assert!(pattern.contains(['*', '?']));
                    assert!(TermMatcher::wildcard(pattern).is_ok());
                }
                Query::Regexp { pattern, .. } => assert!(TermMatcher::regexp(pattern).is_ok()),
                Query::Range { range, .. } => {
                    assert_ne!(range.lower.as_deref(), Some("*"));
                    assert_ne!(range.upper.as_deref(), Some("*"));
                }
                other => panic!("unexpected clause from the parser: {other:?}"),
            }
        }
    }
});
