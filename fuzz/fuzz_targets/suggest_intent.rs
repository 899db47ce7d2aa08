// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Fuzz target for caret-driven intent parsing.
//!
//! The caret can sit anywhere, including inside a multi-byte character or
//! past the end. Intent parsing must answer with an error in those cases and
//! otherwise hand back a well-formed completion query.

#![no_main]

use std::collections::BTreeMap;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use typeahead::query::{parse_intent, SuggesterQuery};

#[derive(Arbitrary, Debug)]
struct Input {
    text: String,
    other: String,
    caret: u16,
}

fuzz_target!(|input: Input| {
    let text: String = input.text.chars().take(256).collect();
    let other: String = input.other.chars().take(256).collect();
    let caret = usize::from(input.caret) % (text.len() + 2);

    let fields = BTreeMap::from([("full".to_string(), text.clone()), ("path".to_string(), other)]);
    let Ok(intent) = parse_intent(&fields, "full", caret) else {
        return;
    };

    assert!(text.is_char_boundary(caret));
    assert_eq!(intent.query.field(), "full");
    if let SuggesterQuery::Phrase(phrase) = &intent.query {
        assert!(!phrase.terms().is_empty());
        assert!(phrase.offset() <= phrase.terms().len());
        // Terms around the completion point are real tokens.
        assert!(phrase.terms().iter().all(|t| !t.is_empty()));
    }
});
