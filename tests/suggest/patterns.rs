//! Wildcard, regexp and range completion through the full request pipeline.

use super::common::{
    memory_source_with, request_at, started, started_with, suggest_terms, terms, test_config,
    CODE, FIELD,
};
use typeahead::{ParseError, SuggestError, SuggesterConfig};

#[test]
fn test_wildcard_completion() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", CODE)]), dir.path());

    assert_eq!(
        suggest_terms(&suggester, &["p1"], "f?n*"),
        vec!["function", "fun", "functional", "functors"]
    );
    assert_eq!(suggest_terms(&suggester, &["p1"], "*al"), vec!["functional"]);
    assert!(suggest_terms(&suggester, &["p1"], "x?z").is_empty());
}

#[test]
fn test_wildcard_counts_only_filtered_docs() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", CODE)]), dir.path());

    let out = suggester.suggest(&request_at(&["p1"], "return f?nction", 15)).unwrap();
    let got: Vec<(String, u64)> = out
        .candidates
        .iter()
        .map(|c| (c.term.clone(), c.doc_freq))
        .collect();
    assert_eq!(got, vec![("function".to_string(), 1)]);
}

#[test]
fn test_regexp_completion() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", CODE)]), dir.path());

    let text = "/fun.*s/";
    let out = suggester.suggest(&request_at(&["p1"], text, text.len() - 1)).unwrap();
    assert_eq!(terms(&out), vec!["functors"]);

    let text = "/fu(/";
    assert!(matches!(
        suggester.suggest(&request_at(&["p1"], text, 4)),
        Err(SuggestError::Parse(ParseError::InvalidPattern { .. }))
    ));
}

#[test]
fn test_range_completion_at_either_bound() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", CODE)]), dir.path());

    // Lower bound typed, exclusive upper bound applies.
    let out = suggester.suggest(&request_at(&["p1"], "[f TO functional}", 2)).unwrap();
    assert_eq!(terms(&out), vec!["function", "foo", "fun"]);

    // Upper bound typed, inclusive lower bound applies.
    let out = suggester.suggest(&request_at(&["p1"], "[foo TO fu]", 10)).unwrap();
    assert_eq!(terms(&out), vec!["function", "fun", "functional", "functors"]);
}

#[test]
fn test_patterns_refused_without_complex_queries() {
    let dir = tempfile::tempdir().unwrap();
    let config = SuggesterConfig {
        allow_complex_queries: false,
        ..test_config(dir.path())
    };
    let suggester = started_with(config, memory_source_with(FIELD, &[("p1", CODE)]));

    assert!(suggest_terms(&suggester, &["p1"], "f?n*").is_empty());
    let out = suggester.suggest(&request_at(&["p1"], "[f TO g]", 2)).unwrap();
    assert!(out.candidates.is_empty());
    // A trailing star alone is still plain prefix completion.
    assert_eq!(suggest_terms(&suggester, &["p1"], "functo*"), vec!["functors"]);
}
