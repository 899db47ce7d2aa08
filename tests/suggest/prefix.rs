//! Prefix completion through the full request pipeline.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::common::{
    index_from_docs, memory_source_with, request_at, started, started_with, suggest_terms, terms,
    test_config, ANIMALS, CODE, FIELD,
};
use typeahead::{MemoryIndexSource, SuggestRequest, SuggesterConfig};

#[test]
fn test_prefix_ranks_by_doc_freq_then_term() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", ANIMALS)]), dir.path());

    assert_eq!(suggest_terms(&suggester, &["p1"], "b"), vec!["brown", "bear"]);
    assert_eq!(suggest_terms(&suggester, &["p1"], "qu"), vec!["quick"]);
    assert!(suggest_terms(&suggester, &["p1"], "zz").is_empty());
}

#[test]
fn test_empty_prefix_lists_most_frequent_terms() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", ANIMALS)]), dir.path());

    let out = suggester.suggest(&request_at(&["p1"], "", 0)).unwrap();
    assert_eq!(out.candidates.len(), 10);
    assert_eq!(&terms(&out)[..5], ["brown", "quick", "the", "dog", "fox"]);
    assert!(!terms(&out).contains(&"wins".to_string()));
}

#[test]
fn test_doc_freq_reported() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", CODE)]), dir.path());

    let out = suggester.suggest(&request_at(&["p1"], "fun", 3)).unwrap();
    let got: Vec<(String, u64)> = out
        .candidates
        .iter()
        .map(|c| (c.term.clone(), c.doc_freq))
        .collect();
    assert_eq!(
        got,
        vec![
            ("function".to_string(), 2),
            ("fun".to_string(), 1),
            ("functional".to_string(), 1),
            ("functors".to_string(), 1),
        ]
    );
}

#[test]
fn test_caret_inside_token_completes_whole_token() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", ANIMALS)]), dir.path());

    // "qu|ick" completes "quick", restricted to docs with "brown"
    let out = suggester.suggest(&request_at(&["p1"], "quick brown", 2)).unwrap();
    assert_eq!(terms(&out), vec!["quick"]);
    assert_eq!(out.candidates[0].doc_freq, 2);
}

#[test]
fn test_wildcard_marks_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", ANIMALS)]), dir.path());

    let out = suggester.suggest(&request_at(&["p1"], "qui*", 3)).unwrap();
    assert_eq!(terms(&out), vec!["quick"]);
}

#[test]
fn test_filter_restricts_doc_freq() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", ANIMALS)]), dir.path());

    // Only "the lazy brown bear" matches the filter.
    let out = suggester.suggest(&request_at(&["p1"], "lazy b", 6)).unwrap();
    let got: Vec<(String, u64)> = out
        .candidates
        .iter()
        .map(|c| (c.term.clone(), c.doc_freq))
        .collect();
    assert_eq!(got, vec![("bear".to_string(), 1), ("brown".to_string(), 1)]);
}

#[test]
fn test_negated_clause_filters_documents() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", ANIMALS)]), dir.path());

    let out = suggester.suggest(&request_at(&["p1"], "-fox d", 6)).unwrap();
    assert_eq!(terms(&out), vec!["dog"]);
    assert_eq!(out.candidates[0].doc_freq, 1);
}

#[test]
fn test_required_terms_not_suggested_again() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", ANIMALS)]), dir.path());

    assert_eq!(suggest_terms(&suggester, &["p1"], "brown b"), vec!["bear"]);
}

#[test]
fn test_optional_siblings_do_not_filter() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", ANIMALS)]), dir.path());

    // "lazy OR b": the OR makes "lazy" optional, so it can't narrow the docs.
    let out = suggester.suggest(&request_at(&["p1"], "lazy OR b", 9)).unwrap();
    assert_eq!(terms(&out), vec!["brown", "bear"]);
    assert_eq!(out.candidates[0].doc_freq, 3);
}

#[test]
fn test_other_fields_filter_candidates() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(MemoryIndexSource::new());
    source.publish(
        "p1",
        index_from_docs(&[
            &[("full", "parse request"), ("path", "src/http/client.rs")],
            &[("full", "parse response"), ("path", "src/io/reader.rs")],
        ]),
    );
    let suggester = started(source, dir.path());

    let request = SuggestRequest {
        projects: vec!["p1".into()],
        fields: BTreeMap::from([
            ("full".to_string(), "parse re".to_string()),
            ("path".to_string(), "http".to_string()),
        ]),
        field: "full".into(),
        caret: 8,
    };
    assert_eq!(terms(&suggester.suggest(&request).unwrap()), vec!["request"]);
}

#[test]
fn test_min_chars_gate() {
    let dir = tempfile::tempdir().unwrap();
    let config = SuggesterConfig {
        min_chars: 2,
        ..test_config(dir.path())
    };
    let suggester = started_with(config, memory_source_with(FIELD, &[("p1", ANIMALS)]));

    assert!(suggest_terms(&suggester, &["p1"], "q").is_empty());
    assert_eq!(suggest_terms(&suggester, &["p1"], "qu"), vec!["quick"]);
}

#[test]
fn test_enumeration_cap_limits_examined_terms() {
    let dir = tempfile::tempdir().unwrap();
    let texts: Vec<String> = (0..50).map(|i| format!("item{i:02}")).collect();
    let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
    let source = memory_source_with(FIELD, &[("p1", texts.as_slice())]);

    let capped = SuggesterConfig {
        enumeration_cap: 5,
        max_results: 50,
        ..test_config(dir.path())
    };
    let suggester = started_with(capped, source.clone());
    assert_eq!(
        suggest_terms(&suggester, &["p1"], "item"),
        vec!["item00", "item01", "item02", "item03", "item04"]
    );
    drop(suggester);

    let full_scan = SuggesterConfig {
        enumeration_cap: 5,
        allow_full_scan: true,
        max_results: 50,
        ..test_config(dir.path())
    };
    let suggester = started_with(full_scan, source);
    assert_eq!(suggest_terms(&suggester, &["p1"], "item").len(), 50);
}
