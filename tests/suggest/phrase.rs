//! Phrase completion: the suggested term must sit at the caret's slot.

use super::common::{
    memory_source_with, request_at, started, started_with, suggest_terms, terms, test_config,
    ANIMALS, FIELD,
};
use typeahead::SuggesterConfig;

#[test]
fn test_completes_word_after_phrase() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", ANIMALS)]), dir.path());

    let text = "\"quick br\"";
    let out = suggester.suggest(&request_at(&["p1"], text, text.len() - 1)).unwrap();
    assert_eq!(terms(&out), vec!["brown"]);
    assert_eq!(out.candidates[0].doc_freq, 2);
}

#[test]
fn test_completes_word_before_phrase() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", ANIMALS)]), dir.path());

    let out = suggester.suggest(&request_at(&["p1"], "\"q brown\"", 2)).unwrap();
    assert_eq!(terms(&out), vec!["quick"]);

    let out = suggester.suggest(&request_at(&["p1"], "\"l brown\"", 2)).unwrap();
    assert_eq!(terms(&out), vec!["lazy"]);
}

#[test]
fn test_phrase_requires_adjacency() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", ANIMALS)]), dir.path());

    // "brown" follows "the" in no document, only with a word in between.
    let text = "\"the br\"";
    let out = suggester.suggest(&request_at(&["p1"], text, text.len() - 1)).unwrap();
    assert!(out.candidates.is_empty());
    assert!(!out.partial);
}

#[test]
fn test_completes_gap_inside_phrase() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", ANIMALS)]), dir.path());

    // Caret between the two spaces: "the | brown"
    let out = suggester.suggest(&request_at(&["p1"], "\"the  brown\"", 5)).unwrap();
    let got: Vec<(String, u64)> = out
        .candidates
        .iter()
        .map(|c| (c.term.clone(), c.doc_freq))
        .collect();
    assert_eq!(got, vec![("quick".to_string(), 2), ("lazy".to_string(), 1)]);
}

#[test]
fn test_phrase_with_filter() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", ANIMALS)]), dir.path());

    let text = "-dog \"quick br\"";
    let out = suggester.suggest(&request_at(&["p1"], text, text.len() - 1)).unwrap();
    assert_eq!(terms(&out), vec!["brown"]);
    assert_eq!(out.candidates[0].doc_freq, 1);
}

#[test]
fn test_unknown_phrase_term_yields_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", ANIMALS)]), dir.path());

    let text = "\"purple br\"";
    let out = suggester.suggest(&request_at(&["p1"], text, text.len() - 1)).unwrap();
    assert!(out.candidates.is_empty());
}

#[test]
fn test_complex_queries_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let config = SuggesterConfig {
        allow_complex_queries: false,
        ..test_config(dir.path())
    };
    let suggester = started_with(config, memory_source_with(FIELD, &[("p1", ANIMALS)]));

    let text = "\"quick br\"";
    let out = suggester.suggest(&request_at(&["p1"], text, text.len() - 1)).unwrap();
    assert!(out.candidates.is_empty());
    assert!(suggest_terms(&suggester, &["p1"], "lazy b").is_empty());
    assert_eq!(suggest_terms(&suggester, &["p1"], "b"), vec!["brown", "bear"]);
}
