//! Request validation.

use std::collections::{BTreeMap, BTreeSet};

use super::common::{memory_source_with, request, request_at, started, started_with, test_config, ANIMALS, FIELD};
use typeahead::{ParseError, SuggestError, SuggestRequest, SuggesterConfig};

#[test]
fn test_no_projects() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", ANIMALS)]), dir.path());

    let result = suggester.suggest(&request(&[], "b"));
    assert!(matches!(result, Err(SuggestError::NoProjects)));
}

#[test]
fn test_too_many_projects() {
    let dir = tempfile::tempdir().unwrap();
    let config = SuggesterConfig {
        max_projects: 1,
        ..test_config(dir.path())
    };
    let suggester = started_with(config, memory_source_with(FIELD, &[("p1", ANIMALS)]));

    let result = suggester.suggest(&request(&["p1", "p2"], "b"));
    assert!(matches!(
        result,
        Err(SuggestError::TooManyProjects {
            requested: 2,
            max: 1
        })
    ));
    assert!(suggester.suggest(&request(&["p1"], "b")).is_ok());
}

#[test]
fn test_field_not_allowed() {
    let dir = tempfile::tempdir().unwrap();
    let config = SuggesterConfig {
        allowed_fields: Some(BTreeSet::from(["full".to_string()])),
        ..test_config(dir.path())
    };
    let suggester = started_with(config, memory_source_with(FIELD, &[("p1", ANIMALS)]));

    let request = SuggestRequest {
        projects: vec!["p1".into()],
        fields: BTreeMap::from([("path".to_string(), "src".to_string())]),
        field: "path".into(),
        caret: 3,
    };
    match suggester.suggest(&request) {
        Err(SuggestError::FieldNotAllowed(field)) => assert_eq!(field, "path"),
        other => panic!("expected FieldNotAllowed, got {other:?}"),
    }
}

#[test]
fn test_malformed_query() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", ANIMALS)]), dir.path());

    let result = suggester.suggest(&request(&["p1"], "\"quick br"));
    assert!(matches!(
        result,
        Err(SuggestError::Parse(ParseError::UnbalancedQuote(_)))
    ));
}

#[test]
fn test_caret_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", ANIMALS)]), dir.path());

    let result = suggester.suggest(&request_at(&["p1"], "quick", 40));
    assert!(matches!(
        result,
        Err(SuggestError::Parse(ParseError::InvalidCaret { caret: 40, len: 5 }))
    ));
}

#[test]
fn test_caret_field_missing_from_request() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", ANIMALS)]), dir.path());

    let request = SuggestRequest {
        projects: vec!["p1".into()],
        fields: BTreeMap::new(),
        field: FIELD.into(),
        caret: 0,
    };
    assert!(matches!(
        suggester.suggest(&request),
        Err(SuggestError::Parse(ParseError::UnknownField(_)))
    ));
}
