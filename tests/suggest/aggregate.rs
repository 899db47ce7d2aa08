//! Multi-project fan-out and merge.

use std::collections::BTreeSet;
use std::thread;

use super::common::{
    memory_source_with, names, request, started, started_with, suggest_terms, terms, test_config,
    ANIMALS, CODE, FIELD, KITCHEN,
};
use typeahead::{Exclusion, SuggesterConfig};

#[test]
fn test_doc_freq_sums_across_projects() {
    let dir = tempfile::tempdir().unwrap();
    let source = memory_source_with(FIELD, &[("p1", ANIMALS), ("p2", KITCHEN)]);
    let suggester = started(source, dir.path());

    let out = suggester.suggest(&request(&["p1", "p2"], "brown")).unwrap();
    assert_eq!(terms(&out), vec!["brown", "brownie"]);
    assert_eq!(out.candidates[0].doc_freq, 5);
    assert_eq!(out.candidates[0].projects, vec!["p1", "p2"]);
    assert_eq!(out.candidates[1].doc_freq, 1);
    assert_eq!(out.candidates[1].projects, vec!["p2"]);
    assert!(!out.partial);
    assert!(out.excluded.is_empty());
}

#[test]
fn test_popularity_sums_across_projects() {
    let dir = tempfile::tempdir().unwrap();
    let source = memory_source_with(FIELD, &[("p1", ANIMALS), ("p2", KITCHEN)]);
    let suggester = started(source, dir.path());

    assert!(suggester.increase_search_count("p2", FIELD, "brownie", 3, true));
    assert_eq!(
        suggest_terms(&suggester, &["p1", "p2"], "brown"),
        vec!["brownie", "brown"]
    );

    // 2 + 2 beats 3 only once both projects' counts are added up.
    assert!(suggester.increase_search_count("p1", FIELD, "brown", 2, true));
    assert!(suggester.increase_search_count("p2", FIELD, "brown", 2, true));
    let out = suggester.suggest(&request(&["p1", "p2"], "brown")).unwrap();
    assert_eq!(terms(&out), vec!["brown", "brownie"]);
    assert_eq!(out.candidates[0].popularity, 4);
    assert_eq!(out.candidates[1].popularity, 3);

    // Popularity outranks doc freq within a single project too.
    assert_eq!(
        suggest_terms(&suggester, &["p2"], "brown"),
        vec!["brownie", "brown"]
    );
}

#[test]
fn test_max_results_applies_to_merged_list() {
    let dir = tempfile::tempdir().unwrap();
    let config = SuggesterConfig {
        max_results: 2,
        ..test_config(dir.path())
    };
    let source = memory_source_with(FIELD, &[("p1", ANIMALS), ("p2", CODE)]);
    let suggester = started_with(config, source);

    let out = suggester.suggest(&request(&["p1", "p2"], "f")).unwrap();
    assert_eq!(terms(&out), vec!["fox", "function"]);
}

#[test]
fn test_unknown_project_makes_result_partial() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", ANIMALS)]), dir.path());

    let out = suggester.suggest(&request(&["nope", "p1"], "b")).unwrap();
    assert_eq!(terms(&out), vec!["brown", "bear"]);
    assert!(out.partial);
    assert_eq!(out.exclusion("nope"), Some(&Exclusion::Unknown));
    assert_eq!(out.exclusion("p1"), None);
}

#[test]
fn test_disallowed_project_reported_unknown() {
    let dir = tempfile::tempdir().unwrap();
    let config = SuggesterConfig {
        allowed_projects: Some(BTreeSet::from(["p1".to_string()])),
        ..test_config(dir.path())
    };
    let source = memory_source_with(FIELD, &[("p1", ANIMALS), ("p2", KITCHEN)]);
    let suggester = started_with(config, source);

    assert_eq!(suggester.projects(), names(&["p1"]));
    let out = suggester.suggest(&request(&["p1", "p2"], "brown")).unwrap();
    assert_eq!(terms(&out), vec!["brown"]);
    assert_eq!(out.exclusion("p2"), Some(&Exclusion::Unknown));
}

#[test]
fn test_concurrent_requests_agree() {
    let dir = tempfile::tempdir().unwrap();
    let source = memory_source_with(FIELD, &[("p1", ANIMALS), ("p2", KITCHEN), ("p3", CODE)]);
    let suggester = started(source, dir.path());
    let expected = suggest_terms(&suggester, &["p1", "p2", "p3"], "b");
    assert!(!expected.is_empty());

    thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                for _ in 0..20 {
                    let got = suggest_terms(&suggester, &["p1", "p2", "p3"], "b");
                    assert_eq!(got, expected);
                }
            });
        }
    });
}

#[test]
fn test_serialized_shape() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", ANIMALS)]), dir.path());

    let out = suggester.suggest(&request(&["p1", "nope"], "lazy")).unwrap();
    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json["candidates"][0]["term"], "lazy");
    assert_eq!(json["candidates"][0]["doc_freq"], 1);
    assert_eq!(
        json["excluded"][0],
        serde_json::json!({"project": "nope", "reason": "unknown"})
    );
    assert_eq!(json["partial"], true);
    assert!(json.get("elapsed").is_none());
}
