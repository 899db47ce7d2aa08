//! Search counting and its effect on ranking.

use std::collections::BTreeMap;
use std::fs;

use super::common::{
    memory_source_with, started, started_with, suggest_terms, test_config, ANIMALS, FIELD, WAIT,
};
use typeahead::popular::decode_store;
use typeahead::suggester::popularity_path;
use typeahead::{parse_query, PopularityEntry, Query, SuggestError, SuggesterConfig};

fn query(text: &str) -> Query {
    parse_query(&BTreeMap::from([(FIELD.to_string(), text.to_string())])).unwrap()
}

fn entry(term: &str, count: u64) -> PopularityEntry {
    PopularityEntry {
        term: term.to_string(),
        count,
    }
}

#[test]
fn test_searches_reorder_suggestions() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", ANIMALS)]), dir.path());
    assert_eq!(suggest_terms(&suggester, &["p1"], "b"), vec!["brown", "bear"]);

    let projects = vec!["p1".to_string()];
    for _ in 0..3 {
        suggester.on_search(&projects, &query("bear"));
    }
    assert!(suggester.wait_for_events(WAIT));

    assert_eq!(suggest_terms(&suggester, &["p1"], "b"), vec!["bear", "brown"]);
    assert_eq!(
        suggester.popularity_data("p1", FIELD, 0, 10).unwrap(),
        vec![entry("bear", 3)]
    );
    assert_eq!(suggester.dropped_events(), 0);
}

#[test]
fn test_every_searched_term_counts() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", ANIMALS)]), dir.path());

    // Negated and phrase terms were searched for too; prefixes were not.
    suggester.on_search(&["p1".to_string()], &query("-fox \"lazy brown\" qui*"));
    assert!(suggester.wait_for_events(WAIT));

    assert_eq!(
        suggester.popularity_data("p1", FIELD, 0, 10).unwrap(),
        vec![entry("brown", 1), entry("fox", 1), entry("lazy", 1)]
    );
}

#[test]
fn test_unknown_terms_not_counted() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", ANIMALS)]), dir.path());

    suggester.on_search(&["p1".to_string()], &query("unicorn"));
    assert!(suggester.wait_for_events(WAIT));
    assert!(suggester.popularity_data("p1", FIELD, 0, 10).unwrap().is_empty());

    assert!(!suggester.increase_search_count("p1", FIELD, "unicorn", 1, true));
    assert!(!suggester.increase_search_count("ghost", FIELD, "bear", 1, true));
    assert!(!suggester.increase_search_count("p1", "path", "bear", 1, true));
    assert!(suggester.increase_search_count("p1", FIELD, "bear", 1, true));
}

#[test]
fn test_popularity_paging() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", ANIMALS)]), dir.path());

    for (term, count) in [("brown", 5), ("bear", 3), ("fox", 2), ("dog", 1)] {
        assert!(suggester.increase_search_count("p1", FIELD, term, count, true));
    }

    assert_eq!(
        suggester.popularity_data("p1", FIELD, 0, 2).unwrap(),
        vec![entry("brown", 5), entry("bear", 3)]
    );
    assert_eq!(
        suggester.popularity_data("p1", FIELD, 1, 2).unwrap(),
        vec![entry("fox", 2), entry("dog", 1)]
    );
    assert!(suggester.popularity_data("p1", FIELD, 2, 2).unwrap().is_empty());
    assert!(matches!(
        suggester.popularity_data("ghost", FIELD, 0, 2),
        Err(SuggestError::UnknownProject(_))
    ));
}

#[test]
fn test_counts_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let source = memory_source_with(FIELD, &[("p1", ANIMALS)]);

    let suggester = started(source.clone(), dir.path());
    assert!(suggester.increase_search_count("p1", FIELD, "bear", 4, true));
    drop(suggester);

    let suggester = started(source, dir.path());
    assert_eq!(
        suggester.popularity_data("p1", FIELD, 0, 10).unwrap(),
        vec![entry("bear", 4)]
    );
    assert_eq!(suggest_terms(&suggester, &["p1"], "b"), vec!["bear", "brown"]);
}

#[test]
fn test_close_flushes_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let suggester = started(memory_source_with(FIELD, &[("p1", ANIMALS)]), dir.path());

    assert!(suggester.increase_search_count("p1", FIELD, "quick", 2, true));
    suggester.close();
    assert!(!suggester.increase_search_count("p1", FIELD, "quick", 1, true));

    let bytes = fs::read(popularity_path(dir.path(), "p1", FIELD)).unwrap();
    let decoded = decode_store(&bytes).unwrap();
    assert_eq!(decoded.entries, vec![("quick".to_string(), 2)]);
}

#[test]
fn test_popularity_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let config = SuggesterConfig {
        allow_most_popular: false,
        ..test_config(dir.path())
    };
    let suggester = started_with(config, memory_source_with(FIELD, &[("p1", ANIMALS)]));

    assert!(!suggester.increase_search_count("p1", FIELD, "bear", 5, true));
    suggester.on_search(&["p1".to_string()], &query("bear"));
    assert!(suggester.wait_for_events(WAIT));

    assert!(suggester.popularity_data("p1", FIELD, 0, 10).unwrap().is_empty());
    assert_eq!(suggest_terms(&suggester, &["p1"], "b"), vec!["brown", "bear"]);
    assert!(!popularity_path(dir.path(), "p1", FIELD).exists());
}
