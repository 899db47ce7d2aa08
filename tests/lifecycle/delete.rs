//! Project deletion.

use super::common::{
    memory_source_with, names, request, single_field_index, started, suggest_terms, Gate,
    GatedSource, ANIMALS, FIELD, KITCHEN, WAIT,
};
use typeahead::suggester::popularity_path;
use typeahead::{Exclusion, RebuildState};

#[test]
fn test_delete_forgets_project_and_data() {
    let dir = tempfile::tempdir().unwrap();
    let source = memory_source_with(FIELD, &[("p1", ANIMALS), ("p2", KITCHEN)]);
    let suggester = started(source, dir.path());

    let store_file = popularity_path(dir.path(), "p1", FIELD);
    let project_dir = store_file.parent().unwrap().to_path_buf();
    assert!(project_dir.is_dir());

    assert!(suggester.delete("p1"));
    assert_eq!(suggester.projects(), names(&["p2"]));
    assert_eq!(suggester.project_state("p1"), None);

    let out = suggester.suggest(&request(&["p1", "p2"], "brown")).unwrap();
    assert_eq!(out.exclusion("p1"), Some(&Exclusion::Unknown));
    assert_eq!(out.candidates[0].projects, vec!["p2"]);

    assert!(suggester.wait_for_rebuild(WAIT));
    assert!(!project_dir.exists());
    assert!(popularity_path(dir.path(), "p2", FIELD).parent().unwrap().is_dir());

    assert!(!suggester.delete("p1"));
    assert!(!suggester.delete("never-existed"));
}

#[test]
fn test_republished_project_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let source = memory_source_with(FIELD, &[("p1", ANIMALS)]);
    let suggester = started(source.clone(), dir.path());

    assert!(suggester.increase_search_count("p1", FIELD, "bear", 7, true));
    assert_eq!(suggest_terms(&suggester, &["p1"], "b"), vec!["bear", "brown"]);

    assert!(suggester.delete("p1"));
    assert!(suggester.wait_for_rebuild(WAIT));

    source.publish("p1", single_field_index(FIELD, ANIMALS));
    assert!(suggester.wait_for_rebuild(WAIT));
    assert_eq!(suggester.project_state("p1"), Some(RebuildState::Ready(1)));
    assert_eq!(suggest_terms(&suggester, &["p1"], "b"), vec!["brown", "bear"]);
    assert!(suggester
        .popularity_data("p1", FIELD, 0, 10)
        .unwrap()
        .iter()
        .all(|e| e.count == 0));
}

#[test]
fn test_republish_during_removal_waits_for_removal() {
    let dir = tempfile::tempdir().unwrap();
    let source = GatedSource::new();
    source.publish("p1", single_field_index(FIELD, ANIMALS));
    let suggester = started(source.clone(), dir.path());
    assert!(suggester.increase_search_count("p1", FIELD, "bear", 7, true));

    // A rebuild parked at the reader holds the project, so the removal
    // can't finish until the gate opens.
    source.set_gate(Gate::Block);
    suggester.rebuild("p1").unwrap();
    assert!(source.wait_blocked(1, WAIT));
    assert!(suggester.delete("p1"));

    // Notifications and rebuilds for the name are held back meanwhile.
    source.publish("p1", single_field_index(FIELD, KITCHEN));
    suggester.rebuild("p1").unwrap();
    assert_eq!(suggester.projects(), Vec::<String>::new());
    assert_eq!(suggester.project_state("p1"), None);

    source.set_gate(Gate::Pass);
    assert!(suggester.wait_for_rebuild(WAIT));

    assert_eq!(suggester.project_state("p1"), Some(RebuildState::Ready(1)));
    assert!(popularity_path(dir.path(), "p1", FIELD).is_file());
    assert_eq!(suggest_terms(&suggester, &["p1"], "br"), vec!["brown", "brownie"]);
    assert!(suggester
        .popularity_data("p1", FIELD, 0, 10)
        .unwrap()
        .is_empty());
}
