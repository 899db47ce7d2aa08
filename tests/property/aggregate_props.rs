//! Merging per-project answers equals answering over the union.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::common::{names, FIELD, WAIT};
use proptest::prelude::*;
use typeahead::testing::{single_field_index, test_config};
use typeahead::{MemoryIndexSource, Suggester, SuggesterConfig, SuggesterQuery};

// ============================================================================
// STRATEGIES
// ============================================================================

fn doc_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::string::string_regex("[a-c]{1,3}").unwrap(), 1..6)
        .prop_map(|words| words.join(" "))
}

fn corpus_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(doc_strategy(), 1..12)
}

fn ranked(suggester: &Suggester, projects: &[String], prefix: &str) -> Vec<(String, u64)> {
    suggester
        .get_suggestions(projects, &SuggesterQuery::prefix(FIELD, prefix), None)
        .candidates
        .into_iter()
        .map(|c| (c.term, c.doc_freq))
        .collect()
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Splitting a corpus across projects never changes terms or doc freqs.
    #[test]
    fn prop_split_corpus_merges_to_whole(
        docs in corpus_strategy(),
        split in 1usize..4,
        prefix in "[a-c]{0,1}",
    ) {
        let dir = tempfile::tempdir().unwrap();
        let mut parts: BTreeMap<String, Vec<&str>> = BTreeMap::new();
        for (i, doc) in docs.iter().enumerate() {
            parts.entry(format!("part{}", i % split)).or_default().push(doc);
        }
        let all: Vec<&str> = docs.iter().map(String::as_str).collect();

        let source = Arc::new(MemoryIndexSource::new());
        source.publish("whole", single_field_index(FIELD, &all));
        for (name, texts) in &parts {
            source.publish(name, single_field_index(FIELD, texts));
        }
        let config = SuggesterConfig {
            max_results: 1_000,
            ..test_config(dir.path())
        };
        let suggester = Suggester::new(config, source).unwrap();
        suggester.init();
        prop_assert!(suggester.wait_for_init(WAIT));

        let split_names: Vec<String> = parts.keys().cloned().collect();
        let merged = ranked(&suggester, &split_names, &prefix);
        let whole = ranked(&suggester, &names(&["whole"]), &prefix);
        prop_assert_eq!(merged, whole);
    }
}
