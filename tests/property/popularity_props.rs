//! Search counts add up, in memory and across a restart.

use std::collections::BTreeMap;

use super::common::{memory_source_with, started, ANIMALS, FIELD};
use proptest::prelude::*;

const DICTIONARY: &[&str] = &["the", "quick", "brown", "fox", "dog", "lazy", "bear", "wins"];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_counts_match_increments(
        increments in prop::collection::vec((0..DICTIONARY.len(), 1u64..20), 0..40),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let source = memory_source_with(FIELD, &[("p1", ANIMALS)]);

        let mut model: BTreeMap<String, u64> = BTreeMap::new();
        let suggester = started(source.clone(), dir.path());
        for &(i, delta) in &increments {
            prop_assert!(suggester.increase_search_count("p1", FIELD, DICTIONARY[i], delta, true));
            *model.entry(DICTIONARY[i].to_string()).or_default() += delta;
        }

        let top = suggester.popularity_data("p1", FIELD, 0, 100).unwrap();
        for pair in top.windows(2) {
            prop_assert!(pair[0].count >= pair[1].count);
        }
        let counted: BTreeMap<String, u64> = top.into_iter().map(|e| (e.term, e.count)).collect();
        prop_assert_eq!(&counted, &model);
        drop(suggester);

        let reopened = started(source, dir.path());
        let counted: BTreeMap<String, u64> = reopened
            .popularity_data("p1", FIELD, 0, 100)
            .unwrap()
            .into_iter()
            .map(|e| (e.term, e.count))
            .collect();
        prop_assert_eq!(&counted, &model);
    }
}
