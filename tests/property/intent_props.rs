//! The caret picks exactly one word; the rest of the query filters.

use std::collections::BTreeMap;

use super::common::FIELD;
use proptest::prelude::*;
use typeahead::{parse_intent, SuggesterQuery};

fn words_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(prop::string::string_regex("[a-z]{1,6}").unwrap(), 1..6)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A caret anywhere inside word `i` completes that whole word and every
    /// other word becomes a required filter term.
    #[test]
    fn prop_caret_selects_enclosing_word(
        words in words_strategy(),
        pick in any::<prop::sample::Index>(),
        within in any::<prop::sample::Index>(),
    ) {
        let i = pick.index(words.len());
        let start: usize = words[..i].iter().map(|w| w.len() + 1).sum();
        let caret = start + within.index(words[i].len() + 1);
        let text = words.join(" ");
        let fields = BTreeMap::from([(FIELD.to_string(), text.clone())]);

        let intent = parse_intent(&fields, FIELD, caret).unwrap();
        prop_assert_eq!(
            &intent.query,
            &SuggesterQuery::prefix(FIELD, words[i].clone()),
            "text {:?} caret {}", text, caret
        );

        let others: Vec<&str> = words
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, w)| w.as_str())
            .collect();
        match &intent.filter {
            None => prop_assert!(others.is_empty()),
            Some(filter) => prop_assert_eq!(filter.required_terms(FIELD), others),
        }
    }

    /// Parsing never panics on arbitrary input and caret.
    #[test]
    fn prop_parse_intent_total(text in "[a-z \"*?+(){}/\\[\\]-]{0,24}", caret in 0usize..30) {
        let fields = BTreeMap::from([(FIELD.to_string(), text)]);
        let _ = parse_intent(&fields, FIELD, caret);
    }
}
