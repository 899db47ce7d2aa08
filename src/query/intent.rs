// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Query intent: what is the user completing, and what else did they ask for?
//!
//! The trick is to let the ordinary query grammar do the work. A short random
//! token is spliced in at the caret, the field text is parsed as if it were a
//! completed search, and whichever leaf ends up containing the token is the
//! one being edited. Stripping the token back out recovers the partial word.
//! Everything else in the query becomes the residual filter.
//!
//! The same goes for wildcards, regexps and ranges: the leaf holding the token
//! names the completion mode, and for a range, which bound is being typed.
//!
//! ```text
//! fields: full = "\"the quick br|\"", path = "src"
//!   splice  -> "\"the quick brq7x0k2mz\""
//!   parse   -> Phrase(full, [the, quick, brq7x0k2mz])
//!   intent  -> Phrase(full, terms=[the, quick], prefix="br", offset=2)
//!   filter  -> Term(path, src)
//! ```

use std::collections::BTreeMap;

use rand::Rng;

use super::parser::parse_field;
use super::{Clause, Occur, PhraseCompletion, Query, RangeEnd, SuggesterQuery, TermRange};
use crate::error::ParseError;

/// Length of the caret sentinel.
pub const SENTINEL_LEN: usize = 8;

const SENTINEL_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// A parsed suggestion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionIntent {
    pub query: SuggesterQuery,
    /// Everything else in the query, or `None` when there is nothing to filter by.
    pub filter: Option<Query>,
}

/// A lowercase alphanumeric token absent from `text`.
///
/// Lowercase matters: the tokenizer lowercases, so the sentinel must survive
/// analysis unchanged to be found again.
fn sentinel_for(text: &str) -> String {
    let haystack = text.to_lowercase();
    let mut rng = rand::rng();
    loop {
        let candidate: String = (0..SENTINEL_LEN)
            .map(|_| SENTINEL_CHARSET[rng.random_range(0..SENTINEL_CHARSET.len())] as char)
            .collect();
        if !haystack.contains(&candidate) {
            return candidate;
        }
    }
}

/// Where the sentinel landed.
enum Hit {
    Single(String),
    InPhrase { terms: Vec<String>, index: usize },
    Wildcard(String),
    Regexp(String),
    Range { range: TermRange, end: RangeEnd },
}

fn find_sentinel(query: &Query, sentinel: &str) -> Option<Hit> {
    match query {
        Query::Term { term, .. } if term.contains(sentinel) => Some(Hit::Single(term.clone())),
        Query::Prefix { prefix, .. } if prefix.contains(sentinel) => {
            Some(Hit::Single(prefix.clone()))
        }
        Query::Phrase { terms, .. } => terms
            .iter()
            .position(|t| t.contains(sentinel))
            .map(|index| Hit::InPhrase {
                terms: terms.clone(),
                index,
            }),
        Query::Wildcard { pattern, .. } if pattern.contains(sentinel) => {
            Some(Hit::Wildcard(pattern.replace(sentinel, "")))
        }
        Query::Regexp { pattern, .. } if pattern.contains(sentinel) => {
            Some(Hit::Regexp(pattern.replace(sentinel, "")))
        }
        Query::Range { range, .. } => {
            let holds = |bound: &Option<String>| bound.as_deref().is_some_and(|b| b.contains(sentinel));
            let end = if holds(&range.lower) {
                RangeEnd::Lower
            } else if holds(&range.upper) {
                RangeEnd::Upper
            } else {
                return None;
            };
            let mut range = range.clone();
            let bound = match end {
                RangeEnd::Lower => &mut range.lower,
                RangeEnd::Upper => &mut range.upper,
            };
            *bound = bound
                .take()
                .map(|b| b.replace(sentinel, ""))
                .filter(|b| b != "*");
            Some(Hit::Range { range, end })
        }
        _ => None,
    }
}

/// Parse the in-flight query.
///
/// `fields` maps field name to its raw text, `field` is the one under edit
/// and `caret` a byte offset into its text.
pub fn parse_intent(
    fields: &BTreeMap<String, String>,
    field: &str,
    caret: usize,
) -> Result<SuggestionIntent, ParseError> {
    let text = fields
        .get(field)
        .ok_or_else(|| ParseError::UnknownField(field.to_string()))?;
    if caret > text.len() || !text.is_char_boundary(caret) {
        return Err(ParseError::InvalidCaret {
            caret,
            len: text.len(),
        });
    }

    let sentinel = sentinel_for(text);
    let spliced = format!("{}{}{}", &text[..caret], sentinel, &text[caret..]);
    let clauses = parse_field(field, &spliced)?;

    let (at, hit) = clauses
        .iter()
        .enumerate()
        .find_map(|(i, c)| find_sentinel(&c.query, &sentinel).map(|h| (i, h)))
        .ok_or(ParseError::NoCompletionPoint)?;

    let query = match hit {
        Hit::Single(token) => SuggesterQuery::prefix(field, token.replace(&sentinel, "")),
        Hit::InPhrase { mut terms, index } => {
            let prefix = terms.remove(index).replace(&sentinel, "");
            if terms.is_empty() {
                SuggesterQuery::prefix(field, prefix)
            } else {
                SuggesterQuery::Phrase(PhraseCompletion::new(field, terms, prefix, index)?)
            }
        }
        Hit::Wildcard(pattern) => {
            // `fo*` once the caret is gone: nothing left to match but a prefix.
            let body = pattern.trim_end_matches('*');
            if body.len() != pattern.len() && !body.contains(|c: char| matches!(c, '*' | '?')) {
                SuggesterQuery::prefix(field, body)
            } else {
                SuggesterQuery::wildcard(field, pattern)?
            }
        }
        Hit::Regexp(pattern) => SuggesterQuery::regexp(field, pattern)?,
        Hit::Range { range, end } => SuggesterQuery::range(field, range, end),
    };

    // Optional siblings only widen the result set; they can't filter.
    let mut filter: Vec<Clause> = clauses
        .into_iter()
        .enumerate()
        .filter(|(i, c)| *i != at && c.occur != Occur::Should)
        .map(|(_, c)| c)
        .collect();

    for (other, other_text) in fields {
        if other == field {
            continue;
        }
        if let Some(q) = Query::from_clauses(parse_field(other, other_text)?) {
            filter.push(Clause::must(q));
        }
    }

    Ok(SuggestionIntent {
        query,
        filter: if filter.is_empty() {
            None
        } else {
            Some(Query::Bool(filter))
        },
    })
}
