// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Search queries and suggestion queries.
//!
//! [`Query`] is the ordinary search-query AST: what a completed search looked
//! like, and what the residual filter of a suggestion request looks like.
//! [`SuggesterQuery`] is the thing being completed: a prefix in one field, one
//! slot of a phrase, a wildcard or regexp pattern, or one bound of a range.
//! The enumerator matches on it once and never needs to
//! know anything else about where it came from.

pub mod eval;
pub mod intent;
pub mod parser;
pub mod pattern;

pub use eval::matching_docs;
pub use intent::{parse_intent, SuggestionIntent, SENTINEL_LEN};
pub use parser::{parse_field, parse_query};
pub use pattern::{RangeEnd, TermMatcher, TermRange};

use crate::error::ParseError;

/// How a clause participates in its boolean parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occur {
    Must,
    Should,
    MustNot,
}

/// Search query AST. Leaves carry the field they apply to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Term { field: String, term: String },
    Prefix { field: String, prefix: String },
    Phrase { field: String, terms: Vec<String> },
    Wildcard { field: String, pattern: String },
    Regexp { field: String, pattern: String },
    Range { field: String, range: TermRange },
    Bool(Vec<Clause>),
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub occur: Occur,
    pub query: Query,
}

impl Clause {
    pub fn new(occur: Occur, query: Query) -> Self {
        Self { occur, query }
    }

    pub fn must(query: Query) -> Self {
        Self::new(Occur::Must, query)
    }
}

impl Query {
    pub fn term(field: impl Into<String>, term: impl Into<String>) -> Self {
        Query::Term {
            field: field.into(),
            term: term.into(),
        }
    }

    pub fn prefix(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Query::Prefix {
            field: field.into(),
            prefix: prefix.into(),
        }
    }

    pub fn phrase<S: Into<String>>(field: impl Into<String>, terms: impl IntoIterator<Item = S>) -> Self {
        Query::Phrase {
            field: field.into(),
            terms: terms.into_iter().map(Into::into).collect(),
        }
    }

    /// Collapse a clause list. A single required clause is returned bare,
    /// an empty list is `None`.
    pub fn from_clauses(mut clauses: Vec<Clause>) -> Option<Self> {
        match clauses.len() {
            0 => None,
            1 if clauses[0].occur != Occur::MustNot => clauses.pop().map(|c| c.query),
            _ => Some(Query::Bool(clauses)),
        }
    }

    /// Literal `(field, term)` pairs of every term and phrase leaf.
    ///
    /// These are what a completed search "searched for"; prefixes, patterns
    /// and ranges are expansions, not literal terms, and are skipped.
    pub fn searched_terms(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(q) = stack.pop() {
            match q {
                Query::Term { field, term } => out.push((field.clone(), term.clone())),
                Query::Phrase { field, terms } => {
                    out.extend(terms.iter().map(|t| (field.clone(), t.clone())));
                }
                Query::Bool(clauses) => stack.extend(clauses.iter().rev().map(|c| &c.query)),
                Query::Prefix { .. }
                | Query::Wildcard { .. }
                | Query::Regexp { .. }
                | Query::Range { .. }
                | Query::All => {}
            }
        }
        out
    }

    /// Terms required by this query in `field` through plain term clauses.
    pub fn required_terms(&self, field: &str) -> Vec<&str> {
        fn walk<'a>(q: &'a Query, field: &str, required: bool, out: &mut Vec<&'a str>) {
            match q {
                Query::Term { field: f, term } if required && f == field => out.push(term),
                Query::Bool(clauses) => {
                    for c in clauses {
                        walk(&c.query, field, required && c.occur == Occur::Must, out);
                    }
                }
                _ => {}
            }
        }
        let mut out = Vec::new();
        walk(self, field, true, &mut out);
        out
    }
}

// ============================================================================
// SUGGESTER QUERY
// ============================================================================

/// One slot of a phrase being completed.
///
/// `terms` are the phrase's other terms in order; the completed term goes
/// in front of `terms[offset]` (or at the end when `offset == terms.len()`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseCompletion {
    field: String,
    terms: Vec<String>,
    prefix: String,
    offset: usize,
}

impl PhraseCompletion {
    pub fn new(
        field: impl Into<String>,
        terms: Vec<String>,
        prefix: impl Into<String>,
        offset: usize,
    ) -> Result<Self, ParseError> {
        if terms.is_empty() || offset > terms.len() {
            return Err(ParseError::NoCompletionPoint);
        }
        Ok(Self {
            field: field.into(),
            terms,
            prefix: prefix.into(),
            offset,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Phrase slot of `terms[i]` once the completed term is spliced in.
    pub fn slot_of(&self, i: usize) -> usize {
        if i < self.offset {
            i
        } else {
            i + 1
        }
    }
}

/// One bound of a range being completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeCompletion {
    pub field: String,
    /// The typed bound is stored without the caret; `None` if nothing was typed.
    pub range: TermRange,
    pub end: RangeEnd,
}

impl RangeCompletion {
    /// What was typed at the completed bound.
    pub fn typed(&self) -> &str {
        let bound = match self.end {
            RangeEnd::Lower => &self.range.lower,
            RangeEnd::Upper => &self.range.upper,
        };
        bound.as_deref().unwrap_or("")
    }
}

/// What is being completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggesterQuery {
    Prefix { field: String, prefix: String },
    Phrase(PhraseCompletion),
    Wildcard { field: String, pattern: String },
    Regexp { field: String, pattern: String },
    Range(RangeCompletion),
}

impl SuggesterQuery {
    pub fn prefix(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        SuggesterQuery::Prefix {
            field: field.into(),
            prefix: prefix.into(),
        }
    }

    /// Phrase completion; see [`PhraseCompletion`].
    pub fn phrase<S: Into<String>>(
        field: impl Into<String>,
        terms: impl IntoIterator<Item = S>,
        prefix: impl Into<String>,
        offset: usize,
    ) -> Result<Self, ParseError> {
        let terms = terms.into_iter().map(Into::into).collect();
        PhraseCompletion::new(field, terms, prefix, offset).map(SuggesterQuery::Phrase)
    }

    /// Wildcard completion. Fails only for patterns too large to compile.
    pub fn wildcard(field: impl Into<String>, pattern: impl Into<String>) -> Result<Self, ParseError> {
        let pattern = pattern.into();
        TermMatcher::wildcard(&pattern)?;
        Ok(SuggesterQuery::Wildcard {
            field: field.into(),
            pattern,
        })
    }

    pub fn regexp(field: impl Into<String>, pattern: impl Into<String>) -> Result<Self, ParseError> {
        let pattern = pattern.into();
        TermMatcher::regexp(&pattern)?;
        Ok(SuggesterQuery::Regexp {
            field: field.into(),
            pattern,
        })
    }

    pub fn range(field: impl Into<String>, range: TermRange, end: RangeEnd) -> Self {
        SuggesterQuery::Range(RangeCompletion {
            field: field.into(),
            range,
            end,
        })
    }

    pub fn field(&self) -> &str {
        match self {
            SuggesterQuery::Prefix { field, .. }
            | SuggesterQuery::Wildcard { field, .. }
            | SuggesterQuery::Regexp { field, .. } => field,
            SuggesterQuery::Phrase(p) => p.field(),
            SuggesterQuery::Range(r) => &r.field,
        }
    }

    /// The partial token being completed.
    pub fn completed_prefix(&self) -> &str {
        match self {
            SuggesterQuery::Prefix { prefix, .. } => prefix,
            SuggesterQuery::Phrase(p) => p.prefix(),
            SuggesterQuery::Wildcard { pattern, .. } | SuggesterQuery::Regexp { pattern, .. } => {
                pattern
            }
            SuggesterQuery::Range(r) => r.typed(),
        }
    }

    /// Plain prefix completion, the only mode allowed without complex queries.
    pub fn is_prefix(&self) -> bool {
        matches!(self, SuggesterQuery::Prefix { .. })
    }

    /// Matcher for the completed term. For a phrase that is its partial word.
    pub fn term_matcher(&self) -> Result<TermMatcher, ParseError> {
        match self {
            SuggesterQuery::Prefix { prefix, .. } => Ok(TermMatcher::prefix(prefix)),
            SuggesterQuery::Phrase(p) => Ok(TermMatcher::prefix(p.prefix())),
            SuggesterQuery::Wildcard { pattern, .. } => TermMatcher::wildcard(pattern),
            SuggesterQuery::Regexp { pattern, .. } => TermMatcher::regexp(pattern),
            SuggesterQuery::Range(r) => Ok(TermMatcher::range_bound(&r.range, r.end)),
        }
    }
}
