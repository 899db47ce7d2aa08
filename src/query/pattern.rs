// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Term matchers for wildcard, regexp and range clauses.
//!
//! Every matcher knows a literal prefix that all of its matches start with.
//! Callers walk only `FieldTerms::with_prefix(literal)` and test each entry
//! there, so `fo?bar` touches the `fo` run and never the rest of the
//! dictionary. Patterns with no usable literal (`*bar`, `/(a|b)c/`) walk the
//! whole dictionary and lean on the enumeration cap.
//!
//! ```text
//! wildcard  f?n*ion    -> literal "f",  ^(?:f.n.*ion)$
//! regexp    /fun+c/    -> literal "fu", ^(?:fun+c)$
//! range     [foo TO fox] -> literal "fo", foo <= t <= fox
//! ```

use regex::{Regex, RegexBuilder};

use crate::error::ParseError;
use crate::index::{FieldTerms, TermEntry};

/// Compiled automata above this many bytes are refused.
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// Bounds of a term range. `None` is an open end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermRange {
    pub lower: Option<String>,
    pub upper: Option<String>,
    pub include_lower: bool,
    pub include_upper: bool,
}

impl TermRange {
    pub fn new(
        lower: Option<String>,
        upper: Option<String>,
        include_lower: bool,
        include_upper: bool,
    ) -> Self {
        Self {
            lower,
            upper,
            include_lower,
            include_upper,
        }
    }

    pub fn contains(&self, term: &str) -> bool {
        let above = match self.lower.as_deref() {
            None => true,
            Some(lower) if self.include_lower => term >= lower,
            Some(lower) => term > lower,
        };
        let below = match self.upper.as_deref() {
            None => true,
            Some(upper) if self.include_upper => term <= upper,
            Some(upper) => term < upper,
        };
        above && below
    }

    /// Longest prefix shared by every term inside the range.
    ///
    /// Terms sort bytewise, so anything between two bounds starts with
    /// whatever the bounds have in common.
    pub fn common_prefix(&self) -> &str {
        let (Some(lower), Some(upper)) = (self.lower.as_deref(), self.upper.as_deref()) else {
            return "";
        };
        let mut n = lower
            .bytes()
            .zip(upper.bytes())
            .take_while(|(a, b)| a == b)
            .count();
        while !lower.is_char_boundary(n) {
            n -= 1;
        }
        &lower[..n]
    }
}

/// Which bound of a range holds the caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeEnd {
    Lower,
    Upper,
}

#[derive(Debug, Clone)]
enum Rule {
    Anything,
    Pattern(Regex),
    Range(TermRange),
}

/// Decides which dictionary terms a clause covers.
#[derive(Debug, Clone)]
pub struct TermMatcher {
    literal: String,
    rule: Rule,
}

impl TermMatcher {
    pub fn prefix(prefix: &str) -> Self {
        Self {
            literal: prefix.to_string(),
            rule: Rule::Anything,
        }
    }

    /// `?` is one character, `*` any run of characters, the rest literal.
    pub fn wildcard(pattern: &str) -> Result<Self, ParseError> {
        let mut source = String::with_capacity(pattern.len() + 8);
        let mut run = String::new();
        for c in pattern.chars() {
            match c {
                '*' | '?' => {
                    source.push_str(&regex::escape(&run));
                    run.clear();
                    source.push_str(if c == '*' { ".*" } else { "." });
                }
                _ => run.push(c),
            }
        }
        source.push_str(&regex::escape(&run));

        Ok(Self {
            literal: pattern.chars().take_while(|c| !matches!(c, '*' | '?')).collect(),
            rule: Rule::Pattern(compile(pattern, &source)?),
        })
    }

    /// A regular expression that must match the whole term.
    pub fn regexp(pattern: &str) -> Result<Self, ParseError> {
        Ok(Self {
            literal: regexp_literal(pattern),
            rule: Rule::Pattern(compile(pattern, pattern)?),
        })
    }

    pub fn range(range: &TermRange) -> Self {
        Self {
            literal: range.common_prefix().to_string(),
            rule: Rule::Range(range.clone()),
        }
    }

    /// Completion of one bound of `range`.
    ///
    /// What was typed at `end` is a prefix, so the typed bound itself is not
    /// compared; only the opposite bound constrains candidates.
    pub fn range_bound(range: &TermRange, end: RangeEnd) -> Self {
        let mut rest = range.clone();
        let typed = match end {
            RangeEnd::Lower => rest.lower.take(),
            RangeEnd::Upper => rest.upper.take(),
        };
        Self {
            literal: typed.unwrap_or_default(),
            rule: Rule::Range(rest),
        }
    }

    pub fn literal_prefix(&self) -> &str {
        &self.literal
    }

    /// The dictionary run that can hold matches.
    pub fn run<'d>(&self, dict: &'d FieldTerms) -> &'d [TermEntry] {
        dict.with_prefix(self.literal_prefix())
    }

    pub fn matches(&self, term: &str) -> bool {
        term.starts_with(&self.literal)
            && match &self.rule {
                Rule::Anything => true,
                Rule::Pattern(re) => re.is_match(term),
                Rule::Range(range) => range.contains(term),
            }
    }
}

fn compile(pattern: &str, source: &str) -> Result<Regex, ParseError> {
    RegexBuilder::new(&format!("^(?:{source})$"))
        .size_limit(PATTERN_SIZE_LIMIT)
        .build()
        .map_err(|e| ParseError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

/// Leading characters every match of `pattern` starts with.
///
/// Conservative: any alternation gives up, and a quantifier after the literal
/// run takes its last character back.
fn regexp_literal(pattern: &str) -> String {
    if pattern.contains('|') {
        return String::new();
    }
    let mut literal: String = pattern
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if let Some(next) = pattern[literal.len()..].chars().next() {
        if matches!(next, '*' | '?' | '{' | '+') {
            literal.pop();
        }
    }
    literal
}
