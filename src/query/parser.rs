// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Search-query grammar.
//!
//! Deliberately small, and the same grammar serves both completed searches and
//! the spliced text of a suggestion request:
//!
//! ```text
//! field_text := item*
//! item       := ("+" | "-")? operand | "AND" | "OR" | "NOT"
//! operand    := word | word "*" | wildcard | '"' phrase '"' | "/" regexp "/"
//!             | ("[" | "{") bound "TO" bound ("]" | "}")
//! ```
//!
//! Words and phrases are run through the index tokenizer. A word that splits
//! into several tokens (`foo.bar`) becomes a phrase, a word that yields
//! nothing (`!!`) is dropped. A word with `?` or a `*` anywhere but the end is
//! a wildcard; wildcards, regexps and range bounds are lowercased but not
//! tokenized. Clauses default to MUST; `a OR b` makes both sides SHOULD;
//! `NOT x` and `-x` make x MUST_NOT.

use std::collections::BTreeMap;

use super::{Clause, Occur, Query, TermMatcher, TermRange};
use crate::error::ParseError;
use crate::index::tokenize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modifier {
    None,
    Plus,
    Minus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    Word { text: String, modifier: Modifier },
    Quoted { text: String, modifier: Modifier },
    Regexp { text: String, modifier: Modifier },
    Range {
        text: String,
        include_lower: bool,
        include_upper: bool,
        modifier: Modifier,
    },
    And,
    Or,
    Not,
}

// ============================================================================
// LEXER
// ============================================================================

fn lex(text: &str) -> Result<Vec<Item>, ParseError> {
    let mut items = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let modifier = match c {
            '+' => Modifier::Plus,
            '-' => Modifier::Minus,
            _ => Modifier::None,
        };
        if modifier != Modifier::None {
            chars.next();
            match chars.peek() {
                Some(&(_, n)) if !n.is_whitespace() => {}
                _ => return Err(ParseError::DanglingOperator(c.to_string())),
            }
        }

        if let Some(&(quote_at, '"')) = chars.peek() {
            chars.next();
            let mut phrase = String::new();
            let mut closed = false;
            for (_, ch) in chars.by_ref() {
                if ch == '"' {
                    closed = true;
                    break;
                }
                phrase.push(ch);
            }
            if !closed {
                return Err(ParseError::UnbalancedQuote(quote_at));
            }
            items.push(Item::Quoted {
                text: phrase,
                modifier,
            });
            continue;
        }

        if let Some(&(slash_at, '/')) = chars.peek() {
            chars.next();
            let mut pattern = String::new();
            let mut closed = false;
            let mut escaped = false;
            for (_, ch) in chars.by_ref() {
                if ch == '/' && !escaped {
                    closed = true;
                    break;
                }
                escaped = ch == '\\' && !escaped;
                pattern.push(ch);
            }
            if !closed {
                return Err(ParseError::UnterminatedRegexp(slash_at));
            }
            items.push(Item::Regexp {
                text: pattern,
                modifier,
            });
            continue;
        }

        if let Some(&(open_at, open @ ('[' | '{'))) = chars.peek() {
            chars.next();
            let mut inner = String::new();
            let mut close = None;
            for (_, ch) in chars.by_ref() {
                if matches!(ch, ']' | '}') {
                    close = Some(ch);
                    break;
                }
                inner.push(ch);
            }
            let Some(close) = close else {
                return Err(ParseError::UnterminatedRange(open_at));
            };
            items.push(Item::Range {
                text: inner,
                include_lower: open == '[',
                include_upper: close == ']',
                modifier,
            });
            continue;
        }

        let mut word = String::new();
        while let Some(&(_, ch)) = chars.peek() {
            if ch.is_whitespace() {
                break;
            }
            if ch == '"' {
                return Err(ParseError::UnbalancedQuote(start + word.len()));
            }
            word.push(ch);
            chars.next();
        }

        let item = match (modifier, word.as_str()) {
            (Modifier::None, "AND") => Item::And,
            (Modifier::None, "OR") => Item::Or,
            (Modifier::None, "NOT") => Item::Not,
            _ => Item::Word {
                text: word,
                modifier,
            },
        };
        items.push(item);
    }

    Ok(items)
}

// ============================================================================
// OPERANDS
// ============================================================================

fn analyzed(text: &str) -> Vec<String> {
    tokenize(text).into_iter().map(|(t, _)| t).collect()
}

fn leaf(field: &str, mut tokens: Vec<String>, prefix: bool) -> Option<Query> {
    match tokens.len() {
        0 => None,
        1 => {
            let token = tokens.pop()?;
            Some(if prefix {
                Query::prefix(field, token)
            } else {
                Query::term(field, token)
            })
        }
        _ => Some(Query::phrase(field, tokens)),
    }
}

fn range_bound(text: &str) -> Option<String> {
    (text != "*").then(|| text.to_lowercase())
}

fn operand(field: &str, item: Item) -> Result<Option<(Query, Modifier)>, ParseError> {
    let parsed = match item {
        Item::Word { text, modifier } => {
            let stripped = text.trim_end_matches('*');
            if stripped.contains(|c: char| matches!(c, '*' | '?')) {
                let pattern = text.to_lowercase();
                TermMatcher::wildcard(&pattern)?;
                Some((
                    Query::Wildcard {
                        field: field.to_string(),
                        pattern,
                    },
                    modifier,
                ))
            } else {
                let is_prefix = stripped.len() != text.len();
                leaf(field, analyzed(stripped), is_prefix).map(|q| (q, modifier))
            }
        }
        Item::Quoted { text, modifier } => {
            leaf(field, analyzed(&text), false).map(|q| (q, modifier))
        }
        Item::Regexp { text, modifier } => {
            TermMatcher::regexp(&text)?;
            Some((
                Query::Regexp {
                    field: field.to_string(),
                    pattern: text,
                },
                modifier,
            ))
        }
        Item::Range {
            text,
            include_lower,
            include_upper,
            modifier,
        } => {
            let parts: Vec<&str> = text.split_whitespace().collect();
            let [lower, "TO", upper] = parts.as_slice() else {
                return Err(ParseError::MalformedRange(text));
            };
            let range = TermRange::new(
                range_bound(lower),
                range_bound(upper),
                include_lower,
                include_upper,
            );
            Some((
                Query::Range {
                    field: field.to_string(),
                    range,
                },
                modifier,
            ))
        }
        Item::And | Item::Or | Item::Not => None,
    };
    Ok(parsed)
}

// ============================================================================
// PARSER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conj {
    None,
    And,
    Or,
}

/// Parse one field's text into a flat clause list.
///
/// Blank text parses to no clauses.
pub fn parse_field(field: &str, text: &str) -> Result<Vec<Clause>, ParseError> {
    let items = lex(text)?;
    let mut clauses: Vec<Clause> = Vec::new();
    let mut explicit: Vec<bool> = Vec::new();
    let mut conj = Conj::None;
    let mut negate = false;
    let mut seen_operand = false;

    for item in items {
        match item {
            Item::And | Item::Or => {
                if !seen_operand || conj != Conj::None || negate {
                    return Err(ParseError::DanglingOperator(op_name(&item).into()));
                }
                conj = if item == Item::And { Conj::And } else { Conj::Or };
            }
            Item::Not => {
                if negate {
                    return Err(ParseError::DanglingOperator("NOT".into()));
                }
                negate = true;
            }
            operand_item => {
                seen_operand = true;
                let Some((query, modifier)) = operand(field, operand_item)? else {
                    conj = Conj::None;
                    negate = false;
                    continue;
                };

                if let Some(last) = clauses.last_mut() {
                    let last_explicit = explicit.last().copied().unwrap_or(false);
                    match conj {
                        Conj::Or if !last_explicit && last.occur == Occur::Must => {
                            last.occur = Occur::Should;
                        }
                        Conj::And if last.occur == Occur::Should => last.occur = Occur::Must,
                        _ => {}
                    }
                }

                let occur = match modifier {
                    Modifier::Plus => Occur::Must,
                    Modifier::Minus => Occur::MustNot,
                    Modifier::None if negate => Occur::MustNot,
                    Modifier::None if conj == Conj::Or => Occur::Should,
                    Modifier::None => Occur::Must,
                };
                explicit.push(modifier != Modifier::None || negate);
                clauses.push(Clause::new(occur, query));
                conj = Conj::None;
                negate = false;
            }
        }
    }

    match (conj, negate) {
        (Conj::And, _) => Err(ParseError::DanglingOperator("AND".into())),
        (Conj::Or, _) => Err(ParseError::DanglingOperator("OR".into())),
        (_, true) => Err(ParseError::DanglingOperator("NOT".into())),
        _ => Ok(clauses),
    }
}

fn op_name(item: &Item) -> &'static str {
    match item {
        Item::And => "AND",
        Item::Or => "OR",
        _ => "NOT",
    }
}

/// Parse a multi-field query. Fields combine with MUST.
pub fn parse_query(fields: &BTreeMap<String, String>) -> Result<Query, ParseError> {
    let mut top = Vec::new();
    for (field, text) in fields {
        if let Some(q) = Query::from_clauses(parse_field(field, text)?) {
            top.push(Clause::must(q));
        }
    }
    Query::from_clauses(top).ok_or(ParseError::Empty)
}
