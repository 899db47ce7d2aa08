// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy.
//!
//! Each layer has its own enum so callers can match on what they can handle:
//! a [`ParseError`] means "no suggestion possible for this text", a
//! [`StoreError`] is popularity bookkeeping, a [`SourceError`] comes from the
//! indexing side. [`SuggestError`] is what the service surface returns.
//!
//! None of these are ever raised from inside a per-project suggestion task;
//! those faults become exclusions on the response instead.

use std::io;
use std::path::PathBuf;

/// The in-flight query text can't be turned into a suggestion request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unbalanced quote starting at byte {0}")]
    UnbalancedQuote(usize),

    #[error("unterminated regexp starting at byte {0}")]
    UnterminatedRegexp(usize),

    #[error("unterminated range starting at byte {0}")]
    UnterminatedRange(usize),

    #[error("range `{0}` is not of the form `lower TO upper`")]
    MalformedRange(String),

    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("operator `{0}` has no operand")]
    DanglingOperator(String),

    #[error("query text is empty")]
    Empty,

    #[error("caret {caret} is not a character boundary of a {len}-byte text")]
    InvalidCaret { caret: usize, len: usize },

    #[error("field `{0}` is not part of the query")]
    UnknownField(String),

    #[error("caret does not fall on a completable term")]
    NoCompletionPoint,
}

/// Popularity store persistence and bookkeeping.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("corrupt popularity file: {0}")]
    Corrupt(String),

    #[error("cannot resize to {requested}: store holds {entries} entries")]
    CapacityTooSmall { requested: usize, entries: usize },

    #[error("store is closed")]
    Closed,
}

/// Index source failures.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("unknown project `{0}`")]
    UnknownProject(String),

    #[error("index for `{project}` unavailable: {reason}")]
    Unavailable { project: String, reason: String },

    #[error("malformed corpus file {}: {source}", path.display())]
    Corpus {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Invalid configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Service-level failures.
#[derive(Debug, thiserror::Error)]
pub enum SuggestError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{requested} projects requested, at most {max} allowed")]
    TooManyProjects { requested: usize, max: usize },

    #[error("no projects requested")]
    NoProjects,

    #[error("suggestions are not allowed for field `{0}`")]
    FieldNotAllowed(String),

    #[error("unknown project `{0}`")]
    UnknownProject(String),

    #[error("cannot start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("suggester is disabled")]
    Disabled,
}

pub type Result<T, E = SuggestError> = std::result::Result<T, E>;
