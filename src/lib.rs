// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Real-time query completion over indexed projects.
//!
//! Given the text of a search box and the caret position, the suggester
//! proposes completions for the token under the caret, drawn from the terms
//! actually present in each project's index and ranked by how often users
//! searched for them.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────────────┐
//! │  query::     │──▶│  search::    │──▶│  suggester::         │
//! │  intent      │   │  Enumerator  │   │  Suggester (fan-out, │
//! │ (caret →     │   │ (prefix,     │   │  timeouts, merge)    │
//! │  query+filter│   │  phrase,     │   │                      │
//! │              │   │  patterns)   │   │                      │
//! └──────────────┘   └──────────────┘   └──────────────────────┘
//!                          │    ▲                 │
//!                          ▼    │                 ▼
//!                    ┌──────────┴───┐   ┌──────────────────────┐
//!                    │  index::     │   │  suggester::project  │
//!                    │  TermIndex,  │◀──│  generations, rebuild│
//!                    │  IndexSource │   │  popular::Store      │
//!                    └──────────────┘   └──────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use typeahead::{
//!     JsonCorpusSource, SuggestRequest, Suggester, SuggesterConfig,
//! };
//!
//! let source = Arc::new(JsonCorpusSource::load("corpus")?);
//! let suggester = Suggester::new(SuggesterConfig::default(), source)?;
//! suggester.init();
//! suggester.wait_for_init(Duration::from_secs(60));
//!
//! let text = "quick bro";
//! let out = suggester.suggest(&SuggestRequest {
//!     projects: vec!["docs".into()],
//!     fields: BTreeMap::from([("full".to_string(), text.to_string())]),
//!     field: "full".into(),
//!     caret: text.len(),
//! })?;
//! for candidate in &out.candidates {
//!     println!("{} ({})", candidate.term, candidate.popularity);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod index;
pub mod observability;
pub mod popular;
pub mod query;
pub mod search;
pub mod suggester;
pub mod testing;
pub mod util;

pub use config::SuggesterConfig;
pub use error::{ConfigError, ParseError, Result, SourceError, StoreError, SuggestError};
pub use index::{
    Document, IndexSnapshot, IndexSource, IndexVersion, JsonCorpusSource, MemoryIndexSource,
    TermIndex, VersionListener,
};
pub use popular::{PopularityEntry, PopularityStore, StoreOptions};
pub use query::{parse_intent, parse_query, Clause, Occur, Query, SuggesterQuery, SuggestionIntent};
pub use search::{Candidate, EnumerateOptions, Enumerator};
pub use suggester::{
    ExcludedProject, Exclusion, RebuildState, SuggestRequest, Suggester, Suggestions,
};
