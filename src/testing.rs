// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Test utilities shared across unit and integration tests.
//!
//! This module is always compiled but hidden from documentation.

#![doc(hidden)]

use std::path::Path;
use std::sync::Arc;

use crate::config::SuggesterConfig;
use crate::index::{Document, MemoryIndexSource, TermIndex};

/// Index with one document per text, all in `field`.
pub fn single_field_index(field: &str, texts: &[&str]) -> TermIndex {
    let docs: Vec<Document> = texts
        .iter()
        .map(|text| Document::new([(field, *text)]))
        .collect();
    TermIndex::from_documents(&docs)
}

/// Index from documents given as `(field, text)` pairs.
pub fn index_from_docs(docs: &[&[(&str, &str)]]) -> TermIndex {
    let docs: Vec<Document> = docs
        .iter()
        .map(|fields| Document::new(fields.iter().copied()))
        .collect();
    TermIndex::from_documents(&docs)
}

/// A memory source with one published project per `(name, texts)` entry,
/// all indexed into `field`.
pub fn memory_source_with(field: &str, projects: &[(&str, &[&str])]) -> Arc<MemoryIndexSource> {
    let source = Arc::new(MemoryIndexSource::new());
    for (name, texts) in projects {
        source.publish(name, single_field_index(field, texts));
    }
    source
}

/// Defaults with small pools, a generous deadline, no periodic rebuild and
/// data under `data_dir`.
pub fn test_config(data_dir: &Path) -> SuggesterConfig {
    SuggesterConfig {
        data_dir: data_dir.to_path_buf(),
        query_threads: 2,
        rebuild_threads_percent: 100,
        time_threshold_ms: 10_000,
        build_termination_secs: 30,
        rebuild_cron: None,
        ..SuggesterConfig::default()
    }
}
