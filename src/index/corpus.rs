// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! JSON corpus directory as an index source.
//!
//! One file per project: `<dir>/<project>.json` holds an array of documents,
//! each an object mapping field name to text:
//!
//! ```json
//! [
//!   { "full": "fn parse_query(text: &str)", "path": "src/query.rs" },
//!   { "full": "struct Config", "path": "src/config.rs" }
//! ]
//! ```
//!
//! Files are parsed and tokenized in parallel. `reload` re-reads one project
//! and publishes it as a new version, which is how the CLI exercises the
//! rebuild path without a real indexer behind it.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info};

use super::source::{IndexSnapshot, IndexSource, IndexVersion, MemoryIndexSource, VersionListener};
use super::{Document, TermIndex};
use crate::error::SourceError;

/// Index source reading `<project>.json` files from a directory.
pub struct JsonCorpusSource {
    dir: PathBuf,
    inner: MemoryIndexSource,
}

fn read_documents(path: &Path) -> Result<Vec<Document>, SourceError> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| SourceError::Corpus {
        path: path.to_path_buf(),
        source,
    })
}

impl JsonCorpusSource {
    /// Load every `*.json` file in `dir`.
    pub fn load(dir: impl Into<PathBuf>) -> Result<Self, SourceError> {
        let dir = dir.into();
        let mut files: Vec<(String, PathBuf)> = fs::read_dir(&dir)?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|p| {
                let stem = p.file_stem()?.to_str()?.to_string();
                Some((stem, p))
            })
            .collect();
        files.sort();

        let built = files
            .par_iter()
            .map(|(project, path)| -> Result<(String, TermIndex), SourceError> {
                let docs = read_documents(path)?;
                debug!(project = %project, docs = docs.len(), "parsed corpus file");
                Ok((project.clone(), TermIndex::from_documents(&docs)))
            })
            .collect::<Result<Vec<_>, SourceError>>()?;

        let inner = MemoryIndexSource::new();
        for (project, index) in built {
            inner.publish(&project, index);
        }
        info!(dir = %dir.display(), projects = files.len(), "loaded corpus");

        Ok(Self { dir, inner })
    }

    /// Re-read one project's file and publish it as a new version.
    pub fn reload(&self, project: &str) -> Result<IndexVersion, SourceError> {
        let path = self.dir.join(format!("{project}.json"));
        if !path.exists() {
            return Err(SourceError::UnknownProject(project.to_string()));
        }
        let docs = read_documents(&path)?;
        Ok(self.inner.publish(project, TermIndex::from_documents(&docs)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl IndexSource for JsonCorpusSource {
    fn projects(&self) -> Vec<String> {
        self.inner.projects()
    }

    fn current_version(&self, project: &str) -> Result<IndexVersion, SourceError> {
        self.inner.current_version(project)
    }

    fn open_reader(&self, project: &str) -> Result<IndexSnapshot, SourceError> {
        self.inner.open_reader(project)
    }

    fn subscribe(&self, listener: Arc<dyn VersionListener>) {
        self.inner.subscribe(listener);
    }
}
