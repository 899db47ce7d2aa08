// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Where term indexes come from.
//!
//! The suggester never builds or updates indexes itself. It asks an
//! [`IndexSource`] for a read-only snapshot of a project, and the source tells
//! it (through a [`VersionListener`]) when a project's index has moved on.
//! Versions are monotonically increasing per project; the suggester compares
//! them to decide whether its current generation is stale.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::TermIndex;
use crate::error::SourceError;

/// Monotonic per-project index version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct IndexVersion(pub u64);

impl fmt::Display for IndexVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A reader handle: one project's index at one version.
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    pub version: IndexVersion,
    pub index: Arc<TermIndex>,
}

/// Callback for index changes.
pub trait VersionListener: Send + Sync {
    fn on_version_changed(&self, project: &str, version: IndexVersion);
}

/// The indexing subsystem, as seen from the suggester.
pub trait IndexSource: Send + Sync {
    /// Projects that currently have an index.
    fn projects(&self) -> Vec<String>;

    fn current_version(&self, project: &str) -> Result<IndexVersion, SourceError>;

    /// Open a read-only snapshot. The snapshot stays valid after the source
    /// moves to a newer version.
    fn open_reader(&self, project: &str) -> Result<IndexSnapshot, SourceError>;

    /// Register for change notifications. Listeners may be called from any
    /// thread and must not block.
    fn subscribe(&self, listener: Arc<dyn VersionListener>);
}

// ============================================================================
// IN-MEMORY SOURCE
// ============================================================================

/// Index source backed by in-memory snapshots.
///
/// `publish` replaces a project's index with a new version and notifies
/// subscribers after the write lock is released.
#[derive(Default)]
pub struct MemoryIndexSource {
    projects: RwLock<BTreeMap<String, IndexSnapshot>>,
    listeners: RwLock<Vec<Arc<dyn VersionListener>>>,
}

impl MemoryIndexSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `index` as the newest version of `project`.
    pub fn publish(&self, project: &str, index: TermIndex) -> IndexVersion {
        let version = {
            let mut projects = self.projects.write();
            let next = projects
                .get(project)
                .map_or(IndexVersion(1), |s| IndexVersion(s.version.0 + 1));
            projects.insert(
                project.to_string(),
                IndexSnapshot {
                    version: next,
                    index: Arc::new(index),
                },
            );
            next
        };

        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener.on_version_changed(project, version);
        }
        version
    }

    /// Drop a project. Returns whether it existed.
    pub fn remove(&self, project: &str) -> bool {
        self.projects.write().remove(project).is_some()
    }
}

impl IndexSource for MemoryIndexSource {
    fn projects(&self) -> Vec<String> {
        self.projects.read().keys().cloned().collect()
    }

    fn current_version(&self, project: &str) -> Result<IndexVersion, SourceError> {
        self.projects
            .read()
            .get(project)
            .map(|s| s.version)
            .ok_or_else(|| SourceError::UnknownProject(project.to_string()))
    }

    fn open_reader(&self, project: &str) -> Result<IndexSnapshot, SourceError> {
        self.projects
            .read()
            .get(project)
            .cloned()
            .ok_or_else(|| SourceError::UnknownProject(project.to_string()))
    }

    fn subscribe(&self, listener: Arc<dyn VersionListener>) {
        self.listeners.write().push(listener);
    }
}
