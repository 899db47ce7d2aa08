// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Per-project suggester data and its rebuild state machine.
//!
//! ```text
//!   Uninitialized ──build──▶ Building(n) ──ok──▶ Ready(n)
//!                               ▲   │                │
//!                               │   └──fail──▶ Error │
//!                               └────────rebuild─────┘
//! ```
//!
//! A [`Generation`] is everything a query needs: the index snapshot and the
//! per-field popularity stores. Queries clone the `Arc` out of `current` and
//! work on that; a rebuild builds the next generation off to the side and
//! swaps the pointer. A failed rebuild leaves the previous generation in place.
//!
//! Each generation owns its stores. On commit the previous generation's
//! stores are closed and forked, and only the forks are pruned to the new
//! dictionary, so a published generation never changes under a reader.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SuggesterConfig;
use crate::error::{StoreError, SuggestError};
use crate::index::{IndexSnapshot, IndexSource, IndexVersion, TermIndex};
use crate::popular::{PopularityEntry, PopularityStore, MIN_CAPACITY};

/// Lifecycle of one project's suggester data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum RebuildState {
    Uninitialized,
    Building(u64),
    Ready(u64),
    Error(String),
}

impl fmt::Display for RebuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebuildState::Uninitialized => write!(f, "uninitialized"),
            RebuildState::Building(n) => write!(f, "building generation {n}"),
            RebuildState::Ready(n) => write!(f, "ready (generation {n})"),
            RebuildState::Error(reason) => write!(f, "error: {reason}"),
        }
    }
}

/// What a rebuild request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    Built { generation: u64, version: IndexVersion },
    UpToDate,
}

/// One immutable snapshot of a project's suggester data.
#[derive(Debug)]
pub struct Generation {
    pub number: u64,
    pub version: IndexVersion,
    pub index: Arc<TermIndex>,
    stores: BTreeMap<String, Arc<PopularityStore>>,
}

impl Generation {
    pub fn store(&self, field: &str) -> Option<&PopularityStore> {
        self.stores.get(field).map(Arc::as_ref)
    }
}

/// Output of the fallible half of a rebuild.
struct Prepared {
    snapshot: IndexSnapshot,
    opened: BTreeMap<String, Arc<PopularityStore>>,
}

/// Percent-encode anything that isn't safe in a file name.
pub(crate) fn file_name_for(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for b in name.bytes() {
        if b.is_ascii_alphanumeric() || b == b'_' || b == b'-' {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    if out.is_empty() {
        out.push_str("%00");
    }
    out
}

/// Where the popularity file of `project`/`field` lives under `data_dir`.
pub fn popularity_path(data_dir: &Path, project: &str, field: &str) -> PathBuf {
    data_dir
        .join(file_name_for(project))
        .join(format!("{}.pop", file_name_for(field)))
}

/// Suggester state for one project.
pub struct ProjectSuggester {
    name: String,
    dir: PathBuf,
    current: RwLock<Option<Arc<Generation>>>,
    state: RwLock<RebuildState>,
    build_lock: Mutex<()>,
    generations: AtomicU64,
    removed: AtomicBool,
}

impl fmt::Debug for ProjectSuggester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectSuggester")
            .field("name", &self.name)
            .field("state", &*self.state.read())
            .finish_non_exhaustive()
    }
}

impl ProjectSuggester {
    pub fn new(name: &str, data_dir: &Path) -> Self {
        Self {
            name: name.to_string(),
            dir: data_dir.join(file_name_for(name)),
            current: RwLock::new(None),
            state: RwLock::new(RebuildState::Uninitialized),
            build_lock: Mutex::new(()),
            generations: AtomicU64::new(0),
            removed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn state(&self) -> RebuildState {
        self.state.read().clone()
    }

    /// The current generation, if one was ever built.
    pub fn snapshot(&self) -> Option<Arc<Generation>> {
        self.current.read().clone()
    }

    pub fn current_version(&self) -> Option<IndexVersion> {
        self.current.read().as_ref().map(|g| g.version)
    }

    fn store_path(&self, field: &str) -> PathBuf {
        self.dir.join(format!("{}.pop", file_name_for(field)))
    }

    /// Build a new generation from `source` and swap it in.
    ///
    /// Rebuilds of one project are serialized. Unless `force` is set, a
    /// rebuild whose source version is not newer than the current
    /// generation's is skipped.
    pub fn rebuild(
        &self,
        source: &dyn IndexSource,
        config: &SuggesterConfig,
        force: bool,
    ) -> Result<RebuildOutcome, SuggestError> {
        let _build = self.build_lock.lock();
        if self.removed.load(Ordering::Acquire) {
            return Err(SuggestError::UnknownProject(self.name.clone()));
        }

        if !force {
            if let (Some(held), Ok(latest)) =
                (self.current_version(), source.current_version(&self.name))
            {
                if held >= latest {
                    debug!(project = %self.name, version = %held, "suggester data already current");
                    return Ok(RebuildOutcome::UpToDate);
                }
            }
        }

        let number = self.generations.fetch_add(1, Ordering::AcqRel) + 1;
        *self.state.write() = RebuildState::Building(number);
        debug!(project = %self.name, generation = number, "building suggester data");

        match self.prepare(source, config) {
            Ok(prepared) => {
                if self.removed.load(Ordering::Acquire) {
                    return Err(SuggestError::UnknownProject(self.name.clone()));
                }
                let generation = self.commit(number, prepared);
                let version = generation.version;
                *self.current.write() = Some(Arc::new(generation));
                *self.state.write() = RebuildState::Ready(number);
                info!(project = %self.name, generation = number, version = %version, "suggester data ready");
                Ok(RebuildOutcome::Built {
                    generation: number,
                    version,
                })
            }
            Err(e) => {
                warn!(project = %self.name, generation = number, error = %e, "suggester rebuild failed");
                *self.state.write() = RebuildState::Error(e.to_string());
                Err(e)
            }
        }
    }

    /// Record a rebuild that died without reporting back.
    pub(crate) fn mark_failed(&self, reason: String) {
        *self.state.write() = RebuildState::Error(reason);
    }

    /// Everything that can fail: the reader and stores for fields the
    /// current generation doesn't track yet. Nothing held by the current
    /// generation is touched.
    fn prepare(
        &self,
        source: &dyn IndexSource,
        config: &SuggesterConfig,
    ) -> Result<Prepared, SuggestError> {
        let snapshot = source.open_reader(&self.name)?;
        let previous = self.snapshot();
        let mut opened = BTreeMap::new();

        if config.allow_most_popular {
            for field in snapshot.index.field_names() {
                if !config.is_field_allowed(field) {
                    continue;
                }
                let Some(dict) = snapshot.index.field(field) else {
                    continue;
                };
                if dict.is_empty() || previous.as_ref().is_some_and(|g| g.stores.contains_key(field)) {
                    continue;
                }
                let store = PopularityStore::open(
                    self.store_path(field),
                    dict.len().max(MIN_CAPACITY),
                    config.store_options(),
                )?;
                opened.insert(field.to_string(), Arc::new(store));
            }
        }

        Ok(Prepared { snapshot, opened })
    }

    /// Retire the current generation's stores and assemble the next
    /// generation. Infallible: store maintenance failures only warn.
    fn commit(&self, number: u64, prepared: Prepared) -> Generation {
        let Prepared { snapshot, opened } = prepared;
        let mut stores = opened;

        if let Some(previous) = self.snapshot() {
            for (field, old) in &previous.stores {
                if let Err(e) = old.close() {
                    warn!(project = %self.name, field = %field, error = %e, "could not flush retired popularity store");
                }
                let Some(dict) = snapshot.index.field(field).filter(|d| !d.is_empty()) else {
                    continue;
                };
                if stores.contains_key(field) {
                    continue;
                }

                let next = old.fork();
                match next.retain(|term| dict.contains(term)) {
                    Ok(0) => {}
                    Ok(n) => debug!(project = %self.name, field = %field, removed = n, "pruned stale popularity terms"),
                    Err(e) => warn!(project = %self.name, field = %field, error = %e, "could not prune popularity terms"),
                }
                if next.capacity() < dict.len() {
                    if let Err(e) = next.resize(dict.len()) {
                        warn!(project = %self.name, field = %field, error = %e, "popularity resize failed");
                    }
                }
                if let Err(e) = next.flush() {
                    warn!(project = %self.name, field = %field, error = %e, "popularity flush failed");
                }
                stores.insert(field.clone(), Arc::new(next));
            }
        }

        Generation {
            number,
            version: snapshot.version,
            index: snapshot.index,
            stores,
        }
    }

    /// Count a search for `term`. Terms the current dictionary doesn't know
    /// are rejected.
    pub fn increment(&self, field: &str, term: &str, delta: u64, wait_for_lock: bool) -> bool {
        let Some(generation) = self.snapshot() else {
            return false;
        };
        let Some(store) = generation.store(field) else {
            return false;
        };
        if !generation.index.field(field).is_some_and(|d| d.contains(term)) {
            debug!(project = %self.name, field, term, "ignoring search count for unknown term");
            return false;
        }
        store.increment(term, delta, wait_for_lock)
    }

    pub fn popularity(&self, field: &str, page: usize, page_size: usize) -> Vec<PopularityEntry> {
        self.snapshot()
            .and_then(|g| g.store(field).map(|s| s.get_top(page, page_size)))
            .unwrap_or_default()
    }

    /// Close stores without deleting anything.
    pub fn close(&self) {
        let Some(generation) = self.snapshot() else {
            return;
        };
        for (field, store) in &generation.stores {
            if let Err(e) = store.close() {
                warn!(project = %self.name, field = %field, error = %e, "popularity close failed");
            }
        }
    }

    /// Drop all state and delete the project's data directory.
    ///
    /// Waits for an in-flight rebuild to finish; that rebuild won't publish.
    pub fn remove(&self) -> Result<(), StoreError> {
        self.removed.store(true, Ordering::Release);
        let _build = self.build_lock.lock();

        self.close();
        *self.current.write() = None;
        *self.state.write() = RebuildState::Uninitialized;

        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        info!(project = %self.name, "suggester data removed");
        Ok(())
    }
}
