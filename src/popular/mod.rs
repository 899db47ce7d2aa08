// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Popularity store: how often each term was actually searched.
//!
//! One store per (project, field), one file per store. The table lives in
//! memory behind a `parking_lot::RwLock`; lookups during enumeration take the
//! read side, increments take the write side, and that write lock is the only
//! lock anything on the suggestion path ever contends for.
//!
//! # Wait policy
//!
//! `increment(.., wait_for_lock = false)` uses `try_write`: if anyone holds
//! the lock it returns `false` immediately. `wait_for_lock = true` waits at
//! most [`StoreOptions::wait_timeout`] and then gives up the same way. Nothing
//! ever blocks on this store without a bound.
//!
//! # Persistence
//!
//! Writes go to `<file>.tmp` and are renamed over the real file, so the file
//! on disk is always either the old table or the new one. A file that fails
//! validation on open is moved to `<file>.corrupt` and the store starts empty.

pub mod format;

pub use format::{decode_store, encode_store, DecodedStore, StoreHeader};

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::StoreError;

/// Floor for a freshly created store's capacity.
pub const MIN_CAPACITY: usize = 1024;

/// A term and its search count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopularityEntry {
    pub term: String,
    pub count: u64,
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Bound on `increment(.., wait_for_lock = true)`.
    pub wait_timeout: Duration,
    /// Increments between automatic flushes. Zero disables them.
    pub flush_interval: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_millis(250),
            flush_interval: 64,
        }
    }
}

#[derive(Debug, Default)]
struct Table {
    capacity: usize,
    counts: HashMap<String, u64>,
    mutations: u64,
    flushed: u64,
}

impl Table {
    fn empty(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    fn sorted(&self) -> Vec<(&str, u64)> {
        let mut entries: Vec<(&str, u64)> =
            self.counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }

    fn encode(&self) -> Vec<u8> {
        encode_store(self.capacity.min(u32::MAX as usize) as u32, &self.sorted())
    }
}

/// Page `page` of `entries` ordered by count descending, then term.
pub fn top_page<'a, I>(entries: I, page: usize, page_size: usize) -> Vec<PopularityEntry>
where
    I: IntoIterator<Item = (&'a str, u64)>,
{
    let mut entries: Vec<(&str, u64)> = entries.into_iter().collect();
    entries.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    entries
        .into_iter()
        .skip(page.saturating_mul(page_size))
        .take(page_size)
        .map(|(term, count)| PopularityEntry {
            term: term.to_string(),
            count,
        })
        .collect()
}

/// Persistent term → count map with bounded-wait increments.
#[derive(Debug)]
pub struct PopularityStore {
    path: PathBuf,
    table: RwLock<Table>,
    // Serializes file writes so two flushes never share the temp file.
    io: Mutex<()>,
    options: StoreOptions,
    pending: AtomicU32,
    closed: AtomicBool,
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Replace `path` with `bytes` via temp file and rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = sibling(path, ".tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}

impl PopularityStore {
    /// Open the store at `path`, creating it if missing.
    ///
    /// `capacity` applies to new stores; an existing file keeps the larger
    /// of its own capacity and `capacity`.
    pub fn open(
        path: impl Into<PathBuf>,
        capacity: usize,
        options: StoreOptions,
    ) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let table = match fs::read(&path) {
            Ok(bytes) => match decode_store(&bytes) {
                Ok(decoded) => {
                    let capacity = (decoded.header.capacity as usize).max(capacity);
                    let counts = decoded.entries.into_iter().collect();
                    Table {
                        capacity,
                        counts,
                        ..Table::default()
                    }
                }
                Err(e) => {
                    let aside = sibling(&path, ".corrupt");
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "popularity file is corrupt, starting empty"
                    );
                    if let Err(e) = fs::rename(&path, &aside) {
                        warn!(path = %path.display(), error = %e, "could not move corrupt file aside");
                    }
                    Table::empty(capacity)
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Table::empty(capacity),
            Err(e) => return Err(e.into()),
        };

        let store = Self {
            path,
            table: RwLock::new(table),
            io: Mutex::new(()),
            options,
            pending: AtomicU32::new(0),
            closed: AtomicBool::new(false),
        };
        // Make sure a valid file exists from the start.
        store.persist()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, term: &str) -> u64 {
        self.table.read().counts.get(term).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.table.read().counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.table.read().capacity
    }

    /// Add `delta` to `term`'s count.
    ///
    /// Returns `false` without changing anything when the lock can't be had
    /// under the wait policy, when `term` would be a new key in a full store,
    /// or when the store is closed.
    pub fn increment(&self, term: &str, delta: u64, wait_for_lock: bool) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }

        let guard = if wait_for_lock {
            self.table.try_write_for(self.options.wait_timeout)
        } else {
            self.table.try_write()
        };
        let Some(mut table) = guard else {
            debug!(path = %self.path.display(), term, "popularity store contended, increment dropped");
            return false;
        };
        // Closed while we waited: the successor already copied the table.
        if self.closed.load(Ordering::Acquire) {
            return false;
        }

        if !table.counts.contains_key(term) && table.counts.len() >= table.capacity {
            warn!(
                path = %self.path.display(),
                capacity = table.capacity,
                "popularity store full, rejecting new term"
            );
            return false;
        }

        let count = table.counts.entry(term.to_string()).or_insert(0);
        *count = count.saturating_add(delta);
        table.mutations += 1;
        drop(table);

        let interval = self.options.flush_interval;
        if interval > 0 && self.pending.fetch_add(1, Ordering::AcqRel) + 1 >= interval {
            self.pending.store(0, Ordering::Release);
            if let Err(e) = self.flush() {
                warn!(path = %self.path.display(), error = %e, "popularity flush failed");
            }
        }
        true
    }

    /// One page of entries, most searched first; ties by term.
    pub fn get_top(&self, page: usize, page_size: usize) -> Vec<PopularityEntry> {
        let table = self.table.read();
        top_page(
            table.counts.iter().map(|(k, v)| (k.as_str(), *v)),
            page,
            page_size,
        )
    }

    /// Change the table's capacity to `new_capacity` keys.
    ///
    /// The resized table is written to disk before it replaces the old one;
    /// if that fails, the store (in memory and on disk) is untouched. The
    /// table lock is only held to copy and to swap, never across the write.
    pub fn resize(&self, new_capacity: usize) -> Result<(), StoreError> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        // Same lock order as flush: file first, then table.
        let _io = self.io.lock();
        let (bytes, mark) = {
            let table = self.table.read();
            if new_capacity < table.counts.len() {
                return Err(StoreError::CapacityTooSmall {
                    requested: new_capacity,
                    entries: table.counts.len(),
                });
            }
            let resized = Table {
                capacity: new_capacity,
                counts: table.counts.clone(),
                ..Table::default()
            };
            (resized.encode(), table.mutations)
        };

        write_atomic(&self.path, &bytes)?;

        let mut table = self.table.write();
        // Increments that landed during the write stay; only new keys can
        // have been added, so recheck the bound.
        if new_capacity < table.counts.len() {
            return Err(StoreError::CapacityTooSmall {
                requested: new_capacity,
                entries: table.counts.len(),
            });
        }
        debug!(
            path = %self.path.display(),
            from = table.capacity,
            to = new_capacity,
            "popularity store resized"
        );
        table.capacity = new_capacity;
        let len = table.counts.len();
        table.counts.reserve(new_capacity.saturating_sub(len));
        table.flushed = table.flushed.max(mark);
        Ok(())
    }

    /// An unpersisted copy of this store, writing to the same file.
    ///
    /// The copy starts dirty, so its first flush claims the file. Close this
    /// store before forking so no increment lands after the copy is taken.
    pub fn fork(&self) -> Self {
        let table = self.table.read();
        let copy = Table {
            capacity: table.capacity,
            counts: table.counts.clone(),
            mutations: 1,
            flushed: 0,
        };
        Self {
            path: self.path.clone(),
            table: RwLock::new(copy),
            io: Mutex::new(()),
            options: self.options.clone(),
            pending: AtomicU32::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Drop every term for which `keep` is false. Returns how many went.
    pub fn retain<F: FnMut(&str) -> bool>(&self, mut keep: F) -> Result<usize, StoreError> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        let removed = {
            let mut table = self.table.write();
            let before = table.counts.len();
            table.counts.retain(|k, _| keep(k));
            let removed = before - table.counts.len();
            if removed > 0 {
                table.mutations += 1;
            }
            removed
        };
        if removed > 0 {
            self.flush()?;
        }
        Ok(removed)
    }

    /// Write pending changes to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        let _io = self.io.lock();
        let (bytes, mark) = {
            let table = self.table.read();
            if table.mutations == table.flushed {
                return Ok(());
            }
            (table.encode(), table.mutations)
        };
        write_atomic(&self.path, &bytes)?;
        let mut table = self.table.write();
        table.flushed = table.flushed.max(mark);
        Ok(())
    }

    /// Unconditional write, used on open.
    fn persist(&self) -> Result<(), StoreError> {
        let _io = self.io.lock();
        let bytes = self.table.read().encode();
        write_atomic(&self.path, &bytes)?;
        Ok(())
    }

    /// Flush and refuse further increments.
    pub fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.flush()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for PopularityStore {
    fn drop(&mut self) {
        if !self.is_closed() {
            if let Err(e) = self.flush() {
                warn!(path = %self.path.display(), error = %e, "popularity flush on drop failed");
            }
        }
    }
}
