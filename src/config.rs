// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Suggester configuration.
//!
//! Every key has a default, so `{}` is a valid config file. Load with
//! [`SuggesterConfig::load`], which also validates.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use croner::Cron;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::popular::StoreOptions;
use crate::search::EnumerateOptions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SuggesterConfig {
    /// A disabled suggester answers every request with nothing.
    pub enabled: bool,
    /// Root directory for popularity files.
    pub data_dir: PathBuf,
    /// Page size of the merged result list.
    pub max_results: usize,
    /// Minimum length of the completed token.
    pub min_chars: usize,
    pub max_projects: usize,
    pub allowed_projects: Option<BTreeSet<String>>,
    pub allowed_fields: Option<BTreeSet<String>>,
    /// Anything beyond plain prefix completion: phrases, wildcards, regexps,
    /// ranges and residual filters.
    pub allow_complex_queries: bool,
    /// Track and rank by popularity.
    pub allow_most_popular: bool,
    /// Deadline for the per-project tasks of one request.
    pub time_threshold_ms: u64,
    /// How long tooling waits for initial builds and rebuilds.
    pub build_termination_secs: u64,
    /// Rebuild pool size as a percentage of available CPUs.
    pub rebuild_threads_percent: u8,
    /// Query pool size; 0 means one per CPU.
    pub query_threads: usize,
    pub enumeration_cap: usize,
    /// Ignore `enumeration_cap` and walk the whole prefix run.
    pub allow_full_scan: bool,
    pub dense_threshold: usize,
    /// Bounded wait for increments that ask to wait.
    pub increment_wait_ms: u64,
    /// Increments between popularity flushes.
    pub flush_interval: u32,
    /// Search-event queue depth.
    pub recorder_queue: usize,
    /// UNIX cron (5 fields, local time) for rebuilding every project.
    pub rebuild_cron: Option<String>,
}

impl Default for SuggesterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            data_dir: PathBuf::from("suggester-data"),
            max_results: 10,
            min_chars: 0,
            max_projects: i16::MAX as usize,
            allowed_projects: None,
            allowed_fields: None,
            allow_complex_queries: true,
            allow_most_popular: true,
            time_threshold_ms: 2_000,
            build_termination_secs: 1_800,
            rebuild_threads_percent: 80,
            query_threads: 0,
            enumeration_cap: 10_000,
            allow_full_scan: false,
            dense_threshold: crate::util::DEFAULT_DENSE_THRESHOLD,
            increment_wait_ms: 250,
            flush_interval: 64,
            recorder_queue: 1_024,
            rebuild_cron: Some("0 0 * * *".to_string()),
        }
    }
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.into(),
    }
}

fn cpus() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

impl SuggesterConfig {
    /// Read a JSON config file and validate it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_results == 0 {
            return Err(invalid("max_results", "must be at least 1"));
        }
        if self.max_projects == 0 {
            return Err(invalid("max_projects", "must be at least 1"));
        }
        if !(1..=100).contains(&self.rebuild_threads_percent) {
            return Err(invalid("rebuild_threads_percent", "must be within 1..=100"));
        }
        if self.enumeration_cap == 0 {
            return Err(invalid("enumeration_cap", "must be at least 1"));
        }
        if self.recorder_queue == 0 {
            return Err(invalid("recorder_queue", "must be at least 1"));
        }
        if self.time_threshold_ms == 0 {
            return Err(invalid("time_threshold_ms", "must be at least 1"));
        }
        self.rebuild_schedule()?;
        Ok(())
    }

    /// The parsed `rebuild_cron`, if periodic rebuilds are configured.
    pub fn rebuild_schedule(&self) -> Result<Option<Cron>, ConfigError> {
        self.rebuild_cron
            .as_deref()
            .map(|expr| {
                Cron::new(expr)
                    .parse()
                    .map_err(|e| invalid("rebuild_cron", e.to_string()))
            })
            .transpose()
    }

    pub fn time_threshold(&self) -> Duration {
        Duration::from_millis(self.time_threshold_ms)
    }

    pub fn build_termination(&self) -> Duration {
        Duration::from_secs(self.build_termination_secs)
    }

    pub fn query_pool_size(&self) -> usize {
        if self.query_threads == 0 {
            cpus()
        } else {
            self.query_threads
        }
    }

    pub fn rebuild_pool_size(&self) -> usize {
        (cpus() * usize::from(self.rebuild_threads_percent) / 100).max(1)
    }

    pub fn is_field_allowed(&self, field: &str) -> bool {
        self.allowed_fields
            .as_ref()
            .is_none_or(|allowed| allowed.contains(field))
    }

    pub fn is_project_allowed(&self, project: &str) -> bool {
        self.allowed_projects
            .as_ref()
            .is_none_or(|allowed| allowed.contains(project))
    }

    pub fn enumerate_options(&self) -> EnumerateOptions {
        EnumerateOptions {
            cap: (!self.allow_full_scan).then_some(self.enumeration_cap),
            dense_threshold: self.dense_threshold,
            max_results: self.max_results,
        }
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            wait_timeout: Duration::from_millis(self.increment_wait_ms),
            flush_interval: self.flush_interval,
        }
    }
}
