// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The suggestion service.
//!
//! [`Suggester`] owns one [`ProjectSuggester`] per project, two worker pools
//! and the search-event recorder:
//!
//! - the **query pool** runs one enumeration task per requested project. The
//!   request thread waits on the results up to `time_threshold`; whatever
//!   hasn't answered by then is cancelled and reported as timed out.
//! - the **rebuild pool** runs generation builds and project removals. Index
//!   change notifications land here, so the indexing side never waits on us.
//!
//! With `rebuild_cron` set, a [`RebuildSchedule`] thread also rebuilds every
//! project on that schedule.
//!
//! Per-project faults never fail a request. A project that is unknown, not
//! built yet, too slow or that panicked shows up in
//! [`Suggestions::excluded`] and the rest still answer.

pub mod project;
pub mod recorder;
pub mod schedule;

pub use project::{popularity_path, Generation, ProjectSuggester, RebuildOutcome, RebuildState};
pub use recorder::{SearchEvent, SearchRecorder};
pub use schedule::RebuildSchedule;

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::SuggesterConfig;
use crate::error::{Result, StoreError, SuggestError};
use crate::index::{IndexSource, IndexVersion, VersionListener};
use crate::popular::PopularityEntry;
use crate::query::{parse_intent, Query, SuggesterQuery};
use crate::search::{merge_ranked, Cancelled, Candidate, Enumerator};

// ============================================================================
// REQUEST / RESPONSE
// ============================================================================

/// A completion request as it arrives from a search box.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestRequest {
    pub projects: Vec<String>,
    /// Raw text of every query field.
    pub fields: BTreeMap<String, String>,
    /// The field holding the caret.
    pub field: String,
    /// Byte offset of the caret in `fields[field]`.
    pub caret: usize,
}

/// Why a project didn't contribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum Exclusion {
    Unknown,
    NotReady,
    TimedOut,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcludedProject {
    pub project: String,
    #[serde(flatten)]
    pub reason: Exclusion,
}

/// Merged completions plus what was left out.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Suggestions {
    pub candidates: Vec<Candidate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub excluded: Vec<ExcludedProject>,
    /// Some requested project didn't contribute.
    pub partial: bool,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl Suggestions {
    pub fn terms(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.term.as_str()).collect()
    }

    pub fn exclusion(&self, project: &str) -> Option<&Exclusion> {
        self.excluded
            .iter()
            .find(|e| e.project == project)
            .map(|e| &e.reason)
    }
}

// ============================================================================
// PROGRESS TRACKING
// ============================================================================

#[derive(Debug, Default)]
struct ProgressState {
    pending: usize,
    init_remaining: usize,
    initialized: bool,
}

/// Outstanding background work, for `wait_for_rebuild` / `wait_for_init`.
#[derive(Debug, Default)]
struct Progress {
    state: Mutex<ProgressState>,
    changed: Condvar,
}

impl Progress {
    fn begin(&self) {
        self.state.lock().pending += 1;
    }

    fn finish(&self, counts_for_init: bool) {
        let mut state = self.state.lock();
        state.pending = state.pending.saturating_sub(1);
        if counts_for_init {
            state.init_remaining = state.init_remaining.saturating_sub(1);
            if state.init_remaining == 0 {
                state.initialized = true;
            }
        }
        self.changed.notify_all();
    }

    fn start_init(&self, builds: usize) {
        let mut state = self.state.lock();
        state.init_remaining += builds;
        if state.init_remaining == 0 {
            state.initialized = true;
            self.changed.notify_all();
        }
    }

    fn wait_until(&self, timeout: Duration, done: impl Fn(&ProgressState) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !done(&state) {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                return done(&state);
            }
        }
        true
    }
}

// ============================================================================
// SHARED STATE
// ============================================================================

struct Shared {
    config: Arc<SuggesterConfig>,
    source: Arc<dyn IndexSource>,
    projects: RwLock<BTreeMap<String, Arc<ProjectSuggester>>>,
    // Names whose data is still being removed. The flag records that a build
    // was asked for meanwhile. Guarded together with `projects`: lock that first.
    removing: Mutex<BTreeMap<String, bool>>,
    query_pool: rayon::ThreadPool,
    rebuild_pool: rayon::ThreadPool,
    progress: Arc<Progress>,
    closed: AtomicBool,
}

impl Shared {
    fn project(&self, name: &str) -> Option<Arc<ProjectSuggester>> {
        self.projects.read().get(name).cloned()
    }

    /// The named project, created if needed. `None` while a deletion of the
    /// same name is still removing files; the request is replayed after.
    fn project_or_create(&self, name: &str) -> Option<Arc<ProjectSuggester>> {
        if let Some(project) = self.project(name) {
            return Some(project);
        }
        let mut projects = self.projects.write();
        if let Some(project) = projects.get(name) {
            return Some(Arc::clone(project));
        }
        if let Some(wanted) = self.removing.lock().get_mut(name) {
            debug!(project = name, "project data still being removed, deferring build");
            *wanted = true;
            return None;
        }
        let project = Arc::new(ProjectSuggester::new(name, &self.config.data_dir));
        projects.insert(name.to_string(), Arc::clone(&project));
        Some(project)
    }

    /// Forget `name` and reserve it until its files are gone.
    fn detach(&self, name: &str) -> Option<Arc<ProjectSuggester>> {
        let mut projects = self.projects.write();
        let project = projects.remove(name)?;
        self.removing.lock().insert(name.to_string(), false);
        Some(project)
    }

    /// Release a removed name, and build it again if anyone asked meanwhile.
    fn finish_removal(&self, name: &str) {
        let wanted = {
            let _projects = self.projects.write();
            self.removing.lock().remove(name).unwrap_or(false)
        };
        if !wanted || self.closed.load(Ordering::Acquire) {
            return;
        }
        if self.source.current_version(name).is_err() {
            return;
        }
        if let Some(project) = self.project_or_create(name) {
            debug!(project = name, "replaying deferred build");
            self.schedule_rebuild(project, true, false);
        }
    }

    fn schedule_rebuild(&self, project: Arc<ProjectSuggester>, force: bool, counts_for_init: bool) {
        let source = Arc::clone(&self.source);
        let config = Arc::clone(&self.config);
        let progress = Arc::clone(&self.progress);
        progress.begin();
        self.rebuild_pool.spawn(move || {
            let result = catch_unwind(AssertUnwindSafe(|| {
                project.rebuild(source.as_ref(), &config, force)
            }));
            match result {
                Ok(Ok(RebuildOutcome::Built { generation, .. })) => {
                    debug!(project = project.name(), generation, "rebuild finished");
                }
                Ok(Ok(RebuildOutcome::UpToDate)) => {}
                // Logged and recorded in the project state by the rebuild itself.
                Ok(Err(_)) => {}
                Err(payload) => {
                    let reason = panic_message(payload.as_ref());
                    error!(project = project.name(), reason = %reason, "rebuild panicked");
                    project.mark_failed(format!("rebuild panicked: {reason}"));
                }
            }
            progress.finish(counts_for_init);
        });
    }

    fn rebuild_all(&self) {
        if !self.config.enabled || self.closed.load(Ordering::Acquire) {
            return;
        }
        let mut names: BTreeSet<String> = self.source.projects().into_iter().collect();
        names.extend(self.projects.read().keys().cloned());
        for name in names {
            if !self.config.is_project_allowed(&name) {
                continue;
            }
            if let Some(project) = self.project_or_create(&name) {
                self.schedule_rebuild(project, true, false);
            }
        }
    }

    fn on_version_changed(&self, project: &str, version: IndexVersion) {
        if self.closed.load(Ordering::Acquire) || !self.config.enabled {
            return;
        }
        if !self.config.is_project_allowed(project) {
            return;
        }
        let Some(suggester) = self.project_or_create(project) else {
            return;
        };
        if suggester.current_version().is_some_and(|held| held >= version) {
            return;
        }
        debug!(project, version = %version, "index changed, scheduling rebuild");
        self.schedule_rebuild(suggester, false, false);
    }

    fn increase_search_count(
        &self,
        project: &str,
        field: &str,
        term: &str,
        value: u64,
        wait_for_lock: bool,
    ) -> bool {
        if !self.config.enabled || !self.config.allow_most_popular {
            return false;
        }
        self.project(project)
            .is_some_and(|p| p.increment(field, term, value, wait_for_lock))
    }
}

/// Forwards index notifications without keeping the service alive.
struct VersionHook(Weak<Shared>);

impl VersionListener for VersionHook {
    fn on_version_changed(&self, project: &str, version: IndexVersion) {
        if let Some(shared) = self.0.upgrade() {
            shared.on_version_changed(project, version);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

type TaskResult = std::thread::Result<std::result::Result<Vec<Candidate>, Cancelled>>;

// ============================================================================
// SUGGESTER
// ============================================================================

/// Multi-project suggestion service.
pub struct Suggester {
    shared: Arc<Shared>,
    recorder: Mutex<Option<SearchRecorder>>,
    schedule: Mutex<Option<RebuildSchedule>>,
}

impl Suggester {
    /// Validate `config`, start the pools, the recorder and the rebuild
    /// schedule, and subscribe to `source`. Nothing is built until
    /// [`init`](Self::init), a change notification or the schedule fires.
    pub fn new(config: SuggesterConfig, source: Arc<dyn IndexSource>) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir).map_err(StoreError::from)?;

        let query_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.query_pool_size())
            .thread_name(|i| format!("typeahead-query-{i}"))
            .build()?;
        let rebuild_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.rebuild_pool_size())
            .thread_name(|i| format!("typeahead-rebuild-{i}"))
            .build()?;

        let shared = Arc::new(Shared {
            config: Arc::new(config),
            source: Arc::clone(&source),
            projects: RwLock::new(BTreeMap::new()),
            removing: Mutex::new(BTreeMap::new()),
            query_pool,
            rebuild_pool,
            progress: Arc::new(Progress::default()),
            closed: AtomicBool::new(false),
        });

        source.subscribe(Arc::new(VersionHook(Arc::downgrade(&shared))));

        let weak = Arc::downgrade(&shared);
        let recorder = SearchRecorder::start(shared.config.recorder_queue, move |event| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            for project in &event.projects {
                for (field, term) in &event.terms {
                    shared.increase_search_count(project, field, term, 1, false);
                }
            }
        })
        .map_err(StoreError::from)?;

        // Periodic rebuilds exist to prune and resize popularity data.
        let schedule = match shared.config.rebuild_schedule()? {
            Some(cron) if shared.config.enabled && shared.config.allow_most_popular => {
                let weak = Arc::downgrade(&shared);
                let schedule = RebuildSchedule::start(cron, move || {
                    if let Some(shared) = weak.upgrade() {
                        shared.rebuild_all();
                    }
                })
                .map_err(StoreError::from)?;
                info!(cron = ?shared.config.rebuild_cron, "periodic rebuild scheduled");
                Some(schedule)
            }
            _ => None,
        };

        info!(
            data_dir = %shared.config.data_dir.display(),
            query_threads = shared.config.query_pool_size(),
            rebuild_threads = shared.config.rebuild_pool_size(),
            "suggester started"
        );
        Ok(Self {
            shared,
            recorder: Mutex::new(Some(recorder)),
            schedule: Mutex::new(schedule),
        })
    }

    pub fn config(&self) -> &SuggesterConfig {
        &self.shared.config
    }

    /// Schedule an initial build for every project the source knows.
    pub fn init(&self) {
        if !self.shared.config.enabled {
            self.shared.progress.start_init(0);
            return;
        }
        let projects: Vec<Arc<ProjectSuggester>> = self
            .shared
            .source
            .projects()
            .iter()
            .filter(|p| self.shared.config.is_project_allowed(p))
            .filter_map(|p| self.shared.project_or_create(p))
            .collect();

        info!(projects = projects.len(), "initializing suggester data");
        self.shared.progress.start_init(projects.len());
        for project in projects {
            self.shared.schedule_rebuild(project, false, true);
        }
    }

    /// Known project names.
    pub fn projects(&self) -> Vec<String> {
        self.shared.projects.read().keys().cloned().collect()
    }

    pub fn project_state(&self, project: &str) -> Option<RebuildState> {
        self.shared.project(project).map(|p| p.state())
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Parse an in-flight query and complete the token under the caret.
    pub fn suggest(&self, request: &SuggestRequest) -> Result<Suggestions> {
        let config = &self.shared.config;
        if !config.enabled {
            return Ok(Suggestions::default());
        }
        if request.projects.is_empty() {
            return Err(SuggestError::NoProjects);
        }
        if request.projects.len() > config.max_projects {
            return Err(SuggestError::TooManyProjects {
                requested: request.projects.len(),
                max: config.max_projects,
            });
        }
        if !config.is_field_allowed(&request.field) {
            return Err(SuggestError::FieldNotAllowed(request.field.clone()));
        }

        let intent = parse_intent(&request.fields, &request.field, request.caret)?;
        if intent.query.completed_prefix().chars().count() < config.min_chars {
            return Ok(Suggestions::default());
        }
        if !config.allow_complex_queries && (!intent.query.is_prefix() || intent.filter.is_some()) {
            debug!(field = %request.field, "complex suggestion query rejected");
            return Ok(Suggestions::default());
        }

        Ok(self.get_suggestions(&request.projects, &intent.query, intent.filter.as_ref()))
    }

    /// Fan out over `projects` and merge, within the configured time threshold.
    pub fn get_suggestions(
        &self,
        projects: &[String],
        query: &SuggesterQuery,
        filter: Option<&Query>,
    ) -> Suggestions {
        self.get_suggestions_within(projects, query, filter, self.shared.config.time_threshold())
    }

    /// [`get_suggestions`](Self::get_suggestions) with an explicit deadline.
    pub fn get_suggestions_within(
        &self,
        projects: &[String],
        query: &SuggesterQuery,
        filter: Option<&Query>,
        timeout: Duration,
    ) -> Suggestions {
        let start = Instant::now();
        let config = &self.shared.config;
        let mut out = Suggestions::default();
        if !config.enabled {
            return out;
        }

        let query = Arc::new(query.clone());
        let filter = filter.cloned().map(Arc::new);
        let options = Arc::new(config.enumerate_options());
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel::<(String, TaskResult)>();

        let mut requested = BTreeSet::new();
        let mut outstanding = BTreeSet::new();
        for name in projects {
            if !requested.insert(name.as_str()) {
                continue;
            }
            let project = self
                .shared
                .project(name)
                .filter(|_| config.is_project_allowed(name));
            let Some(project) = project else {
                out.excluded.push(excluded(name, Exclusion::Unknown));
                continue;
            };
            let Some(generation) = project.snapshot() else {
                out.excluded.push(excluded(name, Exclusion::NotReady));
                continue;
            };

            let name = name.clone();
            let tx = tx.clone();
            let query = Arc::clone(&query);
            let filter = filter.clone();
            let options = Arc::clone(&options);
            let cancel = Arc::clone(&cancel);
            outstanding.insert(name.clone());
            self.shared.query_pool.spawn(move || {
                let result = catch_unwind(AssertUnwindSafe(|| {
                    let store = generation.store(query.field());
                    Enumerator::new(&generation.index, store, &options, &cancel)
                        .run(&query, filter.as_deref())
                }));
                // The receiver is gone once the request gave up on us.
                let _ = tx.send((name, result));
            });
        }
        drop(tx);

        let deadline = start + timeout;
        let mut answered = Vec::with_capacity(outstanding.len());
        while !outstanding.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok((name, result)) => {
                    outstanding.remove(&name);
                    match result {
                        Ok(Ok(candidates)) => answered.push((name, candidates)),
                        Ok(Err(Cancelled)) => out.excluded.push(excluded(&name, Exclusion::TimedOut)),
                        Err(payload) => {
                            let reason = panic_message(payload.as_ref());
                            error!(project = %name, reason = %reason, "suggestion task panicked");
                            out.excluded.push(excluded(&name, Exclusion::Failed(reason)));
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    cancel.store(true, Ordering::Relaxed);
                    warn!(
                        projects = outstanding.len(),
                        timeout_ms = timeout.as_millis() as u64,
                        "suggestion tasks timed out"
                    );
                    for name in std::mem::take(&mut outstanding) {
                        out.excluded.push(excluded(&name, Exclusion::TimedOut));
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    for name in std::mem::take(&mut outstanding) {
                        out.excluded.push(excluded(
                            &name,
                            Exclusion::Failed("task dropped without answering".into()),
                        ));
                    }
                }
            }
        }

        out.candidates = merge_ranked(answered, config.max_results);
        out.excluded.sort_by(|a, b| a.project.cmp(&b.project));
        out.partial = !out.excluded.is_empty();
        out.elapsed = start.elapsed();
        debug!(
            candidates = out.candidates.len(),
            excluded = out.excluded.len(),
            elapsed_us = out.elapsed.as_micros() as u64,
            "suggestions served"
        );
        out
    }

    // ========================================================================
    // POPULARITY
    // ========================================================================

    /// Count the terms of an executed search. Never blocks.
    pub fn on_search(&self, projects: &[String], query: &Query) {
        let config = &self.shared.config;
        if !config.enabled || !config.allow_most_popular {
            return;
        }
        let terms = query.searched_terms();
        if terms.is_empty() || projects.is_empty() {
            return;
        }
        if let Some(recorder) = self.recorder.lock().as_ref() {
            recorder.record(SearchEvent {
                projects: projects.to_vec(),
                terms,
            });
        }
    }

    /// Add `value` to the search count of `term`.
    pub fn increase_search_count(
        &self,
        project: &str,
        field: &str,
        term: &str,
        value: u64,
        wait_for_lock: bool,
    ) -> bool {
        self.shared
            .increase_search_count(project, field, term, value, wait_for_lock)
    }

    /// One page of the most searched terms of `field`.
    pub fn popularity_data(
        &self,
        project: &str,
        field: &str,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<PopularityEntry>> {
        let suggester = self
            .shared
            .project(project)
            .ok_or_else(|| SuggestError::UnknownProject(project.to_string()))?;
        Ok(suggester.popularity(field, page, page_size))
    }

    /// Wait until search events queued so far have been applied.
    pub fn wait_for_events(&self, timeout: Duration) -> bool {
        self.recorder
            .lock()
            .as_ref()
            .is_none_or(|r| r.wait_idle(timeout))
    }

    /// Search events dropped because the recorder queue was full.
    pub fn dropped_events(&self) -> u64 {
        self.recorder.lock().as_ref().map_or(0, |r| r.dropped())
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Rebuild every known project. The rebuild schedule calls this too.
    pub fn rebuild_all(&self) {
        self.shared.rebuild_all();
    }

    /// Rebuild one project, even if its data looks current.
    ///
    /// A project whose deletion is still in progress is rebuilt once the
    /// removal finishes.
    pub fn rebuild(&self, project: &str) -> Result<()> {
        if !self.shared.config.enabled {
            return Err(SuggestError::Disabled);
        }
        if !self.shared.config.is_project_allowed(project) {
            return Err(SuggestError::UnknownProject(project.to_string()));
        }
        self.shared.source.current_version(project)?;
        if let Some(suggester) = self.shared.project_or_create(project) {
            self.shared.schedule_rebuild(suggester, true, false);
        }
        Ok(())
    }

    /// Forget a project and delete its data. Returns false if it was unknown.
    ///
    /// The project disappears from queries immediately; file removal runs in
    /// the background and counts as rebuild work. Until it finishes the name
    /// stays reserved, so a rebuild can't recreate files that are about to be
    /// deleted.
    pub fn delete(&self, project: &str) -> bool {
        let Some(suggester) = self.shared.detach(project) else {
            return false;
        };
        let shared = Arc::downgrade(&self.shared);
        let progress = Arc::clone(&self.shared.progress);
        progress.begin();
        self.shared.rebuild_pool.spawn(move || {
            if let Err(e) = suggester.remove() {
                warn!(project = suggester.name(), error = %e, "could not remove suggester data");
            }
            if let Some(shared) = shared.upgrade() {
                shared.finish_removal(suggester.name());
            }
            progress.finish(false);
        });
        true
    }

    /// Handle an index change. Usually called through the source subscription.
    pub fn on_version_changed(&self, project: &str, version: IndexVersion) {
        self.shared.on_version_changed(project, version);
    }

    /// Wait until no rebuild or removal is running or queued.
    pub fn wait_for_rebuild(&self, timeout: Duration) -> bool {
        self.shared
            .progress
            .wait_until(timeout, |state| state.pending == 0)
    }

    /// Wait until the builds scheduled by [`init`](Self::init) are done.
    pub fn wait_for_init(&self, timeout: Duration) -> bool {
        self.shared
            .progress
            .wait_until(timeout, |state| state.initialized)
    }

    /// Stop the schedule and the recorder, wait for background work and
    /// flush popularity.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(mut schedule) = self.schedule.lock().take() {
            schedule.shutdown();
        }
        if let Some(mut recorder) = self.recorder.lock().take() {
            recorder.shutdown();
        }
        if !self.wait_for_rebuild(self.shared.config.build_termination()) {
            warn!("background rebuilds still running at close");
        }
        for project in self.shared.projects.read().values() {
            project.close();
        }
        info!("suggester closed");
    }
}

impl Drop for Suggester {
    fn drop(&mut self) {
        self.close();
    }
}

fn excluded(project: &str, reason: Exclusion) -> ExcludedProject {
    ExcludedProject {
        project: project.to_string(),
        reason,
    }
}
