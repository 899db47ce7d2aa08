//! Shared test utilities and fixtures.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use typeahead::{
    IndexSnapshot, IndexSource, IndexVersion, MemoryIndexSource, SourceError, SuggestRequest,
    Suggester, SuggesterConfig, Suggestions, TermIndex, VersionListener,
};

// Re-export canonical test utilities from typeahead::testing
pub use typeahead::testing::{index_from_docs, memory_source_with, single_field_index, test_config};

pub const WAIT: Duration = Duration::from_secs(10);
pub const FIELD: &str = "full";

// ============================================================================
// FIXTURES
// ============================================================================

/// doc freqs: the/quick/brown 3, fox/dog 2, everything else 1.
pub const ANIMALS: &[&str] = &[
    "the quick brown fox",
    "the quick brown dog",
    "the lazy brown bear",
    "quick thinking wins",
    "a fox and a dog",
];

pub const KITCHEN: &[&str] = &["brown sugar", "brownie recipe", "brown rice"];

pub const CODE: &[&str] = &[
    "function foo returns bar",
    "functional style",
    "fun with functors",
    "return function",
];

// ============================================================================
// SERVICE HELPERS
// ============================================================================

/// New suggester over `source`, with every project built.
pub fn started(source: Arc<dyn IndexSource>, dir: &Path) -> Suggester {
    started_with(test_config(dir), source)
}

pub fn started_with(config: SuggesterConfig, source: Arc<dyn IndexSource>) -> Suggester {
    let suggester = Suggester::new(config, source).unwrap();
    suggester.init();
    assert!(suggester.wait_for_init(WAIT), "initial build timed out");
    suggester
}

pub fn names(projects: &[&str]) -> Vec<String> {
    projects.iter().map(|p| p.to_string()).collect()
}

/// Request with the caret at the end of `text`.
pub fn request(projects: &[&str], text: &str) -> SuggestRequest {
    request_at(projects, text, text.len())
}

pub fn request_at(projects: &[&str], text: &str, caret: usize) -> SuggestRequest {
    SuggestRequest {
        projects: names(projects),
        fields: BTreeMap::from([(FIELD.to_string(), text.to_string())]),
        field: FIELD.to_string(),
        caret,
    }
}

pub fn terms(out: &Suggestions) -> Vec<String> {
    out.candidates.iter().map(|c| c.term.clone()).collect()
}

/// Suggested terms for `text` typed into `projects`, caret at the end.
pub fn suggest_terms(suggester: &Suggester, projects: &[&str], text: &str) -> Vec<String> {
    terms(&suggester.suggest(&request(projects, text)).unwrap())
}

// ============================================================================
// GATED SOURCE
// ============================================================================

/// What `GatedSource::open_reader` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Pass,
    Block,
    Fail,
    Panic,
}

#[derive(Debug)]
struct GateState {
    gate: Gate,
    blocked: usize,
}

/// A memory source whose readers can be held up, failed or crashed.
pub struct GatedSource {
    inner: MemoryIndexSource,
    state: Mutex<GateState>,
    changed: Condvar,
}

impl GatedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryIndexSource::new(),
            state: Mutex::new(GateState {
                gate: Gate::Pass,
                blocked: 0,
            }),
            changed: Condvar::new(),
        })
    }

    pub fn publish(&self, project: &str, index: TermIndex) -> IndexVersion {
        self.inner.publish(project, index)
    }

    pub fn set_gate(&self, gate: Gate) {
        self.state.lock().gate = gate;
        self.changed.notify_all();
    }

    /// Wait until `n` readers are parked at the gate.
    pub fn wait_blocked(&self, n: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.blocked < n {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                return state.blocked >= n;
            }
        }
        true
    }
}

impl IndexSource for GatedSource {
    fn projects(&self) -> Vec<String> {
        self.inner.projects()
    }

    fn current_version(&self, project: &str) -> Result<IndexVersion, SourceError> {
        self.inner.current_version(project)
    }

    fn open_reader(&self, project: &str) -> Result<IndexSnapshot, SourceError> {
        let mut state = self.state.lock();
        loop {
            match state.gate {
                Gate::Pass => break,
                Gate::Fail => {
                    return Err(SourceError::Unavailable {
                        project: project.to_string(),
                        reason: "index offline".into(),
                    })
                }
                Gate::Panic => panic!("index reader exploded"),
                Gate::Block => {
                    state.blocked += 1;
                    self.changed.notify_all();
                    self.changed.wait(&mut state);
                    state.blocked -= 1;
                }
            }
        }
        drop(state);
        self.inner.open_reader(project)
    }

    fn subscribe(&self, listener: Arc<dyn VersionListener>) {
        self.inner.subscribe(listener);
    }
}
