// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Search-event recorder.
//!
//! Executed searches are counted off the request path. `record` never blocks:
//! events go into a bounded queue drained by one background thread, and when
//! the queue is full the event is dropped. Popularity is a ranking hint, so
//! losing a count under load is acceptable; slowing down searches is not.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

/// Terms from one executed search, for every project it covered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEvent {
    pub projects: Vec<String>,
    /// `(field, term)` pairs.
    pub terms: Vec<(String, String)>,
}

enum Message {
    Event(SearchEvent),
    Barrier(mpsc::Sender<()>),
}

/// Background consumer of search events.
pub struct SearchRecorder {
    tx: Option<SyncSender<Message>>,
    worker: Option<JoinHandle<()>>,
    dropped: Arc<AtomicU64>,
}

impl SearchRecorder {
    /// Spawn the consumer thread. `apply` runs once per event, on that thread.
    pub fn start<F>(queue: usize, apply: F) -> io::Result<Self>
    where
        F: Fn(SearchEvent) + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(queue.max(1));
        let worker = thread::Builder::new()
            .name("typeahead-recorder".into())
            .spawn(move || drain(rx, apply))?;
        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
            dropped: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Queue an event. Returns false if it was dropped.
    pub fn record(&self, event: SearchEvent) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        match tx.try_send(Message::Event(event)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(dropped = total, "search-event queue full, dropping event");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Events dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Wait until every event queued before this call has been applied.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let Some(tx) = &self.tx else {
            return true;
        };
        let deadline = Instant::now() + timeout;
        let (ack_tx, ack_rx) = mpsc::channel();
        let mut barrier = Message::Barrier(ack_tx);
        loop {
            match tx.try_send(barrier) {
                Ok(()) => break,
                Err(TrySendError::Disconnected(_)) => return false,
                Err(TrySendError::Full(back)) => {
                    if Instant::now() >= deadline {
                        return false;
                    }
                    barrier = back;
                    thread::sleep(Duration::from_millis(1));
                }
            }
        }
        ack_rx
            .recv_timeout(deadline.saturating_duration_since(Instant::now()))
            .is_ok()
    }

    /// Stop accepting events, apply what's queued, and join the thread.
    pub fn shutdown(&mut self) {
        self.tx = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("search-event recorder thread panicked");
            }
        }
    }
}

impl Drop for SearchRecorder {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn drain<F: Fn(SearchEvent)>(rx: Receiver<Message>, apply: F) {
    for message in rx {
        match message {
            Message::Event(event) => apply(event),
            Message::Barrier(ack) => {
                let _ = ack.send(());
            }
        }
    }
    debug!("search-event recorder stopped");
}
