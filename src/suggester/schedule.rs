// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Periodic rebuild of every project.
//!
//! One thread sleeps until the next cron occurrence, fires, then computes the
//! following occurrence. Shutdown wakes it through a condvar, so closing the
//! service never waits out the sleep.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, TimeZone};
use croner::Cron;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

/// Time from `now` to the next occurrence of `cron`, `None` if there is none.
pub fn until_next<Tz: TimeZone>(cron: &Cron, now: &DateTime<Tz>) -> Option<Duration> {
    let next = cron.find_next_occurrence(now, false).ok()?;
    Some((next - now.clone()).to_std().unwrap_or(Duration::ZERO))
}

#[derive(Default)]
struct Stop {
    stopped: Mutex<bool>,
    wake: Condvar,
}

/// Background thread firing a callback on a schedule.
pub struct RebuildSchedule {
    stop: Arc<Stop>,
    worker: Option<JoinHandle<()>>,
}

impl RebuildSchedule {
    /// Fire on every occurrence of `cron`, in local time.
    pub fn start<F>(cron: Cron, fire: F) -> io::Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        Self::start_with(move || until_next(&cron, &Local::now()), fire)
    }

    /// `next` gives the delay before each run; `None` ends the schedule.
    pub(crate) fn start_with<N, F>(next: N, fire: F) -> io::Result<Self>
    where
        N: Fn() -> Option<Duration> + Send + 'static,
        F: Fn() + Send + 'static,
    {
        let stop = Arc::new(Stop::default());
        let worker = {
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("typeahead-schedule".into())
                .spawn(move || run(&stop, next, fire))?
        };
        Ok(Self {
            stop,
            worker: Some(worker),
        })
    }

    /// Wake the thread, skip any pending run, and join it.
    pub fn shutdown(&mut self) {
        *self.stop.stopped.lock() = true;
        self.stop.wake.notify_all();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("rebuild schedule thread panicked");
            }
        }
    }
}

impl Drop for RebuildSchedule {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run<N, F>(stop: &Stop, next: N, fire: F)
where
    N: Fn() -> Option<Duration>,
    F: Fn(),
{
    loop {
        let Some(delay) = next() else {
            warn!("rebuild schedule has no further occurrence");
            return;
        };
        debug!(delay_secs = delay.as_secs(), "next scheduled rebuild");

        let deadline = Instant::now() + delay;
        let mut stopped = stop.stopped.lock();
        while !*stopped && !stop.wake.wait_until(&mut stopped, deadline).timed_out() {}
        if *stopped {
            debug!("rebuild schedule stopped");
            return;
        }
        drop(stopped);

        info!("scheduled rebuild of all projects");
        fire();
    }
}
