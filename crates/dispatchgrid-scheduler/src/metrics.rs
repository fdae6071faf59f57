//! Metrics recorder — scenario counters shared with observers.
//!
//! Counters are atomics so a status reader on another task can snapshot
//! them while the control loop is mid-pass. Wall-clock bounds of the run
//! sit behind a small mutex.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use dispatch_core::{ErrorCounts, ScenarioMetrics};

#[derive(Debug, Default)]
struct Clock {
    started_at: Option<Instant>,
    stopped_at: Option<Instant>,
}

/// Locally observed scenario counters.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    /// Collaborator requests issued.
    requests: AtomicU64,
    /// Planning passes that could not serve a call.
    missed: AtomicU64,
    /// Dispatch orders the sink refused or failed on.
    over_dispatched: AtomicU64,
    /// Quantity accepted by the sink.
    dispatched_quantity: AtomicU64,
    /// Calls whose orders were executed and which left the queue.
    completed_calls: AtomicU64,
    /// Calls dropped without dispatch.
    dropped: AtomicU64,
    clock: Mutex<Clock>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero every counter and start the clock.
    pub fn begin(&self) {
        for counter in [
            &self.requests,
            &self.missed,
            &self.over_dispatched,
            &self.dispatched_quantity,
            &self.completed_calls,
            &self.dropped,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        *self.clock() = Clock {
            started_at: Some(Instant::now()),
            stopped_at: None,
        };
    }

    /// Freeze the running time.
    pub fn finish(&self) {
        let mut clock = self.clock();
        if clock.started_at.is_some() && clock.stopped_at.is_none() {
            clock.stopped_at = Some(Instant::now());
        }
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_missed(&self) {
        self.missed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_over_dispatched(&self) {
        self.over_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatched(&self, quantity: u32) {
        self.dispatched_quantity
            .fetch_add(u64::from(quantity), Ordering::Relaxed);
    }

    pub fn record_call_completed(&self) {
        self.completed_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self, count: u64) {
        self.dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn dispatched_quantity(&self) -> u64 {
        self.dispatched_quantity.load(Ordering::Relaxed)
    }

    pub fn completed_calls(&self) -> u64 {
        self.completed_calls.load(Ordering::Relaxed)
    }

    /// Current values as a metrics report.
    pub fn snapshot(&self) -> ScenarioMetrics {
        let running_time_ms = {
            let clock = self.clock();
            match (clock.started_at, clock.stopped_at) {
                (Some(start), Some(stop)) => stop.duration_since(start).as_millis() as u64,
                (Some(start), None) => start.elapsed().as_millis() as u64,
                _ => 0,
            }
        };

        ScenarioMetrics {
            running_time_ms,
            request_count: self.requests.load(Ordering::Relaxed),
            http_requests: 0,
            penalty: 0.0,
            errors: ErrorCounts {
                missed: self.missed.load(Ordering::Relaxed),
                over_dispatched: self.over_dispatched.load(Ordering::Relaxed),
            },
            dispatched_quantity: self.dispatched_quantity(),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    fn clock(&self) -> std::sync::MutexGuard<'_, Clock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
