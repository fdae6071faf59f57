//! CallQueue — bounded active set of pending calls.
//!
//! Admission is governed by two caps, checked together before every pull:
//!
//! - **Concurrency**: at most `max_active` calls outstanding
//! - **Pacing**: the sum of each active call's pacing quantity (its first
//!   line item) never exceeds `pacing_cap`
//!
//! A pulled call that would push the pacing sum over the cap is parked at
//! the head of a FIFO backlog and offered again on the next pass, ahead of
//! anything new from the source. A call whose pacing quantity alone
//! exceeds the cap can never fit and is handed back as dropped.

use std::collections::VecDeque;
use std::future::Future;

use dispatch_core::{Call, CallId, ScenarioConfig};
use tracing::{debug, warn};

/// The two admission caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionLimits {
    pub max_active: usize,
    pub pacing_cap: u32,
}

impl From<&ScenarioConfig> for AdmissionLimits {
    fn from(config: &ScenarioConfig) -> Self {
        Self {
            max_active: config.max_active_calls as usize,
            pacing_cap: config.pacing_cap(),
        }
    }
}

/// Result of one admission pass.
#[derive(Debug, Default)]
pub struct AdmissionOutcome {
    /// Calls moved into the active set during this pass.
    pub admitted: usize,
    /// The source yielded no call during this pass.
    pub exhausted: bool,
    /// Calls that can never be admitted: oversized for the pacing cap, or
    /// carrying an id that is already active.
    pub dropped: Vec<Call>,
}

#[derive(Debug, Default)]
pub struct CallQueue {
    active: Vec<Call>,
    backlog: VecDeque<Call>,
    pacing_sum: u64,
}

impl CallQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill the active set from the backlog, then from `pull`, until a cap
    /// is reached or `pull` yields `None`.
    pub async fn admit<F, Fut>(&mut self, limits: AdmissionLimits, mut pull: F) -> AdmissionOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Option<Call>>,
    {
        let cap = u64::from(limits.pacing_cap);
        let mut outcome = AdmissionOutcome::default();

        while self.active.len() < limits.max_active && self.pacing_sum < cap {
            let call = match self.backlog.pop_front() {
                Some(call) => call,
                None => match pull().await {
                    Some(call) => call,
                    None => {
                        outcome.exhausted = true;
                        break;
                    }
                },
            };

            if self.contains(call.id) {
                warn!(call_id = call.id, "call already active, dropping duplicate");
                outcome.dropped.push(call);
                continue;
            }

            let pacing = u64::from(call.pacing_quantity());
            if pacing > cap {
                warn!(
                    call_id = call.id,
                    pacing,
                    cap,
                    "call exceeds pacing cap on its own, dropping"
                );
                outcome.dropped.push(call);
                continue;
            }
            if self.pacing_sum + pacing > cap {
                debug!(
                    call_id = call.id,
                    pacing,
                    in_flight = self.pacing_sum,
                    "pacing cap reached, parking call"
                );
                self.backlog.push_front(call);
                break;
            }

            debug!(call_id = call.id, pacing, destination = %call.destination, "call admitted");
            self.pacing_sum += pacing;
            self.active.push(call);
            outcome.admitted += 1;
        }

        outcome
    }

    /// Drop a call from the active set. Absent ids are a no-op.
    pub fn remove(&mut self, call_id: CallId) -> Option<Call> {
        let idx = self.active.iter().position(|c| c.id == call_id)?;
        let call = self.active.remove(idx);
        self.pacing_sum -= u64::from(call.pacing_quantity());
        Some(call)
    }

    pub fn get(&self, call_id: CallId) -> Option<&Call> {
        self.active.iter().find(|c| c.id == call_id)
    }

    pub fn contains(&self, call_id: CallId) -> bool {
        self.get(call_id).is_some()
    }

    /// Active calls in admission order.
    pub fn iter(&self) -> impl Iterator<Item = &Call> {
        self.active.iter()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Cumulative pacing quantity of the active calls.
    pub fn pacing_sum(&self) -> u64 {
        self.pacing_sum
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Take every parked call, oldest first.
    pub fn drain_backlog(&mut self) -> Vec<Call> {
        self.backlog.drain(..).collect()
    }
}
