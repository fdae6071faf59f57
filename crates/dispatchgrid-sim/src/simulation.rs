//! Simulation — the server half of a scenario.
//!
//! # Architecture
//!
//! ```text
//!   reset_scenario(seed) ──► StdRng ──► next_call() ──► outstanding calls
//!                                                           │
//!   execute(order) ──► validate against outstanding + stock ┘
//!                          │
//!                          ├─ accepted: stock -= q, penalty += distance × q
//!                          └─ rejected: over_dispatched += 1
//! ```
//!
//! Every trait call counts as one HTTP request on the server's books.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::bail;
use async_trait::async_trait;
use dispatch_core::{
    Call, CallId, DispatchConfig, DispatchOrder, ErrorCounts, InventoryRecord, LineItem, Location,
    LocationId, ScenarioConfig, ScenarioMetrics, SimulationConfig,
};
use dispatchgrid_scheduler::{CallSource, Catalog, DispatchOutcome, DispatchSink, ScenarioLifecycle};
use dispatchgrid_state::GeoIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

/// Stable 64-bit seed for a scenario seed string (FNV-1a).
pub fn seed_from_str(seed: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    seed.bytes()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(b)).wrapping_mul(PRIME))
}

/// A call handed out and not yet fully served.
#[derive(Debug, Clone)]
struct Outstanding {
    destination: LocationId,
    remaining: u32,
}

#[derive(Debug)]
struct SimState {
    rng: StdRng,
    running: bool,
    issued: u32,
    next_id: CallId,
    outstanding: HashMap<CallId, Outstanding>,
    stock: HashMap<LocationId, u32>,
    http_requests: u64,
    penalty: f64,
    over_dispatched: u64,
}

impl SimState {
    fn fresh(seed: u64, initial: &[InventoryRecord]) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            running: false,
            issued: 0,
            next_id: 1,
            outstanding: HashMap::new(),
            stock: initial
                .iter()
                .map(|r| (r.location.clone(), r.quantity))
                .collect(),
            http_requests: 0,
            penalty: 0.0,
            over_dispatched: 0,
        }
    }

    fn report(&self) -> ScenarioMetrics {
        ScenarioMetrics {
            http_requests: self.http_requests,
            penalty: self.penalty,
            errors: ErrorCounts {
                missed: self.outstanding.len() as u64,
                over_dispatched: self.over_dispatched,
            },
            ..Default::default()
        }
    }
}

pub struct Simulation {
    settings: SimulationConfig,
    locations: Vec<Location>,
    initial_stock: Vec<InventoryRecord>,
    geo: GeoIndex,
    state: Mutex<SimState>,
}

impl Simulation {
    pub fn new(
        settings: SimulationConfig,
        locations: Vec<Location>,
        initial_stock: Vec<InventoryRecord>,
    ) -> Self {
        let geo = GeoIndex::from_locations(locations.iter().cloned());
        let state = Mutex::new(SimState::fresh(0, &initial_stock));
        Self {
            settings,
            locations,
            initial_stock,
            geo,
            state,
        }
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(
            config.simulation.clone(),
            config.catalog_locations(),
            config.catalog_inventory(),
        )
    }

    /// Ground-truth stock at `location`.
    pub fn stock(&self, location: &LocationId) -> u32 {
        self.state().stock.get(location).copied().unwrap_or(0)
    }

    /// Calls handed out and not yet fully served.
    pub fn outstanding_calls(&self) -> usize {
        self.state().outstanding.len()
    }

    pub fn calls_issued(&self) -> u32 {
        self.state().issued
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn generate(&self, state: &mut SimState) -> Option<Call> {
        if !state.running
            || state.issued >= self.settings.call_count
            || self.locations.is_empty()
        {
            return None;
        }

        let idx = state.rng.random_range(0..self.locations.len());
        let quantity = state
            .rng
            .random_range(1..=self.settings.max_quantity.max(1));
        let destination = self.locations[idx].id.clone();

        let id = state.next_id;
        state.next_id += 1;
        state.issued += 1;
        state.outstanding.insert(
            id,
            Outstanding {
                destination: destination.clone(),
                remaining: quantity,
            },
        );

        Some(Call {
            id,
            destination,
            requests: vec![LineItem {
                resource: self.settings.resource.clone(),
                quantity,
            }],
            received_at: u64::from(state.issued),
        })
    }

    /// Check an order against ground truth. `Err` carries the rejection reason.
    fn validate(&self, state: &SimState, order: &DispatchOrder) -> Result<f64, String> {
        let Some(call) = state.outstanding.get(&order.call_id) else {
            return Err(format!("call {} is not outstanding", order.call_id));
        };
        if call.destination != order.destination {
            return Err(format!(
                "call {} is bound for {}, not {}",
                order.call_id, call.destination, order.destination
            ));
        }
        if order.quantity > call.remaining {
            return Err(format!(
                "call {} needs {}, order sends {}",
                order.call_id, call.remaining, order.quantity
            ));
        }
        let available = state.stock.get(&order.source).copied().unwrap_or(0);
        if order.quantity > available {
            return Err(format!(
                "{} holds {}, order takes {}",
                order.source, available, order.quantity
            ));
        }
        self.geo
            .distance(&order.source, &order.destination)
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl CallSource for Simulation {
    async fn next_call(&self) -> anyhow::Result<Option<Call>> {
        let mut state = self.state();
        state.http_requests += 1;
        let call = self.generate(&mut state);
        if let Some(call) = &call {
            debug!(
                call_id = call.id,
                destination = %call.destination,
                quantity = call.pacing_quantity(),
                "call issued"
            );
        }
        Ok(call)
    }
}

#[async_trait]
impl Catalog for Simulation {
    async fn locations(&self) -> anyhow::Result<Vec<Location>> {
        self.state().http_requests += 1;
        Ok(self.locations.clone())
    }

    async fn inventory(&self) -> anyhow::Result<Vec<InventoryRecord>> {
        let mut state = self.state();
        state.http_requests += 1;
        let mut records: Vec<InventoryRecord> = state
            .stock
            .iter()
            .map(|(location, quantity)| InventoryRecord::new(location.clone(), *quantity))
            .collect();
        records.sort_by(|a, b| a.location.cmp(&b.location));
        Ok(records)
    }
}

#[async_trait]
impl DispatchSink for Simulation {
    async fn execute(&self, order: &DispatchOrder) -> anyhow::Result<DispatchOutcome> {
        let mut state = self.state();
        state.http_requests += 1;
        if !state.running {
            bail!("scenario is not running");
        }

        let distance = match self.validate(&state, order) {
            Ok(distance) => distance,
            Err(reason) => {
                state.over_dispatched += 1;
                debug!(call_id = order.call_id, %reason, "dispatch rejected");
                return Ok(DispatchOutcome::Rejected { reason });
            }
        };

        if let Some(stock) = state.stock.get_mut(&order.source) {
            *stock -= order.quantity;
        }
        let served = match state.outstanding.get_mut(&order.call_id) {
            Some(call) => {
                call.remaining -= order.quantity;
                call.remaining == 0
            }
            None => false,
        };
        if served {
            state.outstanding.remove(&order.call_id);
        }
        state.penalty += distance * f64::from(order.quantity);

        Ok(DispatchOutcome::Accepted)
    }
}

#[async_trait]
impl ScenarioLifecycle for Simulation {
    async fn reset_scenario(&self, config: &ScenarioConfig) -> anyhow::Result<()> {
        let mut state = self.state();
        *state = SimState::fresh(seed_from_str(&config.seed), &self.initial_stock);
        state.running = true;
        state.http_requests = 1;
        info!(
            seed = %config.seed,
            calls = self.settings.call_count,
            max_quantity = self.settings.max_quantity,
            "simulation reset"
        );
        Ok(())
    }

    async fn stop_scenario(&self) -> anyhow::Result<ScenarioMetrics> {
        let mut state = self.state();
        state.http_requests += 1;
        state.running = false;
        let report = state.report();
        info!(
            http_requests = report.http_requests,
            penalty = report.penalty,
            missed = report.errors.missed,
            over_dispatched = report.errors.over_dispatched,
            "simulation stopped"
        );
        Ok(report)
    }

    async fn scenario_status(&self) -> anyhow::Result<ScenarioMetrics> {
        let mut state = self.state();
        state.http_requests += 1;
        Ok(state.report())
    }
}
