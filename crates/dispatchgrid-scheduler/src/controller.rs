//! Scenario controller — lifecycle plus the dispatch control loop.
//!
//! The controller walks `Idle → Running → Stopped`. While running, each
//! pass of the loop:
//! 1. Admits calls into the queue up to both caps
//! 2. Plans every queued call in admission order
//! 3. Reserves stock and executes the orders of each feasible plan, then
//!    removes the call
//! 4. Leaves infeasible calls queued for the next pass (counted as missed)
//!
//! The loop ends when the dispatched quantity reaches the target, the
//! source is exhausted with nothing left queued, progress stalls, or a
//! [`StopHandle`] asks it to halt.

use std::sync::Arc;

use dispatch_core::{Call, ScenarioConfig, ScenarioMetrics};
use dispatchgrid_placement::{DispatchPlan, Planner};
use dispatchgrid_state::{GeoIndex, InventoryTracker};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backend::{Backend, DispatchOutcome};
use crate::error::{SchedulerError, SchedulerResult};
use crate::metrics::MetricsRecorder;
use crate::queue::{AdmissionLimits, CallQueue};

/// Lifecycle state of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioPhase {
    Idle,
    Running,
    Stopped,
}

/// Why the control loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Dispatched quantity reached the target.
    TargetReached,
    /// The source had nothing more and the queue drained.
    SourceExhausted,
    /// Too many consecutive passes without progress.
    Stalled,
    /// A stop was requested through a [`StopHandle`].
    Halted,
}

/// What one pass of the control loop did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub admitted: usize,
    pub dropped: usize,
    /// Calls whose orders were executed and which left the queue.
    pub executed_calls: usize,
    /// Quantity accepted by the dispatch sink.
    pub dispatched_quantity: u64,
    pub missed: usize,
    pub exhausted: bool,
}

impl PassReport {
    fn made_progress(&self) -> bool {
        self.admitted > 0 || self.executed_calls > 0 || self.dropped > 0
    }
}

/// Outcome of [`ScenarioController::run`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub passes: u32,
    pub dispatched_quantity: u64,
    /// Calls whose orders were executed during the run.
    pub completed_calls: u64,
    pub termination: Termination,
    /// Calls still queued or parked when the loop ended.
    pub stranded_calls: usize,
}

/// Asks a running control loop to halt at the next call boundary.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_requested(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Owns one scenario run end to end.
pub struct ScenarioController {
    backend: Backend,
    planner: Planner,
    geo: GeoIndex,
    inventory: InventoryTracker,
    queue: CallQueue,
    config: Option<ScenarioConfig>,
    phase: ScenarioPhase,
    metrics: Arc<MetricsRecorder>,
    /// Report produced by the last `stop()`.
    final_metrics: Option<ScenarioMetrics>,
    stop_tx: Arc<watch::Sender<bool>>,
}

impl ScenarioController {
    pub fn new(backend: Backend, planner: Planner) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            backend,
            planner,
            geo: GeoIndex::new(),
            inventory: InventoryTracker::new(),
            queue: CallQueue::new(),
            config: None,
            phase: ScenarioPhase::Idle,
            metrics: Arc::new(MetricsRecorder::new()),
            final_metrics: None,
            stop_tx: Arc::new(stop_tx),
        }
    }

    pub fn phase(&self) -> ScenarioPhase {
        self.phase
    }

    pub fn config(&self) -> Option<&ScenarioConfig> {
        self.config.as_ref()
    }

    pub fn queue(&self) -> &CallQueue {
        &self.queue
    }

    pub fn geo(&self) -> &GeoIndex {
        &self.geo
    }

    pub fn inventory(&self) -> &InventoryTracker {
        &self.inventory
    }

    /// Shared recorder, readable from other tasks during a run.
    pub fn metrics(&self) -> Arc<MetricsRecorder> {
        Arc::clone(&self.metrics)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: Arc::clone(&self.stop_tx),
        }
    }

    /// Begin a run: reset the remote scenario and load the catalog.
    ///
    /// Valid from `Idle` or `Stopped`.
    pub async fn start(&mut self, config: ScenarioConfig) -> SchedulerResult<()> {
        if self.phase == ScenarioPhase::Running {
            return Err(SchedulerError::AlreadyRunning);
        }
        config.validate()?;

        self.metrics.begin();
        self.final_metrics = None;

        self.metrics.record_request();
        self.backend.lifecycle.reset_scenario(&config).await?;
        self.metrics.record_request();
        let locations = self.backend.catalog.locations().await?;
        self.metrics.record_request();
        let records = self.backend.catalog.inventory().await?;

        self.geo.load(locations);
        self.inventory.load(records);
        self.queue = CallQueue::new();
        self.stop_tx.send_replace(false);

        info!(
            seed = %config.seed,
            target = config.target_dispatches,
            max_active = config.max_active_calls,
            pacing_cap = config.pacing_cap(),
            locations = self.geo.len(),
            stock = self.inventory.total_available(),
            strategy = ?self.planner.strategy(),
            "scenario started"
        );
        self.config = Some(config);
        self.phase = ScenarioPhase::Running;
        Ok(())
    }

    /// Current metrics. No side effects; valid in any phase.
    pub fn status(&self) -> ScenarioMetrics {
        self.final_metrics
            .clone()
            .unwrap_or_else(|| self.metrics.snapshot())
    }

    /// Local metrics with the server's scoring folded in.
    pub async fn remote_status(&self) -> SchedulerResult<ScenarioMetrics> {
        self.metrics.record_request();
        let remote = self.backend.lifecycle.scenario_status().await?;
        Ok(self.status().with_remote(&remote))
    }

    /// End the run and return the finalized metrics.
    ///
    /// Inventory already reserved stays reserved.
    pub async fn stop(&mut self) -> SchedulerResult<ScenarioMetrics> {
        if self.phase != ScenarioPhase::Running {
            return Err(SchedulerError::NotRunning);
        }
        self.stop_tx.send_replace(true);
        self.phase = ScenarioPhase::Stopped;

        self.metrics.record_request();
        let remote = self.backend.lifecycle.stop_scenario().await;
        self.metrics.finish();
        let local = self.metrics.snapshot();

        let finalized = match remote {
            Ok(remote) => local.with_remote(&remote),
            Err(e) => {
                self.final_metrics = Some(local);
                return Err(e.into());
            }
        };

        info!(
            running_time_ms = finalized.running_time_ms,
            requests = finalized.request_count,
            dispatched = finalized.dispatched_quantity,
            missed = finalized.errors.missed,
            over_dispatched = finalized.errors.over_dispatched,
            penalty = finalized.penalty,
            "scenario stopped"
        );
        self.final_metrics = Some(finalized.clone());
        Ok(finalized)
    }

    /// Drive passes until the run terminates.
    pub async fn run(&mut self) -> SchedulerResult<RunSummary> {
        let (target, max_idle) = {
            let config = self.running_config()?;
            (
                u64::from(config.target_dispatches),
                config.max_idle_passes.max(1),
            )
        };

        let mut passes = 0u32;
        let mut idle = 0u32;
        let termination = loop {
            if self.halt_requested() {
                break Termination::Halted;
            }

            let report = self.step().await?;
            passes += 1;

            if self.metrics.dispatched_quantity() >= target {
                break Termination::TargetReached;
            }
            if report.exhausted && self.queue.is_empty() && self.queue.backlog_len() == 0 {
                break Termination::SourceExhausted;
            }
            if report.made_progress() {
                idle = 0;
            } else {
                idle += 1;
                if idle >= max_idle {
                    break Termination::Stalled;
                }
            }

            tokio::task::yield_now().await;
        };

        let summary = RunSummary {
            passes,
            dispatched_quantity: self.metrics.dispatched_quantity(),
            completed_calls: self.metrics.completed_calls(),
            termination,
            stranded_calls: self.queue.len() + self.queue.backlog_len(),
        };
        if summary.stranded_calls > 0 {
            warn!(
                stranded = summary.stranded_calls,
                ?termination,
                "control loop ended with calls still pending"
            );
        }
        info!(
            passes,
            dispatched = summary.dispatched_quantity,
            ?termination,
            "control loop finished"
        );
        Ok(summary)
    }

    /// Run a single admit → plan → dispatch pass.
    pub async fn step(&mut self) -> SchedulerResult<PassReport> {
        let (limits, target) = {
            let config = self.running_config()?;
            (
                AdmissionLimits::from(config),
                u64::from(config.target_dispatches),
            )
        };
        let mut report = PassReport::default();

        let calls = Arc::clone(&self.backend.calls);
        let metrics = Arc::clone(&self.metrics);
        let admission = self
            .queue
            .admit(limits, || {
                let calls = Arc::clone(&calls);
                let metrics = Arc::clone(&metrics);
                async move {
                    metrics.record_request();
                    match calls.next_call().await {
                        Ok(call) => call,
                        Err(e) => {
                            warn!(error = %e, "call source unavailable, treating as exhausted");
                            None
                        }
                    }
                }
            })
            .await;

        report.admitted = admission.admitted;
        report.exhausted = admission.exhausted;
        report.dropped = admission.dropped.len();
        self.metrics.record_dropped(admission.dropped.len() as u64);

        let pending: Vec<Call> = self.queue.iter().cloned().collect();
        for call in pending {
            if self.halt_requested() || self.metrics.dispatched_quantity() >= target {
                break;
            }

            match self.planner.plan(&call, &self.geo, &self.inventory) {
                Ok(plan) => self.dispatch(&call, plan, &mut report).await,
                Err(e) if e.is_transient() => {
                    debug!(call_id = call.id, error = %e, "call not servable this pass");
                    self.metrics.record_missed();
                    report.missed += 1;
                }
                Err(e) => {
                    warn!(call_id = call.id, error = %e, "dropping unplannable call");
                    self.queue.remove(call.id);
                    self.metrics.record_dropped(1);
                    report.dropped += 1;
                }
            }
        }

        debug!(
            admitted = report.admitted,
            executed = report.executed_calls,
            missed = report.missed,
            queued = self.queue.len(),
            parked = self.queue.backlog_len(),
            "pass complete"
        );
        Ok(report)
    }

    // ── Internal helpers ────────────────────────────────────────────

    /// Reserve and execute one plan. Sink failures are counted but the
    /// reservation is kept and the call leaves the queue either way.
    async fn dispatch(&mut self, call: &Call, plan: DispatchPlan, report: &mut PassReport) {
        // Stock can move between planning and reservation once anything
        // else holds the tracker; the plan is then stale and the call waits.
        if let Err(e) = self.inventory.reserve_all(&plan.reservations()) {
            debug!(call_id = call.id, error = %e, "reservation failed, keeping call queued");
            self.metrics.record_missed();
            report.missed += 1;
            return;
        }

        for order in &plan.orders {
            self.metrics.record_request();
            match self.backend.sink.execute(order).await {
                Ok(DispatchOutcome::Accepted) => {
                    self.metrics.record_dispatched(order.quantity);
                    report.dispatched_quantity += u64::from(order.quantity);
                    debug!(
                        call_id = order.call_id,
                        source = %order.source,
                        destination = %order.destination,
                        quantity = order.quantity,
                        "dispatch accepted"
                    );
                }
                Ok(DispatchOutcome::Rejected { reason }) => {
                    self.metrics.record_over_dispatched();
                    warn!(
                        call_id = order.call_id,
                        source = %order.source,
                        quantity = order.quantity,
                        %reason,
                        "dispatch rejected"
                    );
                }
                Err(e) => {
                    self.metrics.record_over_dispatched();
                    warn!(
                        call_id = order.call_id,
                        source = %order.source,
                        error = %e,
                        "dispatch execution failed"
                    );
                }
            }
        }

        self.queue.remove(call.id);
        self.metrics.record_call_completed();
        report.executed_calls += 1;
    }

    fn running_config(&self) -> SchedulerResult<&ScenarioConfig> {
        match (&self.phase, &self.config) {
            (ScenarioPhase::Running, Some(config)) => Ok(config),
            _ => Err(SchedulerError::NotRunning),
        }
    }

    fn halt_requested(&self) -> bool {
        *self.stop_tx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use dispatch_core::{
        DispatchOrder, InventoryRecord, LineItem, Location, LocationId, PlacementStrategy,
    };

    use super::*;
    use crate::backend::{CallSource, Catalog, DispatchSink, ScenarioLifecycle};

    #[derive(Default)]
    struct FakeServer {
        calls: Mutex<VecDeque<Call>>,
        locations: Vec<Location>,
        inventory: Vec<InventoryRecord>,
        reject: bool,
        executed: Mutex<Vec<DispatchOrder>>,
    }

    #[async_trait]
    impl CallSource for FakeServer {
        async fn next_call(&self) -> anyhow::Result<Option<Call>> {
            Ok(self.calls.lock().unwrap().pop_front())
        }
    }

    #[async_trait]
    impl Catalog for FakeServer {
        async fn locations(&self) -> anyhow::Result<Vec<Location>> {
            Ok(self.locations.clone())
        }

        async fn inventory(&self) -> anyhow::Result<Vec<InventoryRecord>> {
            Ok(self.inventory.clone())
        }
    }

    #[async_trait]
    impl DispatchSink for FakeServer {
        async fn execute(&self, order: &DispatchOrder) -> anyhow::Result<DispatchOutcome> {
            self.executed.lock().unwrap().push(order.clone());
            if self.reject {
                Ok(DispatchOutcome::Rejected {
                    reason: "over capacity".to_string(),
                })
            } else {
                Ok(DispatchOutcome::Accepted)
            }
        }
    }

    #[async_trait]
    impl ScenarioLifecycle for FakeServer {
        async fn reset_scenario(&self, _config: &ScenarioConfig) -> anyhow::Result<()> {
            Ok(())
        }

        async fn stop_scenario(&self) -> anyhow::Result<ScenarioMetrics> {
            Ok(ScenarioMetrics {
                http_requests: 17,
                penalty: 2.5,
                ..Default::default()
            })
        }

        async fn scenario_status(&self) -> anyhow::Result<ScenarioMetrics> {
            Ok(ScenarioMetrics {
                http_requests: 9,
                penalty: 1.0,
                ..Default::default()
            })
        }
    }

    fn loc_id(city: &str) -> LocationId {
        LocationId::new("Maramureș", city)
    }

    fn call(id: u64, city: &str, quantity: u32) -> Call {
        Call {
            id,
            destination: loc_id(city),
            requests: vec![LineItem {
                resource: "medical".to_string(),
                quantity,
            }],
            received_at: 0,
        }
    }

    fn server(calls: Vec<Call>, stock: &[(&str, u32)]) -> FakeServer {
        FakeServer {
            calls: Mutex::new(calls.into()),
            locations: vec![
                Location::new("Maramureș", "Baia Mare", 47.65, 23.57),
                Location::new("Maramureș", "Sighet", 47.93, 23.89),
                Location::new("Maramureș", "Borsa", 47.65, 24.66),
            ],
            inventory: stock
                .iter()
                .map(|(city, q)| InventoryRecord::new(loc_id(city), *q))
                .collect(),
            ..Default::default()
        }
    }

    fn controller(server: FakeServer) -> (ScenarioController, Arc<FakeServer>) {
        controller_with(server, PlacementStrategy::NearestSource)
    }

    fn controller_with(
        server: FakeServer,
        strategy: PlacementStrategy,
    ) -> (ScenarioController, Arc<FakeServer>) {
        let server = Arc::new(server);
        let ctl = ScenarioController::new(Backend::shared(server.clone()), Planner::new(strategy));
        (ctl, server)
    }

    fn config() -> ScenarioConfig {
        ScenarioConfig::new("s1", 10, 3)
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    #[tokio::test]
    async fn stop_while_idle_fails() {
        let (mut ctl, _) = controller(server(vec![], &[]));
        assert!(matches!(ctl.stop().await, Err(SchedulerError::NotRunning)));
        assert_eq!(ctl.phase(), ScenarioPhase::Idle);
    }

    #[tokio::test]
    async fn second_start_fails_with_already_running() {
        let (mut ctl, _) = controller(server(vec![], &[("Baia Mare", 5)]));
        ctl.start(config()).await.unwrap();
        assert!(matches!(
            ctl.start(config()).await,
            Err(SchedulerError::AlreadyRunning)
        ));
        assert_eq!(ctl.phase(), ScenarioPhase::Running);
    }

    #[tokio::test]
    async fn stop_twice_fails_the_second_time() {
        let (mut ctl, _) = controller(server(vec![], &[("Baia Mare", 5)]));
        ctl.start(config()).await.unwrap();
        ctl.stop().await.unwrap();
        assert_eq!(ctl.phase(), ScenarioPhase::Stopped);
        assert!(matches!(ctl.stop().await, Err(SchedulerError::NotRunning)));
    }

    #[tokio::test]
    async fn restart_after_stop_resets_metrics() {
        let (mut ctl, _) = controller(server(vec![call(1, "Sighet", 20)], &[("Baia Mare", 5)]));
        ctl.start(config()).await.unwrap();
        ctl.run().await.unwrap();
        ctl.stop().await.unwrap();
        assert!(ctl.status().dropped > 0);

        ctl.start(config()).await.unwrap();
        let status = ctl.status();
        assert_eq!(status.dropped, 0);
        assert_eq!(status.errors.missed, 0);
        assert_eq!(ctl.phase(), ScenarioPhase::Running);
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_running() {
        let (mut ctl, _) = controller(server(vec![], &[]));
        let result = ctl.start(ScenarioConfig::new("s1", 10, 0)).await;
        assert!(matches!(result, Err(SchedulerError::Config(_))));
        assert_eq!(ctl.phase(), ScenarioPhase::Idle);
    }

    #[tokio::test]
    async fn run_and_step_require_running() {
        let (mut ctl, _) = controller(server(vec![], &[]));
        assert!(matches!(ctl.run().await, Err(SchedulerError::NotRunning)));
        assert!(matches!(ctl.step().await, Err(SchedulerError::NotRunning)));
    }

    #[tokio::test]
    async fn status_has_no_side_effects() {
        let (mut ctl, _) = controller(server(vec![], &[("Baia Mare", 5)]));
        ctl.start(config()).await.unwrap();
        let a = ctl.status();
        let b = ctl.status();
        assert_eq!(a.request_count, b.request_count);
        assert_eq!(a.request_count, 3);
    }

    // ── Control loop ───────────────────────────────────────────────

    #[tokio::test]
    async fn single_location_dispatches_fully() {
        let (mut ctl, srv) = controller(server(vec![call(1, "Baia Mare", 5)], &[("Baia Mare", 5)]));
        ctl.start(config()).await.unwrap();

        let summary = ctl.run().await.unwrap();

        assert_eq!(summary.termination, Termination::SourceExhausted);
        assert_eq!(summary.dispatched_quantity, 5);
        assert_eq!(summary.completed_calls, 1);
        assert_eq!(ctl.inventory().available(&loc_id("Baia Mare")), 0);
        assert!(ctl.queue().is_empty());
        assert_eq!(ctl.status().errors.missed, 0);

        let executed = srv.executed.lock().unwrap();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].source, loc_id("Baia Mare"));
        assert_eq!(executed[0].call_id, 1);
    }

    #[tokio::test]
    async fn dual_caps_admit_two_of_three() {
        let calls = vec![
            call(1, "Sighet", 4),
            call(2, "Sighet", 4),
            call(3, "Sighet", 4),
        ];
        let (mut ctl, _) = controller(server(calls, &[("Baia Mare", 50)]));
        ctl.start(config()).await.unwrap();

        let report = ctl.step().await.unwrap();

        assert_eq!(report.admitted, 2);
        assert_eq!(report.executed_calls, 2);
        assert_eq!(report.dispatched_quantity, 8);
        assert_eq!(ctl.queue().backlog_len(), 1);

        let summary = ctl.run().await.unwrap();
        assert_eq!(summary.termination, Termination::TargetReached);
        assert_eq!(summary.dispatched_quantity, 12);
        assert_eq!(summary.completed_calls, 3);
    }

    #[tokio::test]
    async fn duplicate_call_counts_as_dropped() {
        let calls = vec![call(1, "Sighet", 2), call(1, "Sighet", 2)];
        let (mut ctl, srv) = controller(server(calls, &[("Baia Mare", 10)]));
        ctl.start(config()).await.unwrap();

        let report = ctl.step().await.unwrap();

        assert_eq!(report.admitted, 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(ctl.status().dropped, 1);
        assert_eq!(srv.executed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stale_plan_is_not_executed() {
        let (mut ctl, srv) = controller(server(vec![], &[("Baia Mare", 5)]));
        ctl.start(config()).await.unwrap();
        let pending = call(1, "Sighet", 4);
        let plan = ctl.planner.plan(&pending, &ctl.geo, &ctl.inventory).unwrap();

        // Someone else takes stock after the plan was made.
        ctl.inventory().reserve(&loc_id("Baia Mare"), 3).unwrap();
        let mut report = PassReport::default();
        ctl.dispatch(&pending, plan, &mut report).await;

        assert_eq!(report.missed, 1);
        assert_eq!(report.executed_calls, 0);
        assert_eq!(ctl.status().errors.missed, 1);
        assert_eq!(ctl.metrics().completed_calls(), 0);
        assert_eq!(ctl.inventory().available(&loc_id("Baia Mare")), 2);
        assert!(srv.executed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn scarce_stock_goes_to_earlier_admission() {
        let calls = vec![call(1, "Borsa", 3), call(2, "Sighet", 3)];
        let (mut ctl, srv) = controller(server(calls, &[("Baia Mare", 4)]));
        ctl.start(config()).await.unwrap();

        let report = ctl.step().await.unwrap();

        assert_eq!(report.executed_calls, 1);
        assert_eq!(report.missed, 1);
        assert_eq!(srv.executed.lock().unwrap()[0].call_id, 1);
        assert!(ctl.queue().contains(2));
    }

    #[tokio::test]
    async fn infeasible_call_stays_queued_until_stall() {
        let (mut ctl, srv) = controller(server(vec![call(1, "Sighet", 5)], &[("Baia Mare", 2)]));
        ctl.start(config()).await.unwrap();

        let summary = ctl.run().await.unwrap();

        assert_eq!(summary.termination, Termination::Stalled);
        assert_eq!(summary.passes, 4);
        assert_eq!(summary.stranded_calls, 1);
        assert_eq!(ctl.status().errors.missed, 4);
        assert!(ctl.queue().contains(1));
        assert!(srv.executed.lock().unwrap().is_empty());
        assert_eq!(ctl.inventory().available(&loc_id("Baia Mare")), 2);
    }

    #[tokio::test]
    async fn rejected_dispatch_counts_and_keeps_reservation() {
        let mut srv = server(vec![call(1, "Sighet", 3)], &[("Baia Mare", 5)]);
        srv.reject = true;
        let (mut ctl, _) = controller(srv);
        ctl.start(config()).await.unwrap();

        let summary = ctl.run().await.unwrap();

        let status = ctl.status();
        assert_eq!(status.errors.over_dispatched, 1);
        assert_eq!(status.dispatched_quantity, 0);
        assert_eq!(ctl.inventory().available(&loc_id("Baia Mare")), 2);
        assert!(ctl.queue().is_empty());
        assert_eq!(summary.termination, Termination::SourceExhausted);
    }

    #[tokio::test]
    async fn unknown_destination_is_dropped() {
        let mut stray = call(1, "Sighet", 2);
        stray.destination = LocationId::new("Alba", "Blaj");
        let (mut ctl, _) = controller(server(vec![stray], &[("Baia Mare", 5)]));
        ctl.start(config()).await.unwrap();

        ctl.run().await.unwrap();

        let status = ctl.status();
        assert_eq!(status.dropped, 1);
        assert_eq!(status.errors.missed, 0);
        assert!(ctl.queue().is_empty());
    }

    #[tokio::test]
    async fn fixed_origin_serves_everything_from_depot() {
        let calls = vec![call(1, "Sighet", 2), call(2, "Borsa", 3)];
        let strategy = PlacementStrategy::FixedOrigin {
            origin: loc_id("Baia Mare"),
        };
        let (mut ctl, srv) = controller_with(
            server(calls, &[("Baia Mare", 10), ("Borsa", 10)]),
            strategy,
        );
        ctl.start(config()).await.unwrap();

        ctl.run().await.unwrap();

        let executed = srv.executed.lock().unwrap();
        assert_eq!(executed.len(), 2);
        assert!(executed.iter().all(|o| o.source == loc_id("Baia Mare")));
        assert_eq!(ctl.inventory().available(&loc_id("Borsa")), 10);
    }

    #[tokio::test]
    async fn stop_handle_halts_run() {
        let (mut ctl, _) = controller(server(vec![call(1, "Sighet", 1)], &[("Baia Mare", 5)]));
        ctl.start(config()).await.unwrap();
        let handle = ctl.stop_handle();
        handle.request_stop();

        let summary = ctl.run().await.unwrap();

        assert!(handle.is_requested());
        assert_eq!(summary.termination, Termination::Halted);
        assert_eq!(summary.passes, 0);
        assert_eq!(ctl.phase(), ScenarioPhase::Running);
        ctl.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_folds_in_remote_scoring() {
        let (mut ctl, _) = controller(server(vec![call(1, "Baia Mare", 2)], &[("Baia Mare", 5)]));
        ctl.start(config()).await.unwrap();
        ctl.run().await.unwrap();

        let live = ctl.remote_status().await.unwrap();
        assert_eq!(live.http_requests, 9);

        let finalized = ctl.stop().await.unwrap();
        assert_eq!(finalized.http_requests, 17);
        assert_eq!(finalized.penalty, 2.5);
        assert_eq!(finalized.dispatched_quantity, 2);
        assert!(finalized.request_count > 0);
        assert_eq!(ctl.status(), finalized);
    }
}
