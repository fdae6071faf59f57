//! Collaborator interfaces — everything the scheduler talks to.
//!
//! The simulation server owns ground truth: which calls exist, what the
//! catalog holds, whether a dispatch is accepted, and how the run is
//! scored. These traits abstract it so the scheduler can run against an
//! HTTP client, an in-process simulation, or a test fake.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use dispatch_core::{
    Call, DispatchOrder, InventoryRecord, Location, ScenarioConfig, ScenarioMetrics,
};

/// Source of incoming calls.
#[async_trait]
pub trait CallSource: Send + Sync {
    /// Next pending call, or `None` when the source has nothing more.
    async fn next_call(&self) -> anyhow::Result<Option<Call>>;
}

/// Static catalog: known locations and their starting stock.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn locations(&self) -> anyhow::Result<Vec<Location>>;
    async fn inventory(&self) -> anyhow::Result<Vec<InventoryRecord>>;
}

/// Server verdict on a single dispatch order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Accepted,
    Rejected { reason: String },
}

/// Execution sink that carries out dispatch orders.
#[async_trait]
pub trait DispatchSink: Send + Sync {
    async fn execute(&self, order: &DispatchOrder) -> anyhow::Result<DispatchOutcome>;
}

/// Server-side scenario control.
#[async_trait]
pub trait ScenarioLifecycle: Send + Sync {
    async fn reset_scenario(&self, config: &ScenarioConfig) -> anyhow::Result<()>;
    async fn stop_scenario(&self) -> anyhow::Result<ScenarioMetrics>;
    async fn scenario_status(&self) -> anyhow::Result<ScenarioMetrics>;
}

/// Handles to every collaborator the controller needs.
#[derive(Clone)]
pub struct Backend {
    pub calls: Arc<dyn CallSource>,
    pub catalog: Arc<dyn Catalog>,
    pub sink: Arc<dyn DispatchSink>,
    pub lifecycle: Arc<dyn ScenarioLifecycle>,
}

impl Backend {
    /// Use one object for all four roles.
    pub fn shared<T>(server: Arc<T>) -> Self
    where
        T: CallSource + Catalog + DispatchSink + ScenarioLifecycle + 'static,
    {
        Self {
            calls: server.clone(),
            catalog: server.clone(),
            sink: server.clone(),
            lifecycle: server,
        }
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend").finish_non_exhaustive()
    }
}
