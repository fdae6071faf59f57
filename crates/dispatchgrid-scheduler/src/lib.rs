//! dispatchgrid-scheduler — admission-controlled dispatch scheduling.
//!
//! Drives a scenario against an external simulation. The scheduler:
//!
//! - Admits calls from the call source into a bounded active queue,
//!   capped by both call count and cumulative requested quantity
//! - Plans a source for each admitted call (`dispatchgrid-placement`)
//! - Reserves inventory and executes dispatch orders
//! - Tracks scenario metrics and the `Idle → Running → Stopped` lifecycle
//!
//! # Architecture
//!
//! ```text
//! ScenarioController
//!   ├── Backend (call source, catalog, dispatch sink, scenario lifecycle)
//!   ├── CallQueue (active calls + pacing backlog)
//!   ├── Planner (FixedOrigin | NearestSource)
//!   ├── GeoIndex + InventoryTracker (loaded from the catalog at start)
//!   └── MetricsRecorder (shared, readable while a run is in flight)
//! ```

pub mod backend;
pub mod controller;
pub mod error;
pub mod metrics;
pub mod queue;

pub use backend::{Backend, CallSource, Catalog, DispatchOutcome, DispatchSink, ScenarioLifecycle};
pub use controller::{
    PassReport, RunSummary, ScenarioController, ScenarioPhase, StopHandle, Termination,
};
pub use error::{SchedulerError, SchedulerResult};
pub use metrics::MetricsRecorder;
pub use queue::{AdmissionLimits, AdmissionOutcome, CallQueue};
