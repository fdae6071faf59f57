//! Shared types used across dispatchgrid crates.
//!
//! Field names follow the simulation server's JSON where one exists
//! (`name` for a city, `long` for longitude, `Quantity` on line items),
//! so catalog fixtures and metric reports serialize the same way.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-assigned identifier of a call.
pub type CallId = u64;

// ── Locations ──────────────────────────────────────────────────────

/// Identity of a location: (county, city).
///
/// Ordering is lexicographic by county, then city. The planner relies on
/// this for deterministic tie-breaks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationId {
    pub county: String,
    #[serde(alias = "name")]
    pub city: String,
}

impl LocationId {
    pub fn new(county: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            county: county.into(),
            city: city.into(),
        }
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.county, self.city)
    }
}

/// A known location with its coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(flatten)]
    pub id: LocationId,
    pub lat: f64,
    pub long: f64,
}

impl Location {
    pub fn new(county: &str, city: &str, lat: f64, long: f64) -> Self {
        Self {
            id: LocationId::new(county, city),
            lat,
            long,
        }
    }
}

/// Available dispatchable quantity at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    #[serde(flatten)]
    pub location: LocationId,
    pub quantity: u32,
}

impl InventoryRecord {
    pub fn new(location: LocationId, quantity: u32) -> Self {
        Self { location, quantity }
    }
}

// ── Calls ──────────────────────────────────────────────────────────

/// One requested resource within a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Resource label, e.g. "medical".
    #[serde(rename = "Type")]
    pub resource: String,
    #[serde(rename = "Quantity")]
    pub quantity: u32,
}

/// A pending request for resources at a destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub id: CallId,
    #[serde(flatten)]
    pub destination: LocationId,
    /// Ordered line items. The first one drives admission pacing.
    pub requests: Vec<LineItem>,
    /// Arrival sequence number assigned by the call source.
    #[serde(default)]
    pub received_at: u64,
}

impl Call {
    /// Quantity used for admission pacing: the first line item's quantity.
    pub fn pacing_quantity(&self) -> u32 {
        self.requests.first().map_or(0, |item| item.quantity)
    }

    /// Sum of all line-item quantities.
    pub fn total_quantity(&self) -> u32 {
        self.requests.iter().map(|item| item.quantity).sum()
    }
}

// ── Dispatch ───────────────────────────────────────────────────────

/// Instruction to move `quantity` from `source` to `destination` for one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOrder {
    pub call_id: CallId,
    pub source: LocationId,
    pub destination: LocationId,
    pub resource: String,
    pub quantity: u32,
}

/// How the planner chooses a source location for each line item.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum PlacementStrategy {
    /// Serve everything from a single depot.
    FixedOrigin { origin: LocationId },
    /// Nearest location whose inventory covers the line item.
    #[default]
    NearestSource,
}

// ── Metrics ────────────────────────────────────────────────────────

/// Aggregate counters for one scenario run.
///
/// Serialized with the simulation server's report field names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioMetrics {
    /// Elapsed running time in milliseconds.
    #[serde(rename = "runningTime")]
    pub running_time_ms: u64,
    /// Collaborator requests issued by the scheduler.
    pub request_count: u64,
    /// Transport-level requests as counted by the server.
    pub http_requests: u64,
    pub penalty: f64,
    pub errors: ErrorCounts,
    /// Total quantity successfully dispatched.
    #[serde(default)]
    pub dispatched_quantity: u64,
    /// Calls dropped without being dispatched.
    #[serde(default)]
    pub dropped: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorCounts {
    pub missed: u64,
    pub over_dispatched: u64,
}

impl ScenarioMetrics {
    /// Fold a server-side report into locally observed metrics.
    ///
    /// The server owns transport counts and scoring (`http_requests`,
    /// `penalty`); every other counter stays as observed locally.
    pub fn with_remote(mut self, remote: &ScenarioMetrics) -> Self {
        self.http_requests = remote.http_requests;
        self.penalty = remote.penalty;
        self
    }
}
