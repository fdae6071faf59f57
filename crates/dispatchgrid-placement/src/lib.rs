//! dispatchgrid dispatch planner — source selection for admitted calls.
//!
//! This crate decides *where* each line item of a call is served from. It
//! never mutates inventory: it reads the geo index and inventory tracker
//! and produces a [`DispatchPlan`] that the scenario controller reserves
//! and executes.
//!
//! # Components
//!
//! - **`scorer`** — Candidate ranking (distance, sufficiency)
//! - **`placer`** — Planner over the `FixedOrigin` / `NearestSource` strategies
//! - **`error`** — Planning failures

pub mod error;
pub mod placer;
pub mod scorer;

pub use dispatch_core::PlacementStrategy;
pub use error::{PlacementError, PlacementResult};
pub use placer::{DispatchPlan, Planner};
pub use scorer::{SourceScore, rank_sources};
