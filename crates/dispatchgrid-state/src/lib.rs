//! dispatchgrid-state — location and inventory state for the scheduler.
//!
//! Two in-memory tables, both keyed by [`LocationId`]:
//!
//! - [`GeoIndex`] holds coordinates and answers distance queries.
//! - [`InventoryTracker`] holds available quantity per location and is
//!   mutated only through reservation.
//!
//! Both are loaded wholesale from the catalog at scenario start. After
//! loading, the geo index is read-only and the inventory tracker is
//! `Sync`: concurrent reservations against one location never
//! over-commit it.
//!
//! [`LocationId`]: dispatch_core::LocationId

pub mod error;
pub mod geo;
pub mod inventory;

pub use error::{StateError, StateResult};
pub use geo::GeoIndex;
pub use inventory::InventoryTracker;
