//! Error types for location and inventory state.

use dispatch_core::LocationId;
use thiserror::Error;

/// Result type alias for state operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur during geo or inventory operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("unknown location: {0}")]
    UnknownLocation(LocationId),

    #[error("insufficient inventory at {location}: requested {requested}, available {available}")]
    InsufficientInventory {
        location: LocationId,
        requested: u32,
        available: u32,
    },
}
