//! Planning error types.

use dispatch_core::{CallId, LocationId};
use dispatchgrid_state::StateError;
use thiserror::Error;

pub type PlacementResult<T> = Result<T, PlacementError>;

/// Reasons a call could not be planned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlacementError {
    #[error("unknown location: {0}")]
    UnknownLocation(LocationId),

    #[error("insufficient inventory at {location}: requested {requested}, available {available}")]
    InsufficientInventory {
        location: LocationId,
        requested: u32,
        available: u32,
    },

    #[error("no feasible source for call {call_id} (quantity {quantity})")]
    NoFeasibleSource { call_id: CallId, quantity: u32 },
}

impl PlacementError {
    /// Whether the call may succeed on a later pass once stock moves.
    pub fn is_transient(&self) -> bool {
        !matches!(self, PlacementError::UnknownLocation(_))
    }
}

impl From<StateError> for PlacementError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::UnknownLocation(id) => PlacementError::UnknownLocation(id),
            StateError::InsufficientInventory {
                location,
                requested,
                available,
            } => PlacementError::InsufficientInventory {
                location,
                requested,
                available,
            },
        }
    }
}
