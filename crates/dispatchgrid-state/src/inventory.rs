//! InventoryTracker — available quantity per location.
//!
//! Each location's quantity is a single `AtomicU32` cell. Reservation is
//! a compare-and-swap decrement, so two reservations racing on the same
//! location can never both succeed against stock that only covers one of
//! them, and a cell never goes below zero.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use dispatch_core::{InventoryRecord, LocationId};
use tracing::{debug, trace};

use crate::error::{StateError, StateResult};

/// Per-location inventory, mutated only through [`reserve`](Self::reserve)
/// and [`reserve_all`](Self::reserve_all).
#[derive(Debug, Default)]
pub struct InventoryTracker {
    cells: HashMap<LocationId, AtomicU32>,
}

impl InventoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = InventoryRecord>) -> Self {
        let mut tracker = Self::new();
        tracker.load(records);
        tracker
    }

    /// Replace all per-location quantities.
    pub fn load(&mut self, records: impl IntoIterator<Item = InventoryRecord>) {
        self.cells = records
            .into_iter()
            .map(|r| (r.location, AtomicU32::new(r.quantity)))
            .collect();
        debug!(
            locations = self.cells.len(),
            total = self.total_available(),
            "inventory loaded"
        );
    }

    /// Current quantity at `location`, or 0 if it is not tracked.
    pub fn available(&self, location: &LocationId) -> u32 {
        self.cells
            .get(location)
            .map_or(0, |cell| cell.load(Ordering::Acquire))
    }

    pub fn is_tracked(&self, location: &LocationId) -> bool {
        self.cells.contains_key(location)
    }

    /// Atomically take `quantity` from `location`.
    ///
    /// Returns the quantity left after the reservation. On failure the
    /// cell is untouched.
    pub fn reserve(&self, location: &LocationId, quantity: u32) -> StateResult<u32> {
        let cell = self
            .cells
            .get(location)
            .ok_or_else(|| StateError::UnknownLocation(location.clone()))?;

        match cell.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            current.checked_sub(quantity)
        }) {
            Ok(previous) => {
                let remaining = previous - quantity;
                trace!(%location, quantity, remaining, "inventory reserved");
                Ok(remaining)
            }
            Err(available) => Err(StateError::InsufficientInventory {
                location: location.clone(),
                requested: quantity,
                available,
            }),
        }
    }

    /// Reserve several (location, quantity) pairs as one unit.
    ///
    /// Either every reservation holds, or none does: amounts taken before
    /// the first failure are put back before the error is returned.
    /// Concurrent readers may briefly observe the partially taken amounts.
    pub fn reserve_all(&self, reservations: &[(LocationId, u32)]) -> StateResult<()> {
        for (done, (location, quantity)) in reservations.iter().enumerate() {
            if let Err(e) = self.reserve(location, *quantity) {
                for (taken_from, taken) in &reservations[..done] {
                    self.restore(taken_from, *taken);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Locations currently holding stock, sorted by county then city.
    pub fn stocked(&self) -> Vec<LocationId> {
        let mut ids: Vec<LocationId> = self
            .cells
            .iter()
            .filter(|(_, cell)| cell.load(Ordering::Acquire) > 0)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Point-in-time copy of every record, sorted by location.
    pub fn snapshot(&self) -> Vec<InventoryRecord> {
        let mut records: Vec<InventoryRecord> = self
            .cells
            .iter()
            .map(|(id, cell)| InventoryRecord::new(id.clone(), cell.load(Ordering::Acquire)))
            .collect();
        records.sort_by(|a, b| a.location.cmp(&b.location));
        records
    }

    pub fn total_available(&self) -> u64 {
        self.cells
            .values()
            .map(|cell| u64::from(cell.load(Ordering::Acquire)))
            .sum()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    // Undo for a reservation taken inside `reserve_all`.
    fn restore(&self, location: &LocationId, quantity: u32) {
        if let Some(cell) = self.cells.get(location) {
            cell.fetch_add(quantity, Ordering::AcqRel);
        }
    }
}
