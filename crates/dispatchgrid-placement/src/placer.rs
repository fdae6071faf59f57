//! Planner — turns an admitted call into dispatch orders.
//!
//! Given a call and the current geo/inventory state, the planner decides:
//! 1. Which source serves each line item (per [`PlacementStrategy`])
//! 2. Whether the call is feasible at all right now
//!
//! The plan is a proposal. Reserving stock and executing the orders is
//! the scenario controller's job.

use std::collections::HashMap;

use dispatch_core::{Call, CallId, DispatchOrder, LocationId, PlacementStrategy};
use dispatchgrid_state::{GeoIndex, InventoryTracker};
use tracing::debug;

use crate::error::{PlacementError, PlacementResult};
use crate::scorer::rank_with_claims;

/// Dispatch orders for one call, one per non-empty line item.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchPlan {
    pub call_id: CallId,
    pub orders: Vec<DispatchOrder>,
}

impl DispatchPlan {
    /// (source, quantity) pairs to reserve before executing.
    pub fn reservations(&self) -> Vec<(LocationId, u32)> {
        self.orders
            .iter()
            .map(|o| (o.source.clone(), o.quantity))
            .collect()
    }

    pub fn total_quantity(&self) -> u32 {
        self.orders.iter().map(|o| o.quantity).sum()
    }
}

/// Source selection behind one interface, whatever the strategy.
#[derive(Debug, Clone, Default)]
pub struct Planner {
    strategy: PlacementStrategy,
}

impl Planner {
    pub fn new(strategy: PlacementStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &PlacementStrategy {
        &self.strategy
    }

    /// Plan every line item of `call`. Never mutates `inventory`.
    pub fn plan(
        &self,
        call: &Call,
        geo: &GeoIndex,
        inventory: &InventoryTracker,
    ) -> PlacementResult<DispatchPlan> {
        let plan = match &self.strategy {
            PlacementStrategy::FixedOrigin { origin } => plan_fixed(origin, call, geo, inventory)?,
            PlacementStrategy::NearestSource => plan_nearest(call, geo, inventory)?,
        };
        debug!(
            call_id = call.id,
            orders = plan.orders.len(),
            quantity = plan.total_quantity(),
            "call planned"
        );
        Ok(plan)
    }
}

/// Single-depot policy: everything comes from `origin` or nothing does.
fn plan_fixed(
    origin: &LocationId,
    call: &Call,
    geo: &GeoIndex,
    inventory: &InventoryTracker,
) -> PlacementResult<DispatchPlan> {
    if !geo.contains(&call.destination) {
        return Err(PlacementError::UnknownLocation(call.destination.clone()));
    }
    if !inventory.is_tracked(origin) {
        return Err(PlacementError::UnknownLocation(origin.clone()));
    }

    let requested = call.total_quantity();
    let available = inventory.available(origin);
    if requested > available {
        return Err(PlacementError::InsufficientInventory {
            location: origin.clone(),
            requested,
            available,
        });
    }

    let orders = call
        .requests
        .iter()
        .filter(|item| item.quantity > 0)
        .map(|item| DispatchOrder {
            call_id: call.id,
            source: origin.clone(),
            destination: call.destination.clone(),
            resource: item.resource.clone(),
            quantity: item.quantity,
        })
        .collect();

    Ok(DispatchPlan {
        call_id: call.id,
        orders,
    })
}

/// Nearest sufficient source per line item.
///
/// Stock picked for earlier line items is held back from later ones, so
/// the plan as a whole never asks a source for more than it has.
fn plan_nearest(
    call: &Call,
    geo: &GeoIndex,
    inventory: &InventoryTracker,
) -> PlacementResult<DispatchPlan> {
    if !geo.contains(&call.destination) {
        return Err(PlacementError::UnknownLocation(call.destination.clone()));
    }

    let mut claimed: HashMap<LocationId, u32> = HashMap::new();
    let mut orders = Vec::with_capacity(call.requests.len());

    for item in call.requests.iter().filter(|item| item.quantity > 0) {
        let ranked = rank_with_claims(&call.destination, item.quantity, geo, inventory, &claimed)?;
        let Some(best) = ranked.into_iter().find(|s| s.sufficient) else {
            return Err(PlacementError::NoFeasibleSource {
                call_id: call.id,
                quantity: item.quantity,
            });
        };

        debug!(
            call_id = call.id,
            source = %best.location,
            distance = best.distance,
            quantity = item.quantity,
            "selected nearest source"
        );

        *claimed.entry(best.location.clone()).or_insert(0) += item.quantity;
        orders.push(DispatchOrder {
            call_id: call.id,
            source: best.location,
            destination: call.destination.clone(),
            resource: item.resource.clone(),
            quantity: item.quantity,
        });
    }

    Ok(DispatchPlan {
        call_id: call.id,
        orders,
    })
}
