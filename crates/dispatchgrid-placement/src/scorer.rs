//! Candidate scoring for source selection.
//!
//! Every stocked location is a candidate. Candidates are ordered by:
//! - **Distance** to the destination, ascending
//! - **Identity**: the destination itself wins a zero-distance tie, then
//!   (county, city) order
//!
//! A candidate is *sufficient* when its uncommitted stock covers the
//! requested quantity. The planner takes the first sufficient candidate.

use std::collections::HashMap;

use dispatch_core::LocationId;
use dispatchgrid_state::{GeoIndex, InventoryTracker, StateResult};

/// Scored candidate source for one line item.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceScore {
    pub location: LocationId,
    /// Distance from this source to the destination.
    pub distance: f64,
    /// Stock not yet committed to earlier line items of the same call.
    pub available: u32,
    /// Whether `available` covers the requested quantity.
    pub sufficient: bool,
}

/// Rank all stocked sources for delivering `quantity` to `dest` (best first).
pub fn rank_sources(
    dest: &LocationId,
    quantity: u32,
    geo: &GeoIndex,
    inventory: &InventoryTracker,
) -> StateResult<Vec<SourceScore>> {
    rank_with_claims(dest, quantity, geo, inventory, &HashMap::new())
}

/// Like [`rank_sources`], discounting stock already claimed by the plan
/// being built.
pub(crate) fn rank_with_claims(
    dest: &LocationId,
    quantity: u32,
    geo: &GeoIndex,
    inventory: &InventoryTracker,
    claimed: &HashMap<LocationId, u32>,
) -> StateResult<Vec<SourceScore>> {
    let ranked = geo
        .rank_by_distance(dest)?
        .into_iter()
        .filter_map(|(location, distance)| {
            let stock = inventory.available(&location);
            if stock == 0 {
                return None;
            }
            let taken = claimed.get(&location).copied().unwrap_or(0);
            let available = stock.saturating_sub(taken);
            Some(SourceScore {
                sufficient: available >= quantity,
                location,
                distance,
                available,
            })
        })
        .collect();
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use dispatch_core::{InventoryRecord, Location};
    use dispatchgrid_state::StateError;

    use super::*;

    fn id(city: &str) -> LocationId {
        LocationId::new("Bihor", city)
    }

    fn world() -> (GeoIndex, InventoryTracker) {
        let geo = GeoIndex::from_locations([
            Location::new("Bihor", "Oradea", 0.0, 0.0),
            Location::new("Bihor", "Beius", 1.0, 0.0),
            Location::new("Bihor", "Salonta", 2.0, 0.0),
            Location::new("Bihor", "Marghita", 5.0, 0.0),
        ]);
        let inv = InventoryTracker::from_records([
            InventoryRecord::new(id("Oradea"), 0),
            InventoryRecord::new(id("Beius"), 2),
            InventoryRecord::new(id("Salonta"), 6),
            InventoryRecord::new(id("Marghita"), 9),
        ]);
        (geo, inv)
    }

    #[test]
    fn empty_locations_are_not_candidates() {
        let (geo, inv) = world();
        let ranked = rank_sources(&id("Oradea"), 1, &geo, &inv).unwrap();
        assert!(ranked.iter().all(|s| s.location != id("Oradea")));
        assert_eq!(ranked.len(), 3);
    }

    #[test]
    fn candidates_are_ordered_by_distance_with_sufficiency_flag() {
        let (geo, inv) = world();
        let ranked = rank_sources(&id("Oradea"), 5, &geo, &inv).unwrap();
        let cities: Vec<&str> = ranked.iter().map(|s| s.location.city.as_str()).collect();
        assert_eq!(cities, vec!["Beius", "Salonta", "Marghita"]);
        assert!(!ranked[0].sufficient);
        assert!(ranked[1].sufficient);
        assert_eq!(ranked[2].distance, 5.0);
    }

    #[test]
    fn claims_reduce_available_stock() {
        let (geo, inv) = world();
        let claimed = HashMap::from([(id("Salonta"), 4)]);
        let ranked = rank_with_claims(&id("Oradea"), 3, &geo, &inv, &claimed).unwrap();
        let salonta = ranked.iter().find(|s| s.location == id("Salonta")).unwrap();
        assert_eq!(salonta.available, 2);
        assert!(!salonta.sufficient);
    }

    #[test]
    fn unknown_destination_propagates() {
        let (geo, inv) = world();
        let missing = LocationId::new("Alba", "Blaj");
        assert_eq!(
            rank_sources(&missing, 1, &geo, &inv),
            Err(StateError::UnknownLocation(missing.clone()))
        );
    }
}
