//! GeoIndex — known locations and the distances between them.
//!
//! Distance is plain Euclidean distance over (lat, long) degrees. It is
//! not a geodesic, but it is consistent, which is all the nearest-source
//! ranking needs.

use std::collections::HashMap;

use dispatch_core::{Location, LocationId};
use tracing::debug;

use crate::error::{StateError, StateResult};

/// Coordinates of every known location, keyed by identity.
#[derive(Debug, Clone, Default)]
pub struct GeoIndex {
    locations: HashMap<LocationId, Location>,
}

impl GeoIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a set of locations.
    pub fn from_locations(locations: impl IntoIterator<Item = Location>) -> Self {
        let mut index = Self::new();
        index.load(locations);
        index
    }

    /// Replace the known-location set.
    ///
    /// A later entry with the same identity replaces an earlier one.
    pub fn load(&mut self, locations: impl IntoIterator<Item = Location>) {
        self.locations = locations
            .into_iter()
            .map(|loc| (loc.id.clone(), loc))
            .collect();
        debug!(count = self.locations.len(), "geo index loaded");
    }

    pub fn get(&self, id: &LocationId) -> Option<&Location> {
        self.locations.get(id)
    }

    pub fn contains(&self, id: &LocationId) -> bool {
        self.locations.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// All known identities, sorted by county then city.
    pub fn ids(&self) -> Vec<LocationId> {
        let mut ids: Vec<LocationId> = self.locations.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Euclidean distance between two known locations.
    ///
    /// Symmetric, and exactly `0.0` when `a == b`.
    pub fn distance(&self, a: &LocationId, b: &LocationId) -> StateResult<f64> {
        let from = self.lookup(a)?;
        let to = self.lookup(b)?;
        if a == b {
            return Ok(0.0);
        }
        Ok(euclidean(from, to))
    }

    /// Every known location ordered by ascending distance to `dest`.
    ///
    /// Zero-distance ties put `dest` itself first, then fall back to
    /// (county, city) order, so the result is fully deterministic.
    pub fn rank_by_distance(&self, dest: &LocationId) -> StateResult<Vec<(LocationId, f64)>> {
        let target = self.lookup(dest)?;
        let mut ranked: Vec<(LocationId, f64)> = self
            .locations
            .values()
            .map(|loc| {
                let d = if &loc.id == dest { 0.0 } else { euclidean(loc, target) };
                (loc.id.clone(), d)
            })
            .collect();

        ranked.sort_by(|(a_id, a_d), (b_id, b_d)| {
            a_d.total_cmp(b_d)
                .then_with(|| (a_id != dest).cmp(&(b_id != dest)))
                .then_with(|| a_id.cmp(b_id))
        });
        Ok(ranked)
    }

    fn lookup(&self, id: &LocationId) -> StateResult<&Location> {
        self.locations
            .get(id)
            .ok_or_else(|| StateError::UnknownLocation(id.clone()))
    }
}

fn euclidean(a: &Location, b: &Location) -> f64 {
    ((a.lat - b.lat).powi(2) + (a.long - b.long).powi(2)).sqrt()
}
