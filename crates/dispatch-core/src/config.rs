//! scenario.toml configuration parser.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{InventoryRecord, Location, LocationId, PlacementStrategy};

/// Rejected configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_active_calls must be at least 1")]
    NoActiveCalls,

    #[error("target_dispatches must be at least 1")]
    NoTarget,

    #[error("pacing_cap must be at least 1")]
    NoPacing,

    #[error("fixed origin {0} is not among the configured locations")]
    UnknownOrigin(LocationId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    pub scenario: ScenarioConfig,
    #[serde(default)]
    pub planner: PlacementStrategy,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub locations: Vec<LocationEntry>,
}

/// Parameters handed to `start()` for one scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub seed: String,
    /// Dispatched quantity at which the run is complete.
    pub target_dispatches: u32,
    pub max_active_calls: u32,
    /// Cap on cumulative pacing quantity among active calls.
    /// Defaults to `target_dispatches`.
    pub pacing_cap: Option<u32>,
    /// Consecutive passes without progress before the loop gives up.
    #[serde(default = "default_max_idle_passes")]
    pub max_idle_passes: u32,
}

fn default_max_idle_passes() -> u32 {
    3
}

impl ScenarioConfig {
    pub fn new(seed: &str, target_dispatches: u32, max_active_calls: u32) -> Self {
        Self {
            seed: seed.to_string(),
            target_dispatches,
            max_active_calls,
            pacing_cap: None,
            max_idle_passes: default_max_idle_passes(),
        }
    }

    /// Effective pacing cap.
    pub fn pacing_cap(&self) -> u32 {
        self.pacing_cap.unwrap_or(self.target_dispatches)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_active_calls == 0 {
            return Err(ConfigError::NoActiveCalls);
        }
        if self.target_dispatches == 0 {
            return Err(ConfigError::NoTarget);
        }
        if self.pacing_cap() == 0 {
            return Err(ConfigError::NoPacing);
        }
        Ok(())
    }
}

/// Call generation for the in-process simulation backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Total calls the source hands out before it is exhausted.
    pub call_count: u32,
    /// Upper bound (inclusive) of a generated call's quantity.
    pub max_quantity: u32,
    #[serde(default = "default_resource")]
    pub resource: String,
}

fn default_resource() -> String {
    "medical".to_string()
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            call_count: 20,
            max_quantity: 5,
            resource: default_resource(),
        }
    }
}

/// One `[[locations]]` entry: coordinates plus starting inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationEntry {
    pub county: String,
    #[serde(alias = "name")]
    pub city: String,
    pub lat: f64,
    pub long: f64,
    #[serde(default)]
    pub quantity: u32,
}

impl DispatchConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DispatchConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scenario.validate()?;
        if let PlacementStrategy::FixedOrigin { origin } = &self.planner {
            let known = self
                .locations
                .iter()
                .any(|l| l.county == origin.county && l.city == origin.city);
            if !known {
                return Err(ConfigError::UnknownOrigin(origin.clone()));
            }
        }
        Ok(())
    }

    pub fn catalog_locations(&self) -> Vec<Location> {
        self.locations
            .iter()
            .map(|l| Location::new(&l.county, &l.city, l.lat, l.long))
            .collect()
    }

    pub fn catalog_inventory(&self) -> Vec<InventoryRecord> {
        self.locations
            .iter()
            .map(|l| InventoryRecord::new(LocationId::new(&l.county, &l.city), l.quantity))
            .collect()
    }

    /// Scaffold a small scenario with a handful of Romanian county seats.
    pub fn scaffold(seed: &str) -> Self {
        let entry = |county: &str, city: &str, lat: f64, long: f64, quantity: u32| LocationEntry {
            county: county.to_string(),
            city: city.to_string(),
            lat,
            long,
            quantity,
        };
        DispatchConfig {
            scenario: ScenarioConfig::new(seed, 10, 3),
            planner: PlacementStrategy::NearestSource,
            simulation: SimulationConfig::default(),
            locations: vec![
                entry("Maramureș", "Baia Mare", 47.6567, 23.5850, 12),
                entry("Cluj", "Cluj-Napoca", 46.7712, 23.6236, 8),
                entry("Bihor", "Oradea", 47.0465, 21.9189, 5),
                entry("Satu Mare", "Satu Mare", 47.7900, 22.8900, 3),
                entry("Sălaj", "Zalău", 47.1911, 23.0572, 0),
            ],
        }
    }
}
