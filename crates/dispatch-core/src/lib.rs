pub mod config;
pub mod types;

pub use config::{ConfigError, DispatchConfig, LocationEntry, ScenarioConfig, SimulationConfig};
pub use types::*;
