//! Headless driver for the mobcap population engine
//!
//! A seeded simulated world engine feeds spawn, death, region and player
//! events into a [`mobcap_core::PopulationEngine`] and reports what the
//! engine allowed and removed.

pub mod config;
pub mod sim;

pub use config::{AppConfig, SimulationConfig};
pub use sim::{SimulatedHost, SimulationStats, SimulationSummary, run_simulation};
