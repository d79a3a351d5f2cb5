//! Population control engine
//!
//! - `world`: regions, player presence, spiral proximity search and the census
//! - `spawn_gate`: capacity, breeding and proximity checks for new spawns
//! - `despawn`: the despawn rule chain and the incremental scanner
//! - `engine`: the facade a host drives once per tick

pub mod config;
pub mod despawn;
pub mod engine;
pub mod scheduler;
pub mod spawn_gate;
pub mod world;

pub use config::{ConfigError, PopulationConfig, ScanMode, WorldPopulationConfig};
pub use engine::PopulationEngine;
pub use spawn_gate::{DenyReason, SpawnDecision, SpawnReason};

// Re-export the creature model so hosts need a single dependency
pub mod creature {
    pub use mobcap_creature::*;
}
