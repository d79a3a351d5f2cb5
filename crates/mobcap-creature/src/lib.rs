//! Creature model for mobcap
//!
//! This crate implements:
//! - Creature categories and the species registry that maps species onto them
//! - Immutable creature and player snapshots handed over by the host
//! - Host capability traits (world engine, player directory, protectors)
//! - Protector fan-out with graceful degradation

pub mod category;
pub mod protector;
pub mod snapshot;
pub mod traits;
pub mod types;

// Re-export main types for convenience
pub use category::{Category, SpeciesDef, SpeciesRegistry};
pub use protector::{CallSite, ProtectorSet};
pub use snapshot::{CreatureSnapshot, PlayerSnapshot};
pub use traits::{HostError, PlayerDirectory, Protector, ProtectorError, WorldEngine};
pub use types::EntityId;
