//! Host capability traits
//!
//! These traits define the narrow interface between the population engine and
//! the world engine hosting it, so the engine never depends on a concrete
//! world implementation.

use thiserror::Error;

use crate::snapshot::{CreatureSnapshot, PlayerSnapshot};
use crate::types::EntityId;

/// Failures reported by the host world engine
#[derive(Debug, Error)]
pub enum HostError {
    #[error("{0} is no longer present in the world")]
    EntityGone(EntityId),
    #[error("failed to remove {id}: {reason}")]
    RemovalFailed { id: EntityId, reason: String },
    #[error("world '{0}' is not loaded")]
    UnknownWorld(String),
}

/// Failure inside a third-party protector
#[derive(Debug, Error)]
#[error("protector '{protector}' failed: {message}")]
pub struct ProtectorError {
    pub protector: String,
    pub message: String,
}

impl ProtectorError {
    pub fn new(protector: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            protector: protector.into(),
            message: message.into(),
        }
    }
}

/// The host world engine as seen by the population engine
pub trait WorldEngine {
    /// Names of all loaded worlds, in a stable order
    fn worlds(&self) -> Vec<String>;

    /// Number of regions (chunks) currently loaded in a world
    fn loaded_regions(&self, world: &str) -> usize;

    /// Fresh capture of every living creature in a world
    fn living_entities(&self, world: &str) -> Vec<CreatureSnapshot>;

    /// Current simulation tick
    fn current_tick(&self) -> u64;

    /// Whether a liveness token still refers to a live creature
    fn is_valid(&self, id: EntityId) -> bool;

    /// Remove a creature from the world. Only called from the tick loop.
    fn remove(&mut self, id: EntityId) -> Result<(), HostError>;
}

/// Connected players
pub trait PlayerDirectory {
    fn online_players(&self) -> Vec<PlayerSnapshot>;

    /// Players currently in one world
    fn players_in(&self, world: &str) -> Vec<PlayerSnapshot> {
        self.online_players()
            .into_iter()
            .filter(|p| p.world == world)
            .collect()
    }
}

/// External plugin that may veto despawns or ability application
/// (boss fights, pets, arenas)
pub trait Protector: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(false)` vetoes the despawn
    fn can_despawn(&self, entity: &CreatureSnapshot) -> Result<bool, ProtectorError>;

    /// `Ok(false)` keeps abilities off the creature
    fn can_apply_abilities(&self, entity: &CreatureSnapshot) -> Result<bool, ProtectorError>;

    /// Whether the protector may be called from a scan worker thread
    fn supports_async_usage(&self) -> bool {
        false
    }
}
