//! Immutable views of host entities
//!
//! The host captures these on the main thread. They are plain data so the
//! classify phase of a despawn scan can read them from a worker thread.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::types::EntityId;

/// Drop chance at or above which an equipment slot holds a player's item
pub const PLAYER_ITEM_DROP_CHANCE: f32 = 1.0;

/// Point-in-time capture of one living creature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatureSnapshot {
    pub id: EntityId,
    pub species: String,
    pub world: String,
    pub position: Vec3,
    /// Ticks since the creature was spawned
    pub ticks_lived: u64,
    /// False once the host has killed or unloaded the creature
    pub valid: bool,
    pub tamed: bool,
    /// Name-tagged or otherwise marked persistent by the host
    pub persistent: bool,
    /// Recently bred, leashed or owned
    pub protected: bool,
    /// Drop chance per equipment slot (hands, armor)
    pub equipment_drop_chances: Vec<f32>,
}

impl CreatureSnapshot {
    /// A valid, freshly spawned creature with no flags set
    pub fn new(
        id: EntityId,
        species: impl Into<String>,
        world: impl Into<String>,
        position: Vec3,
    ) -> Self {
        Self {
            id,
            species: species.into(),
            world: world.into(),
            position,
            ticks_lived: 0,
            valid: true,
            tamed: false,
            persistent: false,
            protected: false,
            equipment_drop_chances: Vec::new(),
        }
    }

    pub fn with_age(mut self, ticks_lived: u64) -> Self {
        self.ticks_lived = ticks_lived;
        self
    }

    pub fn tamed(mut self) -> Self {
        self.tamed = true;
        self
    }

    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }

    pub fn with_equipment(mut self, drop_chances: Vec<f32>) -> Self {
        self.equipment_drop_chances = drop_chances;
        self
    }

    /// Whether any equipment slot is guaranteed to drop, i.e. was picked up
    /// from a player
    pub fn carries_player_item(&self) -> bool {
        self.equipment_drop_chances
            .iter()
            .any(|&chance| chance >= PLAYER_ITEM_DROP_CHANCE)
    }
}

/// A connected player's location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub name: String,
    pub world: String,
    pub position: Vec3,
}

impl PlayerSnapshot {
    pub fn new(name: impl Into<String>, world: impl Into<String>, position: Vec3) -> Self {
        Self {
            name: name.into(),
            world: world.into(),
            position,
        }
    }
}
