//! Spawn admission
//!
//! The host asks before letting a creature into the world. Denials are
//! cheap: capacity is a count comparison and proximity a bounded spiral over
//! loaded regions.

use glam::Vec3;
use mobcap_creature::{Category, SpeciesRegistry};
use serde::{Deserialize, Serialize};

use crate::world::WorldState;

/// Why the host wants to spawn a creature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnReason {
    /// Natural world spawning around players
    Natural,
    /// A spawner block or structure
    Spawner,
    /// Two animals breeding
    Breeding,
    /// Admin command or plugin; never denied
    Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Category or species capacity is used up
    CapacityReached,
    /// No player in the proximity radius of a natural spawn
    NoPlayerNearby,
    /// The region already holds the configured number of animals
    BreedingCap,
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DenyReason::CapacityReached => "capacity reached",
            DenyReason::NoPlayerNearby => "no player nearby",
            DenyReason::BreedingCap => "breeding cap",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnDecision {
    Allow,
    Deny(DenyReason),
}

impl SpawnDecision {
    pub fn is_allowed(self) -> bool {
        matches!(self, SpawnDecision::Allow)
    }
}

/// Decide whether `species` may spawn at `position` in `world`
pub fn check_spawn(
    world: &WorldState,
    registry: &SpeciesRegistry,
    species: &str,
    position: Vec3,
    reason: SpawnReason,
) -> SpawnDecision {
    if reason == SpawnReason::Command {
        return SpawnDecision::Allow;
    }
    let Some(category) = registry.category_of(species) else {
        return SpawnDecision::Allow;
    };
    let config = world.config();
    if config.despawn.is_ignored(species, Some(category)) {
        return SpawnDecision::Allow;
    }

    if !world.within_limit(species, registry) {
        return SpawnDecision::Deny(DenyReason::CapacityReached);
    }

    if reason == SpawnReason::Breeding
        && category == Category::Animal
        && let Some(cap) = config.spawn.breeding_cap
        && world.region_animals(position) >= cap
    {
        return SpawnDecision::Deny(DenyReason::BreedingCap);
    }

    if reason == SpawnReason::Natural
        && config.spawn.require_player_nearby
        && !world.player_near(position, registry.is_flying(species))
    {
        return SpawnDecision::Deny(DenyReason::NoPlayerNearby);
    }

    SpawnDecision::Allow
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CapConfig, WorldPopulationConfig};
    use crate::world::Cell;

    fn world(config: WorldPopulationConfig) -> WorldState {
        let mut world = WorldState::new("overworld", config);
        for x in -2..=2 {
            for z in -2..=2 {
                world.index.region_loaded(Cell::new(x, z));
            }
        }
        world.census.set_loaded_regions(256);
        world
    }

    #[test]
    fn test_capacity_denies() {
        let registry = SpeciesRegistry::new();
        let mut config = WorldPopulationConfig::default();
        config.caps.monster = CapConfig::new(Some(1), None);
        config.spawn.require_player_nearby = false;
        let mut world = world(config);

        let at = Vec3::new(1.0, 64.0, 1.0);
        assert_eq!(
            check_spawn(&world, &registry, "zombie", at, SpawnReason::Natural),
            SpawnDecision::Allow
        );
        world.increment("zombie", at, &registry);
        assert_eq!(
            check_spawn(&world, &registry, "zombie", at, SpawnReason::Spawner),
            SpawnDecision::Deny(DenyReason::CapacityReached)
        );
        assert!(check_spawn(&world, &registry, "zombie", at, SpawnReason::Command).is_allowed());
    }

    #[test]
    fn test_unknown_and_ignored_species_allowed() {
        let registry = SpeciesRegistry::new();
        let mut config = WorldPopulationConfig::default();
        config.caps.monster = CapConfig::new(Some(0), None);
        config.despawn.ignored_species.push("witch".to_string());
        let world = world(config);

        let at = Vec3::new(1.0, 64.0, 1.0);
        assert!(check_spawn(&world, &registry, "custom_boss", at, SpawnReason::Natural).is_allowed());
        assert!(check_spawn(&world, &registry, "witch", at, SpawnReason::Natural).is_allowed());
        assert!(!check_spawn(&world, &registry, "zombie", at, SpawnReason::Natural).is_allowed());
    }

    #[test]
    fn test_natural_spawn_needs_player() {
        let registry = SpeciesRegistry::new();
        let mut world = world(WorldPopulationConfig::default());
        let at = Vec3::new(1.0, 70.0, 1.0);

        assert_eq!(
            check_spawn(&world, &registry, "zombie", at, SpawnReason::Natural),
            SpawnDecision::Deny(DenyReason::NoPlayerNearby)
        );
        // Spawners do not need a player in range
        assert!(check_spawn(&world, &registry, "zombie", at, SpawnReason::Spawner).is_allowed());

        world.index.player_joined("alex", Vec3::new(20.0, 70.0, 20.0));
        assert!(check_spawn(&world, &registry, "zombie", at, SpawnReason::Natural).is_allowed());
    }

    #[test]
    fn test_flying_species_search_below() {
        let registry = SpeciesRegistry::new();
        let mut config = WorldPopulationConfig::default();
        config.proximity.layers = vec![
            crate::config::LayerRange::new(0, 80),
            crate::config::LayerRange::new(200, 320),
        ];
        config.proximity.flight_extra_depth = 150;
        let mut world = world(config);
        world.index.player_joined("alex", Vec3::new(1.0, 70.0, 1.0));

        let high = Vec3::new(1.0, 210.0, 1.0);
        assert!(check_spawn(&world, &registry, "phantom", high, SpawnReason::Natural).is_allowed());
        assert_eq!(
            check_spawn(&world, &registry, "zombie", high, SpawnReason::Natural),
            SpawnDecision::Deny(DenyReason::NoPlayerNearby)
        );
    }

    #[test]
    fn test_breeding_cap() {
        let registry = SpeciesRegistry::new();
        let mut config = WorldPopulationConfig::default();
        config.spawn.breeding_cap = Some(2);
        let mut world = world(config);
        let pen = Vec3::new(3.0, 64.0, 3.0);

        world.increment("cow", pen, &registry);
        assert!(check_spawn(&world, &registry, "cow", pen, SpawnReason::Breeding).is_allowed());
        world.increment("sheep", pen, &registry);
        assert_eq!(
            check_spawn(&world, &registry, "cow", pen, SpawnReason::Breeding),
            SpawnDecision::Deny(DenyReason::BreedingCap)
        );
        // Another region is unaffected
        assert!(
            check_spawn(&world, &registry, "cow", Vec3::new(40.0, 64.0, 3.0), SpawnReason::Breeding)
                .is_allowed()
        );
    }
}
