//! What the despawn rules may read about a world
//!
//! [`LiveWorldView`] borrows the live state on the tick loop. [`WorldSnapshot`]
//! is an owned copy handed to a scan worker.

use std::f32::consts::PI;

use ahash::AHashMap;
use glam::Vec3;
use mobcap_creature::{Category, CreatureSnapshot, PlayerSnapshot};

use crate::config::WorldPopulationConfig;
use crate::world::{Cell, REGION_SIZE, WorldState, player_within};

pub trait WorldView {
    fn config(&self) -> &WorldPopulationConfig;

    fn is_over_capacity(&self, category: Category) -> bool;

    /// Animals counted in the region containing `position`
    fn region_animals(&self, position: Vec3) -> u32;

    /// Any player inside the despawn search volume around the creature
    fn player_near(&self, creature: &CreatureSnapshot) -> bool;
}

/// Despawn search radius and height for a creature at `y`
pub fn despawn_search_volume(config: &WorldPopulationConfig, y: f32) -> (f32, f32) {
    let despawn = &config.despawn;
    if y < config.proximity.ground_height as f32 {
        (despawn.underground_search_radius, despawn.underground_search_height)
    } else {
        (despawn.search_radius, despawn.search_height)
    }
}

/// Read-only view over live state, used by synchronous scans
pub struct LiveWorldView<'a> {
    state: &'a WorldState,
    /// Players in this world only
    players: &'a [PlayerSnapshot],
}

impl<'a> LiveWorldView<'a> {
    pub fn new(state: &'a WorldState, players: &'a [PlayerSnapshot]) -> Self {
        Self { state, players }
    }

    /// Walking the player list costs one comparison per player, the region
    /// index roughly πr² lookups. Pick the smaller.
    fn prefers_player_list(&self, radius_cells: i32) -> bool {
        let disc = PI * (radius_cells as f32) * (radius_cells as f32);
        self.players.len() as f32 <= disc.max(1.0)
    }
}

impl WorldView for LiveWorldView<'_> {
    fn config(&self) -> &WorldPopulationConfig {
        self.state.config()
    }

    fn is_over_capacity(&self, category: Category) -> bool {
        self.state.is_over_capacity(category)
    }

    fn region_animals(&self, position: Vec3) -> u32 {
        self.state.region_animals(position)
    }

    fn player_near(&self, creature: &CreatureSnapshot) -> bool {
        let position = creature.position;
        let (radius, height) = despawn_search_volume(self.state.config(), position.y);
        let radius_cells = (radius / REGION_SIZE as f32).ceil() as i32;

        if self.prefers_player_list(radius_cells) {
            player_within(self.players, position, radius, height)
        } else {
            // Band-granular: any band overlapping the vertical search span
            self.state.index.player_between(
                Cell::containing(position),
                (position.y - height).floor() as i32,
                (position.y + height).ceil() as i32,
                radius_cells,
            )
        }
    }
}

/// Owned capture of everything the rules read, safe to move to a worker
#[derive(Debug, Clone)]
pub struct WorldSnapshot {
    config: WorldPopulationConfig,
    over_capacity: [bool; Category::COUNT],
    region_animals: AHashMap<Cell, u32>,
    players: Vec<PlayerSnapshot>,
}

impl WorldSnapshot {
    pub fn capture(state: &WorldState, players: Vec<PlayerSnapshot>) -> Self {
        let mut over_capacity = [false; Category::COUNT];
        for category in Category::ALL {
            over_capacity[category.index()] = state.is_over_capacity(category);
        }
        let region_animals = state
            .index
            .regions()
            .filter(|region| region.animals() > 0)
            .map(|region| (region.cell, region.animals()))
            .collect();

        Self {
            config: state.config().clone(),
            over_capacity,
            region_animals,
            players,
        }
    }
}

impl WorldView for WorldSnapshot {
    fn config(&self) -> &WorldPopulationConfig {
        &self.config
    }

    fn is_over_capacity(&self, category: Category) -> bool {
        self.over_capacity[category.index()]
    }

    fn region_animals(&self, position: Vec3) -> u32 {
        self.region_animals
            .get(&Cell::containing(position))
            .copied()
            .unwrap_or(0)
    }

    fn player_near(&self, creature: &CreatureSnapshot) -> bool {
        let (radius, height) = despawn_search_volume(&self.config, creature.position.y);
        player_within(&self.players, creature.position, radius, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CapConfig;
    use mobcap_creature::{EntityId, SpeciesRegistry};

    fn creature_at(position: Vec3) -> CreatureSnapshot {
        CreatureSnapshot::new(EntityId::new(), "zombie", "overworld", position)
    }

    #[test]
    fn test_underground_volume() {
        let config = WorldPopulationConfig::default();
        assert_eq!(despawn_search_volume(&config, 10.0), (32.0, 16.0));
        assert_eq!(despawn_search_volume(&config, 70.0), (64.0, 32.0));
    }

    #[test]
    fn test_live_and_snapshot_agree() {
        let registry = SpeciesRegistry::new();
        let mut config = WorldPopulationConfig::default();
        config.caps.villager = CapConfig::new(Some(0), None);
        let mut state = WorldState::new("overworld", config);
        state.index.region_loaded(Cell::new(0, 0));
        state.increment("villager", Vec3::ZERO, &registry);
        state.increment("cow", Vec3::new(2.0, 64.0, 2.0), &registry);
        let players = vec![PlayerSnapshot::new("alex", "overworld", Vec3::new(40.0, 70.0, 0.0))];

        let live = LiveWorldView::new(&state, &players);
        let snapshot = WorldSnapshot::capture(&state, players.clone());

        let near = creature_at(Vec3::new(0.0, 70.0, 0.0));
        let far = creature_at(Vec3::new(500.0, 70.0, 0.0));
        for view in [&live as &dyn WorldView, &snapshot as &dyn WorldView] {
            assert!(view.is_over_capacity(Category::Villager));
            assert!(!view.is_over_capacity(Category::Monster));
            assert_eq!(view.region_animals(Vec3::new(8.0, 64.0, 8.0)), 1);
            assert_eq!(view.region_animals(Vec3::new(800.0, 64.0, 8.0)), 0);
            assert!(view.player_near(&near));
            assert!(!view.player_near(&far));
        }
    }

    #[test]
    fn test_many_players_use_region_index() {
        let mut state = WorldState::new("overworld", WorldPopulationConfig::default());
        for x in -6..=6 {
            for z in -6..=6 {
                state.index.region_loaded(Cell::new(x, z));
            }
        }
        // Far more players than cells in the search disc
        let players: Vec<PlayerSnapshot> = (0..100)
            .map(|i| PlayerSnapshot::new(format!("p{i}"), "overworld", Vec3::new(2000.0, 70.0, 0.0)))
            .collect();
        state.index.player_joined("near", Vec3::new(20.0, 70.0, 20.0));

        let live = LiveWorldView::new(&state, &players);
        assert!(!live.prefers_player_list(4));
        assert!(live.player_near(&creature_at(Vec3::new(0.0, 70.0, 0.0))));
    }

    #[test]
    fn test_region_index_applies_search_height() {
        let mut state = WorldState::new("overworld", WorldPopulationConfig::default());
        for x in -6..=6 {
            for z in -6..=6 {
                state.index.region_loaded(Cell::new(x, z));
            }
        }
        let mut players: Vec<PlayerSnapshot> = (0..60)
            .map(|i| PlayerSnapshot::new(format!("p{i}"), "overworld", Vec3::new(5000.0, 70.0, 0.0)))
            .collect();
        let above = Vec3::new(8.0, 85.0, 8.0);
        players.push(PlayerSnapshot::new("above", "overworld", above));
        state.index.player_joined("above", above);

        let live = LiveWorldView::new(&state, &players);
        assert!(!live.prefers_player_list(4));
        // 25 blocks below the player, inside the 32 block search height
        assert!(live.player_near(&creature_at(Vec3::new(8.0, 60.0, 8.0))));
        // Far below every band the player is in
        assert!(!live.player_near(&creature_at(Vec3::new(8.0, -40.0, 8.0))));
        // Same answer from the player list
        assert!(player_within(&players, Vec3::new(8.0, 60.0, 8.0), 64.0, 32.0));
    }
}
