//! Census and proximity state of a single world

use glam::Vec3;
use mobcap_creature::{Category, CreatureSnapshot, SpeciesRegistry};

use crate::config::WorldPopulationConfig;

use super::{Cell, ProximityIndex, WorldCensus};

/// All population state of one world
#[derive(Debug, Clone)]
pub struct WorldState {
    name: String,
    config: WorldPopulationConfig,
    pub census: WorldCensus,
    pub index: ProximityIndex,
}

impl WorldState {
    pub fn new(name: impl Into<String>, config: WorldPopulationConfig) -> Self {
        let index = ProximityIndex::new(config.proximity.layers.clone());
        Self {
            name: name.into(),
            config,
            census: WorldCensus::new(),
            index,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &WorldPopulationConfig {
        &self.config
    }

    /// Full recount from the host's creature list, subject to the census
    /// cooldown. Region animal counts are re-tallied alongside.
    pub fn recount(
        &mut self,
        now: u64,
        loaded_regions: usize,
        entities: &[CreatureSnapshot],
        species: &SpeciesRegistry,
    ) -> bool {
        if !self
            .census
            .recount(now, loaded_regions, entities, species, &self.config)
        {
            return false;
        }

        for region in self.index.regions_mut() {
            region.reset_animals();
        }
        for creature in entities {
            if species.category_of(&creature.species) != Some(Category::Animal)
                || !WorldCensus::is_counted(creature, species, &self.config)
            {
                continue;
            }
            if let Some(region) = self.index.region_mut(Cell::containing(creature.position)) {
                region.add_animal();
            }
        }

        log::debug!(
            "[CENSUS] World '{}' recounted at tick {}: {} monsters, {} animals, {} regions",
            self.name,
            now,
            self.census.count(Category::Monster),
            self.census.count(Category::Animal),
            loaded_regions
        );
        true
    }

    /// Spawn-side proximity check at a block position
    pub fn player_near(&self, position: Vec3, allow_flight_depth: bool) -> bool {
        self.index.player_near(
            Cell::containing(position),
            position.y.floor() as i32,
            allow_flight_depth,
            &self.config.proximity,
        )
    }

    pub fn within_limit(&self, species: &str, registry: &SpeciesRegistry) -> bool {
        self.census.within_limit(species, registry, &self.config)
    }

    pub fn is_over_capacity(&self, category: Category) -> bool {
        self.census.is_over_capacity(category, &self.config)
    }

    /// Animals counted in the region containing `position`
    pub fn region_animals(&self, position: Vec3) -> u32 {
        self.index
            .region(Cell::containing(position))
            .map_or(0, |region| region.animals())
    }

    /// Confirmed spawn of `species` at `position`
    pub fn increment(&mut self, species: &str, position: Vec3, registry: &SpeciesRegistry) {
        self.census.increment(species, registry, &self.config);
        if self.tracks_region_animal(species, registry)
            && let Some(region) = self.index.region_mut(Cell::containing(position))
        {
            region.add_animal();
        }
    }

    /// Confirmed death or removal of `species` at `position`
    pub fn decrement(&mut self, species: &str, position: Vec3, registry: &SpeciesRegistry) {
        self.census.decrement(species, registry, &self.config);
        if self.tracks_region_animal(species, registry)
            && let Some(region) = self.index.region_mut(Cell::containing(position))
        {
            region.remove_animal();
        }
    }

    fn tracks_region_animal(&self, species: &str, registry: &SpeciesRegistry) -> bool {
        let category = registry.category_of(species);
        category == Some(Category::Animal) && !self.config.despawn.is_ignored(species, category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CapConfig;
    use mobcap_creature::EntityId;

    fn cow_at(x: f32, z: f32) -> CreatureSnapshot {
        CreatureSnapshot::new(EntityId::new(), "cow", "overworld", Vec3::new(x, 64.0, z))
    }

    fn world_with_regions() -> WorldState {
        let mut world = WorldState::new("overworld", WorldPopulationConfig::default());
        world.index.region_loaded(Cell::new(0, 0));
        world.index.region_loaded(Cell::new(1, 0));
        world
    }

    #[test]
    fn test_recount_tallies_region_animals() {
        let registry = SpeciesRegistry::new();
        let mut world = world_with_regions();
        let entities = vec![cow_at(1.0, 1.0), cow_at(2.0, 2.0), cow_at(17.0, 1.0)];

        assert!(world.recount(0, 2, &entities, &registry));
        assert_eq!(world.region_animals(Vec3::new(5.0, 64.0, 5.0)), 2);
        assert_eq!(world.region_animals(Vec3::new(20.0, 64.0, 5.0)), 1);
        assert_eq!(world.census.count(Category::Animal), 3);
    }

    #[test]
    fn test_recount_resets_stale_region_animals() {
        let registry = SpeciesRegistry::new();
        let mut world = world_with_regions();
        world.increment("cow", Vec3::new(1.0, 64.0, 1.0), &registry);
        world.increment("cow", Vec3::new(1.0, 64.0, 1.0), &registry);
        assert_eq!(world.region_animals(Vec3::ZERO), 2);

        world.recount(0, 2, &[cow_at(1.0, 1.0)], &registry);
        assert_eq!(world.region_animals(Vec3::ZERO), 1);
    }

    #[test]
    fn test_increment_decrement_touch_region() {
        let registry = SpeciesRegistry::new();
        let mut world = world_with_regions();
        let position = Vec3::new(3.0, 64.0, 3.0);

        world.increment("sheep", position, &registry);
        world.increment("zombie", position, &registry);
        assert_eq!(world.region_animals(position), 1);

        world.decrement("sheep", position, &registry);
        world.decrement("sheep", position, &registry);
        assert_eq!(world.region_animals(position), 0);
        assert_eq!(world.census.count(Category::Monster), 1);
    }

    #[test]
    fn test_within_limit_uses_world_config() {
        let registry = SpeciesRegistry::new();
        let mut config = WorldPopulationConfig::default();
        config.caps.monster = CapConfig::new(Some(1), None);
        let mut world = WorldState::new("nether", config);

        assert!(world.within_limit("zombie", &registry));
        world.increment("zombie", Vec3::ZERO, &registry);
        assert!(!world.within_limit("zombie", &registry));
        assert!(world.within_limit("cow", &registry));
    }

    #[test]
    fn test_player_near_block_position() {
        let mut world = world_with_regions();
        world.index.player_joined("alex", Vec3::new(20.0, 70.0, 4.0));
        assert!(world.player_near(Vec3::new(1.0, 70.0, 1.0), false));
        assert!(!world.player_near(Vec3::new(1000.0, 70.0, 1.0), false));
    }
}
