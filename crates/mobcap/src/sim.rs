//! Simulated host world engine
//!
//! Players wander, regions load and unload around them, creatures spawn
//! through the engine's spawn gate and die on their own. Everything is driven
//! by one seeded RNG so runs are reproducible.

use ahash::{AHashMap, AHashSet};
use glam::Vec3;
use mobcap_core::world::{Cell, WorldCensus};
use mobcap_core::{DenyReason, PopulationEngine, SpawnDecision, SpawnReason};
use mobcap_creature::{
    Category, CreatureSnapshot, EntityId, HostError, PlayerDirectory, PlayerSnapshot, WorldEngine,
};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use web_time::Instant;

use crate::config::{AppConfig, SimulationConfig};

/// Spawn attempts land this far from a player, in blocks
const SPAWN_DISTANCE: f32 = 128.0;
/// Initial creatures are scattered over this half-width around the origin
const SCATTER: f32 = 600.0;

struct SimWorld {
    name: String,
    creatures: AHashMap<EntityId, CreatureSnapshot>,
    loaded: AHashSet<Cell>,
}

struct SimPlayer {
    name: String,
    world: usize,
    position: Vec3,
    heading: f32,
}

/// Counters collected while the simulation runs
#[derive(Debug, Clone, Default)]
pub struct SimulationStats {
    pub ticks: u64,
    pub spawned: u64,
    pub denied_capacity: u64,
    pub denied_no_player: u64,
    pub denied_breeding: u64,
    pub died: u64,
    pub scans: u64,
    pub removed_by_scans: u64,
}

pub struct SimulatedHost {
    tick: u64,
    rng: Xoshiro256PlusPlus,
    config: SimulationConfig,
    worlds: Vec<SimWorld>,
    players: Vec<SimPlayer>,
    species: Vec<(String, Category)>,
    pub stats: SimulationStats,
}

impl SimulatedHost {
    /// Build worlds and players and scatter the initial population
    pub fn new(config: SimulationConfig, engine: &PopulationEngine) -> Self {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(config.seed);

        let mut species: Vec<(String, Category)> = engine
            .species()
            .iter()
            .map(|def| (def.name.clone(), def.category))
            .collect();
        species.sort();

        let worlds = (0..config.worlds.max(1))
            .map(|i| SimWorld {
                name: if i == 0 {
                    "overworld".to_string()
                } else {
                    format!("world_{}", i)
                },
                creatures: AHashMap::new(),
                loaded: AHashSet::new(),
            })
            .collect::<Vec<_>>();

        let players = (0..config.players)
            .map(|i| SimPlayer {
                name: format!("player_{}", i),
                world: i % worlds.len(),
                position: Vec3::new(
                    rng.gen_range(-SCATTER..SCATTER),
                    rng.gen_range(40.0..120.0),
                    rng.gen_range(-SCATTER..SCATTER),
                ),
                heading: rng.gen_range(0.0..std::f32::consts::TAU),
            })
            .collect();

        let mut host = Self {
            tick: 0,
            rng,
            config,
            worlds,
            players,
            species,
            stats: SimulationStats::default(),
        };
        host.scatter_initial_population();
        host
    }

    fn scatter_initial_population(&mut self) {
        if self.species.is_empty() {
            return;
        }
        for world in 0..self.worlds.len() {
            for _ in 0..self.config.creatures_per_world {
                let (species, _) = &self.species[self.rng.gen_range(0..self.species.len())];
                let position = Vec3::new(
                    self.rng.gen_range(-SCATTER..SCATTER),
                    self.rng.gen_range(-40.0..200.0),
                    self.rng.gen_range(-SCATTER..SCATTER),
                );
                let mut creature =
                    CreatureSnapshot::new(EntityId::new(), species.clone(), "", position)
                        .with_age(self.rng.gen_range(0..24_000));
                creature.world = self.worlds[world].name.clone();
                creature.tamed = self.rng.gen_bool(0.05);
                creature.persistent = self.rng.gen_bool(0.02);
                self.worlds[world].creatures.insert(creature.id, creature);
            }
        }
    }

    /// Tell the engine about every loaded region and online player. Call
    /// before `PopulationEngine::start`.
    pub fn attach(&mut self, engine: &mut PopulationEngine) {
        for i in 0..self.players.len() {
            self.update_loaded_regions(engine, i);
        }
    }

    /// One game tick of host activity, reported to the engine as events
    pub fn advance(&mut self, engine: &mut PopulationEngine) {
        self.tick += 1;
        self.stats.ticks = self.tick;

        for i in 0..self.players.len() {
            self.move_player(engine, i);
        }
        for world in &mut self.worlds {
            for creature in world.creatures.values_mut() {
                creature.ticks_lived += 1;
            }
        }
        self.natural_deaths(engine);
        for world in 0..self.worlds.len() {
            for _ in 0..self.config.spawn_attempts_per_tick {
                self.attempt_spawn(engine, world);
            }
        }
    }

    fn move_player(&mut self, engine: &mut PopulationEngine, index: usize) {
        let turn = self.rng.gen_range(-0.1..0.1);
        let speed = self.config.player_speed;
        let player = &mut self.players[index];
        let previous = Cell::containing(player.position);
        player.heading += turn;
        player.position.x += player.heading.cos() * speed;
        player.position.z += player.heading.sin() * speed;

        let snapshot = self.player_snapshot(index);
        engine.player_moved(&snapshot);
        if Cell::containing(snapshot.position) != previous {
            self.update_loaded_regions(engine, index);
        }
    }

    fn player_snapshot(&self, index: usize) -> PlayerSnapshot {
        let player = &self.players[index];
        PlayerSnapshot::new(
            player.name.clone(),
            self.worlds[player.world].name.clone(),
            player.position,
        )
    }

    /// Load the view square around every player in the moved player's world
    /// and unload what nobody sees any more
    fn update_loaded_regions(&mut self, engine: &mut PopulationEngine, index: usize) {
        let world = self.players[index].world;
        let radius = self.config.view_distance_cells.max(0);
        let mut wanted = AHashSet::new();
        for player in self.players.iter().filter(|p| p.world == world) {
            let center = Cell::containing(player.position);
            for dx in -radius..=radius {
                for dz in -radius..=radius {
                    wanted.insert(center.offset(dx, dz));
                }
            }
        }

        let state = &mut self.worlds[world];
        for cell in wanted.difference(&state.loaded) {
            engine.region_loaded(&state.name, *cell);
        }
        for cell in state.loaded.difference(&wanted) {
            engine.region_unloaded(&state.name, *cell);
        }
        state.loaded = wanted;
    }

    fn natural_deaths(&mut self, engine: &mut PopulationEngine) {
        let chance = self.config.death_chance.clamp(0.0, 1.0);
        for world in &mut self.worlds {
            // Sorted first so the RNG draws do not depend on hash order
            let mut ids: Vec<EntityId> = world.creatures.keys().copied().collect();
            ids.sort();
            ids.retain(|_| self.rng.gen_bool(chance));
            for id in ids {
                if let Some(creature) = world.creatures.remove(&id) {
                    engine.creature_died(&creature);
                    self.stats.died += 1;
                }
            }
        }
    }

    fn attempt_spawn(&mut self, engine: &mut PopulationEngine, world: usize) {
        if self.species.is_empty() {
            return;
        }
        let anchor = self
            .players
            .iter()
            .filter(|p| p.world == world)
            .map(|p| p.position)
            .next()
            .unwrap_or(Vec3::new(0.0, 64.0, 0.0));
        let (species, category) = self.species[self.rng.gen_range(0..self.species.len())].clone();
        let position = anchor
            + Vec3::new(
                self.rng.gen_range(-SPAWN_DISTANCE..SPAWN_DISTANCE),
                self.rng.gen_range(-24.0..24.0),
                self.rng.gen_range(-SPAWN_DISTANCE..SPAWN_DISTANCE),
            );
        let reason = if category == Category::Animal && self.rng.gen_bool(0.1) {
            SpawnReason::Breeding
        } else {
            SpawnReason::Natural
        };

        let world_name = self.worlds[world].name.clone();
        match engine.check_spawn(&world_name, &species, position, reason) {
            SpawnDecision::Allow => {
                let creature = CreatureSnapshot::new(EntityId::new(), species, world_name, position);
                engine.creature_spawned(&creature);
                self.worlds[world].creatures.insert(creature.id, creature);
                self.stats.spawned += 1;
            }
            SpawnDecision::Deny(DenyReason::CapacityReached) => self.stats.denied_capacity += 1,
            SpawnDecision::Deny(DenyReason::NoPlayerNearby) => self.stats.denied_no_player += 1,
            SpawnDecision::Deny(DenyReason::BreedingCap) => self.stats.denied_breeding += 1,
        }
    }

    /// Living creatures per category in one world, counted the way the
    /// engine's census counts them
    pub fn population(&self, world: &str, engine: &PopulationEngine) -> [u32; Category::COUNT] {
        let mut counts = [0; Category::COUNT];
        let Some(state) = self.worlds.iter().find(|w| w.name == world) else {
            return counts;
        };
        let config = engine.config().world(world);
        for creature in state.creatures.values() {
            if !WorldCensus::is_counted(creature, engine.species(), config) {
                continue;
            }
            if let Some(category) = engine.species().category_of(&creature.species) {
                counts[category.index()] += 1;
            }
        }
        counts
    }

    pub fn world_names(&self) -> impl Iterator<Item = &str> {
        self.worlds.iter().map(|w| w.name.as_str())
    }

    pub fn creature_count(&self) -> usize {
        self.worlds.iter().map(|w| w.creatures.len()).sum()
    }
}

impl WorldEngine for SimulatedHost {
    fn worlds(&self) -> Vec<String> {
        self.worlds.iter().map(|w| w.name.clone()).collect()
    }

    fn loaded_regions(&self, world: &str) -> usize {
        self.worlds
            .iter()
            .find(|w| w.name == world)
            .map_or(0, |w| w.loaded.len())
    }

    fn living_entities(&self, world: &str) -> Vec<CreatureSnapshot> {
        let Some(state) = self.worlds.iter().find(|w| w.name == world) else {
            return Vec::new();
        };
        let mut creatures: Vec<CreatureSnapshot> = state.creatures.values().cloned().collect();
        creatures.sort_by_key(|c| c.id);
        creatures
    }

    fn current_tick(&self) -> u64 {
        self.tick
    }

    fn is_valid(&self, id: EntityId) -> bool {
        self.worlds.iter().any(|w| w.creatures.contains_key(&id))
    }

    fn remove(&mut self, id: EntityId) -> Result<(), HostError> {
        for world in &mut self.worlds {
            if world.creatures.remove(&id).is_some() {
                return Ok(());
            }
        }
        Err(HostError::EntityGone(id))
    }
}

impl PlayerDirectory for SimulatedHost {
    fn online_players(&self) -> Vec<PlayerSnapshot> {
        (0..self.players.len())
            .map(|i| self.player_snapshot(i))
            .collect()
    }
}

/// Outcome of a full run
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub stats: SimulationStats,
    /// Per world: host population and engine census per category
    pub worlds: Vec<(String, [u32; Category::COUNT], [u32; Category::COUNT])>,
    pub elapsed_ms: f64,
}

/// Drive a fresh engine and simulated host for `ticks` ticks
pub fn run_simulation(config: &AppConfig, ticks: u64) -> SimulationSummary {
    let started = Instant::now();
    let mut engine = PopulationEngine::new(config.population.clone());
    let mut host = SimulatedHost::new(config.simulation.clone(), &engine);
    host.attach(&mut engine);
    engine.start(&host);

    for _ in 0..ticks {
        host.advance(&mut engine);
        let was_running = engine.is_scan_running();
        engine.tick(&mut host);

        if was_running
            && !engine.is_scan_running()
            && let Some(report) = engine.last_scan_report()
        {
            host.stats.scans += 1;
            host.stats.removed_by_scans += report.total_removed();
        }
        if host.tick % 1200 == 0 {
            log::info!(
                "[SIM] Tick {}: {} creatures, {} spawned, {} died, {} removed by scans",
                host.tick,
                host.creature_count(),
                host.stats.spawned,
                host.stats.died,
                host.stats.removed_by_scans
            );
        }
    }
    engine.shutdown();

    let worlds = host
        .world_names()
        .map(|name| {
            let census = engine.world(name).map(|w| {
                let mut counts = [0; Category::COUNT];
                for category in Category::ALL {
                    counts[category.index()] = w.census.count(category);
                }
                counts
            });
            (
                name.to_string(),
                host.population(name, &engine),
                census.unwrap_or([0; Category::COUNT]),
            )
        })
        .collect();

    SimulationSummary {
        stats: host.stats.clone(),
        worlds,
        elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.simulation.worlds = 2;
        config.simulation.creatures_per_world = 100;
        config.simulation.players = 2;
        config.simulation.view_distance_cells = 3;
        config.simulation.spawn_attempts_per_tick = 2;
        config
    }

    #[test]
    fn test_initial_population() {
        let config = small_config();
        let engine = PopulationEngine::new(config.population.clone());
        let host = SimulatedHost::new(config.simulation, &engine);
        assert_eq!(host.creature_count(), 200);
        assert_eq!(host.worlds(), vec!["overworld", "world_1"]);
        assert_eq!(host.online_players().len(), 2);
    }

    #[test]
    fn test_attach_loads_view_squares() {
        let config = small_config();
        let mut engine = PopulationEngine::new(config.population.clone());
        let mut host = SimulatedHost::new(config.simulation, &engine);
        host.attach(&mut engine);

        // One player per world, 7x7 regions each
        assert_eq!(host.loaded_regions("overworld"), 49);
        assert_eq!(
            engine
                .world("overworld")
                .map(|w| w.index.loaded_regions()),
            Some(49)
        );
    }

    #[test]
    fn test_remove_unknown_entity() {
        let config = small_config();
        let engine = PopulationEngine::new(config.population.clone());
        let mut host = SimulatedHost::new(config.simulation, &engine);
        // Generated ids start at 1
        assert!(host.remove(EntityId::from_raw(0)).is_err());
    }

    #[test]
    fn test_same_seed_same_run() {
        let config = small_config();
        let a = run_simulation(&config, 200);
        let b = run_simulation(&config, 200);
        assert_eq!(a.stats.spawned, b.stats.spawned);
        assert_eq!(a.stats.died, b.stats.died);
        assert_eq!(a.worlds, b.worlds);
    }
}
