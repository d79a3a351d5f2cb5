//! End-to-end runs of the simulated host against the population engine

use mobcap::{AppConfig, SimulatedHost, run_simulation};
use mobcap_core::{PopulationEngine, ScanMode};
use mobcap_creature::{Category, PlayerDirectory, WorldEngine};

fn small_config(mode: ScanMode) -> AppConfig {
    let mut config = AppConfig::default();
    config.simulation.worlds = 2;
    config.simulation.creatures_per_world = 150;
    config.simulation.players = 3;
    config.simulation.view_distance_cells = 4;
    config.simulation.spawn_attempts_per_tick = 3;
    config.simulation.death_chance = 0.001;
    config.population.scan.mode = mode;
    config.population.scan.interval_ticks = 100;
    config
}

// ============================================================================
// Census consistency
// ============================================================================

#[test]
fn test_census_matches_host_after_sync_run() {
    let summary = run_simulation(&small_config(ScanMode::Sync), 450);

    assert!(summary.stats.scans >= 1, "no scan finished: {:?}", summary.stats);
    for (world, population, census) in &summary.worlds {
        assert_eq!(population, census, "census drifted in '{}'", world);
    }
}

#[test]
fn test_census_matches_host_after_async_run() {
    let summary = run_simulation(&small_config(ScanMode::Async), 450);

    for (world, population, census) in &summary.worlds {
        assert_eq!(population, census, "census drifted in '{}'", world);
    }
}

#[test]
fn test_spawns_and_deaths_happen() {
    let summary = run_simulation(&small_config(ScanMode::Sync), 300);
    let stats = &summary.stats;

    assert_eq!(stats.ticks, 300);
    assert!(stats.spawned + stats.denied_capacity + stats.denied_no_player > 0);
    assert!(stats.died > 0);
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_same_seed_same_outcome() {
    let mut config = small_config(ScanMode::Sync);
    // No scans, their per-tick budget is wall-clock based
    config.population.scan.enabled = false;

    let a = run_simulation(&config, 300);
    let b = run_simulation(&config, 300);

    assert_eq!(a.stats.spawned, b.stats.spawned);
    assert_eq!(a.stats.denied_capacity, b.stats.denied_capacity);
    assert_eq!(a.stats.died, b.stats.died);
    assert_eq!(a.worlds, b.worlds);
}

// ============================================================================
// Host wiring
// ============================================================================

#[test]
fn test_engine_sees_attached_players() {
    let config = small_config(ScanMode::Sync);
    let mut engine = PopulationEngine::new(config.population.clone());
    let mut host = SimulatedHost::new(config.simulation.clone(), &engine);
    host.attach(&mut engine);
    engine.start(&host);

    for player in host.online_players() {
        assert!(
            engine.player_near(&player.world, player.position, false),
            "{} not found near their own position",
            player.name
        );
    }
    for world in host.worlds() {
        let state = engine.world(&world).expect("world tracked");
        assert_eq!(state.census.loaded_regions(), host.loaded_regions(&world));
    }
}

#[test]
fn test_capacity_blocks_further_spawns() {
    let mut config = small_config(ScanMode::Sync);
    config.population.scan.enabled = false;
    config.simulation.creatures_per_world = 0;
    config.simulation.death_chance = 0.0;
    config.population.default_world.caps.monster.static_max = Some(5);
    config.population.default_world.caps.monster.dynamic_multiplier = None;

    let summary = run_simulation(&config, 400);
    for (world, _, census) in &summary.worlds {
        assert!(
            census[Category::Monster.index()] <= 5,
            "'{}' went over the monster cap",
            world
        );
    }
    assert!(summary.stats.denied_capacity > 0);
}

// ============================================================================
// Configuration layering
// ============================================================================

#[test]
fn test_load_explicit_ron_file() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let path = dir.path().join("mobcap.ron");
    std::fs::write(
        &path,
        r#"(
    simulation: (players: 9, seed: 7),
    population: (scan: (mode: "async", interval_ticks: 1200)),
)"#,
    )
    .expect("write config");

    let config = AppConfig::load(Some(&path)).expect("load config");

    assert_eq!(config.simulation.players, 9);
    assert_eq!(config.simulation.seed, 7);
    // Untouched keys keep their defaults
    assert_eq!(config.simulation.worlds, 2);
    assert_eq!(config.population.scan.mode, ScanMode::Async);
    assert_eq!(config.population.scan.interval_ticks, 1200);
}
