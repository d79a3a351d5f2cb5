//! Driver configuration with layered loading
//!
//! Configuration is loaded from multiple sources (lowest to highest priority):
//! 1. Compiled defaults
//! 2. `mobcap.ron` file (if exists), or the file given with `--config`
//! 3. Environment variables prefixed with `MOBCAP_`
//!
//! Example environment variable: `MOBCAP_SIMULATION__PLAYERS=8`

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use mobcap_core::PopulationConfig;
use serde::{Deserialize, Serialize};

/// Everything the headless driver reads
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub population: PopulationConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Simulated host settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Worlds to simulate; the first is "overworld", then "world_1", ...
    pub worlds: usize,
    /// Creatures present in each world before the first tick
    pub creatures_per_world: usize,
    /// Players, spread round-robin over the worlds
    pub players: usize,
    /// Regions loaded around each player, in cells
    pub view_distance_cells: i32,
    /// Natural spawn attempts per world and tick
    pub spawn_attempts_per_tick: usize,
    /// Per-tick chance that a creature dies on its own
    pub death_chance: f64,
    /// Player walking speed in blocks per tick
    pub player_speed: f32,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            worlds: 2,
            creatures_per_world: 1500,
            players: 4,
            view_distance_cells: 8,
            spawn_attempts_per_tick: 12,
            death_chance: 0.0005,
            player_speed: 0.2,
            seed: 42,
        }
    }
}

impl AppConfig {
    /// Load configuration with layered priority:
    /// 1. Compiled defaults (lowest priority)
    /// 2. `path` if given (must exist), otherwise `mobcap.ron` (optional)
    /// 3. Environment variables prefixed with `MOBCAP_` (highest priority)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = SimulationConfig::default();
        let file = match path {
            Some(path) => File::from(path).format(FileFormat::Ron).required(true),
            None => File::with_name("mobcap")
                .format(FileFormat::Ron)
                .required(false),
        };

        let builder = Config::builder()
            // Layer 1: Compiled defaults; population defaults come from serde
            .set_default("simulation.worlds", defaults.worlds as i64)?
            .set_default(
                "simulation.creatures_per_world",
                defaults.creatures_per_world as i64,
            )?
            .set_default("simulation.players", defaults.players as i64)?
            .set_default(
                "simulation.view_distance_cells",
                defaults.view_distance_cells as i64,
            )?
            .set_default(
                "simulation.spawn_attempts_per_tick",
                defaults.spawn_attempts_per_tick as i64,
            )?
            .set_default("simulation.death_chance", defaults.death_chance)?
            .set_default("simulation.player_speed", defaults.player_speed as f64)?
            .set_default("simulation.seed", defaults.seed as i64)?
            // Layer 2: Config file
            .add_source(file)
            // Layer 3: Environment variables (MOBCAP_SIMULATION__SEED, etc.)
            .add_source(
                Environment::with_prefix("MOBCAP")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build().context("Failed to build configuration")?;

        let mut app: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        let fixed = app.population.sanitize();
        if fixed > 0 {
            log::warn!("[CONFIG] Replaced {} malformed values with defaults", fixed);
        }
        Ok(app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mobcap_core::ScanMode;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.simulation.worlds, 2);
        assert_eq!(config.simulation.seed, 42);
        assert_eq!(config.population.scan.mode, ScanMode::Sync);
    }

    #[test]
    fn test_load_config_with_defaults() {
        // Should load defaults when no config file exists
        let config = AppConfig::load(None).expect("Failed to load config");
        assert_eq!(config.simulation.players, 4);
        assert_eq!(config.population.scan.interval_ticks, 600);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(AppConfig::load(Some(Path::new("does/not/exist.ron"))).is_err());
    }
}
