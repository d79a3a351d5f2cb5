//! Population control configuration - serializable per-world limits and scan settings
//!
//! Every section has compiled defaults so a partial RON file only needs the
//! values it changes. Malformed values are never fatal: [`PopulationConfig::sanitize`]
//! swaps them for safe defaults and logs a warning.

use std::collections::BTreeMap;
use std::path::Path;

use mobcap_creature::{Category, SpeciesDef, SpeciesRegistry};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read population config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse population config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Static and load-scaled limit for one category or species
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CapConfig {
    /// Hard ceiling; `None` means unlimited
    pub static_max: Option<u32>,
    /// Creatures allowed per 256 loaded regions; `None` disables the dynamic term
    pub dynamic_multiplier: Option<f32>,
}

impl CapConfig {
    pub fn new(static_max: Option<u32>, dynamic_multiplier: Option<f32>) -> Self {
        Self {
            static_max,
            dynamic_multiplier,
        }
    }

    pub fn unlimited() -> Self {
        Self::default()
    }
}

/// Per-category caps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryCaps {
    pub monster: CapConfig,
    pub animal: CapConfig,
    pub water_animal: CapConfig,
    pub ambient: CapConfig,
    pub villager: CapConfig,
}

impl CategoryCaps {
    pub fn get(&self, category: Category) -> &CapConfig {
        match category {
            Category::Monster => &self.monster,
            Category::Animal => &self.animal,
            Category::WaterAnimal => &self.water_animal,
            Category::Ambient => &self.ambient,
            Category::Villager => &self.villager,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut CapConfig {
        match category {
            Category::Monster => &mut self.monster,
            Category::Animal => &mut self.animal,
            Category::WaterAnimal => &mut self.water_animal,
            Category::Ambient => &mut self.ambient,
            Category::Villager => &mut self.villager,
        }
    }
}

impl Default for CategoryCaps {
    fn default() -> Self {
        Self {
            monster: CapConfig::new(Some(200), Some(64.0)),
            animal: CapConfig::new(Some(150), Some(48.0)),
            water_animal: CapConfig::new(Some(40), Some(16.0)),
            ambient: CapConfig::new(Some(15), Some(8.0)),
            villager: CapConfig::new(Some(60), None),
        }
    }
}

/// Census refresh settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CensusConfig {
    /// Minimum ticks between two full recounts
    pub refresh_interval_ticks: u64,
    /// Count tamed animals against the animal cap
    pub count_tamed_animals: bool,
}

impl Default for CensusConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ticks: 200,
            count_tamed_animals: true,
        }
    }
}

/// Inclusive vertical band tracked for player presence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerRange {
    pub min_y: i32,
    pub max_y: i32,
}

impl LayerRange {
    pub fn new(min_y: i32, max_y: i32) -> Self {
        Self { min_y, max_y }
    }

    pub fn is_valid(&self) -> bool {
        self.min_y <= self.max_y
    }
}

/// Spawn-time proximity search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    /// Vertical bands, overlapping bands are allowed
    pub layers: Vec<LayerRange>,
    /// Search radius in regions above ground
    pub search_radius_cells: i32,
    /// Search radius in regions below `ground_height`
    pub underground_search_radius_cells: i32,
    /// Heights below this use the underground radii
    pub ground_height: i32,
    /// Extra depth below a flying creature searched for players
    pub flight_extra_depth: i32,
}

impl ProximityConfig {
    pub fn default_layers() -> Vec<LayerRange> {
        vec![
            LayerRange::new(-64, 16),
            LayerRange::new(0, 80),
            LayerRange::new(64, 144),
            LayerRange::new(128, 320),
        ]
    }
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            layers: Self::default_layers(),
            search_radius_cells: 5,
            underground_search_radius_cells: 3,
            ground_height: 50,
            flight_extra_depth: 32,
        }
    }
}

/// Spawn gate settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Deny natural spawns with no player in the proximity radius
    pub require_player_nearby: bool,
    /// Animals per region above which breeding is denied
    pub breeding_cap: Option<u32>,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            require_player_nearby: true,
            breeding_cap: Some(24),
        }
    }
}

/// Despawn classification settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DespawnConfig {
    pub enabled: bool,
    /// Planar player search radius in blocks
    pub search_radius: f32,
    /// Vertical player search distance in blocks
    pub search_height: f32,
    /// Radius used for creatures below the ground height
    pub underground_search_radius: f32,
    pub underground_search_height: f32,
    /// Creatures younger than this are never despawned
    pub min_age_ticks: u64,
    /// Bred and owned animals are tracked; animals only despawn while enabled
    pub animal_protection: bool,
    pub despawn_tamed: bool,
    /// Regions holding this many animals or more count as farms
    pub farm_threshold: u32,
    pub ignored_categories: Vec<Category>,
    pub ignored_species: Vec<String>,
}

impl DespawnConfig {
    /// Whether a creature is excluded from counting and despawning
    pub fn is_ignored(&self, species: &str, category: Option<Category>) -> bool {
        category.is_some_and(|c| self.ignored_categories.contains(&c))
            || self
                .ignored_species
                .iter()
                .any(|s| s.eq_ignore_ascii_case(species))
    }
}

impl Default for DespawnConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            search_radius: 64.0,
            search_height: 32.0,
            underground_search_radius: 32.0,
            underground_search_height: 16.0,
            min_age_ticks: 1200,
            animal_protection: true,
            despawn_tamed: false,
            farm_threshold: 5,
            ignored_categories: Vec::new(),
            ignored_species: Vec::new(),
        }
    }
}

/// Everything that can differ between worlds
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldPopulationConfig {
    pub caps: CategoryCaps,
    /// Individually capped species; species absent here are not tracked
    pub species_caps: BTreeMap<String, CapConfig>,
    pub census: CensusConfig,
    pub proximity: ProximityConfig,
    pub spawn: SpawnConfig,
    pub despawn: DespawnConfig,
}

impl WorldPopulationConfig {
    /// Replace malformed values with defaults, returning how many were fixed
    pub fn sanitize(&mut self, world: &str) -> usize {
        let mut fixed = 0;

        let layer_count = self.proximity.layers.len();
        self.proximity.layers.retain(|layer| {
            if !layer.is_valid() {
                log::warn!(
                    "[CONFIG] World '{}': dropping layer with min_y {} > max_y {}",
                    world,
                    layer.min_y,
                    layer.max_y
                );
            }
            layer.is_valid()
        });
        fixed += layer_count - self.proximity.layers.len();
        if self.proximity.layers.is_empty() {
            log::warn!("[CONFIG] World '{}': no valid layers, using defaults", world);
            self.proximity.layers = ProximityConfig::default_layers();
            fixed += 1;
        }
        self.proximity.layers.sort_by_key(|layer| (layer.min_y, layer.max_y));

        let defaults = ProximityConfig::default();
        for (name, value, default) in [
            (
                "search_radius_cells",
                &mut self.proximity.search_radius_cells,
                defaults.search_radius_cells,
            ),
            (
                "underground_search_radius_cells",
                &mut self.proximity.underground_search_radius_cells,
                defaults.underground_search_radius_cells,
            ),
            (
                "flight_extra_depth",
                &mut self.proximity.flight_extra_depth,
                defaults.flight_extra_depth,
            ),
        ] {
            if *value < 0 {
                log::warn!(
                    "[CONFIG] World '{}': negative {} ({}), using {}",
                    world,
                    name,
                    value,
                    default
                );
                *value = default;
                fixed += 1;
            }
        }

        let despawn_defaults = DespawnConfig::default();
        for (name, value, default) in [
            (
                "search_radius",
                &mut self.despawn.search_radius,
                despawn_defaults.search_radius,
            ),
            (
                "search_height",
                &mut self.despawn.search_height,
                despawn_defaults.search_height,
            ),
            (
                "underground_search_radius",
                &mut self.despawn.underground_search_radius,
                despawn_defaults.underground_search_radius,
            ),
            (
                "underground_search_height",
                &mut self.despawn.underground_search_height,
                despawn_defaults.underground_search_height,
            ),
        ] {
            if !value.is_finite() || *value < 0.0 {
                log::warn!(
                    "[CONFIG] World '{}': invalid despawn {} ({}), using {}",
                    world,
                    name,
                    value,
                    default
                );
                *value = default;
                fixed += 1;
            }
        }

        for category in Category::ALL {
            fixed += sanitize_cap(self.caps.get_mut(category), world, category.name());
        }
        for (species, cap) in self.species_caps.iter_mut() {
            fixed += sanitize_cap(cap, world, species);
        }

        fixed
    }

    /// Drop species caps and ignore entries naming no registered species,
    /// returning how many were dropped
    pub fn drop_unknown_species(&mut self, world: &str, registry: &SpeciesRegistry) -> usize {
        let before = self.species_caps.len() + self.despawn.ignored_species.len();
        self.species_caps.retain(|species, _| {
            let known = registry.get(species).is_some();
            if !known {
                log::warn!(
                    "[CONFIG] World '{}': cap for unknown species '{}' dropped",
                    world,
                    species
                );
            }
            known
        });
        self.despawn.ignored_species.retain(|species| {
            let known = registry.get(species).is_some();
            if !known {
                log::warn!(
                    "[CONFIG] World '{}': unknown species '{}' removed from the ignore list",
                    world,
                    species
                );
            }
            known
        });
        before - self.species_caps.len() - self.despawn.ignored_species.len()
    }
}

fn sanitize_cap(cap: &mut CapConfig, world: &str, name: &str) -> usize {
    match cap.dynamic_multiplier {
        Some(multiplier) if !multiplier.is_finite() || multiplier < 0.0 => {
            log::warn!(
                "[CONFIG] World '{}': invalid dynamic multiplier {} for '{}', ignoring it",
                world,
                multiplier,
                name
            );
            cap.dynamic_multiplier = None;
            1
        }
        _ => 0,
    }
}

/// How the despawn scanner classifies creatures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Classify and remove on the tick loop
    #[default]
    Sync,
    /// Classify on a worker thread, remove on the tick loop
    Async,
}

/// Despawn scanner scheduling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub enabled: bool,
    pub mode: ScanMode,
    /// Wall-clock budget per tick for scanning and removal
    pub tick_budget_micros: u64,
    /// Ticks between two scan requests
    pub interval_ticks: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: ScanMode::Sync,
            tick_budget_micros: 500,
            interval_ticks: 600,
        }
    }
}

/// Root configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Used for every world without an explicit entry
    pub default_world: WorldPopulationConfig,
    pub worlds: BTreeMap<String, WorldPopulationConfig>,
    pub scan: ScanConfig,
    /// Species added to (or replacing) the built-in registry
    pub species: Vec<SpeciesDef>,
}

impl PopulationConfig {
    /// Parse a RON preset and sanitize it
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let mut config: Self = ron::from_str(source)?;
        config.sanitize();
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_ron_str(&source)?;
        log::info!(
            "[CONFIG] Loaded population config from {} ({} world overrides)",
            path.as_ref().display(),
            config.worlds.len()
        );
        Ok(config)
    }

    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Settings for a world, falling back to `default_world`
    pub fn world(&self, name: &str) -> &WorldPopulationConfig {
        self.worlds.get(name).unwrap_or(&self.default_world)
    }

    /// Drop references to species missing from `registry` in every world
    pub fn drop_unknown_species(&mut self, registry: &SpeciesRegistry) -> usize {
        let mut dropped = self.default_world.drop_unknown_species("<default>", registry);
        for (name, world) in self.worlds.iter_mut() {
            dropped += world.drop_unknown_species(name, registry);
        }
        dropped
    }

    /// Replace malformed values everywhere, returning how many were fixed
    pub fn sanitize(&mut self) -> usize {
        let mut fixed = self.default_world.sanitize("<default>");
        for (name, world) in self.worlds.iter_mut() {
            fixed += world.sanitize(name);
        }
        if self.scan.tick_budget_micros == 0 {
            log::warn!("[CONFIG] Scan tick budget of 0us, using default");
            self.scan.tick_budget_micros = ScanConfig::default().tick_budget_micros;
            fixed += 1;
        }
        if self.scan.interval_ticks == 0 {
            log::warn!("[CONFIG] Scan interval of 0 ticks, using default");
            self.scan.interval_ticks = ScanConfig::default().interval_ticks;
            fixed += 1;
        }
        fixed
    }
}
