//! Per-world creature counts and dynamic capacity

use ahash::AHashMap;
use mobcap_creature::{Category, CreatureSnapshot, SpeciesRegistry};

use crate::config::{CapConfig, WorldPopulationConfig};

/// Loaded regions per unit of dynamic multiplier
pub const CAPACITY_REGION_DIVISOR: f64 = 256.0;

/// Live ceiling for a category or species. `Unlimited` orders above every
/// finite limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Capacity {
    Limited(u32),
    Unlimited,
}

impl Capacity {
    /// `min(static_max, floor(multiplier * loaded_regions / 256))`, with unset
    /// terms dropping out
    pub fn compute(cap: &CapConfig, loaded_regions: usize) -> Self {
        let dynamic = cap
            .dynamic_multiplier
            .filter(|m| m.is_finite() && *m >= 0.0)
            .map(|m| {
                let scaled = (m as f64 * loaded_regions as f64 / CAPACITY_REGION_DIVISOR).floor();
                scaled.min(u32::MAX as f64) as u32
            });

        match (cap.static_max, dynamic) {
            (None, None) => Capacity::Unlimited,
            (Some(max), None) => Capacity::Limited(max),
            (None, Some(dynamic)) => Capacity::Limited(dynamic),
            (Some(max), Some(dynamic)) => Capacity::Limited(max.min(dynamic)),
        }
    }

    /// Room for one more creature
    pub fn allows(self, count: u32) -> bool {
        match self {
            Capacity::Limited(limit) => count < limit,
            Capacity::Unlimited => true,
        }
    }

    /// More creatures than the ceiling
    pub fn exceeded_by(self, count: u32) -> bool {
        match self {
            Capacity::Limited(limit) => count > limit,
            Capacity::Unlimited => false,
        }
    }
}

impl std::fmt::Display for Capacity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capacity::Limited(limit) => write!(f, "{}", limit),
            Capacity::Unlimited => f.write_str("unlimited"),
        }
    }
}

/// Category and tracked-species counts for one world
///
/// Full recounts happen at most once per `refresh_interval_ticks`; between
/// them spawn and death events adjust the counts by one.
#[derive(Debug, Clone, Default)]
pub struct WorldCensus {
    category_counts: [u32; Category::COUNT],
    /// Only species with an individual cap are tracked
    species_counts: AHashMap<String, u32>,
    loaded_regions: usize,
    /// Tick at which the next recount may run, `None` until the first one
    next_refresh_tick: Option<u64>,
}

impl WorldCensus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_refresh_due(&self, now: u64) -> bool {
        self.next_refresh_tick.is_none_or(|due| now >= due)
    }

    /// Make the next `recount` run regardless of the cooldown
    pub fn mark_dirty(&mut self) {
        self.next_refresh_tick = None;
    }

    /// Recount from a full creature list if the cooldown has elapsed.
    /// Returns whether a recount happened.
    pub fn recount(
        &mut self,
        now: u64,
        loaded_regions: usize,
        entities: &[CreatureSnapshot],
        species: &SpeciesRegistry,
        config: &WorldPopulationConfig,
    ) -> bool {
        if !self.is_refresh_due(now) {
            return false;
        }

        self.category_counts = [0; Category::COUNT];
        self.species_counts.clear();
        self.loaded_regions = loaded_regions;

        for creature in entities {
            if !Self::is_counted(creature, species, config) {
                continue;
            }
            if let Some(category) = species.category_of(&creature.species) {
                self.category_counts[category.index()] += 1;
            }
            if let Some(count) = self.tracked_count_mut(&creature.species, config) {
                *count += 1;
            }
        }

        self.next_refresh_tick = Some(now + config.census.refresh_interval_ticks);
        true
    }

    /// Whether a creature counts against any cap
    pub fn is_counted(
        creature: &CreatureSnapshot,
        species: &SpeciesRegistry,
        config: &WorldPopulationConfig,
    ) -> bool {
        if !creature.valid {
            return false;
        }
        let category = species.category_of(&creature.species);
        if config.despawn.is_ignored(&creature.species, category) {
            return false;
        }
        !(category == Some(Category::Animal)
            && creature.tamed
            && !config.census.count_tamed_animals)
    }

    fn tracked_count_mut(
        &mut self,
        species: &str,
        config: &WorldPopulationConfig,
    ) -> Option<&mut u32> {
        let key = config
            .species_caps
            .keys()
            .find(|name| name.eq_ignore_ascii_case(species))?;
        Some(self.species_counts.entry(key.clone()).or_insert(0))
    }

    pub fn set_loaded_regions(&mut self, loaded_regions: usize) {
        self.loaded_regions = loaded_regions;
    }

    pub fn loaded_regions(&self) -> usize {
        self.loaded_regions
    }

    pub fn count(&self, category: Category) -> u32 {
        self.category_counts[category.index()]
    }

    /// Count of an individually capped species, `None` if untracked
    pub fn species_count(&self, species: &str, config: &WorldPopulationConfig) -> Option<u32> {
        let key = config
            .species_caps
            .keys()
            .find(|name| name.eq_ignore_ascii_case(species))?;
        Some(self.species_counts.get(key).copied().unwrap_or(0))
    }

    pub fn capacity(&self, category: Category, config: &WorldPopulationConfig) -> Capacity {
        Capacity::compute(config.caps.get(category), self.loaded_regions)
    }

    pub fn species_capacity(&self, species: &str, config: &WorldPopulationConfig) -> Capacity {
        config
            .species_caps
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(species))
            .map_or(Capacity::Unlimited, |(_, cap)| {
                Capacity::compute(cap, self.loaded_regions)
            })
    }

    /// Room for one more creature of a category. Unknown categories are
    /// never blocked.
    pub fn category_within_limit(
        &self,
        category: Option<Category>,
        config: &WorldPopulationConfig,
    ) -> bool {
        match category {
            Some(category) => self.capacity(category, config).allows(self.count(category)),
            None => true,
        }
    }

    /// Room for one more creature of a species: its category cap and, if
    /// tracked, its own cap must both hold
    pub fn within_limit(
        &self,
        species: &str,
        registry: &SpeciesRegistry,
        config: &WorldPopulationConfig,
    ) -> bool {
        let category = registry.category_of(species);
        if !self.category_within_limit(category, config) {
            return false;
        }
        match self.species_count(species, config) {
            Some(count) => self.species_capacity(species, config).allows(count),
            None => true,
        }
    }

    pub fn is_over_capacity(&self, category: Category, config: &WorldPopulationConfig) -> bool {
        self.capacity(category, config)
            .exceeded_by(self.count(category))
    }

    /// Record one confirmed spawn
    pub fn increment(
        &mut self,
        species: &str,
        registry: &SpeciesRegistry,
        config: &WorldPopulationConfig,
    ) {
        let category = registry.category_of(species);
        if config.despawn.is_ignored(species, category) {
            return;
        }
        if let Some(category) = category {
            self.category_counts[category.index()] += 1;
        }
        if let Some(count) = self.tracked_count_mut(species, config) {
            *count += 1;
        }
    }

    /// Record one confirmed death or removal. Saturates at zero.
    pub fn decrement(
        &mut self,
        species: &str,
        registry: &SpeciesRegistry,
        config: &WorldPopulationConfig,
    ) {
        let category = registry.category_of(species);
        if config.despawn.is_ignored(species, category) {
            return;
        }
        if let Some(category) = category {
            let count = &mut self.category_counts[category.index()];
            *count = count.saturating_sub(1);
        }
        if let Some(count) = self.tracked_count_mut(species, config) {
            *count = count.saturating_sub(1);
        }
    }
}
