//! Explicit registry of per-world state

use ahash::AHashMap;

use crate::config::PopulationConfig;

use super::WorldState;

/// Owns the [`WorldState`] of every world the host has reported
#[derive(Debug)]
pub struct WorldRegistry {
    worlds: AHashMap<String, WorldState>,
    config: PopulationConfig,
}

impl WorldRegistry {
    pub fn new(config: PopulationConfig) -> Self {
        Self {
            worlds: AHashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &PopulationConfig {
        &self.config
    }

    /// State for `name`, created from its config on first use
    pub fn ensure_world(&mut self, name: &str) -> &mut WorldState {
        let config = &self.config;
        self.worlds.entry(name.to_string()).or_insert_with(|| {
            let world_config = config.world(name).clone();
            log::info!(
                "[WORLD] Tracking world '{}' ({} layers, {} capped species)",
                name,
                world_config.proximity.layers.len(),
                world_config.species_caps.len()
            );
            WorldState::new(name, world_config)
        })
    }

    pub fn get(&self, name: &str) -> Option<&WorldState> {
        self.worlds.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut WorldState> {
        self.worlds.get_mut(name)
    }

    pub fn world_unloaded(&mut self, name: &str) -> Option<WorldState> {
        let removed = self.worlds.remove(name);
        if removed.is_some() {
            log::info!("[WORLD] Stopped tracking world '{}'", name);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.worlds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.worlds.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.worlds.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CapConfig, WorldPopulationConfig};
    use mobcap_creature::Category;

    #[test]
    fn test_ensure_world_uses_override() {
        let mut config = PopulationConfig::default();
        let mut nether = WorldPopulationConfig::default();
        nether.caps.monster = CapConfig::new(Some(7), None);
        config.worlds.insert("nether".to_string(), nether);
        let mut registry = WorldRegistry::new(config);

        let nether = registry.ensure_world("nether");
        assert_eq!(nether.config().caps.get(Category::Monster).static_max, Some(7));
        let overworld = registry.ensure_world("overworld");
        assert_eq!(
            overworld.config().caps.get(Category::Monster).static_max,
            Some(200)
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_ensure_world_keeps_existing_state() {
        let mut registry = WorldRegistry::new(PopulationConfig::default());
        registry.ensure_world("overworld").census.set_loaded_regions(42);
        assert_eq!(registry.ensure_world("overworld").census.loaded_regions(), 42);
    }

    #[test]
    fn test_world_unloaded() {
        let mut registry = WorldRegistry::new(PopulationConfig::default());
        registry.ensure_world("end");
        assert!(registry.world_unloaded("end").is_some());
        assert!(registry.world_unloaded("end").is_none());
        assert!(registry.is_empty());
    }
}
