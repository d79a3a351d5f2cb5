//! Creature categories and species registry

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Coarse creature grouping sharing one capacity pool per world
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Hostile creatures (zombies, skeletons, ...)
    Monster,
    /// Farmable, breedable creatures
    Animal,
    /// Fish, squid and other swimmers
    WaterAnimal,
    /// Decorative creatures such as bats
    Ambient,
    /// Villagers and traders, permanent unless the world is over capacity
    Villager,
}

impl Category {
    pub const COUNT: usize = 5;

    pub const ALL: [Category; Category::COUNT] = [
        Category::Monster,
        Category::Animal,
        Category::WaterAnimal,
        Category::Ambient,
        Category::Villager,
    ];

    /// Dense index for per-category count arrays
    pub fn index(self) -> usize {
        match self {
            Category::Monster => 0,
            Category::Animal => 1,
            Category::WaterAnimal => 2,
            Category::Ambient => 3,
            Category::Villager => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Category::Monster => "monster",
            Category::Animal => "animal",
            Category::WaterAnimal => "water_animal",
            Category::Ambient => "ambient",
            Category::Villager => "villager",
        }
    }

    /// Parse a configuration name, case-insensitive
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A specific creature kind and the category it counts against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesDef {
    pub name: String,
    pub category: Category,
    /// Flying species get the extra layer depth in proximity searches
    #[serde(default)]
    pub flying: bool,
}

impl SpeciesDef {
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            category,
            flying: false,
        }
    }

    pub fn flying(mut self) -> Self {
        self.flying = true;
        self
    }
}

/// Species name → definition lookup
///
/// Unknown species classify to no category at all; callers treat them as
/// uncounted and never blocked.
#[derive(Debug, Clone)]
pub struct SpeciesRegistry {
    species: AHashMap<String, SpeciesDef>,
}

impl SpeciesRegistry {
    /// Create an empty registry
    pub fn empty() -> Self {
        Self {
            species: AHashMap::new(),
        }
    }

    /// Create a registry with the built-in species
    pub fn new() -> Self {
        let mut registry = Self::empty();

        for name in [
            "zombie", "skeleton", "creeper", "spider", "enderman", "witch", "slime", "drowned",
        ] {
            registry.register(SpeciesDef::new(name, Category::Monster));
        }
        registry.register(SpeciesDef::new("phantom", Category::Monster).flying());

        for name in [
            "cow", "pig", "sheep", "chicken", "horse", "wolf", "cat", "rabbit", "goat",
        ] {
            registry.register(SpeciesDef::new(name, Category::Animal));
        }
        registry.register(SpeciesDef::new("parrot", Category::Animal).flying());

        for name in ["squid", "cod", "salmon", "dolphin"] {
            registry.register(SpeciesDef::new(name, Category::WaterAnimal));
        }

        registry.register(SpeciesDef::new("bat", Category::Ambient).flying());

        for name in ["villager", "wandering_trader"] {
            registry.register(SpeciesDef::new(name, Category::Villager));
        }

        registry
    }

    /// Register or replace a species definition
    pub fn register(&mut self, def: SpeciesDef) {
        let key = def.name.to_ascii_lowercase();
        if let Some(previous) = self.species.insert(key, def) {
            log::debug!("[SPECIES] Replaced definition for '{}'", previous.name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&SpeciesDef> {
        self.species.get(name).or_else(|| {
            // Slow path for mixed-case host names
            self.species.get(&name.to_ascii_lowercase())
        })
    }

    /// Category of a species, `None` for unknown species
    pub fn category_of(&self, name: &str) -> Option<Category> {
        self.get(name).map(|def| def.category)
    }

    pub fn is_flying(&self, name: &str) -> bool {
        self.get(name).is_some_and(|def| def.flying)
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpeciesDef> {
        self.species.values()
    }
}

impl Default for SpeciesRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_indices_are_dense() {
        for (i, category) in Category::ALL.iter().enumerate() {
            assert_eq!(category.index(), i);
        }
    }

    #[test]
    fn test_category_from_name() {
        assert_eq!(Category::from_name("Monster"), Some(Category::Monster));
        assert_eq!(
            Category::from_name(" water_animal "),
            Some(Category::WaterAnimal)
        );
        assert_eq!(Category::from_name("dragon"), None);
    }

    #[test]
    fn test_builtin_species() {
        let registry = SpeciesRegistry::new();
        assert_eq!(registry.category_of("zombie"), Some(Category::Monster));
        assert_eq!(registry.category_of("cow"), Some(Category::Animal));
        assert_eq!(registry.category_of("villager"), Some(Category::Villager));
        assert!(registry.is_flying("bat"));
        assert!(!registry.is_flying("cow"));
    }

    #[test]
    fn test_unknown_species_has_no_category() {
        let registry = SpeciesRegistry::new();
        assert_eq!(registry.category_of("custom_boss"), None);
        assert!(!registry.is_flying("custom_boss"));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = SpeciesRegistry::new();
        assert_eq!(registry.category_of("ZOMBIE"), Some(Category::Monster));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = SpeciesRegistry::empty();
        registry.register(SpeciesDef::new("golem", Category::Monster));
        registry.register(SpeciesDef::new("golem", Category::Villager));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.category_of("golem"), Some(Category::Villager));
    }
}
