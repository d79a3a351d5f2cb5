//! Despawn rule chain
//!
//! Each rule either lets a creature through to the next rule or keeps it with
//! a reason. Rules are evaluated in order and the first keep wins.

use mobcap_creature::{CallSite, Category, CreatureSnapshot, EntityId, ProtectorSet};
use thiserror::Error;

use super::view::WorldView;

/// Why a creature was kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeepReason {
    /// Dead, unloaded or otherwise no longer valid
    Invalid,
    TooYoung,
    ProtectorVeto,
    Ignored,
    Persistent,
    /// Species missing from the registry
    UnknownSpecies,
    AnimalProtectionDisabled,
    Tamed,
    /// Recently bred, leashed or owned
    OwnedAnimal,
    Farm,
    VillagerWithinCapacity,
    PlayerItem,
    PlayerNearby,
    /// A rule failed; failures keep the creature
    Error,
}

/// Result of classifying one creature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Despawn,
    Keep(KeepReason),
}

impl Verdict {
    pub fn is_despawn(self) -> bool {
        matches!(self, Verdict::Despawn)
    }
}

/// Outcome of a single rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    Pass,
    Keep(KeepReason),
}

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("{id} has a non-finite position")]
    NonFinitePosition { id: EntityId },
    #[error("invalid despawn search volume: radius {radius}, height {height}")]
    InvalidSearchVolume { radius: f32, height: f32 },
}

/// Everything a rule may look at for one creature
pub struct RuleContext<'a> {
    pub creature: &'a CreatureSnapshot,
    /// `None` for species missing from the registry
    pub category: Option<Category>,
    pub world: &'a dyn WorldView,
    pub protectors: &'a ProtectorSet,
    pub call_site: CallSite,
    /// False skips the player proximity rule
    pub search_for_player: bool,
}

pub trait DespawnRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<RuleOutcome, ClassifyError>;
}

/// Valid and older than `min_age_ticks`
pub struct MinimumAge;

impl DespawnRule for MinimumAge {
    fn name(&self) -> &'static str {
        "minimum_age"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<RuleOutcome, ClassifyError> {
        if !ctx.creature.valid {
            return Ok(RuleOutcome::Keep(KeepReason::Invalid));
        }
        if ctx.creature.ticks_lived <= ctx.world.config().despawn.min_age_ticks {
            return Ok(RuleOutcome::Keep(KeepReason::TooYoung));
        }
        Ok(RuleOutcome::Pass)
    }
}

/// External protectors reachable from the current thread
pub struct ProtectorVeto;

impl DespawnRule for ProtectorVeto {
    fn name(&self) -> &'static str {
        "protector_veto"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<RuleOutcome, ClassifyError> {
        if ctx.protectors.can_despawn(ctx.creature, ctx.call_site) {
            Ok(RuleOutcome::Pass)
        } else {
            Ok(RuleOutcome::Keep(KeepReason::ProtectorVeto))
        }
    }
}

/// Per-world ignore lists, persistent creatures and unknown species
pub struct IgnoreList;

impl DespawnRule for IgnoreList {
    fn name(&self) -> &'static str {
        "ignore_list"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<RuleOutcome, ClassifyError> {
        let Some(category) = ctx.category else {
            return Ok(RuleOutcome::Keep(KeepReason::UnknownSpecies));
        };
        if ctx
            .world
            .config()
            .despawn
            .is_ignored(&ctx.creature.species, Some(category))
        {
            return Ok(RuleOutcome::Keep(KeepReason::Ignored));
        }
        if ctx.creature.persistent {
            return Ok(RuleOutcome::Keep(KeepReason::Persistent));
        }
        Ok(RuleOutcome::Pass)
    }
}

/// Animal and villager specific policy
pub struct CategoryPolicy;

impl DespawnRule for CategoryPolicy {
    fn name(&self) -> &'static str {
        "category_policy"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<RuleOutcome, ClassifyError> {
        let despawn = &ctx.world.config().despawn;
        let creature = ctx.creature;
        match ctx.category {
            Some(Category::Animal) => {
                if !despawn.animal_protection {
                    return Ok(RuleOutcome::Keep(KeepReason::AnimalProtectionDisabled));
                }
                if creature.tamed && !despawn.despawn_tamed {
                    return Ok(RuleOutcome::Keep(KeepReason::Tamed));
                }
                if creature.protected {
                    return Ok(RuleOutcome::Keep(KeepReason::OwnedAnimal));
                }
                if ctx.world.region_animals(creature.position) >= despawn.farm_threshold {
                    return Ok(RuleOutcome::Keep(KeepReason::Farm));
                }
                Ok(RuleOutcome::Pass)
            }
            Some(Category::Villager) if !ctx.world.is_over_capacity(Category::Villager) => {
                Ok(RuleOutcome::Keep(KeepReason::VillagerWithinCapacity))
            }
            _ => Ok(RuleOutcome::Pass),
        }
    }
}

/// Creatures holding something a player dropped
pub struct PlayerItem;

impl DespawnRule for PlayerItem {
    fn name(&self) -> &'static str {
        "player_item"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<RuleOutcome, ClassifyError> {
        if ctx.creature.carries_player_item() {
            Ok(RuleOutcome::Keep(KeepReason::PlayerItem))
        } else {
            Ok(RuleOutcome::Pass)
        }
    }
}

/// No player inside the despawn search volume
pub struct PlayerProximity;

impl DespawnRule for PlayerProximity {
    fn name(&self) -> &'static str {
        "player_proximity"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<RuleOutcome, ClassifyError> {
        if !ctx.search_for_player {
            return Ok(RuleOutcome::Pass);
        }
        if !ctx.creature.position.is_finite() {
            return Err(ClassifyError::NonFinitePosition {
                id: ctx.creature.id,
            });
        }
        let despawn = &ctx.world.config().despawn;
        for (radius, height) in [
            (despawn.search_radius, despawn.search_height),
            (
                despawn.underground_search_radius,
                despawn.underground_search_height,
            ),
        ] {
            if !(radius.is_finite() && height.is_finite()) || radius < 0.0 || height < 0.0 {
                return Err(ClassifyError::InvalidSearchVolume { radius, height });
            }
        }

        if ctx.world.player_near(ctx.creature) {
            Ok(RuleOutcome::Keep(KeepReason::PlayerNearby))
        } else {
            Ok(RuleOutcome::Pass)
        }
    }
}

/// The standard chain, in evaluation order
pub fn standard_rules() -> Vec<Box<dyn DespawnRule>> {
    vec![
        Box::new(MinimumAge),
        Box::new(ProtectorVeto),
        Box::new(IgnoreList),
        Box::new(CategoryPolicy),
        Box::new(PlayerItem),
        Box::new(PlayerProximity),
    ]
}
