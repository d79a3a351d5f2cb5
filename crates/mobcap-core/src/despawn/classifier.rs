//! Despawn decision over an ordered rule chain

use std::sync::atomic::{AtomicBool, Ordering};

use super::rules::{DespawnRule, KeepReason, RuleContext, RuleOutcome, Verdict, standard_rules};

/// Ordered despawn rule chain. A creature despawns only if every rule
/// passes; the first keep short-circuits.
pub struct DespawnClassifier {
    rules: Vec<Box<dyn DespawnRule>>,
    error_logged: AtomicBool,
}

impl DespawnClassifier {
    pub fn standard() -> Self {
        Self::with_rules(standard_rules())
    }

    pub fn with_rules(rules: Vec<Box<dyn DespawnRule>>) -> Self {
        Self {
            rules,
            error_logged: AtomicBool::new(false),
        }
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|rule| rule.name())
    }

    pub fn classify(&self, ctx: &RuleContext<'_>) -> Verdict {
        for rule in &self.rules {
            match rule.evaluate(ctx) {
                Ok(RuleOutcome::Pass) => {}
                Ok(RuleOutcome::Keep(reason)) => return Verdict::Keep(reason),
                Err(err) => {
                    if self
                        .error_logged
                        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
                        .is_ok()
                    {
                        log::warn!(
                            "[DESPAWN] Rule '{}' failed for {}, keeping it (further failures are silent): {}",
                            rule.name(),
                            ctx.creature.id,
                            err
                        );
                    }
                    return Verdict::Keep(KeepReason::Error);
                }
            }
        }
        Verdict::Despawn
    }

    pub fn should_despawn(&self, ctx: &RuleContext<'_>) -> bool {
        self.classify(ctx).is_despawn()
    }
}

impl Default for DespawnClassifier {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for DespawnClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DespawnClassifier")
            .field("rules", &self.rule_names().collect::<Vec<_>>())
            .finish()
    }
}
