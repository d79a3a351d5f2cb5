//! Protector fan-out with graceful degradation
//!
//! A failing protector never blocks a decision: its error is logged the
//! first time it happens and the call is treated as "no veto". It keeps being
//! asked on later calls.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::snapshot::CreatureSnapshot;
use crate::traits::{Protector, ProtectorError};

/// Thread a protector query is made from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSite {
    /// The host tick loop; every protector may be asked
    MainThread,
    /// A scan worker; only protectors supporting async usage are asked
    Worker,
}

struct ProtectorEntry {
    protector: Box<dyn Protector>,
    warned: AtomicBool,
}

impl ProtectorEntry {
    fn warn_once(&self, operation: &'static str, err: &ProtectorError) {
        if self
            .warned
            .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
        {
            log::warn!(
                "[PROTECT] {} check failed, treating as no veto (further failures are silent): {}",
                operation,
                err
            );
        }
    }

    fn asked_from(&self, site: CallSite) -> bool {
        match site {
            CallSite::MainThread => true,
            CallSite::Worker => self.protector.supports_async_usage(),
        }
    }
}

/// All registered protectors. Cloning shares the same protectors.
#[derive(Clone, Default)]
pub struct ProtectorSet {
    entries: Vec<Arc<ProtectorEntry>>,
}

impl ProtectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, protector: Box<dyn Protector>) {
        log::info!(
            "[PROTECT] Registered protector '{}' (async usage: {})",
            protector.name(),
            protector.supports_async_usage()
        );
        self.entries.push(Arc::new(ProtectorEntry {
            protector,
            warned: AtomicBool::new(false),
        }));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether some protectors must be asked on the main thread after a
    /// worker-side decision
    pub fn has_main_thread_only(&self) -> bool {
        self.entries
            .iter()
            .any(|e| !e.protector.supports_async_usage())
    }

    /// False if any protector reachable from `site` vetoes the despawn
    pub fn can_despawn(&self, entity: &CreatureSnapshot, site: CallSite) -> bool {
        self.entries
            .iter()
            .filter(|e| e.asked_from(site))
            .all(|e| Self::allows_despawn(e, entity))
    }

    /// Ask only the protectors a worker had to skip
    pub fn can_despawn_main_thread_only(&self, entity: &CreatureSnapshot) -> bool {
        self.entries
            .iter()
            .filter(|e| !e.protector.supports_async_usage())
            .all(|e| Self::allows_despawn(e, entity))
    }

    /// False if any protector keeps abilities off this creature
    pub fn can_apply_abilities(&self, entity: &CreatureSnapshot) -> bool {
        self.entries
            .iter()
            .all(|e| match e.protector.can_apply_abilities(entity) {
                Ok(allowed) => allowed,
                Err(err) => {
                    e.warn_once("ability", &err);
                    true
                }
            })
    }

    fn allows_despawn(entry: &ProtectorEntry, entity: &CreatureSnapshot) -> bool {
        match entry.protector.can_despawn(entity) {
            Ok(allowed) => allowed,
            Err(err) => {
                entry.warn_once("despawn", &err);
                true
            }
        }
    }
}

impl std::fmt::Debug for ProtectorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| e.protector.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityId;
    use glam::Vec3;
    use std::sync::atomic::AtomicUsize;

    struct BossArena;

    impl Protector for BossArena {
        fn name(&self) -> &str {
            "boss_arena"
        }

        fn can_despawn(&self, entity: &CreatureSnapshot) -> Result<bool, ProtectorError> {
            Ok(entity.species != "wither")
        }

        fn can_apply_abilities(&self, _entity: &CreatureSnapshot) -> Result<bool, ProtectorError> {
            Ok(false)
        }

        fn supports_async_usage(&self) -> bool {
            true
        }
    }

    struct Broken {
        calls: Arc<AtomicUsize>,
    }

    impl Protector for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn can_despawn(&self, _entity: &CreatureSnapshot) -> Result<bool, ProtectorError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Err(ProtectorError::new("broken", "database offline"))
        }

        fn can_apply_abilities(&self, _entity: &CreatureSnapshot) -> Result<bool, ProtectorError> {
            Err(ProtectorError::new("broken", "database offline"))
        }
    }

    fn creature(species: &str) -> CreatureSnapshot {
        CreatureSnapshot::new(EntityId::new(), species, "overworld", Vec3::ZERO)
    }

    #[test]
    fn test_empty_set_never_vetoes() {
        let set = ProtectorSet::new();
        assert!(set.can_despawn(&creature("zombie"), CallSite::MainThread));
        assert!(set.can_apply_abilities(&creature("zombie")));
        assert!(!set.has_main_thread_only());
    }

    #[test]
    fn test_veto() {
        let mut set = ProtectorSet::new();
        set.register(Box::new(BossArena));
        assert!(!set.can_despawn(&creature("wither"), CallSite::Worker));
        assert!(set.can_despawn(&creature("zombie"), CallSite::Worker));
        assert!(!set.can_apply_abilities(&creature("zombie")));
    }

    #[test]
    fn test_failing_protector_does_not_veto_and_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut set = ProtectorSet::new();
        set.register(Box::new(Broken {
            calls: calls.clone(),
        }));

        assert!(set.can_despawn(&creature("zombie"), CallSite::MainThread));
        assert!(set.can_despawn(&creature("zombie"), CallSite::MainThread));
        assert_eq!(calls.load(Ordering::Relaxed), 2);
        assert!(set.can_apply_abilities(&creature("zombie")));
    }

    #[test]
    fn test_worker_skips_main_thread_only_protectors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut set = ProtectorSet::new();
        set.register(Box::new(Broken {
            calls: calls.clone(),
        }));

        assert!(set.has_main_thread_only());
        assert!(set.can_despawn(&creature("zombie"), CallSite::Worker));
        assert_eq!(calls.load(Ordering::Relaxed), 0);

        assert!(set.can_despawn_main_thread_only(&creature("zombie")));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }
}
