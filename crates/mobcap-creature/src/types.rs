//! Common types for creatures

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Liveness token for a creature owned by the host.
///
/// The token itself carries no reference to the entity; whether it still
/// refers to a live creature is always asked of the host via
/// [`WorldEngine::is_valid`](crate::WorldEngine::is_valid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

impl EntityId {
    /// Generate a new unique entity ID
    pub fn new() -> Self {
        EntityId(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw u64 value
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Wrap a host-assigned identifier
    pub fn from_raw(id: u64) -> Self {
        // Keep locally generated IDs clear of host-assigned ones
        if let Some(next) = id.checked_add(1) {
            NEXT_ENTITY_ID.fetch_max(next, Ordering::Relaxed);
        }
        EntityId(id)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}
