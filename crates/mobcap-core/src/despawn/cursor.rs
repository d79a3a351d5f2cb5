//! Resumable position within a despawn pass

use std::vec;

use mobcap_creature::CreatureSnapshot;

/// Position of one scan pass: per-world creature lists and the one being
/// drained
#[derive(Debug, Default)]
pub struct ScanCursor {
    worlds: Vec<(String, vec::IntoIter<CreatureSnapshot>)>,
    current: usize,
}

impl ScanCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_world(&mut self, world: impl Into<String>, entities: Vec<CreatureSnapshot>) {
        self.worlds.push((world.into(), entities.into_iter()));
    }

    /// Creatures left across all worlds
    pub fn remaining(&self) -> usize {
        self.worlds
            .iter()
            .skip(self.current)
            .map(|(_, entities)| entities.len())
            .sum()
    }

    pub fn next_entity(&mut self) -> Option<CreatureSnapshot> {
        while let Some((_, entities)) = self.worlds.get_mut(self.current) {
            if let Some(entity) = entities.next() {
                return Some(entity);
            }
            self.current += 1;
        }
        None
    }

    /// Move everything left out of the cursor
    pub fn drain_all(&mut self) -> Vec<(String, Vec<CreatureSnapshot>)> {
        let drained = self
            .worlds
            .drain(..)
            .skip(self.current)
            .map(|(name, entities)| (name, entities.collect()))
            .collect();
        self.current = 0;
        drained
    }

    pub fn clear(&mut self) {
        self.worlds.clear();
        self.current = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use mobcap_creature::EntityId;

    fn creatures(world: &str, count: usize) -> Vec<CreatureSnapshot> {
        (0..count)
            .map(|_| CreatureSnapshot::new(EntityId::new(), "zombie", world, Vec3::ZERO))
            .collect()
    }

    #[test]
    fn test_walks_worlds_in_order() {
        let mut cursor = ScanCursor::new();
        cursor.push_world("overworld", creatures("overworld", 2));
        cursor.push_world("empty", Vec::new());
        cursor.push_world("nether", creatures("nether", 1));

        assert_eq!(cursor.remaining(), 3);
        let worlds: Vec<String> = std::iter::from_fn(|| cursor.next_entity())
            .map(|c| c.world)
            .collect();
        assert_eq!(worlds, vec!["overworld", "overworld", "nether"]);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_drain_all_skips_consumed() {
        let mut cursor = ScanCursor::new();
        cursor.push_world("a", creatures("a", 1));
        cursor.push_world("b", creatures("b", 2));
        cursor.next_entity();
        cursor.next_entity();

        let drained = cursor.drain_all();
        let sizes: Vec<usize> = drained.iter().map(|(_, e)| e.len()).collect();
        assert_eq!(sizes, vec![1]);
        assert_eq!(cursor.remaining(), 0);
        assert!(cursor.next_entity().is_none());
    }

    #[test]
    fn test_clear() {
        let mut cursor = ScanCursor::new();
        cursor.push_world("a", creatures("a", 4));
        cursor.clear();
        assert!(cursor.next_entity().is_none());
    }
}
