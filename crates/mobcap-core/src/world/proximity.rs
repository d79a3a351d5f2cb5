//! Player proximity queries
//!
//! Two sanctioned variants answer "is a player near this point":
//! - [`ProximityIndex::player_near`] walks a spiral over per-region, per-layer
//!   player counts. Cost depends on the search radius, not on how many
//!   players are online, which is what the spawn gate needs.
//! - [`player_within`] compares squared distances against a player list.
//!   Cheaper when few players are online; used by the despawn path.

use ahash::AHashMap;
use glam::Vec3;
use mobcap_creature::PlayerSnapshot;

use crate::config::{LayerRange, ProximityConfig};

use super::{Cell, Region, SpiralSearch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TrackedPlayer {
    cell: Cell,
    y: i32,
}

/// Loaded regions of one world with live player counts
#[derive(Debug, Clone)]
pub struct ProximityIndex {
    regions: AHashMap<Cell, Region>,
    /// Last known location of every player in this world, loaded region or not
    players: AHashMap<String, TrackedPlayer>,
    layer_ranges: Vec<LayerRange>,
}

impl ProximityIndex {
    pub fn new(layer_ranges: Vec<LayerRange>) -> Self {
        Self {
            regions: AHashMap::new(),
            players: AHashMap::new(),
            layer_ranges,
        }
    }

    /// Host loaded a region. Players already standing in it are counted.
    pub fn region_loaded(&mut self, cell: Cell) {
        if self.regions.contains_key(&cell) {
            log::trace!("[INDEX] Region {} already loaded, skipping", cell);
            return;
        }
        let mut region = Region::new(cell, &self.layer_ranges);
        for player in self.players.values().filter(|p| p.cell == cell) {
            region.add_player(player.y);
        }
        self.regions.insert(cell, region);
    }

    pub fn region_unloaded(&mut self, cell: Cell) {
        if self.regions.remove(&cell).is_none() {
            log::trace!("[INDEX] Unload of unknown region {} ignored", cell);
        }
    }

    pub fn loaded_regions(&self) -> usize {
        self.regions.len()
    }

    pub fn region(&self, cell: Cell) -> Option<&Region> {
        self.regions.get(&cell)
    }

    pub fn region_mut(&mut self, cell: Cell) -> Option<&mut Region> {
        self.regions.get_mut(&cell)
    }

    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    pub fn regions_mut(&mut self) -> impl Iterator<Item = &mut Region> {
        self.regions.values_mut()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Track a player entering this world (join or world change)
    pub fn player_joined(&mut self, name: &str, position: Vec3) {
        if self.players.contains_key(name) {
            self.player_moved(name, position);
            return;
        }
        let tracked = TrackedPlayer {
            cell: Cell::containing(position),
            y: position.y.floor() as i32,
        };
        if let Some(region) = self.regions.get_mut(&tracked.cell) {
            region.add_player(tracked.y);
        }
        self.players.insert(name.to_string(), tracked);
    }

    /// Move a tracked player; unknown players are added
    pub fn player_moved(&mut self, name: &str, position: Vec3) {
        let next = TrackedPlayer {
            cell: Cell::containing(position),
            y: position.y.floor() as i32,
        };
        let Some(previous) = self.players.get(name).copied() else {
            self.player_joined(name, position);
            return;
        };
        if previous == next {
            return;
        }
        if let Some(region) = self.regions.get_mut(&previous.cell) {
            region.remove_player(previous.y);
        }
        if let Some(region) = self.regions.get_mut(&next.cell) {
            region.add_player(next.y);
        }
        self.players.insert(name.to_string(), next);
    }

    /// Stop tracking a player (quit or world change)
    pub fn player_left(&mut self, name: &str) {
        let Some(previous) = self.players.remove(name) else {
            return;
        };
        if let Some(region) = self.regions.get_mut(&previous.cell) {
            region.remove_player(previous.y);
        }
    }

    /// Whether a player is near `height` in any region within the configured
    /// search radius of `center`. Below ground the tighter radius is used;
    /// `allow_flight_depth` also searches bands below `height`.
    pub fn player_near(
        &self,
        center: Cell,
        height: i32,
        allow_flight_depth: bool,
        config: &ProximityConfig,
    ) -> bool {
        let radius = if height < config.ground_height {
            config.underground_search_radius_cells
        } else {
            config.search_radius_cells
        };
        let extra_depth = if allow_flight_depth {
            config.flight_extra_depth
        } else {
            0
        };
        self.player_between(
            center,
            height.saturating_sub(extra_depth.max(0)),
            height,
            radius,
        )
    }

    /// Spiral search for a player in any band overlapping `[low, high]`,
    /// within `radius_cells` of `center`
    pub fn player_between(&self, center: Cell, low: i32, high: i32, radius_cells: i32) -> bool {
        if self.players.is_empty() {
            return false;
        }
        SpiralSearch::new(center, radius_cells).any(|cell| {
            self.regions
                .get(&cell)
                .is_some_and(|region| region.has_player_between(low, high))
        })
    }
}

/// Player-list variant: any player in `world`-filtered `players` within
/// `radius` blocks horizontally and `height` blocks vertically
pub fn player_within(players: &[PlayerSnapshot], position: Vec3, radius: f32, height: f32) -> bool {
    let radius_sq = radius * radius;
    players.iter().any(|player| {
        let dx = player.position.x - position.x;
        let dz = player.position.z - position.z;
        dx * dx + dz * dz <= radius_sq && (player.position.y - position.y).abs() <= height
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_layer_index() -> ProximityIndex {
        let mut index = ProximityIndex::new(vec![LayerRange::new(60, 80)]);
        index.region_loaded(Cell::new(0, 0));
        index
    }

    fn config(radius: i32) -> ProximityConfig {
        ProximityConfig {
            layers: vec![LayerRange::new(60, 80)],
            search_radius_cells: radius,
            underground_search_radius_cells: radius,
            ground_height: 0,
            flight_extra_depth: 150,
        }
    }

    #[test]
    fn test_player_near_matching_layer() {
        let mut index = single_layer_index();
        index.player_joined("alex", Vec3::new(8.0, 70.0, 8.0));

        assert!(index.player_near(Cell::new(0, 0), 70, false, &config(2)));
        assert!(!index.player_near(Cell::new(0, 0), 200, false, &config(2)));
    }

    #[test]
    fn test_flight_depth_reaches_lower_layer() {
        let mut index = single_layer_index();
        index.player_joined("alex", Vec3::new(8.0, 70.0, 8.0));
        assert!(index.player_near(Cell::new(0, 0), 200, true, &config(2)));
    }

    #[test]
    fn test_player_near_respects_radius() {
        let mut index = ProximityIndex::new(vec![LayerRange::new(0, 255)]);
        for x in -5..=5 {
            index.region_loaded(Cell::new(x, 0));
        }
        index.player_joined("steve", Vec3::new(4.0 * 16.0 + 1.0, 64.0, 1.0));

        assert!(index.player_near(Cell::new(0, 0), 64, false, &config(4)));
        assert!(!index.player_near(Cell::new(0, 0), 64, false, &config(3)));
        assert!(index.player_near(Cell::new(1, 0), 64, false, &config(3)));
    }

    #[test]
    fn test_underground_uses_smaller_radius() {
        let mut index = ProximityIndex::new(vec![LayerRange::new(-64, 320)]);
        for x in -5..=5 {
            index.region_loaded(Cell::new(x, 0));
        }
        index.player_joined("steve", Vec3::new(3.0 * 16.0, 10.0, 0.0));
        let config = ProximityConfig {
            layers: vec![LayerRange::new(-64, 320)],
            search_radius_cells: 4,
            underground_search_radius_cells: 1,
            ground_height: 50,
            flight_extra_depth: 0,
        };

        assert!(!index.player_near(Cell::new(0, 0), 10, false, &config));
        assert!(index.player_near(Cell::new(0, 0), 100, false, &config));
        assert!(index.player_near(Cell::new(2, 0), 10, false, &config));
    }

    #[test]
    fn test_player_moves_between_regions() {
        let mut index = ProximityIndex::new(vec![LayerRange::new(0, 255)]);
        index.region_loaded(Cell::new(0, 0));
        index.region_loaded(Cell::new(10, 0));
        index.player_joined("alex", Vec3::new(1.0, 64.0, 1.0));
        index.player_moved("alex", Vec3::new(161.0, 64.0, 1.0));

        assert_eq!(index.region(Cell::new(0, 0)).map(|r| r.players()), Some(0));
        assert_eq!(index.region(Cell::new(10, 0)).map(|r| r.players()), Some(1));
    }

    #[test]
    fn test_region_loaded_counts_present_players() {
        let mut index = ProximityIndex::new(vec![LayerRange::new(0, 255)]);
        index.player_joined("alex", Vec3::new(1.0, 64.0, 1.0));
        assert_eq!(index.loaded_regions(), 0);

        index.region_loaded(Cell::new(0, 0));
        assert_eq!(index.region(Cell::new(0, 0)).map(|r| r.players()), Some(1));

        index.region_unloaded(Cell::new(0, 0));
        index.region_loaded(Cell::new(0, 0));
        assert_eq!(index.region(Cell::new(0, 0)).map(|r| r.players()), Some(1));
    }

    #[test]
    fn test_player_between_covers_height_span() {
        let mut index = ProximityIndex::new(ProximityConfig::default_layers());
        index.region_loaded(Cell::new(0, 0));
        index.player_joined("alex", Vec3::new(8.0, 85.0, 8.0));

        // A creature at y=60 searching 32 blocks up and down
        assert!(index.player_between(Cell::new(0, 0), 28, 92, 2));
        // Bands at the creature's own height alone miss the player
        assert!(!index.player_between(Cell::new(0, 0), 60, 60, 2));
        assert!(!index.player_between(Cell::new(0, 0), -60, -20, 2));
    }

    #[test]
    fn test_player_left() {
        let mut index = single_layer_index();
        index.player_joined("alex", Vec3::new(8.0, 70.0, 8.0));
        index.player_left("alex");
        index.player_left("alex");
        assert_eq!(index.region(Cell::new(0, 0)).map(|r| r.players()), Some(0));
        assert!(!index.player_near(Cell::new(0, 0), 70, false, &config(2)));
    }

    #[test]
    fn test_no_regions_no_players() {
        let index = ProximityIndex::new(ProximityConfig::default_layers());
        assert!(!index.player_near(Cell::new(0, 0), 64, true, &ProximityConfig::default()));
    }

    #[test]
    fn test_player_within() {
        let players = vec![PlayerSnapshot::new("alex", "overworld", Vec3::new(30.0, 64.0, 40.0))];

        assert!(player_within(&players, Vec3::new(0.0, 64.0, 0.0), 50.0, 8.0));
        assert!(!player_within(&players, Vec3::new(0.0, 64.0, 0.0), 49.0, 8.0));
        assert!(!player_within(&players, Vec3::new(0.0, 100.0, 0.0), 50.0, 8.0));
        assert!(!player_within(&[], Vec3::ZERO, 1000.0, 1000.0));
    }
}
