//! Per-region player and animal presence

use crate::config::LayerRange;

use super::Cell;

/// Vertical band of a region with its own player count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub min_y: i32,
    pub max_y: i32,
    players: u32,
}

impl Layer {
    fn new(range: LayerRange) -> Self {
        Self {
            min_y: range.min_y,
            max_y: range.max_y,
            players: 0,
        }
    }

    pub fn contains(&self, y: i32) -> bool {
        self.min_y <= y && y <= self.max_y
    }

    /// Whether the band intersects `[low, high]`
    pub fn intersects(&self, low: i32, high: i32) -> bool {
        self.min_y <= high && self.max_y >= low
    }

    pub fn players(&self) -> u32 {
        self.players
    }
}

/// Presence data for one loaded region
#[derive(Debug, Clone)]
pub struct Region {
    pub cell: Cell,
    players: u32,
    animals: u32,
    /// Sorted by `min_y`
    layers: Vec<Layer>,
}

impl Region {
    /// Build a region with layers from (already sanitized) ranges
    pub fn new(cell: Cell, ranges: &[LayerRange]) -> Self {
        let mut layers: Vec<Layer> = ranges
            .iter()
            .filter(|r| r.is_valid())
            .map(|r| Layer::new(*r))
            .collect();
        layers.sort_by_key(|l| (l.min_y, l.max_y));
        Self {
            cell,
            players: 0,
            animals: 0,
            layers,
        }
    }

    pub fn players(&self) -> u32 {
        self.players
    }

    pub fn animals(&self) -> u32 {
        self.animals
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Players outside every band only count towards the region total
    pub fn add_player(&mut self, y: i32) {
        self.players += 1;
        for layer in self.layers.iter_mut().filter(|l| l.contains(y)) {
            layer.players += 1;
        }
    }

    /// Saturates at zero
    pub fn remove_player(&mut self, y: i32) {
        self.players = self.players.saturating_sub(1);
        for layer in self.layers.iter_mut().filter(|l| l.contains(y)) {
            layer.players = layer.players.saturating_sub(1);
        }
    }

    /// Any player in a band overlapping `y`, or in `extra_depth` blocks below it
    pub fn has_player_near_height(&self, y: i32, extra_depth: i32) -> bool {
        self.has_player_between(y.saturating_sub(extra_depth.max(0)), y)
    }

    /// Any player in a band overlapping `[low, high]`
    pub fn has_player_between(&self, low: i32, high: i32) -> bool {
        if self.players == 0 || low > high {
            return false;
        }
        self.layers
            .iter()
            .take_while(|l| l.min_y <= high)
            .any(|l| l.players > 0 && l.intersects(low, high))
    }

    pub fn add_animal(&mut self) {
        self.animals += 1;
    }

    pub fn remove_animal(&mut self) {
        self.animals = self.animals.saturating_sub(1);
    }

    pub fn reset_animals(&mut self) {
        self.animals = 0;
    }
}
