//! Region grid coordinates

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Width of a region (chunk) in blocks
pub const REGION_SIZE: i32 = 16;

/// Horizontal region coordinate
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub z: i32,
}

impl Cell {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Region containing a block coordinate
    pub fn from_block(block_x: i32, block_z: i32) -> Self {
        Self {
            x: block_x.div_euclid(REGION_SIZE),
            z: block_z.div_euclid(REGION_SIZE),
        }
    }

    /// Region containing a world position
    pub fn containing(position: Vec3) -> Self {
        Self::from_block(position.x.floor() as i32, position.z.floor() as i32)
    }

    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }

    /// Squared Euclidean distance in regions
    pub fn distance_sq(self, other: Cell) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dz = (self.z - other.z) as i64;
        dx * dx + dz * dz
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}
