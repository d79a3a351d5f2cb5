//! World state - regions, player presence, census and capacity

mod cell;
mod census;
mod proximity;
mod region;
mod registry;
mod spiral;
mod world_state;

pub use cell::{Cell, REGION_SIZE};
pub use census::{CAPACITY_REGION_DIVISOR, Capacity, WorldCensus};
pub use proximity::{ProximityIndex, player_within};
pub use region::{Layer, Region};
pub use registry::WorldRegistry;
pub use spiral::SpiralSearch;
pub use world_state::WorldState;
