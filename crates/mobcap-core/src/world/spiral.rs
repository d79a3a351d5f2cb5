//! Outward square-ring spiral over region cells
//!
//! Ring `k` is walked from its corner `(-k, -k)` along +x, +z, -x, -z, turning
//! at each corner; after the fourth turn the half-width grows by one. Rings
//! that fit inside the inscribed circle are yielded whole. Once a ring's
//! corners leave the circle every cell is distance-filtered, so the search
//! touches roughly πr² cells instead of (2r+1)².

use super::Cell;

const DIRECTIONS: [(i32, i32); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];

/// Resumable spiral search, one cell per `next()`
#[derive(Debug, Clone)]
pub struct SpiralSearch {
    center: Cell,
    radius: i32,
    radius_sq: i64,
    /// Current ring half-width, 0 before the center was yielded
    ring: i32,
    side: usize,
    step: i32,
    dx: i32,
    dz: i32,
    started: bool,
    outside: bool,
}

impl SpiralSearch {
    /// Search around `center` out to `radius` cells. A negative radius
    /// yields nothing.
    pub fn new(center: Cell, radius: i32) -> Self {
        let mut search = Self {
            center,
            radius: 0,
            radius_sq: 0,
            ring: 0,
            side: 0,
            step: 0,
            dx: 0,
            dz: 0,
            started: false,
            outside: false,
        };
        search.restart(radius);
        search
    }

    /// Start over from the same center with a new radius
    pub fn restart(&mut self, radius: i32) {
        self.radius = radius;
        self.radius_sq = if radius < 0 {
            0
        } else {
            (radius as i64) * (radius as i64)
        };
        self.ring = 0;
        self.side = 0;
        self.step = 0;
        self.dx = 0;
        self.dz = 0;
        self.started = false;
        self.outside = false;
    }

    pub fn center(&self) -> Cell {
        self.center
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    /// Next cell, `None` once the radius is exceeded
    pub fn next_cell(&mut self) -> Option<Cell> {
        if self.radius < 0 {
            return None;
        }
        if !self.started {
            self.started = true;
            self.enter_ring(1);
            return Some(self.center);
        }

        loop {
            if self.ring > self.radius {
                return None;
            }

            let (sx, sz) = DIRECTIONS[self.side];
            self.dx += sx;
            self.dz += sz;
            let (dx, dz) = (self.dx, self.dz);

            self.step += 1;
            if self.step == 2 * self.ring {
                self.step = 0;
                self.side += 1;
                if self.side == DIRECTIONS.len() {
                    self.enter_ring(self.ring + 1);
                }
            }

            if self.outside && (dx as i64) * (dx as i64) + (dz as i64) * (dz as i64) > self.radius_sq
            {
                continue;
            }
            return Some(self.center.offset(dx, dz));
        }
    }

    fn enter_ring(&mut self, ring: i32) {
        self.ring = ring;
        self.side = 0;
        self.step = 0;
        self.dx = -ring;
        self.dz = -ring;
        // Corner distance² is 2k²; past the inscribed circle filtering starts
        // and stays on
        if !self.outside {
            self.outside = 2 * (ring as i64) * (ring as i64) > self.radius_sq;
        }
    }
}

impl Iterator for SpiralSearch {
    type Item = Cell;

    fn next(&mut self) -> Option<Cell> {
        self.next_cell()
    }
}
