//! Summary of one finished despawn pass

use std::time::Duration;

use mobcap_creature::Category;

use crate::config::ScanMode;

/// Summary of one finished scan pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    pub mode: ScanMode,
    pub worlds: usize,
    /// Creatures classified
    pub scanned: u64,
    pub removed: [u64; Category::COUNT],
    /// Accepted by the classifier but gone or vetoed by the time of removal
    pub skipped: u64,
    /// Whether the pass ended on a removal failure
    pub aborted: bool,
    pub ticks: u64,
    pub elapsed: Duration,
}

impl ScanReport {
    pub fn new(mode: ScanMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn record_removal(&mut self, category: Category) {
        self.removed[category.index()] += 1;
    }

    pub fn removed(&self, category: Category) -> u64 {
        self.removed[category.index()]
    }

    pub fn total_removed(&self) -> u64 {
        self.removed.iter().sum()
    }
}

impl std::fmt::Display for ScanReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?} scan of {} worlds: {} scanned, {} removed (",
            self.mode,
            self.worlds,
            self.scanned,
            self.total_removed()
        )?;
        let mut first = true;
        for category in Category::ALL {
            let removed = self.removed(category);
            if removed == 0 {
                continue;
            }
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", removed, category)?;
            first = false;
        }
        write!(
            f,
            "), {} skipped in {} ticks / {:.2}ms{}",
            self.skipped,
            self.ticks,
            self.elapsed.as_secs_f64() * 1000.0,
            if self.aborted { " [aborted]" } else { "" }
        )
    }
}
