//! Despawn classification and the incremental scanner

mod classifier;
mod cursor;
mod report;
mod rules;
mod scanner;
mod view;

pub use classifier::DespawnClassifier;
pub use cursor::ScanCursor;
pub use report::ScanReport;
pub use rules::{
    CategoryPolicy, ClassifyError, DespawnRule, IgnoreList, KeepReason, MinimumAge, PlayerItem,
    PlayerProximity, ProtectorVeto, RuleContext, RuleOutcome, Verdict, standard_rules,
};
pub use scanner::{DespawnScanner, ScanContext, ScanHost, ScanStatus};
pub use view::{LiveWorldView, WorldSnapshot, WorldView, despawn_search_volume};
