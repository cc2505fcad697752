//! Update rate control for UI-facing streams

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Update rate for metadata streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateRate {
    /// Every update as it arrives (one per media fragment)
    Native,

    /// At most this many updates per second, latest wins
    /// `Max(0)` is treated as Native
    Max(u32),
}

impl UpdateRate {
    /// Minimum spacing between updates, if limited
    pub fn interval(self) -> Option<Duration> {
        match self {
            UpdateRate::Native | UpdateRate::Max(0) => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / hz as f64)),
        }
    }
}
