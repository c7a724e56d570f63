//! Level results and star rating
//!
//! Stars depend only on the final score; elapsed time is reported but never
//! rated.

use serde::{Deserialize, Serialize};

use crate::level::StarThresholds;

/// Summary of a finished (or abandoned) level run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelResult {
    pub score: i64,
    /// 0-3
    pub stars: u8,
    pub elapsed_secs: f64,
    pub total_consumed: u32,
    pub final_tier: u32,
}

impl LevelResult {
    /// Elapsed time as `m:ss`
    pub fn elapsed_display(&self) -> String {
        format_elapsed(self.elapsed_secs)
    }
}

/// Stars earned for a score (highest threshold met wins)
pub fn star_rating(score: i64, thresholds: &StarThresholds) -> u8 {
    if score >= thresholds.three {
        3
    } else if score >= thresholds.two {
        2
    } else if score >= thresholds.one {
        1
    } else {
        0
    }
}

/// Format whole elapsed seconds as `m:ss`
pub fn format_elapsed(secs: f64) -> String {
    let total = secs.max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
