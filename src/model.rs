use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::Tier;

pub const SCHEMA_VERSION: u32 = 1;

/// A contiguous range of calendar dates plus the nominal length used for rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub day_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowPair {
    pub before: AnalysisWindow,
    pub after: AnalysisWindow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub date: NaiveDate,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineChangeTotals {
    pub insertions: u64,
    pub deletions: u64,
    pub binary_files_skipped: u64,
}

impl LineChangeTotals {
    pub fn add_text(&mut self, insertions: u64, deletions: u64) {
        self.insertions += insertions;
        self.deletions += deletions;
    }

    pub fn add_binary(&mut self) {
        self.binary_files_skipped += 1;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityCounts {
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

impl ComplexityCounts {
    pub fn record(&mut self, tier: Tier) {
        match tier {
            Tier::High => self.high += 1,
            Tier::Medium => self.medium += 1,
            Tier::Low => self.low += 1,
        }
    }

    pub fn get(&self, tier: Tier) -> u64 {
        match tier {
            Tier::High => self.high,
            Tier::Medium => self.medium,
            Tier::Low => self.low,
        }
    }

    pub fn total(&self) -> u64 {
        self.high + self.medium + self.low
    }

    /// Share of commits in `tier`, as a percentage. Zero when there are no commits.
    pub fn share(&self, tier: Tier) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.get(tier) as f64 / total as f64 * 100.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileActivity {
    pub path: String,
    pub changes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayActivity {
    pub date: NaiveDate,
    pub commits: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    pub window: AnalysisWindow,
    pub commit_count: u64,
    /// Unrounded; rounding is a presentation concern.
    pub daily_rate: f64,
    pub complexity: ComplexityCounts,
    pub top_files: Vec<FileActivity>,
    pub top_days: Vec<DayActivity>,
    pub lines: LineChangeTotals,
}

/// `None` means "not applicable": the before window had no activity to compare against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProductivityComparison {
    pub percentage_change: Option<f64>,
    pub multiplier: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub repository: String,
    pub tool: String,
    pub adoption_date: NaiveDate,
    pub timezone: String,
    pub before: WindowSummary,
    pub after: WindowSummary,
    pub comparison: ProductivityComparison,
    /// Commands a third party can run to reproduce the commit counts.
    pub verification: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}
