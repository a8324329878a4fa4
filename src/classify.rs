//! Keyword heuristics that bucket commit subjects into complexity tiers.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    High,
    Medium,
    Low,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::High, Tier::Medium, Tier::Low];

    pub fn label(&self) -> &'static str {
        match self {
            Tier::High => "high",
            Tier::Medium => "medium",
            Tier::Low => "low",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const HIGH_KEYWORDS: &[&str] = &[
    "refactor",
    "architecture",
    "implement",
    "integration",
    "system",
    "pipeline",
    "migration",
];
const MEDIUM_KEYWORDS: &[&str] = &["feat", "feature", "enhance", "improve", "add", "update"];
const LOW_KEYWORDS: &[&str] = &["fix", "bug", "typo", "cleanup", "docs", "chore"];

/// Evaluated top to bottom; the first tier with a matching keyword wins.
const RULES: &[(Tier, &[&str])] = &[
    (Tier::High, HIGH_KEYWORDS),
    (Tier::Medium, MEDIUM_KEYWORDS),
    (Tier::Low, LOW_KEYWORDS),
];

#[derive(Debug, Clone)]
pub struct Classifier {
    rules: &'static [(Tier, &'static [&'static str])],
    fallback: Tier,
}

impl Classifier {
    /// `fallback` is the tier assigned to messages that match no keyword.
    pub fn new(fallback: Tier) -> Self {
        Self {
            rules: RULES,
            fallback,
        }
    }

    pub fn classify(&self, message: &str) -> Tier {
        let lowered = message.to_lowercase();
        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|kw| lowered.contains(kw)))
            .map(|(tier, _)| *tier)
            .unwrap_or(self.fallback)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(Tier::Medium)
    }
}
