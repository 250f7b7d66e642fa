//! Milestone badges
//!
//! A badge is a one-way achievement flag: once a user's record contains a
//! label it is never removed by ledger operations (a full record reset is
//! the only way back). Unlock conditions are configuration, not code, so
//! deployments can swap the table without touching the ledger.

use serde::{Deserialize, Serialize};

/// What has to be true for a badge to unlock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeCondition {
    /// Total experience has reached this value
    ExperienceAtLeast(u64),
    /// The user stores at least this many patterns
    PatternsAtLeast(usize),
}

impl BadgeCondition {
    /// Evaluate against a user's current standing.
    pub fn satisfied(&self, xp: u64, pattern_count: usize) -> bool {
        match self {
            BadgeCondition::ExperienceAtLeast(min) => xp >= *min,
            BadgeCondition::PatternsAtLeast(min) => pattern_count >= *min,
        }
    }
}

/// One configured badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeRule {
    /// Label stored in the user's badge set and shown in replies
    pub label: String,
    /// Unlock condition
    pub condition: BadgeCondition,
}

impl BadgeRule {
    pub fn new(label: &str, condition: BadgeCondition) -> Self {
        Self {
            label: label.to_string(),
            condition,
        }
    }
}

/// Immutable badge configuration, labels unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeTable {
    rules: Vec<BadgeRule>,
}

impl BadgeTable {
    /// Validate and build a table. Duplicate labels are a startup error.
    pub fn new(rules: Vec<BadgeRule>) -> anyhow::Result<Self> {
        for (i, rule) in rules.iter().enumerate() {
            anyhow::ensure!(
                !rule.label.trim().is_empty(),
                "badge labels must not be empty"
            );
            anyhow::ensure!(
                !rules[..i].iter().any(|r| r.label == rule.label),
                "duplicate badge label '{}'",
                rule.label
            );
        }
        Ok(Self { rules })
    }

    /// An empty table; badge evaluation becomes a no-op.
    pub fn empty() -> Self {
        Self { rules: vec![] }
    }

    pub fn rules(&self) -> &[BadgeRule] {
        &self.rules
    }
}

impl Default for BadgeTable {
    /// The stock ClawsCore milestones.
    fn default() -> Self {
        Self {
            rules: vec![
                BadgeRule::new("First Pattern", BadgeCondition::PatternsAtLeast(1)),
                BadgeRule::new("Pattern Collector", BadgeCondition::PatternsAtLeast(5)),
                BadgeRule::new("Pattern Archivist", BadgeCondition::PatternsAtLeast(10)),
                BadgeRule::new("Grinder", BadgeCondition::ExperienceAtLeast(500)),
                BadgeRule::new("Market Veteran", BadgeCondition::ExperienceAtLeast(5000)),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_satisfied() {
        assert!(BadgeCondition::ExperienceAtLeast(100).satisfied(100, 0));
        assert!(!BadgeCondition::ExperienceAtLeast(100).satisfied(99, 50));
        assert!(BadgeCondition::PatternsAtLeast(5).satisfied(0, 5));
        assert!(!BadgeCondition::PatternsAtLeast(5).satisfied(10_000, 4));
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let rules = vec![
            BadgeRule::new("Twice", BadgeCondition::ExperienceAtLeast(1)),
            BadgeRule::new("Twice", BadgeCondition::PatternsAtLeast(1)),
        ];
        assert!(BadgeTable::new(rules).is_err());
    }

    #[test]
    fn test_empty_label_rejected() {
        let rules = vec![BadgeRule::new("  ", BadgeCondition::ExperienceAtLeast(1))];
        assert!(BadgeTable::new(rules).is_err());
    }

    #[test]
    fn test_condition_toml_round_trip() {
        let rule = BadgeRule::new("Grinder", BadgeCondition::ExperienceAtLeast(500));
        let text = toml::to_string(&rule).unwrap();
        let back: BadgeRule = toml::from_str(&text).unwrap();
        assert_eq!(back, rule);
    }
}
