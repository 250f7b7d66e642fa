//! Ledger configuration
//!
//! Rank and badge tables plus reward constants, injected into the ledger
//! instead of living as hardcoded constants next to the logic. Loaded once
//! at process start from TOML; a table that fails validation aborts startup
//! rather than being caught per request.
//!
//! ```toml
//! [[ranks]]
//! threshold = 0
//! label = "New Recruit"
//!
//! [[badges]]
//! label = "First Pattern"
//! condition = { patterns_at_least = 1 }
//!
//! [rewards]
//! learn = 50
//! recall = 40
//! ```

use crate::badge::{BadgeRule, BadgeTable};
use crate::rank::{RankBand, RankTable};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Experience awarded per ledger action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardConfig {
    /// XP for teaching (or overwriting) a pattern
    #[serde(default = "default_learn_reward")]
    pub learn: u64,
    /// XP for recalling a stored pattern
    #[serde(default = "default_recall_reward")]
    pub recall: u64,
}

fn default_learn_reward() -> u64 {
    50
}

fn default_recall_reward() -> u64 {
    40
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            learn: default_learn_reward(),
            recall: default_recall_reward(),
        }
    }
}

/// Validated configuration handed to [`crate::ledger::Ledger`].
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub ranks: RankTable,
    pub badges: BadgeTable,
    pub rewards: RewardConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            ranks: RankTable::default(),
            badges: BadgeTable::default(),
            rewards: RewardConfig::default(),
        }
    }
}

impl LedgerConfig {
    /// Load and validate a TOML config file.
    ///
    /// Sections are optional; anything absent falls back to the stock
    /// tables and rewards.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading ledger config {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("invalid ledger config {}", path.display()))
    }

    /// Parse and validate TOML config text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let raw: ConfigFile = toml::from_str(content).context("parsing TOML")?;
        let ranks = match raw.ranks {
            Some(bands) => RankTable::new(bands)?,
            None => RankTable::default(),
        };
        let badges = match raw.badges {
            Some(rules) => BadgeTable::new(rules)?,
            None => BadgeTable::default(),
        };
        Ok(Self {
            ranks,
            badges,
            rewards: raw.rewards.unwrap_or_default(),
        })
    }
}

/// Raw file shape before validation.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    ranks: Option<Vec<RankBand>>,
    badges: Option<Vec<BadgeRule>>,
    rewards: Option<RewardConfig>,
}
