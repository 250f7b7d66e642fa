//! Rank ladder
//!
//! Maps an experience total to a human-readable rank via an ordered
//! threshold table. The table is immutable configuration: validated once at
//! construction, then queried with pure functions. The current rank is never
//! stored anywhere, only derived from the total.
//!
//! ## Semantics
//!
//! - The label of the greatest threshold <= xp is current (inclusive lower
//!   bound: landing exactly on a threshold grants that rank).
//! - Index 0 must carry threshold 0, so every total has exactly one rank.
//! - Past the top threshold there is no next rank and progress reads 1.0.

use serde::{Deserialize, Serialize};

/// One rung of the ladder: the minimum total that grants `label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankBand {
    /// Minimum experience total for this rank (inclusive)
    pub threshold: u64,
    /// Rank label shown to the user
    pub label: String,
}

impl RankBand {
    pub fn new(threshold: u64, label: &str) -> Self {
        Self {
            threshold,
            label: label.to_string(),
        }
    }
}

/// Ordered rank thresholds, strictly increasing, floor rank at threshold 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankTable {
    bands: Vec<RankBand>,
}

impl RankTable {
    /// Validate and build a table from configured bands.
    ///
    /// Fails when the table is empty, does not start at threshold 0, or the
    /// thresholds are not strictly increasing. Callers treat this as a
    /// startup error, not a per-request one.
    pub fn new(bands: Vec<RankBand>) -> anyhow::Result<Self> {
        anyhow::ensure!(!bands.is_empty(), "rank table must not be empty");
        anyhow::ensure!(
            bands[0].threshold == 0,
            "rank table must start with a threshold-0 floor rank, got {}",
            bands[0].threshold
        );
        for pair in bands.windows(2) {
            anyhow::ensure!(
                pair[0].threshold < pair[1].threshold,
                "rank thresholds must be strictly increasing ({} then {})",
                pair[0].threshold,
                pair[1].threshold
            );
        }
        Ok(Self { bands })
    }

    /// Label of the greatest threshold not exceeding `xp`.
    pub fn rank_for(&self, xp: u64) -> &str {
        for band in self.bands.iter().rev() {
            if xp >= band.threshold {
                return &band.label;
            }
        }
        // Unreachable with a validated table; the floor band matches xp = 0.
        &self.bands[0].label
    }

    /// Smallest band strictly above `xp`, or `None` at/past max rank.
    pub fn next_band(&self, xp: u64) -> Option<&RankBand> {
        self.bands.iter().find(|band| band.threshold > xp)
    }

    /// Progress through the current band as a fraction in [0, 1].
    ///
    /// `(xp - current_threshold) / (next_threshold - current_threshold)`,
    /// clamped to 1.0 once the top threshold has been met.
    pub fn progress_fraction(&self, xp: u64) -> f64 {
        let next = match self.next_band(xp) {
            Some(band) => band.threshold,
            None => return 1.0,
        };
        let current = self
            .bands
            .iter()
            .rev()
            .find(|band| xp >= band.threshold)
            .map(|band| band.threshold)
            .unwrap_or(0);
        let span = next - current;
        if span == 0 {
            return 1.0;
        }
        ((xp - current) as f64 / span as f64).clamp(0.0, 1.0)
    }

    /// Highest configured threshold.
    pub fn max_threshold(&self) -> u64 {
        self.bands.last().map(|band| band.threshold).unwrap_or(0)
    }

    pub fn bands(&self) -> &[RankBand] {
        &self.bands
    }
}

impl Default for RankTable {
    /// The stock ClawsCore ladder.
    fn default() -> Self {
        Self {
            bands: vec![
                RankBand::new(0, "New Recruit"),
                RankBand::new(100, "Pattern Novice"),
                RankBand::new(500, "Chart Whisperer"),
                RankBand::new(1000, "Signal Adept"),
                RankBand::new(3000, "Market Seeker"),
                RankBand::new(6000, "Orbital Operative"),
                RankBand::new(10000, "Neural Strategist"),
                RankBand::new(15000, "Void Tactician"),
                RankBand::new(20000, "Profit Reaper"),
            ],
        }
    }
}
