//! Progression Ledger
//!
//! Owns per-user experience totals, named patterns, and milestone badges;
//! answers rank and progress queries derived from the configured tables.
//! Invoked by an external command router, one call per user command.
//!
//! ## Contract
//!
//! - Write-through: every mutation persists through the store before it
//!   returns. A successful return means the value is durable; a
//!   `StorageUnavailable` failure means nothing was applied.
//! - Mutual exclusion: all operations serialize on one mutex around the
//!   store. With a single-document store that is also the natural write
//!   granularity (and the known scalability ceiling for this domain).
//! - Rank is derived, never stored.

use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::record::UserRecord;
use crate::store::LedgerStore;
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// The rank above the user's current one, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextRank {
    pub label: String,
    pub threshold: u64,
}

/// Composite answer for a standing query (the `/xp`-style command).
#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub xp: u64,
    pub rank: String,
    pub next: Option<NextRank>,
    /// Progress through the current band, in [0, 1]
    pub progress: f64,
}

/// Result of teaching a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearnOutcome {
    /// New experience total
    pub xp: u64,
    /// XP granted by this operation (the configured learn reward)
    pub awarded: u64,
    /// Rank after the reward
    pub rank: String,
    /// Whether an existing pattern body was overwritten
    pub replaced: bool,
    /// Badges unlocked by this mutation
    pub unlocked: BTreeSet<String>,
}

/// Result of recalling a stored pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recall {
    /// The stored pattern body, verbatim
    pub body: String,
    /// New experience total after the recall reward
    pub xp: u64,
    /// XP granted by this operation (the configured recall reward)
    pub awarded: u64,
    pub rank: String,
    pub unlocked: BTreeSet<String>,
}

/// The progression ledger. Cheap to share behind an `Arc`.
pub struct Ledger {
    store: Mutex<Box<dyn LedgerStore>>,
    config: LedgerConfig,
}

impl Ledger {
    pub fn new(store: Box<dyn LedgerStore>, config: LedgerConfig) -> Self {
        Self {
            store: Mutex::new(store),
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    fn store(&self) -> Result<MutexGuard<'_, Box<dyn LedgerStore>>, LedgerError> {
        self.store
            .lock()
            .map_err(|_| LedgerError::StorageUnavailable("store lock poisoned".to_string()))
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Experience total; 0 for a user never seen.
    pub fn get_experience(&self, user_id: &str) -> Result<u64, LedgerError> {
        let store = self.store()?;
        Ok(store.get(user_id)?.map(|r| r.xp).unwrap_or(0))
    }

    /// Current rank label.
    pub fn get_rank(&self, user_id: &str) -> Result<String, LedgerError> {
        let xp = self.get_experience(user_id)?;
        Ok(self.config.ranks.rank_for(xp).to_string())
    }

    /// Next rank and its threshold, or `None` at max rank.
    pub fn get_next_rank(&self, user_id: &str) -> Result<Option<NextRank>, LedgerError> {
        let xp = self.get_experience(user_id)?;
        Ok(self.config.ranks.next_band(xp).map(|band| NextRank {
            label: band.label.clone(),
            threshold: band.threshold,
        }))
    }

    /// Progress through the current rank band, clamped to 1.0 at max rank.
    pub fn progress_fraction(&self, user_id: &str) -> Result<f64, LedgerError> {
        let xp = self.get_experience(user_id)?;
        Ok(self.config.ranks.progress_fraction(xp))
    }

    /// Everything a standing reply needs, from one snapshot read.
    pub fn standing(&self, user_id: &str) -> Result<Standing, LedgerError> {
        let store = self.store()?;
        let xp = store.get(user_id)?.map(|r| r.xp).unwrap_or(0);
        drop(store);
        let ranks = &self.config.ranks;
        Ok(Standing {
            xp,
            rank: ranks.rank_for(xp).to_string(),
            next: ranks.next_band(xp).map(|band| NextRank {
                label: band.label.clone(),
                threshold: band.threshold,
            }),
            progress: ranks.progress_fraction(xp),
        })
    }

    /// Stored patterns in name order; empty for an unseen user.
    pub fn list_patterns(&self, user_id: &str) -> Result<Vec<(String, String)>, LedgerError> {
        let store = self.store()?;
        Ok(store
            .get(user_id)?
            .map(|r| r.patterns.into_iter().collect())
            .unwrap_or_default())
    }

    /// Unlocked badge labels, read-only.
    pub fn badges(&self, user_id: &str) -> Result<BTreeSet<String>, LedgerError> {
        let store = self.store()?;
        Ok(store.get(user_id)?.map(|r| r.badges).unwrap_or_default())
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Adjust the experience total by `delta` (may be negative) and return
    /// the new total. Totals clamp at the 0 floor rather than go negative.
    pub fn add_experience(&self, user_id: &str, delta: i64) -> Result<u64, LedgerError> {
        let mut store = self.store()?;
        let mut record = store.get(user_id)?.unwrap_or_default();
        record.xp = apply_delta(record.xp, delta);
        store.put(user_id, &record)?;
        debug!(user_id, delta, xp = record.xp, "experience adjusted");
        Ok(record.xp)
    }

    /// Teach a pattern, upsert semantics: an existing name is overwritten.
    /// Awards the configured learn reward and evaluates badge unlocks.
    pub fn learn_pattern(
        &self,
        user_id: &str,
        name: &str,
        body: &str,
    ) -> Result<LearnOutcome, LedgerError> {
        let (name, body) = validate_pattern(name, body)?;
        let mut store = self.store()?;
        let mut record = store.get(user_id)?.unwrap_or_default();

        let replaced = record.patterns.insert(name.clone(), body).is_some();
        record.xp = record.xp.saturating_add(self.config.rewards.learn);
        let unlocked = unlock_badges(&mut record, &self.config);
        store.put(user_id, &record)?;

        info!(user_id, pattern = %name, replaced, xp = record.xp, "pattern learned");
        Ok(LearnOutcome {
            xp: record.xp,
            awarded: self.config.rewards.learn,
            rank: self.config.ranks.rank_for(record.xp).to_string(),
            replaced,
            unlocked,
        })
    }

    /// Teach a pattern with creation-only semantics: an existing name is a
    /// `DuplicateKey` rejection and nothing changes.
    pub fn save_new_pattern(
        &self,
        user_id: &str,
        name: &str,
        body: &str,
    ) -> Result<LearnOutcome, LedgerError> {
        let (name, body) = validate_pattern(name, body)?;
        let mut store = self.store()?;
        let mut record = store.get(user_id)?.unwrap_or_default();

        if record.patterns.contains_key(&name) {
            return Err(LedgerError::DuplicateKey(format!("pattern '{}'", name)));
        }
        record.patterns.insert(name.clone(), body);
        record.xp = record.xp.saturating_add(self.config.rewards.learn);
        let unlocked = unlock_badges(&mut record, &self.config);
        store.put(user_id, &record)?;

        info!(user_id, pattern = %name, xp = record.xp, "pattern saved");
        Ok(LearnOutcome {
            xp: record.xp,
            awarded: self.config.rewards.learn,
            rank: self.config.ranks.rank_for(record.xp).to_string(),
            replaced: false,
            unlocked,
        })
    }

    /// Remove a named pattern. Returns whether a removal occurred. No
    /// experience effect either way.
    pub fn delete_pattern(&self, user_id: &str, name: &str) -> Result<bool, LedgerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::Validation(
                "pattern name must not be empty".to_string(),
            ));
        }
        let mut store = self.store()?;
        let mut record = match store.get(user_id)? {
            Some(record) => record,
            None => return Ok(false),
        };
        if record.patterns.remove(name).is_none() {
            return Ok(false);
        }
        store.put(user_id, &record)?;
        info!(user_id, pattern = %name, "pattern deleted");
        Ok(true)
    }

    /// Recall a stored pattern body and award the recall reward.
    pub fn recall_pattern(&self, user_id: &str, name: &str) -> Result<Recall, LedgerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::Validation(
                "pattern name must not be empty".to_string(),
            ));
        }
        let mut store = self.store()?;
        let mut record = store
            .get(user_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("pattern '{}'", name)))?;
        let body = record
            .patterns
            .get(name)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("pattern '{}'", name)))?;

        record.xp = record.xp.saturating_add(self.config.rewards.recall);
        let unlocked = unlock_badges(&mut record, &self.config);
        store.put(user_id, &record)?;

        debug!(user_id, pattern = %name, xp = record.xp, "pattern recalled");
        Ok(Recall {
            body,
            xp: record.xp,
            awarded: self.config.rewards.recall,
            rank: self.config.ranks.rank_for(record.xp).to_string(),
            unlocked,
        })
    }

    /// Re-check badge conditions and persist anything newly satisfied.
    /// Idempotent: a second call with no intervening mutation returns empty.
    pub fn evaluate_badges(&self, user_id: &str) -> Result<BTreeSet<String>, LedgerError> {
        let mut store = self.store()?;
        let mut record = store.get(user_id)?.unwrap_or_default();
        let unlocked = unlock_badges(&mut record, &self.config);
        if !unlocked.is_empty() {
            store.put(user_id, &record)?;
            info!(user_id, count = unlocked.len(), "badges unlocked");
        }
        Ok(unlocked)
    }

    /// Zero one user's record: experience, patterns, and badges. The only
    /// path that removes badges.
    pub fn reset(&self, user_id: &str) -> Result<(), LedgerError> {
        let mut store = self.store()?;
        store.put(user_id, &UserRecord::default())?;
        info!(user_id, "record reset");
        Ok(())
    }
}

/// Apply a signed delta with a floor of 0.
fn apply_delta(xp: u64, delta: i64) -> u64 {
    if delta >= 0 {
        xp.saturating_add(delta as u64)
    } else {
        xp.saturating_sub(delta.unsigned_abs())
    }
}

/// Add every satisfied, not-yet-held badge to the record; return the new ones.
fn unlock_badges(record: &mut UserRecord, config: &LedgerConfig) -> BTreeSet<String> {
    let mut newly = BTreeSet::new();
    for rule in config.badges.rules() {
        if rule.condition.satisfied(record.xp, record.pattern_count())
            && record.badges.insert(rule.label.clone())
        {
            newly.insert(rule.label.clone());
        }
    }
    newly
}

/// Trim and reject empty pattern arguments before any mutation.
fn validate_pattern(name: &str, body: &str) -> Result<(String, String), LedgerError> {
    let name = name.trim();
    let body = body.trim();
    if name.is_empty() {
        return Err(LedgerError::Validation(
            "pattern name must not be empty".to_string(),
        ));
    }
    if body.is_empty() {
        return Err(LedgerError::Validation(
            "pattern body must not be empty".to_string(),
        ));
    }
    Ok((name.to_string(), body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::badge::{BadgeCondition, BadgeRule, BadgeTable};
    use crate::rank::{RankBand, RankTable};
    use crate::store::MemoryStore;

    fn test_config() -> LedgerConfig {
        LedgerConfig {
            ranks: RankTable::new(vec![
                RankBand::new(0, "Rookie"),
                RankBand::new(100, "Trader"),
                RankBand::new(500, "Elite"),
            ])
            .unwrap(),
            badges: BadgeTable::new(vec![
                BadgeRule::new("First Pattern", BadgeCondition::PatternsAtLeast(5)),
                BadgeRule::new("Grinder", BadgeCondition::ExperienceAtLeast(500)),
            ])
            .unwrap(),
            rewards: Default::default(),
        }
    }

    fn test_ledger() -> Ledger {
        Ledger::new(Box::new(MemoryStore::new()), test_config())
    }

    #[test]
    fn test_unseen_user_defaults() {
        let ledger = test_ledger();
        assert_eq!(ledger.get_experience("u").unwrap(), 0);
        assert_eq!(ledger.get_rank("u").unwrap(), "Rookie");
        assert!(ledger.list_patterns("u").unwrap().is_empty());
        assert!(ledger.badges("u").unwrap().is_empty());
    }

    #[test]
    fn test_standing_progression_scenario() {
        let ledger = test_ledger();

        let s = ledger.standing("u").unwrap();
        assert_eq!(s.rank, "Rookie");
        assert_eq!(
            s.next,
            Some(NextRank {
                label: "Trader".to_string(),
                threshold: 100
            })
        );
        assert_eq!(s.progress, 0.0);

        ledger.add_experience("u", 100).unwrap();
        let s = ledger.standing("u").unwrap();
        assert_eq!(s.rank, "Trader"); // inclusive boundary
        assert_eq!(s.next.as_ref().unwrap().label, "Elite");
        assert_eq!(s.progress, 0.0);
    }

    #[test]
    fn test_max_rank_scenario() {
        let ledger = test_ledger();
        ledger.add_experience("u", 600).unwrap();
        let s = ledger.standing("u").unwrap();
        assert_eq!(s.rank, "Elite");
        assert!(s.next.is_none());
        assert_eq!(s.progress, 1.0);
    }

    #[test]
    fn test_negative_delta_clamps_at_floor() {
        let ledger = test_ledger();
        ledger.add_experience("u", 30).unwrap();
        assert_eq!(ledger.add_experience("u", -40).unwrap(), 0);
        assert_eq!(ledger.get_experience("u").unwrap(), 0);
    }

    #[test]
    fn test_learn_pattern_reward_and_round_trip() {
        let ledger = test_ledger();
        let outcome = ledger
            .learn_pattern("u", "breakout", "buy on volume spike")
            .unwrap();
        assert_eq!(outcome.xp, 50);
        assert_eq!(outcome.awarded, 50);
        assert_eq!(outcome.rank, "Rookie");
        assert!(!outcome.replaced);
        assert!(outcome.unlocked.is_empty()); // 1 pattern < 5

        let patterns = ledger.list_patterns("u").unwrap();
        assert_eq!(
            patterns,
            vec![("breakout".to_string(), "buy on volume spike".to_string())]
        );

        assert!(ledger.delete_pattern("u", "breakout").unwrap());
        assert!(ledger.list_patterns("u").unwrap().is_empty());
        assert!(!ledger.delete_pattern("u", "breakout").unwrap());
    }

    #[test]
    fn test_learn_pattern_upsert_overwrites() {
        let ledger = test_ledger();
        ledger.learn_pattern("u", "gap", "fade the gap").unwrap();
        let outcome = ledger.learn_pattern("u", "gap", "ride the gap").unwrap();
        assert!(outcome.replaced);
        assert_eq!(
            ledger.list_patterns("u").unwrap(),
            vec![("gap".to_string(), "ride the gap".to_string())]
        );
    }

    #[test]
    fn test_save_new_pattern_rejects_duplicate() {
        let ledger = test_ledger();
        ledger.save_new_pattern("u", "gap", "fade the gap").unwrap();
        let err = ledger
            .save_new_pattern("u", "gap", "ride the gap")
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateKey(_)));
        // The rejection changed nothing.
        assert_eq!(
            ledger.list_patterns("u").unwrap(),
            vec![("gap".to_string(), "fade the gap".to_string())]
        );
        assert_eq!(ledger.get_experience("u").unwrap(), 50);
    }

    #[test]
    fn test_validation_rejects_empty_arguments() {
        let ledger = test_ledger();
        assert!(matches!(
            ledger.learn_pattern("u", "   ", "body").unwrap_err(),
            LedgerError::Validation(_)
        ));
        assert!(matches!(
            ledger.learn_pattern("u", "name", " \t ").unwrap_err(),
            LedgerError::Validation(_)
        ));
        // Nothing was applied.
        assert_eq!(ledger.get_experience("u").unwrap(), 0);
    }

    #[test]
    fn test_learn_trims_arguments() {
        let ledger = test_ledger();
        ledger.learn_pattern("u", "  gap  ", "  fade the gap  ").unwrap();
        assert_eq!(
            ledger.list_patterns("u").unwrap(),
            vec![("gap".to_string(), "fade the gap".to_string())]
        );
    }

    #[test]
    fn test_recall_pattern_awards_and_not_found() {
        let ledger = test_ledger();
        ledger.learn_pattern("u", "gap", "fade the gap").unwrap();

        let recall = ledger.recall_pattern("u", "gap").unwrap();
        assert_eq!(recall.body, "fade the gap");
        assert_eq!(recall.xp, 90); // 50 learn + 40 recall
        assert_eq!(recall.awarded, 40);

        assert!(matches!(
            ledger.recall_pattern("u", "missing").unwrap_err(),
            LedgerError::NotFound(_)
        ));
        assert!(matches!(
            ledger.recall_pattern("stranger", "gap").unwrap_err(),
            LedgerError::NotFound(_)
        ));
    }

    #[test]
    fn test_pattern_count_badge_fires_exactly_once() {
        let ledger = test_ledger();
        let names = ["a", "b", "c", "d", "e"];
        let mut unlocked_during_learn = BTreeSet::new();
        for name in names {
            let outcome = ledger.learn_pattern("u", name, "body").unwrap();
            unlocked_during_learn.extend(outcome.unlocked);
        }
        assert!(unlocked_during_learn.contains("First Pattern"));

        // Already granted: re-evaluation yields nothing new.
        assert!(ledger.evaluate_badges("u").unwrap().is_empty());
        assert!(ledger.badges("u").unwrap().contains("First Pattern"));
    }

    #[test]
    fn test_experience_badge_via_evaluate() {
        let ledger = test_ledger();
        ledger.add_experience("u", 500).unwrap();
        // add_experience does not evaluate badges; the explicit call does.
        let newly = ledger.evaluate_badges("u").unwrap();
        assert!(newly.contains("Grinder"));
        assert!(ledger.evaluate_badges("u").unwrap().is_empty());
    }

    #[test]
    fn test_badges_survive_pattern_deletion() {
        let ledger = test_ledger();
        for name in ["a", "b", "c", "d", "e"] {
            ledger.learn_pattern("u", name, "body").unwrap();
        }
        assert!(ledger.badges("u").unwrap().contains("First Pattern"));
        for name in ["a", "b", "c", "d", "e"] {
            ledger.delete_pattern("u", name).unwrap();
        }
        // Unlock is one-way even though the condition no longer holds.
        assert!(ledger.badges("u").unwrap().contains("First Pattern"));
        assert!(ledger.evaluate_badges("u").unwrap().is_empty());
    }

    #[test]
    fn test_user_isolation() {
        let ledger = test_ledger();
        ledger.learn_pattern("alice", "gap", "fade").unwrap();
        assert!(ledger.list_patterns("bob").unwrap().is_empty());
        assert_eq!(ledger.get_experience("bob").unwrap(), 0);

        ledger.learn_pattern("bob", "gap", "ride").unwrap();
        assert_eq!(
            ledger.list_patterns("alice").unwrap()[0].1,
            "fade".to_string()
        );
    }

    #[test]
    fn test_reset_zeroes_single_record() {
        let ledger = test_ledger();
        for name in ["a", "b", "c", "d", "e"] {
            ledger.learn_pattern("u", name, "body").unwrap();
        }
        ledger.learn_pattern("other", "keep", "me").unwrap();

        ledger.reset("u").unwrap();
        assert_eq!(ledger.get_experience("u").unwrap(), 0);
        assert!(ledger.list_patterns("u").unwrap().is_empty());
        assert!(ledger.badges("u").unwrap().is_empty());
        // Other users untouched.
        assert_eq!(ledger.list_patterns("other").unwrap().len(), 1);
    }

    #[test]
    fn test_apply_delta() {
        assert_eq!(apply_delta(0, 10), 10);
        assert_eq!(apply_delta(10, -4), 6);
        assert_eq!(apply_delta(10, -10), 0);
        assert_eq!(apply_delta(10, -40), 0);
        assert_eq!(apply_delta(u64::MAX, 1), u64::MAX);
    }
}
