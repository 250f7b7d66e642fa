//! Per-user ledger record and its on-disk shapes.
//!
//! The persisted document is a JSON map from user id to either a bare
//! integer (legacy deployments stored experience only) or the structured
//! record. Legacy entries upgrade to the structured form the first time the
//! document is written back.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Everything the ledger tracks for one user.
///
/// Created lazily with all-zero defaults on first interaction. The rank is
/// deliberately absent: it is derived from `xp` on every query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Experience total, floor-clamped at 0 by the ledger
    pub xp: u64,
    /// Named patterns, unique per user, isolated between users
    #[serde(default)]
    pub patterns: BTreeMap<String, String>,
    /// Unlocked badge labels; never removed outside a record reset
    #[serde(default)]
    pub badges: BTreeSet<String>,
}

impl UserRecord {
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

/// One entry of the persisted document, read side only: writes always emit
/// the structured form, which is what upgrades a legacy file.
///
/// `untagged` tries variants in order: a JSON integer parses as the legacy
/// form, an object as the structured record.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StoredRecord {
    /// Legacy form: experience total only
    Legacy(u64),
    /// Structured form
    Record(UserRecord),
}

impl StoredRecord {
    /// Upgrade to the in-memory record.
    pub fn into_record(self) -> UserRecord {
        match self {
            StoredRecord::Legacy(xp) => UserRecord {
                xp,
                ..UserRecord::default()
            },
            StoredRecord::Record(record) => record,
        }
    }
}
