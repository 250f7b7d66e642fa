//! ClawsCore Progression Ledger
//!
//! Per-user experience, ranks, named trading patterns, and milestone badges
//! for a chat-bot. The messaging transport and command parsing live
//! elsewhere; this crate is the durable state and the derivations over it.
//!
//! ## Shape
//!
//! - [`ledger::Ledger`] — the operations a command router calls, one per
//!   user command, serialized over an injected [`store::LedgerStore`].
//! - [`rank::RankTable`] / [`badge::BadgeTable`] — injected configuration,
//!   loadable from TOML via [`config::LedgerConfig`].
//! - [`store::JsonFileStore`] — flat-file persistence, compatible with the
//!   legacy bare-integer experience documents.
//! - [`render`] — plain-text reply bodies.
//!
//! ```no_run
//! use clawcore_ledger::config::LedgerConfig;
//! use clawcore_ledger::ledger::Ledger;
//! use clawcore_ledger::store::JsonFileStore;
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = JsonFileStore::open("xp_data.json")?;
//! let ledger = Ledger::new(Box::new(store), LedgerConfig::default());
//! let outcome = ledger.learn_pattern("1001", "breakout", "buy on volume spike")?;
//! println!("{} ({} XP)", outcome.rank, outcome.xp);
//! # Ok(())
//! # }
//! ```

pub mod badge;
pub mod config;
pub mod error;
pub mod ledger;
pub mod rank;
pub mod record;
pub mod render;
pub mod store;

pub use badge::{BadgeCondition, BadgeRule, BadgeTable};
pub use config::{LedgerConfig, RewardConfig};
pub use error::LedgerError;
pub use ledger::{LearnOutcome, Ledger, NextRank, Recall, Standing};
pub use rank::{RankBand, RankTable};
pub use record::UserRecord;
pub use store::{JsonFileStore, LedgerStore, MemoryStore};
