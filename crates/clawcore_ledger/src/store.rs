//! Persistence collaborator for the ledger.
//!
//! The ledger talks to storage through [`LedgerStore`] so the medium stays
//! swappable: an in-memory map for tests and embedding, a single JSON
//! document for the flat-file deployments. The contract either way:
//!
//! - `get` serves a consistent snapshot and never observes a half-written
//!   record.
//! - `put` is write-through: an `Ok` return means the record is durable.
//!   On failure the store rolls back, so the previously persisted state
//!   stays authoritative.
//!
//! Local file I/O is bounded, so failures surface as `StorageUnavailable`
//! immediately instead of through a timer. A store backed by a remote
//! medium would enforce its own deadline behind this same trait.

use crate::error::LedgerError;
use crate::record::{StoredRecord, UserRecord};
use anyhow::Context;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Get/put access to per-user records.
pub trait LedgerStore: Send {
    /// Snapshot read; `None` for a user never written.
    fn get(&self, user_id: &str) -> Result<Option<UserRecord>, LedgerError>;

    /// Durable write of one user's record.
    fn put(&mut self, user_id: &str, record: &UserRecord) -> Result<(), LedgerError>;
}

// ============================================================================
// In-memory store
// ============================================================================

/// Volatile store for tests and single-process embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<String, UserRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryStore {
    fn get(&self, user_id: &str) -> Result<Option<UserRecord>, LedgerError> {
        Ok(self.records.get(user_id).cloned())
    }

    fn put(&mut self, user_id: &str, record: &UserRecord) -> Result<(), LedgerError> {
        self.records.insert(user_id.to_string(), record.clone());
        Ok(())
    }
}

// ============================================================================
// JSON document store
// ============================================================================

/// Whole-document JSON store: one file maps user id to record.
///
/// The document is read once at open and kept as the snapshot; every write
/// rewrites the file atomically (temp file + rename). Legacy bare-integer
/// entries parse on open and leave the file in structured form after the
/// first write.
pub struct JsonFileStore {
    path: PathBuf,
    records: BTreeMap<String, UserRecord>,
}

impl JsonFileStore {
    /// Open (or start) the document at `path`.
    ///
    /// A missing file is an empty store. An unreadable or corrupt document
    /// is an error: callers open at startup and must not serve requests
    /// over state they cannot trust.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let records = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("reading ledger document {}", path.display()))?;
            let doc: BTreeMap<String, StoredRecord> = serde_json::from_str(&content)
                .with_context(|| format!("parsing ledger document {}", path.display()))?;
            doc.into_iter()
                .map(|(user, stored)| (user, stored.into_record()))
                .collect()
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), users = records.len(), "ledger document opened");
        Ok(Self { path, records })
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_document(&self) -> Result<(), LedgerError> {
        let content = serde_json::to_string_pretty(&self.records)
            .map_err(|e| LedgerError::StorageUnavailable(e.to_string()))?;
        atomic_write(&self.path, content.as_bytes())
            .map_err(|e| LedgerError::StorageUnavailable(e.to_string()))?;
        debug!(path = %self.path.display(), users = self.records.len(), "ledger document written");
        Ok(())
    }
}

impl LedgerStore for JsonFileStore {
    fn get(&self, user_id: &str) -> Result<Option<UserRecord>, LedgerError> {
        Ok(self.records.get(user_id).cloned())
    }

    fn put(&mut self, user_id: &str, record: &UserRecord) -> Result<(), LedgerError> {
        let previous = self.records.insert(user_id.to_string(), record.clone());
        if let Err(e) = self.write_document() {
            // Roll back so the snapshot keeps matching the durable state.
            match previous {
                Some(old) => self.records.insert(user_id.to_string(), old),
                None => self.records.remove(user_id),
            };
            return Err(e);
        }
        Ok(())
    }
}

/// Write a file through a temp sibling + rename so readers never see a
/// partial document.
fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;
    Ok(())
}
