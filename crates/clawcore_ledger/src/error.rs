//! Error types for the progression ledger.

use thiserror::Error;

/// Outcomes a command router is expected to handle per request.
///
/// None of these are process-terminating. Configuration problems at startup
/// go through `anyhow` on the load path instead and abort before the ledger
/// serves its first request.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Malformed or missing command arguments. Surfaced as a usage hint.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Referenced pattern does not exist for this user.
    #[error("not found: {0}")]
    NotFound(String),

    /// Pattern name already exists under creation-only semantics.
    #[error("already exists: {0}")]
    DuplicateKey(String),

    /// The persistence collaborator could not complete a read or write.
    /// The operation did not apply; previously persisted state is intact.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl LedgerError {
    /// True when the failure is the caller's input rather than the system.
    /// Routers use this to pick between a usage hint and a failure notice.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            LedgerError::Validation(_) | LedgerError::NotFound(_) | LedgerError::DuplicateKey(_)
        )
    }
}
