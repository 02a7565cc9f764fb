//! Issuance error types.

use thiserror::Error;

/// Errors that abort a bulk run as a whole.
///
/// Individual issue failures are never reported here; they are counted in
/// the progress snapshot instead.
#[derive(Debug, Error)]
pub enum IssuanceError {
    /// The dispatcher or reporter task panicked or was cancelled.
    #[error("Bulk issuance task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Convenience type alias for issuance results.
pub type Result<T> = std::result::Result<T, IssuanceError>;
