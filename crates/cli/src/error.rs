//! Runner error types.

use thiserror::Error;

/// Errors that end a run with a failure exit code.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Bulk issuance failed: {0}")]
    Issuance(#[from] issuance::IssuanceError),

    #[error("Projection failed: {0}")]
    Projection(#[from] projections::ProjectionError),
}

pub type Result<T> = std::result::Result<T, CliError>;
