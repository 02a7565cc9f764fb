//! Bulk issuance of gift cards.
//!
//! [`BulkIssuer`] creates many independent cards concurrently through a
//! [`domain::CommandGateway`], counting successes and failures, while a
//! separate reporter task hands [`ProgressSnapshot`]s to a
//! [`ProgressObserver`] on a fixed cadence until the run completes.

pub mod coordinator;
pub mod error;
pub mod progress;

pub use coordinator::{
    BulkIssueConfig, BulkIssueHandle, BulkIssueReport, BulkIssuer, unique_card_ids,
};
pub use error::{IssuanceError, Result};
pub use progress::{BulkProgress, ProgressObserver, ProgressSnapshot};
