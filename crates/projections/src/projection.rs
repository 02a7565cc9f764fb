//! The projection trait and the event counter each projection keeps.

use async_trait::async_trait;
use event_store::EventEnvelope;

use crate::Result;

/// How far into the global event log a projection has read.
///
/// Events of other aggregate types still advance the position, so it always
/// equals the number of log entries handed to the projection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionPosition {
    pub events_processed: u64,
}

impl ProjectionPosition {
    pub fn zero() -> Self {
        Self {
            events_processed: 0,
        }
    }

    pub fn advance(&self) -> Self {
        Self {
            events_processed: self.events_processed + 1,
        }
    }
}

impl std::fmt::Display for ProjectionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "position({})", self.events_processed)
    }
}

/// Folds stored gift card events into a query-side view.
///
/// [`ProjectionProcessor`](crate::ProjectionProcessor) hands every envelope of
/// the global log to `handle` in append order, skipping the ones already
/// counted by `position`.
#[async_trait]
pub trait Projection: Send + Sync {
    fn name(&self) -> &'static str;

    /// Applies one envelope and advances the position, even when the
    /// envelope belongs to an aggregate type the view ignores.
    async fn handle(&self, event: &EventEnvelope) -> Result<()>;

    async fn position(&self) -> ProjectionPosition;

    /// Empties the view and rewinds the position to zero for a rebuild.
    async fn reset(&self) -> Result<()>;
}
