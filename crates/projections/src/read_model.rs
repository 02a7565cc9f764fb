//! Synchronous read access shared by the card views.

/// A view that can report its size without awaiting.
///
/// Implementations use a non-blocking read, so `count` may return 0 while a
/// projection is writing. Filtered and paged queries live on the concrete
/// view, e.g. [`CardSummaryView::count`](crate::CardSummaryView::count).
pub trait ReadModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Number of rows currently held.
    fn count(&self) -> usize;
}
