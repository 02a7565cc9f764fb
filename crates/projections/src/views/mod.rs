//! Read model views.

pub mod card_summary;

pub use card_summary::{CardSummary, CardSummaryFilter, CardSummaryView, CountCardSummariesResponse};
