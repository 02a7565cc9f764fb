//! Read models and projections for the gift card query side.
//!
//! - [`Projection`] trait for processing events into read models
//! - [`ReadModel`] trait for query access to denormalized data
//! - [`ProjectionProcessor`] for feeding events from the store to projections
//! - [`CardSummaryView`]: per-card balances, counted and paged by id prefix

pub mod error;
pub mod processor;
pub mod projection;
pub mod read_model;
pub mod views;

pub use error::{ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition};
pub use read_model::ReadModel;
pub use views::{CardSummary, CardSummaryFilter, CardSummaryView, CountCardSummariesResponse};
