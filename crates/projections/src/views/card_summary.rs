//! Card summary read model: opening and remaining value per card.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{Aggregate, GiftCard, GiftCardEvent};
use event_store::EventEnvelope;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

/// One row of the card summary view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSummary {
    pub id: AggregateId,
    pub initial_value: i64,
    pub remaining_value: i64,
}

/// Restricts queries to cards whose id starts with a prefix.
///
/// The default (empty prefix) matches every card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSummaryFilter {
    pub id_starts_with: String,
}

impl CardSummaryFilter {
    pub fn id_starts_with(prefix: impl Into<String>) -> Self {
        Self {
            id_starts_with: prefix.into(),
        }
    }

    pub fn matches(&self, id: &AggregateId) -> bool {
        id.starts_with(&self.id_starts_with)
    }
}

/// Result of a count query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountCardSummariesResponse {
    pub count: usize,
    /// Timestamp of the last event applied to the view, if any.
    pub last_event: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct Rows {
    cards: BTreeMap<AggregateId, CardSummary>,
    last_event: Option<DateTime<Utc>>,
}

/// Read model holding one [`CardSummary`] per issued card, ordered by id.
#[derive(Clone)]
pub struct CardSummaryView {
    rows: Arc<RwLock<Rows>>,
    position: Arc<RwLock<ProjectionPosition>>,
}

impl CardSummaryView {
    /// Creates a new empty view.
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(Rows::default())),
            position: Arc::new(RwLock::new(ProjectionPosition::zero())),
        }
    }

    pub async fn get(&self, id: &AggregateId) -> Option<CardSummary> {
        self.rows.read().await.cards.get(id).cloned()
    }

    /// Counts cards matching `filter`.
    pub async fn count(&self, filter: &CardSummaryFilter) -> CountCardSummariesResponse {
        let rows = self.rows.read().await;
        let count = if filter.id_starts_with.is_empty() {
            rows.cards.len()
        } else {
            rows.cards.keys().filter(|id| filter.matches(id)).count()
        };
        CountCardSummariesResponse {
            count,
            last_event: rows.last_event,
        }
    }

    /// Returns up to `limit` matching cards after skipping `offset`, ordered by id.
    pub async fn fetch(
        &self,
        offset: usize,
        limit: usize,
        filter: &CardSummaryFilter,
    ) -> Vec<CardSummary> {
        self.rows
            .read()
            .await
            .cards
            .values()
            .filter(|card| filter.matches(&card.id))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    async fn advance(&self) {
        let mut pos = self.position.write().await;
        *pos = pos.advance();
    }
}

impl Default for CardSummaryView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Projection for CardSummaryView {
    fn name(&self) -> &'static str {
        "CardSummaryView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        if event.aggregate_type != GiftCard::aggregate_type() {
            self.advance().await;
            return Ok(());
        }

        let card_event: GiftCardEvent = serde_json::from_value(event.payload.clone())?;
        let id = event.aggregate_id.clone();

        let mut rows = self.rows.write().await;
        match card_event {
            GiftCardEvent::Issued(data) => {
                rows.cards.insert(
                    id.clone(),
                    CardSummary {
                        id,
                        initial_value: data.amount,
                        remaining_value: data.amount,
                    },
                );
            }
            GiftCardEvent::Redeemed(data) => {
                if let Some(card) = rows.cards.get_mut(&id) {
                    card.remaining_value -= data.amount;
                }
            }
            GiftCardEvent::Cancelled(_) => {
                if let Some(card) = rows.cards.get_mut(&id) {
                    card.remaining_value = 0;
                }
            }
        }
        rows.last_event = Some(event.timestamp);
        drop(rows);

        self.advance().await;
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        *self.position.read().await
    }

    async fn reset(&self) -> Result<()> {
        *self.rows.write().await = Rows::default();
        *self.position.write().await = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for CardSummaryView {
    fn name(&self) -> &'static str {
        "CardSummaryView"
    }

    fn count(&self) -> usize {
        // try_read avoids blocking; returns 0 while a writer holds the lock
        self.rows.try_read().map(|r| r.cards.len()).unwrap_or(0)
    }
}
