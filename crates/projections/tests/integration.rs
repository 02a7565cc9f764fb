//! Integration tests: GiftCardService commands → ProjectionProcessor → CardSummaryView.

use common::AggregateId;
use domain::{CancelGiftCard, GiftCardService, IssueGiftCard, RedeemGiftCard};
use event_store::InMemoryEventStore;
use projections::{CardSummaryFilter, CardSummaryView, ProjectionProcessor};

fn setup() -> (
    GiftCardService<InMemoryEventStore>,
    ProjectionProcessor<InMemoryEventStore>,
    CardSummaryView,
) {
    let store = InMemoryEventStore::new();
    let service = GiftCardService::new(store.clone());

    let summaries = CardSummaryView::new();
    let mut processor = ProjectionProcessor::new(store);
    processor.register(Box::new(summaries.clone()));

    (service, processor, summaries)
}

#[tokio::test]
async fn card_lifecycle_is_reflected_in_summary() {
    let (service, processor, summaries) = setup();
    let id = AggregateId::new("GIFT-1");

    service
        .issue(IssueGiftCard::new(id.clone(), 100))
        .await
        .unwrap();
    service
        .redeem(RedeemGiftCard::new(id.clone(), 40))
        .await
        .unwrap();

    processor.run_catch_up().await.unwrap();
    let card = summaries.get(&id).await.unwrap();
    assert_eq!(card.initial_value, 100);
    assert_eq!(card.remaining_value, 60);

    service.cancel(CancelGiftCard::new(id.clone())).await.unwrap();
    processor.run_catch_up().await.unwrap();

    let card = summaries.get(&id).await.unwrap();
    assert_eq!(card.remaining_value, 0);
}

#[tokio::test]
async fn rejected_commands_leave_no_trace() {
    let (service, processor, summaries) = setup();
    let id = AggregateId::new("GIFT-1");

    service
        .issue(IssueGiftCard::new(id.clone(), 10))
        .await
        .unwrap();
    assert!(
        service
            .redeem(RedeemGiftCard::new(id.clone(), 11))
            .await
            .is_err()
    );
    assert!(
        service
            .issue(IssueGiftCard::new(AggregateId::new("GIFT-2"), 0))
            .await
            .is_err()
    );

    processor.run_catch_up().await.unwrap();

    let count = summaries.count(&CardSummaryFilter::default()).await;
    assert_eq!(count.count, 1);
    assert_eq!(summaries.get(&id).await.unwrap().remaining_value, 10);
}

#[tokio::test]
async fn count_and_fetch_match_issued_cards() {
    let (service, processor, summaries) = setup();

    for i in 0..25 {
        let prefix = if i % 5 == 0 { "VIP" } else { "STD" };
        let id = AggregateId::new(format!("{prefix}-{i:03}"));
        service.issue(IssueGiftCard::new(id, 20)).await.unwrap();
    }
    processor.run_catch_up().await.unwrap();

    let all = CardSummaryFilter::default();
    let vip = CardSummaryFilter::id_starts_with("VIP");

    assert_eq!(summaries.count(&all).await.count, 25);
    assert_eq!(summaries.count(&vip).await.count, 5);

    let first_page = summaries.fetch(0, 10, &all).await;
    let second_page = summaries.fetch(10, 10, &all).await;
    let last_page = summaries.fetch(20, 10, &all).await;
    assert_eq!(first_page.len(), 10);
    assert_eq!(second_page.len(), 10);
    assert_eq!(last_page.len(), 5);
    assert!(first_page.last().unwrap().id < second_page[0].id);

    let vip_cards = summaries.fetch(0, 100, &vip).await;
    assert!(vip_cards.iter().all(|c| c.id.starts_with("VIP")));
}

#[tokio::test]
async fn rebuild_produces_the_same_view() {
    let (service, processor, summaries) = setup();

    for i in 0..5 {
        let id = AggregateId::new(format!("CARD-{i}"));
        service
            .issue(IssueGiftCard::new(id.clone(), 50))
            .await
            .unwrap();
        service
            .redeem(RedeemGiftCard::new(id, i * 10))
            .await
            .ok();
    }
    processor.run_catch_up().await.unwrap();
    let before = summaries.fetch(0, 100, &CardSummaryFilter::default()).await;

    processor.rebuild_all().await.unwrap();
    let after = summaries.fetch(0, 100, &CardSummaryFilter::default()).await;

    assert_eq!(before, after);
    assert_eq!(after[3].remaining_value, 20);
}
