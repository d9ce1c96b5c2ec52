//! Reconciler semantics: idempotent replay, no resurrection of cancelled orders, claim bookkeeping.

mod support;

use bazaar_engine::{
    db_types::OrderStatusType,
    events::{EventProducer, EventProducers, OrderPaidEvent, PaymentFailedEvent},
    helpers::{sign_payload, verify_and_parse, PaymentEvent, PaymentEventType},
    order_objects::OrderItemRequest,
    traits::{OrderManagement, WebhookJournal},
    EventDisposition,
    OrderFlowApi,
    ReconcilerApi,
    SqliteDatabase,
};
use tokio::sync::mpsc;
use support::{prepare_test_env, seed_product};

fn checkout_completed(event_id: &str, order_id: &str, user_id: &str) -> PaymentEvent {
    PaymentEvent {
        event_id: event_id.to_string(),
        event_type: PaymentEventType::CheckoutCompleted,
        order_id: Some(order_id.to_string().into()),
        user_id: Some(user_id.to_string()),
    }
}

async fn create_order(db: &SqliteDatabase, user_id: &str) -> bazaar_engine::db_types::Order {
    let p1 = seed_product(db, &format!("SKU-{user_id}"), 10_00, 10).await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    api.create_order(user_id, &[OrderItemRequest { product_id: p1.id, quantity: 1 }]).await.unwrap().order
}

/// Replaying the same event id any number of times ends in the same order state and at most one notification.
#[tokio::test]
async fn redelivered_confirmations_apply_exactly_once() {
    let db = prepare_test_env().await;
    let order = create_order(&db, "alice").await;

    let (tx, mut rx) = mpsc::channel::<OrderPaidEvent>(8);
    let mut producers = EventProducers::default();
    producers.order_paid_producer.push(EventProducer::new(tx));
    let reconciler =
        ReconcilerApi::new(db.clone(), OrderFlowApi::new(db.clone(), producers.clone()), producers);

    let event = checkout_completed("evt_1", order.id.as_str(), "alice");
    assert_eq!(reconciler.handle_event(event.clone()).await.unwrap(), EventDisposition::Processed);
    assert_eq!(reconciler.handle_event(event.clone()).await.unwrap(), EventDisposition::Duplicate);
    assert_eq!(reconciler.handle_event(event).await.unwrap(), EventDisposition::Duplicate);

    let stored = db.fetch_order(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatusType::Paid);

    // Exactly one paid notification went out
    assert_eq!(rx.recv().await.map(|e| e.order.id), Some(order.id));
    assert!(rx.try_recv().is_err());
}

/// Once cancelled, no payment event can resurrect an order, and the ledger keeps the released stock.
#[tokio::test]
async fn cancelled_orders_stay_cancelled() {
    let db = prepare_test_env().await;
    let order = create_order(&db, "alice").await;
    let flow = OrderFlowApi::new(db.clone(), EventProducers::default());
    flow.cancel_order(&order.id, "alice", false).await.unwrap();

    let reconciler = ReconcilerApi::new(
        db.clone(),
        OrderFlowApi::new(db.clone(), EventProducers::default()),
        EventProducers::default(),
    );
    let disposition =
        reconciler.handle_event(checkout_completed("evt_late", order.id.as_str(), "alice")).await.unwrap();
    assert_eq!(disposition, EventDisposition::Ignored);

    let stored = db.fetch_order(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatusType::Cancelled);
    assert!(stored.paid_at.is_none());

    // The anomaly is recorded as processed: a redelivery is a duplicate, not a second attempt
    let disposition =
        reconciler.handle_event(checkout_completed("evt_late", order.id.as_str(), "alice")).await.unwrap();
    assert_eq!(disposition, EventDisposition::Duplicate);
}

#[tokio::test]
async fn failed_payments_notify_without_touching_the_order() {
    let db = prepare_test_env().await;
    let order = create_order(&db, "alice").await;

    let (tx, mut rx) = mpsc::channel::<PaymentFailedEvent>(8);
    let mut producers = EventProducers::default();
    producers.payment_failed_producer.push(EventProducer::new(tx));
    let reconciler = ReconcilerApi::new(db.clone(), OrderFlowApi::new(db.clone(), EventProducers::default()), producers);

    let event = PaymentEvent {
        event_id: "evt_fail".to_string(),
        event_type: PaymentEventType::PaymentFailed,
        order_id: Some(order.id.clone()),
        user_id: Some("alice".to_string()),
    };
    assert_eq!(reconciler.handle_event(event.clone()).await.unwrap(), EventDisposition::Processed);
    assert_eq!(reconciler.handle_event(event).await.unwrap(), EventDisposition::Duplicate);

    // The order is still pending and can be retried or cancelled
    let stored = db.fetch_order(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatusType::Pending);

    let notification = rx.recv().await.unwrap();
    assert_eq!(notification.order_id, order.id);
    assert_eq!(notification.user_id, "alice");
    assert!(rx.try_recv().is_err(), "replay must not notify a second time");
}

#[tokio::test]
async fn unrecognized_event_types_are_acknowledged_and_ignored() {
    let db = prepare_test_env().await;
    let reconciler = ReconcilerApi::new(
        db.clone(),
        OrderFlowApi::new(db.clone(), EventProducers::default()),
        EventProducers::default(),
    );

    let event = PaymentEvent {
        event_id: "evt_other".to_string(),
        event_type: PaymentEventType::Other("invoice.finalized".to_string()),
        order_id: None,
        user_id: None,
    };
    assert_eq!(reconciler.handle_event(event.clone()).await.unwrap(), EventDisposition::Ignored);
    assert_eq!(reconciler.handle_event(event).await.unwrap(), EventDisposition::Duplicate);
}

/// A released claim behaves as if the event was never seen — this is what lets the provider's redelivery retry
/// after a transient dispatch failure.
#[tokio::test]
async fn released_claims_can_be_claimed_again() {
    let db = prepare_test_env().await;
    assert!(db.claim_event("evt_x").await.unwrap());
    assert!(!db.claim_event("evt_x").await.unwrap());
    db.release_event("evt_x").await.unwrap();
    assert!(db.claim_event("evt_x").await.unwrap());
}

/// End to end through the wire format: sign the raw bytes, verify them, process the parsed event.
#[tokio::test]
async fn verified_wire_payload_drives_the_transition() {
    let db = prepare_test_env().await;
    let order = create_order(&db, "alice").await;
    let reconciler = ReconcilerApi::new(
        db.clone(),
        OrderFlowApi::new(db.clone(), EventProducers::default()),
        EventProducers::default(),
    );

    let body = serde_json::json!({
        "id": "evt_wire",
        "type": "checkout.session.completed",
        "data": { "object": { "metadata": { "order_id": order.id.as_str(), "user_id": "alice" } } }
    })
    .to_string();
    let secret = "whsec_integration";
    let header = sign_payload(body.as_bytes(), secret, 1_700_000_000);

    let event = verify_and_parse(body.as_bytes(), &header, secret).unwrap();
    assert_eq!(reconciler.handle_event(event).await.unwrap(), EventDisposition::Processed);
    let stored = db.fetch_order(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatusType::Paid);
    assert!(stored.paid_at.is_some());
}
