//! Order lifecycle: creation with compensating rollback, cancellation, payment transitions, access control.

mod support;

use bazaar_common::Money;
use bazaar_engine::{
    db_types::{OrderStatusType, ProductId, ProductUpdate},
    events::EventProducers,
    order_objects::OrderItemRequest,
    traits::{CatalogManagement, InventoryLedger, OrderManagement, PaidOutcome},
    OrderFlowApi,
    OrderFlowError,
    SqliteDatabase,
};
use support::{prepare_test_env, seed_product};

fn api(db: &SqliteDatabase) -> OrderFlowApi<SqliteDatabase> {
    OrderFlowApi::new(db.clone(), EventProducers::default())
}

fn request(product: &bazaar_engine::db_types::Product, quantity: i64) -> OrderItemRequest {
    OrderItemRequest { product_id: product.id.clone(), quantity }
}

#[tokio::test]
async fn order_total_is_the_sum_of_price_snapshots() {
    let db = prepare_test_env().await;
    let p1 = seed_product(&db, "P1", 100_00, 10).await;
    let p2 = seed_product(&db, "P2", 150_00, 10).await;
    let api = api(&db);

    let order = api.create_order("alice", &[request(&p1, 2), request(&p2, 1)]).await.unwrap();
    assert_eq!(order.order.total_price, Money::from(350_00));
    assert_eq!(order.order.status, OrderStatusType::Pending);
    assert_eq!(order.items.len(), 2);

    // Reservations were taken with the exact quantities
    let s1 = db.stock_snapshot(&p1.id).await.unwrap();
    let s2 = db.stock_snapshot(&p2.id).await.unwrap();
    assert_eq!((s1.available, s1.reserved), (8, 2));
    assert_eq!((s2.available, s2.reserved), (9, 1));
}

#[tokio::test]
async fn later_price_changes_do_not_touch_existing_orders() {
    let db = prepare_test_env().await;
    let p1 = seed_product(&db, "P1", 40_00, 5).await;
    let api = api(&db);

    let order = api.create_order("alice", &[request(&p1, 1)]).await.unwrap();
    db.update_product(&p1.id, ProductUpdate::default().with_price(Money::from(99_00))).await.unwrap();

    let fetched = api.order(&order.order.id, "alice", false).await.unwrap();
    assert_eq!(fetched.order.total_price, Money::from(40_00));
    assert_eq!(fetched.items[0].unit_price, Money::from(40_00));
}

/// Compensating rollback: the third line fails reservation, the first two are fully released, and no order
/// record exists afterwards.
#[tokio::test]
async fn failed_reservation_rolls_back_earlier_lines() {
    let db = prepare_test_env().await;
    let p1 = seed_product(&db, "P1", 10_00, 10).await;
    let p2 = seed_product(&db, "P2", 10_00, 10).await;
    let p3 = seed_product(&db, "P3", 10_00, 1).await;
    let api = api(&db);

    let err = api
        .create_order("alice", &[request(&p1, 2), request(&p2, 3), request(&p3, 5)])
        .await
        .unwrap_err();
    assert!(matches!(err, OrderFlowError::InsufficientStock { available: 1, requested: 5 }), "{err}");

    for product in [&p1, &p2, &p3] {
        let s = db.stock_snapshot(&product.id).await.unwrap();
        assert_eq!(s.reserved, 0, "no reservation may survive a failed creation");
    }
    assert!(api.orders("alice", false).await.unwrap().is_empty(), "no order record may be created");
}

#[tokio::test]
async fn inactive_and_missing_products_are_rejected_up_front() {
    let db = prepare_test_env().await;
    let p1 = seed_product(&db, "P1", 10_00, 10).await;
    let api = api(&db);

    db.deactivate_product(&p1.id).await.unwrap();
    let err = api.create_order("alice", &[request(&p1, 1)]).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::ProductInactive(_)));

    let ghost = OrderItemRequest { product_id: ProductId::from("nope".to_string()), quantity: 1 };
    let err = api.create_order("alice", &[ghost]).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::ProductNotFound(_)));

    let err = api.create_order("alice", &[]).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::Validation(_)));

    let err = api.create_order("alice", &[request(&p1, 0)]).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::Validation(_)));
}

#[tokio::test]
async fn cancellation_releases_every_line() {
    let db = prepare_test_env().await;
    let p1 = seed_product(&db, "P1", 10_00, 10).await;
    let p2 = seed_product(&db, "P2", 10_00, 10).await;
    let api = api(&db);

    let order = api.create_order("alice", &[request(&p1, 4), request(&p2, 2)]).await.unwrap();
    let cancelled = api.cancel_order(&order.order.id, "alice", false).await.unwrap();
    assert_eq!(cancelled.status, OrderStatusType::Cancelled);

    let s1 = db.stock_snapshot(&p1.id).await.unwrap();
    let s2 = db.stock_snapshot(&p2.id).await.unwrap();
    assert_eq!((s1.available, s1.reserved), (10, 0));
    assert_eq!((s2.available, s2.reserved), (10, 0));
}

/// Cancelling a paid order fails and leaves the ledger untouched.
#[tokio::test]
async fn paid_orders_cannot_be_cancelled() {
    let db = prepare_test_env().await;
    let p1 = seed_product(&db, "P1", 10_00, 10).await;
    let api = api(&db);

    let order = api.create_order("alice", &[request(&p1, 3)]).await.unwrap();
    api.mark_paid(&order.order.id).await.unwrap();

    let err = api.cancel_order(&order.order.id, "alice", false).await.unwrap_err();
    assert!(
        matches!(err, OrderFlowError::InvalidTransition { status: OrderStatusType::Paid, .. }),
        "{err}"
    );
    let s1 = db.stock_snapshot(&p1.id).await.unwrap();
    assert_eq!((s1.available, s1.reserved), (7, 3), "inventory must be unchanged");
}

#[tokio::test]
async fn cancelling_twice_fails_without_double_release() {
    let db = prepare_test_env().await;
    let p1 = seed_product(&db, "P1", 10_00, 10).await;
    let api = api(&db);

    let order = api.create_order("alice", &[request(&p1, 3)]).await.unwrap();
    api.cancel_order(&order.order.id, "alice", false).await.unwrap();
    let err = api.cancel_order(&order.order.id, "alice", false).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::InvalidTransition { status: OrderStatusType::Cancelled, .. }));

    let s1 = db.stock_snapshot(&p1.id).await.unwrap();
    assert_eq!((s1.available, s1.reserved), (10, 0), "a failed second cancel must not release again");
}

#[tokio::test]
async fn mark_paid_is_idempotent_and_sets_paid_at() {
    let db = prepare_test_env().await;
    let p1 = seed_product(&db, "P1", 10_00, 10).await;
    let api = api(&db);

    let order = api.create_order("alice", &[request(&p1, 1)]).await.unwrap();
    assert!(order.order.paid_at.is_none());

    let first = api.mark_paid(&order.order.id).await.unwrap();
    assert!(first.is_newly_paid());
    assert!(first.order().paid_at.is_some());

    let second = api.mark_paid(&order.order.id).await.unwrap();
    assert!(matches!(second, PaidOutcome::AlreadyPaid(_)));
    assert_eq!(second.order().paid_at, first.order().paid_at);
}

#[tokio::test]
async fn cancelled_orders_never_become_paid() {
    let db = prepare_test_env().await;
    let p1 = seed_product(&db, "P1", 10_00, 10).await;
    let api = api(&db);

    let order = api.create_order("alice", &[request(&p1, 1)]).await.unwrap();
    api.cancel_order(&order.order.id, "alice", false).await.unwrap();

    let err = api.mark_paid(&order.order.id).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::InvalidTransition { status: OrderStatusType::Cancelled, .. }));
    let fetched = db.fetch_order(&order.order.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, OrderStatusType::Cancelled);
}

/// A cancel and a mark-paid race on the same order. Both gate on `status = 'Pending'`, so exactly one terminal
/// transition wins, and the ledger agrees with whichever it was.
#[tokio::test]
async fn concurrent_cancel_and_mark_paid_serialize() {
    let db = prepare_test_env().await;
    let p1 = seed_product(&db, "P1", 10_00, 10).await;
    let api = api(&db);

    let order = api.create_order("alice", &[request(&p1, 4)]).await.unwrap();
    let id = order.order.id.clone();

    let (cancel, paid) = tokio::join!(api.cancel_order(&id, "alice", false), api.mark_paid(&id));
    assert!(cancel.is_ok() ^ paid.is_ok(), "exactly one terminal transition must win");

    let snapshot = db.stock_snapshot(&p1.id).await.unwrap();
    let final_status = db.fetch_order(&id).await.unwrap().unwrap().status;
    match final_status {
        OrderStatusType::Cancelled => assert_eq!((snapshot.available, snapshot.reserved), (10, 0)),
        OrderStatusType::Paid => assert_eq!((snapshot.available, snapshot.reserved), (6, 4)),
        OrderStatusType::Pending => panic!("the order cannot still be pending"),
    }
}

#[tokio::test]
async fn ownership_rules_for_fetch_cancel_and_list() {
    let db = prepare_test_env().await;
    let p1 = seed_product(&db, "P1", 10_00, 20).await;
    let api = api(&db);

    let alices = api.create_order("alice", &[request(&p1, 1)]).await.unwrap();
    let bobs = api.create_order("bob", &[request(&p1, 2)]).await.unwrap();

    // Cross-user access is forbidden for non-admins, allowed for admins
    let err = api.order(&alices.order.id, "bob", false).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::Forbidden));
    assert!(api.order(&alices.order.id, "admin", true).await.is_ok());

    let err = api.cancel_order(&alices.order.id, "bob", false).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::Forbidden));
    assert!(api.cancel_order(&bobs.order.id, "admin", true).await.is_ok());

    // Listing: owners see their own, admins see everything
    let alice_view = api.orders("alice", false).await.unwrap();
    assert_eq!(alice_view.len(), 1);
    assert_eq!(alice_view[0].user_id, "alice");
    let admin_view = api.orders("admin", true).await.unwrap();
    assert_eq!(admin_view.len(), 2);
}
