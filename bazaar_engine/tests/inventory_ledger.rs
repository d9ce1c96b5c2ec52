//! Ledger invariants under sequential and concurrent access.

mod support;

use bazaar_engine::{
    db_types::StockOperation,
    traits::{FulfillmentError, InventoryLedger},
};
use support::{prepare_test_env, seed_product};

#[tokio::test]
async fn reserve_then_release_restores_the_counters() {
    let db = prepare_test_env().await;
    let p1 = seed_product(&db, "P1", 10_00, 10).await;

    let record = db.reserve_stock(&p1.id, 4).await.unwrap();
    assert_eq!((record.available, record.reserved), (6, 4));

    let record = db.release_stock(&p1.id, 4).await.unwrap();
    assert_eq!((record.available, record.reserved), (10, 0));
}

#[tokio::test]
async fn reserve_release_preserve_total_stock() {
    let db = prepare_test_env().await;
    let p1 = seed_product(&db, "P1", 10_00, 25).await;

    let r = db.reserve_stock(&p1.id, 7).await.unwrap();
    assert_eq!(r.total_stock(), 25);
    let r = db.reserve_stock(&p1.id, 3).await.unwrap();
    assert_eq!(r.total_stock(), 25);
    let r = db.release_stock(&p1.id, 10).await.unwrap();
    assert_eq!(r.total_stock(), 25);

    // Only adjust changes the total
    let r = db.adjust_stock(&p1.id, 5, StockOperation::Remove).await.unwrap();
    assert_eq!(r.total_stock(), 20);
    let r = db.adjust_stock(&p1.id, 1, StockOperation::Add).await.unwrap();
    assert_eq!(r.total_stock(), 21);
}

#[tokio::test]
async fn overdrawn_reservation_is_refused_and_changes_nothing() {
    let db = prepare_test_env().await;
    let p1 = seed_product(&db, "P1", 10_00, 3).await;

    let err = db.reserve_stock(&p1.id, 4).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::InsufficientStock { available: 3, requested: 4 }), "{err}");

    let snapshot = db.stock_snapshot(&p1.id).await.unwrap();
    assert_eq!((snapshot.available, snapshot.reserved), (3, 0));
}

#[tokio::test]
async fn release_beyond_reserved_signals_a_bookkeeping_bug() {
    let db = prepare_test_env().await;
    let p1 = seed_product(&db, "P1", 10_00, 10).await;
    db.reserve_stock(&p1.id, 2).await.unwrap();

    let err = db.release_stock(&p1.id, 3).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::InsufficientReserved { reserved: 2, requested: 3 }), "{err}");

    let snapshot = db.stock_snapshot(&p1.id).await.unwrap();
    assert_eq!((snapshot.available, snapshot.reserved), (8, 2));
}

#[tokio::test]
async fn remove_adjustment_cannot_go_negative() {
    let db = prepare_test_env().await;
    let p1 = seed_product(&db, "P1", 10_00, 2).await;

    let err = db.adjust_stock(&p1.id, 5, StockOperation::Remove).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::InsufficientStock { available: 2, requested: 5 }), "{err}");
    assert_eq!(db.stock_snapshot(&p1.id).await.unwrap().available, 2);
}

#[tokio::test]
async fn non_positive_quantities_are_rejected() {
    let db = prepare_test_env().await;
    let p1 = seed_product(&db, "P1", 10_00, 10).await;

    for qty in [0, -3] {
        assert!(matches!(
            db.reserve_stock(&p1.id, qty).await.unwrap_err(),
            FulfillmentError::NonPositiveQuantity(_)
        ));
        assert!(matches!(
            db.release_stock(&p1.id, qty).await.unwrap_err(),
            FulfillmentError::NonPositiveQuantity(_)
        ));
    }
}

/// Two reservations of 8 race against 10 available units. Exactly one wins; the loser reports the stock it saw;
/// nothing is oversold.
#[tokio::test]
async fn concurrent_reservations_cannot_oversell() {
    let db = prepare_test_env().await;
    let p1 = seed_product(&db, "P1", 10_00, 10).await;

    let (a, b) = tokio::join!(db.reserve_stock(&p1.id, 8), db.reserve_stock(&p1.id, 8));
    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one of the two reservations must win");
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser.unwrap_err(), FulfillmentError::InsufficientStock { requested: 8, .. }));

    let snapshot = db.stock_snapshot(&p1.id).await.unwrap();
    assert_eq!((snapshot.available, snapshot.reserved), (2, 8));
}

/// A storm of small reservations and releases across two products. The counters must never dip below zero and the
/// per-product totals must be exactly conserved.
#[tokio::test]
async fn interleaved_operations_conserve_invariants() {
    let db = prepare_test_env().await;
    let p1 = seed_product(&db, "P1", 10_00, 20).await;
    let p2 = seed_product(&db, "P2", 5_00, 15).await;

    let tasks = (0..10).map(|i| {
        let db = db.clone();
        let (p1, p2) = (p1.id.clone(), p2.id.clone());
        async move {
            let target = if i % 2 == 0 { p1 } else { p2 };
            if db.reserve_stock(&target, 3).await.is_ok() {
                db.release_stock(&target, 3).await.unwrap();
            }
        }
    });
    futures_util::future::join_all(tasks).await;

    let s1 = db.stock_snapshot(&p1.id).await.unwrap();
    let s2 = db.stock_snapshot(&p2.id).await.unwrap();
    assert_eq!((s1.available, s1.reserved), (20, 0));
    assert_eq!((s2.available, s2.reserved), (15, 0));
}

#[tokio::test]
async fn low_stock_report_orders_by_scarcity() {
    let db = prepare_test_env().await;
    let p1 = seed_product(&db, "P1", 10_00, 2).await;
    let p2 = seed_product(&db, "P2", 10_00, 8).await;
    let p3 = seed_product(&db, "P3", 10_00, 4).await;

    let report = db.low_stock(5).await.unwrap();
    let ids = report.iter().map(|r| r.product_id.clone()).collect::<Vec<_>>();
    assert_eq!(ids, vec![p1.id, p3.id]);
    assert!(!ids.contains(&p2.id));
}
