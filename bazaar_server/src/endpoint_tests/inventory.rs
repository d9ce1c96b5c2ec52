use actix_web::{http::StatusCode, web, web::ServiceConfig};
use bazaar_engine::{
    db_types::{InventoryRecord, ProductId, Role},
    traits::FulfillmentError,
    InventoryApi,
};
use chrono::Utc;

use super::{
    helpers::{get_request, issue_token, post_request},
    mocks::MockBackend,
};
use crate::routes::{LowStockAlertRoute, StockSnapshotRoute, UpdateStockRoute};

fn register(cfg: &mut ServiceConfig, mock: MockBackend) {
    let api = InventoryApi::new(mock);
    cfg.service(StockSnapshotRoute::<MockBackend>::new())
        .service(UpdateStockRoute::<MockBackend>::new())
        .service(LowStockAlertRoute::<MockBackend>::new())
        .app_data(web::Data::new(api));
}

fn record(available: i64, reserved: i64) -> InventoryRecord {
    InventoryRecord {
        product_id: ProductId::from("p1".to_string()),
        available,
        reserved,
        updated_at: Utc::now(),
    }
}

#[actix_web::test]
async fn regular_users_cannot_touch_inventory() {
    let _ = env_logger::try_init();
    let token = issue_token("alice", Role::User);
    let body = serde_json::json!({ "product_id": "p1", "quantity": 5, "operation": "ADD" });
    let (status, _) = post_request(&token, "/inventory/update", body, |cfg| register(cfg, MockBackend::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn admins_can_restock() {
    let _ = env_logger::try_init();
    let token = issue_token("root", Role::Admin);
    let body = serde_json::json!({ "product_id": "p1", "quantity": 5, "operation": "ADD" });
    let (status, response) = post_request(&token, "/inventory/update", body, |cfg| {
        let mut mock = MockBackend::new();
        mock.expect_adjust_stock()
            .withf(|id, qty, op| {
                id.as_str() == "p1" && *qty == 5 && *op == bazaar_engine::db_types::StockOperation::Add
            })
            .returning(|_, _, _| Ok(record(15, 0)));
        register(cfg, mock);
    })
    .await;
    assert_eq!(status, StatusCode::OK, "{response}");
    assert!(response.contains("\"total_stock\":15"), "{response}");
}

#[actix_web::test]
async fn removals_that_would_go_negative_are_400() {
    let _ = env_logger::try_init();
    let token = issue_token("root", Role::Admin);
    let body = serde_json::json!({ "product_id": "p1", "quantity": 20, "operation": "REMOVE" });
    let (status, response) = post_request(&token, "/inventory/update", body, |cfg| {
        let mut mock = MockBackend::new();
        mock.expect_adjust_stock()
            .returning(|_, _, _| Err(FulfillmentError::InsufficientStock { available: 15, requested: 20 }));
        register(cfg, mock);
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response.contains("Insufficient stock"), "{response}");
}

#[actix_web::test]
async fn snapshot_reports_the_derived_total() {
    let _ = env_logger::try_init();
    let token = issue_token("root", Role::Admin);
    let (status, response) = get_request(&token, "/inventory/p1", |cfg| {
        let mut mock = MockBackend::new();
        mock.expect_stock_snapshot().returning(|_| Ok(record(6, 4)));
        register(cfg, mock);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(response.contains("\"available\":6"), "{response}");
    assert!(response.contains("\"reserved\":4"), "{response}");
    assert!(response.contains("\"total_stock\":10"), "{response}");
}

#[actix_web::test]
async fn low_stock_report_uses_the_query_threshold() {
    let _ = env_logger::try_init();
    let token = issue_token("root", Role::Admin);
    let (status, response) = get_request(&token, "/inventory/low-stock/alert?threshold=3", |cfg| {
        let mut mock = MockBackend::new();
        mock.expect_low_stock().withf(|threshold| *threshold == 3).returning(|_| Ok(vec![record(2, 1)]));
        register(cfg, mock);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(response.contains("\"count\":1"), "{response}");
}
