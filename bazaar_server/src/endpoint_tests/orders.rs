use actix_web::{http::StatusCode, web, web::ServiceConfig};
use bazaar_common::Money;
use bazaar_engine::{
    db_types::{Order, OrderItem, OrderStatusType, Product, ProductId, Role},
    events::EventProducers,
    traits::FulfillmentError,
    OrderFlowApi,
};
use chrono::Utc;

use super::{
    helpers::{get_request, issue_token, patch_request, pending_order, post_request},
    mocks::MockBackend,
};
use crate::routes::{CancelOrderRoute, CreateOrderRoute, MyOrdersRoute, OrderByIdRoute};

fn register(cfg: &mut ServiceConfig, mock: MockBackend) {
    let api = OrderFlowApi::new(mock, EventProducers::default());
    cfg.service(CreateOrderRoute::<MockBackend>::new())
        .service(MyOrdersRoute::<MockBackend>::new())
        .service(OrderByIdRoute::<MockBackend>::new())
        .service(CancelOrderRoute::<MockBackend>::new())
        .app_data(web::Data::new(api));
}

fn active_product(id: &str, price_cents: i64) -> Product {
    Product {
        id: ProductId::from(id.to_string()),
        sku: format!("SKU-{id}"),
        name: format!("Product {id}"),
        description: None,
        price: Money::from(price_cents),
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn stock_record(id: &str, available: i64, reserved: i64) -> bazaar_engine::db_types::InventoryRecord {
    bazaar_engine::db_types::InventoryRecord {
        product_id: ProductId::from(id.to_string()),
        available,
        reserved,
        updated_at: Utc::now(),
    }
}

#[actix_web::test]
async fn fetching_orders_without_a_token_is_unauthorized() {
    let _ = env_logger::try_init();
    let (status, _) = get_request("", "/orders", |cfg| register(cfg, MockBackend::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn users_list_only_their_own_orders() {
    let _ = env_logger::try_init();
    let token = issue_token("alice", Role::User);
    let (status, body) = get_request(&token, "/orders", |cfg| {
        let mut mock = MockBackend::new();
        mock.expect_fetch_orders()
            .withf(|filter| filter.user_id.as_deref() == Some("alice"))
            .returning(|_| Ok(vec![pending_order("alice")]));
        register(cfg, mock);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"0000001\""));
}

#[actix_web::test]
async fn admins_list_everything() {
    let _ = env_logger::try_init();
    let token = issue_token("root", Role::Admin);
    let (status, _) = get_request(&token, "/orders", |cfg| {
        let mut mock = MockBackend::new();
        mock.expect_fetch_orders()
            .withf(|filter| filter.user_id.is_none())
            .returning(|_| Ok(vec![pending_order("alice"), pending_order("bob")]));
        register(cfg, mock);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn cross_user_fetch_is_forbidden_for_non_admins() {
    let _ = env_logger::try_init();
    let token = issue_token("bob", Role::User);
    let (status, body) = get_request(&token, "/orders/0000001", |cfg| {
        let mut mock = MockBackend::new();
        mock.expect_fetch_order().returning(|_| Ok(Some(pending_order("alice"))));
        register(cfg, mock);
    })
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
}

#[actix_web::test]
async fn creating_an_order_reserves_and_persists() {
    let _ = env_logger::try_init();
    let token = issue_token("alice", Role::User);
    let body = serde_json::json!({ "items": [{ "product_id": "p1", "quantity": 2 }] });
    let (status, response) = post_request(&token, "/orders", body, |cfg| {
        let mut mock = MockBackend::new();
        mock.expect_fetch_product().returning(|_| Ok(Some(active_product("p1", 100_00))));
        mock.expect_reserve_stock()
            .withf(|id, qty| id.as_str() == "p1" && *qty == 2)
            .returning(|_, _| Ok(stock_record("p1", 8, 2)));
        mock.expect_insert_order().returning(|order| {
            Ok(Order {
                id: order.id,
                user_id: order.user_id,
                status: OrderStatusType::Pending,
                total_price: order.total_price,
                created_at: Utc::now(),
                updated_at: Utc::now(),
                paid_at: None,
            })
        });
        mock.expect_fetch_order_items().returning(|id| {
            Ok(vec![OrderItem {
                id: 1,
                order_id: id.clone(),
                product_id: ProductId::from("p1".to_string()),
                quantity: 2,
                unit_price: Money::from(100_00),
            }])
        });
        register(cfg, mock);
    })
    .await;
    assert_eq!(status, StatusCode::CREATED, "{response}");
    assert!(response.contains("\"total_price\":20000"), "{response}");
}

#[actix_web::test]
async fn insufficient_stock_fails_order_creation_with_400() {
    let _ = env_logger::try_init();
    let token = issue_token("alice", Role::User);
    let body = serde_json::json!({ "items": [{ "product_id": "p1", "quantity": 5 }] });
    let (status, response) = post_request(&token, "/orders", body, |cfg| {
        let mut mock = MockBackend::new();
        mock.expect_fetch_product().returning(|_| Ok(Some(active_product("p1", 100_00))));
        mock.expect_reserve_stock()
            .returning(|_, _| Err(FulfillmentError::InsufficientStock { available: 3, requested: 5 }));
        register(cfg, mock);
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response.contains("Insufficient stock"), "{response}");
}

#[actix_web::test]
async fn cancelling_a_terminal_order_is_rejected() {
    let _ = env_logger::try_init();
    let token = issue_token("alice", Role::User);
    let (status, response) = patch_request(&token, "/orders/0000001/cancel", |cfg| {
        let mut mock = MockBackend::new();
        mock.expect_fetch_order().returning(|_| {
            let mut order = pending_order("alice");
            order.status = OrderStatusType::Paid;
            Ok(Some(order))
        });
        mock.expect_cancel_order_with_releases().returning(|id| {
            Err(FulfillmentError::TerminalState { order_id: id.clone(), status: OrderStatusType::Paid })
        });
        register(cfg, mock);
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{response}");
}

#[actix_web::test]
async fn owners_can_cancel_their_pending_orders() {
    let _ = env_logger::try_init();
    let token = issue_token("alice", Role::User);
    let (status, response) = patch_request(&token, "/orders/0000001/cancel", |cfg| {
        let mut mock = MockBackend::new();
        mock.expect_fetch_order().returning(|_| Ok(Some(pending_order("alice"))));
        mock.expect_cancel_order_with_releases().returning(|id| {
            let mut order = pending_order("alice");
            order.id = id.clone();
            order.status = OrderStatusType::Cancelled;
            Ok(order)
        });
        register(cfg, mock);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(response.contains("Cancelled"), "{response}");
}

#[actix_web::test]
async fn unknown_orders_return_404() {
    let _ = env_logger::try_init();
    let token = issue_token("alice", Role::User);
    let (status, _) = get_request(&token, "/orders/missing", |cfg| {
        let mut mock = MockBackend::new();
        mock.expect_fetch_order().returning(|_| Ok(None));
        register(cfg, mock);
    })
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
