use actix_web::{http::StatusCode, web, web::ServiceConfig};
use bazaar_common::Money;
use bazaar_engine::{
    db_types::{Product, ProductId, Role},
    traits::FulfillmentError,
    CatalogApi,
};
use chrono::Utc;

use super::{
    helpers::{get_request, issue_token, post_request},
    mocks::MockBackend,
};
use crate::routes::{ActiveProductsRoute, CreateProductRoute, ProductByIdRoute};

fn register(cfg: &mut ServiceConfig, mock: MockBackend) {
    let api = CatalogApi::new(mock);
    cfg.service(ActiveProductsRoute::<MockBackend>::new())
        .service(ProductByIdRoute::<MockBackend>::new())
        .service(CreateProductRoute::<MockBackend>::new())
        .app_data(web::Data::new(api));
}

fn product(sku: &str) -> Product {
    Product {
        id: ProductId::from("p1".to_string()),
        sku: sku.to_string(),
        name: "Widget".to_string(),
        description: Some("A widget".to_string()),
        price: Money::from(25_00),
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[actix_web::test]
async fn product_creation_is_admin_only() {
    let _ = env_logger::try_init();
    let token = issue_token("alice", Role::User);
    let body = serde_json::json!({ "sku": "W-1", "name": "Widget", "description": null, "price": 2500 });
    let (status, _) = post_request(&token, "/products", body, |cfg| register(cfg, MockBackend::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn admins_create_products() {
    let _ = env_logger::try_init();
    let token = issue_token("root", Role::Admin);
    let body = serde_json::json!({ "sku": "W-1", "name": "Widget", "description": null, "price": 2500 });
    let (status, response) = post_request(&token, "/products", body, |cfg| {
        let mut mock = MockBackend::new();
        mock.expect_insert_product().withf(|p| p.sku == "W-1").returning(|p| Ok(product(&p.sku)));
        register(cfg, mock);
    })
    .await;
    assert_eq!(status, StatusCode::CREATED, "{response}");
    assert!(response.contains("W-1"), "{response}");
}

#[actix_web::test]
async fn duplicate_skus_conflict() {
    let _ = env_logger::try_init();
    let token = issue_token("root", Role::Admin);
    let body = serde_json::json!({ "sku": "W-1", "name": "Widget", "description": null, "price": 2500 });
    let (status, response) = post_request(&token, "/products", body, |cfg| {
        let mut mock = MockBackend::new();
        mock.expect_insert_product().returning(|p| Err(FulfillmentError::DuplicateSku(p.sku)));
        register(cfg, mock);
    })
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(response.contains("already exists"), "{response}");
}

#[actix_web::test]
async fn listing_is_open_to_any_authenticated_user() {
    let _ = env_logger::try_init();
    let token = issue_token("alice", Role::User);
    let (status, response) = get_request(&token, "/products", |cfg| {
        let mut mock = MockBackend::new();
        mock.expect_fetch_active_products().returning(|| Ok(vec![product("W-1"), product("W-2")]));
        register(cfg, mock);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(response.contains("W-2"), "{response}");
}

#[actix_web::test]
async fn missing_products_are_404() {
    let _ = env_logger::try_init();
    let token = issue_token("alice", Role::User);
    let (status, _) = get_request(&token, "/products/nope", |cfg| {
        let mut mock = MockBackend::new();
        mock.expect_fetch_product().returning(|_| Ok(None));
        register(cfg, mock);
    })
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
