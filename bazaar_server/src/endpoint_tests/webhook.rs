use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use bazaar_common::Secret;
use bazaar_engine::{
    events::EventProducers,
    helpers::{sign_payload, SIGNATURE_HEADER},
    traits::PaidOutcome,
    OrderFlowApi,
    ReconcilerApi,
};

use super::{
    helpers::{pending_order, run_request},
    mocks::MockBackend,
};
use crate::{config::ProviderConfig, payment_routes::PaymentWebhookRoute};

const WEBHOOK_SECRET: &str = "whsec_endpoint_tests";

fn provider_config(with_secret: bool) -> ProviderConfig {
    ProviderConfig {
        secret_key: Secret::new("sk_test".to_string()),
        webhook_secret: with_secret.then(|| Secret::new(WEBHOOK_SECRET.to_string())),
        api_url: "https://api.test".to_string(),
        success_url: "https://shop.test/success".to_string(),
        cancel_url: "https://shop.test/cancel".to_string(),
    }
}

fn register(cfg: &mut ServiceConfig, journal: MockBackend, flow: MockBackend, with_secret: bool) {
    let api = ReconcilerApi::new(journal, OrderFlowApi::new(flow, EventProducers::default()), EventProducers::default());
    cfg.service(PaymentWebhookRoute::<MockBackend>::new())
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(provider_config(with_secret)));
}

fn checkout_completed_body(event_id: &str) -> String {
    serde_json::json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "data": { "object": { "metadata": { "order_id": "0000001", "user_id": "alice" } } }
    })
    .to_string()
}

fn signed_request(body: &str) -> TestRequest {
    let signature = sign_payload(body.as_bytes(), WEBHOOK_SECRET, 1_700_000_000);
    TestRequest::post()
        .uri("/webhook")
        .insert_header((SIGNATURE_HEADER, signature))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.to_string())
}

#[actix_web::test]
async fn deliveries_without_a_signature_are_rejected() {
    let _ = env_logger::try_init();
    let body = checkout_completed_body("evt_1");
    let req = TestRequest::post().uri("/webhook").set_payload(body);
    let (status, _) = run_request(req, |cfg| register(cfg, MockBackend::new(), MockBackend::new(), true)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn tampered_deliveries_are_rejected() {
    let _ = env_logger::try_init();
    let body = checkout_completed_body("evt_1");
    let signature = sign_payload(body.as_bytes(), "the wrong secret", 1_700_000_000);
    let req = TestRequest::post()
        .uri("/webhook")
        .insert_header((SIGNATURE_HEADER, signature))
        .set_payload(body);
    let (status, response) =
        run_request(req, |cfg| register(cfg, MockBackend::new(), MockBackend::new(), true)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response.contains("signature"), "{response}");
}

#[actix_web::test]
async fn verified_confirmations_mark_the_order_paid() {
    let _ = env_logger::try_init();
    let body = checkout_completed_body("evt_1");
    let (status, response) = run_request(signed_request(&body), |cfg| {
        let mut journal = MockBackend::new();
        journal.expect_claim_event().withf(|id| id == "evt_1").returning(|_| Ok(true));
        let mut flow = MockBackend::new();
        flow.expect_mark_order_paid().withf(|id| id.as_str() == "0000001").returning(|_| {
            let mut order = pending_order("alice");
            order.status = bazaar_engine::db_types::OrderStatusType::Paid;
            Ok(PaidOutcome::Paid(order))
        });
        register(cfg, journal, flow, true);
    })
    .await;
    assert_eq!(status, StatusCode::OK, "{response}");
    assert_eq!(response, "{\"received\":true}");
}

#[actix_web::test]
async fn redelivered_events_are_acknowledged_without_side_effects() {
    let _ = env_logger::try_init();
    let body = checkout_completed_body("evt_1");
    let (status, response) = run_request(signed_request(&body), |cfg| {
        let mut journal = MockBackend::new();
        journal.expect_claim_event().returning(|_| Ok(false));
        // No expectations on the flow mock: any order mutation would panic the test
        register(cfg, journal, MockBackend::new(), true);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, "{\"received\":true}");
}

#[actix_web::test]
async fn ignored_event_types_still_get_a_200() {
    let _ = env_logger::try_init();
    let body = serde_json::json!({ "id": "evt_9", "type": "customer.created", "data": {} }).to_string();
    let (status, response) = run_request(signed_request(&body), |cfg| {
        let mut journal = MockBackend::new();
        journal.expect_claim_event().returning(|_| Ok(true));
        register(cfg, journal, MockBackend::new(), true);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, "{\"received\":true}");
}

#[actix_web::test]
async fn missing_webhook_secret_hard_fails() {
    let _ = env_logger::try_init();
    let body = checkout_completed_body("evt_1");
    let (status, _) =
        run_request(signed_request(&body), |cfg| register(cfg, MockBackend::new(), MockBackend::new(), false)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn transient_dispatch_failures_release_the_claim_and_propagate() {
    let _ = env_logger::try_init();
    let body = checkout_completed_body("evt_1");
    let (status, _) = run_request(signed_request(&body), |cfg| {
        let mut journal = MockBackend::new();
        journal.expect_claim_event().returning(|_| Ok(true));
        journal.expect_release_event().withf(|id| id == "evt_1").times(1).returning(|_| Ok(()));
        let mut flow = MockBackend::new();
        flow.expect_mark_order_paid()
            .returning(|_| Err(bazaar_engine::traits::FulfillmentError::DatabaseError("storage offline".into())));
        register(cfg, journal, flow, true);
    })
    .await;
    // Non-2xx tells the provider to redeliver; the released claim lets the retry through
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
