use actix_web::{
    body::MessageBody,
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use bazaar_common::{Money, Secret};
use bazaar_engine::db_types::{Order, OrderId, OrderStatusType, Role};
use chrono::{TimeZone, Utc};

use crate::{
    auth::{JwtValidator, TokenIssuer},
    config::AuthConfig,
};

// Creates a test `AuthConfig` for issuing tokens. DO NOT re-use this secret anywhere.
pub fn get_auth_config() -> AuthConfig {
    AuthConfig { jwt_secret: Secret::new("endpoint-test-secret-do-not-reuse-0123456789".to_string()) }
}

pub fn issue_token(user_id: &str, role: Role) -> String {
    TokenIssuer::new(&get_auth_config())
        .issue_token(user_id, &format!("{user_id}@example.com"), role, None)
        .expect("Failed to sign token")
}

pub fn pending_order(user_id: &str) -> Order {
    Order {
        id: OrderId::from("0000001".to_string()),
        user_id: user_id.to_string(),
        status: OrderStatusType::Pending,
        total_price: Money::from(100_00),
        created_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 30, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 30, 0).unwrap(),
        paid_at: None,
    }
}

pub async fn get_request(
    auth_token: &str,
    path: &str,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    send_request(TestRequest::get(), auth_token, path, None, configure).await
}

pub async fn post_request(
    auth_token: &str,
    path: &str,
    body: serde_json::Value,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    send_request(TestRequest::post(), auth_token, path, Some(body), configure).await
}

pub async fn patch_request(
    auth_token: &str,
    path: &str,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    send_request(TestRequest::patch(), auth_token, path, None, configure).await
}

pub async fn send_request(
    mut req: TestRequest,
    auth_token: &str,
    path: &str,
    body: Option<serde_json::Value>,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    req = req.uri(path);
    if !auth_token.is_empty() {
        req = req.insert_header(("Authorization", format!("Bearer {auth_token}")));
    }
    if let Some(body) = body {
        req = req.set_json(body);
    }
    run_request(req, configure).await
}

/// Runs a prepared request against a freshly configured test app and returns status and body, whichever side of
/// the middleware chain the response came from.
pub async fn run_request(req: TestRequest, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    let validator = JwtValidator::new(&get_auth_config());
    let app = App::new().app_data(web::Data::new(validator)).configure(configure);
    let service = test::init_service(app).await;
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
            (status, body)
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let bytes = actix_web::body::to_bytes(res.into_body()).await.unwrap();
            (status, String::from_utf8_lossy(&bytes).into_owned())
        },
    }
}
