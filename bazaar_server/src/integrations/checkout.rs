//! REST client for the payment provider's hosted checkout.
//!
//! The provider owns the entire payment UI and card handling; this service only creates a session and hands the
//! customer the redirect URL. Confirmation comes back asynchronously through the webhook, never through this
//! client.

use std::sync::Arc;

use bazaar_engine::order_objects::OrderWithItems;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde::{Deserialize, Serialize};

use crate::{auth::JwtClaims, config::ProviderConfig, errors::ServerError};

#[derive(Clone)]
pub struct CheckoutApi {
    config: ProviderConfig,
    client: Arc<Client>,
}

#[derive(Debug, Clone, Serialize)]
struct CheckoutSessionRequest {
    mode: &'static str,
    success_url: String,
    cancel_url: String,
    client_reference_id: String,
    customer_email: String,
    line_items: Vec<CheckoutLineItem>,
    metadata: CheckoutMetadata,
}

#[derive(Debug, Clone, Serialize)]
struct CheckoutLineItem {
    product_id: String,
    /// Minor currency units, straight from the order's price snapshot.
    unit_amount: i64,
    quantity: i64,
}

/// Echoed back verbatim in webhook events; this is the reconciler's route back to the order.
#[derive(Debug, Clone, Serialize)]
struct CheckoutMetadata {
    order_id: String,
    user_id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CheckoutSessionReply {
    id: String,
    url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub session_id: String,
    pub url: String,
}

impl CheckoutApi {
    pub fn new(config: ProviderConfig) -> Result<Self, ServerError> {
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = format!("Bearer {}", config.secret_key.reveal());
        let val = HeaderValue::from_str(&bearer)
            .map_err(|e| ServerError::InitializeError(format!("Invalid payment provider key: {e}")))?;
        headers.insert("Authorization", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// Creates a hosted checkout session for the given order and returns the session id and redirect URL.
    pub async fn create_session(
        &self,
        order: &OrderWithItems,
        user: &JwtClaims,
    ) -> Result<CheckoutSession, ServerError> {
        let request = self.session_request(order, user);
        let url = format!("{}/v1/checkout/sessions", self.config.api_url);
        trace!("💳️ Creating checkout session at {url}");
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ServerError::PaymentProviderError(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            error!("💳️ Provider refused the checkout session ({status}): {message}");
            return Err(ServerError::PaymentProviderError(format!("Provider returned status {status}")));
        }
        let reply = response
            .json::<CheckoutSessionReply>()
            .await
            .map_err(|e| ServerError::PaymentProviderError(e.to_string()))?;
        Ok(CheckoutSession { session_id: reply.id, url: reply.url })
    }

    fn session_request(&self, order: &OrderWithItems, user: &JwtClaims) -> CheckoutSessionRequest {
        let line_items = order
            .items
            .iter()
            .map(|item| CheckoutLineItem {
                product_id: item.product_id.to_string(),
                unit_amount: item.unit_price.value(),
                quantity: item.quantity,
            })
            .collect();
        CheckoutSessionRequest {
            mode: "payment",
            success_url: format!("{}?session_id={{CHECKOUT_SESSION_ID}}", self.config.success_url),
            cancel_url: self.config.cancel_url.clone(),
            client_reference_id: order.order.id.as_str().to_string(),
            customer_email: user.email.clone(),
            line_items,
            metadata: CheckoutMetadata {
                order_id: order.order.id.as_str().to_string(),
                user_id: user.sub.clone(),
            },
        }
    }
}

#[cfg(test)]
mod test {
    use bazaar_common::{Money, Secret};
    use bazaar_engine::db_types::{Order, OrderItem, OrderStatusType};
    use chrono::Utc;

    use super::*;

    fn order_with_items() -> OrderWithItems {
        let order = Order {
            id: "order-7".to_string().into(),
            user_id: "user-9".to_string(),
            status: OrderStatusType::Pending,
            total_price: Money::from(350_00),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            paid_at: None,
        };
        let items = vec![OrderItem {
            id: 1,
            order_id: order.id.clone(),
            product_id: "prod-1".to_string().into(),
            quantity: 2,
            unit_price: Money::from(175_00),
        }];
        OrderWithItems { order, items }
    }

    #[test]
    fn session_request_carries_order_metadata_and_snapshots() {
        let config = ProviderConfig {
            secret_key: Secret::new("sk_test".to_string()),
            webhook_secret: None,
            api_url: "https://api.test".to_string(),
            success_url: "https://shop.test/success".to_string(),
            cancel_url: "https://shop.test/cancel".to_string(),
        };
        let api = CheckoutApi::new(config).unwrap();
        let claims = JwtClaims {
            sub: "user-9".to_string(),
            email: "u9@example.com".to_string(),
            role: bazaar_engine::db_types::Role::User,
            exp: 0,
        };
        let request = api.session_request(&order_with_items(), &claims);
        assert_eq!(request.metadata.order_id, "order-7");
        assert_eq!(request.metadata.user_id, "user-9");
        assert_eq!(request.client_reference_id, "order-7");
        assert_eq!(request.line_items.len(), 1);
        assert_eq!(request.line_items[0].unit_amount, 175_00);
        assert_eq!(request.line_items[0].quantity, 2);
        assert!(request.success_url.contains("session_id="));
    }
}
