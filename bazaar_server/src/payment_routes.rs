//----------------------------------------------   Payments  ----------------------------------------------------

use actix_web::{web, HttpRequest, HttpResponse};
use bazaar_engine::{
    db_types::{OrderId, OrderStatusType},
    helpers::{verify_and_parse, SIGNATURE_HEADER},
    traits::{CatalogManagement, InventoryLedger, OrderManagement, WebhookJournal},
    OrderFlowApi,
    ReconcilerApi,
};
use log::*;

use crate::{
    auth::JwtClaims,
    config::ProviderConfig,
    data_objects::CheckoutRequest,
    errors::ServerError,
    integrations::checkout::CheckoutApi,
    route,
};

route!(create_checkout => Post "/payment/create-checkout" impl OrderManagement, InventoryLedger, CatalogManagement);
/// Creates a hosted checkout session for one of the caller's pending orders and returns the redirect target.
///
/// The order id and user id ride along as session metadata; they come back verbatim in the provider's webhook
/// events, which is how the reconciler finds its way back to the order.
pub async fn create_checkout<B>(
    claims: JwtClaims,
    body: web::Json<CheckoutRequest>,
    api: web::Data<OrderFlowApi<B>>,
    checkout: web::Data<CheckoutApi>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + InventoryLedger + CatalogManagement,
{
    let order_id = OrderId::from(body.into_inner().order_id);
    debug!("💻️ POST create-checkout for order {order_id} by {}", claims.sub);
    let order = api.order(&order_id, &claims.sub, true).await?;
    if order.order.user_id != claims.sub {
        return Err(ServerError::BadRequest("This order does not belong to you".to_string()));
    }
    if order.order.status != OrderStatusType::Pending {
        return Err(ServerError::BadRequest(format!(
            "Order {order_id} is {} and cannot be paid",
            order.order.status
        )));
    }
    let session = checkout.create_session(&order, &claims).await?;
    info!("💻️ Checkout session {} created for order {order_id}", session.session_id);
    Ok(HttpResponse::Ok().json(session))
}

route!(payment_webhook => Post "/webhook" impl OrderManagement, InventoryLedger, CatalogManagement, WebhookJournal);
/// The payment provider's webhook endpoint.
///
/// No session auth here — authenticity comes from the signature over the raw, unmodified request body, which is
/// why this handler takes `web::Bytes` and nothing json-typed. Responses are 200 for everything that was verified
/// and recorded (including event types we ignore); non-2xx responses tell the provider to redeliver.
pub async fn payment_webhook<B>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<ReconcilerApi<B>>,
    provider: web::Data<ProviderConfig>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + InventoryLedger + CatalogManagement + WebhookJournal,
{
    trace!("🔐️ Received webhook request: {}", req.uri());
    let Some(secret) = &provider.webhook_secret else {
        // Refusing is the only safe answer: skipping verification would let anyone mark orders as paid.
        error!("🔐️ Webhook received but BZR_PAYMENT_WEBHOOK_SECRET is not configured. Rejecting.");
        return Err(ServerError::ConfigurationError("Webhook processing is not configured".to_string()));
    };
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ServerError::InvalidWebhookSignature)?;
    let event = verify_and_parse(body.as_ref(), signature, secret.reveal()).map_err(|e| {
        warn!("🔐️ Rejected webhook delivery: {e}");
        ServerError::InvalidWebhookSignature
    })?;
    let event_id = event.event_id.clone();
    match api.handle_event(event).await {
        Ok(disposition) => {
            debug!("🔐️ Webhook event [{event_id}] handled: {disposition:?}");
            Ok(HttpResponse::Ok().json(serde_json::json!({ "received": true })))
        },
        Err(e) => {
            // Non-2xx: the claim has been released and the provider will redeliver.
            warn!("🔐️ Webhook event [{event_id}] could not be processed: {e}");
            Err(e.into())
        },
    }
}
