use std::fmt::Debug;

use log::*;

use crate::{
    events::{EventProducers, PaymentFailedEvent},
    helpers::{PaymentEvent, PaymentEventType},
    traits::{CatalogManagement, InventoryLedger, OrderManagement, WebhookJournal},
    OrderFlowApi,
    OrderFlowError,
    ReconcilerError,
};

/// What happened to a webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    /// The event drove a state change or a notification.
    Processed,
    /// The event id had been processed before; nothing was done. Redeliveries land here.
    Duplicate,
    /// The event was accepted and recorded, but this service takes no action for it.
    Ignored,
}

/// `ReconcilerApi` consumes the payment provider's at-least-once event stream and turns it into
/// exactly-once-effective order transitions.
///
/// Signature verification happens *before* this API, in [`crate::helpers::verify_and_parse`]; everything handed to
/// [`Self::handle_event`] is authentic. This layer owns deduplication and dispatch.
pub struct ReconcilerApi<B> {
    db: B,
    orders: OrderFlowApi<B>,
    producers: EventProducers,
}

impl<B> Debug for ReconcilerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconcilerApi")
    }
}

impl<B> ReconcilerApi<B> {
    pub fn new(db: B, orders: OrderFlowApi<B>, producers: EventProducers) -> Self {
        Self { db, orders, producers }
    }
}

impl<B: Clone> Clone for ReconcilerApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), orders: self.orders.clone(), producers: self.producers.clone() }
    }
}

impl<B> ReconcilerApi<B>
where B: OrderManagement + InventoryLedger + CatalogManagement + WebhookJournal
{
    /// Processes one verified provider event.
    ///
    /// The event id is claimed in the journal before any side effect runs; a concurrent or later redelivery of the
    /// same id short-circuits to [`EventDisposition::Duplicate`] without re-running anything. If dispatch fails in
    /// a way a redelivery could fix (storage unavailable, for instance), the claim is released again and the error
    /// is surfaced, so the provider's retry gets a clean slate. Failures that a retry can never fix — an order that
    /// was cancelled before its payment confirmation arrived — keep the claim and are reported as processed.
    pub async fn handle_event(&self, event: PaymentEvent) -> Result<EventDisposition, ReconcilerError> {
        let event_id = event.event_id.clone();
        let claimed =
            self.db.claim_event(&event_id).await.map_err(|e| ReconcilerError::DatabaseError(e.to_string()))?;
        if !claimed {
            debug!("🔁️ Event [{event_id}] was already processed. Skipping");
            return Ok(EventDisposition::Duplicate);
        }
        let result = self.dispatch(&event).await;
        match result {
            Ok(disposition) => Ok(disposition),
            Err(e) => {
                // Hand the event back to the provider's retry mechanism.
                if let Err(release_err) = self.db.release_event(&event_id).await {
                    error!(
                        "🔁️ Could not release the claim on event [{event_id}]: {release_err}. A redelivery of \
                         this event will be ignored even though it was never applied."
                    );
                }
                Err(e)
            },
        }
    }

    async fn dispatch(&self, event: &PaymentEvent) -> Result<EventDisposition, ReconcilerError> {
        match &event.event_type {
            PaymentEventType::CheckoutCompleted => self.on_checkout_completed(event).await,
            PaymentEventType::PaymentFailed => self.on_payment_failed(event).await,
            PaymentEventType::Other(kind) => {
                debug!("🔁️ Ignoring unhandled event type '{kind}' [{}]", event.event_id);
                Ok(EventDisposition::Ignored)
            },
        }
    }

    async fn on_checkout_completed(&self, event: &PaymentEvent) -> Result<EventDisposition, ReconcilerError> {
        let Some(order_id) = &event.order_id else {
            // Nothing to retry against; acknowledge and move on.
            warn!("🔁️ Checkout-completed event [{}] carries no order id in its metadata", event.event_id);
            return Ok(EventDisposition::Ignored);
        };
        match self.orders.mark_paid(order_id).await {
            Ok(_) => Ok(EventDisposition::Processed),
            Err(OrderFlowError::InvalidTransition { order_id, status }) => {
                // The order was cancelled before the confirmation arrived. Its stock is gone; a retry can never
                // succeed, so the event stays processed and the anomaly is logged for reconciliation.
                error!(
                    "🔁️ Payment confirmation [{}] arrived for order {order_id}, which is already {status}. The \
                     payment needs a manual refund.",
                    event.event_id
                );
                Ok(EventDisposition::Ignored)
            },
            Err(OrderFlowError::OrderNotFound(order_id)) => {
                warn!("🔁️ Event [{}] references order {order_id}, which does not exist", event.event_id);
                Ok(EventDisposition::Ignored)
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn on_payment_failed(&self, event: &PaymentEvent) -> Result<EventDisposition, ReconcilerError> {
        // No state transition: the order stays Pending and the user can retry or cancel.
        match (&event.order_id, &event.user_id) {
            (Some(order_id), Some(user_id)) => {
                info!("🔁️ Payment failed for order {order_id}. Notifying {user_id}");
                for emitter in &self.producers.payment_failed_producer {
                    let ev = PaymentFailedEvent { order_id: order_id.clone(), user_id: user_id.clone() };
                    emitter.publish_event(ev).await;
                }
                Ok(EventDisposition::Processed)
            },
            _ => {
                warn!("🔁️ Payment-failed event [{}] lacks order or user metadata", event.event_id);
                Ok(EventDisposition::Ignored)
            },
        }
    }
}
