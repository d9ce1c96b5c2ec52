use std::fmt::Debug;

use bazaar_common::Money;
use log::*;

use crate::{
    db_types::{NewOrder, NewOrderItem, Order, OrderId, OrderStatusType},
    events::{EventProducers, LowStockEvent, OrderCancelledEvent, OrderCreatedEvent, OrderPaidEvent},
    order_objects::{OrderItemRequest, OrderQueryFilter, OrderWithItems},
    traits::{CatalogManagement, InventoryLedger, OrderManagement, PaidOutcome},
    OrderFlowError,
};

pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// `OrderFlowApi` is the order lifecycle state machine: it owns order creation (multi-line reservation with
/// compensating rollback), cancellation (authorized, all-or-nothing release) and the payment-driven
/// `Pending -> Paid` transition. It is the sole writer of `Order.status`.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
    low_stock_threshold: i64,
}

impl<B: Clone> Clone for OrderFlowApi<B> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            producers: self.producers.clone(),
            low_stock_threshold: self.low_stock_threshold,
        }
    }
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD }
    }

    pub fn with_low_stock_threshold(mut self, threshold: i64) -> Self {
        self.low_stock_threshold = threshold;
        self
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement + InventoryLedger + CatalogManagement
{
    /// Creates a new order for `user_id`.
    ///
    /// Every requested product must exist and be active, and the ledger must grant a reservation for every line.
    /// Reservations are taken one line at a time; if line `k` is refused, the reservations already granted for
    /// lines `0..k` are released again *before* this function returns, so a failed creation leaves no trace. The
    /// compensating release is part of this call, not deferred cleanup.
    ///
    /// The total price is the sum of catalog price snapshots times quantities, fixed at this moment for the life
    /// of the order.
    pub async fn create_order(
        &self,
        user_id: &str,
        items: &[OrderItemRequest],
    ) -> Result<OrderWithItems, OrderFlowError> {
        if items.is_empty() {
            return Err(OrderFlowError::Validation("An order needs at least one item".to_string()));
        }
        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            if item.quantity <= 0 {
                return Err(OrderFlowError::Validation(format!(
                    "Quantity for product {} must be strictly positive, got {}",
                    item.product_id, item.quantity
                )));
            }
            let product = self
                .db
                .fetch_product(&item.product_id)
                .await
                .map_err(OrderFlowError::from)?
                .ok_or_else(|| OrderFlowError::ProductNotFound(item.product_id.clone()))?;
            if !product.is_active {
                return Err(OrderFlowError::ProductInactive(product.name));
            }
            lines.push(NewOrderItem {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
                unit_price: product.price,
            });
        }

        for (idx, line) in lines.iter().enumerate() {
            match self.db.reserve_stock(&line.product_id, line.quantity).await {
                Ok(record) => {
                    trace!(
                        "🔄️📦️ Reserved {} x{} ({} available)",
                        line.product_id,
                        line.quantity,
                        record.available
                    );
                    if record.available <= self.low_stock_threshold {
                        self.call_low_stock_hook(LowStockEvent {
                            product_id: line.product_id.clone(),
                            available: record.available,
                            threshold: self.low_stock_threshold,
                        })
                        .await;
                    }
                },
                Err(e) => {
                    warn!("🔄️📦️ Reservation failed on line {}: {e}. Rolling back {idx} earlier lines", idx + 1);
                    self.rollback_reservations(&lines[..idx]).await;
                    return Err(e.into());
                },
            }
        }

        let total_price = lines.iter().map(|line| line.unit_price * line.quantity).sum::<Money>();
        let order =
            NewOrder { id: OrderId::new(), user_id: user_id.to_string(), total_price, items: lines.clone() };
        let stored = match self.db.insert_order(order).await {
            Ok(order) => order,
            Err(e) => {
                // Persisting failed after every reservation succeeded; undo them all.
                self.rollback_reservations(&lines).await;
                return Err(e.into());
            },
        };
        let stored_items = self.db.fetch_order_items(&stored.id).await.map_err(OrderFlowError::from)?;
        info!("🔄️📦️ Order {} created for user {user_id}. Total: {total_price}", stored.id);
        self.call_order_created_hook(&stored).await;
        Ok(OrderWithItems { order: stored, items: stored_items })
    }

    /// Marks an order as paid in response to a verified payment confirmation.
    ///
    /// Idempotent at the order-state level: confirmations are redelivered, so an already-`Paid` order is a
    /// successful no-op (and fires no second hook). A `Cancelled` order can never become paid — its stock has
    /// already been released and may have been resold — so that case fails with
    /// [`OrderFlowError::InvalidTransition`].
    pub async fn mark_paid(&self, order_id: &OrderId) -> Result<PaidOutcome, OrderFlowError> {
        let outcome = self.db.mark_order_paid(order_id).await?;
        match &outcome {
            PaidOutcome::Paid(order) => {
                info!("🔄️💰️ Order {} marked as paid", order.id);
                self.call_order_paid_hook(order).await;
            },
            PaidOutcome::AlreadyPaid(order) => {
                debug!("🔄️💰️ Order {} was already paid. No-op", order.id);
            },
        }
        Ok(outcome)
    }

    /// Cancels a pending order and returns its reserved stock to `available`.
    ///
    /// The requester must own the order or be an admin. The status flip and every line release happen inside one
    /// backend transaction, so a cancellation either applies completely or not at all, and no line can ever be
    /// released twice.
    pub async fn cancel_order(
        &self,
        order_id: &OrderId,
        requester_id: &str,
        is_admin: bool,
    ) -> Result<Order, OrderFlowError> {
        let order = self
            .db
            .fetch_order(order_id)
            .await
            .map_err(OrderFlowError::from)?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        if !is_admin && order.user_id != requester_id {
            return Err(OrderFlowError::Forbidden);
        }
        if !order.status.can_transition_to(OrderStatusType::Cancelled) {
            return Err(OrderFlowError::InvalidTransition { order_id: order_id.clone(), status: order.status });
        }
        // The conditional update inside the transaction re-checks the status; this early rejection just avoids
        // starting a transaction for an order that is already terminal.
        let cancelled = self.db.cancel_order_with_releases(order_id).await?;
        info!("🔄️❌️ Order {} cancelled by {requester_id}", cancelled.id);
        self.call_order_cancelled_hook(&cancelled).await;
        Ok(cancelled)
    }

    /// Fetches a single order with its lines. Non-admins can only see their own orders.
    pub async fn order(
        &self,
        order_id: &OrderId,
        requester_id: &str,
        is_admin: bool,
    ) -> Result<OrderWithItems, OrderFlowError> {
        let order = self
            .db
            .fetch_order(order_id)
            .await
            .map_err(OrderFlowError::from)?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        if !is_admin && order.user_id != requester_id {
            return Err(OrderFlowError::Forbidden);
        }
        let items = self.db.fetch_order_items(order_id).await.map_err(OrderFlowError::from)?;
        Ok(OrderWithItems { order, items })
    }

    /// Lists orders, newest first. Admins see everything, everyone else sees their own.
    pub async fn orders(&self, requester_id: &str, is_admin: bool) -> Result<Vec<Order>, OrderFlowError> {
        let mut filter = OrderQueryFilter::default();
        if !is_admin {
            filter = filter.with_user_id(requester_id);
        }
        let orders = self.db.fetch_orders(filter).await?;
        Ok(orders)
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    async fn rollback_reservations(&self, reserved: &[NewOrderItem]) {
        for line in reserved {
            if let Err(e) = self.db.release_stock(&line.product_id, line.quantity).await {
                // No good recovery here; releasing units we ourselves reserved should not fail.
                error!(
                    "🔄️📦️ Compensating release of {} x{} failed: {e}. The ledger needs manual attention.",
                    line.product_id, line.quantity
                );
            }
        }
    }

    async fn call_order_created_hook(&self, order: &Order) {
        for emitter in &self.producers.order_created_producer {
            let event = OrderCreatedEvent::new(order.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_order_paid_hook(&self, order: &Order) {
        for emitter in &self.producers.order_paid_producer {
            debug!("🔄️📦️ Notifying order paid hook subscribers");
            let event = OrderPaidEvent::new(order.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_order_cancelled_hook(&self, order: &Order) {
        for emitter in &self.producers.order_cancelled_producer {
            let event = OrderCancelledEvent::new(order.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_low_stock_hook(&self, event: LowStockEvent) {
        for emitter in &self.producers.low_stock_producer {
            emitter.publish_event(event.clone()).await;
        }
    }
}
