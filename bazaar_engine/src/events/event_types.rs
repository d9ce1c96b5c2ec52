use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderId, ProductId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelledEvent {
    pub order: Order,
}

impl OrderCancelledEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Emitted when the provider reports a failed payment attempt. The order stays `Pending`; the owner is informed so
/// they can retry or cancel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFailedEvent {
    pub order_id: OrderId,
    pub user_id: String,
}

/// Emitted when a reservation leaves a product's available count at or below the alert threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockEvent {
    pub product_id: ProductId,
    pub available: i64,
    pub threshold: i64,
}
