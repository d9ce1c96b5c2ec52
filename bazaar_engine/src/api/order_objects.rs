use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderItem, OrderStatusType, ProductId};

//--------------------------------------   OrderItemRequest   ---------------------------------------------------------
/// One requested line of a new order, as submitted by a client. Prices are never accepted from clients; they are
/// snapshotted from the catalog at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

//--------------------------------------    OrderWithItems    ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

//--------------------------------------   OrderQueryFilter   ---------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct OrderQueryFilter {
    pub user_id: Option<String>,
    pub statuses: Vec<OrderStatusType>,
}

impl OrderQueryFilter {
    pub fn with_user_id<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.statuses.is_empty()
    }
}
