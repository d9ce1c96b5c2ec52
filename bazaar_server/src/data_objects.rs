use std::fmt::Display;

use bazaar_engine::{
    db_types::{InventoryRecord, ProductId, StockOperation},
    order_objects::OrderItemRequest,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockUpdateRequest {
    pub product_id: ProductId,
    pub quantity: i64,
    pub operation: StockOperation,
}

/// Body for the internal-facing reserve/release endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovementRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LowStockQuery {
    pub threshold: Option<i64>,
}

/// Snapshot response. Total stock is derived, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSnapshotResponse {
    #[serde(flatten)]
    pub record: InventoryRecord,
    pub total_stock: i64,
}

impl From<InventoryRecord> for StockSnapshotResponse {
    fn from(record: InventoryRecord) -> Self {
        let total_stock = record.total_stock();
        Self { record, total_stock }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub order_id: String,
}
