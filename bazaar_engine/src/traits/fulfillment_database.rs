use thiserror::Error;

use crate::{
    db_types::{OrderId, OrderStatusType, ProductId},
    traits::{CatalogManagement, InventoryLedger, OrderManagement, WebhookJournal},
};

/// The full backend contract. Anything that implements this can drive the whole engine.
pub trait FulfillmentDatabase:
    Clone + InventoryLedger + OrderManagement + CatalogManagement + WebhookJournal
{
    /// The URL of the database
    fn url(&self) -> &str;
}

/// The error type shared by all backend traits.
///
/// Backends map their driver errors into [`FulfillmentError::DatabaseError`]; the typed variants carry the domain
/// failures that callers branch on (insufficient stock, terminal-state violations, and so on).
#[derive(Debug, Clone, Error)]
pub enum FulfillmentError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Product {0} does not exist")]
    ProductNotFound(ProductId),
    #[error("No inventory record exists for product {0}")]
    InventoryNotFound(ProductId),
    #[error("A product with SKU '{0}' already exists")]
    DuplicateSku(String),
    #[error("Insufficient stock. Available: {available}, requested: {requested}")]
    InsufficientStock { available: i64, requested: i64 },
    #[error("Insufficient reserved stock. Reserved: {reserved}, requested: {requested}")]
    InsufficientReserved { reserved: i64, requested: i64 },
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Cannot insert order {0}, it already exists")]
    OrderAlreadyExists(OrderId),
    #[error("Order {order_id} is {status}, which permits no further transitions")]
    TerminalState { order_id: OrderId, status: OrderStatusType },
    #[error("Quantity must be strictly positive, got {0}")]
    NonPositiveQuantity(i64),
}

impl From<sqlx::Error> for FulfillmentError {
    fn from(e: sqlx::Error) -> Self {
        FulfillmentError::DatabaseError(e.to_string())
    }
}
