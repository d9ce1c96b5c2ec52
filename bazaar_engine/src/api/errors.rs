use thiserror::Error;

use crate::{
    db_types::{OrderId, OrderStatusType, ProductId},
    helpers::WebhookSignatureError,
    traits::FulfillmentError,
};

//--------------------------------------    OrderFlowError    ---------------------------------------------------------
/// Failures surfaced by the order lifecycle. Every variant is a distinct, user-visible failure; storage detail only
/// ever travels in `DatabaseError`, which the server reports as an opaque internal error.
#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Product {0} does not exist")]
    ProductNotFound(ProductId),
    #[error("Product '{0}' is no longer available")]
    ProductInactive(String),
    #[error("Insufficient stock. Available: {available}, requested: {requested}")]
    InsufficientStock { available: i64, requested: i64 },
    #[error("Invalid release. Reserved: {reserved}, requested: {requested}")]
    InvalidRelease { reserved: i64, requested: i64 },
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {order_id} is {status}; the requested transition is not permitted")]
    InvalidTransition { order_id: OrderId, status: OrderStatusType },
    #[error("You do not have access to this order")]
    Forbidden,
    #[error("Invalid order request: {0}")]
    Validation(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<FulfillmentError> for OrderFlowError {
    fn from(e: FulfillmentError) -> Self {
        use FulfillmentError::*;
        match e {
            ProductNotFound(id) | InventoryNotFound(id) => OrderFlowError::ProductNotFound(id),
            InsufficientStock { available, requested } => OrderFlowError::InsufficientStock { available, requested },
            InsufficientReserved { reserved, requested } => OrderFlowError::InvalidRelease { reserved, requested },
            OrderNotFound(id) => OrderFlowError::OrderNotFound(id),
            TerminalState { order_id, status } => OrderFlowError::InvalidTransition { order_id, status },
            NonPositiveQuantity(qty) => {
                OrderFlowError::Validation(format!("Quantity must be strictly positive, got {qty}"))
            },
            other => OrderFlowError::DatabaseError(other.to_string()),
        }
    }
}

//--------------------------------------    ReconcilerError   ---------------------------------------------------------
#[derive(Debug, Clone, Error)]
pub enum ReconcilerError {
    #[error("Webhook signature verification failed: {0}")]
    InvalidSignature(#[from] WebhookSignatureError),
    #[error("{0}")]
    OrderFlow(#[from] OrderFlowError),
    #[error("Database error: {0}")]
    DatabaseError(String),
}
