use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use bazaar_engine::{traits::FulfillmentError, OrderFlowError, ReconcilerError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server.")]
    BackendError(String),
    #[error("Auth token signature invalid or not provided")]
    CouldNotDeserializeAuthToken,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Invalid request. {0}")]
    BadRequest(String),
    #[error("Conflict. {0}")]
    Conflict(String),
    #[error("Webhook signature verification failed.")]
    InvalidWebhookSignature,
    #[error("Could not reach the payment provider. {0}")]
    PaymentProviderError(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::CouldNotDeserializeAuthToken => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::InvalidWebhookSignature => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::PaymentProviderError(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Backend detail goes to the logs, not to the client.
        if let ServerError::BackendError(detail) = self {
            log::error!("💻️ Backend error: {detail}");
        }
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match &e {
            OrderFlowError::ProductNotFound(_) | OrderFlowError::OrderNotFound(_) => {
                ServerError::NoRecordFound(e.to_string())
            },
            OrderFlowError::ProductInactive(_)
            | OrderFlowError::InsufficientStock { .. }
            | OrderFlowError::InvalidRelease { .. }
            | OrderFlowError::InvalidTransition { .. }
            | OrderFlowError::Validation(_) => ServerError::BadRequest(e.to_string()),
            OrderFlowError::Forbidden => ServerError::InsufficientPermissions(e.to_string()),
            OrderFlowError::DatabaseError(detail) => ServerError::BackendError(detail.clone()),
        }
    }
}

impl From<FulfillmentError> for ServerError {
    fn from(e: FulfillmentError) -> Self {
        match &e {
            FulfillmentError::ProductNotFound(_)
            | FulfillmentError::InventoryNotFound(_)
            | FulfillmentError::OrderNotFound(_) => ServerError::NoRecordFound(e.to_string()),
            FulfillmentError::DuplicateSku(_) => ServerError::Conflict(e.to_string()),
            FulfillmentError::InsufficientStock { .. }
            | FulfillmentError::InsufficientReserved { .. }
            | FulfillmentError::TerminalState { .. }
            | FulfillmentError::NonPositiveQuantity(_)
            | FulfillmentError::OrderAlreadyExists(_) => ServerError::BadRequest(e.to_string()),
            FulfillmentError::DatabaseError(detail) => ServerError::BackendError(detail.clone()),
        }
    }
}

impl From<ReconcilerError> for ServerError {
    fn from(e: ReconcilerError) -> Self {
        match e {
            ReconcilerError::InvalidSignature(_) => ServerError::InvalidWebhookSignature,
            ReconcilerError::OrderFlow(inner) => inner.into(),
            ReconcilerError::DatabaseError(detail) => ServerError::BackendError(detail),
        }
    }
}
