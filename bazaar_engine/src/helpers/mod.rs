mod webhook_signature;

pub use webhook_signature::{
    sign_payload,
    verify_and_parse,
    PaymentEvent,
    PaymentEventType,
    WebhookSignatureError,
    SIGNATURE_HEADER,
};
