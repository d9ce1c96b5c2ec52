//! Payment-provider webhook authentication.
//!
//! The provider signs every delivery with `HMAC-SHA256(secret, "<timestamp>.<raw body>")` and sends the result in
//! the `X-Bazaar-Signature` header as `t=<unix seconds>,v1=<hex digest>`. Verification runs over the exact bytes
//! received on the wire — the payload must not be deserialized, re-serialized or otherwise transformed before this
//! function has seen it, since any re-encoding would change the digest.
//!
//! This is a plain function rather than transport middleware so that it can be exercised (and reasoned about)
//! without an HTTP stack in sight.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use crate::db_types::OrderId;

/// The header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "x-bazaar-signature";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookSignatureError {
    #[error("The signature header is malformed: {0}")]
    MalformedHeader(String),
    #[error("The payload signature does not match")]
    InvalidSignature,
    #[error("The event payload could not be parsed: {0}")]
    MalformedPayload(String),
}

//--------------------------------------    PaymentEventType   --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEventType {
    /// The customer completed the hosted checkout; the order can be marked as paid.
    CheckoutCompleted,
    /// A payment attempt failed. No state changes; the order owner is informed.
    PaymentFailed,
    /// Any event type this service does not act on. Accepted and ignored, so new provider event types never break
    /// webhook processing.
    Other(String),
}

impl From<&str> for PaymentEventType {
    fn from(value: &str) -> Self {
        match value {
            "checkout.session.completed" => Self::CheckoutCompleted,
            "payment_intent.payment_failed" => Self::PaymentFailed,
            other => Self::Other(other.to_string()),
        }
    }
}

//--------------------------------------      PaymentEvent     --------------------------------------------------------
/// A verified, typed webhook event. `event_id` is globally unique per provider and is the deduplication key.
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    pub event_id: String,
    pub event_type: PaymentEventType,
    pub order_id: Option<OrderId>,
    pub user_id: Option<String>,
}

#[derive(Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: RawEventData,
}

#[derive(Deserialize, Default)]
struct RawEventData {
    #[serde(default)]
    object: RawEventObject,
}

#[derive(Deserialize, Default)]
struct RawEventObject {
    #[serde(default)]
    metadata: RawMetadata,
}

#[derive(Deserialize, Default)]
struct RawMetadata {
    order_id: Option<String>,
    user_id: Option<String>,
}

/// Recomputes the signature over the raw payload bytes and, if it matches, parses the payload into a typed event.
pub fn verify_and_parse(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
) -> Result<PaymentEvent, WebhookSignatureError> {
    let (timestamp, signature) = split_header(signature_header)?;
    let digest =
        hex::decode(signature).map_err(|e| WebhookSignatureError::MalformedHeader(format!("v1 is not hex: {e}")))?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| WebhookSignatureError::MalformedHeader(e.to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    // verify_slice is a constant-time comparison
    mac.verify_slice(&digest).map_err(|_| WebhookSignatureError::InvalidSignature)?;

    let raw: RawEvent =
        serde_json::from_slice(payload).map_err(|e| WebhookSignatureError::MalformedPayload(e.to_string()))?;
    let metadata = raw.data.object.metadata;
    Ok(PaymentEvent {
        event_id: raw.id,
        event_type: PaymentEventType::from(raw.event_type.as_str()),
        order_id: metadata.order_id.map(OrderId::from),
        user_id: metadata.user_id,
    })
}

/// Computes the signature header value for a payload. The provider does this on their side; we use it in tests and
/// tooling to fabricate authentic deliveries.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let digest = hex::encode(mac.finalize().into_bytes());
    format!("t={timestamp},v1={digest}")
}

fn split_header(header: &str) -> Result<(&str, &str), WebhookSignatureError> {
    let mut timestamp = None;
    let mut signature = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", t)) => timestamp = Some(t),
            Some(("v1", v)) => signature = Some(v),
            // Unknown key-value pairs are allowed for forward compatibility
            Some(_) => {},
            None => {
                return Err(WebhookSignatureError::MalformedHeader(format!("'{part}' is not a key=value pair")));
            },
        }
    }
    match (timestamp, signature) {
        (Some(t), Some(v)) => Ok((t, v)),
        (None, _) => Err(WebhookSignatureError::MalformedHeader("missing timestamp (t=)".into())),
        (_, None) => Err(WebhookSignatureError::MalformedHeader("missing signature (v1=)".into())),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn event_body(event_id: &str, event_type: &str) -> Vec<u8> {
        serde_json::json!({
            "id": event_id,
            "type": event_type,
            "data": { "object": { "metadata": { "order_id": "order-1", "user_id": "user-1" } } }
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn valid_signature_round_trip() {
        let body = event_body("evt_1", "checkout.session.completed");
        let header = sign_payload(&body, SECRET, 1_700_000_000);
        let event = verify_and_parse(&body, &header, SECRET).unwrap();
        assert_eq!(event.event_id, "evt_1");
        assert_eq!(event.event_type, PaymentEventType::CheckoutCompleted);
        assert_eq!(event.order_id.unwrap().as_str(), "order-1");
        assert_eq!(event.user_id.as_deref(), Some("user-1"));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let body = event_body("evt_1", "checkout.session.completed");
        let header = sign_payload(&body, SECRET, 1_700_000_000);
        let mut tampered = body.clone();
        let pos = tampered.iter().position(|b| *b == b'1').unwrap();
        tampered[pos] = b'2';
        let err = verify_and_parse(&tampered, &header, SECRET).unwrap_err();
        assert_eq!(err, WebhookSignatureError::InvalidSignature);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let body = event_body("evt_1", "checkout.session.completed");
        let header = sign_payload(&body, "a different secret", 1_700_000_000);
        let err = verify_and_parse(&body, &header, SECRET).unwrap_err();
        assert_eq!(err, WebhookSignatureError::InvalidSignature);
    }

    #[test]
    fn header_without_signature_is_rejected() {
        let body = event_body("evt_1", "checkout.session.completed");
        let err = verify_and_parse(&body, "t=1700000000", SECRET).unwrap_err();
        assert!(matches!(err, WebhookSignatureError::MalformedHeader(_)));
    }

    #[test]
    fn unknown_event_types_parse_as_other() {
        let body = event_body("evt_2", "customer.subscription.updated");
        let header = sign_payload(&body, SECRET, 1_700_000_000);
        let event = verify_and_parse(&body, &header, SECRET).unwrap();
        assert_eq!(event.event_type, PaymentEventType::Other("customer.subscription.updated".to_string()));
    }

    #[test]
    fn reserialized_payload_no_longer_verifies() {
        // Re-encoding JSON (key order, whitespace) changes the bytes; the signature is over the original bytes only.
        let body = br#"{ "id": "evt_3",  "type": "checkout.session.completed", "data": {} }"#;
        let header = sign_payload(body, SECRET, 1_700_000_000);
        let reserialized =
            serde_json::to_vec(&serde_json::from_slice::<serde_json::Value>(body).unwrap()).unwrap();
        let err = verify_and_parse(&reserialized, &header, SECRET).unwrap_err();
        assert_eq!(err, WebhookSignatureError::InvalidSignature);
    }
}
