use crate::traits::FulfillmentError;

/// Durable dedup set for payment-provider event ids.
///
/// The provider delivers at least once; the reconciler claims an event id before dispatching its side effects and
/// releases the claim again if dispatch fails, so that a redelivery can retry. Rows must be retained at least as
/// long as the provider's redelivery window.
#[allow(async_fn_in_trait)]
pub trait WebhookJournal {
    /// Records the event id if it has not been seen before. Returns `true` when this call claimed the id, `false`
    /// when it was already present. The insert is atomic: of any number of concurrent claims for the same id,
    /// exactly one returns `true`.
    async fn claim_event(&self, event_id: &str) -> Result<bool, FulfillmentError>;

    /// Removes a claim so the provider's redelivery can be processed as if the event were new.
    async fn release_event(&self, event_id: &str) -> Result<(), FulfillmentError>;
}
