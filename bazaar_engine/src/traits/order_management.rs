use crate::{
    db_types::{NewOrder, Order, OrderId, OrderItem},
    order_objects::OrderQueryFilter,
    traits::FulfillmentError,
};

/// The result of a mark-paid attempt on an order that was not cancelled.
#[derive(Debug, Clone)]
pub enum PaidOutcome {
    /// The order transitioned from `Pending` to `Paid` just now.
    Paid(Order),
    /// The order was already `Paid`; nothing was changed. Payment confirmations are redelivered, so this is a
    /// normal outcome, not an error.
    AlreadyPaid(Order),
}

impl PaidOutcome {
    pub fn order(&self) -> &Order {
        match self {
            PaidOutcome::Paid(order) | PaidOutcome::AlreadyPaid(order) => order,
        }
    }

    pub fn is_newly_paid(&self) -> bool {
        matches!(self, PaidOutcome::Paid(_))
    }
}

/// Order records and the two terminal transitions of the order state machine.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Persists the order and all of its lines in a single atomic transaction. Either everything lands or nothing
    /// does. Returns the stored order.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, FulfillmentError>;

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, FulfillmentError>;

    async fn fetch_order_items(&self, id: &OrderId) -> Result<Vec<OrderItem>, FulfillmentError>;

    /// Fetches orders matching the filter, newest first.
    async fn fetch_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, FulfillmentError>;

    /// Attempts the `Pending -> Paid` transition as one conditional update, setting `paid_at` on success.
    ///
    /// An order that is already `Paid` yields [`PaidOutcome::AlreadyPaid`]. A `Cancelled` order fails with
    /// [`FulfillmentError::TerminalState`] — its stock has been released and possibly resold, so a late payment
    /// must never resurrect it.
    async fn mark_order_paid(&self, id: &OrderId) -> Result<PaidOutcome, FulfillmentError>;

    /// Performs the `Pending -> Cancelled` transition and releases the reserved stock of every line, all inside one
    /// transaction.
    ///
    /// The status flip is claimed *first* (conditional on `Pending`), which is what serialises a cancellation
    /// racing a mark-paid on the same order: exactly one of them wins the conditional update. If any single
    /// release fails the whole transaction rolls back and the order stays `Pending`, reservations intact.
    async fn cancel_order_with_releases(&self, id: &OrderId) -> Result<Order, FulfillmentError>;
}
