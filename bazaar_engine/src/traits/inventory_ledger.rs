use crate::{
    db_types::{InventoryRecord, ProductId, StockOperation},
    traits::FulfillmentError,
};

/// Atomic operations on the per-product stock counters.
///
/// The concurrency contract: each operation on a given product id is linearizable with respect to every other
/// operation on the same product id. Implementations must perform the check and the mutation as one atomic step —
/// a conditional `UPDATE`, or an equivalent per-key critical section — and must never expose a window in which
/// another caller can observe the checked value before the write lands. Operations on different products must not
/// block one another.
///
/// `reserve`/`release` move units between `available` and `reserved` and leave their sum untouched. Only `adjust`
/// changes total stock.
#[allow(async_fn_in_trait)]
pub trait InventoryLedger {
    /// Moves `qty` units from `available` to `reserved`.
    ///
    /// Fails with [`FulfillmentError::InsufficientStock`] (reporting the current `available`) when the product
    /// cannot cover the request, in which case nothing is changed. There is no partial reservation.
    async fn reserve_stock(&self, product_id: &ProductId, qty: i64) -> Result<InventoryRecord, FulfillmentError>;

    /// Moves `qty` units back from `reserved` to `available`.
    ///
    /// Fails with [`FulfillmentError::InsufficientReserved`] when fewer than `qty` units are reserved. That error
    /// signals a bookkeeping bug upstream — callers release only what they know they reserved.
    async fn release_stock(&self, product_id: &ProductId, qty: i64) -> Result<InventoryRecord, FulfillmentError>;

    /// Direct stock correction (restock or shrinkage). Only touches `available`; a `Remove` that would drive
    /// `available` negative fails with [`FulfillmentError::InsufficientStock`].
    async fn adjust_stock(
        &self,
        product_id: &ProductId,
        qty: i64,
        operation: StockOperation,
    ) -> Result<InventoryRecord, FulfillmentError>;

    /// Returns the current counters for the product. Total stock is derived as `available + reserved`.
    async fn stock_snapshot(&self, product_id: &ProductId) -> Result<InventoryRecord, FulfillmentError>;

    /// All inventory records with `available <= threshold`, lowest first.
    async fn low_stock(&self, threshold: i64) -> Result<Vec<InventoryRecord>, FulfillmentError>;
}
