use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{InventoryRecord, ProductId, StockOperation},
    traits::{FulfillmentError, InventoryLedger},
};

/// `InventoryApi` is the only path to the stock counters. All the atomicity guarantees live in the
/// [`InventoryLedger`] backend; this layer adds logging and keeps the rest of the system away from raw trait calls.
pub struct InventoryApi<B> {
    db: B,
}

impl<B: Clone> Clone for InventoryApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<B> Debug for InventoryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InventoryApi")
    }
}

impl<B> InventoryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> InventoryApi<B>
where B: InventoryLedger
{
    pub async fn reserve(&self, product_id: &ProductId, qty: i64) -> Result<InventoryRecord, FulfillmentError> {
        let record = self.db.reserve_stock(product_id, qty).await?;
        debug!("🧮️ Reserved {qty} units of {product_id}. ({}, {}) remain", record.available, record.reserved);
        Ok(record)
    }

    pub async fn release(&self, product_id: &ProductId, qty: i64) -> Result<InventoryRecord, FulfillmentError> {
        let record = self.db.release_stock(product_id, qty).await?;
        debug!("🧮️ Released {qty} units of {product_id}. ({}, {}) remain", record.available, record.reserved);
        Ok(record)
    }

    pub async fn adjust(
        &self,
        product_id: &ProductId,
        qty: i64,
        operation: StockOperation,
    ) -> Result<InventoryRecord, FulfillmentError> {
        let record = self.db.adjust_stock(product_id, qty, operation).await?;
        debug!("🧮️ Stock adjustment {operation} {qty} applied to {product_id}. available={}", record.available);
        Ok(record)
    }

    pub async fn snapshot(&self, product_id: &ProductId) -> Result<InventoryRecord, FulfillmentError> {
        self.db.stock_snapshot(product_id).await
    }

    pub async fn low_stock(&self, threshold: i64) -> Result<Vec<InventoryRecord>, FulfillmentError> {
        let records = self.db.low_stock(threshold).await?;
        trace!("🧮️ {} products at or below the {threshold}-unit threshold", records.len());
        Ok(records)
    }
}
