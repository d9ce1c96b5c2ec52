use std::fmt::Debug;

use log::debug;
use sqlx::SqlitePool;

use crate::{
    db::sqlite::{events, inventory, new_pool, orders, products, MIGRATOR},
    db_types::{
        InventoryRecord,
        NewOrder,
        NewProduct,
        Order,
        OrderId,
        OrderItem,
        Product,
        ProductId,
        ProductUpdate,
        StockOperation,
    },
    order_objects::OrderQueryFilter,
    traits::{
        CatalogManagement,
        FulfillmentDatabase,
        FulfillmentError,
        InventoryLedger,
        OrderManagement,
        PaidOutcome,
        WebhookJournal,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connects to the database at `url`, creating the file if necessary, and brings the schema up to date.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, FulfillmentError> {
        let pool = new_pool(url, max_connections).await?;
        MIGRATOR.run(&pool).await.map_err(|e| FulfillmentError::DatabaseError(e.to_string()))?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl FulfillmentDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }
}

impl InventoryLedger for SqliteDatabase {
    async fn reserve_stock(&self, product_id: &ProductId, qty: i64) -> Result<InventoryRecord, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        inventory::reserve(product_id, qty, &mut conn).await
    }

    async fn release_stock(&self, product_id: &ProductId, qty: i64) -> Result<InventoryRecord, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        inventory::release(product_id, qty, &mut conn).await
    }

    async fn adjust_stock(
        &self,
        product_id: &ProductId,
        qty: i64,
        operation: StockOperation,
    ) -> Result<InventoryRecord, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        match operation {
            StockOperation::Add => inventory::add_stock(product_id, qty, &mut conn).await,
            StockOperation::Remove => inventory::remove_stock(product_id, qty, &mut conn).await,
        }
    }

    async fn stock_snapshot(&self, product_id: &ProductId) -> Result<InventoryRecord, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        inventory::fetch_record(product_id, &mut conn)
            .await?
            .ok_or_else(|| FulfillmentError::InventoryNotFound(product_id.clone()))
    }

    async fn low_stock(&self, threshold: i64) -> Result<Vec<InventoryRecord>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        inventory::low_stock(threshold, &mut conn).await
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let stored = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} has been saved in the DB", stored.id);
        Ok(stored)
    }

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(id, &mut conn).await
    }

    async fn fetch_order_items(&self, id: &OrderId) -> Result<Vec<OrderItem>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_items(id, &mut conn).await
    }

    async fn fetch_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders(filter, &mut conn).await
    }

    async fn mark_order_paid(&self, id: &OrderId) -> Result<PaidOutcome, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let outcome = orders::mark_paid(id, &mut tx).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    async fn cancel_order_with_releases(&self, id: &OrderId) -> Result<Order, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        if !orders::claim_cancellation(id, &mut tx).await? {
            let order = orders::fetch_order(id, &mut tx)
                .await?
                .ok_or_else(|| FulfillmentError::OrderNotFound(id.clone()))?;
            return Err(FulfillmentError::TerminalState { order_id: id.clone(), status: order.status });
        }
        let items = orders::fetch_order_items(id, &mut tx).await?;
        for item in &items {
            // A failure here drops the transaction, which rolls the cancellation claim back with it.
            inventory::release(&item.product_id, item.quantity, &mut tx).await?;
        }
        let order = orders::fetch_order(id, &mut tx)
            .await?
            .ok_or_else(|| FulfillmentError::OrderNotFound(id.clone()))?;
        tx.commit().await?;
        debug!("🗃️ Order {} cancelled and {} lines released", order.id, items.len());
        Ok(order)
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn insert_product(&self, product: NewProduct) -> Result<Product, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let stored = products::insert_product(product, &mut tx).await?;
        inventory::create_record(&stored.id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Product {} ({}) has been saved in the DB", stored.id, stored.sku);
        Ok(stored)
    }

    async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        products::fetch_product(id, &mut conn).await
    }

    async fn fetch_active_products(&self) -> Result<Vec<Product>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        products::fetch_active_products(&mut conn).await
    }

    async fn update_product(&self, id: &ProductId, update: ProductUpdate) -> Result<Product, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        products::update_product(id, update, &mut conn).await
    }

    async fn deactivate_product(&self, id: &ProductId) -> Result<(), FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        products::deactivate_product(id, &mut conn).await
    }
}

impl WebhookJournal for SqliteDatabase {
    async fn claim_event(&self, event_id: &str) -> Result<bool, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        events::claim_event(event_id, &mut conn).await
    }

    async fn release_event(&self, event_id: &str) -> Result<(), FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        events::release_event(event_id, &mut conn).await
    }
}
