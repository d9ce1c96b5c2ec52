use bazaar_engine::{
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
        FulfillmentError,
        InventoryLedger,
        OrderManagement,
        PaidOutcome,
        WebhookJournal,
    },
};
use mockall::mock;

mock! {
    pub Backend {}

    impl InventoryLedger for Backend {
        async fn reserve_stock(&self, product_id: &ProductId, qty: i64) -> Result<InventoryRecord, FulfillmentError>;
        async fn release_stock(&self, product_id: &ProductId, qty: i64) -> Result<InventoryRecord, FulfillmentError>;
        async fn adjust_stock(&self, product_id: &ProductId, qty: i64, operation: StockOperation) -> Result<InventoryRecord, FulfillmentError>;
        async fn stock_snapshot(&self, product_id: &ProductId) -> Result<InventoryRecord, FulfillmentError>;
        async fn low_stock(&self, threshold: i64) -> Result<Vec<InventoryRecord>, FulfillmentError>;
    }

    impl OrderManagement for Backend {
        async fn insert_order(&self, order: NewOrder) -> Result<Order, FulfillmentError>;
        async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, FulfillmentError>;
        async fn fetch_order_items(&self, id: &OrderId) -> Result<Vec<OrderItem>, FulfillmentError>;
        async fn fetch_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, FulfillmentError>;
        async fn mark_order_paid(&self, id: &OrderId) -> Result<PaidOutcome, FulfillmentError>;
        async fn cancel_order_with_releases(&self, id: &OrderId) -> Result<Order, FulfillmentError>;
    }

    impl CatalogManagement for Backend {
        async fn insert_product(&self, product: NewProduct) -> Result<Product, FulfillmentError>;
        async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, FulfillmentError>;
        async fn fetch_active_products(&self) -> Result<Vec<Product>, FulfillmentError>;
        async fn update_product(&self, id: &ProductId, update: ProductUpdate) -> Result<Product, FulfillmentError>;
        async fn deactivate_product(&self, id: &ProductId) -> Result<(), FulfillmentError>;
    }

    impl WebhookJournal for Backend {
        async fn claim_event(&self, event_id: &str) -> Result<bool, FulfillmentError>;
        async fn release_event(&self, event_id: &str) -> Result<(), FulfillmentError>;
    }
}
