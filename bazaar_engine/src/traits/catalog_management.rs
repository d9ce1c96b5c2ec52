use crate::{
    db_types::{NewProduct, Product, ProductId, ProductUpdate},
    traits::FulfillmentError,
};

/// Product CRUD. Creating a product also creates its (zeroed) inventory record so that ledger operations never have
/// to special-case a missing row.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    /// Fails with [`FulfillmentError::DuplicateSku`] when the SKU is already taken.
    async fn insert_product(&self, product: NewProduct) -> Result<Product, FulfillmentError>;

    async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, FulfillmentError>;

    /// All active products, newest first.
    async fn fetch_active_products(&self) -> Result<Vec<Product>, FulfillmentError>;

    async fn update_product(&self, id: &ProductId, update: ProductUpdate) -> Result<Product, FulfillmentError>;

    /// Soft delete. The product disappears from listings but existing orders keep referring to it.
    async fn deactivate_product(&self, id: &ProductId) -> Result<(), FulfillmentError>;
}
