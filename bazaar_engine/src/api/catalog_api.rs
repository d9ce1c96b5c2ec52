use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewProduct, Product, ProductId, ProductUpdate},
    traits::{CatalogManagement, FulfillmentError},
};

pub struct CatalogApi<B> {
    db: B,
}

impl<B: Clone> Clone for CatalogApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<B> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi")
    }
}

impl<B> CatalogApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> CatalogApi<B>
where B: CatalogManagement
{
    /// Creates a product and its zeroed inventory record. Stock arrives later through the ledger's `Adjust`.
    pub async fn create_product(&self, product: NewProduct) -> Result<Product, FulfillmentError> {
        let stored = self.db.insert_product(product).await?;
        info!("🗂️ New product {} ({}) added to the catalog", stored.sku, stored.id);
        Ok(stored)
    }

    pub async fn product(&self, id: &ProductId) -> Result<Option<Product>, FulfillmentError> {
        self.db.fetch_product(id).await
    }

    pub async fn active_products(&self) -> Result<Vec<Product>, FulfillmentError> {
        self.db.fetch_active_products().await
    }

    pub async fn update_product(&self, id: &ProductId, update: ProductUpdate) -> Result<Product, FulfillmentError> {
        let product = self.db.update_product(id, update).await?;
        debug!("🗂️ Product {id} updated");
        Ok(product)
    }

    pub async fn deactivate_product(&self, id: &ProductId) -> Result<(), FulfillmentError> {
        self.db.deactivate_product(id).await?;
        info!("🗂️ Product {id} deactivated");
        Ok(())
    }
}
