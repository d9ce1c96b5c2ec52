use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewProduct, Product, ProductId, ProductUpdate},
    traits::FulfillmentError,
};

const PRODUCT_COLUMNS: &str = "id, sku, name, description, price, is_active, created_at, updated_at";

/// Inserts the product record only. The caller is responsible for creating the matching inventory record in the
/// same transaction (see [`crate::db::sqlite::db::SqliteDatabase`]).
pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, FulfillmentError> {
    let id = ProductId::new();
    let result = sqlx::query("INSERT INTO products (id, sku, name, description, price) VALUES (?, ?, ?, ?, ?)")
        .bind(&id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .execute(&mut *conn)
        .await;
    if let Err(e) = result {
        if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
            return Err(FulfillmentError::DuplicateSku(product.sku));
        }
        return Err(e.into());
    }
    fetch_product(&id, conn)
        .await?
        .ok_or_else(|| FulfillmentError::DatabaseError(format!("Product {id} vanished immediately after insertion")))
}

pub async fn fetch_product(
    id: &ProductId,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, FulfillmentError> {
    let product = sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(product)
}

/// All active products, newest first.
pub async fn fetch_active_products(conn: &mut SqliteConnection) -> Result<Vec<Product>, FulfillmentError> {
    let products = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY created_at DESC"
    ))
    .fetch_all(&mut *conn)
    .await?;
    Ok(products)
}

pub async fn update_product(
    id: &ProductId,
    update: ProductUpdate,
    conn: &mut SqliteConnection,
) -> Result<Product, FulfillmentError> {
    if update.is_empty() {
        trace!("🗂️ No fields to update for product {id}. Update request skipped.");
        return fetch_product(id, conn).await?.ok_or_else(|| FulfillmentError::ProductNotFound(id.clone()));
    }
    let mut builder = QueryBuilder::new("UPDATE products SET updated_at = CURRENT_TIMESTAMP,");
    let mut set_clause = builder.separated(", ");
    if let Some(name) = update.name {
        set_clause.push("name = ");
        set_clause.push_bind_unseparated(name);
    }
    if let Some(description) = update.description {
        set_clause.push("description = ");
        set_clause.push_bind_unseparated(description);
    }
    if let Some(price) = update.price {
        set_clause.push("price = ");
        set_clause.push_bind_unseparated(price);
    }
    if let Some(is_active) = update.is_active {
        set_clause.push("is_active = ");
        set_clause.push_bind_unseparated(is_active);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id.as_str());
    trace!("🗂️ Executing query: {}", builder.sql());
    let result = builder.build().execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        return Err(FulfillmentError::ProductNotFound(id.clone()));
    }
    fetch_product(id, conn).await?.ok_or_else(|| FulfillmentError::ProductNotFound(id.clone()))
}

/// Soft delete: the product stops appearing in listings and new orders, but existing rows keep referencing it.
pub async fn deactivate_product(id: &ProductId, conn: &mut SqliteConnection) -> Result<(), FulfillmentError> {
    let result =
        sqlx::query("UPDATE products SET is_active = 0, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
    if result.rows_affected() == 0 {
        return Err(FulfillmentError::ProductNotFound(id.clone()));
    }
    Ok(())
}
