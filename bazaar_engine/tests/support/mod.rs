use bazaar_common::Money;
use bazaar_engine::{
    db_types::{NewProduct, Product, StockOperation},
    traits::{CatalogManagement, InventoryLedger},
    SqliteDatabase,
};

/// Fresh in-memory database with the schema applied. One connection, so every operation takes its turn — the
/// atomicity being tested lives in the SQL statements, not in connection juggling.
pub async fn prepare_test_env() -> SqliteDatabase {
    let _ = dotenvy::dotenv();
    let _ = env_logger::try_init();
    SqliteDatabase::new_with_url("sqlite::memory:", 1).await.expect("Could not set up the test database")
}

/// Creates a product and stocks it up through the ledger's adjust operation.
pub async fn seed_product(db: &SqliteDatabase, sku: &str, price_cents: i64, stock: i64) -> Product {
    let product = db
        .insert_product(NewProduct {
            sku: sku.to_string(),
            name: format!("Product {sku}"),
            description: None,
            price: Money::from(price_cents),
        })
        .await
        .expect("Could not create test product");
    if stock > 0 {
        db.adjust_stock(&product.id, stock, StockOperation::Add).await.expect("Could not stock test product");
    }
    product
}
