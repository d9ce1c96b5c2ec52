//! Ledger queries.
//!
//! Every mutation here is a single conditional `UPDATE`. The availability check and the counter movement happen in
//! the same statement, so two racing reservations can never both observe the same pre-image: SQLite serialises the
//! writes, and the loser's `WHERE` clause no longer matches. There is deliberately no function in this module that
//! reads a counter, returns it to the caller, and expects the new value back.

use sqlx::SqliteConnection;

use crate::{
    db_types::{InventoryRecord, ProductId},
    traits::FulfillmentError,
};

const RECORD_COLUMNS: &str = "product_id, available, reserved, updated_at";

/// Creates the zeroed counters for a new product.
pub async fn create_record(product_id: &ProductId, conn: &mut SqliteConnection) -> Result<(), FulfillmentError> {
    sqlx::query("INSERT INTO inventory (product_id) VALUES (?)").bind(product_id).execute(&mut *conn).await?;
    Ok(())
}

pub async fn fetch_record(
    product_id: &ProductId,
    conn: &mut SqliteConnection,
) -> Result<Option<InventoryRecord>, FulfillmentError> {
    let record = sqlx::query_as::<_, InventoryRecord>(&format!(
        "SELECT {RECORD_COLUMNS} FROM inventory WHERE product_id = ?"
    ))
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(record)
}

/// Moves `qty` units from `available` to `reserved`, failing without any effect if `available < qty`.
pub async fn reserve(
    product_id: &ProductId,
    qty: i64,
    conn: &mut SqliteConnection,
) -> Result<InventoryRecord, FulfillmentError> {
    if qty <= 0 {
        return Err(FulfillmentError::NonPositiveQuantity(qty));
    }
    let updated = sqlx::query_as::<_, InventoryRecord>(&format!(
        r#"
        UPDATE inventory
        SET available = available - ?1, reserved = reserved + ?1, updated_at = CURRENT_TIMESTAMP
        WHERE product_id = ?2 AND available >= ?1
        RETURNING {RECORD_COLUMNS}
        "#
    ))
    .bind(qty)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(record) => Ok(record),
        None => {
            let current = fetch_record(product_id, conn)
                .await?
                .ok_or_else(|| FulfillmentError::InventoryNotFound(product_id.clone()))?;
            Err(FulfillmentError::InsufficientStock { available: current.available, requested: qty })
        },
    }
}

/// Moves `qty` units back from `reserved` to `available`, failing without any effect if `reserved < qty`.
pub async fn release(
    product_id: &ProductId,
    qty: i64,
    conn: &mut SqliteConnection,
) -> Result<InventoryRecord, FulfillmentError> {
    if qty <= 0 {
        return Err(FulfillmentError::NonPositiveQuantity(qty));
    }
    let updated = sqlx::query_as::<_, InventoryRecord>(&format!(
        r#"
        UPDATE inventory
        SET available = available + ?1, reserved = reserved - ?1, updated_at = CURRENT_TIMESTAMP
        WHERE product_id = ?2 AND reserved >= ?1
        RETURNING {RECORD_COLUMNS}
        "#
    ))
    .bind(qty)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(record) => Ok(record),
        None => {
            let current = fetch_record(product_id, conn)
                .await?
                .ok_or_else(|| FulfillmentError::InventoryNotFound(product_id.clone()))?;
            Err(FulfillmentError::InsufficientReserved { reserved: current.reserved, requested: qty })
        },
    }
}

/// Adds `qty` units of new stock to `available`.
pub async fn add_stock(
    product_id: &ProductId,
    qty: i64,
    conn: &mut SqliteConnection,
) -> Result<InventoryRecord, FulfillmentError> {
    if qty <= 0 {
        return Err(FulfillmentError::NonPositiveQuantity(qty));
    }
    let updated = sqlx::query_as::<_, InventoryRecord>(&format!(
        r#"
        UPDATE inventory
        SET available = available + ?1, updated_at = CURRENT_TIMESTAMP
        WHERE product_id = ?2
        RETURNING {RECORD_COLUMNS}
        "#
    ))
    .bind(qty)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;
    updated.ok_or_else(|| FulfillmentError::InventoryNotFound(product_id.clone()))
}

/// Writes off `qty` units from `available`, failing if the write-off would drive it negative.
pub async fn remove_stock(
    product_id: &ProductId,
    qty: i64,
    conn: &mut SqliteConnection,
) -> Result<InventoryRecord, FulfillmentError> {
    if qty <= 0 {
        return Err(FulfillmentError::NonPositiveQuantity(qty));
    }
    let updated = sqlx::query_as::<_, InventoryRecord>(&format!(
        r#"
        UPDATE inventory
        SET available = available - ?1, updated_at = CURRENT_TIMESTAMP
        WHERE product_id = ?2 AND available >= ?1
        RETURNING {RECORD_COLUMNS}
        "#
    ))
    .bind(qty)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(record) => Ok(record),
        None => {
            let current = fetch_record(product_id, conn)
                .await?
                .ok_or_else(|| FulfillmentError::InventoryNotFound(product_id.clone()))?;
            Err(FulfillmentError::InsufficientStock { available: current.available, requested: qty })
        },
    }
}

/// Inventory records with `available <= threshold`, lowest first.
pub async fn low_stock(
    threshold: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<InventoryRecord>, FulfillmentError> {
    let records = sqlx::query_as::<_, InventoryRecord>(&format!(
        "SELECT {RECORD_COLUMNS} FROM inventory WHERE available <= ? ORDER BY available ASC"
    ))
    .bind(threshold)
    .fetch_all(&mut *conn)
    .await?;
    Ok(records)
}
