use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderItem},
    order_objects::OrderQueryFilter,
    traits::{FulfillmentError, PaidOutcome},
};

const ORDER_COLUMNS: &str = "id, user_id, status, total_price, created_at, updated_at, paid_at";

/// Inserts a new order together with all of its lines using the given connection. This is not atomic on its own.
/// Embed the call inside a transaction and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, FulfillmentError> {
    let result = sqlx::query("INSERT INTO orders (id, user_id, status, total_price) VALUES (?, ?, 'Pending', ?)")
        .bind(&order.id)
        .bind(&order.user_id)
        .bind(order.total_price)
        .execute(&mut *conn)
        .await;
    if let Err(e) = result {
        if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
            return Err(FulfillmentError::OrderAlreadyExists(order.id));
        }
        return Err(e.into());
    }
    for item in &order.items {
        sqlx::query("INSERT INTO order_items (order_id, product_id, quantity, unit_price) VALUES (?, ?, ?, ?)")
            .bind(&order.id)
            .bind(&item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price)
            .execute(&mut *conn)
            .await?;
    }
    fetch_order(&order.id, conn).await?.ok_or_else(|| {
        FulfillmentError::DatabaseError(format!("Order {} vanished immediately after insertion", order.id))
    })
}

pub async fn fetch_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, FulfillmentError> {
    let order = sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_items(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderItem>, FulfillmentError> {
    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT id, order_id, product_id, quantity, unit_price FROM order_items WHERE order_id = ? ORDER BY id ASC",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`.
///
/// Resulting orders are ordered by `created_at`, newest first.
pub async fn fetch_orders(
    filter: OrderQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, FulfillmentError> {
    let mut builder = QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders "));
    if !filter.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(user_id) = filter.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(user_id);
    }
    if !filter.statuses.is_empty() {
        let statuses = filter.statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
        where_clause.push(format!("status IN ({statuses})"));
    }
    builder.push(" ORDER BY created_at DESC");
    trace!("📦️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(&mut *conn).await?;
    Ok(orders)
}

/// The `Pending -> Paid` transition as a single conditional update.
pub async fn mark_paid(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<PaidOutcome, FulfillmentError> {
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET status = 'Paid', paid_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND status = 'Pending'
        "#,
    )
    .bind(order_id)
    .execute(&mut *conn)
    .await?;
    let order =
        fetch_order(order_id, conn).await?.ok_or_else(|| FulfillmentError::OrderNotFound(order_id.clone()))?;
    if result.rows_affected() == 1 {
        return Ok(PaidOutcome::Paid(order));
    }
    match order.status {
        crate::db_types::OrderStatusType::Paid => Ok(PaidOutcome::AlreadyPaid(order)),
        status => Err(FulfillmentError::TerminalState { order_id: order_id.clone(), status }),
    }
}

/// Claims the `Pending -> Cancelled` transition. Returns `true` if this call won the claim, `false` if the order
/// was not `Pending` (or does not exist — the caller distinguishes the two).
pub async fn claim_cancellation(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<bool, FulfillmentError> {
    let result = sqlx::query(
        "UPDATE orders SET status = 'Cancelled', updated_at = CURRENT_TIMESTAMP WHERE id = ? AND status = 'Pending'",
    )
    .bind(order_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
