use sqlx::SqliteConnection;

use crate::traits::FulfillmentError;

/// Claims a webhook event id. `INSERT OR IGNORE` makes the claim atomic: of any number of concurrent claims for
/// the same id, exactly one inserts a row and returns `true`.
pub async fn claim_event(event_id: &str, conn: &mut SqliteConnection) -> Result<bool, FulfillmentError> {
    let result = sqlx::query("INSERT OR IGNORE INTO webhook_events (event_id) VALUES (?)")
        .bind(event_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Releases a claim after a failed dispatch so that the provider's redelivery is processed as new.
pub async fn release_event(event_id: &str, conn: &mut SqliteConnection) -> Result<(), FulfillmentError> {
    sqlx::query("DELETE FROM webhook_events WHERE event_id = ?").bind(event_id).execute(&mut *conn).await?;
    Ok(())
}
