pub mod db;

pub mod events;
pub mod inventory;
pub mod orders;
pub mod products;

use std::{env, str::FromStr};

pub use db::SqliteDatabase;
use log::info;
use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::traits::FulfillmentError;

const SQLITE_DB_URL: &str = "sqlite://data/bazaar.db";

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub fn db_url() -> String {
    let result = env::var("BZR_DATABASE_URL").unwrap_or_else(|_| {
        info!("BZR_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, FulfillmentError> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| FulfillmentError::DatabaseError(format!("Invalid database URL '{url}': {e}")))?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}
