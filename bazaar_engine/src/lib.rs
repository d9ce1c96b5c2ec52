//! # Bazaar fulfillment engine
//!
//! The engine owns everything with an invariant in it: the inventory ledger, the order lifecycle state machine, the
//! payment-event reconciler and the product catalog. It is transport-agnostic; the HTTP server in `bazaar_server`
//! is one consumer, the integration tests are another.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@db`]). SQLite is the supported backend. You should never need to
//!    access the database directly — use the public APIs instead. The exception is the data types stored in the
//!    database, which are defined in [`mod@db_types`] and are public.
//! 2. The engine public API ([`mod@api`]): [`InventoryApi`], [`OrderFlowApi`], [`ReconcilerApi`] and
//!    [`CatalogApi`], each generic over the backend traits in [`mod@traits`].
//!
//! The engine also emits events (order created, order paid, payment failed, order cancelled, low stock) through
//! the simple hook framework in [`mod@events`]. The server wires these hooks to its notification dispatcher;
//! delivery is fire-and-forget and can never fail or block an engine operation.

pub mod api;
mod db;

pub mod db_types;
pub mod events;
pub mod helpers;
pub mod traits;

#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;

pub use api::{
    catalog_api::CatalogApi,
    errors::{OrderFlowError, ReconcilerError},
    inventory_api::InventoryApi,
    order_flow_api::{OrderFlowApi, DEFAULT_LOW_STOCK_THRESHOLD},
    order_objects,
    reconciler_api::{EventDisposition, ReconcilerApi},
};
