//! # Database management and control.
//!
//! This module defines the interface contracts that storage *backends* must fulfil in order to power the Bazaar
//! engine. The server and the API layer only ever talk to these traits; the SQLite implementation lives in
//! [`crate::db::sqlite`].
//!
//! ## Traits
//! * [`InventoryLedger`] is the single source of truth for per-product stock counters. Every operation is a single
//!   atomic read-modify-write on the backend; callers never get to observe (or write back) intermediate counts.
//! * [`OrderManagement`] owns order records and their lines, including the two terminal transitions of the order
//!   state machine.
//! * [`CatalogManagement`] provides product CRUD. A zeroed inventory record is created together with every product.
//! * [`WebhookJournal`] is the durable dedup set for payment-provider event ids.
//! * [`FulfillmentDatabase`] bundles the above for consumers that need the whole backend (the server does).

mod catalog_management;
mod fulfillment_database;
mod inventory_ledger;
mod order_management;
mod webhook_journal;

pub use catalog_management::CatalogManagement;
pub use fulfillment_database::{FulfillmentDatabase, FulfillmentError};
pub use inventory_ledger::InventoryLedger;
pub use order_management::{OrderManagement, PaidOutcome};
pub use webhook_journal::WebhookJournal;
