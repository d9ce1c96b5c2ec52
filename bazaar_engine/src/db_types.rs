use std::{fmt::Display, str::FromStr};

use bazaar_common::Money;
use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------      ProductId       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct ProductId(pub String);

impl ProductId {
    /// Mints a fresh product id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ProductId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------       OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    /// Mints a fresh order id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------       Product        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// Merchant-assigned stock keeping unit. Unique across the catalog.
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    /// The current list price. Orders snapshot this value into their lines at creation time.
    pub price: Money,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      NewProduct      ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
}

//--------------------------------------     ProductUpdate    ---------------------------------------------------------
/// The subset of product fields that may change after creation. `sku` is fixed for the life of the product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub is_active: Option<bool>,
}

impl ProductUpdate {
    pub fn with_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    pub fn with_price(mut self, price: Money) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.price.is_none() && self.is_active.is_none()
    }
}

//--------------------------------------   InventoryRecord    ---------------------------------------------------------
/// The per-product stock counters. `available` is free to sell, `reserved` is held against pending orders.
/// Total physical stock is the sum of the two and is never stored.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub product_id: ProductId,
    pub available: i64,
    pub reserved: i64,
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    pub fn total_stock(&self) -> i64 {
        self.available + self.reserved
    }
}

//--------------------------------------    StockOperation    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StockOperation {
    Add,
    Remove,
}

impl Display for StockOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockOperation::Add => write!(f, "ADD"),
            StockOperation::Remove => write!(f, "REMOVE"),
        }
    }
}

impl FromStr for StockOperation {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ADD" => Ok(Self::Add),
            "REMOVE" => Ok(Self::Remove),
            s => Err(ConversionError(format!("Invalid stock operation: {s}"))),
        }
    }
}

//--------------------------------------   OrderStatusType    ---------------------------------------------------------
/// The order state machine. The only transitions the engine ever performs are `Pending -> Paid` and
/// `Pending -> Cancelled`; both target states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order exists and stock is reserved for it, but payment has not been confirmed.
    Pending,
    /// Payment was confirmed by the provider. Terminal.
    Paid,
    /// The order was cancelled by the user or an admin and its stock returned. Terminal.
    Cancelled,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Paid | OrderStatusType::Cancelled)
    }

    /// The exhaustive transition table. Anything not listed here is rejected.
    pub fn can_transition_to(&self, new_status: OrderStatusType) -> bool {
        use OrderStatusType::*;
        matches!((self, new_status), (Pending, Paid) | (Pending, Cancelled))
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::Paid => write!(f, "Paid"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status in storage: {value}. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

//--------------------------------------        Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: String,
    pub status: OrderStatusType,
    /// Computed once at creation from the line snapshots. Never recomputed.
    pub total_price: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

//--------------------------------------      OrderItem       ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    /// Price snapshot taken when the order was created. Later catalog price changes do not touch this.
    pub unit_price: Money,
}

//--------------------------------------       NewOrder       ---------------------------------------------------------
/// A fully priced order ready for insertion. The id is minted by the caller so that reservation bookkeeping and the
/// persisted record agree before anything is written.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderId,
    pub user_id: String,
    pub total_price: Money,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
}

//--------------------------------------         Role         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Admin => write!(f, "Admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::OrderStatusType::*;

    #[test]
    fn transition_table_is_exhaustive() {
        let all = [Pending, Paid, Cancelled];
        for from in all {
            for to in all {
                let allowed = from.can_transition_to(to);
                assert_eq!(allowed, from == Pending && to != Pending, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn terminal_states() {
        assert!(!Pending.is_terminal());
        assert!(Paid.is_terminal());
        assert!(Cancelled.is_terminal());
    }

    #[test]
    fn status_string_round_trip() {
        for status in [Pending, Paid, Cancelled] {
            assert_eq!(status.to_string().parse::<super::OrderStatusType>().unwrap(), status);
        }
        assert!("Shipped".parse::<super::OrderStatusType>().is_err());
    }
}
