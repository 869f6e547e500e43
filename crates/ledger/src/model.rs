//! Rows held by the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Money, OrderId, ProductId, VendorId};

/// A catalog product. Read-only from the ledger's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub code: String,
    pub name: String,
}

impl Product {
    pub fn new(id: ProductId, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            code: code.into(),
            name: name.into(),
        }
    }
}

/// A vendor identity. Read-only from the ledger's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: VendorId,
    pub name: String,
}

impl Vendor {
    pub fn new(id: VendorId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Price and stock a vendor offers for one product.
///
/// Keyed by `(vendor_id, product_id)`. `stock` is never negative and
/// `version` increments on every write to the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub vendor_id: VendorId,
    pub product_id: ProductId,
    pub price: Money,
    pub stock: u32,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

/// An inventory row as seen by the allocation resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    pub vendor_id: VendorId,
    pub price: Money,
    pub stock: u32,
}

impl Candidate {
    pub fn new(vendor_id: VendorId, price: Money, stock: u32) -> Self {
        Self {
            vendor_id,
            price,
            stock,
        }
    }
}

impl From<&InventoryRecord> for Candidate {
    fn from(record: &InventoryRecord) -> Self {
        Self {
            vendor_id: record.vendor_id,
            price: record.price,
            stock: record.stock,
        }
    }
}

/// An inventory row joined with its product, for vendor listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorProduct {
    pub record: InventoryRecord,
    pub product: Product,
}

/// Lifecycle status of an order. Orders only exist once allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Allocated,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Allocated => "ALLOCATED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ALLOCATED" => Some(OrderStatus::Allocated),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted, immutable order.
///
/// `unit_price` and `vendor_name` are captured when the stock is reserved,
/// so later price edits do not rewrite order history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub allocated_vendor_id: VendorId,
    pub status: OrderStatus,
    pub unit_price: Money,
    pub vendor_name: String,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A request to take `quantity` units from one vendor's row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    pub vendor_id: VendorId,
    pub product_id: ProductId,
    pub quantity: u32,
}

impl Reservation {
    pub fn new(vendor_id: VendorId, product_id: ProductId, quantity: u32) -> Self {
        Self {
            vendor_id,
            product_id,
            quantity,
        }
    }
}

/// Outcome of a committed reservation plus order insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedOrder {
    pub order: Order,
    pub remaining_stock: u32,
}

/// Result of a vendor price edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceChange {
    pub old_price: Money,
    pub record: InventoryRecord,
}

/// Result of a vendor stock edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockChange {
    pub old_stock: u32,
    pub record: InventoryRecord,
}
