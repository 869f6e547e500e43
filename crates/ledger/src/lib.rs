pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use common::{Money, OrderId, ProductId, VendorId};
pub use error::{LedgerError, Result};
pub use memory::InMemoryLedger;
pub use model::{
    Candidate, InventoryRecord, Order, OrderStatus, PriceChange, Product, Reservation,
    ReservedOrder, StockChange, Vendor, VendorProduct,
};
pub use postgres::PostgresLedger;
pub use store::{Ledger, LedgerExt, MAX_PRICE, MAX_STOCK};
