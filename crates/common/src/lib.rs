//! Shared types used across the fulfillment crates.

pub mod money;
pub mod types;

pub use money::Money;
pub use types::{OrderId, ProductId, VendorId};
