use thiserror::Error;

use crate::{Money, ProductId, VendorId};

/// Errors that can occur when interacting with the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The guarded decrement found less stock than requested.
    /// Usually means a concurrent reservation consumed the units first.
    #[error("Insufficient stock: available={available}, requested={requested}")]
    InsufficientStock {
        vendor_id: VendorId,
        product_id: ProductId,
        available: u32,
        requested: u32,
    },

    /// The (vendor, product) inventory row does not exist.
    #[error("Product not found for vendor: vendorId={vendor_id}, productId={product_id}")]
    RecordNotFound {
        vendor_id: VendorId,
        product_id: ProductId,
    },

    /// The vendor already carries this product.
    #[error("Vendor {vendor_id} is already enrolled in product {product_id}")]
    AlreadyEnrolled {
        vendor_id: VendorId,
        product_id: ProductId,
    },

    #[error("Product not found: productId={0}")]
    ProductNotFound(ProductId),

    #[error("Vendor not found: vendorId={0}")]
    VendorNotFound(VendorId),

    /// Prices must be strictly positive.
    #[error("Invalid price: {0}")]
    InvalidPrice(Money),

    /// Stock above what a row can hold.
    #[error("Invalid stock: {0}")]
    InvalidStock(u32),

    /// The database aborted the transaction (serialization failure or deadlock).
    #[error("Transaction conflict: {0}")]
    Conflict(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl LedgerError {
    /// Returns true when the error means the stock picture the caller acted
    /// on is stale and re-resolving against fresh state may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerError::InsufficientStock { .. }
                | LedgerError::RecordNotFound { .. }
                | LedgerError::Conflict(_)
        )
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
