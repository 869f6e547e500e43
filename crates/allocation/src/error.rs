//! Allocation error types.

use ledger::{LedgerError, OrderId, ProductId};
use thiserror::Error;

/// Errors surfaced by the order orchestrator.
#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("Product not found: productId={0}")]
    ProductNotFound(ProductId),

    /// Returned both for unknown order ids and for orders allocated to
    /// another vendor.
    #[error("Order not found: orderId={0}")]
    OrderNotFound(OrderId),

    /// No single vendor holds enough stock for the requested quantity.
    #[error("No vendor has stock for product: {product_name}")]
    NoStockAvailable { product_name: String },

    #[error("Quantity must be greater than zero")]
    InvalidQuantity,

    /// Ledger error.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Convenience type alias for allocation results.
pub type Result<T> = std::result::Result<T, AllocationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_not_found_message_depends_only_on_id() {
        let id = OrderId::new();
        assert_eq!(
            AllocationError::OrderNotFound(id).to_string(),
            format!("Order not found: orderId={id}")
        );
    }

    #[test]
    fn no_stock_message_names_product() {
        let err = AllocationError::NoStockAvailable {
            product_name: "Widget".to_string(),
        };
        assert_eq!(err.to_string(), "No vendor has stock for product: Widget");
    }
}
