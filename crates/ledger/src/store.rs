use async_trait::async_trait;

use crate::{
    Candidate, InventoryRecord, LedgerError, Money, Order, OrderId, PriceChange, Product,
    ProductId, Reservation, ReservedOrder, Result, StockChange, Vendor, VendorId, VendorProduct,
};

/// Core trait for ledger implementations.
///
/// A ledger owns the per-(vendor, product) inventory rows and the order
/// rows produced from them. All implementations must be thread-safe
/// (Send + Sync). Every write to an inventory row, whether a reservation
/// or a vendor edit, goes through the same row-level exclusion.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Looks up a catalog product.
    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>>;

    /// Looks up a vendor identity.
    async fn find_vendor(&self, vendor_id: VendorId) -> Result<Option<Vendor>>;

    /// Lists the rows of a product that have `stock > 0`.
    ///
    /// Rows are ordered by price ascending, then vendor id ascending.
    async fn list_eligible_candidates(&self, product_id: ProductId) -> Result<Vec<Candidate>>;

    /// Gets the inventory row for a (vendor, product) pair.
    async fn get_record(
        &self,
        vendor_id: VendorId,
        product_id: ProductId,
    ) -> Result<Option<InventoryRecord>>;

    /// Lists every row a vendor carries, ordered by product id.
    async fn list_vendor_records(&self, vendor_id: VendorId) -> Result<Vec<VendorProduct>>;

    /// Takes `quantity` units from the row if, and only if, the row still
    /// holds at least that many. Returns the remaining stock.
    ///
    /// Fails with `InsufficientStock` when the recheck fails and
    /// `RecordNotFound` when the row no longer exists.
    async fn decrement(&self, reservation: &Reservation) -> Result<u32>;

    /// Performs the guarded decrement and inserts the resulting order as one
    /// transaction. Either both persist or neither does.
    ///
    /// The order snapshots the row's price and the vendor's name at the
    /// moment the row is locked.
    async fn reserve_and_record(
        &self,
        reservation: &Reservation,
        order_id: OrderId,
    ) -> Result<ReservedOrder>;

    /// Adds a product to a vendor's inventory.
    async fn enroll(
        &self,
        vendor_id: VendorId,
        product_id: ProductId,
        price: Money,
        stock: u32,
    ) -> Result<InventoryRecord>;

    /// Sets the price of a row, returning the previous price.
    async fn update_price(
        &self,
        vendor_id: VendorId,
        product_id: ProductId,
        price: Money,
    ) -> Result<PriceChange>;

    /// Sets the stock of a row, returning the previous stock.
    async fn update_stock(
        &self,
        vendor_id: VendorId,
        product_id: ProductId,
        stock: u32,
    ) -> Result<StockChange>;

    /// Removes a product from a vendor's inventory.
    async fn unenroll(&self, vendor_id: VendorId, product_id: ProductId) -> Result<()>;

    /// Gets an order by id.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Lists the orders allocated to a vendor, newest first.
    async fn list_orders_for_vendor(&self, vendor_id: VendorId) -> Result<Vec<Order>>;
}

/// Extension trait providing convenience methods for ledgers.
#[async_trait]
pub trait LedgerExt: Ledger {
    /// Checks whether a product exists in the catalog.
    async fn product_exists(&self, product_id: ProductId) -> Result<bool> {
        Ok(self.find_product(product_id).await?.is_some())
    }

    /// Current stock of a row, if the row exists.
    async fn stock_of(&self, vendor_id: VendorId, product_id: ProductId) -> Result<Option<u32>> {
        Ok(self
            .get_record(vendor_id, product_id)
            .await?
            .map(|record| record.stock))
    }
}

// Blanket implementation for all Ledger implementations
impl<T: Ledger + ?Sized> LedgerExt for T {}

/// Highest unit price a row may carry ($1,000,000.00). Keeps any line total
/// `price * quantity` within `i64` cents.
pub const MAX_PRICE: Money = Money::from_cents(100_000_000);

/// Highest stock a row may carry; the column is a 32-bit `INTEGER`.
pub const MAX_STOCK: u32 = i32::MAX as u32;

/// Rejects prices that are not strictly positive or exceed [`MAX_PRICE`].
pub fn validate_price(price: Money) -> Result<()> {
    if price.is_positive() && price <= MAX_PRICE {
        Ok(())
    } else {
        Err(LedgerError::InvalidPrice(price))
    }
}

/// Rejects stock levels above [`MAX_STOCK`].
pub fn validate_stock(stock: u32) -> Result<()> {
    if stock <= MAX_STOCK {
        Ok(())
    } else {
        Err(LedgerError::InvalidStock(stock))
    }
}
