use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    Candidate, InventoryRecord, LedgerError, Money, Order, OrderId, OrderStatus, PriceChange,
    Product, ProductId, Reservation, ReservedOrder, Result, StockChange, Vendor, VendorId,
    VendorProduct,
    store::{Ledger, validate_price, validate_stock},
};

#[derive(Default)]
struct LedgerState {
    products: BTreeMap<ProductId, Product>,
    vendors: BTreeMap<VendorId, Vendor>,
    inventory: BTreeMap<(VendorId, ProductId), InventoryRecord>,
    orders: Vec<Order>,
}

impl LedgerState {
    /// Guarded decrement; the caller holds the write lock.
    fn take_stock(&mut self, reservation: &Reservation) -> Result<&InventoryRecord> {
        let key = (reservation.vendor_id, reservation.product_id);
        let record = self
            .inventory
            .get_mut(&key)
            .ok_or(LedgerError::RecordNotFound {
                vendor_id: reservation.vendor_id,
                product_id: reservation.product_id,
            })?;

        if record.stock < reservation.quantity {
            return Err(LedgerError::InsufficientStock {
                vendor_id: reservation.vendor_id,
                product_id: reservation.product_id,
                available: record.stock,
                requested: reservation.quantity,
            });
        }

        record.stock -= reservation.quantity;
        record.version += 1;
        record.updated_at = Utc::now();
        Ok(record)
    }

    fn record_mut(
        &mut self,
        vendor_id: VendorId,
        product_id: ProductId,
    ) -> Result<&mut InventoryRecord> {
        self.inventory
            .get_mut(&(vendor_id, product_id))
            .ok_or(LedgerError::RecordNotFound {
                vendor_id,
                product_id,
            })
    }
}

/// In-memory ledger implementation for testing and local runs.
///
/// A single write lock covers every mutation, which gives reservations and
/// vendor edits the same exclusion the PostgreSQL row locks provide.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    /// Creates a new empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a catalog product.
    pub async fn insert_product(&self, product: Product) {
        self.state
            .write()
            .await
            .products
            .insert(product.id, product);
    }

    /// Seeds a vendor identity.
    pub async fn insert_vendor(&self, vendor: Vendor) {
        self.state.write().await.vendors.insert(vendor.id, vendor);
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns every inventory row, ordered by (vendor, product).
    pub async fn all_records(&self) -> Vec<InventoryRecord> {
        self.state.read().await.inventory.values().cloned().collect()
    }

    /// Clears all rows, catalog included.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.products.clear();
        state.vendors.clear();
        state.inventory.clear();
        state.orders.clear();
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&product_id).cloned())
    }

    async fn find_vendor(&self, vendor_id: VendorId) -> Result<Option<Vendor>> {
        Ok(self.state.read().await.vendors.get(&vendor_id).cloned())
    }

    async fn list_eligible_candidates(&self, product_id: ProductId) -> Result<Vec<Candidate>> {
        let state = self.state.read().await;
        let mut candidates: Vec<Candidate> = state
            .inventory
            .values()
            .filter(|r| r.product_id == product_id && r.stock > 0)
            .map(Candidate::from)
            .collect();

        candidates.sort_by(|a, b| a.price.cmp(&b.price).then(a.vendor_id.cmp(&b.vendor_id)));
        Ok(candidates)
    }

    async fn get_record(
        &self,
        vendor_id: VendorId,
        product_id: ProductId,
    ) -> Result<Option<InventoryRecord>> {
        Ok(self
            .state
            .read()
            .await
            .inventory
            .get(&(vendor_id, product_id))
            .cloned())
    }

    async fn list_vendor_records(&self, vendor_id: VendorId) -> Result<Vec<VendorProduct>> {
        let state = self.state.read().await;
        // BTreeMap keys are (vendor, product), so the range is already ordered by product.
        let rows = state
            .inventory
            .range((vendor_id, ProductId::new(i64::MIN))..=(vendor_id, ProductId::new(i64::MAX)))
            .filter_map(|(_, record)| {
                state.products.get(&record.product_id).map(|product| VendorProduct {
                    record: record.clone(),
                    product: product.clone(),
                })
            })
            .collect();
        Ok(rows)
    }

    async fn decrement(&self, reservation: &Reservation) -> Result<u32> {
        let mut state = self.state.write().await;
        let record = state.take_stock(reservation)?;
        Ok(record.stock)
    }

    async fn reserve_and_record(
        &self,
        reservation: &Reservation,
        order_id: OrderId,
    ) -> Result<ReservedOrder> {
        let mut state = self.state.write().await;

        // Resolve everything that can fail before the row is touched.
        let vendor_name = state
            .vendors
            .get(&reservation.vendor_id)
            .map(|v| v.name.clone())
            .ok_or(LedgerError::VendorNotFound(reservation.vendor_id))?;

        let record = state.take_stock(reservation)?;
        let remaining_stock = record.stock;
        let unit_price = record.price;

        let order = Order {
            id: order_id,
            product_id: reservation.product_id,
            quantity: reservation.quantity,
            allocated_vendor_id: reservation.vendor_id,
            status: OrderStatus::Allocated,
            unit_price,
            vendor_name,
            created_at: Utc::now(),
        };
        state.orders.push(order.clone());

        Ok(ReservedOrder {
            order,
            remaining_stock,
        })
    }

    async fn enroll(
        &self,
        vendor_id: VendorId,
        product_id: ProductId,
        price: Money,
        stock: u32,
    ) -> Result<InventoryRecord> {
        validate_price(price)?;
        validate_stock(stock)?;
        let mut state = self.state.write().await;

        if !state.vendors.contains_key(&vendor_id) {
            return Err(LedgerError::VendorNotFound(vendor_id));
        }
        if !state.products.contains_key(&product_id) {
            return Err(LedgerError::ProductNotFound(product_id));
        }
        if state.inventory.contains_key(&(vendor_id, product_id)) {
            return Err(LedgerError::AlreadyEnrolled {
                vendor_id,
                product_id,
            });
        }

        let record = InventoryRecord {
            vendor_id,
            product_id,
            price,
            stock,
            version: 1,
            updated_at: Utc::now(),
        };
        state
            .inventory
            .insert((vendor_id, product_id), record.clone());
        Ok(record)
    }

    async fn update_price(
        &self,
        vendor_id: VendorId,
        product_id: ProductId,
        price: Money,
    ) -> Result<PriceChange> {
        validate_price(price)?;
        let mut state = self.state.write().await;
        let record = state.record_mut(vendor_id, product_id)?;

        let old_price = record.price;
        record.price = price;
        record.version += 1;
        record.updated_at = Utc::now();

        Ok(PriceChange {
            old_price,
            record: record.clone(),
        })
    }

    async fn update_stock(
        &self,
        vendor_id: VendorId,
        product_id: ProductId,
        stock: u32,
    ) -> Result<StockChange> {
        validate_stock(stock)?;
        let mut state = self.state.write().await;
        let record = state.record_mut(vendor_id, product_id)?;

        let old_stock = record.stock;
        record.stock = stock;
        record.version += 1;
        record.updated_at = Utc::now();

        Ok(StockChange {
            old_stock,
            record: record.clone(),
        })
    }

    async fn unenroll(&self, vendor_id: VendorId, product_id: ProductId) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .inventory
            .remove(&(vendor_id, product_id))
            .map(|_| ())
            .ok_or(LedgerError::RecordNotFound {
                vendor_id,
                product_id,
            })
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.iter().find(|o| o.id == order_id).cloned())
    }

    async fn list_orders_for_vendor(&self, vendor_id: VendorId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        // Orders are appended in creation order; the stable sort keeps later
        // inserts first when timestamps tie.
        let mut orders: Vec<_> = state
            .orders
            .iter()
            .rev()
            .filter(|o| o.allocated_vendor_id == vendor_id)
            .cloned()
            .collect();

        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LedgerExt;

    const WIDGET: ProductId = ProductId::new(1);

    async fn widget_ledger() -> InMemoryLedger {
        let ledger = InMemoryLedger::new();
        ledger
            .insert_product(Product::new(WIDGET, "WID-001", "Widget"))
            .await;
        for id in 1..=3 {
            ledger
                .insert_vendor(Vendor::new(VendorId::new(id), format!("Vendor-{id}")))
                .await;
        }
        ledger
            .enroll(VendorId::new(1), WIDGET, Money::from_dollars(50), 100)
            .await
            .unwrap();
        ledger
            .enroll(VendorId::new(2), WIDGET, Money::from_dollars(45), 50)
            .await
            .unwrap();
        ledger
            .enroll(VendorId::new(3), WIDGET, Money::from_dollars(40), 0)
            .await
            .unwrap();
        ledger
    }

    #[tokio::test]
    async fn test_candidates_skip_empty_rows_and_sort_by_price() {
        let ledger = widget_ledger().await;

        let candidates = ledger.list_eligible_candidates(WIDGET).await.unwrap();
        let vendors: Vec<_> = candidates.iter().map(|c| c.vendor_id).collect();

        assert_eq!(vendors, vec![VendorId::new(2), VendorId::new(1)]);
    }

    #[tokio::test]
    async fn test_candidates_break_price_ties_by_vendor_id() {
        let ledger = widget_ledger().await;
        ledger
            .update_price(VendorId::new(1), WIDGET, Money::from_dollars(45))
            .await
            .unwrap();

        let candidates = ledger.list_eligible_candidates(WIDGET).await.unwrap();
        assert_eq!(candidates[0].vendor_id, VendorId::new(1));
        assert_eq!(candidates[1].vendor_id, VendorId::new(2));
    }

    #[tokio::test]
    async fn test_decrement_rechecks_stock() {
        let ledger = widget_ledger().await;
        let reservation = Reservation::new(VendorId::new(2), WIDGET, 60);

        let err = ledger.decrement(&reservation).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientStock {
                available: 50,
                requested: 60,
                ..
            }
        ));
        assert_eq!(
            ledger.stock_of(VendorId::new(2), WIDGET).await.unwrap(),
            Some(50)
        );
    }

    #[tokio::test]
    async fn test_decrement_missing_row() {
        let ledger = widget_ledger().await;
        let reservation = Reservation::new(VendorId::new(9), WIDGET, 1);

        let err = ledger.decrement(&reservation).await.unwrap_err();
        assert!(matches!(err, LedgerError::RecordNotFound { .. }));
    }

    #[tokio::test]
    async fn test_reserve_and_record_snapshots_price() {
        let ledger = widget_ledger().await;
        let reservation = Reservation::new(VendorId::new(2), WIDGET, 10);

        let reserved = ledger
            .reserve_and_record(&reservation, OrderId::new())
            .await
            .unwrap();

        assert_eq!(reserved.remaining_stock, 40);
        assert_eq!(reserved.order.unit_price, Money::from_dollars(45));
        assert_eq!(reserved.order.vendor_name, "Vendor-2");
        assert_eq!(reserved.order.status, OrderStatus::Allocated);
        assert_eq!(ledger.order_count().await, 1);

        let record = ledger
            .get_record(VendorId::new(2), WIDGET)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.stock, 40);
        assert_eq!(record.version, 2);
    }

    #[tokio::test]
    async fn test_failed_reservation_records_nothing() {
        let ledger = widget_ledger().await;
        let reservation = Reservation::new(VendorId::new(3), WIDGET, 1);

        let result = ledger.reserve_and_record(&reservation, OrderId::new()).await;

        assert!(result.is_err());
        assert_eq!(ledger.order_count().await, 0);
        assert_eq!(
            ledger.stock_of(VendorId::new(3), WIDGET).await.unwrap(),
            Some(0)
        );
    }

    #[tokio::test]
    async fn test_enroll_twice_conflicts() {
        let ledger = widget_ledger().await;

        let err = ledger
            .enroll(VendorId::new(1), WIDGET, Money::from_dollars(10), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyEnrolled { .. }));
    }

    #[tokio::test]
    async fn test_enroll_unknown_product() {
        let ledger = widget_ledger().await;

        let err = ledger
            .enroll(VendorId::new(1), ProductId::new(99), Money::from_dollars(10), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::ProductNotFound(_)));
    }

    #[tokio::test]
    async fn test_out_of_range_price_and_stock_are_rejected() {
        let ledger = widget_ledger().await;
        let gadget = ProductId::new(2);
        ledger
            .insert_product(Product::new(gadget, "GAD-001", "Gadget"))
            .await;

        let err = ledger
            .enroll(VendorId::new(1), gadget, Money::from_cents(100_000_000_000_000_000), 1000)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidPrice(_)));

        let err = ledger
            .enroll(VendorId::new(1), gadget, Money::from_dollars(10), crate::MAX_STOCK + 1)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidStock(_)));
        assert!(ledger.get_record(VendorId::new(1), gadget).await.unwrap().is_none());

        let err = ledger
            .update_price(VendorId::new(1), WIDGET, Money::from_cents(crate::MAX_PRICE.cents() + 1))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidPrice(_)));

        let err = ledger
            .update_stock(VendorId::new(1), WIDGET, 3_000_000_000)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidStock(_)));
        assert_eq!(
            ledger.stock_of(VendorId::new(1), WIDGET).await.unwrap(),
            Some(100)
        );
    }

    #[tokio::test]
    async fn test_stock_edit_reports_previous_value() {
        let ledger = widget_ledger().await;

        let change = ledger
            .update_stock(VendorId::new(3), WIDGET, 25)
            .await
            .unwrap();
        assert_eq!(change.old_stock, 0);
        assert_eq!(change.record.stock, 25);
    }

    #[tokio::test]
    async fn test_unenroll_removes_row() {
        let ledger = widget_ledger().await;

        ledger.unenroll(VendorId::new(1), WIDGET).await.unwrap();
        assert!(ledger.get_record(VendorId::new(1), WIDGET).await.unwrap().is_none());

        let err = ledger.unenroll(VendorId::new(1), WIDGET).await.unwrap_err();
        assert!(matches!(err, LedgerError::RecordNotFound { .. }));
    }

    #[tokio::test]
    async fn test_vendor_listing_joins_products() {
        let ledger = widget_ledger().await;
        let gadget = ProductId::new(2);
        ledger
            .insert_product(Product::new(gadget, "GAD-001", "Gadget"))
            .await;
        ledger
            .enroll(VendorId::new(1), gadget, Money::from_dollars(12), 3)
            .await
            .unwrap();

        let rows = ledger.list_vendor_records(VendorId::new(1)).await.unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.product.name.as_str()).collect();
        assert_eq!(names, vec!["Widget", "Gadget"]);
    }

    #[tokio::test]
    async fn test_orders_listed_newest_first() {
        let ledger = widget_ledger().await;
        let first = OrderId::new();
        let second = OrderId::new();
        let reservation = Reservation::new(VendorId::new(1), WIDGET, 1);
        ledger.reserve_and_record(&reservation, first).await.unwrap();
        ledger.reserve_and_record(&reservation, second).await.unwrap();

        let orders = ledger.list_orders_for_vendor(VendorId::new(1)).await.unwrap();
        let ids: Vec<_> = orders.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![second, first]);
        assert!(ledger.list_orders_for_vendor(VendorId::new(2)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear() {
        let ledger = widget_ledger().await;
        ledger
            .reserve_and_record(&Reservation::new(VendorId::new(1), WIDGET, 1), OrderId::new())
            .await
            .unwrap();

        ledger.clear().await;

        assert_eq!(ledger.order_count().await, 0);
        assert!(ledger.all_records().await.is_empty());
        assert!(!ledger.product_exists(WIDGET).await.unwrap());
    }
}
