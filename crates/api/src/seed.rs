//! Demo catalog for running without a database.

use ledger::{InMemoryLedger, Ledger, LedgerError, Money, Product, ProductId, Vendor, VendorId};

/// Seeds the Widget catalog: Vendor-1 ($50, 100), Vendor-2 ($45, 50) and
/// Vendor-3 ($40, 0).
pub async fn seed_demo_catalog(ledger: &InMemoryLedger) -> Result<(), LedgerError> {
    let widget = ProductId::new(1);
    ledger
        .insert_product(Product::new(widget, "WID-001", "Widget"))
        .await;

    for (id, dollars, stock) in [(1, 50, 100), (2, 45, 50), (3, 40, 0)] {
        let vendor_id = VendorId::new(id);
        ledger
            .insert_vendor(Vendor::new(vendor_id, format!("Vendor-{id}")))
            .await;
        ledger
            .enroll(vendor_id, widget, Money::from_dollars(dollars), stock)
            .await?;
    }

    Ok(())
}
