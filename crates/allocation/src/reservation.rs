//! Stock reservation against the resolved winner.
//!
//! The ledger rechecks `stock >= quantity` under the row lock, so a winner
//! picked from an earlier read can still be refused. Those refusals are
//! lost races and come back as [`ReservationOutcome::LostRace`] instead of
//! an error; anything else is a real failure.

use ledger::{Ledger, LedgerError, OrderId, Reservation, ReservedOrder};

use crate::error::Result;

/// Result of a single reservation attempt.
#[derive(Debug)]
pub enum ReservationOutcome<T> {
    /// The stock was taken.
    Reserved(T),
    /// A concurrent writer changed the row first. Nothing was persisted.
    LostRace(LedgerError),
}

impl<T> ReservationOutcome<T> {
    pub fn is_reserved(&self) -> bool {
        matches!(self, ReservationOutcome::Reserved(_))
    }
}

/// Takes the stock without recording an order. Returns the remaining stock.
pub async fn reserve_stock<L>(
    ledger: &L,
    reservation: Reservation,
) -> Result<ReservationOutcome<u32>>
where
    L: Ledger + ?Sized,
{
    classify(ledger.decrement(&reservation).await, &reservation)
}

/// Takes the stock and records the order as one transaction.
pub async fn reserve_order<L>(
    ledger: &L,
    reservation: Reservation,
    order_id: OrderId,
) -> Result<ReservationOutcome<ReservedOrder>>
where
    L: Ledger + ?Sized,
{
    classify(
        ledger.reserve_and_record(&reservation, order_id).await,
        &reservation,
    )
}

fn classify<T>(
    result: ledger::Result<T>,
    reservation: &Reservation,
) -> Result<ReservationOutcome<T>> {
    match result {
        Ok(value) => Ok(ReservationOutcome::Reserved(value)),
        Err(e) if e.is_retryable() => {
            metrics::counter!("allocation_conflicts_total").increment(1);
            tracing::warn!(
                vendor_id = %reservation.vendor_id,
                product_id = %reservation.product_id,
                quantity = reservation.quantity,
                error = %e,
                "reservation lost race"
            );
            Ok(ReservationOutcome::LostRace(e))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AllocationError;
    use ledger::{InMemoryLedger, Money, Product, ProductId, Vendor, VendorId};

    const GADGET: ProductId = ProductId::new(5);
    const SELLER: VendorId = VendorId::new(1);

    async fn ledger_with_stock(stock: u32) -> InMemoryLedger {
        let ledger = InMemoryLedger::new();
        ledger
            .insert_product(Product::new(GADGET, "GAD-005", "Gadget"))
            .await;
        ledger.insert_vendor(Vendor::new(SELLER, "Seller")).await;
        ledger
            .enroll(SELLER, GADGET, Money::from_dollars(12), stock)
            .await
            .unwrap();
        ledger
    }

    #[tokio::test]
    async fn reserve_stock_returns_remaining() {
        let ledger = ledger_with_stock(8).await;

        let outcome = reserve_stock(&ledger, Reservation::new(SELLER, GADGET, 3))
            .await
            .unwrap();

        assert!(matches!(outcome, ReservationOutcome::Reserved(5)));
    }

    #[tokio::test]
    async fn insufficient_stock_is_a_lost_race() {
        let ledger = ledger_with_stock(2).await;

        let outcome = reserve_stock(&ledger, Reservation::new(SELLER, GADGET, 3))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            ReservationOutcome::LostRace(LedgerError::InsufficientStock { .. })
        ));
    }

    #[tokio::test]
    async fn vanished_row_is_a_lost_race() {
        let ledger = ledger_with_stock(2).await;
        ledger.unenroll(SELLER, GADGET).await.unwrap();

        let outcome = reserve_order(&ledger, Reservation::new(SELLER, GADGET, 1), OrderId::new())
            .await
            .unwrap();

        assert!(!outcome.is_reserved());
        assert_eq!(ledger.order_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_vendor_is_not_retried() {
        let ledger = ledger_with_stock(2).await;

        let err = reserve_order(
            &ledger,
            Reservation::new(VendorId::new(99), GADGET, 1),
            OrderId::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            AllocationError::Ledger(LedgerError::VendorNotFound(_))
        ));
    }
}
