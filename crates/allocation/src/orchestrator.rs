//! Order orchestration: resolve, reserve, record.

use std::collections::HashMap;
use std::future::Future;
use std::time::Instant;

use ledger::{Ledger, Money, Order, OrderId, ProductId, Reservation, ReservedOrder, VendorId};

use crate::error::{AllocationError, Result};
use crate::reservation::{self, ReservationOutcome};
use crate::resolver::resolve;

/// Bounds on the resolve-and-reserve loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationPolicy {
    /// Number of times a winner is resolved before giving up. At least 1.
    pub max_attempts: u32,
}

impl AllocationPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS)
    }
}

/// Outcome of a bare allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationResult {
    pub vendor_id: Option<VendorId>,
    pub success: bool,
}

impl AllocationResult {
    fn allocated(vendor_id: VendorId) -> Self {
        Self {
            vendor_id: Some(vendor_id),
            success: true,
        }
    }

    fn failed() -> Self {
        Self {
            vendor_id: None,
            success: false,
        }
    }
}

/// An order together with the product and pricing shown to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderResult {
    pub order: Order,
    pub product_name: String,
    pub unit_price: Money,
    pub total_price: Money,
}

impl OrderResult {
    pub fn new(order: Order, product_name: impl Into<String>) -> Self {
        Self {
            unit_price: order.unit_price,
            total_price: order.total_price(),
            product_name: product_name.into(),
            order,
        }
    }
}

/// Routes orders to a single vendor and records them.
///
/// Each order either ends with the winning vendor's stock reduced and the
/// order stored, or with no change at all. When a reservation is refused
/// because a concurrent order consumed the stock first, the winner is
/// resolved again against fresh inventory, up to
/// [`AllocationPolicy::max_attempts`] times.
pub struct OrderOrchestrator<L: Ledger> {
    ledger: L,
    policy: AllocationPolicy,
}

impl<L: Ledger> OrderOrchestrator<L> {
    /// Creates an orchestrator with the default policy.
    pub fn new(ledger: L) -> Self {
        Self::with_policy(ledger, AllocationPolicy::default())
    }

    pub fn with_policy(ledger: L, policy: AllocationPolicy) -> Self {
        Self { ledger, policy }
    }

    /// Returns a reference to the underlying ledger.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn policy(&self) -> AllocationPolicy {
        self.policy
    }

    /// Resolves a vendor and takes the stock without recording an order.
    ///
    /// An unknown product has no candidates and fails like any other
    /// product without stock.
    #[tracing::instrument(skip(self))]
    pub async fn allocate(&self, product_id: ProductId, quantity: u32) -> Result<AllocationResult> {
        ensure_positive(quantity)?;

        let ledger = &self.ledger;
        let outcome = self
            .resolve_and_reserve(product_id, quantity, move |pending| async move {
                reservation::reserve_stock(ledger, pending)
                    .await
                    .map(|outcome| match outcome {
                        ReservationOutcome::Reserved(_) => {
                            ReservationOutcome::Reserved(pending.vendor_id)
                        }
                        ReservationOutcome::LostRace(e) => ReservationOutcome::LostRace(e),
                    })
            })
            .await?;

        Ok(match outcome {
            Some(vendor_id) => AllocationResult::allocated(vendor_id),
            None => AllocationResult::failed(),
        })
    }

    /// Allocates the quantity to one vendor and records the order.
    ///
    /// Fails with `ProductNotFound` for an unknown product and with
    /// `NoStockAvailable` when no vendor can cover the quantity. In both
    /// cases nothing is written.
    #[tracing::instrument(skip(self))]
    pub async fn create_order(&self, product_id: ProductId, quantity: u32) -> Result<OrderResult> {
        ensure_positive(quantity)?;
        let started = Instant::now();

        let product = self
            .ledger
            .find_product(product_id)
            .await?
            .ok_or(AllocationError::ProductNotFound(product_id))?;

        // Failed attempts persist nothing, so one id serves every attempt.
        let order_id = OrderId::new();
        let ledger = &self.ledger;
        let reserved: Option<ReservedOrder> = self
            .resolve_and_reserve(product_id, quantity, move |pending| {
                reservation::reserve_order(ledger, pending, order_id)
            })
            .await?;

        let Some(reserved) = reserved else {
            metrics::counter!("order_allocation_failures_total").increment(1);
            tracing::info!(product = %product.name, quantity, "no vendor has stock");
            return Err(AllocationError::NoStockAvailable {
                product_name: product.name,
            });
        };

        metrics::counter!("orders_created_total").increment(1);
        metrics::histogram!("order_create_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(
            order_id = %reserved.order.id,
            vendor_id = %reserved.order.allocated_vendor_id,
            remaining_stock = reserved.remaining_stock,
            "order allocated"
        );

        Ok(OrderResult::new(reserved.order, product.name))
    }

    /// Gets an order allocated to `requesting_vendor`.
    ///
    /// An order that belongs to another vendor is reported exactly like an
    /// order that does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId, requesting_vendor: VendorId) -> Result<Order> {
        match self.ledger.get_order(order_id).await? {
            Some(order) if order.allocated_vendor_id == requesting_vendor => Ok(order),
            _ => Err(AllocationError::OrderNotFound(order_id)),
        }
    }

    /// Lists the orders allocated to a vendor, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, vendor_id: VendorId) -> Result<Vec<Order>> {
        Ok(self.ledger.list_orders_for_vendor(vendor_id).await?)
    }

    /// Attaches the product name and totals to a stored order.
    pub async fn describe_order(&self, order: Order) -> Result<OrderResult> {
        let product = self
            .ledger
            .find_product(order.product_id)
            .await?
            .ok_or(AllocationError::ProductNotFound(order.product_id))?;
        Ok(OrderResult::new(order, product.name))
    }

    /// Like [`describe_order`](Self::describe_order), looking each product
    /// up once.
    pub async fn describe_orders(&self, orders: Vec<Order>) -> Result<Vec<OrderResult>> {
        let mut names: HashMap<ProductId, String> = HashMap::new();
        let mut results = Vec::with_capacity(orders.len());

        for order in orders {
            let name = match names.get(&order.product_id) {
                Some(name) => name.clone(),
                None => {
                    let product = self
                        .ledger
                        .find_product(order.product_id)
                        .await?
                        .ok_or(AllocationError::ProductNotFound(order.product_id))?;
                    names.insert(product.id, product.name.clone());
                    product.name
                }
            };
            results.push(OrderResult::new(order, name));
        }

        Ok(results)
    }

    /// Resolves a winner from fresh candidates and hands it to `reserve`.
    ///
    /// Returns `None` when no candidate qualifies or every attempt lost
    /// its race.
    async fn resolve_and_reserve<T, F, Fut>(
        &self,
        product_id: ProductId,
        quantity: u32,
        mut reserve: F,
    ) -> Result<Option<T>>
    where
        F: FnMut(Reservation) -> Fut,
        Fut: Future<Output = Result<ReservationOutcome<T>>>,
    {
        for attempt in 1..=self.policy.max_attempts {
            metrics::counter!("allocation_attempts_total").increment(1);

            let candidates = self.ledger.list_eligible_candidates(product_id).await?;
            let Some(winner) = resolve(&candidates, quantity) else {
                tracing::debug!(
                    attempt,
                    candidates = candidates.len(),
                    "no candidate qualifies"
                );
                return Ok(None);
            };

            tracing::debug!(
                attempt,
                vendor_id = %winner.vendor_id,
                price = %winner.price,
                "winner resolved"
            );
            match reserve(Reservation::new(winner.vendor_id, product_id, quantity)).await? {
                ReservationOutcome::Reserved(value) => return Ok(Some(value)),
                ReservationOutcome::LostRace(_) => continue,
            }
        }

        tracing::warn!(
            max_attempts = self.policy.max_attempts,
            "allocation attempts exhausted"
        );
        Ok(None)
    }
}

fn ensure_positive(quantity: u32) -> Result<()> {
    if quantity == 0 {
        Err(AllocationError::InvalidQuantity)
    } else {
        Ok(())
    }
}
