//! Allocation engine for multi-vendor order fulfillment.
//!
//! An order for a product is routed to exactly one vendor:
//! 1. Resolve the cheapest vendor that can cover the full quantity
//! 2. Reserve the stock with a guarded decrement
//! 3. Record the order in the same transaction as the decrement
//!
//! A reservation that loses a race against a concurrent order is discarded
//! and the winner is resolved again against fresh inventory.

pub mod error;
pub mod orchestrator;
pub mod reservation;
pub mod resolver;

pub use error::{AllocationError, Result};
pub use orchestrator::{AllocationPolicy, AllocationResult, OrderOrchestrator, OrderResult};
pub use reservation::ReservationOutcome;
pub use resolver::resolve;
