//! Shared application state.

use allocation::OrderOrchestrator;
use ledger::Ledger;

use crate::config::ResponseProfile;

/// Shared application state accessible from all handlers.
pub struct AppState<L: Ledger> {
    pub orchestrator: OrderOrchestrator<L>,
    pub profile: ResponseProfile,
}

impl<L: Ledger> AppState<L> {
    pub fn new(orchestrator: OrderOrchestrator<L>, profile: ResponseProfile) -> Self {
        Self {
            orchestrator,
            profile,
        }
    }

    pub fn ledger(&self) -> &L {
        self.orchestrator.ledger()
    }
}
