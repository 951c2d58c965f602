//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::LedgerRules;
use crate::domain::EventBus;
use crate::service::{GenerationOrchestrator, LedgerService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Accounts, balances and history.
    pub ledger: Arc<LedgerService>,
    /// Paid generation flow.
    pub orchestrator: Arc<GenerationOrchestrator>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
}

impl AppState {
    /// Wires the services together around one store and one generator.
    #[must_use]
    pub fn new(
        store: Arc<dyn crate::persistence::LedgerStore>,
        generator: Arc<dyn crate::generator::ImageGenerator>,
        rules: LedgerRules,
        event_bus: EventBus,
    ) -> Self {
        let ledger = Arc::new(LedgerService::new(store, event_bus.clone()));
        let orchestrator = Arc::new(GenerationOrchestrator::new(
            Arc::clone(&ledger),
            generator,
            rules,
        ));
        Self {
            ledger,
            orchestrator,
            event_bus,
        }
    }

    /// Pricing and prompt rules in effect.
    #[must_use]
    pub fn rules(&self) -> &LedgerRules {
        self.orchestrator.rules()
    }
}
