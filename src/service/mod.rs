//! Service layer: business logic orchestration.
//!
//! [`LedgerService`] owns the credit rules and emits events through the
//! [`super::domain::EventBus`]. [`GenerationOrchestrator`] charges, calls
//! the image provider and records the result, refunding on failure.

pub mod ledger_service;
pub mod orchestrator;

pub use ledger_service::{LedgerService, MAX_HISTORY_LIMIT, StartOutcome};
pub use orchestrator::{GenerationOrchestrator, GenerationReceipt};
