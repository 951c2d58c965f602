//! Domain layer: ledger records, package catalog and the event system.
//!
//! Plain data types shared by the persistence, service and transport
//! layers. Nothing here performs I/O.

pub mod account;
pub mod event_bus;
pub mod generation;
pub mod ledger_event;
pub mod package;
pub mod purchase;
pub mod user_id;

pub use account::{Account, UserProfile, UserStats};
pub use event_bus::EventBus;
pub use generation::{Generation, NewGeneration};
pub use ledger_event::{CreditReason, LedgerEvent};
pub use package::{CATALOG, CreditPackage, find_package};
pub use purchase::{NewPurchase, Purchase, PurchaseStatus, default_payment_id};
pub use user_id::UserId;
