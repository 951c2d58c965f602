//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The WebSocket endpoint at `/ws` pushes ledger events (top-ups,
//! deductions, refunds, generations, purchases) to clients subscribed to
//! the affected user ids.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
