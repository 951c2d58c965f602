//! # imagegen-gateway
//!
//! Credit ledger and generation gateway for a conversational AI image bot.
//!
//! The chat front-end calls this service to onboard users, check and move
//! their credit balance, run paid image generations and record pending
//! credit purchases. Ledger changes are pushed over WebSocket so the
//! front-end can notify users.
//!
//! ## Architecture
//!
//! ```text
//! Chat front-end (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── GenerationOrchestrator (service/) ── ImageGenerator (generator/)
//!     ├── LedgerService (service/)
//!     ├── EventBus (domain/)
//!     │
//!     └── LedgerStore (persistence/): PostgreSQL or in-memory
//! ```
//!
//! The deduction is a single conditional update: concurrent requests
//! against the same balance never overdraw it. A provider failure after
//! the charge is compensated by an idempotent refund keyed by the
//! request id.

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod generator;
pub mod persistence;
pub mod service;
pub mod ws;
