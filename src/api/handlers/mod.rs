//! REST endpoint handlers organized by resource.

pub mod account;
pub mod generation;
pub mod ledger;
pub mod purchase;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(account::routes())
        .merge(ledger::routes())
        .merge(generation::routes())
        .merge(purchase::routes())
}
