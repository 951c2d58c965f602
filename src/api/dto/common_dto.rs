//! Shared DTO types used across multiple endpoints.

use serde::Deserialize;
use utoipa::IntoParams;

use crate::service::MAX_HISTORY_LIMIT;

/// Query parameters for history endpoints.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryParams {
    /// Maximum number of items, most recent first (1 to 50). Defaults to 10.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl Default for HistoryParams {
    fn default() -> Self {
        Self {
            limit: default_limit(),
        }
    }
}

fn default_limit() -> i64 {
    10
}

impl HistoryParams {
    /// Clamps `limit` to the allowed range.
    #[must_use]
    pub fn clamped(&self) -> i64 {
        self.limit.clamp(1, MAX_HISTORY_LIMIT)
    }
}
