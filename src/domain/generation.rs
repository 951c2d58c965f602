//! Generation history records.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::UserId;

/// An immutable record of one paid image generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Generation {
    /// Row id.
    pub id: i64,
    /// Owning account.
    pub user_id: UserId,
    /// Orchestrator request that produced the image, when known.
    pub request_id: Option<Uuid>,
    /// Prompt text as submitted.
    pub prompt: String,
    /// Optional negative prompt.
    pub negative_prompt: Option<String>,
    /// Where the produced image can be fetched.
    pub image_url: String,
    /// Provider-assigned asset id (e.g. the prediction id).
    pub asset_id: Option<String>,
    /// Credits charged.
    pub cost: i64,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
}

/// Input to `record_generation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGeneration {
    /// Owning account.
    pub user_id: UserId,
    /// Correlates the row with the request that paid for it.
    pub request_id: Option<Uuid>,
    /// Prompt text.
    pub prompt: String,
    /// Optional negative prompt.
    pub negative_prompt: Option<String>,
    /// Produced image locator.
    pub image_url: String,
    /// Provider asset id.
    pub asset_id: Option<String>,
    /// Credits charged.
    pub cost: i64,
}

impl NewGeneration {
    pub(crate) fn into_generation(self, id: i64, created_at: DateTime<Utc>) -> Generation {
        Generation {
            id,
            user_id: self.user_id,
            request_id: self.request_id,
            prompt: self.prompt,
            negative_prompt: self.negative_prompt,
            image_url: self.image_url,
            asset_id: self.asset_id,
            cost: self.cost,
            created_at,
        }
    }
}
