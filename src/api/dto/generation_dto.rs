//! Generation DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::Generation;

/// Request body for `POST /users/{user_id}/generations`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateRequest {
    /// What to draw (5 to 1000 characters after trimming).
    pub prompt: String,
    /// What to avoid.
    #[serde(default)]
    pub negative_prompt: Option<String>,
}

/// A recorded generation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GenerationDto {
    /// Record id.
    pub id: i64,
    /// Platform user id.
    pub user_id: i64,
    /// Originating request id.
    pub request_id: Option<Uuid>,
    /// Prompt text.
    pub prompt: String,
    /// Negative prompt.
    pub negative_prompt: Option<String>,
    /// Image locator.
    pub image_url: String,
    /// Provider asset id.
    pub asset_id: Option<String>,
    /// Credits charged.
    pub cost: i64,
    /// Record time.
    pub created_at: DateTime<Utc>,
}

impl From<Generation> for GenerationDto {
    fn from(g: Generation) -> Self {
        Self {
            id: g.id,
            user_id: g.user_id.as_i64(),
            request_id: g.request_id,
            prompt: g.prompt,
            negative_prompt: g.negative_prompt,
            image_url: g.image_url,
            asset_id: g.asset_id,
            cost: g.cost,
            created_at: g.created_at,
        }
    }
}

/// Response body for `POST /users/{user_id}/generations` (201 Created).
#[derive(Debug, Serialize, ToSchema)]
pub struct GenerateResponse {
    /// The recorded generation.
    pub generation: GenerationDto,
    /// Balance after the charge.
    pub balance: i64,
}

/// Response body for `GET /users/{user_id}/generations`.
#[derive(Debug, Serialize, ToSchema)]
pub struct GenerationListResponse {
    /// Most recent first.
    pub data: Vec<GenerationDto>,
}
