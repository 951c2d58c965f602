//! External image generation provider.
//!
//! [`ImageGenerator`] is the seam between the orchestrator and whatever
//! turns a prompt into an image URL. Two implementations ship with the
//! gateway: [`ReplicateGenerator`] (HTTP client for the Replicate
//! predictions API) and [`PlaceholderGenerator`] (returns stock images,
//! for local development).

pub mod placeholder;
pub mod replicate;

use async_trait::async_trait;
use serde::Serialize;

pub use placeholder::PlaceholderGenerator;
pub use replicate::{ReplicateConfig, ReplicateGenerator};

/// Maximum number of characters of a provider message echoed to users.
const USER_MESSAGE_LIMIT: usize = 100;

/// Parameters of one generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    /// What to draw.
    pub prompt: String,
    /// What to avoid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    /// Aspect ratio understood by the provider, e.g. `"1:1"`.
    pub aspect_ratio: String,
    /// Output image format, e.g. `"webp"`.
    pub output_format: String,
}

/// A successfully produced image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// Where the image can be fetched.
    pub image_url: String,
    /// Provider-assigned asset id.
    pub asset_id: Option<String>,
}

/// Categorized provider failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The prompt or the output was rejected by the provider's content policy.
    #[error("content rejected by provider policy: {0}")]
    ContentPolicy(String),

    /// The provider throttled the request.
    #[error("provider rate limit exceeded")]
    RateLimited,

    /// Any other provider or transport failure.
    #[error("generation failed: {0}")]
    Failed(String),
}

impl GenerationError {
    /// Sorts a free-form provider message into a category.
    #[must_use]
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if ["nsfw", "inappropriate", "sensitive"]
            .iter()
            .any(|needle| lower.contains(needle))
        {
            Self::ContentPolicy(message.to_string())
        } else if lower.contains("rate limit") || lower.contains("too many requests") {
            Self::RateLimited
        } else {
            Self::Failed(message.to_string())
        }
    }

    /// Message suitable for showing to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::ContentPolicy(_) => {
                "The content was flagged as inappropriate. Change the prompt and try again."
                    .to_string()
            }
            Self::RateLimited => "Rate limit exceeded. Please wait 1-2 minutes.".to_string(),
            Self::Failed(message) => {
                let short: String = message.chars().take(USER_MESSAGE_LIMIT).collect();
                format!("Error: {short}")
            }
        }
    }
}

/// Turns prompts into images.
#[async_trait]
pub trait ImageGenerator: Send + Sync + std::fmt::Debug {
    /// Produces one image for the request.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerationError`] describing why the provider could not
    /// produce the image.
    async fn generate(&self, request: &GenerationRequest)
    -> Result<GeneratedImage, GenerationError>;
}
