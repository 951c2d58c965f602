//! Offline generator returning stock photos.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use super::{GeneratedImage, GenerationError, GenerationRequest, ImageGenerator};

/// Generator that never calls a provider.
///
/// Every call yields a distinct picsum URL, which is enough to exercise
/// the ledger end to end without an API key.
#[derive(Debug, Default)]
pub struct PlaceholderGenerator {
    counter: AtomicU64,
}

impl PlaceholderGenerator {
    /// Creates a placeholder generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageGenerator for PlaceholderGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedImage, GenerationError> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(n, prompt_len = request.prompt.len(), "placeholder generation");
        Ok(GeneratedImage {
            image_url: format!("https://picsum.photos/1024/1024?random={n}"),
            asset_id: Some(format!("placeholder-{n}")),
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn yields_distinct_urls() {
        let generator = PlaceholderGenerator::new();
        let request = GenerationRequest {
            prompt: "a lighthouse at dusk".to_string(),
            negative_prompt: None,
            aspect_ratio: "1:1".to_string(),
            output_format: "webp".to_string(),
        };
        let (Ok(a), Ok(b)) = (
            generator.generate(&request).await,
            generator.generate(&request).await,
        ) else {
            panic!("placeholder never fails");
        };
        assert_ne!(a.image_url, b.image_url);
        assert_eq!(a.asset_id.as_deref(), Some("placeholder-1"));
    }
}
