//! Replicate predictions API client.
//!
//! Creates a prediction with `Prefer: wait` so fast models answer in a
//! single round trip, then polls the prediction's `get` URL until it
//! reaches a terminal status or the configured timeout elapses.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::Instant;

use super::{GeneratedImage, GenerationError, GenerationRequest, ImageGenerator};

/// Connection settings for [`ReplicateGenerator`].
#[derive(Clone)]
pub struct ReplicateConfig {
    /// API token sent as a bearer credential.
    pub api_key: String,
    /// Model reference, `owner/name`.
    pub model: String,
    /// API root, without trailing slash.
    pub base_url: String,
    /// Upper bound on the whole generation, polling included.
    pub timeout: Duration,
    /// Delay between status polls.
    pub poll_interval: Duration,
}

impl std::fmt::Debug for ReplicateConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicateConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

/// [`ImageGenerator`] backed by Replicate.
#[derive(Debug, Clone)]
pub struct ReplicateGenerator {
    client: reqwest::Client,
    config: ReplicateConfig,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: String,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    urls: Option<PredictionUrls>,
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    #[serde(default)]
    get: Option<String>,
}

impl ReplicateGenerator {
    /// Builds the HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Failed`] if the TLS backend cannot be
    /// initialised.
    pub fn new(config: ReplicateConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GenerationError::Failed(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn predictions_url(&self) -> String {
        format!(
            "{}/v1/models/{}/predictions",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn read_prediction(response: reqwest::Response) -> Result<Prediction, GenerationError> {
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GenerationError::RateLimited);
        }
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::Failed(e.to_string()))?;
        if !status.is_success() {
            let detail = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(text);
            return Err(GenerationError::classify(&format!("{status}: {detail}")));
        }
        serde_json::from_str(&text)
            .map_err(|e| GenerationError::Failed(format!("malformed prediction: {e}")))
    }

    async fn poll(&self, url: &str) -> Result<Prediction, GenerationError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| GenerationError::Failed(e.to_string()))?;
        Self::read_prediction(response).await
    }
}

/// Extracts the first image URL from a prediction output, which is either
/// a single string or a list of strings depending on the model.
fn first_output_url(output: &Value) -> Option<String> {
    match output {
        Value::String(url) => Some(url.clone()),
        Value::Array(items) => items.iter().find_map(|v| v.as_str().map(str::to_string)),
        _ => None,
    }
}

fn error_text(prediction: &Prediction) -> String {
    match &prediction.error {
        Some(Value::String(message)) => message.clone(),
        Some(other) => other.to_string(),
        None => format!("prediction {}", prediction.status),
    }
}

#[async_trait]
impl ImageGenerator for ReplicateGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedImage, GenerationError> {
        let deadline = Instant::now() + self.config.timeout;
        let body = json!({ "input": request });

        let response = self
            .client
            .post(self.predictions_url())
            .bearer_auth(&self.config.api_key)
            .header("Prefer", "wait")
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Failed(e.to_string()))?;
        let mut prediction = Self::read_prediction(response).await?;
        tracing::debug!(prediction_id = %prediction.id, status = %prediction.status, "prediction created");

        loop {
            match prediction.status.as_str() {
                "succeeded" => {
                    let image_url = prediction
                        .output
                        .as_ref()
                        .and_then(first_output_url)
                        .ok_or_else(|| {
                            GenerationError::Failed("prediction returned no image".to_string())
                        })?;
                    return Ok(GeneratedImage {
                        image_url,
                        asset_id: Some(prediction.id),
                    });
                }
                "failed" | "canceled" => {
                    return Err(GenerationError::classify(&error_text(&prediction)));
                }
                _ => {}
            }

            if Instant::now() >= deadline {
                return Err(GenerationError::Failed(format!(
                    "prediction {} did not finish in time",
                    prediction.id
                )));
            }
            let Some(get_url) = prediction.urls.as_ref().and_then(|u| u.get.clone()) else {
                return Err(GenerationError::Failed(
                    "prediction has no polling url".to_string(),
                ));
            };
            tokio::time::sleep(self.config.poll_interval).await;
            prediction = self.poll(&get_url).await?;
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::StatusCode as HttpStatus;
    use axum::routing::{get, post};
    use axum::{Json, Router};

    fn request(prompt: &str) -> GenerationRequest {
        GenerationRequest {
            prompt: prompt.to_string(),
            negative_prompt: None,
            aspect_ratio: "1:1".to_string(),
            output_format: "webp".to_string(),
        }
    }

    /// Fake Replicate: the prompt selects the scenario.
    async fn create_prediction(
        State(base): State<String>,
        Json(body): Json<Value>,
    ) -> (HttpStatus, Json<Value>) {
        let prompt = body
            .pointer("/input/prompt")
            .and_then(Value::as_str)
            .unwrap_or_default();
        match prompt {
            "throttle" => (
                HttpStatus::TOO_MANY_REQUESTS,
                Json(json!({ "detail": "Request was throttled." })),
            ),
            "nsfw" => (
                HttpStatus::CREATED,
                Json(json!({
                    "id": "p-nsfw",
                    "status": "failed",
                    "error": "NSFW content detected. Try running it again, or try a different prompt."
                })),
            ),
            "slow" => (
                HttpStatus::CREATED,
                Json(json!({
                    "id": "p-slow",
                    "status": "processing",
                    "urls": { "get": format!("{base}/v1/predictions/p-slow") }
                })),
            ),
            _ => (
                HttpStatus::CREATED,
                Json(json!({
                    "id": "p-fast",
                    "status": "succeeded",
                    "output": ["https://replicate.delivery/out-0.webp"]
                })),
            ),
        }
    }

    async fn get_prediction(Path(id): Path<String>) -> Json<Value> {
        Json(json!({
            "id": id,
            "status": "succeeded",
            "output": "https://replicate.delivery/slow.webp"
        }))
    }

    async fn spawn_fake() -> ReplicateGenerator {
        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind failed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("no local addr");
        };
        let base = format!("http://{addr}");
        let app = Router::new()
            .route("/v1/models/{owner}/{name}/predictions", post(create_prediction))
            .route("/v1/predictions/{id}", get(get_prediction))
            .with_state(base.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let Ok(generator) = ReplicateGenerator::new(ReplicateConfig {
            api_key: "test-token".to_string(),
            model: "black-forest-labs/flux-1-dev".to_string(),
            base_url: base,
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(10),
        }) else {
            panic!("client build failed");
        };
        generator
    }

    #[test]
    fn output_may_be_string_or_list() {
        assert_eq!(
            first_output_url(&json!("https://a/1.webp")).as_deref(),
            Some("https://a/1.webp")
        );
        assert_eq!(
            first_output_url(&json!(["https://a/2.webp", "https://a/3.webp"])).as_deref(),
            Some("https://a/2.webp")
        );
        assert_eq!(first_output_url(&json!({ "url": "x" })), None);
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = ReplicateConfig {
            api_key: "r8_secret".to_string(),
            model: "m/n".to_string(),
            base_url: "http://localhost".to_string(),
            timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(1),
        };
        assert!(!format!("{config:?}").contains("r8_secret"));
    }

    #[tokio::test]
    async fn immediate_success_returns_first_output() {
        let generator = spawn_fake().await;
        let Ok(image) = generator.generate(&request("a red fox in snow")).await else {
            panic!("generation should succeed");
        };
        assert_eq!(image.image_url, "https://replicate.delivery/out-0.webp");
        assert_eq!(image.asset_id.as_deref(), Some("p-fast"));
    }

    #[tokio::test]
    async fn processing_prediction_is_polled() {
        let generator = spawn_fake().await;
        let Ok(image) = generator.generate(&request("slow")).await else {
            panic!("polling should succeed");
        };
        assert_eq!(image.image_url, "https://replicate.delivery/slow.webp");
        assert_eq!(image.asset_id.as_deref(), Some("p-slow"));
    }

    #[tokio::test]
    async fn http_429_is_rate_limited() {
        let generator = spawn_fake().await;
        let result = generator.generate(&request("throttle")).await;
        assert_eq!(result, Err(GenerationError::RateLimited));
    }

    #[tokio::test]
    async fn failed_nsfw_prediction_is_content_policy() {
        let generator = spawn_fake().await;
        let result = generator.generate(&request("nsfw")).await;
        assert!(matches!(result, Err(GenerationError::ContentPolicy(_))));
    }
}
