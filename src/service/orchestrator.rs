//! Charge, generate, record: one paid image generation end to end.

use std::sync::Arc;

use uuid::Uuid;

use crate::config::LedgerRules;
use crate::domain::{Generation, NewGeneration, UserId};
use crate::error::GatewayError;
use crate::generator::{GenerationRequest, ImageGenerator};

use super::LedgerService;

/// Outcome of a successful [`GenerationOrchestrator::generate`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReceipt {
    /// The recorded generation.
    pub generation: Generation,
    /// Balance after the charge.
    pub balance: i64,
}

/// Drives one paid generation against the ledger.
///
/// The cost is deducted before the provider is called, so two concurrent
/// requests cannot both spend the last credit. If the provider fails, the
/// charge is refunded under the request's id; the refund is idempotent.
#[derive(Debug, Clone)]
pub struct GenerationOrchestrator {
    ledger: Arc<LedgerService>,
    generator: Arc<dyn ImageGenerator>,
    rules: LedgerRules,
}

impl GenerationOrchestrator {
    /// Creates a new orchestrator.
    #[must_use]
    pub fn new(
        ledger: Arc<LedgerService>,
        generator: Arc<dyn ImageGenerator>,
        rules: LedgerRules,
    ) -> Self {
        Self {
            ledger,
            generator,
            rules,
        }
    }

    /// Pricing and prompt rules in effect.
    #[must_use]
    pub fn rules(&self) -> &LedgerRules {
        &self.rules
    }

    /// Generates one image for `user_id` and charges `generation_cost`
    /// credits for it.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidRequest`] if the prompt is too short or too
    ///   long (nothing is charged).
    /// - [`GatewayError::InsufficientBalance`] if the balance does not
    ///   cover the cost (nothing is charged).
    /// - [`GatewayError::Generation`] if the provider failed; the charge
    ///   has been refunded.
    /// - [`GatewayError::PersistenceError`] on store failure.
    pub async fn generate(
        &self,
        user_id: UserId,
        prompt: &str,
        negative_prompt: Option<&str>,
    ) -> Result<GenerationReceipt, GatewayError> {
        let prompt = self.validate_prompt(prompt)?;
        let negative_prompt = negative_prompt
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        let cost = self.rules.generation_cost;

        let balance = self.ledger.get_balance(user_id).await?;
        if balance < cost {
            return Err(GatewayError::InsufficientBalance {
                balance,
                required: cost,
            });
        }

        // Lost a race against a concurrent request since the check above.
        if !self.ledger.deduct_credits(user_id, cost).await? {
            let balance = self.ledger.get_balance(user_id).await?;
            return Err(GatewayError::InsufficientBalance {
                balance,
                required: cost,
            });
        }

        let request_id = Uuid::new_v4();
        let request = GenerationRequest {
            prompt: prompt.clone(),
            negative_prompt: negative_prompt.clone(),
            aspect_ratio: self.rules.aspect_ratio.clone(),
            output_format: self.rules.output_format.clone(),
        };
        tracing::info!(%user_id, %request_id, cost, "generation started");

        let image = match self.generator.generate(&request).await {
            Ok(image) => image,
            Err(err) => {
                tracing::warn!(%user_id, %request_id, error = %err, "generation failed, refunding");
                if let Err(refund_err) = self
                    .ledger
                    .refund_credits(user_id, cost, request_id)
                    .await
                {
                    tracing::error!(
                        %user_id,
                        %request_id,
                        cost,
                        error = %refund_err,
                        "refund failed"
                    );
                }
                return Err(err.into());
            }
        };

        let generation = self
            .ledger
            .record_generation(NewGeneration {
                user_id,
                request_id: Some(request_id),
                prompt,
                negative_prompt,
                image_url: image.image_url,
                asset_id: image.asset_id,
                cost,
            })
            .await
            .inspect_err(|err| {
                tracing::error!(%user_id, %request_id, error = %err, "generation not recorded");
            })?
            .ok_or_else(|| {
                GatewayError::Internal(format!("account {user_id} vanished during generation"))
            })?;

        let balance = self.ledger.get_balance(user_id).await?;
        tracing::info!(%user_id, %request_id, generation_id = generation.id, balance, "generation recorded");
        Ok(GenerationReceipt {
            generation,
            balance,
        })
    }

    fn validate_prompt(&self, prompt: &str) -> Result<String, GatewayError> {
        let prompt = prompt.trim();
        let len = prompt.chars().count();
        if len < self.rules.min_prompt_len {
            return Err(GatewayError::InvalidRequest(format!(
                "prompt must be at least {} characters",
                self.rules.min_prompt_len
            )));
        }
        if len > self.rules.max_prompt_len {
            return Err(GatewayError::InvalidRequest(format!(
                "prompt must be at most {} characters",
                self.rules.max_prompt_len
            )));
        }
        Ok(prompt.to_string())
    }
}
