//! Reasoning client used by the analysis stages

use crate::{
    AdmissionQueue, CompletionRequest, LLMProvider, Message, ModelPricing, QueueConfig, Result,
    UsageLedger,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const DEFAULT_MODEL: &str = "google/gemini-2.0-flash-exp:free";
const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Model and admission settings for reasoning calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    /// Model identifier passed to the provider
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Pricing used for cost estimates
    pub pricing: ModelPricing,

    /// Admission queue and retry tuning
    pub queue: QueueConfig,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            pricing: ModelPricing::default(),
            queue: QueueConfig::default(),
        }
    }
}

impl ReasoningConfig {
    /// Load from environment (`OPENROUTER_DEFAULT_MODEL` plus queue overrides)
    pub fn from_env() -> Self {
        Self {
            model: std::env::var("OPENROUTER_DEFAULT_MODEL")
                .ok()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            queue: QueueConfig::from_env(),
            ..Self::default()
        }
    }

    /// Set the model identifier
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the pricing table
    pub fn with_pricing(mut self, pricing: ModelPricing) -> Self {
        self.pricing = pricing;
        self
    }

    /// Set the queue configuration
    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }
}

/// Sends prompts to a provider through the admission queue
///
/// One client is shared by every stage of every run, so the queue bounds
/// all outstanding reasoning calls in the process.
pub struct ReasoningClient {
    provider: Arc<dyn LLMProvider>,
    config: ReasoningConfig,
    queue: AdmissionQueue,
}

impl ReasoningClient {
    /// Create a client for a provider
    pub fn new(provider: Arc<dyn LLMProvider>, config: ReasoningConfig) -> Self {
        let queue = AdmissionQueue::new(&config.queue);
        Self {
            provider,
            config,
            queue,
        }
    }

    /// Name of the underlying provider
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Current configuration
    pub fn config(&self) -> &ReasoningConfig {
        &self.config
    }

    /// Send a system/user prompt pair and return the completion text
    ///
    /// Rate-limit responses are retried up to `queue.max_retries` times,
    /// sleeping `retry_base_delay * attempt + rate_limit_cooldown` between
    /// attempts. The queue ticket is released while sleeping. Successful
    /// completions are recorded in `ledger`.
    #[instrument(skip(self, system, user, ledger), fields(provider = %self.provider.name(), model = %self.config.model))]
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: usize,
        ledger: &UsageLedger,
    ) -> Result<String> {
        let mut attempt = 0;
        loop {
            let result = {
                let _ticket = self.queue.admit().await?;
                let request = CompletionRequest::builder(&self.config.model)
                    .system(system)
                    .add_message(Message::user(user))
                    .max_tokens(max_tokens)
                    .temperature(self.config.temperature)
                    .build();
                self.provider.complete(request).await
            };

            match result {
                Ok(response) => {
                    ledger.record(&response.usage, &self.config.pricing);
                    debug!(tokens = response.usage.total(), "reasoning call completed");
                    return Ok(response.message.content);
                }
                Err(err) if err.is_rate_limit() && attempt < self.config.queue.max_retries => {
                    attempt += 1;
                    let delay = self.config.queue.retry_delay(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "reasoning provider rate limited, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
