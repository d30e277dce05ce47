//! LLM provider trait definition

use crate::{CompletionRequest, CompletionResponse, Result};
use async_trait::async_trait;

/// Trait for LLM providers
///
/// Implementations give access to a chat-completion service. The analysis
/// pipeline never talks to a provider directly; calls go through
/// [`ReasoningClient`](crate::ReasoningClient) so admission control and usage
/// accounting apply uniformly.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion from the LLM
    ///
    /// # Arguments
    ///
    /// * `request` - The completion request with system prompt, messages, and parameters
    ///
    /// # Returns
    ///
    /// The completion response with the assistant's message and token usage
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Get the provider name (e.g., "openrouter", "scripted")
    fn name(&self) -> &str;
}
