//! Scripted provider returning canned completions
//!
//! Responses are routed by a substring of the system prompt (falling back to
//! the user prompt), so each analysis stage can be given its own reply. Used
//! for offline runs and for exercising the pipeline in tests.

use crate::{
    CompletionRequest, CompletionResponse, LLMError, LLMProvider, Message, Result, StopReason,
    TokenUsage,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    RateLimited,
    Fail(String),
}

#[derive(Debug, Clone)]
struct Route {
    needle: String,
    reply: Reply,
    delay: Duration,
}

/// Provider that answers from a fixed script
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    routes: Vec<Route>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    /// Create a provider with no routes; every call fails
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `response` when a prompt contains `needle`
    pub fn route(self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.push(needle, Reply::Text(response.into()), Duration::ZERO)
    }

    /// Like [`route`](Self::route) but sleeps for `delay` before replying
    pub fn route_with_delay(
        self,
        needle: impl Into<String>,
        response: impl Into<String>,
        delay: Duration,
    ) -> Self {
        self.push(needle, Reply::Text(response.into()), delay)
    }

    /// Fail with a provider error when a prompt contains `needle`
    pub fn fail_route(self, needle: impl Into<String>, message: impl Into<String>) -> Self {
        self.push(needle, Reply::Fail(message.into()), Duration::ZERO)
    }

    /// Answer with a rate-limit error when a prompt contains `needle`
    pub fn rate_limited_route(self, needle: impl Into<String>) -> Self {
        self.push(needle, Reply::RateLimited, Duration::ZERO)
    }

    /// Number of completions requested so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn push(mut self, needle: impl Into<String>, reply: Reply, delay: Duration) -> Self {
        self.routes.push(Route {
            needle: needle.into(),
            reply,
            delay,
        });
        self
    }

    fn find(&self, request: &CompletionRequest) -> Option<&Route> {
        let system = request.system.as_deref().unwrap_or_default();
        let user = request.user_text().unwrap_or_default();
        self.routes
            .iter()
            .find(|r| system.contains(&r.needle))
            .or_else(|| self.routes.iter().find(|r| user.contains(&r.needle)))
    }
}

/// Rough token estimate, four characters per token
fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let route = self.find(&request).ok_or_else(|| {
            LLMError::ProviderError("no scripted response matches this prompt".to_string())
        })?;

        if !route.delay.is_zero() {
            tokio::time::sleep(route.delay).await;
        }

        match &route.reply {
            Reply::Text(text) => {
                let prompt_len = request.system.as_deref().map_or(0, estimate_tokens)
                    + request.user_text().map_or(0, estimate_tokens);
                Ok(CompletionResponse {
                    message: Message::assistant(text.clone()),
                    stop_reason: StopReason::EndTurn,
                    usage: TokenUsage {
                        input_tokens: prompt_len,
                        output_tokens: estimate_tokens(text),
                    },
                })
            }
            Reply::RateLimited => Err(LLMError::RateLimitExceeded(
                "scripted rate limit".to_string(),
            )),
            Reply::Fail(message) => Err(LLMError::ProviderError(message.clone())),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(system: &str, user: &str) -> CompletionRequest {
        CompletionRequest::builder("test-model")
            .system(system)
            .add_message(Message::user(user))
            .build()
    }

    #[tokio::test]
    async fn test_routes_by_system_prompt() {
        let provider = ScriptedProvider::new()
            .route("technical", r#"{"trend": "bullish"}"#)
            .route("sentiment", r#"{"overallSentiment": "neutral"}"#);

        let response = provider
            .complete(request("You are a sentiment expert", "AAPL"))
            .await
            .unwrap();
        assert!(response.message.text().contains("neutral"));
        assert!(response.usage.input_tokens > 0);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_unmatched_prompt_fails() {
        let provider = ScriptedProvider::new();
        let err = provider.complete(request("anything", "AAPL")).await.unwrap_err();
        assert!(matches!(err, LLMError::ProviderError(_)));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_failure_routes() {
        let provider = ScriptedProvider::new()
            .rate_limited_route("busy")
            .fail_route("broken", "upstream exploded");

        let err = provider.complete(request("busy", "")).await.unwrap_err();
        assert!(err.is_rate_limit());

        let err = provider.complete(request("broken", "")).await.unwrap_err();
        assert!(err.to_string().contains("upstream exploded"));
    }
}
