//! Reasoning provider layer for marketmind
//!
//! This crate wraps the language-model services the analysis stages consult.
//! It includes:
//!
//! - Message and completion request/response types
//! - The provider trait plus an OpenAI-compatible chat provider (OpenRouter by
//!   default) and a scripted provider for offline runs
//! - An admission-control queue guarding the provider (single in-flight
//!   request, bounded depth, minimum spacing, rate-limit cooldown)
//! - A per-run usage ledger for token and cost accounting
//! - Tolerant extraction of JSON objects from free-form completions

pub mod completion;
pub mod error;
pub mod json;
pub mod messages;
pub mod provider;
pub mod providers;
pub mod queue;
pub mod reasoning;
pub mod usage;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use json::{extract_json, parse_json};
pub use messages::{Message, Role};
pub use provider::LLMProvider;
pub use providers::{OpenAIConfig, OpenAIProvider, ScriptedProvider};
pub use queue::{AdmissionQueue, QueueConfig, Ticket};
pub use reasoning::{ReasoningClient, ReasoningConfig};
pub use usage::{ModelPricing, UsageLedger, UsageSummary};
