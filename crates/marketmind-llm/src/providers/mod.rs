//! LLM provider implementations

pub mod openai;
pub mod scripted;

pub use openai::{OpenAIConfig, OpenAIProvider};
pub use scripted::ScriptedProvider;
