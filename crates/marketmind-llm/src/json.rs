//! Tolerant JSON extraction from model output
//!
//! Models asked for "JSON only" still wrap answers in code fences or add a
//! sentence before the object. Extraction strips a fenced block when present
//! and then keeps the span from the first `{` to the last `}`.

use crate::{LLMError, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:json|JSON)?\s*([\s\S]*?)\s*```").expect("code fence pattern is valid")
});

/// Locate the JSON object inside a completion
pub fn extract_json(text: &str) -> Option<&str> {
    let body = CODE_FENCE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or(text, |m| m.as_str());

    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (start < end).then(|| &body[start..=end])
}

/// Extract and deserialize the JSON object inside a completion
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    let json = extract_json(text).ok_or_else(|| {
        LLMError::UnexpectedResponse("completion did not contain a JSON object".to_string())
    })?;
    Ok(serde_json::from_str(json)?)
}
