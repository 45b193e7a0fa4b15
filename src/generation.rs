//! Text-generation collaborator seam
//!
//! The summarizer talks to an external model provider through the
//! [`TextGenerator`] trait: a named capability plus a parameter bag, answered
//! as a stream of text fragments. No output schema is enforced here; the
//! summarizer owns defensive parsing.

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Capability name for commit-range analysis
pub const COMMIT_ANALYSIS: &str = "commit-analysis";

/// A stream of text fragments produced by a generation call
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Parameter bag for a generation call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationArgs {
    /// Repository README text, possibly empty
    pub readme: String,
    /// Remote repository address
    pub git_repository: String,
    /// Formatted commit payload
    pub commit_message: String,
    /// Branch the commits were taken from
    pub git_branch: String,
}

/// External text-generation collaborator
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Invoke a named capability, streaming the response fragments
    async fn generate(&self, capability: &str, args: GenerationArgs) -> Result<FragmentStream>;
}

/// A chat-completion request as sent to the model provider
///
/// Typed with optional fields so provider-specific rewrites are explicit
/// field-presence checks rather than dynamic JSON mutation. Unknown fields
/// pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_thinking: Option<bool>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Normalize a chat request for providers with older parameter names
///
/// Rewrites `max_completion_tokens` to `max_tokens`, and disables the
/// thinking mode for `qwen3`-family models, which otherwise interleave
/// reasoning text with the answer and break downstream parsing.
pub fn shape_request(mut request: ChatRequest) -> ChatRequest {
    if let Some(max) = request.max_completion_tokens.take() {
        request.max_tokens = Some(max);
    }

    let is_qwen3 = request
        .model
        .as_deref()
        .is_some_and(|model| model.to_ascii_lowercase().starts_with("qwen3"));
    if is_qwen3 {
        request.enable_thinking = Some(false);
    }

    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request_from(value: serde_json::Value) -> ChatRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_shape_renames_max_completion_tokens() {
        let shaped = shape_request(request_from(json!({
            "model": "gpt-4o",
            "max_completion_tokens": 2048
        })));

        assert_eq!(shaped.max_tokens, Some(2048));
        assert_eq!(shaped.max_completion_tokens, None);
        assert_eq!(shaped.enable_thinking, None);
    }

    #[test]
    fn test_shape_disables_thinking_for_qwen3() {
        let shaped = shape_request(request_from(json!({
            "model": "Qwen3-32B"
        })));

        assert_eq!(shaped.enable_thinking, Some(false));
    }

    #[test]
    fn test_shape_qwen3_prefix_is_case_insensitive() {
        let shaped = shape_request(request_from(json!({
            "model": "QWEN3-coder",
            "max_completion_tokens": 100
        })));

        assert_eq!(shaped.enable_thinking, Some(false));
        assert_eq!(shaped.max_tokens, Some(100));
    }

    #[test]
    fn test_shape_leaves_other_models_alone() {
        let shaped = shape_request(request_from(json!({
            "model": "qwen2.5-7b",
            "max_tokens": 512
        })));

        assert_eq!(shaped.enable_thinking, None);
        assert_eq!(shaped.max_tokens, Some(512));
    }

    #[test]
    fn test_shape_preserves_unknown_fields() {
        let shaped = shape_request(request_from(json!({
            "model": "qwen3-8b",
            "max_completion_tokens": 64,
            "temperature": 0.2,
            "messages": [{"role": "user", "content": "hi"}]
        })));

        let out = serde_json::to_value(&shaped).unwrap();
        assert_eq!(out["max_tokens"], json!(64));
        assert_eq!(out.get("max_completion_tokens"), None);
        assert_eq!(out["enable_thinking"], json!(false));
        assert_eq!(out["temperature"], json!(0.2));
        assert_eq!(out["messages"][0]["content"], json!("hi"));
    }

    #[test]
    fn test_shape_without_model_is_identity() {
        let original = request_from(json!({"max_tokens": 10}));
        let shaped = shape_request(original.clone());
        assert_eq!(shaped, original);
    }
}
