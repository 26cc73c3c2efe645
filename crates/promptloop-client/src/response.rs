// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Chat-completions response types

use serde::{Deserialize, Serialize};

/// Completion returned by a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LMResponse {
    /// Generated text
    pub text: String,

    /// Token usage
    pub usage: Option<Usage>,

    /// Model that generated the response
    pub model: String,

    /// Finish reason
    pub finish_reason: Option<String>,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt tokens
    pub prompt_tokens: u32,

    /// Completion tokens
    pub completion_tokens: u32,

    /// Total tokens
    pub total_tokens: u32,
}

impl Usage {
    /// Create new usage stats
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

impl LMResponse {
    /// Create a new response
    pub fn new(text: String, model: String) -> Self {
        Self {
            text,
            usage: None,
            model,
            finish_reason: None,
        }
    }

    /// Add usage stats
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Set finish reason
    pub fn with_finish_reason(mut self, reason: String) -> Self {
        self.finish_reason = Some(reason);
        self
    }
}

/// Raw `/chat/completions` body.
#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    pub choices: Vec<Choice>,
    pub usage: Option<WireUsage>,
    #[serde(default)]
    pub model: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: ChoiceMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChoiceMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ChatResponse {
    /// First choice as an [`LMResponse`], or `None` when the body has no
    /// usable choice.
    pub(crate) fn into_response(self, requested_model: &str) -> Option<LMResponse> {
        let choice = self.choices.into_iter().next()?;
        let text = choice.message.content?;
        let model = if self.model.is_empty() {
            requested_model.to_string()
        } else {
            self.model
        };

        let mut response = LMResponse::new(text, model);
        if let Some(usage) = self.usage {
            response = response.with_usage(Usage::new(usage.prompt_tokens, usage.completion_tokens));
        }
        if let Some(reason) = choice.finish_reason {
            response = response.with_finish_reason(reason);
        }
        Some(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_new() {
        let usage = Usage::new(100, 50);
        assert_eq!(usage.total_tokens, 150);
    }

    #[test]
    fn test_parse_full_body() {
        let body = r#"{
            "id": "x",
            "model": "served-model",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "A"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 1, "total_tokens": 13}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        let resp = parsed.into_response("requested").unwrap();
        assert_eq!(resp.text, "A");
        assert_eq!(resp.model, "served-model");
        assert_eq!(resp.usage, Some(Usage::new(12, 1)));
        assert_eq!(resp.finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn test_parse_minimal_body() {
        let body = r#"{"choices": [{"message": {"content": "B"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        let resp = parsed.into_response("requested").unwrap();
        assert_eq!(resp.model, "requested");
        assert!(resp.usage.is_none());
    }

    #[test]
    fn test_unusable_bodies() {
        let empty: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(empty.into_response("m").is_none());

        let null: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap();
        assert!(null.into_response("m").is_none());
    }
}
