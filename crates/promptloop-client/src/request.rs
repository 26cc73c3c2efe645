// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Chat-completions request body

use promptloop::oracle::{CompletionRequest, Message};
use serde::Serialize;
use std::borrow::Cow;

/// Wire body for an OpenAI-compatible `/chat/completions` call.
///
/// Borrows the messages and stop sequences of the [`CompletionRequest`] it
/// was built from.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'r, 'a> {
    /// Concrete model identifier
    pub model: &'r str,

    /// Conversation, including any assistant prefill
    pub messages: &'r [Message<'a>],

    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Completion budget
    pub max_tokens: u32,

    /// Stop sequences
    #[serde(skip_serializing_if = "no_stops")]
    pub stop: &'r [Cow<'a, str>],
}

fn no_stops(stop: &&[Cow<'_, str>]) -> bool {
    stop.is_empty()
}

impl<'r, 'a> ChatRequest<'r, 'a> {
    /// Build the body for `model`, falling back to `default_temperature`
    /// when the request does not pin one.
    pub fn from_completion(
        request: &'r CompletionRequest<'a>,
        model: &'r str,
        default_temperature: Option<f32>,
    ) -> Self {
        Self {
            model,
            messages: &request.messages,
            temperature: request.temperature.or(default_temperature),
            max_tokens: request.max_tokens,
            stop: &request.stop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptloop::oracle::ModelTier;

    #[test]
    fn test_body_with_prefill_and_stop() {
        let req = CompletionRequest::new(ModelTier::Strong, "rewrite")
            .add_message(Message::assistant("<Inputs>"))
            .with_max_tokens(1000)
            .with_temperature(0.8)
            .with_stop("\n\nHuman:");
        let body = ChatRequest::from_completion(&req, "strong-model", Some(0.2));
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["model"], "strong-model");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][1]["role"], "assistant");
        assert_eq!(json["messages"][1]["content"], "<Inputs>");
        assert_eq!(json["max_tokens"], 1000);
        assert_eq!(json["stop"][0], "\n\nHuman:");
        assert!((json["temperature"].as_f64().unwrap() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_body_defaults() {
        let req = CompletionRequest::new(ModelTier::Fast, "run");
        let json = serde_json::to_value(ChatRequest::from_completion(&req, "fast", None)).unwrap();
        assert!(json.get("temperature").is_none());
        assert!(json.get("stop").is_none());
        assert_eq!(json["max_tokens"], 4096);

        let json =
            serde_json::to_value(ChatRequest::from_completion(&req, "fast", Some(0.0))).unwrap();
        assert_eq!(json["temperature"], 0.0);
    }
}
