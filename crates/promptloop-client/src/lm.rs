// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Oracle implementation over an HTTP provider

use crate::pool::LMPool;
use crate::provider::{OpenAIProvider, Provider};
use crate::request::ChatRequest;
use anyhow::Context;
use async_trait::async_trait;
use promptloop::oracle::{CompletionRequest, ModelTier, Oracle};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, Instrument};

/// Default fast-tier model
pub const DEFAULT_FAST_MODEL: &str = "claude-3-haiku-20240307";

/// Default strong-tier model
pub const DEFAULT_STRONG_MODEL: &str = "anthropic.claude-3-sonnet-20240229-v1:0";

/// Configuration for [`LMClient`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LMConfig {
    /// Model used for [`ModelTier::Fast`]
    pub fast_model: String,

    /// Model used for [`ModelTier::Strong`]
    pub strong_model: String,

    /// Temperature applied when a request does not pin one
    pub temperature: Option<f32>,

    /// Upper bound on `max_tokens`; requests asking for more are clamped
    pub max_tokens: u32,

    /// Concurrent calls allowed through this client
    pub max_concurrent: usize,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LMConfig {
    fn default() -> Self {
        Self {
            fast_model: DEFAULT_FAST_MODEL.to_string(),
            strong_model: DEFAULT_STRONG_MODEL.to_string(),
            temperature: None,
            max_tokens: 4096,
            max_concurrent: 4,
            timeout_secs: 120,
        }
    }
}

impl LMConfig {
    /// Concrete model for a tier
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.fast_model,
            ModelTier::Strong => &self.strong_model,
        }
    }

    /// Set default temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set concurrency limit
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Apply model overrides from `PROMPTLOOP_FAST_MODEL` and
    /// `PROMPTLOOP_STRONG_MODEL`.
    pub fn with_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(model) = lookup("PROMPTLOOP_FAST_MODEL").filter(|m| !m.is_empty()) {
            self.fast_model = model;
        }
        if let Some(model) = lookup("PROMPTLOOP_STRONG_MODEL").filter(|m| !m.is_empty()) {
            self.strong_model = model;
        }
        self
    }
}

/// Oracle backed by a chat-completions [`Provider`].
pub struct LMClient {
    config: LMConfig,
    provider: Box<dyn Provider>,
    pool: LMPool,
}

impl LMClient {
    /// Create a new client
    pub fn new(config: LMConfig, provider: Box<dyn Provider>) -> Self {
        let pool = LMPool::new(config.max_concurrent);
        Self {
            config,
            provider,
            pool,
        }
    }

    /// Build an OpenAI-compatible client from the process environment.
    pub fn from_env(config: LMConfig) -> anyhow::Result<Self> {
        Self::from_vars(config, |key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    ///
    /// `OPENAI_API_KEY` is required; `OPENAI_API_BASE` replaces the default
    /// endpoint.
    pub fn from_vars(
        config: LMConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|k| !k.is_empty())
            .context("OPENAI_API_KEY is not set")?;
        let mut provider =
            OpenAIProvider::new(api_key, Duration::from_secs(config.timeout_secs))?;
        if let Some(base) = lookup("OPENAI_API_BASE").filter(|b| !b.is_empty()) {
            provider = provider.with_base_url(base);
        }
        let config = config.with_vars(&lookup);
        Ok(Self::new(config, Box::new(provider)))
    }

    /// Get configuration
    pub fn config(&self) -> &LMConfig {
        &self.config
    }
}

#[async_trait]
impl Oracle for LMClient {
    async fn complete(&self, request: CompletionRequest<'_>) -> promptloop::Result<String> {
        let model = self.config.model_for(request.tier);
        let span = tracing::info_span!(
            "llm_call",
            provider = ?self.provider.provider_type(),
            model = model,
            tier = ?request.tier,
        );

        async {
            let _permit = self
                .pool
                .acquire()
                .await
                .map_err(|e| promptloop::Error::oracle(e.to_string()))?;

            let mut body =
                ChatRequest::from_completion(&request, model, self.config.temperature);
            body.max_tokens = body.max_tokens.min(self.config.max_tokens);

            let response = self.provider.complete(&body).await.map_err(|e| {
                debug!(error = %e, transient = e.is_transient(), "completion failed");
                promptloop::Error::from(e)
            })?;

            if let Some(usage) = response.usage {
                info!(
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "completion done"
                );
            }
            Ok::<_, promptloop::Error>(response.text)
        }
        .instrument(span)
        .await
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }
}
