// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Provider abstraction for chat-completion backends

use crate::request::ChatRequest;
use crate::response::{ChatResponse, LMResponse};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Type of provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderType {
    /// OpenAI or any compatible endpoint
    OpenAI,
    /// Custom provider
    Custom,
}

/// Provider failures, classified for the core error taxonomy.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// HTTP 429
    #[error("rate limited (HTTP {status}): {body}")]
    RateLimited {
        /// Status code
        status: u16,
        /// Response body
        body: String,
    },

    /// HTTP 5xx
    #[error("server error (HTTP {status}): {body}")]
    Server {
        /// Status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Any other non-success status
    #[error("request rejected (HTTP {status}): {body}")]
    Rejected {
        /// Status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Request timed out
    #[error("request timed out")]
    Timeout,

    /// Connection-level failure
    #[error("network error: {0}")]
    Network(String),

    /// Body could not be decoded or held no completion
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Classify a non-success status.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        let code = status.as_u16();
        if status == StatusCode::TOO_MANY_REQUESTS {
            Self::RateLimited { status: code, body }
        } else if status.is_server_error() {
            Self::Server { status: code, body }
        } else {
            Self::Rejected { status: code, body }
        }
    }

    /// Whether a caller-side retry could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Server { .. } | Self::Timeout | Self::Network(_)
        )
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<ProviderError> for promptloop::Error {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Malformed(msg) => promptloop::Error::protocol("completion", msg),
            other if other.is_transient() => promptloop::Error::transient(other.to_string()),
            other => promptloop::Error::oracle(other.to_string()),
        }
    }
}

/// Provider trait for completion backends
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send one chat-completions request
    async fn complete(&self, request: &ChatRequest<'_, '_>) -> Result<LMResponse, ProviderError>;

    /// Get provider type
    fn provider_type(&self) -> ProviderType;
}

/// OpenAI-compatible provider
pub struct OpenAIProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAIProvider {
    /// Default endpoint
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";

    /// Create a provider with a request timeout
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            client,
        })
    }

    /// Use a custom base URL (trailing slashes are ignored)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Completions endpoint URL
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    async fn complete(&self, request: &ChatRequest<'_, '_>) -> Result<LMResponse, ProviderError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, body));
        }

        let body = response.text().await?;
        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))?;
        parsed
            .into_response(request.model)
            .ok_or_else(|| ProviderError::Malformed("no completion in response".to_string()))
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenAI
    }
}
