// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Oracle abstraction.
//!
//! Generator, Executor and Critic are usage patterns over a single
//! text-completion capability. The core only distinguishes two coarse model
//! tiers; mapping a tier to a concrete model belongs to the implementation.
//!
//! # Examples
//!
//! ```
//! use promptloop::oracle::{MockOracle, Oracle, CompletionRequest, ModelTier};
//!
//! let oracle = MockOracle::new(|req| format!("echo: {}", req.last_user().unwrap_or("")));
//! # let _ = oracle;
//! ```

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Coarse model selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// Cheap model used for execution and error analysis
    Fast,
    /// Capable model used for rewrites and judging
    Strong,
}

/// Chat role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// User turn
    User,
    /// Assistant turn (a trailing one is a prefill)
    Assistant,
}

/// Message in a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message<'a> {
    /// Speaker
    pub role: Role,
    /// Text
    #[serde(borrow)]
    pub content: Cow<'a, str>,
}

impl<'a> Message<'a> {
    /// Create a system message
    pub fn system(content: impl Into<Cow<'a, str>>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<Cow<'a, str>>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<Cow<'a, str>>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Request to the oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest<'a> {
    /// Model tier
    pub tier: ModelTier,
    /// Ordered conversation
    #[serde(borrow)]
    pub messages: Vec<Message<'a>>,
    /// Completion budget
    pub max_tokens: u32,
    /// Sampling temperature; `None` uses the oracle's default
    pub temperature: Option<f32>,
    /// Stop sequences
    pub stop: Vec<Cow<'a, str>>,
}

impl<'a> CompletionRequest<'a> {
    /// Create a request with a single user message.
    pub fn new(tier: ModelTier, prompt: impl Into<Cow<'a, str>>) -> Self {
        Self {
            tier,
            messages: vec![Message::user(prompt)],
            max_tokens: 4096,
            temperature: None,
            stop: Vec::new(),
        }
    }

    /// Append a message.
    pub fn add_message(mut self, message: Message<'a>) -> Self {
        self.messages.push(message);
        self
    }

    /// Set the completion budget.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Add a stop sequence.
    pub fn with_stop(mut self, stop: impl Into<Cow<'a, str>>) -> Self {
        self.stop.push(stop.into());
        self
    }

    /// Content of the last user message.
    pub fn last_user(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_ref())
    }

    /// Content of a trailing assistant prefill, if any.
    pub fn prefill(&self) -> Option<&str> {
        self.messages
            .last()
            .filter(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_ref())
    }
}

/// Text-completion capability.
///
/// Implementations report rate limits and timeouts as
/// [`Error::Transient`] and malformed responses as [`Error::Protocol`].
/// Nothing in this crate retries.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Produce a single completion.
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String>;

    /// Name used in logs.
    fn name(&self) -> &str {
        "unknown"
    }
}

#[async_trait]
impl<O: Oracle + ?Sized> Oracle for &O {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String> {
        (**self).complete(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<O: Oracle + ?Sized> Oracle for std::sync::Arc<O> {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String> {
        (**self).complete(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Mock oracle driven by a closure.
///
/// Counts calls and remembers the tier of every request, which makes it
/// handy for asserting role routing in tests.
pub struct MockOracle<F>
where
    F: Fn(&CompletionRequest<'_>) -> String + Send + Sync,
{
    responder: F,
    calls: AtomicU32,
    tiers: Mutex<Vec<ModelTier>>,
}

impl<F> MockOracle<F>
where
    F: Fn(&CompletionRequest<'_>) -> String + Send + Sync,
{
    /// Create a mock oracle.
    pub fn new(responder: F) -> Self {
        Self {
            responder,
            calls: AtomicU32::new(0),
            tiers: Mutex::new(Vec::new()),
        }
    }

    /// Number of completions served.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Tiers requested so far, in call order.
    pub fn tiers(&self) -> Vec<ModelTier> {
        self.tiers.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl<F> Oracle for MockOracle<F>
where
    F: Fn(&CompletionRequest<'_>) -> String + Send + Sync,
{
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut tiers) = self.tiers.lock() {
            tiers.push(request.tier);
        }
        Ok((self.responder)(&request))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Oracle that always fails.
#[derive(Debug, Clone)]
pub struct FailingOracle {
    message: String,
    transient: bool,
}

impl FailingOracle {
    /// Fail with a non-retryable oracle error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: false,
        }
    }

    /// Fail with a transient error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: true,
        }
    }
}

#[async_trait]
impl Oracle for FailingOracle {
    async fn complete(&self, _request: CompletionRequest<'_>) -> Result<String> {
        if self.transient {
            Err(Error::transient(&self.message))
        } else {
            Err(Error::oracle(&self.message))
        }
    }

    fn name(&self) -> &str {
        "failing"
    }
}
