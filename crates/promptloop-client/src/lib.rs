// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! HTTP oracle for Promptloop
//!
//! [`LMClient`] implements [`promptloop::Oracle`] over any
//! OpenAI-compatible `/chat/completions` endpoint, mapping
//! [`ModelTier`](promptloop::ModelTier) to concrete model names.

#![warn(missing_docs)]

pub mod lm;
pub mod pool;
pub mod provider;
pub mod request;
pub mod response;

pub use lm::{LMClient, LMConfig, DEFAULT_FAST_MODEL, DEFAULT_STRONG_MODEL};
pub use pool::LMPool;
pub use provider::{OpenAIProvider, Provider, ProviderError, ProviderType};
pub use request::ChatRequest;
pub use response::{LMResponse, Usage};
