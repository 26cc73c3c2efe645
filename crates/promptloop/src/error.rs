// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Error types for promptloop

use thiserror::Error;

/// Result type alias for promptloop operations
pub type Result<T> = core::result::Result<T, Error>;

/// Main error type for promptloop.
///
/// Every failure propagates to the caller of the optimization loop; nothing
/// inside a round is swallowed and retried.
#[derive(Error, Debug)]
pub enum Error {
    /// A required tag was absent or malformed in an oracle response.
    #[error("Protocol error for <{tag}>: {message}")]
    Protocol {
        /// Tag that was expected
        tag: String,
        /// What went wrong
        message: String,
    },

    /// Rate limit, timeout or network failure reaching the oracle.
    ///
    /// Retrying is the caller's decision.
    #[error("Transient oracle error: {0}")]
    Transient(String),

    /// Any other oracle-side failure
    #[error("Oracle error: {0}")]
    Oracle(String),

    /// Every generated candidate failed placeholder validation
    #[error("No candidate preserved the seed prompt's placeholders")]
    EmptyCandidateSet,

    /// A rater picked an index outside the candidate set
    #[error("Rater selected candidate {index} but only {len} exist")]
    InvalidSelection {
        /// Index returned by the rater
        index: usize,
        /// Number of candidates offered
        len: usize,
    },

    /// Dataset shape errors (missing label column, ragged rows)
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Unknown or failing post-processing function
    #[error("Postprocess error: {0}")]
    Postprocess(String),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a protocol error for a tag
    pub fn protocol(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Protocol {
            tag: tag.into(),
            message: message.into(),
        }
    }

    /// Create a protocol error for a required tag that was not found
    pub fn tag_not_found(tag: impl Into<String>) -> Self {
        Self::protocol(tag, "not found in oracle response")
    }

    /// Create a transient error
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    /// Create an oracle error
    pub fn oracle(msg: impl Into<String>) -> Self {
        Self::Oracle(msg.into())
    }

    /// Create a dataset error
    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    /// Create a postprocess error
    pub fn postprocess(msg: impl Into<String>) -> Self {
        Self::Postprocess(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check if the oracle reported a retryable failure.
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Check if an oracle response broke the tagged-text contract.
    #[inline]
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }

    /// Get the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Protocol { .. } => "protocol",
            Self::Transient(_) => "transient",
            Self::Oracle(_) => "oracle",
            Self::EmptyCandidateSet => "empty_candidates",
            Self::InvalidSelection { .. } => "selection",
            Self::Dataset(_) => "dataset",
            Self::Postprocess(_) => "postprocess",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Csv(_) => "csv",
            Self::Json(_) => "json",
            Self::Yaml(_) => "yaml",
        }
    }
}
