// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Named post-processing functions.
//!
//! Raw oracle text is mapped to a label by a pure function looked up by
//! name. Nothing is evaluated at runtime; callers register their own
//! functions alongside the built-ins.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A pure text-to-label mapping.
pub type Postprocess = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Name-to-function lookup table.
#[derive(Clone)]
pub struct PostprocessRegistry {
    functions: BTreeMap<String, Postprocess>,
}

impl PostprocessRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            functions: BTreeMap::new(),
        }
    }

    /// Registry with the built-in functions.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("identity", |s: &str| s.to_string());
        registry.register("trim", |s: &str| s.trim().to_string());
        registry.register("lowercase", |s: &str| s.trim().to_lowercase());
        registry.register("uppercase", |s: &str| s.trim().to_uppercase());
        registry.register("first_line", |s: &str| {
            s.trim().lines().next().unwrap_or_default().trim().to_string()
        });
        registry.register("first_word", |s: &str| {
            s.split_whitespace().next().unwrap_or_default().to_string()
        });
        registry.register("strip_punctuation", |s: &str| {
            s.trim()
                .trim_matches(|c: char| c.is_ascii_punctuation())
                .trim()
                .to_string()
        });
        registry
    }

    /// Register (or replace) a function.
    pub fn register<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(f));
        self
    }

    /// Look up a function by name.
    pub fn get(&self, name: &str) -> Result<Postprocess> {
        self.functions.get(name).cloned().ok_or_else(|| {
            Error::postprocess(format!(
                "unknown function `{}` (available: {})",
                name,
                self.names().join(", ")
            ))
        })
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.functions.keys().map(String::as_str).collect()
    }
}

impl Default for PostprocessRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for PostprocessRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostprocessRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

/// The `identity` function.
pub fn identity() -> Postprocess {
    Arc::new(|s: &str| s.to_string())
}
