// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Placeholder tokens and rendering.
//!
//! Two template families are in use: `{name}` slots and `<<NAME>>` slots.
//! They are tracked as distinct tokens, so `{text}` and `<<text>>` never
//! satisfy each other during candidate validation.

use regex::{Captures, Regex};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::OnceLock;

/// Delimiter family of a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlaceholderStyle {
    /// `{name}`
    Brace,
    /// `<<name>>`
    Angle,
}

/// A runtime-substituted slot inside a prompt.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Placeholder {
    /// Delimiter family
    pub style: PlaceholderStyle,
    /// Name between the delimiters
    pub name: String,
}

impl Placeholder {
    /// Create a `{name}` placeholder.
    pub fn brace(name: impl Into<String>) -> Self {
        Self {
            style: PlaceholderStyle::Brace,
            name: name.into(),
        }
    }

    /// Create a `<<name>>` placeholder.
    pub fn angle(name: impl Into<String>) -> Self {
        Self {
            style: PlaceholderStyle::Angle,
            name: name.into(),
        }
    }

    /// The literal token as it appears in prompt text.
    pub fn token(&self) -> String {
        match self.style {
            PlaceholderStyle::Brace => format!("{{{}}}", self.name),
            PlaceholderStyle::Angle => format!("<<{}>>", self.name),
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

fn brace_pattern() -> &'static Regex {
    static BRACE: OnceLock<Regex> = OnceLock::new();
    BRACE.get_or_init(|| Regex::new(r"\{([^{}]+)\}").expect("invalid regex pattern"))
}

fn angle_pattern() -> &'static Regex {
    static ANGLE: OnceLock<Regex> = OnceLock::new();
    ANGLE.get_or_init(|| Regex::new(r"<<([^<>]+)>>").expect("invalid regex pattern"))
}

/// Collect every placeholder token present in `text`.
pub fn placeholders(text: &str) -> BTreeSet<Placeholder> {
    let braces = brace_pattern()
        .captures_iter(text)
        .map(|c| Placeholder::brace(&c[1]));
    let angles = angle_pattern()
        .captures_iter(text)
        .map(|c| Placeholder::angle(&c[1]));
    braces.chain(angles).collect()
}

/// Check that `text` contains every token in `required`.
pub fn covers(text: &str, required: &BTreeSet<Placeholder>) -> bool {
    required.iter().all(|p| text.contains(&p.token()))
}

fn any_pattern() -> &'static Regex {
    static ANY: OnceLock<Regex> = OnceLock::new();
    ANY.get_or_init(|| Regex::new(r"\{([^{}]+)\}|<<([^<>]+)>>").expect("invalid regex pattern"))
}

/// Substitute values into both placeholder families in a single pass.
///
/// Slots without a matching key are left verbatim, and substituted values are
/// never re-scanned for slots.
pub fn render<'v, I>(template: &str, values: I) -> String
where
    I: IntoIterator<Item = (&'v str, &'v str)>,
{
    let values: HashMap<&str, &str> = values.into_iter().collect();
    any_pattern()
        .replace_all(template, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match values.get(name) {
                Some(value) => (*value).to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
