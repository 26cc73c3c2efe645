// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Draft a first prompt template from a plain task description.

use crate::error::Result;
use crate::oracle::{CompletionRequest, Message, ModelTier, Oracle};
use crate::tags;
use crate::templates::PromptTemplates;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info_span, Instrument};

/// Marker replaced by the task description.
pub const TASK_MARKER: &str = "{{TASK}}";

/// Characters of the drafted template kept verbatim before empty-tag cleanup.
const VERBATIM_PREFIX: usize = 1000;

/// A drafted template and the variables it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftedPrompt {
    /// Template text, trimmed
    pub template: String,
    /// Distinct `{...}` names found in the response, sorted
    pub variables: Vec<String>,
}

/// Meta-prompt driven template drafting.
pub struct MetaPrompt<O> {
    oracle: O,
    templates: Arc<PromptTemplates>,
}

impl<O: Oracle> MetaPrompt<O> {
    /// Create a drafter.
    pub fn new(oracle: O, templates: Arc<PromptTemplates>) -> Self {
        Self { oracle, templates }
    }

    /// Draft a template for `task` using the given input variable names.
    ///
    /// Blank variable names are ignored; the rest are upper-cased and
    /// pre-filled into the assistant turn so the draft starts from them.
    pub async fn generate(&self, task: &str, variables: &[&str]) -> Result<DraftedPrompt> {
        let prompt = self.templates.metaprompt.replace(TASK_MARKER, task);
        let prefill = assistant_prefill(variables);
        let request = CompletionRequest::new(ModelTier::Fast, prompt)
            .add_message(Message::assistant(prefill))
            .with_temperature(0.0);

        let response = self
            .oracle
            .complete(request)
            .instrument(info_span!("metaprompt", variables = variables.len()))
            .await?;
        let template = extract_template(&response)?;
        let variables = extract_variables(&response);
        debug!(found = variables.len(), "template drafted");
        Ok(DraftedPrompt { template, variables })
    }
}

/// Assistant prefill: `<Inputs>` plus the variable list when there is one.
pub fn assistant_prefill(variables: &[&str]) -> String {
    let listed: String = variables
        .iter()
        .filter(|v| !v.is_empty())
        .map(|v| format!("\n{{${}}}", v.to_uppercase()))
        .collect();
    if listed.is_empty() {
        "<Inputs>".to_string()
    } else {
        format!("<Inputs>{}\n</Inputs>\n<Instructions Structure>", listed)
    }
}

/// Pull the template out of the first `<Instructions>` region.
///
/// The first 1000 characters are kept as is; empty tag pairs are removed
/// from the remainder in two passes.
pub fn extract_template(response: &str) -> Result<String> {
    let body = tags::extract_first("Instructions", response)?;
    let split = body
        .char_indices()
        .nth(VERBATIM_PREFIX)
        .map(|(i, _)| i)
        .unwrap_or(body.len());
    let (head, tail) = body.split_at(split);
    let once = tags::remove_empty(tail);
    let twice = tags::remove_empty(once.trim());
    Ok(format!("{}{}", head, twice.trim()).trim().to_string())
}

fn variable_pattern() -> &'static Regex {
    static VARIABLE: OnceLock<Regex> = OnceLock::new();
    VARIABLE.get_or_init(|| Regex::new(r"\{([^}]+)\}").expect("invalid regex pattern"))
}

/// Distinct `{...}` names in `text`, sorted.
pub fn extract_variables(text: &str) -> Vec<String> {
    variable_pattern()
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
