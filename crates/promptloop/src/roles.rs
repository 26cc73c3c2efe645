// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Oracle roles: Generator, Executor and Critic.
//!
//! Each role wraps the same [`Oracle`] with its own request preset and its
//! own response contract.

use crate::dataset::Row;
use crate::error::Result;
use crate::oracle::{CompletionRequest, ModelTier, Oracle};
use crate::placeholder::render;
use crate::tags;
use crate::templates::PromptTemplates;
use std::sync::Arc;

/// Strip the wrapper artifacts generators are known to echo back.
///
/// Removes every `</rewrite>`, then one leading `<instruction>` and one
/// trailing `</instruction>`, trimming around each step.
pub fn clean_rewrite(raw: &str) -> String {
    let text = raw.replace("</rewrite>", "");
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("<instruction>") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("</instruction>") {
        text = rest;
    }
    text.trim().to_string()
}

/// Produces instruction rewrites.
pub struct Generator<O> {
    oracle: O,
    templates: Arc<PromptTemplates>,
    temperature: f32,
    max_tokens: u32,
}

impl<O: Oracle> Generator<O> {
    /// Create a generator with the strong-tier preset.
    pub fn new(oracle: O, templates: Arc<PromptTemplates>) -> Self {
        Self {
            oracle,
            templates,
            temperature: 0.8,
            max_tokens: 1000,
        }
    }

    /// Rewrite `seed` following the guide.
    pub async fn rewrite(&self, seed: &str) -> Result<String> {
        let prompt = render(
            &self.templates.rewrite,
            [("guide", self.templates.guide.as_str()), ("initial", seed)],
        );
        self.complete(prompt).await
    }

    /// Rewrite `seed` again, conditioned on a previous rewrite.
    pub async fn rewrite_with_example(&self, seed: &str, example: &str) -> Result<String> {
        let prompt = render(
            &self.templates.rewrite_with_example,
            [
                ("guide", self.templates.guide.as_str()),
                ("initial", seed),
                ("demo", example),
            ],
        );
        self.complete(prompt).await
    }

    async fn complete(&self, prompt: String) -> Result<String> {
        let request = CompletionRequest::new(ModelTier::Strong, prompt)
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
            .with_stop("\n\nHuman:");
        let raw = self.oracle.complete(request).await?;
        Ok(clean_rewrite(&raw))
    }
}

/// Runs a task prompt against single rows.
pub struct Executor<O> {
    oracle: O,
    max_tokens: u32,
}

impl<O: Oracle> Executor<O> {
    /// Create an executor with the fast-tier preset.
    pub fn new(oracle: O) -> Self {
        Self {
            oracle,
            max_tokens: 4096,
        }
    }

    /// Substitute the row's input fields (never its label) and execute.
    pub async fn execute(&self, prompt: &str, row: &Row) -> Result<String> {
        self.execute_with(prompt, row.inputs()).await
    }

    /// Substitute arbitrary values and execute.
    pub async fn execute_with<'v, I>(&self, prompt: &str, values: I) -> Result<String>
    where
        I: IntoIterator<Item = (&'v str, &'v str)>,
    {
        let text = render(prompt, values);
        let request = CompletionRequest::new(ModelTier::Fast, text).with_max_tokens(self.max_tokens);
        self.oracle.complete(request).await
    }
}

/// Inputs for the critic's failure analysis.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisInput<'a> {
    /// What the classifier is for
    pub task_description: &'a str,
    /// Prompt that produced the failures
    pub prompt: &'a str,
    /// Its accuracy
    pub accuracy: f64,
    /// Rendered confusion matrix
    pub confusion_matrix: &'a str,
    /// Rendered failure sample
    pub failure_cases: &'a str,
}

/// Inputs for the critic's rewrite step.
#[derive(Debug, Clone, Copy)]
pub struct StepInput<'a> {
    /// Prompt to improve
    pub original_instruction: &'a str,
    /// What the classifier is for
    pub task_description: &'a str,
    /// Rendered ledger context
    pub history: &'a str,
    /// Latest analysis
    pub error_analysis: &'a str,
    /// Latest failure sample
    pub failure_cases: &'a str,
    /// Label set as a JSON array
    pub labels: &'a str,
}

/// Analyzes failures and proposes rewrites.
pub struct Critic<O> {
    oracle: O,
    templates: Arc<PromptTemplates>,
    max_tokens: u32,
}

impl<O: Oracle> Critic<O> {
    /// Create a critic.
    pub fn new(oracle: O, templates: Arc<PromptTemplates>) -> Self {
        Self {
            oracle,
            templates,
            max_tokens: 4096,
        }
    }

    /// Produce the `<analysis>` text for a scored prompt.
    pub async fn analyze(&self, input: AnalysisInput<'_>) -> Result<String> {
        let accuracy = format!("{:.2}", input.accuracy);
        let prompt = render(
            &self.templates.error_analysis,
            [
                ("task_description", input.task_description),
                ("prompt", input.prompt),
                ("accuracy", accuracy.as_str()),
                ("confusion_matrix", input.confusion_matrix),
                ("failure_cases", input.failure_cases),
            ],
        );
        let request = CompletionRequest::new(ModelTier::Fast, prompt).with_max_tokens(self.max_tokens);
        let response = self.oracle.complete(request).await?;
        Ok(tags::extract_first("analysis", &response)?.trim().to_string())
    }

    /// Produce the `<new_prompt>` text for the next round.
    pub async fn propose(&self, input: StepInput<'_>) -> Result<String> {
        let prompt = render(
            &self.templates.step,
            [
                ("original_instruction", input.original_instruction),
                ("task_description", input.task_description),
                ("history", input.history),
                ("error_analysis", input.error_analysis),
                ("failure_cases", input.failure_cases),
                ("labels", input.labels),
            ],
        );
        let request =
            CompletionRequest::new(ModelTier::Strong, prompt).with_max_tokens(self.max_tokens);
        let response = self.oracle.complete(request).await?;
        Ok(tags::extract_first("new_prompt", &response)?.to_string())
    }
}
