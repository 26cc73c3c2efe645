// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Candidate selection.
//!
//! A [`Rater`] picks the preferred candidate for a seed prompt given a
//! single demo input. The loop only relies on the returned index; how the
//! choice is made is up to the implementation.

use crate::candidate::CandidateSet;
use crate::error::{Error, Result};
use crate::oracle::{CompletionRequest, ModelTier, Oracle};
use crate::placeholder::render;
use crate::roles::Executor;
use crate::tags;
use crate::templates::PromptTemplates;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::debug;

/// Demo input: placeholder name to value.
pub type DemoData = IndexMap<String, String>;

/// Chooses the best candidate.
#[async_trait]
pub trait Rater: Send + Sync {
    /// Index of the preferred candidate in `candidates`.
    async fn rate(
        &self,
        seed_prompt: &str,
        candidates: &CandidateSet,
        demo: &DemoData,
    ) -> Result<usize>;
}

/// Oracle-judged rater.
///
/// Executes every candidate on the demo input, then asks the strong tier to
/// pick the output that best fulfils the seed prompt. The answer is read
/// from a `<best>` tag holding a zero-based index.
///
/// An empty set is rejected; a lone candidate wins without any calls.
pub struct JudgeRater<O> {
    oracle: O,
    templates: Arc<PromptTemplates>,
}

impl<O: Oracle> JudgeRater<O> {
    /// Create a judge rater.
    pub fn new(oracle: O, templates: Arc<PromptTemplates>) -> Self {
        Self { oracle, templates }
    }
}

fn candidate_block(idx: usize, prompt: &str, output: &str) -> String {
    format!(
        "<candidate index=\"{}\">\n{}\n{}\n</candidate>\n",
        idx,
        tags::wrap("prompt", prompt),
        tags::wrap("output", output)
    )
}

#[async_trait]
impl<O: Oracle> Rater for JudgeRater<O> {
    async fn rate(
        &self,
        seed_prompt: &str,
        candidates: &CandidateSet,
        demo: &DemoData,
    ) -> Result<usize> {
        if candidates.is_empty() {
            return Err(Error::EmptyCandidateSet);
        }
        if candidates.len() == 1 {
            return Ok(0);
        }

        let executor = Executor::new(&self.oracle);
        let mut blocks = String::new();
        for (idx, candidate) in candidates.iter().enumerate() {
            let output = executor
                .execute_with(
                    &candidate.prompt,
                    demo.iter().map(|(k, v)| (k.as_str(), v.as_str())),
                )
                .await?;
            blocks.push_str(&candidate_block(idx, &candidate.prompt, &output));
        }

        let prompt = render(
            &self.templates.judge,
            [("initial", seed_prompt), ("candidates", blocks.as_str())],
        );
        let request = CompletionRequest::new(ModelTier::Strong, prompt).with_temperature(0.0);
        let response = self.oracle.complete(request).await?;
        let raw = tags::extract_first("best", &response)?.trim();
        let idx = raw
            .parse::<usize>()
            .map_err(|_| Error::protocol("best", format!("expected a candidate index, got `{}`", raw)))?;
        debug!(selected = idx, offered = candidates.len(), "judge picked candidate");
        Ok(idx)
    }
}

/// Rater backed by a closure.
pub struct FnRater<F>
where
    F: Fn(&str, &CandidateSet, &DemoData) -> usize + Send + Sync,
{
    select: F,
}

impl<F> FnRater<F>
where
    F: Fn(&str, &CandidateSet, &DemoData) -> usize + Send + Sync,
{
    /// Wrap a selection function.
    pub fn new(select: F) -> Self {
        Self { select }
    }
}

#[async_trait]
impl<F> Rater for FnRater<F>
where
    F: Fn(&str, &CandidateSet, &DemoData) -> usize + Send + Sync,
{
    async fn rate(
        &self,
        seed_prompt: &str,
        candidates: &CandidateSet,
        demo: &DemoData,
    ) -> Result<usize> {
        Ok((self.select)(seed_prompt, candidates, demo))
    }
}

/// Always prefers the last candidate.
pub fn prefer_last() -> FnRater<impl Fn(&str, &CandidateSet, &DemoData) -> usize + Send + Sync> {
    FnRater::new(|_: &str, c: &CandidateSet, _: &DemoData| c.len().saturating_sub(1))
}
