// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Refinement strategies driven by [`crate::optimizer::OptimizationLoop`].
//!
//! - [`CriticRefiner`]: score on a labeled dataset, analyze failures, ask the
//!   critic for a rewrite, repeat.
//! - [`RaterRefiner`]: generate rewrites and let a [`Rater`] keep the winner.

use crate::candidate::{filter_valid, Candidate, CandidateSet, Origin};
use crate::config::{AdoptPolicy, OptimizerConfig};
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::history::HistoryLedger;
use crate::oracle::Oracle;
use crate::postprocess::Postprocess;
use crate::rater::{DemoData, Rater};
use crate::roles::{Critic, Executor, Generator, StepInput};
use crate::scorer::Scorer;
use crate::templates::PromptTemplates;
use async_trait::async_trait;
use futures::future::try_join_all;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One refinement strategy.
///
/// The loop calls [`seed`](Refiner::seed) once, then
/// [`step`](Refiner::step) [`rounds`](Refiner::rounds) times, feeding each
/// step the previous active prompt.
#[async_trait]
pub trait Refiner: Send {
    /// Strategy name for logs.
    fn name(&self) -> &'static str;

    /// Number of refinement rounds after seeding.
    fn rounds(&self) -> u32;

    /// Evaluate the seed and return the first active prompt.
    async fn seed(&mut self, seed_prompt: &str) -> Result<String>;

    /// Run one round and return the next active prompt.
    async fn step(&mut self, round: u32, active: &str) -> Result<String>;
}

/// Placeholder check for a single produced prompt.
fn admit(seed_prompt: &str, candidate: Candidate) -> Result<Candidate> {
    filter_valid(seed_prompt, [candidate])
        .into_selected(0)
        .ok_or(Error::EmptyCandidateSet)
}

/// Reject out-of-range rater answers before indexing.
fn select(candidates: CandidateSet, idx: usize) -> Result<Candidate> {
    let len = candidates.len();
    candidates
        .into_selected(idx)
        .ok_or(Error::InvalidSelection { index: idx, len })
}

/// Dataset-driven refinement through failure analysis.
pub struct CriticRefiner<O> {
    scorer: Scorer<O>,
    critic: Critic<O>,
    dataset: Dataset,
    task_description: String,
    ledger: HistoryLedger,
    policy: AdoptPolicy,
    step_num: u32,
    history_window: usize,
    output_dir: Option<PathBuf>,
    seed_prompt: String,
}

impl<O: Oracle + Clone> CriticRefiner<O> {
    /// Create a critic refiner over `dataset`.
    pub fn new(
        oracle: O,
        templates: Arc<PromptTemplates>,
        dataset: Dataset,
        task_description: impl Into<String>,
        postprocess: Postprocess,
        config: &OptimizerConfig,
    ) -> Self {
        let scorer = Scorer::new(Executor::new(oracle.clone()), postprocess)
            .with_concurrency(config.concurrency);
        Self {
            scorer,
            critic: Critic::new(oracle, templates),
            dataset,
            task_description: task_description.into(),
            ledger: HistoryLedger::new(config.errors_per_label, config.sample_seed),
            policy: config.adopt_policy,
            step_num: config.step_num,
            history_window: config.history_window,
            output_dir: config.output_dir.clone(),
            seed_prompt: String::new(),
        }
    }
}

impl<O: Oracle> CriticRefiner<O> {
    /// Scored attempts so far.
    pub fn ledger(&self) -> &HistoryLedger {
        &self.ledger
    }

    /// Consume the refiner, keeping its ledger.
    pub fn into_ledger(self) -> HistoryLedger {
        self.ledger
    }

    async fn evaluate(&mut self, round: u32, prompt: &str) -> Result<f64> {
        let scored = self.scorer.run(prompt, &self.dataset).await?;
        if let Some(dir) = &self.output_dir {
            scored.save_predictions(dir.join(format!("round_{}", round)))?;
        }
        let entry = self
            .ledger
            .append(prompt, &scored, &self.task_description, &self.critic)
            .await?;
        Ok(entry.score)
    }
}

#[async_trait]
impl<O: Oracle> Refiner for CriticRefiner<O> {
    fn name(&self) -> &'static str {
        "critic"
    }

    fn rounds(&self) -> u32 {
        self.step_num
    }

    async fn seed(&mut self, seed_prompt: &str) -> Result<String> {
        self.seed_prompt = seed_prompt.to_string();
        let score = self.evaluate(0, seed_prompt).await?;
        info!(score, "seed prompt scored");
        Ok(seed_prompt.to_string())
    }

    async fn step(&mut self, round: u32, active: &str) -> Result<String> {
        let previous = self
            .ledger
            .latest()
            .ok_or_else(|| Error::config("critic refiner stepped before seeding"))?
            .score;
        // The analysis shown must belong to `active`, not the latest attempt.
        let current = self
            .ledger
            .entry_for(active)
            .or_else(|| self.ledger.latest())
            .ok_or_else(|| Error::config("critic refiner stepped before seeding"))?;
        let history = self.ledger.history_text(self.history_window);
        let labels = serde_json::to_string(&self.dataset.label_values())?;

        let proposal = self
            .critic
            .propose(StepInput {
                original_instruction: active,
                task_description: &self.task_description,
                history: &history,
                error_analysis: &current.analysis,
                failure_cases: &current.failure_cases,
                labels: &labels,
            })
            .await?;
        let candidate = admit(&self.seed_prompt, Candidate::new(proposal, round, Origin::Critic))?;

        let score = self.evaluate(round, &candidate.prompt).await?;
        if score < previous {
            warn!(round, previous, score, "round regressed");
        }

        let next = match self.policy {
            AdoptPolicy::Always => candidate.prompt,
            AdoptPolicy::KeepBest => self
                .ledger
                .best()
                .map(|e| e.prompt.clone())
                .unwrap_or(candidate.prompt),
        };
        debug!(round, score, policy = ?self.policy, "prompt adopted");
        Ok(next)
    }
}

/// Generator-and-rater refinement against demo data.
pub struct RaterRefiner<O, R> {
    generator: Generator<O>,
    rater: R,
    demo: DemoData,
    candidates: usize,
    epoch: u32,
    seed_prompt: String,
    winner: Option<Candidate>,
}

impl<O: Oracle, R: Rater> RaterRefiner<O, R> {
    /// Create a rater refiner.
    pub fn new(
        oracle: O,
        templates: Arc<PromptTemplates>,
        rater: R,
        demo: DemoData,
        config: &OptimizerConfig,
    ) -> Self {
        Self {
            generator: Generator::new(oracle, templates),
            rater,
            demo,
            candidates: config.candidates.max(1),
            epoch: config.epoch,
            seed_prompt: String::new(),
            winner: None,
        }
    }

    /// Current winning candidate.
    pub fn winner(&self) -> Option<&Candidate> {
        self.winner.as_ref()
    }

    async fn rate(&self, candidates: CandidateSet) -> Result<Candidate> {
        if candidates.is_empty() {
            return Err(Error::EmptyCandidateSet);
        }
        let idx = self
            .rater
            .rate(&self.seed_prompt, &candidates, &self.demo)
            .await?;
        select(candidates, idx)
    }
}

#[async_trait]
impl<O: Oracle, R: Rater> Refiner for RaterRefiner<O, R> {
    fn name(&self) -> &'static str {
        "rater"
    }

    fn rounds(&self) -> u32 {
        self.epoch
    }

    async fn seed(&mut self, seed_prompt: &str) -> Result<String> {
        self.seed_prompt = seed_prompt.to_string();
        let rewrites = try_join_all(
            (0..self.candidates).map(|_| self.generator.rewrite(seed_prompt)),
        )
        .await?;
        let offered = rewrites.len();
        let valid = filter_valid(
            seed_prompt,
            rewrites
                .into_iter()
                .map(|p| Candidate::new(p, 0, Origin::Generator)),
        );
        debug!(offered, valid = valid.len(), "seed candidates filtered");

        let winner = self.rate(valid).await?;
        let prompt = winner.prompt.clone();
        self.winner = Some(winner);
        Ok(prompt)
    }

    async fn step(&mut self, round: u32, active: &str) -> Result<String> {
        let more = self
            .generator
            .rewrite_with_example(&self.seed_prompt, active)
            .await?;
        let current = self
            .winner
            .take()
            .unwrap_or_else(|| Candidate::new(active, round.saturating_sub(1), Origin::Generator));
        let valid = filter_valid(
            &self.seed_prompt,
            [current, Candidate::new(more, round, Origin::Generator)],
        );

        let winner = self.rate(valid).await?;
        debug!(round, winner_round = winner.round, "rater picked winner");
        let prompt = winner.prompt.clone();
        self.winner = Some(winner);
        Ok(prompt)
    }
}
