// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! The optimization loop.
//!
//! Seeds a [`Refiner`], then runs its rounds strictly one after another.
//! Each round depends on the previous round's active prompt, so nothing is
//! run speculatively. The total work is bounded by the refiner's round
//! count; there is no early stop.
//!
//! # Examples
//!
//! ```no_run
//! use promptloop::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn demo(oracle: impl Oracle + Clone, dataset: Dataset) -> promptloop::Result<()> {
//! let config = OptimizerConfig::default().with_step_num(2);
//! let refiner = CriticRefiner::new(
//!     oracle,
//!     Arc::new(PromptTemplates::default()),
//!     dataset,
//!     "Sentiment of movie reviews",
//!     PostprocessRegistry::builtin().get("trim")?,
//!     &config,
//! );
//! let result = OptimizationLoop::new(refiner).run("Classify: {text}").await?;
//! println!("{}", result.prompt);
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use crate::refiner::Refiner;
use tracing::{info, info_span, Instrument};

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct Optimized {
    /// Final active prompt, trimmed
    pub prompt: String,
    /// Refinement rounds completed after seeding
    pub rounds: u32,
}

/// Drives a [`Refiner`] through its rounds.
pub struct OptimizationLoop<R> {
    refiner: R,
}

impl<R: Refiner> OptimizationLoop<R> {
    /// Wrap a refiner.
    pub fn new(refiner: R) -> Self {
        Self { refiner }
    }

    /// The refiner, e.g. to inspect its ledger after a run.
    pub fn refiner(&self) -> &R {
        &self.refiner
    }

    /// Unwrap the refiner.
    pub fn into_refiner(self) -> R {
        self.refiner
    }

    /// Run to completion.
    ///
    /// Any round failure aborts the run and is returned as is.
    pub async fn run(&mut self, seed_prompt: &str) -> Result<Optimized> {
        let strategy = self.refiner.name();
        let total = self.refiner.rounds();
        let span = info_span!("optimize", strategy, rounds = total);

        async move {
            let mut active = self.refiner.seed(seed_prompt).await?;
            info!("seed round complete");

            for round in 1..=total {
                active = self
                    .refiner
                    .step(round, &active)
                    .instrument(info_span!("round", round))
                    .await?;
                info!(round, "round complete");
            }

            Ok(Optimized {
                prompt: active.trim().to_string(),
                rounds: total,
            })
        }
        .instrument(span)
        .await
    }

    /// Run to completion, blocking the current thread.
    pub fn go(&mut self, seed_prompt: &str) -> Result<Optimized> {
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            tokio::task::block_in_place(|| handle.block_on(self.run(seed_prompt)))
        } else {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?
                .block_on(self.run(seed_prompt))
        }
    }
}
