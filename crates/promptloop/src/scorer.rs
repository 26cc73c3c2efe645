// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Dataset execution and accuracy scoring.

use crate::dataset::{Dataset, Row};
use crate::error::Result;
use crate::oracle::Oracle;
use crate::postprocess::Postprocess;
use crate::roles::Executor;
use futures::future::FutureExt;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info, info_span, Instrument};

/// Mean row score, in `[0, 1]`.
///
/// An empty dataset scores `0.0`.
pub fn score(dataset: &Dataset) -> f64 {
    if dataset.is_empty() {
        return 0.0;
    }
    let total: f64 = dataset.iter().map(Row::row_score).sum();
    total / dataset.len() as f64
}

/// Rows scoring below `0.5`, in original order.
pub fn extract_errors(dataset: &Dataset) -> Vec<Row> {
    dataset
        .iter()
        .filter(|row| row.row_score() < 0.5)
        .cloned()
        .collect()
}

/// Runs a prompt over every row and records predictions.
pub struct Scorer<O> {
    executor: Executor<O>,
    postprocess: Postprocess,
    concurrency: usize,
}

impl<O: Oracle> Scorer<O> {
    /// Create a scorer executing rows one at a time.
    pub fn new(executor: Executor<O>, postprocess: Postprocess) -> Self {
        Self {
            executor,
            postprocess,
            concurrency: 1,
        }
    }

    /// Allow up to `n` in-flight executor calls. Row order is preserved.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// The executor used for each row.
    pub fn executor(&self) -> &Executor<O> {
        &self.executor
    }

    /// Execute `prompt` on every row and return an augmented copy.
    ///
    /// Each row gets `predict` (post-processed output) and `score`
    /// (1.0 on a normalized match, else 0.0). The first oracle error aborts
    /// the run.
    pub async fn run(&self, prompt: &str, dataset: &Dataset) -> Result<Dataset> {
        let span = info_span!("score", rows = dataset.len(), concurrency = self.concurrency);
        async move {
            let pending: Vec<_> = dataset
                .iter()
                .enumerate()
                .map(|(idx, row)| self.score_row(prompt, idx, row).boxed())
                .collect();
            let rows: Vec<Row> = stream::iter(pending)
                .buffered(self.concurrency)
                .try_collect()
                .await?;
            let scored = dataset.with_rows(rows);
            info!(accuracy = score(&scored), "dataset scored");
            Ok(scored)
        }
        .instrument(span)
        .await
    }

    /// Run `prompt` and persist `predict_<timestamp>.csv` into `dir`.
    pub async fn predict(
        &self,
        prompt: &str,
        dataset: &Dataset,
        dir: impl AsRef<Path>,
    ) -> Result<(Dataset, PathBuf)> {
        let scored = self.run(prompt, dataset).await?;
        let path = scored.save_predictions(dir)?;
        Ok((scored, path))
    }

    async fn score_row(&self, prompt: &str, idx: usize, row: &Row) -> Result<Row> {
        let raw = self.executor.execute(prompt, row).await?;
        let mut scored = row.clone();
        scored.predict = Some((self.postprocess)(&raw));
        scored.score = Some(if scored.is_correct() { 1.0 } else { 0.0 });
        debug!(row = idx, correct = scored.is_correct(), "row scored");
        Ok(scored)
    }
}
