// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Append-only ledger of scored prompt attempts.
//!
//! Each entry records a prompt, its accuracy, the rows it failed on, a
//! confusion matrix and the critic's analysis. The ledger feeds the critic
//! its worst attempts first so the next rewrite sees a trend rather than a
//! single data point.

use crate::dataset::{normalize_label, Dataset, Row};
use crate::error::Result;
use crate::oracle::Oracle;
use crate::roles::{AnalysisInput, Critic};
use crate::sampling::{failure_text, sample_failures, DEFAULT_SEED};
use crate::scorer::{extract_errors, score};
use std::fmt;
use tracing::{debug, info};

/// Per-label contingency table.
///
/// Rows are ground-truth labels, columns are predictions, both keyed by the
/// sorted unique labels of the dataset it was built from. Predictions
/// outside that label set are not counted. Dimensions follow whatever labels
/// the dataset carries at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    labels: Vec<String>,
    counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Build from a scored dataset.
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let mut labels = dataset.unique_labels();
        labels.sort();
        let n = labels.len();
        let mut counts = vec![vec![0usize; n]; n];

        for row in dataset.iter() {
            let Some(predict) = row.predict.as_deref() else {
                continue;
            };
            let actual = labels.iter().position(|l| *l == normalize_label(row.label()));
            let predicted = labels.iter().position(|l| *l == normalize_label(predict));
            if let (Some(a), Some(p)) = (actual, predicted) {
                counts[a][p] += 1;
            }
        }

        Self { labels, counts }
    }

    /// Sorted label set.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Count of rows labeled `actual` and predicted `predicted`.
    pub fn count(&self, actual: &str, predicted: &str) -> usize {
        let a = self.labels.iter().position(|l| l == actual);
        let p = self.labels.iter().position(|l| l == predicted);
        match (a, p) {
            (Some(a), Some(p)) => self.counts[a][p],
            _ => 0,
        }
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Confusion matrix columns:[{}] the matrix data:",
            self.labels.join(", ")
        )?;
        for (label, row) in self.labels.iter().zip(&self.counts) {
            let cells: Vec<String> = row.iter().map(usize::to_string).collect();
            write!(f, "\n{}: [{}]", label, cells.join(" "))?;
        }
        Ok(())
    }
}

/// One scored attempt.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// Prompt text
    pub prompt: String,
    /// Mean accuracy in `[0, 1]`
    pub score: f64,
    /// Rows scoring below 0.5, in dataset order
    pub failing_rows: Vec<Row>,
    /// Rendered failure sample shown to the critic
    pub failure_cases: String,
    /// Contingency table at append time
    pub confusion: ConfusionMatrix,
    /// Critic's analysis of the failures
    pub analysis: String,
}

impl HistoryEntry {
    /// `<example>` block used in the critic's history context.
    pub fn example_text(&self) -> String {
        format!(
            "<example>\n<prompt_score>\n{:.2}\n</prompt_score>\n<prompt>\n{}\n</prompt>\n</example>\n",
            self.score, self.prompt
        )
    }
}

/// Append-only ledger of [`HistoryEntry`] values.
#[derive(Debug, Clone)]
pub struct HistoryLedger {
    entries: Vec<HistoryEntry>,
    errors_per_label: usize,
    sample_seed: u64,
}

impl Default for HistoryLedger {
    fn default() -> Self {
        Self::new(5, DEFAULT_SEED)
    }
}

impl HistoryLedger {
    /// Create an empty ledger.
    pub fn new(errors_per_label: usize, sample_seed: u64) -> Self {
        Self {
            entries: Vec::new(),
            errors_per_label,
            sample_seed,
        }
    }

    /// Score `scored`, sample its failures, ask the critic for an analysis
    /// and record the result.
    ///
    /// A critic failure leaves the ledger unchanged.
    pub async fn append<O: Oracle>(
        &mut self,
        prompt: &str,
        scored: &Dataset,
        task_description: &str,
        critic: &Critic<O>,
    ) -> Result<&HistoryEntry> {
        let accuracy = score(scored);
        let failing_rows = extract_errors(scored);
        let sample = sample_failures(&failing_rows, self.errors_per_label, self.sample_seed);
        let failure_cases = failure_text(&sample);
        let confusion = ConfusionMatrix::from_dataset(scored);
        debug!(
            failing = failing_rows.len(),
            sampled = sample.len(),
            labels = confusion.labels().len(),
            "analyzing failures"
        );

        let confusion_text = confusion.to_string();
        let analysis = critic
            .analyze(AnalysisInput {
                task_description,
                prompt,
                accuracy,
                confusion_matrix: &confusion_text,
                failure_cases: &failure_cases,
            })
            .await?;

        self.entries.push(HistoryEntry {
            prompt: prompt.to_string(),
            score: accuracy,
            failing_rows,
            failure_cases,
            confusion,
            analysis,
        });
        info!(score = accuracy, entries = self.entries.len(), "history entry appended");
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// The `k` lowest-scoring entries, ascending by score.
    ///
    /// Ties keep append order.
    pub fn recent(&self, k: usize) -> Vec<&HistoryEntry> {
        let mut sorted: Vec<&HistoryEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| a.score.total_cmp(&b.score));
        sorted.truncate(k);
        sorted
    }

    /// Critic context built from [`recent`](Self::recent).
    pub fn history_text(&self, k: usize) -> String {
        self.recent(k)
            .into_iter()
            .map(HistoryEntry::example_text)
            .collect()
    }

    /// Most recently appended entry.
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    /// Most recent entry recorded for exactly `prompt`.
    pub fn entry_for(&self, prompt: &str) -> Option<&HistoryEntry> {
        self.entries.iter().rev().find(|e| e.prompt == prompt)
    }

    /// Highest-scoring entry; the earliest one wins ties.
    pub fn best(&self) -> Option<&HistoryEntry> {
        self.entries
            .iter()
            .reduce(|best, e| if e.score > best.score { e } else { best })
    }

    /// All entries in append order.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn push_entry(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{FailingOracle, MockOracle};
    use crate::templates::PromptTemplates;
    use std::sync::Arc;

    fn row(label: &str, predict: &str) -> Row {
        let mut r = Row::new(label).with_field("text", format!("{}->{}", label, predict));
        r.predict = Some(predict.to_string());
        r.score = Some(if label == predict { 1.0 } else { 0.0 });
        r
    }

    fn entry(prompt: &str, score: f64) -> HistoryEntry {
        HistoryEntry {
            prompt: prompt.to_string(),
            score,
            failing_rows: Vec::new(),
            failure_cases: String::new(),
            confusion: ConfusionMatrix::from_dataset(&Dataset::default()),
            analysis: String::new(),
        }
    }

    #[test]
    fn test_recent_returns_lowest_ascending() {
        let mut ledger = HistoryLedger::default();
        for (i, s) in [0.9, 0.2, 0.5, 0.7].into_iter().enumerate() {
            ledger.push_entry(entry(&format!("p{}", i), s));
        }
        let scores: Vec<f64> = ledger.recent(3).iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![0.2, 0.5, 0.7]);
        assert_eq!(ledger.recent(10).len(), 4);
        assert_eq!(ledger.best().map(|e| e.prompt.as_str()), Some("p0"));
        assert_eq!(ledger.latest().map(|e| e.prompt.as_str()), Some("p3"));
    }

    #[test]
    fn test_recent_ties_keep_append_order() {
        let mut ledger = HistoryLedger::default();
        ledger.push_entry(entry("first", 0.5));
        ledger.push_entry(entry("second", 0.5));
        let prompts: Vec<&str> = ledger.recent(2).iter().map(|e| e.prompt.as_str()).collect();
        assert_eq!(prompts, vec!["first", "second"]);
    }

    #[test]
    fn test_history_text() {
        let mut ledger = HistoryLedger::default();
        ledger.push_entry(entry("good", 0.75));
        ledger.push_entry(entry("bad", 0.25));
        assert_eq!(
            ledger.history_text(3),
            "<example>\n<prompt_score>\n0.25\n</prompt_score>\n<prompt>\nbad\n</prompt>\n</example>\n\
             <example>\n<prompt_score>\n0.75\n</prompt_score>\n<prompt>\ngood\n</prompt>\n</example>\n"
        );
    }

    #[test]
    fn test_confusion_matrix_sorted_labels() {
        let ds = Dataset::from_rows(vec![
            row("B", "B"),
            row("A", "B"),
            row("A", "A"),
            row("B", "maybe"),
        ]);
        let m = ConfusionMatrix::from_dataset(&ds);
        assert_eq!(m.labels(), &["A", "B"]);
        assert_eq!(m.count("A", "B"), 1);
        assert_eq!(m.count("A", "A"), 1);
        assert_eq!(m.count("B", "B"), 1);
        assert_eq!(m.count("B", "A"), 0);
        assert_eq!(
            m.to_string(),
            "Confusion matrix columns:[A, B] the matrix data:\nA: [1 1]\nB: [0 1]"
        );
    }

    #[test]
    fn test_confusion_matrix_follows_label_set() {
        let two = Dataset::from_rows(vec![row("A", "A"), row("B", "A")]);
        let three = Dataset::from_rows(vec![row("A", "A"), row("B", "A"), row("C", "C")]);
        assert_eq!(ConfusionMatrix::from_dataset(&two).labels().len(), 2);
        assert_eq!(ConfusionMatrix::from_dataset(&three).labels().len(), 3);
    }

    #[tokio::test]
    async fn test_append_records_analysis() {
        let oracle = MockOracle::new(|req| {
            let prompt = req.last_user().unwrap_or_default();
            assert!(prompt.contains("Confusion matrix columns:[A, B]"));
            assert!(prompt.contains("<GT>\nB\n</GT>"));
            "<analysis>predicts A too often</analysis>".to_string()
        });
        let critic = Critic::new(&oracle, Arc::new(PromptTemplates::default()));
        let ds = Dataset::from_rows(vec![row("A", "A"), row("B", "A")]);

        let mut ledger = HistoryLedger::default();
        let entry = ledger.append("Classify: {text}", &ds, "task", &critic).await.unwrap();
        assert_eq!(entry.score, 0.5);
        assert_eq!(entry.failing_rows.len(), 1);
        assert_eq!(entry.analysis, "predicts A too often");
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn test_append_failure_leaves_ledger_unchanged() {
        let oracle = FailingOracle::new("down");
        let critic = Critic::new(&oracle, Arc::new(PromptTemplates::default()));
        let mut ledger = HistoryLedger::default();
        let ds = Dataset::from_rows(vec![row("A", "B")]);
        assert!(ledger.append("p", &ds, "t", &critic).await.is_err());
        assert!(ledger.is_empty());
    }
}
