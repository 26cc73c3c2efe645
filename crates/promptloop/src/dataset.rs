// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Labeled tabular datasets.
//!
//! A [`Dataset`] is an ordered list of [`Row`]s. Every row carries one
//! reserved `label` column; scoring adds `predict` and `score` without
//! touching the original columns.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Reserved ground-truth column.
pub const LABEL: &str = "label";
/// Column holding the post-processed prediction.
pub const PREDICT: &str = "predict";
/// Column holding the per-row score.
pub const SCORE: &str = "score";

/// Normalize a label or prediction for comparison.
///
/// Text is trimmed. Plain decimal numbers are rewritten textually without
/// sign noise, leading zeros or trailing fractional zeros, so `"1"`,
/// `"1.0"` and `" +01 "` compare equal while distinct digit strings never
/// do. Anything else, including exponent forms, is compared as text.
pub fn normalize_label(value: &str) -> String {
    let trimmed = value.trim();
    canonical_decimal(trimmed).unwrap_or_else(|| trimmed.to_string())
}

fn canonical_decimal(text: &str) -> Option<String> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (int, frac) = digits.split_once('.').unwrap_or((digits, ""));
    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if int.is_empty() || !is_digits(int) || !is_digits(frac) {
        return None;
    }

    let int = match int.trim_start_matches('0') {
        "" => "0",
        rest => rest,
    };
    let frac = frac.trim_end_matches('0');
    let mut out = String::with_capacity(digits.len() + 1);
    if negative && (int != "0" || !frac.is_empty()) {
        out.push('-');
    }
    out.push_str(int);
    if !frac.is_empty() {
        out.push('.');
        out.push_str(frac);
    }
    Some(out)
}

/// Exact comparison of normalized forms.
pub fn labels_match(predict: &str, label: &str) -> bool {
    normalize_label(predict) == normalize_label(label)
}

/// One dataset row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    fields: IndexMap<String, String>,
    label: String,
    /// Post-processed oracle output, once executed
    pub predict: Option<String>,
    /// 1.0 for a correct prediction, 0.0 otherwise, once scored
    pub score: Option<f64>,
}

impl Row {
    /// Create a row with the given ground-truth label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            fields: IndexMap::new(),
            label: label.into(),
            predict: None,
            score: None,
        }
    }

    /// Add an input field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Ground-truth label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Input field by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Input fields (everything except `label`) in column order.
    pub fn inputs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Whether the prediction matches the label.
    pub fn is_correct(&self) -> bool {
        self.predict
            .as_deref()
            .map(|p| labels_match(p, &self.label))
            .unwrap_or(false)
    }

    /// Row score, derived from the prediction when not yet recorded.
    pub fn row_score(&self) -> f64 {
        self.score
            .unwrap_or(if self.is_correct() { 1.0 } else { 0.0 })
    }
}

/// An ordered sequence of labeled rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Dataset {
    /// Build a dataset from rows.
    ///
    /// Column order is taken from the first row, followed by `label`.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut columns: Vec<String> = rows
            .first()
            .map(|r| r.fields.keys().cloned().collect())
            .unwrap_or_default();
        columns.push(LABEL.to_string());
        Self { columns, rows }
    }

    /// Parse CSV with a header row. A `label` column is mandatory.
    ///
    /// Existing `predict` / `score` columns (from an earlier run) are lifted
    /// into the typed row fields.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();

        let label_idx = headers
            .iter()
            .position(|h| h == LABEL)
            .ok_or_else(|| Error::dataset("missing mandatory `label` column"))?;

        let columns: Vec<String> = headers
            .iter()
            .filter(|h| h.as_str() != PREDICT && h.as_str() != SCORE)
            .cloned()
            .collect();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            let mut row = Row::new(record.get(label_idx).unwrap_or_default());
            for (idx, value) in record.iter().enumerate() {
                match headers[idx].as_str() {
                    LABEL => {}
                    PREDICT => row.predict = Some(value.to_string()),
                    SCORE => row.score = value.trim().parse().ok(),
                    name => {
                        row.fields.insert(name.to_string(), value.to_string());
                    }
                }
            }
            rows.push(row);
        }

        Ok(Self { columns, rows })
    }

    /// Load a CSV file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    /// Write CSV: original columns, then `predict` and `score`.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        let mut header: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        header.push(PREDICT);
        header.push(SCORE);
        csv_writer.write_record(&header)?;

        for row in &self.rows {
            let mut record: Vec<String> = self
                .columns
                .iter()
                .map(|c| {
                    if c == LABEL {
                        row.label.clone()
                    } else {
                        row.get(c).unwrap_or_default().to_string()
                    }
                })
                .collect();
            record.push(row.predict.clone().unwrap_or_default());
            record.push(row.score.map(|s| s.to_string()).unwrap_or_default());
            csv_writer.write_record(&record)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Persist as `predict_<YYYYMMDD-HHMMSS>.csv` inside `dir`.
    pub fn save_predictions(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let path = dir.join(format!("predict_{}.csv", stamp));
        let file = std::fs::File::create(&path)?;
        self.write_csv(std::io::BufWriter::new(file))?;
        tracing::info!(path = %path.display(), rows = self.rows.len(), "predictions saved");
        Ok(path)
    }

    /// Column names (without `predict` / `score`).
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Mutable rows in order.
    pub fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    /// Iterate over rows.
    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Normalized labels in order of first appearance.
    pub fn unique_labels(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for row in &self.rows {
            let label = normalize_label(&row.label);
            if !seen.contains(&label) {
                seen.push(label);
            }
        }
        seen
    }

    /// Label values as written in the data, deduplicated in order of first
    /// appearance.
    pub fn label_values(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !seen.contains(&row.label.as_str()) {
                seen.push(&row.label);
            }
        }
        seen
    }

    /// Copy of this dataset keeping only `rows`, with the same columns.
    pub fn with_rows(&self, rows: Vec<Row>) -> Self {
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }
}
