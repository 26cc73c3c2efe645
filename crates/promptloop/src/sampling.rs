// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Deterministic failure sampling and its text rendering.

use crate::dataset::{normalize_label, Row};

/// Default sampling seed.
pub const DEFAULT_SEED: u64 = 42;

/// Simple deterministic RNG (linear congruential).
#[derive(Debug, Clone)]
pub struct Rng(u64);

impl Rng {
    /// Create from seed.
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Next raw value.
    pub fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(1664525).wrapping_add(1013904223);
        self.0
    }

    /// Uniform in `[0, 1]`.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() as f64) / (u64::MAX as f64)
    }

    /// Uniform in `[0, max)`.
    pub fn next_usize(&mut self, max: usize) -> usize {
        ((self.next_f64() * max as f64) as usize).min(max.saturating_sub(1))
    }

    /// Fisher-Yates shuffle.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.next_usize(i + 1);
            slice.swap(i, j);
        }
    }
}

/// Pick up to `per_label` failing rows for each label.
///
/// Labels are visited in first-appearance order. Each label's rows are
/// shuffled with a fresh generator seeded by `seed` and truncated; the
/// concatenation is shuffled once more with the same seed. Identical input
/// and seed always give an identical sample.
pub fn sample_failures(errors: &[Row], per_label: usize, seed: u64) -> Vec<Row> {
    let mut labels: Vec<String> = Vec::new();
    for row in errors {
        let label = normalize_label(row.label());
        if !labels.contains(&label) {
            labels.push(label);
        }
    }

    let mut picked = Vec::new();
    for label in &labels {
        let mut group: Vec<&Row> = errors
            .iter()
            .filter(|r| &normalize_label(r.label()) == label)
            .collect();
        Rng::new(seed).shuffle(&mut group);
        picked.extend(group.into_iter().take(per_label).cloned());
    }

    Rng::new(seed).shuffle(&mut picked);
    picked
}

/// Render sampled failures as `<Sample>` / `<Prediction>` / `<GT>` blocks.
pub fn failure_text(rows: &[Row]) -> String {
    let mut out = String::new();
    for row in rows {
        let sample = row
            .inputs()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join("\n");
        out.push_str(&format!(
            "<Sample>\n{}\n</Sample>\n<Prediction>\n{}\n</Prediction>\n<GT>\n{}\n</GT>\n",
            sample.trim(),
            row.predict.as_deref().unwrap_or_default(),
            row.label()
        ));
    }
    out.trim().to_string()
}
