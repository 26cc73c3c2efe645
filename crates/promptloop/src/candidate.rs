// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Prompt candidates and placeholder validation.

use crate::placeholder::{covers, placeholders};
use std::ops::Index;

/// Which step produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The caller-supplied seed prompt
    Seed,
    /// A generator rewrite
    Generator,
    /// A critic rewrite
    Critic,
}

/// A prompt plus provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Prompt text
    pub prompt: String,
    /// Round that produced it (0 for the seed round)
    pub round: u32,
    /// Producer
    pub origin: Origin,
}

impl Candidate {
    /// Create a new candidate.
    pub fn new(prompt: impl Into<String>, round: u32, origin: Origin) -> Self {
        Self {
            prompt: prompt.into(),
            round,
            origin,
        }
    }

    /// Wrap the caller's seed prompt.
    pub fn seed(prompt: impl Into<String>) -> Self {
        Self::new(prompt, 0, Origin::Seed)
    }
}

/// A small ordered collection of candidates.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    candidates: Vec<Candidate>,
}

impl CandidateSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a candidate.
    pub fn push(&mut self, candidate: Candidate) {
        self.candidates.push(candidate);
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Get a candidate by index.
    pub fn get(&self, idx: usize) -> Option<&Candidate> {
        self.candidates.get(idx)
    }

    /// Iterate over candidates.
    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    /// Take ownership of the candidate at `idx`, discarding the rest.
    pub fn into_selected(mut self, idx: usize) -> Option<Candidate> {
        if idx < self.candidates.len() {
            Some(self.candidates.swap_remove(idx))
        } else {
            None
        }
    }
}

impl Index<usize> for CandidateSet {
    type Output = Candidate;

    fn index(&self, idx: usize) -> &Candidate {
        &self.candidates[idx]
    }
}

impl FromIterator<Candidate> for CandidateSet {
    fn from_iter<T: IntoIterator<Item = Candidate>>(iter: T) -> Self {
        Self {
            candidates: iter.into_iter().collect(),
        }
    }
}

/// Keep only candidates that contain every placeholder token of `seed_prompt`.
///
/// Extra tokens are allowed. Order is preserved.
pub fn filter_valid<I>(seed_prompt: &str, candidates: I) -> CandidateSet
where
    I: IntoIterator<Item = Candidate>,
{
    let required = placeholders(seed_prompt);
    candidates
        .into_iter()
        .filter(|c| {
            let keep = covers(&c.prompt, &required);
            if !keep {
                tracing::warn!(
                    round = c.round,
                    "discarding candidate missing seed placeholders"
                );
            }
            keep
        })
        .collect()
}
