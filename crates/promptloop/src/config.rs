// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Loop configuration.
//!
//! Everything the loop needs is passed in explicitly; nothing is read from
//! process-wide state. Configuration can be built in code or loaded from
//! YAML.
//!
//! ```yaml
//! optimizer:
//!   step_num: 5
//!   adopt_policy: keep_best
//!   output_dir: runs
//! templates:
//!   guide: prompts/guide.txt
//! ```

use crate::error::{Error, Result};
use crate::sampling::DEFAULT_SEED;
use crate::templates::PromptTemplates;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What the critic loop does with a round's new prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdoptPolicy {
    /// Adopt every new prompt, even when its score regressed.
    #[default]
    Always,
    /// Keep the best-scoring prompt seen so far active.
    KeepBest,
}

/// Optimization loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Critic rounds after the seed round
    pub step_num: u32,
    /// Rater rounds after the seed round
    pub epoch: u32,
    /// Failing rows sampled per label for the critic
    pub errors_per_label: usize,
    /// Seed for failure sampling
    pub sample_seed: u64,
    /// Regression handling in the critic loop
    pub adopt_policy: AdoptPolicy,
    /// Maximum in-flight executor calls while scoring
    pub concurrency: usize,
    /// Generator rewrites requested in the rater seed round
    pub candidates: usize,
    /// Ledger entries shown to the critic
    pub history_window: usize,
    /// Where each round's scored dataset is written, if anywhere
    pub output_dir: Option<PathBuf>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            step_num: 3,
            epoch: 3,
            errors_per_label: 5,
            sample_seed: DEFAULT_SEED,
            adopt_policy: AdoptPolicy::Always,
            concurrency: 1,
            candidates: 2,
            history_window: 3,
            output_dir: None,
        }
    }
}

impl OptimizerConfig {
    /// Set the number of critic rounds.
    pub const fn with_step_num(mut self, n: u32) -> Self {
        self.step_num = n;
        self
    }

    /// Set the number of rater rounds.
    pub const fn with_epoch(mut self, n: u32) -> Self {
        self.epoch = n;
        self
    }

    /// Set the failure-sampling seed.
    pub const fn with_sample_seed(mut self, seed: u64) -> Self {
        self.sample_seed = seed;
        self
    }

    /// Set the regression policy.
    pub const fn with_adopt_policy(mut self, policy: AdoptPolicy) -> Self {
        self.adopt_policy = policy;
        self
    }

    /// Set the scoring concurrency.
    pub const fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n;
        self
    }

    /// Set the rater seed-round breadth.
    pub const fn with_candidates(mut self, n: usize) -> Self {
        self.candidates = n;
        self
    }

    /// Persist scored datasets into `dir`.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Reject settings the loops cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.candidates == 0 {
            return Err(Error::config("candidates must be at least 1"));
        }
        if self.history_window == 0 {
            return Err(Error::config("history_window must be at least 1"));
        }
        Ok(())
    }
}

/// Template override files. Unset entries keep the built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateFiles {
    /// Prompt-writing guide
    pub guide: Option<PathBuf>,
    /// Generator rewrite
    pub rewrite: Option<PathBuf>,
    /// Generator rewrite with example
    pub rewrite_with_example: Option<PathBuf>,
    /// Critic error analysis
    pub error_analysis: Option<PathBuf>,
    /// Critic rewrite step
    pub step: Option<PathBuf>,
    /// Meta-prompt
    pub metaprompt: Option<PathBuf>,
    /// Judge
    pub judge: Option<PathBuf>,
}

impl TemplateFiles {
    /// Read every configured file over the defaults.
    ///
    /// Relative paths resolve against `base_dir`.
    pub fn load(&self, base_dir: &Path) -> Result<PromptTemplates> {
        let mut templates = PromptTemplates::default();
        let slots: [(&Option<PathBuf>, &mut String); 7] = [
            (&self.guide, &mut templates.guide),
            (&self.rewrite, &mut templates.rewrite),
            (&self.rewrite_with_example, &mut templates.rewrite_with_example),
            (&self.error_analysis, &mut templates.error_analysis),
            (&self.step, &mut templates.step),
            (&self.metaprompt, &mut templates.metaprompt),
            (&self.judge, &mut templates.judge),
        ];
        for (path, slot) in slots {
            if let Some(path) = path {
                let full = base_dir.join(path);
                *slot = std::fs::read_to_string(&full).map_err(|e| {
                    Error::config(format!("cannot read template {}: {}", full.display(), e))
                })?;
            }
        }
        Ok(templates)
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Loop settings
    pub optimizer: OptimizerConfig,
    /// Template overrides
    pub templates: TemplateFiles,
}

impl Config {
    /// Reject settings the loops cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.optimizer.validate()
    }
}
