// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! # Promptloop - Closed-Loop Prompt Optimization
//!
//! Iteratively improves a natural-language instruction for a text
//! classification task. Three oracle roles share one completion capability:
//!
//! - **Generator** rewrites instructions,
//! - **Executor** runs an instruction on one dataset row,
//! - **Critic** analyzes failures and proposes the next rewrite.
//!
//! Two strategies are available behind the same [`OptimizationLoop`]:
//! [`CriticRefiner`] scores every attempt on a labeled dataset and keeps a
//! [`HistoryLedger`]; [`RaterRefiner`] generates rewrites and lets a
//! [`Rater`] keep a single winner.
//!
//! ## Quick Start
//!
//! ```
//! use promptloop::prelude::*;
//! use std::sync::Arc;
//!
//! let oracle = MockOracle::new(|req| match req.tier {
//!     ModelTier::Strong => "<new_prompt>Label the review {text} as A or B</new_prompt>".into(),
//!     ModelTier::Fast if req.last_user().unwrap_or("").contains("<analysis></analysis>") => {
//!         "<analysis>answers are inconsistent</analysis>".into()
//!     }
//!     ModelTier::Fast => "A".into(),
//! });
//!
//! let dataset = Dataset::from_rows(vec![
//!     Row::new("A").with_field("text", "loved it"),
//!     Row::new("B").with_field("text", "hated it"),
//! ]);
//! let config = OptimizerConfig::default().with_step_num(1);
//! let refiner = CriticRefiner::new(
//!     &oracle,
//!     Arc::new(PromptTemplates::default()),
//!     dataset,
//!     "review sentiment",
//!     PostprocessRegistry::builtin().get("trim").unwrap(),
//!     &config,
//! );
//!
//! let mut optimizer = OptimizationLoop::new(refiner);
//! let result = optimizer.go("Classify: {text}").unwrap();
//! assert_eq!(result.prompt, "Label the review {text} as A or B");
//! assert_eq!(optimizer.refiner().ledger().len(), 2);
//! ```

#![warn(missing_docs)]
#![allow(clippy::too_many_arguments)]

pub mod candidate;
pub mod config;
pub mod dataset;
pub mod error;
pub mod history;
pub mod metaprompt;
pub mod optimizer;
pub mod oracle;
pub mod placeholder;
pub mod postprocess;
pub mod rater;
pub mod refiner;
pub mod roles;
pub mod sampling;
pub mod scorer;
pub mod tags;
pub mod templates;

pub use candidate::{filter_valid, Candidate, CandidateSet, Origin};
pub use config::{AdoptPolicy, Config, OptimizerConfig, TemplateFiles};
pub use dataset::{labels_match, normalize_label, Dataset, Row};
pub use error::{Error, Result};
pub use history::{ConfusionMatrix, HistoryEntry, HistoryLedger};
pub use metaprompt::{DraftedPrompt, MetaPrompt};
pub use optimizer::{OptimizationLoop, Optimized};
pub use oracle::{
    CompletionRequest, FailingOracle, Message, MockOracle, ModelTier, Oracle, Role,
};
pub use placeholder::{Placeholder, PlaceholderStyle};
pub use postprocess::{Postprocess, PostprocessRegistry};
pub use rater::{DemoData, FnRater, JudgeRater, Rater};
pub use refiner::{CriticRefiner, RaterRefiner, Refiner};
pub use roles::{Critic, Executor, Generator};
pub use sampling::Rng;
pub use scorer::{extract_errors, score, Scorer};
pub use templates::PromptTemplates;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    // Error handling
    pub use crate::{Error, Result};

    // Oracle and roles
    pub use crate::{
        CompletionRequest, Critic, Executor, FailingOracle, Generator, Message, MockOracle,
        ModelTier, Oracle,
    };

    // Data
    pub use crate::{Candidate, CandidateSet, Dataset, Row};

    // Loop
    pub use crate::{
        AdoptPolicy, CriticRefiner, DemoData, FnRater, HistoryLedger, JudgeRater,
        OptimizationLoop, OptimizerConfig, PostprocessRegistry, PromptTemplates, RaterRefiner,
        Rater, Refiner, Scorer,
    };
}
