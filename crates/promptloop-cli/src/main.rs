// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Promptloop CLI tool

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use promptloop::prelude::*;
use promptloop::{Config, OptimizerConfig};
use promptloop_client::{LMClient, LMConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "promptloop")]
#[command(about = "Closed-loop prompt optimization", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory for predictions and results
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a prompt over a labeled dataset and save predictions
    Predict {
        /// Prompt file
        #[arg(short, long)]
        prompt: PathBuf,

        /// Labeled CSV dataset
        #[arg(short, long)]
        dataset: PathBuf,

        /// Post-processing step applied to raw answers
        #[arg(long, default_value = "trim")]
        postprocess: String,

        /// Rows executed concurrently
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Refine a prompt by analyzing its failures on a dataset
    Calibrate {
        /// Seed prompt file
        #[arg(short, long)]
        prompt: PathBuf,

        /// Labeled CSV dataset
        #[arg(short, long)]
        dataset: PathBuf,

        /// Task description given to the critic
        #[arg(short, long)]
        task: String,

        /// Post-processing step applied to raw answers
        #[arg(long, default_value = "trim")]
        postprocess: String,

        /// Refinement rounds
        #[arg(long)]
        steps: Option<u32>,

        /// What to do when a rewrite scores lower
        #[arg(long, value_enum)]
        adopt: Option<Adopt>,

        /// Rows executed concurrently
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Generate rewrites and keep the one a judge prefers
    Ape {
        /// Seed prompt file
        #[arg(short, long)]
        prompt: PathBuf,

        /// Demo inputs as name=value
        #[arg(long = "demo", value_parser = parse_demo, required = true)]
        demo: Vec<(String, String)>,

        /// Refinement rounds
        #[arg(long)]
        epochs: Option<u32>,

        /// Rewrites generated in the first round
        #[arg(long)]
        candidates: Option<usize>,
    },

    /// Draft a prompt template from a task description
    Metaprompt {
        /// Task to draft a prompt for
        #[arg(short, long)]
        task: String,

        /// Input variable names
        #[arg(long = "var")]
        variables: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Adopt {
    Always,
    KeepBest,
}

impl From<Adopt> for AdoptPolicy {
    fn from(adopt: Adopt) -> Self {
        match adopt {
            Adopt::Always => AdoptPolicy::Always,
            Adopt::KeepBest => AdoptPolicy::KeepBest,
        }
    }
}

/// Configuration file layout: the library config plus an `lm` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    #[serde(flatten)]
    core: Config,
    lm: LMConfig,
}

/// Everything a command needs after file values and flags are merged.
struct Settings {
    optimizer: OptimizerConfig,
    templates: Arc<PromptTemplates>,
    lm: LMConfig,
}

impl Settings {
    fn load(config: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = config else {
            return Ok(Self {
                optimizer: OptimizerConfig::default(),
                templates: Arc::new(PromptTemplates::default()),
                lm: LMConfig::default(),
            });
        };

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        let file: FileConfig = serde_yaml::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        file.core.validate()?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(Self {
            templates: Arc::new(file.core.templates.load(base)?),
            optimizer: file.core.optimizer,
            lm: file.lm,
        })
    }
}

fn calibrate_config(
    base: OptimizerConfig,
    steps: Option<u32>,
    adopt: Option<Adopt>,
    concurrency: Option<usize>,
) -> promptloop::Result<OptimizerConfig> {
    let mut config = base;
    if let Some(steps) = steps {
        config = config.with_step_num(steps);
    }
    if let Some(adopt) = adopt {
        config = config.with_adopt_policy(adopt.into());
    }
    if let Some(n) = concurrency {
        config = config.with_concurrency(n);
    }
    config.validate()?;
    Ok(config)
}

fn ape_config(
    base: OptimizerConfig,
    epochs: Option<u32>,
    candidates: Option<usize>,
) -> promptloop::Result<OptimizerConfig> {
    let mut config = base;
    if let Some(epochs) = epochs {
        config = config.with_epoch(epochs);
    }
    if let Some(n) = candidates {
        config = config.with_candidates(n);
    }
    config.validate()?;
    Ok(config)
}

fn parse_demo(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected name=value, got `{}`", s)),
    }
}

fn read_prompt(path: &Path) -> anyhow::Result<String> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read prompt {}", path.display()))?;
    if text.trim().is_empty() {
        bail!("prompt file {} is empty", path.display());
    }
    Ok(text)
}

fn write_result(dir: Option<&Path>, name: &str, text: &str) -> anyhow::Result<()> {
    match dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let path = dir.join(name);
            std::fs::write(&path, text)?;
            info!(path = %path.display(), "result written");
        }
        None => println!("{}", text),
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.output_dir {
        settings.optimizer.output_dir = Some(dir.clone());
    }
    let output_dir = settings.optimizer.output_dir.clone();
    let registry = PostprocessRegistry::builtin();

    match cli.command {
        Commands::Predict {
            prompt,
            dataset,
            postprocess,
            concurrency,
        } => {
            let prompt = read_prompt(&prompt)?;
            let dataset = Dataset::from_path(&dataset)?;
            let concurrency = concurrency.unwrap_or(settings.optimizer.concurrency);
            let client =
                LMClient::from_env(settings.lm.with_max_concurrent(concurrency.max(1)))?;

            let scorer = Scorer::new(Executor::new(&client), registry.get(&postprocess)?)
                .with_concurrency(concurrency);
            let dir = output_dir.unwrap_or_else(|| PathBuf::from("."));
            let (scored, path) = scorer.predict(&prompt, &dataset, &dir).await?;
            println!("accuracy: {:.4}", promptloop::score(&scored));
            println!("predictions: {}", path.display());
        }

        Commands::Calibrate {
            prompt,
            dataset,
            task,
            postprocess,
            steps,
            adopt,
            concurrency,
        } => {
            let optimizer = calibrate_config(settings.optimizer, steps, adopt, concurrency)?;

            let seed = read_prompt(&prompt)?;
            let dataset = Dataset::from_path(&dataset)?;
            let client =
                LMClient::from_env(settings.lm.with_max_concurrent(optimizer.concurrency))?;
            let refiner = CriticRefiner::new(
                &client,
                settings.templates,
                dataset,
                task,
                registry.get(&postprocess)?,
                &optimizer,
            );

            let mut run = OptimizationLoop::new(refiner);
            let result = run.run(&seed).await?;
            for (round, entry) in run.refiner().ledger().entries().iter().enumerate() {
                println!("round {}: {:.4}", round, entry.score);
            }
            write_result(output_dir.as_deref(), "calibrated_prompt.txt", &result.prompt)?;
        }

        Commands::Ape {
            prompt,
            demo,
            epochs,
            candidates,
        } => {
            let optimizer = ape_config(settings.optimizer, epochs, candidates)?;

            let seed = read_prompt(&prompt)?;
            let client = LMClient::from_env(settings.lm)?;
            let judge = JudgeRater::new(&client, settings.templates.clone());
            let refiner = RaterRefiner::new(
                &client,
                settings.templates,
                judge,
                demo.into_iter().collect::<DemoData>(),
                &optimizer,
            );

            let result = OptimizationLoop::new(refiner).run(&seed).await?;
            write_result(output_dir.as_deref(), "ape_prompt.txt", &result.prompt)?;
        }

        Commands::Metaprompt { task, variables } => {
            let client = LMClient::from_env(settings.lm)?;
            let vars: Vec<&str> = variables.iter().map(String::as_str).collect();
            let drafted = promptloop::MetaPrompt::new(&client, settings.templates)
                .generate(&task, &vars)
                .await?;
            if !drafted.variables.is_empty() {
                info!(variables = ?drafted.variables, "template variables");
            }
            write_result(output_dir.as_deref(), "metaprompt.txt", &drafted.template)?;
        }
    }

    Ok(())
}
