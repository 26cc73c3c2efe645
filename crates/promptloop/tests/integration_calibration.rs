// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! End-to-end tests for the critic-driven calibration loop.
//!
//! A scripted oracle plays all three roles:
//! - fast-tier requests carrying the analysis template get an `<analysis>`,
//! - other fast-tier requests are executor calls and get a label,
//! - strong-tier requests are critic rewrites and get a `<new_prompt>`.

use promptloop::prelude::*;
use promptloop::postprocess;
use std::sync::{Arc, Mutex};

fn four_rows() -> Dataset {
    Dataset::from_rows(vec![
        Row::new("A").with_field("text", "apple"),
        Row::new("B").with_field("text", "banana"),
        Row::new("A").with_field("text", "avocado"),
        Row::new("B").with_field("text", "blueberry"),
    ])
}

fn is_analysis(req: &CompletionRequest<'_>) -> bool {
    req.last_user()
        .unwrap_or_default()
        .contains("<analysis></analysis>")
}

/// The seed prompt answers correctly; any rewrite always answers "A".
fn executor_answer(req: &CompletionRequest<'_>) -> String {
    let prompt = req.last_user().unwrap_or_default();
    let word = prompt.rsplit(' ').next().unwrap_or_default();
    if prompt.starts_with("Classify:") {
        word.chars().next().map(|c| c.to_ascii_uppercase().to_string()).unwrap_or_default()
    } else {
        "A".to_string()
    }
}

fn scripted_oracle(
    rewrite: &'static str,
) -> MockOracle<impl Fn(&CompletionRequest<'_>) -> String + Send + Sync> {
    MockOracle::new(move |req| match req.tier {
        ModelTier::Strong => format!("Thoughts first.\n<new_prompt>{}</new_prompt>", rewrite),
        ModelTier::Fast if is_analysis(req) => {
            "<analysis>\nThe prompt gives no label definitions.\n</analysis>".to_string()
        }
        ModelTier::Fast => executor_answer(req),
    })
}

fn refiner<O: Oracle + Clone>(oracle: O, config: &OptimizerConfig) -> CriticRefiner<O> {
    CriticRefiner::new(
        oracle,
        Arc::new(PromptTemplates::default()),
        four_rows(),
        "Decide whether a fruit name starts with a or b",
        postprocess::identity(),
        config,
    )
}

/// One calibration round leaves the seed entry plus one refined entry.
#[tokio::test]
async fn test_single_round_records_seed_and_rewrite() {
    let oracle = scripted_oracle("Label {text} as A or B");
    let config = OptimizerConfig::default().with_step_num(1);
    let mut optimizer = OptimizationLoop::new(refiner(&oracle, &config));

    let result = optimizer.run("Classify: {text}").await.unwrap();

    assert_ne!(result.prompt, "Classify: {text}");
    assert_eq!(result.prompt, "Label {text} as A or B");
    assert_eq!(result.rounds, 1);

    let ledger = optimizer.refiner().ledger();
    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger.entries()[0].prompt, "Classify: {text}");
    assert_eq!(ledger.entries()[0].score, 1.0);
    assert!(ledger.entries()[0].failing_rows.is_empty());
    assert_eq!(ledger.entries()[1].score, 0.5);
    assert_eq!(ledger.entries()[1].failing_rows.len(), 2);
    assert_eq!(
        ledger.entries()[1].analysis,
        "The prompt gives no label definitions."
    );
}

/// Role routing: executor and analysis on the fast tier, rewrite on the strong tier.
#[tokio::test]
async fn test_tier_routing() {
    let oracle = scripted_oracle("Label {text}");
    let config = OptimizerConfig::default().with_step_num(1);
    OptimizationLoop::new(refiner(&oracle, &config))
        .run("Classify: {text}")
        .await
        .unwrap();

    // seed: 4 executions + 1 analysis; round: 1 rewrite + 4 executions + 1 analysis
    let tiers = oracle.tiers();
    assert_eq!(tiers.len(), 11);
    assert_eq!(tiers.iter().filter(|t| **t == ModelTier::Strong).count(), 1);
    assert_eq!(tiers[5], ModelTier::Strong);
}

/// The critic sees the ledger, the latest failures and the label set.
#[tokio::test]
async fn test_step_prompt_context() {
    let captured: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = captured.clone();
    let oracle = MockOracle::new(move |req| match req.tier {
        ModelTier::Strong => {
            sink.lock()
                .unwrap()
                .push(req.last_user().unwrap_or_default().to_string());
            "<new_prompt>Label {text}</new_prompt>".to_string()
        }
        ModelTier::Fast if is_analysis(req) => "<analysis>too terse</analysis>".to_string(),
        ModelTier::Fast => "A".to_string(),
    });

    let config = OptimizerConfig::default().with_step_num(2);
    OptimizationLoop::new(refiner(&oracle, &config))
        .run("Classify: {text}")
        .await
        .unwrap();

    let prompts = captured.lock().unwrap();
    assert_eq!(prompts.len(), 2);

    let first = &prompts[0];
    assert!(first.contains("<prompt_score>\n0.50\n</prompt_score>\n<prompt>\nClassify: {text}\n</prompt>"));
    assert!(first.contains("<analysis>\ntoo terse\n</analysis>"));
    assert!(first.contains("<GT>\nB\n</GT>"));
    assert!(first.contains(r#"["A","B"]"#));

    // second round sees both earlier attempts
    assert_eq!(prompts[1].matches("<prompt_score>").count(), 2);
}

/// A regressing round is still adopted by default.
#[tokio::test]
async fn test_always_policy_adopts_regression() {
    let oracle = scripted_oracle("Label {text}");
    let config = OptimizerConfig::default().with_step_num(1);
    let result = OptimizationLoop::new(refiner(&oracle, &config))
        .run("Classify: {text}")
        .await
        .unwrap();
    assert_eq!(result.prompt, "Label {text}");
}

/// KeepBest holds on to the best-scoring prompt.
#[tokio::test]
async fn test_keep_best_policy() {
    let oracle = scripted_oracle("Label {text}");
    let config = OptimizerConfig::default()
        .with_step_num(2)
        .with_adopt_policy(AdoptPolicy::KeepBest);
    let mut optimizer = OptimizationLoop::new(refiner(&oracle, &config));
    let result = optimizer.run("Classify: {text}").await.unwrap();

    assert_eq!(result.prompt, "Classify: {text}");
    assert_eq!(optimizer.refiner().ledger().len(), 3);
}

fn section<'a>(text: &'a str, open: &str, close: &str) -> &'a str {
    let start = text.find(open).map(|i| i + open.len()).unwrap_or_default();
    let len = text[start..].find(close).unwrap_or_default();
    &text[start..start + len]
}

/// The critic's analysis always belongs to the prompt it is asked to rewrite.
#[tokio::test]
async fn test_step_analysis_matches_active_prompt() {
    for policy in [AdoptPolicy::Always, AdoptPolicy::KeepBest] {
        let captured: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = captured.clone();
        let oracle = MockOracle::new(move |req| {
            let user = req.last_user().unwrap_or_default();
            match req.tier {
                ModelTier::Strong => {
                    sink.lock().unwrap().push(user.to_string());
                    "<new_prompt>Label {text}</new_prompt>".to_string()
                }
                ModelTier::Fast if is_analysis(req) => {
                    let analyzed = section(user, "Prompt under evaluation:\n<prompt>\n", "\n</prompt>");
                    format!("<analysis>ANALYSIS-OF[{}]</analysis>", analyzed)
                }
                ModelTier::Fast => executor_answer(req),
            }
        });

        let config = OptimizerConfig::default()
            .with_step_num(2)
            .with_adopt_policy(policy);
        OptimizationLoop::new(refiner(&oracle, &config))
            .run("Classify: {text}")
            .await
            .unwrap();

        let prompts = captured.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        for step in prompts.iter() {
            let current = section(step, "Current prompt:\n<prompt>\n", "\n</prompt>");
            let analysis = section(
                step,
                "Error analysis of the current prompt:\n<analysis>\n",
                "\n</analysis>",
            );
            assert_eq!(analysis, format!("ANALYSIS-OF[{}]", current), "{:?}", policy);
        }

        let second = section(&prompts[1], "Current prompt:\n<prompt>\n", "\n</prompt>");
        match policy {
            AdoptPolicy::Always => assert_eq!(second, "Label {text}"),
            AdoptPolicy::KeepBest => assert_eq!(second, "Classify: {text}"),
        }
    }
}

/// A missing `<new_prompt>` tag aborts the run with a protocol error.
#[tokio::test]
async fn test_missing_tag_is_fatal() {
    let oracle = MockOracle::new(|req| match req.tier {
        ModelTier::Strong => "Here is a better prompt: Label {text}".to_string(),
        ModelTier::Fast if is_analysis(req) => "<analysis>x</analysis>".to_string(),
        ModelTier::Fast => "A".to_string(),
    });
    let config = OptimizerConfig::default().with_step_num(3);
    let mut optimizer = OptimizationLoop::new(refiner(&oracle, &config));

    let err = optimizer.run("Classify: {text}").await.unwrap_err();
    assert!(err.is_protocol_error());
    assert!(matches!(err, Error::Protocol { ref tag, .. } if tag == "new_prompt"));
    assert_eq!(optimizer.refiner().ledger().len(), 1);
}

/// Oracle outages surface unchanged; nothing retries.
#[tokio::test]
async fn test_transient_failure_propagates() {
    let oracle = FailingOracle::transient("rate limited");
    let config = OptimizerConfig::default();
    let err = OptimizationLoop::new(refiner(&oracle, &config))
        .run("Classify: {text}")
        .await
        .unwrap_err();
    assert!(err.is_transient());
}

/// Every round's scored dataset is persisted when an output directory is set.
#[tokio::test]
async fn test_round_persistence() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = scripted_oracle("Label {text}");
    let config = OptimizerConfig::default()
        .with_step_num(1)
        .with_output_dir(dir.path());
    OptimizationLoop::new(refiner(&oracle, &config))
        .run("Classify: {text}")
        .await
        .unwrap();

    for round in ["round_0", "round_1"] {
        let files: Vec<_> = std::fs::read_dir(dir.path().join(round))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].starts_with("predict_"));

        let reloaded = Dataset::from_path(dir.path().join(round).join(&files[0])).unwrap();
        assert_eq!(reloaded.len(), 4);
        assert!(reloaded.iter().all(|r| r.predict.is_some()));
    }
}

/// Concurrent scoring gives the same ledger as sequential scoring.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_scoring_matches_sequential() {
    let sequential = {
        let oracle = scripted_oracle("Label {text}");
        let config = OptimizerConfig::default().with_step_num(1);
        let mut lp = OptimizationLoop::new(refiner(&oracle, &config));
        lp.run("Classify: {text}").await.unwrap();
        lp.into_refiner().into_ledger()
    };
    let concurrent = {
        let oracle = scripted_oracle("Label {text}");
        let config = OptimizerConfig::default().with_step_num(1).with_concurrency(4);
        let mut lp = OptimizationLoop::new(refiner(&oracle, &config));
        lp.run("Classify: {text}").await.unwrap();
        lp.into_refiner().into_ledger()
    };

    let scores = |l: &HistoryLedger| l.entries().iter().map(|e| e.score).collect::<Vec<_>>();
    assert_eq!(scores(&sequential), scores(&concurrent));
    assert_eq!(
        sequential.entries()[1].failure_cases,
        concurrent.entries()[1].failure_cases
    );
}
