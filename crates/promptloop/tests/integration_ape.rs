// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! End-to-end tests for the generator-and-rater loop.

use promptloop::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

fn demo() -> DemoData {
    let mut demo = DemoData::new();
    demo.insert("text".to_string(), "The plot dragged but the acting was superb.".to_string());
    demo
}

fn refiner<O: Oracle, R: Rater>(oracle: O, rater: R, epoch: u32) -> RaterRefiner<O, R> {
    RaterRefiner::new(
        oracle,
        Arc::new(PromptTemplates::default()),
        rater,
        demo(),
        &OptimizerConfig::default().with_epoch(epoch),
    )
}

/// Rewrites are numbered; the rater always prefers the newest.
#[tokio::test]
async fn test_winner_follows_rater_each_epoch() {
    let counter = AtomicU32::new(0);
    let oracle = MockOracle::new(move |_| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        format!("<instruction>Rewrite {} of {{text}}</instruction>", n)
    });
    let rater = FnRater::new(|_: &str, c: &CandidateSet, _: &DemoData| c.len() - 1);

    let result = OptimizationLoop::new(refiner(&oracle, rater, 3))
        .run("Summarize {text}")
        .await
        .unwrap();

    // 2 seed rewrites + 1 per epoch
    assert_eq!(oracle.calls(), 5);
    assert_eq!(result.prompt, "Rewrite 4 of {text}");
    assert_eq!(result.rounds, 3);
}

/// Preferring the incumbent keeps the first winner for every epoch.
#[tokio::test]
async fn test_incumbent_can_survive() {
    let counter = AtomicU32::new(0);
    let oracle = MockOracle::new(move |_| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        format!("Rewrite {} of {{text}}", n)
    });
    let rater = FnRater::new(|_: &str, _: &CandidateSet, _: &DemoData| 0);

    let mut optimizer = OptimizationLoop::new(refiner(&oracle, rater, 2));
    let result = optimizer.run("Summarize {text}").await.unwrap();
    assert_eq!(result.prompt, "Rewrite 0 of {text}");
    assert_eq!(optimizer.refiner().winner().map(|c| c.round), Some(0));
}

/// Epoch rewrites are conditioned on the seed and the current winner.
#[tokio::test]
async fn test_epoch_rewrite_sees_winner() {
    let oracle = MockOracle::new(|req| {
        let prompt = req.last_user().unwrap_or_default();
        if prompt.contains("<example>\nFirst {text}\n</example>") {
            assert!(prompt.contains("<instruction>\nSummarize {text}\n</instruction>"));
            "Second {text}".to_string()
        } else {
            "First {text}".to_string()
        }
    });
    let result = OptimizationLoop::new(refiner(&oracle, promptloop::rater::prefer_last(), 1))
        .run("Summarize {text}")
        .await
        .unwrap();
    assert_eq!(result.prompt, "Second {text}");
}

/// Candidates that drop a seed placeholder never reach the rater.
#[tokio::test]
async fn test_invalid_candidates_filtered_before_rating() {
    let counter = AtomicU32::new(0);
    let oracle = MockOracle::new(move |_| {
        match counter.fetch_add(1, Ordering::SeqCst) {
            0 => "Summarize the text".to_string(),
            _ => "Summarize {text} for <<AUDIENCE>>".to_string(),
        }
    });
    let rater = FnRater::new(|_: &str, c: &CandidateSet, _: &DemoData| {
        assert!(c.iter().all(|cand| cand.prompt.contains("{text}")));
        0
    });
    let result = OptimizationLoop::new(refiner(&oracle, rater, 0))
        .run("Summarize {text} for <<AUDIENCE>>")
        .await
        .unwrap();
    assert_eq!(result.prompt, "Summarize {text} for <<AUDIENCE>>");
}

/// When every seed candidate is invalid the run fails before rating.
#[tokio::test]
async fn test_empty_candidate_set() {
    let oracle = MockOracle::new(|_| "A rewrite that forgot the slot".to_string());
    let rated = Arc::new(AtomicU32::new(0));
    let seen = rated.clone();
    let rater = FnRater::new(move |_: &str, _: &CandidateSet, _: &DemoData| {
        seen.fetch_add(1, Ordering::SeqCst);
        0
    });

    let err = OptimizationLoop::new(refiner(&oracle, rater, 3))
        .run("Translate {text}")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::EmptyCandidateSet));
    assert_eq!(rated.load(Ordering::SeqCst), 0);
}

/// The judge rater runs candidates on the demo input and reads `<best>`.
#[tokio::test]
async fn test_judge_rater_end_to_end() {
    let oracle = MockOracle::new(|req| match req.tier {
        ModelTier::Strong if req.last_user().unwrap_or_default().contains("<best></best>") => {
            "<best>0</best>".to_string()
        }
        ModelTier::Strong => "Summarize {text} briefly".to_string(),
        ModelTier::Fast => "summary".to_string(),
    });
    let judge = JudgeRater::new(&oracle, Arc::new(PromptTemplates::default()));
    let result = OptimizationLoop::new(refiner(&oracle, judge, 1))
        .run("Summarize {text}")
        .await
        .unwrap();
    assert_eq!(result.prompt, "Summarize {text} briefly");

    // 2 rewrites, 2 executions, 1 judgement; then 1 rewrite, 2 executions, 1 judgement
    assert_eq!(oracle.calls(), 9);
}
