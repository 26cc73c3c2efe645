// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Benchmarks for the per-row and per-candidate text paths

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use promptloop::candidate::{filter_valid, Candidate, Origin};
use promptloop::placeholder::render;
use promptloop::{score, tags, ConfusionMatrix, Dataset, Row};

fn scored_dataset(n: usize) -> Dataset {
    let labels = ["A", "B", "C"];
    Dataset::from_rows(
        (0..n)
            .map(|i| {
                let mut row = Row::new(labels[i % 3]).with_field("text", format!("review {}", i));
                row.predict = Some(labels[(i * 7) % 3].to_string());
                row
            })
            .collect(),
    )
}

fn benchmark_tag_extraction(c: &mut Criterion) {
    let response = format!(
        "{}<analysis>\n  The prompt confuses neutral and negative reviews.\n</analysis>{}",
        "preamble ".repeat(50),
        " trailing".repeat(50)
    );
    c.bench_function("tags_extract_strip", |b| {
        b.iter(|| tags::extract(black_box("analysis"), black_box(&response), true))
    });
    c.bench_function("tags_remove_empty", |b| {
        b.iter(|| tags::remove_empty(black_box("<a></a> keep <b>\n</b> <c>x</c>")))
    });
}

fn benchmark_render(c: &mut Criterion) {
    let template = "Classify {text} from {source} into {labels}. Text again: {text}";
    c.bench_function("placeholder_render", |b| {
        b.iter(|| {
            render(
                black_box(template),
                [("text", "great film"), ("source", "imdb"), ("labels", "A, B")],
            )
        })
    });
}

fn benchmark_filter_valid(c: &mut Criterion) {
    let seed = "Summarize {text} for <<AUDIENCE>> in {lang}";
    c.bench_function("filter_valid_16", |b| {
        b.iter(|| {
            let candidates = (0..16).map(|i| {
                let prompt = if i % 2 == 0 {
                    format!("Rewrite {}: {{text}} <<AUDIENCE>> {{lang}}", i)
                } else {
                    format!("Rewrite {}: {{text}}", i)
                };
                Candidate::new(prompt, 1, Origin::Generator)
            });
            filter_valid(black_box(seed), candidates)
        })
    });
}

fn benchmark_scoring(c: &mut Criterion) {
    let dataset = scored_dataset(1000);
    c.bench_function("score_1000", |b| b.iter(|| score(black_box(&dataset))));
    c.bench_function("confusion_matrix_1000", |b| {
        b.iter(|| ConfusionMatrix::from_dataset(black_box(&dataset)))
    });
}

criterion_group!(
    benches,
    benchmark_tag_extraction,
    benchmark_render,
    benchmark_filter_valid,
    benchmark_scoring
);
criterion_main!(benches);
