//! Benchmarks for clustering and pulse assembly.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use reviewpulse::{
    DensityClusterer, EmbeddingError, Metric, OfflineGenerator, PatternScrubber, Pipeline,
    PulseAssembler, PulseConfig, Quote, ReportWindow, Review, SummarizedTheme, Theme, ThemeId,
};

const DIM: usize = 32;

/// Points scattered around `topics` well-separated centers.
fn sample_points(n: usize, topics: usize) -> Vec<Vec<f32>> {
    (0..n)
        .map(|i| {
            let topic = i % topics;
            (0..DIM)
                .map(|d| {
                    let center = if d == topic % DIM { 10.0 } else { 0.0 };
                    // Deterministic jitter in [-0.5, 0.5)
                    let jitter = ((i * 31 + d * 17) % 100) as f32 / 100.0 - 0.5;
                    center + jitter
                })
                .collect()
        })
        .collect()
}

fn bench_clustering(c: &mut Criterion) {
    let mut group = c.benchmark_group("hdbscan");

    for n in [100, 400, 1_000] {
        let points = sample_points(n, 5);
        let clusterer = DensityClusterer::new(15, 5);

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("euclidean", n), &points, |b, points| {
            b.iter(|| clusterer.cluster(black_box(points)))
        });
    }

    let points = sample_points(400, 5);
    let cosine = DensityClusterer::new(15, 5).with_metric(Metric::Cosine);
    group.bench_function("cosine/400", |b| b.iter(|| cosine.cluster(black_box(&points))));

    group.finish();
}

fn bench_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("assemble");
    let window = ReportWindow::week_ending("Acme", NaiveDate::from_ymd_opt(2024, 6, 9).unwrap());
    let actions = vec![
        "Add a progress tracker to the KYC upload flow".to_string(),
        "Show an ETA on every pending withdrawal".to_string(),
        "Fix the login crash on Android 14 devices".to_string(),
    ];

    for summary_words in [10, 40] {
        let themes: Vec<SummarizedTheme> = (0..5)
            .map(|i| SummarizedTheme {
                theme: Theme {
                    id: ThemeId::Cluster(i),
                    name: format!("Theme {i}"),
                    description: String::new(),
                    size: 50 - i,
                    member_review_ids: BTreeSet::new(),
                    merged_from: Vec::new(),
                },
                summary: format!("{}. Then some more detail.", vec!["word"; summary_words].join(" ")),
            })
            .collect();
        let quotes: Vec<Quote> = (0..15)
            .map(|i| Quote {
                text: "Still waiting on support after a whole week".to_string(),
                confidence: 1.0,
                source_id: format!("q{i}"),
                theme: format!("Theme {}", i % 5),
                theme_id: ThemeId::Cluster(i % 5),
            })
            .collect();
        let assembler = PulseAssembler::new(250);

        group.bench_function(BenchmarkId::new("five_themes", summary_words), |b| {
            b.iter(|| assembler.assemble(black_box(&themes), &quotes, &actions, &window, 500))
        });
    }

    group.finish();
}

fn bench_offline_run(c: &mut Criterion) {
    let points = sample_points(300, 4);
    let embedder = move |texts: &[&str]| -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(points.iter().take(texts.len()).cloned().collect())
    };
    let reviews: Vec<Review> = (0..300)
        .map(|i| Review::new(format!("r{i}"), format!("review number {i} about topic {}", i % 4)))
        .collect();
    let scrubber = PatternScrubber::new();
    let window = ReportWindow::week_ending("Acme", NaiveDate::from_ymd_opt(2024, 6, 9).unwrap());

    let Ok(pipeline) = Pipeline::new(PulseConfig::default(), &embedder, &OfflineGenerator, &scrubber)
    else {
        return;
    };
    c.bench_function("pipeline/offline_300", |b| {
        b.iter(|| pipeline.run(black_box(&reviews), &window))
    });
}

criterion_group!(benches, bench_clustering, bench_assembly, bench_offline_run);
criterion_main!(benches);
