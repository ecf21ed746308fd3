use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use smc_signals::utils::config::PolicyConfig;
use smc_signals::{
    Bar, FeatureAssembler, FeatureEngine, FeatureSet, FeatureSetVersion, OhlcvSeries,
    PolicyEvaluator,
};

fn synthetic_series(n: usize) -> OhlcvSeries {
    let bars = (0..n)
        .map(|i| {
            let drift = i as f64 * 0.05;
            let wave = (i as f64 * 0.3).sin() * 2.0;
            let open = 100.0 + drift + wave;
            let close = open + (i as f64 * 0.7).cos();
            let high = open.max(close) + 0.5;
            let low = open.min(close) - 0.5;
            let volume = 1_000.0 + ((i * 37) % 500) as f64;
            Bar::new(Utc.timestamp_opt(i as i64 * 300, 0).unwrap(), open, high, low, close, volume)
        })
        .collect();
    OhlcvSeries::new(bars).unwrap()
}

/// Full enrichment dominates a deep query; the volume profile is per bar
fn bench_enrich(c: &mut Criterion) {
    let engine = FeatureEngine::default();
    let mut group = c.benchmark_group("enrich");

    for bars in [100, 500, 2_000] {
        let series = synthetic_series(bars);
        group.bench_with_input(BenchmarkId::from_parameter(bars), &series, |b, series| {
            b.iter(|| engine.enrich(black_box(series)).unwrap());
        });
    }

    group.finish();
}

fn bench_feature_vector(c: &mut Criterion) {
    let engine = FeatureEngine::default();
    let series = synthetic_series(500);

    for version in [FeatureSetVersion::SmcV12, FeatureSetVersion::LightV6] {
        let assembler = FeatureAssembler::new(FeatureSet::standard(version));
        c.bench_function(&format!("feature_vector_{}", version), |b| {
            b.iter(|| engine.feature_vector(black_box(&series), &assembler).unwrap());
        });
    }
}

fn bench_fallback_decision(c: &mut Criterion) {
    let set = FeatureSet::standard(FeatureSetVersion::SmcV12);
    let evaluator = PolicyEvaluator::unloaded(&PolicyConfig::default(), set.anchors(), "bench");
    let vector = vec![100.0, 55.0, 0.3, 1.2, 0.0, 0.0, 1.0, 0.2, 0.1, -0.4, 0.9, 0.5];

    c.bench_function("fallback_decision", |b| {
        b.iter(|| evaluator.evaluate(black_box(&vector)).unwrap());
    });
}

criterion_group!(benches, bench_enrich, bench_feature_vector, bench_fallback_decision);
criterion_main!(benches);
