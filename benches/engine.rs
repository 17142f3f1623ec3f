//! Engine benchmarks
//!
//! Run with: cargo bench --bench engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tolstack::core::analyzer::{summarize, SummaryRequest};
use tolstack::core::chain::{Chain, ChainKind, Contributor, Direction, Phase, Placement};
use tolstack::core::distribution::{Bounds, Distribution, Normal, SkewedNormal, TruncationPolicy, Uniform};
use tolstack::core::engine::{Engine, RunConfig};

fn linear_chain() -> Chain {
    let policy = TruncationPolicy::default();
    let mut chain = Chain::new(ChainKind::Linear);
    let parts: [(&str, Distribution, Direction); 4] = [
        ("Housing", Normal::new(10.0, 0.1).unwrap().into(), Direction::Positive),
        ("Shaft", Uniform::centered(5.0, 0.05).unwrap().into(), Direction::Negative),
        (
            "Spacer",
            Normal::truncated(2.0, 0.02, Bounds::new(1.96, 2.05), &policy).unwrap().into(),
            Direction::Negative,
        ),
        (
            "Bushing",
            SkewedNormal::new(1.0, 0.01, 3.0).unwrap().into(),
            Direction::Negative,
        ),
    ];
    for (label, dist, dir) in parts {
        chain
            .add_contributor(Contributor::new(label, dist, Placement::Linear(dir)).unwrap())
            .unwrap();
    }
    chain
}

fn radial_chain() -> Chain {
    let mut chain = Chain::new(ChainKind::Radial);
    for (label, mean) in [("Bearing", 0.01), ("Housing", 0.02), ("Shaft", 0.005)] {
        chain
            .add_contributor(
                Contributor::new(
                    label,
                    Normal::new(mean, mean / 3.0).unwrap().into(),
                    Placement::Radial(Phase::Random),
                )
                .unwrap(),
            )
            .unwrap();
    }
    chain
}

fn bench_workers(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_linear");
    group.sample_size(20);
    let chain = linear_chain();

    for workers in [1usize, 2, 4, 8] {
        let engine = Engine::new(RunConfig {
            workers,
            ..RunConfig::default()
        });
        group.bench_with_input(BenchmarkId::new("workers", workers), &workers, |b, _| {
            b.iter(|| black_box(engine.run(&chain, 200_000, Some(42)).unwrap()));
        });
    }
    group.finish();
}

fn bench_radial(c: &mut Criterion) {
    let chain = radial_chain();
    let engine = Engine::new(RunConfig::default());
    c.bench_function("engine_radial_100k", |b| {
        b.iter(|| black_box(engine.run(&chain, 100_000, Some(7)).unwrap()));
    });
}

fn bench_summary(c: &mut Criterion) {
    let population = Engine::new(RunConfig::default())
        .run(&linear_chain(), 100_000, Some(1))
        .unwrap();
    let request = SummaryRequest::default();
    c.bench_function("summarize_100k", |b| {
        b.iter(|| black_box(summarize(&population, &request).unwrap()));
    });
}

criterion_group!(benches, bench_workers, bench_radial, bench_summary);
criterion_main!(benches);
