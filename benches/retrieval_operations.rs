//! Benchmarks for the retrieval stage
//!
//! HNSW construction and query latency over random vectors, with the
//! `ef_search` recall/latency knob varied.
//!
//! Run with: cargo bench --bench retrieval_operations

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kmervec::config::IndexConfig;
use kmervec::HnswIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DIM: usize = 64;

fn random_vectors(count: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..DIM).map(|_| rng.random_range(-1.0f32..1.0)).collect())
        .collect()
}

fn build(vectors: &[Vec<f32>], config: IndexConfig) -> HnswIndex {
    HnswIndex::build(
        DIM,
        config,
        vectors.iter().enumerate().map(|(i, v)| (i.to_string(), v.as_slice())),
    )
    .unwrap()
}

/// Benchmark index construction across corpus sizes
fn bench_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("hnsw_build");
    group.sample_size(10);

    for size in [1_000, 5_000].iter() {
        let vectors = random_vectors(*size, 1);
        let config = IndexConfig {
            m: 16,
            ef_construction: 100,
            ..Default::default()
        };
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &vectors, |b, vectors| {
            b.iter(|| build(black_box(vectors), config.clone()))
        });
    }

    group.finish();
}

/// Benchmark single queries across ef_search values
fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("hnsw_search");

    let vectors = random_vectors(10_000, 2);
    let queries = random_vectors(100, 3);
    let mut index = build(
        &vectors,
        IndexConfig {
            m: 16,
            ef_construction: 100,
            ..Default::default()
        },
    );

    for ef in [20, 100, 500].iter() {
        index.set_ef_search(*ef).unwrap();
        let index = &index;
        group.throughput(Throughput::Elements(queries.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(format!("ef={}", ef)), ef, |b, _| {
            b.iter(|| {
                for query in &queries {
                    black_box(index.search(query, 20).unwrap());
                }
            })
        });
    }

    group.finish();
}

/// Benchmark parallel batch queries
fn bench_search_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("hnsw_search_batch");

    let vectors = random_vectors(10_000, 4);
    let queries = random_vectors(1_000, 5);
    let index = build(
        &vectors,
        IndexConfig {
            m: 16,
            ef_construction: 100,
            ef_search: 100,
            ..Default::default()
        },
    );

    group.throughput(Throughput::Elements(queries.len() as u64));
    group.bench_function("k=20", |b| b.iter(|| index.search_batch(black_box(&queries), 20)));

    group.finish();
}

criterion_group!(benches, bench_index_build, bench_search, bench_search_batch);
criterion_main!(benches);
