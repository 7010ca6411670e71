//! Benchmarks for the embedding stage
//!
//! Covers graph construction, walk generation, skip-gram training and
//! segment pooling on synthetic sequences.
//!
//! Run with: cargo bench --bench embedding_operations

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kmervec::config::{TrainerConfig, WalkConfig};
use kmervec::{AliasSampler, ContextEmbeddingTrainer, KmerGraph, RandomWalkGenerator, SegmentPooler};

/// Deterministic pseudo-random DNA (xorshift)
fn generate_sequence(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed.max(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            [b'A', b'C', b'G', b'T'][(state % 4) as usize]
        })
        .collect()
}

/// Benchmark k-mer graph construction across k values
fn bench_graph_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_build");
    let sequences: Vec<Vec<u8>> = (0..10).map(|i| generate_sequence(10_000, i + 1)).collect();

    for k in [4, 6, 8].iter() {
        group.throughput(Throughput::Bytes(100_000));
        group.bench_with_input(BenchmarkId::from_parameter(format!("k={}", k)), k, |b, &k| {
            b.iter(|| KmerGraph::from_sequences(black_box(&sequences), k))
        });
    }

    group.finish();
}

/// Benchmark biased walks for increasing worker counts
fn bench_random_walks(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_walks");
    let graph = KmerGraph::from_sequences(&[generate_sequence(50_000, 7)], 6).unwrap();
    let sampler = AliasSampler::new(&graph, 1.0, 0.001).unwrap();

    for workers in [1, 4].iter() {
        let config = WalkConfig {
            num_walks: 2,
            walk_length: 50,
            workers: *workers,
            ..Default::default()
        };
        group.throughput(Throughput::Elements((2 * graph.node_count()) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("workers={}", workers)),
            &config,
            |b, config| {
                b.iter(|| {
                    RandomWalkGenerator::new(&sampler, config)
                        .unwrap()
                        .walks()
                        .map(|w| w.len())
                        .sum::<usize>()
                })
            },
        );
    }

    group.finish();
}

/// Benchmark skip-gram training on a fixed walk corpus
fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("skipgram_training");
    group.sample_size(10);

    let graph = KmerGraph::from_sequences(&[generate_sequence(20_000, 3)], 5).unwrap();
    let sampler = AliasSampler::new(&graph, 1.0, 0.5).unwrap();
    let walk_config = WalkConfig {
        num_walks: 2,
        walk_length: 40,
        workers: 1,
        ..Default::default()
    };
    let walks: Vec<Vec<&[u8]>> = RandomWalkGenerator::new(&sampler, &walk_config)
        .unwrap()
        .walks()
        .map(|w| w.into_iter().map(|n| graph.label(n)).collect())
        .collect();
    let tokens: usize = walks.iter().map(Vec::len).sum();

    for workers in [1, 4].iter() {
        let trainer = ContextEmbeddingTrainer::new(TrainerConfig {
            dimensions: 64,
            window: 5,
            workers: *workers,
            ..Default::default()
        })
        .unwrap();
        group.throughput(Throughput::Elements(tokens as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("workers={}", workers)),
            &trainer,
            |b, trainer| b.iter(|| trainer.train(walks.iter().map(|w| w.iter().copied()))),
        );
    }

    group.finish();
}

/// Benchmark mean pooling across segment lengths
fn bench_pooling(c: &mut Criterion) {
    let mut group = c.benchmark_group("segment_pooling");

    let corpus = generate_sequence(20_000, 11);
    let graph = KmerGraph::from_sequences(&[&corpus], 6).unwrap();
    let sampler = AliasSampler::new(&graph, 1.0, 1.0).unwrap();
    let walk_config = WalkConfig {
        num_walks: 1,
        walk_length: 20,
        workers: 4,
        ..Default::default()
    };
    let walks = RandomWalkGenerator::new(&sampler, &walk_config)
        .unwrap()
        .walks()
        .map(|w| w.into_iter().map(|n| graph.label(n).to_vec()).collect::<Vec<_>>());
    let table = ContextEmbeddingTrainer::new(TrainerConfig {
        dimensions: 64,
        ..Default::default()
    })
    .unwrap()
    .train(walks)
    .unwrap();
    let pooler = SegmentPooler::new(&table, 6).unwrap();

    for size in [100, 1_000, 10_000].iter() {
        let segment = &corpus[..*size];
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| pooler.pool(black_box(segment)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_graph_build,
    bench_random_walks,
    bench_training,
    bench_pooling
);
criterion_main!(benches);
