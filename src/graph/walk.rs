//! Biased random walk generation
//!
//! The generator runs `num_walks` rounds; each round visits every start node
//! once, in an order shuffled per round. Each walk draws from its own RNG,
//! seeded from `(seed, round, start node)`, so the produced walks do not
//! depend on the number of workers.
//!
//! [`Walks`] is lazy and single-pass: walks are generated in batches on a
//! bounded rayon pool as the consumer pulls them, and once a walk has been
//! yielded it is gone. Generating the same walks again means building a new
//! generator with the same seed.

use crate::config::WalkConfig;
use crate::error::{KmervecError, Result};
use crate::graph::alias::AliasSampler;
use crate::graph::builder::NodeId;
use crate::rng::derive_seed;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use std::collections::VecDeque;
use tracing::{debug, info};

/// A walk: node ids in visiting order, start node first
pub type Walk = Vec<NodeId>;

/// Walks generated per parallel batch
const DEFAULT_BATCH_SIZE: usize = 4096;

/// Configured walk generator
///
/// # Examples
///
/// ```
/// use kmervec::config::WalkConfig;
/// use kmervec::graph::{AliasSampler, KmerGraph, RandomWalkGenerator};
///
/// let graph = KmerGraph::from_sequences(&[b"ACGTACGTTGCA".as_ref()], 3)?;
/// let sampler = AliasSampler::new(&graph, 1.0, 0.5)?;
/// let config = WalkConfig { num_walks: 2, walk_length: 5, workers: 1, ..Default::default() };
/// let walks: Vec<_> = RandomWalkGenerator::new(&sampler, &config)?.walks().collect();
/// assert_eq!(walks.len(), 2 * graph.node_count());
/// # Ok::<(), kmervec::KmervecError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RandomWalkGenerator<'s, 'g> {
    sampler: &'s AliasSampler<'g>,
    num_walks: usize,
    walk_length: usize,
    starts: Vec<NodeId>,
    seed: u64,
    workers: usize,
    batch_size: usize,
}

impl<'s, 'g> RandomWalkGenerator<'s, 'g> {
    /// Create a generator starting from every node of the sampler's graph
    pub fn new(sampler: &'s AliasSampler<'g>, config: &WalkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            sampler,
            num_walks: config.num_walks,
            walk_length: config.walk_length,
            starts: sampler.graph().nodes().collect(),
            seed: config.seed,
            workers: config.workers,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Restrict walks to the given start nodes
    pub fn with_start_nodes(mut self, starts: Vec<NodeId>) -> Result<Self> {
        let nodes = self.sampler.graph().node_count();
        if let Some(&bad) = starts.iter().find(|&&n| n as usize >= nodes) {
            return Err(KmervecError::invalid(
                "start_nodes",
                format!("node {} is not in a graph of {} nodes", bad, nodes),
            ));
        }
        self.starts = starts;
        Ok(self)
    }

    /// Change how many walks are generated per parallel batch
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Total number of walks that [`RandomWalkGenerator::walks`] will yield
    pub fn total_walks(&self) -> usize {
        self.num_walks * self.starts.len()
    }

    /// Generate the single walk for `start` in `round`
    ///
    /// This is exactly the walk the iterator yields for that coordinate.
    pub fn walk(&self, round: usize, start: NodeId) -> Walk {
        let mut rng = StdRng::seed_from_u64(derive_seed(self.seed, &[round as u64, u64::from(start)]));
        let mut walk = Vec::with_capacity(self.walk_length);
        walk.push(start);

        while walk.len() < self.walk_length {
            let current = walk[walk.len() - 1];
            let step = match walk.len() {
                1 => self.sampler.first_step(current, &mut rng),
                n => self.sampler.next_step(walk[n - 2], current, &mut rng),
            };
            // EmptyNeighborhood: the walk ends at this dead end
            let Ok(next) = step else {
                break;
            };
            walk.push(next);
        }
        walk
    }

    /// Consume the generator into a lazy, single-pass stream of walks
    pub fn walks(self) -> Walks<'s, 'g> {
        let pool = if self.workers > 1 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .build()
                .ok()
        } else {
            None
        };

        info!(
            starts = self.starts.len(),
            num_walks = self.num_walks,
            walk_length = self.walk_length,
            workers = self.workers,
            "generating random walks"
        );

        let remaining = self.total_walks();
        Walks {
            generator: self,
            pool,
            round: 0,
            order: Vec::new(),
            position: 0,
            buffer: VecDeque::new(),
            remaining,
        }
    }
}

/// Lazy stream of walks returned by [`RandomWalkGenerator::walks`]
pub struct Walks<'s, 'g> {
    generator: RandomWalkGenerator<'s, 'g>,
    pool: Option<rayon::ThreadPool>,
    round: usize,
    order: Vec<NodeId>,
    position: usize,
    buffer: VecDeque<Walk>,
    remaining: usize,
}

impl Walks<'_, '_> {
    /// Next `(round, start)` coordinates, advancing rounds as needed
    fn next_jobs(&mut self, limit: usize) -> Vec<(usize, NodeId)> {
        let g = &self.generator;
        let mut jobs = Vec::with_capacity(limit);
        while jobs.len() < limit && self.round < g.num_walks {
            if self.position == 0 && self.order.is_empty() {
                self.order = g.starts.clone();
                let mut rng = StdRng::seed_from_u64(derive_seed(g.seed, &[self.round as u64]));
                self.order.shuffle(&mut rng);
            }
            if self.position < self.order.len() {
                jobs.push((self.round, self.order[self.position]));
                self.position += 1;
            }
            if self.position >= self.order.len() {
                self.round += 1;
                self.position = 0;
                self.order.clear();
            }
        }
        jobs
    }

    fn refill(&mut self) {
        let jobs = self.next_jobs(self.generator.batch_size);
        if jobs.is_empty() {
            return;
        }
        let generator = &self.generator;
        let batch: Vec<Walk> = match &self.pool {
            Some(pool) => pool.install(|| {
                jobs.par_iter()
                    .map(|&(round, start)| generator.walk(round, start))
                    .collect()
            }),
            None => jobs
                .iter()
                .map(|&(round, start)| generator.walk(round, start))
                .collect(),
        };
        debug!(batch = batch.len(), round = self.round, "walk batch generated");
        self.buffer.extend(batch);
    }
}

impl Iterator for Walks<'_, '_> {
    type Item = Walk;

    fn next(&mut self) -> Option<Walk> {
        if self.buffer.is_empty() {
            self.refill();
        }
        let walk = self.buffer.pop_front()?;
        self.remaining -= 1;
        Some(walk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Walks<'_, '_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::builder::{KmerGraph, KmerGraphBuilder};

    fn config(num_walks: usize, walk_length: usize, workers: usize) -> WalkConfig {
        WalkConfig {
            num_walks,
            walk_length,
            workers,
            ..Default::default()
        }
    }

    fn sample_graph() -> KmerGraph {
        KmerGraph::from_sequences(
            &[b"ACGTACGTTGCAACGGT".as_ref(), b"TTGCAGGTACCA".as_ref()],
            3,
        )
        .unwrap()
    }

    #[test]
    fn test_walk_count_and_starts() {
        let graph = sample_graph();
        let sampler = AliasSampler::new(&graph, 1.0, 0.5).unwrap();
        let generator = RandomWalkGenerator::new(&sampler, &config(3, 8, 1)).unwrap();
        assert_eq!(generator.total_walks(), 3 * graph.node_count());

        let walks: Vec<Walk> = generator.walks().collect();
        assert_eq!(walks.len(), 3 * graph.node_count());

        // Every node starts exactly num_walks walks
        let mut starts = vec![0usize; graph.node_count()];
        for walk in &walks {
            starts[walk[0] as usize] += 1;
        }
        assert!(starts.iter().all(|&c| c == 3));
    }

    #[test]
    fn test_walks_follow_edges_and_stop_only_at_dead_ends() {
        let graph = sample_graph();
        let sampler = AliasSampler::new(&graph, 0.7, 0.3).unwrap();
        let walks: Vec<Walk> = RandomWalkGenerator::new(&sampler, &config(5, 12, 2))
            .unwrap()
            .walks()
            .collect();

        for walk in &walks {
            assert!(!walk.is_empty() && walk.len() <= 12);
            for pair in walk.windows(2) {
                assert!(graph.has_edge(pair[0], pair[1]));
            }
            if walk.len() < 12 {
                let last = walk[walk.len() - 1];
                assert_eq!(graph.out_degree(last), 0);
            }
        }
    }

    #[test]
    fn test_extreme_bias_keeps_walks_full_length() {
        // Neither graph has a dead end, so every walk must run to full length
        for (sequence, p, q, length) in [
            (&b"ACACAC"[..], 5e-324, 1.0, 6),
            (&b"ACAGACAGAC"[..], 1.0, 1e-320, 8),
            (&b"ACAGACAGAC"[..], 1e-320, 5e-324, 8),
        ] {
            let graph = KmerGraph::from_sequences(&[sequence], 1).unwrap();
            assert!(graph.nodes().all(|n| graph.out_degree(n) > 0));

            let sampler = AliasSampler::new(&graph, p, q).unwrap();
            let walks: Vec<Walk> = RandomWalkGenerator::new(&sampler, &config(4, length, 1))
                .unwrap()
                .walks()
                .collect();
            for walk in &walks {
                assert_eq!(walk.len(), length, "p = {}, q = {}: {:?}", p, q, walk);
                for pair in walk.windows(2) {
                    assert!(graph.has_edge(pair[0], pair[1]));
                }
            }
        }
    }

    #[test]
    fn test_output_independent_of_workers() {
        let graph = sample_graph();
        let sampler = AliasSampler::new(&graph, 1.0, 0.001).unwrap();
        let single: Vec<Walk> = RandomWalkGenerator::new(&sampler, &config(4, 10, 1))
            .unwrap()
            .walks()
            .collect();
        let multi: Vec<Walk> = RandomWalkGenerator::new(&sampler, &config(4, 10, 4))
            .unwrap()
            .with_batch_size(7)
            .walks()
            .collect();
        assert_eq!(single, multi);
    }

    #[test]
    fn test_iterator_matches_single_walk() {
        let graph = sample_graph();
        let sampler = AliasSampler::new(&graph, 1.0, 1.0).unwrap();
        let generator = RandomWalkGenerator::new(&sampler, &config(1, 6, 1)).unwrap();
        let start = graph.node(b"ACG").unwrap();
        let expected = generator.walk(0, start);
        let found = generator
            .clone()
            .walks()
            .find(|w| w[0] == start)
            .unwrap();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_start_subset() {
        let graph = sample_graph();
        let sampler = AliasSampler::new(&graph, 1.0, 1.0).unwrap();
        let start = graph.node(b"TTG").unwrap();
        let walks: Vec<Walk> = RandomWalkGenerator::new(&sampler, &config(6, 4, 1))
            .unwrap()
            .with_start_nodes(vec![start])
            .unwrap()
            .walks()
            .collect();
        assert_eq!(walks.len(), 6);
        assert!(walks.iter().all(|w| w[0] == start));

        let bad = RandomWalkGenerator::new(&sampler, &config(1, 4, 1))
            .unwrap()
            .with_start_nodes(vec![10_000]);
        assert!(bad.is_err());
    }

    #[test]
    fn test_isolated_node_yields_single_node_walk() {
        let mut builder = KmerGraphBuilder::new(4).unwrap();
        builder.add_sequence(b"ACGT");
        let graph = builder.build().unwrap();
        let sampler = AliasSampler::new(&graph, 1.0, 1.0).unwrap();
        let walks: Vec<Walk> = RandomWalkGenerator::new(&sampler, &config(2, 10, 1))
            .unwrap()
            .walks()
            .collect();
        assert_eq!(walks, vec![vec![0], vec![0]]);
    }

    #[test]
    fn test_size_hint_counts_down() {
        let graph = sample_graph();
        let sampler = AliasSampler::new(&graph, 1.0, 1.0).unwrap();
        let mut walks = RandomWalkGenerator::new(&sampler, &config(2, 3, 1))
            .unwrap()
            .walks();
        let total = walks.len();
        walks.next();
        assert_eq!(walks.len(), total - 1);
    }
}
