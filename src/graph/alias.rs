//! Alias-method sampling of node2vec transitions
//!
//! A walk standing on node `u`, having arrived from `t`, moves to an
//! out-neighbor `v` of `u` with probability proportional to
//!
//! ```text
//! w(u, v) * 1/p   if v == t          (return)
//! w(u, v) * 1     if edge t -> v     (stay close to t)
//! w(u, v) * 1/q   otherwise          (move outward)
//! ```
//!
//! The first step of a walk has no `t` and uses the plain edge weights.
//!
//! Every distribution is turned into an [`AliasTable`] (Vose's method), so a
//! draw costs two random numbers regardless of out-degree. With
//! [`TransitionCache::Precomputed`] one table is built per node and one per
//! edge `t -> u`, up front and in parallel. [`TransitionCache::OnDemand`]
//! keeps only the per-node tables and derives second-order weights at draw
//! time, trading O(out-degree) draws for memory. Both strategies sample from
//! the same distribution.

use crate::error::{KmervecError, Result};
use crate::graph::builder::{KmerGraph, NodeId};
use rand::Rng;
use rayon::prelude::*;
use tracing::debug;

/// O(1) sampler for a fixed discrete distribution
#[derive(Debug, Clone, PartialEq)]
pub struct AliasTable {
    prob: Vec<f64>,
    alias: Vec<u32>,
}

impl AliasTable {
    /// Build a table over `weights`
    ///
    /// Returns `None` when there are no weights or they do not sum to a
    /// positive finite value. Negative weights are treated as zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use kmervec::graph::AliasTable;
    /// use rand::SeedableRng;
    ///
    /// let table = AliasTable::new(&[1.0, 0.0, 3.0]).unwrap();
    /// let mut rng = rand::rngs::StdRng::seed_from_u64(1);
    /// assert_ne!(table.sample(&mut rng), 1);
    /// ```
    pub fn new(weights: &[f64]) -> Option<Self> {
        let n = weights.len();
        let total: f64 = weights.iter().map(|w| w.max(0.0)).sum();
        if n == 0 || !(total.is_finite() && total > 0.0) {
            return None;
        }

        let mut prob: Vec<f64> = weights
            .iter()
            .map(|w| w.max(0.0) * n as f64 / total)
            .collect();
        let mut alias = vec![0u32; n];

        let mut small = Vec::with_capacity(n);
        let mut large = Vec::with_capacity(n);
        for (i, &p) in prob.iter().enumerate() {
            if p < 1.0 {
                small.push(i);
            } else {
                large.push(i);
            }
        }

        loop {
            let (Some(&s), Some(&l)) = (small.last(), large.last()) else {
                break;
            };
            small.pop();
            alias[s] = l as u32;
            prob[l] -= 1.0 - prob[s];
            if prob[l] < 1.0 {
                large.pop();
                small.push(l);
            }
        }

        // Leftovers are exactly 1 up to rounding
        for i in large.into_iter().chain(small) {
            prob[i] = 1.0;
        }

        Some(Self { prob, alias })
    }

    /// Number of outcomes
    pub fn len(&self) -> usize {
        self.prob.len()
    }

    /// Whether the table has no outcomes (never true for a built table)
    pub fn is_empty(&self) -> bool {
        self.prob.is_empty()
    }

    /// Draw an outcome index
    #[inline]
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let i = rng.random_range(0..self.prob.len());
        if rng.random::<f64>() < self.prob[i] {
            i
        } else {
            self.alias[i] as usize
        }
    }
}

/// Where second-order transition tables come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionCache {
    /// One table per edge, built eagerly; O(1) draws
    #[default]
    Precomputed,
    /// Second-order weights recomputed per draw; O(out-degree) draws
    OnDemand,
}

/// node2vec transition sampler over an immutable [`KmerGraph`]
///
/// Read-only after construction and `Sync`, so any number of walkers may
/// share it.
#[derive(Debug)]
pub struct AliasSampler<'g> {
    graph: &'g KmerGraph,
    p: f64,
    q: f64,
    cache: TransitionCache,
    node_tables: Vec<Option<AliasTable>>,
    /// `edge_tables[t][i]` is the table for arriving at the `i`-th
    /// out-neighbor of `t`
    edge_tables: Vec<Vec<Option<AliasTable>>>,
}

impl<'g> AliasSampler<'g> {
    /// Build a sampler with every transition table precomputed
    pub fn new(graph: &'g KmerGraph, p: f64, q: f64) -> Result<Self> {
        Self::with_cache(graph, p, q, TransitionCache::Precomputed)
    }

    /// Build a sampler with an explicit caching strategy
    pub fn with_cache(graph: &'g KmerGraph, p: f64, q: f64, cache: TransitionCache) -> Result<Self> {
        for (name, value) in [("p", p), ("q", q)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(KmervecError::invalid(
                    name,
                    format!("must be a positive finite number, got {}", value),
                ));
            }
        }

        let mut sampler = Self {
            graph,
            p,
            q,
            cache,
            node_tables: Vec::new(),
            edge_tables: Vec::new(),
        };

        sampler.node_tables = graph
            .nodes()
            .collect::<Vec<_>>()
            .par_iter()
            .map(|&u| sampler.build_table(None, u))
            .collect();

        if cache == TransitionCache::Precomputed {
            sampler.edge_tables = graph
                .nodes()
                .collect::<Vec<_>>()
                .par_iter()
                .map(|&t| {
                    graph
                        .neighbors(t)
                        .iter()
                        .map(|&(u, _)| sampler.build_table(Some(t), u))
                        .collect()
                })
                .collect();
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            p,
            q,
            ?cache,
            "alias tables built"
        );
        Ok(sampler)
    }

    /// The graph being sampled
    pub fn graph(&self) -> &'g KmerGraph {
        self.graph
    }

    /// Return parameter
    pub fn p(&self) -> f64 {
        self.p
    }

    /// In-out parameter
    pub fn q(&self) -> f64 {
        self.q
    }

    /// Caching strategy in use
    pub fn cache(&self) -> TransitionCache {
        self.cache
    }

    /// Transition weights from `current`, aligned with
    /// `graph.neighbors(current)`
    ///
    /// `previous == None` gives the first-order (plain edge weight)
    /// distribution. Second-order weights are rescaled so the smallest bias
    /// present among the neighbors gets factor 1 and every other factor is
    /// below 1. Tiny `p` or `q` therefore cannot overflow the total.
    pub fn transition_weights(&self, previous: Option<NodeId>, current: NodeId) -> Vec<f64> {
        let neighbors = self.graph.neighbors(current);
        let Some(t) = previous else {
            return neighbors.iter().map(|&(_, w)| f64::from(w)).collect();
        };

        let biases: Vec<f64> = neighbors
            .iter()
            .map(|&(v, _)| {
                if v == t {
                    self.p
                } else if self.graph.has_edge(t, v) {
                    1.0
                } else {
                    self.q
                }
            })
            .collect();
        let scale = biases.iter().copied().fold(f64::INFINITY, f64::min);

        neighbors
            .iter()
            .zip(&biases)
            .map(|(&(_, w), &bias)| {
                let factor = if bias == scale { 1.0 } else { scale / bias };
                f64::from(w) * factor
            })
            .collect()
    }

    /// Draw the first step of a walk starting at `current`
    ///
    /// Fails with `EmptyNeighborhood` when `current` has no out-edges.
    pub fn first_step<R: Rng + ?Sized>(&self, current: NodeId, rng: &mut R) -> Result<NodeId> {
        match &self.node_tables[current as usize] {
            Some(table) => Ok(self.graph.neighbors(current)[table.sample(rng)].0),
            None => Err(self.dead_end(current)),
        }
    }

    /// Draw the next node for a walk at `current` that arrived from `previous`
    ///
    /// Fails with `EmptyNeighborhood` when `current` has no out-edges.
    pub fn next_step<R: Rng + ?Sized>(
        &self,
        previous: NodeId,
        current: NodeId,
        rng: &mut R,
    ) -> Result<NodeId> {
        if self.node_tables[current as usize].is_none() {
            return Err(self.dead_end(current));
        }

        let neighbors = self.graph.neighbors(current);
        if let Some(table) = self.cached_edge_table(previous, current) {
            return Ok(neighbors[table.sample(rng)].0);
        }

        // Not cached (on-demand mode, or a pair that is not an edge)
        match self.build_table(Some(previous), current) {
            Some(table) => Ok(neighbors[table.sample(rng)].0),
            None => Err(self.dead_end(current)),
        }
    }

    fn cached_edge_table(&self, previous: NodeId, current: NodeId) -> Option<&AliasTable> {
        let tables = self.edge_tables.get(previous as usize)?;
        let position = self
            .graph
            .neighbors(previous)
            .binary_search_by_key(&current, |&(n, _)| n)
            .ok()?;
        tables[position].as_ref()
    }

    fn build_table(&self, previous: Option<NodeId>, current: NodeId) -> Option<AliasTable> {
        AliasTable::new(&self.transition_weights(previous, current))
    }

    fn dead_end(&self, node: NodeId) -> KmervecError {
        KmervecError::EmptyNeighborhood {
            node: self.graph.display(node),
        }
    }
}
