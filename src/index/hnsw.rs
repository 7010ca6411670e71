//! Hierarchical navigable small world (HNSW) index
//!
//! Nodes are inserted one at a time. Each node draws a top level
//! `⌊-ln(U) · mL⌋` with `mL = 1 / ln(M)`, descends greedily through the
//! layers above it, then runs an `ef_construction` beam search on each of
//! its own layers. Neighbors are chosen with the diversity heuristic: a
//! candidate is kept only if it is closer to the new node than to every
//! neighbor already kept. Links are bidirectional; a neighbor list that
//! outgrows its cap (`M`, or `2·M` on layer 0) is re-selected with the same
//! heuristic.
//!
//! Insertion order is part of the result: it decides the graph, and it
//! breaks ties between equidistant hits. The index is read-only once built
//! and can be queried from many threads.

use crate::config::{IndexConfig, Metric};
use crate::error::{KmervecError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use tracing::{debug, info};

/// Identifier reported for query vectors in errors
const QUERY_ID: &str = "<query>";

/// One query result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit<'a> {
    /// Identifier given at insertion
    pub id: &'a str,
    /// Insertion position
    pub position: usize,
    /// Squared L2 distance, or `1 - dot` for inner product
    pub distance: f32,
}

/// Search frontier entry, ordered by distance then insertion position
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f32,
    node: u32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.node.cmp(&other.node))
    }
}

/// Approximate nearest-neighbor index over fixed-dimension vectors
///
/// # Examples
///
/// ```
/// use kmervec::config::IndexConfig;
/// use kmervec::index::HnswIndex;
///
/// let mut index = HnswIndex::new(2, IndexConfig::default())?;
/// index.insert("origin", &[0.0, 0.0])?;
/// index.insert("far", &[10.0, 10.0])?;
/// let hits = index.search(&[1.0, 1.0], 1)?;
/// assert_eq!(hits[0].id, "origin");
/// # Ok::<(), kmervec::KmervecError>(())
/// ```
#[derive(Debug, Clone)]
pub struct HnswIndex {
    dim: usize,
    config: IndexConfig,
    level_mult: f64,
    ids: Vec<String>,
    vectors: Vec<f32>,
    /// `links[node][layer]` for layers `0..=level(node)`
    links: Vec<Vec<Vec<u32>>>,
    entry: Option<u32>,
    max_level: usize,
    rng: StdRng,
}

impl HnswIndex {
    /// Create an empty index for vectors of dimension `dim`
    pub fn new(dim: usize, config: IndexConfig) -> Result<Self> {
        config.validate()?;
        if dim == 0 {
            return Err(KmervecError::invalid("dimensions", "must be at least 1"));
        }
        Ok(Self {
            dim,
            level_mult: 1.0 / (config.m as f64).ln(),
            rng: StdRng::seed_from_u64(config.seed),
            config,
            ids: Vec::new(),
            vectors: Vec::new(),
            links: Vec::new(),
            entry: None,
            max_level: 0,
        })
    }

    /// Build an index by inserting `items` in order
    pub fn build<I, S, V>(dim: usize, config: IndexConfig, items: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
        V: AsRef<[f32]>,
    {
        let mut index = Self::new(dim, config)?;
        for (id, vector) in items {
            index.insert(id, vector.as_ref())?;
        }
        info!(
            vectors = index.len(),
            dim,
            metric = ?index.config.metric,
            levels = index.max_level + 1,
            "HNSW index built"
        );
        Ok(index)
    }

    /// Insert one vector
    pub fn insert(&mut self, id: impl Into<String>, vector: &[f32]) -> Result<()> {
        let id = id.into();
        if vector.len() != self.dim {
            return Err(KmervecError::DimensionMismatch {
                id,
                expected: self.dim,
                actual: vector.len(),
            });
        }

        let node = self.ids.len() as u32;
        let level = self.random_level();
        self.ids.push(id);
        self.vectors.extend_from_slice(vector);
        self.links.push(vec![Vec::new(); level + 1]);

        let Some(entry) = self.entry else {
            self.entry = Some(node);
            self.max_level = level;
            return Ok(());
        };

        let mut entry_points = vec![self.candidate(vector, entry)];
        for layer in (level + 1..=self.max_level).rev() {
            entry_points = self.search_layer(vector, &entry_points, 1, layer);
        }

        for layer in (0..=level.min(self.max_level)).rev() {
            let found = self.search_layer(vector, &entry_points, self.config.ef_construction, layer);
            let selected = self.select_neighbors(&found, self.config.m);
            for &neighbor in &selected {
                self.connect(neighbor, node, layer);
            }
            self.links[node as usize][layer] = selected;
            entry_points = found;
        }

        if level > self.max_level {
            debug!(node, level, "new HNSW entry point");
            self.max_level = level;
            self.entry = Some(node);
        }
        Ok(())
    }

    /// Up to `k` nearest vectors, closest first
    ///
    /// Equidistant hits come out in insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit<'_>>> {
        if k == 0 {
            return Err(KmervecError::invalid("k", "must be at least 1"));
        }
        let entry = self.entry.ok_or(KmervecError::IndexNotBuilt)?;
        if query.len() != self.dim {
            return Err(KmervecError::DimensionMismatch {
                id: QUERY_ID.to_string(),
                expected: self.dim,
                actual: query.len(),
            });
        }

        let mut entry_points = vec![self.candidate(query, entry)];
        for layer in (1..=self.max_level).rev() {
            entry_points = self.search_layer(query, &entry_points, 1, layer);
        }
        let found = self.search_layer(query, &entry_points, self.config.ef_search.max(k), 0);

        Ok(found
            .into_iter()
            .take(k)
            .map(|c| SearchHit {
                id: &self.ids[c.node as usize],
                position: c.node as usize,
                distance: c.distance,
            })
            .collect())
    }

    /// Run [`HnswIndex::search`] for every query in parallel
    pub fn search_batch<Q>(&self, queries: &[Q], k: usize) -> Vec<Result<Vec<SearchHit<'_>>>>
    where
        Q: AsRef<[f32]> + Sync,
    {
        queries
            .par_iter()
            .map(|q| self.search(q.as_ref(), k))
            .collect()
    }

    /// Number of indexed vectors
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing has been inserted
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Vector dimension
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Index settings
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Change the query beam width; the graph is unaffected
    pub fn set_ef_search(&mut self, ef_search: usize) -> Result<()> {
        if ef_search == 0 {
            return Err(KmervecError::invalid("ef_search", "must be at least 1"));
        }
        self.config.ef_search = ef_search;
        Ok(())
    }

    /// Identifier of the vector inserted at `position`
    pub fn id(&self, position: usize) -> Option<&str> {
        self.ids.get(position).map(String::as_str)
    }

    /// Vector inserted at `position`
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        (position < self.len()).then(|| self.row(position as u32))
    }

    /// Distance between two vectors under the index metric
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.config.metric {
            Metric::Euclidean => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
            Metric::InnerProduct => 1.0 - a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>(),
        }
    }

    fn row(&self, node: u32) -> &[f32] {
        let start = node as usize * self.dim;
        &self.vectors[start..start + self.dim]
    }

    fn candidate(&self, query: &[f32], node: u32) -> Candidate {
        Candidate {
            distance: self.distance(query, self.row(node)),
            node,
        }
    }

    fn random_level(&mut self) -> usize {
        // 1 - U lies in (0, 1], keeping ln finite
        let u: f64 = self.rng.random();
        (-(1.0 - u).ln() * self.level_mult).floor() as usize
    }

    fn max_links(&self, layer: usize) -> usize {
        if layer == 0 {
            2 * self.config.m
        } else {
            self.config.m
        }
    }

    /// Beam search on one layer; returns up to `ef` candidates, closest first
    fn search_layer(&self, query: &[f32], entry_points: &[Candidate], ef: usize, layer: usize) -> Vec<Candidate> {
        let mut visited: HashSet<u32> = entry_points.iter().map(|c| c.node).collect();
        let mut frontier: BinaryHeap<Reverse<Candidate>> = entry_points.iter().map(|&c| Reverse(c)).collect();
        let mut results: BinaryHeap<Candidate> = entry_points.iter().copied().collect();
        while results.len() > ef {
            results.pop();
        }

        while let Some(Reverse(current)) = frontier.pop() {
            if let Some(worst) = results.peek() {
                if results.len() >= ef && current > *worst {
                    break;
                }
            }
            for &neighbor in &self.links[current.node as usize][layer] {
                if !visited.insert(neighbor) {
                    continue;
                }
                let candidate = self.candidate(query, neighbor);
                let admit = results.len() < ef || results.peek().is_some_and(|worst| candidate < *worst);
                if admit {
                    frontier.push(Reverse(candidate));
                    results.push(candidate);
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }
        results.into_sorted_vec()
    }

    /// Diversity heuristic over candidates sorted closest first
    fn select_neighbors(&self, candidates: &[Candidate], m: usize) -> Vec<u32> {
        let mut selected: Vec<u32> = Vec::with_capacity(m);
        for candidate in candidates {
            if selected.len() >= m {
                break;
            }
            let vector = self.row(candidate.node);
            let diverse = selected
                .iter()
                .all(|&kept| self.distance(vector, self.row(kept)) >= candidate.distance);
            if diverse {
                selected.push(candidate.node);
            }
        }
        selected
    }

    /// Add `node` to `neighbor`'s list on `layer`, re-selecting when full
    fn connect(&mut self, neighbor: u32, node: u32, layer: usize) {
        let cap = self.max_links(layer);
        let list = &mut self.links[neighbor as usize][layer];
        list.push(node);
        if list.len() <= cap {
            return;
        }

        let base = self.row(neighbor);
        let mut candidates: Vec<Candidate> = self.links[neighbor as usize][layer]
            .iter()
            .map(|&n| self.candidate(base, n))
            .collect();
        candidates.sort_unstable();
        let pruned = self.select_neighbors(&candidates, cap);
        self.links[neighbor as usize][layer] = pruned;
    }
}
