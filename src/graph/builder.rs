//! K-mer co-occurrence graph
//!
//! Nodes are the distinct k-mers observed in the input; a directed edge
//! `u -> v` records that `v` was seen immediately after `u` (one base further
//! along some sequence), weighted by how often that happened.
//!
//! The graph is an arena: k-mers are interned to dense [`NodeId`]s and each
//! node owns an adjacency list of `(neighbor, weight)` pairs sorted by
//! neighbor id, so membership tests are binary searches and traversal never
//! follows pointers. Cycles and self-loops (`AAAA -> AAAA`) are ordinary.

use crate::error::{display_bytes, KmervecError, Result};
use crate::operations::kmer::kmer_iter;
use std::collections::HashMap;
use tracing::debug;

/// Dense node identifier (index into the arena)
pub type NodeId = u32;

/// Immutable weighted directed k-mer graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KmerGraph {
    mer: usize,
    labels: Vec<Vec<u8>>,
    index: HashMap<Vec<u8>, NodeId>,
    adjacency: Vec<Vec<(NodeId, u32)>>,
}

impl KmerGraph {
    /// Build a graph from a batch of sequences
    ///
    /// Sequences shorter than `mer` are skipped. Fails with
    /// `InvalidParameter` when `mer == 0` or when no sequence is long
    /// enough to contribute a single k-mer.
    ///
    /// # Examples
    ///
    /// ```
    /// use kmervec::graph::KmerGraph;
    ///
    /// let graph = KmerGraph::from_sequences(&[b"ACGTACGT".as_ref(), b"ACGTTGCA".as_ref()], 4)?;
    /// assert_eq!(graph.node_count(), 8);
    /// assert_eq!(graph.weight(b"TACG", b"ACGT"), Some(1));
    /// # Ok::<(), kmervec::KmervecError>(())
    /// ```
    pub fn from_sequences<S: AsRef<[u8]>>(sequences: &[S], mer: usize) -> Result<Self> {
        let mut builder = KmerGraphBuilder::new(mer)?;
        for sequence in sequences {
            builder.add_sequence(sequence.as_ref());
        }
        builder.build()
    }

    /// K-mer length of every node label
    pub fn mer(&self) -> usize {
        self.mer
    }

    /// Number of distinct k-mers
    pub fn node_count(&self) -> usize {
        self.labels.len()
    }

    /// Number of distinct directed edges
    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum()
    }

    /// Look up the node for a k-mer
    pub fn node(&self, kmer: &[u8]) -> Option<NodeId> {
        self.index.get(kmer).copied()
    }

    /// K-mer label of a node
    ///
    /// # Panics
    ///
    /// Panics if `node` is not a node of this graph.
    pub fn label(&self, node: NodeId) -> &[u8] {
        &self.labels[node as usize]
    }

    /// Outgoing `(neighbor, weight)` pairs sorted by neighbor id
    pub fn neighbors(&self, node: NodeId) -> &[(NodeId, u32)] {
        &self.adjacency[node as usize]
    }

    /// Number of outgoing edges
    pub fn out_degree(&self, node: NodeId) -> usize {
        self.adjacency[node as usize].len()
    }

    /// Weight of edge `src -> dst`, if present
    pub fn edge_weight(&self, src: NodeId, dst: NodeId) -> Option<u32> {
        let list = &self.adjacency[src as usize];
        list.binary_search_by_key(&dst, |&(n, _)| n)
            .ok()
            .map(|i| list[i].1)
    }

    /// Whether edge `src -> dst` exists
    pub fn has_edge(&self, src: NodeId, dst: NodeId) -> bool {
        self.edge_weight(src, dst).is_some()
    }

    /// Weight of the edge between two k-mers, if both exist and are linked
    pub fn weight(&self, src: &[u8], dst: &[u8]) -> Option<u32> {
        self.edge_weight(self.node(src)?, self.node(dst)?)
    }

    /// All node ids in arena order
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.labels.len()).map(|i| i as NodeId)
    }

    /// All edges as `(src, dst, weight)` in arena order
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, u32)> + '_ {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(src, list)| list.iter().map(move |&(dst, w)| (src as NodeId, dst, w)))
    }

    /// Render a node for log and error messages
    pub(crate) fn display(&self, node: NodeId) -> String {
        display_bytes(self.label(node))
    }
}

/// Incremental builder for [`KmerGraph`]
///
/// # Examples
///
/// ```
/// use kmervec::graph::KmerGraphBuilder;
///
/// let mut builder = KmerGraphBuilder::new(3)?;
/// assert!(builder.add_sequence(b"ACGTA"));
/// assert!(!builder.add_sequence(b"AC")); // too short, skipped
/// let graph = builder.build()?;
/// assert_eq!(graph.edge_count(), 2);
/// # Ok::<(), kmervec::KmervecError>(())
/// ```
#[derive(Debug)]
pub struct KmerGraphBuilder {
    mer: usize,
    labels: Vec<Vec<u8>>,
    index: HashMap<Vec<u8>, NodeId>,
    edges: Vec<HashMap<NodeId, u32>>,
    sequences_added: usize,
    sequences_skipped: usize,
}

impl KmerGraphBuilder {
    /// Create a builder for k-mers of length `mer`
    pub fn new(mer: usize) -> Result<Self> {
        if mer == 0 {
            return Err(KmervecError::invalid("mer", "k-mer length must be at least 1"));
        }
        Ok(Self {
            mer,
            labels: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
            sequences_added: 0,
            sequences_skipped: 0,
        })
    }

    /// Slide the k-mer window over `sequence` and count consecutive pairs
    ///
    /// Returns `false` (and records nothing) when the sequence is shorter
    /// than the k-mer length.
    pub fn add_sequence(&mut self, sequence: &[u8]) -> bool {
        if sequence.len() < self.mer {
            self.sequences_skipped += 1;
            debug!(
                len = sequence.len(),
                mer = self.mer,
                "sequence shorter than k-mer length, skipped"
            );
            return false;
        }

        let mut previous: Option<NodeId> = None;
        for kmer in kmer_iter(sequence, self.mer) {
            let node = self.intern(kmer);
            if let Some(prev) = previous {
                let weight = self.edges[prev as usize].entry(node).or_insert(0);
                *weight = weight.saturating_add(1);
            }
            previous = Some(node);
        }
        self.sequences_added += 1;
        true
    }

    /// Add `weight` to edge `src -> dst`, creating nodes as needed
    ///
    /// Both labels must have the builder's k-mer length.
    pub fn add_edge(&mut self, src: &[u8], dst: &[u8], weight: u32) -> Result<()> {
        for kmer in [src, dst] {
            if kmer.len() != self.mer {
                return Err(KmervecError::invalid(
                    "mer",
                    format!(
                        "k-mer {} has length {}, expected {}",
                        display_bytes(kmer),
                        kmer.len(),
                        self.mer
                    ),
                ));
            }
        }
        let s = self.intern(src);
        let d = self.intern(dst);
        let entry = self.edges[s as usize].entry(d).or_insert(0);
        *entry = entry.saturating_add(weight);
        Ok(())
    }

    /// Sequences that contributed k-mers so far
    pub fn sequences_added(&self) -> usize {
        self.sequences_added
    }

    /// Sequences skipped for being shorter than the k-mer length
    pub fn sequences_skipped(&self) -> usize {
        self.sequences_skipped
    }

    /// Freeze the graph
    pub fn build(self) -> Result<KmerGraph> {
        if self.labels.is_empty() {
            return Err(KmervecError::invalid(
                "mer",
                format!(
                    "no input sequence is at least {} long ({} skipped)",
                    self.mer, self.sequences_skipped
                ),
            ));
        }

        let adjacency: Vec<Vec<(NodeId, u32)>> = self
            .edges
            .into_iter()
            .map(|map| {
                let mut list: Vec<(NodeId, u32)> = map.into_iter().collect();
                list.sort_unstable_by_key(|&(n, _)| n);
                list
            })
            .collect();

        let graph = KmerGraph {
            mer: self.mer,
            labels: self.labels,
            index: self.index,
            adjacency,
        };
        debug!(
            mer = graph.mer,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            skipped = self.sequences_skipped,
            "k-mer graph built"
        );
        Ok(graph)
    }

    fn intern(&mut self, kmer: &[u8]) -> NodeId {
        if let Some(&id) = self.index.get(kmer) {
            return id;
        }
        let id = self.labels.len() as NodeId;
        self.labels.push(kmer.to_vec());
        self.index.insert(kmer.to_vec(), id);
        self.edges.push(HashMap::new());
        id
    }
}
