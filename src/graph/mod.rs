//! K-mer graph, node2vec transition sampling and random walks
//!
//! - [`builder`]: weighted directed k-mer co-occurrence graph (arena of nodes)
//! - [`alias`]: O(1) second-order transition sampling
//! - [`walk`]: lazy, parallel, seed-deterministic walk generation

pub mod alias;
pub mod builder;
pub mod walk;

pub use alias::{AliasSampler, AliasTable, TransitionCache};
pub use builder::{KmerGraph, KmerGraphBuilder, NodeId};
pub use walk::{RandomWalkGenerator, Walk, Walks};
