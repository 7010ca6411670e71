//! kmervec: multi-scale k-mer embeddings and sequence retrieval
//!
//! # Overview
//!
//! kmervec learns vector representations of k-mers from the way they follow
//! each other in a set of sequences, then checks how well those vectors let
//! a short fragment find the segment it was cut from.
//!
//! ## Key Features
//!
//! - **Graph walks**: node2vec-biased walks over a weighted k-mer graph with
//!   O(1) alias sampling
//! - **Skip-gram training**: negative sampling, lock-free parallel updates
//! - **Multi-scale vectors**: pivot k-mers concatenate the vectors of their
//!   shorter sub-k-mers
//! - **Retrieval benchmark**: HNSW index and top-K precision
//! - **Deterministic**: every random stage is driven by an explicit seed
//!
//! ## Quick Start
//!
//! ```no_run
//! use kmervec::config::PipelineConfig;
//! use kmervec::Pipeline;
//!
//! # fn main() -> kmervec::Result<()> {
//! let mut config = PipelineConfig::default();
//! config.mers = vec![4, 5, 6];
//!
//! let report = Pipeline::new(config)?.run_paths(&["genomes/"])?;
//! for (k, precision) in &report.precision.at_cutoffs {
//!     println!("precision@{}: {:.3}", k, precision);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`config`]: tunables for every stage
//! - [`graph`]: k-mer graph, transition sampling, random walks
//! - [`embedding`]: embedding tables, trainer, composition, pooling
//! - [`index`]: approximate nearest neighbor search
//! - [`eval`]: retrieval precision
//! - [`io`]: FASTA input, word2vec vectors, edge lists, compression
//! - [`operations`]: k-mer extraction and segmentation
//! - [`pipeline`]: the three stages chained together

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod embedding;
pub mod error;
pub mod eval;
pub mod graph;
pub mod index;
pub mod io;
pub mod operations;
pub mod pipeline;
mod rng;
pub mod types;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use embedding::{ContextEmbeddingTrainer, EmbeddingTable, MultiScaleComposer, SegmentPooler};
pub use error::{KmervecError, Result};
pub use eval::{PrecisionEvaluator, PrecisionReport};
pub use graph::{AliasSampler, KmerGraph, RandomWalkGenerator};
pub use index::{HnswIndex, SearchHit};
pub use io::{load_sequences, FastaStream};
pub use pipeline::{Pipeline, PipelineReport};
pub use types::{Segment, SequenceRecord, SubSegment};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
