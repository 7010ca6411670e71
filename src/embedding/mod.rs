//! Embedding tables, training and pooling
//!
//! - [`table`]: token → vector storage
//! - [`trainer`]: skip-gram with negative sampling over walks
//! - [`compose`]: multi-scale pivot vectors
//! - [`pool`]: segment vectors from k-mer vectors

pub mod compose;
pub mod pool;
pub mod table;
pub mod trainer;

pub use compose::{Composition, MultiScaleComposer};
pub use pool::SegmentPooler;
pub use table::EmbeddingTable;
pub use trainer::ContextEmbeddingTrainer;
