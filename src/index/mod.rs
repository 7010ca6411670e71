//! Approximate nearest-neighbor search over segment vectors

pub mod hnsw;

pub use hnsw::{HnswIndex, SearchHit};
