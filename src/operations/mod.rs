//! Sequence primitives: k-mer tokenization and segmentation
//!
//! - [`kmer`]: overlapping k-mer iteration, counting and distinct extraction
//! - [`segment`]: fixed-length segments and randomly placed sub-segments

pub mod kmer;
pub mod segment;

pub use kmer::{extract_kmers, kmer_count, kmer_iter, kmer_spectrum, KmerExtractor, KmerIterator};
pub use segment::{sample_subsegments, split_segments};
