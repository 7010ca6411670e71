//! I/O: sequence input, vector and graph persistence
//!
//! Everything that touches the file system lives here; the graph, training
//! and retrieval stages only see in-memory values.

pub mod compression;
pub mod edge_list;
pub mod fasta;
pub mod sink;
pub mod word2vec;

pub use compression::{CompressedReader, CompressedWriter, DataSource, MMAP_THRESHOLD};
pub use edge_list::{load_edge_list, read_edge_list, save_edge_list, write_edge_list};
pub use fasta::{load_sequences, FastaStream};
pub use sink::DataSink;
pub use word2vec::VectorFormat;
