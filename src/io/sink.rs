//! Output destinations for streaming writes
//!
//! `DataSink` is the write counterpart to
//! [`DataSource`](crate::io::DataSource). Embedding tables and edge lists are
//! written through it so the same code serves files and stdout.
//!
//! # Example
//!
//! ```no_run
//! use kmervec::io::DataSink;
//!
//! // Gzip is chosen from the extension
//! let sink = DataSink::from_path("kmers.w2v.gz");
//! assert!(sink.is_compressed());
//!
//! let sink = DataSink::stdout();
//! ```

use std::path::{Path, PathBuf};

/// Output destination for streaming writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSink {
    /// Write to a local file path; `.gz` and `.gzip` are compressed
    Local(PathBuf),

    /// Write to standard output, never compressed
    Stdout,
}

impl DataSink {
    /// Create a sink from a file path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        Self::Local(path.as_ref().to_path_buf())
    }

    /// Create a sink for standard output
    pub fn stdout() -> Self {
        Self::Stdout
    }

    pub(crate) fn extension(&self) -> Option<&str> {
        match self {
            Self::Local(path) => path.extension().and_then(|s| s.to_str()),
            Self::Stdout => None,
        }
    }

    /// Check if this sink represents a compressed output
    pub fn is_compressed(&self) -> bool {
        matches!(self.extension(), Some("gz") | Some("gzip"))
    }
}
