//! Error types for kmervec

use thiserror::Error;

/// Result type alias for kmervec operations
pub type Result<T> = std::result::Result<T, KmervecError>;

/// Error types that can occur in kmervec
///
/// Whole-run failures (`InvalidParameter`, `EmptyVocabulary`) abort a stage.
/// Per-item failures (`MissingEmbedding`, `EmptySegmentVector`) are reported
/// per item by the batch APIs so one bad pivot or segment never aborts the rest.
#[derive(Debug, Error)]
pub enum KmervecError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid FASTA format
    #[error("Invalid FASTA format at line {line}: {msg}")]
    InvalidFastaFormat {
        /// Line number where error occurred
        line: usize,
        /// Error message
        msg: String,
    },

    /// Invalid word2vec vector file
    #[error("Invalid vector format at line {line}: {msg}")]
    InvalidVectorFormat {
        /// Line (or record) number where error occurred
        line: usize,
        /// Error message
        msg: String,
    },

    /// Invalid weighted edge list
    #[error("Invalid edge list at line {line}: {msg}")]
    InvalidEdgeList {
        /// Line number where error occurred
        line: usize,
        /// Error message
        msg: String,
    },

    /// Malformed configuration value or argument
    #[error("Invalid parameter `{name}`: {msg}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Error message
        msg: String,
    },

    /// Node has no outgoing edges; terminates the walk that reached it
    #[error("K-mer {node} has no outgoing edges")]
    EmptyNeighborhood {
        /// Offending k-mer
        node: String,
    },

    /// No token reached the minimum frequency threshold
    #[error("Empty vocabulary: no token occurs at least {min_count} times ({tokens} distinct tokens seen)")]
    EmptyVocabulary {
        /// Configured minimum frequency
        min_count: usize,
        /// Distinct tokens observed in the walks
        tokens: usize,
    },

    /// A sub-k-mer needed to compose a pivot vector has no embedding
    #[error("Missing embedding for k-mer {kmer} (required by pivot {pivot})")]
    MissingEmbedding {
        /// Sub-k-mer without a vector
        kmer: String,
        /// Pivot k-mer being composed
        pivot: String,
    },

    /// None of a segment's k-mers has an embedding
    #[error("No k-mer of segment {segment} has an embedding")]
    EmptySegmentVector {
        /// Offending segment
        segment: String,
    },

    /// Index queried before any vector was inserted
    #[error("Index not built: no vectors have been inserted")]
    IndexNotBuilt,

    /// Vector dimension differs from the fixed dimension
    #[error("Dimension mismatch for {id}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Identifier of the offending vector
        id: String,
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },
}

impl KmervecError {
    /// Shorthand for [`KmervecError::InvalidParameter`]
    pub fn invalid(name: &'static str, msg: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            msg: msg.into(),
        }
    }
}

/// Render a k-mer or segment for error messages
pub(crate) fn display_bytes(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_offending_input() {
        let err = KmervecError::MissingEmbedding {
            kmer: "ACG".to_string(),
            pivot: "ACGTA".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ACG"));
        assert!(msg.contains("ACGTA"));

        let err = KmervecError::invalid("mer", "must be at least 1");
        assert_eq!(err.to_string(), "Invalid parameter `mer`: must be at least 1");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: KmervecError = io.into();
        assert!(matches!(err, KmervecError::Io(_)));
    }
}
