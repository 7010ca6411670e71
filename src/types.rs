//! Common types used throughout kmervec

/// A named biological sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    /// Sequence identifier (without '>' prefix)
    pub id: String,
    /// DNA/RNA/protein sequence
    pub sequence: Vec<u8>,
}

impl SequenceRecord {
    /// Create a new sequence record
    pub fn new(id: String, sequence: Vec<u8>) -> Self {
        Self { id, sequence }
    }

    /// Check if the record has an empty sequence
    ///
    /// # Examples
    ///
    /// ```
    /// use kmervec::SequenceRecord;
    ///
    /// let empty = SequenceRecord::new("seq1".to_string(), Vec::new());
    /// assert!(empty.is_empty());
    /// ```
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// A fixed-length window cut from a sequence record
///
/// The segment's identifier is its sequence text: two segments with the same
/// bases are indistinguishable to the retrieval benchmark. Distinct byte
/// sequences always get distinct identifiers (see [`Segment::id`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Identifier of the record the segment was cut from
    pub source: String,
    /// Offset of the first base within the source record
    pub start: usize,
    /// Segment bases
    pub sequence: Vec<u8>,
}

impl Segment {
    /// Create a new segment
    pub fn new(source: String, start: usize, sequence: Vec<u8>) -> Self {
        Self {
            source,
            start,
            sequence,
        }
    }

    /// Identifier used by the retrieval index
    ///
    /// UTF-8 text without a backslash is used verbatim. Anything else is
    /// ASCII-escaped (`\xNN`, `\\`), so the mapping stays one-to-one.
    pub fn id(&self) -> String {
        match std::str::from_utf8(&self.sequence) {
            Ok(text) if !text.contains('\\') => text.to_owned(),
            _ => self.sequence.escape_ascii().to_string(),
        }
    }
}

/// A window cut from a [`Segment`], remembering where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubSegment {
    /// Identifier of the originating segment (see [`Segment::id`])
    pub origin: String,
    /// Offset within the originating segment
    pub offset: usize,
    /// Sub-segment bases
    pub sequence: Vec<u8>,
}
