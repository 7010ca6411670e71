//! FASTA streaming parser and sequence loader
//!
//! # Format
//!
//! ```text
//! >sequence1 description
//! GATTACAGATTACA
//! TGCATGCA
//! >sequence2
//! ACGTACGT
//! ```
//!
//! Sequence lines are joined; the identifier is the header text up to the
//! first whitespace. Records with no sequence lines are returned with an
//! empty sequence rather than rejected: downstream stages skip sequences
//! too short to yield a k-mer.

use crate::error::{KmervecError, Result};
use crate::io::compression::{CompressedReader, DataSource};
use crate::types::SequenceRecord;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File extensions recognised when loading a directory (optionally `.gz`)
pub const FASTA_EXTENSIONS: &[&str] = &["fa", "fasta", "fna", "fas"];

/// FASTA streaming parser
///
/// Holds one record at a time; memory does not grow with file size.
///
/// # Example
///
/// ```no_run
/// use kmervec::io::FastaStream;
///
/// let stream = FastaStream::from_path("genome.fa.gz")?;
/// for record in stream {
///     let record = record?;
///     println!("{}: {} bp", record.id, record.sequence.len());
/// }
/// # Ok::<(), kmervec::KmervecError>(())
/// ```
pub struct FastaStream<R: BufRead> {
    reader: R,
    line_buffer: String,
    line_number: usize,
    finished: bool,
    /// Header of the next record, read while finishing the previous one
    next_header: Option<String>,
}

impl FastaStream<CompressedReader> {
    /// Create a FASTA stream from a data source (plain or gzip)
    pub fn new(source: DataSource) -> Result<Self> {
        Ok(Self::from_reader(CompressedReader::new(source)?))
    }

    /// Create a FASTA stream from a local file path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(DataSource::from_path(path))
    }
}

impl<R: BufRead> FastaStream<R> {
    /// Create a FASTA stream from any buffered reader
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            line_buffer: String::with_capacity(256),
            line_number: 0,
            finished: false,
            next_header: None,
        }
    }

    /// Next non-empty trimmed line, or `None` at EOF
    fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            self.line_buffer.clear();
            if self.reader.read_line(&mut self.line_buffer)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;
            let line = self.line_buffer.trim();
            if !line.is_empty() {
                return Ok(Some(line.to_string()));
            }
        }
    }

    fn read_record(&mut self) -> Result<Option<SequenceRecord>> {
        if self.finished {
            return Ok(None);
        }

        let header = match self.next_header.take() {
            Some(header) => header,
            None => match self.next_line()? {
                Some(line) => line,
                None => {
                    self.finished = true;
                    return Ok(None);
                }
            },
        };

        let Some(name) = header.strip_prefix('>') else {
            self.finished = true;
            return Err(KmervecError::InvalidFastaFormat {
                line: self.line_number,
                msg: format!("Expected '>' at start of header, got: {}", header),
            });
        };
        let id = name.split_whitespace().next().unwrap_or("").to_string();

        let mut sequence = Vec::new();
        loop {
            match self.next_line()? {
                None => {
                    self.finished = true;
                    break;
                }
                Some(line) if line.starts_with('>') => {
                    self.next_header = Some(line);
                    break;
                }
                Some(line) => sequence.extend_from_slice(line.as_bytes()),
            }
        }

        Ok(Some(SequenceRecord::new(id, sequence)))
    }
}

impl<R: BufRead> Iterator for FastaStream<R> {
    type Item = Result<SequenceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

/// Whether `path` names a FASTA file, compressed or not
pub fn is_fasta_path(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let name = name.to_ascii_lowercase();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    FASTA_EXTENSIONS
        .iter()
        .any(|ext| name.rsplit_once('.').is_some_and(|(_, e)| e == *ext))
}

/// Load every record from files and directories, upper-casing sequences
///
/// Directories contribute their FASTA files (see [`FASTA_EXTENSIONS`]) in
/// sorted name order, without recursing. Files named explicitly are read
/// whatever their extension.
pub fn load_sequences<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<SequenceRecord>> {
    let mut files: Vec<PathBuf> = Vec::new();
    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(path)?
                .map(|entry| entry.map(|e| e.path()))
                .collect::<std::io::Result<_>>()?;
            entries.retain(|p| p.is_file() && is_fasta_path(p));
            entries.sort();
            debug!(dir = %path.display(), files = entries.len(), "scanned directory");
            files.extend(entries);
        } else {
            files.push(path.to_path_buf());
        }
    }

    let mut records = Vec::new();
    for file in &files {
        for record in FastaStream::from_path(file)? {
            let mut record = record?;
            record.sequence.make_ascii_uppercase();
            records.push(record);
        }
    }

    info!(
        files = files.len(),
        records = records.len(),
        bases = records.iter().map(|r| r.sequence.len()).sum::<usize>(),
        "sequences loaded"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor};

    fn parse(data: &[u8]) -> Result<Vec<SequenceRecord>> {
        FastaStream::from_reader(BufReader::new(Cursor::new(data))).collect()
    }

    #[test]
    fn test_parse_multiple_records() {
        let records = parse(b">seq1 first one\nGATT\nACA\n\n>seq2\nACGT\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "seq1");
        assert_eq!(records[0].sequence, b"GATTACA");
        assert_eq!(records[1].id, "seq2");
        assert_eq!(records[1].sequence, b"ACGT");
    }

    #[test]
    fn test_record_without_sequence_is_empty() {
        let records = parse(b">empty\n>full\nAC\n").unwrap();
        assert!(records[0].is_empty());
        assert_eq!(records[1].sequence, b"AC");
    }

    #[test]
    fn test_missing_header_is_error() {
        let mut stream = FastaStream::from_reader(BufReader::new(Cursor::new(b"\nGATTACA\n".as_ref())));
        match stream.next() {
            Some(Err(KmervecError::InvalidFastaFormat { line, .. })) => assert_eq!(line, 2),
            other => panic!("expected InvalidFastaFormat, got {:?}", other.map(|r| r.is_ok())),
        }
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_empty_input() {
        assert!(parse(b"").unwrap().is_empty());
        assert!(parse(b"\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_fasta_path_detection() {
        assert!(is_fasta_path(Path::new("genome.fa")));
        assert!(is_fasta_path(Path::new("dir/genome.FASTA.gz")));
        assert!(is_fasta_path(Path::new("x.fna")));
        assert!(!is_fasta_path(Path::new("reads.fq.gz")));
        assert!(!is_fasta_path(Path::new("fa")));
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_wrapped_records_rejoin(
            ids in prop::collection::vec("[A-Za-z0-9_]{1,20}", 1..6),
            seq in "[ACGTN]{1,300}",
            width in 1..80usize,
        ) {
            let mut fasta = String::new();
            for id in &ids {
                fasta.push_str(&format!(">{} description\n", id));
                for chunk in seq.as_bytes().chunks(width) {
                    fasta.push_str(std::str::from_utf8(chunk).unwrap());
                    fasta.push('\n');
                }
            }
            let records = parse(fasta.as_bytes()).unwrap();
            prop_assert_eq!(records.len(), ids.len());
            for (record, id) in records.iter().zip(&ids) {
                prop_assert_eq!(&record.id, id);
                prop_assert_eq!(&record.sequence, seq.as_bytes());
            }
        }
    }
}
