//! Transparent gzip reading and writing
//!
//! Inputs are opened through [`DataSource`]: files at or above
//! [`MMAP_THRESHOLD`] are memory-mapped, smaller ones read through a buffer.
//! Gzip is detected from the magic bytes, not the file name, so a `.fa`
//! that happens to be compressed still reads. Multi-member streams (as
//! written by `bgzip` or by concatenating `.gz` files) decode completely.
//!
//! Outputs go through [`CompressedWriter`], which gzips when the sink path
//! ends in `.gz`.

use crate::error::Result;
use crate::io::DataSink;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use memmap2::Mmap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Files at least this large are memory-mapped (50 MB)
pub const MMAP_THRESHOLD: u64 = 50 * 1024 * 1024;

/// Gzip magic bytes
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Where input bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Local file path
    Local(PathBuf),
}

impl DataSource {
    /// Create a local file data source
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        DataSource::Local(path.as_ref().to_path_buf())
    }

    /// Path of a local source
    pub fn path(&self) -> &Path {
        match self {
            DataSource::Local(path) => path,
        }
    }

    /// Open the raw (still compressed) bytes
    pub fn open(&self) -> Result<Box<dyn BufRead + Send>> {
        match self {
            DataSource::Local(path) => open_local_file(path),
        }
    }
}

/// Buffered read for small files, mmap for large ones
fn open_local_file(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)?;
    let file_size = file.metadata()?.len();

    if file_size >= MMAP_THRESHOLD {
        debug!(path = %path.display(), bytes = file_size, "memory-mapping input");
        // SAFETY: the map is read-only; concurrent truncation of the file by
        // another process is outside what this reader guards against.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Box::new(io::Cursor::new(mmap)))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Reader that decompresses gzip input and passes anything else through
///
/// # Example
///
/// ```no_run
/// use kmervec::io::{CompressedReader, DataSource};
/// use std::io::BufRead;
///
/// # fn main() -> kmervec::Result<()> {
/// let reader = CompressedReader::new(DataSource::from_path("genome.fa.gz"))?;
/// for line in reader.lines() {
///     let _line = line?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct CompressedReader {
    inner: Box<dyn BufRead + Send>,
    compressed: bool,
}

impl CompressedReader {
    /// Open `source`, sniffing for gzip
    pub fn new(source: DataSource) -> Result<Self> {
        Self::from_reader(source.open()?)
    }

    /// Wrap an already-open reader, sniffing for gzip
    pub fn from_reader(mut reader: Box<dyn BufRead + Send>) -> Result<Self> {
        let compressed = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
        let inner: Box<dyn BufRead + Send> = if compressed {
            Box::new(BufReader::new(MultiGzDecoder::new(reader)))
        } else {
            reader
        };
        Ok(Self { inner, compressed })
    }

    /// Whether the input was gzip
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Get the inner buffered reader
    pub fn into_inner(self) -> Box<dyn BufRead + Send> {
        self.inner
    }
}

impl Read for CompressedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl BufRead for CompressedReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt)
    }
}

/// Writer that gzips when the sink asks for it
///
/// Call [`CompressedWriter::finish`] to write the gzip trailer and surface
/// any error; dropping only flushes on a best-effort basis.
pub enum CompressedWriter {
    /// Uncompressed writer with buffering
    Plain(Option<BufWriter<Box<dyn Write>>>),

    /// Gzip writer at the default level (6)
    Gzip(Option<GzEncoder<BufWriter<Box<dyn Write>>>>),
}

impl CompressedWriter {
    /// Create a writer for `sink`; `.gz` paths are gzipped
    pub fn new(sink: DataSink) -> io::Result<Self> {
        let compressed = sink.is_compressed();
        match sink {
            DataSink::Local(path) => {
                let file = File::create(&path)?;
                if compressed {
                    Self::new_gzip(Box::new(file))
                } else {
                    Self::new_plain(Box::new(file))
                }
            }
            DataSink::Stdout => Self::new_plain(Box::new(io::stdout())),
        }
    }

    /// Create a plain (uncompressed) writer
    pub fn new_plain(writer: Box<dyn Write>) -> io::Result<Self> {
        Ok(Self::Plain(Some(BufWriter::new(writer))))
    }

    /// Create a gzip compressed writer
    pub fn new_gzip(writer: Box<dyn Write>) -> io::Result<Self> {
        let encoder = GzEncoder::new(BufWriter::new(writer), Compression::default());
        Ok(Self::Gzip(Some(encoder)))
    }

    /// Flush buffered data without finalizing a gzip stream
    pub fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(Some(w)) => w.flush(),
            Self::Gzip(Some(w)) => w.flush(),
            _ => Ok(()),
        }
    }

    /// Flush everything and finalize compression
    pub fn finish(mut self) -> io::Result<()> {
        match &mut self {
            Self::Plain(w) => match w.take() {
                Some(mut writer) => writer.flush(),
                None => Ok(()),
            },
            Self::Gzip(w) => match w.take() {
                Some(encoder) => encoder.finish()?.flush(),
                None => Ok(()),
            },
        }
    }
}

impl Write for CompressedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(Some(w)) => w.write(buf),
            Self::Gzip(Some(w)) => w.write(buf),
            _ => Err(io::Error::new(io::ErrorKind::Other, "Cannot write to finished writer")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        CompressedWriter::flush(self)
    }
}

impl Drop for CompressedWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn read_all(reader: CompressedReader) -> Vec<u8> {
        let mut out = Vec::new();
        reader.into_inner().read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_plain_passthrough() {
        let reader = CompressedReader::from_reader(Box::new(Cursor::new(b">s\nACGT\n".to_vec()))).unwrap();
        assert!(!reader.is_compressed());
        assert_eq!(read_all(reader), b">s\nACGT\n");
    }

    #[test]
    fn test_gzip_roundtrip_through_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt.gz");

        let mut writer = CompressedWriter::new(DataSink::from_path(&path)).unwrap();
        writer.write_all(b"hello kmers\n").unwrap();
        writer.finish().unwrap();

        let raw = std::fs::read(&path).unwrap();
        assert_eq!(&raw[..2], &GZIP_MAGIC);

        let reader = CompressedReader::new(DataSource::from_path(&path)).unwrap();
        assert!(reader.is_compressed());
        assert_eq!(read_all(reader), b"hello kmers\n");
    }

    #[test]
    fn test_concatenated_members_decode_fully() {
        let mut data = Vec::new();
        for part in [b"first\n".as_ref(), b"second\n".as_ref()] {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(part).unwrap();
            data.extend(encoder.finish().unwrap());
        }
        let reader = CompressedReader::from_reader(Box::new(Cursor::new(data))).unwrap();
        assert_eq!(read_all(reader), b"first\nsecond\n");
    }

    #[test]
    fn test_empty_input() {
        let reader = CompressedReader::from_reader(Box::new(Cursor::new(Vec::new()))).unwrap();
        assert!(!reader.is_compressed());
        assert!(read_all(reader).is_empty());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = CompressedReader::new(DataSource::from_path("/nonexistent/kmervec/input.fa"));
        assert!(matches!(result, Err(crate::KmervecError::Io(_))));
    }
}
