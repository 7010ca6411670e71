//! word2vec vector files
//!
//! Both formats start with a text header `"<count> <dim>\n"`.
//!
//! - **Text**: one row per token, `token v1 v2 ... vd\n`.
//! - **Binary**: one row per token, the token bytes, a space, then `d`
//!   little-endian `f32`. No separator follows the floats; a newline before
//!   a token is tolerated when reading, as other tools write one.
//!
//! Tokens are raw bytes in both formats and need not be UTF-8.
//!
//! Paths ending in `.gz` are gzipped on save and sniffed on load. Text
//! output prints floats in shortest round-trip form, so both formats reload
//! bit-identical vectors.

use crate::embedding::EmbeddingTable;
use crate::error::{display_bytes, KmervecError, Result};
use crate::io::compression::{CompressedReader, CompressedWriter, DataSource};
use crate::io::sink::DataSink;
use std::io::{BufRead, Read, Write};
use std::path::Path;
use tracing::info;

/// Upper bound on rows reserved from an untrusted header
const MAX_PREALLOCATED_ROWS: usize = 1 << 20;

/// On-disk layout of a vector file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorFormat {
    /// Space-separated decimal floats
    Text,
    /// Packed little-endian `f32`
    Binary,
}

impl VectorFormat {
    /// `Binary` for `.bin` (or `.bin.gz`) paths, `Text` otherwise
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let name = path
            .as_ref()
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("");
        let name = name.strip_suffix(".gz").unwrap_or(name);
        if name.ends_with(".bin") {
            Self::Binary
        } else {
            Self::Text
        }
    }
}

/// Write `table` to `writer`
pub fn write<W: Write>(table: &EmbeddingTable, mut writer: W, format: VectorFormat) -> Result<()> {
    writeln!(writer, "{} {}", table.len(), table.dim())?;
    for (token, vector) in table.iter() {
        writer.write_all(token)?;
        match format {
            VectorFormat::Text => {
                for v in vector {
                    write!(writer, " {}", v)?;
                }
                writer.write_all(b"\n")?;
            }
            VectorFormat::Binary => {
                writer.write_all(b" ")?;
                for v in vector {
                    writer.write_all(&v.to_le_bytes())?;
                }
            }
        }
    }
    writer.flush()?;
    Ok(())
}

/// Read a table from `reader`
pub fn read<R: BufRead>(mut reader: R, format: VectorFormat) -> Result<EmbeddingTable> {
    let mut header = String::new();
    reader.read_line(&mut header)?;
    let (count, dim) = parse_header(&header)?;
    let mut table = EmbeddingTable::with_capacity(dim, count.min(MAX_PREALLOCATED_ROWS)).map_err(|_| {
        KmervecError::InvalidVectorFormat {
            line: 1,
            msg: "dimension must be at least 1".to_string(),
        }
    })?;

    match format {
        VectorFormat::Text => read_text_rows(&mut reader, &mut table, count)?,
        VectorFormat::Binary => read_binary_rows(&mut reader, &mut table, count)?,
    }
    Ok(table)
}

/// Save `table` to `path`, gzipping `.gz` paths
pub fn save<P: AsRef<Path>>(table: &EmbeddingTable, path: P, format: VectorFormat) -> Result<()> {
    let path = path.as_ref();
    let mut writer = CompressedWriter::new(DataSink::from_path(path))?;
    write(table, &mut writer, format)?;
    writer.finish()?;
    info!(path = %path.display(), tokens = table.len(), dim = table.dim(), ?format, "vectors saved");
    Ok(())
}

/// Load a table from `path`, plain or gzip
pub fn load<P: AsRef<Path>>(path: P, format: VectorFormat) -> Result<EmbeddingTable> {
    let path = path.as_ref();
    let table = read(CompressedReader::new(DataSource::from_path(path))?, format)?;
    info!(path = %path.display(), tokens = table.len(), dim = table.dim(), ?format, "vectors loaded");
    Ok(table)
}

fn parse_header(header: &str) -> Result<(usize, usize)> {
    let invalid = || KmervecError::InvalidVectorFormat {
        line: 1,
        msg: format!("expected '<count> <dim>' header, got: {:?}", header.trim_end()),
    };
    let mut fields = header.split_whitespace();
    let count = fields.next().and_then(|f| f.parse().ok()).ok_or_else(invalid)?;
    let dim = fields.next().and_then(|f| f.parse().ok()).ok_or_else(invalid)?;
    if fields.next().is_some() {
        return Err(invalid());
    }
    Ok((count, dim))
}

fn read_text_rows<R: BufRead>(reader: &mut R, table: &mut EmbeddingTable, count: usize) -> Result<()> {
    let mut line = Vec::new();
    let mut vector = Vec::with_capacity(table.dim());
    let mut line_number = 1;

    for _ in 0..count {
        line_number += 1;
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Err(KmervecError::InvalidVectorFormat {
                line: line_number,
                msg: format!("header promised {} vectors, file ended after {}", count, table.len()),
            });
        }

        // Tokens are opaque bytes; only the values must be text
        let mut fields = line
            .split(|b| b.is_ascii_whitespace())
            .filter(|field| !field.is_empty());
        let token = fields.next().ok_or_else(|| KmervecError::InvalidVectorFormat {
            line: line_number,
            msg: "empty row".to_string(),
        })?;
        vector.clear();
        for field in fields {
            let value = std::str::from_utf8(field)
                .ok()
                .and_then(|f| f.parse::<f32>().ok())
                .ok_or_else(|| KmervecError::InvalidVectorFormat {
                    line: line_number,
                    msg: format!(
                        "{:?} is not a number (token {})",
                        display_bytes(field),
                        display_bytes(token)
                    ),
                })?;
            vector.push(value);
        }
        if vector.len() != table.dim() {
            return Err(KmervecError::InvalidVectorFormat {
                line: line_number,
                msg: format!(
                    "token {} has {} values, expected {}",
                    display_bytes(token),
                    vector.len(),
                    table.dim()
                ),
            });
        }
        table.insert(token, &vector)?;
    }
    Ok(())
}

fn read_binary_rows<R: BufRead>(reader: &mut R, table: &mut EmbeddingTable, count: usize) -> Result<()> {
    let dim = table.dim();
    let mut token = Vec::new();
    let mut raw = vec![0u8; dim * 4];
    let mut vector = vec![0f32; dim];

    for record in 0..count {
        let line = record + 2;
        token.clear();
        reader.read_until(b' ', &mut token)?;
        if token.pop() != Some(b' ') {
            return Err(KmervecError::InvalidVectorFormat {
                line,
                msg: format!("header promised {} vectors, file ended after {}", count, record),
            });
        }
        let start = token.iter().take_while(|&&b| b == b'\n').count();
        let name = &token[start..];

        reader.read_exact(&mut raw).map_err(|_| KmervecError::InvalidVectorFormat {
            line,
            msg: format!("truncated vector for token {}", display_bytes(name)),
        })?;
        for (v, bytes) in vector.iter_mut().zip(raw.chunks_exact(4)) {
            *v = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }
        table.insert(name, &vector)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> EmbeddingTable {
        let mut table = EmbeddingTable::new(3).unwrap();
        table.insert(b"ACGT", &[0.1, -2.5, 1e-7]).unwrap();
        table.insert(b"CGTA", &[3.25, 0.0, -0.333_333_34]).unwrap();
        table
    }

    #[test]
    fn test_text_layout() {
        let mut out = Vec::new();
        write(&sample(), &mut out, VectorFormat::Text).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "2 3");
        assert_eq!(lines[1], "ACGT 0.1 -2.5 0.0000001");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_both_formats_reload_exactly() {
        for format in [VectorFormat::Text, VectorFormat::Binary] {
            let mut out = Vec::new();
            write(&sample(), &mut out, format).unwrap();
            let table = read(Cursor::new(out), format).unwrap();
            assert_eq!(table, sample(), "{:?}", format);
        }
    }

    #[test]
    fn test_binary_layout_and_leading_newlines() {
        let mut out = Vec::new();
        write(&sample(), &mut out, VectorFormat::Binary).unwrap();
        assert!(out.starts_with(b"2 3\nACGT "));
        assert_eq!(out.len(), 4 + 2 * (5 + 12));

        // Same rows with a newline after each vector
        let mut padded = b"2 3\n".to_vec();
        for (token, vector) in sample().iter() {
            padded.extend_from_slice(token);
            padded.push(b' ');
            for v in vector {
                padded.extend_from_slice(&v.to_le_bytes());
            }
            padded.push(b'\n');
        }
        assert_eq!(read(Cursor::new(padded), VectorFormat::Binary).unwrap(), sample());
    }

    #[test]
    fn test_non_utf8_tokens_reload() {
        let mut table = EmbeddingTable::new(2).unwrap();
        table.insert(b"AC\xff", &[0.5, -1.0]).unwrap();
        table.insert(b"\xc3\x28G", &[2.0, 0.25]).unwrap();

        for format in [VectorFormat::Text, VectorFormat::Binary] {
            let mut buffer = Vec::new();
            write(&table, &mut buffer, format).unwrap();
            let loaded = read(Cursor::new(buffer), format).unwrap();
            assert_eq!(loaded.len(), 2);
            assert_eq!(loaded.get(b"AC\xff"), Some([0.5f32, -1.0].as_slice()));
            assert_eq!(loaded.get(b"\xc3\x28G"), Some([2.0f32, 0.25].as_slice()));
        }
    }

    #[test]
    fn test_malformed_files() {
        let cases: [(&[u8], VectorFormat); 5] = [
            (b"two 3\n", VectorFormat::Text),
            (b"2 3\nACGT 1 2 3\n", VectorFormat::Text),
            (b"1 3\nACGT 1 2\n", VectorFormat::Text),
            (b"1 2\nACGT 1 x\n", VectorFormat::Text),
            (b"1 2\nACGT \x00\x00", VectorFormat::Binary),
        ];
        for (data, format) in cases {
            assert!(
                matches!(read(Cursor::new(data), format), Err(KmervecError::InvalidVectorFormat { .. })),
                "accepted {:?}",
                String::from_utf8_lossy(data)
            );
        }
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(VectorFormat::from_path("kmers.bin"), VectorFormat::Binary);
        assert_eq!(VectorFormat::from_path("out/kmers.bin.gz"), VectorFormat::Binary);
        assert_eq!(VectorFormat::from_path("kmers.txt.gz"), VectorFormat::Text);
        assert_eq!(VectorFormat::from_path("kmers"), VectorFormat::Text);
    }
}
