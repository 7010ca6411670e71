//! Weighted edge lists
//!
//! One edge per line, `src dst weight`, separated by whitespace. Blank
//! lines and lines starting with `#` are ignored when reading. The k-mer
//! length is taken from the first edge. Nodes without edges cannot be
//! represented and are lost on a round trip.

use crate::error::{KmervecError, Result};
use crate::graph::{KmerGraph, KmerGraphBuilder};
use crate::io::compression::{CompressedReader, CompressedWriter, DataSource};
use crate::io::sink::DataSink;
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::info;

/// Write every edge of `graph` in arena order
pub fn write_edge_list<W: Write>(graph: &KmerGraph, mut writer: W) -> Result<()> {
    for (src, dst, weight) in graph.edges() {
        writer.write_all(graph.label(src))?;
        writer.write_all(b" ")?;
        writer.write_all(graph.label(dst))?;
        writeln!(writer, " {}", weight)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a graph from an edge list; repeated edges add their weights
pub fn read_edge_list<R: BufRead>(reader: R) -> Result<KmerGraph> {
    let mut builder: Option<KmerGraphBuilder> = None;

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = i + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let invalid = |msg: String| KmervecError::InvalidEdgeList {
            line: line_number,
            msg,
        };
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let [src, dst, weight] = fields[..] else {
            return Err(invalid(format!("expected 'src dst weight', got {:?}", trimmed)));
        };
        let weight: u32 = weight
            .parse()
            .ok()
            .filter(|&w| w > 0)
            .ok_or_else(|| invalid(format!("weight {:?} is not a positive integer", weight)))?;

        if builder.is_none() {
            builder = Some(KmerGraphBuilder::new(src.len())?);
        }
        if let Some(builder) = builder.as_mut() {
            builder
                .add_edge(src.as_bytes(), dst.as_bytes(), weight)
                .map_err(|e| invalid(e.to_string()))?;
        }
    }

    match builder {
        Some(builder) => builder.build(),
        None => Err(KmervecError::InvalidEdgeList {
            line: 0,
            msg: "no edges".to_string(),
        }),
    }
}

/// Save `graph` as an edge list, gzipping `.gz` paths
pub fn save_edge_list<P: AsRef<Path>>(graph: &KmerGraph, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = CompressedWriter::new(DataSink::from_path(path))?;
    write_edge_list(graph, &mut writer)?;
    writer.finish()?;
    info!(path = %path.display(), edges = graph.edge_count(), "edge list saved");
    Ok(())
}

/// Load a graph from an edge list file, plain or gzip
pub fn load_edge_list<P: AsRef<Path>>(path: P) -> Result<KmerGraph> {
    read_edge_list(CompressedReader::new(DataSource::from_path(path))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_roundtrip_preserves_edges() {
        let graph = KmerGraph::from_sequences(&[b"ACGTACGT".as_ref(), b"ACGTTGCA".as_ref()], 4).unwrap();
        let mut out = Vec::new();
        write_edge_list(&graph, &mut out).unwrap();

        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.lines().any(|l| l == "ACGT CGTA 1"));
        assert_eq!(text.lines().count(), graph.edge_count());

        let reloaded = read_edge_list(Cursor::new(out)).unwrap();
        assert_eq!(reloaded.edge_count(), graph.edge_count());
        for (src, dst, weight) in graph.edges() {
            assert_eq!(reloaded.weight(graph.label(src), graph.label(dst)), Some(weight));
        }
    }

    #[test]
    fn test_comments_and_repeats() {
        let data = b"# kmer graph\n\nAC CG 2\nAC CG 3\nCG GT 1\n";
        let graph = read_edge_list(Cursor::new(data.as_ref())).unwrap();
        assert_eq!(graph.mer(), 2);
        assert_eq!(graph.weight(b"AC", b"CG"), Some(5));
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn test_malformed_lines_report_line_number() {
        let cases: [&[u8]; 4] = [
            b"AC CG\n",
            b"AC CG x\n",
            b"AC CG 1\nAC CGT 1\n",
            b"AC CG 0\n",
        ];
        for data in cases {
            match read_edge_list(Cursor::new(data)) {
                Err(KmervecError::InvalidEdgeList { line, .. }) => assert!(line >= 1),
                other => panic!("expected InvalidEdgeList, got {:?}", other),
            }
        }
        assert!(read_edge_list(Cursor::new(b"# nothing\n".as_ref())).is_err());
    }
}
