//! Integration tests for file input and output
//!
//! Vector tables, edge lists and FASTA inputs are written to a temporary
//! directory, plain and gzipped, and read back.

use kmervec::io::word2vec::{self, VectorFormat};
use kmervec::io::{load_edge_list, load_sequences, save_edge_list, CompressedWriter, DataSink};
use kmervec::{EmbeddingTable, KmerGraph, KmervecError};
use std::io::Write;
use tempfile::TempDir;

fn table() -> EmbeddingTable {
    let mut table = EmbeddingTable::new(4).unwrap();
    table.insert(b"ACGTAC", &[0.25, -1.5, 3.0e-5, 7.0]).unwrap();
    table.insert(b"CGTACG", &[-0.1, 0.2, -0.3, 0.4]).unwrap();
    table.insert(b"GTACGT", &[1.0, 1.0, 1.0, f32::MIN_POSITIVE]).unwrap();
    table
}

#[test]
fn test_vector_files_round_trip() {
    let dir = TempDir::new().unwrap();
    for name in ["kmers.txt", "kmers.txt.gz", "kmers.bin", "kmers.bin.gz"] {
        let path = dir.path().join(name);
        let format = VectorFormat::from_path(&path);
        word2vec::save(&table(), &path, format).unwrap();

        let loaded = word2vec::load(&path, format).unwrap();
        assert_eq!(loaded, table(), "{}", name);
    }

    // Gzip output is really compressed
    let raw = std::fs::read(dir.path().join("kmers.bin.gz")).unwrap();
    assert_eq!(&raw[..2], &[0x1f, 0x8b]);
}

#[test]
fn test_vector_file_with_wrong_format() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("kmers.txt");
    word2vec::save(&table(), &path, VectorFormat::Binary).unwrap();

    // Packed floats are not text
    assert!(word2vec::load(&path, VectorFormat::Text).is_err());

    std::fs::write(&path, "2 4\nACGTAC 1 2 3 4\n").unwrap();
    assert!(matches!(
        word2vec::load(&path, VectorFormat::Text),
        Err(KmervecError::InvalidVectorFormat { line: 3, .. })
    ));
}

#[test]
fn test_edge_list_round_trip_gzip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("graph.edgelist.gz");
    let graph = KmerGraph::from_sequences(&["ACGTACGTTGCAACGT", "TTGCAACG"], 3).unwrap();

    save_edge_list(&graph, &path).unwrap();
    let loaded = load_edge_list(&path).unwrap();

    assert_eq!(loaded.mer(), 3);
    assert_eq!(loaded.edge_count(), graph.edge_count());
    for (src, dst, weight) in graph.edges() {
        assert_eq!(loaded.weight(graph.label(src), graph.label(dst)), Some(weight));
    }
}

#[test]
fn test_load_sequences_from_files_and_directories() {
    let dir = TempDir::new().unwrap();
    let genomes = dir.path().join("genomes");
    std::fs::create_dir(&genomes).unwrap();

    std::fs::write(genomes.join("b.fna"), ">b\nacgt\nAC\n").unwrap();
    {
        let mut gz = CompressedWriter::new(DataSink::from_path(genomes.join("a.fa.gz"))).unwrap();
        gz.write_all(b">a1 first\nGATTACA\n>a2\nTTTT\n").unwrap();
        gz.finish().unwrap();
    }
    std::fs::write(genomes.join("README"), "ignored").unwrap();
    std::fs::create_dir(genomes.join("nested.fa")).unwrap();

    let extra = dir.path().join("extra.seq");
    std::fs::write(&extra, ">x\nCCCC\n").unwrap();

    let records = load_sequences(&[genomes.as_path(), extra.as_path()]).unwrap();
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "a2", "b", "x"]);
    assert_eq!(records[0].sequence, b"GATTACA");
    assert_eq!(records[2].sequence, b"ACGTAC");
}

#[test]
fn test_load_sequences_reports_bad_input() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.fa");
    std::fs::write(&path, "ACGT\n>late\nACGT\n").unwrap();

    assert!(matches!(
        load_sequences(&[&path]),
        Err(KmervecError::InvalidFastaFormat { line: 1, .. })
    ));
    assert!(matches!(
        load_sequences(&[dir.path().join("missing.fa")]),
        Err(KmervecError::Io(_))
    ));
}
