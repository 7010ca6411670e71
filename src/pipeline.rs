//! Three-stage retrieval benchmark
//!
//! 1. [`KmerEmbedder`]: for every k-mer scale, build the graph, walk it and
//!    train vectors; then compose a multi-scale vector for every k-mer of
//!    the largest (pivot) scale.
//! 2. [`SegmentEmbedder`]: cut sequences into segments, sample one
//!    sub-segment from each of a random subset, and mean-pool both.
//! 3. [`SequenceRetrieval`]: index the segment vectors and measure how often
//!    a sub-segment retrieves the segment it was cut from.
//!
//! [`Pipeline`] chains the stages; each can also be driven on its own.

use crate::config::{EvaluationConfig, IndexConfig, PipelineConfig, SegmentConfig, TrainerConfig, WalkConfig};
use crate::embedding::{ContextEmbeddingTrainer, EmbeddingTable, MultiScaleComposer, SegmentPooler};
use crate::error::{KmervecError, Result};
use crate::eval::{PrecisionEvaluator, PrecisionReport};
use crate::graph::{AliasSampler, KmerGraph, RandomWalkGenerator};
use crate::index::HnswIndex;
use crate::io::load_sequences;
use crate::operations::{sample_subsegments, split_segments, KmerExtractor};
use crate::types::{Segment, SequenceRecord, SubSegment};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Output of [`KmerEmbedder::embed`]
#[derive(Debug)]
pub struct KmerEmbeddings {
    /// Trained vectors of every scale, merged into one table
    pub scales: EmbeddingTable,
    /// Multi-scale vectors of the pivot k-mers, in first-appearance order
    pub pivots: EmbeddingTable,
    /// Pivots that could not be composed
    pub failures: Vec<(Vec<u8>, KmervecError)>,
}

/// Stage 1: multi-scale k-mer embeddings
#[derive(Debug, Clone)]
pub struct KmerEmbedder {
    mers: Vec<usize>,
    walk: WalkConfig,
    trainer: TrainerConfig,
}

impl KmerEmbedder {
    /// Create the stage for the given scales
    pub fn new(mers: Vec<usize>, walk: WalkConfig, trainer: TrainerConfig) -> Result<Self> {
        walk.validate()?;
        trainer.validate()?;
        let composer = MultiScaleComposer::new(mers)?;
        Ok(Self {
            mers: composer.scales().to_vec(),
            walk,
            trainer,
        })
    }

    /// Scales in ascending order
    pub fn mers(&self) -> &[usize] {
        &self.mers
    }

    /// Pivot k-mer length (the largest scale)
    pub fn pivot_mer(&self) -> usize {
        self.mers.last().copied().unwrap_or(0)
    }

    /// Graph → walks → trainer for one scale
    pub fn train_scale(&self, records: &[SequenceRecord], mer: usize) -> Result<EmbeddingTable> {
        let started = Instant::now();
        let sequences: Vec<&[u8]> = records.iter().map(|r| r.sequence.as_slice()).collect();
        let graph = KmerGraph::from_sequences(&sequences, mer)?;
        info!(
            mer,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "k-mer graph built"
        );

        let sampler = AliasSampler::new(&graph, self.walk.p, self.walk.q)?;
        let walks = RandomWalkGenerator::new(&sampler, &self.walk)?.walks();
        let sentences = walks.map(|walk| walk.into_iter().map(|node| graph.label(node)).collect::<Vec<_>>());
        let table = ContextEmbeddingTrainer::new(self.trainer.clone())?.train(sentences)?;

        info!(
            mer,
            tokens = table.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scale trained"
        );
        Ok(table)
    }

    /// Train every scale and compose the pivot vectors
    pub fn embed(&self, records: &[SequenceRecord]) -> Result<KmerEmbeddings> {
        let mut scales = EmbeddingTable::new(self.trainer.dimensions)?;
        for &mer in &self.mers {
            scales.extend_from(&self.train_scale(records, mer)?)?;
        }

        let sequences: Vec<&[u8]> = records.iter().map(|r| r.sequence.as_slice()).collect();
        let pivots = KmerExtractor::with_parallel(self.walk.workers).distinct(&sequences, self.pivot_mer());
        let composition = MultiScaleComposer::new(self.mers.clone())?.compose_all(&pivots, &scales)?;

        Ok(KmerEmbeddings {
            scales,
            pivots: composition.table,
            failures: composition.failures,
        })
    }
}

/// Output of [`SegmentEmbedder::embed`]
#[derive(Debug, Clone)]
pub struct SegmentEmbeddings {
    /// Segments that pooled, in corpus order
    pub segments: Vec<Segment>,
    /// Vector of each entry of `segments`
    pub segment_vectors: Vec<Vec<f32>>,
    /// Sampled sub-segments that pooled
    pub subsegments: Vec<SubSegment>,
    /// Vector of each entry of `subsegments`
    pub subsegment_vectors: Vec<Vec<f32>>,
    /// Segments dropped because none of their k-mers has a vector
    pub skipped_segments: usize,
    /// Sub-segments dropped for the same reason
    pub skipped_subsegments: usize,
}

impl SegmentEmbeddings {
    /// `(identifier, vector)` pairs ready for indexing
    pub fn corpus(&self) -> impl Iterator<Item = (String, &[f32])> + '_ {
        self.segments
            .iter()
            .zip(&self.segment_vectors)
            .map(|(s, v)| (s.id(), v.as_slice()))
    }

    /// `(vector, expected identifier)` query pairs
    pub fn queries(&self) -> Vec<(&[f32], &str)> {
        self.subsegments
            .iter()
            .zip(&self.subsegment_vectors)
            .map(|(s, v)| (v.as_slice(), s.origin.as_str()))
            .collect()
    }
}

/// Stage 2: segment and sub-segment vectors
#[derive(Debug, Clone, Copy)]
pub struct SegmentEmbedder<'t> {
    pooler: SegmentPooler<'t>,
    config: &'t SegmentConfig,
}

impl<'t> SegmentEmbedder<'t> {
    /// Create the stage pooling `mer`-length k-mers from `table`
    pub fn new(table: &'t EmbeddingTable, mer: usize, config: &'t SegmentConfig) -> Result<Self> {
        config.validate(mer)?;
        Ok(Self {
            pooler: SegmentPooler::new(table, mer)?,
            config,
        })
    }

    /// Segment, sample and pool
    ///
    /// Sub-segments are only drawn from segments that pooled, so every query
    /// has its answer in the corpus.
    pub fn embed(&self, records: &[SequenceRecord]) -> Result<SegmentEmbeddings> {
        let all_segments = split_segments(records, self.config.segment_length)?;
        let total = all_segments.len();
        let sequences: Vec<&[u8]> = all_segments.iter().map(|s| s.sequence.as_slice()).collect();
        let pooled = self.pooler.pool_batch(&sequences);

        let mut segments = Vec::with_capacity(all_segments.len());
        let mut segment_vectors = Vec::with_capacity(all_segments.len());
        for (segment, vector) in all_segments.into_iter().zip(pooled) {
            if let Ok(vector) = vector {
                segments.push(segment);
                segment_vectors.push(vector);
            }
        }
        let skipped_segments = total - segments.len();

        let sampled = sample_subsegments(
            &segments,
            self.config.subsegment_count,
            self.config.resolved_subsegment_length(self.pooler.mer()),
            self.config.seed,
        )?;
        let sampled_count = sampled.len();
        let sequences: Vec<&[u8]> = sampled.iter().map(|s| s.sequence.as_slice()).collect();
        let pooled = self.pooler.pool_batch(&sequences);

        let mut subsegments = Vec::with_capacity(sampled.len());
        let mut subsegment_vectors = Vec::with_capacity(sampled.len());
        for (subsegment, vector) in sampled.into_iter().zip(pooled) {
            if let Ok(vector) = vector {
                subsegments.push(subsegment);
                subsegment_vectors.push(vector);
            }
        }
        let skipped_subsegments = sampled_count - subsegments.len();

        if skipped_segments + skipped_subsegments > 0 {
            warn!(skipped_segments, skipped_subsegments, "dropped items without embedded k-mers");
        }
        info!(
            segments = segments.len(),
            subsegments = subsegments.len(),
            "segment vectors pooled"
        );
        Ok(SegmentEmbeddings {
            segments,
            segment_vectors,
            subsegments,
            subsegment_vectors,
            skipped_segments,
            skipped_subsegments,
        })
    }
}

/// Stage 3: index segments and score sub-segment retrieval
#[derive(Debug, Clone)]
pub struct SequenceRetrieval {
    index: IndexConfig,
    evaluation: EvaluationConfig,
}

impl SequenceRetrieval {
    /// Create the stage
    pub fn new(index: IndexConfig, evaluation: EvaluationConfig) -> Result<Self> {
        index.validate()?;
        evaluation.validate()?;
        Ok(Self { index, evaluation })
    }

    /// Build an index over segment vectors of dimension `dim`
    pub fn build_index(&self, dim: usize, embeddings: &SegmentEmbeddings) -> Result<HnswIndex> {
        HnswIndex::build(dim, self.index.clone(), embeddings.corpus())
    }

    /// Index the segments and evaluate every sub-segment query
    pub fn evaluate(&self, dim: usize, embeddings: &SegmentEmbeddings) -> Result<PrecisionReport> {
        let index = self.build_index(dim, embeddings)?;
        PrecisionEvaluator::new(&index, self.evaluation.clone())?.evaluate(&embeddings.queries())
    }
}

/// Everything produced by [`Pipeline::run`]
#[derive(Debug)]
pub struct PipelineReport {
    /// Stage 1 output
    pub kmers: KmerEmbeddings,
    /// Stage 2 output
    pub segments: SegmentEmbeddings,
    /// Stage 3 output
    pub precision: PrecisionReport,
}

/// All three stages with one configuration
///
/// # Example
///
/// ```no_run
/// use kmervec::config::PipelineConfig;
/// use kmervec::pipeline::Pipeline;
///
/// # fn main() -> kmervec::Result<()> {
/// let report = Pipeline::new(PipelineConfig::default())?.run_paths(&["data/"])?;
/// println!("precision@{}: {:.3}", report.precision.top_k, report.precision.precision);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline, validating the whole configuration
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Pipeline settings
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load FASTA files or directories, then [`Pipeline::run`]
    pub fn run_paths<P: AsRef<Path>>(&self, paths: &[P]) -> Result<PipelineReport> {
        let records = load_sequences(paths)?;
        self.run(&records)
    }

    /// Run all three stages over `records`
    pub fn run(&self, records: &[SequenceRecord]) -> Result<PipelineReport> {
        let cfg = &self.config;

        let started = Instant::now();
        let kmers = KmerEmbedder::new(cfg.mers.clone(), cfg.walk.clone(), cfg.trainer.clone())?.embed(records)?;
        info!(elapsed_ms = started.elapsed().as_millis() as u64, "k-mer embedding stage done");

        let started = Instant::now();
        let pooling_mer = cfg.resolved_pooling_mer();
        let table = if pooling_mer == cfg.pivot_mer() {
            &kmers.pivots
        } else {
            &kmers.scales
        };
        let segments = SegmentEmbedder::new(table, pooling_mer, &cfg.segments)?.embed(records)?;
        info!(elapsed_ms = started.elapsed().as_millis() as u64, "segment embedding stage done");

        let started = Instant::now();
        let precision = SequenceRetrieval::new(cfg.index.clone(), cfg.evaluation.clone())?
            .evaluate(table.dim(), &segments)?;
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            precision = precision.precision,
            "retrieval stage done"
        );

        Ok(PipelineReport {
            kmers,
            segments,
            precision,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<SequenceRecord> {
        vec![
            SequenceRecord::new("a".to_string(), b"ACGTTGCAAGGCTTACCGATAGCTAGGCATCGAT".to_vec()),
            SequenceRecord::new("b".to_string(), b"TTGACCGTAGCATGCAAGTCCGATTAGCAGTACG".to_vec()),
        ]
    }

    fn small_walk() -> WalkConfig {
        WalkConfig {
            num_walks: 4,
            walk_length: 10,
            workers: 1,
            ..Default::default()
        }
    }

    fn small_trainer() -> TrainerConfig {
        TrainerConfig {
            dimensions: 8,
            window: 3,
            workers: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_kmer_stage_composes_every_pivot() {
        let embedder = KmerEmbedder::new(vec![4, 3], small_walk(), small_trainer()).unwrap();
        assert_eq!(embedder.mers(), &[3, 4]);
        let out = embedder.embed(&records()).unwrap();

        assert!(out.failures.is_empty());
        assert_eq!(out.pivots.dim(), 16);
        assert!(out.pivots.contains(b"ACGT"));
        assert!(out.scales.contains(b"ACG"));
        assert!(out.scales.contains(b"ACGT"));
        // Every pivot of the input got a vector
        let records = records();
        let sequences: Vec<&[u8]> = records.iter().map(|r| r.sequence.as_slice()).collect();
        assert_eq!(out.pivots.len(), crate::operations::kmer_spectrum(&sequences, 4).len());
    }

    #[test]
    fn test_segment_stage_queries_point_into_corpus() {
        let mut table = EmbeddingTable::new(2).unwrap();
        for (i, kmer) in [b"AAA", b"CCC", b"GGG"].iter().enumerate() {
            table.insert(*kmer, &[i as f32, 1.0]).unwrap();
        }
        let records = vec![SequenceRecord::new("r".to_string(), b"AAAAAATTTTTTCCCCCCGGGG".to_vec())];
        let config = SegmentConfig {
            segment_length: 6,
            subsegment_count: 10,
            subsegment_length: Some(4),
            seed: 1,
        };
        let out = SegmentEmbedder::new(&table, 3, &config).unwrap().embed(&records).unwrap();

        // TTTTTT has no known k-mer; GGGG is a remainder
        assert_eq!(out.segments.len(), 2);
        assert_eq!(out.skipped_segments, 1);
        assert_eq!(out.subsegments.len(), 2);
        let ids: Vec<String> = out.segments.iter().map(Segment::id).collect();
        for (_, origin) in out.queries() {
            assert!(ids.iter().any(|id| id == origin));
        }
    }

    #[test]
    fn test_pipeline_runs_end_to_end() {
        let config = PipelineConfig {
            mers: vec![3, 4],
            walk: small_walk(),
            trainer: small_trainer(),
            segments: SegmentConfig {
                segment_length: 8,
                subsegment_count: 5,
                subsegment_length: None,
                seed: 3,
            },
            index: IndexConfig {
                m: 4,
                ef_construction: 16,
                ef_search: 32,
                ..Default::default()
            },
            evaluation: EvaluationConfig {
                top_k: 3,
                cutoffs: vec![1],
            },
            ..Default::default()
        };
        let report = Pipeline::new(config).unwrap().run(&records()).unwrap();

        assert_eq!(report.segments.segments.len(), 8);
        assert_eq!(report.precision.queries.len(), 5);
        assert!((0.0..=1.0).contains(&report.precision.precision));
        assert!(report.precision.precision_at(1).unwrap() <= report.precision.precision);
    }
}
