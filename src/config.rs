//! Configuration records
//!
//! Every tunable of the pipeline lives in one of these structs. Each has a
//! `Default` suited to bacterial-genome-scale input and a `validate()`
//! that is run once when the consuming component is constructed.
//!
//! # Examples
//!
//! ```
//! use kmervec::config::PipelineConfig;
//!
//! let mut config = PipelineConfig::default();
//! config.mers = vec![3, 4];
//! config.validate()?;
//! # Ok::<(), kmervec::KmervecError>(())
//! ```

use crate::error::{KmervecError, Result};
use serde::{Deserialize, Serialize};

/// Biased random walk settings (node2vec)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Return parameter; low values keep the walk near its previous node
    pub p: f64,
    /// In-out parameter; low values push the walk outward.
    ///
    /// The 0.001 default strongly favours exploration. It is kept as a
    /// tunable default rather than a constant.
    pub q: f64,
    /// Walks started from every start node
    pub num_walks: usize,
    /// Maximum nodes per walk (including the start node)
    pub walk_length: usize,
    /// Worker threads used to generate walks
    pub workers: usize,
    /// Seed for start-order shuffles and per-walk RNGs
    pub seed: u64,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            p: 1.0,
            q: 0.001,
            num_walks: 40,
            walk_length: 150,
            workers: 4,
            seed: 42,
        }
    }
}

impl WalkConfig {
    /// Check every field
    pub fn validate(&self) -> Result<()> {
        positive_f64("p", self.p)?;
        positive_f64("q", self.q)?;
        at_least_one("num_walks", self.num_walks)?;
        at_least_one("walk_length", self.walk_length)?;
        at_least_one("workers", self.workers)
    }
}

/// Skip-gram trainer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Embedding dimension
    pub dimensions: usize,
    /// Maximum distance between a token and its context
    pub window: usize,
    /// Tokens seen fewer times than this are dropped from the vocabulary
    pub min_count: usize,
    /// Passes over the walk corpus
    pub epochs: usize,
    /// Worker threads used for training
    pub workers: usize,
    /// Negative samples per positive pair
    pub negative: usize,
    /// Initial learning rate
    pub alpha: f32,
    /// Final learning rate
    pub min_alpha: f32,
    /// Seed for initialization, window shrinking and negative draws
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            dimensions: 128,
            window: 10,
            min_count: 1,
            epochs: 1,
            workers: 4,
            negative: 5,
            alpha: 0.025,
            min_alpha: 0.0001,
            seed: 42,
        }
    }
}

impl TrainerConfig {
    /// Check every field
    pub fn validate(&self) -> Result<()> {
        at_least_one("dimensions", self.dimensions)?;
        at_least_one("window", self.window)?;
        at_least_one("min_count", self.min_count)?;
        at_least_one("epochs", self.epochs)?;
        at_least_one("workers", self.workers)?;
        at_least_one("negative", self.negative)?;
        positive_f64("alpha", f64::from(self.alpha))?;
        positive_f64("min_alpha", f64::from(self.min_alpha))?;
        if self.min_alpha > self.alpha {
            return Err(KmervecError::invalid(
                "min_alpha",
                format!("{} exceeds alpha {}", self.min_alpha, self.alpha),
            ));
        }
        Ok(())
    }
}

/// Segment and sub-segment extraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Length of every corpus segment
    pub segment_length: usize,
    /// Number of sub-segment queries to extract
    pub subsegment_count: usize,
    /// Sub-segment length; `None` means half the segment length, never
    /// shorter than the pooling k-mer length
    pub subsegment_length: Option<usize>,
    /// Seed for sub-segment sampling
    pub seed: u64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            segment_length: 100,
            subsegment_count: 1000,
            subsegment_length: None,
            seed: 42,
        }
    }
}

impl SegmentConfig {
    /// Check every field against the pooling k-mer length `mer`
    pub fn validate(&self, mer: usize) -> Result<()> {
        at_least_one("segment_length", self.segment_length)?;
        at_least_one("subsegment_count", self.subsegment_count)?;
        let sub = self.resolved_subsegment_length(mer);
        if sub < mer || sub > self.segment_length {
            return Err(KmervecError::invalid(
                "subsegment_length",
                format!(
                    "{} must lie between the k-mer length {} and the segment length {}",
                    sub, mer, self.segment_length
                ),
            ));
        }
        Ok(())
    }

    /// Sub-segment length actually used for pooling k-mer length `mer`
    pub fn resolved_subsegment_length(&self, mer: usize) -> usize {
        self.subsegment_length
            .unwrap_or_else(|| (self.segment_length / 2).max(mer))
    }
}

/// Similarity used by the ANN index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    /// Smaller L2 distance is more similar
    Euclidean,
    /// Larger dot product is more similar
    InnerProduct,
}

/// HNSW construction and search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Similarity metric
    pub metric: Metric,
    /// Maximum neighbors per node on upper layers (layer 0 allows `2 * m`)
    pub m: usize,
    /// Beam width while inserting
    pub ef_construction: usize,
    /// Beam width while querying
    pub ef_search: usize,
    /// Seed for level assignment
    pub seed: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            metric: Metric::Euclidean,
            m: 100,
            ef_construction: 128,
            ef_search: 2000,
            seed: 42,
        }
    }
}

impl IndexConfig {
    /// Check every field
    pub fn validate(&self) -> Result<()> {
        if self.m < 2 {
            return Err(KmervecError::invalid("m", format!("must be at least 2, got {}", self.m)));
        }
        at_least_one("ef_construction", self.ef_construction)?;
        at_least_one("ef_search", self.ef_search)
    }
}

/// Retrieval evaluation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Hits are counted within the top `top_k` results
    pub top_k: usize,
    /// Extra cutoffs reported alongside `top_k` (each must be ≤ `top_k`)
    pub cutoffs: Vec<usize>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            top_k: 20,
            cutoffs: vec![1, 5, 10],
        }
    }
}

impl EvaluationConfig {
    /// Check every field
    pub fn validate(&self) -> Result<()> {
        at_least_one("top_k", self.top_k)?;
        for &cutoff in &self.cutoffs {
            if cutoff == 0 || cutoff > self.top_k {
                return Err(KmervecError::invalid(
                    "cutoffs",
                    format!("{} must lie in 1..={}", cutoff, self.top_k),
                ));
            }
        }
        Ok(())
    }
}

/// Settings for the full three-stage pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// K-mer scales; one embedding model is trained per scale and pivots are
    /// k-mers of the largest scale
    pub mers: Vec<usize>,
    /// K-mer length used to pool segments; `None` pools with the pivot length
    pub pooling_mer: Option<usize>,
    /// Random walk settings
    pub walk: WalkConfig,
    /// Trainer settings
    pub trainer: TrainerConfig,
    /// Segmentation settings
    pub segments: SegmentConfig,
    /// Index settings
    pub index: IndexConfig,
    /// Evaluation settings
    pub evaluation: EvaluationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mers: vec![6, 7, 8],
            pooling_mer: None,
            walk: WalkConfig::default(),
            trainer: TrainerConfig::default(),
            segments: SegmentConfig::default(),
            index: IndexConfig::default(),
            evaluation: EvaluationConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Check every section
    pub fn validate(&self) -> Result<()> {
        if self.mers.is_empty() {
            return Err(KmervecError::invalid("mers", "at least one k-mer length is required"));
        }
        for &mer in &self.mers {
            at_least_one("mers", mer)?;
        }
        let pivot = self.pivot_mer();
        let pooling = self.resolved_pooling_mer();
        if pooling != pivot && !self.mers.contains(&pooling) {
            return Err(KmervecError::invalid(
                "pooling_mer",
                format!("{} is neither the pivot length {} nor a trained scale", pooling, pivot),
            ));
        }
        self.walk.validate()?;
        self.trainer.validate()?;
        self.segments.validate(pooling)?;
        self.index.validate()?;
        self.evaluation.validate()
    }

    /// Length of the pivot k-mers (the largest scale)
    pub fn pivot_mer(&self) -> usize {
        self.mers.iter().copied().max().unwrap_or(0)
    }

    /// K-mer length used for segment pooling
    pub fn resolved_pooling_mer(&self) -> usize {
        self.pooling_mer.unwrap_or_else(|| self.pivot_mer())
    }

    /// Scales sorted ascending with duplicates removed
    pub fn sorted_mers(&self) -> Vec<usize> {
        let mut mers = self.mers.clone();
        mers.sort_unstable();
        mers.dedup();
        mers
    }
}

fn at_least_one(name: &'static str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(KmervecError::invalid(name, "must be at least 1"));
    }
    Ok(())
}

fn positive_f64(name: &'static str, value: f64) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(KmervecError::invalid(
            name,
            format!("must be a positive finite number, got {}", value),
        ));
    }
    Ok(())
}
