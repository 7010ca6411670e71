//! Top-K retrieval precision
//!
//! Every query is a sub-segment vector paired with the identifier of the
//! segment it was cut from. A query hits when that identifier appears among
//! the index's top-K results. Precision is hits divided by queries.

use crate::config::EvaluationConfig;
use crate::error::{KmervecError, Result};
use crate::index::HnswIndex;
use tracing::info;

/// Outcome of one query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    /// Identifier the query should retrieve
    pub expected: String,
    /// Retrieved identifiers, closest first
    pub retrieved: Vec<String>,
    /// 1-based rank of the first retrieved copy of `expected`
    pub rank: Option<usize>,
}

impl QueryOutcome {
    /// Build an outcome from a ranked result list
    pub fn new(expected: impl Into<String>, retrieved: Vec<String>) -> Self {
        let expected = expected.into();
        let rank = retrieved.iter().position(|id| *id == expected).map(|i| i + 1);
        Self {
            expected,
            retrieved,
            rank,
        }
    }

    /// Whether the expected identifier was retrieved at all
    pub fn hit(&self) -> bool {
        self.rank.is_some()
    }

    /// Whether the expected identifier is within the first `k` results
    pub fn hit_at(&self, k: usize) -> bool {
        self.rank.is_some_and(|r| r <= k)
    }
}

/// Aggregate precision plus per-query detail
#[derive(Debug, Clone, PartialEq)]
pub struct PrecisionReport {
    /// Number of results retrieved per query
    pub top_k: usize,
    /// Queries whose expected identifier was retrieved
    pub hits: usize,
    /// `hits / queries.len()`
    pub precision: f64,
    /// Precision at each extra cutoff, ascending by cutoff
    pub at_cutoffs: Vec<(usize, f64)>,
    /// Per-query outcomes in input order
    pub queries: Vec<QueryOutcome>,
}

impl PrecisionReport {
    /// Score already-ranked outcomes
    pub fn from_outcomes(top_k: usize, cutoffs: &[usize], queries: Vec<QueryOutcome>) -> Result<Self> {
        if queries.is_empty() {
            return Err(KmervecError::invalid("queries", "at least one query is required"));
        }
        let total = queries.len() as f64;
        let hits = queries.iter().filter(|q| q.hit_at(top_k)).count();

        let mut cutoffs = cutoffs.to_vec();
        cutoffs.sort_unstable();
        cutoffs.dedup();
        let at_cutoffs = cutoffs
            .into_iter()
            .map(|k| (k, queries.iter().filter(|q| q.hit_at(k)).count() as f64 / total))
            .collect();

        Ok(Self {
            top_k,
            hits,
            precision: hits as f64 / total,
            at_cutoffs,
            queries,
        })
    }

    /// Precision at `k`, if `k` is `top_k` or one of the cutoffs
    pub fn precision_at(&self, k: usize) -> Option<f64> {
        if k == self.top_k {
            return Some(self.precision);
        }
        self.at_cutoffs
            .iter()
            .find(|(cutoff, _)| *cutoff == k)
            .map(|&(_, p)| p)
    }
}

/// Scores an index against ground-truth queries
#[derive(Debug, Clone)]
pub struct PrecisionEvaluator<'i> {
    index: &'i HnswIndex,
    config: EvaluationConfig,
}

impl<'i> PrecisionEvaluator<'i> {
    /// Create an evaluator, validating the configuration
    pub fn new(index: &'i HnswIndex, config: EvaluationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { index, config })
    }

    /// Query the index once per `(vector, expected id)` pair and score the
    /// results at `top_k` and every configured cutoff
    ///
    /// Queries run in parallel. The first failing query aborts the run.
    pub fn evaluate<Q, S>(&self, queries: &[(Q, S)]) -> Result<PrecisionReport>
    where
        Q: AsRef<[f32]> + Sync,
        S: AsRef<str>,
    {
        let vectors: Vec<&[f32]> = queries.iter().map(|(v, _)| v.as_ref()).collect();
        let results = self.index.search_batch(&vectors, self.config.top_k);

        let outcomes = queries
            .iter()
            .zip(results)
            .map(|((_, expected), hits)| {
                let retrieved = hits?.into_iter().map(|h| h.id.to_string()).collect();
                Ok(QueryOutcome::new(expected.as_ref(), retrieved))
            })
            .collect::<Result<Vec<_>>>()?;

        let report = PrecisionReport::from_outcomes(self.config.top_k, &self.config.cutoffs, outcomes)?;
        info!(
            queries = report.queries.len(),
            hits = report.hits,
            top_k = report.top_k,
            precision = report.precision,
            "retrieval evaluated"
        );
        Ok(report)
    }
}
