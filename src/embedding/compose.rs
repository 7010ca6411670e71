//! Multi-scale pivot vectors
//!
//! A pivot k-mer of length `n` is described at every configured scale
//! `s <= n`: the mean of the vectors of its `n - s + 1` overlapping
//! sub-k-mers of length `s`. The per-scale means are concatenated in
//! ascending scale order.

use crate::embedding::table::EmbeddingTable;
use crate::error::{display_bytes, KmervecError, Result};
use crate::operations::kmer_iter;
use rayon::prelude::*;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Composes pivot vectors from a table holding vectors at several scales
///
/// # Examples
///
/// ```
/// use kmervec::embedding::{EmbeddingTable, MultiScaleComposer};
///
/// let mut table = EmbeddingTable::new(1)?;
/// for (token, v) in [("AC", 1.0), ("CG", 3.0), ("ACG", 5.0)] {
///     table.insert(token.as_bytes(), &[v])?;
/// }
/// let composer = MultiScaleComposer::new(vec![3, 2])?;
/// assert_eq!(composer.compose(b"ACG", &table)?, vec![2.0, 5.0]);
/// # Ok::<(), kmervec::KmervecError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiScaleComposer {
    scales: Vec<usize>,
}

/// Result of composing many pivots
#[derive(Debug)]
pub struct Composition {
    /// Pivot vectors, in input order, for every pivot that composed
    pub table: EmbeddingTable,
    /// Pivots that could not be composed, with the reason
    pub failures: Vec<(Vec<u8>, KmervecError)>,
}

impl MultiScaleComposer {
    /// Create a composer; scales are sorted and deduplicated
    pub fn new(mut scales: Vec<usize>) -> Result<Self> {
        if scales.is_empty() {
            return Err(KmervecError::invalid("scales", "at least one scale is required"));
        }
        if scales.contains(&0) {
            return Err(KmervecError::invalid("scales", "scale 0 has no k-mers"));
        }
        scales.sort_unstable();
        scales.dedup();
        Ok(Self { scales })
    }

    /// Scales in ascending order
    pub fn scales(&self) -> &[usize] {
        &self.scales
    }

    /// Dimension of a composed vector for a table of dimension `table_dim`
    pub fn output_dim(&self, table_dim: usize) -> usize {
        table_dim * self.scales.len()
    }

    /// Compose the vector of one pivot
    pub fn compose(&self, pivot: &[u8], table: &EmbeddingTable) -> Result<Vec<f32>> {
        let dim = table.dim();
        let mut out = vec![0f32; self.output_dim(dim)];

        for (slot, &scale) in out.chunks_exact_mut(dim).zip(&self.scales) {
            if scale > pivot.len() {
                return Err(KmervecError::invalid(
                    "scales",
                    format!(
                        "scale {} is longer than pivot {} ({} bases)",
                        scale,
                        display_bytes(pivot),
                        pivot.len()
                    ),
                ));
            }
            let parts = kmer_iter(pivot, scale);
            let n = parts.len();
            for kmer in parts {
                let vector = table.get(kmer).ok_or_else(|| KmervecError::MissingEmbedding {
                    kmer: display_bytes(kmer),
                    pivot: display_bytes(pivot),
                })?;
                for (acc, &v) in slot.iter_mut().zip(vector) {
                    *acc += v;
                }
            }
            let n = n as f32;
            slot.iter_mut().for_each(|acc| *acc /= n);
        }
        Ok(out)
    }

    /// Compose many pivots in parallel
    ///
    /// A pivot that fails is reported in [`Composition::failures`]; the
    /// others still compose. Duplicate pivots are composed and reported
    /// once, at their first position.
    pub fn compose_all<P>(&self, pivots: &[P], table: &EmbeddingTable) -> Result<Composition>
    where
        P: AsRef<[u8]> + Sync,
    {
        let mut seen = HashSet::with_capacity(pivots.len());
        let unique: Vec<&[u8]> = pivots
            .iter()
            .map(|p| p.as_ref())
            .filter(|p| seen.insert(*p))
            .collect();

        let results: Vec<(&[u8], Result<Vec<f32>>)> = unique
            .par_iter()
            .map(|&p| (p, self.compose(p, table)))
            .collect();

        let mut composed = EmbeddingTable::with_capacity(self.output_dim(table.dim()), pivots.len())?;
        let mut failures = Vec::new();
        for (pivot, result) in results {
            match result {
                Ok(vector) => composed.insert(pivot, &vector)?,
                Err(err) => failures.push((pivot.to_vec(), err)),
            }
        }

        if !failures.is_empty() {
            warn!(
                failed = failures.len(),
                composed = composed.len(),
                first = %failures[0].1,
                "some pivots could not be composed"
            );
        }
        debug!(pivots = composed.len(), scales = ?self.scales, "pivot vectors composed");
        Ok(Composition {
            table: composed,
            failures,
        })
    }
}
