//! Mean pooling of k-mer vectors into segment vectors

use crate::embedding::table::EmbeddingTable;
use crate::error::{display_bytes, KmervecError, Result};
use crate::operations::kmer_iter;
use rayon::prelude::*;
use tracing::{debug, warn};

/// Pools the vectors of a segment's k-mers into one vector
///
/// K-mers without a vector are skipped. The result is the mean over the
/// k-mers that were found, counting repeats.
#[derive(Debug, Clone, Copy)]
pub struct SegmentPooler<'t> {
    table: &'t EmbeddingTable,
    mer: usize,
}

impl<'t> SegmentPooler<'t> {
    /// Create a pooler reading `mer`-length k-mers from `table`
    pub fn new(table: &'t EmbeddingTable, mer: usize) -> Result<Self> {
        if mer == 0 {
            return Err(KmervecError::invalid("mer", "must be at least 1"));
        }
        Ok(Self { table, mer })
    }

    /// K-mer length
    pub fn mer(&self) -> usize {
        self.mer
    }

    /// Dimension of pooled vectors
    pub fn dim(&self) -> usize {
        self.table.dim()
    }

    /// Mean vector of the segment's known k-mers
    ///
    /// # Examples
    ///
    /// ```
    /// use kmervec::embedding::{EmbeddingTable, SegmentPooler};
    ///
    /// let mut table = EmbeddingTable::new(2)?;
    /// table.insert(b"AC", &[1.0, 0.0])?;
    /// table.insert(b"CG", &[0.0, 1.0])?;
    /// let pooler = SegmentPooler::new(&table, 2)?;
    /// // GT has no vector and is skipped
    /// assert_eq!(pooler.pool(b"ACGT")?, vec![0.5, 0.5]);
    /// # Ok::<(), kmervec::KmervecError>(())
    /// ```
    pub fn pool(&self, segment: &[u8]) -> Result<Vec<f32>> {
        let mut sum = vec![0f32; self.table.dim()];
        let mut found = 0usize;
        for kmer in kmer_iter(segment, self.mer) {
            if let Some(vector) = self.table.get(kmer) {
                for (acc, &v) in sum.iter_mut().zip(vector) {
                    *acc += v;
                }
                found += 1;
            }
        }

        if found == 0 {
            return Err(KmervecError::EmptySegmentVector {
                segment: display_bytes(segment),
            });
        }
        let n = found as f32;
        sum.iter_mut().for_each(|acc| *acc /= n);
        Ok(sum)
    }

    /// Pool many segments in parallel; results keep input order
    pub fn pool_batch<S>(&self, segments: &[S]) -> Vec<Result<Vec<f32>>>
    where
        S: AsRef<[u8]> + Sync,
    {
        let results: Vec<Result<Vec<f32>>> = segments
            .par_iter()
            .map(|s| self.pool(s.as_ref()))
            .collect();

        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            warn!(failed, total = segments.len(), "segments without any embedded k-mer");
        }
        debug!(segments = segments.len(), mer = self.mer, "segments pooled");
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> EmbeddingTable {
        let mut table = EmbeddingTable::new(2).unwrap();
        table.insert(b"AAA", &[3.0, 0.0]).unwrap();
        table.insert(b"AAC", &[0.0, 3.0]).unwrap();
        table
    }

    #[test]
    fn test_mean_counts_repeats() {
        let table = table();
        let pooler = SegmentPooler::new(&table, 3).unwrap();
        // AAA, AAA, AAC
        let v = pooler.pool(b"AAAAC").unwrap();
        assert_eq!(v, vec![2.0, 1.0]);
    }

    #[test]
    fn test_no_known_kmer_is_error() {
        let table = table();
        let pooler = SegmentPooler::new(&table, 3).unwrap();
        match pooler.pool(b"GGGG") {
            Err(KmervecError::EmptySegmentVector { segment }) => assert_eq!(segment, "GGGG"),
            other => panic!("expected EmptySegmentVector, got {:?}", other),
        }
        // Shorter than mer: no k-mers at all
        assert!(pooler.pool(b"AA").is_err());
    }

    #[test]
    fn test_batch_keeps_order_and_isolates_failures() {
        let table = table();
        let pooler = SegmentPooler::new(&table, 3).unwrap();
        let segments = vec![b"AAA".to_vec(), b"TTT".to_vec(), b"AAC".to_vec()];
        let results = pooler.pool_batch(&segments);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap(), &vec![3.0, 0.0]);
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap(), &vec![0.0, 3.0]);
    }

    #[test]
    fn test_zero_mer_rejected() {
        let table = table();
        assert!(SegmentPooler::new(&table, 0).is_err());
    }
}
