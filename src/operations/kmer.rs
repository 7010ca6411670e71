//! K-mer tokenization
//!
//! Every component that reads a sequence (graph construction, segment
//! pooling, pivot collection) tokenizes it the same way: a window of length
//! `k` slides across the sequence with stride 1. Sequence content is treated
//! as opaque bytes; no alphabet filtering is applied, so a protein or an
//! ambiguous-base sequence tokenizes the same way as plain DNA.
//!
//! # Examples
//!
//! ```
//! use kmervec::operations::kmer::{extract_kmers, kmer_spectrum};
//!
//! let kmers = extract_kmers(b"ATGCATGC", 3);
//! assert_eq!(kmers.len(), 6);
//!
//! let sequences = vec![b"ATGCAT".as_ref(), b"GCATGC".as_ref()];
//! let spectrum = kmer_spectrum(&sequences, 3);
//! assert_eq!(spectrum[b"ATG".as_ref()], 2);
//! ```

use std::collections::{HashMap, HashSet};

/// Number of overlapping k-mers in a sequence of length `len`
///
/// Zero when `k == 0` or `k > len`.
#[inline]
pub fn kmer_count(len: usize, k: usize) -> usize {
    if k == 0 || k > len {
        0
    } else {
        len - k + 1
    }
}

/// Streaming k-mer iterator (zero-copy)
///
/// Yields borrowed slices; nothing is allocated. Sequences shorter than `k`
/// (and `k == 0`) yield nothing.
///
/// # Examples
///
/// ```
/// use kmervec::operations::kmer::kmer_iter;
///
/// let kmers: Vec<_> = kmer_iter(b"ACGTA", 4).collect();
/// assert_eq!(kmers, vec![b"ACGT".as_ref(), b"CGTA".as_ref()]);
/// ```
pub fn kmer_iter(sequence: &[u8], k: usize) -> KmerIterator<'_> {
    let position = if kmer_count(sequence.len(), k) == 0 {
        sequence.len()
    } else {
        0
    };
    KmerIterator {
        sequence,
        k,
        position,
    }
}

/// Iterator returned by [`kmer_iter`]
pub struct KmerIterator<'a> {
    sequence: &'a [u8],
    k: usize,
    position: usize,
}

impl<'a> Iterator for KmerIterator<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.k == 0 || self.position + self.k > self.sequence.len() {
            return None;
        }
        let kmer = &self.sequence[self.position..self.position + self.k];
        self.position += 1;
        Some(kmer)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = kmer_count(self.sequence.len().saturating_sub(self.position), self.k);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for KmerIterator<'_> {}

/// Extract overlapping k-mers as owned byte vectors
///
/// # Examples
///
/// ```
/// use kmervec::operations::kmer::extract_kmers;
///
/// let kmers = extract_kmers(b"ATGCATGC", 3);
/// assert_eq!(kmers[0], b"ATG");
/// assert_eq!(kmers[5], b"TGC");
/// ```
pub fn extract_kmers(sequence: &[u8], k: usize) -> Vec<Vec<u8>> {
    kmer_iter(sequence, k).map(<[u8]>::to_vec).collect()
}

/// K-mer spectrum (frequency counting)
///
/// Counts every k-mer occurrence across all sequences.
pub fn kmer_spectrum(sequences: &[&[u8]], k: usize) -> HashMap<Vec<u8>, usize> {
    let mut counts = HashMap::new();

    for sequence in sequences {
        for kmer in kmer_iter(sequence, k) {
            *counts.entry(kmer.to_vec()).or_insert(0) += 1;
        }
    }

    counts
}

/// Configurable k-mer extractor with optional parallelization
///
/// Scalar by default. With [`KmerExtractor::with_parallel`], inputs of at
/// least [`KmerExtractor::PARALLEL_THRESHOLD`] sequences are tokenized on a
/// bounded rayon pool; smaller inputs stay scalar because thread start-up
/// dominates.
#[derive(Debug, Clone)]
pub struct KmerExtractor {
    parallel: bool,
    threads: usize,
}

impl KmerExtractor {
    /// Minimum number of sequences before the parallel path is taken
    pub const PARALLEL_THRESHOLD: usize = 1000;

    /// Create a scalar extractor
    pub fn new() -> Self {
        Self {
            parallel: false,
            threads: 1,
        }
    }

    /// Create an extractor that uses up to `threads` workers on large inputs
    ///
    /// # Examples
    ///
    /// ```
    /// use kmervec::operations::kmer::KmerExtractor;
    ///
    /// let extractor = KmerExtractor::with_parallel(4);
    /// assert!(!extractor.will_use_parallel(999));
    /// assert!(extractor.will_use_parallel(1000));
    /// ```
    pub fn with_parallel(threads: usize) -> Self {
        Self {
            parallel: true,
            threads: threads.max(1),
        }
    }

    /// Whether an input of `num_sequences` takes the parallel path
    pub fn will_use_parallel(&self, num_sequences: usize) -> bool {
        self.parallel && num_sequences >= Self::PARALLEL_THRESHOLD
    }

    /// Distinct k-mers across all sequences, in order of first appearance
    ///
    /// # Examples
    ///
    /// ```
    /// use kmervec::operations::kmer::KmerExtractor;
    ///
    /// let sequences = vec![b"ACGTACGT".as_ref(), b"ACGTTGCA".as_ref()];
    /// let kmers = KmerExtractor::new().distinct(&sequences, 4);
    /// assert_eq!(kmers[0], b"ACGT");
    /// assert_eq!(kmers.len(), 8);
    /// ```
    pub fn distinct(&self, sequences: &[&[u8]], k: usize) -> Vec<Vec<u8>> {
        let per_sequence = if self.will_use_parallel(sequences.len()) {
            self.extract_parallel(sequences, k)
        } else {
            self.extract_scalar(sequences, k)
        };

        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for kmers in per_sequence {
            for kmer in kmers {
                if seen.insert(kmer.clone()) {
                    ordered.push(kmer);
                }
            }
        }
        ordered
    }

    fn extract_scalar(&self, sequences: &[&[u8]], k: usize) -> Vec<Vec<Vec<u8>>> {
        sequences.iter().map(|s| extract_kmers(s, k)).collect()
    }

    /// Falls back to scalar extraction if the thread pool cannot be built.
    fn extract_parallel(&self, sequences: &[&[u8]], k: usize) -> Vec<Vec<Vec<u8>>> {
        use rayon::prelude::*;

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()
        {
            Ok(p) => p,
            Err(_) => return self.extract_scalar(sequences, k),
        };

        pool.install(|| sequences.par_iter().map(|s| extract_kmers(s, k)).collect())
    }
}

impl Default for KmerExtractor {
    fn default() -> Self {
        Self::new()
    }
}
