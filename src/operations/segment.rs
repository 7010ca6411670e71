//! Segmentation for the retrieval benchmark
//!
//! Sequences are cut into non-overlapping segments that form the searchable
//! corpus. A random sample of segments then donates one sub-segment each;
//! each sub-segment is later used as a query whose correct answer is its
//! originating segment.

use crate::error::{KmervecError, Result};
use crate::types::{Segment, SequenceRecord, SubSegment};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Split records into non-overlapping segments of exactly `length` bases
///
/// A trailing remainder shorter than `length` is dropped.
///
/// # Examples
///
/// ```
/// use kmervec::operations::segment::split_segments;
/// use kmervec::SequenceRecord;
///
/// let records = vec![SequenceRecord::new("s".to_string(), b"ACGTACGTAC".to_vec())];
/// let segments = split_segments(&records, 4)?;
/// assert_eq!(segments.len(), 2);
/// assert_eq!(segments[1].start, 4);
/// # Ok::<(), kmervec::KmervecError>(())
/// ```
pub fn split_segments(records: &[SequenceRecord], length: usize) -> Result<Vec<Segment>> {
    if length == 0 {
        return Err(KmervecError::invalid("segment_length", "must be at least 1"));
    }

    let mut segments = Vec::new();
    for record in records {
        for (i, chunk) in record.sequence.chunks_exact(length).enumerate() {
            segments.push(Segment::new(record.id.clone(), i * length, chunk.to_vec()));
        }
    }
    Ok(segments)
}

/// Randomly extract one sub-segment from each of `count` distinct segments
///
/// When fewer than `count` segments are long enough, every eligible segment
/// is used. Each sub-segment is a uniformly placed window of `length` bases.
/// Output order follows the sampled segment order and is fully determined by
/// `seed`.
pub fn sample_subsegments(
    segments: &[Segment],
    count: usize,
    length: usize,
    seed: u64,
) -> Result<Vec<SubSegment>> {
    if length == 0 {
        return Err(KmervecError::invalid("subsegment_length", "must be at least 1"));
    }

    let eligible: Vec<&Segment> = segments
        .iter()
        .filter(|s| s.sequence.len() >= length)
        .collect();

    let mut rng = StdRng::seed_from_u64(seed);
    let amount = count.min(eligible.len());
    let picked = rand::seq::index::sample(&mut rng, eligible.len(), amount);

    let subsegments = picked
        .into_iter()
        .map(|i| {
            let segment = eligible[i];
            let offset = rng.random_range(0..=segment.sequence.len() - length);
            SubSegment {
                origin: segment.id(),
                offset,
                sequence: segment.sequence[offset..offset + length].to_vec(),
            }
        })
        .collect();

    Ok(subsegments)
}
