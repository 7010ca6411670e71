//! Seed derivation
//!
//! Parallel stages give every unit of work (one walk, one training chunk)
//! its own RNG seeded from the configured seed and the unit's coordinates.
//! Results then depend only on the seed, never on which thread ran what.

/// SplitMix64 finalizer
#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// Mix a base seed with work-unit coordinates into an independent seed
pub(crate) fn derive_seed(base: u64, parts: &[u64]) -> u64 {
    parts
        .iter()
        .fold(splitmix64(base), |acc, &part| splitmix64(acc ^ splitmix64(part)))
}
