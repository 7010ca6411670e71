//! Retrieval quality metrics

pub mod precision;

pub use precision::{PrecisionEvaluator, PrecisionReport, QueryOutcome};
