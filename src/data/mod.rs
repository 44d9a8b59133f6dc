//! Training data containers and split-candidate layout.
//!
//! The engine consumes rows of paired categorical (integer level codes) and
//! continuous features, a response, and an optional weight. Candidate split
//! thresholds are inputs: continuous bin boundaries are precomputed by the
//! caller, categorical candidates are the level codes themselves.

mod dataset;
mod splits;

pub use dataset::{DataError, TrainingRow, TrainingSet};
pub use splits::{CandidateSplits, MissingPolicy};
