//! cartwright: a level-wise decision-tree learner for data-parallel
//! analytics.
//!
//! Trees (classification or regression) are learned one level per pass
//! over the rows: a streaming [`SplitAccumulator`] collects per-leaf,
//! per-candidate statistics, the expander picks the best split per leaf,
//! and a second pass trains surrogate splits that route rows whose primary
//! feature is missing. Accumulators over disjoint row shards merge
//! associatively, so a host can parallelize by sharding rows and folding
//! the shards in any order.
//!
//! # Key Types
//!
//! - [`DecisionTree`] - heap-indexed flat-array tree storage and inference
//! - [`Trainer`] / [`TrainParams`] - in-memory level-wise training driver
//! - [`SplitAccumulator`] - associative split-statistics accumulation
//! - [`TrainingSet`] / [`CandidateSplits`] / [`MissingPolicy`] - inputs
//!
//! # Training
//!
//! ```no_run
//! use cartwright::{
//!     CandidateSplits, ImpurityKind, MissingPolicy, Response, TrainParams, Trainer, TrainingSet,
//! };
//! use ndarray::{array, Array2};
//!
//! let data = TrainingSet::new(
//!     array![[0], [0], [1], [1]],
//!     Array2::zeros((4, 0)),
//!     array![0.0, 0.0, 1.0, 1.0],
//! )?;
//! let splits = CandidateSplits::categorical_only(vec![2])?;
//! let params = TrainParams {
//!     response: Response::Classification { n_classes: 2 },
//!     impurity: ImpurityKind::Gini,
//!     min_split: 4,
//!     min_bucket: 1,
//!     ..TrainParams::default()
//! };
//! let tree = Trainer::new(params).train(&data, &splits, &MissingPolicy::default())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! The lower-level pieces ([`expand`], [`pick_surrogates`], the
//! accumulator) are public for hosts that drive passes themselves, e.g. to
//! shard rows across workers.

pub mod data;
pub mod display;
pub mod inference;
pub mod persist;
pub mod repr;
pub mod training;

// High-level types
pub use repr::{DecisionTree, NodeKind, SurrStatus, SurrogateSplit, TreeError};

// Training surface
pub use training::{
    expand, expand_sampled, pick_surrogates, AccumulatorFault, GrowthLimits, ImpurityKind,
    ParamError, Response, SplitAccumulator, StatsKernel, TrainError, TrainParams, Trainer,
    TrainingLogger, Verbosity,
};

// Data containers
pub use data::{CandidateSplits, DataError, MissingPolicy, TrainingRow, TrainingSet};

// Rendering
pub use display::TreeLabels;
