//! Training: impurity kernel, statistics accumulation, level expansion,
//! surrogate selection, and the in-memory driver.

pub mod accumulator;
pub mod expander;
pub mod impurity;
pub mod logger;
pub mod surrogates;
pub mod trainer;

pub use accumulator::{AccumulatorFault, SplitAccumulator, MAX_FEATURES};
pub use expander::{expand, expand_sampled, GrowthLimits};
pub use impurity::{ImpurityKind, Response, StatsKernel, PURITY_EPSILON, REGRESS_N_STATS};
pub use logger::{TrainingLogger, Verbosity};
pub use surrogates::pick_surrogates;
pub use trainer::{ParamError, TrainError, TrainParams, Trainer};
