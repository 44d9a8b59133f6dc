//! In-memory level-wise training driver.
//!
//! Each training pass streams every row through a [`SplitAccumulator`]
//! against the current tree, expands the deepest level from the collected
//! statistics, and — when the tree grew and surrogates are enabled — runs
//! a second pass to train surrogate splits for the new internal nodes.
//!
//! The trainer itself never touches the tree concurrently: parallelism is
//! purely row sharding. Shard accumulators are built independently with
//! rayon and folded with the associative merge, which is guaranteed to
//! match a single sequential pass (bit-exact for classification, up to
//! floating-point reassociation for regression).

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::ops::Range;
use thiserror::Error;

use crate::data::{CandidateSplits, DataError, MissingPolicy, TrainingSet};
use crate::repr::tree::{DecisionTree, TreeError};
use crate::training::accumulator::{AccumulatorFault, SplitAccumulator};
use crate::training::expander::{expand, expand_sampled, GrowthLimits};
use crate::training::impurity::{ImpurityKind, Response, StatsKernel};
use crate::training::logger::{TrainingLogger, Verbosity};
use crate::training::surrogates::pick_surrogates;

/// Invalid training configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("min_split must be at least 1")]
    ZeroMinSplit,

    #[error("classification requires at least 2 classes, got {0}")]
    TooFewClasses(u16),

    #[error("n_random_features must be at least 1 when set")]
    ZeroRandomFeatures,

    #[error("shards must be at least 1")]
    ZeroShards,
}

/// Training failure.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error(transparent)]
    Params(#[from] ParamError),

    #[error(transparent)]
    Data(#[from] DataError),

    /// A statistics pass hit invalid input; the whole group is discarded
    /// rather than trained on partial statistics.
    #[error("statistics pass poisoned: {0}")]
    Poisoned(AccumulatorFault),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

// =============================================================================
// TrainParams
// =============================================================================

/// Configuration for one tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainParams {
    pub response: Response,
    /// Classification impurity; regression always uses variance.
    pub impurity: ImpurityKind,
    /// Minimum unweighted rows a node needs before it may split.
    pub min_split: u16,
    /// Minimum unweighted rows per child; 0 is clamped to 1.
    pub min_bucket: u16,
    /// Maximum split depth, counting the root as depth 0.
    pub max_depth: u16,
    /// Surrogate slots per internal node; 0 disables surrogate training.
    pub max_n_surr: u16,
    /// When set, each leaf scans only this many randomly drawn features.
    pub n_random_features: Option<u16>,
    /// Interpret row weights as replication counts.
    pub weights_as_rows: bool,
    /// Seed for the random-subspace feature draw.
    pub seed: u64,
    /// Row shards accumulated in parallel per pass.
    pub shards: usize,
    pub verbosity: Verbosity,
}

impl Default for TrainParams {
    fn default() -> Self {
        TrainParams {
            response: Response::Regression,
            impurity: ImpurityKind::Gini,
            min_split: 20,
            min_bucket: 6,
            max_depth: 10,
            max_n_surr: 0,
            n_random_features: None,
            weights_as_rows: false,
            seed: 42,
            shards: 1,
            verbosity: Verbosity::Silent,
        }
    }
}

impl TrainParams {
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.min_split == 0 {
            return Err(ParamError::ZeroMinSplit);
        }
        if let Response::Classification { n_classes } = self.response {
            if n_classes < 2 {
                return Err(ParamError::TooFewClasses(n_classes));
            }
        }
        if self.n_random_features == Some(0) {
            return Err(ParamError::ZeroRandomFeatures);
        }
        if self.shards == 0 {
            return Err(ParamError::ZeroShards);
        }
        Ok(())
    }

    fn kernel(&self) -> StatsKernel {
        StatsKernel::new(self.response, self.impurity)
    }

    fn limits(&self) -> GrowthLimits {
        GrowthLimits {
            min_split: self.min_split,
            min_bucket: self.min_bucket,
            max_depth: self.max_depth,
        }
    }
}

// =============================================================================
// Trainer
// =============================================================================

/// Level-wise trainer for a single tree.
pub struct Trainer {
    params: TrainParams,
    logger: TrainingLogger,
}

impl Trainer {
    pub fn new(params: TrainParams) -> Self {
        let logger = TrainingLogger::new(params.verbosity);
        Trainer { params, logger }
    }

    pub fn params(&self) -> &TrainParams {
        &self.params
    }

    /// Train a tree to completion.
    pub fn train(
        &self,
        data: &TrainingSet,
        splits: &CandidateSplits,
        policy: &MissingPolicy,
    ) -> Result<DecisionTree, TrainError> {
        self.params.validate()?;
        data.check_arity(splits)?;

        let limits = self.params.limits();
        let mut tree =
            DecisionTree::new(self.params.response, self.params.impurity, self.params.max_n_surr);
        let mut rng = StdRng::seed_from_u64(self.params.seed);

        let mut pass = 0u32;
        loop {
            pass += 1;
            let acc = self.primary_pass(&tree, data, splits, policy)?;
            self.logger.debug(format_args!(
                "pass {pass}: accumulated {} rows over {} leaves",
                acc.n_rows(),
                acc.n_leaf_nodes()
            ));

            let depth_before = tree.depth();
            let finished = match self.params.n_random_features {
                None => expand(&mut tree, &acc, splits, &limits)?,
                Some(k) => {
                    expand_sampled(&mut tree, &acc, splits, &limits, k as usize, &mut rng)?
                }
            };
            self.logger.info(format_args!(
                "pass {pass}: depth {} -> {}, finished={finished}",
                depth_before,
                tree.depth()
            ));

            if tree.depth() > depth_before && self.params.max_n_surr > 0 {
                let surr_acc = self.surrogate_pass(&tree, data, splits, policy)?;
                pick_surrogates(&mut tree, &surr_acc, splits);
            }
            if finished {
                break;
            }
        }
        Ok(tree)
    }

    fn primary_pass(
        &self,
        tree: &DecisionTree,
        data: &TrainingSet,
        splits: &CandidateSplits,
        policy: &MissingPolicy,
    ) -> Result<SplitAccumulator, TrainError> {
        let kernel = self.params.kernel();
        let weights_as_rows = self.params.weights_as_rows;
        let build = |range: Range<usize>| {
            let mut acc = SplitAccumulator::for_primary(kernel, splits, tree.depth(), weights_as_rows);
            for i in range {
                acc.accumulate(tree, splits, &data.row(i), policy);
            }
            acc
        };
        let acc = self.sharded(data.n_rows(), build);
        match acc.fault() {
            Some(fault) => Err(TrainError::Poisoned(fault)),
            None => Ok(acc),
        }
    }

    fn surrogate_pass(
        &self,
        tree: &DecisionTree,
        data: &TrainingSet,
        splits: &CandidateSplits,
        policy: &MissingPolicy,
    ) -> Result<SplitAccumulator, TrainError> {
        let build = |range: Range<usize>| {
            let mut acc = SplitAccumulator::for_surrogates(splits, tree.depth());
            for i in range {
                acc.accumulate_surrogate(tree, splits, &data.row(i), policy);
            }
            acc
        };
        let acc = self.sharded(data.n_rows(), build);
        match acc.fault() {
            Some(fault) => Err(TrainError::Poisoned(fault)),
            None => Ok(acc),
        }
    }

    fn sharded<F>(&self, n_rows: usize, build: F) -> SplitAccumulator
    where
        F: Fn(Range<usize>) -> SplitAccumulator + Sync,
    {
        if self.params.shards <= 1 || n_rows == 0 {
            return build(0..n_rows);
        }
        shard_ranges(n_rows, self.params.shards)
            .into_par_iter()
            .map(&build)
            .reduce_with(|mut left, right| {
                left.merge(&right);
                left
            })
            .unwrap_or_else(|| build(0..0))
    }
}

/// Split `0..n_rows` into at most `shards` contiguous, non-empty ranges.
fn shard_ranges(n_rows: usize, shards: usize) -> Vec<Range<usize>> {
    let shards = shards.min(n_rows).max(1);
    let chunk = n_rows.div_ceil(shards);
    (0..n_rows).step_by(chunk).map(|start| start..(start + chunk).min(n_rows)).collect()
}
