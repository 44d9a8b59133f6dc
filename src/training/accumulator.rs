//! Streaming split-statistics accumulation.
//!
//! One accumulator holds, for every leaf of the tree's deepest level, the
//! sufficient statistics of every candidate split, with a `{<= split,
//! > split}` pair of stats vectors per candidate:
//!
//! ```text
//! index_con(f, b, is_left) = 2*sps*(f*n_bins + b)          + (0 | sps)
//! index_cat(f, v, is_left) = 2*sps*(levels_before(f) + v)  + (0 | sps)
//! ```
//!
//! All aggregation is element-wise addition of fixed-shape dense matrices,
//! so accumulators built over disjoint row shards merge associatively and
//! commutatively: any merge topology produces the same matrices as a
//! single pass over the concatenated rows.
//!
//! Validation failures do not skip rows; they poison the whole accumulator
//! (a `fault` is recorded and further input is ignored), because partial
//! statistics would silently bias split selection.

use ndarray::{s, Array1, Array2, ArrayView1};
use thiserror::Error;

use crate::data::{CandidateSplits, MissingPolicy, TrainingRow};
use crate::repr::node::{parent, NodeKind};
use crate::repr::tree::DecisionTree;
use crate::training::impurity::StatsKernel;

/// Largest supported combined feature count.
pub const MAX_FEATURES: usize = u16::MAX as usize;

/// Condition that poisoned an accumulator group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccumulatorFault {
    #[error("response variable values are not finite")]
    NonFiniteResponse,

    #[error("number of independent variables cannot be larger than 65535")]
    OverwideFeatureSpace,

    #[error("inconsistent number of categorical independent variables")]
    InconsistentCatArity,

    #[error("inconsistent number of continuous independent variables")]
    InconsistentConArity,

    #[error("inconsistent accumulator shapes during merge")]
    MergeShapeMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AccumulatorMode {
    /// Split-selection pass: stats vectors are response statistics.
    Primary {
        kernel: StatsKernel,
        weights_as_rows: bool,
    },
    /// Surrogate pass: stats vectors are (agree, disagree) counts.
    Surrogate,
}

// =============================================================================
// SplitAccumulator
// =============================================================================

/// Per-leaf, per-candidate split statistics for one pass over the rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitAccumulator {
    mode: AccumulatorMode,
    n_rows: u64,
    fault: Option<AccumulatorFault>,

    n_bins: usize,
    n_cat_features: usize,
    n_con_features: usize,
    total_n_cat_levels: usize,
    /// Width of the leaf window this accumulator is sized for.
    n_leaf_nodes: usize,
    stats_per_split: usize,

    cat_levels: Vec<u32>,
    cat_levels_cumsum: Vec<u32>,

    /// `n_leaf_nodes x (total_cat_levels * sps * 2)`
    cat_stats: Array2<f64>,
    /// `n_leaf_nodes x (n_con * n_bins * sps * 2)`
    con_stats: Array2<f64>,
    /// `n_leaf_nodes x sps`
    node_stats: Array2<f64>,
}

impl SplitAccumulator {
    /// Accumulator for a split-selection pass over a tree of the given
    /// depth. The leaf window covers the deepest allocated level.
    pub fn for_primary(
        kernel: StatsKernel,
        splits: &CandidateSplits,
        tree_depth: u16,
        weights_as_rows: bool,
    ) -> Self {
        let n_leaf_nodes = if tree_depth > 0 {
            1usize << (tree_depth - 1)
        } else {
            1
        };
        Self::with_shape(
            AccumulatorMode::Primary { kernel, weights_as_rows },
            splits,
            n_leaf_nodes,
            kernel.stats_per_split(),
        )
    }

    /// Accumulator for a surrogate pass: sized for the last completed layer
    /// (the parents of the deepest leaves), with two-cell stats vectors.
    ///
    /// # Panics
    ///
    /// Panics if the tree is a bare root; there is no completed layer to
    /// train surrogates for.
    pub fn for_surrogates(splits: &CandidateSplits, tree_depth: u16) -> Self {
        assert!(tree_depth >= 2, "surrogate pass requires at least one split level");
        let n_surr_nodes = 1usize << (tree_depth - 2);
        Self::with_shape(AccumulatorMode::Surrogate, splits, n_surr_nodes, 2)
    }

    fn with_shape(
        mode: AccumulatorMode,
        splits: &CandidateSplits,
        n_leaf_nodes: usize,
        stats_per_split: usize,
    ) -> Self {
        let total_levels = splits.total_cat_levels() as usize;
        let n_con = splits.n_con_features();
        let n_bins = splits.n_bins();
        SplitAccumulator {
            mode,
            n_rows: 0,
            fault: None,
            n_bins,
            n_cat_features: splits.n_cat_features(),
            n_con_features: n_con,
            total_n_cat_levels: total_levels,
            n_leaf_nodes,
            stats_per_split,
            cat_levels: splits.cat_levels().to_vec(),
            cat_levels_cumsum: splits.cat_levels_cumsum().to_vec(),
            cat_stats: Array2::zeros((n_leaf_nodes, total_levels * stats_per_split * 2)),
            con_stats: Array2::zeros((n_leaf_nodes, n_con * n_bins * stats_per_split * 2)),
            node_stats: Array2::zeros((n_leaf_nodes, stats_per_split)),
        }
    }

    // =========================================================================
    // Candidate indexing
    // =========================================================================

    #[inline]
    fn sub_index(&self, start: usize, relative: usize, is_split_true: bool) -> usize {
        let column = self.stats_per_split * 2 * (start + relative);
        if is_split_true {
            column
        } else {
            column + self.stats_per_split
        }
    }

    /// Column of continuous candidate `(feature, bin)` on the given side.
    #[inline]
    pub fn index_con(&self, feature: usize, bin: usize, is_split_true: bool) -> usize {
        debug_assert!(feature < self.n_con_features);
        debug_assert!(bin < self.n_bins);
        self.sub_index(feature * self.n_bins, bin, is_split_true)
    }

    /// Column of categorical candidate `(feature, level code)` on the given
    /// side.
    #[inline]
    pub fn index_cat(&self, feature: usize, level: usize, is_split_true: bool) -> usize {
        debug_assert!(feature < self.n_cat_features);
        self.sub_index(self.cat_levels_cumsum[feature] as usize, level, is_split_true)
    }

    // =========================================================================
    // Row updates
    // =========================================================================

    /// Feed one row in split-selection mode.
    ///
    /// The row is routed through the current tree; rows landing on finished
    /// leaves contribute nothing. Invalid input poisons the accumulator.
    pub fn accumulate(
        &mut self,
        tree: &DecisionTree,
        splits: &CandidateSplits,
        row: &TrainingRow<'_>,
        policy: &MissingPolicy,
    ) {
        let AccumulatorMode::Primary { kernel, weights_as_rows } = self.mode else {
            debug_assert!(false, "accumulate called on a surrogate-mode accumulator");
            return;
        };
        if self.fault.is_some() {
            return;
        }
        if let Some(fault) = self.validate_row(row, !row.response.is_finite()) {
            self.fault = Some(fault);
            return;
        }

        let leaf = tree.search(row.cat, row.con, policy);
        if tree.node_kind(leaf) == NodeKind::InProcessLeaf {
            let leaf_window_start = self.n_leaf_nodes - 1;
            debug_assert!(leaf >= leaf_window_start);
            let row_index = leaf - leaf_window_start;

            let stats = kernel.row_stats(row.response, row.weight, weights_as_rows);
            let mut node_row = self.node_stats.row_mut(row_index);
            node_row += &stats;

            for feature in 0..self.n_cat_features {
                let value = row.cat[feature];
                if policy.is_null_cat(value) {
                    continue;
                }
                for level in 0..self.cat_levels[feature] as usize {
                    let column = self.index_cat(feature, level, value <= level as i32);
                    add_stats(&mut self.cat_stats, row_index, column, &stats);
                }
            }
            for feature in 0..self.n_con_features {
                let value = row.con[feature];
                if policy.is_null_con(value) {
                    continue;
                }
                for bin in 0..self.n_bins {
                    let is_left = value <= splits.con_threshold(feature, bin);
                    let column = self.index_con(feature, bin, is_left);
                    add_stats(&mut self.con_stats, row_index, column, &stats);
                }
            }
        }
        self.n_rows += 1;
    }

    /// Feed one row in surrogate mode.
    ///
    /// Only rows that reach a deepest-level leaf and carry a non-null value
    /// for the parent's primary split are counted; every other candidate
    /// records whether its decision agrees with the primary one,
    /// `dup_count` times.
    pub fn accumulate_surrogate(
        &mut self,
        tree: &DecisionTree,
        splits: &CandidateSplits,
        row: &TrainingRow<'_>,
        policy: &MissingPolicy,
    ) {
        debug_assert_eq!(self.mode, AccumulatorMode::Surrogate);
        if self.fault.is_some() {
            return;
        }
        if let Some(fault) = self.validate_row(row, false) {
            self.fault = Some(fault);
            return;
        }

        let n_surr_nodes = self.n_leaf_nodes;
        let ancestor_count = n_surr_nodes - 1;

        let leaf = tree.search(row.cat, row.con, policy);
        if leaf == 0 {
            return;
        }
        let parent_index = parent(leaf);
        if parent_index < ancestor_count {
            return;
        }
        let NodeKind::Split(primary_feature) = tree.node_kind(parent_index) else {
            return;
        };

        let primary_is_cat = tree.node_is_categorical(parent_index);
        let primary_is_null = if primary_is_cat {
            policy.is_null_cat(row.cat[primary_feature])
        } else {
            policy.is_null_con(row.con[primary_feature])
        };
        if primary_is_null {
            return;
        }
        let primary_value = if primary_is_cat {
            f64::from(row.cat[primary_feature])
        } else {
            row.con[primary_feature]
        };
        let is_primary_true = primary_value <= tree.threshold(parent_index);
        let row_index = parent_index - ancestor_count;

        let dup = f64::from(row.dup_count);
        let agree_stats = Array1::from_vec(vec![dup, 0.0]);
        let disagree_stats = Array1::from_vec(vec![0.0, dup]);

        for feature in 0..self.n_cat_features {
            if primary_is_cat && feature == primary_feature {
                continue;
            }
            let value = row.cat[feature];
            if policy.is_null_cat(value) {
                continue;
            }
            for level in 0..self.cat_levels[feature] as usize {
                let is_surrogate_true = value <= level as i32;
                let column = self.index_cat(feature, level, is_surrogate_true);
                let stats = if is_primary_true == is_surrogate_true {
                    &agree_stats
                } else {
                    &disagree_stats
                };
                add_stats(&mut self.cat_stats, row_index, column, stats);
            }
        }
        for feature in 0..self.n_con_features {
            if !primary_is_cat && feature == primary_feature {
                continue;
            }
            let value = row.con[feature];
            if policy.is_null_con(value) {
                continue;
            }
            for bin in 0..self.n_bins {
                let is_surrogate_true = value <= splits.con_threshold(feature, bin);
                let column = self.index_con(feature, bin, is_surrogate_true);
                let stats = if is_primary_true == is_surrogate_true {
                    &agree_stats
                } else {
                    &disagree_stats
                };
                add_stats(&mut self.con_stats, row_index, column, stats);
            }
        }
        self.n_rows += 1;
    }

    fn validate_row(&self, row: &TrainingRow<'_>, response_invalid: bool) -> Option<AccumulatorFault> {
        if response_invalid {
            Some(AccumulatorFault::NonFiniteResponse)
        } else if row.cat.len() + row.con.len() > MAX_FEATURES {
            Some(AccumulatorFault::OverwideFeatureSpace)
        } else if row.cat.len() != self.n_cat_features {
            Some(AccumulatorFault::InconsistentCatArity)
        } else if row.con.len() != self.n_con_features {
            Some(AccumulatorFault::InconsistentConArity)
        } else {
            None
        }
    }

    // =========================================================================
    // Merge
    // =========================================================================

    /// Fold another shard into this one.
    ///
    /// Matrices add element-wise. Shards with divergent shapes, or shards
    /// already carrying a fault, poison the result instead of merging.
    pub fn merge(&mut self, other: &SplitAccumulator) {
        if other.n_rows == 0 && other.fault.is_none() {
            return;
        }
        if self.fault.is_some() {
            return;
        }
        if let Some(fault) = other.fault {
            self.fault = Some(fault);
            return;
        }
        if self.n_bins != other.n_bins
            || self.n_cat_features != other.n_cat_features
            || self.n_con_features != other.n_con_features
        {
            self.fault = Some(AccumulatorFault::MergeShapeMismatch);
            return;
        }
        self.cat_stats += &other.cat_stats;
        self.con_stats += &other.con_stats;
        self.node_stats += &other.node_stats;
        self.n_rows += other.n_rows;
    }

    // =========================================================================
    // Read access
    // =========================================================================

    /// Rows presented while the accumulator was healthy.
    #[inline]
    pub fn n_rows(&self) -> u64 {
        self.n_rows
    }

    /// The poisoning condition, if any.
    #[inline]
    pub fn fault(&self) -> Option<AccumulatorFault> {
        self.fault
    }

    #[inline]
    pub fn n_leaf_nodes(&self) -> usize {
        self.n_leaf_nodes
    }

    #[inline]
    pub fn stats_per_split(&self) -> usize {
        self.stats_per_split
    }

    #[inline]
    pub fn n_cat_features(&self) -> usize {
        self.n_cat_features
    }

    #[inline]
    pub fn n_con_features(&self) -> usize {
        self.n_con_features
    }

    #[inline]
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    #[inline]
    pub fn cat_levels(&self) -> &[u32] {
        &self.cat_levels
    }

    /// Node-level stats of one leaf-window row.
    pub fn node_stats_row(&self, leaf: usize) -> ArrayView1<'_, f64> {
        self.node_stats.row(leaf)
    }

    /// Combined `[true-branch, false-branch]` stats of a categorical
    /// candidate.
    pub fn cat_split_stats(&self, leaf: usize, feature: usize, level: usize) -> ArrayView1<'_, f64> {
        let start = self.index_cat(feature, level, true);
        self.cat_stats.slice(s![leaf, start..start + self.stats_per_split * 2])
    }

    /// Combined `[true-branch, false-branch]` stats of a continuous
    /// candidate.
    pub fn con_split_stats(&self, leaf: usize, feature: usize, bin: usize) -> ArrayView1<'_, f64> {
        let start = self.index_con(feature, bin, true);
        self.con_stats.slice(s![leaf, start..start + self.stats_per_split * 2])
    }
}

fn add_stats(target: &mut Array2<f64>, row: usize, column: usize, stats: &Array1<f64>) {
    let mut segment = target.slice_mut(s![row, column..column + stats.len()]);
    segment += stats;
}
