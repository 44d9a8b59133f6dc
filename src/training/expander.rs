//! Level-wise tree expansion.
//!
//! Consumes a completed split-selection pass and deepens the tree by one
//! level: every leaf awaiting expansion either commits the best admissible
//! candidate split and opens two in-process children, or becomes terminal.
//!
//! Candidate order is deterministic: categorical features before
//! continuous, ascending feature index, ascending level/bin. The best
//! split is tracked with a strict `>` comparison, so the first candidate
//! reaching the maximum gain in that order wins ties.
//!
//! Both variants record feature-type-local indices in the tree: a split on
//! continuous feature `f` stores `f`, not `n_cat_features + f`. The
//! random-subspace variant draws from a combined index space and re-bases
//! continuous candidates before recording them, keeping the stored
//! convention identical across variants.

use ndarray::{s, Array1, ArrayView1};
use rand::seq::SliceRandom;
use rand::RngCore;

use crate::data::CandidateSplits;
use crate::repr::node::NodeKind;
use crate::repr::tree::{DecisionTree, TreeError};
use crate::training::accumulator::SplitAccumulator;
use crate::training::impurity::StatsKernel;

/// Stop-condition knobs for expansion.
///
/// `max_depth` counts the root as depth 0, so a tree trained with
/// `max_depth = d` has at most `d` split levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrowthLimits {
    /// Minimum unweighted rows a node needs before it may split.
    pub min_split: u16,
    /// Minimum unweighted rows per child; 0 is treated as 1.
    pub min_bucket: u16,
    pub max_depth: u16,
}

impl Default for GrowthLimits {
    fn default() -> Self {
        GrowthLimits { min_split: 20, min_bucket: 6, max_depth: 10 }
    }
}

/// Expand the deepest level, scanning every candidate split.
///
/// Returns `true` when training is finished: nothing split, the depth
/// limit was reached, or every committed split produced children that are
/// pure and below `min_split`. On finish all remaining in-process leaves
/// become terminal.
pub fn expand(
    tree: &mut DecisionTree,
    acc: &SplitAccumulator,
    splits: &CandidateSplits,
    limits: &GrowthLimits,
) -> Result<bool, TreeError> {
    expand_level(tree, acc, splits, limits, CandidatePlan::Exhaustive)
}

/// Expand the deepest level, scanning a random feature subset per leaf.
///
/// For each leaf the combined categorical+continuous feature index list is
/// shuffled with the supplied generator and only the first
/// `n_random_features` entries are scanned (all thresholds within them).
pub fn expand_sampled(
    tree: &mut DecisionTree,
    acc: &SplitAccumulator,
    splits: &CandidateSplits,
    limits: &GrowthLimits,
    n_random_features: usize,
    rng: &mut dyn RngCore,
) -> Result<bool, TreeError> {
    expand_level(
        tree,
        acc,
        splits,
        limits,
        CandidatePlan::RandomSubspace { n_features: n_random_features, rng },
    )
}

enum CandidatePlan<'a> {
    Exhaustive,
    RandomSubspace {
        n_features: usize,
        rng: &'a mut dyn RngCore,
    },
}

/// Best candidate seen so far for one leaf.
struct BestSplit {
    gain: f64,
    feature: usize,
    bin: usize,
    is_cat: bool,
    stats: Option<Array1<f64>>,
}

impl BestSplit {
    fn new() -> Self {
        BestSplit {
            gain: f64::NEG_INFINITY,
            feature: 0,
            bin: 0,
            is_cat: false,
            stats: None,
        }
    }

    fn consider(&mut self, gain: f64, feature: usize, bin: usize, is_cat: bool, stats: ArrayView1<f64>) {
        if gain > self.gain {
            self.gain = gain;
            self.feature = feature;
            self.bin = bin;
            self.is_cat = is_cat;
            self.stats = Some(stats.to_owned());
        }
    }
}

fn scan_cat_feature(
    best: &mut BestSplit,
    kernel: &StatsKernel,
    acc: &SplitAccumulator,
    leaf: usize,
    feature: usize,
) {
    for level in 0..acc.cat_levels()[feature] as usize {
        let stats = acc.cat_split_stats(leaf, feature, level);
        best.consider(kernel.impurity_gain(stats), feature, level, true, stats);
    }
}

fn scan_con_feature(
    best: &mut BestSplit,
    kernel: &StatsKernel,
    acc: &SplitAccumulator,
    leaf: usize,
    feature: usize,
) {
    for bin in 0..acc.n_bins() {
        let stats = acc.con_split_stats(leaf, feature, bin);
        best.consider(kernel.impurity_gain(stats), feature, bin, false, stats);
    }
}

fn expand_level(
    tree: &mut DecisionTree,
    acc: &SplitAccumulator,
    splits: &CandidateSplits,
    limits: &GrowthLimits,
    mut plan: CandidatePlan<'_>,
) -> Result<bool, TreeError> {
    let kernel = tree.kernel();
    let n_leaf_nodes = acc.n_leaf_nodes();
    debug_assert_eq!(
        n_leaf_nodes,
        1usize << (tree.depth() - 1),
        "accumulator was sized for a different level"
    );
    let leaf_window_start = n_leaf_nodes - 1;
    let n_cat = acc.n_cat_features();
    let total_features = n_cat + acc.n_con_features();

    let mut children_allocated = false;
    let mut children_wont_split = true;
    let mut feature_order: Vec<usize> = Vec::new();

    for i in 0..n_leaf_nodes {
        let current = leaf_window_start + i;
        if tree.node_kind(current) != NodeKind::InProcessLeaf {
            continue;
        }
        tree.set_prediction_row(current, acc.node_stats_row(i));

        let mut best = BestSplit::new();
        match &mut plan {
            CandidatePlan::Exhaustive => {
                for feature in 0..n_cat {
                    scan_cat_feature(&mut best, &kernel, acc, i, feature);
                }
                for feature in 0..acc.n_con_features() {
                    scan_con_feature(&mut best, &kernel, acc, i, feature);
                }
            }
            CandidatePlan::RandomSubspace { n_features, rng } => {
                feature_order.clear();
                feature_order.extend(0..total_features);
                feature_order.shuffle(rng);
                for &feature in feature_order.iter().take((*n_features).min(total_features)) {
                    if feature < n_cat {
                        scan_cat_feature(&mut best, &kernel, acc, i, feature);
                    } else {
                        scan_con_feature(&mut best, &kernel, acc, i, feature - n_cat);
                    }
                }
            }
        }

        let mut committed = false;
        if best.gain > 0.0 {
            if let Some(stats) = best.stats.take() {
                if should_split(&kernel, stats.view(), limits, tree.depth()) {
                    let threshold = if best.is_cat {
                        best.bin as f64
                    } else {
                        splits.con_threshold(best.feature, best.bin)
                    };
                    if !children_allocated {
                        tree.grow_one_level()?;
                        children_allocated = true;
                    }
                    let sps = kernel.stats_per_split();
                    children_wont_split &= tree.update_primary_split(
                        current,
                        best.feature as i32,
                        threshold,
                        best.is_cat,
                        limits.min_split,
                        stats.slice(s![..sps]),
                        stats.slice(s![sps..]),
                    );
                    committed = true;
                }
            }
        }
        if !committed {
            tree.mark_finished(current);
        }
    }

    // depth is 1-based internally while max_depth counts the root as 0
    let training_finished = !children_allocated
        || u32::from(tree.depth()) >= u32::from(limits.max_depth) + 1
        || children_wont_split;
    if training_finished {
        tree.promote_in_process_leaves();
    }
    Ok(training_finished)
}

fn should_split(
    kernel: &StatsKernel,
    combined: ArrayView1<f64>,
    limits: &GrowthLimits,
    tree_depth: u16,
) -> bool {
    let min_bucket = u64::from(limits.min_bucket.max(1));
    let sps = kernel.stats_per_split();
    let true_count = kernel.stat_count(combined.slice(s![..sps]));
    let false_count = kernel.stat_count(combined.slice(s![sps..]));
    true_count + false_count >= u64::from(limits.min_split)
        && true_count >= min_bucket
        && false_count >= min_bucket
        && tree_depth <= limits.max_depth
}
