//! Surrogate-split selection.
//!
//! After a level is expanded, its new internal nodes learn up to
//! `max_n_surr` alternate splits from a surrogate-mode statistics pass.
//! A surrogate earns a slot only by beating the trivial fallback of
//! sending every row to the node's majority branch.
//!
//! The surrogate-mode accumulator stores, per candidate, a four-cell block
//! `[left-agree, left-disagree, right-agree, right-disagree]`. Forward
//! agreement of a candidate is cells `{0, 2}`; agreement of its reverse
//! split (`x > t`) is cells `{1, 3}`.

use crate::data::CandidateSplits;
use crate::repr::node::{NodeKind, SurrStatus};
use crate::repr::tree::DecisionTree;
use crate::training::accumulator::SplitAccumulator;

/// Best threshold of one candidate feature.
#[derive(Debug, Clone, Copy)]
struct FeatureBest {
    is_cat: bool,
    feature: usize,
    threshold: f64,
    count: f64,
    is_reverse: bool,
}

/// Populate the surrogate table of every internal node in the last
/// completed layer from a finished surrogate-mode pass.
pub fn pick_surrogates(
    tree: &mut DecisionTree,
    acc: &SplitAccumulator,
    splits: &CandidateSplits,
) {
    if tree.max_n_surr() == 0 || tree.depth() < 2 {
        return;
    }
    let n_cats = acc.n_cat_features();
    let n_cons = acc.n_con_features();
    let n_bins = acc.n_bins();
    let n_surr_nodes = acc.n_leaf_nodes();
    let ancestor_count = n_surr_nodes - 1;
    debug_assert_eq!(n_surr_nodes, 1usize << (tree.depth() - 2));

    for i in 0..n_surr_nodes {
        let node = ancestor_count + i;
        let NodeKind::Split(primary_feature) = tree.node_kind(node) else {
            continue;
        };
        let primary_is_cat = tree.node_is_categorical(node);

        // 1. best threshold (and direction) per candidate feature
        let mut bests: Vec<FeatureBest> = Vec::with_capacity(n_cats + n_cons);
        for feature in 0..n_cats {
            let n_levels = acc.cat_levels()[feature] as usize;
            let (code, is_reverse, count) = best_of_feature(
                (0..n_levels).map(|level| agreement_counts(acc, i, true, feature, level)),
            );
            bests.push(FeatureBest {
                is_cat: true,
                feature,
                threshold: code as f64,
                count,
                is_reverse,
            });
        }
        for feature in 0..n_cons {
            let (code, is_reverse, count) = best_of_feature(
                (0..n_bins).map(|bin| agreement_counts(acc, i, false, feature, bin)),
            );
            bests.push(FeatureBest {
                is_cat: false,
                feature,
                threshold: splits.con_threshold(feature, code),
                count,
                is_reverse,
            });
        }

        // 2. order features by their best agreement, descending; the sort
        // is stable so ties keep categorical-before-continuous order
        bests.sort_by(|a, b| b.count.total_cmp(&a.count));

        // 3. fill slots from the top of the list
        let max_size = bests.len().min(tree.max_n_surr() as usize);
        let majority = tree.majority_count(node) as f64;
        let mut surr_count = 0;
        for best in bests.iter().take(max_size) {
            if best.count < majority {
                break;
            }
            if best.is_cat == primary_is_cat && best.feature == primary_feature {
                continue;
            }
            tree.set_surrogate(
                node,
                surr_count,
                best.feature as i32,
                best.threshold,
                SurrStatus { is_categorical: best.is_cat, is_reverse: best.is_reverse },
                best.count as i32,
            );
            surr_count += 1;
        }
    }
}

/// Forward and reverse agreement of one candidate threshold.
fn agreement_counts(
    acc: &SplitAccumulator,
    leaf: usize,
    is_cat: bool,
    feature: usize,
    threshold_index: usize,
) -> (f64, f64) {
    let cells = if is_cat {
        acc.cat_split_stats(leaf, feature, threshold_index)
    } else {
        acc.con_split_stats(leaf, feature, threshold_index)
    };
    debug_assert_eq!(cells.len(), 4);
    (cells[0] + cells[2], cells[1] + cells[3])
}

/// Argmax over `(forward, reverse)` agreement pairs, scanning forward
/// before reverse per threshold; the first maximum wins.
fn best_of_feature(counts: impl Iterator<Item = (f64, f64)>) -> (usize, bool, f64) {
    let mut best_index = 0;
    let mut best_reverse = false;
    let mut best_count = f64::NEG_INFINITY;
    for (index, (forward, reverse)) in counts.enumerate() {
        if forward > best_count {
            best_count = forward;
            best_index = index;
            best_reverse = false;
        }
        if reverse > best_count {
            best_count = reverse;
            best_index = index;
            best_reverse = true;
        }
    }
    (best_index, best_reverse, best_count)
}
