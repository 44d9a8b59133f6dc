//! Heap-indexed decision tree storage.
//!
//! The tree lives in parallel flat arrays of length `2^depth - 1`, indexed
//! as a left-balanced binary heap: node `i` has its true-branch child at
//! `2i+1` and false-branch child at `2i+2`. All levels are fully allocated;
//! unused slots carry [`NODE_NON_EXISTING`]. This makes the set of deepest
//! leaves a contiguous window, keeps parent/child arithmetic branchless and
//! admits a trivial contiguous serialization.
//!
//! Between statistics passes the tree doubles as its own work queue: leaves
//! still waiting for their expansion pass are marked [`IN_PROCESS_LEAF`].

use ndarray::{aview1, Array1, ArrayView1};
use thiserror::Error;

use super::node::{
    false_child, n_nodes_for_depth, true_child, NodeKind, SurrStatus, FINISHED_LEAF,
    IN_PROCESS_LEAF, NODE_NON_EXISTING, SURR_NON_EXISTING,
};
use crate::data::MissingPolicy;
use crate::training::impurity::{ImpurityKind, Response, StatsKernel};

/// Failures raised by tree storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// Allocation failed while adding a level.
    #[error("allocation failed while growing the tree to depth {depth}")]
    OutOfMemory { depth: u16 },
}

/// A stored surrogate split of an internal node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurrogateSplit {
    pub feature: usize,
    pub threshold: f64,
    pub status: SurrStatus,
    /// Rows on which this surrogate matched the primary split direction.
    pub agreement: i32,
}

// =============================================================================
// DecisionTree
// =============================================================================

/// Binary decision tree in flat heap-indexed arrays.
///
/// Per node: split feature (or a leaf sentinel), threshold, feature type,
/// the non-null row counts of the two primary branches (majority fallback),
/// a block of up to `max_n_surr` surrogate splits, and a prediction row of
/// sufficient statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    tree_depth: u16,
    n_y_labels: u16,
    max_n_surr: u16,
    is_regression: bool,
    impurity: ImpurityKind,

    feature_indices: Vec<i32>,
    feature_thresholds: Vec<f64>,
    is_categorical: Vec<u8>,
    /// Two cells per node: non-null rows routed to the true/false branch.
    nonnull_split_count: Vec<f64>,
    surr_indices: Vec<i32>,
    surr_thresholds: Vec<f64>,
    surr_status: Vec<i32>,
    surr_agreement: Vec<i32>,
    /// Row-major `n_nodes x n_label_cells` prediction statistics.
    predictions: Vec<f64>,
}

impl DecisionTree {
    /// Create a one-node tree whose root awaits its first expansion pass.
    pub fn new(response: Response, impurity: ImpurityKind, max_n_surr: u16) -> Self {
        let kernel = StatsKernel::new(response, impurity);
        let mut tree = DecisionTree {
            tree_depth: 0,
            n_y_labels: kernel.n_y_labels,
            max_n_surr,
            is_regression: kernel.is_regression,
            impurity,
            feature_indices: Vec::new(),
            feature_thresholds: Vec::new(),
            is_categorical: Vec::new(),
            nonnull_split_count: Vec::new(),
            surr_indices: Vec::new(),
            surr_thresholds: Vec::new(),
            surr_status: Vec::new(),
            surr_agreement: Vec::new(),
            predictions: Vec::new(),
        };
        tree.rebind(1);
        tree.feature_indices[0] = IN_PROCESS_LEAF;
        tree
    }

    /// Resize all arrays to exact capacity for `depth`, resetting content
    /// to the empty-slot fill values.
    pub fn rebind(&mut self, depth: u16) {
        let n_nodes = n_nodes_for_depth(depth);
        let n_surr = n_nodes * self.max_n_surr as usize;
        self.tree_depth = depth;
        self.feature_indices = vec![NODE_NON_EXISTING; n_nodes];
        self.feature_thresholds = vec![0.0; n_nodes];
        self.is_categorical = vec![0; n_nodes];
        self.nonnull_split_count = vec![0.0; n_nodes * 2];
        self.surr_indices = vec![SURR_NON_EXISTING; n_surr];
        self.surr_thresholds = vec![0.0; n_surr];
        self.surr_status = vec![0; n_surr];
        self.surr_agreement = vec![0; n_surr];
        self.predictions = vec![0.0; n_nodes * self.n_label_cells()];
    }

    // =========================================================================
    // Scalars and accessors
    // =========================================================================

    /// Tree depth, 1-based: a one-node tree has depth 1.
    #[inline]
    pub fn depth(&self) -> u16 {
        self.tree_depth
    }

    /// Number of allocated node slots, `2^depth - 1`.
    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.feature_indices.len()
    }

    #[inline]
    pub fn max_n_surr(&self) -> u16 {
        self.max_n_surr
    }

    #[inline]
    pub fn is_regression(&self) -> bool {
        self.is_regression
    }

    #[inline]
    pub fn impurity_kind(&self) -> ImpurityKind {
        self.impurity
    }

    /// Number of classes for classification, stats width for regression.
    #[inline]
    pub fn n_y_labels(&self) -> u16 {
        self.n_y_labels
    }

    /// Width of one prediction row.
    #[inline]
    pub fn n_label_cells(&self) -> usize {
        if self.is_regression {
            self.n_y_labels as usize
        } else {
            self.n_y_labels as usize + 1
        }
    }

    /// Stats kernel matching this tree's response shape.
    #[inline]
    pub fn kernel(&self) -> StatsKernel {
        StatsKernel {
            is_regression: self.is_regression,
            n_y_labels: self.n_y_labels,
            impurity: self.impurity,
        }
    }

    /// Decoded state of a node slot.
    #[inline]
    pub fn node_kind(&self, node: usize) -> NodeKind {
        NodeKind::from_code(self.feature_indices[node])
    }

    #[inline]
    pub fn threshold(&self, node: usize) -> f64 {
        self.feature_thresholds[node]
    }

    /// Whether the split at `node` tests a categorical feature.
    #[inline]
    pub fn node_is_categorical(&self, node: usize) -> bool {
        self.is_categorical[node] != 0
    }

    /// Prediction statistics row of a node.
    #[inline]
    pub fn predictions(&self, node: usize) -> &[f64] {
        let width = self.n_label_cells();
        &self.predictions[node * width..(node + 1) * width]
    }

    fn predictions_mut(&mut self, node: usize) -> &mut [f64] {
        let width = self.n_label_cells();
        &mut self.predictions[node * width..(node + 1) * width]
    }

    /// The stored surrogate at `slot` for `node`, if any.
    pub fn surrogate(&self, node: usize, slot: usize) -> Option<SurrogateSplit> {
        debug_assert!(slot < self.max_n_surr as usize);
        let base = node * self.max_n_surr as usize + slot;
        if self.surr_indices[base] < 0 {
            return None;
        }
        let status = SurrStatus::decode(self.surr_status[base])?;
        Some(SurrogateSplit {
            feature: self.surr_indices[base] as usize,
            threshold: self.surr_thresholds[base],
            status,
            agreement: self.surr_agreement[base],
        })
    }

    pub(crate) fn set_surrogate(
        &mut self,
        node: usize,
        slot: usize,
        feature: i32,
        threshold: f64,
        status: SurrStatus,
        agreement: i32,
    ) {
        let base = node * self.max_n_surr as usize + slot;
        self.surr_indices[base] = feature;
        self.surr_thresholds[base] = threshold;
        self.surr_status[base] = status.encode();
        self.surr_agreement[base] = agreement;
    }

    // =========================================================================
    // Growth
    // =========================================================================

    /// Add one fully allocated level.
    ///
    /// Existing nodes keep their indices; every new slot starts as
    /// [`NODE_NON_EXISTING`] with zeroed fields and empty surrogate blocks.
    pub fn grow_one_level(&mut self) -> Result<(), TreeError> {
        let new_depth = self.tree_depth + 1;
        let n_nodes = n_nodes_for_depth(new_depth);
        let n_surr = n_nodes * self.max_n_surr as usize;
        let n_labels = self.n_label_cells();

        grow(&mut self.feature_indices, n_nodes, NODE_NON_EXISTING, new_depth)?;
        grow(&mut self.feature_thresholds, n_nodes, 0.0, new_depth)?;
        grow(&mut self.is_categorical, n_nodes, 0, new_depth)?;
        grow(&mut self.nonnull_split_count, n_nodes * 2, 0.0, new_depth)?;
        grow(&mut self.surr_indices, n_surr, SURR_NON_EXISTING, new_depth)?;
        grow(&mut self.surr_thresholds, n_surr, 0.0, new_depth)?;
        grow(&mut self.surr_status, n_surr, 0, new_depth)?;
        grow(&mut self.surr_agreement, n_surr, 0, new_depth)?;
        grow(&mut self.predictions, n_nodes * n_labels, 0.0, new_depth)?;

        self.tree_depth = new_depth;
        Ok(())
    }

    /// Effective depth after removing trailing all-empty levels.
    ///
    /// Scans level by level; the first level consisting solely of
    /// [`NODE_NON_EXISTING`] slots caps the depth at the level above it.
    pub fn recompute_depth(&self) -> u16 {
        if self.n_nodes() <= 1 || self.tree_depth <= 1 {
            return self.tree_depth;
        }
        for depth in 2..=self.tree_depth {
            let level_width = 1usize << (depth - 1);
            let level_start = level_width - 1;
            let all_non_existing = (0..level_width)
                .all(|i| self.feature_indices[level_start + i] == NODE_NON_EXISTING);
            if all_non_existing {
                return depth - 1;
            }
        }
        self.tree_depth
    }

    // =========================================================================
    // Majority fallback and surrogate routing
    // =========================================================================

    /// Larger of the two non-null primary branch counts at a split node.
    ///
    /// # Panics
    ///
    /// Panics when asked at a leaf or non-existing slot.
    pub fn majority_count(&self, node: usize) -> u64 {
        if self.feature_indices[node] < 0 {
            panic!("requested branch counts for a leaf/non-existing node");
        }
        let true_count = self.nonnull_split_count[node * 2] as u64;
        let false_count = self.nonnull_split_count[node * 2 + 1] as u64;
        true_count.max(false_count)
    }

    /// Branch that received the majority of non-null primary rows.
    ///
    /// Ties go to the true branch.
    ///
    /// # Panics
    ///
    /// Panics when asked at a leaf or non-existing slot.
    pub fn majority_split(&self, node: usize) -> bool {
        if self.feature_indices[node] < 0 {
            panic!("requested branch counts for a leaf/non-existing node");
        }
        self.nonnull_split_count[node * 2] as u64 >= self.nonnull_split_count[node * 2 + 1] as u64
    }

    /// Route a row whose primary feature is missing.
    ///
    /// Walks the surrogate block in stored order and answers with the first
    /// surrogate whose feature is present, honoring reverse splits. With no
    /// usable surrogate the majority branch decides.
    pub fn surrogate_decision(
        &self,
        node: usize,
        cat_features: ArrayView1<i32>,
        con_features: ArrayView1<f64>,
        policy: &MissingPolicy,
    ) -> bool {
        for slot in 0..self.max_n_surr as usize {
            let Some(surr) = self.surrogate(node, slot) else {
                break;
            };
            let response = if surr.status.is_categorical {
                let value = cat_features[surr.feature];
                if policy.is_null_cat(value) {
                    continue;
                }
                f64::from(value) <= surr.threshold
            } else {
                let value = con_features[surr.feature];
                if policy.is_null_con(value) {
                    continue;
                }
                value <= surr.threshold
            };
            return if surr.status.is_reverse { !response } else { response };
        }
        self.majority_split(node)
    }

    // =========================================================================
    // Inference
    // =========================================================================

    /// Walk the tree to the leaf a row lands on.
    pub fn search(
        &self,
        cat_features: ArrayView1<i32>,
        con_features: ArrayView1<f64>,
        policy: &MissingPolicy,
    ) -> usize {
        let mut current = 0usize;
        loop {
            let feature = match self.node_kind(current) {
                NodeKind::Split(feature) => feature,
                NodeKind::InProcessLeaf | NodeKind::FinishedLeaf => return current,
                NodeKind::NonExisting => {
                    debug_assert!(false, "row routed to a non-existing node");
                    return current;
                }
            };
            let is_split_true = if self.node_is_categorical(current) {
                let value = cat_features[feature];
                if policy.is_null_cat(value) {
                    self.surrogate_decision(current, cat_features, con_features, policy)
                } else {
                    f64::from(value) <= self.feature_thresholds[current]
                }
            } else {
                let value = con_features[feature];
                if policy.is_null_con(value) {
                    self.surrogate_decision(current, cat_features, con_features, policy)
                } else {
                    value <= self.feature_thresholds[current]
                }
            };
            current = if is_split_true { true_child(current) } else { false_child(current) };
        }
    }

    /// Prediction vector for a row: mean response (regression) or class
    /// proportions (classification).
    pub fn predict(
        &self,
        cat_features: ArrayView1<i32>,
        con_features: ArrayView1<f64>,
        policy: &MissingPolicy,
    ) -> Array1<f64> {
        let leaf = self.search(cat_features, con_features, policy);
        self.kernel().stat_predict(aview1(self.predictions(leaf)))
    }

    /// Scalar response for a row: the mean for regression, the winning
    /// class code for classification.
    pub fn predict_response(
        &self,
        cat_features: ArrayView1<i32>,
        con_features: ArrayView1<f64>,
        policy: &MissingPolicy,
    ) -> f64 {
        let leaf = self.search(cat_features, con_features, policy);
        self.predict_response_at(leaf)
    }

    /// Scalar response stored at a node.
    pub fn predict_response_at(&self, node: usize) -> f64 {
        let prediction = self.kernel().stat_predict(aview1(self.predictions(node)));
        if self.is_regression {
            prediction[0]
        } else {
            argmax(prediction.view()) as f64
        }
    }

    // =========================================================================
    // Node statistics
    // =========================================================================

    /// Unweighted rows that landed on a node.
    pub fn node_count(&self, node: usize) -> u64 {
        self.kernel().stat_count(aview1(self.predictions(node)))
    }

    /// Weighted rows that landed on a node.
    pub fn node_weighted_count(&self, node: usize) -> f64 {
        self.kernel().stat_weighted_count(aview1(self.predictions(node)))
    }

    /// Weighted misclassification count at a node; zero for regression.
    pub fn compute_misclassification(&self, node: usize) -> f64 {
        if self.is_regression {
            return 0.0;
        }
        let classes = &self.predictions(node)[..self.n_y_labels as usize];
        let total: f64 = classes.iter().sum();
        total - classes.iter().cloned().fold(f64::MIN, f64::max)
    }

    /// Node risk for an external pruner: weighted squared-error sum for
    /// regression, misclassification count for classification.
    pub fn compute_risk(&self, node: usize) -> f64 {
        if self.is_regression {
            let stats = self.predictions(node);
            let (weight_total, y_sum, y2_sum) = (stats[0], stats[1], stats[2]);
            if weight_total <= 0.0 {
                0.0
            } else {
                y2_sum - y_sum * y_sum / weight_total
            }
        } else {
            self.compute_misclassification(node)
        }
    }

    // =========================================================================
    // Expansion support
    // =========================================================================

    /// Commit a split at `node` and open both children as in-process leaves.
    ///
    /// `true_stats` / `false_stats` cover only rows with a non-null primary
    /// feature; their row counts feed the majority fallback. Returns whether
    /// the children are both pure and too small to ever split again.
    pub(crate) fn update_primary_split(
        &mut self,
        node: usize,
        feature: i32,
        threshold: f64,
        is_cat: bool,
        min_split: u16,
        true_stats: ArrayView1<f64>,
        false_stats: ArrayView1<f64>,
    ) -> bool {
        let kernel = self.kernel();

        self.feature_indices[node] = feature;
        self.is_categorical[node] = u8::from(is_cat);
        self.feature_thresholds[node] = threshold;

        self.feature_indices[true_child(node)] = IN_PROCESS_LEAF;
        copy_stats(self.predictions_mut(true_child(node)), true_stats);
        self.feature_indices[false_child(node)] = IN_PROCESS_LEAF;
        copy_stats(self.predictions_mut(false_child(node)), false_stats);

        let true_count = kernel.stat_count(true_stats);
        let false_count = kernel.stat_count(false_stats);
        self.nonnull_split_count[node * 2] = true_count as f64;
        self.nonnull_split_count[node * 2 + 1] = false_count as f64;

        kernel.is_child_pure(true_stats)
            && kernel.is_child_pure(false_stats)
            && true_count < u64::from(min_split)
            && false_count < u64::from(min_split)
    }

    pub(crate) fn set_prediction_row(&mut self, node: usize, stats: ArrayView1<f64>) {
        copy_stats(self.predictions_mut(node), stats);
    }

    pub(crate) fn mark_finished(&mut self, node: usize) {
        self.feature_indices[node] = FINISHED_LEAF;
    }

    /// Freeze the tree: every leaf still awaiting expansion becomes terminal.
    pub(crate) fn promote_in_process_leaves(&mut self) {
        for code in &mut self.feature_indices {
            if *code == IN_PROCESS_LEAF {
                *code = FINISHED_LEAF;
            }
        }
    }

    // =========================================================================
    // Raw array access for the persistence layout
    // =========================================================================

    pub(crate) fn raw_arrays(&self) -> RawArrays<'_> {
        RawArrays {
            feature_indices: &self.feature_indices,
            feature_thresholds: &self.feature_thresholds,
            is_categorical: &self.is_categorical,
            nonnull_split_count: &self.nonnull_split_count,
            surr_indices: &self.surr_indices,
            surr_thresholds: &self.surr_thresholds,
            surr_status: &self.surr_status,
            surr_agreement: &self.surr_agreement,
            predictions: &self.predictions,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        tree_depth: u16,
        n_y_labels: u16,
        max_n_surr: u16,
        is_regression: bool,
        impurity: ImpurityKind,
        feature_indices: Vec<i32>,
        feature_thresholds: Vec<f64>,
        is_categorical: Vec<u8>,
        nonnull_split_count: Vec<f64>,
        surr_indices: Vec<i32>,
        surr_thresholds: Vec<f64>,
        surr_status: Vec<i32>,
        surr_agreement: Vec<i32>,
        predictions: Vec<f64>,
    ) -> Self {
        let n_nodes = n_nodes_for_depth(tree_depth);
        debug_assert_eq!(feature_indices.len(), n_nodes);
        debug_assert_eq!(nonnull_split_count.len(), n_nodes * 2);
        debug_assert_eq!(surr_indices.len(), n_nodes * max_n_surr as usize);
        DecisionTree {
            tree_depth,
            n_y_labels,
            max_n_surr,
            is_regression,
            impurity,
            feature_indices,
            feature_thresholds,
            is_categorical,
            nonnull_split_count,
            surr_indices,
            surr_thresholds,
            surr_status,
            surr_agreement,
            predictions,
        }
    }
}

/// Borrowed view of every flat array, in persistence order.
pub(crate) struct RawArrays<'a> {
    pub feature_indices: &'a [i32],
    pub feature_thresholds: &'a [f64],
    pub is_categorical: &'a [u8],
    pub nonnull_split_count: &'a [f64],
    pub surr_indices: &'a [i32],
    pub surr_thresholds: &'a [f64],
    pub surr_status: &'a [i32],
    pub surr_agreement: &'a [i32],
    pub predictions: &'a [f64],
}

fn grow<T: Clone>(buffer: &mut Vec<T>, new_len: usize, fill: T, depth: u16) -> Result<(), TreeError> {
    buffer
        .try_reserve_exact(new_len - buffer.len())
        .map_err(|_| TreeError::OutOfMemory { depth })?;
    buffer.resize(new_len, fill);
    Ok(())
}

fn copy_stats(row: &mut [f64], stats: ArrayView1<f64>) {
    debug_assert_eq!(row.len(), stats.len());
    for (dst, src) in row.iter_mut().zip(stats.iter()) {
        *dst = *src;
    }
}

/// Index of the first maximum element.
fn argmax(values: ArrayView1<f64>) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best_value {
            best_value = v;
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::node::{parent, SURR_NON_EXISTING};
    use ndarray::array;

    fn binary_gini() -> DecisionTree {
        DecisionTree::new(Response::Classification { n_classes: 2 }, ImpurityKind::Gini, 2)
    }

    /// Root split on categorical feature 0 at code 0; class 0 left, class 1
    /// right, two rows each side.
    fn split_root(tree: &mut DecisionTree) {
        tree.grow_one_level().unwrap();
        tree.set_prediction_row(0, array![2.0, 2.0, 4.0].view());
        tree.update_primary_split(
            0,
            0,
            0.0,
            true,
            20,
            array![2.0, 0.0, 2.0].view(),
            array![0.0, 2.0, 2.0].view(),
        );
        tree.promote_in_process_leaves();
    }

    #[test]
    fn new_tree_is_single_in_process_leaf() {
        let tree = binary_gini();
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.node_kind(0), NodeKind::InProcessLeaf);
    }

    #[test]
    fn grow_preserves_prefix_and_blanks_new_level() {
        let mut tree = binary_gini();
        tree.set_prediction_row(0, array![1.0, 3.0, 4.0].view());
        tree.grow_one_level().unwrap();

        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.n_nodes(), 3);
        assert_eq!(tree.node_kind(0), NodeKind::InProcessLeaf);
        assert_eq!(tree.predictions(0), &[1.0, 3.0, 4.0]);
        for node in 1..3 {
            assert_eq!(tree.node_kind(node), NodeKind::NonExisting);
            assert_eq!(tree.predictions(node), &[0.0, 0.0, 0.0]);
            assert!(tree.surrogate(node, 0).is_none());
        }
    }

    #[test]
    fn rebind_resizes_and_resets() {
        let mut tree = binary_gini();
        split_root(&mut tree);
        tree.rebind(3);

        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.n_nodes(), 7);
        for node in 0..tree.n_nodes() {
            assert_eq!(tree.node_kind(node), NodeKind::NonExisting);
        }
    }

    #[test]
    fn heap_invariants_after_growth() {
        let mut tree = binary_gini();
        for _ in 0..4 {
            tree.grow_one_level().unwrap();
        }
        assert_eq!(tree.n_nodes(), (1 << tree.depth()) - 1);
        for node in 0..tree.n_nodes() / 2 {
            assert_eq!(parent(true_child(node)), node);
            assert_eq!(parent(false_child(node)), node);
        }
    }

    #[test]
    fn search_routes_by_threshold() {
        let mut tree = binary_gini();
        split_root(&mut tree);
        let policy = MissingPolicy::default();

        let leaf = tree.search(array![0].view(), aview1(&[]), &policy);
        assert_eq!(leaf, 1);
        let leaf = tree.search(array![1].view(), aview1(&[]), &policy);
        assert_eq!(leaf, 2);
    }

    #[test]
    fn predict_response_classification() {
        let mut tree = binary_gini();
        split_root(&mut tree);
        let policy = MissingPolicy::default();

        assert_eq!(tree.predict_response(array![0].view(), aview1(&[]), &policy), 0.0);
        assert_eq!(tree.predict_response(array![1].view(), aview1(&[]), &policy), 1.0);

        let proportions = tree.predict(array![1].view(), aview1(&[]), &policy);
        assert_eq!(proportions, array![0.0, 1.0]);
    }

    #[test]
    fn missing_value_without_surrogates_takes_majority() {
        let mut tree = binary_gini();
        split_root(&mut tree);
        let policy = MissingPolicy::default();

        // equal branch counts tie toward the true branch
        let leaf = tree.search(array![policy.cat_null].view(), aview1(&[]), &policy);
        assert_eq!(leaf, 1);
    }

    #[test]
    fn surrogate_routing_honors_reverse_direction() {
        let mut tree = DecisionTree::new(
            Response::Classification { n_classes: 2 },
            ImpurityKind::Gini,
            2,
        );
        tree.grow_one_level().unwrap();
        // primary: continuous feature 0 <= 1.5
        tree.update_primary_split(
            0,
            0,
            1.5,
            false,
            20,
            array![3.0, 0.0, 3.0].view(),
            array![0.0, 1.0, 1.0].view(),
        );
        tree.promote_in_process_leaves();
        // reverse surrogate: cat feature 0 > 0 agrees with the true branch
        tree.set_surrogate(
            0,
            0,
            0,
            0.0,
            SurrStatus { is_categorical: true, is_reverse: true },
            4,
        );
        let policy = MissingPolicy::default();

        // cat value 1 > 0 so the reverse split answers true
        let leaf = tree.search(array![1].view(), array![f64::NAN].view(), &policy);
        assert_eq!(leaf, 1);
        // cat value 0 fails the reverse split
        let leaf = tree.search(array![0].view(), array![f64::NAN].view(), &policy);
        assert_eq!(leaf, 2);
        // both features null: majority branch (3 vs 1) is the true branch
        let leaf = tree.search(array![policy.cat_null].view(), array![f64::NAN].view(), &policy);
        assert_eq!(leaf, 1);
    }

    #[test]
    #[should_panic(expected = "leaf/non-existing")]
    fn majority_count_panics_at_leaf() {
        let tree = binary_gini();
        tree.majority_count(0);
    }

    #[test]
    fn recompute_depth_drops_empty_levels() {
        let mut tree = binary_gini();
        assert_eq!(tree.recompute_depth(), 1);

        split_root(&mut tree);
        assert_eq!(tree.recompute_depth(), 2);

        // an extra level with no nodes does not count
        tree.grow_one_level().unwrap();
        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.recompute_depth(), 2);
    }

    #[test]
    fn risk_regression_squared_error() {
        let mut tree = DecisionTree::new(Response::Regression, ImpurityKind::Gini, 0);
        // responses 1, 2, 3 with unit weights
        tree.set_prediction_row(0, array![3.0, 6.0, 14.0, 3.0].view());
        approx::assert_relative_eq!(tree.compute_risk(0), 2.0);
        assert_eq!(tree.node_count(0), 3);
        approx::assert_relative_eq!(tree.node_weighted_count(0), 3.0);
    }

    #[test]
    fn risk_classification_misclassification() {
        let mut tree = binary_gini();
        tree.set_prediction_row(0, array![3.0, 1.0, 4.0].view());
        approx::assert_relative_eq!(tree.compute_risk(0), 1.0);
    }

    #[test]
    fn surrogate_slots_left_aligned() {
        let mut tree = binary_gini();
        split_root(&mut tree);
        tree.set_surrogate(
            0,
            0,
            1,
            0.0,
            SurrStatus { is_categorical: true, is_reverse: false },
            4,
        );
        assert!(tree.surrogate(0, 0).is_some());
        assert!(tree.surrogate(0, 1).is_none());
        assert_eq!(tree.raw_arrays().surr_indices[1], SURR_NON_EXISTING);
    }
}
