//! Impurity measures and sufficient-statistics handling.
//!
//! Every leaf and every candidate split side is summarized by a fixed-width
//! stats vector:
//!
//! - regression: `(Σw, Σw·y, Σw·y², n_rows)`
//! - classification: `(Σw per class.., n_rows)`
//!
//! The last cell always carries the unweighted row count so that
//! `min_split` / `min_bucket` checks are insensitive to fractional weights.
//! [`StatsKernel`] packages the response shape and implements impurity,
//! gain, predictions and purity tests over such vectors.

use ndarray::{Array1, ArrayView1};

/// Width of the regression stats vector.
pub const REGRESS_N_STATS: u16 = 4;

/// Relative tolerance used by the child-purity stop heuristic.
pub const PURITY_EPSILON: f64 = 1e-5;

/// Response shape of the learning problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Continuous response; impurity is variance.
    Regression,
    /// Categorical response with class codes `0..n_classes`.
    Classification { n_classes: u16 },
}

/// Impurity measure for classification trees.
///
/// Regression trees always use variance and ignore this choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpurityKind {
    Gini,
    Entropy,
    Misclass,
}

impl ImpurityKind {
    /// Stable one-byte code used by the persistence layout.
    pub fn to_code(self) -> u8 {
        match self {
            ImpurityKind::Gini => 0,
            ImpurityKind::Entropy => 1,
            ImpurityKind::Misclass => 2,
        }
    }

    /// Decode a persistence code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ImpurityKind::Gini),
            1 => Some(ImpurityKind::Entropy),
            2 => Some(ImpurityKind::Misclass),
            _ => None,
        }
    }
}

fn entropy_term(p: f64) -> f64 {
    assert!(p >= 0.0, "unexpected negative probability");
    if p == 0.0 {
        0.0
    } else {
        -p * p.log2()
    }
}

// =============================================================================
// StatsKernel
// =============================================================================

/// Computes impurity, gain and predictions from stats vectors.
///
/// `n_y_labels` is the number of classes for classification and the stats
/// width ([`REGRESS_N_STATS`]) for regression, matching the width of the
/// per-node prediction rows in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsKernel {
    pub is_regression: bool,
    pub n_y_labels: u16,
    pub impurity: ImpurityKind,
}

impl StatsKernel {
    pub fn new(response: Response, impurity: ImpurityKind) -> Self {
        match response {
            Response::Regression => StatsKernel {
                is_regression: true,
                n_y_labels: REGRESS_N_STATS,
                impurity,
            },
            Response::Classification { n_classes } => StatsKernel {
                is_regression: false,
                n_y_labels: n_classes,
                impurity,
            },
        }
    }

    /// Width of one stats vector (also the width of a prediction row).
    #[inline]
    pub fn stats_per_split(&self) -> usize {
        if self.is_regression {
            self.n_y_labels as usize
        } else {
            self.n_y_labels as usize + 1
        }
    }

    /// Build the stats vector contributed by one row.
    ///
    /// With `weights_as_rows` the weight is interpreted as a replication
    /// count and lands in the unweighted-count cell as well.
    pub fn row_stats(&self, response: f64, weight: f64, weights_as_rows: bool) -> Array1<f64> {
        let mut stats = Array1::zeros(self.stats_per_split());
        let n_rows = if weights_as_rows { weight.round() } else { 1.0 };
        if self.is_regression {
            let w_response = weight * response;
            stats[0] = weight;
            stats[1] = w_response;
            stats[2] = w_response * response;
            stats[3] = n_rows;
        } else {
            debug_assert!(response >= 0.0 && response < f64::from(self.n_y_labels));
            stats[response as usize] = weight;
            stats[self.n_y_labels as usize] = n_rows;
        }
        stats
    }

    /// Impurity of a stats vector: variance for regression, the configured
    /// measure over class proportions otherwise.
    ///
    /// # Panics
    ///
    /// Entropy panics on a negative proportion; that indicates corrupted
    /// statistics and the tree is unusable.
    pub fn impurity(&self, stats: ArrayView1<f64>) -> f64 {
        if self.is_regression {
            if stats[0] <= 0.0 {
                return 0.0;
            }
            stats[2] / stats[0] - (stats[1] / stats[0]).powi(2)
        } else {
            let proportions = self.stat_predict(stats);
            match self.impurity {
                ImpurityKind::Gini => 1.0 - proportions.iter().map(|p| p * p).sum::<f64>(),
                ImpurityKind::Entropy => proportions.iter().copied().map(entropy_term).sum(),
                ImpurityKind::Misclass => 1.0 - proportions.iter().cloned().fold(f64::MIN, f64::max),
            }
        }
    }

    /// Leaf prediction from a stats vector.
    ///
    /// Regression: single-element mean response. Classification: the class
    /// proportion vector.
    pub fn stat_predict(&self, stats: ArrayView1<f64>) -> Array1<f64> {
        if self.is_regression {
            Array1::from_elem(1, stats[1] / stats[0])
        } else {
            let classes = stats.slice(ndarray::s![..self.n_y_labels as usize]);
            let total: f64 = classes.sum();
            classes.mapv(|c| c / total)
        }
    }

    /// Unweighted number of rows in a stats vector (the trailing cell).
    #[inline]
    pub fn stat_count(&self, stats: ArrayView1<f64>) -> u64 {
        stats[stats.len() - 1] as u64
    }

    /// Weighted number of rows in a stats vector.
    #[inline]
    pub fn stat_weighted_count(&self, stats: ArrayView1<f64>) -> f64 {
        if self.is_regression {
            stats[0]
        } else {
            stats.slice(ndarray::s![..self.n_y_labels as usize]).sum()
        }
    }

    /// Impurity gain of a candidate split.
    ///
    /// `combined` concatenates the true-branch and false-branch stats
    /// vectors. Zero when all rows fall to one side.
    pub fn impurity_gain(&self, combined: ArrayView1<f64>) -> f64 {
        let sps = self.stats_per_split();
        debug_assert_eq!(combined.len(), 2 * sps);
        let true_stats = combined.slice(ndarray::s![..sps]);
        let false_stats = combined.slice(ndarray::s![sps..]);

        let true_count = self.stat_weighted_count(true_stats);
        let false_count = self.stat_weighted_count(false_stats);
        let total_count = true_count + false_count;
        if true_count == 0.0 || false_count == 0.0 {
            return 0.0;
        }

        let true_weight = true_count / total_count;
        let false_weight = false_count / total_count;
        let stats_sum = &true_stats + &false_stats;
        self.impurity(stats_sum.view())
            - true_weight * self.impurity(true_stats)
            - false_weight * self.impurity(false_stats)
    }

    /// Whether a child's responses are too uniform to be worth splitting.
    pub fn is_child_pure(&self, stats: ArrayView1<f64>) -> bool {
        if self.is_regression {
            let mean = stats[1] / stats[0];
            let variance = stats[2] / stats[0] - mean.powi(2);
            variance < PURITY_EPSILON * mean * mean
        } else {
            let classes = stats.slice(ndarray::s![..self.n_y_labels as usize]);
            let total: f64 = classes.sum();
            let non_max = total - classes.iter().cloned().fold(f64::MIN, f64::max);
            (non_max / total) < 100.0 * PURITY_EPSILON
        }
    }
}
