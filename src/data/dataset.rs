//! In-memory training rows.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use thiserror::Error;

use super::splits::CandidateSplits;

/// Shape errors raised while assembling a training set or binding it to a
/// candidate-split layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("{name} has {got} entries but the feature matrices have {expected} rows")]
    RowCountMismatch {
        name: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("categorical and continuous matrices disagree on row count: {cat} vs {con}")]
    FeatureRowMismatch { cat: usize, con: usize },

    #[error("continuous split boundaries of feature {feature} are not sorted")]
    UnsortedSplits { feature: usize },

    #[error("categorical feature {feature} declares zero levels")]
    EmptyLevels { feature: usize },

    #[error("training set has {got} categorical features but the split layout declares {expected}")]
    CategoricalArity { expected: usize, got: usize },

    #[error("training set has {got} continuous features but the split layout declares {expected}")]
    ContinuousArity { expected: usize, got: usize },
}

/// One training row, borrowed from a [`TrainingSet`].
#[derive(Debug, Clone, Copy)]
pub struct TrainingRow<'a> {
    pub cat: ArrayView1<'a, i32>,
    pub con: ArrayView1<'a, f64>,
    pub response: f64,
    pub weight: f64,
    /// Replication count consumed by the surrogate pass.
    pub dup_count: i32,
}

// =============================================================================
// TrainingSet
// =============================================================================

/// Dense in-memory training data.
///
/// Categorical features are non-negative level codes (the missing sentinel
/// aside), continuous features are doubles with NaN as missing. Weights
/// default to 1, duplication counts to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    x_cat: Array2<i32>,
    x_con: Array2<f64>,
    y: Array1<f64>,
    weights: Array1<f64>,
    dup_counts: Option<Vec<i32>>,
}

impl TrainingSet {
    pub fn new(x_cat: Array2<i32>, x_con: Array2<f64>, y: Array1<f64>) -> Result<Self, DataError> {
        if x_cat.nrows() != x_con.nrows() {
            return Err(DataError::FeatureRowMismatch {
                cat: x_cat.nrows(),
                con: x_con.nrows(),
            });
        }
        if y.len() != x_cat.nrows() {
            return Err(DataError::RowCountMismatch {
                name: "response",
                expected: x_cat.nrows(),
                got: y.len(),
            });
        }
        let n_rows = y.len();
        Ok(TrainingSet {
            x_cat,
            x_con,
            y,
            weights: Array1::ones(n_rows),
            dup_counts: None,
        })
    }

    /// Attach per-row weights.
    pub fn with_weights(mut self, weights: Array1<f64>) -> Result<Self, DataError> {
        if weights.len() != self.n_rows() {
            return Err(DataError::RowCountMismatch {
                name: "weights",
                expected: self.n_rows(),
                got: weights.len(),
            });
        }
        self.weights = weights;
        Ok(self)
    }

    /// Attach per-row duplication counts for the surrogate pass.
    pub fn with_dup_counts(mut self, dup_counts: Vec<i32>) -> Result<Self, DataError> {
        if dup_counts.len() != self.n_rows() {
            return Err(DataError::RowCountMismatch {
                name: "dup_counts",
                expected: self.n_rows(),
                got: dup_counts.len(),
            });
        }
        self.dup_counts = Some(dup_counts);
        Ok(self)
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.y.len()
    }

    #[inline]
    pub fn n_cat_features(&self) -> usize {
        self.x_cat.ncols()
    }

    #[inline]
    pub fn n_con_features(&self) -> usize {
        self.x_con.ncols()
    }

    pub fn row(&self, index: usize) -> TrainingRow<'_> {
        TrainingRow {
            cat: self.x_cat.row(index),
            con: self.x_con.row(index),
            response: self.y[index],
            weight: self.weights[index],
            dup_count: self.dup_counts.as_ref().map_or(1, |d| d[index]),
        }
    }

    pub fn cat_features(&self) -> ArrayView2<'_, i32> {
        self.x_cat.view()
    }

    pub fn con_features(&self) -> ArrayView2<'_, f64> {
        self.x_con.view()
    }

    /// Verify the set matches a candidate-split layout.
    pub fn check_arity(&self, splits: &CandidateSplits) -> Result<(), DataError> {
        if self.n_cat_features() != splits.n_cat_features() {
            return Err(DataError::CategoricalArity {
                expected: splits.n_cat_features(),
                got: self.n_cat_features(),
            });
        }
        if self.n_con_features() != splits.n_con_features() {
            return Err(DataError::ContinuousArity {
                expected: splits.n_con_features(),
                got: self.n_con_features(),
            });
        }
        Ok(())
    }
}
