//! Batch prediction over a frozen tree.
//!
//! Single-row prediction lives on [`DecisionTree`] itself; this module adds
//! batch drivers over feature matrices, with an optional rayon-parallel
//! variant. Rows are independent, so parallel and sequential results are
//! identical.

use ndarray::{Array1, Array2, ArrayView2};
use rayon::prelude::*;

use crate::data::MissingPolicy;
use crate::repr::tree::DecisionTree;

/// Scalar response per row: mean for regression, winning class code for
/// classification.
///
/// # Panics
///
/// Panics if the two feature matrices disagree on row count.
pub fn predict_response_batch(
    tree: &DecisionTree,
    cat_features: ArrayView2<'_, i32>,
    con_features: ArrayView2<'_, f64>,
    policy: &MissingPolicy,
) -> Array1<f64> {
    assert_eq!(cat_features.nrows(), con_features.nrows(), "feature matrices disagree on rows");
    let responses: Vec<f64> = (0..cat_features.nrows())
        .map(|row| tree.predict_response(cat_features.row(row), con_features.row(row), policy))
        .collect();
    Array1::from_vec(responses)
}

/// Rayon-parallel variant of [`predict_response_batch`].
pub fn par_predict_response_batch(
    tree: &DecisionTree,
    cat_features: ArrayView2<'_, i32>,
    con_features: ArrayView2<'_, f64>,
    policy: &MissingPolicy,
) -> Array1<f64> {
    assert_eq!(cat_features.nrows(), con_features.nrows(), "feature matrices disagree on rows");
    let responses: Vec<f64> = (0..cat_features.nrows())
        .into_par_iter()
        .map(|row| tree.predict_response(cat_features.row(row), con_features.row(row), policy))
        .collect();
    Array1::from_vec(responses)
}

/// Full prediction vectors, one row per input row: a single mean column
/// for regression, class proportions for classification.
pub fn predict_batch(
    tree: &DecisionTree,
    cat_features: ArrayView2<'_, i32>,
    con_features: ArrayView2<'_, f64>,
    policy: &MissingPolicy,
) -> Array2<f64> {
    assert_eq!(cat_features.nrows(), con_features.nrows(), "feature matrices disagree on rows");
    let width = if tree.is_regression() { 1 } else { tree.n_y_labels() as usize };
    let n_rows = cat_features.nrows();
    let mut output = Array2::zeros((n_rows, width));
    for row in 0..n_rows {
        let prediction = tree.predict(cat_features.row(row), con_features.row(row), policy);
        output.row_mut(row).assign(&prediction);
    }
    output
}

/// Rayon-parallel variant of [`predict_batch`].
pub fn par_predict_batch(
    tree: &DecisionTree,
    cat_features: ArrayView2<'_, i32>,
    con_features: ArrayView2<'_, f64>,
    policy: &MissingPolicy,
) -> Array2<f64> {
    assert_eq!(cat_features.nrows(), con_features.nrows(), "feature matrices disagree on rows");
    let width = if tree.is_regression() { 1 } else { tree.n_y_labels() as usize };
    let n_rows = cat_features.nrows();
    let predictions: Vec<Array1<f64>> = (0..n_rows)
        .into_par_iter()
        .map(|row| tree.predict(cat_features.row(row), con_features.row(row), policy))
        .collect();
    let mut output = Array2::zeros((n_rows, width));
    for (row, prediction) in predictions.iter().enumerate() {
        output.row_mut(row).assign(prediction);
    }
    output
}
