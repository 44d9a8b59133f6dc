//! Rendering contract over trained trees: dot shapes and edge labels,
//! identifier prefixes, name escaping, the indented text dump, and the
//! surrogate report.

use cartwright::display::{display, print, surr_display};
use cartwright::{
    CandidateSplits, DecisionTree, ImpurityKind, MissingPolicy, Response, TrainParams, Trainer,
    TrainingSet, TreeLabels,
};
use ndarray::{array, Array2};

fn classification_params(max_n_surr: u16) -> TrainParams {
    TrainParams {
        response: Response::Classification { n_classes: 2 },
        impurity: ImpurityKind::Gini,
        min_split: 4,
        min_bucket: 1,
        max_depth: 5,
        max_n_surr,
        ..TrainParams::default()
    }
}

/// Categorical primary split `c0 in {a}` with a categorical and a
/// continuous surrogate.
fn categorical_tree() -> DecisionTree {
    let set = TrainingSet::new(
        array![[0, 0], [0, 0], [1, 1], [1, 1]],
        array![[0.1], [0.4], [1.2], [1.9]],
        array![0.0, 0.0, 1.0, 1.0],
    )
    .unwrap();
    let splits = CandidateSplits::new(array![[0.5, 1.5]], vec![2, 2]).unwrap();
    Trainer::new(classification_params(2))
        .train(&set, &splits, &MissingPolicy::default())
        .unwrap()
}

/// Continuous primary split `x0 <= 0.5`.
fn continuous_tree() -> DecisionTree {
    let set = TrainingSet::new(
        Array2::zeros((4, 0)),
        array![[0.1], [0.4], [1.2], [1.9]],
        array![0.0, 0.0, 1.0, 1.0],
    )
    .unwrap();
    let splits = CandidateSplits::continuous_only(array![[0.5, 1.5]]).unwrap();
    Trainer::new(classification_params(0))
        .train(&set, &splits, &MissingPolicy::default())
        .unwrap()
}

fn labels() -> TreeLabels<'static> {
    TreeLabels {
        cat_feature_names: &["c0", "c1"],
        con_feature_names: &["x0"],
        cat_level_names: &["a", "b", "a", "b"],
        cat_n_levels: &[2, 2],
        class_labels: &["neg", "pos"],
    }
}

#[test]
fn dot_body_follows_the_shape_and_edge_contract() {
    let dot = display(&categorical_tree(), &labels(), "t0_");

    assert!(dot.contains("\"t0_0\" [label=\"c0 in {a}\", shape=ellipse];"));
    assert!(dot.contains("\"t0_0\" -> \"t0_1\"[label=\"yes\"];"));
    assert!(dot.contains("\"t0_0\" -> \"t0_2\"[label=\"no\"];"));
    assert!(dot.contains("\"t0_1\" [label=\"neg\",shape=box];"));
    assert!(dot.contains("\"t0_2\" [label=\"pos\",shape=box];"));

    // the prefix namespaces every identifier
    let renamed = display(&categorical_tree(), &labels(), "g1_");
    assert!(renamed.contains("\"g1_0\""));
    assert!(!renamed.contains("\"t0_0\""));
}

#[test]
fn dot_renders_continuous_splits_with_threshold() {
    let dot = display(&continuous_tree(), &labels(), "");
    assert!(dot.contains("\"0\" [label=\"x0 <= 0.5\", shape=ellipse];"));
}

#[test]
fn dot_escapes_quoted_names() {
    let quoted = TreeLabels {
        con_feature_names: &["he\"ight"],
        ..labels()
    };
    let dot = display(&continuous_tree(), &quoted, "");
    assert!(dot.contains("he\\\"ight <= 0.5"));
}

#[test]
fn text_dump_indents_and_labels_leaves() {
    let text = print(&categorical_tree(), &labels());

    assert!(text.starts_with("(0)[2, 2]  c0 in {a}\n"));
    assert!(text.contains("   (1)[2, 0]  * --> neg\n"));
    assert!(text.contains("   (2)[0, 2]  * --> pos\n"));
}

#[test]
fn surrogate_report_lists_splits_and_majority() {
    let report = surr_display(&categorical_tree(), &labels());

    assert!(report.contains("(0) c0 in {a}"));
    // the categorical surrogate sorts before the continuous one on ties
    assert!(report.contains("1: c1 in {a}    [common rows = 4]"));
    assert!(report.contains("2: x0 <= 0.5    [common rows = 4]"));
    assert!(report.contains("[Majority branch = 2 ]"));

    // without surrogate slots the report is empty
    assert_eq!(surr_display(&continuous_tree(), &labels()), "");
}
