//! Persistence of trained trees, including surrogate tables, and the
//! operator-facing renderings over a reloaded tree.

use cartwright::display::{display, print, surr_display};
use cartwright::persist::{from_bytes, to_bytes, DecodeError};
use cartwright::{
    CandidateSplits, ImpurityKind, MissingPolicy, Response, TrainParams, Trainer, TrainingSet,
    TreeLabels,
};
use ndarray::{array, aview1, Array2};

fn trained_tree_with_surrogates() -> cartwright::DecisionTree {
    let set = TrainingSet::new(
        array![[0, 0], [0, 0], [1, 1], [1, 1]],
        array![[0.1], [0.4], [1.2], [1.9]],
        array![0.0, 0.0, 1.0, 1.0],
    )
    .unwrap();
    let splits = CandidateSplits::new(array![[0.5, 1.5]], vec![2, 2]).unwrap();
    let params = TrainParams {
        response: Response::Classification { n_classes: 2 },
        impurity: ImpurityKind::Gini,
        min_split: 4,
        min_bucket: 1,
        max_depth: 5,
        max_n_surr: 2,
        ..TrainParams::default()
    };
    Trainer::new(params)
        .train(&set, &splits, &MissingPolicy::default())
        .unwrap()
}

#[test]
fn trained_tree_round_trips_bit_exact() {
    let tree = trained_tree_with_surrogates();
    let bytes = to_bytes(&tree);
    let reloaded = from_bytes(&bytes).unwrap();

    assert_eq!(tree, reloaded);

    // the reloaded tree routes rows, including null primaries through the
    // surrogate chain, exactly like the original
    let policy = MissingPolicy::default();
    for (cat, con) in [
        (array![0, 0], array![0.2]),
        (array![1, 1], array![1.7]),
        (array![policy.cat_null, 1], array![f64::NAN]),
        (array![policy.cat_null, policy.cat_null], array![0.3]),
    ] {
        assert_eq!(
            tree.predict_response(cat.view(), con.view(), &policy),
            reloaded.predict_response(cat.view(), con.view(), &policy),
        );
    }

    // serialization is deterministic
    assert_eq!(bytes, to_bytes(&reloaded));
}

#[test]
fn decode_rejects_a_truncated_stream() {
    let bytes = to_bytes(&trained_tree_with_surrogates());
    let result = from_bytes(&bytes[..bytes.len() / 2]);
    assert!(matches!(result, Err(DecodeError::Truncated { .. })));
}

#[test]
fn renderings_work_over_a_reloaded_tree() {
    let tree = trained_tree_with_surrogates();
    let reloaded = from_bytes(&to_bytes(&tree)).unwrap();
    let labels = TreeLabels {
        cat_feature_names: &["c0", "c1"],
        con_feature_names: &["x0"],
        cat_level_names: &["a", "b", "a", "b"],
        cat_n_levels: &[2, 2],
        class_labels: &["neg", "pos"],
    };

    let dot = display(&reloaded, &labels, "t_");
    assert!(dot.contains("shape=ellipse"));
    assert!(dot.contains("shape=box"));
    assert!(dot.contains("[label=\"yes\"];"));
    assert!(dot.contains("[label=\"no\"];"));
    assert_eq!(dot, display(&tree, &labels, "t_"));

    let text = print(&reloaded, &labels);
    assert!(text.contains("(0)["));
    assert!(text.contains("--> neg"));
    assert!(text.contains("--> pos"));

    let surrogates = surr_display(&reloaded, &labels);
    assert!(surrogates.contains("[Majority branch = 2 ]"));
    assert!(surrogates.contains("common rows = 4"));
}

#[test]
fn risk_survives_the_round_trip() {
    let tree = trained_tree_with_surrogates();
    let reloaded = from_bytes(&to_bytes(&tree)).unwrap();
    for node in 0..tree.n_nodes() {
        assert_eq!(tree.compute_risk(node), reloaded.compute_risk(node), "node {node}");
    }

    // predictions at the root cover all four rows
    assert_eq!(reloaded.node_count(0), 4);
    let proportions = reloaded.predict(array![0, 0].view(), aview1(&[0.2]), &MissingPolicy::default());
    assert_eq!(proportions, array![1.0, 0.0]);
}
