//! Shard-merge guarantees: any partition of the rows folds to the same
//! statistics as a single pass, and the sharded trainer matches the
//! sequential one.

use approx::assert_relative_eq;
use cartwright::{
    CandidateSplits, ImpurityKind, MissingPolicy, Response, SplitAccumulator, StatsKernel,
    TrainParams, Trainer, TrainingSet, Verbosity,
};
use ndarray::{array, Array1, Array2};

fn classification_set() -> (TrainingSet, CandidateSplits) {
    let set = TrainingSet::new(
        array![[0, 1], [1, 0], [0, 0], [1, 1], [0, 1], [1, 0], [-1, 1], [1, -1]],
        array![
            [0.2, 5.0],
            [1.4, 2.0],
            [0.6, 8.0],
            [2.8, 1.0],
            [0.1, 9.0],
            [2.2, 3.0],
            [0.9, 4.0],
            [1.9, 6.0]
        ],
        array![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0],
    )
    .unwrap();
    let splits =
        CandidateSplits::new(array![[0.5, 1.5, 2.5], [2.0, 5.0, 7.5]], vec![2, 2]).unwrap();
    (set, splits)
}

fn accumulate_rows(
    set: &TrainingSet,
    splits: &CandidateSplits,
    rows: &[usize],
) -> SplitAccumulator {
    let kernel =
        StatsKernel::new(Response::Classification { n_classes: 2 }, ImpurityKind::Gini);
    let policy = MissingPolicy::default();
    let tree = cartwright::DecisionTree::new(
        Response::Classification { n_classes: 2 },
        ImpurityKind::Gini,
        0,
    );
    let mut acc = SplitAccumulator::for_primary(kernel, splits, tree.depth(), false);
    for &row in rows {
        acc.accumulate(&tree, splits, &set.row(row), &policy);
    }
    acc
}

#[test]
fn any_partition_merges_to_the_same_matrices() {
    let (set, splits) = classification_set();

    let single = accumulate_rows(&set, &splits, &[0, 1, 2, 3, 4, 5, 6, 7]);

    // two different two-way partitions, merged in different orders
    let mut halves = accumulate_rows(&set, &splits, &[0, 1, 2, 3]);
    halves.merge(&accumulate_rows(&set, &splits, &[4, 5, 6, 7]));

    let mut interleaved = accumulate_rows(&set, &splits, &[7, 5, 3, 1]);
    interleaved.merge(&accumulate_rows(&set, &splits, &[6, 4, 2, 0]));

    let mut nested = accumulate_rows(&set, &splits, &[0]);
    for row in 1..8 {
        nested.merge(&accumulate_rows(&set, &splits, &[row]));
    }

    // classification statistics are bit-exact under any shard topology
    assert_eq!(single, halves);
    assert_eq!(single, interleaved);
    assert_eq!(single, nested);
}

#[test]
fn sharded_classification_training_is_bit_identical() {
    let (set, splits) = classification_set();
    let base = TrainParams {
        response: Response::Classification { n_classes: 2 },
        impurity: ImpurityKind::Gini,
        min_split: 4,
        min_bucket: 1,
        max_depth: 4,
        max_n_surr: 2,
        verbosity: Verbosity::Silent,
        ..TrainParams::default()
    };
    let policy = MissingPolicy::default();

    let sequential = Trainer::new(base).train(&set, &splits, &policy).unwrap();
    for shards in [2, 3, 8] {
        let sharded = Trainer::new(TrainParams { shards, ..base })
            .train(&set, &splits, &policy)
            .unwrap();
        assert_eq!(sequential, sharded, "{shards} shards diverged");
    }
}

#[test]
fn sharded_regression_training_matches_within_tolerance() {
    let n_rows = 40;
    let x: Vec<f64> = (0..n_rows).map(|i| (i as f64) * 0.25).collect();
    let y: Vec<f64> = x.iter().map(|v| 3.0 * v + 0.5 * v * v).collect();
    let set = TrainingSet::new(
        Array2::zeros((n_rows, 0)),
        Array2::from_shape_vec((n_rows, 1), x).unwrap(),
        Array1::from_vec(y),
    )
    .unwrap();
    let boundaries: Vec<f64> = (1..10).map(|i| i as f64).collect();
    let splits =
        CandidateSplits::continuous_only(Array2::from_shape_vec((1, 9), boundaries).unwrap())
            .unwrap();
    let base = TrainParams {
        response: Response::Regression,
        min_split: 4,
        min_bucket: 2,
        max_depth: 3,
        ..TrainParams::default()
    };
    let policy = MissingPolicy::default();

    let sequential = Trainer::new(base).train(&set, &splits, &policy).unwrap();
    let sharded = Trainer::new(TrainParams { shards: 4, ..base })
        .train(&set, &splits, &policy)
        .unwrap();

    // identical structure; leaf statistics agree up to reassociation of
    // the weighted sums
    assert_eq!(sequential.depth(), sharded.depth());
    for node in 0..sequential.n_nodes() {
        assert_eq!(sequential.node_kind(node), sharded.node_kind(node), "node {node}");
        if sequential.node_kind(node).is_leaf() {
            for (a, b) in sequential
                .predictions(node)
                .iter()
                .zip(sharded.predictions(node).iter())
            {
                assert_relative_eq!(*a, *b, max_relative = 1e-12);
            }
        }
    }
}
