//! Surrogate training end to end: agreement counting, dominance over the
//! majority baseline, and null-row routing.

use cartwright::{
    CandidateSplits, ImpurityKind, MissingPolicy, NodeKind, Response, TrainParams, Trainer,
    TrainingSet,
};
use ndarray::{array, aview1, Array2};

fn params(max_n_surr: u16) -> TrainParams {
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

#[test]
fn mirrored_feature_becomes_a_perfect_surrogate() {
    // feature 1 equals feature 0 on every row
    let set = TrainingSet::new(
        array![[0, 0], [0, 0], [1, 1], [1, 1]],
        Array2::zeros((4, 0)),
        array![0.0, 0.0, 1.0, 1.0],
    )
    .unwrap();
    let splits = CandidateSplits::categorical_only(vec![2, 2]).unwrap();
    let policy = MissingPolicy::default();

    let tree = Trainer::new(params(2)).train(&set, &splits, &policy).unwrap();

    assert_eq!(tree.node_kind(0), NodeKind::Split(0));
    let surr = tree.surrogate(0, 0).expect("surrogate trained");
    assert_eq!(surr.feature, 1);
    assert!(surr.status.is_categorical);
    assert!(!surr.status.is_reverse);
    assert_eq!(surr.agreement, 4);

    // a missing primary value routes through the surrogate instead of the
    // majority branch
    let response = tree.predict_response(array![policy.cat_null, 1].view(), aview1(&[]), &policy);
    assert_eq!(response, 1.0);
    let response = tree.predict_response(array![policy.cat_null, 0].view(), aview1(&[]), &policy);
    assert_eq!(response, 0.0);
}

#[test]
fn stored_surrogates_dominate_the_majority_baseline() {
    // feature 1 tracks feature 0 on six of eight rows, feature 2 is noise
    let set = TrainingSet::new(
        array![
            [0, 0, 0],
            [0, 0, 1],
            [0, 0, 0],
            [0, 1, 1],
            [1, 1, 0],
            [1, 1, 1],
            [1, 0, 0],
            [1, 1, 1]
        ],
        Array2::zeros((8, 0)),
        array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
    )
    .unwrap();
    let splits = CandidateSplits::categorical_only(vec![2, 2, 2]).unwrap();
    let policy = MissingPolicy::default();

    let tree = Trainer::new(params(3)).train(&set, &splits, &policy).unwrap();

    for node in 0..tree.n_nodes() {
        if !matches!(tree.node_kind(node), NodeKind::Split(_)) {
            continue;
        }
        let majority = tree.majority_count(node);
        for slot in 0..tree.max_n_surr() as usize {
            let Some(surr) = tree.surrogate(node, slot) else {
                break;
            };
            assert!(
                surr.agreement as u64 >= majority,
                "surrogate {slot} at node {node}: agreement {} below majority {majority}",
                surr.agreement
            );
        }
    }
}

#[test]
fn null_rows_with_a_surrogate_are_deterministic() {
    let set = TrainingSet::new(
        array![[0, 0], [0, 0], [1, 1], [1, 1]],
        Array2::zeros((4, 0)),
        array![0.0, 0.0, 1.0, 1.0],
    )
    .unwrap();
    let splits = CandidateSplits::categorical_only(vec![2, 2]).unwrap();
    let policy = MissingPolicy::default();

    let with_surr = Trainer::new(params(2)).train(&set, &splits, &policy).unwrap();
    let without_surr = Trainer::new(params(0)).train(&set, &splits, &policy).unwrap();

    for c1 in [0, 1] {
        // identical rows apart from the nulled primary agree with the
        // fully observed row when a surrogate exists
        let observed =
            with_surr.predict_response(array![c1, c1].view(), aview1(&[]), &policy);
        let nulled = with_surr.predict_response(
            array![policy.cat_null, c1].view(),
            aview1(&[]),
            &policy,
        );
        assert_eq!(observed, nulled);

        // without surrogates both null rows fall to the majority branch
        let nulled = without_surr.predict_response(
            array![policy.cat_null, c1].view(),
            aview1(&[]),
            &policy,
        );
        assert_eq!(nulled, 0.0);
    }
}

#[test]
fn surrogates_train_on_every_completed_level() {
    // responses need two levels of splits; feature 2 mirrors feature 0 and
    // feature 3 mirrors feature 1
    let set = TrainingSet::new(
        array![
            [0, 0, 0, 0],
            [0, 0, 0, 0],
            [0, 1, 0, 1],
            [0, 1, 0, 1],
            [1, 0, 1, 0],
            [1, 0, 1, 0],
            [1, 1, 1, 1],
            [1, 1, 1, 1]
        ],
        Array2::zeros((8, 0)),
        array![0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0],
    )
    .unwrap();
    let splits = CandidateSplits::categorical_only(vec![2, 2, 2, 2]).unwrap();
    let policy = MissingPolicy::default();

    let tree = Trainer::new(TrainParams {
        min_split: 2,
        min_bucket: 1,
        ..params(2)
    })
    .train(&set, &splits, &policy)
    .unwrap();

    assert!(tree.depth() >= 3, "expected at least two split levels");
    // every internal node with a usable twin feature carries a surrogate
    let mut surrogate_nodes = 0;
    for node in 0..tree.n_nodes() {
        if matches!(tree.node_kind(node), NodeKind::Split(_)) && tree.surrogate(node, 0).is_some() {
            surrogate_nodes += 1;
        }
    }
    assert!(surrogate_nodes >= 2, "only {surrogate_nodes} nodes carry surrogates");
}
