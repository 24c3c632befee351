//! Strategy normalization and weighted selection tests.

use lotto_core::StrategyRequest;
use lotto_core::batch::BatchGenerationError;
use lotto_core::strategy::{
    NormalizedStrategy, StrategyName, StrategySelector, normalize_strategies, select_strategy,
};

fn normalized(pairs: &[(StrategyName, f64)]) -> Vec<NormalizedStrategy> {
    pairs
        .iter()
        .map(|&(name, weight)| NormalizedStrategy {
            name,
            weight,
            window: None,
            k_override: None,
        })
        .collect()
}

#[test]
fn test_duplicates_merge_in_first_appearance_order() {
    let mut hot = StrategyRequest::new("hot-streak", 1.0);
    hot.window = Some(50);
    let mut hot_again = StrategyRequest::new("hot_streak", 2.0);
    hot_again.window = Some(10);
    hot_again.k_override = Some(8);

    let out = normalize_strategies(&[
        StrategyRequest::new("balanced", 1.0),
        hot,
        StrategyRequest::new("uniform", 0.5),
        hot_again,
    ])
    .unwrap();

    let names: Vec<StrategyName> = out.iter().map(|s| s.name).collect();
    assert_eq!(
        names,
        vec![StrategyName::Balanced, StrategyName::HotStreak, StrategyName::Uniform]
    );
    assert_eq!(out[1].weight, 3.0);
    assert_eq!(out[1].window, Some(50), "first explicit window wins");
    assert_eq!(out[1].k_override, Some(8), "later kOverride fills a gap");
}

#[test]
fn test_zero_weights_are_dropped() {
    let out = normalize_strategies(&[
        StrategyRequest::new("balanced", 0.0),
        StrategyRequest::new("cold-surge", 2.0),
    ])
    .unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].name, StrategyName::ColdSurge);
}

#[test]
fn test_no_positive_weight_fails() {
    for requests in [
        vec![],
        vec![StrategyRequest::new("uniform", 0.0)],
        vec![
            StrategyRequest::new("balanced", 0.0),
            StrategyRequest::new("hot-streak", 0.0),
        ],
    ] {
        let err = normalize_strategies(&requests).unwrap_err();
        assert!(
            matches!(err, BatchGenerationError::NoStrategyAvailable),
            "got {err:?}"
        );
        assert_eq!(err.code(), "NO_STRATEGY_AVAILABLE");
    }
}

#[test]
fn test_unknown_name_fails() {
    let err = normalize_strategies(&[StrategyRequest::new("martingale", 1.0)]).unwrap_err();
    match err {
        BatchGenerationError::UnknownStrategy { name } => assert_eq!(name, "martingale"),
        other => panic!("expected UnknownStrategy, got {other:?}"),
    }
}

#[test]
fn test_invalid_weight_fails() {
    for weight in [-1.0, f64::NAN, f64::INFINITY] {
        let err = normalize_strategies(&[StrategyRequest::new("uniform", weight)]).unwrap_err();
        assert_eq!(err.code(), "INVALID_REQUEST", "weight {weight}");
    }
}

#[test]
fn test_overflowing_merged_weight_fails() {
    let err = normalize_strategies(&[
        StrategyRequest::new("balanced", 1e308),
        StrategyRequest::new("balanced", 1e308),
    ])
    .unwrap_err();

    assert_eq!(err.code(), "INVALID_REQUEST");
    assert!(
        matches!(err, BatchGenerationError::InvalidRequest { field: "strategies.weight", .. }),
        "{err:?}"
    );
}

#[test]
fn test_overflowing_total_weight_fails() {
    let err = normalize_strategies(&[
        StrategyRequest::new("balanced", 1e308),
        StrategyRequest::new("uniform", 1e308),
    ])
    .unwrap_err();

    assert!(
        matches!(err, BatchGenerationError::InvalidRequest { field: "strategies.weight", .. }),
        "{err:?}"
    );
}

#[test]
fn test_roulette_boundaries() {
    let strategies = normalized(&[(StrategyName::Balanced, 1.0), (StrategyName::Uniform, 2.0)]);

    let pick = |r: f64| select_strategy(&strategies, r).map(|s| s.name);
    assert_eq!(pick(0.0), Some(StrategyName::Balanced));
    // r * total == first weight lands exactly on zero: first entry.
    assert_eq!(pick(1.0 / 3.0), Some(StrategyName::Balanced));
    assert_eq!(pick(0.34), Some(StrategyName::Uniform));
    assert_eq!(pick(0.999_999), Some(StrategyName::Uniform));
    assert_eq!(select_strategy(&[], 0.5), None);
}

#[test]
fn test_float_residue_selects_last() {
    let strategies = normalized(&[
        (StrategyName::Balanced, 0.1),
        (StrategyName::HotStreak, 0.2),
        (StrategyName::ColdSurge, 0.7),
    ]);

    let picked = select_strategy(&strategies, 1.0).map(|s| s.name);

    assert_eq!(picked, Some(StrategyName::ColdSurge));
}

#[test]
fn test_selection_is_seed_deterministic() {
    let strategies = normalized(&[(StrategyName::Balanced, 1.0), (StrategyName::Uniform, 1.0)]);
    let mut a = StrategySelector::new(strategies.clone(), "seed-1");
    let mut b = StrategySelector::new(strategies.clone(), "seed-1");
    let mut c = StrategySelector::new(strategies, "seed-2");

    let draw = |s: &mut StrategySelector| -> Vec<StrategyName> {
        (0..64).filter_map(|_| s.next_strategy()).map(|n| n.name).collect()
    };
    let first = draw(&mut a);

    assert_eq!(first, draw(&mut b));
    assert_ne!(first, draw(&mut c));
}

#[test]
fn test_selection_frequency_tracks_weights() {
    let strategies = normalized(&[(StrategyName::Balanced, 2.0), (StrategyName::Uniform, 1.0)]);
    let mut selector = StrategySelector::new(strategies, "fairness");
    let draws = 30_000;

    let balanced = (0..draws)
        .filter_map(|_| selector.next_strategy())
        .filter(|s| s.name == StrategyName::Balanced)
        .count();

    let share = balanced as f64 / draws as f64;
    assert!((share - 2.0 / 3.0).abs() < 0.02, "balanced share {share}");
}
