use portfolio_engine_core::context::ExecutionContext;
use portfolio_engine_core::{
    frontier, matrix, optimizer, AssetData, EngineConfig, EngineError, PortfolioConstraints,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const TOLERANCE: Decimal = dec!(0.000001);

// ===========================================================================
// End-to-end pipeline tests over the public API: the worked examples plus
// the engine's contract-level properties.
// ===========================================================================

/// Nine observations per asset, chosen so the sample covariance is exactly
/// diag(0.0225, 0.0025) and the cross terms cancel.
fn inverse_variance_fixture() -> Vec<AssetData> {
    let series_a = vec![
        dec!(0.15),
        dec!(-0.15),
        dec!(0.15),
        dec!(-0.15),
        dec!(0.15),
        dec!(-0.15),
        dec!(0.15),
        dec!(-0.15),
        dec!(0),
    ];
    let series_b = vec![
        dec!(0.05),
        dec!(-0.05),
        dec!(-0.05),
        dec!(0.05),
        dec!(0.05),
        dec!(-0.05),
        dec!(-0.05),
        dec!(0.05),
        dec!(0),
    ];
    vec![
        AssetData {
            symbol: "EQUITY".into(),
            expected_return: dec!(0.08),
            volatility: dec!(0.15),
            returns: series_a,
        },
        AssetData {
            symbol: "BOND".into(),
            expected_return: dec!(0.04),
            volatility: dec!(0.05),
            returns: series_b,
        },
    ]
}

// ---------------------------------------------------------------------------
// Worked example: inverse-variance weighting
// ---------------------------------------------------------------------------

#[test]
fn test_min_variance_inverse_variance_weighting() {
    let out = optimizer::minimum_variance_portfolio(
        &inverse_variance_fixture(),
        &PortfolioConstraints::default(),
        &EngineConfig::default(),
    )
    .unwrap();

    let w = &out.result.weights;
    assert!((w[0] - dec!(0.1)).abs() < dec!(0.001), "w0 = {}", w[0]);
    assert!((w[1] - dec!(0.9)).abs() < dec!(0.001), "w1 = {}", w[1]);
    assert!(
        (out.result.volatility - dec!(0.0474)).abs() < dec!(0.0005),
        "volatility = {}",
        out.result.volatility
    );
}

// ---------------------------------------------------------------------------
// Worked example: identical assets and regularization
// ---------------------------------------------------------------------------

#[test]
fn test_identical_assets_singular_then_regularized() {
    let series = vec![dec!(0.10), dec!(-0.10), dec!(0.10), dec!(-0.10)];
    let assets = vec![
        AssetData {
            symbol: "TWIN_A".into(),
            expected_return: dec!(0.06),
            volatility: dec!(0.10),
            returns: series.clone(),
        },
        AssetData {
            symbol: "TWIN_B".into(),
            expected_return: dec!(0.06),
            volatility: dec!(0.10),
            returns: series,
        },
    ];

    let unregularized = EngineConfig {
        regularization: Decimal::ZERO,
        ..EngineConfig::default()
    };
    assert!(matches!(
        optimizer::minimum_variance_portfolio(
            &assets,
            &PortfolioConstraints::default(),
            &unregularized
        ),
        Err(EngineError::SingularMatrix { .. })
    ));

    let out = optimizer::minimum_variance_portfolio(
        &assets,
        &PortfolioConstraints::default(),
        &EngineConfig::default(),
    )
    .unwrap();
    assert!((out.result.weights[0] - dec!(0.5)).abs() < dec!(0.001));
    assert!((out.result.weights[1] - dec!(0.5)).abs() < dec!(0.001));
}

// ---------------------------------------------------------------------------
// Worked example: dominant Sharpe concentrates weight
// ---------------------------------------------------------------------------

#[test]
fn test_dominant_sharpe_concentration() {
    let mut assets = inverse_variance_fixture();
    assets.push(AssetData {
        symbol: "STAR".into(),
        expected_return: dec!(0.22),
        volatility: dec!(0.11),
        returns: vec![
            dec!(0.11),
            dec!(0.11),
            dec!(-0.11),
            dec!(-0.11),
            dec!(0.11),
            dec!(0.11),
            dec!(-0.11),
            dec!(-0.11),
            dec!(0),
        ],
    });

    let out = optimizer::maximum_sharpe_portfolio(
        &assets,
        &PortfolioConstraints::default(),
        &EngineConfig::default(),
    )
    .unwrap();
    let w = &out.result.weights;
    assert!(w[2] > w[0] && w[2] > w[1], "weights = {:?}", w);
    for wi in w {
        assert!(*wi >= -TOLERANCE && *wi <= Decimal::ONE + TOLERANCE);
    }
}

// ---------------------------------------------------------------------------
// Contract: weights sum to the budget within tolerance
// ---------------------------------------------------------------------------

#[test]
fn test_weight_sum_contract() {
    for sum_weights in [Decimal::ONE, dec!(0.5)] {
        let constraints = PortfolioConstraints {
            sum_weights,
            min_weight: Decimal::ZERO,
            max_weight: Decimal::ONE,
        };
        let out = optimizer::maximum_sharpe_portfolio(
            &inverse_variance_fixture(),
            &constraints,
            &EngineConfig::default(),
        )
        .unwrap();
        let total: Decimal = out.result.weights.iter().sum();
        assert!(
            (total - sum_weights).abs() < TOLERANCE,
            "sum {} vs target {}",
            total,
            sum_weights
        );
    }
}

// ---------------------------------------------------------------------------
// Contract: weights land inside their bounds within tolerance
// ---------------------------------------------------------------------------

#[test]
fn test_weight_bounds_contract() {
    let constraints = PortfolioConstraints {
        sum_weights: Decimal::ONE,
        min_weight: dec!(0.25),
        max_weight: dec!(0.75),
    };
    let out = optimizer::minimum_variance_portfolio(
        &inverse_variance_fixture(),
        &constraints,
        &EngineConfig::default(),
    )
    .unwrap();
    for w in &out.result.weights {
        assert!(*w >= dec!(0.25) - TOLERANCE, "weight {} below bound", w);
        assert!(*w <= dec!(0.75) + TOLERANCE, "weight {} above bound", w);
    }
    assert_eq!(out.result.constraint_violation, Decimal::ZERO);
}

// ---------------------------------------------------------------------------
// Contract: inverse times original is the identity
// ---------------------------------------------------------------------------

#[test]
fn test_inverse_identity_contract() {
    let a = vec![
        vec![dec!(0.04), dec!(0.01), dec!(0.002)],
        vec![dec!(0.01), dec!(0.09), dec!(0.015)],
        vec![dec!(0.002), dec!(0.015), dec!(0.0625)],
    ];
    let inv = matrix::invert(&a, &ExecutionContext::foreground()).unwrap();
    let product = matrix::mat_multiply(&a, &inv);
    for (i, row) in product.iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            let expected = if i == j { Decimal::ONE } else { Decimal::ZERO };
            assert!(
                (value - expected).abs() < TOLERANCE,
                "product[{}][{}] = {}",
                i,
                j,
                value
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Contract: frontier risk is monotonically non-decreasing
// ---------------------------------------------------------------------------

#[test]
fn test_frontier_risk_monotonic() {
    let mut assets = inverse_variance_fixture();
    assets.push(AssetData {
        symbol: "MID".into(),
        expected_return: dec!(0.06),
        volatility: dec!(0.09),
        returns: vec![
            dec!(0.09),
            dec!(0.09),
            dec!(-0.09),
            dec!(-0.09),
            dec!(0.09),
            dec!(0.09),
            dec!(-0.09),
            dec!(-0.09),
            dec!(0),
        ],
    });

    let config = EngineConfig {
        frontier_points: 30,
        ..EngineConfig::default()
    };
    let out =
        frontier::efficient_frontier(&assets, &PortfolioConstraints::default(), &config).unwrap();
    let points = &out.result.points;
    assert_eq!(points.len(), 30);
    for pair in points.windows(2) {
        assert!(pair[1].risk >= pair[0].risk);
    }
    // Named members are present and consistent
    assert!(out.result.min_variance.volatility <= points.last().unwrap().risk + TOLERANCE);
    assert!(out.result.max_sharpe.sharpe_ratio >= out.result.min_variance.sharpe_ratio - TOLERANCE);
}

// ---------------------------------------------------------------------------
// Contract: mismatched series lengths truncate to the common window
// ---------------------------------------------------------------------------

#[test]
fn test_unequal_series_lengths_truncate() {
    let mut assets = inverse_variance_fixture();
    // Prepend stale history to one asset; the engine should ignore it
    let mut padded = vec![dec!(0.5), dec!(-0.5), dec!(0.4)];
    padded.extend(assets[0].returns.clone());
    assets[0].returns = padded;

    let out = optimizer::minimum_variance_portfolio(
        &assets,
        &PortfolioConstraints::default(),
        &EngineConfig::default(),
    )
    .unwrap();
    // Same result as the aligned fixture: stale history is truncated away
    assert!((out.result.weights[0] - dec!(0.1)).abs() < dec!(0.001));
    assert!((out.result.weights[1] - dec!(0.9)).abs() < dec!(0.001));
}
