use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::constraints::violation_magnitude;
use crate::matrix::{mat_vec_multiply, sqrt_decimal, vec_dot};
use crate::types::{AssetAllocation, AssetData, PortfolioConstraints, PortfolioResult, Rate};

/// Floor applied to `w' Sigma w`; cancellation in the quadratic form can
/// drive it a hair negative.
pub const VARIANCE_FLOOR: Decimal = dec!(0.0000000000000001);

/// Volatilities below this are treated as degenerate for Sharpe purposes.
pub const VOLATILITY_EPSILON: Decimal = dec!(0.00000001);

/// Sentinel objective for degenerate portfolios; dominates any attainable
/// Sharpe ratio while staying comfortably inside Decimal range.
pub(crate) const OBJECTIVE_REJECT: Decimal = dec!(-1000000);

/// Portfolio expected return: `w' mu`.
pub fn expected_return(weights: &[Decimal], mu: &[Decimal]) -> Decimal {
    vec_dot(weights, mu)
}

/// Portfolio variance: `w' Sigma w`, floored at [`VARIANCE_FLOOR`].
pub fn variance(weights: &[Decimal], sigma: &[Vec<Decimal>]) -> Decimal {
    let sigma_w = mat_vec_multiply(sigma, weights);
    vec_dot(weights, &sigma_w).max(VARIANCE_FLOOR)
}

/// Portfolio volatility: `sqrt(w' Sigma w)`.
pub fn volatility(weights: &[Decimal], sigma: &[Vec<Decimal>]) -> Decimal {
    sqrt_decimal(variance(weights, sigma))
}

/// Sharpe ratio with a degenerate-volatility guard: reported as 0 when the
/// volatility is negligible.
pub fn sharpe_ratio(ret: Rate, risk_free_rate: Rate, vol: Decimal) -> Decimal {
    if vol < VOLATILITY_EPSILON {
        Decimal::ZERO
    } else {
        (ret - risk_free_rate) / vol
    }
}

/// Objective seen by the iterative solver: the Sharpe ratio, with
/// degenerate portfolios rejected outright instead of scored as 0.
pub(crate) fn sharpe_objective(
    weights: &[Decimal],
    mu: &[Decimal],
    sigma: &[Vec<Decimal>],
    risk_free_rate: Rate,
) -> Decimal {
    let sigma_w = mat_vec_multiply(sigma, weights);
    let var = vec_dot(weights, &sigma_w);
    if var <= VARIANCE_FLOOR {
        return OBJECTIVE_REJECT;
    }
    (vec_dot(weights, mu) - risk_free_rate) / sqrt_decimal(var)
}

/// Objective for iterative minimum-variance: the negated variance, so both
/// objectives run through the same ascent loop.
pub(crate) fn neg_variance_objective(weights: &[Decimal], sigma: &[Vec<Decimal>]) -> Decimal {
    -variance(weights, sigma)
}

/// Assemble a full [`PortfolioResult`] for already-projected weights.
pub fn portfolio_result(
    weights: Vec<Decimal>,
    assets: &[AssetData],
    sigma: &[Vec<Decimal>],
    constraints: &PortfolioConstraints,
    risk_free_rate: Rate,
) -> PortfolioResult {
    let mu: Vec<Decimal> = assets.iter().map(|a| a.expected_return).collect();
    let ret = expected_return(&weights, &mu);
    let vol = volatility(&weights, sigma);
    let sharpe = sharpe_ratio(ret, risk_free_rate, vol);
    let constraint_violation = violation_magnitude(&weights, constraints);
    let allocations = assets
        .iter()
        .zip(weights.iter())
        .map(|(a, w)| AssetAllocation {
            symbol: a.symbol.clone(),
            weight: *w,
        })
        .collect();

    PortfolioResult {
        weights,
        expected_return: ret,
        volatility: vol,
        sharpe_ratio: sharpe,
        allocations,
        constraint_violation,
        convergence: None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
