use rust_decimal::Decimal;
use std::time::Instant;

use crate::constraints::project;
use crate::context::{percent_of, progress_stride, ExecutionContext};
use crate::error::EngineError;
use crate::optimizer::validate_inputs;
use crate::types::{
    with_metadata, AssetData, ComputationOutput, EfficientFrontier, EngineConfig, FrontierPoint,
    PortfolioConstraints, PortfolioResult,
};
use crate::{covariance, matrix, metrics, solver};
use crate::EngineResult;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Efficient frontier over the supplied assets.
pub fn efficient_frontier(
    assets: &[AssetData],
    constraints: &PortfolioConstraints,
    config: &EngineConfig,
) -> EngineResult<ComputationOutput<EfficientFrontier>> {
    efficient_frontier_with(assets, constraints, config, &ExecutionContext::foreground())
}

/// Sweep target returns across the attainable range, solving each point
/// with the two-fund Lagrangian closed form on the inverse covariance:
/// `w(t) = lambda * Sigma^-1 * 1 + gamma * Sigma^-1 * mu` with
/// `lambda = (c - b*t) / d`, `gamma = (a*t - b) / d`, `d = a*c - b^2`.
pub fn efficient_frontier_with(
    assets: &[AssetData],
    constraints: &PortfolioConstraints,
    config: &EngineConfig,
    ctx: &ExecutionContext,
) -> EngineResult<ComputationOutput<EfficientFrontier>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_inputs(assets, constraints)?;
    let n = assets.len();
    let mu: Vec<Decimal> = assets.iter().map(|a| a.expected_return).collect();

    tracing::debug!(n_assets = n, points = config.frontier_points, "generating frontier");

    let sigma_raw = covariance::estimate(assets, ctx)?;
    let sigma = matrix::regularize(&sigma_raw, config.regularization);
    let sigma_inv = matrix::invert(&sigma, ctx)?;

    // Named portfolios via the closed-form solver
    let min_variance = named_portfolio(
        solver::min_variance_closed_form(&sigma_inv)?,
        assets,
        &sigma,
        constraints,
        config,
    );
    let max_sharpe = match solver::max_sharpe_closed_form(&sigma_inv, &mu, config.risk_free_rate) {
        Ok(w) => named_portfolio(w, assets, &sigma, constraints, config),
        Err(EngineError::DegenerateOptimization(reason)) => {
            warnings.push(format!(
                "Tangency solve degenerate ({reason}); reporting the minimum-variance portfolio"
            ));
            min_variance.clone()
        }
        Err(e) => return Err(e),
    };

    // Lagrangian scalars on the inverse covariance
    let ones = vec![Decimal::ONE; n];
    let inv_ones = matrix::mat_vec_multiply(&sigma_inv, &ones);
    let inv_mu = matrix::mat_vec_multiply(&sigma_inv, &mu);
    let a: Decimal = inv_ones.iter().sum();
    let b = matrix::vec_dot(&mu, &inv_ones);
    let c = matrix::vec_dot(&mu, &inv_mu);
    let d = a * c - b * b;

    let k = config.frontier_points.max(2) as usize;
    let min_ret = mu
        .iter()
        .copied()
        .fold(Decimal::MAX, |acc, r| if r < acc { r } else { acc });
    let max_ret = mu
        .iter()
        .copied()
        .fold(Decimal::MIN, |acc, r| if r > acc { r } else { acc });

    let mut points: Vec<FrontierPoint> = Vec::with_capacity(k);
    if d.abs() < solver::DEGENERACY_THRESHOLD {
        warnings.push("Frontier solve degenerate; no target-return points generated".into());
    } else {
        let step = (max_ret - min_ret) / Decimal::from((k - 1) as i64);
        let stride = progress_stride(k);
        for i in 0..k {
            ctx.checkpoint()?;
            if i % stride == 0 {
                ctx.report(
                    percent_of(i, k),
                    &format!("Computing frontier point {}/{}", i + 1, k),
                );
            }

            let target = min_ret + step * Decimal::from(i as i64);
            let lambda = (c - b * target) / d;
            let gamma = (a * target - b) / d;
            let mut w: Vec<Decimal> = inv_ones
                .iter()
                .zip(inv_mu.iter())
                .map(|(o, m)| lambda * *o + gamma * *m)
                .collect();
            project(&mut w, constraints);

            let ret = metrics::expected_return(&w, &mu);
            let vol = metrics::volatility(&w, &sigma);
            points.push(FrontierPoint {
                risk: vol,
                expected_return: ret,
                sharpe_ratio: metrics::sharpe_ratio(ret, config.risk_free_rate, vol),
                weights: w,
            });
        }
    }

    points.sort_by(|p, q| p.risk.cmp(&q.risk));
    if points.len() < k {
        warnings.push(format!(
            "Generated {} of {} requested frontier points",
            points.len(),
            k
        ));
    }

    let frontier = EfficientFrontier {
        points,
        min_variance,
        max_sharpe,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Efficient Frontier Generation",
        &serde_json::json!({
            "n_assets": n,
            "points": k,
            "risk_free_rate": config.risk_free_rate.to_string(),
            "regularization": config.regularization.to_string(),
        }),
        warnings,
        elapsed,
        frontier,
    ))
}

fn named_portfolio(
    mut weights: Vec<Decimal>,
    assets: &[AssetData],
    sigma: &[Vec<Decimal>],
    constraints: &PortfolioConstraints,
    config: &EngineConfig,
) -> PortfolioResult {
    project(&mut weights, constraints);
    metrics::portfolio_result(weights, assets, sigma, constraints, config.risk_free_rate)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
