use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Instant;

use crate::constraints::{project, validate};
use crate::context::ExecutionContext;
use crate::error::EngineError;
use crate::types::{
    with_metadata, AssetData, ComputationOutput, EngineConfig, Objective, PortfolioConstraints,
    PortfolioResult, SolverMethod,
};
use crate::{covariance, matrix, metrics, solver};
use crate::EngineResult;

/// Weight above which a position is flagged as concentrated.
const CONCENTRATION_LIMIT: Decimal = dec!(0.40);

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Minimum-variance portfolio over the supplied assets.
pub fn minimum_variance_portfolio(
    assets: &[AssetData],
    constraints: &PortfolioConstraints,
    config: &EngineConfig,
) -> EngineResult<ComputationOutput<PortfolioResult>> {
    optimize_with(
        assets,
        constraints,
        config,
        Objective::MinVariance,
        &ExecutionContext::foreground(),
    )
}

/// Maximum-Sharpe (tangency) portfolio over the supplied assets.
pub fn maximum_sharpe_portfolio(
    assets: &[AssetData],
    constraints: &PortfolioConstraints,
    config: &EngineConfig,
) -> EngineResult<ComputationOutput<PortfolioResult>> {
    optimize_with(
        assets,
        constraints,
        config,
        Objective::MaxSharpe,
        &ExecutionContext::foreground(),
    )
}

/// Solve one objective through the full pipeline: covariance estimation,
/// regularization, inversion, weight solve, projection, metrics.
pub fn optimize_with(
    assets: &[AssetData],
    constraints: &PortfolioConstraints,
    config: &EngineConfig,
    objective: Objective,
    ctx: &ExecutionContext,
) -> EngineResult<ComputationOutput<PortfolioResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_inputs(assets, constraints)?;
    let n = assets.len();
    let mu: Vec<Decimal> = assets.iter().map(|a| a.expected_return).collect();

    tracing::debug!(n_assets = n, ?objective, solver = ?config.solver, "optimizing portfolio");

    let sigma_raw = covariance::estimate(assets, ctx)?;
    let sigma = matrix::regularize(&sigma_raw, config.regularization);
    let sigma_inv = matrix::invert(&sigma, ctx)?;

    let (mut weights, convergence) = match config.solver {
        SolverMethod::ClosedForm => {
            let w = match objective {
                Objective::MinVariance => solver::min_variance_closed_form(&sigma_inv)?,
                Objective::MaxSharpe => {
                    solver::max_sharpe_closed_form(&sigma_inv, &mu, config.risk_free_rate)?
                }
            };
            (w, None)
        }
        SolverMethod::GradientAscent => {
            let rf = config.risk_free_rate;
            let (w, report) = match objective {
                Objective::MinVariance => solver::gradient_ascent(
                    |w| metrics::neg_variance_objective(w, &sigma),
                    n,
                    constraints,
                    &config.gradient,
                    ctx,
                )?,
                Objective::MaxSharpe => solver::gradient_ascent(
                    |w| metrics::sharpe_objective(w, &mu, &sigma, rf),
                    n,
                    constraints,
                    &config.gradient,
                    ctx,
                )?,
            };
            if !report.converged {
                warnings.push(format!(
                    "Solver stopped after {} iterations: {}",
                    report.iterations, report.reason
                ));
            }
            (w, Some(report))
        }
    };

    project(&mut weights, constraints);
    let mut result =
        metrics::portfolio_result(weights, assets, &sigma, constraints, config.risk_free_rate);
    result.convergence = convergence;

    if result.constraint_violation > Decimal::ZERO {
        warnings.push(format!(
            "Residual constraint violation after projection: {}",
            result.constraint_violation
        ));
    }
    for alloc in &result.allocations {
        if alloc.weight > CONCENTRATION_LIMIT {
            warnings.push(format!(
                "Concentrated position: {} has weight {:.4}",
                alloc.symbol, alloc.weight
            ));
        }
    }

    let methodology = match objective {
        Objective::MinVariance => "Markowitz Minimum-Variance Optimization",
        Objective::MaxSharpe => "Maximum Sharpe (Tangency) Optimization",
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        methodology,
        &serde_json::json!({
            "n_assets": n,
            "risk_free_rate": config.risk_free_rate.to_string(),
            "regularization": config.regularization.to_string(),
            "solver": config.solver,
        }),
        warnings,
        elapsed,
        result,
    ))
}

pub(crate) fn validate_inputs(
    assets: &[AssetData],
    constraints: &PortfolioConstraints,
) -> EngineResult<()> {
    if assets.len() < 2 {
        return Err(EngineError::InsufficientData(format!(
            "At least 2 assets required, got {}",
            assets.len()
        )));
    }
    validate(constraints)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
