use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::constraints::project;
use crate::context::ExecutionContext;
use crate::error::EngineError;
use crate::matrix::{mat_vec_multiply, sqrt_decimal};
use crate::types::{ConvergenceReport, GradientParams, PortfolioConstraints, Rate};
use crate::EngineResult;

/// Normalising denominators below this magnitude fail the closed-form solve.
pub const DEGENERACY_THRESHOLD: Decimal = dec!(0.0000000001);

/// Cap on finite-difference gradient coordinates; keeps the norm inside
/// Decimal range when the objective rejects a degenerate probe.
const GRADIENT_LIMIT: Decimal = dec!(1000000);

pub const REASON_GRADIENT: &str = "Gradient tolerance achieved";
pub const REASON_FUNCTION: &str = "Function tolerance achieved";
pub const REASON_MAX_ITERATIONS: &str = "Maximum iterations reached";

// ---------------------------------------------------------------------------
// Closed-form solutions
// ---------------------------------------------------------------------------

/// Minimum-variance weights: `w = Sigma^-1 * 1 / (1' * Sigma^-1 * 1)`.
pub fn min_variance_closed_form(sigma_inv: &[Vec<Decimal>]) -> EngineResult<Vec<Decimal>> {
    let n = sigma_inv.len();
    let ones = vec![Decimal::ONE; n];
    let sigma_inv_ones = mat_vec_multiply(sigma_inv, &ones);
    let denom: Decimal = sigma_inv_ones.iter().sum();
    if denom.abs() < DEGENERACY_THRESHOLD {
        return Err(EngineError::DegenerateOptimization(
            "1' * Sigma^-1 * 1 is near zero".into(),
        ));
    }
    Ok(sigma_inv_ones.iter().map(|v| *v / denom).collect())
}

/// Tangency (maximum-Sharpe) weights:
/// `w = Sigma^-1 * (mu - rf) / (1' * Sigma^-1 * (mu - rf))`.
pub fn max_sharpe_closed_form(
    sigma_inv: &[Vec<Decimal>],
    mu: &[Decimal],
    risk_free_rate: Rate,
) -> EngineResult<Vec<Decimal>> {
    let excess: Vec<Decimal> = mu.iter().map(|r| *r - risk_free_rate).collect();
    let sigma_inv_excess = mat_vec_multiply(sigma_inv, &excess);
    let denom: Decimal = sigma_inv_excess.iter().sum();
    if denom.abs() < DEGENERACY_THRESHOLD {
        return Err(EngineError::DegenerateOptimization(
            "1' * Sigma^-1 * (mu - rf) is near zero".into(),
        ));
    }
    Ok(sigma_inv_excess.iter().map(|v| *v / denom).collect())
}

/// Equal allocation starting point.
pub fn equal_weights(n: usize) -> Vec<Decimal> {
    let w = Decimal::ONE / Decimal::from(n as i64);
    vec![w; n]
}

// ---------------------------------------------------------------------------
// Iterative solver
// ---------------------------------------------------------------------------

/// Projected gradient ascent with forward finite differences.
///
/// Starts from equal allocation, estimates the gradient one perturbation
/// per coordinate, steps at a fixed learning rate, and projects onto the
/// constraints after every step. Terminates on gradient norm, objective
/// change, or the iteration cap; hitting the cap is reported in the
/// [`ConvergenceReport`], never treated as a failure.
pub fn gradient_ascent<F>(
    objective: F,
    n: usize,
    constraints: &PortfolioConstraints,
    params: &GradientParams,
    ctx: &ExecutionContext,
) -> EngineResult<(Vec<Decimal>, ConvergenceReport)>
where
    F: Fn(&[Decimal]) -> Decimal,
{
    let mut w = equal_weights(n);
    project(&mut w, constraints);
    let mut obj = objective(&w);

    let mut iterations = 0u32;
    let mut reason = REASON_MAX_ITERATIONS;
    let mut converged = false;

    while iterations < params.max_iterations {
        ctx.checkpoint()?;
        iterations += 1;

        // Forward-difference gradient
        let mut grad = Vec::with_capacity(n);
        let mut norm_sq = Decimal::ZERO;
        for i in 0..n {
            let mut probe = w.clone();
            probe[i] += params.fd_step;
            let g = ((objective(&probe) - obj) / params.fd_step)
                .clamp(-GRADIENT_LIMIT, GRADIENT_LIMIT);
            norm_sq += g * g;
            grad.push(g);
        }

        if sqrt_decimal(norm_sq) < params.gradient_tolerance {
            reason = REASON_GRADIENT;
            converged = true;
            break;
        }

        for (wi, gi) in w.iter_mut().zip(grad.iter()) {
            *wi += params.learning_rate * *gi;
        }
        project(&mut w, constraints);

        let new_obj = objective(&w);
        let delta = (new_obj - obj).abs();
        obj = new_obj;
        if delta < params.objective_tolerance {
            reason = REASON_FUNCTION;
            converged = true;
            break;
        }
    }

    Ok((
        w,
        ConvergenceReport {
            converged,
            iterations,
            reason: reason.to_string(),
            final_objective: obj,
        },
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
