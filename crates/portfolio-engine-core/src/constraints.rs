use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::EngineError;
use crate::types::PortfolioConstraints;
use crate::EngineResult;

/// Weight sums below this magnitude are not rescaled.
const RENORM_THRESHOLD: Decimal = dec!(0.000000001);

/// Check constraint invariants before optimization.
pub fn validate(constraints: &PortfolioConstraints) -> EngineResult<()> {
    if constraints.min_weight > constraints.max_weight {
        return Err(EngineError::InvalidInput {
            field: "constraints".into(),
            reason: format!(
                "min_weight {} exceeds max_weight {}",
                constraints.min_weight, constraints.max_weight
            ),
        });
    }
    Ok(())
}

/// Project raw weights onto the constraint set: clip each weight into
/// `[min_weight, max_weight]`, then rescale the vector so it sums to
/// `sum_weights`.
///
/// This is a projection, not a constrained optimum. Rescaling can push a
/// clipped weight back outside its bounds; the residual breach is surfaced
/// by [`violation_magnitude`], never silently corrected.
pub fn project(weights: &mut [Decimal], constraints: &PortfolioConstraints) {
    for w in weights.iter_mut() {
        if *w < constraints.min_weight {
            *w = constraints.min_weight;
        }
        if *w > constraints.max_weight {
            *w = constraints.max_weight;
        }
    }

    let total: Decimal = weights.iter().sum();
    if total.abs() < RENORM_THRESHOLD {
        return;
    }
    let scale = constraints.sum_weights / total;
    for w in weights.iter_mut() {
        *w *= scale;
    }
}

/// Total bound breach across all weights.
pub fn violation_magnitude(weights: &[Decimal], constraints: &PortfolioConstraints) -> Decimal {
    weights
        .iter()
        .map(|w| {
            if *w < constraints.min_weight {
                constraints.min_weight - *w
            } else if *w > constraints.max_weight {
                *w - constraints.max_weight
            } else {
                Decimal::ZERO
            }
        })
        .sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
