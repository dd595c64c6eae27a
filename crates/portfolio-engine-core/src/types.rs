use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::EngineResult;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Portfolio weights expressed as fractions of the total budget.
pub type Weight = Decimal;

// ---------------------------------------------------------------------------
// Asset inputs
// ---------------------------------------------------------------------------

/// Frequency of return observations
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum ReturnFrequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Annual,
}

impl ReturnFrequency {
    /// Number of periods in a year for annualisation
    pub fn periods_per_year(&self) -> Decimal {
        match self {
            ReturnFrequency::Daily => dec!(252),
            ReturnFrequency::Weekly => dec!(52),
            ReturnFrequency::Monthly => dec!(12),
            ReturnFrequency::Quarterly => dec!(4),
            ReturnFrequency::Annual => dec!(1),
        }
    }
}

/// One asset's inputs to the optimizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetData {
    /// Ticker or other identifier.
    pub symbol: String,
    /// Annualised expected return.
    pub expected_return: Rate,
    /// Annualised volatility. Informational; portfolio risk comes from the
    /// covariance of `returns`.
    pub volatility: Rate,
    /// Ordered periodic returns, oldest first.
    pub returns: Vec<Decimal>,
}

impl AssetData {
    /// Build an asset from a periodic return series, annualising the sample
    /// mean and volatility by the observation frequency.
    pub fn from_returns(
        symbol: impl Into<String>,
        returns: Vec<Decimal>,
        frequency: ReturnFrequency,
    ) -> EngineResult<Self> {
        let n = returns.len();
        if n < 2 {
            return Err(EngineError::InsufficientData(format!(
                "At least 2 return observations required to derive asset statistics, got {n}"
            )));
        }

        let n_dec = Decimal::from(n as i64);
        let periods = frequency.periods_per_year();
        let mean: Decimal = returns.iter().sum::<Decimal>() / n_dec;
        let sum_sq: Decimal = returns.iter().map(|r| (r - mean) * (r - mean)).sum();
        let variance = sum_sq / Decimal::from((n - 1) as i64);
        let volatility = crate::matrix::sqrt_decimal(variance) * crate::matrix::sqrt_decimal(periods);

        Ok(AssetData {
            symbol: symbol.into(),
            expected_return: mean * periods,
            volatility,
            returns,
        })
    }
}

/// Box and budget constraints applied to every optimization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioConstraints {
    /// Target total of all weights (1 for a fully invested portfolio).
    pub sum_weights: Decimal,
    /// Per-asset minimum weight.
    pub min_weight: Weight,
    /// Per-asset maximum weight.
    pub max_weight: Weight,
}

impl Default for PortfolioConstraints {
    fn default() -> Self {
        Self {
            sum_weights: Decimal::ONE,
            min_weight: Decimal::ZERO,
            max_weight: Decimal::ONE,
        }
    }
}

// ---------------------------------------------------------------------------
// Optimization outputs
// ---------------------------------------------------------------------------

/// A single asset's share of the optimal portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetAllocation {
    pub symbol: String,
    pub weight: Weight,
}

/// Optimal portfolio with its headline metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioResult {
    /// Weights in input asset order.
    pub weights: Vec<Weight>,
    pub expected_return: Rate,
    pub volatility: Rate,
    pub sharpe_ratio: Decimal,
    /// Weights paired with their symbols, in input order.
    pub allocations: Vec<AssetAllocation>,
    /// Total bound breach remaining after projection. Renormalisation can
    /// push clipped weights back outside their bounds; the residual is
    /// reported here rather than hidden.
    pub constraint_violation: Decimal,
    /// Populated by the gradient-ascent solver.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convergence: Option<ConvergenceReport>,
}

/// A single point on the efficient frontier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierPoint {
    pub risk: Decimal,
    pub expected_return: Rate,
    pub sharpe_ratio: Decimal,
    pub weights: Vec<Weight>,
}

/// Risk/return frontier, points sorted ascending by risk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EfficientFrontier {
    pub points: Vec<FrontierPoint>,
    /// Global minimum variance portfolio.
    pub min_variance: PortfolioResult,
    /// Maximum Sharpe ratio (tangency) portfolio.
    pub max_sharpe: PortfolioResult,
}

// ---------------------------------------------------------------------------
// Solver selection and configuration
// ---------------------------------------------------------------------------

/// Strategy used to solve for optimal weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverMethod {
    /// Analytic solution on the inverse covariance.
    ClosedForm,
    /// Finite-difference gradient ascent with constraint projection.
    GradientAscent,
}

/// Objective of a portfolio optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    MinVariance,
    MaxSharpe,
}

/// Termination report from the iterative solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceReport {
    pub converged: bool,
    pub iterations: u32,
    /// One of "Gradient tolerance achieved", "Function tolerance achieved",
    /// "Maximum iterations reached".
    pub reason: String,
    pub final_objective: Decimal,
}

/// Tuning for the finite-difference gradient-ascent solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientParams {
    /// Fixed ascent step size.
    pub learning_rate: Decimal,
    /// Forward-difference step per coordinate.
    pub fd_step: Decimal,
    /// Converged when the gradient norm falls below this.
    pub gradient_tolerance: Decimal,
    /// Converged when the objective change falls below this.
    pub objective_tolerance: Decimal,
    pub max_iterations: u32,
}

impl Default for GradientParams {
    fn default() -> Self {
        Self {
            learning_rate: dec!(0.01),
            fd_step: dec!(0.00000001),
            gradient_tolerance: dec!(0.000001),
            objective_tolerance: dec!(0.00000001),
            max_iterations: 500,
        }
    }
}

/// Engine configuration, passed explicitly into every entry point.
///
/// The engine keeps no state between calls; construct one of these per
/// caller (or per call) rather than sharing a process-wide instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Annual risk-free rate for Sharpe-based objectives.
    pub risk_free_rate: Rate,
    /// Diagonal loading added to the covariance matrix before inversion.
    pub regularization: Decimal,
    /// Weight solver strategy.
    pub solver: SolverMethod,
    /// Number of efficient-frontier points.
    pub frontier_points: u32,
    pub gradient: GradientParams,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: dec!(0.02),
            regularization: dec!(0.000001),
            solver: SolverMethod::ClosedForm,
            frontier_points: 20,
            gradient: GradientParams::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Computation envelope
// ---------------------------------------------------------------------------

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
