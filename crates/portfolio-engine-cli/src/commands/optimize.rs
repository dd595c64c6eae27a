use clap::{Args, ValueEnum};
use portfolio_engine_core::background::{TaskOutcome, TaskRequest};
use portfolio_engine_core::{
    optimizer, EngineConfig, Objective, PortfolioConstraints, SolverMethod,
};
use rust_decimal::Decimal;

use crate::input::{self, CliResult};
use crate::output;
use crate::OutputFormat;

#[derive(Clone, Copy, ValueEnum)]
pub enum ObjectiveArg {
    MinVariance,
    MaxSharpe,
}

impl From<ObjectiveArg> for Objective {
    fn from(value: ObjectiveArg) -> Self {
        match value {
            ObjectiveArg::MinVariance => Objective::MinVariance,
            ObjectiveArg::MaxSharpe => Objective::MaxSharpe,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MethodArg {
    ClosedForm,
    GradientAscent,
}

impl From<MethodArg> for SolverMethod {
    fn from(value: MethodArg) -> Self {
        match value {
            MethodArg::ClosedForm => SolverMethod::ClosedForm,
            MethodArg::GradientAscent => SolverMethod::GradientAscent,
        }
    }
}

/// Arguments for single-portfolio optimization
#[derive(Args)]
pub struct OptimizeArgs {
    /// Path to a JSON/YAML asset file or CSV return grid
    #[arg(long)]
    pub input: Option<String>,

    /// Optimization objective
    #[arg(long, value_enum, default_value = "max-sharpe")]
    pub objective: ObjectiveArg,

    /// Weight solver
    #[arg(long, value_enum, default_value = "closed-form")]
    pub method: MethodArg,

    /// Annual risk-free rate
    #[arg(long, default_value = "0.02")]
    pub risk_free_rate: Decimal,

    /// Per-asset minimum weight
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub min_weight: Decimal,

    /// Per-asset maximum weight
    #[arg(long, default_value = "1")]
    pub max_weight: Decimal,

    /// Target total of all weights
    #[arg(long, default_value = "1")]
    pub sum_weights: Decimal,

    /// Return frequency of CSV input: daily, weekly, monthly, quarterly, annual
    #[arg(long, default_value = "daily")]
    pub frequency: String,

    /// Run through the background executor and print progress
    #[arg(long)]
    pub progress: bool,
}

pub async fn run(args: OptimizeArgs, format: &OutputFormat) -> CliResult<()> {
    let assets = input::resolve_assets(&args.input, &args.frequency)?;
    let constraints = PortfolioConstraints {
        sum_weights: args.sum_weights,
        min_weight: args.min_weight,
        max_weight: args.max_weight,
    };
    let config = EngineConfig {
        risk_free_rate: args.risk_free_rate,
        solver: args.method.into(),
        ..EngineConfig::default()
    };
    let objective: Objective = args.objective.into();

    let out = if args.progress {
        let outcome = super::run_task_with_progress(
            TaskRequest::PortfolioOptimization {
                assets,
                constraints,
                objective,
            },
            config,
        )
        .await?;
        match outcome {
            TaskOutcome::Portfolio(out) => out,
            _ => return Err("unexpected task outcome".into()),
        }
    } else {
        match objective {
            Objective::MinVariance => {
                optimizer::minimum_variance_portfolio(&assets, &constraints, &config)?
            }
            Objective::MaxSharpe => {
                optimizer::maximum_sharpe_portfolio(&assets, &constraints, &config)?
            }
        }
    };

    output::format_output(format, &serde_json::to_value(&out)?);
    Ok(())
}
