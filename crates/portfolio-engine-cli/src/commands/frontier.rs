use clap::Args;
use portfolio_engine_core::background::{TaskOutcome, TaskRequest};
use portfolio_engine_core::{frontier, EngineConfig, PortfolioConstraints};
use rust_decimal::Decimal;

use crate::input::{self, CliResult};
use crate::output;
use crate::OutputFormat;

/// Arguments for efficient-frontier generation
#[derive(Args)]
pub struct FrontierArgs {
    /// Path to a JSON/YAML asset file or CSV return grid
    #[arg(long)]
    pub input: Option<String>,

    /// Number of frontier points
    #[arg(long, default_value = "20")]
    pub points: u32,

    /// Annual risk-free rate
    #[arg(long, default_value = "0.02")]
    pub risk_free_rate: Decimal,

    /// Per-asset minimum weight
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub min_weight: Decimal,

    /// Per-asset maximum weight
    #[arg(long, default_value = "1")]
    pub max_weight: Decimal,

    /// Return frequency of CSV input: daily, weekly, monthly, quarterly, annual
    #[arg(long, default_value = "daily")]
    pub frequency: String,

    /// Run through the background executor and print progress
    #[arg(long)]
    pub progress: bool,
}

pub async fn run(args: FrontierArgs, format: &OutputFormat) -> CliResult<()> {
    let assets = input::resolve_assets(&args.input, &args.frequency)?;
    let constraints = PortfolioConstraints {
        sum_weights: Decimal::ONE,
        min_weight: args.min_weight,
        max_weight: args.max_weight,
    };
    let config = EngineConfig {
        risk_free_rate: args.risk_free_rate,
        frontier_points: args.points,
        ..EngineConfig::default()
    };

    let out = if args.progress {
        let outcome = super::run_task_with_progress(
            TaskRequest::EfficientFrontier {
                assets,
                constraints,
            },
            config,
        )
        .await?;
        match outcome {
            TaskOutcome::Frontier(out) => out,
            _ => return Err("unexpected task outcome".into()),
        }
    } else {
        frontier::efficient_frontier(&assets, &constraints, &config)?
    };

    output::format_output(format, &serde_json::to_value(&out)?);
    Ok(())
}
