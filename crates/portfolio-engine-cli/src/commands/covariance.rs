use clap::Args;
use portfolio_engine_core::context::ExecutionContext;
use portfolio_engine_core::covariance;

use crate::input::{self, CliResult};
use crate::output;
use crate::OutputFormat;

/// Arguments for covariance estimation
#[derive(Args)]
pub struct CovarianceArgs {
    /// Path to a JSON/YAML asset file or CSV return grid
    #[arg(long)]
    pub input: Option<String>,

    /// Return frequency of CSV input: daily, weekly, monthly, quarterly, annual
    #[arg(long, default_value = "daily")]
    pub frequency: String,
}

pub fn run(args: CovarianceArgs, format: &OutputFormat) -> CliResult<()> {
    let assets = input::resolve_assets(&args.input, &args.frequency)?;
    let matrix = covariance::estimate(&assets, &ExecutionContext::foreground())?;

    let symbols: Vec<&str> = assets.iter().map(|a| a.symbol.as_str()).collect();
    output::format_output(
        format,
        &serde_json::json!({
            "symbols": symbols,
            "covariance": matrix,
        }),
    );
    Ok(())
}
