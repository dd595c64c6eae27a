mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::covariance::CovarianceArgs;
use commands::frontier::FrontierArgs;
use commands::optimize::OptimizeArgs;

/// Portfolio optimization with decimal precision
#[derive(Parser)]
#[command(
    name = "mpt",
    version,
    about = "Portfolio optimization with decimal precision",
    long_about = "A CLI for modern-portfolio-theory computations with decimal precision. \
                  Solves minimum-variance and maximum-Sharpe allocations, generates \
                  efficient frontiers, and estimates covariance matrices from \
                  historical return series."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a single optimal portfolio (minimum variance or maximum Sharpe)
    Optimize(OptimizeArgs),
    /// Generate the efficient frontier
    Frontier(FrontierArgs),
    /// Estimate the covariance matrix of the supplied return series
    Covariance(CovarianceArgs),
    /// Print version information
    Version,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Minimal,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Optimize(args) => commands::optimize::run(args, &cli.output).await,
        Commands::Frontier(args) => commands::frontier::run(args, &cli.output).await,
        Commands::Covariance(args) => commands::covariance::run(args, &cli.output),
        Commands::Version => {
            println!("mpt {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        process::exit(1);
    }
}
