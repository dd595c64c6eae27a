pub mod file;
pub mod stdin;

use portfolio_engine_core::{AssetData, ReturnFrequency};

pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Parse a frequency flag: daily, weekly, monthly, quarterly, annual.
pub fn parse_frequency(s: &str) -> CliResult<ReturnFrequency> {
    match s.to_lowercase().as_str() {
        "d" | "daily" => Ok(ReturnFrequency::Daily),
        "w" | "weekly" => Ok(ReturnFrequency::Weekly),
        "m" | "monthly" => Ok(ReturnFrequency::Monthly),
        "q" | "quarterly" => Ok(ReturnFrequency::Quarterly),
        "a" | "annual" | "yearly" => Ok(ReturnFrequency::Annual),
        other => Err(format!(
            "Unknown frequency '{}' (expected daily, weekly, monthly, quarterly, or annual)",
            other
        )
        .into()),
    }
}

/// Resolve assets from a file argument or piped stdin.
pub fn resolve_assets(path: &Option<String>, frequency: &str) -> CliResult<Vec<AssetData>> {
    let frequency = parse_frequency(frequency)?;
    if let Some(path) = path {
        return file::load_assets(path, frequency);
    }
    match stdin::read_assets()? {
        Some(assets) => Ok(assets),
        None => Err("No input: pass --input FILE or pipe asset JSON on stdin".into()),
    }
}
