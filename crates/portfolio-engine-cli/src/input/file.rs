use portfolio_engine_core::{AssetData, ReturnFrequency};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

use super::CliResult;

/// Read a JSON or YAML file and deserialise into a typed struct.
pub fn read_structured<T: DeserializeOwned>(path: &str) -> CliResult<T> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;

    let is_yaml = matches!(
        canonical.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let value: T = if is_yaml {
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    } else {
        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    };
    Ok(value)
}

/// Load assets from a JSON/YAML asset file or a CSV return grid.
pub fn load_assets(path: &str, frequency: ReturnFrequency) -> CliResult<Vec<AssetData>> {
    let is_csv = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    if is_csv {
        assets_from_csv(path, frequency)
    } else {
        read_structured(path)
    }
}

/// CSV layout: header row of symbols, each subsequent row one period of
/// returns, oldest first. Expected return and volatility are annualised
/// from the series at the given frequency.
fn assets_from_csv(path: &str, frequency: ReturnFrequency) -> CliResult<Vec<AssetData>> {
    let canonical = resolve_path(path)?;
    let mut reader = csv::Reader::from_path(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;

    let symbols: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if symbols.is_empty() {
        return Err(format!("'{}' has no header row of symbols", canonical.display()).into());
    }

    let mut columns: Vec<Vec<Decimal>> = vec![Vec::new(); symbols.len()];
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() != symbols.len() {
            return Err(format!(
                "Row {} has {} fields, expected {}",
                row + 2,
                record.len(),
                symbols.len()
            )
            .into());
        }
        for (i, field) in record.iter().enumerate() {
            let value: Decimal = field
                .trim()
                .parse()
                .map_err(|e| format!("Row {} field '{}': {}", row + 2, field, e))?;
            columns[i].push(value);
        }
    }

    symbols
        .into_iter()
        .zip(columns)
        .map(|(symbol, returns)| {
            AssetData::from_returns(symbol, returns, frequency).map_err(Into::into)
        })
        .collect()
}

/// Resolve and validate the path, preventing directory traversal.
fn resolve_path(path: &str) -> CliResult<std::path::PathBuf> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }

    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}
