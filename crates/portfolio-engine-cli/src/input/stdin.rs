use portfolio_engine_core::AssetData;
use std::io::{self, Read};

use super::CliResult;

/// Attempt to read asset JSON from stdin if data is being piped.
/// Returns None if stdin is a TTY (interactive).
pub fn read_assets() -> CliResult<Option<Vec<AssetData>>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let assets: Vec<AssetData> = serde_json::from_str(trimmed)?;
    Ok(Some(assets))
}
