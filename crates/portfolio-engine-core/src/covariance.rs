use rust_decimal::Decimal;

use crate::context::{percent_of, progress_stride, ExecutionContext};
use crate::error::EngineError;
use crate::types::AssetData;
use crate::EngineResult;

/// Truncate all return series to the common minimum length, keeping the
/// most recent observations (series are ordered oldest first).
pub fn align_returns(assets: &[AssetData]) -> EngineResult<Vec<&[Decimal]>> {
    let m = assets.iter().map(|a| a.returns.len()).min().unwrap_or(0);
    if m < 2 {
        return Err(EngineError::InsufficientData(format!(
            "Covariance estimation requires at least 2 aligned observations per asset, got {m}"
        )));
    }
    Ok(assets
        .iter()
        .map(|a| &a.returns[a.returns.len() - m..])
        .collect())
}

/// Bessel-corrected sample covariance of aligned return series:
/// `Sigma[i][j] = sum_t (x_i,t - mean_i)(x_j,t - mean_j) / (m - 1)`.
pub fn sample_covariance(
    series: &[&[Decimal]],
    ctx: &ExecutionContext,
) -> EngineResult<Vec<Vec<Decimal>>> {
    let n = series.len();
    let m = series.first().map(|s| s.len()).unwrap_or(0);
    if m < 2 {
        return Err(EngineError::InsufficientData(format!(
            "Covariance estimation requires at least 2 observations per series, got {m}"
        )));
    }

    let m_dec = Decimal::from(m as i64);
    let denom = Decimal::from((m - 1) as i64);
    let means: Vec<Decimal> = series
        .iter()
        .map(|s| s.iter().sum::<Decimal>() / m_dec)
        .collect();

    let mut cov = vec![vec![Decimal::ZERO; n]; n];
    let stride = progress_stride(n);
    for i in 0..n {
        ctx.checkpoint()?;
        if i % stride == 0 {
            ctx.report(
                percent_of(i, n),
                &format!("Estimating covariance: asset {}/{}", i + 1, n),
            );
        }
        for j in i..n {
            let mut acc = Decimal::ZERO;
            for t in 0..m {
                acc += (series[i][t] - means[i]) * (series[j][t] - means[j]);
            }
            let c = acc / denom;
            cov[i][j] = c;
            cov[j][i] = c;
        }
    }

    Ok(cov)
}

/// Align return series and estimate their sample covariance matrix.
pub fn estimate(assets: &[AssetData], ctx: &ExecutionContext) -> EngineResult<Vec<Vec<Decimal>>> {
    let series = align_returns(assets)?;
    sample_covariance(&series, ctx)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
