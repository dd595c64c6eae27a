use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::context::{percent_of, progress_stride, ExecutionContext};
use crate::error::EngineError;
use crate::EngineResult;

/// Pivot magnitudes below this are treated as singular.
pub const PIVOT_THRESHOLD: Decimal = dec!(0.000000000001);

/// Default diagonal loading applied before inversion.
pub const DEFAULT_REGULARIZATION: Decimal = dec!(0.000001);

// ---------------------------------------------------------------------------
// Vector and matrix algebra
// ---------------------------------------------------------------------------

/// Dot product.
pub fn vec_dot(a: &[Decimal], b: &[Decimal]) -> Decimal {
    a.iter().zip(b.iter()).map(|(x, y)| *x * *y).sum()
}

/// Matrix-vector multiplication.
pub fn mat_vec_multiply(mat: &[Vec<Decimal>], v: &[Decimal]) -> Vec<Decimal> {
    mat.iter().map(|row| vec_dot(row, v)).collect()
}

/// Matrix-matrix multiplication.
pub fn mat_multiply(a: &[Vec<Decimal>], b: &[Vec<Decimal>]) -> Vec<Vec<Decimal>> {
    let m = a.len();
    let p = if m > 0 { a[0].len() } else { 0 };
    let n_cols = if !b.is_empty() { b[0].len() } else { 0 };
    let mut c = vec![vec![Decimal::ZERO; n_cols]; m];
    for i in 0..m {
        for j in 0..n_cols {
            let mut sum = Decimal::ZERO;
            for k in 0..p {
                sum += a[i][k] * b[k][j];
            }
            c[i][j] = sum;
        }
    }
    c
}

/// Add `epsilon` to every diagonal entry of a covariance matrix.
///
/// Diagonal loading guarantees strict positive-definiteness ahead of
/// inversion; the optimization pipeline always applies it.
pub fn regularize(cov: &[Vec<Decimal>], epsilon: Decimal) -> Vec<Vec<Decimal>> {
    cov.iter()
        .enumerate()
        .map(|(i, row)| {
            row.iter()
                .enumerate()
                .map(|(j, v)| if i == j { *v + epsilon } else { *v })
                .collect()
        })
        .collect()
}

/// Matrix inverse via Gauss-Jordan elimination with partial pivoting on the
/// augmented `[A | I]` system.
///
/// For each pivot column the row with the largest absolute pivot among the
/// remaining rows is selected; a best pivot below [`PIVOT_THRESHOLD`] fails
/// with [`EngineError::SingularMatrix`]. O(n^3), which is fine for the tens
/// to low hundreds of assets this engine targets.
#[allow(clippy::needless_range_loop)]
pub fn invert(mat: &[Vec<Decimal>], ctx: &ExecutionContext) -> EngineResult<Vec<Vec<Decimal>>> {
    let n = mat.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    for (i, row) in mat.iter().enumerate() {
        if row.len() != n {
            return Err(EngineError::InvalidInput {
                field: "matrix".into(),
                reason: format!("Row {} has {} columns, expected {}", i, row.len(), n),
            });
        }
    }

    let mut aug: Vec<Vec<Decimal>> = Vec::with_capacity(n);
    for i in 0..n {
        let mut row = Vec::with_capacity(2 * n);
        row.extend_from_slice(&mat[i]);
        for j in 0..n {
            row.push(if i == j { Decimal::ONE } else { Decimal::ZERO });
        }
        aug.push(row);
    }

    let stride = progress_stride(n);
    for col in 0..n {
        ctx.checkpoint()?;
        if col % stride == 0 {
            ctx.report(
                percent_of(col, n),
                &format!("Inverting matrix: column {}/{}", col + 1, n),
            );
        }

        // Partial pivoting
        let mut max_row = col;
        let mut max_val = aug[col][col].abs();
        for row in (col + 1)..n {
            let val = aug[row][col].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }

        if max_val < PIVOT_THRESHOLD {
            return Err(EngineError::SingularMatrix {
                column: col,
                pivot: max_val,
            });
        }

        if max_row != col {
            aug.swap(col, max_row);
        }

        // Scale pivot row
        let pivot = aug[col][col];
        for cell in aug[col].iter_mut() {
            *cell /= pivot;
        }

        // Eliminate other rows
        let pivot_row = aug[col].clone();
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = aug[row][col];
            if factor.is_zero() {
                continue;
            }
            for (cell, &pv) in aug[row].iter_mut().zip(pivot_row.iter()) {
                *cell -= factor * pv;
            }
        }
    }

    Ok(aug.iter().map(|row| row[n..].to_vec()).collect())
}

/// Square root via Newton's method (20 iterations).
pub(crate) fn sqrt_decimal(val: Decimal) -> Decimal {
    if val <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    if val == Decimal::ONE {
        return Decimal::ONE;
    }
    let two = dec!(2);
    let mut guess = val / two;
    if guess.is_zero() {
        guess = dec!(0.0000001);
    }
    for _ in 0..20 {
        if guess.is_zero() {
            return Decimal::ZERO;
        }
        guess = (guess + val / guess) / two;
    }
    guess
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: Decimal = dec!(0.000001);

    fn assert_identity(product: &[Vec<Decimal>]) {
        let n = product.len();
        for i in 0..n {
            for j in 0..n {
                let expected = if i == j { Decimal::ONE } else { Decimal::ZERO };
                assert!(
                    (product[i][j] - expected).abs() < TOLERANCE,
                    "Product[{}][{}] = {}, expected {}",
                    i,
                    j,
                    product[i][j],
                    expected
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // 1. Inverse times original is the identity
    // ------------------------------------------------------------------
    #[test]
    fn test_inverse_identity() {
        let a = vec![vec![dec!(2), dec!(1)], vec![dec!(5), dec!(3)]];
        let inv = invert(&a, &ExecutionContext::foreground()).unwrap();
        assert_identity(&mat_multiply(&a, &inv));
    }

    // ------------------------------------------------------------------
    // 2. Well-conditioned SPD covariance inverts cleanly
    // ------------------------------------------------------------------
    #[test]
    fn test_inverse_spd_covariance() {
        let a = vec![
            vec![dec!(0.0225), dec!(0.006), dec!(0.003)],
            vec![dec!(0.006), dec!(0.04), dec!(0.01)],
            vec![dec!(0.003), dec!(0.01), dec!(0.0625)],
        ];
        let inv = invert(&a, &ExecutionContext::foreground()).unwrap();
        assert_identity(&mat_multiply(&a, &inv));
    }

    // ------------------------------------------------------------------
    // 3. Zero leading pivot is rescued by row swapping
    // ------------------------------------------------------------------
    #[test]
    fn test_partial_pivoting_row_swap() {
        let a = vec![vec![dec!(0), dec!(1)], vec![dec!(1), dec!(0)]];
        let inv = invert(&a, &ExecutionContext::foreground()).unwrap();
        assert_identity(&mat_multiply(&a, &inv));
    }

    // ------------------------------------------------------------------
    // 4. Singular matrix is rejected
    // ------------------------------------------------------------------
    #[test]
    fn test_singular_matrix_rejected() {
        let a = vec![vec![dec!(0.01), dec!(0.01)], vec![dec!(0.01), dec!(0.01)]];
        let err = invert(&a, &ExecutionContext::foreground());
        assert!(matches!(
            err,
            Err(EngineError::SingularMatrix { column: 1, .. })
        ));
    }

    // ------------------------------------------------------------------
    // 5. Regularization unlocks a singular covariance
    // ------------------------------------------------------------------
    #[test]
    fn test_regularization_makes_invertible() {
        let a = vec![vec![dec!(0.01), dec!(0.01)], vec![dec!(0.01), dec!(0.01)]];
        let reg = regularize(&a, DEFAULT_REGULARIZATION);
        assert_eq!(reg[0][0], dec!(0.010001));
        assert_eq!(reg[0][1], dec!(0.01));
        let inv = invert(&reg, &ExecutionContext::foreground()).unwrap();
        assert_identity(&mat_multiply(&reg, &inv));
    }

    // ------------------------------------------------------------------
    // 6. Non-square input is invalid
    // ------------------------------------------------------------------
    #[test]
    fn test_ragged_matrix_invalid() {
        let a = vec![vec![dec!(1), dec!(2)], vec![dec!(3)]];
        assert!(matches!(
            invert(&a, &ExecutionContext::foreground()),
            Err(EngineError::InvalidInput { .. })
        ));
    }

    // ------------------------------------------------------------------
    // 7. Empty matrix inverts to empty
    // ------------------------------------------------------------------
    #[test]
    fn test_empty_matrix() {
        let a: Vec<Vec<Decimal>> = Vec::new();
        assert!(invert(&a, &ExecutionContext::foreground())
            .unwrap()
            .is_empty());
    }

    // ------------------------------------------------------------------
    // 8. Dot product and matrix-vector helpers
    // ------------------------------------------------------------------
    #[test]
    fn test_vec_dot() {
        let a = vec![dec!(1), dec!(2), dec!(3)];
        let b = vec![dec!(4), dec!(5), dec!(6)];
        assert_eq!(vec_dot(&a, &b), dec!(32));
    }

    #[test]
    fn test_mat_vec_multiply() {
        let m = vec![vec![dec!(1), dec!(2)], vec![dec!(3), dec!(4)]];
        let v = vec![dec!(1), dec!(1)];
        assert_eq!(mat_vec_multiply(&m, &v), vec![dec!(3), dec!(7)]);
    }

    // ------------------------------------------------------------------
    // 9. Sqrt helper
    // ------------------------------------------------------------------
    #[test]
    fn test_sqrt_decimal() {
        assert!((sqrt_decimal(dec!(4)) - dec!(2)).abs() < dec!(0.0000001));
        assert!((sqrt_decimal(dec!(0.00225)) - dec!(0.047434)).abs() < dec!(0.00001));
        assert_eq!(sqrt_decimal(Decimal::ZERO), Decimal::ZERO);
        assert_eq!(sqrt_decimal(dec!(-1)), Decimal::ZERO);
        assert_eq!(sqrt_decimal(Decimal::ONE), Decimal::ONE);
    }

    // ------------------------------------------------------------------
    // 10. Cancellation is honoured at column boundaries
    // ------------------------------------------------------------------
    #[test]
    fn test_invert_honours_cancellation() {
        use tokio_util::sync::CancellationToken;

        let token = CancellationToken::new();
        token.cancel();
        let ctx = ExecutionContext::with_cancellation(token);
        let a = vec![vec![dec!(2), dec!(1)], vec![dec!(5), dec!(3)]];
        assert!(matches!(invert(&a, &ctx), Err(EngineError::TaskCancelled)));
    }
}
