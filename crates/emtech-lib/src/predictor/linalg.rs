//! Dense least-squares helpers for the regression-based predictors

/// Pivot magnitude below which a system is treated as singular
const SINGULAR_PIVOT: f64 = 1e-12;

/// Solve `a * x = b` in place by Gaussian elimination with partial pivoting
///
/// `a` is row-major `n × n`. Returns `None` for singular systems.
pub fn solve(mut a: Vec<f64>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    if a.len() != n * n {
        return None;
    }

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&i, &j| {
            a[i * n + col]
                .abs()
                .partial_cmp(&a[j * n + col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        let pivot = a[pivot_row * n + col];
        if !pivot.is_finite() || pivot.abs() < SINGULAR_PIVOT {
            return None;
        }
        if pivot_row != col {
            for k in 0..n {
                a.swap(col * n + k, pivot_row * n + k);
            }
            b.swap(col, pivot_row);
        }
        for row in col + 1..n {
            let factor = a[row * n + col] / pivot;
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row * n + k] -= factor * a[col * n + k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row * n + k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row * n + row];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}

/// Ordinary least squares via the normal equations
///
/// `rows` are design-matrix rows of equal width; returns the coefficient
/// vector, or `None` when the design is rank deficient.
pub fn least_squares(rows: &[Vec<f64>], targets: &[f64]) -> Option<Vec<f64>> {
    let width = rows.first()?.len();
    if width == 0 || rows.len() != targets.len() || rows.len() < width {
        return None;
    }
    let mut xtx = vec![0.0; width * width];
    let mut xty = vec![0.0; width];
    for (row, &y) in rows.iter().zip(targets) {
        for i in 0..width {
            xty[i] += row[i] * y;
            for j in 0..width {
                xtx[i * width + j] += row[i] * row[j];
            }
        }
    }
    solve(xtx, xty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_requires_pivoting() {
        // First pivot is zero without row exchange
        let a = vec![0.0, 1.0, 1.0, 1.0];
        let b = vec![2.0, 3.0];
        let x = solve(a, b).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_solve_singular() {
        assert!(solve(vec![1.0, 2.0, 2.0, 4.0], vec![1.0, 2.0]).is_none());
    }

    #[test]
    fn test_least_squares_line() {
        let rows: Vec<Vec<f64>> = (0..5).map(|i| vec![1.0, i as f64]).collect();
        let targets: Vec<f64> = (0..5).map(|i| 3.0 + 2.0 * i as f64).collect();
        let coeffs = least_squares(&rows, &targets).unwrap();
        assert!((coeffs[0] - 3.0).abs() < 1e-9);
        assert!((coeffs[1] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_least_squares_underdetermined() {
        let rows = vec![vec![1.0, 0.0, 0.0]];
        assert!(least_squares(&rows, &[1.0]).is_none());
    }
}
