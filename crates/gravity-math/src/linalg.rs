//! Dense linear algebra for the Gauss-Newton normal equations.
//!
//! Normal-matrix assembly, Jᵗr products, and Gaussian elimination with
//! partial pivoting. Matrix sizes here follow the inversion mesh (tens to
//! a few thousand parameters), so a dense direct solve is appropriate.

use gravity_types::error::{GravityError, GravityResult};
use ndarray::{Array1, Array2};

/// Relative pivot magnitude below which the matrix is declared singular.
const PIVOT_EPSILON: f64 = 1e-14;

/// Form `A = JᵗJ` for an m×n Jacobian.
///
/// The result is symmetric; only the upper triangle is computed and then
/// mirrored.
pub fn normal_matrix(jacobian: &Array2<f64>) -> Array2<f64> {
    let (m, n) = jacobian.dim();
    let mut a = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..m {
                sum += jacobian[[k, i]] * jacobian[[k, j]];
            }
            a[[i, j]] = sum;
            a[[j, i]] = sum;
        }
    }
    a
}

/// Form `b = Jᵗr` for an m×n Jacobian and an m-vector.
pub fn transpose_mul_vec(jacobian: &Array2<f64>, r: &Array1<f64>) -> Array1<f64> {
    let (m, n) = jacobian.dim();
    let mut b = Array1::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for k in 0..m {
            sum += jacobian[[k, i]] * r[k];
        }
        b[i] = sum;
    }
    b
}

/// Solve `A x = b` by Gaussian elimination with partial pivoting.
///
/// Inputs are cloned; the caller's matrix is left untouched. A pivot whose
/// magnitude falls below `PIVOT_EPSILON` relative to the largest initial
/// entry signals a (near-)singular system.
pub fn solve_dense(a: &Array2<f64>, b: &Array1<f64>) -> GravityResult<Array1<f64>> {
    let n = b.len();
    if a.nrows() != n || a.ncols() != n {
        return Err(GravityError::LinAlg(format!(
            "Shape mismatch: A is {}x{}, b has length {n}",
            a.nrows(),
            a.ncols()
        )));
    }
    if n == 0 {
        return Ok(Array1::zeros(0));
    }

    let mut a = a.clone();
    let mut b = b.clone();

    // Pivot test is relative to the matrix's own magnitude; the floor only
    // guards the all-zero matrix. Gravity normal matrices scale as G^2, so
    // an absolute cutoff would reject well-conditioned systems outright.
    let scale = a
        .iter()
        .fold(0.0_f64, |acc, v| acc.max(v.abs()))
        .max(f64::MIN_POSITIVE);

    for k in 0..n {
        let mut pivot_row = k;
        for i in k + 1..n {
            if a[[i, k]].abs() > a[[pivot_row, k]].abs() {
                pivot_row = i;
            }
        }
        if a[[pivot_row, k]].abs() < PIVOT_EPSILON * scale {
            return Err(GravityError::LinAlg(format!(
                "Singular normal matrix: zero pivot in column {k}"
            )));
        }
        if pivot_row != k {
            for j in k..n {
                let tmp = a[[k, j]];
                a[[k, j]] = a[[pivot_row, j]];
                a[[pivot_row, j]] = tmp;
            }
            b.swap(k, pivot_row);
        }

        for i in k + 1..n {
            let factor = a[[i, k]] / a[[k, k]];
            if factor == 0.0 {
                continue;
            }
            for j in k..n {
                a[[i, j]] -= factor * a[[k, j]];
            }
            b[i] -= factor * b[k];
        }
    }

    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in i + 1..n {
            sum -= a[[i, j]] * x[j];
        }
        x[i] = sum / a[[i, i]];
    }

    if x.iter().any(|v| !v.is_finite()) {
        return Err(GravityError::LinAlg(
            "Solve produced non-finite components".to_string(),
        ));
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_solve_dense_identity() {
        let a = Array2::eye(4);
        let b = array![1.0, -2.0, 3.5, 0.0];
        let x = solve_dense(&a, &b).unwrap();
        for i in 0..4 {
            assert!((x[i] - b[i]).abs() < 1e-14);
        }
    }

    #[test]
    fn test_solve_dense_requires_pivoting() {
        // Zero leading entry forces a row swap.
        let a = array![[0.0, 2.0], [3.0, 1.0]];
        let b = array![4.0, 5.0];
        let x = solve_dense(&a, &b).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12, "x0 = {}", x[0]);
        assert!((x[1] - 2.0).abs() < 1e-12, "x1 = {}", x[1]);
    }

    #[test]
    fn test_solve_dense_handles_gravity_scale_entries() {
        // Normal-matrix entries sit near G^2 ~ 4.5e-21; a well-conditioned
        // system at that magnitude must solve, not report singularity.
        let a = array![[1e-21, 0.0], [0.0, 1e-21]];
        let b = array![2e-21, -3e-21];
        let x = solve_dense(&a, &b).unwrap();
        assert!((x[0] - 2.0).abs() < 1e-9, "x0 = {}", x[0]);
        assert!((x[1] + 3.0).abs() < 1e-9, "x1 = {}", x[1]);
    }

    #[test]
    fn test_solve_dense_detects_tiny_scale_singular() {
        // Rank deficiency is still caught relative to the tiny scale.
        let a = array![[1e-21, 2e-21], [2e-21, 4e-21]];
        let b = array![1e-21, 2e-21];
        assert!(solve_dense(&a, &b).is_err());
    }

    #[test]
    fn test_solve_dense_detects_singular() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        let b = array![1.0, 2.0];
        let err = solve_dense(&a, &b).unwrap_err();
        match err {
            GravityError::LinAlg(msg) => assert!(msg.contains("Singular")),
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_normal_matrix_symmetric() {
        let j = array![[1.0, 2.0, 0.5], [-1.0, 0.0, 3.0], [2.0, 2.0, 2.0], [0.0, 1.0, -1.0]];
        let a = normal_matrix(&j);
        assert_eq!(a.dim(), (3, 3));
        for i in 0..3 {
            for k in 0..3 {
                assert!((a[[i, k]] - a[[k, i]]).abs() < 1e-14);
            }
        }
        // Diagonal entries are column norms squared.
        for i in 0..3 {
            let norm_sq: f64 = (0..4).map(|r| j[[r, i]] * j[[r, i]]).sum();
            assert!((a[[i, i]] - norm_sq).abs() < 1e-12);
        }
    }

    #[test]
    fn test_transpose_mul_vec_matches_naive() {
        let j = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let r = array![1.0, -1.0, 2.0];
        let b = transpose_mul_vec(&j, &r);
        assert!((b[0] - (1.0 - 3.0 + 10.0)).abs() < 1e-14);
        assert!((b[1] - (2.0 - 4.0 + 12.0)).abs() < 1e-14);
    }
}
