//! Anisotropic squared-exponential kernel.
//!
//! The surrogate uses a single fixed kernel family with an independent length
//! scale per input dimension and one output scale:
//!
//! ```text
//! k(a, b) = σ² · exp(-1/2 · Σ_j ((a_j - b_j) / l_j)²)
//! ```
//!
//! Anisotropy matters for multi-fidelity benchmarks: objective sensitivity
//! usually differs per coordinate, and a shared length scale would force the
//! model to over-smooth the most informative dimension.

use nalgebra::DMatrix;

use crate::domain::Hyperparameters;

/// Correlation matrix between two row sets `a` (`n × d`) and `b` (`m × d`):
/// `R[i, j] = exp(-1/2 · Σ_k ((a_ik - b_jk) / l_k)²)`.
///
/// # Panics
/// Panics if `a`/`b` column counts and `length_scales` length disagree.
/// Callers assemble these from the same configured dimension.
pub fn correlation(a: &DMatrix<f64>, b: &DMatrix<f64>, length_scales: &[f64]) -> DMatrix<f64> {
    assert_eq!(a.ncols(), length_scales.len());
    assert_eq!(b.ncols(), length_scales.len());

    let n = a.nrows();
    let m = b.nrows();
    let mut r = DMatrix::<f64>::zeros(n, m);
    for i in 0..n {
        for j in 0..m {
            let mut dist = 0.0;
            for (k, l) in length_scales.iter().enumerate() {
                let diff = (a[(i, k)] - b[(j, k)]) / l;
                dist += diff * diff;
            }
            r[(i, j)] = (-0.5 * dist).exp();
        }
    }
    r
}

/// Training kernel matrix `σ² R` for the rows of `x` (no nugget; the
/// factorization step owns the jitter, see [`crate::math::cholesky_with_jitter`]).
pub fn kernel_matrix(x: &DMatrix<f64>, hyper: &Hyperparameters) -> DMatrix<f64> {
    let s2 = hyper.output_scale * hyper.output_scale;
    correlation(x, x, &hyper.length_scales).scale(s2)
}

/// Cross kernel between training rows and query rows (`n × m`).
pub fn cross_kernel(
    x_train: &DMatrix<f64>,
    x_query: &DMatrix<f64>,
    hyper: &Hyperparameters,
) -> DMatrix<f64> {
    let s2 = hyper.output_scale * hyper.output_scale;
    correlation(x_train, x_query, &hyper.length_scales).scale(s2)
}

/// Pairwise squared distances along dimension `j`, scaled by `1 / l_j²`.
///
/// Used by the likelihood gradient: `∂K/∂log l_j = K ∘ D_j` with
/// `D_j[a, b] = (x_aj - x_bj)² / l_j²`.
pub fn scaled_dim_sq_dist(x: &DMatrix<f64>, j: usize, l_j: f64) -> DMatrix<f64> {
    let n = x.nrows();
    let mut d = DMatrix::<f64>::zeros(n, n);
    let inv_l2 = 1.0 / (l_j * l_j);
    for a in 0..n {
        for b in 0..n {
            let diff = x[(a, j)] - x[(b, j)];
            d[(a, b)] = diff * diff * inv_l2;
        }
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_hyper(dim: usize) -> Hyperparameters {
        Hyperparameters::unit(dim)
    }

    #[test]
    fn kernel_diagonal_is_signal_variance() {
        let x = DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 0.5, 0.5, 1.0, 0.2]);
        let hyper = Hyperparameters {
            length_scales: vec![1.0, 2.0],
            output_scale: 3.0,
        };
        let k = kernel_matrix(&x, &hyper);
        for i in 0..3 {
            assert!((k[(i, i)] - 9.0).abs() < 1e-12);
        }
    }

    #[test]
    fn kernel_is_symmetric_and_decays_with_distance() {
        let x = DMatrix::from_row_slice(3, 1, &[0.0, 0.3, 2.0]);
        let k = kernel_matrix(&x, &unit_hyper(1));
        assert!((k[(0, 1)] - k[(1, 0)]).abs() < 1e-15);
        assert!(k[(0, 1)] > k[(0, 2)]);
        assert!(k[(0, 2)] > 0.0);
    }

    #[test]
    fn length_scales_act_per_dimension() {
        // Same coordinate offset, but one dimension has a much longer length
        // scale and therefore a much higher correlation.
        let a = DMatrix::from_row_slice(1, 2, &[0.0, 0.0]);
        let b = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 1.0]);
        let r = correlation(&a, &b, &[10.0, 0.1]);
        assert!(r[(0, 0)] > r[(0, 1)]);
    }

    #[test]
    fn scaled_distances_match_kernel_exponent() {
        let x = DMatrix::from_row_slice(2, 1, &[0.0, 2.0]);
        let d = scaled_dim_sq_dist(&x, 0, 2.0);
        assert!((d[(0, 1)] - 1.0).abs() < 1e-12);
        assert!(d[(0, 0)].abs() < 1e-15);
    }
}
