//! Robust Cholesky factorization.
//!
//! Kernel matrices become numerically singular whenever two observations lie
//! close together or a length scale grows large, so a plain factorization can
//! fail on perfectly reasonable data.
//!
//! Implementation choices:
//! - We add a small nugget (`jitter`) to the diagonal before factorizing.
//! - If factorization still fails, we escalate the jitter through a fixed
//!   ladder (`base`, `base·10²`, `base·10⁴`; with the default base that is
//!   `1e-10`, `1e-8`, `1e-6`) before giving up.

use nalgebra::{DMatrix, DVector, Dyn, linalg::Cholesky};

/// A successful factorization together with the jitter that achieved it.
/// The jitter is part of the effective kernel matrix, so the posterior keeps
/// it around for log-determinant and variance computations.
pub struct Factorized {
    pub chol: Cholesky<f64, Dyn>,
    pub jitter: f64,
}

impl Factorized {
    /// `log |K|` from the factor diagonal.
    pub fn log_det(&self) -> f64 {
        2.0 * self.chol.l_dirty().diagonal().iter().map(|v| v.ln()).sum::<f64>()
    }

    pub fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        self.chol.solve(b)
    }
}

/// Factorize `k + jitter·I`, escalating the jitter on failure.
///
/// Returns `None` if the matrix cannot be factorized even at the largest
/// jitter level; callers surface that as a non-convergence error.
pub fn cholesky_with_jitter(k: &DMatrix<f64>, base_jitter: f64) -> Option<Factorized> {
    for &scale in &[1.0, 1e2, 1e4] {
        let jitter = base_jitter * scale;
        let mut kj = k.clone();
        for i in 0..kj.nrows() {
            kj[(i, i)] += jitter;
        }
        if let Some(chol) = Cholesky::new(kj) {
            return Some(Factorized { chol, jitter });
        }
    }
    None
}
