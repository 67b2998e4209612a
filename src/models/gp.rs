//! Fitted Gaussian-process posterior for a single fidelity.
//!
//! The fit consumes the complete observation history in one batch: with the
//! small sample sizes typical of expensive black-box optimization, an
//! incremental posterior update is no cheaper than a batch refit, and a batch
//! refit guarantees the learned hyperparameters always reflect the complete
//! evidence.

use nalgebra::{DMatrix, DVector};

use crate::domain::{Hyperparameters, Prediction, SurrogateConfig};
use crate::error::SurrogateError;
use crate::fit::fit_hyperparameters;
use crate::math::{cholesky_with_jitter, cross_kernel, kernel_matrix};

/// A zero-mean GP posterior with maximum-likelihood kernel hyperparameters.
///
/// Immutable once constructed; refitting produces a new model.
#[derive(Debug, Clone)]
pub struct GpModel {
    x_train: DMatrix<f64>,
    /// Lower Cholesky factor of `K = σ²R + jitter·I`.
    l: DMatrix<f64>,
    /// `K⁻¹ y`.
    alpha: DVector<f64>,
    hyper: Hyperparameters,
}

impl GpModel {
    /// Fit on an `[n, d]` input matrix and length-`n` output vector.
    ///
    /// Learns hyperparameters by restart-based likelihood maximization, then
    /// factorizes the training kernel once so predictions are cheap.
    pub fn fit(
        x: DMatrix<f64>,
        y: DVector<f64>,
        config: &SurrogateConfig,
        seed: u64,
    ) -> Result<Self, SurrogateError> {
        let hyper = fit_hyperparameters(&x, &y, config, seed)?;
        let k = kernel_matrix(&x, &hyper);
        let f = cholesky_with_jitter(&k, config.jitter).ok_or(SurrogateError::NonConvergence)?;
        let alpha = f.solve(&y);
        Ok(Self {
            l: f.chol.l(),
            alpha,
            x_train: x,
            hyper,
        })
    }

    pub fn hyperparameters(&self) -> &Hyperparameters {
        &self.hyper
    }

    /// Number of observations the model was fitted on.
    pub fn train_len(&self) -> usize {
        self.x_train.nrows()
    }

    /// Posterior mean and standard deviation for an `[m, d]` query matrix.
    ///
    /// Pure with respect to the model; the lazy-fit logic lives in the
    /// surrogate, not here.
    pub fn predict(&self, x_query: &DMatrix<f64>) -> Result<Prediction, SurrogateError> {
        let k_star = cross_kernel(&self.x_train, x_query, &self.hyper);
        let mean_vec = k_star.transpose() * &self.alpha;

        // Posterior variance: k(x,x) - ||L⁻¹ k*||² per query column.
        let v = self
            .l
            .solve_lower_triangular(&k_star)
            .ok_or(SurrogateError::NonConvergence)?;
        let prior_var = self.hyper.output_scale * self.hyper.output_scale;

        let m = x_query.nrows();
        let mut means = Vec::with_capacity(m);
        let mut stds = Vec::with_capacity(m);
        for i in 0..m {
            means.push(mean_vec[i]);
            let var = (prior_var - v.column(i).norm_squared()).max(0.0);
            stds.push(var.sqrt());
        }
        Ok(Prediction { means, stds })
    }
}
