//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so the
//! external experiment driver can persist configurations, learned
//! hyperparameters, and prediction batches alongside its own results. The
//! surrogate itself is never serialized mid-run.

use serde::{Deserialize, Serialize};

use crate::error::SurrogateError;

/// 95% confidence half-width multiplier under a Gaussian posterior.
///
/// Downstream consumers (acquisition functions, confidence-band plotting)
/// depend on this exact constant: `half_width = 1.96 * std`.
pub const CONFIDENCE_Z: f64 = 1.96;

/// Default nugget added to the kernel diagonal before factorization.
pub const DEFAULT_JITTER: f64 = 1e-10;

/// Default lower/upper hyperparameter bounds (natural scale). The optimizer
/// clamps length scales and the output scale to this range, and random
/// restarts sample log-uniformly inside it.
///
/// Four orders of magnitude comfortably covers objectives on normalized
/// `[0, 1]` domains. Wider ranges let degenerate likelihood ridges (e.g. on
/// collinear observations) push the scales high enough that the kernel
/// matrix conditioning ruins the posterior variance.
pub const DEFAULT_BOUND_LO: f64 = 1e-2;
pub const DEFAULT_BOUND_HI: f64 = 1e2;

/// Per-fidelity fit state machine.
///
/// `Unfit` at construction, any state goes to `Stale` when an observation is
/// appended, and `Stale` goes to `Fitted` only after a successful fit over
/// the complete observation history. "Stale" in the model-cache sense means
/// any state other than `Fitted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitState {
    /// No observation has ever been added to this fidelity.
    Unfit,
    /// Observations exist that the fitted model (if any) does not reflect.
    Stale,
    /// The model reflects every observation accumulated so far.
    Fitted,
}

impl FitState {
    /// Whether a fit is required before the model may serve predictions.
    pub fn is_stale(self) -> bool {
        !matches!(self, FitState::Fitted)
    }
}

/// Kernel hyperparameters of the anisotropic squared-exponential kernel:
/// one length scale per input dimension plus one output scale, so `dim + 1`
/// free parameters in total.
///
/// `k(a, b) = output_scale^2 * exp(-1/2 * Σ_j ((a_j - b_j) / length_scales[j])^2)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub length_scales: Vec<f64>,
    pub output_scale: f64,
}

impl Hyperparameters {
    /// Unit starting point (all length scales and the output scale at 1).
    pub fn unit(dim: usize) -> Self {
        Self {
            length_scales: vec![1.0; dim],
            output_scale: 1.0,
        }
    }

    /// Build from the optimizer's log-space parameter vector
    /// `[log l_1, .., log l_d, log output_scale]`.
    ///
    /// # Panics
    /// Panics if `theta` is empty. Callers size the vector as `dim + 1`.
    pub fn from_log(theta: &[f64]) -> Self {
        let (last, scales) = theta.split_last().expect("theta must have dim + 1 entries");
        Self {
            length_scales: scales.iter().map(|v| v.exp()).collect(),
            output_scale: last.exp(),
        }
    }

    /// Log-space parameter vector, the inverse of [`Hyperparameters::from_log`].
    pub fn to_log(&self) -> Vec<f64> {
        let mut theta: Vec<f64> = self.length_scales.iter().map(|v| v.ln()).collect();
        theta.push(self.output_scale.ln());
        theta
    }

    pub fn dim(&self) -> usize {
        self.length_scales.len()
    }
}

/// Posterior means and standard deviations for one query batch, in input
/// order (`means[i]` and `stds[i]` describe the same query point).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

impl Prediction {
    pub fn len(&self) -> usize {
        self.means.len()
    }

    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }

    /// 95% confidence half-widths (`1.96 * std` per point).
    pub fn half_widths(&self) -> Vec<f64> {
        self.stds.iter().map(|s| CONFIDENCE_Z * s).collect()
    }
}

/// Full surrogate configuration.
///
/// [`crate::surrogate::MfSurrogate::new`] fills everything beyond the
/// fidelity count and dimension with defaults; `with_config` accepts this
/// struct directly for callers that need to pin the seed or tighten the
/// optimizer budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurrogateConfig {
    /// Number of independent regression problems.
    pub num_fidelities: usize,
    /// Input dimension `d` shared by every fidelity.
    pub dim: usize,
    /// Base seed for the hyperparameter optimizer's random restarts. The
    /// effective per-fit seed also mixes in the fidelity and sample count so
    /// results are reproducible for a fixed observation order.
    pub seed: u64,
    /// Random restarts per hyperparameter; the optimizer runs
    /// `restarts_per_hyperparam * (dim + 1)` restarts on top of the unit
    /// starting point.
    pub restarts_per_hyperparam: usize,
    /// Iteration cap for each gradient-ascent run.
    pub max_opt_iters: usize,
    /// Base nugget added to the kernel diagonal (escalated on factorization
    /// failure, see [`crate::math::cholesky_with_jitter`]).
    pub jitter: f64,
    /// Hyperparameter bounds (natural scale).
    pub bound_lo: f64,
    pub bound_hi: f64,
}

impl SurrogateConfig {
    pub fn new(num_fidelities: usize, dim: usize) -> Self {
        Self {
            num_fidelities,
            dim,
            seed: 0,
            restarts_per_hyperparam: 10,
            max_opt_iters: 60,
            jitter: DEFAULT_JITTER,
            bound_lo: DEFAULT_BOUND_LO,
            bound_hi: DEFAULT_BOUND_HI,
        }
    }

    /// Total random restarts for one fit (`10 * (d + 1)` with defaults).
    pub fn restarts(&self) -> usize {
        self.restarts_per_hyperparam * (self.dim + 1)
    }

    pub fn validate(&self) -> Result<(), SurrogateError> {
        if self.num_fidelities == 0 {
            return Err(SurrogateError::InvalidConfig(
                "at least one fidelity is required".into(),
            ));
        }
        if self.dim == 0 {
            return Err(SurrogateError::InvalidConfig(
                "input dimension must be at least 1".into(),
            ));
        }
        if !(self.jitter.is_finite() && self.jitter > 0.0) {
            return Err(SurrogateError::InvalidConfig(
                "jitter must be finite and positive".into(),
            ));
        }
        if !(self.bound_lo.is_finite()
            && self.bound_hi.is_finite()
            && self.bound_lo > 0.0
            && self.bound_hi > self.bound_lo)
        {
            return Err(SurrogateError::InvalidConfig(
                "hyperparameter bounds must be finite, positive, and ordered".into(),
            ));
        }
        if self.max_opt_iters == 0 {
            return Err(SurrogateError::InvalidConfig(
                "optimizer iteration cap must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
