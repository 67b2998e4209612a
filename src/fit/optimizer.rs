//! Maximum-likelihood hyperparameter search with random restarts.
//!
//! Each restart runs gradient ascent on the log marginal likelihood in
//! log-parameter space, with backtracking step control and clamping to the
//! configured bounds. The first run starts from the unit hyperparameters; the
//! remaining `restarts_per_hyperparam * (d + 1)` runs start from log-uniform
//! samples inside the bounds, which is what makes the search robust to the
//! likelihood's local optima at small sample sizes.
//!
//! Selection is deterministic for a fixed seed: restarts run in order and a
//! candidate replaces the incumbent only on a strict improvement.

use nalgebra::{DMatrix, DVector};
use rand::prelude::*;
use rand::rngs::StdRng;

use crate::domain::{Hyperparameters, SurrogateConfig};
use crate::error::SurrogateError;
use crate::fit::likelihood::lml_with_grad;

/// Minimum gradient norm below which a run is considered converged.
const GRAD_TOL: f64 = 1e-8;

/// Smallest backtracking step before a run gives up on further progress.
const MIN_STEP: f64 = 1e-7;

/// Learn kernel hyperparameters for one fidelity's complete observation set.
///
/// `x` is the `[n, d]` input matrix, `y` the length-`n` output vector, and
/// `seed` the deterministic per-fit seed supplied by the surrogate. Returns
/// [`SurrogateError::NonConvergence`] if no restart produced a finite
/// likelihood.
pub fn fit_hyperparameters(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    config: &SurrogateConfig,
    seed: u64,
) -> Result<Hyperparameters, SurrogateError> {
    let d = x.ncols();
    let lo = config.bound_lo.ln();
    let hi = config.bound_hi.ln();
    let mut rng = StdRng::seed_from_u64(seed);

    let mut best: Option<(f64, Vec<f64>)> = None;
    for run in 0..=config.restarts() {
        let theta0: Vec<f64> = if run == 0 {
            // Unit starting point (all parameters at 1).
            vec![0.0; d + 1]
        } else {
            (0..d + 1).map(|_| rng.gen_range(lo..hi)).collect()
        };

        let Some((value, theta)) = ascend(x, y, theta0, config, lo, hi) else {
            continue;
        };
        let improved = best.as_ref().is_none_or(|(incumbent, _)| value > *incumbent);
        if improved {
            best = Some((value, theta));
        }
    }

    match best {
        Some((_, theta)) => Ok(Hyperparameters::from_log(&theta)),
        None => Err(SurrogateError::NonConvergence),
    }
}

/// One gradient-ascent run from `theta0`. Returns the best likelihood value
/// reached and the corresponding log-space parameters, or `None` when even
/// the starting point is not evaluable.
fn ascend(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    theta0: Vec<f64>,
    config: &SurrogateConfig,
    lo: f64,
    hi: f64,
) -> Option<(f64, Vec<f64>)> {
    let mut theta: Vec<f64> = theta0.iter().map(|v| v.clamp(lo, hi)).collect();
    let mut eval = lml_with_grad(x, y, &theta, config.jitter)?;
    let mut step = 0.1;

    for _ in 0..config.max_opt_iters {
        let grad_norm = eval.grad.iter().map(|g| g * g).sum::<f64>().sqrt();
        if grad_norm < GRAD_TOL {
            break;
        }

        // Backtracking: halve the step until the likelihood improves, then
        // let it grow again for the next iteration.
        let mut accepted = false;
        while step >= MIN_STEP {
            let candidate: Vec<f64> = theta
                .iter()
                .zip(eval.grad.iter())
                .map(|(t, g)| (t + step * g).clamp(lo, hi))
                .collect();
            if let Some(cand_eval) = lml_with_grad(x, y, &candidate, config.jitter) {
                if cand_eval.value > eval.value {
                    theta = candidate;
                    eval = cand_eval;
                    step = (step * 1.5).min(1.0);
                    accepted = true;
                    break;
                }
            }
            step *= 0.5;
        }
        if !accepted {
            break;
        }
    }

    Some((eval.value, theta))
}
