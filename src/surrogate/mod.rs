//! The multi-fidelity surrogate.
//!
//! One [`MfSurrogate`] owns, per fidelity level, an append-only observation
//! store and a lazily refitted GP model. Fidelities are fully independent
//! regression problems (no co-kriging): cheap, noisy levels and the expensive
//! ground-truth level each get their own hyperparameters and posterior.
//!
//! Mutation discipline: observations and fit states change only in
//! [`MfSurrogate::add_sample`]; fitted models change only in the lazy-fit
//! path reached from [`MfSurrogate::fit`] and [`MfSurrogate::predict`]. The
//! `&mut self` receivers on those methods give the per-fidelity
//! fit-then-predict sequence the exclusivity it needs; there is no internal
//! locking and no async suspension anywhere in this crate.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use nalgebra::{DMatrix, DVector};

use crate::domain::{FitState, Prediction, SurrogateConfig};
use crate::error::SurrogateError;
use crate::models::GpModel;

/// Minimum observations a fidelity needs before it can be fitted.
pub const MIN_SAMPLES_FOR_FIT: usize = 2;

/// Observation store plus cached model for one fidelity.
#[derive(Debug, Clone)]
struct FidelityLevel {
    /// Flattened `[n * dim]` row-major inputs, lock-step with `ys`: the rows
    /// at index `i` in both buffers describe the same observation.
    xs: Vec<f64>,
    ys: Vec<f64>,
    model: Option<GpModel>,
    state: FitState,
}

impl FidelityLevel {
    fn new() -> Self {
        Self {
            xs: Vec::new(),
            ys: Vec::new(),
            model: None,
            state: FitState::Unfit,
        }
    }

    fn len(&self) -> usize {
        self.ys.len()
    }
}

/// Per-fidelity Gaussian-process regression store.
pub struct MfSurrogate {
    config: SurrogateConfig,
    levels: Vec<FidelityLevel>,
}

impl MfSurrogate {
    /// Construct with default fitting options. Fidelity count and dimension
    /// are immutable afterwards.
    pub fn new(num_fidelities: usize, dim: usize) -> Result<Self, SurrogateError> {
        Self::with_config(SurrogateConfig::new(num_fidelities, dim))
    }

    pub fn with_config(config: SurrogateConfig) -> Result<Self, SurrogateError> {
        config.validate()?;
        let levels = (0..config.num_fidelities)
            .map(|_| FidelityLevel::new())
            .collect();
        Ok(Self { config, levels })
    }

    pub fn config(&self) -> &SurrogateConfig {
        &self.config
    }

    pub fn num_fidelities(&self) -> usize {
        self.config.num_fidelities
    }

    pub fn dim(&self) -> usize {
        self.config.dim
    }

    fn level(&self, fidelity: usize) -> Result<&FidelityLevel, SurrogateError> {
        self.levels
            .get(fidelity)
            .ok_or(SurrogateError::UnknownFidelity {
                fidelity,
                num_fidelities: self.config.num_fidelities,
            })
    }

    fn level_mut(&mut self, fidelity: usize) -> Result<&mut FidelityLevel, SurrogateError> {
        let num_fidelities = self.config.num_fidelities;
        self.levels
            .get_mut(fidelity)
            .ok_or(SurrogateError::UnknownFidelity {
                fidelity,
                num_fidelities,
            })
    }

    /// Append one observation to a fidelity and mark its model stale.
    ///
    /// The append is a single atomic step: on any error nothing has been
    /// written, so the history is never left half-updated.
    pub fn add_sample(&mut self, x: &[f64], y: f64, fidelity: usize) -> Result<(), SurrogateError> {
        if x.len() != self.config.dim {
            return Err(SurrogateError::DimensionMismatch {
                expected: self.config.dim,
                got: x.len(),
            });
        }
        let level = self.level_mut(fidelity)?;
        level.xs.extend_from_slice(x);
        level.ys.push(y);
        level.state = FitState::Stale;
        Ok(())
    }

    /// Whether the fidelity has enough observations to be fitted. Pure query;
    /// out-of-range fidelities are simply not valid.
    pub fn is_valid(&self, fidelity: usize) -> bool {
        self.levels
            .get(fidelity)
            .is_some_and(|l| l.len() >= MIN_SAMPLES_FOR_FIT)
    }

    pub fn sample_count(&self, fidelity: usize) -> Result<usize, SurrogateError> {
        Ok(self.level(fidelity)?.len())
    }

    /// The raw observation history: flattened `[n * dim]` inputs and the `n`
    /// outputs, in insertion order.
    pub fn samples(&self, fidelity: usize) -> Result<(&[f64], &[f64]), SurrogateError> {
        let level = self.level(fidelity)?;
        Ok((&level.xs, &level.ys))
    }

    pub fn fit_state(&self, fidelity: usize) -> Result<FitState, SurrogateError> {
        Ok(self.level(fidelity)?.state)
    }

    /// The fitted model, if it is up to date with the observation history.
    /// Returns `Ok(None)` while the fidelity is unfit or stale.
    pub fn fitted(&self, fidelity: usize) -> Result<Option<&GpModel>, SurrogateError> {
        let level = self.level(fidelity)?;
        if level.state == FitState::Fitted {
            Ok(level.model.as_ref())
        } else {
            Ok(None)
        }
    }

    /// Refit the fidelity's model on its entire observation history if it is
    /// both valid and stale.
    ///
    /// No-op when the fidelity has fewer than [`MIN_SAMPLES_FOR_FIT`]
    /// observations (the state stays stale so a later valid call still fits)
    /// and when the model is already fresh (repeated calls do the work once).
    /// On optimizer non-convergence the error propagates and the state stays
    /// stale, so the caller may retry after adding evidence.
    pub fn fit(&mut self, fidelity: usize) -> Result<(), SurrogateError> {
        let level = self.level(fidelity)?;
        if level.len() < MIN_SAMPLES_FOR_FIT || level.state == FitState::Fitted {
            return Ok(());
        }

        let n = level.len();
        let x = DMatrix::from_row_slice(n, self.config.dim, &level.xs);
        let y = DVector::from_column_slice(&level.ys);
        let seed = fit_seed(self.config.seed, fidelity, n);
        let model = GpModel::fit(x, y, &self.config, seed)?;

        let level = self.level_mut(fidelity)?;
        level.model = Some(model);
        level.state = FitState::Fitted;
        Ok(())
    }

    /// Posterior means and standard deviations for a batch of query points.
    ///
    /// `xs` is the flattened `[m * dim]` query batch in row-major order; the
    /// result arrays have length `m`, in input order. The fidelity must
    /// already be valid (≥ 2 observations); callers check
    /// [`MfSurrogate::is_valid`] first and get
    /// [`SurrogateError::NotEnoughSamples`] otherwise. A stale model is
    /// refitted before answering, so predictions never reflect a partial
    /// history.
    pub fn predict(&mut self, xs: &[f64], fidelity: usize) -> Result<Prediction, SurrogateError> {
        let dim = self.config.dim;
        let have = self.level(fidelity)?.len();
        if have < MIN_SAMPLES_FOR_FIT {
            return Err(SurrogateError::NotEnoughSamples { fidelity, have });
        }
        if xs.len() % dim != 0 {
            return Err(SurrogateError::DimensionMismatch {
                expected: dim,
                got: xs.len(),
            });
        }

        self.fit(fidelity)?;

        let m = xs.len() / dim;
        let x_query = DMatrix::from_row_slice(m, dim, xs);
        let level = self.level(fidelity)?;
        let model = level.model.as_ref().ok_or(SurrogateError::NonConvergence)?;
        model.predict(&x_query)
    }
}

/// Deterministic per-fit seed: mixes the configured base seed with the
/// fidelity and sample count, so refits after new evidence explore fresh
/// restart points while full runs stay reproducible.
fn fit_seed(base: u64, fidelity: usize, n: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    base.hash(&mut hasher);
    fidelity.hash(&mut hasher);
    n.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use rand::rngs::StdRng;
    use rand_distr::Normal;

    #[test]
    fn construction_rejects_empty_shapes() {
        assert!(MfSurrogate::new(0, 1).is_err());
        assert!(MfSurrogate::new(1, 0).is_err());
    }

    #[test]
    fn validity_needs_two_samples_per_fidelity() {
        let mut s = MfSurrogate::new(2, 1).unwrap();
        assert!(!s.is_valid(0));
        assert!(!s.is_valid(1));

        s.add_sample(&[0.0], 0.0, 0).unwrap();
        assert!(!s.is_valid(0));
        s.add_sample(&[1.0], 1.0, 0).unwrap();
        assert!(s.is_valid(0));

        // Independent of the other fidelity's count.
        assert!(!s.is_valid(1));
        // Out-of-range fidelities are never valid.
        assert!(!s.is_valid(7));
    }

    #[test]
    fn unknown_fidelity_and_dimension_mismatch_fail_fast() {
        let mut s = MfSurrogate::new(1, 2).unwrap();
        assert_eq!(
            s.add_sample(&[0.0, 0.0], 0.0, 3),
            Err(SurrogateError::UnknownFidelity {
                fidelity: 3,
                num_fidelities: 1
            })
        );
        assert_eq!(
            s.add_sample(&[0.0], 0.0, 0),
            Err(SurrogateError::DimensionMismatch { expected: 2, got: 1 })
        );
        // A query batch must be a whole number of points.
        s.add_sample(&[0.0, 0.0], 0.0, 0).unwrap();
        s.add_sample(&[1.0, 1.0], 1.0, 0).unwrap();
        assert_eq!(
            s.predict(&[0.5, 0.5, 0.5], 0),
            Err(SurrogateError::DimensionMismatch { expected: 2, got: 3 })
        );
    }

    #[test]
    fn predicting_an_undersampled_fidelity_is_a_precondition_error() {
        let mut s = MfSurrogate::new(1, 1).unwrap();
        s.add_sample(&[0.0], 0.0, 0).unwrap();
        assert_eq!(
            s.predict(&[0.5], 0),
            Err(SurrogateError::NotEnoughSamples {
                fidelity: 0,
                have: 1
            })
        );
    }

    #[test]
    fn stale_flag_lifecycle() {
        let mut s = MfSurrogate::new(1, 1).unwrap();
        assert_eq!(s.fit_state(0).unwrap(), FitState::Unfit);

        s.add_sample(&[0.0], 0.0, 0).unwrap();
        assert_eq!(s.fit_state(0).unwrap(), FitState::Stale);

        // Fitting an under-sampled fidelity is a no-op that must not mark the
        // model clean.
        s.fit(0).unwrap();
        assert_eq!(s.fit_state(0).unwrap(), FitState::Stale);

        s.add_sample(&[1.0], 1.0, 0).unwrap();
        s.fit(0).unwrap();
        assert_eq!(s.fit_state(0).unwrap(), FitState::Fitted);

        // Stays fresh across predictions, goes stale on new evidence.
        s.predict(&[0.5], 0).unwrap();
        assert_eq!(s.fit_state(0).unwrap(), FitState::Fitted);
        s.add_sample(&[0.5], 0.5, 0).unwrap();
        assert_eq!(s.fit_state(0).unwrap(), FitState::Stale);
    }

    #[test]
    fn repeated_predictions_are_bit_identical() {
        let mut s = MfSurrogate::new(1, 1).unwrap();
        s.add_sample(&[0.0], 0.2, 0).unwrap();
        s.add_sample(&[0.6], 0.9, 0).unwrap();
        s.add_sample(&[1.0], 0.1, 0).unwrap();

        let first = s.predict(&[0.25, 0.75], 0).unwrap();
        let second = s.predict(&[0.25, 0.75], 0).unwrap();
        // The second call observes the clean flag, skips the refit, and
        // reproduces the exact same numbers.
        assert_eq!(first, second);
    }

    #[test]
    fn two_point_prediction_interpolates_with_uncertainty() {
        // Scenario: one fidelity, dim 1, samples (0,0) and (1,1).
        let mut s = MfSurrogate::new(1, 1).unwrap();
        assert!(!s.is_valid(0));
        s.add_sample(&[0.0], 0.0, 0).unwrap();
        s.add_sample(&[1.0], 1.0, 0).unwrap();
        assert!(s.is_valid(0));

        let pred = s.predict(&[0.5], 0).unwrap();
        assert_eq!(pred.len(), 1);
        assert!((0.0..=1.0).contains(&pred.means[0]));
        assert!(pred.stds[0] > 1e-3);
    }

    #[test]
    fn observing_the_midpoint_collapses_its_uncertainty() {
        let mut s = MfSurrogate::new(1, 1).unwrap();
        s.add_sample(&[0.0], 0.0, 0).unwrap();
        s.add_sample(&[1.0], 1.0, 0).unwrap();
        let before = s.predict(&[0.5], 0).unwrap();

        s.add_sample(&[0.5], 0.5, 0).unwrap();
        let after = s.predict(&[0.5], 0).unwrap();

        // 0.5 is now a training point: its posterior std collapses compared
        // to the two-point fit.
        assert!(after.stds[0] < 1e-2);
        assert!(after.stds[0] < 0.1 * before.stds[0]);
        assert!((after.means[0] - 0.5).abs() < 1e-2);
    }

    #[test]
    fn fidelities_are_isolated() {
        let mut s = MfSurrogate::new(2, 1).unwrap();
        s.add_sample(&[0.0], 0.0, 1).unwrap();
        s.add_sample(&[1.0], 2.0, 1).unwrap();
        let baseline = s.predict(&[0.3], 1).unwrap();
        assert_eq!(s.fit_state(1).unwrap(), FitState::Fitted);

        // Mutating fidelity 0 must leave fidelity 1's flag, count, and
        // predictions untouched.
        s.add_sample(&[0.7], -1.0, 0).unwrap();
        assert_eq!(s.fit_state(1).unwrap(), FitState::Fitted);
        assert_eq!(s.sample_count(1).unwrap(), 2);
        assert_eq!(s.sample_count(0).unwrap(), 1);
        let again = s.predict(&[0.3], 1).unwrap();
        assert_eq!(baseline, again);
    }

    #[test]
    fn batch_queries_keep_input_order() {
        let mut s = MfSurrogate::new(1, 1).unwrap();
        s.add_sample(&[0.0], 0.0, 0).unwrap();
        s.add_sample(&[0.5], 1.0, 0).unwrap();
        s.add_sample(&[1.0], 0.0, 0).unwrap();

        let batch = s.predict(&[0.1, 0.5, 0.9], 0).unwrap();
        assert_eq!(batch.means.len(), 3);
        assert_eq!(batch.stds.len(), 3);
        // The middle query sits on a training point; the outer two do not.
        assert!((batch.means[1] - 1.0).abs() < 1e-2);
        assert!(batch.stds[1] < batch.stds[0]);
        assert!(batch.stds[1] < batch.stds[2]);
    }

    #[test]
    fn multi_dimensional_inputs_fit_and_predict() {
        let mut s = MfSurrogate::new(1, 2).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let noise = Normal::new(0.0, 0.01).unwrap();
        for _ in 0..6 {
            let x = [rng.gen_range(0.0f64..1.0), rng.gen_range(0.0..1.0)];
            let y = (3.0 * x[0]).sin() + x[1] * x[1] + noise.sample(&mut rng);
            s.add_sample(&x, y, 0).unwrap();
        }

        let pred = s.predict(&[0.5, 0.5], 0).unwrap();
        assert_eq!(pred.len(), 1);
        assert!(pred.means[0].is_finite());
        assert!(pred.stds[0].is_finite());

        // One length scale per dimension was learned.
        let model = s.fitted(0).unwrap().unwrap();
        assert_eq!(model.hyperparameters().length_scales.len(), 2);
    }

    #[test]
    fn sample_history_preserves_insertion_order() {
        let mut s = MfSurrogate::new(1, 2).unwrap();
        s.add_sample(&[0.1, 0.2], 5.0, 0).unwrap();
        s.add_sample(&[0.3, 0.4], 6.0, 0).unwrap();
        let (xs, ys) = s.samples(0).unwrap();
        assert_eq!(xs, &[0.1, 0.2, 0.3, 0.4]);
        assert_eq!(ys, &[5.0, 6.0]);
    }
}
