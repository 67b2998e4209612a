/// Errors surfaced by the surrogate.
///
/// The crate emits structured error values only; it never logs and never
/// depends on global logger state. `NonConvergence` is recoverable: the
/// affected fidelity's model stays stale and a later fit attempt is allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurrogateError {
    /// Construction-time configuration problem.
    InvalidConfig(String),
    /// Fidelity index outside `[0, num_fidelities)`.
    UnknownFidelity {
        fidelity: usize,
        num_fidelities: usize,
    },
    /// Supplied input length is incompatible with the configured dimension.
    DimensionMismatch { expected: usize, got: usize },
    /// Prediction requested on a fidelity with fewer than the minimum number
    /// of observations (a caller precondition violation).
    NotEnoughSamples { fidelity: usize, have: usize },
    /// The hyperparameter optimizer found no finite optimum, or the kernel
    /// matrix failed to factorize at every jitter level.
    NonConvergence,
    /// The rendering hook was asked for a fidelity whose model is not fitted
    /// against the full observation history.
    ModelNotFitted { fidelity: usize },
    /// The rendering backend reported a drawing failure.
    Render(String),
}

impl std::fmt::Display for SurrogateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurrogateError::InvalidConfig(msg) => {
                write!(f, "invalid surrogate configuration: {msg}")
            }
            SurrogateError::UnknownFidelity {
                fidelity,
                num_fidelities,
            } => write!(
                f,
                "unknown fidelity {fidelity} (surrogate has {num_fidelities} fidelities)"
            ),
            SurrogateError::DimensionMismatch { expected, got } => write!(
                f,
                "input of length {got} does not match input dimension {expected}"
            ),
            SurrogateError::NotEnoughSamples { fidelity, have } => write!(
                f,
                "fidelity {fidelity} has {have} observation(s); at least 2 are required before prediction"
            ),
            SurrogateError::NonConvergence => {
                write!(f, "hyperparameter optimization did not converge")
            }
            SurrogateError::ModelNotFitted { fidelity } => write!(
                f,
                "fidelity {fidelity} has no up-to-date fitted model (call fit first)"
            ),
            SurrogateError::Render(msg) => write!(f, "chart rendering failed: {msg}"),
        }
    }
}

impl std::error::Error for SurrogateError {}
