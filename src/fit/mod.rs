//! Hyperparameter estimation.
//!
//! Responsibilities:
//!
//! - evaluate the GP log marginal likelihood and its gradient
//! - maximize it with gradient ascent from many random restarts
//! - select the best restart deterministically

pub mod likelihood;
pub mod optimizer;

pub use likelihood::*;
pub use optimizer::*;
