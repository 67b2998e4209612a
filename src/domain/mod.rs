//! Shared domain types: configuration, hyperparameters, predictions, and the
//! per-fidelity fit state machine.

pub mod types;

pub use types::*;
