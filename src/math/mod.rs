//! Mathematical utilities: kernel evaluation and robust factorization.

pub mod chol;
pub mod kernel;

pub use chol::*;
pub use kernel::*;
