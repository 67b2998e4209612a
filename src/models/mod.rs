//! Fitted regression models.

pub mod gp;

pub use gp::*;
