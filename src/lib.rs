//! `mf-surrogate` library crate.
//!
//! A multi-fidelity Gaussian-process surrogate for black-box optimization.
//! The optimizer driving the search (external to this crate) queries an
//! expensive objective at one of several fidelities and needs, per fidelity,
//! a predictive mean and uncertainty to decide where to sample next.
//!
//! This crate owns exactly that surrogate: per-fidelity observation stores,
//! lazy maximum-likelihood refits of an anisotropic squared-exponential GP,
//! and batch mean/std queries. Everything else (the search strategy, the
//! benchmark objectives, experiment persistence) lives with the caller.

pub mod domain;
pub mod error;
pub mod fit;
pub mod math;
pub mod models;
pub mod plot;
pub mod surrogate;
