//! Shared helpers for the iterative solvers.

pub mod convergence;
