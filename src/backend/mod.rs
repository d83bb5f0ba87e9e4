//! The linear-algebra backend seam.
//!
//! The smoother only orchestrates: matrices, Krylov iterations, preconditioner
//! factorizations and index sets live behind these two traits. `FaerBackend` is the
//! in-process implementation shipped with the crate.

use crate::config::{StrategyDescriptor, ToleranceSet};
use crate::error::KError;
use crate::matrix::CsrMatrix;
use crate::utils::convergence::SolveStats;
use std::sync::Arc;

pub mod faer_backend;
pub mod index_set;

pub use faer_backend::FaerBackend;
pub use index_set::{IndexSet, IndexSetRegistry};

/// What a single backend solve is restricted to.
#[derive(Clone, Copy)]
pub enum SolveTarget<'a> {
    /// The full system.
    Whole,
    /// One block, optionally with its A-part/B-part split for a Schur field split.
    Block {
        is: &'a IndexSet,
        split: Option<(&'a IndexSet, &'a IndexSet)>,
    },
}

/// Backend-wide services: process count, index sets, Krylov contexts.
pub trait Backend {
    type Ksp: KrylovContext;

    /// Number of processes sharing the distributed system.
    fn process_count(&self) -> usize;
    /// Allocate an index-set handle owning `indices`.
    fn create_index_set(&mut self, indices: Vec<usize>) -> IndexSet;
    /// Release a handle; any later use of its id fails.
    fn destroy_index_set(&mut self, is: IndexSet);
    /// Number of handles created and not yet destroyed.
    fn live_index_sets(&self) -> usize;
    /// Allocate a Krylov/preconditioner context.
    fn create_ksp(&mut self) -> Self::Ksp;
}

/// A Krylov solver together with its preconditioner, PETSc KSP/PC style.
pub trait KrylovContext {
    fn set_strategy(&mut self, strategy: StrategyDescriptor);
    fn set_tolerances(&mut self, tol: ToleranceSet);
    /// GMRES restart length; ignored by preconditioner-only solves.
    fn set_restart(&mut self, restart: usize);
    /// Bind the operator and the matrix the preconditioner is built from.
    ///
    /// Cached factorizations survive only when `p` equals the matrix already bound.
    fn set_operators(&mut self, a: Arc<CsrMatrix<f64>>, p: Arc<CsrMatrix<f64>>) -> Result<(), KError>;
    /// Drop cached factorizations; the next solve rebuilds them from P.
    fn reset_preconditioner(&mut self);
    /// Solve `A_II d = (b − A x)_I` on `target` and update `x_I += d`.
    fn solve(&mut self, target: SolveTarget<'_>, rhs: &[f64], x: &mut [f64]) -> Result<SolveStats<f64>, KError>;
    /// Global `‖b − A x‖₂`.
    fn residual_norm(&self, rhs: &[f64], x: &[f64]) -> Result<f64, KError>;
}
