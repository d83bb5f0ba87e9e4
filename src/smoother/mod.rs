//! Level smoothers for multigrid.
//!
//! Every solver of the family implements [`LinearEquationSolver`] and is chosen at
//! construction, either directly or through [`new_solver`]:
//!
//! - [`GmresSmoother`]: strategy from the level table (direct solve on the coarsest
//!   level, ILU- or block-Jacobi-preconditioned GMRES above it);
//! - [`DirectSolver`]: one direct factorization solve on every level.
//!
//! # Example
//! ```rust
//! use kryst_smoother::{CsrMatrix, DofLayout, FaerBackend, GmresSmoother, LinearEquationSolver, SolveRequest};
//! use std::sync::Arc;
//!
//! let a = Arc::new(CsrMatrix::identity(4));
//! let mut smoother = GmresSmoother::new(1, DofLayout::scalar(4), FaerBackend::serial());
//! smoother.init(Arc::clone(&a), a).unwrap();
//! let mut x = vec![0.0; 4];
//! let out = smoother.solve(&SolveRequest::whole(), &[1.0; 4], &mut x).unwrap();
//! assert!(out.residual_norm < 1e-8);
//! ```

pub mod orchestrator;
pub mod solvers;

pub use orchestrator::{Orchestrator, StrategyFn};
pub use solvers::{DirectSolver, GmresSmoother};

use crate::backend::Backend;
use crate::error::KError;
use crate::matrix::CsrMatrix;
use crate::partition::DofLayout;
use std::sync::Arc;

/// One smoothing request.
#[derive(Clone, Copy, Debug)]
pub struct SolveRequest<'a> {
    /// DOF membership per block; empty means the whole system as one block.
    pub blocks: &'a [Vec<usize>],
    /// Number of trailing components per node placed in the Schur B-part.
    pub num_schur_vars: usize,
    pub use_schur: bool,
    /// Recompute the preconditioner even if P is unchanged.
    pub reset_preconditioner: bool,
}

impl<'a> SolveRequest<'a> {
    pub fn whole() -> Self {
        Self { blocks: &[], num_schur_vars: 0, use_schur: false, reset_preconditioner: false }
    }

    pub fn blocks(blocks: &'a [Vec<usize>]) -> Self {
        Self { blocks, ..Self::whole() }
    }

    /// Split every block, or the whole system when no blocks are given, the last
    /// `num_schur_vars` components going to the B-part.
    pub fn with_schur(mut self, num_schur_vars: usize) -> Self {
        self.num_schur_vars = num_schur_vars;
        self.use_schur = true;
        self
    }

    pub fn with_reset(mut self, reset: bool) -> Self {
        self.reset_preconditioner = reset;
        self
    }
}

/// Result of one sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolveOutcome {
    /// Largest iteration count over the blocks of the sweep.
    pub iterations: usize,
    /// `‖b − A x‖₂` after the sweep.
    pub residual_norm: f64,
    /// Every block met its tolerance.
    pub converged: bool,
}

/// The capability shared by all level solvers.
pub trait LinearEquationSolver {
    /// Bind the operator and the preconditioning matrix.
    fn init(&mut self, a: Arc<CsrMatrix<f64>>, p: Arc<CsrMatrix<f64>>) -> Result<(), KError>;
    /// Release the Krylov/preconditioner context. Idempotent.
    fn clear(&mut self);
    /// Smooth `x` against `rhs`.
    fn solve(&mut self, request: &SolveRequest<'_>, rhs: &[f64], x: &mut [f64]) -> Result<SolveOutcome, KError>;
    /// Store tolerances for `level`; invalid input leaves the previous values.
    fn set_tolerances(&mut self, rtol: f64, atol: f64, divtol: f64, max_its: usize, level: usize) -> Result<(), KError>;
    fn level(&self) -> usize;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverKind {
    Gmres,
    Direct,
}

/// Build a boxed level solver of `kind`.
pub fn new_solver<B>(kind: SolverKind, level: usize, layout: DofLayout, backend: B) -> Box<dyn LinearEquationSolver>
where
    B: Backend + 'static,
    B::Ksp: 'static,
{
    match kind {
        SolverKind::Gmres => Box::new(GmresSmoother::new(level, layout, backend)),
        SolverKind::Direct => Box::new(DirectSolver::new(level, layout, backend)),
    }
}
