//! kryst-smoother: level-aware GMRES smoothing for multigrid, PETSc KSP/PC style
//!
//! Each multigrid level owns one solver from the [`smoother`] family. A solve builds
//! the Vanka block index sets once (optionally split into two variable groups for a
//! Schur field split), picks the preconditioner/solver pair from the level and the
//! process count, reuses the preconditioner factorization while the preconditioning
//! matrix is unchanged, and reports iterations and residual to the caller.
//!
//! The linear algebra sits behind the [`backend`] traits; [`FaerBackend`] is the
//! in-process implementation over `faer`.

pub mod parallel;

pub mod backend;
pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod matrix;
pub mod partition;
pub mod preconditioner;
pub mod smoother;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use backend::{Backend, FaerBackend, IndexSet, KrylovContext, SolveTarget};
pub use config::{KspType, PcType, SolverConfig, StrategyDescriptor, ToleranceSet, select_strategy};
pub use context::{KspContext, PcContextManager, PcState};
pub use error::KError;
pub use matrix::CsrMatrix;
pub use partition::{BuildStatus, DofLayout, IndexPartition, PartitionState};
pub use smoother::{
    DirectSolver, GmresSmoother, LinearEquationSolver, SolveOutcome, SolveRequest, SolverKind, new_solver,
};
pub use utils::convergence::{ConvergedReason, SolveStats};
