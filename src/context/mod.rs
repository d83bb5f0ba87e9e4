//! Krylov/preconditioner contexts.
//!
//! - [`ksp_context`]: `KspContext`, the faer backend's KSP/PC pair with its
//!   factorization cache.
//! - [`pc_context`]: `PcContextManager`, which owns a context across `init`/`clear`
//!   and decides when a factorization may be reused.
//!
//! # References
//! - PETSc documentation: https://petsc.org/release/docs/manualpages/KSP/

pub mod ksp_context;
pub use ksp_context::KspContext;
pub mod pc_context;
pub use pc_context::{PcContextManager, PcState};
