//! Preconditioners built by the reference backend.
//!
//! Each one is set up from a dense local block (`faer::Mat<f64>`) and applied to
//! `Vec<f64>` residuals. The strategy table decides which one a block gets.

use crate::error::KError;

/// A preconditioner M ≈ A⁻¹.
pub trait Preconditioner<M, V> {
    /// Apply M⁻¹ to r, writing z = M⁻¹ r
    fn apply(&self, r: &V, z: &mut V) -> Result<(), KError>;
    /// Optionally: setup/factorize from A
    fn setup(&mut self, _a: &M) -> Result<(), KError> { Ok(()) }
}

pub mod block_jacobi;
pub mod ilu;
pub mod schur;

pub use block_jacobi::BlockJacobi;
pub use ilu::Ilu0;
pub use schur::SchurFieldSplit;

/// Boxed preconditioner over dense local blocks.
pub type LocalPc = Box<dyn Preconditioner<faer::Mat<f64>, Vec<f64>>>;
