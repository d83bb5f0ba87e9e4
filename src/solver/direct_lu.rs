//! Direct dense LU using Faer's full-pivoting factorization.
//!
//! `LuSolver` serves two roles: as a `LinearSolver` it factors and solves in one call,
//! and as a `Preconditioner` it is the coarse-level direct factorization applied by
//! a preconditioner-only solve, or the Schur block solve inside a field split.
//!
//! # References
//! - Faer documentation: https://github.com/sarah-ek/faer-rs
//! - Golub & Van Loan, Matrix Computations

use crate::core::traits::{InnerProduct, MatVec};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::LinearSolver;
use crate::utils::convergence::{ConvergedReason, SolveStats};
use faer::linalg::solvers::{FullPivLu, SolveCore};
use faer::{Conj, Mat, MatMut};

/// LU solver using full pivoting from Faer.
///
/// Stores the LU factorization for reuse.
pub struct LuSolver {
    /// Cached LU factorization (if computed)
    factor: Option<FullPivLu<f64>>,
    n: usize,
}

impl LuSolver {
    /// Create a new LU solver (no factorization yet).
    pub fn new() -> Self {
        LuSolver { factor: None, n: 0 }
    }

    fn factorize(&mut self, a: &Mat<f64>) -> Result<(), KError> {
        if a.nrows() != a.ncols() {
            return Err(KError::FactorError(format!("LU needs a square block, got {}x{}", a.nrows(), a.ncols())));
        }
        self.factor = Some(FullPivLu::new(a.as_ref()));
        self.n = a.nrows();
        Ok(())
    }

    /// Solve using the cached LU factorization.
    pub fn solve_cached(&self, b: &[f64], x: &mut [f64]) -> Result<(), KError> {
        let factor = self
            .factor
            .as_ref()
            .ok_or_else(|| KError::FactorError("LU applied before factorization".into()))?;
        if b.len() != self.n || x.len() != self.n {
            return Err(KError::SolveError(format!("LU factored for {} rows, applied to {}", self.n, b.len())));
        }
        if self.n == 0 {
            return Ok(());
        }
        x.copy_from_slice(b);
        let x_mat = MatMut::from_column_major_slice_mut(x, self.n, 1);
        factor.solve_in_place_with_conj(Conj::No, x_mat);
        // a zero pivot shows up as inf/NaN in the solution
        if x.iter().any(|v| !v.is_finite()) {
            return Err(KError::FactorError("singular block".into()));
        }
        Ok(())
    }
}

impl Default for LuSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Preconditioner<Mat<f64>, Vec<f64>> for LuSolver {
    fn setup(&mut self, a: &Mat<f64>) -> Result<(), KError> {
        self.factorize(a)
    }

    fn apply(&self, r: &Vec<f64>, z: &mut Vec<f64>) -> Result<(), KError> {
        self.solve_cached(r, z)
    }
}

impl LinearSolver<Mat<f64>, Vec<f64>> for LuSolver {
    type Error = KError;
    type Scalar = f64;

    /// Solve Ax = b using LU factorization (full pivoting); any preconditioner is ignored.
    fn solve(
        &mut self,
        a: &Mat<f64>,
        _pc: Option<&dyn Preconditioner<Mat<f64>, Vec<f64>>>,
        b: &Vec<f64>,
        x: &mut Vec<f64>,
    ) -> Result<SolveStats<f64>, KError> {
        self.factorize(a)?;
        self.solve_cached(b, x)?;
        let mut ax = vec![0.0; b.len()];
        a.matvec(x, &mut ax);
        let r: Vec<f64> = b.iter().zip(&ax).map(|(bi, axi)| bi - axi).collect();
        Ok(SolveStats {
            iterations: 1,
            final_residual: ().norm(&r),
            converged: true,
            reason: ConvergedReason::ConvergedIts,
        })
    }
}
