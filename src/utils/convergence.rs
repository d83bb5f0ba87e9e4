//! Convergence tracking & tolerance checks for iterative solvers.
//!
//! The tests mirror PETSc's default KSP convergence test: absolute tolerance first,
//! then the reduction relative to the initial residual, then divergence, then the
//! iteration budget.

use crate::config::options::ToleranceSet;
use num_traits::Float;

/// Why an iteration stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConvergedReason {
    /// `‖r‖ ≤ rtol · ‖r₀‖`
    ConvergedRtol,
    /// `‖r‖ ≤ atol`
    ConvergedAtol,
    /// A fixed number of applications was requested (preconditioner-only solves).
    ConvergedIts,
    /// `‖r‖ ≥ divtol · ‖r₀‖`, or the residual is not finite.
    DivergedDtol,
    /// The iteration budget ran out above tolerance.
    DivergedIts,
}

impl ConvergedReason {
    pub fn is_converged(self) -> bool {
        matches!(
            self,
            ConvergedReason::ConvergedRtol | ConvergedReason::ConvergedAtol | ConvergedReason::ConvergedIts
        )
    }
}

/// Stopping criteria.
#[derive(Clone, Debug)]
pub struct Convergence<T> {
    pub rtol: T,
    pub atol: T,
    pub divtol: T,
    pub max_iters: usize,
}

#[derive(Clone, Debug)]
pub struct SolveStats<T> {
    pub iterations: usize,
    pub final_residual: T,
    pub converged: bool,
    pub reason: ConvergedReason,
}

impl<T: Copy + Float> Convergence<T> {
    /// Returns the stopping reason for `res_norm` at iteration `i`, or `None` to continue.
    pub fn check(&self, res_norm: T, res0_norm: T, i: usize) -> Option<ConvergedReason> {
        if res_norm.is_nan() {
            return Some(ConvergedReason::DivergedDtol);
        }
        if res_norm <= self.atol {
            return Some(ConvergedReason::ConvergedAtol);
        }
        if res_norm <= self.rtol * res0_norm {
            return Some(ConvergedReason::ConvergedRtol);
        }
        if res_norm.is_infinite() || res_norm >= self.divtol * res0_norm {
            return Some(ConvergedReason::DivergedDtol);
        }
        if i >= self.max_iters {
            return Some(ConvergedReason::DivergedIts);
        }
        None
    }

    /// Stats for a run that stopped at iteration `i` with `res_norm`.
    pub fn stats(&self, res_norm: T, res0_norm: T, i: usize) -> SolveStats<T> {
        let reason = self.check(res_norm, res0_norm, i).unwrap_or(ConvergedReason::DivergedIts);
        SolveStats {
            iterations: i,
            final_residual: res_norm,
            converged: reason.is_converged(),
            reason,
        }
    }
}

impl From<&ToleranceSet> for Convergence<f64> {
    fn from(tol: &ToleranceSet) -> Self {
        Self {
            rtol: tol.rtol(),
            atol: tol.atol(),
            divtol: tol.divtol(),
            max_iters: tol.max_its(),
        }
    }
}
