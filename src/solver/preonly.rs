//! Preconditioner-only "solve": x = M⁻¹ b, exactly one application.

use crate::core::traits::{InnerProduct, MatVec};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::LinearSolver;
use crate::utils::convergence::{ConvergedReason, SolveStats};

#[derive(Debug, Default, Clone, Copy)]
pub struct PreOnlySolver;

impl PreOnlySolver {
    pub fn new() -> Self {
        PreOnlySolver
    }
}

impl<M: MatVec<Vec<f64>>> LinearSolver<M, Vec<f64>> for PreOnlySolver {
    type Error = KError;
    type Scalar = f64;

    /// Without a preconditioner this copies `b` into `x`.
    fn solve(
        &mut self,
        a: &M,
        pc: Option<&dyn Preconditioner<M, Vec<f64>>>,
        b: &Vec<f64>,
        x: &mut Vec<f64>,
    ) -> Result<SolveStats<f64>, KError> {
        match pc {
            Some(pc) => pc.apply(b, x)?,
            None => x.clone_from(b),
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::LuSolver;
    use faer::Mat;

    #[test]
    fn one_lu_application_solves_exactly() {
        let a = Mat::from_fn(3, 3, |i, j| if i == j { 3.0 } else { 1.0 });
        let mut lu = LuSolver::new();
        lu.setup(&a).unwrap();
        let b = vec![5.0, 5.0, 5.0];
        let mut x = vec![0.0; 3];
        let stats = PreOnlySolver::new().solve(&a, Some(&lu), &b, &mut x).unwrap();
        assert_eq!(stats.iterations, 1);
        assert_eq!(stats.reason, ConvergedReason::ConvergedIts);
        assert!(stats.final_residual < 1e-12);
    }
}
