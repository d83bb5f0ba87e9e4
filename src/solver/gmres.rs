//! Generalized Minimal Residual (GMRES) solver with fixed restart (Saad §6.4)
//!
//! Restarted GMRES for nonsymmetric local blocks. Preconditioning is applied on the
//! right, so the residual monitored by the convergence test is the true residual
//! `b − A x` and the rtol/atol/divtol checks mean the same thing with or without a
//! preconditioner.
//!
//! # Features
//! - Right or no preconditioning
//! - Double (iterative) modified Gram-Schmidt orthogonalization
//! - Happy breakdown detection for early termination
//! - Givens rotations for the least-squares update
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems, 2nd Edition. SIAM. §6.4
//! - https://en.wikipedia.org/wiki/Generalized_minimal_residual_method

use crate::core::traits::{InnerProduct, MatVec};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::LinearSolver;
use crate::utils::convergence::{Convergence, SolveStats};
use num_traits::Float;

/// Preconditioning mode for GMRES
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Preconditioning {
    None,
    Right,
}

/// GMRES solver struct with restart and preconditioning options.
pub struct GmresSolver<T> {
    /// Number of Arnoldi vectors before restart
    pub restart: usize,
    /// Convergence criteria
    pub conv: Convergence<T>,
    /// Preconditioning mode
    pub preconditioning: Preconditioning,
}

impl<T: Copy + Float> GmresSolver<T> {
    /// Create a new GMRES solver with restart length and stopping criteria.
    pub fn new(restart: usize, conv: Convergence<T>) -> Self {
        Self {
            restart: restart.max(1),
            conv,
            preconditioning: Preconditioning::Right,
        }
    }

    /// Set the preconditioning mode.
    pub fn with_preconditioning(mut self, mode: Preconditioning) -> Self {
        self.preconditioning = mode;
        self
    }

    /// Apply previous Givens rotations to column `j` of H, then build and apply a new one to H and g.
    fn apply_givens_and_update_g(h: &mut [Vec<T>], g: &mut [T], cs: &mut [T], sn: &mut [T], j: usize) {
        for i in 0..j {
            let temp = cs[i] * h[i][j] + sn[i] * h[i + 1][j];
            h[i + 1][j] = -sn[i] * h[i][j] + cs[i] * h[i + 1][j];
            h[i][j] = temp;
        }
        let h_kk = h[j][j];
        let h_k1k = h[j + 1][j];
        let r = h_kk.hypot(h_k1k);
        if r == T::zero() {
            cs[j] = T::one();
            sn[j] = T::zero();
        } else {
            cs[j] = h_kk / r;
            sn[j] = h_k1k / r;
        }
        h[j][j] = cs[j] * h_kk + sn[j] * h_k1k;
        h[j + 1][j] = T::zero();
        let temp = cs[j] * g[j] + sn[j] * g[j + 1];
        g[j + 1] = -sn[j] * g[j] + cs[j] * g[j + 1];
        g[j] = temp;
    }

    /// Solve the upper-triangular system H y = g, with zero-pivot protection.
    ///
    /// `epsilon` is absolute; callers scale it to the magnitude of H.
    fn back_substitution(h: &[Vec<T>], g: &[T], m: usize, epsilon: T) -> Vec<T> {
        let mut y = vec![T::zero(); m];
        for i in (0..m).rev() {
            let mut acc = g[i];
            for j in (i + 1)..m {
                acc = acc - h[i][j] * y[j];
            }
            y[i] = if h[i][i].abs() > epsilon { acc / h[i][i] } else { T::zero() };
        }
        y
    }
}

impl<M, V, T> LinearSolver<M, V> for GmresSolver<T>
where
    M: MatVec<V>,
    (): InnerProduct<V, Scalar = T>,
    V: AsMut<[T]> + AsRef<[T]> + From<Vec<T>> + Clone,
    T: Float + From<f64>,
{
    type Error = KError;
    type Scalar = T;

    /// Solve the linear system Ax = b using restarted GMRES.
    ///
    /// # Arguments
    /// * `a` - Matrix implementing `MatVec`
    /// * `pc` - Optional right preconditioner
    /// * `b` - Right-hand side vector
    /// * `x` - On input: initial guess; on output: solution vector
    ///
    /// # Returns
    /// * `Ok(SolveStats)` whether or not the tolerances were met
    /// * `Err(KError)` if the preconditioner fails
    fn solve(&mut self, a: &M, pc: Option<&dyn Preconditioner<M, V>>, b: &V, x: &mut V) -> Result<SolveStats<T>, KError> {
        let n = b.as_ref().len();
        let ip = ();
        let pc = match self.preconditioning {
            Preconditioning::Right => pc,
            Preconditioning::None => None,
        };
        let residual = |xk: &V| -> V {
            let mut ax = V::from(vec![T::zero(); n]);
            a.matvec(xk, &mut ax);
            V::from(b.as_ref().iter().zip(ax.as_ref()).map(|(&bi, &axi)| bi - axi).collect::<Vec<_>>())
        };
        let mut r = residual(&*x);
        let mut beta = ip.norm(&r);
        let res0 = beta;
        if self.conv.check(beta, res0, 0).is_some() {
            return Ok(self.conv.stats(beta, res0, 0));
        }

        // relative to the size of A·z, so scaling A does not change the decisions
        let epsilon: T = From::from(1e-14);
        let mut iteration = 0;
        loop {
            let mut v_basis: Vec<V> = Vec::with_capacity(self.restart + 1);
            // z_j = M⁻¹ v_j, the directions the solution is updated along
            let mut z_basis: Vec<V> = Vec::with_capacity(self.restart);
            v_basis.push(V::from(r.as_ref().iter().map(|&ri| ri / beta).collect::<Vec<_>>()));
            let mut h = vec![vec![T::zero(); self.restart]; self.restart + 1];
            let mut g = vec![T::zero(); self.restart + 1];
            g[0] = beta;
            let mut cs = vec![T::zero(); self.restart];
            let mut sn = vec![T::zero(); self.restart];
            let mut m = 0;
            let mut stop = false;
            let mut h_scale = T::zero();

            for j in 0..self.restart {
                iteration += 1;
                let zj = match pc {
                    Some(pc) => {
                        let mut z = V::from(vec![T::zero(); n]);
                        pc.apply(&v_basis[j], &mut z)?;
                        z
                    }
                    None => v_basis[j].clone(),
                };
                let mut w = V::from(vec![T::zero(); n]);
                a.matvec(&zj, &mut w);
                z_basis.push(zj);
                let w_norm = ip.norm(&w);
                h_scale = h_scale.max(w_norm);
                // modified Gram-Schmidt, twice
                for _ in 0..2 {
                    for i in 0..=j {
                        let hij = ip.dot(&w, &v_basis[i]);
                        h[i][j] = h[i][j] + hij;
                        for (wk, vik) in w.as_mut().iter_mut().zip(v_basis[i].as_ref()) {
                            *wk = *wk - hij * *vik;
                        }
                    }
                }
                h[j + 1][j] = ip.norm(&w);
                let happy_breakdown = h[j + 1][j].abs() <= epsilon * w_norm;
                if !happy_breakdown {
                    let hj1 = h[j + 1][j];
                    v_basis.push(V::from(w.as_ref().iter().map(|&wi| wi / hj1).collect::<Vec<_>>()));
                }
                Self::apply_givens_and_update_g(&mut h, &mut g, &mut cs, &mut sn, j);
                m = j + 1;
                if self.conv.check(g[j + 1].abs(), res0, iteration).is_some() {
                    stop = true;
                }
                if stop || happy_breakdown {
                    break;
                }
            }

            let y = Self::back_substitution(&h, &g, m, epsilon * h_scale);
            {
                let xs = x.as_mut();
                for (yj, zj) in y.iter().zip(&z_basis) {
                    for (xi, zji) in xs.iter_mut().zip(zj.as_ref()) {
                        *xi = *xi + *yj * *zji;
                    }
                }
            }
            r = residual(&*x);
            beta = ip.norm(&r);
            // the true residual decides; the recurrence only triggered the stop
            if self.conv.check(beta, res0, iteration).is_some() {
                return Ok(self.conv.stats(beta, res0, iteration));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preconditioner::Ilu0;
    use crate::utils::convergence::ConvergedReason;
    use faer::Mat;

    fn conv(rtol: f64, max_iters: usize) -> Convergence<f64> {
        Convergence { rtol, atol: 1e-50, divtol: 1e50, max_iters }
    }

    fn nonsym() -> Mat<f64> {
        // A = [[4,1,0,0],[1,3,1,0],[0,1,2,1],[0,0,1,3]] with a skew perturbation
        let data = [
            [4.0, 1.5, 0.0, 0.0],
            [1.0, 3.0, 1.0, 0.0],
            [0.0, 0.5, 2.0, 1.0],
            [0.0, 0.0, 1.0, 3.0],
        ];
        Mat::from_fn(4, 4, |i, j| data[i][j])
    }

    #[test]
    fn gmres_solves_well_conditioned_nonsym() {
        let a = nonsym();
        let x_true = vec![1.0, 2.0, 3.0, 4.0];
        let mut b = vec![0.0; 4];
        a.matvec(&x_true, &mut b);
        let mut x = vec![0.0; 4];
        let mut solver = GmresSolver::new(4, conv(1e-12, 100)).with_preconditioning(Preconditioning::None);
        let stats = solver.solve(&a, None, &b, &mut x).unwrap();
        for (xi, ei) in x.iter().zip(x_true.iter()) {
            assert!((xi - ei).abs() < 1e-8, "xi = {}, expected = {}", xi, ei);
        }
        assert!(stats.converged, "GMRES did not converge");
    }

    #[test]
    fn exact_preconditioner_converges_in_one_step() {
        let a = Mat::from_fn(5, 5, |i, j| if i == j { 4.0 } else if i.abs_diff(j) == 1 { -1.0 } else { 0.0 });
        let mut pc = Ilu0::new();
        pc.setup(&a).unwrap();
        let b = vec![1.0; 5];
        let mut x = vec![0.0; 5];
        let stats = GmresSolver::new(30, conv(1e-8, 4)).solve(&a, Some(&pc), &b, &mut x).unwrap();
        assert_eq!(stats.iterations, 1);
        assert!(stats.converged);
    }

    #[test]
    fn iteration_budget_is_reported_not_an_error() {
        // 1D Laplacian without preconditioning needs more than 2 iterations
        let n = 20;
        let a = Mat::from_fn(n, n, |i, j| if i == j { 2.0 } else if i.abs_diff(j) == 1 { -1.0 } else { 0.0 });
        let b = vec![1.0; n];
        let mut x = vec![0.0; n];
        let stats = GmresSolver::new(30, conv(1e-12, 2)).solve(&a, None, &b, &mut x).unwrap();
        assert_eq!(stats.iterations, 2);
        assert!(!stats.converged);
        assert_eq!(stats.reason, ConvergedReason::DivergedIts);
    }

    #[test]
    fn tiny_operator_scale_does_not_stall() {
        let base = nonsym();
        let a = Mat::from_fn(4, 4, |i, j| 1e-20 * base[(i, j)]);
        let x_true = vec![1.0, 2.0, 3.0, 4.0];
        let mut b = vec![0.0; 4];
        a.matvec(&x_true, &mut b);
        let mut x = vec![0.0; 4];
        let mut solver = GmresSolver::new(4, conv(1e-10, 100)).with_preconditioning(Preconditioning::None);
        let stats = solver.solve(&a, None, &b, &mut x).unwrap();
        assert!(stats.converged, "stopped with {:?}", stats.reason);
        assert!(stats.iterations <= 8, "took {} iterations", stats.iterations);
        for (xi, ei) in x.iter().zip(&x_true) {
            assert!((xi - ei).abs() < 1e-6, "xi = {}, expected = {}", xi, ei);
        }
    }

    #[test]
    fn zero_rhs_returns_immediately() {
        let a = Mat::from_fn(3, 3, |i, j| if i == j { 1.0 } else { 0.0 });
        let mut x = vec![0.0; 3];
        let stats = GmresSolver::new(3, conv(1e-8, 4)).solve(&a, None, &vec![0.0; 3], &mut x).unwrap();
        assert_eq!(stats.iterations, 0);
        assert_eq!(stats.reason, ConvergedReason::ConvergedAtol);
    }
}
