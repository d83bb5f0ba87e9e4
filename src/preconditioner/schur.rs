//! Schur-complement field split for a two-group block (e.g. velocity / pressure).
//!
//! With the block ordered as `[A_aa A_ab; A_ba A_bb]`, the preconditioner applies the
//! full block factorization
//!
//! ```text
//! z_b = S⁻¹ (r_b − A_ba A_aa⁻¹ r_a)
//! z_a = A_aa⁻¹ (r_a − A_ab z_b)
//! ```
//!
//! where `S = A_bb − A_ba diag(A_aa)⁻¹ A_ab` (PETSc's `selfp` approximation) is
//! factored with LU and `A_aa⁻¹` is whatever inner preconditioner the strategy picked.

use crate::core::traits::MatVec;
use crate::error::KError;
use crate::preconditioner::{LocalPc, Preconditioner};
use crate::solver::direct_lu::LuSolver;
use faer::Mat;

pub struct SchurFieldSplit {
    a_idx: Vec<usize>,
    b_idx: Vec<usize>,
    inner: LocalPc,
    a_ab: Mat<f64>,
    a_ba: Mat<f64>,
    schur: LuSolver,
}

impl SchurFieldSplit {
    /// `a_idx`/`b_idx` are positions inside the local block; together they must cover it.
    pub fn new(a_idx: Vec<usize>, b_idx: Vec<usize>, inner: LocalPc) -> Self {
        Self {
            a_idx,
            b_idx,
            inner,
            a_ab: Mat::zeros(0, 0),
            a_ba: Mat::zeros(0, 0),
            schur: LuSolver::new(),
        }
    }

    fn gather(v: &[f64], idx: &[usize]) -> Vec<f64> {
        idx.iter().map(|&i| v[i]).collect()
    }

    fn sub(p: &Mat<f64>, rows: &[usize], cols: &[usize]) -> Mat<f64> {
        Mat::from_fn(rows.len(), cols.len(), |i, j| p[(rows[i], cols[j])])
    }
}

impl Preconditioner<Mat<f64>, Vec<f64>> for SchurFieldSplit {
    fn setup(&mut self, p: &Mat<f64>) -> Result<(), KError> {
        let n = p.nrows();
        if self.a_idx.len() + self.b_idx.len() != n {
            return Err(KError::FactorError(format!(
                "field split covers {} of {} rows",
                self.a_idx.len() + self.b_idx.len(),
                n
            )));
        }
        let p_aa = Self::sub(p, &self.a_idx, &self.a_idx);
        self.a_ab = Self::sub(p, &self.a_idx, &self.b_idx);
        self.a_ba = Self::sub(p, &self.b_idx, &self.a_idx);
        if !self.a_idx.is_empty() {
            self.inner.setup(&p_aa)?;
        }
        if !self.b_idx.is_empty() {
            let inv_diag: Vec<f64> = (0..p_aa.nrows())
                .map(|k| if p_aa[(k, k)] != 0.0 { 1.0 / p_aa[(k, k)] } else { 0.0 })
                .collect();
            let nb = self.b_idx.len();
            let mut s = Self::sub(p, &self.b_idx, &self.b_idx);
            for i in 0..nb {
                for j in 0..nb {
                    let coupling: f64 = inv_diag
                        .iter()
                        .enumerate()
                        .map(|(k, d)| self.a_ba[(i, k)] * d * self.a_ab[(k, j)])
                        .sum();
                    s[(i, j)] = s[(i, j)] - coupling;
                }
            }
            self.schur.setup(&s)?;
        }
        Ok(())
    }

    fn apply(&self, r: &Vec<f64>, z: &mut Vec<f64>) -> Result<(), KError> {
        let r_a = Self::gather(r, &self.a_idx);
        let r_b = Self::gather(r, &self.b_idx);
        let mut z_a = vec![0.0; r_a.len()];
        if !r_a.is_empty() {
            self.inner.apply(&r_a, &mut z_a)?;
        }
        if !r_b.is_empty() {
            // t = r_b - A_ba A_aa⁻¹ r_a
            let mut t = vec![0.0; r_b.len()];
            self.a_ba.matvec(&z_a, &mut t);
            let t: Vec<f64> = r_b.iter().zip(&t).map(|(rb, ti)| rb - ti).collect();
            let mut z_b = vec![0.0; r_b.len()];
            self.schur.apply(&t, &mut z_b)?;
            if !r_a.is_empty() {
                let mut q = vec![0.0; r_a.len()];
                self.a_ab.matvec(&z_b, &mut q);
                let q: Vec<f64> = r_a.iter().zip(&q).map(|(ra, qi)| ra - qi).collect();
                self.inner.apply(&q, &mut z_a)?;
            }
            for (&i, zi) in self.b_idx.iter().zip(z_b) {
                z[i] = zi;
            }
        }
        for (&i, zi) in self.a_idx.iter().zip(z_a) {
            z[i] = zi;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Saddle-point block [[4,0,1],[0,4,1],[1,1,0]] with a zero pressure diagonal.
    fn saddle() -> Mat<f64> {
        let data = [[4.0, 0.0, 1.0], [0.0, 4.0, 1.0], [1.0, 1.0, 0.0]];
        Mat::from_fn(3, 3, |i, j| data[i][j])
    }

    #[test]
    fn exact_inverse_when_a_block_is_diagonal() {
        // A_aa is diagonal, so selfp is the exact Schur complement and the split is exact
        let p = saddle();
        let mut pc = SchurFieldSplit::new(vec![0, 1], vec![2], Box::new(LuSolver::new()));
        pc.setup(&p).unwrap();
        let x_true = vec![1.0, -2.0, 3.0];
        let mut b = vec![0.0; 3];
        p.matvec(&x_true, &mut b);
        let mut z = vec![0.0; 3];
        pc.apply(&b, &mut z).unwrap();
        for (zi, ti) in z.iter().zip(&x_true) {
            assert_abs_diff_eq!(*zi, *ti, epsilon = 1e-12);
        }
    }

    #[test]
    fn empty_b_part_reduces_to_inner() {
        let p = Mat::from_fn(2, 2, |i, j| if i == j { 2.0 } else { 0.0 });
        let mut pc = SchurFieldSplit::new(vec![0, 1], vec![], Box::new(LuSolver::new()));
        pc.setup(&p).unwrap();
        let mut z = vec![0.0; 2];
        pc.apply(&vec![2.0, 4.0], &mut z).unwrap();
        assert_abs_diff_eq!(z[0], 1.0, epsilon = 1e-14);
        assert_abs_diff_eq!(z[1], 2.0, epsilon = 1e-14);
    }

    #[test]
    fn split_must_cover_block() {
        let mut pc = SchurFieldSplit::new(vec![0], vec![2], Box::new(LuSolver::new()));
        assert!(matches!(pc.setup(&saddle()), Err(KError::FactorError(_))));
    }
}
