//! ILU(0) factorization with zero fill (Saad §10.3).
//!
//! Factors are stored in place in one dense matrix: the strict lower part holds L
//! (unit diagonal implied), the upper part holds U. Updates are restricted to the
//! nonzero pattern of the input block.

use crate::preconditioner::Preconditioner;
use crate::error::KError;
use faer::Mat;

pub struct Ilu0 {
    pub(crate) lu: Mat<f64>,
}

impl Ilu0 {
    pub fn new() -> Self {
        Self { lu: Mat::zeros(0, 0) }
    }
}

impl Default for Ilu0 {
    fn default() -> Self {
        Self::new()
    }
}

impl Preconditioner<Mat<f64>, Vec<f64>> for Ilu0 {
    fn setup(&mut self, a: &Mat<f64>) -> Result<(), KError> {
        let n = a.nrows();
        if a.ncols() != n {
            return Err(KError::FactorError(format!("ILU(0) needs a square block, got {}x{}", n, a.ncols())));
        }
        let mut lu = a.clone();
        // IKJ variant
        for i in 0..n {
            for k in 0..i {
                if a[(i, k)] == 0.0 {
                    continue;
                }
                let pivot = lu[(k, k)];
                if pivot == 0.0 {
                    return Err(KError::ZeroPivot(k));
                }
                let lik = lu[(i, k)] / pivot;
                lu[(i, k)] = lik;
                for j in (k + 1)..n {
                    if a[(i, j)] != 0.0 {
                        lu[(i, j)] = lu[(i, j)] - lik * lu[(k, j)];
                    }
                }
            }
            if lu[(i, i)] == 0.0 {
                return Err(KError::ZeroPivot(i));
            }
        }
        self.lu = lu;
        Ok(())
    }

    fn apply(&self, x: &Vec<f64>, y: &mut Vec<f64>) -> Result<(), KError> {
        let n = x.len();
        if n != self.lu.nrows() {
            return Err(KError::SolveError(format!(
                "ILU(0) factored for {} rows, applied to {}",
                self.lu.nrows(),
                n
            )));
        }
        // solve L y1 = x
        let mut y1 = x.clone();
        for i in 0..n {
            for j in 0..i {
                y1[i] = y1[i] - self.lu[(i, j)] * y1[j];
            }
        }
        // solve U y = y1
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                y1[i] = y1[i] - self.lu[(i, j)] * y1[j];
            }
            y1[i] = y1[i] / self.lu[(i, i)];
        }
        *y = y1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn tridiag(n: usize) -> Mat<f64> {
        Mat::from_fn(n, n, |i, j| {
            if i == j { 4.0 } else if i.abs_diff(j) == 1 { -1.0 } else { 0.0 }
        })
    }

    #[test]
    fn ilu0_is_exact_on_tridiagonal() {
        // no fill is produced for a tridiagonal matrix, so ILU(0) = LU
        let a = tridiag(6);
        let mut pc = Ilu0::new();
        pc.setup(&a).unwrap();
        let x_true: Vec<f64> = (0..6).map(|i| i as f64 + 1.0).collect();
        let b: Vec<f64> = (0..6)
            .map(|i| (0..6).map(|j| a[(i, j)] * x_true[j]).sum())
            .collect();
        let mut x = vec![0.0; 6];
        pc.apply(&b, &mut x).unwrap();
        for (xi, ti) in x.iter().zip(&x_true) {
            assert_abs_diff_eq!(*xi, *ti, epsilon = 1e-12);
        }
    }

    #[test]
    fn zero_pivot_is_reported() {
        let a = Mat::from_fn(2, 2, |i, j| if i == j { 0.0 } else { 1.0 });
        let mut pc = Ilu0::new();
        assert_eq!(pc.setup(&a).unwrap_err(), KError::ZeroPivot(0));
    }
}
