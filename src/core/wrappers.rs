//! Trait implementations for `faer::Mat` and `Vec<T>`.
//!
//! The backend extracts every local block as a dense `faer::Mat`, so the Krylov and
//! preconditioner code only ever sees these two types. Inner products use Rayon when
//! the `rayon` feature is enabled.

use crate::core::traits::{InnerProduct, MatVec};
use faer::Mat;
use num_traits::Float;

/// Implements matrix-vector multiplication for `faer::Mat`.
///
/// Computes `y = A * x` where `A` is a dense matrix, `x` and `y` are vectors.
impl<T: Float> MatVec<Vec<T>> for Mat<T> {
    fn matvec(&self, x: &Vec<T>, y: &mut Vec<T>) {
        assert_eq!(self.nrows(), y.len(), "Output vector y has incorrect length");
        assert_eq!(self.ncols(), x.len(), "Input vector x has incorrect length");
        for i in 0..self.nrows() {
            let mut acc = T::zero();
            for j in 0..self.ncols() {
                acc = acc + self[(i, j)] * x[j];
            }
            y[i] = acc;
        }
    }
}

/// Implements inner product and norm for vectors, with optional Rayon parallelism.
impl<T: Float + From<f64> + Send + Sync> InnerProduct<Vec<T>> for () {
    type Scalar = T;
    /// Computes the dot product of two vectors: `x^T y`.
    fn dot(&self, x: &Vec<T>, y: &Vec<T>) -> T {
        assert_eq!(x.len(), y.len(), "Vectors must have the same length");
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            x.as_slice()
                .par_iter()
                .zip(y.as_slice().par_iter())
                .map(|(xi, yi)| *xi * *yi)
                .reduce(|| T::zero(), |acc, v| acc + v)
        }
        #[cfg(not(feature = "rayon"))]
        {
            x.iter()
                .zip(y.iter())
                .map(|(xi, yi)| *xi * *yi)
                .fold(T::zero(), |acc, v| acc + v)
        }
    }
    /// Computes the Euclidean norm of a vector: `||x||_2`.
    fn norm(&self, x: &Vec<T>) -> T {
        self.dot(x, x).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn dense_matvec_and_norm() {
        let a = Mat::from_fn(2, 2, |i, j| if i == j { 2.0 } else { 1.0 });
        let x = vec![1.0, -1.0];
        let mut y = vec![0.0; 2];
        a.matvec(&x, &mut y);
        assert_eq!(y, vec![1.0, -1.0]);
        assert_abs_diff_eq!(().norm(&y), 2.0f64.sqrt(), epsilon = 1e-14);
    }
}
