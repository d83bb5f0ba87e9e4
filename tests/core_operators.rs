//! CSR operator storage against dense `faer` arithmetic.
//!
//! The backend forms residuals with the sparse product and factors dense copies of
//! index blocks, so the two representations must agree entry by entry.

use approx::assert_abs_diff_eq;
use faer::Mat;
use kryst_smoother::CsrMatrix;
use kryst_smoother::core::traits::{InnerProduct, MatVec};
use rand::Rng;

fn random_sparse(n: usize, density: f64) -> (CsrMatrix<f64>, Mat<f64>) {
    let mut rng = rand::thread_rng();
    let mut triplets = Vec::new();
    for i in 0..n {
        triplets.push((i, i, 1.0 + rng.r#gen::<f64>()));
        for j in 0..n {
            if i != j && rng.r#gen::<f64>() < density {
                triplets.push((i, j, rng.r#gen::<f64>() - 0.5));
            }
        }
    }
    let csr = CsrMatrix::from_triplets(n, n, &triplets).unwrap();
    let dense = csr.dense_block(&(0..n).collect::<Vec<_>>(), &(0..n).collect::<Vec<_>>());
    (csr, dense)
}

/// Sparse and dense products agree on a random operator.
#[test]
fn spmv_matches_dense_matvec() {
    let n = 15;
    let (csr, dense) = random_sparse(n, 0.2);
    let mut rng = rand::thread_rng();
    let x: Vec<f64> = (0..n).map(|_| rng.r#gen()).collect();
    let mut y_sparse = vec![0.0; n];
    let mut y_dense = vec![0.0; n];
    csr.matvec(&x, &mut y_sparse);
    dense.matvec(&x, &mut y_dense);
    for (s, d) in y_sparse.iter().zip(&y_dense) {
        assert_abs_diff_eq!(*s, *d, epsilon = 1e-12);
    }
}

/// A dense block extracted with a permuted index list follows that order.
#[test]
fn dense_block_follows_index_order() {
    let (csr, dense) = random_sparse(8, 0.5);
    let rows = [5, 1, 7];
    let block = csr.dense_block(&rows, &rows);
    for (bi, &i) in rows.iter().enumerate() {
        for (bj, &j) in rows.iter().enumerate() {
            assert_eq!(block[(bi, bj)], dense[(i, j)]);
        }
    }
}

/// Duplicate triplets are summed, matching assembly semantics.
#[test]
fn triplet_assembly_sums_duplicates() {
    let m = CsrMatrix::from_triplets(2, 2, &[(0, 0, 1.0), (1, 1, 2.0), (0, 0, 0.5), (1, 0, -1.0)]).unwrap();
    assert_eq!(m.get(0, 0), 1.5);
    assert_eq!(m.get(1, 0), -1.0);
    assert_eq!(m.get(0, 1), 0.0);
    assert_eq!(m.nnz(), 3);
}

/// Dot product and Euclidean norm.
#[test]
fn dot_and_norm() {
    let x = vec![1.0, 2.0, 3.0];
    let y = vec![4.0, -5.0, 6.0];
    let ip = ();
    assert_abs_diff_eq!(ip.dot(&x, &y), 12.0, epsilon = 1e-12);
    assert_abs_diff_eq!(ip.norm(&x), 14.0f64.sqrt(), epsilon = 1e-12);
}
