//! Compressed sparse row storage for operator and preconditioning matrices.
//!
//! The smoother never modifies a matrix; it reads rows to form residuals and copies
//! small index blocks into dense `faer::Mat` storage for local factorizations.

use crate::core::traits::MatVec;
use crate::error::KError;
use faer::Mat;
use num_traits::Float;

/// Row-major sparse matrix with sorted column indices per row.
#[derive(Clone, Debug, PartialEq)]
pub struct CsrMatrix<T> {
    nrows: usize,
    ncols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<T>,
}

impl<T: Float> CsrMatrix<T> {
    /// Build a CSR from raw row‐ptr, col‐idx, and values.
    ///
    /// Column indices inside each row are sorted on construction.
    pub fn from_csr(
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self, KError> {
        if row_ptr.len() != nrows + 1 || row_ptr[0] != 0 {
            return Err(KError::BackendInit(format!(
                "row_ptr must have {} entries starting at 0",
                nrows + 1
            )));
        }
        if row_ptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(KError::BackendInit("row_ptr is not monotone".into()));
        }
        let nnz = row_ptr[nrows];
        if col_idx.len() != nnz || values.len() != nnz {
            return Err(KError::BackendInit(format!(
                "expected {} nonzeros, got {} column indices and {} values",
                nnz,
                col_idx.len(),
                values.len()
            )));
        }
        if let Some(&j) = col_idx.iter().find(|&&j| j >= ncols) {
            return Err(KError::BackendInit(format!("column index {j} out of range")));
        }
        let mut m = Self { nrows, ncols, row_ptr, col_idx, values };
        m.sort_rows();
        Ok(m)
    }

    /// Build from (row, col, value) triplets; duplicate entries are summed.
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        triplets: &[(usize, usize, T)],
    ) -> Result<Self, KError> {
        let mut rows: Vec<Vec<(usize, T)>> = vec![Vec::new(); nrows];
        for &(i, j, v) in triplets {
            if i >= nrows || j >= ncols {
                return Err(KError::BackendInit(format!("entry ({i}, {j}) out of range")));
            }
            match rows[i].iter_mut().find(|(c, _)| *c == j) {
                Some(entry) => entry.1 = entry.1 + v,
                None => rows[i].push((j, v)),
            }
        }
        let mut row_ptr = Vec::with_capacity(nrows + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0);
        for row in rows {
            for (j, v) in row {
                col_idx.push(j);
                values.push(v);
            }
            row_ptr.push(col_idx.len());
        }
        Self::from_csr(nrows, ncols, row_ptr, col_idx, values)
    }

    /// n×n identity.
    pub fn identity(n: usize) -> Self {
        Self {
            nrows: n,
            ncols: n,
            row_ptr: (0..=n).collect(),
            col_idx: (0..n).collect(),
            values: vec![T::one(); n],
        }
    }

    fn sort_rows(&mut self) {
        for i in 0..self.nrows {
            let (start, end) = (self.row_ptr[i], self.row_ptr[i + 1]);
            let mut row: Vec<(usize, T)> = self.col_idx[start..end]
                .iter()
                .copied()
                .zip(self.values[start..end].iter().copied())
                .collect();
            row.sort_by_key(|&(j, _)| j);
            for (k, (j, v)) in row.into_iter().enumerate() {
                self.col_idx[start + k] = j;
                self.values[start + k] = v;
            }
        }
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Column indices and values of row `i`.
    pub fn row(&self, i: usize) -> (&[usize], &[T]) {
        let (start, end) = (self.row_ptr[i], self.row_ptr[i + 1]);
        (&self.col_idx[start..end], &self.values[start..end])
    }

    /// Entry (i, j), zero when structurally absent.
    pub fn get(&self, i: usize, j: usize) -> T {
        let (cols, vals) = self.row(i);
        match cols.binary_search(&j) {
            Ok(k) => vals[k],
            Err(_) => T::zero(),
        }
    }

    /// First row with no stored nonzero, if any.
    pub fn first_empty_row(&self) -> Option<usize> {
        (0..self.nrows).find(|&i| self.row(i).1.iter().all(|v| v.is_zero()))
    }

    /// Compute y = A * x.  `x.len() == ncols()`, `y.len() == nrows()`.
    pub fn spmv(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.ncols);
        assert_eq!(y.len(), self.nrows);
        for (i, yi) in y.iter_mut().enumerate() {
            let (cols, vals) = self.row(i);
            *yi = cols
                .iter()
                .zip(vals)
                .fold(T::zero(), |acc, (&j, &v)| acc + v * x[j]);
        }
    }

    /// Dense copy of the block `A[rows, cols]`.
    pub fn dense_block(&self, rows: &[usize], cols: &[usize]) -> Mat<T> {
        Mat::from_fn(rows.len(), cols.len(), |i, j| self.get(rows[i], cols[j]))
    }
}

#[cfg(feature = "rayon")]
impl<T: Float + Send + Sync> CsrMatrix<T> {
    /// Parallel SpMV using Rayon
    pub fn spmv_parallel(&self, x: &[T], y: &mut [T]) {
        use rayon::prelude::*;
        assert_eq!(x.len(), self.ncols);
        assert_eq!(y.len(), self.nrows);
        y.par_iter_mut().enumerate().for_each(|(i, yi)| {
            let (cols, vals) = self.row(i);
            *yi = cols
                .iter()
                .zip(vals)
                .fold(T::zero(), |acc, (&j, &v)| acc + v * x[j]);
        });
    }
}

impl<T: Float> MatVec<Vec<T>> for CsrMatrix<T> {
    fn matvec(&self, x: &Vec<T>, y: &mut Vec<T>) {
        self.spmv(x, y);
    }
}
