// Block-Jacobi preconditioner: one ILU(0) per process chunk, no coupling between chunks

use crate::error::KError;
use crate::preconditioner::{Ilu0, Preconditioner};
use faer::Mat;

/// Block-Jacobi preconditioner
pub struct BlockJacobi {
    nblocks: usize,
    /// (first row, ILU(0) of the diagonal block)
    chunks: Vec<(usize, Ilu0)>,
}

impl BlockJacobi {
    /// `nblocks` contiguous row chunks, normally the process count.
    pub fn new(nblocks: usize) -> Self {
        Self { nblocks: nblocks.max(1), chunks: Vec::new() }
    }

    /// Contiguous near-equal ranges covering `0..n`, like a default row ownership split.
    fn ranges(n: usize, nblocks: usize) -> Vec<(usize, usize)> {
        let nb = nblocks.min(n).max(1);
        let (base, rem) = (n / nb, n % nb);
        let mut start = 0;
        (0..nb)
            .map(|i| {
                let len = base + usize::from(i < rem);
                let r = (start, start + len);
                start += len;
                r
            })
            .filter(|(s, e)| e > s)
            .collect()
    }

    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }
}

impl Preconditioner<Mat<f64>, Vec<f64>> for BlockJacobi {
    fn setup(&mut self, a: &Mat<f64>) -> Result<(), KError> {
        self.chunks.clear();
        for (s, e) in Self::ranges(a.nrows(), self.nblocks) {
            let sub = Mat::from_fn(e - s, e - s, |i, j| a[(s + i, s + j)]);
            let mut ilu = Ilu0::new();
            ilu.setup(&sub).map_err(|err| match err {
                KError::ZeroPivot(k) => KError::ZeroPivot(s + k),
                other => other,
            })?;
            self.chunks.push((s, ilu));
        }
        Ok(())
    }

    /// Apply: z = M⁻¹ r
    fn apply(&self, r: &Vec<f64>, z: &mut Vec<f64>) -> Result<(), KError> {
        let solve_chunk = |(s, ilu): &(usize, Ilu0)| -> Result<(usize, Vec<f64>), KError> {
            let len = ilu.lu.nrows();
            let r_block = r[*s..*s + len].to_vec();
            let mut z_block = vec![0.0; len];
            ilu.apply(&r_block, &mut z_block)?;
            Ok((*s, z_block))
        };
        #[cfg(feature = "rayon")]
        let solved: Vec<(usize, Vec<f64>)> = {
            use rayon::prelude::*;
            self.chunks.par_iter().map(solve_chunk).collect::<Result<_, _>>()?
        };
        #[cfg(not(feature = "rayon"))]
        let solved: Vec<(usize, Vec<f64>)> = self.chunks.iter().map(solve_chunk).collect::<Result<_, _>>()?;
        for (s, z_block) in solved {
            z[s..s + z_block.len()].copy_from_slice(&z_block);
        }
        Ok(())
    }
}
