//! Krylov context of the faer backend.
//!
//! `KspContext` holds what a PETSc KSP/PC pair holds: the solver and preconditioner
//! types, tolerances, the bound operator and preconditioning matrices, and the
//! factorizations built so far. Factorizations are cached per target (whole system
//! or index-set id) and survive across solves until `reset_preconditioner`, a change
//! of strategy, or new operators.
//!
//! A block solve works on the restriction of the system to the block:
//! `A_II d = (b − A x)_I`, followed by `x_I += d`. Applied block after block this is
//! a multiplicative (Gauss-Seidel ordered) Vanka sweep. The block residual reads only
//! the block's rows of A, and the dense `A_II` is kept until the operator changes, so
//! a sweep costs the sum of its blocks and not one full SpMV per block.
//!
//! A whole-system solve runs the Krylov method on the sparse operator itself.

use crate::backend::{IndexSetRegistry, KrylovContext, SolveTarget};
use crate::config::{KspType, PcType, StrategyDescriptor, ToleranceSet};
use crate::config::options::DEFAULT_RESTART;
use crate::core::traits::{InnerProduct, MatVec};
use crate::error::KError;
use crate::matrix::CsrMatrix;
use crate::preconditioner::{BlockJacobi, Ilu0, LocalPc, Preconditioner, SchurFieldSplit};
use crate::solver::{GmresSolver, LinearSolver, LuSolver, PreOnlySolver};
use crate::utils::convergence::{Convergence, SolveStats};
use faer::Mat;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum FactorKey {
    Whole,
    Block(usize),
}

pub struct KspContext {
    strategy: StrategyDescriptor,
    tol: ToleranceSet,
    restart: usize,
    process_count: usize,
    a: Option<Arc<CsrMatrix<f64>>>,
    p: Option<Arc<CsrMatrix<f64>>>,
    factors: HashMap<FactorKey, LocalPc>,
    /// Dense `A_II` per index-set id, valid for the bound operator only.
    a_blocks: HashMap<usize, Mat<f64>>,
    built: usize,
    registry: Arc<IndexSetRegistry>,
}

/// A preconditioner set up on a dense block, applied inside a sparse solve.
struct OnSparse<'a>(&'a dyn Preconditioner<Mat<f64>, Vec<f64>>);

impl Preconditioner<CsrMatrix<f64>, Vec<f64>> for OnSparse<'_> {
    fn apply(&self, r: &Vec<f64>, z: &mut Vec<f64>) -> Result<(), KError> {
        self.0.apply(r, z)
    }
}

impl KspContext {
    pub fn new(registry: Arc<IndexSetRegistry>, process_count: usize) -> Self {
        Self {
            strategy: StrategyDescriptor::direct(),
            tol: ToleranceSet::default(),
            restart: DEFAULT_RESTART,
            process_count: process_count.max(1),
            a: None,
            p: None,
            factors: HashMap::new(),
            a_blocks: HashMap::new(),
            built: 0,
            registry,
        }
    }

    pub fn strategy(&self) -> StrategyDescriptor {
        self.strategy
    }

    /// Number of factorizations currently cached.
    pub fn cached_factorizations(&self) -> usize {
        self.factors.len()
    }

    /// Factorizations computed over the context's lifetime.
    pub fn factorizations_built(&self) -> usize {
        self.built
    }

    fn operators(&self) -> Result<(Arc<CsrMatrix<f64>>, Arc<CsrMatrix<f64>>), KError> {
        match (&self.a, &self.p) {
            (Some(a), Some(p)) => Ok((Arc::clone(a), Arc::clone(p))),
            _ => Err(KError::NotInitialized),
        }
    }

    /// The preconditioner the strategy asks for on an unsplit block.
    fn plain_pc(pc: PcType, process_count: usize) -> LocalPc {
        match pc {
            PcType::Mlu => Box::new(LuSolver::new()),
            PcType::Ilu => Box::new(Ilu0::new()),
            PcType::BlockJacobi => Box::new(BlockJacobi::new(process_count)),
        }
    }

    fn build_pc(
        strategy: StrategyDescriptor,
        process_count: usize,
        p_local: &Mat<f64>,
        split: Option<(Vec<usize>, Vec<usize>)>,
    ) -> Result<LocalPc, KError> {
        let mut pc: LocalPc = match split {
            Some((a_idx, b_idx)) => {
                // the A-part of a Vanka block is local to one process
                let inner_type = match strategy.pc {
                    PcType::BlockJacobi => PcType::Ilu,
                    other => other,
                };
                Box::new(SchurFieldSplit::new(a_idx, b_idx, Self::plain_pc(inner_type, process_count)))
            }
            None => Self::plain_pc(strategy.pc, process_count),
        };
        pc.setup(p_local)?;
        Ok(pc)
    }

    /// Map global indices of a split part to positions inside `rows`.
    fn local_positions(rows: &[usize], part: &[usize]) -> Result<Vec<usize>, KError> {
        let pos: HashMap<usize, usize> = rows.iter().enumerate().map(|(k, &i)| (i, k)).collect();
        part.iter()
            .map(|i| {
                pos.get(i)
                    .copied()
                    .ok_or_else(|| KError::SolveError(format!("split index {i} is not in the block")))
            })
            .collect()
    }

    fn drop_stale_factors(&mut self) {
        let registry = &self.registry;
        self.factors.retain(|key, _| match key {
            FactorKey::Whole => true,
            FactorKey::Block(id) => registry.is_live(*id),
        });
        self.a_blocks.retain(|id, _| registry.is_live(*id));
    }

    /// `d ≈ A⁻¹ r` with the configured Krylov type, starting from `d = 0`.
    fn run_ksp<M: MatVec<Vec<f64>>>(
        ksp: KspType,
        restart: usize,
        conv: Convergence<f64>,
        a: &M,
        pc: &dyn Preconditioner<M, Vec<f64>>,
        r: &Vec<f64>,
        d: &mut Vec<f64>,
    ) -> Result<SolveStats<f64>, KError> {
        match ksp {
            KspType::PreOnly => PreOnlySolver::new().solve(a, Some(pc), r, d),
            KspType::Gmres => GmresSolver::new(restart, conv).solve(a, Some(pc), r, d),
        }
    }
}

impl KrylovContext for KspContext {
    fn set_strategy(&mut self, strategy: StrategyDescriptor) {
        if strategy != self.strategy {
            debug!(from = %self.strategy, to = %strategy, "strategy changed, dropping factorizations");
            self.factors.clear();
            self.strategy = strategy;
        }
    }

    fn set_tolerances(&mut self, tol: ToleranceSet) {
        self.tol = tol;
    }

    fn set_restart(&mut self, restart: usize) {
        self.restart = restart.max(1);
    }

    fn set_operators(&mut self, a: Arc<CsrMatrix<f64>>, p: Arc<CsrMatrix<f64>>) -> Result<(), KError> {
        if a.nrows() != a.ncols() {
            return Err(KError::BackendInit(format!("operator is {}x{}, not square", a.nrows(), a.ncols())));
        }
        if p.nrows() != a.nrows() || p.ncols() != a.ncols() {
            return Err(KError::BackendInit(format!(
                "preconditioning matrix is {}x{}, operator is {}x{}",
                p.nrows(),
                p.ncols(),
                a.nrows(),
                a.ncols()
            )));
        }
        if let Some(row) = p.first_empty_row() {
            return Err(KError::BackendInit(format!("row {row} of the preconditioning matrix is structurally empty")));
        }
        if self.p.as_deref() != Some(&*p) {
            self.factors.clear();
        }
        self.a_blocks.clear();
        self.a = Some(a);
        self.p = Some(p);
        Ok(())
    }

    fn reset_preconditioner(&mut self) {
        self.factors.clear();
    }

    fn solve(&mut self, target: SolveTarget<'_>, rhs: &[f64], x: &mut [f64]) -> Result<SolveStats<f64>, KError> {
        let (a, p) = self.operators()?;
        let n = a.nrows();
        if rhs.len() != n || x.len() != n {
            return Err(KError::SolveError(format!(
                "system has {} rows, got rhs of {} and x of {}",
                n,
                rhs.len(),
                x.len()
            )));
        }
        self.drop_stale_factors();
        let (strategy, process_count, restart) = (self.strategy, self.process_count, self.restart);
        let conv = Convergence::from(&self.tol);

        match target {
            SolveTarget::Whole => {
                let mut ax = vec![0.0; n];
                a.spmv(x, &mut ax);
                let r: Vec<f64> = rhs.iter().zip(&ax).map(|(b, axi)| b - axi).collect();
                let pc = match self.factors.entry(FactorKey::Whole) {
                    Entry::Occupied(e) => e.into_mut(),
                    Entry::Vacant(e) => {
                        trace!(rows = n, pc = %strategy.pc, "factorizing whole system");
                        let all: Vec<usize> = (0..n).collect();
                        let pc = Self::build_pc(strategy, process_count, &p.dense_block(&all, &all), None)?;
                        self.built += 1;
                        e.insert(pc)
                    }
                };
                let mut delta = vec![0.0; n];
                let stats = Self::run_ksp(strategy.ksp, restart, conv, &*a, &OnSparse(&**pc), &r, &mut delta)?;
                for (xi, d) in x.iter_mut().zip(&delta) {
                    *xi += d;
                }
                trace!(iterations = stats.iterations, residual = stats.final_residual, "whole system solved");
                Ok(stats)
            }
            SolveTarget::Block { is, split } => {
                self.registry.ensure_live(is)?;
                let rows = is.indices();
                if let Some(&i) = rows.iter().find(|&&i| i >= n) {
                    return Err(KError::SolveError(format!("index {i} outside a system of {n} rows")));
                }
                if let Some((a_part, b_part)) = split {
                    self.registry.ensure_live(a_part)?;
                    self.registry.ensure_live(b_part)?;
                }
                let key = FactorKey::Block(is.id());

                let r_local: Vec<f64> = rows
                    .iter()
                    .map(|&i| {
                        let (cols, vals) = a.row(i);
                        rhs[i] - cols.iter().zip(vals).map(|(&j, &v)| v * x[j]).sum::<f64>()
                    })
                    .collect();
                let a_local = self.a_blocks.entry(is.id()).or_insert_with(|| a.dense_block(rows, rows));
                let pc = match self.factors.entry(key) {
                    Entry::Occupied(e) => e.into_mut(),
                    Entry::Vacant(e) => {
                        trace!(?key, rows = rows.len(), pc = %strategy.pc, "factorizing");
                        let split = match split {
                            Some((a_part, b_part)) => Some((
                                Self::local_positions(rows, a_part.indices())?,
                                Self::local_positions(rows, b_part.indices())?,
                            )),
                            None => None,
                        };
                        let pc = Self::build_pc(strategy, process_count, &p.dense_block(rows, rows), split)?;
                        self.built += 1;
                        e.insert(pc)
                    }
                };

                let mut delta = vec![0.0; rows.len()];
                let stats = Self::run_ksp(strategy.ksp, restart, conv, &*a_local, &**pc, &r_local, &mut delta)?;
                for (&i, d) in rows.iter().zip(&delta) {
                    x[i] += d;
                }
                trace!(?key, iterations = stats.iterations, residual = stats.final_residual, "block solved");
                Ok(stats)
            }
        }
    }

    fn residual_norm(&self, rhs: &[f64], x: &[f64]) -> Result<f64, KError> {
        let (a, _) = self.operators()?;
        if rhs.len() != a.nrows() || x.len() != a.ncols() {
            return Err(KError::SolveError("residual of mismatched vectors".into()));
        }
        let mut ax = vec![0.0; a.nrows()];
        #[cfg(feature = "rayon")]
        a.spmv_parallel(x, &mut ax);
        #[cfg(not(feature = "rayon"))]
        a.spmv(x, &mut ax);
        let r: Vec<f64> = rhs.iter().zip(&ax).map(|(b, axi)| b - axi).collect();
        Ok(().norm(&r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn scaled_laplacian(n: usize, s: f64) -> Arc<CsrMatrix<f64>> {
        let mut t = Vec::new();
        for i in 0..n {
            t.push((i, i, 2.0 * s));
            if i > 0 {
                t.push((i, i - 1, -s));
            }
            if i + 1 < n {
                t.push((i, i + 1, -s));
            }
        }
        Arc::new(CsrMatrix::from_triplets(n, n, &t).unwrap())
    }

    fn laplacian(n: usize) -> Arc<CsrMatrix<f64>> {
        scaled_laplacian(n, 1.0)
    }

    fn ctx(process_count: usize) -> (Arc<IndexSetRegistry>, KspContext) {
        let reg = Arc::new(IndexSetRegistry::new());
        let ksp = KspContext::new(Arc::clone(&reg), process_count);
        (reg, ksp)
    }

    #[test]
    fn solve_before_operators_is_not_initialized() {
        let (_, mut ksp) = ctx(1);
        let mut x = vec![0.0; 2];
        assert_eq!(ksp.solve(SolveTarget::Whole, &[1.0, 1.0], &mut x).unwrap_err(), KError::NotInitialized);
    }

    #[test]
    fn direct_whole_solve_is_exact_and_cached() {
        let (_, mut ksp) = ctx(1);
        let a = laplacian(8);
        ksp.set_operators(Arc::clone(&a), a).unwrap();
        let b = vec![1.0; 8];
        let mut x = vec![0.0; 8];
        let stats = ksp.solve(SolveTarget::Whole, &b, &mut x).unwrap();
        assert_eq!(stats.iterations, 1);
        assert!(ksp.residual_norm(&b, &x).unwrap() < 1e-10);
        assert_eq!(ksp.cached_factorizations(), 1);
        ksp.reset_preconditioner();
        assert_eq!(ksp.cached_factorizations(), 0);
    }

    #[test]
    fn rebinding_the_same_p_keeps_factorizations() {
        let (_, mut ksp) = ctx(1);
        let a = laplacian(4);
        ksp.set_operators(Arc::clone(&a), Arc::clone(&a)).unwrap();
        let mut x = vec![0.0; 4];
        ksp.solve(SolveTarget::Whole, &[1.0; 4], &mut x).unwrap();
        ksp.set_operators(laplacian(4), laplacian(4)).unwrap();
        assert_eq!(ksp.cached_factorizations(), 1);
        ksp.set_operators(Arc::clone(&a), Arc::new(CsrMatrix::identity(4))).unwrap();
        assert_eq!(ksp.cached_factorizations(), 0);
    }

    #[test]
    fn block_solve_only_touches_block_rows() {
        let (reg, mut ksp) = ctx(1);
        let a = laplacian(6);
        ksp.set_operators(Arc::clone(&a), a).unwrap();
        ksp.set_strategy(StrategyDescriptor { pc: PcType::Ilu, ksp: KspType::Gmres });
        let is = reg.create(vec![1, 2]);
        let mut x = vec![0.0; 6];
        ksp.solve(SolveTarget::Block { is: &is, split: None }, &[1.0; 6], &mut x).unwrap();
        assert_eq!(x[0], 0.0);
        assert_eq!(x[3], 0.0);
        // [[2,-1],[-1,2]] d = [1,1] gives d = [1,1]
        assert_abs_diff_eq!(x[1], 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(x[2], 1.0, epsilon = 1e-10);
    }

    #[test]
    fn rebound_operator_refreshes_block_copy() {
        let (reg, mut ksp) = ctx(1);
        let a = laplacian(4);
        ksp.set_operators(Arc::clone(&a), Arc::clone(&a)).unwrap();
        ksp.set_strategy(StrategyDescriptor { pc: PcType::Ilu, ksp: KspType::Gmres });
        let is = reg.create(vec![0, 1, 2, 3]);
        let b = vec![1.0; 4];
        let mut x1 = vec![0.0; 4];
        ksp.solve(SolveTarget::Block { is: &is, split: None }, &b, &mut x1).unwrap();

        // same P, new A: the factorization stays, the A_II copy does not
        ksp.set_operators(scaled_laplacian(4, 2.0), Arc::clone(&a)).unwrap();
        assert_eq!(ksp.cached_factorizations(), 1);
        let mut x2 = vec![0.0; 4];
        ksp.solve(SolveTarget::Block { is: &is, split: None }, &b, &mut x2).unwrap();
        for (u, v) in x1.iter().zip(&x2) {
            assert_abs_diff_eq!(*u, 2.0 * v, epsilon = 1e-6);
        }
        assert_eq!(ksp.factorizations_built(), 1);
    }

    #[test]
    fn whole_gmres_solve_uses_sparse_operator() {
        let (_, mut ksp) = ctx(1);
        let a = laplacian(8);
        ksp.set_operators(Arc::clone(&a), a).unwrap();
        ksp.set_strategy(StrategyDescriptor { pc: PcType::Ilu, ksp: KspType::Gmres });
        let b = vec![1.0; 8];
        let mut x = vec![0.0; 8];
        let stats = ksp.solve(SolveTarget::Whole, &b, &mut x).unwrap();
        assert!(stats.converged);
        assert!(ksp.residual_norm(&b, &x).unwrap() < 1e-6);
        ksp.solve(SolveTarget::Whole, &b, &mut x).unwrap();
        assert_eq!(ksp.factorizations_built(), 1);
    }

    #[test]
    fn foreign_index_set_is_rejected() {
        let (_, mut ksp) = ctx(1);
        let other = IndexSetRegistry::new();
        let is = other.create(vec![0]);
        let a = laplacian(2);
        ksp.set_operators(Arc::clone(&a), a).unwrap();
        let mut x = vec![0.0; 2];
        let err = ksp.solve(SolveTarget::Block { is: &is, split: None }, &[1.0, 1.0], &mut x).unwrap_err();
        assert_eq!(err, KError::StaleIndexSet(is.id()));
    }

    #[test]
    fn operators_with_empty_rows_are_rejected() {
        let (_, mut ksp) = ctx(1);
        let a = Arc::new(CsrMatrix::from_triplets(2, 2, &[(0, 0, 1.0)]).unwrap());
        assert!(matches!(ksp.set_operators(Arc::clone(&a), a), Err(KError::BackendInit(_))));
        let rect = Arc::new(CsrMatrix::from_triplets(2, 3, &[(0, 0, 1.0), (1, 1, 1.0)]).unwrap());
        assert!(matches!(ksp.set_operators(Arc::clone(&rect), rect), Err(KError::BackendInit(_))));
    }
}
