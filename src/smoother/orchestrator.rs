//! The per-level solve driver shared by every solver of the family.
//!
//! One `Orchestrator` lives on one grid level and owns everything that level needs
//! between solves: the backend, the index partition, the Krylov/preconditioner
//! context and the tolerance table. A solve runs
//!
//! 1. lazy partition build (cached until `clear_partitions`); a whole-system request
//!    with a Schur split is treated as one block covering every DOF,
//! 2. strategy selection from the level and the backend's process count,
//! 3. `ensure_ready` on the preconditioner context,
//! 4. one restricted solve per block, in the order given,
//!
//! and reports the aggregate outcome. Non-convergence is reported, never retried.

use crate::backend::{Backend, KrylovContext, SolveTarget};
use crate::config::{SolverConfig, StrategyDescriptor};
use crate::context::PcContextManager;
use crate::error::KError;
use crate::matrix::CsrMatrix;
use crate::partition::{BuildStatus, DofLayout, IndexPartition, PartitionState};
use crate::smoother::{SolveOutcome, SolveRequest};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Maps `(level, process_count)` to the preconditioner/solver pair.
pub type StrategyFn = fn(usize, usize) -> StrategyDescriptor;

pub struct Orchestrator<B: Backend> {
    level: usize,
    layout: DofLayout,
    backend: B,
    config: SolverConfig,
    strategy_for: StrategyFn,
    partition: IndexPartition,
    pc: PcContextManager<B::Ksp>,
}

impl<B: Backend> Orchestrator<B> {
    pub fn new(level: usize, layout: DofLayout, backend: B, strategy_for: StrategyFn) -> Self {
        Self {
            level,
            layout,
            backend,
            config: SolverConfig::new(),
            strategy_for,
            partition: IndexPartition::new(),
            pc: PcContextManager::new(),
        }
    }

    /// Replace the tolerance table and restart length.
    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn layout(&self) -> &DofLayout {
        &self.layout
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Strategy the next solve will use.
    pub fn strategy(&self) -> StrategyDescriptor {
        (self.strategy_for)(self.level, self.backend.process_count())
    }

    pub fn partition_state(&self) -> PartitionState {
        self.partition.state()
    }

    pub fn partition(&self) -> &IndexPartition {
        &self.partition
    }

    pub fn is_initialized(&self) -> bool {
        self.pc.is_initialized()
    }

    pub fn pc(&self) -> &PcContextManager<B::Ksp> {
        &self.pc
    }

    /// Bind the operator and preconditioning matrix.
    pub fn init(&mut self, a: Arc<CsrMatrix<f64>>, p: Arc<CsrMatrix<f64>>) -> Result<(), KError> {
        self.pc.init(&mut self.backend, a, p)
    }

    /// Release the Krylov/preconditioner context. Partitions are kept.
    pub fn clear(&mut self) {
        self.pc.clear();
    }

    /// Destroy the cached index sets; the next block solve rebuilds them.
    pub fn clear_partitions(&mut self) {
        self.partition.clear(&mut self.backend);
    }

    pub fn set_tolerances(&mut self, rtol: f64, atol: f64, divtol: f64, max_its: usize, level: usize) -> Result<(), KError> {
        self.config.set_tolerances(rtol, atol, divtol, max_its, level)
    }

    /// One smoothing sweep over `request`, updating `x` in place.
    pub fn solve(&mut self, request: &SolveRequest<'_>, rhs: &[f64], x: &mut [f64]) -> Result<SolveOutcome, KError> {
        if !self.pc.is_initialized() {
            return Err(KError::NotInitialized);
        }
        let whole_split = request.blocks.is_empty() && request.use_schur && request.num_schur_vars > 0;
        let whole_block;
        let blocks: &[Vec<usize>] = if whole_split {
            whole_block = vec![(0..self.layout.len()).collect::<Vec<_>>()];
            &whole_block
        } else {
            request.blocks
        };
        let use_blocks = !blocks.is_empty();
        if use_blocks {
            let status = self.partition.build(
                &mut self.backend,
                &self.layout,
                blocks,
                request.num_schur_vars,
                request.use_schur,
            )?;
            if status == BuildStatus::AlreadyBuilt
                && !self.partition.matches(blocks, request.num_schur_vars, request.use_schur)
            {
                warn!(
                    level = self.level,
                    "block request differs from the cached partition; reusing the cache (clear_partitions to rebuild)"
                );
            }
        }

        let strategy = self.strategy();
        let tol = self.config.tolerances(self.level);
        debug!(level = self.level, %strategy, blocks = blocks.len(), whole_split, "smoother solve");
        let ksp = self.pc.ensure_ready(request.reset_preconditioner)?;
        ksp.set_strategy(strategy);
        ksp.set_tolerances(tol);
        ksp.set_restart(self.config.restart());

        let mut iterations = 0;
        let mut converged = true;
        if use_blocks {
            for (k, block) in self.partition.blocks().iter().enumerate() {
                let split = block.split.as_ref().map(|s| (&s.a_part, &s.b_part));
                let stats = ksp.solve(SolveTarget::Block { is: &block.whole, split }, rhs, x)?;
                trace!(block = k, iterations = stats.iterations, reason = ?stats.reason, "block done");
                iterations = iterations.max(stats.iterations);
                converged &= stats.converged;
            }
        } else {
            let stats = ksp.solve(SolveTarget::Whole, rhs, x)?;
            iterations = stats.iterations;
            converged = stats.converged;
        }

        let residual_norm = ksp.residual_norm(rhs, x)?;
        if !converged {
            warn!(level = self.level, iterations, residual_norm, "smoother sweep did not reach tolerance");
        }
        Ok(SolveOutcome { iterations, residual_norm, converged })
    }
}

impl<B: Backend> Drop for Orchestrator<B> {
    fn drop(&mut self) {
        self.partition.clear(&mut self.backend);
        self.pc.clear();
    }
}
