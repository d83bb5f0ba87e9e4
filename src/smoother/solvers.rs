//! The two members of the solver family.

use crate::backend::Backend;
use crate::config::{StrategyDescriptor, select_strategy};
use crate::error::KError;
use crate::matrix::CsrMatrix;
use crate::partition::DofLayout;
use crate::smoother::{LinearEquationSolver, Orchestrator, SolveOutcome, SolveRequest};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::debug;

/// GMRES smoother with the level/process strategy table.
pub struct GmresSmoother<B: Backend> {
    inner: Orchestrator<B>,
}

impl<B: Backend> GmresSmoother<B> {
    pub fn new(level: usize, layout: DofLayout, backend: B) -> Self {
        let inner = Orchestrator::new(level, layout, backend, select_strategy);
        debug!(level, strategy = %inner.strategy(), "gmres smoother created");
        Self { inner }
    }
}

/// Direct solve (LU, preconditioner only) regardless of level.
pub struct DirectSolver<B: Backend> {
    inner: Orchestrator<B>,
}

impl<B: Backend> DirectSolver<B> {
    pub fn new(level: usize, layout: DofLayout, backend: B) -> Self {
        Self { inner: Orchestrator::new(level, layout, backend, |_, _| StrategyDescriptor::direct()) }
    }
}

macro_rules! impl_level_solver {
    ($ty:ident) => {
        impl<B: Backend> Deref for $ty<B> {
            type Target = Orchestrator<B>;

            fn deref(&self) -> &Orchestrator<B> {
                &self.inner
            }
        }

        impl<B: Backend> DerefMut for $ty<B> {
            fn deref_mut(&mut self) -> &mut Orchestrator<B> {
                &mut self.inner
            }
        }

        impl<B: Backend> LinearEquationSolver for $ty<B> {
            fn init(&mut self, a: Arc<CsrMatrix<f64>>, p: Arc<CsrMatrix<f64>>) -> Result<(), KError> {
                self.inner.init(a, p)
            }

            fn clear(&mut self) {
                self.inner.clear()
            }

            fn solve(&mut self, request: &SolveRequest<'_>, rhs: &[f64], x: &mut [f64]) -> Result<SolveOutcome, KError> {
                self.inner.solve(request, rhs, x)
            }

            fn set_tolerances(
                &mut self,
                rtol: f64,
                atol: f64,
                divtol: f64,
                max_its: usize,
                level: usize,
            ) -> Result<(), KError> {
                self.inner.set_tolerances(rtol, atol, divtol, max_its, level)
            }

            fn level(&self) -> usize {
                self.inner.level()
            }
        }
    };
}

impl_level_solver!(GmresSmoother);
impl_level_solver!(DirectSolver);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FaerBackend;
    use crate::config::{KspType, PcType};

    #[test]
    fn strategies_follow_the_family_member() {
        let g0 = GmresSmoother::new(0, DofLayout::scalar(2), FaerBackend::serial());
        let g2 = GmresSmoother::new(2, DofLayout::scalar(2), FaerBackend::serial());
        let d2 = DirectSolver::new(2, DofLayout::scalar(2), FaerBackend::serial());
        assert_eq!(g0.strategy(), StrategyDescriptor::direct());
        assert_eq!(g2.strategy(), StrategyDescriptor { pc: PcType::Ilu, ksp: KspType::Gmres });
        assert_eq!(d2.strategy(), StrategyDescriptor::direct());
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn multi_process_backend_selects_block_jacobi() {
        use crate::parallel::{RayonComm, UniverseComm};
        let backend = FaerBackend::new(UniverseComm::Rayon(RayonComm::with_size(3)));
        let g = GmresSmoother::new(1, DofLayout::scalar(2), backend);
        assert_eq!(g.strategy().pc, PcType::BlockJacobi);
    }
}
