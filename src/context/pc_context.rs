//! Lifetime of the Krylov/preconditioner context across repeated solves.
//!
//! The manager owns the backend context, binds operators on `init`, and decides
//! before every solve whether the cached preconditioner factorization may be reused.
//! Reuse is allowed while the preconditioning matrix is unchanged since the last
//! factorization and the caller did not ask for a reset; this is what lets a
//! nonlinear loop keep one factorization across iterations with the same Jacobian.

use crate::backend::{Backend, KrylovContext};
use crate::error::KError;
use crate::matrix::CsrMatrix;
use std::sync::Arc;
use tracing::debug;

/// Whether the manager currently holds a backend context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PcState {
    Uninitialized,
    /// Operators bound; the next solve must factorize.
    NeedsFactorization,
    /// Operators bound; cached factorizations may be reused.
    Ready,
}

pub struct PcContextManager<K> {
    ksp: Option<K>,
    /// Copy of P taken at the last `init`, compared against the next one.
    p_cached: Option<CsrMatrix<f64>>,
    state: PcState,
}

impl<K: KrylovContext> PcContextManager<K> {
    pub fn new() -> Self {
        Self { ksp: None, p_cached: None, state: PcState::Uninitialized }
    }

    pub fn state(&self) -> PcState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state != PcState::Uninitialized
    }

    /// The backend context, if one is held.
    pub fn context(&self) -> Option<&K> {
        self.ksp.as_ref()
    }

    /// Bind `a` and `p`, allocating the backend context on first use.
    ///
    /// A new `a` is always bound. If `p` equals the matrix bound previously, existing
    /// factorizations stay valid.
    /// A backend rejection releases the context before the error is returned.
    pub fn init<B>(&mut self, backend: &mut B, a: Arc<CsrMatrix<f64>>, p: Arc<CsrMatrix<f64>>) -> Result<(), KError>
    where
        B: Backend<Ksp = K>,
    {
        let unchanged = self.is_initialized() && self.p_cached.as_ref() == Some(&*p);
        let ksp = self.ksp.get_or_insert_with(|| backend.create_ksp());
        if let Err(err) = ksp.set_operators(a, Arc::clone(&p)) {
            debug!(%err, "backend rejected operators");
            self.clear();
            return Err(err);
        }
        if unchanged {
            debug!("preconditioning matrix unchanged, factorization kept");
            return Ok(());
        }
        self.p_cached = Some((*p).clone());
        self.state = PcState::NeedsFactorization;
        debug!(rows = p.nrows(), nnz = p.nnz(), "operators bound");
        Ok(())
    }

    /// Release the context and the cached P. Safe to call repeatedly.
    pub fn clear(&mut self) {
        self.ksp = None;
        self.p_cached = None;
        self.state = PcState::Uninitialized;
    }

    /// Context ready for a solve; refactorizes when `reset` or P changed.
    pub fn ensure_ready(&mut self, reset: bool) -> Result<&mut K, KError> {
        let ksp = self.ksp.as_mut().ok_or(KError::NotInitialized)?;
        if reset || self.state == PcState::NeedsFactorization {
            debug!(reset, "preconditioner will be recomputed");
            ksp.reset_preconditioner();
            self.state = PcState::Ready;
        }
        Ok(ksp)
    }
}

impl<K: KrylovContext> Default for PcContextManager<K> {
    fn default() -> Self {
        Self::new()
    }
}
