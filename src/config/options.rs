//! Tolerance options for the level smoothers.
//!
//! This module provides `ToleranceSet`, the `{rtol, atol, divtol, max_its}` tuple
//! handed to the Krylov context, and `SolverConfig`, which stores one set per grid
//! level. The defaults give a fixed, small iteration budget because the solver runs
//! as a multigrid smoother rather than to convergence.

use crate::error::KError;
use std::collections::BTreeMap;

/// Default relative tolerance.
pub const DEFAULT_RTOL: f64 = 1e-8;
/// Default absolute tolerance.
pub const DEFAULT_ATOL: f64 = 1e-40;
/// Default divergence tolerance.
pub const DEFAULT_DIVTOL: f64 = 1e50;
/// Default iteration budget per solve.
pub const DEFAULT_MAX_ITS: usize = 4;
/// Default GMRES restart length.
pub const DEFAULT_RESTART: usize = 30;

/// Stopping tolerances for one Krylov solve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToleranceSet {
    rtol: f64,
    atol: f64,
    divtol: f64,
    max_its: usize,
}

impl ToleranceSet {
    /// Validated constructor: all tolerances strictly positive, `max_its >= 1`.
    pub fn new(rtol: f64, atol: f64, divtol: f64, max_its: usize) -> Result<Self, KError> {
        for (name, value) in [("rtol", rtol), ("atol", atol), ("divtol", divtol)] {
            // `!(v > 0)` also rejects NaN
            if !(value > 0.0) {
                return Err(KError::InvalidTolerance(format!("{name} must be > 0, got {value}")));
            }
        }
        if max_its == 0 {
            return Err(KError::InvalidTolerance("max_its must be >= 1".into()));
        }
        Ok(Self { rtol, atol, divtol, max_its })
    }

    pub fn rtol(&self) -> f64 {
        self.rtol
    }

    pub fn atol(&self) -> f64 {
        self.atol
    }

    pub fn divtol(&self) -> f64 {
        self.divtol
    }

    pub fn max_its(&self) -> usize {
        self.max_its
    }
}

impl Default for ToleranceSet {
    fn default() -> Self {
        Self {
            rtol: DEFAULT_RTOL,
            atol: DEFAULT_ATOL,
            divtol: DEFAULT_DIVTOL,
            max_its: DEFAULT_MAX_ITS,
        }
    }
}

/// Per-level tolerances plus the GMRES restart length.
#[derive(Clone, Debug)]
pub struct SolverConfig {
    defaults: ToleranceSet,
    per_level: BTreeMap<usize, ToleranceSet>,
    restart: usize,
}

impl SolverConfig {
    pub fn new() -> Self {
        Self {
            defaults: ToleranceSet::default(),
            per_level: BTreeMap::new(),
            restart: DEFAULT_RESTART,
        }
    }

    /// Set the GMRES restart length (clamped to at least 1).
    pub fn with_restart(mut self, restart: usize) -> Self {
        self.restart = restart.max(1);
        self
    }

    pub fn restart(&self) -> usize {
        self.restart
    }

    /// Store the tolerance tuple for `level`. Invalid input leaves the config untouched.
    pub fn set_tolerances(
        &mut self,
        rtol: f64,
        atol: f64,
        divtol: f64,
        max_its: usize,
        level: usize,
    ) -> Result<(), KError> {
        let tol = ToleranceSet::new(rtol, atol, divtol, max_its)?;
        self.per_level.insert(level, tol);
        Ok(())
    }

    /// Tolerances in force for `level`.
    pub fn tolerances(&self, level: usize) -> ToleranceSet {
        self.per_level.get(&level).copied().unwrap_or(self.defaults)
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self::new()
    }
}
