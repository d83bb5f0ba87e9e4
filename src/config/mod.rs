//! Solver configuration: per-level tolerances and the level/process strategy table.

pub mod options;
pub mod strategy;

pub use options::{SolverConfig, ToleranceSet};
pub use strategy::{KspType, PcType, StrategyDescriptor, select_strategy};
