//! Level/process strategy table.
//!
//! The coarsest grid is solved by one application of a direct factorization. Finer
//! grids run GMRES preconditioned with ILU(0), or with block Jacobi (one ILU(0) per
//! process, no coupling between processes) when more than one process takes part.

use std::fmt;

/// Preconditioner family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PcType {
    /// Direct (multifrontal-style) LU factorization.
    Mlu,
    /// Incomplete LU with zero fill.
    Ilu,
    /// One ILU(0) per process chunk.
    BlockJacobi,
}

/// Krylov method family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KspType {
    /// Apply the preconditioner once, no outer iteration.
    PreOnly,
    /// Restarted GMRES.
    Gmres,
}

impl PcType {
    /// Parse a PETSc-style name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "mlu" | "lu" | "mumps" => Some(Self::Mlu),
            "ilu" => Some(Self::Ilu),
            "bjacobi" | "block_jacobi" => Some(Self::BlockJacobi),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mlu => "mlu",
            Self::Ilu => "ilu",
            Self::BlockJacobi => "bjacobi",
        }
    }
}

impl KspType {
    /// Parse a PETSc-style name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "preonly" => Some(Self::PreOnly),
            "gmres" => Some(Self::Gmres),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::PreOnly => "preonly",
            Self::Gmres => "gmres",
        }
    }
}

impl fmt::Display for PcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for KspType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Preconditioner/solver pair handed to the Krylov context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrategyDescriptor {
    pub pc: PcType,
    pub ksp: KspType,
}

impl StrategyDescriptor {
    /// Direct solve: LU applied once.
    pub const fn direct() -> Self {
        Self { pc: PcType::Mlu, ksp: KspType::PreOnly }
    }
}

impl fmt::Display for StrategyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.ksp, self.pc)
    }
}

/// Strategy for a grid level given the number of participating processes.
pub fn select_strategy(level: usize, process_count: usize) -> StrategyDescriptor {
    if level == 0 {
        return StrategyDescriptor::direct();
    }
    let pc = if process_count <= 1 { PcType::Ilu } else { PcType::BlockJacobi };
    StrategyDescriptor { pc, ksp: KspType::Gmres }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coarsest_level_is_direct_for_any_process_count() {
        for procs in [1, 2, 64] {
            assert_eq!(select_strategy(0, procs), StrategyDescriptor::direct());
        }
    }

    #[test]
    fn finer_levels_depend_on_process_count() {
        assert_eq!(
            select_strategy(1, 1),
            StrategyDescriptor { pc: PcType::Ilu, ksp: KspType::Gmres }
        );
        assert_eq!(
            select_strategy(4, 8),
            StrategyDescriptor { pc: PcType::BlockJacobi, ksp: KspType::Gmres }
        );
    }

    #[test]
    fn names_round_trip() {
        for pc in [PcType::Mlu, PcType::Ilu, PcType::BlockJacobi] {
            assert_eq!(PcType::from_name(pc.name()), Some(pc));
        }
        assert_eq!(KspType::from_name("GMRES"), Some(KspType::Gmres));
        assert_eq!(KspType::from_name("cg"), None);
        assert_eq!(select_strategy(0, 1).to_string(), "preonly+mlu");
    }
}
