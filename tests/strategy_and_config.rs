//! Strategy table and tolerance configuration seen through the public solver API.

use kryst_smoother::{
    DofLayout, FaerBackend, KError, KspType, LinearEquationSolver, PcType, SolverConfig, SolverKind,
    StrategyDescriptor, ToleranceSet, new_solver, select_strategy,
};

/// Level 0 is direct for every process count; finer levels switch on the count.
#[test]
fn strategy_table() {
    for procs in 1..=16 {
        assert_eq!(select_strategy(0, procs), StrategyDescriptor { pc: PcType::Mlu, ksp: KspType::PreOnly });
    }
    for level in 1..6 {
        assert_eq!(select_strategy(level, 1), StrategyDescriptor { pc: PcType::Ilu, ksp: KspType::Gmres });
        for procs in 2..=16 {
            assert_eq!(
                select_strategy(level, procs),
                StrategyDescriptor { pc: PcType::BlockJacobi, ksp: KspType::Gmres }
            );
        }
    }
}

/// PETSc option names parse back to the same types.
#[test]
fn petsc_names() {
    assert_eq!(PcType::from_name("bjacobi"), Some(PcType::BlockJacobi));
    assert_eq!(PcType::from_name("ILU"), Some(PcType::Ilu));
    assert_eq!(KspType::from_name("preonly"), Some(KspType::PreOnly));
    assert_eq!(StrategyDescriptor { pc: PcType::Ilu, ksp: KspType::Gmres }.to_string(), "gmres+ilu");
}

/// Non-positive tolerances are rejected and the stored set survives.
#[test]
fn invalid_tolerances_leave_previous_values() {
    let mut cfg = SolverConfig::new();
    cfg.set_tolerances(1e-4, 1e-20, 1e20, 10, 2).unwrap();
    let stored = cfg.tolerances(2);
    for bad in [0.0, -1e-8, f64::NAN] {
        assert!(matches!(cfg.set_tolerances(bad, 1e-20, 1e20, 10, 2), Err(KError::InvalidTolerance(_))));
        assert!(matches!(cfg.set_tolerances(1e-4, bad, 1e20, 10, 2), Err(KError::InvalidTolerance(_))));
        assert!(matches!(cfg.set_tolerances(1e-4, 1e-20, bad, 10, 2), Err(KError::InvalidTolerance(_))));
    }
    assert_eq!(cfg.tolerances(2), stored);
    assert_eq!(ToleranceSet::new(1e-8, 1e-40, 1e50, 4).unwrap(), ToleranceSet::default());
}

/// The boxed solvers validate tolerances the same way.
#[test]
fn boxed_solvers_validate_tolerances() {
    for kind in [SolverKind::Gmres, SolverKind::Direct] {
        let mut solver = new_solver(kind, 1, DofLayout::scalar(3), FaerBackend::serial());
        assert_eq!(solver.level(), 1);
        assert!(solver.set_tolerances(1e-6, 1e-30, 1e30, 8, 1).is_ok());
        assert!(matches!(solver.set_tolerances(1e-6, 1e-30, 1e30, 0, 1), Err(KError::InvalidTolerance(_))));
    }
}
