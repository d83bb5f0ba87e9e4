use thiserror::Error;

// Unified error type for kryst-smoother

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KError {
    #[error("invalid partition: {0}")]
    InvalidPartition(String),
    #[error("invalid tolerance: {0}")]
    InvalidTolerance(String),
    #[error("backend rejected operator: {0}")]
    BackendInit(String),
    #[error("solver used before init()")]
    NotInitialized,
    #[error("index set {0} is not alive in this backend")]
    StaleIndexSet(usize),
    #[error("factorization error: {0}")]
    FactorError(String),
    #[error("solve error: {0}")]
    SolveError(String),
    #[error("zero pivot at row {0}")]
    ZeroPivot(usize),
}
