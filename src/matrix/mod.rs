//! Matrix module: the compressed-row operator type handed to the smoother.

pub mod sparse;
pub use sparse::CsrMatrix;
