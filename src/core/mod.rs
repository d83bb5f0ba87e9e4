//! Core traits and their implementations for `faer` matrices and `Vec` vectors.

pub mod traits;
pub mod wrappers;
