//! # Linear algebra primitives
//!
//! Sparse matrices used for the coefficient blocks of the level representation.
pub mod matrix;

/// Values with an absolute value below this are treated as zero when deciding whether to store a
/// coefficient.
pub const EPSILON: f64 = 1e-12;

/// A (row or column index, value) pair.
pub type SparseTuple<F> = (usize, F);
