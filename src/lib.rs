//! # Linear bilevel optimization by reformulation
//!
//! Multilevel linear problems are authored in a small algebraic modeling layer, read into a
//! matrix level representation and rewritten into single-level problems (KKT conditions with
//! complementarity, LP duals, big-M disjunctions, smoothed complementarity, near-optimal robust
//! extended formulations) that a numeric MIP or NLP solver can handle.
//!
//! The data flow is: authored `Model` → introspection → extraction → `MultilevelProblem` →
//! standard form → reformulation → numeric solver → solution recovery → authored `Model`.
#![warn(missing_docs)]

pub mod algorithm;
pub mod data;
pub mod error;
pub mod solver;

pub use error::{Error, SolverError};

#[cfg(test)]
mod tests;
