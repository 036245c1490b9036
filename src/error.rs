//! # Error reporting
//!
//! Errors are only raised for contract violations that a caller can fix: inconsistent shapes,
//! structures that a transformation does not support, and malformed models. Infeasible problems
//! and solvers that stop without an optimum are not errors; those are reported through
//! `solver::SolverResults`.
use thiserror::Error;

/// Highest error in the crate's error hierarchy.
#[derive(Debug, Error)]
pub enum Error {
    /// A level representation violates one of its shape invariants.
    ///
    /// For example, an objective vector whose length differs from the number of variables it
    /// refers to.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    /// The problem is well formed, but the requested transformation can't handle it.
    ///
    /// Examples are trilevel problems, integer followers where only continuous followers are
    /// supported and products of two variables owned by the same level.
    #[error("unsupported structure: {0}")]
    UnsupportedStructure(String),
    /// The authored model is inconsistent, for example a submodel refers to a variable that does
    /// not exist.
    #[error("invalid model: {0}")]
    InvalidModel(String),
    /// A numeric solver could not be used.
    #[error(transparent)]
    Solver(#[from] SolverError),
}

/// Problems with invoking a numeric solver.
///
/// A solver that runs and reports infeasibility is not an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SolverError {
    /// No back-end is registered under this name, or its cargo feature is disabled.
    #[error("numeric solver `{0}` is not available")]
    Unavailable(String),
    /// The back-end can't represent the problem it was given (e.g. quadratic constraints passed
    /// to a MILP solver).
    #[error("problem not supported by the numeric solver: {0}")]
    UnsupportedProblem(String),
    /// The back-end failed internally.
    #[error("numeric solver failed: {0}")]
    Failure(String),
}
