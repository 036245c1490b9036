//! # Storing of multilevel problems in memory
//!
//! This module provides the data structures used to represent problems: the algebraic `model`
//! that problems are authored in, the matrix `level` representation that transformations read
//! and the sparse linear algebra underneath. Algorithms may introduce their specific data
//! structures in `algorithm::my_algorithm`.
pub mod elements;
pub mod level;
pub mod linear_algebra;
pub mod model;
