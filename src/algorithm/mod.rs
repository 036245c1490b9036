//! # Algorithms
//!
//! Transformations from an authored model down to single-level problems, and back.
pub mod extract;
pub mod introspect;
pub mod recovery;
pub mod reformulation;
pub mod standard_form;
pub mod vertex;
