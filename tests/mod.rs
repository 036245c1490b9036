//! # Integration tests
//!
//! Integration tests completely external from the crate. All code written in this module could be
//! written by an external user of the crate.
//!
//! ## Note
//!
//! The tests in this module need a numeric solver and are only ran when the `microlp` feature is
//! enabled.

#[cfg(feature = "microlp")]
mod scenarios;
