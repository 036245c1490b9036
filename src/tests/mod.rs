//! # Scenario tests that require a look inside the crate.
//!
//! Each module authors one small problem and checks it at the stages of the pipeline. Convention
//! for function names:
//!
//! * `fn model()`: the authored model
//! * `fn problem()`: the level representation, when built by hand
//! * `fn conversion_pipeline()`: extraction and standard form
//! * `fn solve()`: a driver end to end, needs a numeric solver
mod bard;
mod interdiction;
mod roundtrip;
