//! Evaluation Strategies
//!
//! - Sequential: one expression per lock acquisition (the default path)
//! - Parallel: batches of expressions and large captures, via Rayon

pub mod parallel;
