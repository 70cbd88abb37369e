//! Drivers for Markov chains built from a compound step
//!
//! A [`Chain`] owns one compound step, its point and its random number
//! generator. A [`Runner`] builds a fresh compound step per chain and runs the
//! chains in parallel.

mod chain;
mod runner_builder;

pub use self::chain::{Chain, ChainTrace};
pub use self::runner_builder::Runner;
