//! # Compound MCMC
//!
//! A Markov chain transition engine which applies an ordered list of
//! heterogeneous step methods to a shared [`Point`]. Each method updates its
//! own disjoint subset of the variables, may read all of them and keeps its
//! own tuning state. Later methods see the values written by earlier ones in
//! the same transition.
//!
//! # Example
//! ```rust
//! use std::sync::Arc;
//! use compound_mcmc::{CompoundStep, Point, StepMethod};
//! use compound_mcmc::steppers::{BinaryGibbsMetropolis, Metropolis};
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! // mu ~ N(2 z, 1), z ~ Bernoulli(0.5)
//! let log_density = Arc::new(|p: &Point| {
//!     let mu = p.scalar("mu").unwrap();
//!     let z = p.scalar("z").unwrap();
//!     -0.5 * (mu - 2.0 * z).powi(2) + 0.5_f64.ln()
//! });
//!
//! let methods: Vec<Box<dyn StepMethod<StdRng>>> = vec![
//!     Box::new(Metropolis::new(vec!["mu"], log_density.clone()).unwrap()),
//!     Box::new(BinaryGibbsMetropolis::new(vec!["z"], log_density).unwrap()),
//! ];
//!
//! let mut point = Point::new().with_scalar("mu", 0.0).with_scalar("z", 0.0);
//! let mut step = CompoundStep::for_point(methods, &point).unwrap();
//! let mut rng = StdRng::seed_from_u64(0);
//!
//! for _ in 0..100 {
//!     let (next, stats) = step.transition(&mut rng, point);
//!     assert_eq!(stats.len(), 2);
//!     point = next;
//! }
//! ```

pub mod assignment;
pub mod errors;
pub mod log_density;
pub mod point;
pub mod runner;
pub mod statistics;
pub mod steppers;
pub mod utils;

mod stepper_traits;

pub use crate::log_density::{Gradient, GradientLogDensity, LogDensity};
pub use crate::point::{Point, VarId};
pub use crate::runner::{Chain, ChainTrace, Runner};
pub use crate::statistics::{Diagnostic, StepStats};
pub use crate::stepper_traits::*;
pub use crate::steppers::CompoundStep;
