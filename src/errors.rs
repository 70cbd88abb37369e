//! Error types
//!
//! Sampling itself never fails: degenerate situations during a transition are
//! reported through [`crate::statistics::Diagnostic`]. The errors here are the
//! construction-time checks which make a chain impossible to start.

use thiserror::Error;

use crate::point::VarId;

/// Invalid arguments to a step method constructor
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    /// The step method was given no variables to update.
    #[error("a step method needs at least one variable")]
    NoVariables,
    /// A proposal scale or step size was not a positive finite number.
    #[error("scale must be positive and finite, got {0}")]
    InvalidScale(f64),
    /// The flip probability of a binary stepper lies outside (0, 1].
    #[error("transit probability must lie in (0, 1], got {0}")]
    InvalidTransitProbability(f64),
    /// A categorical stepper needs at least two categories.
    #[error("a categorical variable needs at least two categories, got {0}")]
    TooFewCategories(usize),
    /// A gradient based stepper needs at least one integration step.
    #[error("number of leapfrog steps must be at least 1")]
    NoLeapfrogSteps,
    /// An adaptation window must contain at least one transition.
    #[error("tune interval must be at least 1")]
    InvalidTuneInterval,
    /// A target acceptance rate lies outside (0, 1).
    #[error("target acceptance must lie in (0, 1), got {0}")]
    InvalidTargetAcceptance(f64),
}

/// Violations of the partition of variables between step methods
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompoundError {
    /// Two step methods claim the same variable.
    #[error("variable `{var}` is updated by step methods {first} and {second}")]
    Overlap {
        /// Variable claimed twice
        var: VarId,
        /// Position of the first method claiming it
        first: usize,
        /// Position of the second method claiming it
        second: usize,
    },
    /// A free variable is not updated by any step method.
    #[error("variables {0:?} are not assigned to any step method")]
    Unassigned(Vec<VarId>),
    /// A step method updates a variable which is not part of the model.
    #[error("step method {method} updates unknown variable `{var}`")]
    UnknownVariable {
        /// Position of the offending method
        method: usize,
        /// Variable not present in the model
        var: VarId,
    },
    /// A step method declared no variables at all.
    #[error("step method {0} declares no variables")]
    EmptyMethod(usize),
}

/// Failures of a sampling run
#[derive(Error, Debug)]
pub enum RunnerError {
    /// The stepper could not be built.
    #[error("failed to build compound step: {0}")]
    Build(#[from] CompoundError),
    /// The oracle reported a non-finite log density for the initial point.
    #[error("initial point has non-finite log density {0}")]
    NonFiniteInitialPoint(f64),
    /// A sampling thread panicked.
    #[error("sampling thread for chain {0} panicked")]
    ChainPanicked(usize),
}

/// Result of constructing a step method
pub type StepResult<T> = std::result::Result<T, StepError>;
