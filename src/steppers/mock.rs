//! Deterministic step method driven by a closure

use std::fmt;

use rand::Rng;

use crate::errors::{StepError, StepResult};
use crate::point::{Point, VarId};
use crate::statistics::StepStats;
use crate::steppers::adaptors::AdaptState;
use crate::StepMethod;

const NAME: &str = "mock";

/// Step method applying `update` to the point every transition.
///
/// Useful for wiring tests: it draws no random numbers, records how often it
/// was called and remembers the tuning flag it was given.
pub struct Mock<F> {
    vars: Vec<VarId>,
    update: F,
    calls: usize,
    tuning: bool,
}

impl<F> fmt::Debug for Mock<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Mock {{ vars: {:?}, calls: {} }}", self.vars, self.calls)
    }
}

impl<F> Mock<F>
where
    F: Fn(&Point) -> Point + Send,
{
    /// Mock step method claiming `vars`
    pub fn new<I, K>(vars: I, update: F) -> StepResult<Self>
    where
        I: IntoIterator<Item = K>,
        K: Into<VarId>,
    {
        let vars: Vec<VarId> = vars.into_iter().map(Into::into).collect();
        if vars.is_empty() {
            return Err(StepError::NoVariables);
        }
        Ok(Self {
            vars,
            update,
            calls: 0,
            tuning: false,
        })
    }

    /// Number of transitions taken
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Last tuning flag received
    pub fn is_tuning(&self) -> bool {
        self.tuning
    }
}

impl<F, R> StepMethod<R> for Mock<F>
where
    F: Fn(&Point) -> Point + Send,
    R: Rng,
{
    fn transition(&mut self, _rng: &mut R, point: Point) -> (Point, StepStats) {
        self.calls += 1;
        let next = (self.update)(&point);
        let mut stats = StepStats::new(NAME, self.tuning, 1.0);
        stats.n_steps = 1;
        stats.accepted = next != point;
        stats.accept = 1.0;
        (next, stats)
    }

    fn vars(&self) -> &[VarId] {
        &self.vars
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn set_tuning(&mut self, tuning: bool) {
        self.tuning = tuning;
    }

    fn adapt_state(&self) -> AdaptState {
        self.tuning.into()
    }

    fn reset_tuning(&mut self) {
        self.calls = 0;
    }
}
