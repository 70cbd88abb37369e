use rand::Rng;

use crate::point::{Point, VarId};
use crate::statistics::StepStats;
use crate::steppers::adaptors::AdaptState;

/// A step method: a pluggable update rule for a subset of a model's variables.
///
/// `transition` may read every variable of `point` but must only change the
/// variables returned by `vars`. Given the same point, tuning state and random
/// draws it must produce the same output.
pub trait StepMethod<R: Rng>: Send {
    /// Take one step, returning the new point and statistics of the step.
    fn transition(&mut self, rng: &mut R, point: Point) -> (Point, StepStats);

    /// The variables this step method updates, in update order.
    fn vars(&self) -> &[VarId];

    /// Short name used in statistics and logs.
    fn name(&self) -> &'static str;

    /// Enable or disable tuning (warm-up phase).
    fn set_tuning(&mut self, tuning: bool);

    /// Get adaptation status.
    fn adapt_state(&self) -> AdaptState;

    /// Restore the initial tuning values, e.g. before a new warm-up.
    fn reset_tuning(&mut self) {}

    /// Take multiple steps, returning the final point and the statistics of every step.
    fn multiple_transitions(
        &mut self,
        rng: &mut R,
        point: Point,
        steps: usize,
    ) -> (Point, Vec<StepStats>) {
        (0..steps).fold((point, Vec::with_capacity(steps)), |(p, mut stats), _| {
            let (next, s) = self.transition(rng, p);
            stats.push(s);
            (next, stats)
        })
    }
}

/// Builder for the stepper of one chain.
///
/// Each chain gets its own freshly built step methods; nothing built here is
/// shared between chains.
pub trait StepperBuilder<R: Rng>: Sync {
    /// Build the stepping algorithm for one chain
    fn build(&self) -> Result<crate::steppers::CompoundStep<R>, crate::errors::CompoundError>;
}

impl<R, F> StepperBuilder<R> for F
where
    R: Rng,
    F: Fn() -> Result<crate::steppers::CompoundStep<R>, crate::errors::CompoundError> + Sync,
{
    fn build(&self) -> Result<crate::steppers::CompoundStep<R>, crate::errors::CompoundError> {
        self()
    }
}
