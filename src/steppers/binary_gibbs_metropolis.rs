//! # Binary Gibbs Metropolis Algorithm
//! Preforms sampling on binary random variables.

use std::fmt;
use std::sync::Arc;

use log::trace;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::errors::{StepError, StepResult};
use crate::log_density::LogDensity;
use crate::point::{Point, VarId};
use crate::statistics::{Diagnostic, StepStats};
use crate::steppers::adaptors::AdaptState;
use crate::steppers::helpers::metropolis_select;
use crate::StepMethod;

const NAME: &str = "binary_gibbs_metropolis";

/// Order in which elements are visited during one transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisitOrder {
    /// Shuffle the elements every transition
    Random,
    /// Visit elements in variable then index order
    Fixed,
}

impl Default for VisitOrder {
    fn default() -> Self {
        VisitOrder::Random
    }
}

/// Element-wise flip proposals for `{0, 1}` valued variables.
///
/// Every element of every assigned variable is proposed to flip with
/// probability `transit_p`; each flip is accepted or rejected on its own, so
/// later elements see the outcome of earlier ones.
pub struct BinaryGibbsMetropolis<L> {
    vars: Vec<VarId>,
    log_density: Arc<L>,
    transit_p: f64,
    order: VisitOrder,
}

impl<L> fmt::Debug for BinaryGibbsMetropolis<L> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "BinaryGibbsMetropolis {{ vars: {:?}, transit_p: {}, order: {:?} }}",
            self.vars, self.transit_p, self.order
        )
    }
}

impl<L: LogDensity> BinaryGibbsMetropolis<L> {
    /// New stepper over `vars` with `transit_p = 0.8` and random visit order.
    pub fn new<I, K>(vars: I, log_density: Arc<L>) -> StepResult<Self>
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
            log_density,
            transit_p: 0.8,
            order: VisitOrder::default(),
        })
    }

    /// Probability of proposing a flip for each element, in `(0, 1]`
    pub fn transit_p(self, transit_p: f64) -> StepResult<Self> {
        if !(transit_p > 0.0 && transit_p <= 1.0) {
            return Err(StepError::InvalidTransitProbability(transit_p));
        }
        Ok(Self { transit_p, ..self })
    }

    /// Element visit order
    pub fn order(self, order: VisitOrder) -> Self {
        Self { order, ..self }
    }

    /// (variable index, element index) pairs to visit this transition
    fn visits<R: Rng>(&self, rng: &mut R, point: &Point) -> Vec<(usize, usize)> {
        let mut visits: Vec<(usize, usize)> = self
            .vars
            .iter()
            .enumerate()
            .flat_map(|(v, id)| {
                let len = point.get(id).map_or(0, |x| x.len());
                (0..len).map(move |i| (v, i))
            })
            .collect();
        if self.order == VisitOrder::Random {
            visits.shuffle(rng);
        }
        visits
    }
}

impl<L, R> StepMethod<R> for BinaryGibbsMetropolis<L>
where
    L: LogDensity,
    R: Rng,
{
    fn transition(&mut self, rng: &mut R, point: Point) -> (Point, StepStats) {
        let mut log_p = self.log_density.ln_f(&point);
        if !log_p.is_finite() {
            return (point, StepStats::non_finite(NAME, false, self.transit_p));
        }

        let mut stats = StepStats::new(NAME, false, self.transit_p);
        let mut alpha_sum = 0.0;
        let mut current = point;

        for (v, i) in self.visits(rng, &current) {
            if rng.gen::<f64>() >= self.transit_p {
                continue;
            }
            let id = &self.vars[v];
            let value = match current.get(id) {
                Some(x) => x,
                None => continue,
            };
            let bit = value[i];
            if bit != 0.0 && bit != 1.0 {
                stats.flag(Diagnostic::DegenerateProposal);
                continue;
            }
            let mut flipped = value.clone();
            flipped[i] = 1.0 - bit;
            let candidate = current.set(id, flipped);
            let log_p_candidate = self.log_density.ln_f(&candidate);

            let (alpha, accepted) = {
                let update =
                    metropolis_select(rng, log_p_candidate - log_p, &candidate, &current);
                (update.alpha(), update.is_accepted())
            };
            stats.n_steps += 1;
            alpha_sum += alpha;
            if accepted {
                stats.accepted = true;
                log_p = log_p_candidate;
                current = candidate;
            }
        }

        if stats.n_steps > 0 {
            stats.accept = alpha_sum / stats.n_steps as f64;
        }
        trace!(
            "binary gibbs on {:?}: {} proposals, mean acceptance {}",
            self.vars,
            stats.n_steps,
            stats.accept
        );
        (current, stats)
    }

    fn vars(&self) -> &[VarId] {
        &self.vars
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn set_tuning(&mut self, _tuning: bool) {}

    fn adapt_state(&self) -> AdaptState {
        AdaptState::NotApplicable
    }
}
