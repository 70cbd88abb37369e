//! # Categorical Gibbs
//!
//! Updates variables taking values in `{0, 1, .., k - 1}` one element at a time.

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
use crate::utils::sample_ln_weights;
use crate::StepMethod;

const NAME: &str = "categorical_gibbs";

/// Proposal used for each element
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Proposal {
    /// Evaluate every category and sample from the exact conditional
    Proportional,
    /// Propose a different category uniformly, accept by Metropolis-Hastings
    Uniform,
    /// `Proportional` when `k <= exact_threshold`, else `Uniform`
    Auto,
}

impl Default for Proposal {
    fn default() -> Self {
        Proposal::Auto
    }
}

/// Gibbs sampler for categorical variables with `k` categories
pub struct CategoricalGibbs<L> {
    vars: Vec<VarId>,
    log_density: Arc<L>,
    k: usize,
    proposal: Proposal,
    exact_threshold: usize,
}

impl<L> fmt::Debug for CategoricalGibbs<L> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "CategoricalGibbs {{ vars: {:?}, k: {}, proposal: {:?} }}",
            self.vars, self.k, self.proposal
        )
    }
}

impl<L: LogDensity> CategoricalGibbs<L> {
    /// New sampler over `vars`, each element taking one of `k` categories.
    pub fn new<I, K>(vars: I, k: usize, log_density: Arc<L>) -> StepResult<Self>
    where
        I: IntoIterator<Item = K>,
        K: Into<VarId>,
    {
        let vars: Vec<VarId> = vars.into_iter().map(Into::into).collect();
        if vars.is_empty() {
            return Err(StepError::NoVariables);
        }
        if k < 2 {
            return Err(StepError::TooFewCategories(k));
        }
        Ok(Self {
            vars,
            log_density,
            k,
            proposal: Proposal::default(),
            exact_threshold: 16,
        })
    }

    /// Proposal kind
    pub fn proposal(self, proposal: Proposal) -> Self {
        Self { proposal, ..self }
    }

    /// Largest `k` sampled exactly under [`Proposal::Auto`]
    pub fn exact_threshold(self, exact_threshold: usize) -> Self {
        Self {
            exact_threshold,
            ..self
        }
    }

    /// Is every element sampled from its exact conditional
    pub fn is_exact(&self) -> bool {
        match self.proposal {
            Proposal::Proportional => true,
            Proposal::Uniform => false,
            Proposal::Auto => self.k <= self.exact_threshold,
        }
    }

    fn category(&self, x: f64) -> Option<usize> {
        if x >= 0.0 && x.fract() == 0.0 && (x as usize) < self.k {
            Some(x as usize)
        } else {
            None
        }
    }

    /// Point with element `i` of variable `id` set to category `c`
    fn with_category(point: &Point, id: &str, i: usize, c: usize) -> Option<Point> {
        let mut value = point.get(id)?.clone();
        value[i] = c as f64;
        Some(point.set(id, value))
    }

    /// Exact conditional draw for one element. Returns the new point, its log density
    /// and whether any category had a finite density.
    fn exact_update<R: Rng>(
        &self,
        rng: &mut R,
        current: Point,
        id: &str,
        i: usize,
    ) -> (Point, f64, bool) {
        let candidates: Vec<Option<Point>> = (0..self.k)
            .map(|c| Self::with_category(&current, id, i, c))
            .collect();
        let ln_weights: Vec<f64> = candidates
            .iter()
            .map(|p| p.as_ref().map_or(f64::NEG_INFINITY, |p| self.log_density.ln_f(p)))
            .map(|w| if w.is_finite() { w } else { f64::NEG_INFINITY })
            .collect();

        let u: f64 = rng.gen();
        match sample_ln_weights(&ln_weights, u) {
            Some(c) => match candidates.into_iter().nth(c).flatten() {
                Some(next) => (next, ln_weights[c], true),
                None => (current, f64::NAN, false),
            },
            None => (current, f64::NAN, false),
        }
    }
}

impl<L, R> StepMethod<R> for CategoricalGibbs<L>
where
    L: LogDensity,
    R: Rng,
{
    fn transition(&mut self, rng: &mut R, point: Point) -> (Point, StepStats) {
        let scale = self.k as f64;
        let mut log_p = self.log_density.ln_f(&point);
        if !log_p.is_finite() {
            return (point, StepStats::non_finite(NAME, false, scale));
        }

        let exact = self.is_exact();
        let mut stats = StepStats::new(NAME, false, scale);
        let mut alpha_sum = 0.0;

        let mut visits: Vec<(usize, usize)> = self
            .vars
            .iter()
            .enumerate()
            .flat_map(|(v, id)| {
                let len = point.get(id).map_or(0, |x| x.len());
                (0..len).map(move |i| (v, i))
            })
            .collect();
        visits.shuffle(rng);

        let mut current = point;
        for (v, i) in visits {
            let id = self.vars[v].as_str();
            let old = match current.get(id).and_then(|x| self.category(x[i])) {
                Some(c) => c,
                None => {
                    stats.flag(Diagnostic::DegenerateProposal);
                    continue;
                }
            };
            stats.n_steps += 1;

            if exact {
                let (next, ln_f, any_finite) = self.exact_update(rng, current, id, i);
                current = next;
                if any_finite {
                    log_p = ln_f;
                    alpha_sum += 1.0;
                    stats.accepted = true;
                } else {
                    stats.flag(Diagnostic::NonFiniteLogDensity);
                }
                continue;
            }

            let mut proposed = rng.gen_range(0..self.k - 1);
            if proposed >= old {
                proposed += 1;
            }
            let candidate = match Self::with_category(&current, id, i, proposed) {
                Some(p) => p,
                None => continue,
            };
            let log_p_candidate = self.log_density.ln_f(&candidate);
            let (alpha, accepted) = {
                let update =
                    metropolis_select(rng, log_p_candidate - log_p, &candidate, &current);
                (update.alpha(), update.is_accepted())
            };
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
            "categorical gibbs on {:?} ({}): {} updates, mean acceptance {}",
            self.vars,
            if exact { "exact" } else { "uniform" },
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
