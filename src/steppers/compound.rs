//! # Compound step
//!
//! Applies an ordered list of step methods, each owning a disjoint subset of
//! the model's variables, once per chain transition. Every method sees the
//! values written by the methods before it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use itertools::Itertools;
use log::{debug, trace};
use rand::Rng;

use crate::errors::CompoundError;
use crate::point::{Point, VarId};
use crate::statistics::StepStats;
use crate::steppers::adaptors::AdaptState;
use crate::StepMethod;

/// Ordered composition of step methods partitioning a set of variables
pub struct CompoundStep<R: Rng> {
    methods: Vec<Box<dyn StepMethod<R>>>,
    vars: BTreeSet<VarId>,
}

impl<R: Rng> fmt::Debug for CompoundStep<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CompoundStep {{ {} }}", self.describe())
    }
}

/// Check that the variables of `methods` partition `declared`.
fn check_partition<R: Rng>(
    methods: &[Box<dyn StepMethod<R>>],
    declared: &BTreeSet<VarId>,
) -> Result<(), CompoundError> {
    let mut owner: BTreeMap<&VarId, usize> = BTreeMap::new();
    for (i, method) in methods.iter().enumerate() {
        if method.vars().is_empty() {
            return Err(CompoundError::EmptyMethod(i));
        }
        for var in method.vars() {
            if !declared.contains(var) {
                return Err(CompoundError::UnknownVariable {
                    method: i,
                    var: var.clone(),
                });
            }
            if let Some(first) = owner.insert(var, i) {
                return Err(CompoundError::Overlap {
                    var: var.clone(),
                    first,
                    second: i,
                });
            }
        }
    }

    let unassigned: Vec<VarId> = declared
        .iter()
        .filter(|v| !owner.contains_key(v))
        .cloned()
        .collect();
    if unassigned.is_empty() {
        Ok(())
    } else {
        Err(CompoundError::Unassigned(unassigned))
    }
}

impl<R: Rng> CompoundStep<R> {
    /// Compose `methods`, applied in the given order, over the free `variables`.
    ///
    /// Fails unless the variable subsets of the methods are pairwise disjoint
    /// and together cover exactly `variables`.
    ///
    /// # Example
    /// ```rust
    /// use std::sync::Arc;
    /// use compound_mcmc::{CompoundStep, Point, StepMethod};
    /// use compound_mcmc::errors::CompoundError;
    /// use compound_mcmc::steppers::{BinaryGibbsMetropolis, Metropolis};
    /// use rand::rngs::StdRng;
    ///
    /// let log_density = Arc::new(|p: &Point| {
    ///     let mu = p.scalar("mu").unwrap();
    ///     let z = p.scalar("z").unwrap();
    ///     -0.5 * (mu - z).powi(2)
    /// });
    ///
    /// let methods: Vec<Box<dyn StepMethod<StdRng>>> = vec![
    ///     Box::new(Metropolis::new(vec!["mu"], log_density.clone()).unwrap()),
    ///     Box::new(BinaryGibbsMetropolis::new(vec!["z", "mu"], log_density).unwrap()),
    /// ];
    ///
    /// let err = CompoundStep::new(methods, vec!["mu", "z"]).unwrap_err();
    /// assert_eq!(
    ///     err,
    ///     CompoundError::Overlap { var: "mu".to_owned(), first: 0, second: 1 }
    /// );
    /// ```
    pub fn new<I, K>(methods: Vec<Box<dyn StepMethod<R>>>, variables: I) -> Result<Self, CompoundError>
    where
        I: IntoIterator<Item = K>,
        K: Into<VarId>,
    {
        let vars: BTreeSet<VarId> = variables.into_iter().map(Into::into).collect();
        check_partition(&methods, &vars)?;
        let step = Self { methods, vars };
        debug!("compound step: {}", step.describe());
        Ok(step)
    }

    /// Compose `methods` over every variable of `point`
    pub fn for_point(methods: Vec<Box<dyn StepMethod<R>>>, point: &Point) -> Result<Self, CompoundError> {
        Self::new(methods, point.keys().cloned())
    }

    fn describe(&self) -> String {
        self.methods
            .iter()
            .map(|m| format!("{}[{}]", m.name(), m.vars().iter().join(", ")))
            .join(" -> ")
    }

    /// Member step methods in application order
    pub fn methods(&self) -> &[Box<dyn StepMethod<R>>] {
        &self.methods
    }

    /// The variables updated by this compound step
    pub fn vars(&self) -> &BTreeSet<VarId> {
        &self.vars
    }

    /// Apply every member once, in order, threading the point through them.
    ///
    /// Returns the new point and one statistics record per member, in member
    /// order.
    pub fn transition(&mut self, rng: &mut R, point: Point) -> (Point, Vec<StepStats>) {
        self.run_members(rng, point, |_| ())
    }

    /// Like [`CompoundStep::transition`], additionally returning the point
    /// after each member.
    pub fn transition_traced(
        &mut self,
        rng: &mut R,
        point: Point,
    ) -> (Point, Vec<StepStats>, Vec<Point>) {
        let mut trace = Vec::with_capacity(self.methods.len());
        let (next, stats) = self.run_members(rng, point, |p| trace.push(p.clone()));
        (next, stats, trace)
    }

    fn run_members<F>(&mut self, rng: &mut R, point: Point, mut observe: F) -> (Point, Vec<StepStats>)
    where
        F: FnMut(&Point),
    {
        let mut stats = Vec::with_capacity(self.methods.len());
        let mut current = point;
        for method in self.methods.iter_mut() {
            let before = if cfg!(debug_assertions) {
                Some(current.clone())
            } else {
                None
            };

            let (next, method_stats) = method.transition(rng, current);

            if let Some(before) = before {
                debug_assert!(
                    before.agrees_outside(&next, method.vars()),
                    "step method {} changed variables outside {:?}",
                    method.name(),
                    method.vars()
                );
            }
            trace!(
                "{}: accepted = {}, accept = {:.3}",
                method_stats.method,
                method_stats.accepted,
                method_stats.accept
            );
            observe(&next);
            stats.push(method_stats);
            current = next;
        }
        (current, stats)
    }

    /// Switch tuning on (warm-up) or off for every member
    pub fn set_tuning(&mut self, tuning: bool) {
        self.methods.iter_mut().for_each(|m| m.set_tuning(tuning))
    }

    /// Merged adaptation state of the members
    pub fn adapt_state(&self) -> AdaptState {
        self.methods
            .iter()
            .map(|m| m.adapt_state())
            .fold(AdaptState::NotApplicable, AdaptState::merge)
    }

    /// Restore the initial tuning values of every member
    pub fn reset_tuning(&mut self) {
        self.methods.iter_mut().for_each(|m| m.reset_tuning())
    }
}
