//! # Default assignment of step methods
//!
//! Chooses a step method for every free variable from the kind of values it
//! takes. The compound step does not depend on this module; callers may
//! assemble the method list any way they like.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::Rng;

use crate::errors::StepResult;
use crate::log_density::{DensityOnly, GradientLogDensity, LogDensity};
use crate::point::VarId;
use crate::steppers::{BinaryGibbsMetropolis, CategoricalGibbs, Hmc, Metropolis, Proposal};
use crate::StepMethod;

/// Kind of values a free variable takes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Support {
    /// Real valued
    Continuous,
    /// Real valued on an interval; the log density is `-inf` outside it
    Bounded,
    /// `0` or `1`
    Binary,
    /// One of `k` unordered categories
    Categorical(usize),
    /// One of `k` ordered levels
    Ordinal(usize),
}

impl Support {
    fn is_continuous(self) -> bool {
        matches!(self, Support::Continuous | Support::Bounded)
    }

    fn categories(self) -> Option<usize> {
        match self {
            Support::Categorical(k) | Support::Ordinal(k) => Some(k),
            _ => None,
        }
    }
}

/// Initial settings of the assigned step methods
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AssignmentOptions {
    /// Initial proposal scale of random walk Metropolis
    pub scale: f64,
    /// Initial leapfrog step size of HMC
    pub step_size: f64,
    /// Leapfrog steps per HMC transition
    pub n_leapfrog: usize,
    /// Flip probability of binary Gibbs
    pub transit_p: f64,
    /// Proposal of categorical Gibbs
    pub categorical: Proposal,
}

impl Default for AssignmentOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            step_size: 0.1,
            n_leapfrog: 10,
            transit_p: 0.8,
            categorical: Proposal::Auto,
        }
    }
}

fn continuous_vars(vars: &[(VarId, Support)]) -> Vec<VarId> {
    vars.iter()
        .filter(|(_, s)| s.is_continuous())
        .map(|(id, _)| id.clone())
        .collect()
}

/// Step methods for the discrete variables: one binary Gibbs over all binary
/// variables, then one categorical Gibbs per number of categories.
fn discrete_methods<L, R>(
    vars: &[(VarId, Support)],
    log_density: Arc<L>,
    options: &AssignmentOptions,
) -> StepResult<Vec<Box<dyn StepMethod<R>>>>
where
    L: LogDensity + 'static,
    R: Rng,
{
    let mut methods: Vec<Box<dyn StepMethod<R>>> = Vec::new();

    let binary: Vec<VarId> = vars
        .iter()
        .filter(|(_, s)| *s == Support::Binary)
        .map(|(id, _)| id.clone())
        .collect();
    if !binary.is_empty() {
        let method = BinaryGibbsMetropolis::new(binary, Arc::clone(&log_density))?
            .transit_p(options.transit_p)?;
        methods.push(Box::new(method));
    }

    let mut by_k: BTreeMap<usize, Vec<VarId>> = BTreeMap::new();
    for (id, support) in vars {
        if let Some(k) = support.categories() {
            by_k.entry(k).or_default().push(id.clone());
        }
    }
    for (k, ids) in by_k {
        let method = CategoricalGibbs::new(ids, k, Arc::clone(&log_density))?
            .proposal(options.categorical);
        methods.push(Box::new(method));
    }

    Ok(methods)
}

/// Assign step methods using a log density without gradient.
///
/// Continuous and bounded variables share one random walk [`Metropolis`],
/// binary variables one [`BinaryGibbsMetropolis`] and categorical or ordinal
/// variables one [`CategoricalGibbs`] per number of categories.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use compound_mcmc::{CompoundStep, Point};
/// use compound_mcmc::assignment::{default_assignment, AssignmentOptions, Support};
/// use rand::rngs::StdRng;
///
/// let log_density = Arc::new(|_: &Point| 0.0);
/// let vars = vec![
///     ("mu".to_owned(), Support::Continuous),
///     ("z".to_owned(), Support::Binary),
///     ("c".to_owned(), Support::Categorical(3)),
/// ];
/// let methods = default_assignment::<_, StdRng>(&vars, log_density, &AssignmentOptions::default())
///     .unwrap();
/// let names: Vec<&str> = methods.iter().map(|m| m.name()).collect();
/// assert_eq!(names, vec!["metropolis", "binary_gibbs_metropolis", "categorical_gibbs"]);
///
/// let step = CompoundStep::new(methods, vars.iter().map(|(id, _)| id.clone())).unwrap();
/// assert_eq!(step.methods().len(), 3);
/// ```
pub fn default_assignment<L, R>(
    vars: &[(VarId, Support)],
    log_density: Arc<L>,
    options: &AssignmentOptions,
) -> StepResult<Vec<Box<dyn StepMethod<R>>>>
where
    L: LogDensity + 'static,
    R: Rng,
{
    let mut methods: Vec<Box<dyn StepMethod<R>>> = Vec::new();
    let continuous = continuous_vars(vars);
    if !continuous.is_empty() {
        let method = Metropolis::new(continuous, Arc::clone(&log_density))?.scale(options.scale)?;
        methods.push(Box::new(method));
    }
    methods.extend(discrete_methods(vars, log_density, options)?);
    Ok(methods)
}

/// Assign step methods using a log density with gradient.
///
/// Like [`default_assignment`], but the continuous and bounded variables go
/// to a single [`Hmc`].
pub fn default_assignment_with_gradient<G, R>(
    vars: &[(VarId, Support)],
    log_density: Arc<G>,
    options: &AssignmentOptions,
) -> StepResult<Vec<Box<dyn StepMethod<R>>>>
where
    G: GradientLogDensity + 'static,
    R: Rng,
{
    let mut methods: Vec<Box<dyn StepMethod<R>>> = Vec::new();
    let continuous = continuous_vars(vars);
    if !continuous.is_empty() {
        let method = Hmc::new(continuous, Arc::clone(&log_density))?
            .step_size(options.step_size)?
            .n_steps(options.n_leapfrog)?;
        methods.push(Box::new(method));
    }
    let density = Arc::new(DensityOnly(log_density));
    methods.extend(discrete_methods(vars, density, options)?);
    Ok(methods)
}
