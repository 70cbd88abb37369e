use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use log::{debug, warn};
use rand::prelude::*;
use rayon::prelude::*;

use crate::errors::RunnerError;
use crate::log_density::LogDensity;
use crate::point::Point;
use crate::runner::{Chain, ChainTrace};
use crate::StepperBuilder;

/// # Runner for independent chains
///
/// Every chain gets its own compound step from the builder and its own
/// generator, seeded from the generator given to [`Runner::run`].
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use compound_mcmc::{CompoundStep, Point, Runner, StepMethod};
/// use compound_mcmc::errors::CompoundError;
/// use compound_mcmc::steppers::Metropolis;
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
///
/// let log_density = Arc::new(|p: &Point| -0.5 * p.scalar("x").unwrap().powi(2));
/// let init = Point::new().with_scalar("x", 0.0);
///
/// let builder = || -> Result<CompoundStep<StdRng>, CompoundError> {
///     let methods: Vec<Box<dyn StepMethod<StdRng>>> =
///         vec![Box::new(Metropolis::new(vec!["x"], log_density.clone()).unwrap())];
///     CompoundStep::new(methods, vec!["x"])
/// };
///
/// let mut rng = StdRng::seed_from_u64(0);
/// let traces = Runner::new(&builder)
///     .chains(2)
///     .warmup(100)
///     .draws(200)
///     .thinning(2)
///     .run(&mut rng, init)
///     .unwrap();
///
/// assert_eq!(traces.len(), 2);
/// assert_eq!(traces[0].draws.len(), 200);
/// ```
pub struct Runner<'a, R>
where
    R: SeedableRng + Rng + Send,
{
    /// Builds the compound step of each chain
    stepper_builder: &'a dyn StepperBuilder<R>,
    /// Number of concurrent chains to draw from
    n_chains: usize,
    /// Number of steps to adapt during
    warmup_steps: usize,
    /// Number of draws after warmup
    draws: usize,
    /// Should the warmup draws be kept
    keep_warmup: bool,
    /// Transitions per retained draw
    thinning: usize,
    /// Log density used to validate the initial point
    log_density: Option<Arc<dyn LogDensity>>,
    /// Stops all chains between transitions when raised
    interrupt: Option<Arc<AtomicBool>>,
    phantom_r: PhantomData<R>,
}

impl<'a, R> Clone for Runner<'a, R>
where
    R: SeedableRng + Rng + Send,
{
    fn clone(&self) -> Self {
        Self {
            stepper_builder: self.stepper_builder,
            n_chains: self.n_chains,
            warmup_steps: self.warmup_steps,
            draws: self.draws,
            keep_warmup: self.keep_warmup,
            thinning: self.thinning,
            log_density: self.log_density.clone(),
            interrupt: self.interrupt.clone(),
            phantom_r: PhantomData,
        }
    }
}

impl<'a, R> Runner<'a, R>
where
    R: SeedableRng + Rng + Send,
{
    /// Create a new Runner with a given stepper builder
    pub fn new(stepper_builder: &'a dyn StepperBuilder<R>) -> Self {
        Self {
            stepper_builder,
            n_chains: 1,
            warmup_steps: 1000,
            draws: 1000,
            keep_warmup: false,
            thinning: 1,
            log_density: None,
            interrupt: None,
            phantom_r: PhantomData,
        }
    }

    /// Set the number of chains to run
    pub fn chains(&self, n_chains: usize) -> Self {
        Runner {
            n_chains,
            ..self.clone()
        }
    }

    /// Set the number of warmup transitions
    pub fn warmup(&self, steps: usize) -> Self {
        Runner {
            warmup_steps: steps,
            ..self.clone()
        }
    }

    /// Keep warmup draws
    pub fn keep_warmup(&self) -> Self {
        Runner {
            keep_warmup: true,
            ..self.clone()
        }
    }

    /// Discard the warmup draws
    pub fn drop_warmup(&self) -> Self {
        Runner {
            keep_warmup: false,
            ..self.clone()
        }
    }

    /// Set the number of draws to return per chain
    pub fn draws(&self, draws: usize) -> Self {
        Runner {
            draws,
            ..self.clone()
        }
    }

    /// Set the amount of thinning (dropped intermediate draws).
    ///
    /// A thinning of 0 is treated as 1.
    pub fn thinning(&self, thinning: usize) -> Self {
        Runner {
            thinning: thinning.max(1),
            ..self.clone()
        }
    }

    /// Refuse to start from a point where `log_density` is not finite
    pub fn check_initial(&self, log_density: Arc<dyn LogDensity>) -> Self {
        Runner {
            log_density: Some(log_density),
            ..self.clone()
        }
    }

    /// Stop every chain between transitions once `flag` is raised
    pub fn interrupt(&self, flag: Arc<AtomicBool>) -> Self {
        Runner {
            interrupt: Some(flag),
            ..self.clone()
        }
    }

    /// Run the configured chains from `init`.
    ///
    /// Returns one trace per chain, in chain order.
    ///
    /// # Arguments
    /// `rng` - Random number generator the chain seeds are drawn from
    /// `init` - Initial point of every chain
    pub fn run<G: Rng>(&self, rng: &mut G, init: Point) -> Result<Vec<ChainTrace>, RunnerError> {
        if let Some(log_density) = &self.log_density {
            let ln_f = log_density.ln_f(&init);
            if !ln_f.is_finite() {
                warn!("initial point has non-finite log density {}", ln_f);
                return Err(RunnerError::NonFiniteInitialPoint(ln_f));
            }
        }

        let steps = (0..self.n_chains)
            .map(|_| self.stepper_builder.build())
            .collect::<Result<Vec<_>, _>>()?;
        let seeds: Vec<u64> = (0..self.n_chains).map(|_| rng.gen()).collect();
        debug!(
            "running {} chains: {} warmup, {} draws, thinning {}",
            self.n_chains, self.warmup_steps, self.draws, self.thinning
        );

        let (warmup_steps, draws, thinning, keep_warmup) =
            (self.warmup_steps, self.draws, self.thinning, self.keep_warmup);
        let interrupt = self.interrupt.as_deref();
        let init = &init;
        steps
            .into_par_iter()
            .zip(seeds.into_par_iter())
            .enumerate()
            .map(|(i, (step, seed))| {
                catch_unwind(AssertUnwindSafe(|| {
                    let mut chain = Chain::new(step, init.clone(), R::seed_from_u64(seed));
                    chain.run(warmup_steps, draws, thinning, keep_warmup, interrupt)
                }))
                .map_err(|_| RunnerError::ChainPanicked(i))
            })
            .collect()
    }
}
