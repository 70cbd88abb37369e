//! # Hamiltonian Monte Carlo
//!
//! Fixed path length leapfrog integration with an identity mass matrix.
//! The step size is tuned by dual averaging during warm-up.

use std::fmt;
use std::sync::Arc;

use log::{debug, trace};
use nalgebra::DVector;
use rand::Rng;
use rv::dist::Gaussian;
use rv::traits::Rv;

use crate::errors::{StepError, StepResult};
use crate::log_density::{flatten_gradient, GradientLogDensity};
use crate::point::{Point, VarId};
use crate::statistics::{Diagnostic, StepStats};
use crate::steppers::adaptors::{
    AdaptState, Adaptor, DualAverage, DualAverageOptions, ScaleAdaptor,
};
use crate::steppers::helpers::metropolis_select;
use crate::StepMethod;

const NAME: &str = "hmc";

/// Position and momentum at the end of a trajectory
struct Trajectory {
    point: Point,
    ln_f: f64,
    momentum: DVector<f64>,
    n_steps: usize,
}

/// Hamiltonian Monte Carlo over the continuous variables `vars`
pub struct Hmc<G> {
    vars: Vec<VarId>,
    log_density: Arc<G>,
    n_steps: usize,
    max_energy_error: f64,
    adaptor: DualAverage,
}

impl<G> fmt::Debug for Hmc<G> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Hmc {{ vars: {:?}, step_size: {}, n_steps: {}, adapt: {:?} }}",
            self.vars,
            self.adaptor.scale(),
            self.n_steps,
            self.adaptor.state()
        )
    }
}

impl<G: GradientLogDensity> Hmc<G> {
    /// New sampler over `vars` with step size 0.1 and 10 leapfrog steps.
    pub fn new<I, K>(vars: I, log_density: Arc<G>) -> StepResult<Self>
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
            n_steps: 10,
            max_energy_error: 1000.0,
            adaptor: DualAverage::new(DualAverageOptions::default(), 0.1)?,
        })
    }

    /// Initial leapfrog step size, keeping the adaptation settings
    pub fn step_size(self, step_size: f64) -> StepResult<Self> {
        let options = self.adaptor.options();
        self.dual_average(options, step_size)
    }

    /// Step size adaptation settings, starting from `step_size`
    pub fn dual_average(self, options: DualAverageOptions, step_size: f64) -> StepResult<Self> {
        Ok(Self {
            adaptor: DualAverage::new(options, step_size)?,
            ..self
        })
    }

    /// Number of leapfrog steps per transition
    pub fn n_steps(self, n_steps: usize) -> StepResult<Self> {
        if n_steps == 0 {
            return Err(StepError::NoLeapfrogSteps);
        }
        Ok(Self { n_steps, ..self })
    }

    /// Energy error above which a trajectory counts as divergent
    pub fn max_energy_error(self, max_energy_error: f64) -> Self {
        Self {
            max_energy_error,
            ..self
        }
    }

    /// Current leapfrog step size
    pub fn current_step_size(&self) -> f64 {
        self.adaptor.scale()
    }

    fn evaluate(&self, point: &Point) -> Option<(f64, DVector<f64>)> {
        let (ln_f, gradient) = self.log_density.ln_f_with_gradient(point);
        let gradient = flatten_gradient(&gradient, point, &self.vars);
        if ln_f.is_finite() && gradient.iter().all(|g| g.is_finite()) {
            Some((ln_f, gradient))
        } else {
            None
        }
    }

    /// Integrate from `point`. Returns `Err(steps)` when the trajectory left
    /// the region where the density and gradient are finite.
    fn leapfrog(
        &self,
        point: &Point,
        mut gradient: DVector<f64>,
        mut momentum: DVector<f64>,
        step_size: f64,
    ) -> Result<Trajectory, usize> {
        let mut position = point.flatten(&self.vars);
        let mut current = point.clone();
        let mut ln_f = f64::NAN;

        momentum.axpy(0.5 * step_size, &gradient, 1.0);
        for step in 0..self.n_steps {
            position.axpy(step_size, &momentum, 1.0);
            current = point.unflatten(&self.vars, &position);
            let (next_ln_f, next_gradient) = self.evaluate(&current).ok_or(step + 1)?;
            ln_f = next_ln_f;
            gradient = next_gradient;
            let kick = if step + 1 == self.n_steps { 0.5 } else { 1.0 };
            momentum.axpy(kick * step_size, &gradient, 1.0);
        }

        Ok(Trajectory {
            point: current,
            ln_f,
            momentum,
            n_steps: self.n_steps,
        })
    }

    fn diverged(&mut self, stats: &mut StepStats, energy_error: Option<f64>) {
        debug!(
            "hmc on {:?}: divergent trajectory (step size {}, energy error {:?})",
            self.vars, stats.scale, energy_error
        );
        stats.diverging = true;
        stats.energy_error = energy_error;
        stats.flag(Diagnostic::Divergence);
        if let Some(d) = self.adaptor.update(0.0, false) {
            stats.flag(d);
        }
    }
}

impl<G, R> StepMethod<R> for Hmc<G>
where
    G: GradientLogDensity,
    R: Rng,
{
    fn transition(&mut self, rng: &mut R, point: Point) -> (Point, StepStats) {
        let tune = self.adaptor.state().is_on();
        let step_size = self.adaptor.scale();

        let (ln_f0, gradient0) = match self.evaluate(&point) {
            Some(x) => x,
            None => {
                debug!(
                    "hmc on {:?}: non-finite log density or gradient at the current point",
                    self.vars
                );
                return (point, StepStats::non_finite(NAME, tune, step_size));
            }
        };

        let mut stats = StepStats::new(NAME, tune, step_size);
        let normal = Gaussian::standard();
        let momentum0 = DVector::from_fn(gradient0.len(), |_, _| {
            let z: f64 = normal.draw(rng);
            z
        });
        let energy0 = -ln_f0 + 0.5 * momentum0.norm_squared();

        let end = match self.leapfrog(&point, gradient0, momentum0, step_size) {
            Ok(end) => end,
            Err(n_steps) => {
                stats.n_steps = n_steps;
                self.diverged(&mut stats, None);
                return (point, stats);
            }
        };
        stats.n_steps = end.n_steps;

        let energy_error = -end.ln_f + 0.5 * end.momentum.norm_squared() - energy0;
        if !energy_error.is_finite() || energy_error > self.max_energy_error {
            self.diverged(&mut stats, Some(energy_error));
            return (point, stats);
        }
        stats.energy_error = Some(energy_error);

        let (alpha, accepted) = {
            let update = metropolis_select(rng, -energy_error, &end.point, &point);
            (update.alpha(), update.is_accepted())
        };
        trace!(
            "hmc on {:?}: step size {}, energy error {}, alpha = {}",
            self.vars,
            step_size,
            energy_error,
            alpha
        );
        stats.accept = alpha;
        stats.accepted = accepted;
        if let Some(d) = self.adaptor.update(alpha, accepted) {
            stats.flag(d);
        }

        if accepted {
            (end.point, stats)
        } else {
            (point, stats)
        }
    }

    fn vars(&self) -> &[VarId] {
        &self.vars
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn set_tuning(&mut self, tuning: bool) {
        self.adaptor.set_enabled(tuning)
    }

    fn adapt_state(&self) -> AdaptState {
        self.adaptor.state()
    }

    fn reset_tuning(&mut self) {
        self.adaptor.reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_density::Gradient;
    use crate::utils::MeanAndVariance;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    fn standard_normal() -> Arc<impl GradientLogDensity> {
        Arc::new(|p: &Point| {
            let x = p.get("x").unwrap();
            let mut g = Gradient::new();
            g.insert("x".to_owned(), -x);
            (-0.5 * x.norm_squared(), g)
        })
    }

    fn start() -> Point {
        Point::new()
            .with("x", DVector::from_vec(vec![1.0, -1.0]))
            .with_scalar("other", 3.0)
    }

    #[test]
    fn samples_standard_normal() {
        let mut rng = Xoshiro256Plus::seed_from_u64(0);
        let mut stepper = Hmc::new(vec!["x"], standard_normal())
            .and_then(|h| h.step_size(0.3))
            .unwrap();
        let mut point = start();
        let mut mv = MeanAndVariance::default();
        for _ in 0..4000 {
            point = stepper.transition(&mut rng, point).0;
            mv.push(point.get("x").unwrap()[0]);
        }
        assert::close(mv.mean, 0.0, 0.1);
        assert::close(mv.variance(), 1.0, 0.15);
        assert_eq!(point.scalar("other"), Some(3.0));
    }

    #[test]
    fn accept_matches_energy_error() {
        let mut rng = Xoshiro256Plus::seed_from_u64(1);
        let mut stepper = Hmc::new(vec!["x"], standard_normal())
            .and_then(|h| h.step_size(0.8))
            .unwrap();
        let mut point = start();
        for _ in 0..200 {
            let (next, stats) = stepper.transition(&mut rng, point);
            let energy_error = stats.energy_error.unwrap();
            assert::close(stats.accept, (-energy_error).exp().min(1.0), 1E-12);
            assert!(!stats.diverging);
            point = next;
        }
    }

    #[test]
    fn unstable_step_size_diverges() {
        let mut rng = Xoshiro256Plus::seed_from_u64(2);
        let mut stepper = Hmc::new(vec!["x"], standard_normal())
            .and_then(|h| h.step_size(5.0))
            .and_then(|h| h.n_steps(20))
            .unwrap();
        let point = start();
        let (next, stats) = stepper.transition(&mut rng, point.clone());
        assert_eq!(next, point);
        assert!(stats.diverging);
        assert!(stats.has(Diagnostic::Divergence));
        assert!(!stats.accepted);
    }

    #[test]
    fn non_finite_gradient_diverges() {
        let log_density = Arc::new(|p: &Point| {
            let x = p.scalar("x").unwrap();
            let mut g = Gradient::new();
            let slope = if x > 1.5 { f64::NAN } else { 1.0 };
            g.insert("x".to_owned(), DVector::from_element(1, slope));
            (x, g)
        });
        let mut rng = Xoshiro256Plus::seed_from_u64(3);
        let mut stepper = Hmc::new(vec!["x"], log_density)
            .and_then(|h| h.step_size(1.0))
            .unwrap();
        let point = Point::new().with_scalar("x", 1.0);
        let (next, stats) = stepper.transition(&mut rng, point.clone());
        assert_eq!(next, point);
        assert!(stats.diverging);
        assert_eq!(stats.energy_error, None);
    }

    #[test]
    fn non_finite_start_is_flagged() {
        let log_density = Arc::new(|_: &Point| (f64::NEG_INFINITY, Gradient::new()));
        let mut rng = Xoshiro256Plus::seed_from_u64(4);
        let mut stepper = Hmc::new(vec!["x"], log_density).unwrap();
        let (next, stats) = stepper.transition(&mut rng, start());
        assert_eq!(next, start());
        assert!(stats.has(Diagnostic::NonFiniteLogDensity));
        assert!(!stats.diverging);
    }

    #[test]
    fn tuning_shrinks_large_step_size() {
        let mut rng = Xoshiro256Plus::seed_from_u64(5);
        let mut stepper = Hmc::new(vec!["x"], standard_normal())
            .and_then(|h| h.step_size(3.0))
            .unwrap();
        StepMethod::<Xoshiro256Plus>::set_tuning(&mut stepper, true);
        let mut point = start();
        for _ in 0..500 {
            point = stepper.transition(&mut rng, point).0;
        }
        StepMethod::<Xoshiro256Plus>::set_tuning(&mut stepper, false);
        let tuned = stepper.current_step_size();
        assert!(tuned < 3.0);

        let (_, stats) = stepper.transition(&mut rng, point);
        assert_eq!(stats.scale, tuned);
        assert!(!stats.tune);
    }

    #[test]
    fn collapsed_acceptance_is_reported_while_tuning() {
        let log_density = Arc::new(|p: &Point| {
            let x = p.scalar("x").unwrap();
            let mut g = Gradient::new();
            g.insert("x".to_owned(), DVector::from_element(1, 0.0));
            (if x == 1.0 { 0.0 } else { f64::NAN }, g)
        });
        let options = DualAverageOptions {
            window: 5,
            ..DualAverageOptions::default()
        };
        let mut rng = Xoshiro256Plus::seed_from_u64(6);
        let mut stepper = Hmc::new(vec!["x"], log_density)
            .and_then(|h| h.dual_average(options, 1.0))
            .and_then(|h| h.step_size(0.5))
            .unwrap();
        assert_eq!(stepper.adaptor.options(), options);
        StepMethod::<Xoshiro256Plus>::set_tuning(&mut stepper, true);
        let point = Point::new().with_scalar("x", 1.0);
        let flagged: Vec<bool> = (0..10)
            .map(|_| {
                let (_, stats) = stepper.transition(&mut rng, point.clone());
                assert!(stats.diverging);
                stats.has(Diagnostic::AcceptanceCollapsed)
            })
            .collect();
        assert_eq!(
            flagged,
            vec![false, false, false, false, true, false, false, false, false, true]
        );
    }

    #[test]
    fn zero_leapfrog_steps_is_an_error() {
        let err = Hmc::new(vec!["x"], standard_normal())
            .and_then(|h| h.n_steps(0))
            .unwrap_err();
        assert_eq!(err, StepError::NoLeapfrogSteps);
    }
}
