//! Symmetric Random Walk Metropolis

use std::fmt;
use std::sync::Arc;

use log::{debug, trace};
use nalgebra::DVector;
use rand::Rng;
use rv::dist::Gaussian;
use rv::traits::Rv;

use crate::errors::{StepError, StepResult};
use crate::log_density::LogDensity;
use crate::point::{Point, VarId};
use crate::statistics::{Diagnostic, StepStats};
use crate::steppers::adaptors::{
    AdaptState, Adaptor, ScaleAdaptor, SimpleAdaptor, SimpleAdaptorOptions,
};
use crate::steppers::helpers::metropolis_select;
use crate::StepMethod;

const NAME: &str = "metropolis";

/// Symmetric Random Walk Metropolis Stepping Algorithm
///
/// All assigned variables are perturbed jointly by independent Gaussian
/// noise with standard deviation `scale * proposal_sd[i]` and the move is
/// accepted with probability `min(1, p(new) / p(old))`.
pub struct Metropolis<L> {
    /// Variables updated by this stepper
    vars: Vec<VarId>,
    /// Joint log density
    log_density: Arc<L>,
    /// Relative proposal standard deviation per element
    proposal_sd: Option<DVector<f64>>,
    /// Adaptor used to tune the proposal scale
    adaptor: SimpleAdaptor,
}

impl<L> fmt::Debug for Metropolis<L> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Metropolis {{ vars: {:?}, scale: {}, adapt: {:?} }}",
            self.vars,
            self.adaptor.scale(),
            self.adaptor.state()
        )
    }
}

impl<L: LogDensity> Metropolis<L> {
    /// Returns a new random walk stepper for `vars` with unit proposal scale.
    ///
    /// # Example
    /// ```rust
    /// use std::sync::Arc;
    /// use compound_mcmc::{Point, StepMethod};
    /// use compound_mcmc::steppers::Metropolis;
    /// use rand::SeedableRng;
    /// use rand::rngs::StdRng;
    ///
    /// let log_density = Arc::new(|p: &Point| -0.5 * p.scalar("x").unwrap().powi(2));
    /// let mut stepper = Metropolis::new(vec!["x"], log_density)
    ///     .and_then(|m| m.scale(0.5))
    ///     .unwrap();
    ///
    /// let mut rng = StdRng::seed_from_u64(0);
    /// let (next, stats) = stepper.transition(&mut rng, Point::new().with_scalar("x", 0.0));
    /// assert!(next.contains("x"));
    /// assert_eq!(stats.scale, 0.5);
    /// ```
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
            proposal_sd: None,
            adaptor: SimpleAdaptor::new(1.0, SimpleAdaptorOptions::default())?,
        })
    }

    /// Set the initial proposal scale, keeping the adaptor options
    pub fn scale(self, scale: f64) -> StepResult<Self> {
        let options = self.adaptor.options();
        self.adaptor_options(scale, options)
    }

    /// Replace the adaptor with one starting at `scale` using `options`
    pub fn adaptor_options(self, scale: f64, options: SimpleAdaptorOptions) -> StepResult<Self> {
        Ok(Self {
            adaptor: SimpleAdaptor::new(scale, options)?,
            ..self
        })
    }

    /// Use per-element relative proposal standard deviations.
    ///
    /// Elements beyond the length of `sd` use a relative standard deviation of 1.
    pub fn proposal_sd(self, sd: DVector<f64>) -> StepResult<Self> {
        if let Some(bad) = sd.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(StepError::InvalidScale(*bad));
        }
        Ok(Self {
            proposal_sd: Some(sd),
            ..self
        })
    }

    /// Current proposal scale
    pub fn current_scale(&self) -> f64 {
        self.adaptor.scale()
    }

    fn propose<R: Rng>(&self, rng: &mut R, current: &DVector<f64>, scale: f64) -> DVector<f64> {
        let noise = Gaussian::standard();
        DVector::from_fn(current.len(), |i, _| {
            let sd = self
                .proposal_sd
                .as_ref()
                .and_then(|sd| sd.get(i).copied())
                .unwrap_or(1.0);
            let z: f64 = noise.draw(rng);
            current[i] + scale * sd * z
        })
    }
}

impl<L, R> StepMethod<R> for Metropolis<L>
where
    L: LogDensity,
    R: Rng,
{
    fn transition(&mut self, rng: &mut R, point: Point) -> (Point, StepStats) {
        let tune = self.adaptor.state().is_on();
        let scale = self.adaptor.scale();

        let current_ln_f = self.log_density.ln_f(&point);
        if !current_ln_f.is_finite() {
            debug!(
                "metropolis on {:?}: current log density is {}, skipping update",
                self.vars, current_ln_f
            );
            return (point, StepStats::non_finite(NAME, tune, scale));
        }

        let mut stats = StepStats::new(NAME, tune, scale);
        stats.n_steps = 1;

        let current = point.flatten(&self.vars);
        let proposed = self.propose(rng, &current, scale);
        if proposed.iter().any(|x| !x.is_finite()) {
            stats.flag(Diagnostic::DegenerateProposal);
            if let Some(d) = self.adaptor.update(0.0, false) {
                stats.flag(d);
            }
            return (point, stats);
        }

        let proposed_point = point.unflatten(&self.vars, &proposed);
        let proposed_ln_f = self.log_density.ln_f(&proposed_point);

        let (alpha, accepted) = {
            let update = metropolis_select(
                rng,
                proposed_ln_f - current_ln_f,
                &proposed_point,
                &point,
            );
            (update.alpha(), update.is_accepted())
        };
        trace!(
            "metropolis on {:?}: ln_f {} -> {}, alpha = {}",
            self.vars,
            current_ln_f,
            proposed_ln_f,
            alpha
        );

        stats.accept = alpha;
        stats.accepted = accepted;
        if let Some(d) = self.adaptor.update(alpha, accepted) {
            stats.flag(d);
        }

        if accepted {
            (proposed_point, stats)
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
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;
    use std::sync::Mutex;

    fn standard_normal() -> Arc<impl LogDensity> {
        Arc::new(|p: &Point| {
            let x = p.scalar("x").unwrap();
            -0.5 * x * x
        })
    }

    fn start() -> Point {
        Point::new().with_scalar("x", 0.0).with_scalar("y", 7.0)
    }

    #[test]
    fn leaves_other_variables_alone() {
        let mut rng = Xoshiro256Plus::seed_from_u64(0);
        let mut stepper = Metropolis::new(vec!["x"], standard_normal()).unwrap();
        let mut point = start();
        for _ in 0..200 {
            let (next, _) = stepper.transition(&mut rng, point.clone());
            assert!(point.agrees_outside(&next, &["x".to_owned()]));
            point = next;
        }
    }

    #[test]
    fn acceptance_probability_is_density_ratio() {
        // Record the proposals the stepper evaluates.
        let seen: Arc<Mutex<Vec<f64>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_ln_f = Arc::clone(&seen);
        let log_density = Arc::new(move |p: &Point| {
            let x = p.scalar("x").unwrap();
            seen_ln_f.lock().unwrap().push(x);
            -0.5 * x * x
        });
        let ln_f = |x: f64| -0.5 * x * x;

        let mut rng = Xoshiro256Plus::seed_from_u64(1);
        let mut stepper = Metropolis::new(vec!["x"], log_density)
            .and_then(|m| m.scale(2.0))
            .unwrap();
        let mut point = start().set("x", DVector::from_element(1, 0.7));

        for _ in 0..100 {
            seen.lock().unwrap().clear();
            let (next, stats) = stepper.transition(&mut rng, point.clone());
            let (a, b) = {
                let s = seen.lock().unwrap();
                (s[0], s[1])
            };
            let expected = (ln_f(b) - ln_f(a)).exp().min(1.0);
            assert::close(stats.accept, expected, 1E-12);
            if stats.accepted {
                assert_eq!(next.scalar("x"), Some(b));
            } else {
                assert_eq!(next, point);
            }
            point = next;
        }
    }

    #[test]
    fn always_rejected_proposals_keep_the_point() {
        let log_density = Arc::new(|p: &Point| {
            if p.scalar("x") == Some(0.0) {
                0.0
            } else {
                f64::NEG_INFINITY
            }
        });
        let mut rng = Xoshiro256Plus::seed_from_u64(2);
        let mut stepper = Metropolis::new(vec!["x"], log_density).unwrap();
        let point = start();
        for _ in 0..100 {
            let (next, stats) = stepper.transition(&mut rng, point.clone());
            assert_eq!(next, point);
            assert!(!stats.accepted);
            assert_eq!(stats.accept, 0.0);
            assert!(stats.diagnostics.is_empty());
        }
    }

    #[test]
    fn infinite_proposals_are_rejected() {
        let log_density = Arc::new(|p: &Point| {
            let x = p.scalar("x").unwrap();
            if x > 1.0 {
                f64::INFINITY
            } else {
                -0.5 * x * x
            }
        });
        let mut rng = Xoshiro256Plus::seed_from_u64(0);
        let mut stepper = Metropolis::new(vec!["x"], log_density)
            .and_then(|m| m.scale(2.0))
            .unwrap();
        let mut point = start();
        let mut n_rejected = 0;
        for _ in 0..200 {
            let (next, stats) = stepper.transition(&mut rng, point);
            assert!(next.scalar("x").unwrap() <= 1.0);
            assert!(!stats.has(Diagnostic::NonFiniteLogDensity));
            if !stats.accepted {
                n_rejected += 1;
            }
            point = next;
        }
        assert!(n_rejected > 0);
    }

    #[test]
    fn scale_keeps_adaptor_options() {
        let options = SimpleAdaptorOptions {
            tune_interval: 10,
            max_factor: 1.5,
        };
        let stepper = Metropolis::new(vec!["x"], standard_normal())
            .and_then(|m| m.adaptor_options(1.0, options))
            .and_then(|m| m.scale(3.0))
            .unwrap();
        assert_eq!(stepper.current_scale(), 3.0);
        assert_eq!(stepper.adaptor.options(), options);
    }

    #[test]
    fn non_finite_current_density_is_flagged() {
        let log_density = Arc::new(|_: &Point| f64::NAN);
        let mut rng = Xoshiro256Plus::seed_from_u64(3);
        let mut stepper = Metropolis::new(vec!["x"], log_density).unwrap();
        let (next, stats) = stepper.transition(&mut rng, start());
        assert_eq!(next, start());
        assert!(stats.has(Diagnostic::NonFiniteLogDensity));
        assert!(!stats.accepted);
    }

    #[test]
    fn samples_standard_normal() {
        let mut rng = Xoshiro256Plus::seed_from_u64(4);
        let mut stepper = Metropolis::new(vec!["x"], standard_normal())
            .and_then(|m| m.scale(2.4))
            .unwrap();
        let (_, xs) = (0..20_000).fold((start(), Vec::new()), |(p, mut xs), _| {
            let (next, _) = stepper.transition(&mut rng, p);
            xs.push(next.scalar("x").unwrap());
            (next, xs)
        });
        let mean = xs.iter().sum::<f64>() / xs.len() as f64;
        let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / xs.len() as f64;
        assert::close(mean, 0.0, 0.1);
        assert::close(var, 1.0, 0.15);
    }

    #[test]
    fn tuning_moves_scale_and_freezes() {
        let mut rng = Xoshiro256Plus::seed_from_u64(5);
        let mut stepper = Metropolis::new(vec!["x"], standard_normal())
            .and_then(|m| m.scale(100.0))
            .unwrap();
        StepMethod::<Xoshiro256Plus>::set_tuning(&mut stepper, true);
        let mut point = start();
        for _ in 0..1000 {
            point = stepper.transition(&mut rng, point).0;
        }
        let tuned = stepper.current_scale();
        assert!(tuned < 100.0);

        StepMethod::<Xoshiro256Plus>::set_tuning(&mut stepper, false);
        for _ in 0..500 {
            let (next, stats) = stepper.transition(&mut rng, point);
            assert_eq!(stats.scale, tuned);
            assert!(!stats.tune);
            point = next;
        }
        assert_eq!(stepper.current_scale(), tuned);
    }

    #[test]
    fn vector_variables_use_proposal_sd() {
        let log_density = Arc::new(|p: &Point| {
            let v = p.get("v").unwrap();
            -0.5 * v.dot(v)
        });
        let mut rng = Xoshiro256Plus::seed_from_u64(6);
        let mut stepper = Metropolis::new(vec!["v"], log_density)
            .and_then(|m| m.proposal_sd(DVector::from_vec(vec![1.0, 1E-12])))
            .unwrap();
        let mut point = Point::new().with("v", DVector::from_vec(vec![0.0, 0.0]));
        for _ in 0..100 {
            point = stepper.transition(&mut rng, point).0;
        }
        assert!(point.get("v").unwrap()[1].abs() < 1E-9);
    }

    #[test]
    fn rejects_bad_construction() {
        let empty: Vec<&str> = vec![];
        assert_eq!(
            Metropolis::new(empty, standard_normal()).unwrap_err(),
            StepError::NoVariables
        );
        assert_eq!(
            Metropolis::new(vec!["x"], standard_normal())
                .and_then(|m| m.scale(-1.0))
                .unwrap_err(),
            StepError::InvalidScale(-1.0)
        );
    }
}
