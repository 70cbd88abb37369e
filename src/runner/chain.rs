use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, trace};
use rand::Rng;

use crate::point::Point;
use crate::statistics::StepStats;
use crate::steppers::CompoundStep;

/// Draws and statistics of one chain
#[derive(Clone, Debug, Default)]
pub struct ChainTrace {
    /// Retained points; warm-up points first when they were kept
    pub draws: Vec<Point>,
    /// Statistics of every transition taken, warm-up included
    pub stats: Vec<Vec<StepStats>>,
    /// Number of leading entries of `draws` which are warm-up points
    pub n_warmup: usize,
    /// Was the run stopped by the interrupt flag
    pub interrupted: bool,
}

impl ChainTrace {
    /// Retained post warm-up points
    pub fn samples(&self) -> &[Point] {
        &self.draws[self.n_warmup..]
    }
}

/// A single Markov chain
pub struct Chain<R: Rng> {
    step: CompoundStep<R>,
    point: Point,
    rng: R,
    tuning: Option<bool>,
}

impl<R: Rng> Chain<R> {
    /// Start a chain at `point`
    pub fn new(step: CompoundStep<R>, point: Point, rng: R) -> Self {
        Self {
            step,
            point,
            rng,
            tuning: None,
        }
    }

    /// Current state of the chain
    pub fn point(&self) -> &Point {
        &self.point
    }

    /// The compound step driving this chain
    pub fn compound_step(&self) -> &CompoundStep<R> {
        &self.step
    }

    /// Take one transition, with tuning on during warm-up.
    pub fn step(&mut self, tuning: bool) -> Vec<StepStats> {
        if self.tuning != Some(tuning) {
            debug!("chain: tuning {}", if tuning { "on" } else { "off" });
            self.step.set_tuning(tuning);
            self.tuning = Some(tuning);
        }
        let point = self.point.clone();
        let (next, stats) = self.step.transition(&mut self.rng, point);
        self.point = next;
        stats
    }

    /// Run `n_tune` warm-up transitions followed by `n_draws * thinning`
    /// sampling transitions, keeping every `thinning`-th sampled point.
    ///
    /// The interrupt flag is checked before every transition. An interrupted
    /// run returns everything completed so far.
    pub fn run(
        &mut self,
        n_tune: usize,
        n_draws: usize,
        thinning: usize,
        keep_warmup: bool,
        interrupt: Option<&AtomicBool>,
    ) -> ChainTrace {
        let thinning = thinning.max(1);
        let mut trace = ChainTrace::default();
        let interrupted = || interrupt.map_or(false, |flag| flag.load(Ordering::Relaxed));

        for _ in 0..n_tune {
            if interrupted() {
                trace.interrupted = true;
                return trace;
            }
            trace.stats.push(self.step(true));
            if keep_warmup {
                trace.draws.push(self.point.clone());
                trace.n_warmup += 1;
            }
        }

        for i in 0..n_draws * thinning {
            if interrupted() {
                trace.interrupted = true;
                break;
            }
            trace.stats.push(self.step(false));
            if (i + 1) % thinning == 0 {
                trace.draws.push(self.point.clone());
            }
        }
        trace!(
            "chain finished: {} transitions, {} draws",
            trace.stats.len(),
            trace.draws.len()
        );
        trace
    }

    /// Give back the compound step, final point and generator
    pub fn into_parts(self) -> (CompoundStep<R>, Point, R) {
        (self.step, self.point, self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steppers::Mock;
    use crate::StepMethod;
    use nalgebra::DVector;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    fn counting_chain() -> Chain<Xoshiro256Plus> {
        let count: Box<dyn StepMethod<Xoshiro256Plus>> = Box::new(
            Mock::new(vec!["n"], |p: &Point| {
                let n = p.scalar("n").unwrap();
                p.set("n", DVector::from_element(1, n + 1.0))
            })
            .unwrap(),
        );
        let point = Point::new().with_scalar("n", 0.0);
        let step = CompoundStep::for_point(vec![count], &point).unwrap();
        Chain::new(step, point, Xoshiro256Plus::seed_from_u64(0))
    }

    fn values(points: &[Point]) -> Vec<f64> {
        points.iter().map(|p| p.scalar("n").unwrap()).collect()
    }

    #[test]
    fn keeps_warmup_when_asked() {
        let trace = counting_chain().run(10, 10, 1, true, None);
        assert_eq!(trace.draws.len(), 20);
        assert_eq!(trace.n_warmup, 10);
        let expected: Vec<f64> = (1..21).map(f64::from).collect();
        assert_eq!(values(&trace.draws), expected);
        assert_eq!(values(trace.samples()), expected[10..].to_vec());
    }

    #[test]
    fn thinning_keeps_every_nth() {
        let trace = counting_chain().run(5, 4, 3, false, None);
        assert_eq!(trace.n_warmup, 0);
        assert_eq!(values(&trace.draws), vec![8.0, 11.0, 14.0, 17.0]);
        assert_eq!(trace.stats.len(), 5 + 12);
        assert!(trace.stats[..5].iter().all(|s| s[0].tune));
        assert!(trace.stats[5..].iter().all(|s| !s[0].tune));
    }

    #[test]
    fn raised_interrupt_stops_before_any_transition() {
        let flag = AtomicBool::new(true);
        let mut chain = counting_chain();
        let trace = chain.run(10, 10, 1, true, Some(&flag));
        assert!(trace.interrupted);
        assert!(trace.draws.is_empty());
        assert!(trace.stats.is_empty());
        assert_eq!(chain.point().scalar("n"), Some(0.0));
    }

    #[test]
    fn step_switches_tuning() {
        let mut chain = counting_chain();
        chain.step(true);
        assert!(chain.compound_step().adapt_state().is_on());
        chain.step(false);
        assert!(!chain.compound_step().adapt_state().is_on());
        let (_, point, _) = chain.into_parts();
        assert_eq!(point.scalar("n"), Some(2.0));
    }
}
