//! Step size adaptation by dual averaging

use log::warn;

use crate::errors::{StepError, StepResult};
use crate::statistics::Diagnostic;
use crate::steppers::adaptors::{AdaptState, Adaptor, ScaleAdaptor};

/// Settings for step size adaptation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualAverageOptions {
    /// Decay exponent of the averaging weights
    pub k: f64,
    /// Offset damping the first iterations
    pub t0: f64,
    /// Shrinkage towards `mu`
    pub gamma: f64,
    /// Acceptance probability to aim for
    pub target_accept: f64,
    /// Transitions per window checked for collapsed or saturated acceptance
    pub window: usize,
}

impl Default for DualAverageOptions {
    fn default() -> DualAverageOptions {
        DualAverageOptions {
            k: 0.75,
            t0: 10.,
            gamma: 0.05,
            target_accept: 0.8,
            window: 100,
        }
    }
}

/// Nesterov dual averaging of the log step size.
///
/// While enabled the step size follows the primal iterate; once disabled the
/// weighted average of past iterates is used and no longer changes.
#[derive(Clone, Debug)]
pub struct DualAverage {
    log_step: f64,
    log_step_adapted: f64,
    hbar: f64,
    mu: f64,
    count: u64,
    n_updates: usize,
    n_accepted: usize,
    initial_step: f64,
    enabled: bool,
    settings: DualAverageOptions,
}

impl DualAverage {
    /// Start adapting from `initial_step`
    pub fn new(settings: DualAverageOptions, initial_step: f64) -> StepResult<DualAverage> {
        if !(initial_step.is_finite() && initial_step > 0.0) {
            return Err(StepError::InvalidScale(initial_step));
        }
        if !(settings.target_accept > 0.0 && settings.target_accept < 1.0) {
            return Err(StepError::InvalidTargetAcceptance(settings.target_accept));
        }
        if settings.window == 0 {
            return Err(StepError::InvalidTuneInterval);
        }
        Ok(DualAverage {
            log_step: initial_step.ln(),
            log_step_adapted: initial_step.ln(),
            hbar: 0.,
            mu: (10. * initial_step).ln(),
            count: 1,
            n_updates: 0,
            n_accepted: 0,
            initial_step,
            enabled: false,
            settings,
        })
    }

    fn advance(&mut self, accept_stat: f64) {
        let w = 1. / (self.count as f64 + self.settings.t0);
        self.hbar = (1. - w) * self.hbar + w * (self.settings.target_accept - accept_stat);
        self.log_step = self.mu - self.hbar * (self.count as f64).sqrt() / self.settings.gamma;
        let mk = (self.count as f64).powf(-self.settings.k);
        self.log_step_adapted = mk * self.log_step + (1. - mk) * self.log_step_adapted;
        self.count += 1;
    }

    /// Adaptation settings
    pub fn options(&self) -> DualAverageOptions {
        self.settings
    }

    fn end_window(&mut self) -> Option<Diagnostic> {
        let anomaly = if self.n_accepted == 0 {
            Some(Diagnostic::AcceptanceCollapsed)
        } else if self.n_accepted == self.n_updates {
            Some(Diagnostic::AcceptanceSaturated)
        } else {
            None
        };
        if let Some(d) = anomaly {
            warn!(
                "step size window of {} transitions: {} (step size now {:.4e})",
                self.n_updates,
                d,
                self.current_step_size()
            );
        }
        self.n_updates = 0;
        self.n_accepted = 0;
        anomaly
    }

    /// Step size of the current primal iterate
    pub fn current_step_size(&self) -> f64 {
        self.log_step.exp()
    }

    /// Averaged step size, used once tuning ends
    pub fn current_step_size_adapted(&self) -> f64 {
        self.log_step_adapted.exp()
    }
}

impl Adaptor for DualAverage {
    fn update(&mut self, alpha: f64, accepted: bool) -> Option<Diagnostic> {
        if !self.enabled {
            return None;
        }
        self.advance(if alpha.is_finite() { alpha } else { 0.0 });
        self.n_updates += 1;
        self.n_accepted += accepted as usize;
        if self.n_updates >= self.settings.window {
            self.end_window()
        } else {
            None
        }
    }

    fn state(&self) -> AdaptState {
        self.enabled.into()
    }

    fn enable(&mut self) {
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.enabled = false;
        self.n_updates = 0;
        self.n_accepted = 0;
    }

    fn reset(&mut self) {
        self.log_step = self.initial_step.ln();
        self.log_step_adapted = self.initial_step.ln();
        self.hbar = 0f64;
        self.mu = (10. * self.initial_step).ln();
        self.count = 1;
        self.n_updates = 0;
        self.n_accepted = 0;
    }
}

impl ScaleAdaptor for DualAverage {
    fn scale(&self) -> f64 {
        if self.enabled {
            self.current_step_size()
        } else {
            self.current_step_size_adapted()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_acceptance_shrinks_step() {
        let mut da = DualAverage::new(DualAverageOptions::default(), 1.0).unwrap();
        da.enable();
        for _ in 0..50 {
            da.update(0.1, false);
        }
        assert!(da.scale() < 1.0);
        da.disable();
        assert!(da.scale() < 1.0);
    }

    #[test]
    fn high_acceptance_grows_step() {
        let mut da = DualAverage::new(DualAverageOptions::default(), 0.01).unwrap();
        da.enable();
        for _ in 0..50 {
            da.update(1.0, true);
        }
        da.disable();
        assert!(da.scale() > 0.01);
    }

    #[test]
    fn frozen_after_disable() {
        let mut da = DualAverage::new(DualAverageOptions::default(), 0.5).unwrap();
        da.enable();
        for _ in 0..20 {
            da.update(0.3, false);
        }
        da.disable();
        let frozen = da.scale();
        for _ in 0..20 {
            da.update(1.0, true);
        }
        assert_eq!(da.scale(), frozen);

        da.reset();
        assert::close(da.scale(), 0.5, 1E-12);
    }

    #[test]
    fn anomalies_are_reported_at_window_end() {
        let settings = DualAverageOptions {
            window: 10,
            ..DualAverageOptions::default()
        };
        let mut da = DualAverage::new(settings, 1.0).unwrap();
        da.enable();
        for _ in 0..9 {
            assert_eq!(da.update(0.0, false), None);
        }
        assert_eq!(da.update(0.0, false), Some(Diagnostic::AcceptanceCollapsed));

        for _ in 0..9 {
            assert_eq!(da.update(1.0, true), None);
        }
        assert_eq!(da.update(1.0, true), Some(Diagnostic::AcceptanceSaturated));

        for i in 0..10 {
            assert_eq!(da.update(0.5, i % 2 == 0), None);
        }
    }

    #[test]
    fn rejects_invalid_settings() {
        assert!(DualAverage::new(DualAverageOptions::default(), -1.0).is_err());
        let settings = DualAverageOptions {
            target_accept: 1.0,
            ..DualAverageOptions::default()
        };
        assert_eq!(
            DualAverage::new(settings, 1.0).unwrap_err(),
            StepError::InvalidTargetAcceptance(1.0)
        );
        let settings = DualAverageOptions {
            window: 0,
            ..DualAverageOptions::default()
        };
        assert_eq!(
            DualAverage::new(settings, 1.0).unwrap_err(),
            StepError::InvalidTuneInterval
        );
    }
}
