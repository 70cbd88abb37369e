//! An implementation of the Simple Scaling Adaptor

use log::warn;

use crate::errors::{StepError, StepResult};
use crate::statistics::Diagnostic;
use crate::steppers::adaptors::{AdaptState, Adaptor, ScaleAdaptor};

/// Settings for [`SimpleAdaptor`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimpleAdaptorOptions {
    /// Number of transitions per adaptation window
    pub tune_interval: usize,
    /// Largest factor a single window may change the scale by (in either direction)
    pub max_factor: f64,
}

impl Default for SimpleAdaptorOptions {
    fn default() -> Self {
        Self {
            tune_interval: 100,
            max_factor: 2.0,
        }
    }
}

/// Scale factor for a window with mean acceptance `alpha_mean`.
///
/// The table follows PyMC's Metropolis tuning, see
/// https://github.com/pymc-devs/pymc3/blob/4d1eb3f/pymc3/step_methods/metropolis.py#L180
fn window_factor(alpha_mean: f64) -> f64 {
    if alpha_mean < 0.001 {
        0.1
    } else if alpha_mean < 0.05 {
        0.5
    } else if alpha_mean < 0.2 {
        0.9
    } else if alpha_mean > 0.95 {
        10.0
    } else if alpha_mean > 0.75 {
        2.0
    } else if alpha_mean > 0.5 {
        1.1
    } else {
        1.0
    }
}

/// # Simple Adaptor
///
/// Collects acceptance probabilities over a window of `tune_interval`
/// transitions and rescales the proposal at the end of each window:
/// low acceptance shrinks the scale, high acceptance grows it. No window
/// changes the scale by more than `max_factor`.
#[derive(Clone, Debug)]
pub struct SimpleAdaptor {
    alpha_sum: f64,
    n_accepted: usize,
    n_updates: usize,
    scale: f64,
    initial_scale: f64,
    enabled: bool,
    options: SimpleAdaptorOptions,
}

impl SimpleAdaptor {
    /// Create a new simple adaptor starting from `scale`.
    ///
    /// Adaptors start disabled.
    pub fn new(scale: f64, options: SimpleAdaptorOptions) -> StepResult<Self> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(StepError::InvalidScale(scale));
        }
        if options.tune_interval == 0 {
            return Err(StepError::InvalidTuneInterval);
        }
        if !(options.max_factor.is_finite() && options.max_factor >= 1.0) {
            return Err(StepError::InvalidScale(options.max_factor));
        }
        Ok(Self {
            alpha_sum: 0.0,
            n_accepted: 0,
            n_updates: 0,
            scale,
            initial_scale: scale,
            enabled: false,
            options,
        })
    }

    /// Window and clamp settings
    pub fn options(&self) -> SimpleAdaptorOptions {
        self.options
    }

    /// Mean acceptance probability in the current (unfinished) window
    pub fn window_acceptance(&self) -> Option<f64> {
        if self.n_updates == 0 {
            None
        } else {
            Some(self.alpha_sum / self.n_updates as f64)
        }
    }

    fn end_window(&mut self) -> Option<Diagnostic> {
        let alpha_mean = self.alpha_sum / (self.n_updates as f64);
        let factor = window_factor(alpha_mean)
            .max(1.0 / self.options.max_factor)
            .min(self.options.max_factor);
        self.scale *= factor;

        let anomaly = if self.n_accepted == 0 {
            Some(Diagnostic::AcceptanceCollapsed)
        } else if self.n_accepted == self.n_updates {
            Some(Diagnostic::AcceptanceSaturated)
        } else {
            None
        };
        if let Some(d) = anomaly {
            warn!(
                "tuning window of {} transitions: {} (mean acceptance {:.3}, scale now {:.4e})",
                self.n_updates, d, alpha_mean, self.scale
            );
        }

        self.n_updates = 0;
        self.n_accepted = 0;
        self.alpha_sum = 0.0;
        anomaly
    }
}

impl Adaptor for SimpleAdaptor {
    fn update(&mut self, alpha: f64, accepted: bool) -> Option<Diagnostic> {
        if !self.enabled {
            return None;
        }
        self.n_updates += 1;
        self.n_accepted += accepted as usize;
        self.alpha_sum += if alpha.is_finite() { alpha } else { 0.0 };

        if self.n_updates >= self.options.tune_interval {
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
        self.alpha_sum = 0.0;
    }

    fn reset(&mut self) {
        self.alpha_sum = 0.0;
        self.n_accepted = 0;
        self.n_updates = 0;
        self.scale = self.initial_scale;
    }
}

impl ScaleAdaptor for SimpleAdaptor {
    fn scale(&self) -> f64 {
        self.scale
    }
}
