//! Per-transition statistics emitted by step methods

use std::fmt;

#[cfg(feature = "serde_support")]
use serde::Serialize;

/// Non-fatal conditions observed during a transition
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
pub enum Diagnostic {
    /// The log density at the current point was not finite, the update was skipped.
    NonFiniteLogDensity,
    /// A gradient based trajectory became numerically unstable.
    Divergence,
    /// The proposal could not be formed (e.g. a non-finite proposal value).
    DegenerateProposal,
    /// A full tuning window ended with no accepted proposals.
    AcceptanceCollapsed,
    /// A full tuning window ended with every proposal accepted.
    AcceptanceSaturated,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Diagnostic::NonFiniteLogDensity => "non-finite log density",
            Diagnostic::Divergence => "divergence",
            Diagnostic::DegenerateProposal => "degenerate proposal",
            Diagnostic::AcceptanceCollapsed => "acceptance rate collapsed to 0",
            Diagnostic::AcceptanceSaturated => "acceptance rate saturated at 1",
        };
        write!(f, "{}", s)
    }
}

/// Statistics for one step method in one transition
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
pub struct StepStats {
    /// Name of the step method which produced this record
    pub method: &'static str,
    /// Was tuning active for this transition
    pub tune: bool,
    /// Proposal scale or step size used for this transition
    pub scale: f64,
    /// Acceptance probability, averaged over element-wise proposals
    pub accept: f64,
    /// Was (at least one) proposal accepted
    pub accepted: bool,
    /// Did a gradient based trajectory diverge
    pub diverging: bool,
    /// Energy error at the end of a gradient based trajectory
    pub energy_error: Option<f64>,
    /// Leapfrog steps or element-wise proposals made
    pub n_steps: usize,
    /// Non-fatal conditions observed
    pub diagnostics: Vec<Diagnostic>,
}

impl StepStats {
    /// Empty record for `method`
    pub fn new(method: &'static str, tune: bool, scale: f64) -> Self {
        Self {
            method,
            tune,
            scale,
            accept: 0.0,
            accepted: false,
            diverging: false,
            energy_error: None,
            n_steps: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Record of a skipped update because the current density is not finite.
    pub fn non_finite(method: &'static str, tune: bool, scale: f64) -> Self {
        let mut stats = Self::new(method, tune, scale);
        stats.diagnostics.push(Diagnostic::NonFiniteLogDensity);
        stats
    }

    /// Add a diagnostic if it is not recorded yet
    pub fn flag(&mut self, diagnostic: Diagnostic) {
        if !self.diagnostics.contains(&diagnostic) {
            self.diagnostics.push(diagnostic);
        }
    }

    /// Was `diagnostic` recorded
    pub fn has(&self, diagnostic: Diagnostic) -> bool {
        self.diagnostics.contains(&diagnostic)
    }
}

/// Fraction of records in `stats` which accepted their proposal
pub fn acceptance_rate<'a, I>(stats: I) -> f64
where
    I: IntoIterator<Item = &'a StepStats>,
{
    let (n, accepted) = stats
        .into_iter()
        .fold((0usize, 0usize), |(n, a), s| (n + 1, a + s.accepted as usize));
    if n == 0 {
        0.0
    } else {
        accepted as f64 / n as f64
    }
}
