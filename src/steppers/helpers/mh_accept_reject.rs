use rand::Rng;
use std::fmt;
use std::fmt::{Debug, Formatter};

/// Metropolis-Hastings Accept / Reject Status
///
/// Contains the value of the next step (previous if rejected, proposal if accepted)
/// together with the log acceptance probability `min(0, log_ratio)`.
pub enum MHStatus<'a, M> {
    /// The proposed value was accepted
    Accepted(&'a M, f64),
    /// The proposed value was rejected
    Rejected(&'a M, f64),
}

impl<'a, M> MHStatus<'a, M> {
    /// Log acceptance probability
    pub fn log_alpha(&self) -> f64 {
        match *self {
            MHStatus::Accepted(_, a) => a,
            MHStatus::Rejected(_, a) => a,
        }
    }

    /// Acceptance probability in `[0, 1]`
    pub fn alpha(&self) -> f64 {
        self.log_alpha().exp()
    }

    /// Was the proposal accepted
    pub fn is_accepted(&self) -> bool {
        matches!(self, MHStatus::Accepted(_, _))
    }

    /// The selected value
    pub fn value(&self) -> &'a M {
        match *self {
            MHStatus::Accepted(m, _) => m,
            MHStatus::Rejected(m, _) => m,
        }
    }
}

impl<'a, M> Debug for MHStatus<'a, M>
where
    M: Debug,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        use MHStatus::*;
        match *self {
            Accepted(m, l) => write!(f, "Accepted({:?}, {})", m, l.exp()),
            Rejected(m, l) => write!(f, "Rejected({:?}, {})", m, l.exp()),
        }
    }
}

/// Generate the next step in a Metropolis Accept/Reject Step given the difference in log densities
///
/// A finite non-negative difference always accepts without consuming a random draw.
/// A NaN or `+inf` difference comes from a non-finite proposed density and
/// rejects with acceptance probability 0, as does `-inf`.
///
/// # Parameters
/// * `rng` - Random number generator
/// * `log_density_delta` - Proposed minus current log density
/// * `proposed` - Proposed state
/// * `current` - Current State
pub fn metropolis_select<'a, R: Rng + ?Sized, M>(
    rng: &mut R,
    log_density_delta: f64,
    proposed: &'a M,
    current: &'a M,
) -> MHStatus<'a, M> {
    if log_density_delta.is_nan() || log_density_delta == f64::INFINITY {
        return MHStatus::Rejected(current, f64::NEG_INFINITY);
    }
    let lll = log_density_delta.min(0.0);

    if lll == 0.0 || rng.gen::<f64>().ln() < log_density_delta {
        MHStatus::Accepted(proposed, lll)
    } else {
        MHStatus::Rejected(current, lll)
    }
}
