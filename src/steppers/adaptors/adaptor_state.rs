#[cfg(feature = "serde_support")]
use serde::Serialize;

/// The adaptation state of an adaptor or stepper.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
pub enum AdaptState {
    /// Adaptation is enabled.
    On,
    /// Adaptation is disabled.
    Off,
    /// Some components have adaptation enabled and others disabled.
    Mixed,
    /// The current adaptor or stepping algorithm has nothing to adapt.
    NotApplicable,
}

impl AdaptState {
    /// Merge this `AdaptState` with another.
    ///
    /// This is useful for processing groups of steppers.
    pub fn merge(self, other: AdaptState) -> AdaptState {
        use AdaptState::*;
        match (self, other) {
            (NotApplicable, x) => x,
            (x, NotApplicable) => x,
            (On, On) => On,
            (Off, Off) => Off,
            _ => Mixed,
        }
    }

    /// Is adaptation running
    pub fn is_on(self) -> bool {
        self == AdaptState::On
    }
}

impl From<bool> for AdaptState {
    fn from(enabled: bool) -> Self {
        if enabled {
            AdaptState::On
        } else {
            AdaptState::Off
        }
    }
}

impl Default for AdaptState {
    fn default() -> Self {
        AdaptState::NotApplicable
    }
}
