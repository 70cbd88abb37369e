use crate::statistics::Diagnostic;
use crate::steppers::adaptors::AdaptState;

/// General adaptor trait
pub trait Adaptor {
    /// Record the acceptance probability `alpha` of one transition.
    ///
    /// Returns a diagnostic when a finished adaptation window looks pathological.
    fn update(&mut self, alpha: f64, accepted: bool) -> Option<Diagnostic>;
    /// Retrieve the current state
    fn state(&self) -> AdaptState;
    /// Enable updates to the adaptor
    fn enable(&mut self);
    /// Disable updates to the adaptor, freezing the tuned values
    fn disable(&mut self);
    /// Restore the initial tuning values
    fn reset(&mut self);

    /// Enable or disable updates
    fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            self.enable()
        } else {
            self.disable()
        }
    }
}

/// An Adaptor with an adapted scale
pub trait ScaleAdaptor: Adaptor {
    /// Retrieve the current scale from the adaptor
    fn scale(&self) -> f64;
}
