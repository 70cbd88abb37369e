//! Adaptors for automatically tuning stepping algorithms
//!
//! Every step method owns its adaptor; tuning state is never shared between
//! methods. Adaptors start disabled and are switched on for warm-up by the
//! driver through [`crate::StepMethod::set_tuning`].

mod traits;
pub use self::traits::*;

mod adaptor_state;
pub use self::adaptor_state::*;

mod simple;
pub use self::simple::*;

mod dual_average;
pub use self::dual_average::*;
