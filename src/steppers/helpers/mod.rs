//! Helpers shared between stepping algorithms

mod mh_accept_reject;
pub use self::mh_accept_reject::*;
