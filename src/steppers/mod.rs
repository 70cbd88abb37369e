//! # Step methods
//!
//! Update rules for subsets of a model's variables and the compound step
//! which chains them into one transition.

pub mod adaptors;
pub mod helpers;

mod binary_gibbs_metropolis;
mod categorical_gibbs;
mod compound;
mod hmc;
mod metropolis;
mod mock;

pub use self::binary_gibbs_metropolis::{BinaryGibbsMetropolis, VisitOrder};
pub use self::categorical_gibbs::{CategoricalGibbs, Proposal};
pub use self::compound::CompoundStep;
pub use self::hmc::Hmc;
pub use self::metropolis::Metropolis;
pub use self::mock::Mock;
