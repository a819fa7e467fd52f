//! Reproduction operators.

mod asexual;
mod builder;
mod sexual;

pub use asexual::{AsexualReproduction, AsexualSettings, WeightMutationSettings};
pub use builder::GeneListBuilder;
pub use sexual::{SexualReproduction, SexualSettings};
