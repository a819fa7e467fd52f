//! Genome representation and id allocation.

pub mod factory;
mod genes;
mod genome;
mod innovation;

pub use genes::{ConnectionGene, ConnectionGenes};
pub use genome::{Genome, Model};
pub use innovation::{InnovationTracker, SplitIds};
