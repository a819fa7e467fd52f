//! A NeuroEvolution of Augmenting Topologies (NEAT) runtime.
//!
//! Populations of variable-topology networks are evolved against a
//! user-supplied fitness function: genomes are decoded into black-box
//! phenomes, evaluated in parallel, clustered into species by genetic
//! k-means, and bred through innovation-aligned crossover and four mutation
//! operators.

pub mod activation;
pub mod config;
pub mod error;
pub mod eval;
pub mod evolution;
pub mod experiment;
pub mod genome;
pub mod graph;
pub mod phenome;
pub mod reproduction;
pub mod snapshot;
pub mod speciation;
pub mod tasks;

pub use activation::ActivationFunction;
pub use config::ExperimentConfig;
pub use error::NevoError;
pub use eval::{EvaluationScheme, Evaluator, Fitness};
pub use evolution::{EvolutionAlgorithm, GenerationOutcome};
pub use experiment::{Experiment, ExperimentFactory};
pub use genome::{Genome, Model};
pub use phenome::BlackBox;
pub use snapshot::PopulationSnapshot;
