use std::io::Read;
use std::thread;

use crate::activation::ActivationFunction;
use crate::config::{EvolutionSettings, ExperimentConfig};
use crate::error::NevoError;
use crate::eval::EvaluationScheme;
use crate::evolution::ComplexityRegulationConfig;
use crate::genome::Model;
use crate::reproduction::{AsexualSettings, SexualSettings};

/// A fully validated experiment: the evaluation scheme plus every setting
/// the evolution algorithm needs. Constructed from an [`ExperimentConfig`]
/// and immutable afterwards.
pub struct Experiment<S> {
    pub id: String,
    pub scheme: S,
    pub population_size: usize,
    pub initial_interconnections_proportion: f64,
    pub weight_scale: f64,
    pub is_acyclic: bool,
    pub cycles_per_activation: usize,
    pub activation: ActivationFunction,
    pub evolution: EvolutionSettings,
    pub asexual: AsexualSettings,
    pub sexual: SexualSettings,
    pub complexity_regulation: ComplexityRegulationConfig,
    // parsed and carried, but this crate selects no accelerated kernels
    pub hardware_accelerated_neural_nets: bool,
    pub hardware_accelerated_activation_functions: bool,
    pub degree_of_parallelism: usize,
}

impl<S: EvaluationScheme> Experiment<S> {
    pub fn from_config(scheme: S, config: ExperimentConfig) -> Result<Self, NevoError> {
        if scheme.output_count() == 0 {
            return Err(NevoError::Config(
                "evaluation scheme must have at least one output".into(),
            ));
        }
        if config.population_size == 0 {
            return Err(NevoError::Config("population size must be positive".into()));
        }
        if config.population_size < config.evolution_algorithm_settings.species_count {
            return Err(NevoError::Config(
                "population size must be at least the species count".into(),
            ));
        }
        if !(0.0..=1.0).contains(&config.initial_interconnections_proportion) {
            return Err(NevoError::Config(
                "initial interconnections proportion must lie in [0, 1]".into(),
            ));
        }
        if config.connection_weight_scale <= 0.0 {
            return Err(NevoError::Config(
                "connection weight scale must be positive".into(),
            ));
        }
        if !config.is_acyclic && config.cycles_per_activation == 0 {
            return Err(NevoError::Config(
                "cyclic networks need at least one cycle per activation".into(),
            ));
        }
        config.evolution_algorithm_settings.validate()?;
        config.reproduction_asexual_settings.validate()?;
        config.reproduction_sexual_settings.validate()?;
        config.complexity_regulation_strategy.validate()?;

        let activation = ActivationFunction::from_name(&config.activation_fn_name)?;
        let degree_of_parallelism = match config.degree_of_parallelism {
            -1 => thread::available_parallelism().map_or(1, |n| n.get()),
            n if n >= 1 => n as usize,
            n => {
                return Err(NevoError::Config(format!(
                    "degree of parallelism must be -1 or at least 1, got {n}"
                )))
            }
        };

        Ok(Experiment {
            id: config.id,
            scheme,
            population_size: config.population_size,
            initial_interconnections_proportion: config.initial_interconnections_proportion,
            weight_scale: config.connection_weight_scale,
            is_acyclic: config.is_acyclic,
            cycles_per_activation: config.cycles_per_activation,
            activation,
            evolution: config.evolution_algorithm_settings,
            asexual: config.reproduction_asexual_settings,
            sexual: config.reproduction_sexual_settings,
            complexity_regulation: config.complexity_regulation_strategy,
            hardware_accelerated_neural_nets: config.enable_hardware_accelerated_neural_nets,
            hardware_accelerated_activation_functions: config
                .enable_hardware_accelerated_activation_functions,
            degree_of_parallelism,
        })
    }

    pub fn model(&self) -> Model {
        Model {
            input_count: self.scheme.input_count(),
            output_count: self.scheme.output_count(),
            is_acyclic: self.is_acyclic,
            cycles_per_activation: self.cycles_per_activation,
            activation: self.activation,
            weight_scale: self.weight_scale,
        }
    }
}

/// Builds an experiment for one task from a configuration stream.
pub trait ExperimentFactory {
    type Scheme: EvaluationScheme;

    /// Stable, human-readable identifier for the task.
    fn id(&self) -> &str;

    fn create_experiment(&self, config: impl Read) -> Result<Experiment<Self::Scheme>, NevoError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::xor::XorScheme;

    #[test]
    fn bad_degree_of_parallelism_is_rejected() {
        let mut config = ExperimentConfig::default();
        config.degree_of_parallelism = 0;
        assert!(Experiment::from_config(XorScheme, config).is_err());

        let mut config = ExperimentConfig::default();
        config.degree_of_parallelism = -2;
        assert!(Experiment::from_config(XorScheme, config).is_err());

        let mut config = ExperimentConfig::default();
        config.degree_of_parallelism = -1;
        let experiment = Experiment::from_config(XorScheme, config).unwrap();
        assert!(experiment.degree_of_parallelism >= 1);
    }

    #[test]
    fn unknown_activation_name_fails_fast() {
        let mut config = ExperimentConfig::default();
        config.activation_fn_name = "softsign".into();
        assert!(Experiment::from_config(XorScheme, config).is_err());
    }

    #[test]
    fn mutation_probabilities_must_sum_to_one() {
        let mut config = ExperimentConfig::default();
        config.reproduction_asexual_settings.add_node_probability = 0.5;
        assert!(Experiment::from_config(XorScheme, config).is_err());
    }
}
