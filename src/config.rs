//! Experiment configuration.
//!
//! Configurations are JSON with case-insensitive field names; unrecognised
//! fields are ignored and missing fields take their defaults. Validation is
//! fail-fast and happens when the experiment is constructed.

use std::io::Read;

use serde::Deserialize;
use serde_json::Value;

use crate::error::NevoError;
use crate::evolution::ComplexityRegulationConfig;
use crate::reproduction::{AsexualSettings, SexualSettings};

/// Settings of the outer evolution loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EvolutionSettings {
    pub species_count: usize,
    /// Top fraction of each species preserved unchanged.
    pub elitism_proportion: f64,
    /// Top fraction of each species eligible as parents.
    pub selection_proportion: f64,
    pub offspring_asexual_proportion: f64,
    pub offspring_sexual_proportion: f64,
    /// Probability that a sexual pairing takes its second parent from
    /// another species.
    pub interspecies_mating_proportion: f64,
    pub statistics_moving_average_length: usize,
}

impl Default for EvolutionSettings {
    fn default() -> Self {
        EvolutionSettings {
            species_count: 10,
            elitism_proportion: 0.2,
            selection_proportion: 0.2,
            offspring_asexual_proportion: 0.5,
            offspring_sexual_proportion: 0.5,
            interspecies_mating_proportion: 0.01,
            statistics_moving_average_length: 100,
        }
    }
}

impl EvolutionSettings {
    pub fn validate(&self) -> Result<(), NevoError> {
        if self.species_count == 0 {
            return Err(NevoError::Config("species count must be at least 1".into()));
        }
        for (name, p) in [
            ("elitism_proportion", self.elitism_proportion),
            ("selection_proportion", self.selection_proportion),
            ("offspring_asexual_proportion", self.offspring_asexual_proportion),
            ("offspring_sexual_proportion", self.offspring_sexual_proportion),
            ("interspecies_mating_proportion", self.interspecies_mating_proportion),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(NevoError::Config(format!("{name} must lie in [0, 1]")));
            }
        }
        let offspring_sum = self.offspring_asexual_proportion + self.offspring_sexual_proportion;
        if (offspring_sum - 1.0).abs() > 1e-6 {
            return Err(NevoError::Config(format!(
                "offspring proportions must sum to 1, got {offspring_sum}"
            )));
        }
        if self.statistics_moving_average_length == 0 {
            return Err(NevoError::Config(
                "statistics moving average length must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Raw experiment configuration, as loaded from JSON.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub id: String,
    pub population_size: usize,
    pub initial_interconnections_proportion: f64,
    pub connection_weight_scale: f64,
    pub is_acyclic: bool,
    pub cycles_per_activation: usize,
    pub activation_fn_name: String,
    pub evolution_algorithm_settings: EvolutionSettings,
    pub reproduction_asexual_settings: AsexualSettings,
    pub reproduction_sexual_settings: SexualSettings,
    pub complexity_regulation_strategy: ComplexityRegulationConfig,
    pub enable_hardware_accelerated_neural_nets: bool,
    pub enable_hardware_accelerated_activation_functions: bool,
    /// -1 selects the logical core count; any other value below 1 is an
    /// error.
    pub degree_of_parallelism: i64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        ExperimentConfig {
            id: String::new(),
            population_size: 150,
            initial_interconnections_proportion: 0.05,
            connection_weight_scale: 5.0,
            is_acyclic: true,
            cycles_per_activation: 3,
            activation_fn_name: "leakyrelu".into(),
            evolution_algorithm_settings: EvolutionSettings::default(),
            reproduction_asexual_settings: AsexualSettings::default(),
            reproduction_sexual_settings: SexualSettings::default(),
            complexity_regulation_strategy: ComplexityRegulationConfig::default(),
            enable_hardware_accelerated_neural_nets: false,
            enable_hardware_accelerated_activation_functions: false,
            degree_of_parallelism: -1,
        }
    }
}

impl ExperimentConfig {
    pub fn from_json_reader(mut reader: impl Read) -> Result<Self, NevoError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, NevoError> {
        let mut value: Value = serde_json::from_str(text)?;
        normalise_keys(&mut value);
        Ok(serde_json::from_value(value)?)
    }
}

// Lowercases object keys recursively so field names match case-insensitively,
// along with the complexity strategy tag value.
fn normalise_keys(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let entries: Vec<(String, Value)> = std::mem::take(map)
                .into_iter()
                .map(|(k, mut v)| {
                    let key = k.to_ascii_lowercase();
                    if key == "strategy" {
                        if let Value::String(s) = &mut v {
                            *s = s.to_ascii_lowercase();
                        }
                    }
                    normalise_keys(&mut v);
                    (key, v)
                })
                .collect();
            map.extend(entries);
        }
        Value::Array(items) => {
            for item in items {
                normalise_keys(item);
            }
        }
        _ => {}
    }
}
