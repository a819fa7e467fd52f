use serde::{Deserialize, Serialize};

use crate::error::NevoError;

/// Scalar activation function applied at every non-input node.
///
/// Uniform across a run; selected by name in the experiment configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationFunction {
    Identity,
    Sigmoid,
    Tanh,
    Relu,
    LeakyRelu,
}

impl ActivationFunction {
    pub fn activate(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Identity => x,
            ActivationFunction::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::Relu => x.max(0.0),
            ActivationFunction::LeakyRelu => x.max(0.01 * x),
        }
    }

    /// Resolves a configured name, case-insensitively. Unknown names are a
    /// configuration error.
    pub fn from_name(name: &str) -> Result<Self, NevoError> {
        match name.to_ascii_lowercase().as_str() {
            "identity" | "linear" => Ok(ActivationFunction::Identity),
            "sigmoid" | "logistic" => Ok(ActivationFunction::Sigmoid),
            "tanh" => Ok(ActivationFunction::Tanh),
            "relu" => Ok(ActivationFunction::Relu),
            "leakyrelu" | "leaky_relu" => Ok(ActivationFunction::LeakyRelu),
            _ => Err(NevoError::Config(format!(
                "unknown activation function '{name}'"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActivationFunction::Identity => "identity",
            ActivationFunction::Sigmoid => "sigmoid",
            ActivationFunction::Tanh => "tanh",
            ActivationFunction::Relu => "relu",
            ActivationFunction::LeakyRelu => "leakyrelu",
        }
    }
}
