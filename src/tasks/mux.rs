//! Binary 6-multiplexer task: two address lines select one of four data
//! lines.

use crate::config::ExperimentConfig;
use crate::error::NevoError;
use crate::eval::{EvaluationScheme, Evaluator, Fitness};
use crate::experiment::{Experiment, ExperimentFactory};
use crate::phenome::BlackBox;

/// Scores a phenome over all 64 input patterns. A correctly classified
/// pattern contributes 1, the mean squared-error accuracy adds up to 1 more,
/// and a fully correct response table adds 10. A fitness of 74 or above is
/// therefore only reachable by perfect classification.
pub struct MuxEvaluator;

impl Evaluator for MuxEvaluator {
    fn evaluate(&mut self, phenome: &mut dyn BlackBox) -> Fitness {
        let mut correct = 0usize;
        let mut accuracy = 0.0;
        for pattern in 0u32..64 {
            phenome.reset();
            let inputs = phenome.inputs_mut();
            inputs[0] = 1.0;
            for bit in 0..6 {
                inputs[1 + bit] = ((pattern >> bit) & 1) as f64;
            }
            phenome.activate();

            let address = (pattern & 0b11) as usize;
            let expected = ((pattern >> (2 + address)) & 1) as f64;
            let output = phenome.outputs()[0].clamp(0.0, 1.0);
            let err = expected - output;
            accuracy += (1.0 - err * err) / 64.0;
            if (output > 0.5) == (expected > 0.5) {
                correct += 1;
            }
        }

        let mut fitness = correct as f64 + accuracy;
        if correct == 64 {
            fitness += 10.0;
        }
        Fitness::new(fitness)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MuxScheme;

impl EvaluationScheme for MuxScheme {
    type Eval = MuxEvaluator;

    fn input_count(&self) -> usize {
        6
    }

    fn output_count(&self) -> usize {
        1
    }

    fn is_deterministic(&self) -> bool {
        true
    }

    fn evaluators_have_state(&self) -> bool {
        false
    }

    fn null_fitness(&self) -> Fitness {
        Fitness::new(0.0)
    }

    fn create_evaluator(&self) -> MuxEvaluator {
        MuxEvaluator
    }

    fn test_for_stop_condition(&self, fitness: &Fitness) -> bool {
        fitness.primary >= 74.0
    }
}

pub struct MuxExperimentFactory;

impl ExperimentFactory for MuxExperimentFactory {
    type Scheme = MuxScheme;

    fn id(&self) -> &str {
        "binary-6-multiplexer"
    }

    fn create_experiment(
        &self,
        config: impl std::io::Read,
    ) -> Result<Experiment<MuxScheme>, NevoError> {
        let config = ExperimentConfig::from_json_reader(config)?;
        Experiment::from_config(MuxScheme, config)
    }
}
