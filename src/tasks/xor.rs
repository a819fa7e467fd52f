//! Two-input XOR task.

use crate::config::ExperimentConfig;
use crate::error::NevoError;
use crate::eval::{EvaluationScheme, Evaluator, Fitness};
use crate::experiment::{Experiment, ExperimentFactory};
use crate::phenome::BlackBox;

const CASES: [(f64, f64); 4] = [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0)];

/// Scores a phenome against the XOR truth table. Each case contributes up to
/// 1 based on squared error; answering all four on the right side of 0.5
/// adds 10, so any fitness of 10 or more means the table is solved.
pub struct XorEvaluator;

impl Evaluator for XorEvaluator {
    fn evaluate(&mut self, phenome: &mut dyn BlackBox) -> Fitness {
        let mut fitness = 0.0;
        let mut all_correct = true;
        for (a, b) in CASES {
            phenome.reset();
            let inputs = phenome.inputs_mut();
            inputs[0] = 1.0;
            inputs[1] = a;
            inputs[2] = b;
            phenome.activate();

            let expected = if a != b { 1.0 } else { 0.0 };
            let output = phenome.outputs()[0].clamp(0.0, 1.0);
            let err = expected - output;
            fitness += 1.0 - err * err;
            if (output > 0.5) != (expected > 0.5) {
                all_correct = false;
            }
        }
        if all_correct {
            fitness += 10.0;
        }
        Fitness::new(fitness)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct XorScheme;

impl EvaluationScheme for XorScheme {
    type Eval = XorEvaluator;

    fn input_count(&self) -> usize {
        2
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

    fn create_evaluator(&self) -> XorEvaluator {
        XorEvaluator
    }

    fn test_for_stop_condition(&self, fitness: &Fitness) -> bool {
        fitness.primary >= 10.0
    }
}

pub struct XorExperimentFactory;

impl ExperimentFactory for XorExperimentFactory {
    type Scheme = XorScheme;

    fn id(&self) -> &str {
        "xor"
    }

    fn create_experiment(
        &self,
        config: impl std::io::Read,
    ) -> Result<Experiment<XorScheme>, NevoError> {
        let config = ExperimentConfig::from_json_reader(config)?;
        Experiment::from_config(XorScheme, config)
    }
}
