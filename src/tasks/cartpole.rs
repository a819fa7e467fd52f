//! Single-pole cart balancing task.
//!
//! The controller reads the cart and pole state each timestep and applies a
//! fixed push left or right. Fitness is the number of timesteps the pole
//! stays within bounds. The evaluator carries its own simulation state, so
//! the evolution loop pools evaluator instances instead of recreating them.

use crate::config::ExperimentConfig;
use crate::error::NevoError;
use crate::eval::{EvaluationScheme, Evaluator, Fitness};
use crate::experiment::{Experiment, ExperimentFactory};
use crate::phenome::BlackBox;

const GRAVITY: f64 = 9.8;
const CART_MASS: f64 = 1.0;
const POLE_MASS: f64 = 0.1;
const POLE_HALF_LENGTH: f64 = 0.5;
const FORCE: f64 = 10.0;
const TIME_STEP: f64 = 0.02;
const TRACK_LIMIT: f64 = 2.4;
const ANGLE_LIMIT: f64 = 12.0 * std::f64::consts::PI / 180.0;
const START_ANGLE: f64 = 6.0 * std::f64::consts::PI / 180.0;
const MAX_TIMESTEPS: usize = 960;

// cart position, cart velocity, pole angle, pole angular velocity
#[derive(Debug, Clone, Copy, Default)]
struct CartPoleState {
    x: f64,
    x_dot: f64,
    theta: f64,
    theta_dot: f64,
}

impl CartPoleState {
    fn step(&mut self, force: f64) {
        let total_mass = CART_MASS + POLE_MASS;
        let cos = self.theta.cos();
        let sin = self.theta.sin();

        let temp = (force + POLE_MASS * POLE_HALF_LENGTH * self.theta_dot * self.theta_dot * sin)
            / total_mass;
        let theta_acc = (GRAVITY * sin - cos * temp)
            / (POLE_HALF_LENGTH * (4.0 / 3.0 - POLE_MASS * cos * cos / total_mass));
        let x_acc = temp - POLE_MASS * POLE_HALF_LENGTH * theta_acc * cos / total_mass;

        self.x += TIME_STEP * self.x_dot;
        self.x_dot += TIME_STEP * x_acc;
        self.theta += TIME_STEP * self.theta_dot;
        self.theta_dot += TIME_STEP * theta_acc;
    }

    fn out_of_bounds(&self) -> bool {
        self.x.abs() > TRACK_LIMIT || self.theta.abs() > ANGLE_LIMIT
    }
}

pub struct CartPoleEvaluator {
    state: CartPoleState,
}

impl CartPoleEvaluator {
    pub fn new() -> Self {
        CartPoleEvaluator {
            state: CartPoleState::default(),
        }
    }
}

impl Default for CartPoleEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator for CartPoleEvaluator {
    fn evaluate(&mut self, phenome: &mut dyn BlackBox) -> Fitness {
        phenome.reset();
        self.state = CartPoleState {
            theta: START_ANGLE,
            ..CartPoleState::default()
        };

        let mut timesteps = 0;
        while timesteps < MAX_TIMESTEPS {
            let inputs = phenome.inputs_mut();
            inputs[0] = 1.0;
            inputs[1] = self.state.x / TRACK_LIMIT;
            inputs[2] = self.state.x_dot / 1.5;
            inputs[3] = self.state.theta / ANGLE_LIMIT;
            inputs[4] = self.state.theta_dot / 2.0;
            phenome.activate();

            let force = if phenome.outputs()[0] > 0.5 { FORCE } else { -FORCE };
            self.state.step(force);
            if self.state.out_of_bounds() {
                break;
            }
            timesteps += 1;
        }
        Fitness::new(timesteps as f64)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CartPoleScheme;

impl EvaluationScheme for CartPoleScheme {
    type Eval = CartPoleEvaluator;

    fn input_count(&self) -> usize {
        4
    }

    fn output_count(&self) -> usize {
        1
    }

    fn is_deterministic(&self) -> bool {
        true
    }

    fn evaluators_have_state(&self) -> bool {
        true
    }

    fn null_fitness(&self) -> Fitness {
        Fitness::new(0.0)
    }

    fn create_evaluator(&self) -> CartPoleEvaluator {
        CartPoleEvaluator::new()
    }

    fn test_for_stop_condition(&self, fitness: &Fitness) -> bool {
        fitness.primary >= MAX_TIMESTEPS as f64
    }
}

pub struct CartPoleExperimentFactory;

impl ExperimentFactory for CartPoleExperimentFactory {
    type Scheme = CartPoleScheme;

    fn id(&self) -> &str {
        "cartpole"
    }

    fn create_experiment(
        &self,
        config: impl std::io::Read,
    ) -> Result<Experiment<CartPoleScheme>, NevoError> {
        let config = ExperimentConfig::from_json_reader(config)?;
        Experiment::from_config(CartPoleScheme, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPolicy<F: Fn(&[f64]) -> f64> {
        inputs: [f64; 5],
        outputs: [f64; 1],
        policy: F,
    }

    impl<F: Fn(&[f64]) -> f64 + Send> BlackBox for FixedPolicy<F> {
        fn input_count(&self) -> usize {
            5
        }

        fn output_count(&self) -> usize {
            1
        }

        fn inputs_mut(&mut self) -> &mut [f64] {
            &mut self.inputs
        }

        fn outputs(&self) -> &[f64] {
            &self.outputs
        }

        fn activate(&mut self) {
            self.outputs[0] = (self.policy)(&self.inputs);
        }

        fn reset(&mut self) {
            self.inputs = [0.0; 5];
            self.outputs = [0.0; 1];
        }
    }

    fn policy<F: Fn(&[f64]) -> f64 + Send>(policy: F) -> FixedPolicy<F> {
        FixedPolicy {
            inputs: [0.0; 5],
            outputs: [0.0; 1],
            policy,
        }
    }

    #[test]
    fn an_idle_controller_drops_the_pole_quickly() {
        let mut evaluator = CartPoleEvaluator::new();
        // constant push to one side; the tilted pole falls within a second
        let fitness = evaluator.evaluate(&mut policy(|_| 0.0));
        assert!(fitness.primary < 100.0);
        assert!(!CartPoleScheme.test_for_stop_condition(&fitness));
    }

    #[test]
    fn leaning_feedback_outlasts_a_blind_controller() {
        let mut evaluator = CartPoleEvaluator::new();
        let blind = evaluator.evaluate(&mut policy(|_| 0.0));
        // push toward the lean
        let feedback =
            evaluator.evaluate(&mut policy(|inputs| if inputs[3] + inputs[4] > 0.0 { 1.0 } else { 0.0 }));
        assert!(feedback.primary > blind.primary);
    }

    #[test]
    fn evaluation_is_deterministic_across_reuse() {
        // one pooled evaluator instance scores repeatedly
        let mut evaluator = CartPoleEvaluator::new();
        let policy_fn = |inputs: &[f64]| if inputs[3] > 0.0 { 1.0 } else { 0.0 };
        let first = evaluator.evaluate(&mut policy(policy_fn));
        let second = evaluator.evaluate(&mut policy(policy_fn));
        assert_eq!(first, second);
    }
}
