//! Evaluation contracts.
//!
//! An [`EvaluationScheme`] describes a task: its network shape, how fitness
//! values compare, and how evaluators are created. An [`Evaluator`] scores a
//! single decoded phenome. Schemes whose evaluators carry per-instance state
//! report it via [`EvaluationScheme::evaluators_have_state`] so the evolution
//! loop can pool them instead of sharing.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::phenome::BlackBox;

/// A primary fitness plus optional auxiliary measures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fitness {
    pub primary: f64,
    pub aux: Vec<f64>,
}

impl Fitness {
    pub fn new(primary: f64) -> Self {
        Fitness {
            primary,
            aux: Vec::new(),
        }
    }

    pub fn with_aux(primary: f64, aux: Vec<f64>) -> Self {
        Fitness { primary, aux }
    }
}

/// Scores phenomes for one task.
///
/// Implementations must call `phenome.reset()` between independent trials and
/// must not retain the phenome beyond the call.
pub trait Evaluator: Send {
    fn evaluate(&mut self, phenome: &mut dyn BlackBox) -> Fitness;
}

pub trait EvaluationScheme: Send + Sync {
    type Eval: Evaluator;

    /// Number of task inputs; may be zero. The bias input is not counted.
    fn input_count(&self) -> usize;

    /// Number of task outputs; must be at least one.
    fn output_count(&self) -> usize;

    /// True when evaluating the same phenome twice yields the same fitness.
    fn is_deterministic(&self) -> bool;

    /// True when evaluators carry mutable state worth pooling; stateless
    /// evaluators are created freshly per evaluation partition.
    fn evaluators_have_state(&self) -> bool;

    /// Fitness assigned to genomes whose network has no input-to-output path.
    fn null_fitness(&self) -> Fitness;

    fn create_evaluator(&self) -> Self::Eval;

    fn test_for_stop_condition(&self, fitness: &Fitness) -> bool;

    /// Total order on fitness values. The default compares primary fitness
    /// and treats incomparable values as equal.
    fn compare(&self, a: &Fitness, b: &Fitness) -> Ordering {
        a.primary
            .partial_cmp(&b.primary)
            .unwrap_or(Ordering::Equal)
    }
}
