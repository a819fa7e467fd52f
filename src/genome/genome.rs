use serde::{Deserialize, Serialize};

use crate::activation::ActivationFunction;
use crate::eval::Fitness;

use super::genes::ConnectionGenes;

/// Population-wide constants, immutable for the lifetime of a run.
///
/// Graph node ids are laid out as: bias at id 0, task inputs at
/// `1..=input_count`, outputs directly above the inputs, and hidden node ids
/// allocated from the node id sequence above the outputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Model {
    pub input_count: usize,
    pub output_count: usize,
    pub is_acyclic: bool,
    pub cycles_per_activation: usize,
    pub activation: ActivationFunction,
    pub weight_scale: f64,
}

impl Model {
    /// Input layer size as the graph sees it, bias node included.
    pub fn graph_input_count(&self) -> usize {
        self.input_count + 1
    }

    pub fn graph_io_count(&self) -> usize {
        self.graph_input_count() + self.output_count
    }

    pub fn is_input_id(&self, id: usize) -> bool {
        id < self.graph_input_count()
    }

    pub fn is_output_id(&self, id: usize) -> bool {
        id >= self.graph_input_count() && id < self.graph_io_count()
    }

    pub fn is_hidden_id(&self, id: usize) -> bool {
        id >= self.graph_io_count()
    }

    pub fn output_ids(&self) -> std::ops::Range<usize> {
        self.graph_input_count()..self.graph_io_count()
    }
}

/// A heritable description of one network. Immutable once created; mutation
/// always produces a new genome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genome {
    pub id: usize,
    pub birth_generation: usize,
    pub genes: ConnectionGenes,
    pub fitness: Option<Fitness>,
    // scalar size proxy, currently the connection count
    pub complexity: f64,
}

impl Genome {
    pub fn new(id: usize, birth_generation: usize, genes: ConnectionGenes) -> Self {
        let complexity = genes.len() as f64;
        Genome {
            id,
            birth_generation,
            genes,
            fitness: None,
            complexity,
        }
    }

    /// Hidden node ids referenced by the gene array, ascending. The set is
    /// derived on demand; it is not stored.
    pub fn hidden_node_ids(&self, model: &Model) -> Vec<usize> {
        let io = model.graph_io_count();
        let mut ids: Vec<usize> = self
            .genes
            .iter()
            .flat_map(|g| [g.source, g.target])
            .filter(|&id| id >= io)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn primary_fitness(&self) -> f64 {
        self.fitness.as_ref().map_or(0.0, |f| f.primary)
    }
}
