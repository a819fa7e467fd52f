use crate::activation::ActivationFunction;
use crate::graph::AcyclicGraph;

use super::BlackBox;

/// Feedforward network over a depth-ordered acyclic graph.
///
/// One `activate` call is a single forward pass: each connection contributes
/// one multiply-add into its target's accumulator, and each non-input node is
/// activated exactly once when its layer is reached.
pub struct AcyclicNetwork {
    graph: AcyclicGraph,
    activation: ActivationFunction,
    // node values in depth order; doubles as pre-activation accumulator
    vals: Vec<f64>,
    // depth-ordered ids of the output nodes, in output order
    output_idxs: Vec<usize>,
    outputs: Vec<f64>,
    input_count: usize,
}

impl AcyclicNetwork {
    pub fn new(graph: AcyclicGraph, activation: ActivationFunction) -> Self {
        let input_count = graph.graph().input_count();
        let output_count = graph.graph().output_count();
        let output_idxs: Vec<usize> = (input_count..input_count + output_count)
            .map(|id| graph.remapped_id(id))
            .collect();
        let vals = vec![0.0; graph.graph().node_count()];

        AcyclicNetwork {
            graph,
            activation,
            vals,
            output_idxs,
            outputs: vec![0.0; output_count],
            input_count,
        }
    }
}

impl BlackBox for AcyclicNetwork {
    fn input_count(&self) -> usize {
        self.input_count
    }

    fn output_count(&self) -> usize {
        self.outputs.len()
    }

    fn inputs_mut(&mut self) -> &mut [f64] {
        &mut self.vals[..self.input_count]
    }

    fn outputs(&self) -> &[f64] {
        &self.outputs
    }

    fn activate(&mut self) {
        let g = self.graph.graph();
        let layers = self.graph.layers();
        let (sources, targets, weights) = (g.sources(), g.targets(), g.weights());

        for v in &mut self.vals[self.input_count..] {
            *v = 0.0;
        }

        let mut conn = 0;
        let mut node = layers[0].end_node_idx;
        for layer in 1..layers.len() {
            // connections whose source sits in an earlier layer have final
            // source values by now
            let end_conn = layers[layer - 1].end_connection_idx;
            while conn < end_conn {
                self.vals[targets[conn]] += weights[conn] * self.vals[sources[conn]];
                conn += 1;
            }
            let end_node = layers[layer].end_node_idx;
            while node < end_node {
                self.vals[node] = self.activation.activate(self.vals[node]);
                node += 1;
            }
        }

        for (o, &idx) in self.outputs.iter_mut().zip(&self.output_idxs) {
            *o = self.vals[idx];
        }
    }

    fn reset(&mut self) {
        self.vals.fill(0.0);
        self.outputs.fill(0.0);
    }
}
