use std::mem;

use crate::activation::ActivationFunction;
use crate::graph::DirectedGraph;

use super::BlackBox;

/// Recurrent network over an unconstrained directed graph.
///
/// Node values are double-buffered: each of the `cycles_per_activation` steps
/// computes every node's next value from the previous step's values, then the
/// buffers swap.
pub struct CyclicNetwork {
    graph: DirectedGraph,
    activation: ActivationFunction,
    cycles_per_activation: usize,
    curr: Vec<f64>,
    next: Vec<f64>,
    outputs: Vec<f64>,
    input_count: usize,
    output_count: usize,
}

impl CyclicNetwork {
    pub fn new(
        graph: DirectedGraph,
        activation: ActivationFunction,
        cycles_per_activation: usize,
    ) -> Self {
        let node_count = graph.node_count();
        let input_count = graph.input_count();
        let output_count = graph.output_count();
        CyclicNetwork {
            graph,
            activation,
            cycles_per_activation,
            curr: vec![0.0; node_count],
            next: vec![0.0; node_count],
            outputs: vec![0.0; output_count],
            input_count,
            output_count,
        }
    }
}

impl BlackBox for CyclicNetwork {
    fn input_count(&self) -> usize {
        self.input_count
    }

    fn output_count(&self) -> usize {
        self.output_count
    }

    fn inputs_mut(&mut self) -> &mut [f64] {
        &mut self.curr[..self.input_count]
    }

    fn outputs(&self) -> &[f64] {
        &self.outputs
    }

    fn activate(&mut self) {
        let conn_count = self.graph.connection_count();
        for _ in 0..self.cycles_per_activation {
            // inputs are held constant across the step
            self.next[..self.input_count].copy_from_slice(&self.curr[..self.input_count]);
            for v in &mut self.next[self.input_count..] {
                *v = 0.0;
            }
            for c in 0..conn_count {
                self.next[self.graph.target(c)] +=
                    self.graph.weight(c) * self.curr[self.graph.source(c)];
            }
            for v in &mut self.next[self.input_count..] {
                *v = self.activation.activate(*v);
            }
            mem::swap(&mut self.curr, &mut self.next);
        }

        let out_start = self.input_count;
        self.outputs
            .copy_from_slice(&self.curr[out_start..out_start + self.output_count]);
    }

    fn reset(&mut self) {
        self.curr.fill(0.0);
        self.next.fill(0.0);
        self.outputs.fill(0.0);
    }
}
