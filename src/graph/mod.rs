//! Compact connection-array form of a directed graph.
//!
//! A graph is three parallel arrays (source id, target id, weight) sorted by
//! source id with ties broken by target id, plus a CSR-style offset table so
//! a node's outgoing edges are one contiguous slice. Input and output nodes
//! keep their fixed low ids; hidden node ids are remapped onto a contiguous
//! range above the outputs.

use std::ops::Range;

mod acyclic;
mod cycle;

pub use acyclic::{AcyclicGraph, LayerInfo};
pub use cycle::{CycleDetector, EdgeCycleTest};

#[derive(Debug, Clone)]
pub struct DirectedGraph {
    source_ids: Vec<usize>,
    target_ids: Vec<usize>,
    weights: Vec<f64>,
    input_count: usize,
    output_count: usize,
    node_count: usize,
    // first_connection_by_source[n]..first_connection_by_source[n + 1] is the
    // out-edge range of node n
    first_connection_by_source: Vec<usize>,
}

impl DirectedGraph {
    /// Builds the compact form from `(source, target, weight)` triples.
    ///
    /// Ids below `input_count + output_count` map to themselves; every other
    /// id is hidden and is compacted, in ascending id order, onto the range
    /// starting at `input_count + output_count`.
    pub fn build(
        triples: &[(usize, usize, f64)],
        input_count: usize,
        output_count: usize,
    ) -> Self {
        let io_count = input_count + output_count;

        let mut hidden_ids: Vec<usize> = triples
            .iter()
            .flat_map(|&(s, t, _)| [s, t])
            .filter(|&id| id >= io_count)
            .collect();
        hidden_ids.sort_unstable();
        hidden_ids.dedup();

        let map = |id: usize| -> usize {
            if id < io_count {
                id
            } else {
                io_count + hidden_ids.binary_search(&id).unwrap()
            }
        };

        let mut conns: Vec<(usize, usize, f64)> = triples
            .iter()
            .map(|&(s, t, w)| (map(s), map(t), w))
            .collect();
        conns.sort_unstable_by_key(|&(s, t, _)| (s, t));

        Self::from_parts(conns, io_count + hidden_ids.len(), input_count, output_count)
    }

    /// Assembles a graph from already-compact, `(source, target)`-sorted
    /// connections.
    pub(crate) fn from_parts(
        conns: Vec<(usize, usize, f64)>,
        node_count: usize,
        input_count: usize,
        output_count: usize,
    ) -> Self {
        let mut source_ids = Vec::with_capacity(conns.len());
        let mut target_ids = Vec::with_capacity(conns.len());
        let mut weights = Vec::with_capacity(conns.len());
        for (s, t, w) in conns {
            source_ids.push(s);
            target_ids.push(t);
            weights.push(w);
        }

        let mut first = vec![0usize; node_count + 1];
        for &s in &source_ids {
            first[s + 1] += 1;
        }
        for i in 1..=node_count {
            first[i] += first[i - 1];
        }

        DirectedGraph {
            source_ids,
            target_ids,
            weights,
            input_count,
            output_count,
            node_count,
            first_connection_by_source: first,
        }
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn input_count(&self) -> usize {
        self.input_count
    }

    pub fn output_count(&self) -> usize {
        self.output_count
    }

    pub fn connection_count(&self) -> usize {
        self.source_ids.len()
    }

    pub fn source(&self, conn: usize) -> usize {
        self.source_ids[conn]
    }

    pub fn target(&self, conn: usize) -> usize {
        self.target_ids[conn]
    }

    pub fn weight(&self, conn: usize) -> f64 {
        self.weights[conn]
    }

    pub fn sources(&self) -> &[usize] {
        &self.source_ids
    }

    pub fn targets(&self) -> &[usize] {
        &self.target_ids
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Index range of `node`'s outgoing connections.
    pub fn out_connections(&self, node: usize) -> Range<usize> {
        self.first_connection_by_source[node]..self.first_connection_by_source[node + 1]
    }

    pub fn connections(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.connection_count()).map(|i| (self.source_ids[i], self.target_ids[i], self.weights[i]))
    }

    /// True if some node in the input layer can reach some output node.
    pub fn input_reaches_output(&self) -> bool {
        let mut visited = vec![false; self.node_count];
        let mut stack: Vec<usize> = (0..self.input_count).collect();
        for n in 0..self.input_count {
            visited[n] = true;
        }
        let out_range = self.input_count..self.input_count + self.output_count;
        while let Some(node) = stack.pop() {
            if out_range.contains(&node) {
                return true;
            }
            for conn in self.out_connections(node) {
                let t = self.target_ids[conn];
                if !visited[t] {
                    visited[t] = true;
                    stack.push(t);
                }
            }
        }
        false
    }
}
