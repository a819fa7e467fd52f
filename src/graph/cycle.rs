//! Cycle tests over connection arrays.
//!
//! Both tests are iterative depth-first traversals with reusable scratch
//! buffers. Instances are not shared across threads; the `&mut` receivers
//! also rule out re-entrant use of one instance.

use super::DirectedGraph;

fn scratch_len(node_count: usize) -> usize {
    node_count.next_power_of_two()
}

struct Frame {
    node: usize,
    // cursor into the connection arrays, walking the node's out-edge range
    cursor: usize,
}

/// Whole-graph cycle detection. Returns on the first cycle found.
pub struct CycleDetector {
    stack: Vec<Frame>,
    // nodes on the current traversal path
    ancestor: Vec<bool>,
    // nodes whose subtree is fully explored
    visited: Vec<bool>,
}

impl CycleDetector {
    pub fn new() -> Self {
        CycleDetector {
            stack: Vec::new(),
            ancestor: Vec::new(),
            visited: Vec::new(),
        }
    }

    pub fn is_cyclic(&mut self, graph: &DirectedGraph) -> bool {
        self.reset(graph.node_count());
        for start in 0..graph.node_count() {
            if !self.visited[start] && self.traverse(graph, start) {
                return true;
            }
        }
        false
    }

    fn reset(&mut self, node_count: usize) {
        let len = scratch_len(node_count);
        self.ancestor.clear();
        self.ancestor.resize(len, false);
        self.visited.clear();
        self.visited.resize(len, false);
        self.stack.clear();
    }

    fn traverse(&mut self, graph: &DirectedGraph, start: usize) -> bool {
        self.ancestor[start] = true;
        self.stack.push(Frame {
            node: start,
            cursor: graph.out_connections(start).start,
        });

        while let Some(top) = self.stack.last_mut() {
            let node = top.node;
            if top.cursor < graph.out_connections(node).end {
                let conn = top.cursor;
                top.cursor += 1;
                let target = graph.target(conn);
                if self.ancestor[target] {
                    return true;
                }
                if !self.visited[target] {
                    self.ancestor[target] = true;
                    self.stack.push(Frame {
                        node: target,
                        cursor: graph.out_connections(target).start,
                    });
                }
            } else {
                self.ancestor[node] = false;
                self.visited[node] = true;
                self.stack.pop();
            }
        }
        false
    }
}

impl Default for CycleDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Tests whether one proposed edge would close a cycle in a connection set
/// that is currently acyclic.
///
/// The set is passed as `(source, target)` pairs sorted by source id (ties by
/// target id); node ids need not be compact. The search runs forward from the
/// proposed target, and reaching the proposed source means the new edge would
/// complete a cycle.
pub struct EdgeCycleTest {
    stack: Vec<usize>,
    visited: Vec<bool>,
}

impl EdgeCycleTest {
    pub fn new() -> Self {
        EdgeCycleTest {
            stack: Vec::new(),
            visited: Vec::new(),
        }
    }

    pub fn would_cycle(&mut self, pairs: &[(usize, usize)], source: usize, target: usize) -> bool {
        if source == target {
            return true;
        }

        let max_id = pairs
            .iter()
            .map(|&(s, t)| s.max(t))
            .chain([source.max(target)])
            .max()
            .unwrap();
        let len = scratch_len(max_id + 1);
        self.visited.clear();
        self.visited.resize(len, false);
        self.stack.clear();

        self.stack.push(target);
        self.visited[target] = true;
        while let Some(node) = self.stack.pop() {
            let start = pairs.partition_point(|&(s, _)| s < node);
            for &(s, t) in &pairs[start..] {
                if s != node {
                    break;
                }
                if t == source {
                    return true;
                }
                if !self.visited[t] {
                    self.visited[t] = true;
                    self.stack.push(t);
                }
            }
        }
        false
    }
}

impl Default for EdgeCycleTest {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{CycleDetector, DirectedGraph, EdgeCycleTest};

    #[test]
    fn detects_a_cycle_through_hidden_nodes() {
        let acyclic = DirectedGraph::build(&[(0, 3, 1.0), (3, 4, 1.0), (4, 2, 1.0)], 2, 1);
        let cyclic = DirectedGraph::build(
            &[(0, 3, 1.0), (3, 4, 1.0), (4, 3, 1.0), (4, 2, 1.0)],
            2,
            1,
        );
        let mut detector = CycleDetector::new();
        assert!(!detector.is_cyclic(&acyclic));
        assert!(detector.is_cyclic(&cyclic));
        // the detector is reusable after either answer
        assert!(!detector.is_cyclic(&acyclic));
    }

    #[test]
    fn rejects_self_loops_immediately() {
        let mut test = EdgeCycleTest::new();
        assert!(test.would_cycle(&[], 7, 7));
    }

    #[test]
    fn rejects_an_edge_closing_an_existing_path() {
        // path 5 -> 6 -> 7; adding (7, 5) closes it, (5, 7) does not
        let pairs = [(5, 6), (6, 7)];
        let mut test = EdgeCycleTest::new();
        assert!(test.would_cycle(&pairs, 7, 5));
        assert!(!test.would_cycle(&pairs, 5, 7));
    }
}
