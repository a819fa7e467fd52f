use super::cycle::CycleDetector;
use super::DirectedGraph;

/// Node and connection prefixes for one depth layer.
///
/// Layer `k` spans node ids `[layers[k - 1].end_node_idx,
/// layers[k].end_node_idx)`; the connections whose source lies in layers
/// `0..=k` form the prefix `[0, layers[k].end_connection_idx)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerInfo {
    pub end_node_idx: usize,
    pub end_connection_idx: usize,
}

/// A directed graph reordered by node depth so that every connection runs
/// from a lower-depth node to a strictly higher-depth one, which lets a
/// phenome compute all node values in a single forward pass.
#[derive(Debug, Clone)]
pub struct AcyclicGraph {
    graph: DirectedGraph,
    layers: Vec<LayerInfo>,
    // pre-reorder compact id -> depth-ordered id
    node_remap: Vec<usize>,
}

impl AcyclicGraph {
    /// Reorders `graph` by depth. The input must already be acyclic; callers
    /// guarantee this by construction and it is asserted in debug builds.
    pub fn build(graph: &DirectedGraph) -> Self {
        debug_assert!(
            !CycleDetector::new().is_cyclic(graph),
            "acyclic graph builder fed a cyclic graph"
        );

        let node_count = graph.node_count();
        let conn_count = graph.connection_count();

        // Longest path from the input layer, by relaxation to a fixed point.
        // Inputs have no incoming connections and stay at depth 0.
        let mut depths = vec![0usize; node_count];
        let mut changed = true;
        while changed {
            changed = false;
            for i in 0..conn_count {
                let (s, t) = (graph.source(i), graph.target(i));
                if depths[t] < depths[s] + 1 {
                    depths[t] = depths[s] + 1;
                    changed = true;
                }
            }
        }

        // Depth-ordered node ids, ties broken by original id. The inputs all
        // sit at depth 0 with the lowest ids, so they keep ids 0..input_count.
        let mut order: Vec<usize> = (0..node_count).collect();
        order.sort_by_key(|&n| (depths[n], n));
        let mut node_remap = vec![0usize; node_count];
        for (new_id, &old_id) in order.iter().enumerate() {
            node_remap[old_id] = new_id;
        }

        let mut conns: Vec<(usize, usize, f64)> = graph
            .connections()
            .map(|(s, t, w)| (node_remap[s], node_remap[t], w))
            .collect();
        conns.sort_unstable_by_key(|&(s, t, _)| (s, t));

        let layer_count = depths.iter().copied().max().unwrap_or(0) + 1;
        let mut layers = Vec::with_capacity(layer_count);
        let mut end_node = 0;
        let mut end_conn = 0;
        for d in 0..layer_count {
            while end_node < node_count && depths[order[end_node]] == d {
                end_node += 1;
            }
            // connection sources ascend in depth because ids now do
            while end_conn < conns.len() && depths[order[conns[end_conn].0]] <= d {
                end_conn += 1;
            }
            layers.push(LayerInfo {
                end_node_idx: end_node,
                end_connection_idx: end_conn,
            });
        }

        AcyclicGraph {
            graph: DirectedGraph::from_parts(
                conns,
                node_count,
                graph.input_count(),
                graph.output_count(),
            ),
            layers,
            node_remap,
        }
    }

    pub fn graph(&self) -> &DirectedGraph {
        &self.graph
    }

    pub fn layers(&self) -> &[LayerInfo] {
        &self.layers
    }

    /// Depth-ordered id of a node in the pre-reorder compact id space.
    pub fn remapped_id(&self, compact_id: usize) -> usize {
        self.node_remap[compact_id]
    }
}

#[cfg(test)]
mod tests {
    use super::{AcyclicGraph, DirectedGraph, LayerInfo};

    #[test]
    fn flat_graph_keeps_ids_and_has_two_layers() {
        // 3 inputs feeding 2 outputs directly
        let g = DirectedGraph::build(&[(0, 3, 1.0), (1, 3, 1.0), (2, 3, 1.0), (2, 4, 1.0)], 3, 2);
        let a = AcyclicGraph::build(&g);

        assert_eq!(a.graph().node_count(), 5);
        assert_eq!(a.layers().len(), 2);
        let conns: Vec<(usize, usize)> = a.graph().connections().map(|(s, t, _)| (s, t)).collect();
        assert_eq!(conns, vec![(0, 3), (1, 3), (2, 3), (2, 4)]);
        assert_eq!(
            a.layers(),
            &[
                LayerInfo { end_node_idx: 3, end_connection_idx: 4 },
                LayerInfo { end_node_idx: 5, end_connection_idx: 4 },
            ]
        );
    }

    #[test]
    fn deep_chain_is_reordered_by_depth() {
        // 2 inputs (0, 1), 2 outputs (2, 3), hidden 4 and 5 on a long chain
        let g = DirectedGraph::build(
            &[(0, 4, 1.0), (4, 5, 1.0), (5, 2, 1.0), (1, 2, 1.0), (2, 3, 1.0)],
            2,
            2,
        );
        let a = AcyclicGraph::build(&g);

        assert_eq!(a.graph().node_count(), 6);
        assert_eq!(a.layers().len(), 5);
        let conns: Vec<(usize, usize)> = a.graph().connections().map(|(s, t, _)| (s, t)).collect();
        assert_eq!(conns, vec![(0, 2), (1, 4), (2, 3), (3, 4), (4, 5)]);

        // every connection runs to a strictly deeper node id layer
        let depth_of = |id: usize| a.layers().iter().position(|l| id < l.end_node_idx).unwrap();
        for (s, t) in conns {
            assert!(depth_of(s) < depth_of(t));
        }
    }

    #[test]
    fn remap_tracks_moved_output_nodes() {
        let g = DirectedGraph::build(
            &[(0, 4, 1.0), (4, 5, 1.0), (5, 2, 1.0), (1, 2, 1.0), (2, 3, 1.0)],
            2,
            2,
        );
        let a = AcyclicGraph::build(&g);
        assert_eq!(a.remapped_id(2), 4);
        assert_eq!(a.remapped_id(3), 5);
        assert_eq!(a.remapped_id(0), 0);
    }
}
