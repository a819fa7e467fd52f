use crate::graph::{AcyclicGraph, DirectedGraph};
use crate::genome::{Genome, Model};

use super::{AcyclicNetwork, BlackBox, CyclicNetwork};

/// Compiles a genome into an executable network.
///
/// Returns `None` for non-viable genomes, those whose graph has no path from
/// the input layer to any output; the evolution loop maps that to the
/// scheme's null fitness.
pub fn decode(genome: &Genome, model: &Model) -> Option<Box<dyn BlackBox>> {
    let triples: Vec<(usize, usize, f64)> = genome
        .genes
        .iter()
        .map(|g| (g.source, g.target, g.weight))
        .collect();
    let graph = DirectedGraph::build(&triples, model.graph_input_count(), model.output_count);

    if !graph.input_reaches_output() {
        return None;
    }

    if model.is_acyclic {
        let acyclic = AcyclicGraph::build(&graph);
        Some(Box::new(AcyclicNetwork::new(acyclic, model.activation)))
    } else {
        Some(Box::new(CyclicNetwork::new(
            graph,
            model.activation,
            model.cycles_per_activation,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationFunction;
    use crate::genome::{ConnectionGene, ConnectionGenes};

    fn model(is_acyclic: bool) -> Model {
        Model {
            input_count: 1,
            output_count: 1,
            is_acyclic,
            cycles_per_activation: 2,
            activation: ActivationFunction::Identity,
            weight_scale: 5.0,
        }
    }

    fn genome(genes: Vec<ConnectionGene>) -> Genome {
        Genome::new(0, 0, ConnectionGenes::from_vec(genes))
    }

    #[test]
    fn disconnected_genome_is_non_viable() {
        // bias 0, input 1, output 2; a gene into a dangling hidden node only
        let g = genome(vec![ConnectionGene { innovation: 0, source: 1, target: 5, weight: 1.0 }]);
        assert!(decode(&g, &model(true)).is_none());
        assert!(decode(&g, &model(false)).is_none());
    }

    #[test]
    fn decoding_is_repeatable() {
        let g = genome(vec![
            ConnectionGene { innovation: 0, source: 1, target: 2, weight: 0.5 },
            ConnectionGene { innovation: 1, source: 0, target: 2, weight: 0.25 },
        ]);
        for m in [model(true), model(false)] {
            for _ in 0..2 {
                let mut net = decode(&g, &m).unwrap();
                let inputs = net.inputs_mut();
                inputs[0] = 1.0;
                inputs[1] = 2.0;
                net.activate();
                assert_eq!(net.outputs(), &[1.25]);
            }
        }
    }
}
