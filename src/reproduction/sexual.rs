use rand::{Rng, RngCore};
use serde::Deserialize;

use crate::error::NevoError;
use crate::genome::{ConnectionGene, Genome, InnovationTracker, Model};

use super::builder::GeneListBuilder;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SexualSettings {
    /// Probability that a gene present only on the secondary parent is
    /// carried into the child.
    pub secondary_parent_gene_probability: f64,
}

impl Default for SexualSettings {
    fn default() -> Self {
        SexualSettings {
            secondary_parent_gene_probability: 0.02,
        }
    }
}

impl SexualSettings {
    pub fn validate(&self) -> Result<(), NevoError> {
        if !(0.0..=1.0).contains(&self.secondary_parent_gene_probability) {
            return Err(NevoError::Config(
                "secondary parent gene probability must lie in [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// Uniform crossover over innovation-aligned genes.
///
/// One parent is randomly designated primary. Matching genes are copied from
/// either side with equal probability; genes only the primary carries are
/// always copied; genes only the secondary carries are copied with the
/// configured probability and, for acyclic models, only when they do not
/// close a cycle in the child. Genes from the primary parent are admitted
/// during the merge walk; surviving secondary-only genes are admitted after
/// it, so each one is cycle-tested against the complete primary selection.
pub struct SexualReproduction {
    builder: GeneListBuilder,
    secondary_buf: Vec<ConnectionGene>,
}

impl SexualReproduction {
    pub fn new() -> Self {
        SexualReproduction {
            builder: GeneListBuilder::new(),
            secondary_buf: Vec::new(),
        }
    }

    pub fn create_offspring(
        &mut self,
        parent_a: &Genome,
        parent_b: &Genome,
        settings: &SexualSettings,
        model: &Model,
        tracker: &InnovationTracker,
        generation: usize,
        rng: &mut dyn RngCore,
    ) -> Genome {
        let (primary, secondary) = if rng.random_bool(0.5) {
            (parent_a, parent_b)
        } else {
            (parent_b, parent_a)
        };

        self.builder.begin(model.is_acyclic);
        self.secondary_buf.clear();

        let p = primary.genes.as_slice();
        let s = secondary.genes.as_slice();
        let (mut i, mut j) = (0, 0);
        while i < p.len() || j < s.len() {
            if j == s.len() || (i < p.len() && p[i].innovation < s[j].innovation) {
                self.builder.add(p[i]);
                i += 1;
            } else if i == p.len() || s[j].innovation < p[i].innovation {
                if rng.random::<f64>() < settings.secondary_parent_gene_probability {
                    self.secondary_buf.push(s[j]);
                }
                j += 1;
            } else {
                // matching innovation id; both sides share (source, target)
                let gene = if rng.random_bool(0.5) { p[i] } else { s[j] };
                self.builder.add(gene);
                i += 1;
                j += 1;
            }
        }

        for gene in self.secondary_buf.drain(..) {
            self.builder.try_add_secondary(gene);
        }

        Genome::new(tracker.next_genome_id(), generation, self.builder.take())
    }
}

impl Default for SexualReproduction {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::activation::ActivationFunction;
    use crate::genome::ConnectionGenes;
    use crate::graph::{CycleDetector, DirectedGraph};

    fn model() -> Model {
        Model {
            input_count: 1,
            output_count: 1,
            is_acyclic: true,
            cycles_per_activation: 1,
            activation: ActivationFunction::LeakyRelu,
            weight_scale: 5.0,
        }
    }

    fn genome(id: usize, genes: Vec<(usize, usize, usize, f64)>) -> Genome {
        Genome::new(
            id,
            0,
            ConnectionGenes::from_vec(
                genes
                    .into_iter()
                    .map(|(innovation, source, target, weight)| ConnectionGene {
                        innovation,
                        source,
                        target,
                        weight,
                    })
                    .collect(),
            ),
        )
    }

    #[test]
    fn matching_genes_come_from_either_parent() {
        // bias 0, input 1, output 2
        let a = genome(0, vec![(0, 0, 2, 1.0), (1, 1, 2, 1.0)]);
        let b = genome(1, vec![(0, 0, 2, -1.0), (1, 1, 2, -1.0)]);
        let model = model();
        let tracker = InnovationTracker::new(&model);
        let settings = SexualSettings::default();
        let mut repro = SexualReproduction::new();
        let mut rng = StdRng::seed_from_u64(5);

        let mut saw_a = false;
        let mut saw_b = false;
        for _ in 0..50 {
            let child = repro.create_offspring(&a, &b, &settings, &model, &tracker, 1, &mut rng);
            assert_eq!(child.genes.len(), 2);
            for g in child.genes.iter() {
                if g.weight > 0.0 {
                    saw_a = true;
                } else {
                    saw_b = true;
                }
            }
        }
        assert!(saw_a && saw_b);
    }

    #[test]
    fn secondary_only_genes_are_rare_and_primary_only_always_kept() {
        // a has an extra hidden path under innovations unknown to b
        let a = genome(
            0,
            vec![(0, 0, 2, 1.0), (1, 1, 2, 1.0), (2, 1, 4, 1.0), (3, 4, 2, 1.0)],
        );
        let b = genome(1, vec![(0, 0, 2, -1.0), (1, 1, 2, -1.0)]);
        let model = model();
        let tracker = InnovationTracker::new(&model);
        let settings = SexualSettings {
            secondary_parent_gene_probability: 0.0,
        };
        let mut repro = SexualReproduction::new();
        let mut rng = StdRng::seed_from_u64(5);

        for _ in 0..50 {
            let child = repro.create_offspring(&a, &b, &settings, &model, &tracker, 1, &mut rng);
            // whichever parent is primary contributes all of its genes; with
            // probability 0 the secondary contributes only matches
            assert!(child.genes.len() == 2 || child.genes.len() == 4);
        }
    }

    #[test]
    fn children_of_acyclic_parents_are_acyclic() {
        // mirrored hidden paths: a runs 4 -> 5, b runs 5 -> 4, under disjoint
        // innovation ids, so a naive union would contain a cycle
        let shared = vec![(0, 1, 4, 1.0), (1, 4, 2, 1.0), (2, 1, 5, 1.0), (3, 5, 2, 1.0)];
        let mut genes_a = shared.clone();
        genes_a.push((10, 4, 5, 1.0));
        let mut genes_b = shared;
        genes_b.push((20, 5, 4, 1.0));
        let a = genome(0, genes_a);
        let b = genome(1, genes_b);

        let model = model();
        let tracker = InnovationTracker::new(&model);
        let settings = SexualSettings {
            // force every secondary-only gene to be proposed
            secondary_parent_gene_probability: 1.0,
        };
        let mut repro = SexualReproduction::new();
        let mut rng = StdRng::seed_from_u64(9);
        let mut detector = CycleDetector::new();

        for _ in 0..100 {
            let child = repro.create_offspring(&a, &b, &settings, &model, &tracker, 1, &mut rng);
            let triples: Vec<(usize, usize, f64)> =
                child.genes.iter().map(|g| (g.source, g.target, g.weight)).collect();
            let graph =
                DirectedGraph::build(&triples, model.graph_input_count(), model.output_count);
            assert!(!detector.is_cyclic(&graph));
            // exactly one of the two opposing edges survives
            assert_eq!(child.genes.len(), 5);
        }
    }
}
