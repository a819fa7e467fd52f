use rand::{Rng, RngCore};
use rand_distr::{Distribution, Normal};
use serde::Deserialize;

use crate::error::NevoError;
use crate::genome::{ConnectionGene, ConnectionGenes, Genome, InnovationTracker, Model};
use crate::graph::EdgeCycleTest;

const ADD_CONNECTION_ATTEMPTS: usize = 5;

/// Probabilities of the four asexual mutation operators. Must sum to 1.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AsexualSettings {
    pub connection_weight_probability: f64,
    pub add_node_probability: f64,
    pub add_connection_probability: f64,
    pub delete_connection_probability: f64,
    pub weight_mutation: WeightMutationSettings,
}

impl Default for AsexualSettings {
    fn default() -> Self {
        AsexualSettings {
            connection_weight_probability: 0.94,
            add_node_probability: 0.01,
            add_connection_probability: 0.025,
            delete_connection_probability: 0.025,
            weight_mutation: WeightMutationSettings::default(),
        }
    }
}

impl AsexualSettings {
    pub fn validate(&self) -> Result<(), NevoError> {
        let probs = [
            self.connection_weight_probability,
            self.add_node_probability,
            self.add_connection_probability,
            self.delete_connection_probability,
        ];
        if probs.iter().any(|p| !(0.0..=1.0).contains(p)) {
            return Err(NevoError::Config(
                "asexual mutation probabilities must lie in [0, 1]".into(),
            ));
        }
        let sum: f64 = probs.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(NevoError::Config(format!(
                "asexual mutation probabilities must sum to 1, got {sum}"
            )));
        }
        self.weight_mutation.validate()
    }

    /// Probability table used while the regulation strategy is simplifying:
    /// structure-adding operators are forbidden and their mass moves to
    /// delete-connection.
    pub fn simplifying(&self) -> Self {
        AsexualSettings {
            connection_weight_probability: self.connection_weight_probability,
            add_node_probability: 0.0,
            add_connection_probability: 0.0,
            delete_connection_probability: self.delete_connection_probability
                + self.add_node_probability
                + self.add_connection_probability,
            weight_mutation: self.weight_mutation.clone(),
        }
    }
}

/// Weight mutation strategy selection. One strategy is drawn per mutation;
/// the three selection probabilities must sum to 1.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeightMutationSettings {
    pub jiggle_subset_probability: f64,
    pub jiggle_all_probability: f64,
    pub reinitialise_subset_probability: f64,
    /// Per-gene selection probability for the subset strategies.
    pub subset_proportion: f64,
    /// Gaussian sigma for jiggle deltas, as a fraction of the weight scale.
    pub jiggle_std_dev: f64,
}

impl Default for WeightMutationSettings {
    fn default() -> Self {
        WeightMutationSettings {
            jiggle_subset_probability: 0.6,
            jiggle_all_probability: 0.2,
            reinitialise_subset_probability: 0.2,
            subset_proportion: 0.25,
            jiggle_std_dev: 0.05,
        }
    }
}

impl WeightMutationSettings {
    pub fn validate(&self) -> Result<(), NevoError> {
        let sum = self.jiggle_subset_probability
            + self.jiggle_all_probability
            + self.reinitialise_subset_probability;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(NevoError::Config(format!(
                "weight mutation strategy probabilities must sum to 1, got {sum}"
            )));
        }
        if !(0.0..=1.0).contains(&self.subset_proportion) {
            return Err(NevoError::Config(
                "weight mutation subset proportion must lie in [0, 1]".into(),
            ));
        }
        if self.jiggle_std_dev <= 0.0 {
            return Err(NevoError::Config(
                "weight mutation jiggle sigma must be positive".into(),
            ));
        }
        Ok(())
    }
}

enum MutationOp {
    Weights,
    AddNode,
    AddConnection,
    DeleteConnection,
}

/// Asexual reproduction: one mutation operator applied to one parent,
/// producing a new genome under a fresh id. Owns reusable scratch buffers;
/// one instance per thread.
pub struct AsexualReproduction {
    cycle_test: EdgeCycleTest,
    pair_buf: Vec<(usize, usize)>,
}

impl AsexualReproduction {
    pub fn new() -> Self {
        AsexualReproduction {
            cycle_test: EdgeCycleTest::new(),
            pair_buf: Vec::new(),
        }
    }

    pub fn create_offspring(
        &mut self,
        parent: &Genome,
        settings: &AsexualSettings,
        model: &Model,
        tracker: &InnovationTracker,
        generation: usize,
        rng: &mut dyn RngCore,
    ) -> Genome {
        let genes = match self.choose_op(parent, settings, rng) {
            MutationOp::Weights => mutate_weights(parent, &settings.weight_mutation, model, rng),
            MutationOp::AddNode => add_node(parent, tracker, rng),
            MutationOp::AddConnection => self
                .add_connection(parent, model, tracker, rng)
                // best effort: after bounded retries the child is a plain copy
                .unwrap_or_else(|| parent.genes.clone()),
            MutationOp::DeleteConnection => delete_connection(parent, rng),
        };
        Genome::new(tracker.next_genome_id(), generation, genes)
    }

    fn choose_op(
        &self,
        parent: &Genome,
        settings: &AsexualSettings,
        rng: &mut dyn RngCore,
    ) -> MutationOp {
        // weight, node and delete mutations need at least one connection
        if parent.genes.is_empty() {
            return MutationOp::AddConnection;
        }
        let table = [
            (settings.connection_weight_probability, MutationOp::Weights),
            (settings.add_node_probability, MutationOp::AddNode),
            (settings.add_connection_probability, MutationOp::AddConnection),
            (
                settings.delete_connection_probability,
                MutationOp::DeleteConnection,
            ),
        ];
        let total: f64 = table.iter().map(|(p, _)| p).sum();
        let mut roll = rng.random::<f64>() * total;
        for (p, op) in table {
            if roll < p {
                return op;
            }
            roll -= p;
        }
        MutationOp::Weights
    }

    fn add_connection(
        &mut self,
        parent: &Genome,
        model: &Model,
        tracker: &InnovationTracker,
        rng: &mut dyn RngCore,
    ) -> Option<ConnectionGenes> {
        let hidden = parent.hidden_node_ids(model);
        let source_count = model.graph_input_count() + hidden.len();
        let target_count = model.output_count + hidden.len();

        if model.is_acyclic {
            parent.genes.fill_sorted_pairs(&mut self.pair_buf);
        }

        for _ in 0..ADD_CONNECTION_ATTEMPTS {
            let s = {
                let idx = rng.random_range(0..source_count);
                if idx < model.graph_input_count() {
                    idx
                } else {
                    hidden[idx - model.graph_input_count()]
                }
            };
            let t = {
                let idx = rng.random_range(0..target_count);
                if idx < model.output_count {
                    model.graph_input_count() + idx
                } else {
                    hidden[idx - model.output_count]
                }
            };
            if s == t || parent.genes.contains_pair(s, t) {
                continue;
            }
            if model.is_acyclic && self.cycle_test.would_cycle(&self.pair_buf, s, t) {
                continue;
            }

            let gene = ConnectionGene {
                innovation: tracker.connection_innovation(s, t),
                source: s,
                target: t,
                weight: rng.random_range(-model.weight_scale..=model.weight_scale),
            };
            let mut genes: Vec<ConnectionGene> = parent.genes.iter().copied().collect();
            genes.push(gene);
            return Some(ConnectionGenes::from_vec(genes));
        }
        None
    }
}

impl Default for AsexualReproduction {
    fn default() -> Self {
        Self::new()
    }
}

fn mutate_weights(
    parent: &Genome,
    settings: &WeightMutationSettings,
    model: &Model,
    rng: &mut dyn RngCore,
) -> ConnectionGenes {
    let mut genes: Vec<ConnectionGene> = parent.genes.iter().copied().collect();
    let scale = model.weight_scale;
    let jiggle = Normal::new(0.0, settings.jiggle_std_dev * scale).unwrap();

    let roll = rng.random::<f64>();
    if roll < settings.jiggle_subset_probability {
        for idx in subset_indices(genes.len(), settings.subset_proportion, rng) {
            genes[idx].weight = (genes[idx].weight + jiggle.sample(rng)).clamp(-scale, scale);
        }
    } else if roll < settings.jiggle_subset_probability + settings.jiggle_all_probability {
        for gene in &mut genes {
            gene.weight = (gene.weight + jiggle.sample(rng)).clamp(-scale, scale);
        }
    } else {
        for idx in subset_indices(genes.len(), settings.subset_proportion, rng) {
            genes[idx].weight = rng.random_range(-scale..=scale);
        }
    }
    ConnectionGenes::from_vec(genes)
}

// Random subset of gene indices, at least one.
fn subset_indices(len: usize, proportion: f64, rng: &mut dyn RngCore) -> Vec<usize> {
    let mut idxs: Vec<usize> = (0..len)
        .filter(|_| rng.random::<f64>() < proportion)
        .collect();
    if idxs.is_empty() {
        idxs.push(rng.random_range(0..len));
    }
    idxs
}

fn add_node(parent: &Genome, tracker: &InnovationTracker, rng: &mut dyn RngCore) -> ConnectionGenes {
    let split_idx = rng.random_range(0..parent.genes.len());
    let split = *parent.genes.get(split_idx);
    let ids = tracker.split_ids(split.source, split.target);

    let mut genes: Vec<ConnectionGene> = parent
        .genes
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != split_idx)
        .map(|(_, g)| *g)
        .collect();
    // the split connection is replaced by a path through the new hidden node;
    // the leading edge gets weight 1 so the path initially mimics the old edge
    genes.push(ConnectionGene {
        innovation: ids.innovation_in,
        source: split.source,
        target: ids.node_id,
        weight: 1.0,
    });
    genes.push(ConnectionGene {
        innovation: ids.innovation_out,
        source: ids.node_id,
        target: split.target,
        weight: split.weight,
    });
    ConnectionGenes::from_vec(genes)
}

fn delete_connection(parent: &Genome, rng: &mut dyn RngCore) -> ConnectionGenes {
    let victim = rng.random_range(0..parent.genes.len());
    let genes: Vec<ConnectionGene> = parent
        .genes
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != victim)
        .map(|(_, g)| *g)
        .collect();
    ConnectionGenes::from_vec(genes)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::activation::ActivationFunction;
    use crate::genome::factory;
    use crate::graph::{CycleDetector, DirectedGraph};

    fn model() -> Model {
        Model {
            input_count: 2,
            output_count: 1,
            is_acyclic: true,
            cycles_per_activation: 1,
            activation: ActivationFunction::LeakyRelu,
            weight_scale: 5.0,
        }
    }

    fn seed_genome(model: &Model, tracker: &InnovationTracker, rng: &mut StdRng) -> Genome {
        factory::create_population(model, tracker, 1.0, 1, rng).pop().unwrap()
    }

    #[test]
    fn offspring_stay_sorted_clamped_and_acyclic() {
        let model = model();
        let tracker = InnovationTracker::new(&model);
        let mut rng = StdRng::seed_from_u64(11);
        let mut repro = AsexualReproduction::new();
        let settings = AsexualSettings {
            // force lots of structural churn
            connection_weight_probability: 0.25,
            add_node_probability: 0.25,
            add_connection_probability: 0.25,
            delete_connection_probability: 0.25,
            weight_mutation: WeightMutationSettings::default(),
        };

        let mut parent = seed_genome(&model, &tracker, &mut rng);
        let mut detector = CycleDetector::new();
        for generation in 1..200 {
            let child = repro.create_offspring(&parent, &settings, &model, &tracker, generation, &mut rng);
            let ids: Vec<usize> = child.genes.iter().map(|g| g.innovation).collect();
            assert!(ids.windows(2).all(|w| w[0] < w[1]));
            assert!(child.genes.iter().all(|g| g.weight.abs() <= model.weight_scale));

            let triples: Vec<(usize, usize, f64)> =
                child.genes.iter().map(|g| (g.source, g.target, g.weight)).collect();
            let graph = DirectedGraph::build(&triples, model.graph_input_count(), model.output_count);
            assert!(!detector.is_cyclic(&graph));

            tracker.begin_generation();
            if !child.genes.is_empty() {
                parent = child;
            }
        }
    }

    #[test]
    fn add_node_replaces_the_split_connection() {
        let model = model();
        let tracker = InnovationTracker::new(&model);
        let mut rng = StdRng::seed_from_u64(3);
        let parent = seed_genome(&model, &tracker, &mut rng);

        let genes = add_node(&parent, &tracker, &mut rng);
        assert_eq!(genes.len(), parent.genes.len() + 1);

        let hidden = model.graph_io_count();
        let leading = genes.iter().find(|g| g.target == hidden).unwrap();
        let trailing = genes.iter().find(|g| g.source == hidden).unwrap();
        assert_eq!(leading.weight, 1.0);
        // the split edge itself is gone
        assert!(!genes.contains_pair(leading.source, trailing.target));
    }

    #[test]
    fn simplifying_table_forbids_growth() {
        let settings = AsexualSettings::default();
        let simplified = settings.simplifying();
        simplified.validate().unwrap();
        assert_eq!(simplified.add_node_probability, 0.0);
        assert_eq!(simplified.add_connection_probability, 0.0);
        assert!(simplified.delete_connection_probability > settings.delete_connection_probability);
    }
}
