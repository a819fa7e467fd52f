use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use super::genes::{ConnectionGene, ConnectionGenes};
use super::genome::{Genome, Model};
use super::innovation::InnovationTracker;

/// Builds the initial population.
///
/// Each genome connects its own random subset of (input, output) pairs, bias
/// included, sized by `interconnections_proportion` with a minimum of one.
/// Innovation ids come from the tracker's per-generation cache, so the same
/// pair carries the same id in every initial genome.
pub fn create_population(
    model: &Model,
    tracker: &InnovationTracker,
    interconnections_proportion: f64,
    population_size: usize,
    rng: &mut dyn RngCore,
) -> Vec<Genome> {
    let all_pairs: Vec<(usize, usize)> = (0..model.graph_input_count())
        .flat_map(|s| model.output_ids().map(move |t| (s, t)))
        .collect();
    let connect_count = ((interconnections_proportion * all_pairs.len() as f64).round() as usize)
        .clamp(1, all_pairs.len());

    let mut pairs = all_pairs;
    (0..population_size)
        .map(|_| {
            let (chosen, _) = pairs.partial_shuffle(rng, connect_count);
            let genes: Vec<ConnectionGene> = chosen
                .iter()
                .map(|&(s, t)| ConnectionGene {
                    innovation: tracker.connection_innovation(s, t),
                    source: s,
                    target: t,
                    weight: rng.random_range(-model.weight_scale..=model.weight_scale),
                })
                .collect();
            Genome::new(tracker.next_genome_id(), 0, ConnectionGenes::from_vec(genes))
        })
        .collect()
}
