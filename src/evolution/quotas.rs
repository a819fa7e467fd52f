use crate::config::EvolutionSettings;
use crate::genome::Genome;
use crate::speciation::Species;

/// One species' share of the next generation's population budget. The three
/// parts always sum to `total`, and totals across all species sum to the
/// population size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeciesQuota {
    pub species: usize,
    pub total: usize,
    pub elites: usize,
    pub asexual: usize,
    pub sexual: usize,
}

/// Distributes the population budget across species proportional to mean
/// species fitness, with largest-remainder rounding so the budget is spent
/// exactly. The species holding the current best genome always keeps at
/// least one elite.
pub fn allocate(
    species: &[Species],
    genomes: &[Genome],
    settings: &EvolutionSettings,
    population_size: usize,
    best_species: usize,
    simplifying: bool,
) -> Vec<SpeciesQuota> {
    // mean primary fitness per species, shifted so no weight is negative
    let means: Vec<Option<f64>> = species
        .iter()
        .map(|sp| {
            if sp.members.is_empty() {
                None
            } else {
                let sum: f64 = sp
                    .members
                    .iter()
                    .map(|&g| genomes[g].primary_fitness())
                    .sum();
                Some(sum / sp.members.len() as f64)
            }
        })
        .collect();
    let min_mean = means
        .iter()
        .flatten()
        .copied()
        .fold(f64::INFINITY, f64::min);
    let shift = if min_mean < 0.0 { -min_mean } else { 0.0 };
    let mut weights: Vec<f64> = means
        .iter()
        .map(|m| m.map_or(0.0, |m| m + shift))
        .collect();
    if weights.iter().sum::<f64>() <= 0.0 {
        // degenerate fitness landscape: spread the budget evenly
        for (w, m) in weights.iter_mut().zip(&means) {
            *w = if m.is_some() { 1.0 } else { 0.0 };
        }
    }

    let mut totals = largest_remainder(&weights, population_size);

    // the champion's species must survive
    if totals[best_species] == 0 {
        let donor = (0..totals.len())
            .max_by_key(|&i| totals[i])
            .expect("at least one species");
        if totals[donor] > 0 {
            totals[donor] -= 1;
            totals[best_species] += 1;
        }
    }

    species
        .iter()
        .enumerate()
        .map(|(si, sp)| {
            let total = totals[si];
            let mut elites = ((settings.elitism_proportion * total as f64).round() as usize)
                .min(total)
                .min(sp.members.len());
            if si == best_species && total > 0 {
                elites = elites.max(1);
            }
            let offspring = total - elites;
            let (asexual, sexual) = if simplifying {
                (offspring, 0)
            } else {
                let asexual =
                    (settings.offspring_asexual_proportion * offspring as f64).round() as usize;
                (asexual.min(offspring), offspring - asexual.min(offspring))
            };
            SpeciesQuota {
                species: si,
                total,
                elites,
                asexual,
                sexual,
            }
        })
        .collect()
}

// Integer apportionment: floors plus leftover units handed to the largest
// fractional remainders, ties broken by lower index.
fn largest_remainder(weights: &[f64], budget: usize) -> Vec<usize> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        let mut out = vec![0; weights.len()];
        if !out.is_empty() {
            out[0] = budget;
        }
        return out;
    }

    let targets: Vec<f64> = weights
        .iter()
        .map(|w| budget as f64 * w / total)
        .collect();
    let mut out: Vec<usize> = targets.iter().map(|t| t.floor() as usize).collect();
    let assigned: usize = out.iter().sum();

    let mut order: Vec<usize> = (0..weights.len()).filter(|&i| weights[i] > 0.0).collect();
    order.sort_by(|&a, &b| {
        let ra = targets[a] - targets[a].floor();
        let rb = targets[b] - targets[b].floor();
        rb.partial_cmp(&ra).unwrap().then(a.cmp(&b))
    });
    for i in 0..budget.saturating_sub(assigned) {
        out[order[i % order.len()]] += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::Fitness;
    use crate::genome::ConnectionGenes;
    use crate::speciation::Species;

    fn genome(id: usize, fitness: f64) -> Genome {
        let mut g = Genome::new(id, 0, ConnectionGenes::default());
        g.fitness = Some(Fitness::new(fitness));
        g
    }

    fn species(id: usize, members: Vec<usize>) -> Species {
        Species {
            id,
            centroid: Vec::new(),
            members,
        }
    }

    #[test]
    fn quotas_spend_the_budget_exactly() {
        let genomes: Vec<Genome> = (0..12)
            .map(|i| genome(i, if i < 8 { 4.0 } else { 1.0 }))
            .collect();
        let sp = vec![
            species(0, (0..8).collect()),
            species(1, (8..12).collect()),
        ];
        let settings = EvolutionSettings::default();

        let quotas = allocate(&sp, &genomes, &settings, 12, 0, false);
        assert_eq!(quotas.iter().map(|q| q.total).sum::<usize>(), 12);
        for q in &quotas {
            assert_eq!(q.elites + q.asexual + q.sexual, q.total);
            assert!(q.elites <= sp[q.species].members.len());
        }
        // the fitter species receives the larger share
        assert!(quotas[0].total > quotas[1].total);
    }

    #[test]
    fn champion_species_keeps_an_elite_even_with_low_mean() {
        // species 1 holds the champion but a terrible mean
        let genomes = vec![genome(0, 100.0), genome(1, 100.0), genome(2, 0.0)];
        let sp = vec![species(0, vec![0, 1]), species(1, vec![2])];
        let settings = EvolutionSettings::default();

        let quotas = allocate(&sp, &genomes, &settings, 10, 1, false);
        assert!(quotas[1].total >= 1);
        assert!(quotas[1].elites >= 1);
        assert_eq!(quotas.iter().map(|q| q.total).sum::<usize>(), 10);
    }

    #[test]
    fn simplify_mode_routes_all_offspring_to_asexual() {
        let genomes: Vec<Genome> = (0..6).map(|i| genome(i, 1.0)).collect();
        let sp = vec![species(0, (0..6).collect())];
        let settings = EvolutionSettings::default();

        let quotas = allocate(&sp, &genomes, &settings, 6, 0, true);
        assert_eq!(quotas[0].sexual, 0);
        assert_eq!(quotas[0].elites + quotas[0].asexual, 6);
    }

    #[test]
    fn negative_fitness_is_shifted_not_dropped() {
        let genomes = vec![genome(0, -5.0), genome(1, -1.0)];
        let sp = vec![species(0, vec![0]), species(1, vec![1])];
        let settings = EvolutionSettings::default();

        let quotas = allocate(&sp, &genomes, &settings, 8, 1, false);
        assert_eq!(quotas.iter().map(|q| q.total).sum::<usize>(), 8);
        // the shifted weight of the worst species is zero, so everything
        // flows to the better one
        assert!(quotas[1].total >= quotas[0].total);
    }
}
