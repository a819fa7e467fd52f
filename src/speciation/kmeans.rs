use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use crate::genome::Genome;

use super::distance::{gene_vec, DistanceMetric, GeneVec};
use super::Species;

/// Genetic k-means clustering over genome gene vectors.
///
/// Species are seeded once per run by k-means++ and then refined each
/// generation: newly added genomes are assigned to their nearest centroid and
/// the iteration loop reallocates members until it converges or the iteration
/// budget runs out. Centroids are recomputed only for species whose
/// membership changed.
pub struct Speciation {
    metric: Box<dyn DistanceMetric>,
    max_iterations: usize,
}

impl Speciation {
    pub fn new(metric: Box<dyn DistanceMetric>, max_iterations: usize) -> Self {
        Speciation {
            metric,
            max_iterations,
        }
    }

    /// Partitions the whole population into at most `species_count` species.
    /// Used once, on the initial generation.
    pub fn speciate_all(
        &self,
        genomes: &[Genome],
        species_count: usize,
        rng: &mut dyn RngCore,
    ) -> Vec<Species> {
        let vecs: Vec<GeneVec> = genomes.iter().map(gene_vec).collect();
        let k = species_count.min(genomes.len()).max(1);

        let mut remaining: Vec<usize> = (0..genomes.len()).collect();
        let mut seeds = Vec::with_capacity(k);
        let first = remaining.swap_remove(rng.random_range(0..remaining.len()));
        seeds.push(first);

        // squared distance from each genome to its nearest chosen seed
        let mut nearest_d2 = vec![0.0f64; genomes.len()];
        for &g in &remaining {
            nearest_d2[g] = self.metric.distance(&vecs[g], &vecs[first]).powi(2);
        }

        while seeds.len() < k {
            // candidate subset scales with log of the remainder; the pick is
            // roulette-weighted by squared distance so seeds spread out
            let n_local = remaining
                .len()
                .min(((10.0 * (remaining.len() as f64).log10()).round() as usize).max(1));
            let (candidates, _) = remaining.partial_shuffle(rng, n_local);

            let total: f64 = candidates.iter().map(|&g| nearest_d2[g]).sum();
            let pick = if total > 0.0 {
                let mut roll = rng.random::<f64>() * total;
                let mut pick = candidates.len() - 1;
                for (i, &g) in candidates.iter().enumerate() {
                    if roll < nearest_d2[g] {
                        pick = i;
                        break;
                    }
                    roll -= nearest_d2[g];
                }
                pick
            } else {
                rng.random_range(0..candidates.len())
            };

            let seed = remaining.swap_remove(pick);
            for &g in &remaining {
                let d2 = self.metric.distance(&vecs[g], &vecs[seed]).powi(2);
                if d2 < nearest_d2[g] {
                    nearest_d2[g] = d2;
                }
            }
            seeds.push(seed);
        }

        let mut species: Vec<Species> = seeds
            .iter()
            .enumerate()
            .map(|(id, &g)| Species {
                id,
                centroid: vecs[g].clone(),
                members: vec![g],
            })
            .collect();
        for &g in &remaining {
            let nearest = self.nearest_species(&vecs[g], &species);
            species[nearest].members.push(g);
        }
        for sp in &mut species {
            sp.centroid = centroid(&vecs, &sp.members);
        }

        self.iterate(&vecs, &mut species);
        species
    }

    /// Assigns newly added genomes to their nearest species, then re-runs the
    /// iteration loop over the whole population.
    pub fn speciate_add(&self, genomes: &[Genome], new_idxs: &[usize], species: &mut [Species]) {
        let vecs: Vec<GeneVec> = genomes.iter().map(gene_vec).collect();

        let mut changed = vec![false; species.len()];
        for &g in new_idxs {
            let nearest = self.nearest_species(&vecs[g], species);
            species[nearest].members.push(g);
            changed[nearest] = true;
        }
        for (si, sp) in species.iter_mut().enumerate() {
            if changed[si] {
                sp.centroid = centroid(&vecs, &sp.members);
            }
        }

        self.iterate(&vecs, species);
    }

    fn iterate(&self, vecs: &[GeneVec], species: &mut [Species]) {
        for _ in 0..self.max_iterations {
            // queue all moves for this pass, then apply them at once
            let mut moves: Vec<(usize, usize, usize)> = Vec::new();
            for (si, sp) in species.iter().enumerate() {
                for &g in &sp.members {
                    let nearest = self.nearest_species(&vecs[g], species);
                    if nearest != si {
                        moves.push((g, si, nearest));
                    }
                }
            }
            if moves.is_empty() {
                break;
            }

            let mut changed = vec![false; species.len()];
            for &(g, from, to) in &moves {
                species[from].members.retain(|&m| m != g);
                species[to].members.push(g);
                changed[from] = true;
                changed[to] = true;
            }
            for (si, sp) in species.iter_mut().enumerate() {
                if changed[si] {
                    sp.centroid = centroid(vecs, &sp.members);
                }
            }
        }

        self.repair_empty(vecs, species);
    }

    /// Refills each empty species with the genome furthest from the centroid
    /// of the currently most populous species.
    fn repair_empty(&self, vecs: &[GeneVec], species: &mut [Species]) {
        for si in 0..species.len() {
            if !species[si].members.is_empty() {
                continue;
            }
            let donor = match species
                .iter()
                .enumerate()
                .filter(|(_, sp)| sp.members.len() > 1)
                .max_by_key(|(_, sp)| sp.members.len())
            {
                Some((di, _)) => di,
                None => continue,
            };

            let victim_pos = species[donor]
                .members
                .iter()
                .enumerate()
                .max_by(|&(_, &a), &(_, &b)| {
                    let da = self.metric.distance(&vecs[a], &species[donor].centroid);
                    let db = self.metric.distance(&vecs[b], &species[donor].centroid);
                    da.partial_cmp(&db).unwrap()
                })
                .map(|(pos, _)| pos)
                .unwrap();
            let victim = species[donor].members.swap_remove(victim_pos);
            species[si].members.push(victim);

            species[donor].centroid = centroid(vecs, &species[donor].members);
            species[si].centroid = centroid(vecs, &species[si].members);
        }
    }

    fn nearest_species(&self, vec: &GeneVec, species: &[Species]) -> usize {
        let mut best = 0;
        let mut best_d = f64::INFINITY;
        for (si, sp) in species.iter().enumerate() {
            let d = self.metric.distance(vec, &sp.centroid);
            if d < best_d {
                best_d = d;
                best = si;
            }
        }
        best
    }
}

/// Coordinate-wise mean of the member gene vectors; ids missing from a
/// member contribute zero.
pub fn centroid(vecs: &[GeneVec], members: &[usize]) -> GeneVec {
    if members.is_empty() {
        return GeneVec::new();
    }
    let mut sums: BTreeMap<usize, f64> = BTreeMap::new();
    for &g in members {
        for &(id, w) in &vecs[g] {
            *sums.entry(id).or_insert(0.0) += w;
        }
    }
    let n = members.len() as f64;
    sums.into_iter().map(|(id, sum)| (id, sum / n)).collect()
}
