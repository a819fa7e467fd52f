//! The generational evolution loop.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing::{debug, info};

mod complexity;
mod evaluate;
mod quotas;
mod stats;

pub use complexity::{ComplexityMode, ComplexityRegulation, ComplexityRegulationConfig};
pub use evaluate::{evaluate_population, EvaluatorPool, PooledEvaluator};
pub use quotas::{allocate as allocate_quotas, SpeciesQuota};
pub use stats::{MovingAverage, Statistics};

use crate::error::NevoError;
use crate::eval::EvaluationScheme;
use crate::experiment::Experiment;
use crate::genome::{factory, Genome, InnovationTracker, Model};
use crate::reproduction::{AsexualReproduction, AsexualSettings, SexualReproduction};
use crate::snapshot::PopulationSnapshot;
use crate::speciation::{ManhattanDistance, Speciation, Species};

const KMEANS_MAX_ITERATIONS: usize = 6;
const PARENT_PAIRING_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    Continue,
    Solved,
    Cancelled,
}

/// Runs the generational algorithm: evaluate, speciate, test for the stop
/// condition, allocate offspring quotas, reproduce, regulate complexity.
///
/// Evaluation is the only parallel phase; everything after it runs on the
/// calling thread, so a fixed seed gives a reproducible run whenever the
/// evaluator is deterministic, at any degree of parallelism.
pub struct EvolutionAlgorithm<S: EvaluationScheme> {
    experiment: Experiment<S>,
    model: Model,
    genomes: Vec<Genome>,
    species: Vec<Species>,
    // genomes not yet assigned to a species, by arena index
    pending: Vec<usize>,
    tracker: InnovationTracker,
    speciation: Speciation,
    asexual: AsexualReproduction,
    sexual: SexualReproduction,
    regulation: ComplexityRegulation,
    stats: Statistics,
    rng: StdRng,
    thread_pool: rayon::ThreadPool,
    evaluator_pool: EvaluatorPool<S::Eval>,
    cancel: Arc<AtomicBool>,
    generation: usize,
    best_idx: Option<usize>,
}

impl<S: EvaluationScheme> EvolutionAlgorithm<S> {
    pub fn new(experiment: Experiment<S>, seed: u64) -> Result<Self, NevoError> {
        let model = experiment.model();
        let tracker = InnovationTracker::new(&model);
        let mut rng = StdRng::seed_from_u64(seed);
        let genomes = factory::create_population(
            &model,
            &tracker,
            experiment.initial_interconnections_proportion,
            experiment.population_size,
            &mut rng,
        );
        Self::assemble(experiment, model, tracker, genomes, rng)
    }

    /// Resumes from a saved population. The snapshot's model header must
    /// match the experiment.
    pub fn from_snapshot(
        experiment: Experiment<S>,
        snapshot: PopulationSnapshot,
        seed: u64,
    ) -> Result<Self, NevoError> {
        let model = experiment.model();
        snapshot.check_compatibility(&model)?;

        let max_innovation = snapshot
            .genomes
            .iter()
            .flat_map(|g| g.genes.iter().map(|c| c.innovation))
            .max()
            .unwrap_or(0);
        let max_node_id = snapshot
            .genomes
            .iter()
            .filter_map(|g| g.genes.max_node_id())
            .max()
            .unwrap_or(0);
        let max_genome_id = snapshot.genomes.iter().map(|g| g.id).max().unwrap_or(0);
        let tracker = InnovationTracker::resume(&model, max_innovation, max_node_id, max_genome_id);
        let rng = StdRng::seed_from_u64(seed);
        Self::assemble(experiment, model, tracker, snapshot.genomes, rng)
    }

    fn assemble(
        experiment: Experiment<S>,
        model: Model,
        tracker: InnovationTracker,
        genomes: Vec<Genome>,
        rng: StdRng,
    ) -> Result<Self, NevoError> {
        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(experiment.degree_of_parallelism)
            .build()
            .map_err(|e| NevoError::Config(format!("worker pool: {e}")))?;
        let stats = Statistics::new(experiment.evolution.statistics_moving_average_length);
        let regulation = ComplexityRegulation::new(experiment.complexity_regulation);
        let pending = (0..genomes.len()).collect();

        Ok(EvolutionAlgorithm {
            model,
            genomes,
            species: Vec::new(),
            pending,
            tracker,
            speciation: Speciation::new(
                Box::new(ManhattanDistance::default()),
                KMEANS_MAX_ITERATIONS,
            ),
            asexual: AsexualReproduction::new(),
            sexual: SexualReproduction::new(),
            regulation,
            stats,
            rng,
            thread_pool,
            evaluator_pool: EvaluatorPool::new(),
            cancel: Arc::new(AtomicBool::new(false)),
            generation: 0,
            best_idx: None,
            experiment,
        })
    }

    /// Shared flag polled between generation steps and at the start of each
    /// evaluation partition.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    /// Best genome of the most recently evaluated generation.
    pub fn best_genome(&self) -> Option<&Genome> {
        self.best_idx.map(|i| &self.genomes[i])
    }

    pub fn experiment(&self) -> &Experiment<S> {
        &self.experiment
    }

    /// Runs generations until the stop condition fires, the run is
    /// cancelled, or `max_generations` have been executed.
    pub fn run(&mut self, max_generations: usize) -> GenerationOutcome {
        for _ in 0..max_generations {
            match self.run_generation() {
                GenerationOutcome::Continue => {}
                outcome => return outcome,
            }
        }
        GenerationOutcome::Continue
    }

    pub fn run_generation(&mut self) -> GenerationOutcome {
        if self.cancelled() {
            return GenerationOutcome::Cancelled;
        }

        // 1. evaluate every genome
        let evaluated = evaluate_population(
            &self.thread_pool,
            &self.experiment.scheme,
            &self.model,
            &mut self.genomes,
            self.experiment.degree_of_parallelism,
            &self.evaluator_pool,
            &self.cancel,
        );
        self.stats.total_evaluations += evaluated;
        if self.cancelled() {
            return GenerationOutcome::Cancelled;
        }

        // 2. speciate; the first generation seeds the species set, later
        // generations fold the new offspring in
        if self.species.is_empty() {
            self.species = self.speciation.speciate_all(
                &self.genomes,
                self.experiment.evolution.species_count,
                &mut self.rng,
            );
        } else if !self.pending.is_empty() {
            self.speciation
                .speciate_add(&self.genomes, &self.pending, &mut self.species);
        }
        self.pending.clear();

        self.update_statistics();
        let best_idx = self.best_idx.expect("population evaluated");

        // 3. stop test
        let best_fitness = self.genomes[best_idx].fitness.clone().expect("evaluated");
        if self.experiment.scheme.test_for_stop_condition(&best_fitness) {
            info!(
                generation = self.generation,
                best = best_fitness.primary,
                "stop condition satisfied"
            );
            return GenerationOutcome::Solved;
        }
        if self.cancelled() {
            return GenerationOutcome::Cancelled;
        }

        // 6 runs before 4 and 5 so the regulation mode steers this
        // generation's offspring mix
        let previous_mode = self.regulation.mode();
        let mode = self
            .regulation
            .update(self.generation, self.stats.mean_complexity);
        if mode != previous_mode {
            debug!(generation = self.generation, ?mode, "complexity regulation transition");
        }
        self.stats.mode = mode;
        let simplifying = mode == ComplexityMode::Simplify;

        // 4. offspring quotas
        let best_species = self
            .species
            .iter()
            .position(|sp| sp.members.contains(&best_idx))
            .unwrap_or(0);
        let quotas = allocate_quotas(
            &self.species,
            &self.genomes,
            &self.experiment.evolution,
            self.experiment.population_size,
            best_species,
            simplifying,
        );

        // 5. reproduce
        self.reproduce(&quotas, simplifying);

        self.generation += 1;
        self.stats.generation = self.generation;
        self.tracker.begin_generation();
        GenerationOutcome::Continue
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(AtomicOrdering::Relaxed)
    }

    fn update_statistics(&mut self) {
        let scheme = &self.experiment.scheme;
        let mut best = 0;
        for i in 1..self.genomes.len() {
            let (a, b) = (&self.genomes[i], &self.genomes[best]);
            if let (Some(fa), Some(fb)) = (&a.fitness, &b.fitness) {
                if scheme.compare(fa, fb) == Ordering::Greater {
                    best = i;
                }
            }
        }
        self.best_idx = Some(best);

        let n = self.genomes.len() as f64;
        self.stats.mean_fitness =
            self.genomes.iter().map(|g| g.primary_fitness()).sum::<f64>() / n;
        self.stats.mean_complexity = self.genomes.iter().map(|g| g.complexity).sum::<f64>() / n;
        self.stats.species_count = self.species.iter().filter(|sp| !sp.members.is_empty()).count();
        self.stats.best_fitness = self.genomes[best].fitness.clone();
        let best_primary = self.genomes[best].primary_fitness();
        self.stats.best_fitness_ma.push(best_primary);
        self.stats.mean_complexity_ma.push(self.stats.mean_complexity);

        info!(
            generation = self.generation,
            best = best_primary,
            mean_fitness = self.stats.mean_fitness,
            mean_complexity = self.stats.mean_complexity,
            species = self.stats.species_count,
            "generation evaluated"
        );
    }

    fn reproduce(&mut self, quotas: &[SpeciesQuota], simplifying: bool) {
        let asexual_settings = if simplifying {
            self.experiment.asexual.simplifying()
        } else {
            self.experiment.asexual.clone()
        };
        let child_generation = self.generation + 1;

        // fitness-descending member lists and the parent pools cut from them
        let sorted: Vec<Vec<usize>> = self
            .species
            .iter()
            .map(|sp| {
                let mut members = sp.members.clone();
                members.sort_by(|&a, &b| {
                    let (fa, fb) = (&self.genomes[a].fitness, &self.genomes[b].fitness);
                    match (fa, fb) {
                        (Some(fa), Some(fb)) => self.experiment.scheme.compare(fb, fa),
                        _ => Ordering::Equal,
                    }
                });
                members
            })
            .collect();
        let pools: Vec<&[usize]> = sorted
            .iter()
            .map(|members| {
                let keep = ((self.experiment.evolution.selection_proportion * members.len() as f64)
                    .ceil() as usize)
                    .clamp(1.min(members.len()), members.len());
                &members[..keep]
            })
            .collect();

        let mut new_genomes: Vec<Genome> = Vec::with_capacity(self.experiment.population_size);
        let mut new_members: Vec<Vec<usize>> = vec![Vec::new(); self.species.len()];
        let mut pending: Vec<usize> = Vec::new();

        for q in quotas {
            if q.total == 0 {
                continue;
            }
            for &g in sorted[q.species].iter().take(q.elites) {
                let idx = new_genomes.len();
                new_genomes.push(self.genomes[g].clone());
                new_members[q.species].push(idx);
            }

            let pool = pools[q.species];
            let mut asexual_count = q.asexual;
            let mut sexual_count = q.sexual;
            while asexual_count + sexual_count > 0 {
                let parent = roulette(pool, &self.genomes, &mut self.rng);
                let sexual_turn = sexual_count > 0;
                let child = if sexual_turn {
                    match self.pick_second_parent(q.species, pool, parent, &pools) {
                        Some(mate) => Some(self.sexual.create_offspring(
                            &self.genomes[parent],
                            &self.genomes[mate],
                            &self.experiment.sexual,
                            &self.model,
                            &self.tracker,
                            child_generation,
                            &mut self.rng,
                        )),
                        None => None,
                    }
                } else {
                    None
                };
                // a failed pairing falls back to an asexual child so the
                // species still spends its full quota
                let child = child.unwrap_or_else(|| {
                    self.asexual.create_offspring(
                        &self.genomes[parent],
                        &asexual_settings,
                        &self.model,
                        &self.tracker,
                        child_generation,
                        &mut self.rng,
                    )
                });
                if sexual_turn {
                    sexual_count -= 1;
                } else {
                    asexual_count -= 1;
                }
                pending.push(new_genomes.len());
                new_genomes.push(child);
            }
        }

        self.genomes = new_genomes;
        for (sp, members) in self.species.iter_mut().zip(new_members) {
            sp.members = members;
        }
        self.pending = pending;
        self.best_idx = None;
    }

    fn pick_second_parent(
        &mut self,
        species: usize,
        pool: &[usize],
        first: usize,
        pools: &[&[usize]],
    ) -> Option<usize> {
        let interspecies =
            self.rng.random::<f64>() < self.experiment.evolution.interspecies_mating_proportion;
        if interspecies {
            let others: Vec<usize> = pools
                .iter()
                .enumerate()
                .filter(|&(si, p)| si != species && !p.is_empty())
                .map(|(si, _)| si)
                .collect();
            if let Some(&other) = others.get(self.rng.random_range(0..others.len().max(1))) {
                return Some(roulette(pools[other], &self.genomes, &mut self.rng));
            }
        }
        if pool.len() < 2 {
            return None;
        }
        for _ in 0..PARENT_PAIRING_ATTEMPTS {
            let mate = roulette(pool, &self.genomes, &mut self.rng);
            if mate != first {
                return Some(mate);
            }
        }
        None
    }
}

// Fitness-proportional selection, shifted so the weakest weight is zero;
// degenerate pools fall back to a uniform pick.
fn roulette(pool: &[usize], genomes: &[Genome], rng: &mut dyn RngCore) -> usize {
    let min = pool
        .iter()
        .map(|&g| genomes[g].primary_fitness())
        .fold(f64::INFINITY, f64::min);
    let shift = if min < 0.0 { -min } else { 0.0 };
    let total: f64 = pool
        .iter()
        .map(|&g| genomes[g].primary_fitness() + shift)
        .sum();
    if total <= 0.0 {
        return pool[rng.random_range(0..pool.len())];
    }
    let mut roll = rng.random::<f64>() * total;
    for &g in pool {
        let w = genomes[g].primary_fitness() + shift;
        if roll < w {
            return g;
        }
        roll -= w;
    }
    *pool.last().unwrap()
}
