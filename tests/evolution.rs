//! Full-loop tests on the XOR task.

use nevo::evolution::GenerationOutcome;
use nevo::experiment::ExperimentFactory;
use nevo::snapshot::PopulationSnapshot;
use nevo::tasks::xor::{XorExperimentFactory, XorScheme};
use nevo::EvolutionAlgorithm;

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

fn xor_algorithm(
    degree_of_parallelism: i64,
    population: usize,
    seed: u64,
) -> EvolutionAlgorithm<XorScheme> {
    init_tracing();
    let config = format!(
        r#"{{
            "id": "xor",
            "population_size": {population},
            "degree_of_parallelism": {degree_of_parallelism}
        }}"#
    );
    let experiment = XorExperimentFactory
        .create_experiment(config.as_bytes())
        .unwrap();
    EvolutionAlgorithm::new(experiment, seed).unwrap()
}

#[test]
fn population_invariants_hold_across_generations() {
    let mut ea = xor_algorithm(2, 60, 42);
    for _ in 0..15 {
        let outcome = ea.run_generation();
        if outcome == GenerationOutcome::Solved {
            break;
        }
        assert_eq!(outcome, GenerationOutcome::Continue);

        // the population budget is spent exactly
        assert_eq!(ea.genomes().len(), 60);
        for genome in ea.genomes() {
            let ids: Vec<usize> = genome.genes.iter().map(|g| g.innovation).collect();
            assert!(ids.windows(2).all(|w| w[0] < w[1]));
            assert!(genome.genes.iter().all(|g| g.weight.abs() <= 5.0));
        }
    }
}

#[test]
fn speciation_partitions_the_whole_population() {
    let mut ea = xor_algorithm(1, 60, 7);
    for _ in 0..5 {
        if ea.run_generation() != GenerationOutcome::Continue {
            break;
        }
        // species membership covers the pre-reproduction arena exactly once,
        // which after reproduction shows up as the elite subset; re-running a
        // generation re-speciates everything, so check via the species view
        let mut members: Vec<usize> = ea
            .species()
            .iter()
            .flat_map(|sp| sp.members.iter().copied())
            .collect();
        members.sort_unstable();
        members.dedup();
        assert_eq!(members.len(), ea.species().iter().map(|s| s.members.len()).sum::<usize>());
        assert!(members.iter().all(|&m| m < ea.genomes().len()));
    }
}

#[test]
fn best_fitness_is_positive_and_tracked() {
    let mut ea = xor_algorithm(2, 60, 1);
    let outcome = ea.run(25);
    let best = ea.best_genome().expect("at least one generation ran");
    let fitness = best.fitness.as_ref().unwrap();
    assert!(fitness.primary > 0.0);
    if outcome == GenerationOutcome::Solved {
        assert!(fitness.primary >= 10.0);
    }
    assert!(ea.statistics().total_evaluations >= 60);
}

#[test]
fn serial_and_parallel_runs_are_identical() {
    let mut serial = xor_algorithm(1, 50, 42);
    let mut parallel = xor_algorithm(4, 50, 42);

    for _ in 0..8 {
        let a = serial.run_generation();
        let b = parallel.run_generation();
        assert_eq!(a, b);

        let best_a = serial.statistics().best_fitness.clone().unwrap();
        let best_b = parallel.statistics().best_fitness.clone().unwrap();
        assert_eq!(best_a, best_b);
        assert_eq!(
            serial.statistics().mean_fitness,
            parallel.statistics().mean_fitness
        );
        if a != GenerationOutcome::Continue {
            break;
        }
    }

    // the populations themselves are bitwise-identical
    let genes_a: Vec<_> = serial.genomes().iter().map(|g| (g.id, g.genes.clone())).collect();
    let genes_b: Vec<_> = parallel.genomes().iter().map(|g| (g.id, g.genes.clone())).collect();
    assert_eq!(genes_a, genes_b);
}

#[test]
fn cancellation_stops_between_steps() {
    let mut ea = xor_algorithm(2, 60, 3);
    assert_eq!(ea.run_generation(), GenerationOutcome::Continue);

    ea.cancel_flag().store(true, std::sync::atomic::Ordering::Relaxed);
    assert_eq!(ea.run_generation(), GenerationOutcome::Cancelled);
}

#[test]
fn a_population_can_be_saved_and_resumed() {
    let mut ea = xor_algorithm(1, 50, 9);
    ea.run(3);

    let snapshot =
        PopulationSnapshot::capture(&ea.experiment().model(), ea.generation(), ea.genomes());
    let mut bytes = Vec::new();
    snapshot.save(&mut bytes).unwrap();
    let loaded = PopulationSnapshot::load(bytes.as_slice()).unwrap();

    let experiment = XorExperimentFactory
        .create_experiment(r#"{"id": "xor", "population_size": 50}"#.as_bytes())
        .unwrap();
    let mut resumed = EvolutionAlgorithm::from_snapshot(experiment, loaded, 10).unwrap();
    assert_eq!(resumed.genomes().len(), 50);
    assert_ne!(resumed.run_generation(), GenerationOutcome::Cancelled);
}
