use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::genome::Model;

/// Ids handed out for one add-node split: the hidden node plus the two
/// replacement connections. Cached per `(source, target)` so simultaneous
/// splits of the same connection in different genomes agree on all three.
#[derive(Debug, Clone, Copy)]
pub struct SplitIds {
    pub node_id: usize,
    pub innovation_in: usize,
    pub innovation_out: usize,
}

/// Process-wide id sequences plus the per-generation innovation caches.
///
/// The sequences are atomic counters; monotonicity within a single run is all
/// that correctness requires. The caches map a `(source, target)` pair to the
/// ids it was first assigned this generation and are cleared when a new
/// generation begins.
#[derive(Debug)]
pub struct InnovationTracker {
    next_innovation: AtomicUsize,
    next_node_id: AtomicUsize,
    next_genome_id: AtomicUsize,
    connection_cache: Mutex<HashMap<(usize, usize), usize>>,
    split_cache: Mutex<HashMap<(usize, usize), SplitIds>>,
}

impl InnovationTracker {
    pub fn new(model: &Model) -> Self {
        InnovationTracker {
            next_innovation: AtomicUsize::new(0),
            next_node_id: AtomicUsize::new(model.graph_io_count()),
            next_genome_id: AtomicUsize::new(0),
            connection_cache: Mutex::new(HashMap::new()),
            split_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Rebuilds a tracker whose sequences continue above the ids already used
    /// by a loaded population.
    pub fn resume(model: &Model, max_innovation: usize, max_node_id: usize, max_genome_id: usize) -> Self {
        InnovationTracker {
            next_innovation: AtomicUsize::new(max_innovation + 1),
            next_node_id: AtomicUsize::new(model.graph_io_count().max(max_node_id + 1)),
            next_genome_id: AtomicUsize::new(max_genome_id + 1),
            connection_cache: Mutex::new(HashMap::new()),
            split_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn next_genome_id(&self) -> usize {
        self.next_genome_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Innovation id for a `(source, target)` connection, allocating a fresh
    /// id only if the pair has not been seen this generation.
    pub fn connection_innovation(&self, source: usize, target: usize) -> usize {
        let mut cache = self.connection_cache.lock().unwrap();
        *cache
            .entry((source, target))
            .or_insert_with(|| self.next_innovation.fetch_add(1, Ordering::Relaxed))
    }

    /// Ids for splitting the connection `(source, target)` with a new hidden
    /// node.
    pub fn split_ids(&self, source: usize, target: usize) -> SplitIds {
        let mut cache = self.split_cache.lock().unwrap();
        *cache.entry((source, target)).or_insert_with(|| SplitIds {
            node_id: self.next_node_id.fetch_add(1, Ordering::Relaxed),
            innovation_in: self.next_innovation.fetch_add(1, Ordering::Relaxed),
            innovation_out: self.next_innovation.fetch_add(1, Ordering::Relaxed),
        })
    }

    /// Clears both caches; ids already handed out stay retired.
    pub fn begin_generation(&self) {
        self.connection_cache.lock().unwrap().clear();
        self.split_cache.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationFunction;

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

    #[test]
    fn same_pair_same_generation_shares_an_id() {
        let tracker = InnovationTracker::new(&model());
        let a = tracker.connection_innovation(1, 3);
        let b = tracker.connection_innovation(1, 3);
        let c = tracker.connection_innovation(2, 3);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn cache_is_cleared_between_generations() {
        let tracker = InnovationTracker::new(&model());
        let a = tracker.connection_innovation(1, 3);
        tracker.begin_generation();
        let b = tracker.connection_innovation(1, 3);
        assert_ne!(a, b);
    }

    #[test]
    fn split_ids_are_stable_within_a_generation() {
        let tracker = InnovationTracker::new(&model());
        let a = tracker.split_ids(1, 3);
        let b = tracker.split_ids(1, 3);
        assert_eq!(a.node_id, b.node_id);
        assert_eq!(a.innovation_in, b.innovation_in);
        assert_eq!(a.innovation_out, b.innovation_out);
        // hidden ids start above the fixed input and output ids
        assert_eq!(a.node_id, model().graph_io_count());
    }
}
