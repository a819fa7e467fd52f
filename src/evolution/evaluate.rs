use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use rayon::prelude::*;

use crate::eval::{EvaluationScheme, Evaluator};
use crate::genome::{Genome, Model};
use crate::phenome::decode;

/// Bounded stack of stateful evaluators. One evaluator is held per
/// evaluation partition, so contention on the lock is negligible.
pub struct EvaluatorPool<E> {
    stack: Mutex<Vec<E>>,
}

impl<E: Evaluator> EvaluatorPool<E> {
    pub fn new() -> Self {
        EvaluatorPool {
            stack: Mutex::new(Vec::new()),
        }
    }

    /// Pops a pooled evaluator or creates a fresh one. The handle returns the
    /// evaluator to the pool when dropped, on every exit path.
    pub fn get<S>(&self, scheme: &S) -> PooledEvaluator<'_, E>
    where
        S: EvaluationScheme<Eval = E>,
    {
        let pooled = scheme.evaluators_have_state();
        let evaluator = if pooled {
            self.stack.lock().unwrap().pop()
        } else {
            None
        };
        PooledEvaluator {
            pool: pooled.then_some(self),
            evaluator: Some(evaluator.unwrap_or_else(|| scheme.create_evaluator())),
        }
    }

    fn release(&self, evaluator: E) {
        self.stack.lock().unwrap().push(evaluator);
    }
}

impl<E: Evaluator> Default for EvaluatorPool<E> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct PooledEvaluator<'a, E: Evaluator> {
    pool: Option<&'a EvaluatorPool<E>>,
    evaluator: Option<E>,
}

impl<E: Evaluator> Deref for PooledEvaluator<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        self.evaluator.as_ref().unwrap()
    }
}

impl<E: Evaluator> DerefMut for PooledEvaluator<'_, E> {
    fn deref_mut(&mut self) -> &mut E {
        self.evaluator.as_mut().unwrap()
    }
}

impl<E: Evaluator> Drop for PooledEvaluator<'_, E> {
    fn drop(&mut self) {
        if let (Some(pool), Some(evaluator)) = (self.pool, self.evaluator.take()) {
            pool.release(evaluator);
        }
    }
}

/// Decodes and scores every genome, in parallel over contiguous partitions.
///
/// Non-viable genomes receive the scheme's null fitness. The cancellation
/// flag is polled at the start of each partition; cancelled partitions leave
/// their genomes unevaluated. Returns the number of evaluations performed.
pub fn evaluate_population<S: EvaluationScheme>(
    thread_pool: &rayon::ThreadPool,
    scheme: &S,
    model: &Model,
    genomes: &mut [Genome],
    degree_of_parallelism: usize,
    evaluator_pool: &EvaluatorPool<S::Eval>,
    cancel: &AtomicBool,
) -> u64 {
    if genomes.is_empty() {
        return 0;
    }
    let chunk = genomes.len().div_ceil(degree_of_parallelism.max(1));
    let evaluated = AtomicU64::new(0);

    thread_pool.install(|| {
        genomes.par_chunks_mut(chunk).for_each(|partition| {
            if cancel.load(Ordering::Relaxed) {
                return;
            }
            let mut evaluator = evaluator_pool.get(scheme);
            for genome in partition.iter_mut() {
                genome.fitness = Some(match decode(genome, model) {
                    Some(mut phenome) => evaluator.evaluate(&mut *phenome),
                    None => scheme.null_fitness(),
                });
            }
            evaluated.fetch_add(partition.len() as u64, Ordering::Relaxed);
        });
    });

    evaluated.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::eval::Fitness;
    use crate::phenome::BlackBox;

    struct CountingScheme {
        stateful: bool,
        created: AtomicUsize,
    }

    struct NoopEvaluator;

    impl Evaluator for NoopEvaluator {
        fn evaluate(&mut self, _phenome: &mut dyn BlackBox) -> Fitness {
            Fitness::new(0.0)
        }
    }

    impl EvaluationScheme for CountingScheme {
        type Eval = NoopEvaluator;

        fn input_count(&self) -> usize {
            1
        }

        fn output_count(&self) -> usize {
            1
        }

        fn is_deterministic(&self) -> bool {
            true
        }

        fn evaluators_have_state(&self) -> bool {
            self.stateful
        }

        fn null_fitness(&self) -> Fitness {
            Fitness::new(0.0)
        }

        fn create_evaluator(&self) -> NoopEvaluator {
            self.created.fetch_add(1, Ordering::Relaxed);
            NoopEvaluator
        }

        fn test_for_stop_condition(&self, _fitness: &Fitness) -> bool {
            false
        }
    }

    #[test]
    fn stateful_evaluators_return_to_the_pool() {
        let scheme = CountingScheme {
            stateful: true,
            created: AtomicUsize::new(0),
        };
        let pool = EvaluatorPool::new();
        drop(pool.get(&scheme));
        drop(pool.get(&scheme));
        assert_eq!(scheme.created.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn stateless_evaluators_are_created_per_use() {
        let scheme = CountingScheme {
            stateful: false,
            created: AtomicUsize::new(0),
        };
        let pool = EvaluatorPool::new();
        drop(pool.get(&scheme));
        drop(pool.get(&scheme));
        assert_eq!(scheme.created.load(Ordering::Relaxed), 2);
    }
}
