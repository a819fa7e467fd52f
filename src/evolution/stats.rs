use std::collections::VecDeque;

use crate::eval::Fitness;

use super::complexity::ComplexityMode;

/// Fixed-window moving average.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window: VecDeque<f64>,
    capacity: usize,
    sum: f64,
}

impl MovingAverage {
    pub fn new(capacity: usize) -> Self {
        MovingAverage {
            window: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            sum: 0.0,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.window.len() == self.capacity {
            self.sum -= self.window.pop_front().unwrap();
        }
        self.window.push_back(value);
        self.sum += value;
    }

    pub fn mean(&self) -> f64 {
        if self.window.is_empty() {
            0.0
        } else {
            self.sum / self.window.len() as f64
        }
    }
}

/// Per-generation view of the run, refreshed after every evaluation pass.
#[derive(Debug)]
pub struct Statistics {
    pub generation: usize,
    pub best_fitness: Option<Fitness>,
    pub mean_fitness: f64,
    pub mean_complexity: f64,
    pub species_count: usize,
    pub total_evaluations: u64,
    pub mode: ComplexityMode,
    pub best_fitness_ma: MovingAverage,
    pub mean_complexity_ma: MovingAverage,
}

impl Statistics {
    pub fn new(moving_average_length: usize) -> Self {
        Statistics {
            generation: 0,
            best_fitness: None,
            mean_fitness: 0.0,
            mean_complexity: 0.0,
            species_count: 0,
            total_evaluations: 0,
            mode: ComplexityMode::Complexify,
            best_fitness_ma: MovingAverage::new(moving_average_length),
            mean_complexity_ma: MovingAverage::new(moving_average_length),
        }
    }
}
