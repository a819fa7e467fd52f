use serde::Deserialize;

use crate::error::NevoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplexityMode {
    Complexify,
    Simplify,
}

/// Complexity regulation strategy. `Absolute` holds a fixed mean-complexity
/// ceiling; `Relative` re-anchors the ceiling at the population's mean
/// complexity each time simplification ends.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum ComplexityRegulationConfig {
    Absolute {
        complexity_ceiling: f64,
        min_simplification_generations: usize,
    },
    Relative {
        relative_complexity_ceiling: f64,
        min_simplification_generations: usize,
    },
}

impl Default for ComplexityRegulationConfig {
    fn default() -> Self {
        ComplexityRegulationConfig::Absolute {
            complexity_ceiling: 40.0,
            min_simplification_generations: 10,
        }
    }
}

impl ComplexityRegulationConfig {
    pub fn validate(&self) -> Result<(), NevoError> {
        let ceiling = match self {
            ComplexityRegulationConfig::Absolute { complexity_ceiling, .. } => *complexity_ceiling,
            ComplexityRegulationConfig::Relative {
                relative_complexity_ceiling,
                ..
            } => *relative_complexity_ceiling,
        };
        if ceiling <= 0.0 {
            return Err(NevoError::Config(
                "complexity ceiling must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Tracks the current regulation mode from the population's mean complexity.
#[derive(Debug)]
pub struct ComplexityRegulation {
    config: ComplexityRegulationConfig,
    mode: ComplexityMode,
    // resolved lazily for the relative strategy, which anchors on the first
    // observed mean complexity
    ceiling: Option<f64>,
    mode_entered_generation: usize,
}

impl ComplexityRegulation {
    pub fn new(config: ComplexityRegulationConfig) -> Self {
        let ceiling = match config {
            ComplexityRegulationConfig::Absolute { complexity_ceiling, .. } => {
                Some(complexity_ceiling)
            }
            ComplexityRegulationConfig::Relative { .. } => None,
        };
        ComplexityRegulation {
            config,
            mode: ComplexityMode::Complexify,
            ceiling,
            mode_entered_generation: 0,
        }
    }

    pub fn mode(&self) -> ComplexityMode {
        self.mode
    }

    pub fn update(&mut self, generation: usize, mean_complexity: f64) -> ComplexityMode {
        let (relative_ceiling, min_generations) = match self.config {
            ComplexityRegulationConfig::Absolute {
                min_simplification_generations,
                ..
            } => (None, min_simplification_generations),
            ComplexityRegulationConfig::Relative {
                relative_complexity_ceiling,
                min_simplification_generations,
            } => (
                Some(relative_complexity_ceiling),
                min_simplification_generations,
            ),
        };
        let ceiling = *self
            .ceiling
            .get_or_insert_with(|| mean_complexity + relative_ceiling.unwrap_or(0.0));

        match self.mode {
            ComplexityMode::Complexify => {
                if mean_complexity > ceiling {
                    self.mode = ComplexityMode::Simplify;
                    self.mode_entered_generation = generation;
                }
            }
            ComplexityMode::Simplify => {
                if mean_complexity < ceiling
                    && generation - self.mode_entered_generation >= min_generations
                {
                    self.mode = ComplexityMode::Complexify;
                    self.mode_entered_generation = generation;
                    if let Some(delta) = relative_ceiling {
                        self.ceiling = Some(mean_complexity + delta);
                    }
                }
            }
        }
        self.mode
    }
}
