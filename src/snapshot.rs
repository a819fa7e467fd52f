//! Population snapshots.
//!
//! A snapshot is the genome arena plus the model header needed to verify
//! that a saved population belongs to the experiment loading it. The
//! encoding is bincode over the serde representations.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::NevoError;
use crate::genome::{Genome, Model};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationSnapshot {
    pub input_count: usize,
    pub output_count: usize,
    pub is_acyclic: bool,
    pub weight_scale: f64,
    pub generation: usize,
    pub genomes: Vec<Genome>,
}

impl PopulationSnapshot {
    pub fn capture(model: &Model, generation: usize, genomes: &[Genome]) -> Self {
        PopulationSnapshot {
            input_count: model.input_count,
            output_count: model.output_count,
            is_acyclic: model.is_acyclic,
            weight_scale: model.weight_scale,
            generation,
            genomes: genomes.to_vec(),
        }
    }

    /// Fails when the saved population's model does not match the
    /// experiment's.
    pub fn check_compatibility(&self, model: &Model) -> Result<(), NevoError> {
        if self.input_count != model.input_count || self.output_count != model.output_count {
            return Err(NevoError::Compatibility(format!(
                "saved population is {}x{}, experiment needs {}x{}",
                self.input_count, self.output_count, model.input_count, model.output_count
            )));
        }
        if self.is_acyclic != model.is_acyclic {
            return Err(NevoError::Compatibility(
                "saved population and experiment disagree on acyclic topology".into(),
            ));
        }
        if self.weight_scale != model.weight_scale {
            return Err(NevoError::Compatibility(format!(
                "saved population uses weight scale {}, experiment uses {}",
                self.weight_scale, model.weight_scale
            )));
        }
        Ok(())
    }

    pub fn save(&self, mut writer: impl Write) -> Result<(), NevoError> {
        bincode::serde::encode_into_std_write(self, &mut writer, bincode::config::standard())
            .map_err(|e| NevoError::Snapshot(e.to_string()))?;
        Ok(())
    }

    pub fn load(mut reader: impl Read) -> Result<Self, NevoError> {
        bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())
            .map_err(|e| NevoError::Snapshot(e.to_string()))
    }
}
