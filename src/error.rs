use std::io;

/// Errors surfaced while constructing an experiment or an evolution run.
///
/// Conditions that arise inside a generation (non-viable genomes, abandoned
/// mutations) are not errors; they are resolved locally and never abort the
/// run.
#[derive(thiserror::Error, miette::Diagnostic, Debug)]
pub enum NevoError {
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Incompatible population: {0}")]
    Compatibility(String),
    #[error("Snapshot encoding: {0}")]
    Snapshot(String),
    #[error("Malformed configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
