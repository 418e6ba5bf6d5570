//! Error types for fatigue life estimation.

use thiserror::Error;

use crate::config::ValidationError;

/// Result type alias using the crate [`enum@Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building tables or estimating lives.
///
/// Solver non-convergence and sub-threshold cracks are not errors: the engine
/// accepts whatever the solvers return and encodes non-propagating cracks as
/// [`crate::propagation::PropagationLife::Saturated`].
#[derive(Error, Debug)]
pub enum Error {
    /// A required material constant is absent.
    #[error("material constant missing: {0}")]
    MaterialMissing(String),

    /// One or both field files of an experiment are absent.
    #[error("experiment data missing: {0}")]
    ExperimentMissing(String),

    /// A field file could not be parsed.
    #[error("field format error: {0}")]
    FieldFormat(String),

    /// Tension and compression fields do not share a position grid.
    #[error("field mismatch: {0}")]
    FieldMismatch(String),

    /// An initiation table file could not be parsed.
    #[error("table format error: {0}")]
    TableFormat(String),

    /// Invalid configuration.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
