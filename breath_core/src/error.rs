//! Error types for the breath_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for breath_core operations
///
/// Engine control operations never fail; these variants cover file I/O
/// and host input that cannot be mapped onto an exercise.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog validation error
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// No exercise matches the given id or index
    #[error("Unknown exercise: {0}")]
    UnknownExercise(String),

    /// Exercise has open-ended steps and no fixed length
    #[error("Cannot render '{0}' offline: it has open-ended steps")]
    NotRenderable(String),

    /// Persisted selection error
    #[error("State error: {0}")]
    State(String),
}
