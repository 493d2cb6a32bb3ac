//! Error types for the pp-app layer.

use std::path::PathBuf;

use pp_core::PpError;
use pp_phasor::PhasorError;

/// Application error type shared by every frontend.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Phasor(#[from] PhasorError),

    #[error("blocking engine call made from inside a settle callback")]
    Reentrant,

    #[error("Failed to read config file: {path}")]
    ConfigFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {what}")]
    Config { what: &'static str },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Engine has been dropped")]
    EngineDropped,

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pp-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<PpError> for AppError {
    fn from(err: PpError) -> Self {
        AppError::Phasor(PhasorError::Validation(err))
    }
}

impl AppError {
    /// A power target with no defined solution for the current state.
    pub fn is_domain(&self) -> bool {
        matches!(self, AppError::Phasor(e) if e.is_domain())
    }

    /// A field edit outside its declared numeric domain.
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Phasor(e) if e.is_validation())
    }
}
