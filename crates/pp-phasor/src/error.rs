//! Error types for phasor computations.

use pp_core::PpError;
use thiserror::Error;

/// Result type for phasor operations.
pub type PhasorResult<T> = Result<T, PhasorError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhasorError {
    /// The requested quantity has no defined value for the current state.
    #[error("Domain error: {what}")]
    Domain { what: &'static str },

    /// An input lies outside its declared numeric domain.
    #[error("Validation error: {0}")]
    Validation(#[from] PpError),
}

impl PhasorError {
    pub fn is_domain(&self) -> bool {
        matches!(self, PhasorError::Domain { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, PhasorError::Validation(_))
    }
}
