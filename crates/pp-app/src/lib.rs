//! Application layer for powerplots.
//!
//! This crate coordinates edits to the electrical model for any frontend:
//! an [`Engine`] serializes every edit, recomputes the derived phasors and
//! hands back the values every other displayed field must show, and a
//! [`PlaybackScheduler`] advances the instantaneous phase on its own thread
//! through the same entry point.

pub mod config;
pub mod error;
pub mod field;
pub mod playback;
pub mod propagator;

// Re-export key types for convenience
pub use config::{DisplayConfig, EngineConfig, PlaybackConfig};
pub use error::{AppError, AppResult};
pub use field::{DisplayContract, Edit, FieldEvent, FieldId, FieldSet, Origin};
pub use playback::{CancelToken, PlaybackEvent, PlaybackScheduler, PlaybackState};
pub use propagator::{Engine, Settled};
