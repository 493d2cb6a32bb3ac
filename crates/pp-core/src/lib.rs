//! pp-core: numeric foundation for powerplots.
//!
//! Contains:
//! - numeric (Real + tolerances + float helpers)
//! - angle (dial normalization and the canonical `Phase` angle)
//! - units (uom angle types + per-unit display scaling)
//! - error (shared error types)

pub mod angle;
pub mod error;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use angle::{DIAL_OFFSET_DEG, DialDegrees, Phase, normalize, wrap_degrees, wrap_radians};
pub use error::{PpError, PpResult};
pub use numeric::*;
pub use units::*;
