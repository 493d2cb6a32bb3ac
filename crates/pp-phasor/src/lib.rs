//! Phasor model and inverse power solver for powerplots.
//!
//! Provides:
//! - `ElectricalState`: the validated amplitude/angle record
//! - `PhasorModel`: U(φ), I(φ), S0(φ), S1(φ), S(φ), scalar or vectorized over φ
//! - `PowerSolver`: back-solves a current phasor for an apparent/active/reactive target
//! - `PhasorTraces`: render-ready lines, loci and waveforms for a model

pub mod error;
pub mod model;
pub mod solver;
pub mod state;
pub mod trace;

pub use error::{PhasorError, PhasorResult};
pub use model::{PhaseArg, PhasorModel};
pub use solver::{PowerSolution, PowerSolver, PowerTarget};
pub use state::{ElectricalState, Snapshot};
pub use trace::{PhasorLines, PhasorLoci, PhasorTraces, Segment, TraceSpec, ValueMarkers, Waveforms};

pub use num_complex::Complex64;
