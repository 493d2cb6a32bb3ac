//! Angle normalization.
//!
//! Angle dials report raw degrees under a fixed convention: the dial reading
//! is offset by +90° from the phase it represents, so a dial at 90 is the
//! zero reference used by the phasor diagram axes. [`normalize`] removes the
//! offset exactly once and wraps into the canonical range; everything past
//! that point works with [`Phase`], which is always wrapped into (−π, π].
//!
//! The offset and the wrap live on different types on purpose: a [`Phase`]
//! cannot be fed back into [`normalize`], so the offset cannot be applied
//! twice.

use std::f64::consts::{PI, TAU};

use crate::{Angle, Real, Tolerances, as_degrees, as_radians, deg, nearly_equal, rad};

/// Offset between a dial reading and the phase it represents.
pub const DIAL_OFFSET_DEG: Real = 90.0;

/// Wrap degrees into (−180, 180].
pub fn wrap_degrees(deg: Real) -> Real {
    wrap_into(deg, 180.0, 360.0)
}

/// Wrap radians into (−π, π].
pub fn wrap_radians(rad: Real) -> Real {
    wrap_into(rad, PI, TAU)
}

fn wrap_into(v: Real, half: Real, full: Real) -> Real {
    let r = (half - v).rem_euclid(full);
    // rem_euclid rounds up to `full` for tiny negative inputs
    let r = if r >= full { 0.0 } else { r };
    half - r
}

/// Raw angle dial reading in degrees, offset convention still applied.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct DialDegrees(pub Real);

impl DialDegrees {
    pub fn get(self) -> Real {
        self.0
    }

    /// Shift the dial reading by `delta` degrees, without wrapping.
    pub fn advanced(self, delta: Real) -> Self {
        Self(self.0 + delta)
    }
}

/// Canonical phase angle, stored in radians in (−π, π].
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Phase(Real);

impl Phase {
    pub const ZERO: Phase = Phase(0.0);

    pub fn from_radians(r: Real) -> Self {
        Self(wrap_radians(r))
    }

    pub fn from_degrees(d: Real) -> Self {
        Self::from_angle(deg(d))
    }

    pub fn from_angle(a: Angle) -> Self {
        Self::from_radians(as_radians(a))
    }

    pub fn radians(self) -> Real {
        self.0
    }

    /// Canonical degrees in (−180, 180].
    pub fn degrees(self) -> Real {
        wrap_degrees(as_degrees(rad(self.0)))
    }

    pub fn angle(self) -> Angle {
        rad(self.0)
    }

    /// The dial reading that [`normalize`]s back to this phase, in [0, 360).
    pub fn to_dial(self) -> DialDegrees {
        let d = (self.degrees() + DIAL_OFFSET_DEG).rem_euclid(360.0);
        DialDegrees(if d >= 360.0 { 0.0 } else { d })
    }

    /// Equal within `tol`, measured the short way around the circle.
    pub fn approx_eq(self, other: Phase, tol: Tolerances) -> bool {
        nearly_equal(wrap_radians(self.0 - other.0), 0.0, tol)
    }
}

/// Canonical degrees for a raw dial reading: `(raw + 90) mod 360 − 180`.
///
/// The result lies in (−180, 180]; the boundary −180 maps to 180.
pub fn normalize_degrees(raw: DialDegrees) -> Real {
    wrap_degrees(raw.0 - DIAL_OFFSET_DEG)
}

/// Convert a raw dial reading into its canonical [`Phase`].
pub fn normalize(raw: DialDegrees) -> Phase {
    Phase::from_degrees(normalize_degrees(raw))
}
