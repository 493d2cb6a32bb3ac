// pp-core/src/units.rs

use uom::si::f64::Angle as UomAngle;

use crate::{PpError, Real, ensure_finite};

// Public canonical unit types (SI, f64)
pub type Angle = UomAngle;

#[inline]
pub fn deg(v: f64) -> Angle {
    use uom::si::angle::degree;
    Angle::new::<degree>(v)
}

#[inline]
pub fn rad(v: f64) -> Angle {
    use uom::si::angle::radian;
    Angle::new::<radian>(v)
}

#[inline]
pub fn as_radians(a: Angle) -> Real {
    use uom::si::angle::radian;
    a.get::<radian>()
}

#[inline]
pub fn as_degrees(a: Angle) -> Real {
    use uom::si::angle::degree;
    a.get::<degree>()
}

/// Dial units per per-unit magnitude.
///
/// The UI reports amplitudes and powers as integers on a 0..N dial; the
/// model works in per-unit, so `pu = raw / scale`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerUnitScale(Real);

impl PerUnitScale {
    pub const DEFAULT: PerUnitScale = PerUnitScale(100.0);

    pub fn new(scale: Real) -> Result<Self, PpError> {
        let scale = ensure_finite(scale, "per-unit scale")?;
        if scale <= 0.0 {
            return Err(PpError::InvalidArg {
                what: "per-unit scale must be positive",
            });
        }
        Ok(Self(scale))
    }

    pub fn get(self) -> Real {
        self.0
    }

    #[inline]
    pub fn to_per_unit(self, raw: Real) -> Real {
        raw / self.0
    }

    #[inline]
    pub fn to_display(self, pu: Real) -> Real {
        pu * self.0
    }
}

impl Default for PerUnitScale {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_smoke() {
        let _a = deg(90.0);
        let _b = rad(1.0);
    }

    #[test]
    fn degree_radian_conversion() {
        assert!((as_radians(deg(180.0)) - std::f64::consts::PI).abs() < 1e-12);
        assert!((as_degrees(rad(std::f64::consts::FRAC_PI_2)) - 90.0).abs() < 1e-12);
    }

    #[test]
    fn per_unit_scale_round_trip() {
        let scale = PerUnitScale::default();
        assert_eq!(scale.to_per_unit(150.0), 1.5);
        assert_eq!(scale.to_display(1.5), 150.0);
        assert!(PerUnitScale::new(0.0).is_err());
        assert!(PerUnitScale::new(Real::NAN).is_err());
    }
}
