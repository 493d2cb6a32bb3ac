use crate::PpError;

/// Floating point type used throughout system
pub type Real = f64;

/// Comparison bounds: values match when their difference is within `abs`,
/// or within `rel` of the larger magnitude.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Tolerances {
    /// Directly evaluated quantities (phasor products, wrapped angles).
    pub const TIGHT: Tolerances = Tolerances::new(1e-12, 1e-12);
    /// Quantities that went through a clamped `acos`/`asin` round trip.
    pub const SOLVED: Tolerances = Tolerances::new(1e-9, 1e-9);

    pub const fn new(abs: Real, rel: Real) -> Self {
        Self { abs, rel }
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self::TIGHT
    }
}

/// NaN never compares equal, not even to itself.
pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    diff <= tol.abs.max(tol.rel * a.abs().max(b.abs()))
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, PpError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(PpError::NonFinite { what, value: v })
    }
}

/// Finite and `>= 0`. Magnitudes go through this before they are stored.
pub fn ensure_non_negative(v: Real, what: &'static str) -> Result<Real, PpError> {
    let v = ensure_finite(v, what)?;
    if v < 0.0 {
        return Err(PpError::Negative { what, value: v });
    }
    Ok(v)
}

/// Clamp a ratio into the domain of `acos`/`asin`.
///
/// Ratios like `P / |S|` can overshoot `±1` by a few ulps at the boundary.
#[inline]
pub fn clamp_unit(ratio: Real) -> Real {
    ratio.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solved_bound_absorbs_inverse_trig_error() {
        let p = 0.3_f64;
        let back = p.acos().cos();
        assert!(nearly_equal(back, p, Tolerances::SOLVED));
        assert!(nearly_equal(1e6, 1e6 + 1e-4, Tolerances::SOLVED));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, Tolerances::SOLVED));
        assert!(!nearly_equal(0.0, 1e-10, Tolerances::TIGHT));
    }

    #[test]
    fn nan_is_never_nearly_equal() {
        assert!(!nearly_equal(Real::NAN, Real::NAN, Tolerances::SOLVED));
        assert!(!nearly_equal(Real::NAN, 0.0, Tolerances::new(Real::INFINITY, 0.0)));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn ensure_non_negative_rejects_negative_and_infinite() {
        assert_eq!(ensure_non_negative(0.0, "amp"), Ok(0.0));
        assert!(matches!(
            ensure_non_negative(-0.5, "amp"),
            Err(PpError::Negative { what: "amp", .. })
        ));
        assert!(matches!(
            ensure_non_negative(Real::INFINITY, "amp"),
            Err(PpError::NonFinite { .. })
        ));
    }

    #[test]
    fn clamp_unit_pulls_overshoot_back() {
        assert_eq!(clamp_unit(1.0 + 1e-15), 1.0);
        assert_eq!(clamp_unit(-1.0 - 1e-15), -1.0);
        assert_eq!(clamp_unit(0.25), 0.25);
        assert!((1.0_f64 + 1e-15).acos().is_nan());
        assert_eq!(clamp_unit(1.0 + 1e-15).acos(), 0.0);
    }
}
