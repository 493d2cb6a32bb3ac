//! Inverse power solver.
//!
//! Given a target for one steady power component and the voltage phasor,
//! back-solve a current phasor that reproduces it:
//!
//! - **Apparent** `S`: `I0 = S / U0`, current angle untouched.
//! - **Active** `P`: hold `Q` at its prior value, `S' = |P + jQ|`,
//!   `I0 = S' / U0`, `Iangle = Uangle − acos(P / S')`.
//! - **Reactive** `Q`: hold `P` at its prior value, `S' = |P + jQ|`,
//!   `I0 = S' / U0`, `Iangle = Uangle − asin(Q / S')`.
//!
//! The inverse trig call returns the principal value. A second current angle
//! reaches the same target; it is reported as `alternate_i_angle` but never
//! applied.

use num_complex::Complex64;
use pp_core::{
    Phase, PpError, Real, Tolerances, clamp_unit, ensure_finite, ensure_non_negative,
};
use std::f64::consts::PI;
use tracing::debug;

use crate::error::{PhasorError, PhasorResult};
use crate::model::PhasorModel;

/// Requested value for one steady power component, in per-unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PowerTarget {
    Apparent(Real),
    Active(Real),
    Reactive(Real),
}

impl PowerTarget {
    pub fn value(self) -> Real {
        match self {
            PowerTarget::Apparent(v) | PowerTarget::Active(v) | PowerTarget::Reactive(v) => v,
        }
    }

    fn validate(self) -> PhasorResult<Self> {
        match self {
            PowerTarget::Apparent(s) => {
                ensure_non_negative(s, "apparent power")?;
            }
            PowerTarget::Active(p) => {
                ensure_finite(p, "active power")?;
            }
            PowerTarget::Reactive(q) => {
                ensure_finite(q, "reactive power")?;
            }
        }
        Ok(self)
    }
}

/// Current phasor that reproduces a [`PowerTarget`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PowerSolution {
    pub i0: Real,
    /// `None` leaves the current angle as it was.
    pub i_angle: Option<Phase>,
    /// The non-principal angle reaching the same target, when distinct.
    pub alternate_i_angle: Option<Phase>,
}

pub struct PowerSolver;

impl PowerSolver {
    pub fn solve(
        target: PowerTarget,
        u0: Real,
        u_angle: Phase,
        prior_s0: Complex64,
    ) -> PhasorResult<PowerSolution> {
        let target = target.validate()?;
        ensure_non_negative(u0, "voltage amplitude")?;
        if u0 == 0.0 {
            return Err(PhasorError::Domain {
                what: "power target requires non-zero voltage amplitude",
            });
        }

        let solution = match target {
            PowerTarget::Apparent(s) => PowerSolution {
                i0: current_amplitude(s, u0)?,
                i_angle: None,
                alternate_i_angle: None,
            },
            PowerTarget::Active(p) => {
                let s = p.hypot(prior_s0.im);
                if s == 0.0 {
                    return Ok(PowerSolution::zero());
                }
                let delta = inverse_trig(clamp_unit(p / s).acos())?;
                PowerSolution {
                    i0: current_amplitude(s, u0)?,
                    i_angle: Some(Phase::from_radians(u_angle.radians() - delta)),
                    alternate_i_angle: distinct(u_angle, delta, -delta),
                }
            }
            PowerTarget::Reactive(q) => {
                let s = prior_s0.re.hypot(q);
                if s == 0.0 {
                    return Ok(PowerSolution::zero());
                }
                let delta = inverse_trig(clamp_unit(q / s).asin())?;
                PowerSolution {
                    i0: current_amplitude(s, u0)?,
                    i_angle: Some(Phase::from_radians(u_angle.radians() - delta)),
                    alternate_i_angle: distinct(u_angle, delta, PI - delta),
                }
            }
        };

        debug!(?target, i0 = solution.i0, "power target solved");
        Ok(solution)
    }

    /// Solve against a model's voltage and steady power.
    pub fn solve_for(model: &PhasorModel, target: PowerTarget) -> PhasorResult<PowerSolution> {
        Self::solve(
            target,
            model.u0,
            Phase::from_radians(model.u_angle),
            model.steady_power(),
        )
    }
}

impl PowerSolution {
    fn zero() -> Self {
        Self {
            i0: 0.0,
            i_angle: None,
            alternate_i_angle: None,
        }
    }

    /// Apply this solution to a model's current phasor.
    pub fn apply_to(&self, model: PhasorModel) -> PhasorModel {
        let angle = self
            .i_angle
            .unwrap_or_else(|| Phase::from_radians(model.i_angle));
        model.with_current(self.i0, angle)
    }
}

fn current_amplitude(s: Real, u0: Real) -> PhasorResult<Real> {
    let i0 = s / u0;
    if !i0.is_finite() {
        return Err(PhasorError::Domain {
            what: "current amplitude overflows for this voltage",
        });
    }
    Ok(i0)
}

fn inverse_trig(delta: Real) -> PhasorResult<Real> {
    ensure_finite(delta, "power angle").map_err(|_: PpError| PhasorError::Domain {
        what: "power ratio outside the domain of the inverse trig function",
    })
}

fn distinct(u_angle: Phase, principal: Real, other: Real) -> Option<Phase> {
    let a = Phase::from_radians(u_angle.radians() - principal);
    let b = Phase::from_radians(u_angle.radians() - other);
    (!a.approx_eq(b, Tolerances::TIGHT)).then_some(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::SQRT_2;

    fn unity() -> PhasorModel {
        PhasorModel {
            u0: 1.0,
            u_angle: 0.0,
            i0: 1.0,
            i_angle: 0.0,
            inst_phi: 0.0,
        }
    }

    #[test]
    fn reactive_target_on_unity_load() {
        let m = unity();
        let sol = PowerSolver::solve_for(&m, PowerTarget::Reactive(1.0)).unwrap();
        assert!((sol.i0 - SQRT_2).abs() < 1e-12);
        let angle = sol.i_angle.unwrap();
        assert!((angle.degrees() + 45.0).abs() < 1e-9);

        let solved = sol.apply_to(m);
        assert!((solved.reactive_power() - 1.0).abs() < 1e-12);
        assert!((solved.active_power() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn apparent_target_scales_magnitude_only() {
        let m = unity().with_current(1.0, Phase::from_degrees(-30.0));
        let sol = PowerSolver::solve_for(&m, PowerTarget::Apparent(2.0)).unwrap();
        assert!((sol.i0 - 2.0).abs() < 1e-12);
        assert_eq!(sol.i_angle, None);
        let solved = sol.apply_to(m);
        assert!((solved.apparent_power() - 2.0).abs() < 1e-12);
        assert!((solved.i_angle - m.i_angle).abs() < 1e-12);
    }

    #[test]
    fn active_target_holds_q() {
        let m = unity().with_current(1.0, Phase::from_degrees(-60.0));
        let q = m.reactive_power();
        let sol = PowerSolver::solve_for(&m, PowerTarget::Active(0.2)).unwrap();
        let solved = sol.apply_to(m);
        assert!((solved.active_power() - 0.2).abs() < 1e-12);
        assert!((solved.reactive_power() - q).abs() < 1e-12);
        assert!(sol.alternate_i_angle.is_some());
    }

    #[test]
    fn alternate_branch_reaches_same_target() {
        let m = unity().with_current(0.5, Phase::from_degrees(-20.0));
        let sol = PowerSolver::solve_for(&m, PowerTarget::Reactive(0.4)).unwrap();
        let alt = sol.alternate_i_angle.unwrap();
        let other = m.with_current(sol.i0, alt);
        assert!((other.reactive_power() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn boundary_ratio_has_no_alternate() {
        // Q = 0, so both branches land on the same angle, including ±180°
        let m = unity();
        for p in [0.7, -0.7] {
            let sol = PowerSolver::solve_for(&m, PowerTarget::Active(p)).unwrap();
            assert_eq!(sol.alternate_i_angle, None, "P = {p}");
        }
    }

    #[test]
    fn zero_voltage_is_a_domain_error() {
        let m = unity().with_voltage(0.0, Phase::ZERO);
        for target in [
            PowerTarget::Apparent(1.0),
            PowerTarget::Active(1.0),
            PowerTarget::Reactive(1.0),
        ] {
            let err = PowerSolver::solve_for(&m, target).unwrap_err();
            assert!(err.is_domain(), "{target:?} gave {err}");
        }
    }

    #[test]
    fn negative_apparent_is_a_validation_error() {
        let err = PowerSolver::solve_for(&unity(), PowerTarget::Apparent(-1.0)).unwrap_err();
        assert!(err.is_validation());
        let err = PowerSolver::solve_for(&unity(), PowerTarget::Active(Real::NAN)).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn boundary_ratio_is_clamped() {
        // Q = 0 makes P / S' exactly ±1; the result must stay finite
        let m = unity();
        let sol = PowerSolver::solve_for(&m, PowerTarget::Active(-0.7)).unwrap();
        let angle = sol.i_angle.unwrap();
        assert!(angle.radians().is_finite());
        let solved = sol.apply_to(m);
        assert!((solved.active_power() + 0.7).abs() < 1e-12);
    }

    #[test]
    fn zero_target_with_zero_held_component_zeroes_current() {
        let m = unity();
        let sol = PowerSolver::solve_for(&m, PowerTarget::Reactive(0.0)).unwrap();
        assert!((sol.i0 - 1.0).abs() < 1e-12);
        let m = unity().with_current(0.0, Phase::ZERO);
        let sol = PowerSolver::solve_for(&m, PowerTarget::Reactive(0.0)).unwrap();
        assert_eq!(sol.i0, 0.0);
        assert_eq!(sol.i_angle, None);
    }
}
