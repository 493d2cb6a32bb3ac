//! Phasor arithmetic.
//!
//! ```text
//! U(φ)  = U0 · e^(jUangle) · e^(jφ)
//! I(φ)  = I0 · e^(jIangle) · e^(jφ)
//! S1(φ) = U(φ) · I(φ)          double-frequency term
//! S0(φ) = U(φ) · conj(I(φ))    steady term, independent of φ
//! S(φ)  = S0(φ) + S1(φ)
//! ```
//!
//! Every quantity accepts either a single angle or a slice of angles through
//! [`PhaseArg`], so a caller tracing a full cycle uses the same method as one
//! asking for the instantaneous value.

use num_complex::Complex64;
use pp_core::{Phase, Real};

/// An angle argument: a scalar yields one phasor, a sequence yields one per angle.
pub trait PhaseArg {
    type Output;

    fn eval<F: Fn(Real) -> Complex64>(self, f: F) -> Self::Output;
}

impl PhaseArg for Real {
    type Output = Complex64;

    fn eval<F: Fn(Real) -> Complex64>(self, f: F) -> Complex64 {
        f(self)
    }
}

impl PhaseArg for Phase {
    type Output = Complex64;

    fn eval<F: Fn(Real) -> Complex64>(self, f: F) -> Complex64 {
        f(self.radians())
    }
}

impl PhaseArg for &[Real] {
    type Output = Vec<Complex64>;

    fn eval<F: Fn(Real) -> Complex64>(self, f: F) -> Vec<Complex64> {
        self.iter().map(|&phi| f(phi)).collect()
    }
}

impl PhaseArg for &Vec<Real> {
    type Output = Vec<Complex64>;

    fn eval<F: Fn(Real) -> Complex64>(self, f: F) -> Vec<Complex64> {
        self.as_slice().eval(f)
    }
}

impl<const N: usize> PhaseArg for &[Real; N] {
    type Output = [Complex64; N];

    fn eval<F: Fn(Real) -> Complex64>(self, f: F) -> [Complex64; N] {
        std::array::from_fn(|k| f(self[k]))
    }
}

/// Amplitudes and angles the phasors are evaluated from.
///
/// Built from an `ElectricalState`; the `with_*` overrides let a caller
/// probe hypothetical values without touching stored state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhasorModel {
    pub u0: Real,
    pub u_angle: Real,
    pub i0: Real,
    pub i_angle: Real,
    pub inst_phi: Real,
}

impl PhasorModel {
    pub fn with_voltage(mut self, u0: Real, u_angle: Phase) -> Self {
        self.u0 = u0;
        self.u_angle = u_angle.radians();
        self
    }

    pub fn with_current(mut self, i0: Real, i_angle: Phase) -> Self {
        self.i0 = i0;
        self.i_angle = i_angle.radians();
        self
    }

    pub fn with_inst_phi(mut self, inst_phi: Phase) -> Self {
        self.inst_phi = inst_phi.radians();
        self
    }

    fn u_at(&self, phi: Real) -> Complex64 {
        Complex64::from_polar(self.u0, self.u_angle) * Complex64::cis(phi)
    }

    fn i_at(&self, phi: Real) -> Complex64 {
        Complex64::from_polar(self.i0, self.i_angle) * Complex64::cis(phi)
    }

    fn s0_at(&self, phi: Real) -> Complex64 {
        self.u_at(phi) * self.i_at(phi).conj()
    }

    fn s1_at(&self, phi: Real) -> Complex64 {
        self.u_at(phi) * self.i_at(phi)
    }

    fn s_at(&self, phi: Real) -> Complex64 {
        self.s0_at(phi) + self.s1_at(phi)
    }

    pub fn u<P: PhaseArg>(&self, phi: P) -> P::Output {
        phi.eval(|p| self.u_at(p))
    }

    pub fn i<P: PhaseArg>(&self, phi: P) -> P::Output {
        phi.eval(|p| self.i_at(p))
    }

    pub fn s0<P: PhaseArg>(&self, phi: P) -> P::Output {
        phi.eval(|p| self.s0_at(p))
    }

    pub fn s1<P: PhaseArg>(&self, phi: P) -> P::Output {
        phi.eval(|p| self.s1_at(p))
    }

    pub fn s<P: PhaseArg>(&self, phi: P) -> P::Output {
        phi.eval(|p| self.s_at(p))
    }

    /// U at the instantaneous phase.
    pub fn u_now(&self) -> Complex64 {
        self.u_at(self.inst_phi)
    }

    pub fn i_now(&self) -> Complex64 {
        self.i_at(self.inst_phi)
    }

    pub fn s0_now(&self) -> Complex64 {
        self.s0_at(self.inst_phi)
    }

    pub fn s1_now(&self) -> Complex64 {
        self.s1_at(self.inst_phi)
    }

    pub fn s_now(&self) -> Complex64 {
        self.s_at(self.inst_phi)
    }

    /// Steady complex power. The e^(jφ) factors cancel, so φ = 0 is as good as any.
    pub fn steady_power(&self) -> Complex64 {
        self.s0_at(0.0)
    }

    /// P = Re(S0)
    pub fn active_power(&self) -> Real {
        self.steady_power().re
    }

    /// Q = Im(S0)
    pub fn reactive_power(&self) -> Real {
        self.steady_power().im
    }

    /// |S0|
    pub fn apparent_power(&self) -> Real {
        self.steady_power().norm()
    }

    /// P / |S0|, taken as 1 when nothing flows.
    pub fn power_factor(&self) -> Real {
        let s = self.apparent_power();
        if s == 0.0 { 1.0 } else { self.active_power() / s }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

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
    fn unity_power_factor() {
        let m = unity();
        let s0 = m.steady_power();
        assert!((s0.re - 1.0).abs() < 1e-12);
        assert!(s0.im.abs() < 1e-12);
        assert!((m.apparent_power() - 1.0).abs() < 1e-12);
        assert!((m.power_factor() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn scalar_and_slice_agree() {
        let m = unity().with_current(0.5, Phase::from_degrees(-30.0));
        let phis = [0.0, 0.3, FRAC_PI_2, PI];
        let from_array = m.s(&phis);
        let from_slice = m.s(&phis[..]);
        let from_vec = m.s(&phis.to_vec());
        for (k, &phi) in phis.iter().enumerate() {
            let scalar = m.s(phi);
            assert!((from_array[k] - scalar).norm() < 1e-12);
            assert!((from_slice[k] - scalar).norm() < 1e-12);
            assert!((from_vec[k] - scalar).norm() < 1e-12);
        }
    }

    #[test]
    fn instantaneous_values_use_inst_phi() {
        let m = unity().with_inst_phi(Phase::from_degrees(90.0));
        assert!((m.u_now() - Complex64::new(0.0, 1.0)).norm() < 1e-12);
        // S1 rotates at twice the rate
        assert!((m.s1_now() - Complex64::new(-1.0, 0.0)).norm() < 1e-12);
        assert!((m.s_now() - Complex64::new(0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn lagging_current_gives_positive_q() {
        let m = unity().with_current(1.0, Phase::from_degrees(-90.0));
        assert!(m.active_power().abs() < 1e-12);
        assert!((m.reactive_power() - 1.0).abs() < 1e-12);
        assert!(m.power_factor().abs() < 1e-12);
    }

    #[test]
    fn zero_current_has_unit_power_factor() {
        let m = unity().with_current(0.0, Phase::ZERO);
        assert_eq!(m.apparent_power(), 0.0);
        assert_eq!(m.power_factor(), 1.0);
    }
}
