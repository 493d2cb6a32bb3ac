//! The electrical state record and its read-only snapshot.

use num_complex::Complex64;
use pp_core::{Phase, Real, ensure_finite, ensure_non_negative};
use serde::Serialize;

use crate::PhasorResult;
use crate::model::PhasorModel;

/// Amplitudes and angles the model is built from.
///
/// Amplitudes are per-unit and never negative; angles are [`Phase`]s and so
/// always canonical. Derived phasors are recomputed on demand through
/// [`ElectricalState::model`], never cached here.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ElectricalState {
    u0: Real,
    u_angle: Phase,
    i0: Real,
    i_angle: Phase,
    inst_phi: Phase,
}

impl ElectricalState {
    pub fn u0(&self) -> Real {
        self.u0
    }

    pub fn u_angle(&self) -> Phase {
        self.u_angle
    }

    pub fn i0(&self) -> Real {
        self.i0
    }

    pub fn i_angle(&self) -> Phase {
        self.i_angle
    }

    pub fn inst_phi(&self) -> Phase {
        self.inst_phi
    }

    pub fn set_voltage_amplitude(&mut self, u0: Real) -> PhasorResult<()> {
        self.u0 = ensure_non_negative(u0, "voltage amplitude")?;
        Ok(())
    }

    pub fn set_voltage_angle(&mut self, angle: Phase) -> PhasorResult<()> {
        ensure_finite(angle.radians(), "voltage angle")?;
        self.u_angle = angle;
        Ok(())
    }

    pub fn set_current_amplitude(&mut self, i0: Real) -> PhasorResult<()> {
        self.i0 = ensure_non_negative(i0, "current amplitude")?;
        Ok(())
    }

    pub fn set_current_angle(&mut self, angle: Phase) -> PhasorResult<()> {
        ensure_finite(angle.radians(), "current angle")?;
        self.i_angle = angle;
        Ok(())
    }

    pub fn set_inst_phi(&mut self, phi: Phase) -> PhasorResult<()> {
        ensure_finite(phi.radians(), "instantaneous phase")?;
        self.inst_phi = phi;
        Ok(())
    }

    pub fn model(&self) -> PhasorModel {
        PhasorModel {
            u0: self.u0,
            u_angle: self.u_angle.radians(),
            i0: self.i0,
            i_angle: self.i_angle.radians(),
            inst_phi: self.inst_phi.radians(),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let model = self.model();
        Snapshot {
            u0: self.u0,
            u_angle: self.u_angle.radians(),
            i0: self.i0,
            i_angle: self.i_angle.radians(),
            inst_phi: self.inst_phi.radians(),
            u: model.u_now(),
            i: model.i_now(),
            s0: model.s0_now(),
            s1: model.s1_now(),
            s: model.s_now(),
            active_power: model.active_power(),
            reactive_power: model.reactive_power(),
            apparent_power: model.apparent_power(),
        }
    }
}

/// Consistent read-only view of the state and every derived phasor.
///
/// Angles are radians; the complex values are evaluated at `inst_phi`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    pub u0: Real,
    pub u_angle: Real,
    pub i0: Real,
    pub i_angle: Real,
    pub inst_phi: Real,
    pub u: Complex64,
    pub i: Complex64,
    pub s0: Complex64,
    pub s1: Complex64,
    pub s: Complex64,
    pub active_power: Real,
    pub reactive_power: Real,
    pub apparent_power: Real,
}

impl Snapshot {
    pub fn model(&self) -> PhasorModel {
        PhasorModel {
            u0: self.u0,
            u_angle: self.u_angle,
            i0: self.i0,
            i_angle: self.i_angle,
            inst_phi: self.inst_phi,
        }
    }
}
