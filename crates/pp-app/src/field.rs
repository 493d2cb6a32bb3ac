//! Displayed fields, edit decoding and the per-field display contract.

use std::fmt;
use std::str::FromStr;

use pp_core::{DialDegrees, PerUnitScale, Phase, Real, ensure_finite, normalize};
use pp_phasor::{ElectricalState, PhasorResult, PowerSolver, PowerTarget, Snapshot};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Every value the UI displays and lets the user edit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldId {
    VoltageAmplitude,
    VoltageAngle,
    CurrentAmplitude,
    CurrentAngle,
    InstantaneousPhase,
    ApparentPower,
    ActivePower,
    ReactivePower,
}

impl FieldId {
    pub const ALL: [FieldId; 8] = [
        FieldId::VoltageAmplitude,
        FieldId::VoltageAngle,
        FieldId::CurrentAmplitude,
        FieldId::CurrentAngle,
        FieldId::InstantaneousPhase,
        FieldId::ApparentPower,
        FieldId::ActivePower,
        FieldId::ReactivePower,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FieldId::VoltageAmplitude => "voltage_amplitude",
            FieldId::VoltageAngle => "voltage_angle",
            FieldId::CurrentAmplitude => "current_amplitude",
            FieldId::CurrentAngle => "current_angle",
            FieldId::InstantaneousPhase => "instantaneous_phase",
            FieldId::ApparentPower => "apparent_power",
            FieldId::ActivePower => "active_power",
            FieldId::ReactivePower => "reactive_power",
        }
    }

    fn short_name(self) -> &'static str {
        match self {
            FieldId::VoltageAmplitude => "u0",
            FieldId::VoltageAngle => "uangle",
            FieldId::CurrentAmplitude => "i0",
            FieldId::CurrentAngle => "iangle",
            FieldId::InstantaneousPhase => "phi",
            FieldId::ApparentPower => "s",
            FieldId::ActivePower => "p",
            FieldId::ReactivePower => "q",
        }
    }

    pub fn is_power(self) -> bool {
        matches!(
            self,
            FieldId::ApparentPower | FieldId::ActivePower | FieldId::ReactivePower
        )
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FieldId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        FieldId::ALL
            .into_iter()
            .find(|f| f.name() == key || f.short_name() == key)
            .ok_or_else(|| AppError::InvalidInput(format!("unknown field '{s}'")))
    }
}

/// Set of fields, used to name which fields a settle pass must not write back.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldSet(u8);

impl FieldSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn only(field: FieldId) -> Self {
        Self(field.bit())
    }

    pub fn with(mut self, field: FieldId) -> Self {
        self.0 |= field.bit();
        self
    }

    pub fn contains(self, field: FieldId) -> bool {
        self.0 & field.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = FieldId> {
        FieldId::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

impl fmt::Debug for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Where a field value came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    /// Typed or dragged by the user.
    User,
    /// Issued by the playback scheduler.
    Playback,
    /// Written back by the engine while settling another edit.
    Programmatic,
}

/// A field value travelling between the engine and the UI, in display units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldEvent {
    pub field: FieldId,
    pub value: Real,
    pub origin: Origin,
}

/// A decoded edit in model units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Edit {
    VoltageAmplitude(Real),
    VoltageAngle(Phase),
    CurrentAmplitude(Real),
    CurrentAngle(Phase),
    InstantaneousPhase(Phase),
    Power(PowerTarget),
}

impl Edit {
    /// Produce the state that results from this edit, leaving `state` untouched.
    ///
    /// Power edits solve for the current phasor first and then set the
    /// current amplitude and angle like any other edit.
    pub fn apply_to(self, state: &ElectricalState) -> PhasorResult<ElectricalState> {
        let mut next = *state;
        match self {
            Edit::VoltageAmplitude(u0) => next.set_voltage_amplitude(u0)?,
            Edit::VoltageAngle(a) => next.set_voltage_angle(a)?,
            Edit::CurrentAmplitude(i0) => next.set_current_amplitude(i0)?,
            Edit::CurrentAngle(a) => next.set_current_angle(a)?,
            Edit::InstantaneousPhase(phi) => next.set_inst_phi(phi)?,
            Edit::Power(target) => {
                let solution = PowerSolver::solve_for(&state.model(), target)?;
                next.set_current_amplitude(solution.i0)?;
                if let Some(angle) = solution.i_angle {
                    next.set_current_angle(angle)?;
                }
            }
        }
        Ok(next)
    }
}

/// Conversion between dial readings and model values.
///
/// - amplitudes and powers: `model = raw / scale`
/// - angles: `model = normalize(raw)`, written back as a dial reading in [0, 360)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DisplayContract {
    scale: PerUnitScale,
}

impl DisplayContract {
    pub fn new(scale: PerUnitScale) -> Self {
        Self { scale }
    }

    pub fn scale(&self) -> PerUnitScale {
        self.scale
    }

    pub fn decode(&self, field: FieldId, raw: Real) -> PhasorResult<Edit> {
        let raw = ensure_finite(raw, field.name())?;
        let pu = self.scale.to_per_unit(raw);
        let angle = || normalize(DialDegrees(raw));
        Ok(match field {
            FieldId::VoltageAmplitude => Edit::VoltageAmplitude(pu),
            FieldId::VoltageAngle => Edit::VoltageAngle(angle()),
            FieldId::CurrentAmplitude => Edit::CurrentAmplitude(pu),
            FieldId::CurrentAngle => Edit::CurrentAngle(angle()),
            FieldId::InstantaneousPhase => Edit::InstantaneousPhase(angle()),
            FieldId::ApparentPower => Edit::Power(PowerTarget::Apparent(pu)),
            FieldId::ActivePower => Edit::Power(PowerTarget::Active(pu)),
            FieldId::ReactivePower => Edit::Power(PowerTarget::Reactive(pu)),
        })
    }

    pub fn encode(&self, field: FieldId, snapshot: &Snapshot) -> Real {
        let dial = |rad: Real| Phase::from_radians(rad).to_dial().get();
        match field {
            FieldId::VoltageAmplitude => self.scale.to_display(snapshot.u0),
            FieldId::VoltageAngle => dial(snapshot.u_angle),
            FieldId::CurrentAmplitude => self.scale.to_display(snapshot.i0),
            FieldId::CurrentAngle => dial(snapshot.i_angle),
            FieldId::InstantaneousPhase => dial(snapshot.inst_phi),
            FieldId::ApparentPower => self.scale.to_display(snapshot.apparent_power),
            FieldId::ActivePower => self.scale.to_display(snapshot.active_power),
            FieldId::ReactivePower => self.scale.to_display(snapshot.reactive_power),
        }
    }
}
