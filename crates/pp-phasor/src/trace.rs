//! Render-ready trace data for the phasor diagram and waveform plot.
//!
//! Nothing here draws; a frontend reads these numbers and plots them.

use num_complex::Complex64;
use pp_core::Real;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

use crate::model::PhasorModel;

/// Sampling resolution for the traces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceSpec {
    /// Samples per locus over one cycle.
    pub circle_points: usize,
    /// Samples across the waveform window.
    pub wave_points: usize,
    /// Waveform window start (radians).
    pub wave_start_rad: Real,
    /// Waveform window end, exclusive (radians).
    pub wave_end_rad: Real,
}

impl Default for TraceSpec {
    fn default() -> Self {
        Self {
            circle_points: 360,
            wave_points: 1000,
            wave_start_rad: -PI,
            wave_end_rad: 3.0 * PI,
        }
    }
}

impl TraceSpec {
    /// Angles at which the loci are sampled: [0, 2π).
    pub fn circle_grid(&self) -> Vec<Real> {
        sample_grid(0.0, TAU, self.circle_points)
    }

    /// Angles at which the waveforms are sampled: [start, end).
    pub fn wave_grid(&self) -> Vec<Real> {
        sample_grid(self.wave_start_rad, self.wave_end_rad, self.wave_points)
    }
}

fn sample_grid(start: Real, end: Real, n: usize) -> Vec<Real> {
    let step = (end - start) / n as Real;
    (0..n).map(|k| start + k as Real * step).collect()
}

/// Line segment in the complex plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub from: Complex64,
    pub to: Complex64,
}

impl Segment {
    fn from_origin(to: Complex64) -> Self {
        Self {
            from: Complex64::new(0.0, 0.0),
            to,
        }
    }
}

/// Phasor arrows at the instantaneous phase. `s` starts at the steady term
/// S0 and ends at S = S0 + S1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhasorLines {
    pub u: Segment,
    pub i: Segment,
    pub s: Segment,
}

/// Paths traced by U, I and S over one full cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhasorLoci {
    pub u: Vec<Complex64>,
    pub i: Vec<Complex64>,
    pub s: Vec<Complex64>,
}

/// Projections of the instantaneous phasors onto the axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueMarkers {
    pub u: Real,
    pub i: Real,
    pub p: Real,
    pub q: Real,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Waveforms {
    pub phi: Vec<Real>,
    pub u: Vec<Real>,
    pub i: Vec<Real>,
    pub s: Vec<Real>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhasorTraces {
    pub lines: PhasorLines,
    pub loci: PhasorLoci,
    pub markers: ValueMarkers,
    pub waveforms: Waveforms,
    /// Cursor positions on the waveform plot: one cycle back, now, one ahead.
    pub timelines: [Real; 3],
}

impl PhasorTraces {
    pub fn compute(model: &PhasorModel, spec: &TraceSpec) -> Self {
        let (u, i, s0, s) = (model.u_now(), model.i_now(), model.s0_now(), model.s_now());

        let circle = spec.circle_grid();
        let loci = PhasorLoci {
            u: model.u(&circle),
            i: model.i(&circle),
            s: model.s(&circle),
        };

        let phi = spec.wave_grid();
        let re = |v: Vec<Complex64>| v.into_iter().map(|c| c.re).collect::<Vec<_>>();
        let waveforms = Waveforms {
            u: re(model.u(&phi)),
            i: re(model.i(&phi)),
            s: re(model.s(&phi)),
            phi,
        };

        let now = model.inst_phi;
        Self {
            lines: PhasorLines {
                u: Segment::from_origin(u),
                i: Segment::from_origin(i),
                s: Segment { from: s0, to: s },
            },
            loci,
            markers: ValueMarkers {
                u: u.re,
                i: i.re,
                p: s.re,
                q: s.im,
            },
            waveforms,
            timelines: [now - TAU, now, now + TAU],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pp_core::Phase;

    fn model() -> PhasorModel {
        PhasorModel {
            u0: 1.0,
            u_angle: 0.0,
            i0: 0.5,
            i_angle: -0.4,
            inst_phi: 0.0,
        }
        .with_inst_phi(Phase::from_degrees(30.0))
    }

    #[test]
    fn default_resolution_matches_plot_layout() {
        let spec = TraceSpec::default();
        let circle = spec.circle_grid();
        assert_eq!(circle.len(), 360);
        assert_eq!(circle[0], 0.0);
        assert!((circle[1] - PI / 180.0).abs() < 1e-15);
        let wave = spec.wave_grid();
        assert_eq!(wave.len(), 1000);
        assert_eq!(wave[0], -PI);
        assert!(*wave.last().unwrap() < 3.0 * PI);
    }

    #[test]
    fn traces_follow_model() {
        let m = model();
        let traces = PhasorTraces::compute(&m, &TraceSpec::default());

        assert_eq!(traces.lines.u.to, m.u_now());
        assert_eq!(traces.lines.s.from, m.s0_now());
        assert_eq!(traces.markers.q, m.s_now().im);
        assert_eq!(traces.loci.u.len(), 360);
        assert_eq!(traces.waveforms.s.len(), 1000);

        // The voltage locus is a circle of radius U0
        assert!(traces.loci.u.iter().all(|c| (c.norm() - 1.0).abs() < 1e-12));
        // The power locus is a circle of radius |S1| centred on S0
        let s0 = m.steady_power();
        assert!(traces.loci.s.iter().all(|c| ((c - s0).norm() - 0.5).abs() < 1e-12));
    }

    #[test]
    fn timelines_bracket_inst_phi() {
        let m = model();
        let traces = PhasorTraces::compute(&m, &TraceSpec::default());
        let [back, now, ahead] = traces.timelines;
        assert_eq!(now, m.inst_phi);
        assert!((ahead - back - 2.0 * TAU).abs() < 1e-12);
    }
}
