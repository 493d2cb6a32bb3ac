//! Engine configuration, loaded from YAML.
//!
//! Every field has a default, so an empty document is a valid config:
//!
//! ```yaml
//! display:
//!   amplitude_scale: 100.0
//! playback:
//!   period_ms: 100
//!   step_deg: 1.0
//! traces:
//!   circle_points: 360
//!   wave_points: 1000
//! ```

use std::path::Path;
use std::time::Duration;

use pp_core::{PerUnitScale, Real};
use pp_phasor::TraceSpec;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub display: DisplayConfig,
    pub playback: PlaybackConfig,
    pub traces: TraceSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Dial units per per-unit, for amplitudes and powers.
    pub amplitude_scale: Real,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            amplitude_scale: PerUnitScale::DEFAULT.get(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Time between phase steps.
    pub period_ms: u64,
    /// Phase increment per step, in degrees.
    pub step_deg: Real,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            period_ms: 100,
            step_deg: 1.0,
        }
    }
}

impl PlaybackConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

impl EngineConfig {
    pub fn from_yaml_str(content: &str) -> AppResult<Self> {
        let config: EngineConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_yaml(path: &Path) -> AppResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|source| AppError::ConfigFileRead {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_yaml_str(&content)
    }

    pub fn validate(&self) -> AppResult<()> {
        PerUnitScale::new(self.display.amplitude_scale).map_err(|_| AppError::Config {
            what: "display.amplitude_scale must be positive and finite",
        })?;
        if self.playback.period_ms == 0 {
            return Err(AppError::Config {
                what: "playback.period_ms must be positive",
            });
        }
        if !self.playback.step_deg.is_finite() {
            return Err(AppError::Config {
                what: "playback.step_deg must be finite",
            });
        }
        if self.traces.circle_points < 2 || self.traces.wave_points < 2 {
            return Err(AppError::Config {
                what: "traces need at least 2 points",
            });
        }
        if !(self.traces.wave_end_rad > self.traces.wave_start_rad) {
            return Err(AppError::Config {
                what: "traces.wave_end_rad must exceed traces.wave_start_rad",
            });
        }
        Ok(())
    }

    pub fn scale(&self) -> AppResult<PerUnitScale> {
        Ok(PerUnitScale::new(self.display.amplitude_scale)?)
    }
}
