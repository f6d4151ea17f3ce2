// castor_sim/src/simulation/config/structs.rs

use castor_core::prelude::{
    CasterGeometry, CasterReading, ContactGeometry, DormandPrince45, FixedStepScheme,
    InitialCondition, MeasuredPose, PhysicalConstants, WheelCommand,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::SimError;

// =========================================================================
// == Top-Level Scenario ==
// =========================================================================

/// # ScenarioConfig
/// Everything needed for one prediction run. This struct is the root of the
/// data parsed from a `scenario.toml` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)] // Fail if the TOML has fields not in our struct
pub struct ScenarioConfig {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub constants: PhysicalConstants,

    #[serde(default)]
    pub contact_geometry: ContactGeometry,

    #[serde(default)]
    pub caster_geometry: CasterGeometry,

    #[serde(default)]
    pub command: WheelCommand,

    #[serde(default)]
    pub initial: InitialConfig,

    #[serde(default)]
    pub integration: IntegrationConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationConfig>,
}

// =========================================================================
// == Configuration Sub-Structs ==
// These map directly to the sections in a scenario.toml file.
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// 5 states, caster angles held at their initial readings.
    #[default]
    Chassis,
    /// 7 states, caster angles integrated.
    Caster,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    pub kind: ModelKind,
}

/// The samples the upstream feeds had published when the run starts.
/// Either may be left out to mimic a feed that never reported.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct InitialConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose: Option<MeasuredPose>,
    /// Caster joint readings, sensor convention.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub casters: Option<CasterReading>,
}

impl InitialConfig {
    pub fn to_initial_condition(&self) -> InitialCondition {
        InitialCondition {
            pose: self.pose,
            casters: self.casters,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationMode {
    /// Fixed-step Runge-Kutta.
    #[default]
    Fixed,
    /// Adaptive Dormand-Prince sampled on a uniform grid (chassis model only).
    Grid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntegrationConfig {
    /// Step size, and grid spacing in grid mode (s).
    #[serde(default = "default_dt")]
    pub dt: f64,
    /// Number of steps. Exactly one of `steps` and `duration` must be set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<usize>,
    /// Horizon in seconds, converted to `round(duration / dt)` steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default)]
    pub scheme: FixedStepScheme,
    #[serde(default)]
    pub mode: IntegrationMode,
    #[serde(default)]
    pub solver: DormandPrince45,
}

fn default_dt() -> f64 {
    0.01
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            dt: default_dt(),
            steps: None,
            duration: None,
            scheme: FixedStepScheme::default(),
            mode: IntegrationMode::default(),
            solver: DormandPrince45::default(),
        }
    }
}

impl IntegrationConfig {
    pub fn resolve_steps(&self) -> Result<usize, SimError> {
        match (self.steps, self.duration) {
            (Some(steps), None) => Ok(steps),
            (None, Some(duration)) => {
                if !(duration.is_finite() && duration >= 0.0) {
                    return Err(SimError::InvalidScenario(format!(
                        "integration.duration must be a non-negative number, got {duration}"
                    )));
                }
                if !(self.dt.is_finite() && self.dt > 0.0) {
                    return Err(SimError::InvalidScenario(format!(
                        "integration.dt must be positive, got {}",
                        self.dt
                    )));
                }
                let steps = (duration / self.dt).round();
                // `usize::MAX as f64` rounds up to 2^64, so `>=` excludes it.
                if !steps.is_finite() || steps >= usize::MAX as f64 {
                    return Err(SimError::InvalidScenario(format!(
                        "integration.duration {duration} at dt {} needs too many steps",
                        self.dt
                    )));
                }
                Ok(steps as usize)
            }
            (Some(_), Some(_)) => Err(SimError::InvalidScenario(
                "set either integration.steps or integration.duration, not both".to_string(),
            )),
            (None, None) => Err(SimError::InvalidScenario(
                "integration.steps or integration.duration is required".to_string(),
            )),
        }
    }
}

/// Which sign and angle convention exported rows use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportConvention {
    /// Raw state: negated y, model caster angles.
    Model,
    /// World y and sensor caster angles, comparable with recorded data.
    #[default]
    World,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Write a header row with the column names.
    #[serde(default)]
    pub header: bool,
    #[serde(default)]
    pub convention: ExportConvention,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: None,
            delimiter: default_delimiter(),
            header: false,
            convention: ExportConvention::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationConfig {
    /// Recorded `x y th l_caster r_caster` table, one row per sample.
    pub measured: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_delimiter() -> char {
    ' '
}

/// CSV delimiters must be a single ASCII byte.
pub fn delimiter_byte(delimiter: char) -> Result<u8, SimError> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| {
            SimError::InvalidScenario(format!(
                "delimiter {delimiter:?} is not a single ASCII character"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_come_from_either_field() {
        let mut integration = IntegrationConfig {
            dt: 0.02,
            duration: Some(6.0),
            ..Default::default()
        };
        assert_eq!(integration.resolve_steps().unwrap(), 300);

        integration.duration = None;
        integration.steps = Some(42);
        assert_eq!(integration.resolve_steps().unwrap(), 42);
    }

    #[test]
    fn ambiguous_or_missing_horizon_is_rejected() {
        let both = IntegrationConfig {
            steps: Some(1),
            duration: Some(1.0),
            ..Default::default()
        };
        assert!(both.resolve_steps().is_err());
        assert!(IntegrationConfig::default().resolve_steps().is_err());
    }

    #[test]
    fn unrepresentable_step_count_is_rejected() {
        for (duration, dt) in [(1e300, 1e-300), (1e20, 1e-3)] {
            let integration = IntegrationConfig {
                dt,
                duration: Some(duration),
                ..Default::default()
            };
            assert!(matches!(
                integration.resolve_steps(),
                Err(SimError::InvalidScenario(_))
            ));
        }
    }

    #[test]
    fn delimiter_must_be_ascii() {
        assert_eq!(delimiter_byte(',').unwrap(), b',');
        assert_eq!(delimiter_byte(' ').unwrap(), b' ');
        assert!(delimiter_byte('é').is_err());
    }
}
