// castor_core/src/state.rs

//! State vector layout and construction from measured initial conditions.
//!
//! Column order is fixed:
//! `angular_rate, linear_rate, y_signed, x, heading[, left_caster, right_caster]`.
//!
//! `linear_rate` and `y_signed` carry the sign convention applied once on entry
//! (`linear_rate = -linear_x`, `y_signed = -y`). It is never re-derived mid-run.

use nalgebra::SVector;
use serde::{Deserialize, Serialize};

use crate::angles::th_to_al;
use crate::error::ModelError;
use crate::params::WheelCommand;

pub const CHASSIS_STATE_DIM: usize = 5;
pub const CASTER_STATE_DIM: usize = 7;

pub const ANGULAR_RATE: usize = 0;
pub const LINEAR_RATE: usize = 1;
pub const Y_SIGNED: usize = 2;
pub const X: usize = 3;
pub const HEADING: usize = 4;
pub const LEFT_CASTER: usize = 5;
pub const RIGHT_CASTER: usize = 6;

/// 5-state chassis-only vector.
pub type ChassisState = SVector<f64, CHASSIS_STATE_DIM>;
/// 7-state chassis + caster vector.
pub type CasterState = SVector<f64, CASTER_STATE_DIM>;

/// Names every column that can appear in a state vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateVariable {
    AngularRate,
    LinearRate,
    /// Lateral position in the model's negated-y convention.
    LateralPosition,
    LongitudinalPosition,
    Heading,
    /// Left caster steering angle, model convention.
    LeftCaster,
    /// Right caster steering angle, model convention.
    RightCaster,
}

impl StateVariable {
    pub fn column_name(&self) -> &'static str {
        match self {
            StateVariable::AngularRate => "angular_rate",
            StateVariable::LinearRate => "linear_rate",
            StateVariable::LateralPosition => "y",
            StateVariable::LongitudinalPosition => "x",
            StateVariable::Heading => "heading",
            StateVariable::LeftCaster => "left_caster",
            StateVariable::RightCaster => "right_caster",
        }
    }

    /// Whether the column is an angle that must be read modulo 2π.
    pub fn is_angle(&self) -> bool {
        matches!(
            self,
            StateVariable::Heading | StateVariable::LeftCaster | StateVariable::RightCaster
        )
    }
}

pub const CHASSIS_LAYOUT: [StateVariable; CHASSIS_STATE_DIM] = [
    StateVariable::AngularRate,
    StateVariable::LinearRate,
    StateVariable::LateralPosition,
    StateVariable::LongitudinalPosition,
    StateVariable::Heading,
];

pub const CASTER_LAYOUT: [StateVariable; CASTER_STATE_DIM] = [
    StateVariable::AngularRate,
    StateVariable::LinearRate,
    StateVariable::LateralPosition,
    StateVariable::LongitudinalPosition,
    StateVariable::Heading,
    StateVariable::LeftCaster,
    StateVariable::RightCaster,
];

/// A pose sample from the upstream odometry feed (world frame).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeasuredPose {
    pub x: f64,
    pub y: f64,
    /// Yaw in radians.
    pub heading: f64,
}

/// A caster joint sample, sensor convention.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CasterReading {
    pub left: f64,
    pub right: f64,
}

impl CasterReading {
    /// Converts both readings into model steering angles.
    pub fn to_model(&self) -> (f64, f64) {
        (th_to_al(self.left), th_to_al(self.right))
    }
}

/// The latest samples available when a prediction is requested.
///
/// Either sample may be absent if the corresponding feed never published.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InitialCondition {
    pub pose: Option<MeasuredPose>,
    pub casters: Option<CasterReading>,
}

impl InitialCondition {
    pub fn new(pose: MeasuredPose, casters: CasterReading) -> Self {
        Self {
            pose: Some(pose),
            casters: Some(casters),
        }
    }

    fn require_pose(&self) -> Result<MeasuredPose, ModelError> {
        self.pose
            .ok_or_else(|| ModelError::MissingInput("no pose sample received".to_string()))
    }

    pub fn require_casters(&self) -> Result<CasterReading, ModelError> {
        self.casters
            .ok_or_else(|| ModelError::MissingInput("no caster joint sample received".to_string()))
    }

    /// Builds the 5-state initial vector.
    pub fn chassis_state(&self, command: &WheelCommand) -> Result<ChassisState, ModelError> {
        let pose = self.require_pose()?;
        command.validate()?;
        let x0 = ChassisState::new(
            command.angular_z,
            -command.linear_x,
            -pose.y,
            pose.x,
            pose.heading,
        );
        require_finite_state(&x0)?;
        Ok(x0)
    }

    /// Builds the 7-state initial vector; caster readings are converted to
    /// model steering angles.
    pub fn caster_state(&self, command: &WheelCommand) -> Result<CasterState, ModelError> {
        let chassis = self.chassis_state(command)?;
        let (left, right) = self.require_casters()?.to_model();
        let x0 = CasterState::from([
            chassis[ANGULAR_RATE],
            chassis[LINEAR_RATE],
            chassis[Y_SIGNED],
            chassis[X],
            chassis[HEADING],
            left,
            right,
        ]);
        require_finite_state(&x0)?;
        Ok(x0)
    }
}

pub fn is_finite<const N: usize>(x: &SVector<f64, N>) -> bool {
    x.iter().all(|v| v.is_finite())
}

fn require_finite_state<const N: usize>(x: &SVector<f64, N>) -> Result<(), ModelError> {
    if is_finite(x) {
        Ok(())
    } else {
        Err(ModelError::MissingInput(format!(
            "initial state contains non-finite values: {:?}",
            x.as_slice()
        )))
    }
}
