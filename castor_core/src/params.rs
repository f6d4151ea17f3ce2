// castor_core/src/params.rs

//! Immutable configuration records for the friction model.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Physical constants of the chassis and its ground contacts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhysicalConstants {
    /// Yaw moment of inertia `Iz` (kg m^2).
    pub iz: f64,
    /// Coulomb friction coefficient `mu`.
    pub mu: f64,
    /// Fraction of the normal load carried by the caster pair, `ep` in `[0, 1]`.
    pub ep: f64,
    /// Mass `m` (kg).
    pub m: f64,
    /// Gravitational acceleration `g` (m/s^2).
    pub g: f64,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            iz: 5.0,
            mu: 0.01,
            ep: 0.5,
            m: 5.0,
            g: 9.81,
        }
    }
}

impl PhysicalConstants {
    /// Normal load `N = m g`.
    pub fn normal_load(&self) -> f64 {
        self.m * self.g
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        require_finite("iz", self.iz)?;
        require_finite("mu", self.mu)?;
        require_finite("ep", self.ep)?;
        require_finite("m", self.m)?;
        require_finite("g", self.g)?;

        if self.iz <= 0.0 {
            return Err(ModelError::Configuration(format!(
                "yaw inertia iz must be positive, got {}",
                self.iz
            )));
        }
        if self.m <= 0.0 {
            return Err(ModelError::Configuration(format!(
                "mass m must be positive, got {}",
                self.m
            )));
        }
        if self.mu < 0.0 {
            return Err(ModelError::Configuration(format!(
                "friction coefficient mu cannot be negative, got {}",
                self.mu
            )));
        }
        if self.g < 0.0 {
            return Err(ModelError::Configuration(format!(
                "gravitational constant g cannot be negative, got {}",
                self.g
            )));
        }
        if !(0.0..=1.0).contains(&self.ep) {
            return Err(ModelError::Configuration(format!(
                "load share ep must lie in [0, 1], got {}",
                self.ep
            )));
        }
        Ok(())
    }
}

/// Lever arms through which the four contact forces act on the chassis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContactGeometry {
    /// Wheelbase `L` between the drive axle and the caster pivots (m).
    pub wheelbase: f64,
    /// Track `Rr` between the left and right contacts (m).
    pub track: f64,
    /// Longitudinal offset `d` of the drive contacts (m).
    #[serde(default)]
    pub d: f64,
    /// Lateral offset `s` of the contacts (m).
    #[serde(default)]
    pub s: f64,
}

impl Default for ContactGeometry {
    fn default() -> Self {
        Self {
            wheelbase: 0.58,
            track: 0.27 * 2.0,
            d: 0.0,
            s: 0.0,
        }
    }
}

impl ContactGeometry {
    pub fn validate(&self) -> Result<(), ModelError> {
        require_finite("wheelbase", self.wheelbase)?;
        require_finite("track", self.track)?;
        require_finite("d", self.d)?;
        require_finite("s", self.s)
    }
}

/// Geometry of the caster forks, used by the steering-rate constraints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CasterGeometry {
    /// Longitudinal distance `dl` from the drive axle to the caster pivots (m).
    pub dl: f64,
    /// Lateral spacing `df` of the two caster pivots (m).
    pub df: f64,
    /// Caster trail `dc` (m). Divides every steering rate, so it cannot be zero.
    pub dc: f64,
}

impl Default for CasterGeometry {
    fn default() -> Self {
        Self {
            dl: 0.58,
            df: 0.19,
            dc: 0.06,
        }
    }
}

impl CasterGeometry {
    pub fn validate(&self) -> Result<(), ModelError> {
        require_finite("dl", self.dl)?;
        require_finite("df", self.df)?;
        require_finite("dc", self.dc)?;
        if self.dc == 0.0 {
            return Err(ModelError::Configuration(
                "caster trail dc cannot be zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Steering rate of the left caster (model angle `alpha`).
    pub fn left_rate(&self, angular_rate: f64, linear_rate: f64, alpha: f64) -> f64 {
        angular_rate * (self.dl * alpha.cos() - self.df * alpha.sin() / 2.0 - self.dc) / self.dc
            - linear_rate * alpha.sin() / self.dc
    }

    /// Steering rate of the right caster (model angle `alpha`).
    pub fn right_rate(&self, angular_rate: f64, linear_rate: f64, alpha: f64) -> f64 {
        angular_rate * (self.dl * alpha.cos() + self.df * alpha.sin() / 2.0 - self.dc) / self.dc
            - linear_rate * alpha.sin() / self.dc
    }
}

/// Constant velocity command held over one prediction horizon.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WheelCommand {
    /// Commanded forward speed (m/s).
    pub linear_x: f64,
    /// Commanded yaw rate (rad/s).
    pub angular_z: f64,
}

impl WheelCommand {
    pub const fn new(linear_x: f64, angular_z: f64) -> Self {
        Self {
            linear_x,
            angular_z,
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        require_finite("linear_x", self.linear_x)?;
        require_finite("angular_z", self.angular_z)
    }
}

fn require_finite(name: &str, value: f64) -> Result<(), ModelError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ModelError::Configuration(format!(
            "{name} must be finite, got {value}"
        )))
    }
}
