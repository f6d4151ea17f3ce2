// castor_core/src/models/dynamics/friction.rs

//! Friction-driven rigid-body dynamics of the wheelchair chassis.
//!
//! One type covers both state forms:
//!
//! * `N = 5`: `(angular_rate, linear_rate, y_signed, x, heading)`, with the
//!   caster angles held at externally measured values for the whole run.
//! * `N = 7`: the same chassis states plus `(left_caster, right_caster)` model
//!   angles, integrated through the nonholonomic steering-rate constraints.
//!
//! The constructors are only defined for those two dimensions.

use nalgebra::SVector;

use super::Dynamics;
use crate::angles::delta;
use crate::error::ModelError;
use crate::models::force::{ForceModel, GeneralizedForces};
use crate::params::{CasterGeometry, ContactGeometry, PhysicalConstants};
use crate::state::{
    StateVariable, ANGULAR_RATE, CASTER_LAYOUT, CASTER_STATE_DIM, CHASSIS_STATE_DIM, HEADING,
    LEFT_CASTER, LINEAR_RATE, RIGHT_CASTER, X, Y_SIGNED,
};

/// Where the caster angles feeding the force model come from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CasterSource {
    /// Fixed model angles, not part of the state.
    Held { left: f64, right: f64 },
    /// Read from the state and integrated with this geometry.
    Integrated(CasterGeometry),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrictionDynamics<const N: usize> {
    forces: ForceModel,
    casters: CasterSource,
}

/// 5-state chassis-only model.
pub type ChassisDynamics = FrictionDynamics<CHASSIS_STATE_DIM>;
/// 7-state chassis + caster model.
pub type CasterDynamics = FrictionDynamics<CASTER_STATE_DIM>;

impl FrictionDynamics<CHASSIS_STATE_DIM> {
    /// Builds the chassis-only model. `left` and `right` are caster steering
    /// angles in the model convention, held for the whole run.
    pub fn with_held_casters(
        constants: PhysicalConstants,
        geometry: ContactGeometry,
        left: f64,
        right: f64,
    ) -> Result<Self, ModelError> {
        constants.validate()?;
        geometry.validate()?;
        if !left.is_finite() || !right.is_finite() {
            return Err(ModelError::MissingInput(format!(
                "held caster angles must be finite, got ({left}, {right})"
            )));
        }
        Ok(Self {
            forces: ForceModel::new(constants, geometry),
            casters: CasterSource::Held { left, right },
        })
    }
}

impl FrictionDynamics<CASTER_STATE_DIM> {
    pub fn with_caster_states(
        constants: PhysicalConstants,
        geometry: ContactGeometry,
        caster_geometry: CasterGeometry,
    ) -> Result<Self, ModelError> {
        constants.validate()?;
        geometry.validate()?;
        caster_geometry.validate()?;
        Ok(Self {
            forces: ForceModel::new(constants, geometry),
            casters: CasterSource::Integrated(caster_geometry),
        })
    }
}

impl<const N: usize> FrictionDynamics<N> {
    pub fn force_model(&self) -> &ForceModel {
        &self.forces
    }

    pub fn caster_source(&self) -> &CasterSource {
        &self.casters
    }

    /// `(left, right)` caster model angles in effect for state `x`.
    pub fn caster_angles(&self, x: &SVector<f64, N>) -> (f64, f64) {
        match self.casters {
            CasterSource::Held { left, right } => (left, right),
            CasterSource::Integrated(_) => (x[LEFT_CASTER], x[RIGHT_CASTER]),
        }
    }

    /// Generalized forces acting at state `x`. The right caster deflects
    /// contact 3, the left caster contact 4.
    pub fn forces_at(&self, x: &SVector<f64, N>) -> GeneralizedForces {
        let (left, right) = self.caster_angles(x);
        self.forces.omegas(delta(right), delta(left))
    }
}

impl<const N: usize> Dynamics<N> for FrictionDynamics<N> {
    fn get_state_layout(&self) -> [StateVariable; N] {
        // The chassis layout is a prefix of the caster layout.
        std::array::from_fn(|i| CASTER_LAYOUT[i])
    }

    fn get_derivatives(&self, x: &SVector<f64, N>, _t: f64) -> SVector<f64, N> {
        let mut x_dot = SVector::<f64, N>::zeros();

        // --- Extract from state vector `x` ---
        let a = x[ANGULAR_RATE];
        let b = x[LINEAR_RATE];
        let (sin_e, cos_e) = x[HEADING].sin_cos();

        // Recomputed on every evaluation: integrated caster angles differ
        // between stages.
        let omega = self.forces_at(x);
        let c = &self.forces.constants;

        // --- Chassis ---
        x_dot[ANGULAR_RATE] = omega.yaw / c.iz;
        x_dot[LINEAR_RATE] = (-omega.longitudinal * sin_e + omega.lateral * cos_e) / c.m;
        x_dot[Y_SIGNED] = b * sin_e;
        x_dot[X] = -b * cos_e;
        x_dot[HEADING] = a;

        // --- Casters ---
        if let CasterSource::Integrated(geometry) = &self.casters {
            x_dot[LEFT_CASTER] = geometry.left_rate(a, b, x[LEFT_CASTER]);
            x_dot[RIGHT_CASTER] = geometry.right_rate(a, b, x[RIGHT_CASTER]);
        }

        x_dot
    }
}
