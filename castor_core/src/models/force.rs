// castor_core/src/models/force.rs

//! Lumped Coulomb friction at the four ground contacts.
//!
//! Contacts 1 and 2 act along the chassis axis and share the `ep` fraction of
//! the normal load. Contacts 3 and 4 share the remaining `1 - ep` and are turned
//! by the caster deflections `delta1` (right) and `delta2` (left). Only the
//! longitudinal (rolling-direction) friction component is modelled; the lateral
//! component of every contact is zero.

use crate::params::{ContactGeometry, PhysicalConstants};

/// Friction force at one contact, in that contact's own frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct ContactForce {
    /// Along the rolling direction.
    u: f64,
    /// Across the rolling direction.
    w: f64,
}

impl ContactForce {
    fn longitudinal(u: f64) -> Self {
        Self { u, w: 0.0 }
    }
}

/// Net forcing on the chassis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeneralizedForces {
    /// `omega1`: net longitudinal force (N).
    pub longitudinal: f64,
    /// `omega2`: net lateral force (N).
    pub lateral: f64,
    /// `omega3`: net yaw moment (N m).
    pub yaw: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceModel {
    pub constants: PhysicalConstants,
    pub geometry: ContactGeometry,
}

impl ForceModel {
    pub fn new(constants: PhysicalConstants, geometry: ContactGeometry) -> Self {
        Self {
            constants,
            geometry,
        }
    }

    /// Friction magnitude at each contact of the axial pair (1, 2).
    pub fn axial_pair_force(&self) -> f64 {
        let c = &self.constants;
        c.mu * c.ep * c.normal_load() / 2.0
    }

    /// Friction magnitude at each contact of the deflected pair (3, 4).
    pub fn deflected_pair_force(&self) -> f64 {
        let c = &self.constants;
        c.mu * (1.0 - c.ep) * c.normal_load() / 2.0
    }

    /// Generalized forces for the given caster deflections.
    ///
    /// `delta1` deflects contact 3 and `delta2` deflects contact 4. Both are
    /// plain radians; every use is trigonometric.
    pub fn omegas(&self, delta1: f64, delta2: f64) -> GeneralizedForces {
        let axial = self.axial_pair_force();
        let deflected = self.deflected_pair_force();

        let f1 = ContactForce::longitudinal(axial);
        let f2 = ContactForce::longitudinal(axial);
        let f3 = ContactForce::longitudinal(deflected);
        let f4 = ContactForce::longitudinal(deflected);

        let ContactGeometry {
            wheelbase: l,
            track,
            d,
            s,
        } = self.geometry;
        let half_track = track / 2.0;

        let (s1, c1) = delta1.sin_cos();
        let (s2, c2) = delta2.sin_cos();

        let longitudinal = f3.u * c1 + f3.w * s1 + f1.u + f2.u + f4.u * c2 + f4.w * s2;
        let lateral = f1.w - f3.u * s1 + f3.w * c1 - f4.u * s2 + f4.w * c2 + f2.w;
        let yaw = f2.u * (half_track - s) - f1.u * (half_track - s) - (f2.w + f1.w) * d
            + (f4.u * c2 + f4.w * s2) * (half_track - s)
            - (f3.u * c1 - f3.w * s1) * (half_track + s)
            + (f4.w * c2 - f4.u * s2 + f3.w * c1 - f3.u * s1) * (l - d);

        GeneralizedForces {
            longitudinal,
            lateral,
            yaw,
        }
    }
}
