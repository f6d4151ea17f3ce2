// castor_core/src/angles.rs

//! Angle helpers and the caster-angle convention.
//!
//! Two representations of a caster angle exist:
//!
//! * the **sensor** angle `θ`, as published by the caster joint encoders, and
//! * the **model** angle `α`, the steering angle integrated by the 7-state model.
//!
//! They differ by a half turn: `α = θ - π`. The force model consumes the
//! deflection `δ = -α`, which is therefore `π - θ` when expressed in the
//! sensor convention. Both the held-caster (5-state) and the integrated-caster
//! (7-state) dynamics feed the force model through [`delta`], so they share one
//! convention.

use num_traits::{Float, FloatConst};

/// Wraps any angle into `(-π, π]`.
pub fn normalize_angle<T: Float + FloatConst>(angle: T) -> T {
    let two_pi = T::TAU();
    let pi = T::PI();
    let mut wrapped = angle % two_pi;
    if wrapped <= -pi {
        wrapped = wrapped + two_pi;
    } else if wrapped > pi {
        wrapped = wrapped - two_pi;
    }
    wrapped
}

/// Smallest signed angle taking `b` onto `a`, in `(-π, π]`.
pub fn angle_difference<T: Float + FloatConst>(a: T, b: T) -> T {
    normalize_angle(a - b)
}

/// Sensor caster angle -> model steering angle.
pub fn th_to_al<T: Float + FloatConst>(theta: T) -> T {
    normalize_angle(theta - T::PI())
}

/// Model steering angle -> sensor caster angle. Inverse of [`th_to_al`].
pub fn al_to_th<T: Float + FloatConst>(alpha: T) -> T {
    normalize_angle(alpha + T::PI())
}

/// Deflection fed to the force model for a model steering angle.
#[inline]
pub fn delta(alpha: f64) -> f64 {
    -alpha
}
