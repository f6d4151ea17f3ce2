// castor_core/src/utils/integrators.rs

use nalgebra::SVector;
use serde::{Deserialize, Serialize};

/// A single-step explicit integrator over a fixed step `tf - t0`.
///
/// All `N` components are advanced together; `func` is evaluated on the whole
/// intermediate state at every stage.
pub trait Integrator {
    fn step<const N: usize>(
        &self,
        func: &dyn Fn(&SVector<f64, N>, f64) -> SVector<f64, N>,
        x0: &SVector<f64, N>,
        t0: f64,
        tf: f64,
    ) -> SVector<f64, N>;
}

// Runge-Kutta methods
#[derive(Debug, Default, Clone, Copy)]
pub struct RK1;

impl Integrator for RK1 {
    fn step<const N: usize>(
        &self,
        func: &dyn Fn(&SVector<f64, N>, f64) -> SVector<f64, N>,
        x0: &SVector<f64, N>,
        t0: f64,
        tf: f64,
    ) -> SVector<f64, N> {
        let dt = tf - t0;
        x0 + func(x0, t0) * dt // Euler's method
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RK2;

impl Integrator for RK2 {
    fn step<const N: usize>(
        &self,
        func: &dyn Fn(&SVector<f64, N>, f64) -> SVector<f64, N>,
        x0: &SVector<f64, N>,
        t0: f64,
        tf: f64,
    ) -> SVector<f64, N> {
        let dt = tf - t0;
        let k1 = func(x0, t0);
        let k2 = func(&(x0 + k1 * dt), tf);

        // Weighted average of k1 and k2
        x0 + (k1 + k2) * (0.5 * dt)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RK3;

impl Integrator for RK3 {
    fn step<const N: usize>(
        &self,
        func: &dyn Fn(&SVector<f64, N>, f64) -> SVector<f64, N>,
        x0: &SVector<f64, N>,
        t0: f64,
        tf: f64,
    ) -> SVector<f64, N> {
        let dt = tf - t0;
        let k1 = func(x0, t0);
        let k2 = func(&(x0 + k1 * dt), tf);
        let k3 = func(&(x0 + (k1 + k2) * (dt / 4.0)), t0 + dt / 2.0);

        // Weighted average of k1, k2, and k3
        x0 + (k1 + k2 + k3 * 4.0) * (dt / 6.0)
    }
}

/// Classical 4th-order Runge-Kutta.
///
/// ```text
/// k1 = h f(x)
/// k2 = h f(x + k1/2)
/// k3 = h f(x + k2/2)
/// k4 = h f(x + k3)
/// x' = x + (k1 + 2 k2 + 2 k3 + k4) / 6
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct RK4;

impl Integrator for RK4 {
    fn step<const N: usize>(
        &self,
        func: &dyn Fn(&SVector<f64, N>, f64) -> SVector<f64, N>,
        x0: &SVector<f64, N>,
        t0: f64,
        tf: f64,
    ) -> SVector<f64, N> {
        let h = tf - t0;
        let half = 0.5 * h;

        let k1 = func(x0, t0) * h;
        let k2 = func(&(x0 + k1 * 0.5), t0 + half) * h;
        let k3 = func(&(x0 + k2 * 0.5), t0 + half) * h;
        let k4 = func(&(x0 + k3), tf) * h;

        x0 + (k1 + k2 * 2.0 + k3 * 2.0 + k4) / 6.0
    }
}

/// Run-time selection of a fixed-step scheme, e.g. from a scenario file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixedStepScheme {
    Rk1,
    Rk2,
    Rk3,
    #[default]
    Rk4,
}

impl FixedStepScheme {
    /// Order of the global truncation error.
    pub fn order(&self) -> u32 {
        match self {
            FixedStepScheme::Rk1 => 1,
            FixedStepScheme::Rk2 => 2,
            FixedStepScheme::Rk3 => 3,
            FixedStepScheme::Rk4 => 4,
        }
    }
}

impl Integrator for FixedStepScheme {
    fn step<const N: usize>(
        &self,
        func: &dyn Fn(&SVector<f64, N>, f64) -> SVector<f64, N>,
        x0: &SVector<f64, N>,
        t0: f64,
        tf: f64,
    ) -> SVector<f64, N> {
        match self {
            FixedStepScheme::Rk1 => RK1.step(func, x0, t0, tf),
            FixedStepScheme::Rk2 => RK2.step(func, x0, t0, tf),
            FixedStepScheme::Rk3 => RK3.step(func, x0, t0, tf),
            FixedStepScheme::Rk4 => RK4.step(func, x0, t0, tf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector1;

    // x' = -x, x(0) = 1  =>  x(t) = exp(-t)
    fn decay(x: &Vector1<f64>, _t: f64) -> Vector1<f64> {
        -x
    }

    fn integrate<I: Integrator>(integrator: &I, dt: f64, steps: usize) -> f64 {
        let mut x = Vector1::new(1.0);
        for k in 0..steps {
            let t0 = k as f64 * dt;
            x = integrator.step(&decay, &x, t0, t0 + dt);
        }
        x[0]
    }

    #[test]
    fn rk4_single_step_matches_taylor_expansion() {
        // One RK4 step of x' = -x reproduces the 4th-order Taylor polynomial.
        let h: f64 = 0.1;
        let x = RK4.step(&decay, &Vector1::new(1.0), 0.0, h);
        let taylor = 1.0 - h + h.powi(2) / 2.0 - h.powi(3) / 6.0 + h.powi(4) / 24.0;
        assert_relative_eq!(x[0], taylor, epsilon = 1e-14);
    }

    #[test]
    fn rk4_handles_time_dependent_fields() {
        // x' = 3 t^2, exact for RK4 since Simpson's rule integrates cubics.
        let f = |_x: &Vector1<f64>, t: f64| Vector1::new(3.0 * t * t);
        let x = RK4.step(&f, &Vector1::new(0.0), 1.0, 2.0);
        assert_relative_eq!(x[0], 7.0, epsilon = 1e-12);
    }

    #[test]
    fn schemes_converge_at_their_order() {
        let exact = (-1.0_f64).exp();
        for scheme in [
            FixedStepScheme::Rk1,
            FixedStepScheme::Rk2,
            FixedStepScheme::Rk3,
            FixedStepScheme::Rk4,
        ] {
            let coarse = (integrate(&scheme, 0.1, 10) - exact).abs();
            let fine = (integrate(&scheme, 0.05, 20) - exact).abs();
            let observed = (coarse / fine).log2();
            let expected = scheme.order() as f64;
            assert!(
                (observed - expected).abs() < 0.3,
                "{scheme:?}: observed order {observed}, expected {expected}"
            );
        }
    }

    #[test]
    fn default_scheme_is_rk4() {
        assert_eq!(FixedStepScheme::default(), FixedStepScheme::Rk4);
    }
}
