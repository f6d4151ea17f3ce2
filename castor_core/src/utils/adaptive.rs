// castor_core/src/utils/adaptive.rs

//! Dormand-Prince 5(4) embedded Runge-Kutta with step-size control.

use nalgebra::SVector;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::IntegrationError;

// Butcher tableau
const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// 5th-order weights (also the last row of A, first-same-as-last).
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// Difference between the 5th- and embedded 4th-order weights.
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DormandPrince45 {
    pub rtol: f64,
    pub atol: f64,
    pub initial_step: f64,
    pub min_step: f64,
    /// Upper bound on accepted plus rejected steps over a whole grid.
    pub max_steps: usize,
}

impl Default for DormandPrince45 {
    fn default() -> Self {
        Self {
            rtol: 1e-8,
            atol: 1e-10,
            initial_step: 1e-3,
            min_step: 1e-12,
            max_steps: 1_000_000,
        }
    }
}

struct Attempt<const N: usize> {
    x_next: SVector<f64, N>,
    error_norm: f64,
}

impl DormandPrince45 {
    /// Integrates from `grid[0]` through every later grid point and returns the
    /// state at each of them, `grid[0]` included.
    ///
    /// The grid is assumed strictly increasing; steps are shortened so every
    /// grid point is hit exactly.
    pub fn integrate_grid<const N: usize>(
        &self,
        func: &dyn Fn(&SVector<f64, N>, f64) -> SVector<f64, N>,
        x0: &SVector<f64, N>,
        grid: &[f64],
    ) -> Result<Vec<SVector<f64, N>>, IntegrationError> {
        let mut samples = Vec::with_capacity(grid.len());
        self.integrate_grid_into(func, x0, grid, &mut samples)?;
        Ok(samples)
    }

    /// Same as [`Self::integrate_grid`], but appends each sample to `samples`
    /// as soon as it is reached, so the valid prefix survives a failure.
    pub fn integrate_grid_into<const N: usize>(
        &self,
        func: &dyn Fn(&SVector<f64, N>, f64) -> SVector<f64, N>,
        x0: &SVector<f64, N>,
        grid: &[f64],
        samples: &mut Vec<SVector<f64, N>>,
    ) -> Result<(), IntegrationError> {
        let Some(&t_start) = grid.first() else {
            return Ok(());
        };
        samples.push(*x0);

        let mut t = t_start;
        let mut x = *x0;
        let mut h = self.initial_step;
        let mut attempts = 0usize;
        let mut rejected = 0usize;

        for &target in &grid[1..] {
            while t < target {
                if attempts >= self.max_steps {
                    return Err(IntegrationError::StepBudgetExhausted {
                        time: t,
                        max_steps: self.max_steps,
                    });
                }
                attempts += 1;

                let remaining = target - t;
                let lands_on_target = h >= remaining;
                let h_try = if lands_on_target { remaining } else { h };
                if !lands_on_target && h_try < self.min_step {
                    return Err(IntegrationError::StepSizeUnderflow {
                        time: t,
                        step: h_try,
                        min_step: self.min_step,
                    });
                }

                let attempt = self.attempt(func, &x, t, h_try)?;
                let err = attempt.error_norm;

                if err <= 1.0 {
                    x = attempt.x_next;
                    t = if lands_on_target { target } else { t + h_try };

                    let factor = if err == 0.0 {
                        MAX_FACTOR
                    } else {
                        (SAFETY * err.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR)
                    };
                    // A step cut short by a grid point says nothing about the
                    // step the dynamics allow, so never shrink below `h` for it.
                    h = if lands_on_target {
                        h.max(h_try * factor)
                    } else {
                        h_try * factor
                    };
                } else {
                    rejected += 1;
                    let factor = if err.is_finite() {
                        (SAFETY * err.powf(-0.2)).clamp(MIN_FACTOR, 1.0)
                    } else {
                        MIN_FACTOR
                    };
                    h = h_try * factor;
                    if h < self.min_step {
                        return Err(IntegrationError::StepSizeUnderflow {
                            time: t,
                            step: h,
                            min_step: self.min_step,
                        });
                    }
                }
            }
            samples.push(x);
        }

        debug!(
            attempts,
            rejected,
            samples = samples.len(),
            "Dormand-Prince integration finished"
        );
        Ok(())
    }

    /// One trial step. Any non-finite stage or result aborts the whole
    /// integration, since shrinking the step cannot recover from it.
    fn attempt<const N: usize>(
        &self,
        func: &dyn Fn(&SVector<f64, N>, f64) -> SVector<f64, N>,
        x: &SVector<f64, N>,
        t: f64,
        h: f64,
    ) -> Result<Attempt<N>, IntegrationError> {
        let stage = |x: &SVector<f64, N>, t: f64| {
            let k = func(x, t);
            if k.iter().all(|v| v.is_finite()) {
                Ok(k)
            } else {
                Err(IntegrationError::NonFinite { time: t })
            }
        };

        let k1 = stage(x, t)?;
        let k2 = stage(&(x + k1 * (h * A21)), t + C2 * h)?;
        let k3 = stage(&(x + (k1 * A31 + k2 * A32) * h), t + C3 * h)?;
        let k4 = stage(&(x + (k1 * A41 + k2 * A42 + k3 * A43) * h), t + C4 * h)?;
        let k5 = stage(
            &(x + (k1 * A51 + k2 * A52 + k3 * A53 + k4 * A54) * h),
            t + C5 * h,
        )?;
        let k6 = stage(
            &(x + (k1 * A61 + k2 * A62 + k3 * A63 + k4 * A64 + k5 * A65) * h),
            t + h,
        )?;
        let x_next = x + (k1 * B1 + k3 * B3 + k4 * B4 + k5 * B5 + k6 * B6) * h;
        if !x_next.iter().all(|v| v.is_finite()) {
            return Err(IntegrationError::NonFinite { time: t + h });
        }
        let k7 = stage(&x_next, t + h)?;

        let err = (k1 * E1 + k3 * E3 + k4 * E4 + k5 * E5 + k6 * E6 + k7 * E7) * h;

        let mut sum = 0.0;
        for i in 0..N {
            let scale = self.atol + self.rtol * x[i].abs().max(x_next[i].abs());
            sum += (err[i] / scale).powi(2);
        }
        let error_norm = if N == 0 { 0.0 } else { (sum / N as f64).sqrt() };

        Ok(Attempt { x_next, error_norm })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Vector1, Vector2};

    #[test]
    fn decay_matches_closed_form_on_every_grid_point() {
        let f = |x: &Vector1<f64>, _t: f64| -x;
        let grid: Vec<f64> = (0..=20).map(|k| k as f64 * 0.25).collect();
        let out = DormandPrince45::default()
            .integrate_grid(&f, &Vector1::new(2.0), &grid)
            .unwrap();
        assert_eq!(out.len(), grid.len());
        for (x, t) in out.iter().zip(&grid) {
            assert_relative_eq!(x[0], 2.0 * (-t).exp(), max_relative = 1e-7);
        }
    }

    #[test]
    fn harmonic_oscillator_conserves_phase() {
        // x'' = -x, one full period returns to the start.
        let f = |x: &Vector2<f64>, _t: f64| Vector2::new(x[1], -x[0]);
        let tau = std::f64::consts::TAU;
        let grid = [0.0, tau / 2.0, tau];
        let out = DormandPrince45::default()
            .integrate_grid(&f, &Vector2::new(1.0, 0.0), &grid)
            .unwrap();
        assert_relative_eq!(out[1][0], -1.0, epsilon = 1e-6);
        assert_relative_eq!(out[2][0], 1.0, epsilon = 1e-6);
        assert!(out[2][1].abs() < 1e-6);
    }

    #[test]
    fn single_point_grid_returns_initial_state() {
        let f = |x: &Vector1<f64>, _t: f64| *x;
        let out = DormandPrince45::default()
            .integrate_grid(&f, &Vector1::new(3.0), &[1.5])
            .unwrap();
        assert_eq!(out, vec![Vector1::new(3.0)]);
    }

    #[test]
    fn exhausted_budget_is_reported() {
        let f = |x: &Vector1<f64>, _t: f64| -x;
        let solver = DormandPrince45 {
            initial_step: 1e-4,
            max_steps: 3,
            ..Default::default()
        };
        let result = solver.integrate_grid(&f, &Vector1::new(1.0), &[0.0, 10.0]);
        assert!(matches!(
            result,
            Err(IntegrationError::StepBudgetExhausted { max_steps: 3, .. })
        ));
    }

    #[test]
    fn blow_up_is_reported_rather_than_returned() {
        // x' = x^2 with x(0) = 1 escapes to infinity at t = 1.
        let f = |x: &Vector1<f64>, _t: f64| Vector1::new(x[0] * x[0]);
        let result =
            DormandPrince45::default().integrate_grid(&f, &Vector1::new(1.0), &[0.0, 2.0]);
        assert!(result.is_err());
    }

    #[test]
    fn nan_derivative_is_non_finite_not_underflow() {
        // The field is undefined from t = 0.35 on.
        let f = |_x: &Vector1<f64>, t: f64| Vector1::new(if t < 0.35 { 1.0 } else { f64::NAN });
        let grid: Vec<f64> = (0..=10).map(|k| k as f64 * 0.1).collect();
        let mut samples = Vec::new();
        let result = DormandPrince45::default().integrate_grid_into(
            &f,
            &Vector1::new(0.0),
            &grid,
            &mut samples,
        );

        match result {
            Err(IntegrationError::NonFinite { time }) => assert!((0.35..=0.4).contains(&time)),
            other => panic!("expected NonFinite, got {other:?}"),
        }
        assert_eq!(samples.len(), 4);
        assert_relative_eq!(samples[3][0], 0.3, epsilon = 1e-12);
    }
}
