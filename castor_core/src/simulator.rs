// castor_core/src/simulator.rs

//! Drives a [`Dynamics`] model over a horizon and assembles the trajectory.
//!
//! Inputs are checked before the first step. Once integration has started, the
//! first failure stops the run and the caller receives the valid prefix
//! together with the failure.

use nalgebra::SVector;
use tracing::{debug, info, warn};

use crate::error::{IntegrationError, ModelError};
use crate::models::dynamics::Dynamics;
use crate::state::{is_finite, CHASSIS_STATE_DIM};
use crate::utils::adaptive::DormandPrince45;
use crate::utils::integrators::Integrator;

// =========================================================================
// == Trajectory ==
// =========================================================================

/// Time-stamped states, oldest first, starting with the initial condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory<const N: usize> {
    times: Vec<f64>,
    states: Vec<SVector<f64, N>>,
}

impl<const N: usize> Trajectory<N> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            times: Vec::with_capacity(capacity),
            states: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, t: f64, x: SVector<f64, N>) {
        self.times.push(t);
        self.states.push(x);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn states(&self) -> &[SVector<f64, N>] {
        &self.states
    }

    pub fn initial_state(&self) -> Option<&SVector<f64, N>> {
        self.states.first()
    }

    pub fn final_state(&self) -> Option<&SVector<f64, N>> {
        self.states.last()
    }

    pub fn final_time(&self) -> Option<f64> {
        self.times.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, &SVector<f64, N>)> + '_ {
        self.times.iter().copied().zip(self.states.iter())
    }

    /// One row per sample in the fixed column order of the state layout.
    pub fn rows(&self) -> impl Iterator<Item = [f64; N]> + '_ {
        self.states.iter().map(|x| std::array::from_fn(|i| x[i]))
    }

    /// All samples of one state column.
    pub fn column(&self, index: usize) -> Vec<f64> {
        self.states.iter().map(|x| x[index]).collect()
    }
}

// =========================================================================
// == Run Outcome ==
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRun<const N: usize> {
    /// Every valid sample produced, initial condition included.
    pub trajectory: Trajectory<N>,
    /// Integration steps (or grid intervals) completed successfully.
    pub completed_steps: usize,
    /// Why the run stopped early, if it did.
    pub failure: Option<ModelError>,
}

impl<const N: usize> SimulationRun<N> {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    /// Discards the partial trajectory of a failed run.
    pub fn into_result(self) -> Result<Trajectory<N>, ModelError> {
        match self.failure {
            None => Ok(self.trajectory),
            Some(e) => Err(e),
        }
    }
}

// =========================================================================
// == Fixed-Step Mode ==
// =========================================================================

/// Applies `integrator` `steps` times with step `dt` starting from `x0` at
/// `t = 0`. A complete run holds exactly `steps + 1` samples.
pub fn simulate_fixed_step<const N: usize, D, I>(
    dynamics: &D,
    integrator: &I,
    x0: &SVector<f64, N>,
    dt: f64,
    steps: usize,
) -> Result<SimulationRun<N>, ModelError>
where
    D: Dynamics<N>,
    I: Integrator,
{
    if !(dt.is_finite() && dt > 0.0) {
        return Err(ModelError::Configuration(format!(
            "step size dt must be positive and finite, got {dt}"
        )));
    }
    let samples = sample_count(steps)?;
    require_finite_initial_state(x0)?;

    info!(dim = N, dt, steps, "Starting fixed-step simulation");

    let mut trajectory = Trajectory::with_capacity(samples.min(MAX_PREALLOCATED_SAMPLES));
    trajectory.push(0.0, *x0);

    let mut x = *x0;
    for k in 0..steps {
        // Times are derived from the step index, not accumulated.
        let t = k as f64 * dt;
        let next = dynamics.propagate(&x, t, dt, integrator);
        if !is_finite(&next) {
            let failure = ModelError::NumericDivergence {
                completed_steps: k,
                time: t + dt,
            };
            warn!(%failure, "Aborting fixed-step simulation");
            return Ok(SimulationRun {
                trajectory,
                completed_steps: k,
                failure: Some(failure),
            });
        }
        trajectory.push((k + 1) as f64 * dt, next);
        x = next;
    }

    debug!(samples = trajectory.len(), "Fixed-step simulation finished");
    Ok(SimulationRun {
        trajectory,
        completed_steps: steps,
        failure: None,
    })
}

// =========================================================================
// == Grid Mode ==
// =========================================================================

/// `steps + 1` evenly spaced times `k * dt`, matching [`simulate_fixed_step`].
/// Fails when that many points cannot be held in memory.
pub fn uniform_grid(dt: f64, steps: usize) -> Result<Vec<f64>, ModelError> {
    let points = sample_count(steps)?;
    let mut grid = Vec::new();
    grid.try_reserve_exact(points).map_err(|e| {
        ModelError::Configuration(format!("a grid of {points} points cannot be allocated: {e}"))
    })?;
    grid.extend((0..=steps).map(|k| k as f64 * dt));
    Ok(grid)
}

/// Solves the chassis-only model with the adaptive solver and samples it at
/// every point of `grid`, which must be strictly increasing.
pub fn simulate_on_grid<D>(
    dynamics: &D,
    solver: &DormandPrince45,
    x0: &SVector<f64, CHASSIS_STATE_DIM>,
    grid: &[f64],
) -> Result<SimulationRun<CHASSIS_STATE_DIM>, ModelError>
where
    D: Dynamics<CHASSIS_STATE_DIM>,
{
    validate_grid(grid)?;
    require_finite_initial_state(x0)?;

    info!(points = grid.len(), "Starting grid simulation");

    let func = |x: &SVector<f64, CHASSIS_STATE_DIM>, t: f64| dynamics.get_derivatives(x, t);
    let mut samples = Vec::with_capacity(grid.len());
    let outcome = solver.integrate_grid_into(&func, x0, grid, &mut samples);

    let mut trajectory = Trajectory::with_capacity(samples.len());
    for (&t, x) in grid.iter().zip(samples) {
        trajectory.push(t, x);
    }
    let completed_steps = trajectory.len().saturating_sub(1);

    let failure = match outcome {
        Ok(()) => None,
        Err(e) => {
            warn!(error = %e, completed_steps, "Aborting grid simulation");
            Some(match e {
                IntegrationError::NonFinite { time } => ModelError::NumericDivergence {
                    completed_steps,
                    time,
                },
                other => ModelError::from(other),
            })
        }
    };

    Ok(SimulationRun {
        trajectory,
        completed_steps,
        failure,
    })
}

/// Upper bound on the trajectory buffer reserved up front.
const MAX_PREALLOCATED_SAMPLES: usize = 1 << 20;

/// `steps + 1`, or a configuration error when it does not fit in `usize`.
fn sample_count(steps: usize) -> Result<usize, ModelError> {
    steps.checked_add(1).ok_or_else(|| {
        ModelError::Configuration(format!("{steps} steps exceed the representable sample count"))
    })
}

fn validate_grid(grid: &[f64]) -> Result<(), ModelError> {
    if grid.is_empty() {
        return Err(ModelError::InvalidTimeGrid(
            "grid must contain at least one time".to_string(),
        ));
    }
    if let Some(t) = grid.iter().find(|t| !t.is_finite()) {
        return Err(ModelError::InvalidTimeGrid(format!(
            "grid contains a non-finite time {t}"
        )));
    }
    if let Some(i) = grid.windows(2).position(|w| w[1] <= w[0]) {
        return Err(ModelError::InvalidTimeGrid(format!(
            "grid is not strictly increasing at index {}: {} -> {}",
            i + 1,
            grid[i],
            grid[i + 1]
        )));
    }
    Ok(())
}

fn require_finite_initial_state<const N: usize>(x0: &SVector<f64, N>) -> Result<(), ModelError> {
    if is_finite(x0) {
        Ok(())
    } else {
        Err(ModelError::MissingInput(format!(
            "initial state contains non-finite values: {:?}",
            x0.as_slice()
        )))
    }
}

/// `|a - b| / |b|` (Euclidean norms). Falls back to the absolute difference
/// when `b` is the zero vector.
pub fn relative_divergence<const N: usize>(a: &SVector<f64, N>, b: &SVector<f64, N>) -> f64 {
    let diff = (a - b).norm();
    let scale = b.norm();
    if scale > 0.0 {
        diff / scale
    } else {
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dynamics::friction::{CasterDynamics, ChassisDynamics};
    use crate::params::PhysicalConstants;
    use crate::state::{ChassisState, HEADING, LINEAR_RATE, X};
    use crate::utils::integrators::{RK1, RK4};
    use approx::assert_abs_diff_eq;

    fn chassis(mu: f64) -> ChassisDynamics {
        let c = PhysicalConstants {
            mu,
            ..Default::default()
        };
        ChassisDynamics::with_held_casters(c, Default::default(), 0.3, -0.2).unwrap()
    }

    /// Derivative field that explodes: x' = x^2 on every component.
    #[derive(Debug)]
    struct Quadratic;

    impl Dynamics<1> for Quadratic {
        fn get_state_layout(&self) -> [crate::state::StateVariable; 1] {
            [crate::state::StateVariable::LinearRate]
        }
        fn get_derivatives(&self, x: &SVector<f64, 1>, _t: f64) -> SVector<f64, 1> {
            x.component_mul(x)
        }
    }

    #[test]
    fn fixed_step_run_has_steps_plus_one_samples() {
        let x0 = ChassisState::new(-0.3, 0.3, 0.0, 0.0, 0.0);
        let run = simulate_fixed_step(&chassis(0.01), &RK4, &x0, 0.01, 50).unwrap();
        assert!(run.is_complete());
        assert_eq!(run.completed_steps, 50);
        assert_eq!(run.trajectory.len(), 51);
        assert_eq!(run.trajectory.initial_state(), Some(&x0));
        assert_abs_diff_eq!(run.trajectory.final_time().unwrap(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn zero_steps_returns_only_the_initial_state() {
        let x0 = ChassisState::new(0.1, 0.2, 0.3, 0.4, 0.5);
        let run = simulate_fixed_step(&chassis(0.01), &RK4, &x0, 0.1, 0).unwrap();
        assert_eq!(run.trajectory.states(), &[x0]);
    }

    #[test]
    fn bad_inputs_are_rejected_before_integration() {
        let x0 = ChassisState::zeros();
        for dt in [0.0, -0.01, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                simulate_fixed_step(&chassis(0.01), &RK4, &x0, dt, 10),
                Err(ModelError::Configuration(_))
            ));
        }
        let nan_state = ChassisState::new(f64::NAN, 0.0, 0.0, 0.0, 0.0);
        assert!(matches!(
            simulate_fixed_step(&chassis(0.01), &RK4, &nan_state, 0.01, 10),
            Err(ModelError::MissingInput(_))
        ));
    }

    #[test]
    fn divergence_returns_valid_prefix_and_failure() {
        let x0 = SVector::<f64, 1>::new(1.0);
        // Euler on x' = x^2 overflows after a handful of large steps.
        let run = simulate_fixed_step(&Quadratic, &RK1, &x0, 10.0, 100).unwrap();
        assert!(!run.is_complete());
        assert!(run.completed_steps < 100);
        assert_eq!(run.trajectory.len(), run.completed_steps + 1);
        assert!(run.trajectory.states().iter().all(|x| is_finite(x)));
        assert!(matches!(
            &run.failure,
            Some(ModelError::NumericDivergence { completed_steps, .. })
                if *completed_steps == run.completed_steps
        ));
        assert!(run.into_result().is_err());
    }

    #[test]
    fn unrepresentable_step_count_is_a_configuration_error() {
        let x0 = ChassisState::zeros();
        assert!(matches!(
            simulate_fixed_step(&chassis(0.01), &RK4, &x0, 0.01, usize::MAX),
            Err(ModelError::Configuration(_))
        ));
        assert!(matches!(
            uniform_grid(0.01, usize::MAX),
            Err(ModelError::Configuration(_))
        ));
        assert!(matches!(
            uniform_grid(0.01, usize::MAX - 1),
            Err(ModelError::Configuration(_))
        ));
    }

    /// Chassis-shaped model that coasts at unit rate until its derivative
    /// turns NaN at t = 0.55.
    #[derive(Debug)]
    struct FailingChassis;

    impl Dynamics<CHASSIS_STATE_DIM> for FailingChassis {
        fn get_state_layout(&self) -> [crate::state::StateVariable; CHASSIS_STATE_DIM] {
            crate::state::CHASSIS_LAYOUT
        }
        fn get_derivatives(
            &self,
            _x: &SVector<f64, CHASSIS_STATE_DIM>,
            t: f64,
        ) -> SVector<f64, CHASSIS_STATE_DIM> {
            let mut x_dot = SVector::zeros();
            x_dot[X] = if t < 0.55 { 1.0 } else { f64::NAN };
            x_dot
        }
    }

    #[test]
    fn grid_divergence_returns_valid_prefix_and_failure() {
        let x0 = ChassisState::zeros();
        let grid = uniform_grid(0.1, 10).unwrap();
        let run =
            simulate_on_grid(&FailingChassis, &DormandPrince45::default(), &x0, &grid).unwrap();

        assert!(!run.is_complete());
        assert_eq!(run.completed_steps, 5);
        assert_eq!(run.trajectory.len(), 6);
        for (t, x) in run.trajectory.iter() {
            assert_abs_diff_eq!(x[X], t, epsilon = 1e-12);
        }
        match &run.failure {
            Some(ModelError::NumericDivergence {
                completed_steps,
                time,
            }) => {
                assert_eq!(*completed_steps, 5);
                assert!((0.55..=0.6).contains(time));
            }
            other => panic!("expected NumericDivergence, got {other:?}"),
        }
    }

    #[test]
    fn grid_validation() {
        let x0 = ChassisState::zeros();
        let solver = DormandPrince45::default();
        let model = chassis(0.01);
        for grid in [vec![], vec![0.0, 0.1, 0.1], vec![0.0, -1.0], vec![0.0, f64::NAN]] {
            assert!(matches!(
                simulate_on_grid(&model, &solver, &x0, &grid),
                Err(ModelError::InvalidTimeGrid(_))
            ));
        }
    }

    #[test]
    fn grid_mode_samples_every_grid_point() {
        let x0 = ChassisState::new(-0.3, 0.3, 0.0, 0.0, 0.0);
        let grid = uniform_grid(0.05, 40).unwrap();
        let run = simulate_on_grid(&chassis(0.01), &DormandPrince45::default(), &x0, &grid)
            .unwrap();
        assert!(run.is_complete());
        assert_eq!(run.trajectory.times(), grid.as_slice());
        assert_eq!(run.completed_steps, 40);
    }

    #[test]
    fn frictionless_run_keeps_heading_and_linear_rate() {
        let x0 = ChassisState::new(0.0, 0.3, 0.0, 0.0, 0.8);
        let run = simulate_fixed_step(&chassis(0.0), &RK4, &x0, 0.01, 300).unwrap();
        for x in run.trajectory.states() {
            assert_eq!(x[HEADING], 0.8);
            assert_eq!(x[LINEAR_RATE], 0.3);
        }
    }

    #[test]
    fn caster_model_runs_in_fixed_step_mode() {
        let model = CasterDynamics::with_caster_states(
            PhysicalConstants::default(),
            Default::default(),
            Default::default(),
        )
        .unwrap();
        let x0 = SVector::<f64, 7>::from([0.2, 0.3, 0.0, 0.0, 0.0, 0.1, -0.1]);
        let run = simulate_fixed_step(&model, &RK4, &x0, 0.02, 10).unwrap();
        assert_eq!(run.trajectory.rows().count(), 11);
        assert_eq!(run.trajectory.column(5).len(), 11);
    }

    #[test]
    fn relative_divergence_of_identical_states_is_zero() {
        let a = ChassisState::new(1.0, 2.0, 3.0, 4.0, 5.0);
        assert_eq!(relative_divergence(&a, &a), 0.0);
        let zero = ChassisState::zeros();
        assert_abs_diff_eq!(relative_divergence(&a, &zero), a.norm(), epsilon = 1e-12);
    }
}
