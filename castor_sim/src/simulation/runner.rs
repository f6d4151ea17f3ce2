// castor_sim/src/simulation/runner.rs

//! Builds the configured model from a scenario and runs the simulator.

use castor_core::prelude::*;
use tracing::{info, warn};

use crate::error::SimError;
use crate::simulation::config::{ExportConvention, IntegrationMode, ModelKind, ScenarioConfig};

/// The outcome of one scenario, tagged by state dimension.
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    Chassis(SimulationRun<CHASSIS_STATE_DIM>),
    Caster(SimulationRun<CASTER_STATE_DIM>),
}

impl Prediction {
    pub fn layout(&self) -> &'static [StateVariable] {
        match self {
            Prediction::Chassis(_) => &CHASSIS_LAYOUT,
            Prediction::Caster(_) => &CASTER_LAYOUT,
        }
    }

    pub fn is_complete(&self) -> bool {
        match self {
            Prediction::Chassis(run) => run.is_complete(),
            Prediction::Caster(run) => run.is_complete(),
        }
    }

    pub fn completed_steps(&self) -> usize {
        match self {
            Prediction::Chassis(run) => run.completed_steps,
            Prediction::Caster(run) => run.completed_steps,
        }
    }

    pub fn failure(&self) -> Option<&ModelError> {
        match self {
            Prediction::Chassis(run) => run.failure.as_ref(),
            Prediction::Caster(run) => run.failure.as_ref(),
        }
    }

    pub fn times(&self) -> &[f64] {
        match self {
            Prediction::Chassis(run) => run.trajectory.times(),
            Prediction::Caster(run) => run.trajectory.times(),
        }
    }

    /// Every sample as a row in layout order, converted to `convention`.
    pub fn rows(&self, convention: ExportConvention) -> Vec<Vec<f64>> {
        match self {
            Prediction::Chassis(run) => convert_rows(&run.trajectory, &CHASSIS_LAYOUT, convention),
            Prediction::Caster(run) => convert_rows(&run.trajectory, &CASTER_LAYOUT, convention),
        }
    }
}

fn convert_rows<const N: usize>(
    trajectory: &Trajectory<N>,
    layout: &[StateVariable; N],
    convention: ExportConvention,
) -> Vec<Vec<f64>> {
    trajectory
        .rows()
        .map(|row| {
            row.iter()
                .zip(layout)
                .map(|(&value, variable)| match convention {
                    ExportConvention::Model => value,
                    ExportConvention::World => to_world(*variable, value),
                })
                .collect()
        })
        .collect()
}

/// Maps one state component back to the frame the recorded data uses.
pub fn to_world(variable: StateVariable, value: f64) -> f64 {
    match variable {
        StateVariable::LateralPosition => -value,
        StateVariable::LeftCaster | StateVariable::RightCaster => al_to_th(value),
        _ => value,
    }
}

/// Builds the model described by `config` and runs it to completion or to
/// the first failure.
pub fn run_scenario(config: &ScenarioConfig) -> Result<Prediction, SimError> {
    let integration = &config.integration;
    let steps = integration.resolve_steps()?;
    let initial = config.initial.to_initial_condition();

    info!(
        model = ?config.model.kind,
        mode = ?integration.mode,
        scheme = ?integration.scheme,
        dt = integration.dt,
        steps,
        "Running scenario"
    );

    let prediction = match config.model.kind {
        ModelKind::Chassis => {
            let casters = initial.require_casters()?;
            let (left, right) = casters.to_model();
            let dynamics = ChassisDynamics::with_held_casters(
                config.constants,
                config.contact_geometry,
                left,
                right,
            )?;
            let x0 = initial.chassis_state(&config.command)?;
            let run = match integration.mode {
                IntegrationMode::Fixed => simulate_fixed_step(
                    &dynamics,
                    &integration.scheme,
                    &x0,
                    integration.dt,
                    steps,
                )?,
                IntegrationMode::Grid => {
                    let grid = uniform_grid(integration.dt, steps)?;
                    simulate_on_grid(&dynamics, &integration.solver, &x0, &grid)?
                }
            };
            Prediction::Chassis(run)
        }
        ModelKind::Caster => {
            if integration.mode == IntegrationMode::Grid {
                return Err(SimError::InvalidScenario(
                    "grid mode is only available for the chassis model".to_string(),
                ));
            }
            let dynamics = CasterDynamics::with_caster_states(
                config.constants,
                config.contact_geometry,
                config.caster_geometry,
            )?;
            let x0 = initial.caster_state(&config.command)?;
            Prediction::Caster(simulate_fixed_step(
                &dynamics,
                &integration.scheme,
                &x0,
                integration.dt,
                steps,
            )?)
        }
    };

    match prediction.failure() {
        None => info!(steps = prediction.completed_steps(), "Scenario complete"),
        Some(failure) => warn!(
            completed_steps = prediction.completed_steps(),
            %failure,
            "Scenario stopped early"
        ),
    }
    Ok(prediction)
}
