// castor_sim/examples/01_scheme_comparison.rs

//! Runs one scenario with every fixed-step scheme and reports how far each
//! final state lands from a fine-step RK4 reference.
//!
//! cargo run -p castor_sim --example 01_scheme_comparison -- assets/scenarios/chassis_drift.toml

use castor_sim::prelude::*;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn final_row(config: &ScenarioConfig) -> Result<Vec<f64>, SimError> {
    let prediction = run_scenario(config)?;
    if let Some(failure) = prediction.failure() {
        return Err(SimError::Model(failure.clone()));
    }
    prediction
        .rows(ExportConvention::Model)
        .pop()
        .ok_or_else(|| SimError::InvalidScenario("empty trajectory".to_string()))
}

fn main() -> Result<(), SimError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn"))
        .init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("assets/scenarios/chassis_drift.toml"));
    let mut config = load_scenario(&path)?;
    config.integration.mode = IntegrationMode::Fixed;

    // --- Reference ---
    let horizon = config.integration.resolve_steps()? as f64 * config.integration.dt;
    let mut reference = config.clone();
    reference.integration.scheme = FixedStepScheme::Rk4;
    reference.integration.dt = config.integration.dt / 20.0;
    reference.integration.steps = None;
    reference.integration.duration = Some(horizon);
    let expected = final_row(&reference)?;

    // --- Schemes ---
    for scheme in [
        FixedStepScheme::Rk1,
        FixedStepScheme::Rk2,
        FixedStepScheme::Rk3,
        FixedStepScheme::Rk4,
    ] {
        let mut run = config.clone();
        run.integration.scheme = scheme;
        let row = final_row(&run)?;
        let error = row
            .iter()
            .zip(&expected)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0_f64, f64::max);
        println!("{scheme:?} (order {}): max final-state error {error:.3e}", scheme.order());
    }
    Ok(())
}
