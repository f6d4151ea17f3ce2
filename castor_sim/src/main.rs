// castor_sim/src/main.rs

use castor_sim::cli::Cli;
use castor_sim::prelude::*;
use clap::Parser;
use std::io;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the prediction covered the whole horizon.
fn run(cli: &Cli) -> Result<bool, SimError> {
    let mut config = load_scenario(&cli.scenario)?;
    cli.apply_overrides(&mut config);

    let prediction = run_scenario(&config)?;

    // --- Persist ---
    match &config.output.path {
        Some(path) => write_prediction_file(path, &prediction, &config.output)?,
        None => write_prediction(io::stdout().lock(), &prediction, &config.output)?,
    }

    // --- Validate ---
    if let Some(validation) = &config.validation {
        let measured = load_measurements(&validation.measured, validation.delimiter)?;
        info!(
            path = %validation.measured.display(),
            samples = measured.len(),
            "Loaded recorded trajectory"
        );
        compare(&prediction, &measured)?;
    }

    if let Some(failure) = prediction.failure() {
        warn!("Prediction is partial: {failure}");
    }
    Ok(prediction.is_complete())
}
