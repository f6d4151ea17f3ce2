// castor_sim/src/cli.rs

use clap::Parser;
use std::path::PathBuf;

use crate::simulation::config::{IntegrationMode, ScenarioConfig};

/// Castor: forward prediction of the wheelchair friction model.
///
/// Loads a scenario, integrates the model under a constant command and writes
/// the predicted trajectory as a flat numeric table.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(short, long, default_value = "assets/scenarios/chassis_drift.toml")]
    pub scenario: PathBuf,

    /// Where to write the predicted trajectory (overrides `[output].path`).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of integration steps (overrides `[integration]`).
    #[arg(long)]
    pub steps: Option<usize>,

    /// Step size in seconds (overrides `[integration].dt`).
    #[arg(long)]
    pub dt: Option<f64>,

    /// Integration mode (overrides `[integration].mode`).
    #[arg(long, value_enum)]
    pub mode: Option<IntegrationMode>,

    /// Recorded ground truth to compare against (overrides `[validation].measured`).
    #[arg(long)]
    pub measured: Option<PathBuf>,
}

impl Cli {
    /// Applies the command-line overrides on top of a loaded scenario.
    pub fn apply_overrides(&self, config: &mut ScenarioConfig) {
        if let Some(path) = &self.output {
            config.output.path = Some(path.clone());
        }
        if let Some(dt) = self.dt {
            config.integration.dt = dt;
        }
        if let Some(steps) = self.steps {
            config.integration.steps = Some(steps);
            config.integration.duration = None;
        }
        if let Some(mode) = self.mode {
            config.integration.mode = mode;
        }
        if let Some(measured) = &self.measured {
            match &mut config.validation {
                Some(validation) => validation.measured = measured.clone(),
                None => {
                    config.validation = Some(crate::simulation::config::ValidationConfig {
                        measured: measured.clone(),
                        delimiter: ' ',
                    })
                }
            }
        }
    }
}
