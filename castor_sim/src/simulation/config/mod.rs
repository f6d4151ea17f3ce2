// castor_sim/src/simulation/config/mod.rs

//! This module handles loading and validating scenario configuration from
//! disk.

pub mod structs;

use figment::{
    providers::{Format, Toml},
    Figment,
};
use std::path::Path;
use tracing::{debug, info};

use crate::error::SimError;

pub use structs::{
    delimiter_byte, ExportConvention, InitialConfig, IntegrationConfig, IntegrationMode,
    ModelConfig, ModelKind, OutputConfig, ScenarioConfig, ValidationConfig,
};

/// Loads a scenario file into a `ScenarioConfig`.
///
/// Missing sections fall back to their defaults; unknown keys are rejected.
pub fn load_scenario(path: &Path) -> Result<ScenarioConfig, SimError> {
    if !path.is_file() {
        return Err(SimError::ScenarioNotFound(path.to_path_buf()));
    }
    info!("Loading scenario from: {}", path.display());

    let config: ScenarioConfig = Figment::new().merge(Toml::file(path)).extract()?;

    if let Ok(pretty) = toml::to_string_pretty(&config) {
        debug!("Resolved scenario:\n{}", pretty);
    }
    Ok(config)
}

/// Parses a scenario from an in-memory TOML string.
pub fn parse_scenario(source: &str) -> Result<ScenarioConfig, SimError> {
    Ok(Figment::new().merge(Toml::string(source)).extract()?)
}
